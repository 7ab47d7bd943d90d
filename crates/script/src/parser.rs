use crate::ast::{BinOp, Expr, LValue, Program, Stmt, StmtKind, UnOp};
use crate::lexer::{Tok, Token};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParseError {
    pub message: String,
    pub line: u32,
}

pub fn parse(tokens: Vec<Token>) -> Result<Program, ParseError> {
    let mut p = Parser { tokens, pos: 0 };
    let mut stmts = Vec::new();
    while !p.check(&Tok::Eof) {
        stmts.push(p.statement()?);
    }
    Ok(stmts)
}

struct Parser {
    tokens: Vec<Token>,
    pos: usize,
}

impl Parser {
    fn peek(&self) -> &Tok {
        &self.tokens[self.pos].tok
    }

    fn line(&self) -> u32 {
        self.tokens[self.pos].line
    }

    fn check(&self, t: &Tok) -> bool {
        self.peek() == t
    }

    fn advance(&mut self) -> Token {
        let t = self.tokens[self.pos].clone();
        if self.pos + 1 < self.tokens.len() {
            self.pos += 1;
        }
        t
    }

    fn expect(&mut self, t: &Tok) -> Result<(), ParseError> {
        if self.check(t) {
            self.advance();
            Ok(())
        } else {
            Err(ParseError {
                message: format!("expected {t:?}, found {:?}", self.peek()),
                line: self.line(),
            })
        }
    }

    fn block(&mut self) -> Result<Vec<Stmt>, ParseError> {
        self.expect(&Tok::LBrace)?;
        let mut stmts = Vec::new();
        while !self.check(&Tok::RBrace) {
            stmts.push(self.statement()?);
        }
        self.expect(&Tok::RBrace)?;
        Ok(stmts)
    }

    fn statement(&mut self) -> Result<Stmt, ParseError> {
        let line = self.line();
        match self.peek() {
            Tok::If => {
                self.advance();
                self.expect(&Tok::LParen)?;
                let cond = self.expr()?;
                self.expect(&Tok::RParen)?;
                let then_branch = self.block()?;
                let else_branch = if self.check(&Tok::Else) {
                    self.advance();
                    Some(self.block()?)
                } else {
                    None
                };
                Ok(Stmt { kind: StmtKind::If(cond, then_branch, else_branch), line })
            }
            Tok::While => {
                self.advance();
                self.expect(&Tok::LParen)?;
                let cond = self.expr()?;
                self.expect(&Tok::RParen)?;
                let body = self.block()?;
                Ok(Stmt { kind: StmtKind::While(cond, body), line })
            }
            Tok::Return => {
                self.advance();
                let value = if self.check(&Tok::Semi) {
                    None
                } else {
                    Some(self.expr()?)
                };
                self.expect(&Tok::Semi)?;
                Ok(Stmt { kind: StmtKind::Return(value), line })
            }
            _ => {
                let e = self.expr()?;
                self.expect(&Tok::Semi)?;
                Ok(Stmt { kind: StmtKind::Expr(e), line })
            }
        }
    }

    fn expr(&mut self) -> Result<Expr, ParseError> {
        self.assignment()
    }

    fn assignment(&mut self) -> Result<Expr, ParseError> {
        let target = self.logic_or()?;
        if self.check(&Tok::Assign) {
            self.advance();
            let value = self.assignment()?;
            let lvalue = to_lvalue(target, self.line())?;
            return Ok(Expr::Assign(Box::new(lvalue), Box::new(value)));
        }
        Ok(target)
    }

    fn logic_or(&mut self) -> Result<Expr, ParseError> {
        let mut left = self.logic_and()?;
        while self.check(&Tok::OrOr) {
            self.advance();
            let right = self.logic_and()?;
            left = Expr::Binary(BinOp::Or, Box::new(left), Box::new(right));
        }
        Ok(left)
    }

    fn logic_and(&mut self) -> Result<Expr, ParseError> {
        let mut left = self.equality()?;
        while self.check(&Tok::AndAnd) {
            self.advance();
            let right = self.equality()?;
            left = Expr::Binary(BinOp::And, Box::new(left), Box::new(right));
        }
        Ok(left)
    }

    fn equality(&mut self) -> Result<Expr, ParseError> {
        let mut left = self.comparison()?;
        loop {
            let op = match self.peek() {
                Tok::Eq => BinOp::Eq,
                Tok::Ne => BinOp::Ne,
                _ => break,
            };
            self.advance();
            let right = self.comparison()?;
            left = Expr::Binary(op, Box::new(left), Box::new(right));
        }
        Ok(left)
    }

    fn comparison(&mut self) -> Result<Expr, ParseError> {
        let mut left = self.additive()?;
        loop {
            let op = match self.peek() {
                Tok::Lt => BinOp::Lt,
                Tok::Gt => BinOp::Gt,
                Tok::Le => BinOp::Le,
                Tok::Ge => BinOp::Ge,
                _ => break,
            };
            self.advance();
            let right = self.additive()?;
            left = Expr::Binary(op, Box::new(left), Box::new(right));
        }
        Ok(left)
    }

    fn additive(&mut self) -> Result<Expr, ParseError> {
        let mut left = self.multiplicative()?;
        loop {
            let op = match self.peek() {
                Tok::Plus => BinOp::Add,
                Tok::Minus => BinOp::Sub,
                _ => break,
            };
            self.advance();
            let right = self.multiplicative()?;
            left = Expr::Binary(op, Box::new(left), Box::new(right));
        }
        Ok(left)
    }

    fn multiplicative(&mut self) -> Result<Expr, ParseError> {
        let mut left = self.unary()?;
        loop {
            let op = match self.peek() {
                Tok::Star => BinOp::Mul,
                Tok::Slash => BinOp::Div,
                _ => break,
            };
            self.advance();
            let right = self.unary()?;
            left = Expr::Binary(op, Box::new(left), Box::new(right));
        }
        Ok(left)
    }

    fn unary(&mut self) -> Result<Expr, ParseError> {
        match self.peek() {
            Tok::Bang => {
                self.advance();
                Ok(Expr::Unary(UnOp::Not, Box::new(self.unary()?)))
            }
            Tok::Minus => {
                self.advance();
                Ok(Expr::Unary(UnOp::Neg, Box::new(self.unary()?)))
            }
            _ => self.postfix(),
        }
    }

    fn postfix(&mut self) -> Result<Expr, ParseError> {
        let mut e = self.primary()?;
        loop {
            match self.peek() {
                Tok::Dot => {
                    self.advance();
                    let name = match self.advance().tok {
                        Tok::Ident(n) => n,
                        other => {
                            return Err(ParseError {
                                message: format!("expected property name, found {other:?}"),
                                line: self.line(),
                            })
                        }
                    };
                    e = Expr::Member(Box::new(e), name);
                }
                Tok::LBracket => {
                    self.advance();
                    let idx = self.expr()?;
                    self.expect(&Tok::RBracket)?;
                    e = Expr::Index(Box::new(e), Box::new(idx));
                }
                _ => break,
            }
        }
        Ok(e)
    }

    fn primary(&mut self) -> Result<Expr, ParseError> {
        let line = self.line();
        match self.advance().tok {
            Tok::Int(n) => Ok(Expr::Int(n)),
            Tok::Float(f) => Ok(Expr::Float(f)),
            Tok::Str(s) => Ok(Expr::Str(s)),
            Tok::True => Ok(Expr::Bool(true)),
            Tok::False => Ok(Expr::Bool(false)),
            Tok::None => Ok(Expr::None),
            Tok::LParen => {
                let e = self.expr()?;
                self.expect(&Tok::RParen)?;
                Ok(e)
            }
            Tok::LBracket => {
                let mut items = Vec::new();
                if !self.check(&Tok::RBracket) {
                    items.push(self.expr()?);
                    while self.check(&Tok::Comma) {
                        self.advance();
                        items.push(self.expr()?);
                    }
                }
                self.expect(&Tok::RBracket)?;
                Ok(Expr::List(items))
            }
            Tok::Ident(name) => {
                if self.check(&Tok::LParen) {
                    self.advance();
                    let mut args = Vec::new();
                    if !self.check(&Tok::RParen) {
                        args.push(self.expr()?);
                        while self.check(&Tok::Comma) {
                            self.advance();
                            args.push(self.expr()?);
                        }
                    }
                    self.expect(&Tok::RParen)?;
                    Ok(Expr::Call(name, args))
                } else {
                    Ok(Expr::Ident(name))
                }
            }
            other => Err(ParseError {
                message: format!("unexpected token {other:?}"),
                line,
            }),
        }
    }
}

fn to_lvalue(e: Expr, line: u32) -> Result<LValue, ParseError> {
    match e {
        Expr::Ident(n) => Ok(LValue::Ident(n)),
        Expr::Member(base, name) => Ok(LValue::Member(*base, name)),
        Expr::Index(base, idx) => Ok(LValue::Index(*base, *idx)),
        _ => Err(ParseError {
            message: "invalid assignment target".into(),
            line,
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::lexer::lex;

    fn parse_src(src: &str) -> Program {
        parse(lex(src).unwrap()).unwrap()
    }

    #[test]
    fn parses_return_of_string_literal() {
        let prog = parse_src(r#"return "hi";"#);
        assert_eq!(prog.len(), 1);
        assert!(matches!(prog[0].kind, StmtKind::Return(Some(Expr::Str(_)))));
    }

    #[test]
    fn parses_property_access_chain() {
        let prog = parse_src("return this.name;");
        match &prog[0].kind {
            StmtKind::Return(Some(Expr::Member(base, name))) => {
                assert_eq!(name, "name");
                assert!(matches!(**base, Expr::Ident(ref s) if s == "this"));
            }
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn parses_while_true_empty_body() {
        let prog = parse_src("while (true) {}");
        assert!(matches!(prog[0].kind, StmtKind::While(Expr::Bool(true), ref body) if body.is_empty()));
    }
}
