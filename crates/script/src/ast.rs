/// The verb/function scripting language's syntax tree. Deliberately small:
/// spec.md §1 explicitly disclaims reproducing any specific host language's
/// scripting surface, so this is a minimal statement language (assignment,
/// `if`/`while`, builtin calls, property access) sufficient to express
/// every contract the spec's scenarios (§8, S1-S6) require of a verb body.
#[derive(Clone, Debug, PartialEq)]
pub enum Expr {
    Int(i64),
    Float(f64),
    Str(String),
    Bool(bool),
    None,
    Ident(String),
    Member(Box<Expr>, String),
    Index(Box<Expr>, Box<Expr>),
    Call(String, Vec<Expr>),
    List(Vec<Expr>),
    Unary(UnOp, Box<Expr>),
    Binary(BinOp, Box<Expr>, Box<Expr>),
    Assign(Box<LValue>, Box<Expr>),
}

#[derive(Clone, Debug, PartialEq)]
pub enum LValue {
    Ident(String),
    Member(Expr, String),
    Index(Expr, Expr),
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum UnOp {
    Neg,
    Not,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum BinOp {
    Add,
    Sub,
    Mul,
    Div,
    Eq,
    Ne,
    Lt,
    Gt,
    Le,
    Ge,
    And,
    Or,
}

#[derive(Clone, Debug, PartialEq)]
pub enum StmtKind {
    Expr(Expr),
    If(Expr, Vec<Stmt>, Option<Vec<Stmt>>),
    While(Expr, Vec<Stmt>),
    Return(Option<Expr>),
}

/// A statement tagged with its 1-based source line, so runtime errors can
/// report where in `source` they happened (§4.6 "derived ... by position
/// within `source`").
#[derive(Clone, Debug, PartialEq)]
pub struct Stmt {
    pub kind: StmtKind,
    pub line: u32,
}

pub type Program = Vec<Stmt>;
