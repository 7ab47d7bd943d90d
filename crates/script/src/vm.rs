use crate::ast::{BinOp, Expr, LValue, Program, StmtKind, UnOp};
use moor_common::{ScriptError, ScriptErrorKind, Value};
use moor_store::model::Object;
use std::collections::{BTreeMap, HashMap};

/// Runtime value the interpreter works with. A superset of the stored
/// `moor_common::Value`: scripts additionally need to hold live object
/// references (`this`, `player`, anything `resolve_object`/`find_object`
/// hands back) so that `.property` access has something to dereference.
#[derive(Clone, Debug)]
pub enum RtValue {
    Scalar(Value),
    Object(Object),
    List(Vec<RtValue>),
    Doc(BTreeMap<String, RtValue>),
}

impl RtValue {
    pub fn str(s: impl Into<String>) -> Self {
        RtValue::Scalar(Value::String(s.into()))
    }

    pub fn truthy(&self) -> bool {
        match self {
            RtValue::Scalar(v) => v.truthy(),
            RtValue::Object(_) => true,
            RtValue::List(l) => !l.is_empty(),
            RtValue::Doc(d) => !d.is_empty(),
        }
    }

    pub fn as_object(&self) -> Option<&Object> {
        match self {
            RtValue::Object(o) => Some(o),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            RtValue::Scalar(Value::String(s)) => Some(s.as_str()),
            _ => None,
        }
    }

    pub fn to_display_string(&self) -> String {
        match self {
            RtValue::Scalar(v) => v.to_string(),
            RtValue::Object(o) => o.name.clone(),
            RtValue::List(items) => items
                .iter()
                .map(|v| v.to_display_string())
                .collect::<Vec<_>>()
                .join(", "),
            RtValue::Doc(_) => "<doc>".to_string(),
        }
    }

    pub fn from_stored(v: Value) -> Self {
        RtValue::Scalar(v)
    }
}

/// The side of a script call the interpreter cannot satisfy on its own:
/// property reads/writes (which need permission checks against the current
/// caller) and builtin invocations (§4.7's curated surface).
pub trait Host {
    fn current_caller(&self) -> &Object;
    fn get_property(&mut self, obj: &Object, name: &str) -> Result<RtValue, ScriptError>;
    fn set_property(&mut self, obj: &Object, name: &str, value: RtValue) -> Result<(), ScriptError>;
    fn call_builtin(&mut self, name: &str, args: Vec<RtValue>) -> Result<RtValue, ScriptError>;
    /// Cooperative cancellation / deadline check (§4.6 Timeout, §5). Called
    /// at every loop iteration and every statement.
    fn check_cancelled(&self) -> Result<(), ScriptError>;
}

pub enum Flow {
    Next,
    Return(RtValue),
}

pub struct Interpreter<'h> {
    host: &'h mut dyn Host,
    vars: HashMap<String, RtValue>,
    source_line_context: String,
}

impl<'h> Interpreter<'h> {
    pub fn new(host: &'h mut dyn Host, globals: HashMap<String, RtValue>, source: &str) -> Self {
        Self {
            host,
            vars: globals,
            source_line_context: source.to_string(),
        }
    }

    pub fn run(&mut self, program: &Program) -> Result<RtValue, ScriptError> {
        match self.run_block(program)? {
            Flow::Return(v) => Ok(v),
            Flow::Next => Ok(RtValue::Scalar(Value::Null)),
        }
    }

    fn run_block(&mut self, stmts: &[crate::ast::Stmt]) -> Result<Flow, ScriptError> {
        for stmt in stmts {
            self.host.check_cancelled()?;
            match &stmt.kind {
                StmtKind::Expr(e) => {
                    self.eval(e).map_err(|e| self.annotate(e, stmt.line))?;
                }
                StmtKind::Return(e) => {
                    let v = match e {
                        Some(e) => self.eval(e).map_err(|e| self.annotate(e, stmt.line))?,
                        None => RtValue::Scalar(Value::Null),
                    };
                    return Ok(Flow::Return(v));
                }
                StmtKind::If(cond, then_branch, else_branch) => {
                    let c = self.eval(cond).map_err(|e| self.annotate(e, stmt.line))?;
                    if c.truthy() {
                        if let Flow::Return(v) = self.run_block(then_branch)? {
                            return Ok(Flow::Return(v));
                        }
                    } else if let Some(eb) = else_branch {
                        if let Flow::Return(v) = self.run_block(eb)? {
                            return Ok(Flow::Return(v));
                        }
                    }
                }
                StmtKind::While(cond, body) => {
                    loop {
                        self.host.check_cancelled()?;
                        let c = self.eval(cond).map_err(|e| self.annotate(e, stmt.line))?;
                        if !c.truthy() {
                            break;
                        }
                        if let Flow::Return(v) = self.run_block(body)? {
                            return Ok(Flow::Return(v));
                        }
                    }
                }
            }
        }
        Ok(Flow::Next)
    }

    fn annotate(&self, mut e: ScriptError, line: u32) -> ScriptError {
        if e.source_snippet.is_none() {
            let snippet = self
                .source_line_context
                .lines()
                .nth((line.saturating_sub(1)) as usize)
                .unwrap_or("")
                .to_string();
            e.source_snippet = Some(format!("line {line}: {snippet}"));
        }
        e
    }

    fn eval(&mut self, expr: &Expr) -> Result<RtValue, ScriptError> {
        match expr {
            Expr::Int(n) => Ok(RtValue::Scalar(Value::Int(*n))),
            Expr::Float(f) => Ok(RtValue::Scalar(Value::Float(*f))),
            Expr::Str(s) => Ok(RtValue::str(s.clone())),
            Expr::Bool(b) => Ok(RtValue::Scalar(Value::Bool(*b))),
            Expr::None => Ok(RtValue::Scalar(Value::Null)),
            Expr::List(items) => {
                let mut out = Vec::with_capacity(items.len());
                for i in items {
                    out.push(self.eval(i)?);
                }
                Ok(RtValue::List(out))
            }
            Expr::Ident(name) => Ok(self.vars.get(name).cloned().unwrap_or(RtValue::Scalar(Value::Null))),
            Expr::Member(base, name) => {
                let base_v = self.eval(base)?;
                self.member_get(&base_v, name)
            }
            Expr::Index(base, idx) => {
                let base_v = self.eval(base)?;
                let idx_v = self.eval(idx)?;
                index_get(&base_v, &idx_v)
            }
            Expr::Call(name, args) => {
                let mut argv = Vec::with_capacity(args.len());
                for a in args {
                    argv.push(self.eval(a)?);
                }
                self.host.call_builtin(name, argv)
            }
            Expr::Unary(op, inner) => {
                let v = self.eval(inner)?;
                match op {
                    UnOp::Not => Ok(RtValue::Scalar(Value::Bool(!v.truthy()))),
                    UnOp::Neg => match v {
                        RtValue::Scalar(Value::Int(n)) => Ok(RtValue::Scalar(Value::Int(-n))),
                        RtValue::Scalar(Value::Float(f)) => Ok(RtValue::Scalar(Value::Float(-f))),
                        _ => Err(ScriptError::new(ScriptErrorKind::Runtime, "cannot negate that value")),
                    },
                }
            }
            Expr::Binary(op, l, r) => {
                if matches!(op, BinOp::And) {
                    let lv = self.eval(l)?;
                    if !lv.truthy() {
                        return Ok(RtValue::Scalar(Value::Bool(false)));
                    }
                    let rv = self.eval(r)?;
                    return Ok(RtValue::Scalar(Value::Bool(rv.truthy())));
                }
                if matches!(op, BinOp::Or) {
                    let lv = self.eval(l)?;
                    if lv.truthy() {
                        return Ok(RtValue::Scalar(Value::Bool(true)));
                    }
                    let rv = self.eval(r)?;
                    return Ok(RtValue::Scalar(Value::Bool(rv.truthy())));
                }
                let lv = self.eval(l)?;
                let rv = self.eval(r)?;
                binary_op(*op, lv, rv)
            }
            Expr::Assign(target, value) => {
                let v = self.eval(value)?;
                self.assign(target, v.clone())?;
                Ok(v)
            }
        }
    }

    fn member_get(&mut self, base: &RtValue, name: &str) -> Result<RtValue, ScriptError> {
        match base {
            RtValue::Object(obj) => self.host.get_property(obj, name),
            RtValue::Doc(map) => Ok(map.get(name).cloned().unwrap_or(RtValue::Scalar(Value::Null))),
            _ => Err(ScriptError::new(
                ScriptErrorKind::Runtime,
                format!("cannot read property {name:?} of a non-object value"),
            )),
        }
    }

    fn assign(&mut self, target: &LValue, value: RtValue) -> Result<(), ScriptError> {
        match target {
            LValue::Ident(name) => {
                self.vars.insert(name.clone(), value);
                Ok(())
            }
            LValue::Member(base, name) => {
                let base_v = self.eval(base)?;
                match base_v {
                    RtValue::Object(obj) => self.host.set_property(&obj, name, value),
                    RtValue::Doc(mut map) => {
                        map.insert(name.clone(), value);
                        self.reassign_base(base, RtValue::Doc(map))
                    }
                    _ => Err(ScriptError::new(
                        ScriptErrorKind::Runtime,
                        "cannot set a property on a non-object value",
                    )),
                }
            }
            LValue::Index(base, idx) => {
                let idx_v = self.eval(idx)?;
                let base_v = self.eval(base)?;
                let updated = index_set(base_v, &idx_v, value)?;
                self.reassign_base(base, updated)
            }
        }
    }

    /// After mutating a copied `Doc`/`List` reached through a base
    /// expression, writes it back if the base is a plain identifier. Nested
    /// containers reached through anything else (e.g. property chains) are
    /// copy-on-write and the mutation is not observable beyond this
    /// expression, matching the value semantics of `moor_common::Value`.
    fn reassign_base(&mut self, base: &Expr, updated: RtValue) -> Result<(), ScriptError> {
        if let Expr::Ident(name) = base {
            self.vars.insert(name.clone(), updated);
        }
        Ok(())
    }
}

fn index_get(base: &RtValue, idx: &RtValue) -> Result<RtValue, ScriptError> {
    match (base, idx) {
        (RtValue::List(items), RtValue::Scalar(Value::Int(i))) => Ok(items
            .get(*i as usize)
            .cloned()
            .unwrap_or(RtValue::Scalar(Value::Null))),
        (RtValue::Doc(map), RtValue::Scalar(Value::String(k))) => {
            Ok(map.get(k).cloned().unwrap_or(RtValue::Scalar(Value::Null)))
        }
        _ => Err(ScriptError::new(ScriptErrorKind::Runtime, "invalid index operation")),
    }
}

fn index_set(base: RtValue, idx: &RtValue, value: RtValue) -> Result<RtValue, ScriptError> {
    match (base, idx) {
        (RtValue::List(mut items), RtValue::Scalar(Value::Int(i))) => {
            let i = *i as usize;
            if i >= items.len() {
                items.resize(i + 1, RtValue::Scalar(Value::Null));
            }
            items[i] = value;
            Ok(RtValue::List(items))
        }
        (RtValue::Doc(mut map), RtValue::Scalar(Value::String(k))) => {
            map.insert(k.clone(), value);
            Ok(RtValue::Doc(map))
        }
        _ => Err(ScriptError::new(ScriptErrorKind::Runtime, "invalid index assignment")),
    }
}

fn binary_op(op: BinOp, l: RtValue, r: RtValue) -> Result<RtValue, ScriptError> {
    use Value::*;
    if matches!(op, BinOp::Eq | BinOp::Ne) {
        let eq = values_equal(&l, &r);
        return Ok(RtValue::Scalar(Bool(if op == BinOp::Eq { eq } else { !eq })));
    }
    match (op, l, r) {
        (BinOp::Add, RtValue::Scalar(String(a)), RtValue::Scalar(b)) => {
            Ok(RtValue::str(format!("{a}{b}")))
        }
        (BinOp::Add, RtValue::Scalar(a), RtValue::Scalar(String(b))) => {
            Ok(RtValue::str(format!("{a}{b}")))
        }
        (BinOp::Add, RtValue::Scalar(Int(a)), RtValue::Scalar(Int(b))) => Ok(RtValue::Scalar(Int(a + b))),
        (BinOp::Add, RtValue::Scalar(Float(a)), RtValue::Scalar(Float(b))) => Ok(RtValue::Scalar(Float(a + b))),
        (BinOp::Sub, RtValue::Scalar(Int(a)), RtValue::Scalar(Int(b))) => Ok(RtValue::Scalar(Int(a - b))),
        (BinOp::Sub, RtValue::Scalar(Float(a)), RtValue::Scalar(Float(b))) => Ok(RtValue::Scalar(Float(a - b))),
        (BinOp::Mul, RtValue::Scalar(Int(a)), RtValue::Scalar(Int(b))) => Ok(RtValue::Scalar(Int(a * b))),
        (BinOp::Mul, RtValue::Scalar(Float(a)), RtValue::Scalar(Float(b))) => Ok(RtValue::Scalar(Float(a * b))),
        (BinOp::Div, RtValue::Scalar(Int(a)), RtValue::Scalar(Int(b))) => {
            if b == 0 {
                Err(ScriptError::new(ScriptErrorKind::Runtime, "division by zero"))
            } else {
                Ok(RtValue::Scalar(Int(a / b)))
            }
        }
        (BinOp::Div, RtValue::Scalar(Float(a)), RtValue::Scalar(Float(b))) => Ok(RtValue::Scalar(Float(a / b))),
        (BinOp::Lt, RtValue::Scalar(Int(a)), RtValue::Scalar(Int(b))) => Ok(RtValue::Scalar(Bool(a < b))),
        (BinOp::Gt, RtValue::Scalar(Int(a)), RtValue::Scalar(Int(b))) => Ok(RtValue::Scalar(Bool(a > b))),
        (BinOp::Le, RtValue::Scalar(Int(a)), RtValue::Scalar(Int(b))) => Ok(RtValue::Scalar(Bool(a <= b))),
        (BinOp::Ge, RtValue::Scalar(Int(a)), RtValue::Scalar(Int(b))) => Ok(RtValue::Scalar(Bool(a >= b))),
        (op, l, r) => Err(ScriptError::new(
            ScriptErrorKind::Runtime,
            format!("unsupported operation {op:?} on {l:?} and {r:?}"),
        )),
    }
}

fn values_equal(l: &RtValue, r: &RtValue) -> bool {
    match (l, r) {
        (RtValue::Scalar(a), RtValue::Scalar(b)) => a == b,
        (RtValue::Object(a), RtValue::Object(b)) => a.id == b.id,
        _ => false,
    }
}
