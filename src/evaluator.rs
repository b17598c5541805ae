use std::fmt;

use thiserror::Error;
use tracing::trace;

use crate::ast::{BinaryOp, Expr, Program, Stmt, UnaryOp};
use crate::environment::Environment;

#[derive(Debug, Clone)]
pub enum Value {
    Int(i64),
    Bool(bool),
    Str(String),
    Nil,
    Function(FunctionValue),
    Builtin(BuiltinFunction),
}

#[derive(Debug, Clone)]
pub struct FunctionValue {
    pub params: Vec<String>,
    pub body: Vec<Stmt>,
    pub env: Environment,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BuiltinFunction {
    Len,
}

impl BuiltinFunction {
    pub fn name(self) -> &'static str {
        match self {
            BuiltinFunction::Len => "len",
        }
    }
}

fn lookup_builtin(name: &str) -> Option<BuiltinFunction> {
    match name {
        "len" => Some(BuiltinFunction::Len),
        _ => None,
    }
}

const BUILTIN_NAMES: &[&str] = &["len"];

impl Value {
    pub fn type_name(&self) -> &'static str {
        match self {
            Value::Int(_) => "int",
            Value::Bool(_) => "bool",
            Value::Str(_) => "string",
            Value::Nil => "nil",
            Value::Function(_) => "function",
            Value::Builtin(_) => "builtin",
        }
    }
}

impl PartialEq for Value {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Value::Int(a), Value::Int(b)) => a == b,
            (Value::Bool(a), Value::Bool(b)) => a == b,
            (Value::Str(a), Value::Str(b)) => a == b,
            (Value::Builtin(a), Value::Builtin(b)) => a == b,
            (Value::Nil, Value::Nil) => true,
            // Two function values are never the same function.
            _ => false,
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Int(n) => write!(f, "{}", n),
            Value::Bool(b) => write!(f, "{}", b),
            Value::Str(s) => write!(f, "{}", s),
            Value::Nil => write!(f, "nil"),
            Value::Function(func) => write!(f, "<function/{}>", func.params.len()),
            Value::Builtin(builtin) => write!(f, "<builtin {}>", builtin.name()),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RuntimeError {
    #[error("TypeError: {0}")]
    Type(String),
    #[error("NameError: {0}")]
    Name(String),
    #[error("InternalError: {0}")]
    Internal(String),
}

/// Result of evaluating a statement or expression. `Return` carries a
/// `return` value upward through blocks until the program root or a
/// function application unwraps it; it never escapes the crate.
#[derive(Debug, Clone)]
enum EvalFlow {
    Value(Value),
    Return(Value),
}

const MAX_CALL_DEPTH: usize = 512;

pub struct Evaluator {
    env: Environment,
    call_depth: usize,
}

impl Evaluator {
    pub fn new() -> Self {
        Self::with_env(Environment::new())
    }

    pub fn with_env(env: Environment) -> Self {
        Self { env, call_depth: 0 }
    }

    pub fn eval_program(&mut self, program: &Program) -> Result<Value, RuntimeError> {
        match self.eval_statements(&program.statements)? {
            EvalFlow::Value(value) => Ok(value),
            // A top-level `return` ends the program with its value.
            EvalFlow::Return(value) => Ok(value),
        }
    }

    fn eval_statements(&mut self, statements: &[Stmt]) -> Result<EvalFlow, RuntimeError> {
        let mut last = Value::Nil;

        for stmt in statements {
            match self.eval_stmt(stmt)? {
                EvalFlow::Value(value) => last = value,
                flow @ EvalFlow::Return(_) => return Ok(flow),
            }
        }

        Ok(EvalFlow::Value(last))
    }

    fn eval_stmt(&mut self, stmt: &Stmt) -> Result<EvalFlow, RuntimeError> {
        match stmt {
            Stmt::Let { name, value } => {
                let value = match self.eval_expr(value)? {
                    EvalFlow::Value(value) => value,
                    flow @ EvalFlow::Return(_) => return Ok(flow),
                };

                if self.env.is_defined(name) {
                    return Err(RuntimeError::Name(format!("'{name}' is already defined")));
                }

                self.env.define(name.clone(), value);
                Ok(EvalFlow::Value(Value::Nil))
            }
            Stmt::Return(expr) => {
                let value = match self.eval_expr(expr)? {
                    EvalFlow::Value(value) => value,
                    flow @ EvalFlow::Return(_) => return Ok(flow),
                };
                Ok(EvalFlow::Return(value))
            }
            Stmt::Expr(expr) => self.eval_expr(expr),
            Stmt::Block(statements) => self.eval_statements(statements),
        }
    }

    fn eval_expr(&mut self, expr: &Expr) -> Result<EvalFlow, RuntimeError> {
        match expr {
            Expr::Ident(name) => self.eval_ident(name).map(EvalFlow::Value),
            Expr::Int(value) => Ok(EvalFlow::Value(Value::Int(*value))),
            Expr::Bool(value) => Ok(EvalFlow::Value(Value::Bool(*value))),
            Expr::Str(text) => Ok(EvalFlow::Value(Value::Str(text.clone()))),
            Expr::Unary { op, expr } => {
                let value = match self.eval_expr(expr)? {
                    EvalFlow::Value(value) => value,
                    flow @ EvalFlow::Return(_) => return Ok(flow),
                };
                eval_unary(*op, value).map(EvalFlow::Value)
            }
            Expr::Binary { op, left, right } => {
                let left = match self.eval_expr(left)? {
                    EvalFlow::Value(value) => value,
                    flow @ EvalFlow::Return(_) => return Ok(flow),
                };
                let right = match self.eval_expr(right)? {
                    EvalFlow::Value(value) => value,
                    flow @ EvalFlow::Return(_) => return Ok(flow),
                };
                eval_binary(*op, left, right).map(EvalFlow::Value)
            }
            Expr::If {
                condition,
                consequence,
                alternative,
            } => {
                let condition = match self.eval_expr(condition)? {
                    EvalFlow::Value(value) => value,
                    flow @ EvalFlow::Return(_) => return Ok(flow),
                };

                let Value::Bool(condition) = condition else {
                    return Err(RuntimeError::Type(format!(
                        "if condition must evaluate to bool: '{}'",
                        condition.type_name()
                    )));
                };

                if condition {
                    self.eval_statements(consequence)
                } else if let Some(alternative) = alternative {
                    self.eval_statements(alternative)
                } else {
                    Ok(EvalFlow::Value(Value::Nil))
                }
            }
            Expr::Function { params, body } => {
                Ok(EvalFlow::Value(Value::Function(FunctionValue {
                    params: params.clone(),
                    body: body.clone(),
                    env: self.env.clone(),
                })))
            }
            Expr::Call { callee, args } => {
                let callee = match self.eval_expr(callee)? {
                    EvalFlow::Value(value) => value,
                    flow @ EvalFlow::Return(_) => return Ok(flow),
                };

                let mut values = Vec::with_capacity(args.len());
                for arg in args {
                    match self.eval_expr(arg)? {
                        EvalFlow::Value(value) => values.push(value),
                        flow @ EvalFlow::Return(_) => return Ok(flow),
                    }
                }

                self.eval_call(callee, values).map(EvalFlow::Value)
            }
            Expr::Assign { name, value } => {
                let value = match self.eval_expr(value)? {
                    EvalFlow::Value(value) => value,
                    flow @ EvalFlow::Return(_) => return Ok(flow),
                };

                if !self.env.update(name, &value) {
                    return Err(RuntimeError::Name(format!("'{name}' is not defined")));
                }

                Ok(EvalFlow::Value(Value::Nil))
            }
        }
    }

    fn eval_ident(&self, name: &str) -> Result<Value, RuntimeError> {
        if let Some(value) = self.env.get(name) {
            return Ok(value);
        }

        // User bindings shadow builtins, so the table is only consulted
        // after the chain lookup fails.
        if let Some(builtin) = lookup_builtin(name) {
            return Ok(Value::Builtin(builtin));
        }

        Err(self.unknown_name_error(name))
    }

    fn eval_call(&mut self, callee: Value, args: Vec<Value>) -> Result<Value, RuntimeError> {
        match callee {
            Value::Function(function) => {
                if function.params.len() != args.len() {
                    return Err(RuntimeError::Type(format!(
                        "function expected {} argument(s), got {}",
                        function.params.len(),
                        args.len()
                    )));
                }

                if self.call_depth >= MAX_CALL_DEPTH {
                    return Err(RuntimeError::Internal(format!(
                        "call depth exceeded limit ({MAX_CALL_DEPTH})"
                    )));
                }

                trace!(depth = self.call_depth, "applying function");

                // The call frame encloses the closure's captured
                // environment, never the caller's.
                self.call_depth += 1;
                let caller_env = self.env.clone();
                self.env = Environment::new_enclosed(function.env.clone());

                for (param, arg) in function.params.iter().zip(args) {
                    self.env.define(param.clone(), arg);
                }

                let result = self.eval_statements(&function.body);
                self.env = caller_env;
                self.call_depth -= 1;

                match result? {
                    EvalFlow::Value(value) => Ok(value),
                    EvalFlow::Return(value) => Ok(value),
                }
            }
            Value::Builtin(builtin) => eval_builtin_call(builtin, args),
            other => Err(RuntimeError::Internal(format!(
                "cannot apply '{}' as a function",
                other.type_name()
            ))),
        }
    }

    fn unknown_name_error(&self, name: &str) -> RuntimeError {
        let mut candidates = self.env.visible_names();
        candidates.extend(BUILTIN_NAMES.iter().map(|s| s.to_string()));

        match suggest_name(name, &candidates) {
            Some(suggestion) => RuntimeError::Name(format!(
                "'{name}' is not defined (did you mean '{suggestion}'?)"
            )),
            None => RuntimeError::Name(format!("'{name}' is not defined")),
        }
    }
}

impl Default for Evaluator {
    fn default() -> Self {
        Self::new()
    }
}

fn eval_unary(op: UnaryOp, value: Value) -> Result<Value, RuntimeError> {
    match (op, value) {
        (UnaryOp::Neg, Value::Int(n)) => n
            .checked_neg()
            .map(Value::Int)
            .ok_or_else(|| RuntimeError::Type("integer overflow".into())),
        (UnaryOp::Not, Value::Bool(b)) => Ok(Value::Bool(!b)),
        (op, value) => Err(RuntimeError::Type(format!(
            "bad operand type for unary {op}: '{}'",
            value.type_name()
        ))),
    }
}

fn eval_binary(op: BinaryOp, left: Value, right: Value) -> Result<Value, RuntimeError> {
    match (left, right) {
        (Value::Int(a), Value::Int(b)) => eval_binary_int(op, a, b),
        (Value::Bool(a), Value::Bool(b)) => eval_binary_bool(op, a, b),
        (Value::Str(a), Value::Str(b)) => eval_binary_str(op, a, b),
        (left, right) => Err(unsupported_operands(op, &left, &right)),
    }
}

fn eval_binary_int(op: BinaryOp, a: i64, b: i64) -> Result<Value, RuntimeError> {
    let overflow = || RuntimeError::Type("integer overflow".into());

    match op {
        BinaryOp::Add => a.checked_add(b).map(Value::Int).ok_or_else(overflow),
        BinaryOp::Sub => a.checked_sub(b).map(Value::Int).ok_or_else(overflow),
        BinaryOp::Mul => a.checked_mul(b).map(Value::Int).ok_or_else(overflow),
        BinaryOp::Div => {
            if b == 0 {
                return Err(RuntimeError::Type("division by zero".into()));
            }
            a.checked_div(b).map(Value::Int).ok_or_else(overflow)
        }
        BinaryOp::Lt => Ok(Value::Bool(a < b)),
        BinaryOp::Gt => Ok(Value::Bool(a > b)),
        BinaryOp::Eq => Ok(Value::Bool(a == b)),
        BinaryOp::NotEq => Ok(Value::Bool(a != b)),
    }
}

fn eval_binary_bool(op: BinaryOp, a: bool, b: bool) -> Result<Value, RuntimeError> {
    match op {
        BinaryOp::Eq => Ok(Value::Bool(a == b)),
        BinaryOp::NotEq => Ok(Value::Bool(a != b)),
        _ => Err(unsupported_operands(op, &Value::Bool(a), &Value::Bool(b))),
    }
}

fn eval_binary_str(op: BinaryOp, a: String, b: String) -> Result<Value, RuntimeError> {
    match op {
        BinaryOp::Add => Ok(Value::Str(a + &b)),
        _ => Err(unsupported_operands(op, &Value::Str(a), &Value::Str(b))),
    }
}

fn unsupported_operands(op: BinaryOp, left: &Value, right: &Value) -> RuntimeError {
    RuntimeError::Type(format!(
        "unsupported operand type(s) for '{op}': '{}' and '{}'",
        left.type_name(),
        right.type_name()
    ))
}

fn eval_builtin_call(builtin: BuiltinFunction, args: Vec<Value>) -> Result<Value, RuntimeError> {
    match builtin {
        BuiltinFunction::Len => eval_builtin_len(args),
    }
}

fn eval_builtin_len(args: Vec<Value>) -> Result<Value, RuntimeError> {
    if args.len() != 1 {
        return Err(RuntimeError::Type(format!(
            "len expected 1 argument(s), got {}",
            args.len()
        )));
    }

    match &args[0] {
        Value::Str(text) => Ok(Value::Int(text.len() as i64)),
        other => Err(RuntimeError::Type(format!(
            "unsupported argument to len: '{}'",
            other.type_name()
        ))),
    }
}

// A suggestion is only worth showing when it is close: one edit per
// four characters of the name, never fewer than two.
fn suggest_name<'a>(name: &str, candidates: &'a [String]) -> Option<&'a String> {
    let cutoff = (name.chars().count() / 4).max(2);

    candidates
        .iter()
        .map(|candidate| (edit_distance(name, candidate), candidate))
        .filter(|(distance, _)| *distance <= cutoff)
        .min_by_key(|(distance, _)| *distance)
        .map(|(_, candidate)| candidate)
}

// Levenshtein distance over a single row, carrying the diagonal cell
// through the inner loop.
fn edit_distance(a: &str, b: &str) -> usize {
    let b = b.chars().collect::<Vec<_>>();
    let mut row = (0..=b.len()).collect::<Vec<usize>>();

    for (i, ch_a) in a.chars().enumerate() {
        let mut diagonal = row[0];
        row[0] = i + 1;

        for (j, ch_b) in b.iter().enumerate() {
            let substitute = diagonal + usize::from(ch_a != *ch_b);
            diagonal = row[j + 1];
            row[j + 1] = substitute.min(row[j] + 1).min(diagonal + 1);
        }
    }

    row[b.len()]
}
