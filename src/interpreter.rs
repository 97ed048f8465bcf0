//! Tree-walking evaluator: statements and expressions are dispatched by
//! matching directly on the AST, with non-local control transfer carried
//! by the `Flow` return channel instead of host exceptions.

use std::io::{self, Write};
use std::rc::Rc;

use log::{debug, trace};

use crate::ast::{Expression, FunctionLiteral, Literal, Statement};
use crate::environment::Environment;
use crate::error::RuntimeError;
use crate::imports::ImportContext;
use crate::token::{Token, TokenKind};
use crate::value::{call_curried, Function, Native, Value};

/// Non-local control transfer. Loops consume `Break`/`Continue`; function
/// bodies and the top-level driver consume `Return` and convert an escaped
/// `Break`/`Continue` into a `RuntimeError`.
pub enum Flow {
    Normal,
    Return(Value),
    Break,
    Continue,
}

pub struct Interpreter {
    pub globals: Environment,
    pub environment: Environment,
    pub imports: ImportContext,
}

impl Interpreter {
    /// Sibling `NAME.scr` imports resolve relative to the process working
    /// directory, not the running script's own location.
    pub fn new() -> Self {
        let cwd = std::env::current_dir().unwrap_or_else(|_| std::path::PathBuf::from("."));
        Self::with_base_dir(cwd)
    }

    pub fn with_base_dir(base_dir: std::path::PathBuf) -> Self {
        let globals = Environment::new();
        install_globals(&globals);
        let environment = Environment::child_of(&globals);
        Self {
            globals,
            environment,
            imports: ImportContext::new(base_dir),
        }
    }

    /// Runs a full program (top-level statement list). A `break`/
    /// `continue` that survives to here escaped every enclosing loop and
    /// becomes a runtime error.
    pub fn run(&mut self, statements: &[Statement]) -> Result<(), RuntimeError> {
        for statement in statements {
            match self.exec_statement(statement)? {
                Flow::Normal | Flow::Return(_) => {}
                Flow::Break | Flow::Continue => {
                    return Err(escape_error(statement));
                }
            }
        }
        Ok(())
    }

    fn exec_statement(&mut self, statement: &Statement) -> Result<Flow, RuntimeError> {
        match statement {
            Statement::Block(statements) => {
                let scope = Environment::child_of(&self.environment);
                self.exec_block(statements, scope)
            }
            Statement::Expression(expr) => {
                self.eval(expr)?;
                Ok(Flow::Normal)
            }
            Statement::Var(name, initializer) => {
                let value = match initializer {
                    Some(expr) => self.eval(expr)?,
                    None => Value::Null,
                };
                self.environment.declare_with(&name.lexeme, value);
                Ok(Flow::Normal)
            }
            Statement::If {
                condition,
                then_block,
                else_block,
                ..
            } => {
                if self.eval(condition)?.is_truthy() {
                    self.exec_statement(then_block)
                } else {
                    self.exec_statement(else_block)
                }
            }
            Statement::While {
                condition, body, ..
            } => self.exec_while(condition, body),
            Statement::Return(_, expr) => {
                let value = match expr {
                    Some(expr) => self.eval(expr)?,
                    None => Value::Null,
                };
                Ok(Flow::Return(value))
            }
            Statement::Break(_) => Ok(Flow::Break),
            Statement::Continue(_) => Ok(Flow::Continue),
            Statement::Import(name) => {
                self.imports.load(&name.lexeme, name)?;
                Ok(Flow::Normal)
            }
        }
    }

    /// Runs `statements` in `scope`, restoring the previous environment on
    /// every exit path, including an early return or an escaping
    /// break/continue.
    fn exec_block(&mut self, statements: &[Statement], scope: Environment) -> Result<Flow, RuntimeError> {
        let previous = self.environment.clone();
        self.environment = scope;
        let mut result = Ok(Flow::Normal);
        for statement in statements {
            match self.exec_statement(statement) {
                Ok(Flow::Normal) => continue,
                other => {
                    result = other;
                    break;
                }
            }
        }
        self.environment = previous;
        result
    }

    fn exec_while(&mut self, condition: &Expression, body: &Statement) -> Result<Flow, RuntimeError> {
        while self.eval(condition)?.is_truthy() {
            match self.exec_statement(body)? {
                Flow::Normal | Flow::Continue => continue,
                Flow::Break => break,
                Flow::Return(value) => return Ok(Flow::Return(value)),
            }
        }
        Ok(Flow::Normal)
    }

    /// Invokes a user-defined function: a fresh call frame parented to
    /// `globals` (never the call site or definition site), with the
    /// function's own name bound to itself so it can recurse.
    pub fn call_function(
        &mut self,
        def: &Rc<FunctionLiteral>,
        args: Vec<Value>,
    ) -> Result<Value, RuntimeError> {
        let frame = Environment::child_of(&self.globals);
        for (param, value) in def.params.iter().zip(args) {
            frame.declare_with(&param.lexeme, value);
        }
        frame.declare_with(
            &def.name.lexeme,
            Value::Callable(Rc::new(Function { def: def.clone() })),
        );
        debug!("calling function '{}'", def.name.lexeme);
        match self.exec_block(&def.body, frame)? {
            Flow::Normal => Ok(Value::Null),
            Flow::Return(value) => Ok(value),
            Flow::Break | Flow::Continue => {
                Err(RuntimeError::new(&def.name, "Can't break outside a loop"))
            }
        }
    }

    pub fn eval(&mut self, expr: &Expression) -> Result<Value, RuntimeError> {
        match expr {
            Expression::Literal(literal) => self.eval_literal(literal),
            Expression::GetVar(name) => self.environment.get(name),
            Expression::Assign(name, value) => {
                let value = self.eval(value)?;
                self.environment.set(name, value)?;
                Ok(Value::Null)
            }
            Expression::AssignIndex { name, value, index } => {
                self.eval_assign_index(name, value, index)
            }
            Expression::Binary(lhs, op, rhs) => self.eval_binary(lhs, op, rhs),
            Expression::Unary(op, operand) => self.eval_unary(op, operand),
            Expression::Grouping(inner) => self.eval(inner),
            Expression::Call { callee, args, paren } => self.eval_call(callee, args, paren),
            Expression::Index {
                index,
                indexee,
                bracket,
            } => self.eval_index(index, indexee, bracket),
            Expression::List(items) => {
                let mut values = Vec::with_capacity(items.len());
                for item in items {
                    values.push(self.eval(item)?);
                }
                Ok(Value::list(values))
            }
            Expression::ImportAccess { module, member } => {
                self.imports.read_member(module, member)
            }
        }
    }

    fn eval_literal(&mut self, literal: &Literal) -> Result<Value, RuntimeError> {
        Ok(match literal {
            Literal::Number(n) => Value::Number(*n),
            Literal::Bool(b) => Value::Bool(*b),
            Literal::Str(s) => Value::string(s.as_str()),
            Literal::Null => Value::Null,
            Literal::Fn(def) => Value::Callable(Rc::new(Function { def: def.clone() })),
        })
    }

    fn eval_assign_index(
        &mut self,
        name: &Token,
        value: &Expression,
        index: &Expression,
    ) -> Result<Value, RuntimeError> {
        let list = match self.environment.get(name)? {
            Value::List(list) => list,
            other => {
                return Err(RuntimeError::new(
                    name,
                    format!("Cannot index a non-iterable ({})", other.type_name()),
                ))
            }
        };
        let idx = self.eval_index_value(index, name)?;
        let new_value = self.eval(value)?;
        let mut items = list.borrow_mut();
        if idx >= items.len() {
            return Err(RuntimeError::new(name, "Index out of bounds"));
        }
        items[idx] = new_value;
        drop(items);
        Ok(Value::List(list))
    }

    fn eval_index(
        &mut self,
        index: &Expression,
        indexee: &Expression,
        bracket: &Token,
    ) -> Result<Value, RuntimeError> {
        let idx = self.eval_index_value(index, bracket)?;
        let indexee_value = self.eval(indexee)?;
        let list = match indexee_value {
            Value::List(list) => list,
            other => {
                return Err(RuntimeError::new(
                    bracket,
                    format!("Cannot index a non-iterable ({})", other.type_name()),
                ))
            }
        };
        let items = list.borrow();
        items
            .get(idx)
            .cloned()
            .ok_or_else(|| RuntimeError::new(bracket, "Index out of bounds"))
    }

    fn eval_index_value(&mut self, index: &Expression, token: &Token) -> Result<usize, RuntimeError> {
        match self.eval(index)? {
            Value::Number(n) if n >= 0.0 => Ok(n.trunc() as usize),
            _ => Err(RuntimeError::new(token, "Index must be a non-negative number")),
        }
    }

    fn eval_call(
        &mut self,
        callee: &Expression,
        args: &[Expression],
        paren: &Token,
    ) -> Result<Value, RuntimeError> {
        let callee_value = self.eval(callee)?;
        let callable = match callee_value {
            Value::Callable(c) => c,
            other => {
                return Err(RuntimeError::new(
                    paren,
                    format!("'{}' is not callable", other.type_name()),
                ))
            }
        };
        let mut arg_values = Vec::with_capacity(args.len());
        for arg in args {
            arg_values.push(self.eval(arg)?);
        }
        call_curried(callable, self, arg_values, paren)
    }

    fn eval_unary(&mut self, op: &Token, operand: &Expression) -> Result<Value, RuntimeError> {
        let value = self.eval(operand)?;
        match (op.kind, &value) {
            (TokenKind::Minus, Value::Number(n)) => Ok(Value::Number(-n)),
            (TokenKind::Not, Value::Bool(b)) => Ok(Value::Bool(!b)),
            (TokenKind::Minus, _) => Err(RuntimeError::new(op, "Operand must be a number")),
            (TokenKind::Not, _) => Err(RuntimeError::new(op, "Operand must be a boolean")),
            _ => unreachable!("parser only produces Unary with '-' or '!'"),
        }
    }

    fn eval_binary(
        &mut self,
        lhs: &Expression,
        op: &Token,
        rhs: &Expression,
    ) -> Result<Value, RuntimeError> {
        // `&` and `|` always evaluate both operands; no short-circuit, so
        // they're evaluated the same way as every other binary operator.
        let left = self.eval(lhs)?;
        let right = self.eval(rhs)?;
        match op.kind {
            TokenKind::Plus => eval_plus(&left, &right, op),
            TokenKind::Minus => numeric(&left, &right, op, |a, b| a - b),
            TokenKind::Star => numeric(&left, &right, op, |a, b| a * b),
            TokenKind::Slash => numeric(&left, &right, op, |a, b| a / b),
            TokenKind::Percent => numeric(&left, &right, op, |a, b| a % b),
            TokenKind::Less => compare(&left, &right, op, |a, b| a < b),
            TokenKind::LessEqual => compare(&left, &right, op, |a, b| a <= b),
            TokenKind::Greater => compare(&left, &right, op, |a, b| a > b),
            TokenKind::GreaterEqual => compare(&left, &right, op, |a, b| a >= b),
            TokenKind::EqualEqual => Ok(Value::Bool(left == right)),
            TokenKind::NotEqual => Ok(Value::Bool(left != right)),
            TokenKind::And => boolean(&left, &right, op, |a, b| a && b),
            TokenKind::Or => boolean(&left, &right, op, |a, b| a || b),
            _ => unreachable!("parser only produces Binary with a binary operator token"),
        }
    }
}

impl Default for Interpreter {
    fn default() -> Self {
        Self::new()
    }
}

fn escape_error(statement: &Statement) -> RuntimeError {
    let token = match statement {
        Statement::Break(t) | Statement::Continue(t) => t.clone(),
        _ => Token::new(TokenKind::Eof, "", 0, 0),
    };
    RuntimeError::new(&token, "Can't break outside a loop")
}

fn eval_plus(left: &Value, right: &Value, op: &Token) -> Result<Value, RuntimeError> {
    match (left, right) {
        (Value::Number(a), Value::Number(b)) => Ok(Value::Number(a + b)),
        (Value::List(a), Value::List(b)) => {
            let mut items = a.borrow().clone();
            items.extend(b.borrow().iter().cloned());
            Ok(Value::list(items))
        }
        (Value::Str(_), _) | (_, Value::Str(_)) => {
            Ok(Value::string(format!("{left}{right}")))
        }
        _ => Err(RuntimeError::new(
            op,
            "Operands must be two numbers, two strings, or two lists",
        )),
    }
}

fn numeric(
    left: &Value,
    right: &Value,
    op: &Token,
    f: impl Fn(f64, f64) -> f64,
) -> Result<Value, RuntimeError> {
    match (left, right) {
        (Value::Number(a), Value::Number(b)) => Ok(Value::Number(f(*a, *b))),
        _ => Err(RuntimeError::new(op, "Operands must be numbers")),
    }
}

fn compare(
    left: &Value,
    right: &Value,
    op: &Token,
    f: impl Fn(f64, f64) -> bool,
) -> Result<Value, RuntimeError> {
    match (left, right) {
        (Value::Number(a), Value::Number(b)) => Ok(Value::Bool(f(*a, *b))),
        _ => Err(RuntimeError::new(op, "Operands must be numbers")),
    }
}

fn boolean(
    left: &Value,
    right: &Value,
    op: &Token,
    f: impl Fn(bool, bool) -> bool,
) -> Result<Value, RuntimeError> {
    match (left, right) {
        (Value::Bool(a), Value::Bool(b)) => Ok(Value::Bool(f(*a, *b))),
        _ => Err(RuntimeError::new(op, "Operands must be booleans")),
    }
}

/// Builds a fresh globals scope, one per interpreter instance rather than
/// shared at process scope, so every nested import gets its own world.
fn install_globals(globals: &Environment) {
    globals.declare_with("VERSION", Value::string("0.0.1"));
    native(globals, "print", 1, native_print);
    native(globals, "printRaw", 1, native_print_raw);
    native(globals, "input", 0, native_input);
    native(globals, "len", 1, native_len);
}

type NativeFn = fn(&mut Interpreter, &[Value], &Token) -> Result<Value, RuntimeError>;

fn native(env: &Environment, name: &'static str, arity: usize, func: NativeFn) {
    env.declare_with(
        name,
        Value::Callable(Rc::new(Native { name, arity, func })),
    );
}

fn native_print(_: &mut Interpreter, args: &[Value], _paren: &Token) -> Result<Value, RuntimeError> {
    println!("{}", args[0]);
    Ok(Value::Null)
}

fn native_print_raw(_: &mut Interpreter, args: &[Value], _paren: &Token) -> Result<Value, RuntimeError> {
    print!("{}", args[0]);
    io::stdout().flush().ok();
    Ok(Value::Null)
}

fn native_input(_: &mut Interpreter, _args: &[Value], paren: &Token) -> Result<Value, RuntimeError> {
    use std::io::Read;
    let mut buf = Vec::new();
    let stdin = io::stdin();
    let mut handle = stdin.lock();
    let mut byte = [0u8; 1];
    // Skip leading whitespace, then read one whitespace-delimited token.
    loop {
        match handle.read(&mut byte) {
            Ok(0) => break,
            Ok(_) if byte[0].is_ascii_whitespace() => continue,
            Ok(_) => {
                buf.push(byte[0]);
                break;
            }
            Err(e) => return Err(RuntimeError::new(paren, format!("input() failed: {e}"))),
        }
    }
    loop {
        match handle.read(&mut byte) {
            Ok(0) => break,
            Ok(_) if byte[0].is_ascii_whitespace() => break,
            Ok(_) => buf.push(byte[0]),
            Err(e) => return Err(RuntimeError::new(paren, format!("input() failed: {e}"))),
        }
    }
    trace!("input() read {} bytes", buf.len());
    Ok(Value::string(String::from_utf8_lossy(&buf).into_owned()))
}

fn native_len(_: &mut Interpreter, args: &[Value], paren: &Token) -> Result<Value, RuntimeError> {
    match &args[0] {
        Value::List(items) => Ok(Value::Number(items.borrow().len() as f64)),
        Value::Str(s) => Ok(Value::Number(s.chars().count() as f64)),
        other => Err(RuntimeError::new(
            paren,
            format!("len() expects a list or string, got {}", other.type_name()),
        )),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::lexer::Lexer;
    use crate::parser::Parser;

    fn run(source: &str) -> Interpreter {
        let tokens = Lexer::new(source).lex().unwrap();
        let statements = Parser::new(tokens).parse().unwrap();
        let mut interpreter = Interpreter::new();
        interpreter.run(&statements).unwrap();
        interpreter
    }

    fn run_fails(source: &str) -> RuntimeError {
        let tokens = Lexer::new(source).lex().unwrap();
        let statements = Parser::new(tokens).parse().unwrap();
        let mut interpreter = Interpreter::new();
        interpreter.run(&statements).unwrap_err()
    }

    #[test]
    fn arithmetic_precedence() {
        let interp = run("var x = 1 + 2 * 3;");
        assert_eq!(
            interp.environment.get_by_name("x"),
            Some(Value::Number(7.0))
        );
    }

    #[test]
    fn recursive_factorial() {
        let interp = run(
            "fn fact(n) { if n == 0 { return 1; } return n * fact(n - 1); } var r = fact(5);",
        );
        assert_eq!(
            interp.environment.get_by_name("r"),
            Some(Value::Number(120.0))
        );
    }

    #[test]
    fn currying_binds_leading_arguments() {
        let interp = run(
            "fn add(a, b) { return a + b; } var inc = add(1); var r = inc(41);",
        );
        assert_eq!(
            interp.environment.get_by_name("r"),
            Some(Value::Number(42.0))
        );
    }

    #[test]
    fn index_assignment_mutates_in_place() {
        let interp = run("var xs = [1, 2, 3]; xs[1] = 99;");
        match interp.environment.get_by_name("xs") {
            Some(Value::List(items)) => {
                assert_eq!(items.borrow()[1], Value::Number(99.0));
            }
            other => panic!("expected list, got {other:?}"),
        }
    }

    #[test]
    fn loop_with_break() {
        let interp = run("var i = 0; loop { if i == 3 { break; } i = i + 1; }");
        assert_eq!(
            interp.environment.get_by_name("i"),
            Some(Value::Number(3.0))
        );
    }

    #[test]
    fn break_outside_loop_is_a_runtime_error() {
        let err = run_fails("break;");
        assert!(err.message.contains("break outside a loop"));
    }

    #[test]
    fn over_application_is_a_runtime_error() {
        let err = run_fails("print(1, 2);");
        assert!(err.message.contains("Incorrect argument count"));
    }

    #[test]
    fn indexing_a_non_list_is_a_runtime_error() {
        let err = run_fails("var a = 1; var b = a[0];");
        assert!(err.message.contains("Cannot index a non-iterable"));
    }

    #[test]
    fn function_scope_does_not_capture_definition_site() {
        let err = run_fails(
            "var outer = 1; fn f() { return outer; } var r = f();",
        );
        assert!(err.message.contains("Undefined variable"));
    }

    #[test]
    fn string_concatenation_stringifies_both_sides() {
        let interp = run("var s = \"n=\" + 5;");
        assert_eq!(
            interp.environment.get_by_name("s"),
            Some(Value::string("n=5"))
        );
    }

    #[test]
    fn logical_operators_do_not_short_circuit_type_errors() {
        // Both sides must be booleans even though the left side alone
        // would determine the boolean result for `|`.
        let err = run_fails("var r = true | 1;");
        assert!(err.message.contains("booleans"));
    }
}
