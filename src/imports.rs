//! Import resolution: sibling `NAME.scr` file, falling back to a
//! preconstructed built-in module, wrapping whatever failure occurs along
//! the way into the caller's own error type.

use std::collections::HashMap;
use std::fs;
use std::path::PathBuf;
use std::rc::Rc;

use log::debug;

use crate::environment::Environment;
use crate::error::RuntimeError;
use crate::lexer::Lexer;
use crate::parser::Parser;
use crate::token::Token;
use crate::value::{Native, Value};

pub struct ImportContext {
    base_dir: PathBuf,
    modules: HashMap<String, Environment>,
}

impl ImportContext {
    pub fn new(base_dir: PathBuf) -> Self {
        Self {
            base_dir,
            modules: HashMap::new(),
        }
    }

    /// Resolves `import NAME;` and records the resulting environment under
    /// `name`: sibling file first, then a built-in module, then an error.
    pub fn load(&mut self, name: &str, token: &Token) -> Result<(), RuntimeError> {
        let env = if let Some(source) = self.read_sibling(name) {
            run_module(name, &source, &self.base_dir, token)?
        } else if let Some(env) = builtin_module(name) {
            env
        } else {
            return Err(RuntimeError::new(
                token,
                format!("Could not find import '{name}'"),
            ));
        };
        self.modules.insert(name.to_string(), env);
        Ok(())
    }

    /// Reads `NAME.member` off a previously imported module.
    pub fn read_member(&self, module: &Token, member: &Token) -> Result<Value, RuntimeError> {
        let env = self
            .modules
            .get(&module.lexeme)
            .ok_or_else(|| RuntimeError::new(module, "Undefined or un-imported module"))?;
        env.get(member)
    }

    fn read_sibling(&self, name: &str) -> Option<String> {
        let path = self.base_dir.join(format!("{name}.scr"));
        fs::read_to_string(path).ok()
    }
}

/// Lexes, parses and runs `source` in a brand new interpreter instance,
/// then hands back its post-execution top-level scope. Any failure inside
/// the nested module is, from the importer's point of view, a single
/// runtime event.
fn run_module(
    name: &str,
    source: &str,
    base_dir: &PathBuf,
    token: &Token,
) -> Result<Environment, RuntimeError> {
    debug!("loading import '{name}'");
    let tokens = Lexer::new(source)
        .lex()
        .map_err(|e| RuntimeError::new(token, format!("in import '{name}': {e}")))?;
    let statements = Parser::new(tokens)
        .parse()
        .map_err(|e| RuntimeError::new(token, format!("in import '{name}': {e}")))?;
    let mut interpreter = crate::interpreter::Interpreter::with_base_dir(base_dir.clone());
    interpreter
        .run(&statements)
        .map_err(|e| RuntimeError::new(token, format!("in import '{name}': {e}")))?;
    Ok(interpreter.environment)
}

fn builtin_module(name: &str) -> Option<Environment> {
    match name {
        "os" => Some(os_module()),
        "io" => Some(io_module()),
        "math" => Some(math_module()),
        _ => None,
    }
}

fn os_module() -> Environment {
    let env = Environment::new();
    env.declare_with("name", Value::string(std::env::consts::OS));
    env
}

fn io_module() -> Environment {
    let env = Environment::new();
    declare_native(&env, "write", 2, |_, args, paren| {
        write_file(args, paren, false)
    });
    declare_native(&env, "append", 2, |_, args, paren| {
        write_file(args, paren, true)
    });
    declare_native(&env, "read", 1, |_, args, paren| {
        let path = expect_string(args, 0, paren)?;
        fs::read_to_string(path.as_ref())
            .map(Value::string)
            .map_err(|e| RuntimeError::new(paren, format!("io.read failed: {e}")))
    });
    env
}

fn write_file(
    args: &[Value],
    paren: &Token,
    append: bool,
) -> Result<Value, RuntimeError> {
    use std::io::Write as _;
    let path = expect_string(args, 0, paren)?;
    let contents = expect_string(args, 1, paren)?;
    let file = fs::OpenOptions::new()
        .write(true)
        .create(true)
        .append(append)
        .truncate(!append)
        .open(path.as_ref());
    let mut file = file.map_err(|e| RuntimeError::new(paren, format!("io write failed: {e}")))?;
    file.write_all(contents.as_bytes())
        .map_err(|e| RuntimeError::new(paren, format!("io write failed: {e}")))?;
    Ok(Value::Null)
}

fn expect_string(args: &[Value], index: usize, paren: &Token) -> Result<Rc<str>, RuntimeError> {
    match &args[index] {
        Value::Str(s) => Ok(s.clone()),
        other => Err(RuntimeError::new(
            paren,
            format!("expected a string argument, got {}", other.type_name()),
        )),
    }
}

fn math_module() -> Environment {
    let env = Environment::new();
    env.declare_with("pi", Value::Number(std::f64::consts::PI));
    env.declare_with("e", Value::Number(std::f64::consts::E));
    declare_native(&env, "sqrt", 1, |_, args, paren| {
        Ok(Value::Number(expect_number(args, 0, paren)?.sqrt()))
    });
    declare_native(&env, "pow", 2, |_, args, paren| {
        let base = expect_number(args, 0, paren)?;
        let exp = expect_number(args, 1, paren)?;
        Ok(Value::Number(base.powf(exp)))
    });
    declare_native(&env, "exp", 1, |_, args, paren| {
        Ok(Value::Number(expect_number(args, 0, paren)?.exp()))
    });
    declare_native(&env, "sin", 1, |_, args, paren| {
        Ok(Value::Number(expect_number(args, 0, paren)?.sin()))
    });
    declare_native(&env, "cos", 1, |_, args, paren| {
        Ok(Value::Number(expect_number(args, 0, paren)?.cos()))
    });
    declare_native(&env, "tan", 1, |_, args, paren| {
        Ok(Value::Number(expect_number(args, 0, paren)?.tan()))
    });
    declare_native(&env, "log", 1, |_, args, paren| {
        Ok(Value::Number(expect_number(args, 0, paren)?.ln()))
    });
    env
}

fn expect_number(args: &[Value], index: usize, paren: &Token) -> Result<f64, RuntimeError> {
    match &args[index] {
        Value::Number(n) => Ok(*n),
        other => Err(RuntimeError::new(
            paren,
            format!("expected a number argument, got {}", other.type_name()),
        )),
    }
}

type NativeFn = fn(
    &mut crate::interpreter::Interpreter,
    &[Value],
    &Token,
) -> Result<Value, RuntimeError>;

fn declare_native(env: &Environment, name: &'static str, arity: usize, func: NativeFn) {
    env.declare_with(name, Value::Callable(Rc::new(Native { name, arity, func })));
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::token::TokenKind;

    fn ident(name: &str) -> Token {
        Token::new(TokenKind::Identifier, name, 1, 1)
    }

    #[test]
    fn math_module_exposes_constants_and_functions() {
        let mut ctx = ImportContext::new(PathBuf::from("."));
        ctx.load("math", &ident("math")).unwrap();
        let pi = ctx.read_member(&ident("math"), &ident("pi")).unwrap();
        assert_eq!(pi, Value::Number(std::f64::consts::PI));
    }

    #[test]
    fn unknown_import_is_a_runtime_error() {
        let mut ctx = ImportContext::new(PathBuf::from("."));
        assert!(ctx.load("does_not_exist", &ident("does_not_exist")).is_err());
    }

    #[test]
    fn reading_an_unimported_module_is_a_runtime_error() {
        let ctx = ImportContext::new(PathBuf::from("."));
        assert!(ctx.read_member(&ident("os"), &ident("name")).is_err());
    }
}
