//! Chained-scope environment. Scopes are threaded through explicit parent
//! pointers rather than a single shared stack, since the evaluator needs
//! to hold onto a finished module's top-level scope after the block that
//! created it has gone out of dynamic extent (import-time evaluation),
//! which a shared stack can't express.

use std::cell::RefCell;
use std::collections::HashMap;
use std::rc::Rc;

use crate::error::RuntimeError;
use crate::token::Token;
use crate::value::Value;

#[derive(Clone)]
pub struct Environment(Rc<RefCell<EnvironmentData>>);

struct EnvironmentData {
    values: HashMap<String, Value>,
    parent: Option<Environment>,
}

impl Environment {
    pub fn new() -> Self {
        Self(Rc::new(RefCell::new(EnvironmentData {
            values: HashMap::new(),
            parent: None,
        })))
    }

    pub fn child_of(parent: &Environment) -> Self {
        Self(Rc::new(RefCell::new(EnvironmentData {
            values: HashMap::new(),
            parent: Some(parent.clone()),
        })))
    }

    /// Declares `name` in the current scope only, initialized to `null`.
    pub fn declare(&self, name: &str) {
        self.0
            .borrow_mut()
            .values
            .insert(name.to_string(), Value::Null);
    }

    pub fn declare_with(&self, name: &str, value: Value) {
        self.0.borrow_mut().values.insert(name.to_string(), value);
    }

    pub fn get(&self, token: &Token) -> Result<Value, RuntimeError> {
        let data = self.0.borrow();
        if let Some(value) = data.values.get(&token.lexeme) {
            return Ok(value.clone());
        }
        match &data.parent {
            Some(parent) => parent.get(token),
            None => Err(RuntimeError::new(
                token,
                format!("Undefined variable '{}'", token.lexeme),
            )),
        }
    }

    pub fn get_by_name(&self, name: &str) -> Option<Value> {
        let data = self.0.borrow();
        if let Some(value) = data.values.get(name) {
            return Some(value.clone());
        }
        data.parent.as_ref().and_then(|p| p.get_by_name(name))
    }

    /// Writes at the first scope in the chain that already declares
    /// `name`; fails if no scope declares it.
    pub fn set(&self, token: &Token, value: Value) -> Result<(), RuntimeError> {
        let mut data = self.0.borrow_mut();
        if data.values.contains_key(&token.lexeme) {
            data.values.insert(token.lexeme.clone(), value);
            return Ok(());
        }
        match &data.parent {
            Some(parent) => {
                let parent = parent.clone();
                drop(data);
                parent.set(token, value)
            }
            None => Err(RuntimeError::new(
                token,
                format!("Undefined variable '{}'", token.lexeme),
            )),
        }
    }
}

impl Default for Environment {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::token::TokenKind;

    fn ident(name: &str) -> Token {
        Token::new(TokenKind::Identifier, name, 1, 1)
    }

    #[test]
    fn get_walks_parent_chain() {
        let parent = Environment::new();
        parent.declare_with("x", Value::Number(1.0));
        let child = Environment::child_of(&parent);
        assert_eq!(child.get(&ident("x")).unwrap(), Value::Number(1.0));
    }

    #[test]
    fn get_fails_when_undeclared_anywhere() {
        let env = Environment::new();
        assert!(env.get(&ident("missing")).is_err());
    }

    #[test]
    fn set_writes_to_the_declaring_scope() {
        let parent = Environment::new();
        parent.declare_with("x", Value::Number(1.0));
        let child = Environment::child_of(&parent);
        child.set(&ident("x"), Value::Number(2.0)).unwrap();
        assert_eq!(parent.get(&ident("x")).unwrap(), Value::Number(2.0));
    }

    #[test]
    fn set_fails_when_no_scope_declares_the_name() {
        let env = Environment::new();
        assert!(env.set(&ident("missing"), Value::Null).is_err());
    }

    #[test]
    fn declare_only_touches_current_scope() {
        let parent = Environment::new();
        let child = Environment::child_of(&parent);
        child.declare("local");
        assert!(parent.get_by_name("local").is_none());
        assert_eq!(child.get(&ident("local")).unwrap(), Value::Null);
    }
}
