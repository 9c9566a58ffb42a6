//! Name scopes and the resolution chain.
//!
//! Names resolve against the frame's locals, then the globals, then the
//! builtins. Binding always writes the frame's locals; there is no way
//! to rebind a global from interpreted code.

use std::collections::HashMap;
use std::fmt;

use pyvm_common::Value;

use crate::error::RuntimeError;
use crate::machine::Frame;

/// A name → value mapping.
pub type Namespace = HashMap<String, Value>;

/// A builtin provider that exposes its members by name.
///
/// This is the attribute-style half of the builtin scope: it is consulted
/// before the plain table in [`Builtins`].
pub trait BuiltinModule {
    /// The member called `name`, if the module has one.
    fn member(&self, name: &str) -> Option<Value>;
}

/// The builtin scope: an optional module followed by a plain table.
#[derive(Default)]
pub struct Builtins {
    module: Option<Box<dyn BuiltinModule>>,
    table: Namespace,
}

impl Builtins {
    /// An empty builtin scope.
    pub fn new() -> Self {
        Self::default()
    }

    /// A builtin scope backed by `module`.
    pub fn from_module(module: impl BuiltinModule + 'static) -> Self {
        Self {
            module: Some(Box::new(module)),
            table: Namespace::new(),
        }
    }

    /// Add entries to the plain table.
    pub fn with_table(mut self, table: Namespace) -> Self {
        self.table.extend(table);
        self
    }

    /// Add one entry to the plain table.
    pub fn insert(&mut self, name: impl Into<String>, value: Value) {
        self.table.insert(name.into(), value);
    }

    /// Look a name up: module members first, then the table.
    pub fn lookup(&self, name: &str) -> Option<Value> {
        self.module
            .as_ref()
            .and_then(|module| module.member(name))
            .or_else(|| self.table.get(name).cloned())
    }
}

impl fmt::Debug for Builtins {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Builtins")
            .field("module", &self.module.is_some())
            .field("table", &self.table.keys().collect::<Vec<_>>())
            .finish()
    }
}

impl From<Namespace> for Builtins {
    fn from(table: Namespace) -> Self {
        Self {
            module: None,
            table,
        }
    }
}

impl Frame<'_> {
    /// Resolve `name` through locals, globals and builtins.
    pub(crate) fn resolve(&self, name: &str) -> Result<Value, RuntimeError> {
        self.locals
            .get(name)
            .or_else(|| self.ctx.globals.get(name))
            .cloned()
            .or_else(|| self.ctx.builtins.lookup(name))
            .ok_or_else(|| RuntimeError::UnboundName {
                at: self.current,
                name: name.to_string(),
            })
    }

    /// Bind `name` in the frame's locals.
    pub(crate) fn bind(&mut self, name: &str, value: Value) {
        self.locals.insert(name.to_string(), value);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Answers;

    impl BuiltinModule for Answers {
        fn member(&self, name: &str) -> Option<Value> {
            (name == "answer").then_some(Value::Int(42))
        }
    }

    #[test]
    fn module_members_shadow_the_table() {
        let mut builtins = Builtins::from_module(Answers);
        builtins.insert("answer", Value::Int(0));
        builtins.insert("other", Value::Int(7));
        assert_eq!(builtins.lookup("answer"), Some(Value::Int(42)));
        assert_eq!(builtins.lookup("other"), Some(Value::Int(7)));
        assert_eq!(builtins.lookup("missing"), None);
    }

    #[test]
    fn plain_table_only() {
        let table = Namespace::from([("x".to_string(), Value::from("y"))]);
        let builtins = Builtins::from(table);
        assert_eq!(builtins.lookup("x"), Some(Value::from("y")));
    }
}
