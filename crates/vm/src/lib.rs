//! pyvm execution engine: runs decoded instruction streams.
//!
//! The engine is a stack machine with:
//! - An operand stack per frame
//! - Local names per frame, resolved before globals and builtins
//! - Loop blocks for SETUP_LOOP / POP_BLOCK / BREAK_LOOP
//! - Nested frames for calls into interpreted code
//!
//! # Usage
//!
//! ```
//! use pyvm_common::{InstructionStream, OpCode, Operand, Value};
//! use pyvm_vm::Vm;
//!
//! let code = InstructionStream::from_ops(vec![
//!     (OpCode::LoadConst, Some(Operand::Const(Value::Int(40)))),
//!     (OpCode::LoadConst, Some(Operand::Const(Value::Int(2)))),
//!     (OpCode::BinaryAdd, None),
//!     (OpCode::ReturnValue, None),
//! ]);
//!
//! let result = Vm::new().eval(&code).unwrap();
//! assert_eq!(result, Value::Int(42));
//! ```

pub mod builtins;
pub mod call;
pub mod config;
pub mod error;
pub mod execute;
pub mod machine;
pub mod scope;

pub use builtins::{standard_builtins, StandardBuiltins};
pub use config::VmConfig;
pub use error::RuntimeError;
pub use machine::{Context, Frame, LoopBlock, Step};
pub use scope::{BuiltinModule, Builtins, Namespace};

use pyvm_common::{InstructionStream, Value};

/// Owner of the state every frame reads: globals, builtins and limits.
#[derive(Debug)]
pub struct Vm {
    globals: Namespace,
    builtins: Builtins,
    config: VmConfig,
}

impl Default for Vm {
    fn default() -> Self {
        Self::new()
    }
}

impl Vm {
    /// A VM with no globals and the standard builtins.
    pub fn new() -> Self {
        Self {
            globals: Namespace::new(),
            builtins: standard_builtins(),
            config: VmConfig::default(),
        }
    }

    /// Replace the global names.
    pub fn with_globals(mut self, globals: Namespace) -> Self {
        self.globals = globals;
        self
    }

    /// Replace the builtin scope.
    pub fn with_builtins(mut self, builtins: Builtins) -> Self {
        self.builtins = builtins;
        self
    }

    /// Replace the execution limits.
    pub fn with_config(mut self, config: VmConfig) -> Self {
        self.config = config;
        self
    }

    /// The global names, for the host to edit between evaluations.
    pub fn globals_mut(&mut self) -> &mut Namespace {
        &mut self.globals
    }

    /// The global names.
    pub fn globals(&self) -> &Namespace {
        &self.globals
    }

    /// The execution limits.
    pub fn config(&self) -> &VmConfig {
        &self.config
    }

    /// The read-only context frames are built on.
    pub fn context(&self) -> Context<'_> {
        Context {
            globals: &self.globals,
            builtins: &self.builtins,
            config: &self.config,
        }
    }

    /// A top-level frame over `code`, for hosts that want to inspect
    /// locals or step manually.
    pub fn frame<'a>(&'a self, code: &'a InstructionStream) -> Frame<'a> {
        Frame::new(code, self.context())
    }

    /// Evaluate `code` in a fresh top-level frame.
    ///
    /// # Errors
    ///
    /// Returns [`RuntimeError`] if any instruction fails.
    pub fn eval(&self, code: &InstructionStream) -> Result<Value, RuntimeError> {
        self.frame(code).eval()
    }
}

/// Evaluate `code` with the standard builtins and no globals.
pub fn eval(code: &InstructionStream) -> Result<Value, RuntimeError> {
    Vm::new().eval(code)
}
