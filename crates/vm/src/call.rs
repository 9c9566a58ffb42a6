//! CALL_FUNCTION: native invocation and nested interpreted frames.

use pyvm_common::{CallArgs, Callable, Function, Instruction, NativeFunction, Value};

use crate::error::RuntimeError;
use crate::machine::Frame;
use crate::scope::Namespace;

impl<'a> Frame<'a> {
    /// Pop the positional arguments, then the callable, and push the result.
    pub(crate) fn exec_call(&mut self, instr: &Instruction) -> Result<(), RuntimeError> {
        let count = instr
            .count()
            .ok_or_else(|| self.missing_operand(instr))?;
        let Some(CallArgs {
            positional,
            keyword,
        }) = CallArgs::from_count(count)
        else {
            return Err(RuntimeError::InvalidCallCount {
                at: self.current,
                count,
            });
        };
        if keyword > 0 {
            return Err(RuntimeError::KeywordArgumentsUnsupported {
                at: self.current,
                count: keyword,
            });
        }

        let args = self.pop_n(positional)?;
        let callee = self.pop()?;
        let result = match callee {
            Value::Callable(Callable::Native(native)) => self.call_native(&native, &args)?,
            Value::Callable(Callable::Interpreted(function)) => {
                self.call_interpreted(&function, args)?
            }
            other => {
                return Err(RuntimeError::NotCallable {
                    at: self.current,
                    type_name: other.type_name(),
                })
            }
        };
        self.push(result);
        Ok(())
    }

    #[tracing::instrument(level = "debug", skip_all, fields(function = native.name, args = args.len()))]
    fn call_native(&self, native: &NativeFunction, args: &[Value]) -> Result<Value, RuntimeError> {
        native
            .call(args)
            .map_err(|e| RuntimeError::from_op(self.current, e))
    }

    /// Run `function` in a fresh frame whose locals hold only its parameters.
    #[tracing::instrument(level = "debug", skip_all, fields(function = %function.name, depth = self.depth + 1))]
    fn call_interpreted(
        &self,
        function: &Function,
        args: Vec<Value>,
    ) -> Result<Value, RuntimeError> {
        if args.len() != function.params.len() {
            return Err(RuntimeError::ArgumentCount {
                at: self.current,
                name: function.name.clone(),
                expected: function.params.len(),
                given: args.len(),
            });
        }
        let limit = self.ctx.config.max_call_depth;
        if self.depth >= limit {
            return Err(RuntimeError::CallDepthExceeded {
                at: self.current,
                limit,
            });
        }

        let locals: Namespace = function.params.iter().cloned().zip(args).collect();
        let mut callee = Frame::nested(&function.code, self.ctx, self.depth + 1).with_locals(locals);
        callee.eval()
    }
}
