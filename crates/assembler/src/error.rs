//! Error types for the pyvm listing assembler.

use thiserror::Error;

/// Errors produced while assembling a listing into an instruction stream.
///
/// Every variant carries the 1-based line number it was found on.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum AsmError {
    /// An unrecognized opcode mnemonic was encountered.
    #[error("line {line}: unknown opcode '{token}'")]
    UnknownOpcode { line: usize, token: String },

    /// An opcode or directive is missing its operand.
    #[error("line {line}: {opcode} expects {expected}")]
    MissingArgument {
        line: usize,
        opcode: &'static str,
        expected: &'static str,
    },

    /// A numeric literal could not be parsed or is out of range.
    #[error("line {line}: invalid number '{token}'")]
    InvalidNumber { line: usize, token: String },

    /// A token appeared where it was not expected.
    #[error("line {line}: unexpected token '{token}'")]
    UnexpectedToken { line: usize, token: String },

    /// A string literal was not closed before the end of the line.
    #[error("line {line}: unterminated string literal")]
    UnterminatedString { line: usize },

    /// An unknown backslash escape inside a string literal.
    #[error("line {line}: invalid escape '\\{escape}'")]
    InvalidEscape { line: usize, escape: String },

    /// `@name` refers to a function that has not been defined yet.
    #[error("line {line}: unknown function '{name}'")]
    UnknownFunction { line: usize, name: String },

    /// A `.func` block was never closed by `.end`.
    #[error("line {line}: function '{name}' is missing .end")]
    UnterminatedFunction { line: usize, name: String },

    /// `.end` with no open `.func` block.
    #[error("line {line}: .end without .func")]
    UnmatchedEnd { line: usize },

    /// Two functions with the same name.
    #[error("line {line}: function '{name}' is already defined")]
    DuplicateFunction { line: usize, name: String },

    /// An explicit offset not greater than the previous one in its block.
    #[error("line {line}: offset {offset} does not follow offset {previous}")]
    NonMonotonicOffset {
        line: usize,
        offset: u32,
        previous: u32,
    },
}

impl AsmError {
    /// The line the error was found on.
    pub fn line(&self) -> usize {
        match self {
            AsmError::UnknownOpcode { line, .. }
            | AsmError::MissingArgument { line, .. }
            | AsmError::InvalidNumber { line, .. }
            | AsmError::UnexpectedToken { line, .. }
            | AsmError::UnterminatedString { line }
            | AsmError::InvalidEscape { line, .. }
            | AsmError::UnknownFunction { line, .. }
            | AsmError::UnterminatedFunction { line, .. }
            | AsmError::UnmatchedEnd { line }
            | AsmError::DuplicateFunction { line, .. }
            | AsmError::NonMonotonicOffset { line, .. } => *line,
        }
    }
}
