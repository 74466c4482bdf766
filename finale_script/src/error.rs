use thiserror::Error;

use crate::command::Directive;

/// Authoring errors that make a script unusable. The interpreter stops
/// itself before handing one of these back to the host.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ScriptError {
    #[error("token longer than {limit} bytes")]
    TokenTooLong { limit: usize },
    #[error("command {command} is missing required operand #{index}")]
    MissingOperand { command: &'static str, index: usize },
    #[error("command {command} has invalid operand type code {code:?}")]
    BadSignature { command: &'static str, code: char },
    #[error("command {command} is not allowed in the {directive} directive")]
    DirectiveViolation {
        command: &'static str,
        directive: Directive,
    },
    #[error("{directive} directive block is not terminated")]
    UnterminatedDirective { directive: Directive },
}

pub type Result<T> = std::result::Result<T, ScriptError>;
