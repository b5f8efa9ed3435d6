//! Error types shared by the registry and the parse engine.
//!
//! Registration-time problems are [`RegistryError`]s; everything that can go
//! wrong while parsing one token sequence is a [`ParseError`]. Both map onto
//! a flat [`ErrorKind`] so callers can branch on the category without
//! matching every variant.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Category of a failure, as reported in structured results.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ErrorKind {
    UnknownCommand,
    InvalidEnumValue,
    MissingMandatoryFlags,
    TypeCoercionFailure,
    ValidationFailure,
    InvalidFlagDefinition,
    DuplicateFlagDefinition,
    OptionCollision,
    HandlerExecutionFailure,
}

/// Errors raised while adding flags to a registry.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RegistryError {
    /// Flag name is empty or whitespace-only.
    #[error("flag name cannot be empty")]
    EmptyName,
    /// Flag declares no option strings.
    #[error("flag '{0}' must declare at least one option")]
    MissingOptions(String),
    /// Option string is not `-x` or `--word` shaped.
    #[error("invalid option format for flag '{flag}': {option}")]
    InvalidOption { flag: String, option: String },
    /// Positional indexes start at 1.
    #[error("flag '{0}' declares positional index 0 (indexes are 1-based)")]
    InvalidPositional(String),
    /// Default value is outside the declared enum.
    #[error("default value {value} of flag '{flag}' is not an allowed value")]
    DefaultNotInEnum { flag: String, value: String },
    /// Two flags in the same registry share a name.
    #[error("duplicate flag definition: {0}")]
    DuplicateFlag(String),
    /// An option string is already claimed by another flag.
    #[error("option {option} of flag '{flag}' is already used by flag '{owner}'")]
    OptionCollision {
        option: String,
        flag: String,
        owner: String,
    },
}

impl RegistryError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::DuplicateFlag(_) => ErrorKind::DuplicateFlagDefinition,
            Self::OptionCollision { .. } => ErrorKind::OptionCollision,
            _ => ErrorKind::InvalidFlagDefinition,
        }
    }
}

/// Errors produced by one parse call.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ParseError {
    /// A token matched neither a subcommand nor a flag.
    #[error("unknown command or option '{token}'{}", chain_suffix(.chain))]
    UnknownCommand { token: String, chain: Vec<String> },
    #[error("invalid value '{value}' for flag '{flag}', allowed values: {}", .allowed.join(", "))]
    InvalidEnumValue {
        flag: String,
        value: String,
        allowed: Vec<String>,
    },
    /// Every missing mandatory flag of the command, in declaration order.
    #[error("missing mandatory flags: {}", .flags.join(", "))]
    MissingMandatoryFlags { flags: Vec<String> },
    #[error("cannot convert '{value}' for flag '{flag}': {message}")]
    TypeCoercionFailure {
        flag: String,
        value: String,
        message: String,
    },
    #[error("validation failed for flag '{flag}': {message}")]
    ValidationFailure { flag: String, message: String },
    #[error("handler for '{command}' failed: {message}")]
    HandlerExecutionFailure { command: String, message: String },
}

impl ParseError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::UnknownCommand { .. } => ErrorKind::UnknownCommand,
            Self::InvalidEnumValue { .. } => ErrorKind::InvalidEnumValue,
            Self::MissingMandatoryFlags { .. } => ErrorKind::MissingMandatoryFlags,
            Self::TypeCoercionFailure { .. } => ErrorKind::TypeCoercionFailure,
            Self::ValidationFailure { .. } => ErrorKind::ValidationFailure,
            Self::HandlerExecutionFailure { .. } => ErrorKind::HandlerExecutionFailure,
        }
    }

    /// Exit code a CLI front end should use for this error.
    pub fn exit_code(&self) -> i32 {
        1
    }
}

fn chain_suffix(chain: &[String]) -> String {
    if chain.is_empty() {
        String::new()
    } else {
        format!(" (after '{}')", chain.join(" "))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unknown_command_message_names_chain() {
        let err = ParseError::UnknownCommand {
            token: "bogus".into(),
            chain: vec!["level1".into()],
        };
        assert_eq!(
            err.to_string(),
            "unknown command or option 'bogus' (after 'level1')"
        );
        assert_eq!(err.kind(), ErrorKind::UnknownCommand);
    }

    #[test]
    fn test_missing_mandatory_lists_every_flag() {
        let err = ParseError::MissingMandatoryFlags {
            flags: vec!["batch".into(), "phase".into()],
        };
        assert_eq!(err.to_string(), "missing mandatory flags: batch, phase");
    }

    #[test]
    fn test_registry_kinds() {
        assert_eq!(
            RegistryError::DuplicateFlag("f1".into()).kind(),
            ErrorKind::DuplicateFlagDefinition
        );
        assert_eq!(
            RegistryError::EmptyName.kind(),
            ErrorKind::InvalidFlagDefinition
        );
    }
}
