//! CLI error types with exit code handling

use kindling_core::CoreError;
use kindling_kube::{KindError, KubeError};
use miette::Diagnostic;
use thiserror::Error;

use crate::exit_codes;

/// CLI-specific error type that includes exit code information
#[derive(Error, Debug, Diagnostic, Clone)]
pub enum CliError {
    /// Manifest or argument the policies cannot work with
    #[error("Invalid input: {message}")]
    #[diagnostic(code(kindling::cli::input))]
    Input {
        message: String,
        #[help]
        help: Option<String>,
    },

    /// Account configuration problem
    #[error("Configuration error: {message}")]
    #[diagnostic(code(kindling::cli::config))]
    Config {
        message: String,
        #[help]
        help: Option<String>,
    },

    /// At least one manifest is not healthy
    #[error("{unhealthy} of {total} manifest(s) not stable")]
    #[diagnostic(code(kindling::cli::unhealthy))]
    Unhealthy { unhealthy: usize, total: usize },

    /// IO error (file not found, permissions, etc.)
    #[error("IO error: {message}")]
    #[diagnostic(code(kindling::cli::io))]
    Io { message: String },

    /// Wrapped error for passthrough (stores the formatted message)
    #[error("{message}")]
    #[diagnostic(code(kindling::cli::error))]
    Other { message: String },
}

impl CliError {
    /// Get the exit code for this error
    pub fn exit_code(&self) -> i32 {
        match self {
            CliError::Input { .. } => exit_codes::INPUT_ERROR,
            CliError::Config { .. } => exit_codes::CONFIG_ERROR,
            CliError::Unhealthy { .. } => exit_codes::UNHEALTHY,
            CliError::Io { .. } => exit_codes::IO_ERROR,
            CliError::Other { .. } => exit_codes::ERROR,
        }
    }

    pub fn input(message: impl Into<String>) -> Self {
        Self::Input {
            message: message.into(),
            help: None,
        }
    }

    pub fn input_with_help(message: impl Into<String>, help: impl Into<String>) -> Self {
        Self::Input {
            message: message.into(),
            help: Some(help.into()),
        }
    }

    pub fn config(message: impl Into<String>) -> Self {
        Self::Config {
            message: message.into(),
            help: None,
        }
    }
}

impl From<std::io::Error> for CliError {
    fn from(err: std::io::Error) -> Self {
        CliError::Io {
            message: err.to_string(),
        }
    }
}

impl From<serde_json::Error> for CliError {
    fn from(err: serde_json::Error) -> Self {
        CliError::Other {
            message: err.to_string(),
        }
    }
}

impl From<serde_yaml::Error> for CliError {
    fn from(err: serde_yaml::Error) -> Self {
        CliError::Other {
            message: err.to_string(),
        }
    }
}

impl From<CoreError> for CliError {
    fn from(err: CoreError) -> Self {
        CliError::input(err.to_string())
    }
}

impl From<KindError> for CliError {
    fn from(err: KindError) -> Self {
        match err {
            KindError::Unregistered(_) | KindError::MissingHandlers(_) => CliError::input_with_help(
                err.to_string(),
                "Declare the kind under `customKinds` in an account file and pass it with --config",
            ),
            KindError::DuplicateHandler(_) => CliError::config(err.to_string()),
        }
    }
}

impl From<KubeError> for CliError {
    fn from(err: KubeError) -> Self {
        match err {
            KubeError::Core(e) => e.into(),
            KubeError::Kind(e) => e.into(),
            KubeError::InvalidConfig(_)
            | KubeError::UnknownBinding(_)
            | KubeError::InvalidShard { .. }
            | KubeError::Serialization(_) => CliError::config(err.to_string()),
            KubeError::UnsupportedSort(_) => CliError::input(err.to_string()),
            KubeError::Io(e) => e.into(),
            other => CliError::Other {
                message: other.to_string(),
            },
        }
    }
}

/// Result type for CLI operations
pub type Result<T> = std::result::Result<T, CliError>;

#[cfg(test)]
mod tests {
    use super::*;
    use kindling_core::ResourceKind;

    #[test]
    fn test_exit_codes() {
        assert_eq!(CliError::input("x").exit_code(), exit_codes::INPUT_ERROR);
        assert_eq!(CliError::config("x").exit_code(), exit_codes::CONFIG_ERROR);
        assert_eq!(
            CliError::Unhealthy { unhealthy: 1, total: 2 }.exit_code(),
            exit_codes::UNHEALTHY
        );
    }

    #[test]
    fn test_unregistered_kind_has_help() {
        let err: CliError = KindError::Unregistered(ResourceKind::custom("Gadget", "x.io")).into();
        assert!(matches!(err, CliError::Input { help: Some(_), .. }));
        assert!(err.to_string().contains("Gadget.x.io"));
    }

    #[test]
    fn test_kube_error_mapping() {
        let err: CliError = KubeError::InvalidConfig("bad".to_string()).into();
        assert_eq!(err.exit_code(), exit_codes::CONFIG_ERROR);

        let err: CliError = KubeError::Io(std::io::Error::other("gone")).into();
        assert_eq!(err.exit_code(), exit_codes::IO_ERROR);
    }
}
