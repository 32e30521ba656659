//! CLI-specific error types and exit code mapping

use flowherd_archive::ArchiveError;
use flowherd_core::error::FlowherdError;

/// CLI-specific error type.
///
/// Each variant carries enough context for a user-friendly message.
/// The `exit_code()` method maps errors to standard Unix exit codes.
#[derive(Debug, thiserror::Error)]
pub enum CliError {
    /// Configuration loading or validation failure.
    #[error("configuration error: {0}")]
    Config(String),

    /// A subcommand-specific operation failed.
    #[error("{0}")]
    Command(String),

    /// Archive rotation or retention sweep failure.
    #[error("archive error: {0}")]
    Archive(#[from] ArchiveError),

    /// JSON serialisation failed during output rendering.
    #[error("json output error: {0}")]
    JsonSerialize(#[from] serde_json::Error),

    /// IO error (file read, stdout write, etc.).
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    /// Wrapped domain error from flowherd-core.
    #[error("{0}")]
    Core(#[from] FlowherdError),
}

impl CliError {
    /// Map the error to a process exit code.
    ///
    /// | Code | Meaning                  |
    /// |------|--------------------------|
    /// | 0    | Success                  |
    /// | 1    | General / command error  |
    /// | 2    | Configuration error      |
    /// | 4    | Archive / sweep failure  |
    /// | 10   | IO error                 |
    pub fn exit_code(&self) -> i32 {
        match self {
            Self::Config(_) => 2,
            Self::Archive(_) => 4,
            Self::Io(_) => 10,
            Self::JsonSerialize(_) | Self::Command(_) | Self::Core(_) => 1,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_exit_code_config_error() {
        let err = CliError::Config("bad toml".to_owned());
        assert_eq!(err.exit_code(), 2, "config error should return exit code 2");
    }

    #[test]
    fn test_exit_code_archive_error() {
        let err = CliError::Archive(ArchiveError::RootMissing {
            path: "/data/flows".to_owned(),
        });
        assert_eq!(err.exit_code(), 4, "archive error should return exit code 4");
    }

    #[test]
    fn test_exit_code_io_error() {
        let io_err = std::io::Error::new(std::io::ErrorKind::NotFound, "file not found");
        let err = CliError::Io(io_err);
        assert_eq!(err.exit_code(), 10, "io error should return exit code 10");
    }

    #[test]
    fn test_exit_code_command_error() {
        let err = CliError::Command("oops".to_owned());
        assert_eq!(err.exit_code(), 1);
    }

    #[test]
    fn test_exit_code_core_error() {
        use flowherd_core::error::ConfigError;
        let core_err: FlowherdError = ConfigError::FileNotFound {
            path: "flowherd.toml".to_owned(),
        }
        .into();
        let err: CliError = core_err.into();
        assert_eq!(err.exit_code(), 1);
    }

    #[test]
    fn test_error_display_config() {
        let err = CliError::Config("invalid TOML syntax".to_owned());
        let msg = err.to_string();
        assert!(msg.contains("configuration error"));
        assert!(msg.contains("invalid TOML syntax"));
    }

    #[test]
    fn test_error_display_command_is_bare() {
        let err = CliError::Command("execution failed".to_owned());
        assert_eq!(err.to_string(), "execution failed");
    }

    #[test]
    fn test_from_io_error() {
        let io_err = std::io::Error::new(std::io::ErrorKind::PermissionDenied, "access denied");
        let cli_err: CliError = io_err.into();
        match cli_err {
            CliError::Io(e) => assert_eq!(e.kind(), std::io::ErrorKind::PermissionDenied),
            _ => panic!("expected Io error variant"),
        }
    }
}
