use std::process::ExitCode;
use std::time::Duration;

/// Bad command-line input. Always detected before the port is touched.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("invalid baud rate {0:?}: expected a positive integer")]
    InvalidBaudRate(String),

    #[error("invalid hex payload {input:?}: {source}")]
    InvalidPayload {
        input: String,
        #[source]
        source: hex::FromHexError,
    },
}

/// Failures talking to the serial device.
#[derive(Debug, thiserror::Error)]
pub enum TransportError {
    #[error("could not open {path}: {source}")]
    Open {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("{path}: {what} is not supported by this transport")]
    Unsupported { path: String, what: &'static str },

    #[error("write to {path} did not complete within {timeout:?}")]
    WriteTimeout { path: String, timeout: Duration },

    #[error("write to {path} failed: {source}")]
    Write {
        path: String,
        #[source]
        source: std::io::Error,
    },
}

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Transport(#[from] TransportError),
}

impl Error {
    pub fn is_configuration(&self) -> bool {
        matches!(self, Error::Config(_))
    }

    /// Usage errors exit with 2 like clap does, device errors with 1.
    pub fn exit_code(&self) -> ExitCode {
        match self {
            Error::Config(_) => ExitCode::from(2),
            Error::Transport(_) => ExitCode::FAILURE,
        }
    }
}

pub type Result<T> = std::result::Result<T, Error>;
