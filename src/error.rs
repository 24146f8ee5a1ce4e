//! Error handling for the percussion engine
//!
//! Missing parameters are never errors; everything here is either a caller
//! mistake at the boundary (unknown instrument, malformed params, I/O) or a
//! genuine synthesis bug (non-finite output).

use thiserror::Error;

/// Result type alias for engine operations
pub type Result<T> = std::result::Result<T, EngineError>;

/// Main error type for engine operations
#[derive(Error, Debug)]
pub enum EngineError {
    // Boundary Errors
    #[error("Unknown instrument: {name} (expected kick, snare or hat)")]
    UnknownInstrument { name: String },

    #[error("Invalid parameter map: {reason}")]
    InvalidParams { reason: String },

    // Synthesis Errors
    #[error("{instrument} render produced a non-finite sample at index {index}")]
    NonFiniteOutput { instrument: String, index: usize },

    // Export Errors
    #[error("Unsupported export format: {format}")]
    UnsupportedFormat { format: String },

    #[error("WAV error: {0}")]
    Wav(#[from] hound::Error),

    // I/O Errors
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    // Serialization Errors
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl EngineError {
    /// Get the error code for this error type
    pub fn error_code(&self) -> &'static str {
        match self {
            EngineError::UnknownInstrument { .. } => "UNKNOWN_INSTRUMENT",
            EngineError::InvalidParams { .. } => "INVALID_PARAMS",
            EngineError::NonFiniteOutput { .. } => "NON_FINITE_OUTPUT",
            EngineError::UnsupportedFormat { .. } => "UNSUPPORTED_FORMAT",
            EngineError::Wav(_) => "WAV_ERROR",
            EngineError::Io(_) => "IO_ERROR",
            EngineError::Serialization(_) => "SERIALIZATION_ERROR",
        }
    }

    /// Check if this error is recoverable by the caller
    ///
    /// Non-finite output is a bug in a synthesis graph and is never recoverable.
    pub fn is_recoverable(&self) -> bool {
        match self {
            EngineError::UnknownInstrument { .. } => true,
            EngineError::InvalidParams { .. } => true,
            EngineError::UnsupportedFormat { .. } => true,
            EngineError::Serialization(_) => true,
            _ => false,
        }
    }

    /// Get recovery suggestions for this error
    pub fn recovery_suggestions(&self) -> Vec<&'static str> {
        match self {
            EngineError::UnknownInstrument { .. } => vec![
                "Use one of: kick, snare, hat",
                "Instrument names are case-insensitive",
            ],
            EngineError::InvalidParams { .. } => vec![
                "The parameter map must be a JSON object",
                "Use dotted keys (\"kick.click.gain_db\") or nested objects",
            ],
            EngineError::UnsupportedFormat { .. } => vec![
                "Supported bit depths: 16, 24, 32 (float)",
            ],
            EngineError::Serialization(_) => vec![
                "Check the parameter file is valid JSON",
            ],
            EngineError::NonFiniteOutput { .. } => vec![
                "Report the parameter map and seed that triggered this",
                "A filter or feedback path became unstable",
            ],
            _ => vec![],
        }
    }
}
