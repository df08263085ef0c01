/*!
 * Error types for the alexandria application.
 *
 * This module contains custom error types for different parts of the pipeline,
 * using the thiserror crate for ergonomic error definitions.
 */

use std::path::PathBuf;

use thiserror::Error;

/// Errors that can occur when talking to an external collaborator
#[derive(Error, Debug)]
pub enum ProviderError {
    /// Error when making an API request fails
    #[error("API request failed: {0}")]
    RequestFailed(String),

    /// Error when parsing an API response fails
    #[error("Failed to parse API response: {0}")]
    ParseError(String),

    /// Error returned by the API itself
    #[error("API responded with error: {status_code} - {message}")]
    ApiError {
        /// HTTP status code
        status_code: u16,
        /// Error message from the API
        message: String,
    },

    /// Error establishing or maintaining a connection
    #[error("Connection error: {0}")]
    ConnectionError(String),

    /// Error related to rate limiting
    #[error("Rate limit exceeded: {0}")]
    RateLimitExceeded(String),

    /// Error with authentication
    #[error("Authentication error: {0}")]
    AuthenticationError(String),

    /// The collaborator reported success but its output artifact is absent
    #[error("Output artifact not found: {0:?}")]
    MissingArtifact(PathBuf),
}

/// Errors raised while loading or checking configuration
#[derive(Error, Debug)]
pub enum ConfigError {
    /// Required configuration (or the voice table) is absent
    #[error("Missing configuration: {0}")]
    ConfigurationMissing(String),

    /// A voice profile exists but cannot be used
    #[error("Incomplete voice configuration for speaker '{speaker}': {reason}")]
    IncompleteVoice {
        /// Speaker label the profile belongs to
        speaker: String,
        /// What is missing
        reason: String,
    },

    /// A value is present but out of range or malformed
    #[error("Invalid configuration: {0}")]
    Invalid(String),
}

/// Errors raised while decoding or assembling audio
#[derive(Error, Debug)]
pub enum AudioError {
    /// A rendered file could not be decoded
    #[error("Failed to decode audio {path:?}: {message}")]
    Decode {
        /// File that failed to decode
        path: PathBuf,
        /// Decoder message
        message: String,
    },

    /// The assembled track could not be written
    #[error("Failed to encode audio: {0}")]
    Encode(String),

    /// Assembly was requested with no segments
    #[error("Nothing to assemble")]
    NothingToAssemble,
}

/// Reasons a single audio unit was dropped from the run.
///
/// These never abort the pipeline; the orchestrator logs and tallies them.
#[derive(Error, Debug)]
pub enum UnitFailure {
    /// No voice profile exists for the speaker
    #[error("no voice configured for speaker '{0}'")]
    UnconfiguredSpeaker(String),

    /// The profile exists but is unusable
    #[error(transparent)]
    IncompleteVoice(ConfigError),

    /// The synthesis collaborator returned an error
    #[error("synthesis failed: {0}")]
    Synthesis(#[from] ProviderError),

    /// The collaborator's output could not be read back
    #[error("could not process audio file: {0}")]
    UnreadableAudio(#[from] AudioError),
}

impl UnitFailure {
    /// Whether the unit was skipped for a configuration or artifact reason
    /// rather than an outright collaborator error.
    pub fn is_skip(&self) -> bool {
        matches!(
            self,
            Self::UnconfiguredSpeaker(_)
                | Self::IncompleteVoice(_)
                | Self::UnreadableAudio(_)
                | Self::Synthesis(ProviderError::MissingArtifact(_))
        )
    }
}

/// Errors that abort a pipeline run
#[derive(Error, Debug)]
pub enum PipelineError {
    /// Configuration was missing or invalid
    #[error("Configuration error: {0}")]
    Configuration(#[from] ConfigError),

    /// The synthesis collaborator failed its connection test
    #[error("Synthesis connection test failed: {0}")]
    ConnectionTest(ProviderError),

    /// Writing an artifact failed
    #[error("File error: {0}")]
    Io(#[from] std::io::Error),

    /// An artifact could not be written or read back
    #[error("Artifact error: {0}")]
    Artifact(String),

    /// Assembling or encoding the final track failed
    #[error("Audio error: {0}")]
    Audio(#[from] AudioError),

    /// Serializing the annotated script failed
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Main application error type that wraps all other errors
#[derive(Error, Debug)]
pub enum AppError {
    /// Error from a file operation
    #[error("File error: {0}")]
    File(String),

    /// Error from a provider
    #[error("Provider error: {0}")]
    Provider(#[from] ProviderError),

    /// Error from configuration
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// Error from the pipeline
    #[error("Pipeline error: {0}")]
    Pipeline(#[from] PipelineError),

    /// Any other error
    #[error("Unknown error: {0}")]
    Unknown(String),
}

// Utility functions for error conversion
impl From<anyhow::Error> for AppError {
    fn from(error: anyhow::Error) -> Self {
        Self::Unknown(error.to_string())
    }
}

impl From<std::io::Error> for AppError {
    fn from(error: std::io::Error) -> Self {
        Self::File(error.to_string())
    }
}
