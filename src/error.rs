use thiserror::Error;

/// Errors from the audio data pipeline: decoding payloads and driving
/// the output device.
#[derive(Debug, Error)]
pub enum AudioError {
    #[error("malformed PCM payload: {byte_len} bytes is not a whole number of {channel_count}-channel frames")]
    MalformedPayload { byte_len: usize, channel_count: u16 },

    #[error("audio subsystem unavailable: {0}")]
    SubsystemUnavailable(String),
}

/// Errors surfaced to the user by the session controller.
#[derive(Debug, Error)]
pub enum SessionError {
    #[error(transparent)]
    Audio(#[from] AudioError),

    /// The collaborator's message is shown verbatim; retry policy, if
    /// any, belongs to the caller.
    #[error("speech synthesis failed: {0}")]
    Synthesis(String),

    /// Not a failure: the caller redirects to the login flow.
    #[error("not authorized")]
    Unauthorized,

    #[error("a generation is already in progress")]
    GenerationInFlight,

    #[error("nothing to synthesize")]
    EmptyText,

    #[error("no history entry with id {0}")]
    UnknownEntry(String),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}
