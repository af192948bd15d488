use thiserror::Error;

/// Crate-wide error taxonomy.
///
/// Only `Configuration` is allowed to abort startup; every other variant is
/// isolated to the iteration that produced it and surfaced as a log line.
#[derive(Debug, Error)]
pub enum SimError {
    /// Wire record shorter than its fixed minimum (16-byte SOME/IP header,
    /// 4-byte bus record). The record is dropped and the loop continues.
    #[error("malformed frame: {0} bytes")]
    MalformedFrame(usize),

    /// Socket send/receive failure. Logged, never retried.
    #[error("transport error: {0}")]
    Transport(String),

    /// Control-channel payload missing an expected field or carrying the
    /// wrong type. The prior context value is retained.
    #[error("invalid control payload: {0}")]
    InputValidation(String),

    /// Startup resource (socket, parameter file) could not be opened. Fatal.
    #[error("configuration error: {0}")]
    Configuration(String),

    /// Parameter record could not be read or written.
    #[error("persistence error: {0}")]
    Persistence(String),
}
