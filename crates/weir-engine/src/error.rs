use thiserror::Error;

/// Failures crossing the engine boundary.
///
/// `Status` is the interesting one: the engine reports a native status code
/// and we keep the name of the facade call that produced it so diagnostics
/// read like `engine call add_filter failed: Operation not permitted (1)`.
#[derive(Debug, Error)]
pub enum EngineError {
    #[error("failed to open engine device {path}: {source}")]
    Open {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("engine call {call} failed: {} ({code})", status_message(*code))]
    Status { call: &'static str, code: i32 },

    #[error("engine call {call} returned an unexpected response")]
    Protocol { call: &'static str },

    #[error("engine response could not be decoded: {0}")]
    Decode(#[from] serde_json::Error),

    #[error("io error talking to the engine: {0}")]
    Io(#[from] std::io::Error),

    #[error("event subscription reader terminated")]
    ReaderDied,
}

/// Render a native status code the way the OS would.
fn status_message(code: i32) -> String {
    std::io::Error::from_raw_os_error(code).to_string()
}
