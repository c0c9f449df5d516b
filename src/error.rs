/// Error type returned by mecab-rs public APIs.
#[derive(Debug, thiserror::Error)]
pub enum MecabError {
    /// Asset resolution, library loading or instance creation failed.
    #[error("engine load failed: {0}")]
    LoadFailure(String),
    /// The configured retry ceiling was reached without a usable instance.
    #[error("engine load gave up after {attempts} attempt(s): {last_error}")]
    RetriesExhausted {
        /// Number of load attempts made by the loader that gave up.
        attempts: u32,
        /// Message of the last load failure.
        last_error: String,
    },
    /// A query was issued before the engine reached the ready state.
    #[error("engine is not ready")]
    NotReady,
    /// Dynamic library could not be loaded.
    #[error("failed to load library: {0}")]
    LibraryLoad(String),
    /// Required symbol could not be resolved from the library.
    #[error("failed to load symbol: {0}")]
    SymbolLoad(String),
    /// Rust string contained an interior `NUL` byte for C interop.
    #[error("string contains NUL byte: {0}")]
    NulByte(#[from] std::ffi::NulError),
    /// User-provided arguments or configuration were invalid.
    #[error("invalid argument: {0}")]
    InvalidArgument(String),
    /// Error reported by the engine itself.
    #[error("mecab error: {0}")]
    Engine(String),
    /// The lifecycle was dropped while a caller was waiting on it.
    #[error("engine lifecycle was closed")]
    Closed,
}

/// Convenience alias used throughout the crate.
pub type Result<T> = std::result::Result<T, MecabError>;
