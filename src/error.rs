use std::io;

/// Convenience alias for fallible dispatcher operations.
pub type Result<T, E = Error> = std::result::Result<T, E>;

/// Failure modes surfaced by the dispatcher API and the reactor loop.
///
/// Registry-level errors (`NotFound`, `InvalidArgument`) are raised
/// synchronously to the caller of the offending operation and leave loop
/// state untouched. `Runtime` aborts the bind call that triggered it; the
/// binding is not inserted. Handler errors are not recovered locally: the
/// loop stops and the error re-propagates from `listen()`.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// A single-binding operation referenced an id that is not registered.
    #[error("binding not found: {0}")]
    NotFound(String),

    /// A resource, id or descriptor argument could not be used as given.
    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    /// The backend rejected a registration or poll setup call.
    #[error("backend failure: {0}")]
    Runtime(#[from] io::Error),

    /// A binding kind needs a capability this platform does not provide.
    #[error("component unavailable: {0}")]
    ComponentUnavailable(String),

    /// An error raised inside a user handler, propagated out of `listen()`.
    #[error("unhandled handler error: {0}")]
    Unhandled(#[source] Box<dyn std::error::Error + 'static>),
}

impl Error {
    /// Wraps an arbitrary handler-side failure for propagation through the
    /// loop.
    pub fn unhandled(err: impl std::error::Error + 'static) -> Self {
        Error::Unhandled(Box::new(err))
    }
}
