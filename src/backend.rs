//! The seam between the binding registries and a multiplexing backend.

use crate::binding::{IoBinding, SignalBinding, TimerBinding};
use crate::error::Result;

/// Opaque handle to a backend-owned event registration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct EventResource(u64);

impl EventResource {
    pub(crate) fn new(token: u64) -> Self {
        Self(token)
    }

    pub fn token(self) -> u64 {
        self.0
    }
}

/// Hooks a backend implements to mirror registry changes.
///
/// [`Dispatcher`](crate::Dispatcher) is generic over this seam; the bind
/// family, freeze/unfreeze orchestration and query surface are identical
/// across backends, only these four register/unregister pairs differ. The
/// polling backend marks its descriptor maps dirty; a native event-library
/// adapter would create and free one registration per binding.
///
/// A register hook runs before the binding becomes live; returning an error
/// aborts the surrounding bind call and the binding is not inserted.
/// Unregister hooks are only invoked while the binding holds a live
/// [`EventResource`].
pub trait Backend: Sized {
    fn register_socket(&mut self, binding: &IoBinding<Self>) -> Result<EventResource>;
    fn unregister_socket(&mut self, binding: &IoBinding<Self>);

    fn register_stream(&mut self, binding: &IoBinding<Self>) -> Result<EventResource>;
    fn unregister_stream(&mut self, binding: &IoBinding<Self>);

    fn register_signal(&mut self, binding: &SignalBinding<Self>) -> Result<EventResource>;
    fn unregister_signal(&mut self, binding: &SignalBinding<Self>);

    fn register_timer(&mut self, binding: &TimerBinding<Self>) -> Result<EventResource>;
    fn unregister_timer(&mut self, binding: &TimerBinding<Self>);
}
