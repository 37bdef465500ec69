//! A single-threaded event-dispatch reactor: one loop multiplexing
//! descriptor readiness, timers and OS signals into user handlers.
//!
//! Interests are registered as bindings (persistent or one-shot, freezable
//! without destruction) and serviced cooperatively in a fixed order per
//! iteration: timers first, then signals, socket readiness, stream
//! readiness, and finally the tick and cycle callbacks. It consists of:
//!
//! - [`dispatcher`]: binding registries and the bind/freeze/remove surface
//! - [`poll`]: the polling backend and the `listen()` loop
//! - [`binding`]: the four binding kinds and handler signatures
//! - [`backend`]: the seam a multiplexing backend implements
//! - [`channel`]: channel identity and the fd adapter
//! - [`signal`]: signal descriptors
//! - [`error`]: crate-wide error taxonomy
//!
//! Unix only: multiplexing registers raw descriptors and signal dispatch
//! uses POSIX numbers.

pub mod backend;
pub mod binding;
pub mod channel;
pub mod dispatcher;
pub mod error;
pub mod poll;
pub mod signal;

pub use backend::{Backend, EventResource};
pub use binding::{
    BindingRef, IoBinding, IoEvent, IoKind, IoMode, IoTimeout, SignalBinding, TimerBinding,
};
pub use channel::{ChannelId, FdChannel, IoChannel};
pub use dispatcher::Dispatcher;
pub use error::{Error, Result};
pub use poll::PollBackend;
pub use signal::Signal;
