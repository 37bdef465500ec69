//! The four binding kinds and their handler signatures.
//!
//! A binding is one registered interest in an event source. Handlers
//! receive `&mut Dispatcher` at trigger time instead of the binding holding
//! a back-pointer, so a handler can stop the loop or freeze/remove its own
//! binding without a reference cycle between dispatcher and bindings.

use std::fmt;
use std::ops::ControlFlow;
use std::rc::Rc;
use std::time::Duration;

use indexmap::IndexMap;

use crate::backend::{Backend, EventResource};
use crate::channel::IoChannel;
use crate::dispatcher::Dispatcher;
use crate::error::Result;
use crate::signal::Signal;

/// Which end of a channel an I/O binding watches.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum IoMode {
    Read,
    Write,
}

impl IoMode {
    pub(crate) fn prefix(self) -> char {
        match self {
            IoMode::Read => 'r',
            IoMode::Write => 'w',
        }
    }
}

impl fmt::Display for IoMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.prefix())
    }
}

/// The two descriptor classes, kept in separate registries and polled
/// through separate multiplex calls.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum IoKind {
    Socket,
    Stream,
}

impl IoKind {
    pub(crate) fn label(self) -> &'static str {
        match self {
            IoKind::Socket => "socket",
            IoKind::Stream => "stream",
        }
    }
}

/// Computes the registry id for an I/O binding: direction plus channel
/// identity, so one channel can hold one read and one write binding at
/// the same time.
pub(crate) fn io_binding_id(mode: IoMode, channel: &dyn IoChannel) -> String {
    format!("{}:{}", mode.prefix(), channel.channel_id())
}

/// Payload handed to I/O handlers.
pub struct IoEvent {
    /// The watched channel.
    pub channel: Rc<dyn IoChannel>,
    /// Id of the binding being triggered.
    pub binding: String,
    /// Direction that fired.
    pub mode: IoMode,
}

pub type IoHandler<B> = Box<dyn FnMut(&mut Dispatcher<B>, &IoEvent) -> Result<()>>;
pub type SignalHandler<B> = Box<dyn FnMut(&mut Dispatcher<B>, Signal) -> Result<()>>;
pub type TimerHandler<B> = Box<dyn FnMut(&mut Dispatcher<B>) -> Result<()>>;
pub type CycleHandler<B> = Box<dyn FnMut(&mut Dispatcher<B>, u64) -> Result<ControlFlow<()>>>;
pub type TickHandler<B> = Box<dyn FnMut(&mut Dispatcher<B>) -> Result<ControlFlow<()>>>;

/// Readiness timeout attached to an I/O binding: if no readiness event
/// arrives within `after`, `handler` fires instead of the normal handler,
/// once per elapsed window.
pub struct IoTimeout<B: Backend> {
    pub after: Duration,
    pub handler: IoHandler<B>,
}

impl<B: Backend> IoTimeout<B> {
    pub fn new(
        after: Duration,
        handler: impl FnMut(&mut Dispatcher<B>, &IoEvent) -> Result<()> + 'static,
    ) -> Self {
        Self {
            after,
            handler: Box::new(handler),
        }
    }
}

/// A socket or stream binding; the kind is the registry it lives in.
pub struct IoBinding<B: Backend> {
    pub(crate) id: String,
    pub(crate) persistent: bool,
    pub(crate) frozen: bool,
    pub(crate) mode: IoMode,
    pub(crate) channel: Rc<dyn IoChannel>,
    pub(crate) timeout: Option<Duration>,
    // Handler slots are `None` only while the handler is running; taking
    // the closure out lets it receive `&mut Dispatcher` re-entrantly.
    pub(crate) handler: Option<IoHandler<B>>,
    pub(crate) timeout_handler: Option<IoHandler<B>>,
    pub(crate) resource: Option<EventResource>,
}

impl<B: Backend> IoBinding<B> {
    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn is_persistent(&self) -> bool {
        self.persistent
    }

    pub fn is_frozen(&self) -> bool {
        self.frozen
    }

    pub fn io_mode(&self) -> IoMode {
        self.mode
    }

    pub fn channel(&self) -> &Rc<dyn IoChannel> {
        &self.channel
    }

    pub fn timeout(&self) -> Option<Duration> {
        self.timeout
    }

    /// Backend handle; `Some` exactly while the binding is unfrozen and
    /// registered with the active backend.
    pub fn resource(&self) -> Option<EventResource> {
        self.resource
    }
}

/// A signal binding; one binding may cover several signal numbers.
pub struct SignalBinding<B: Backend> {
    pub(crate) id: String,
    pub(crate) persistent: bool,
    pub(crate) frozen: bool,
    pub(crate) signals: IndexMap<i32, Signal>,
    pub(crate) handler: Option<SignalHandler<B>>,
    pub(crate) resource: Option<EventResource>,
}

impl<B: Backend> SignalBinding<B> {
    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn is_persistent(&self) -> bool {
        self.persistent
    }

    pub fn is_frozen(&self) -> bool {
        self.frozen
    }

    pub fn signals(&self) -> impl Iterator<Item = Signal> + '_ {
        self.signals.values().copied()
    }

    pub fn has_signal(&self, signal: Signal) -> bool {
        self.signals.contains_key(&signal.number())
    }

    pub fn resource(&self) -> Option<EventResource> {
        self.resource
    }
}

/// A timer binding. The last-fire timestamp is tracked by the loop, not
/// the binding.
pub struct TimerBinding<B: Backend> {
    pub(crate) id: String,
    pub(crate) persistent: bool,
    pub(crate) frozen: bool,
    pub(crate) duration: Duration,
    pub(crate) handler: Option<TimerHandler<B>>,
    pub(crate) resource: Option<EventResource>,
}

impl<B: Backend> TimerBinding<B> {
    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn is_persistent(&self) -> bool {
        self.persistent
    }

    pub fn is_frozen(&self) -> bool {
        self.frozen
    }

    pub fn duration(&self) -> Duration {
        self.duration
    }

    pub fn resource(&self) -> Option<EventResource> {
        self.resource
    }
}

/// Reference to any live binding, tagged by kind.
pub enum BindingRef<'a, B: Backend> {
    Socket(&'a IoBinding<B>),
    Stream(&'a IoBinding<B>),
    Signal(&'a SignalBinding<B>),
    Timer(&'a TimerBinding<B>),
}

impl<B: Backend> BindingRef<'_, B> {
    pub fn id(&self) -> &str {
        match self {
            BindingRef::Socket(b) | BindingRef::Stream(b) => b.id(),
            BindingRef::Signal(b) => b.id(),
            BindingRef::Timer(b) => b.id(),
        }
    }

    pub fn is_frozen(&self) -> bool {
        match self {
            BindingRef::Socket(b) | BindingRef::Stream(b) => b.is_frozen(),
            BindingRef::Signal(b) => b.is_frozen(),
            BindingRef::Timer(b) => b.is_frozen(),
        }
    }

    pub fn is_persistent(&self) -> bool {
        match self {
            BindingRef::Socket(b) | BindingRef::Stream(b) => b.is_persistent(),
            BindingRef::Signal(b) => b.is_persistent(),
            BindingRef::Timer(b) => b.is_persistent(),
        }
    }
}
