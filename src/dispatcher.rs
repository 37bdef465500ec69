//! Binding registries and the public bind/freeze/remove surface.
//!
//! The dispatcher owns four insertion-ordered registries (sockets, streams,
//! signals, timers) keyed by binding id, and is generic over the
//! [`Backend`] seam: every registration side effect flows through the
//! backend's four register/unregister hook pairs, while the orchestration
//! here is shared by all backends.

use std::ops::ControlFlow;
use std::rc::Rc;
use std::time::Duration;

use indexmap::IndexMap;
use metrics::{counter, gauge};
use tracing::debug;

use crate::backend::Backend;
use crate::binding::{
    io_binding_id, BindingRef, CycleHandler, IoBinding, IoEvent, IoHandler, IoKind, IoMode,
    IoTimeout, SignalBinding, SignalHandler, TickHandler, TimerBinding, TimerHandler,
};
use crate::channel::IoChannel;
use crate::error::{Error, Result};
use crate::poll::PollBackend;
use crate::signal::Signal;

/// The reactor's front door: owns all bindings and the loop controls.
///
/// Registries are plain owned collections; nothing here is shared across
/// threads and no operation may be invoked concurrently. Iteration order is
/// insertion order everywhere, which is a documented contract: bindings
/// sharing a descriptor fire in the order they were bound.
pub struct Dispatcher<B: Backend = PollBackend> {
    pub(crate) sockets: IndexMap<String, IoBinding<B>>,
    pub(crate) streams: IndexMap<String, IoBinding<B>>,
    pub(crate) signals: IndexMap<String, SignalBinding<B>>,
    pub(crate) timers: IndexMap<String, TimerBinding<B>>,
    pub(crate) backend: B,
    pub(crate) listening: bool,
    pub(crate) break_loop: bool,
    pub(crate) cycles: u64,
    pub(crate) cycle_handler: Option<CycleHandler<B>>,
    pub(crate) tick_handler: Option<TickHandler<B>>,
}

impl<B: Backend> Dispatcher<B> {
    pub fn with_backend(backend: B) -> Self {
        Self {
            sockets: IndexMap::new(),
            streams: IndexMap::new(),
            signals: IndexMap::new(),
            timers: IndexMap::new(),
            backend,
            listening: false,
            break_loop: false,
            cycles: 0,
            cycle_handler: None,
            tick_handler: None,
        }
    }

    pub fn backend(&self) -> &B {
        &self.backend
    }

    /// Has the event loop been started?
    pub fn is_listening(&self) -> bool {
        self.listening
    }

    /// Requests loop termination at the next iteration boundary.
    pub fn stop(&mut self) {
        if self.listening {
            self.break_loop = true;
        }
    }

    /// Number of completed one-second cycles since the dispatcher was
    /// created.
    pub fn cycles(&self) -> u64 {
        self.cycles
    }

    /// Registers a roughly once-per-second callback; returning
    /// `ControlFlow::Break` requests loop termination.
    pub fn set_cycle_handler(
        &mut self,
        handler: impl FnMut(&mut Self, u64) -> Result<ControlFlow<()>> + 'static,
    ) {
        self.cycle_handler = Some(Box::new(handler));
    }

    pub fn clear_cycle_handler(&mut self) {
        self.cycle_handler = None;
    }

    /// Registers a once-per-iteration callback; returning
    /// `ControlFlow::Break` requests loop termination.
    pub fn set_tick_handler(
        &mut self,
        handler: impl FnMut(&mut Self) -> Result<ControlFlow<()>> + 'static,
    ) {
        self.tick_handler = Some(Box::new(handler));
    }

    pub fn clear_tick_handler(&mut self) {
        self.tick_handler = None;
    }

    // --- Global bulk + query forms ---

    pub fn freeze_all_bindings(&mut self) {
        self.freeze_all_sockets();
        self.freeze_all_streams();
        self.freeze_all_signals();
        self.freeze_all_timers();
    }

    pub fn unfreeze_all_bindings(&mut self) -> Result<()> {
        self.unfreeze_all_sockets()?;
        self.unfreeze_all_streams()?;
        self.unfreeze_all_signals()?;
        self.unfreeze_all_timers()?;
        Ok(())
    }

    pub fn remove_all_bindings(&mut self) {
        self.remove_all_sockets();
        self.remove_all_streams();
        self.remove_all_signals();
        self.remove_all_timers();
    }

    pub fn all_bindings(&self) -> Vec<BindingRef<'_, B>> {
        let mut out = Vec::with_capacity(self.count_all_bindings());
        out.extend(self.sockets.values().map(BindingRef::Socket));
        out.extend(self.streams.values().map(BindingRef::Stream));
        out.extend(self.signals.values().map(BindingRef::Signal));
        out.extend(self.timers.values().map(BindingRef::Timer));
        out
    }

    pub fn count_all_bindings(&self) -> usize {
        self.sockets.len() + self.streams.len() + self.signals.len() + self.timers.len()
    }

    pub(crate) fn binding_counts(&self) -> [usize; 4] {
        [
            self.sockets.len(),
            self.streams.len(),
            self.signals.len(),
            self.timers.len(),
        ]
    }

    // --- Socket bind family ---

    pub fn bind_socket_read(
        &mut self,
        socket: Rc<dyn IoChannel>,
        timeout: Option<IoTimeout<B>>,
        handler: impl FnMut(&mut Self, &IoEvent) -> Result<()> + 'static,
    ) -> Result<String> {
        self.bind_io(IoKind::Socket, IoMode::Read, true, false, socket, timeout, Box::new(handler))
    }

    pub fn bind_frozen_socket_read(
        &mut self,
        socket: Rc<dyn IoChannel>,
        timeout: Option<IoTimeout<B>>,
        handler: impl FnMut(&mut Self, &IoEvent) -> Result<()> + 'static,
    ) -> Result<String> {
        self.bind_io(IoKind::Socket, IoMode::Read, true, true, socket, timeout, Box::new(handler))
    }

    pub fn bind_socket_read_once(
        &mut self,
        socket: Rc<dyn IoChannel>,
        timeout: Option<IoTimeout<B>>,
        handler: impl FnMut(&mut Self, &IoEvent) -> Result<()> + 'static,
    ) -> Result<String> {
        self.bind_io(IoKind::Socket, IoMode::Read, false, false, socket, timeout, Box::new(handler))
    }

    pub fn bind_frozen_socket_read_once(
        &mut self,
        socket: Rc<dyn IoChannel>,
        timeout: Option<IoTimeout<B>>,
        handler: impl FnMut(&mut Self, &IoEvent) -> Result<()> + 'static,
    ) -> Result<String> {
        self.bind_io(IoKind::Socket, IoMode::Read, false, true, socket, timeout, Box::new(handler))
    }

    pub fn bind_socket_write(
        &mut self,
        socket: Rc<dyn IoChannel>,
        timeout: Option<IoTimeout<B>>,
        handler: impl FnMut(&mut Self, &IoEvent) -> Result<()> + 'static,
    ) -> Result<String> {
        self.bind_io(IoKind::Socket, IoMode::Write, true, false, socket, timeout, Box::new(handler))
    }

    pub fn bind_frozen_socket_write(
        &mut self,
        socket: Rc<dyn IoChannel>,
        timeout: Option<IoTimeout<B>>,
        handler: impl FnMut(&mut Self, &IoEvent) -> Result<()> + 'static,
    ) -> Result<String> {
        self.bind_io(IoKind::Socket, IoMode::Write, true, true, socket, timeout, Box::new(handler))
    }

    pub fn bind_socket_write_once(
        &mut self,
        socket: Rc<dyn IoChannel>,
        timeout: Option<IoTimeout<B>>,
        handler: impl FnMut(&mut Self, &IoEvent) -> Result<()> + 'static,
    ) -> Result<String> {
        self.bind_io(IoKind::Socket, IoMode::Write, false, false, socket, timeout, Box::new(handler))
    }

    pub fn bind_frozen_socket_write_once(
        &mut self,
        socket: Rc<dyn IoChannel>,
        timeout: Option<IoTimeout<B>>,
        handler: impl FnMut(&mut Self, &IoEvent) -> Result<()> + 'static,
    ) -> Result<String> {
        self.bind_io(IoKind::Socket, IoMode::Write, false, true, socket, timeout, Box::new(handler))
    }

    // --- Stream bind family ---

    pub fn bind_stream_read(
        &mut self,
        stream: Rc<dyn IoChannel>,
        timeout: Option<IoTimeout<B>>,
        handler: impl FnMut(&mut Self, &IoEvent) -> Result<()> + 'static,
    ) -> Result<String> {
        self.bind_io(IoKind::Stream, IoMode::Read, true, false, stream, timeout, Box::new(handler))
    }

    pub fn bind_frozen_stream_read(
        &mut self,
        stream: Rc<dyn IoChannel>,
        timeout: Option<IoTimeout<B>>,
        handler: impl FnMut(&mut Self, &IoEvent) -> Result<()> + 'static,
    ) -> Result<String> {
        self.bind_io(IoKind::Stream, IoMode::Read, true, true, stream, timeout, Box::new(handler))
    }

    pub fn bind_stream_read_once(
        &mut self,
        stream: Rc<dyn IoChannel>,
        timeout: Option<IoTimeout<B>>,
        handler: impl FnMut(&mut Self, &IoEvent) -> Result<()> + 'static,
    ) -> Result<String> {
        self.bind_io(IoKind::Stream, IoMode::Read, false, false, stream, timeout, Box::new(handler))
    }

    pub fn bind_frozen_stream_read_once(
        &mut self,
        stream: Rc<dyn IoChannel>,
        timeout: Option<IoTimeout<B>>,
        handler: impl FnMut(&mut Self, &IoEvent) -> Result<()> + 'static,
    ) -> Result<String> {
        self.bind_io(IoKind::Stream, IoMode::Read, false, true, stream, timeout, Box::new(handler))
    }

    pub fn bind_stream_write(
        &mut self,
        stream: Rc<dyn IoChannel>,
        timeout: Option<IoTimeout<B>>,
        handler: impl FnMut(&mut Self, &IoEvent) -> Result<()> + 'static,
    ) -> Result<String> {
        self.bind_io(IoKind::Stream, IoMode::Write, true, false, stream, timeout, Box::new(handler))
    }

    pub fn bind_frozen_stream_write(
        &mut self,
        stream: Rc<dyn IoChannel>,
        timeout: Option<IoTimeout<B>>,
        handler: impl FnMut(&mut Self, &IoEvent) -> Result<()> + 'static,
    ) -> Result<String> {
        self.bind_io(IoKind::Stream, IoMode::Write, true, true, stream, timeout, Box::new(handler))
    }

    pub fn bind_stream_write_once(
        &mut self,
        stream: Rc<dyn IoChannel>,
        timeout: Option<IoTimeout<B>>,
        handler: impl FnMut(&mut Self, &IoEvent) -> Result<()> + 'static,
    ) -> Result<String> {
        self.bind_io(IoKind::Stream, IoMode::Write, false, false, stream, timeout, Box::new(handler))
    }

    pub fn bind_frozen_stream_write_once(
        &mut self,
        stream: Rc<dyn IoChannel>,
        timeout: Option<IoTimeout<B>>,
        handler: impl FnMut(&mut Self, &IoEvent) -> Result<()> + 'static,
    ) -> Result<String> {
        self.bind_io(IoKind::Stream, IoMode::Write, false, true, stream, timeout, Box::new(handler))
    }

    // --- Signal bind family ---

    pub fn bind_signal(
        &mut self,
        id: impl Into<String>,
        signals: &[Signal],
        handler: impl FnMut(&mut Self, Signal) -> Result<()> + 'static,
    ) -> Result<String> {
        self.add_signal_binding(id.into(), true, false, signals, Box::new(handler))
    }

    pub fn bind_frozen_signal(
        &mut self,
        id: impl Into<String>,
        signals: &[Signal],
        handler: impl FnMut(&mut Self, Signal) -> Result<()> + 'static,
    ) -> Result<String> {
        self.add_signal_binding(id.into(), true, true, signals, Box::new(handler))
    }

    pub fn bind_signal_once(
        &mut self,
        id: impl Into<String>,
        signals: &[Signal],
        handler: impl FnMut(&mut Self, Signal) -> Result<()> + 'static,
    ) -> Result<String> {
        self.add_signal_binding(id.into(), false, false, signals, Box::new(handler))
    }

    pub fn bind_frozen_signal_once(
        &mut self,
        id: impl Into<String>,
        signals: &[Signal],
        handler: impl FnMut(&mut Self, Signal) -> Result<()> + 'static,
    ) -> Result<String> {
        self.add_signal_binding(id.into(), false, true, signals, Box::new(handler))
    }

    // --- Timer bind family ---

    pub fn bind_timer(
        &mut self,
        id: impl Into<String>,
        duration: Duration,
        handler: impl FnMut(&mut Self) -> Result<()> + 'static,
    ) -> Result<String> {
        self.add_timer_binding(id.into(), true, false, duration, Box::new(handler))
    }

    pub fn bind_frozen_timer(
        &mut self,
        id: impl Into<String>,
        duration: Duration,
        handler: impl FnMut(&mut Self) -> Result<()> + 'static,
    ) -> Result<String> {
        self.add_timer_binding(id.into(), true, true, duration, Box::new(handler))
    }

    pub fn bind_timer_once(
        &mut self,
        id: impl Into<String>,
        duration: Duration,
        handler: impl FnMut(&mut Self) -> Result<()> + 'static,
    ) -> Result<String> {
        self.add_timer_binding(id.into(), false, false, duration, Box::new(handler))
    }

    pub fn bind_frozen_timer_once(
        &mut self,
        id: impl Into<String>,
        duration: Duration,
        handler: impl FnMut(&mut Self) -> Result<()> + 'static,
    ) -> Result<String> {
        self.add_timer_binding(id.into(), false, true, duration, Box::new(handler))
    }

    // --- Socket controls ---

    pub fn freeze_socket(&mut self, socket: &dyn IoChannel) {
        self.freeze_io_channel(IoKind::Socket, socket, &[IoMode::Read, IoMode::Write]);
    }

    pub fn freeze_socket_read(&mut self, socket: &dyn IoChannel) {
        self.freeze_io_channel(IoKind::Socket, socket, &[IoMode::Read]);
    }

    pub fn freeze_socket_write(&mut self, socket: &dyn IoChannel) {
        self.freeze_io_channel(IoKind::Socket, socket, &[IoMode::Write]);
    }

    pub fn freeze_all_sockets(&mut self) {
        let ids: Vec<String> = self.sockets.keys().cloned().collect();
        for id in ids {
            let _ = self.freeze_io_binding(IoKind::Socket, &id);
        }
    }

    pub fn freeze_socket_binding(&mut self, id: &str) -> Result<()> {
        self.freeze_io_binding(IoKind::Socket, id)
    }

    pub fn unfreeze_socket(&mut self, socket: &dyn IoChannel) -> Result<()> {
        self.unfreeze_io_channel(IoKind::Socket, socket, &[IoMode::Read, IoMode::Write])
    }

    pub fn unfreeze_socket_read(&mut self, socket: &dyn IoChannel) -> Result<()> {
        self.unfreeze_io_channel(IoKind::Socket, socket, &[IoMode::Read])
    }

    pub fn unfreeze_socket_write(&mut self, socket: &dyn IoChannel) -> Result<()> {
        self.unfreeze_io_channel(IoKind::Socket, socket, &[IoMode::Write])
    }

    pub fn unfreeze_all_sockets(&mut self) -> Result<()> {
        let ids: Vec<String> = self.sockets.keys().cloned().collect();
        for id in ids {
            self.unfreeze_io_binding(IoKind::Socket, &id)?;
        }
        Ok(())
    }

    pub fn unfreeze_socket_binding(&mut self, id: &str) -> Result<()> {
        self.unfreeze_io_binding(IoKind::Socket, id)
    }

    pub fn remove_socket(&mut self, socket: &dyn IoChannel) {
        self.remove_io_channel(IoKind::Socket, socket, &[IoMode::Read, IoMode::Write]);
    }

    pub fn remove_socket_read(&mut self, socket: &dyn IoChannel) {
        self.remove_io_channel(IoKind::Socket, socket, &[IoMode::Read]);
    }

    pub fn remove_socket_write(&mut self, socket: &dyn IoChannel) {
        self.remove_io_channel(IoKind::Socket, socket, &[IoMode::Write]);
    }

    pub fn remove_socket_binding(&mut self, id: &str) -> Result<()> {
        self.take_io_binding(IoKind::Socket, id)
            .map(drop)
            .ok_or_else(|| Error::NotFound(id.to_owned()))
    }

    pub fn remove_all_sockets(&mut self) {
        let ids: Vec<String> = self.sockets.keys().cloned().collect();
        for id in ids {
            let _ = self.take_io_binding(IoKind::Socket, &id);
        }
    }

    pub fn socket_binding(&self, id: &str) -> Option<&IoBinding<B>> {
        self.sockets.get(id)
    }

    pub fn count_socket_bindings(&self) -> usize {
        self.sockets.len()
    }

    pub fn count_socket_bindings_for(&self, socket: &dyn IoChannel) -> usize {
        self.io_bindings_for(IoKind::Socket, socket).len()
    }

    pub fn socket_bindings(&self) -> Vec<&IoBinding<B>> {
        self.sockets.values().collect()
    }

    pub fn socket_bindings_for(&self, socket: &dyn IoChannel) -> Vec<&IoBinding<B>> {
        self.io_bindings_for(IoKind::Socket, socket)
    }

    pub fn count_socket_read_bindings(&self) -> usize {
        self.count_io_mode(IoKind::Socket, IoMode::Read)
    }

    pub fn socket_read_bindings(&self) -> Vec<&IoBinding<B>> {
        self.io_mode_bindings(IoKind::Socket, IoMode::Read)
    }

    pub fn count_socket_write_bindings(&self) -> usize {
        self.count_io_mode(IoKind::Socket, IoMode::Write)
    }

    pub fn socket_write_bindings(&self) -> Vec<&IoBinding<B>> {
        self.io_mode_bindings(IoKind::Socket, IoMode::Write)
    }

    // --- Stream controls ---

    pub fn freeze_stream(&mut self, stream: &dyn IoChannel) {
        self.freeze_io_channel(IoKind::Stream, stream, &[IoMode::Read, IoMode::Write]);
    }

    pub fn freeze_stream_read(&mut self, stream: &dyn IoChannel) {
        self.freeze_io_channel(IoKind::Stream, stream, &[IoMode::Read]);
    }

    pub fn freeze_stream_write(&mut self, stream: &dyn IoChannel) {
        self.freeze_io_channel(IoKind::Stream, stream, &[IoMode::Write]);
    }

    pub fn freeze_all_streams(&mut self) {
        let ids: Vec<String> = self.streams.keys().cloned().collect();
        for id in ids {
            let _ = self.freeze_io_binding(IoKind::Stream, &id);
        }
    }

    pub fn freeze_stream_binding(&mut self, id: &str) -> Result<()> {
        self.freeze_io_binding(IoKind::Stream, id)
    }

    pub fn unfreeze_stream(&mut self, stream: &dyn IoChannel) -> Result<()> {
        self.unfreeze_io_channel(IoKind::Stream, stream, &[IoMode::Read, IoMode::Write])
    }

    pub fn unfreeze_stream_read(&mut self, stream: &dyn IoChannel) -> Result<()> {
        self.unfreeze_io_channel(IoKind::Stream, stream, &[IoMode::Read])
    }

    pub fn unfreeze_stream_write(&mut self, stream: &dyn IoChannel) -> Result<()> {
        self.unfreeze_io_channel(IoKind::Stream, stream, &[IoMode::Write])
    }

    pub fn unfreeze_all_streams(&mut self) -> Result<()> {
        let ids: Vec<String> = self.streams.keys().cloned().collect();
        for id in ids {
            self.unfreeze_io_binding(IoKind::Stream, &id)?;
        }
        Ok(())
    }

    pub fn unfreeze_stream_binding(&mut self, id: &str) -> Result<()> {
        self.unfreeze_io_binding(IoKind::Stream, id)
    }

    pub fn remove_stream(&mut self, stream: &dyn IoChannel) {
        self.remove_io_channel(IoKind::Stream, stream, &[IoMode::Read, IoMode::Write]);
    }

    pub fn remove_stream_read(&mut self, stream: &dyn IoChannel) {
        self.remove_io_channel(IoKind::Stream, stream, &[IoMode::Read]);
    }

    pub fn remove_stream_write(&mut self, stream: &dyn IoChannel) {
        self.remove_io_channel(IoKind::Stream, stream, &[IoMode::Write]);
    }

    pub fn remove_stream_binding(&mut self, id: &str) -> Result<()> {
        self.take_io_binding(IoKind::Stream, id)
            .map(drop)
            .ok_or_else(|| Error::NotFound(id.to_owned()))
    }

    pub fn remove_all_streams(&mut self) {
        let ids: Vec<String> = self.streams.keys().cloned().collect();
        for id in ids {
            let _ = self.take_io_binding(IoKind::Stream, &id);
        }
    }

    pub fn stream_binding(&self, id: &str) -> Option<&IoBinding<B>> {
        self.streams.get(id)
    }

    pub fn count_stream_bindings(&self) -> usize {
        self.streams.len()
    }

    pub fn count_stream_bindings_for(&self, stream: &dyn IoChannel) -> usize {
        self.io_bindings_for(IoKind::Stream, stream).len()
    }

    pub fn stream_bindings(&self) -> Vec<&IoBinding<B>> {
        self.streams.values().collect()
    }

    pub fn stream_bindings_for(&self, stream: &dyn IoChannel) -> Vec<&IoBinding<B>> {
        self.io_bindings_for(IoKind::Stream, stream)
    }

    pub fn count_stream_read_bindings(&self) -> usize {
        self.count_io_mode(IoKind::Stream, IoMode::Read)
    }

    pub fn stream_read_bindings(&self) -> Vec<&IoBinding<B>> {
        self.io_mode_bindings(IoKind::Stream, IoMode::Read)
    }

    pub fn count_stream_write_bindings(&self) -> usize {
        self.count_io_mode(IoKind::Stream, IoMode::Write)
    }

    pub fn stream_write_bindings(&self) -> Vec<&IoBinding<B>> {
        self.io_mode_bindings(IoKind::Stream, IoMode::Write)
    }

    // --- Signal controls ---

    pub fn freeze_signal(&mut self, signal: Signal) {
        let ids = self.signal_ids_for(signal);
        for id in ids {
            let _ = self.freeze_signal_binding(&id);
        }
    }

    pub fn freeze_signal_binding(&mut self, id: &str) -> Result<()> {
        let binding = self
            .signals
            .get_mut(id)
            .ok_or_else(|| Error::NotFound(id.to_owned()))?;
        if binding.frozen {
            return Ok(());
        }
        if binding.resource.is_some() {
            self.backend.unregister_signal(binding);
            binding.resource = None;
        }
        binding.frozen = true;
        Ok(())
    }

    pub fn freeze_all_signals(&mut self) {
        let ids: Vec<String> = self.signals.keys().cloned().collect();
        for id in ids {
            let _ = self.freeze_signal_binding(&id);
        }
    }

    pub fn unfreeze_signal(&mut self, signal: Signal) -> Result<()> {
        let ids = self.signal_ids_for(signal);
        for id in ids {
            self.unfreeze_signal_binding(&id)?;
        }
        Ok(())
    }

    pub fn unfreeze_signal_binding(&mut self, id: &str) -> Result<()> {
        let binding = self
            .signals
            .get_mut(id)
            .ok_or_else(|| Error::NotFound(id.to_owned()))?;
        if !binding.frozen {
            return Ok(());
        }
        let resource = self.backend.register_signal(binding)?;
        binding.resource = Some(resource);
        binding.frozen = false;
        Ok(())
    }

    pub fn unfreeze_all_signals(&mut self) -> Result<()> {
        let ids: Vec<String> = self.signals.keys().cloned().collect();
        for id in ids {
            self.unfreeze_signal_binding(&id)?;
        }
        Ok(())
    }

    pub fn remove_signal(&mut self, signal: Signal) {
        let ids = self.signal_ids_for(signal);
        for id in ids {
            let _ = self.take_signal_binding(&id);
        }
    }

    pub fn remove_signal_binding(&mut self, id: &str) -> Result<()> {
        self.take_signal_binding(id)
            .map(drop)
            .ok_or_else(|| Error::NotFound(id.to_owned()))
    }

    pub fn remove_all_signals(&mut self) {
        let ids: Vec<String> = self.signals.keys().cloned().collect();
        for id in ids {
            let _ = self.take_signal_binding(&id);
        }
    }

    pub fn signal_binding(&self, id: &str) -> Option<&SignalBinding<B>> {
        self.signals.get(id)
    }

    pub fn count_signal_bindings(&self) -> usize {
        self.signals.len()
    }

    pub fn count_signal_bindings_for(&self, signal: Signal) -> usize {
        self.signals
            .values()
            .filter(|b| b.has_signal(signal))
            .count()
    }

    pub fn signal_bindings(&self) -> Vec<&SignalBinding<B>> {
        self.signals.values().collect()
    }

    pub fn signal_bindings_for(&self, signal: Signal) -> Vec<&SignalBinding<B>> {
        self.signals
            .values()
            .filter(|b| b.has_signal(signal))
            .collect()
    }

    // --- Timer controls ---

    pub fn freeze_timer(&mut self, id: &str) -> Result<()> {
        let binding = self
            .timers
            .get_mut(id)
            .ok_or_else(|| Error::NotFound(id.to_owned()))?;
        if binding.frozen {
            return Ok(());
        }
        if binding.resource.is_some() {
            self.backend.unregister_timer(binding);
            binding.resource = None;
        }
        binding.frozen = true;
        Ok(())
    }

    pub fn freeze_all_timers(&mut self) {
        let ids: Vec<String> = self.timers.keys().cloned().collect();
        for id in ids {
            let _ = self.freeze_timer(&id);
        }
    }

    pub fn unfreeze_timer(&mut self, id: &str) -> Result<()> {
        let binding = self
            .timers
            .get_mut(id)
            .ok_or_else(|| Error::NotFound(id.to_owned()))?;
        if !binding.frozen {
            return Ok(());
        }
        let resource = self.backend.register_timer(binding)?;
        binding.resource = Some(resource);
        binding.frozen = false;
        Ok(())
    }

    pub fn unfreeze_all_timers(&mut self) -> Result<()> {
        let ids: Vec<String> = self.timers.keys().cloned().collect();
        for id in ids {
            self.unfreeze_timer(&id)?;
        }
        Ok(())
    }

    pub fn remove_timer(&mut self, id: &str) -> Result<()> {
        self.take_timer_binding(id)
            .map(drop)
            .ok_or_else(|| Error::NotFound(id.to_owned()))
    }

    pub fn remove_all_timers(&mut self) {
        let ids: Vec<String> = self.timers.keys().cloned().collect();
        for id in ids {
            let _ = self.take_timer_binding(&id);
        }
    }

    pub fn timer_binding(&self, id: &str) -> Option<&TimerBinding<B>> {
        self.timers.get(id)
    }

    pub fn count_timer_bindings(&self) -> usize {
        self.timers.len()
    }

    pub fn timer_bindings(&self) -> Vec<&TimerBinding<B>> {
        self.timers.values().collect()
    }

    // --- Registration plumbing ---

    #[allow(clippy::too_many_arguments)]
    fn bind_io(
        &mut self,
        kind: IoKind,
        mode: IoMode,
        persistent: bool,
        frozen: bool,
        channel: Rc<dyn IoChannel>,
        timeout: Option<IoTimeout<B>>,
        handler: IoHandler<B>,
    ) -> Result<String> {
        let id = io_binding_id(mode, channel.as_ref());
        let (after, timeout_handler) = match timeout {
            Some(t) => (Some(t.after), Some(t.handler)),
            None => (None, None),
        };
        let mut binding = IoBinding {
            id: id.clone(),
            persistent,
            frozen: false,
            mode,
            channel,
            timeout: after,
            handler: Some(handler),
            timeout_handler,
            resource: None,
        };

        // Re-binding an id replaces the previous binding, unregistering
        // its native resource first.
        let _ = self.take_io_binding(kind, &id);

        if frozen {
            binding.frozen = true;
        } else {
            let resource = match kind {
                IoKind::Socket => self.backend.register_socket(&binding)?,
                IoKind::Stream => self.backend.register_stream(&binding)?,
            };
            binding.resource = Some(resource);
        }

        debug!(kind = kind.label(), id = %id, persistent, frozen, "io binding added");
        gauge!("eventide_bindings_current").increment(1.0);
        match kind {
            IoKind::Socket => self.sockets.insert(id.clone(), binding),
            IoKind::Stream => self.streams.insert(id.clone(), binding),
        };
        Ok(id)
    }

    fn add_signal_binding(
        &mut self,
        id: String,
        persistent: bool,
        frozen: bool,
        signals: &[Signal],
        handler: SignalHandler<B>,
    ) -> Result<String> {
        if signals.is_empty() {
            return Err(Error::InvalidArgument(
                "signal binding needs at least one signal".into(),
            ));
        }
        if let Some(signal) = signals.iter().find(|s| !s.hookable()) {
            return Err(Error::ComponentUnavailable(format!(
                "{signal} cannot be dispatched through process signal handling"
            )));
        }

        let mut set = IndexMap::new();
        for signal in signals {
            set.insert(signal.number(), *signal);
        }
        let mut binding = SignalBinding {
            id: id.clone(),
            persistent,
            frozen: false,
            signals: set,
            handler: Some(handler),
            resource: None,
        };

        let _ = self.take_signal_binding(&id);

        if frozen {
            binding.frozen = true;
        } else {
            let resource = self.backend.register_signal(&binding)?;
            binding.resource = Some(resource);
        }

        debug!(id = %id, persistent, frozen, "signal binding added");
        gauge!("eventide_bindings_current").increment(1.0);
        self.signals.insert(id.clone(), binding);
        Ok(id)
    }

    fn add_timer_binding(
        &mut self,
        id: String,
        persistent: bool,
        frozen: bool,
        duration: Duration,
        handler: TimerHandler<B>,
    ) -> Result<String> {
        let mut binding = TimerBinding {
            id: id.clone(),
            persistent,
            frozen: false,
            duration,
            handler: Some(handler),
            resource: None,
        };

        let _ = self.take_timer_binding(&id);

        if frozen {
            binding.frozen = true;
        } else {
            let resource = self.backend.register_timer(&binding)?;
            binding.resource = Some(resource);
        }

        debug!(id = %id, persistent, frozen, duration_ms = duration.as_millis() as u64, "timer binding added");
        gauge!("eventide_bindings_current").increment(1.0);
        self.timers.insert(id.clone(), binding);
        Ok(id)
    }

    fn freeze_io_binding(&mut self, kind: IoKind, id: &str) -> Result<()> {
        let map = match kind {
            IoKind::Socket => &mut self.sockets,
            IoKind::Stream => &mut self.streams,
        };
        let binding = map
            .get_mut(id)
            .ok_or_else(|| Error::NotFound(id.to_owned()))?;
        if binding.frozen {
            return Ok(());
        }
        if binding.resource.is_some() {
            match kind {
                IoKind::Socket => self.backend.unregister_socket(binding),
                IoKind::Stream => self.backend.unregister_stream(binding),
            }
            binding.resource = None;
        }
        binding.frozen = true;
        Ok(())
    }

    fn unfreeze_io_binding(&mut self, kind: IoKind, id: &str) -> Result<()> {
        let map = match kind {
            IoKind::Socket => &mut self.sockets,
            IoKind::Stream => &mut self.streams,
        };
        let binding = map
            .get_mut(id)
            .ok_or_else(|| Error::NotFound(id.to_owned()))?;
        if !binding.frozen {
            return Ok(());
        }
        let resource = match kind {
            IoKind::Socket => self.backend.register_socket(binding)?,
            IoKind::Stream => self.backend.register_stream(binding)?,
        };
        binding.resource = Some(resource);
        binding.frozen = false;
        Ok(())
    }

    fn freeze_io_channel(&mut self, kind: IoKind, channel: &dyn IoChannel, modes: &[IoMode]) {
        for &mode in modes {
            let id = io_binding_id(mode, channel);
            let _ = self.freeze_io_binding(kind, &id);
        }
    }

    fn unfreeze_io_channel(
        &mut self,
        kind: IoKind,
        channel: &dyn IoChannel,
        modes: &[IoMode],
    ) -> Result<()> {
        for &mode in modes {
            let id = io_binding_id(mode, channel);
            match self.unfreeze_io_binding(kind, &id) {
                Ok(()) | Err(Error::NotFound(_)) => {}
                Err(err) => return Err(err),
            }
        }
        Ok(())
    }

    fn remove_io_channel(&mut self, kind: IoKind, channel: &dyn IoChannel, modes: &[IoMode]) {
        for &mode in modes {
            let id = io_binding_id(mode, channel);
            let _ = self.take_io_binding(kind, &id);
        }
    }

    fn take_io_binding(&mut self, kind: IoKind, id: &str) -> Option<IoBinding<B>> {
        let binding = match kind {
            IoKind::Socket => self.sockets.shift_remove(id),
            IoKind::Stream => self.streams.shift_remove(id),
        }?;
        if binding.resource.is_some() {
            match kind {
                IoKind::Socket => self.backend.unregister_socket(&binding),
                IoKind::Stream => self.backend.unregister_stream(&binding),
            }
        }
        debug!(kind = kind.label(), id = %id, "io binding removed");
        gauge!("eventide_bindings_current").decrement(1.0);
        Some(binding)
    }

    fn take_signal_binding(&mut self, id: &str) -> Option<SignalBinding<B>> {
        let binding = self.signals.shift_remove(id)?;
        if binding.resource.is_some() {
            self.backend.unregister_signal(&binding);
        }
        debug!(id = %id, "signal binding removed");
        gauge!("eventide_bindings_current").decrement(1.0);
        Some(binding)
    }

    fn take_timer_binding(&mut self, id: &str) -> Option<TimerBinding<B>> {
        let binding = self.timers.shift_remove(id)?;
        if binding.resource.is_some() {
            self.backend.unregister_timer(&binding);
        }
        debug!(id = %id, "timer binding removed");
        gauge!("eventide_bindings_current").decrement(1.0);
        Some(binding)
    }

    fn io_bindings_for(&self, kind: IoKind, channel: &dyn IoChannel) -> Vec<&IoBinding<B>> {
        let map = match kind {
            IoKind::Socket => &self.sockets,
            IoKind::Stream => &self.streams,
        };
        [IoMode::Read, IoMode::Write]
            .into_iter()
            .filter_map(|mode| map.get(&io_binding_id(mode, channel)))
            .collect()
    }

    fn count_io_mode(&self, kind: IoKind, mode: IoMode) -> usize {
        let map = match kind {
            IoKind::Socket => &self.sockets,
            IoKind::Stream => &self.streams,
        };
        map.values().filter(|b| b.mode == mode).count()
    }

    fn io_mode_bindings(&self, kind: IoKind, mode: IoMode) -> Vec<&IoBinding<B>> {
        let map = match kind {
            IoKind::Socket => &self.sockets,
            IoKind::Stream => &self.streams,
        };
        map.values().filter(|b| b.mode == mode).collect()
    }

    fn signal_ids_for(&self, signal: Signal) -> Vec<String> {
        self.signals
            .iter()
            .filter(|(_, b)| b.has_signal(signal))
            .map(|(id, _)| id.clone())
            .collect()
    }

    // --- Trigger paths (invoked by the active backend's loop) ---

    pub(crate) fn trigger_io(&mut self, kind: IoKind, id: &str) -> Result<()> {
        let map = match kind {
            IoKind::Socket => &mut self.sockets,
            IoKind::Stream => &mut self.streams,
        };
        let Some(binding) = map.get_mut(id) else {
            return Ok(());
        };
        if binding.frozen {
            return Ok(());
        }
        let Some(mut handler) = binding.handler.take() else {
            return Ok(());
        };
        let event = IoEvent {
            channel: Rc::clone(&binding.channel),
            binding: id.to_owned(),
            mode: binding.mode,
        };
        let persistent = binding.persistent;

        counter!("eventide_triggers_total", "kind" => kind.label()).increment(1);
        let outcome = handler(self, &event);

        let map = match kind {
            IoKind::Socket => &mut self.sockets,
            IoKind::Stream => &mut self.streams,
        };
        if let Some(binding) = map.get_mut(id) {
            if binding.handler.is_none() {
                binding.handler = Some(handler);
            }
        }
        outcome?;

        if !persistent {
            let _ = self.take_io_binding(kind, id);
        }
        Ok(())
    }

    pub(crate) fn trigger_io_timeout(&mut self, kind: IoKind, id: &str) -> Result<()> {
        let map = match kind {
            IoKind::Socket => &mut self.sockets,
            IoKind::Stream => &mut self.streams,
        };
        let Some(binding) = map.get_mut(id) else {
            return Ok(());
        };
        if binding.frozen {
            return Ok(());
        }
        let Some(mut handler) = binding.timeout_handler.take() else {
            return Ok(());
        };
        let event = IoEvent {
            channel: Rc::clone(&binding.channel),
            binding: id.to_owned(),
            mode: binding.mode,
        };

        counter!("eventide_timeouts_total", "kind" => kind.label()).increment(1);
        let outcome = handler(self, &event);

        let map = match kind {
            IoKind::Socket => &mut self.sockets,
            IoKind::Stream => &mut self.streams,
        };
        if let Some(binding) = map.get_mut(id) {
            if binding.timeout_handler.is_none() {
                binding.timeout_handler = Some(handler);
            }
        }
        outcome
    }

    pub(crate) fn trigger_signal(&mut self, id: &str, number: i32) -> Result<()> {
        let Some(binding) = self.signals.get_mut(id) else {
            return Ok(());
        };
        if binding.frozen {
            return Ok(());
        }
        let Some(signal) = binding.signals.get(&number).copied() else {
            return Ok(());
        };
        let Some(mut handler) = binding.handler.take() else {
            return Ok(());
        };
        let persistent = binding.persistent;

        counter!("eventide_triggers_total", "kind" => "signal").increment(1);
        let outcome = handler(self, signal);

        if let Some(binding) = self.signals.get_mut(id) {
            if binding.handler.is_none() {
                binding.handler = Some(handler);
            }
        }
        outcome?;

        if !persistent {
            let _ = self.take_signal_binding(id);
        }
        Ok(())
    }

    pub(crate) fn trigger_timer(&mut self, id: &str) -> Result<()> {
        let Some(binding) = self.timers.get_mut(id) else {
            return Ok(());
        };
        if binding.frozen {
            return Ok(());
        }
        let Some(mut handler) = binding.handler.take() else {
            return Ok(());
        };
        let persistent = binding.persistent;

        counter!("eventide_triggers_total", "kind" => "timer").increment(1);
        let outcome = handler(self);

        if let Some(binding) = self.timers.get_mut(id) {
            if binding.handler.is_none() {
                binding.handler = Some(handler);
            }
        }
        outcome?;

        if !persistent {
            let _ = self.take_timer_binding(id);
        }
        Ok(())
    }
}

impl<B: Backend> Drop for Dispatcher<B> {
    fn drop(&mut self) {
        self.remove_all_bindings();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::EventResource;
    use crate::channel::ChannelId;
    use std::cell::Cell;
    use std::os::fd::RawFd;

    #[derive(Clone, Default)]
    struct Counters {
        registered: Rc<Cell<usize>>,
        unregistered: Rc<Cell<usize>>,
    }

    struct CountingBackend {
        counters: Counters,
        next: u64,
    }

    impl CountingBackend {
        fn new(counters: Counters) -> Self {
            Self { counters, next: 0 }
        }

        fn issue(&mut self) -> Result<EventResource> {
            self.counters.registered.set(self.counters.registered.get() + 1);
            self.next += 1;
            Ok(EventResource::new(self.next))
        }

        fn retire(&mut self) {
            self.counters
                .unregistered
                .set(self.counters.unregistered.get() + 1);
        }
    }

    impl Backend for CountingBackend {
        fn register_socket(&mut self, _: &IoBinding<Self>) -> Result<EventResource> {
            self.issue()
        }

        fn unregister_socket(&mut self, _: &IoBinding<Self>) {
            self.retire();
        }

        fn register_stream(&mut self, _: &IoBinding<Self>) -> Result<EventResource> {
            self.issue()
        }

        fn unregister_stream(&mut self, _: &IoBinding<Self>) {
            self.retire();
        }

        fn register_signal(&mut self, _: &SignalBinding<Self>) -> Result<EventResource> {
            self.issue()
        }

        fn unregister_signal(&mut self, _: &SignalBinding<Self>) {
            self.retire();
        }

        fn register_timer(&mut self, _: &TimerBinding<Self>) -> Result<EventResource> {
            self.issue()
        }

        fn unregister_timer(&mut self, _: &TimerBinding<Self>) {
            self.retire();
        }
    }

    struct FakeChannel {
        id: ChannelId,
        fd: RawFd,
    }

    impl IoChannel for FakeChannel {
        fn channel_id(&self) -> ChannelId {
            self.id
        }

        fn raw_fd(&self) -> Option<RawFd> {
            Some(self.fd)
        }
    }

    fn chan() -> Rc<FakeChannel> {
        Rc::new(FakeChannel {
            id: ChannelId::next(),
            fd: -1,
        })
    }

    fn dispatcher() -> (Dispatcher<CountingBackend>, Counters) {
        let counters = Counters::default();
        (
            Dispatcher::with_backend(CountingBackend::new(counters.clone())),
            counters,
        )
    }

    #[test]
    fn counts_reflect_registry_snapshot() {
        let (mut d, _) = dispatcher();
        let socket = chan();
        let stream = chan();

        d.bind_socket_read(socket.clone(), None, |_, _| Ok(())).unwrap();
        d.bind_socket_write(socket.clone(), None, |_, _| Ok(())).unwrap();
        d.bind_stream_read(stream.clone(), None, |_, _| Ok(())).unwrap();
        d.bind_timer("t", Duration::from_secs(1), |_| Ok(())).unwrap();

        assert_eq!(d.count_all_bindings(), 4);
        assert_eq!(d.count_socket_bindings(), 2);
        assert_eq!(d.count_socket_read_bindings(), 1);
        assert_eq!(d.count_socket_write_bindings(), 1);
        assert_eq!(d.count_socket_bindings_for(socket.as_ref()), 2);
        assert_eq!(d.count_stream_bindings(), 1);
        assert_eq!(d.all_bindings().len(), 4);
        assert_eq!(
            d.count_socket_bindings(),
            d.count_socket_read_bindings() + d.count_socket_write_bindings()
        );
    }

    #[test]
    fn rebinding_replaces_and_unregisters_once() {
        let (mut d, counters) = dispatcher();
        let socket = chan();

        let first = d.bind_socket_read(socket.clone(), None, |_, _| Ok(())).unwrap();
        let second = d.bind_socket_read(socket.clone(), None, |_, _| Ok(())).unwrap();

        assert_eq!(first, second);
        assert_eq!(d.count_socket_bindings(), 1);
        assert_eq!(counters.registered.get(), 2);
        assert_eq!(counters.unregistered.get(), 1);
    }

    #[test]
    fn remove_all_bindings_balances_backend() {
        let (mut d, counters) = dispatcher();
        let socket = chan();
        let stream = chan();

        d.bind_socket_read(socket.clone(), None, |_, _| Ok(())).unwrap();
        d.bind_stream_write(stream.clone(), None, |_, _| Ok(())).unwrap();
        d.bind_signal("usr1", &[Signal::from_name("SIGUSR1").unwrap()], |_, _| Ok(()))
            .unwrap();
        d.bind_timer("t", Duration::from_millis(10), |_| Ok(())).unwrap();

        d.remove_all_bindings();

        assert_eq!(d.count_all_bindings(), 0);
        assert_eq!(d.count_socket_bindings(), 0);
        assert_eq!(d.count_stream_bindings(), 0);
        assert_eq!(d.count_signal_bindings(), 0);
        assert_eq!(d.count_timer_bindings(), 0);
        assert_eq!(counters.registered.get(), counters.unregistered.get());
    }

    #[test]
    fn drop_unregisters_everything() {
        let counters = {
            let (mut d, counters) = dispatcher();
            d.bind_socket_read(chan(), None, |_, _| Ok(())).unwrap();
            d.bind_timer("t", Duration::from_secs(1), |_| Ok(())).unwrap();
            counters
        };
        assert_eq!(counters.registered.get(), 2);
        assert_eq!(counters.registered.get(), counters.unregistered.get());
    }

    #[test]
    fn frozen_creation_skips_registration() {
        let (mut d, counters) = dispatcher();
        let socket = chan();

        let id = d
            .bind_frozen_socket_read(socket.clone(), None, |_, _| Ok(()))
            .unwrap();

        let binding = d.socket_binding(&id).unwrap();
        assert!(binding.is_frozen());
        assert!(binding.resource().is_none());
        assert_eq!(counters.registered.get(), 0);

        d.unfreeze_socket_binding(&id).unwrap();
        let binding = d.socket_binding(&id).unwrap();
        assert!(!binding.is_frozen());
        assert!(binding.resource().is_some());
        assert_eq!(counters.registered.get(), 1);
    }

    #[test]
    fn freeze_is_idempotent() {
        let (mut d, counters) = dispatcher();
        let socket = chan();
        let id = d.bind_socket_read(socket.clone(), None, |_, _| Ok(())).unwrap();

        d.freeze_socket_binding(&id).unwrap();
        d.freeze_socket_binding(&id).unwrap();

        assert_eq!(counters.unregistered.get(), 1);
        assert!(d.socket_binding(&id).unwrap().is_frozen());

        d.unfreeze_socket_binding(&id).unwrap();
        d.unfreeze_socket_binding(&id).unwrap();
        assert_eq!(counters.registered.get(), 2);
    }

    #[test]
    fn unknown_ids_are_not_found() {
        let (mut d, _) = dispatcher();

        assert!(matches!(d.freeze_timer("nope"), Err(Error::NotFound(_))));
        assert!(matches!(d.remove_timer("nope"), Err(Error::NotFound(_))));
        assert!(matches!(
            d.remove_socket_binding("r:999"),
            Err(Error::NotFound(_))
        ));
        assert!(matches!(
            d.freeze_signal_binding("nope"),
            Err(Error::NotFound(_))
        ));
    }

    #[test]
    fn once_bindings_report_non_persistent() {
        let (mut d, _) = dispatcher();
        let id = d
            .bind_timer_once("t", Duration::from_millis(5), |_| Ok(()))
            .unwrap();
        assert!(!d.timer_binding(&id).unwrap().is_persistent());
    }

    #[test]
    fn signal_binding_validation() {
        let (mut d, _) = dispatcher();

        assert!(matches!(
            d.bind_signal("empty", &[], |_, _| Ok(())),
            Err(Error::InvalidArgument(_))
        ));
        assert!(matches!(
            d.bind_signal("kill", &[Signal::from_name("SIGKILL").unwrap()], |_, _| Ok(())),
            Err(Error::ComponentUnavailable(_))
        ));
        assert_eq!(d.count_signal_bindings(), 0);
    }

    #[test]
    fn signal_queries_by_number() {
        let (mut d, _) = dispatcher();
        let usr1 = Signal::from_name("SIGUSR1").unwrap();
        let usr2 = Signal::from_name("SIGUSR2").unwrap();

        d.bind_signal("both", &[usr1, usr2], |_, _| Ok(())).unwrap();
        d.bind_signal("one", &[usr2], |_, _| Ok(())).unwrap();

        assert_eq!(d.count_signal_bindings_for(usr1), 1);
        assert_eq!(d.count_signal_bindings_for(usr2), 2);
        assert_eq!(d.signal_bindings_for(usr2).len(), 2);

        d.remove_signal(usr1);
        assert_eq!(d.count_signal_bindings(), 1);
        assert!(d.signal_binding("one").is_some());
    }

    #[test]
    fn trigger_removes_one_shot_binding() {
        let (mut d, counters) = dispatcher();
        let fired = Rc::new(Cell::new(0u32));
        let seen = fired.clone();
        d.bind_timer_once("t", Duration::from_millis(5), move |_| {
            seen.set(seen.get() + 1);
            Ok(())
        })
        .unwrap();

        d.trigger_timer("t").unwrap();
        assert_eq!(fired.get(), 1);
        assert_eq!(d.count_timer_bindings(), 0);
        assert_eq!(counters.registered.get(), counters.unregistered.get());

        // Second trigger on the vanished id is a no-op.
        d.trigger_timer("t").unwrap();
        assert_eq!(fired.get(), 1);
    }

    #[test]
    fn trigger_skips_frozen_binding() {
        let (mut d, _) = dispatcher();
        let fired = Rc::new(Cell::new(0u32));
        let seen = fired.clone();
        d.bind_timer("t", Duration::from_millis(5), move |_| {
            seen.set(seen.get() + 1);
            Ok(())
        })
        .unwrap();
        d.freeze_timer("t").unwrap();

        d.trigger_timer("t").unwrap();
        assert_eq!(fired.get(), 0);
        assert_eq!(d.count_timer_bindings(), 1);
    }

    #[test]
    fn handler_can_remove_itself() {
        let (mut d, _) = dispatcher();
        d.bind_timer("t", Duration::from_millis(5), |d| {
            d.remove_timer("t")?;
            Ok(())
        })
        .unwrap();

        d.trigger_timer("t").unwrap();
        assert_eq!(d.count_timer_bindings(), 0);
    }

    #[test]
    fn handler_error_propagates_and_keeps_binding() {
        let (mut d, _) = dispatcher();
        d.bind_timer("t", Duration::from_millis(5), |_| {
            Err(Error::unhandled(std::io::Error::other("boom")))
        })
        .unwrap();

        assert!(matches!(d.trigger_timer("t"), Err(Error::Unhandled(_))));
        assert_eq!(d.count_timer_bindings(), 1);
    }
}
