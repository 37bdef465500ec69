//! The polling backend and the `listen()` loop.
//!
//! This is the select-style reactor: descriptor maps are regenerated from
//! registry state whenever bindings change, each iteration runs one
//! bounded multiplex poll per descriptor class, and timers, signals and
//! the cycle/tick callbacks are serviced in a fixed order on the single
//! control thread.

mod io_poller;
mod signals;

use std::collections::HashMap;
use std::thread;
use std::time::{Duration, Instant};

use indexmap::IndexMap;
use metrics::counter;
use tracing::debug;

use crate::backend::{Backend, EventResource};
use crate::binding::{IoBinding, IoKind, SignalBinding, TimerBinding};
use crate::dispatcher::Dispatcher;
use crate::error::{Error, Result};

use io_poller::{IoPoller, MapEntry};
use signals::SignalDriver;

/// Budget for one multiplex poll; long enough to avoid busy-spinning,
/// short enough that timers and signals keep getting serviced.
const POLL_BUDGET: Duration = Duration::from_millis(10);

/// Sleep taken on iterations where no poller ran at all.
const IDLE_INTERVAL: Duration = Duration::from_millis(30);

/// Cadence of the cycle handler.
const CYCLE_INTERVAL: Duration = Duration::from_secs(1);

/// Backend multiplexing through per-iteration descriptor polls.
///
/// Registration hooks only mark the maps dirty and tally live handles;
/// the actual descriptor registrations happen at map regeneration inside
/// the loop, from registry state.
pub struct PollBackend {
    pub(crate) dirty: bool,
    pub(crate) socket_poller: IoPoller,
    pub(crate) stream_poller: IoPoller,
    pub(crate) signal_driver: SignalDriver,
    next_token: u64,
    active: usize,
}

impl PollBackend {
    pub fn new() -> Self {
        Self {
            dirty: true,
            socket_poller: IoPoller::new(),
            stream_poller: IoPoller::new(),
            signal_driver: SignalDriver::new(),
            next_token: 0,
            active: 0,
        }
    }

    /// Number of bindings currently registered with this backend; zero
    /// once every binding has been removed or frozen.
    pub fn active_registrations(&self) -> usize {
        self.active
    }

    fn issue(&mut self) -> EventResource {
        self.active += 1;
        self.next_token += 1;
        EventResource::new(self.next_token)
    }

    fn retire(&mut self) {
        self.active = self.active.saturating_sub(1);
    }
}

impl Default for PollBackend {
    fn default() -> Self {
        Self::new()
    }
}

impl Backend for PollBackend {
    fn register_socket(&mut self, _binding: &IoBinding<Self>) -> Result<EventResource> {
        self.dirty = true;
        Ok(self.issue())
    }

    fn unregister_socket(&mut self, _binding: &IoBinding<Self>) {
        self.dirty = true;
        self.retire();
    }

    fn register_stream(&mut self, _binding: &IoBinding<Self>) -> Result<EventResource> {
        self.dirty = true;
        Ok(self.issue())
    }

    fn unregister_stream(&mut self, _binding: &IoBinding<Self>) {
        self.dirty = true;
        self.retire();
    }

    fn register_signal(&mut self, _binding: &SignalBinding<Self>) -> Result<EventResource> {
        Ok(self.issue())
    }

    fn unregister_signal(&mut self, _binding: &SignalBinding<Self>) {
        self.retire();
    }

    fn register_timer(&mut self, _binding: &TimerBinding<Self>) -> Result<EventResource> {
        Ok(self.issue())
    }

    fn unregister_timer(&mut self, _binding: &TimerBinding<Self>) {
        self.retire();
    }
}

fn map_entries<B: Backend>(map: &IndexMap<String, IoBinding<B>>) -> Result<Vec<MapEntry>> {
    let mut entries = Vec::with_capacity(map.len());
    for (id, binding) in map {
        if binding.frozen {
            continue;
        }
        let fd = binding.channel.raw_fd().ok_or_else(|| {
            Error::InvalidArgument(format!("channel for binding {id} has no usable descriptor"))
        })?;
        entries.push(MapEntry {
            id: id.clone(),
            fd,
            mode: binding.mode,
        });
    }
    Ok(entries)
}

impl Dispatcher<PollBackend> {
    pub fn new() -> Self {
        Self::with_backend(PollBackend::new())
    }

    /// Runs the event loop until a stop condition is met.
    ///
    /// Precondition: the loop is not already running; `listen()` is not
    /// re-entrant and a handler calling it panics.
    ///
    /// Signal delivery hooks for every currently-bound signal number are
    /// installed on entry and removed again before returning, whether the
    /// loop ends by `stop()`, by running out of work, or with an error.
    pub fn listen(&mut self) -> Result<()> {
        assert!(!self.listening, "listen() is not re-entrant");

        self.listening = true;
        self.break_loop = false;
        self.backend.dirty = true;

        let numbers = self.bound_signal_numbers();
        self.backend.signal_driver.install(&numbers);

        let outcome = self.run_loop();

        self.backend.signal_driver.uninstall();
        self.listening = false;
        self.break_loop = false;

        outcome
    }

    fn run_loop(&mut self) -> Result<()> {
        let loop_start = Instant::now();
        let mut timer_marks: HashMap<String, Instant> = HashMap::new();
        let mut io_marks: HashMap<String, Instant> = HashMap::new();
        let mut last_cycle = loop_start;

        while !self.break_loop {
            let counts = self.binding_counts();

            if self.backend.dirty {
                self.generate_maps()?;
            }

            // Timers
            if !self.timers.is_empty() {
                let now = Instant::now();
                let due: Vec<String> = self
                    .timers
                    .iter()
                    .filter(|(id, binding)| {
                        !binding.frozen
                            && now.duration_since(*timer_marks.get(*id).unwrap_or(&loop_start))
                                >= binding.duration
                    })
                    .map(|(id, _)| id.clone())
                    .collect();
                for id in due {
                    timer_marks.insert(id.clone(), now);
                    self.trigger_timer(&id)?;
                }
            }

            // Signals
            if !self.signals.is_empty() {
                for number in self.backend.signal_driver.drain() {
                    let ids: Vec<String> = self
                        .signals
                        .iter()
                        .filter(|(_, binding)| {
                            !binding.frozen && binding.signals.contains_key(&number)
                        })
                        .map(|(id, _)| id.clone())
                        .collect();
                    for id in ids {
                        self.trigger_signal(&id, number)?;
                    }
                }
            }

            // Socket readiness
            let mut polled = false;
            if !self.backend.socket_poller.is_empty() {
                polled = true;
                let ready = self.backend.socket_poller.wait(POLL_BUDGET);
                for id in ready {
                    io_marks.insert(id.clone(), Instant::now());
                    self.trigger_io(IoKind::Socket, &id)?;
                }
            }

            // Stream readiness
            if !self.backend.stream_poller.is_empty() {
                polled = true;
                let ready = self.backend.stream_poller.wait(POLL_BUDGET);
                for id in ready {
                    io_marks.insert(id.clone(), Instant::now());
                    self.trigger_io(IoKind::Stream, &id)?;
                }
            }

            // Per-binding readiness timeouts
            self.fire_io_timeouts(&mut io_marks, loop_start)?;

            // Tick handler
            if let Some(mut handler) = self.tick_handler.take() {
                let outcome = handler(self);
                if self.tick_handler.is_none() {
                    self.tick_handler = Some(handler);
                }
                if outcome?.is_break() {
                    self.break_loop = true;
                }
            }

            // Cycle handler
            if self.cycle_handler.is_some() && last_cycle.elapsed() >= CYCLE_INTERVAL {
                last_cycle = Instant::now();
                self.cycles += 1;
                let cycles = self.cycles;
                counter!("eventide_cycles_total").increment(1);
                if let Some(mut handler) = self.cycle_handler.take() {
                    let outcome = handler(self, cycles);
                    if self.cycle_handler.is_none() {
                        self.cycle_handler = Some(handler);
                    }
                    if outcome?.is_break() {
                        self.break_loop = true;
                    }
                }
            }

            // Nothing left to wait for?
            if self.count_all_bindings() == 0
                && self.cycle_handler.is_none()
                && self.tick_handler.is_none()
            {
                debug!("no bindings or handlers left, stopping loop");
                self.break_loop = true;
            } else if counts != self.binding_counts() {
                self.backend.dirty = true;
            }

            if !polled && !self.break_loop {
                thread::sleep(IDLE_INTERVAL);
            }
        }

        Ok(())
    }

    fn generate_maps(&mut self) -> Result<()> {
        let socket_entries = map_entries(&self.sockets)?;
        let stream_entries = map_entries(&self.streams)?;
        self.backend.socket_poller.rebuild(socket_entries)?;
        self.backend.stream_poller.rebuild(stream_entries)?;
        self.backend.dirty = false;
        Ok(())
    }

    fn fire_io_timeouts(
        &mut self,
        marks: &mut HashMap<String, Instant>,
        loop_start: Instant,
    ) -> Result<()> {
        let now = Instant::now();
        let mut due: Vec<(IoKind, String)> = Vec::new();
        for (kind, map) in [
            (IoKind::Socket, &self.sockets),
            (IoKind::Stream, &self.streams),
        ] {
            for (id, binding) in map {
                let Some(timeout) = binding.timeout else {
                    continue;
                };
                if binding.frozen || binding.timeout_handler.is_none() {
                    continue;
                }
                let mark = marks.get(id).copied().unwrap_or(loop_start);
                if now.duration_since(mark) >= timeout {
                    due.push((kind, id.clone()));
                }
            }
        }
        for (kind, id) in due {
            marks.insert(id.clone(), now);
            self.trigger_io_timeout(kind, &id)?;
        }
        Ok(())
    }

    fn bound_signal_numbers(&self) -> Vec<i32> {
        let mut numbers = Vec::new();
        for binding in self.signals.values() {
            for number in binding.signals.keys() {
                if !numbers.contains(number) {
                    numbers.push(*number);
                }
            }
        }
        numbers
    }
}

impl Default for Dispatcher<PollBackend> {
    fn default() -> Self {
        Self::new()
    }
}
