//! One descriptor-class poll map.
//!
//! The reactor keeps two of these, one for socket-class and one for
//! stream-class channels, polled with separate bounded multiplex calls.
//! Maps are regenerated from registry state whenever bindings change;
//! each rebuild re-resolves every channel's current descriptor and files
//! it under descriptor identity with a reverse index back to the bindings
//! sharing it.

use std::io;
use std::os::fd::RawFd;
use std::time::Duration;

use indexmap::IndexMap;
use mio::unix::SourceFd;
use mio::{Events, Interest, Poll, Token};
use tracing::warn;

use crate::binding::IoMode;
use crate::error::{Error, Result};

/// One unfrozen binding's slot in the generated map.
pub(crate) struct MapEntry {
    pub id: String,
    pub fd: RawFd,
    pub mode: IoMode,
}

pub(crate) struct IoPoller {
    poll: Option<Poll>,
    events: Events,
    read: IndexMap<RawFd, Vec<String>>,
    write: IndexMap<RawFd, Vec<String>>,
}

fn interest(readable: bool, writable: bool) -> Interest {
    match (readable, writable) {
        (true, true) => Interest::READABLE | Interest::WRITABLE,
        (true, false) => Interest::READABLE,
        _ => Interest::WRITABLE,
    }
}

impl IoPoller {
    pub fn new() -> Self {
        Self {
            poll: None,
            events: Events::with_capacity(1024),
            read: IndexMap::new(),
            write: IndexMap::new(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.poll.is_none()
    }

    /// Rebuilds the map from scratch; the previous poll instance and all
    /// its registrations are dropped first.
    pub fn rebuild(&mut self, entries: Vec<MapEntry>) -> Result<()> {
        self.read.clear();
        self.write.clear();
        self.poll = None;

        if entries.is_empty() {
            return Ok(());
        }

        for entry in entries {
            let map = match entry.mode {
                IoMode::Read => &mut self.read,
                IoMode::Write => &mut self.write,
            };
            map.entry(entry.fd).or_default().push(entry.id);
        }

        let poll = Poll::new().map_err(Error::Runtime)?;
        let mut fds: Vec<RawFd> = self.read.keys().copied().collect();
        for fd in self.write.keys() {
            if !fds.contains(fd) {
                fds.push(*fd);
            }
        }
        for fd in fds {
            let interests = interest(
                self.read.contains_key(&fd),
                self.write.contains_key(&fd),
            );
            poll.registry()
                .register(&mut SourceFd(&fd), Token(fd as usize), interests)
                .map_err(Error::Runtime)?;
        }

        self.poll = Some(poll);
        Ok(())
    }

    /// One bounded wait. Returns the triggered binding ids in map order;
    /// a failed poll is logged and reported as no readiness, to be retried
    /// next iteration.
    pub fn wait(&mut self, budget: Duration) -> Vec<String> {
        let Some(poll) = self.poll.as_mut() else {
            return Vec::new();
        };

        match poll.poll(&mut self.events, Some(budget)) {
            Ok(()) => {}
            Err(err) if err.kind() == io::ErrorKind::Interrupted => return Vec::new(),
            Err(err) => {
                warn!(error = %err, "descriptor poll failed");
                return Vec::new();
            }
        }

        let mut ready = Vec::new();
        let mut fired = Vec::new();
        for event in self.events.iter() {
            let fd = event.token().0 as RawFd;
            if event.is_readable() || event.is_read_closed() {
                if let Some(ids) = self.read.get(&fd) {
                    ready.extend(ids.iter().cloned());
                }
            }
            if event.is_writable() || event.is_write_closed() {
                if let Some(ids) = self.write.get(&fd) {
                    ready.extend(ids.iter().cloned());
                }
            }
            fired.push(fd);
        }

        // Re-arm fired descriptors so unconsumed readiness is reported
        // again next iteration (select-style level semantics over mio's
        // edge-triggered registrations).
        for fd in fired {
            let interests = interest(
                self.read.contains_key(&fd),
                self.write.contains_key(&fd),
            );
            if let Err(err) =
                poll.registry()
                    .reregister(&mut SourceFd(&fd), Token(fd as usize), interests)
            {
                warn!(fd, error = %err, "descriptor re-arm failed");
            }
        }

        ready
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write as _;
    use std::os::fd::AsRawFd;
    use std::os::unix::net::UnixStream;

    #[test]
    fn empty_map_reports_no_readiness() {
        let mut poller = IoPoller::new();
        poller.rebuild(Vec::new()).unwrap();
        assert!(poller.is_empty());
        assert!(poller.wait(Duration::from_millis(1)).is_empty());
    }

    #[test]
    fn pending_data_triggers_read_binding() {
        let (local, mut remote) = UnixStream::pair().unwrap();
        remote.write_all(b"x").unwrap();

        let mut poller = IoPoller::new();
        poller
            .rebuild(vec![MapEntry {
                id: "r:1".into(),
                fd: local.as_raw_fd(),
                mode: IoMode::Read,
            }])
            .unwrap();

        let ready = poller.wait(Duration::from_millis(100));
        assert_eq!(ready, vec!["r:1".to_string()]);

        // Unconsumed readiness is re-armed and reported again.
        let ready = poller.wait(Duration::from_millis(100));
        assert_eq!(ready, vec!["r:1".to_string()]);
    }

    #[test]
    fn shared_descriptor_triggers_every_binding_in_order() {
        let (local, mut remote) = UnixStream::pair().unwrap();
        remote.write_all(b"x").unwrap();
        let fd = local.as_raw_fd();

        let mut poller = IoPoller::new();
        poller
            .rebuild(vec![
                MapEntry {
                    id: "first".into(),
                    fd,
                    mode: IoMode::Read,
                },
                MapEntry {
                    id: "second".into(),
                    fd,
                    mode: IoMode::Read,
                },
            ])
            .unwrap();

        let ready = poller.wait(Duration::from_millis(100));
        assert_eq!(ready, vec!["first".to_string(), "second".to_string()]);
    }

    #[test]
    fn idle_descriptor_waits_out_the_budget() {
        let (local, _remote) = UnixStream::pair().unwrap();

        let mut poller = IoPoller::new();
        poller
            .rebuild(vec![MapEntry {
                id: "r:1".into(),
                fd: local.as_raw_fd(),
                mode: IoMode::Read,
            }])
            .unwrap();

        let ready = poller.wait(Duration::from_millis(20));
        assert!(ready.is_empty());
    }
}
