//! Channel identity for multiplexed endpoints.
//!
//! Descriptor numbers are recycled by the OS as soon as an endpoint closes,
//! so I/O bindings are keyed by a [`ChannelId`] that never repeats within
//! the process. The live descriptor is re-resolved through
//! [`IoChannel::raw_fd`] every time the poll maps are regenerated.

use std::fmt;
use std::os::fd::{AsRawFd, RawFd};
use std::sync::atomic::{AtomicU64, Ordering};

/// Process-unique identity of a channel, independent of its descriptor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ChannelId(u64);

impl ChannelId {
    /// Allocates the next unused id.
    pub fn next() -> Self {
        static NEXT: AtomicU64 = AtomicU64::new(1);
        Self(NEXT.fetch_add(1, Ordering::Relaxed))
    }
}

impl fmt::Display for ChannelId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A socket- or stream-like endpoint the dispatcher can watch.
pub trait IoChannel {
    /// Stable identity; must not change for the lifetime of the channel.
    fn channel_id(&self) -> ChannelId;

    /// Current native descriptor, or `None` once the endpoint is closed.
    fn raw_fd(&self) -> Option<RawFd>;
}

/// Adapter giving any fd-backed object a stable channel identity.
pub struct FdChannel<T> {
    id: ChannelId,
    io: T,
}

impl<T: AsRawFd> FdChannel<T> {
    pub fn new(io: T) -> Self {
        Self {
            id: ChannelId::next(),
            io,
        }
    }

    pub fn get_ref(&self) -> &T {
        &self.io
    }

    pub fn into_inner(self) -> T {
        self.io
    }
}

impl<T: AsRawFd> IoChannel for FdChannel<T> {
    fn channel_id(&self) -> ChannelId {
        self.id
    }

    fn raw_fd(&self) -> Option<RawFd> {
        Some(self.io.as_raw_fd())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::os::unix::net::UnixStream;

    #[test]
    fn identity_is_stable_and_unique() {
        let (a, b) = UnixStream::pair().unwrap();
        let a = FdChannel::new(a);
        let b = FdChannel::new(b);

        assert_eq!(a.channel_id(), a.channel_id());
        assert_ne!(a.channel_id(), b.channel_id());
    }

    #[test]
    fn raw_fd_tracks_inner() {
        let (a, _b) = UnixStream::pair().unwrap();
        let fd = a.as_raw_fd();
        let chan = FdChannel::new(a);
        assert_eq!(chan.raw_fd(), Some(fd));
    }
}
