//! POSIX signal descriptors.

use std::fmt;

use signal_hook::consts;

use crate::error::{Error, Result};

/// Well-known signal names, in numeric order where that is portable.
const NAMES: &[(&str, i32)] = &[
    ("SIGHUP", consts::SIGHUP),
    ("SIGINT", consts::SIGINT),
    ("SIGQUIT", consts::SIGQUIT),
    ("SIGILL", consts::SIGILL),
    ("SIGTRAP", consts::SIGTRAP),
    ("SIGABRT", consts::SIGABRT),
    ("SIGBUS", consts::SIGBUS),
    ("SIGFPE", consts::SIGFPE),
    ("SIGKILL", consts::SIGKILL),
    ("SIGUSR1", consts::SIGUSR1),
    ("SIGSEGV", consts::SIGSEGV),
    ("SIGUSR2", consts::SIGUSR2),
    ("SIGPIPE", consts::SIGPIPE),
    ("SIGALRM", consts::SIGALRM),
    ("SIGTERM", consts::SIGTERM),
    ("SIGCHLD", consts::SIGCHLD),
    ("SIGCONT", consts::SIGCONT),
    ("SIGSTOP", consts::SIGSTOP),
    ("SIGTSTP", consts::SIGTSTP),
    ("SIGTTIN", consts::SIGTTIN),
    ("SIGTTOU", consts::SIGTTOU),
    ("SIGURG", consts::SIGURG),
    ("SIGXCPU", consts::SIGXCPU),
    ("SIGXFSZ", consts::SIGXFSZ),
    ("SIGVTALRM", consts::SIGVTALRM),
    ("SIGPROF", consts::SIGPROF),
    ("SIGWINCH", consts::SIGWINCH),
    ("SIGIO", consts::SIGIO),
    ("SIGSYS", consts::SIGSYS),
];

/// Descriptor for one OS signal, constructible from a number or a name.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Signal(i32);

impl Signal {
    pub const fn from_number(number: i32) -> Self {
        Self(number)
    }

    /// Parses `"SIGUSR1"`, `"USR1"` or `"usr1"` alike.
    pub fn from_name(name: &str) -> Result<Self> {
        let upper = name.to_ascii_uppercase();
        let full = if upper.starts_with("SIG") {
            upper.clone()
        } else {
            format!("SIG{upper}")
        };

        NAMES
            .iter()
            .find(|(n, _)| *n == full)
            .map(|(_, number)| Self(*number))
            .ok_or_else(|| Error::InvalidArgument(format!("unknown signal name: {name}")))
    }

    pub const fn number(self) -> i32 {
        self.0
    }

    pub fn name(self) -> Option<&'static str> {
        NAMES
            .iter()
            .find(|(_, number)| *number == self.0)
            .map(|(n, _)| *n)
    }

    /// Whether the process may install a handler for this signal at all.
    pub(crate) fn hookable(self) -> bool {
        !consts::FORBIDDEN.contains(&self.0)
    }
}

impl From<i32> for Signal {
    fn from(number: i32) -> Self {
        Self(number)
    }
}

impl fmt::Display for Signal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.name() {
            Some(name) => f.write_str(name),
            None => write!(f, "signal {}", self.0),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_names_in_any_spelling() {
        let canonical = Signal::from_name("SIGUSR1").unwrap();
        assert_eq!(Signal::from_name("usr1").unwrap(), canonical);
        assert_eq!(Signal::from_name("Usr1").unwrap(), canonical);
        assert_eq!(canonical.number(), consts::SIGUSR1);
        assert_eq!(canonical.name(), Some("SIGUSR1"));
    }

    #[test]
    fn unknown_name_is_invalid_argument() {
        assert!(matches!(
            Signal::from_name("SIGNOPE"),
            Err(Error::InvalidArgument(_))
        ));
    }

    #[test]
    fn kill_and_stop_are_not_hookable() {
        assert!(!Signal::from_number(consts::SIGKILL).hookable());
        assert!(!Signal::from_number(consts::SIGSTOP).hookable());
        assert!(Signal::from_number(consts::SIGUSR1).hookable());
    }
}
