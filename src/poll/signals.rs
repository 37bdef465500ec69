//! Deferred signal recording.
//!
//! The OS-context hook only stores into an atomic flag; the loop drains
//! the flags once per iteration and runs handlers synchronously on the
//! control thread. Nothing user-provided ever executes in signal context.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use signal_hook::low_level;
use signal_hook::SigId;
use tracing::warn;

pub(crate) struct SignalDriver {
    hooks: Vec<Hook>,
}

struct Hook {
    number: i32,
    flag: Arc<AtomicBool>,
    sig_id: SigId,
}

impl SignalDriver {
    pub fn new() -> Self {
        Self { hooks: Vec::new() }
    }

    /// Installs one deferred hook per distinct number. A number that
    /// cannot be hooked is skipped: its bindings stay registered but never
    /// fire, which is degraded-but-non-fatal by contract.
    pub fn install(&mut self, numbers: &[i32]) {
        self.uninstall();
        for &number in numbers {
            let flag = Arc::new(AtomicBool::new(false));
            match signal_hook::flag::register(number, Arc::clone(&flag)) {
                Ok(sig_id) => self.hooks.push(Hook {
                    number,
                    flag,
                    sig_id,
                }),
                Err(err) => warn!(
                    number,
                    error = %err,
                    "signal hook unavailable; bindings for this signal will not fire"
                ),
            }
        }
    }

    /// Numbers delivered since the last drain. Repeat deliveries of one
    /// number within a single iteration coalesce.
    pub fn drain(&self) -> Vec<i32> {
        let mut fired = Vec::new();
        for hook in &self.hooks {
            if hook.flag.swap(false, Ordering::Relaxed) {
                fired.push(hook.number);
            }
        }
        fired
    }

    /// Removes exactly the hooks this driver installed, leaving any other
    /// registered actions for the same signals in place.
    pub fn uninstall(&mut self) {
        for hook in self.hooks.drain(..) {
            low_level::unregister(hook.sig_id);
        }
    }
}

impl Drop for SignalDriver {
    fn drop(&mut self) {
        self.uninstall();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use signal_hook::consts::SIGUSR2;

    #[test]
    fn raised_signal_is_drained_once() {
        let mut driver = SignalDriver::new();
        driver.install(&[SIGUSR2]);

        low_level::raise(SIGUSR2).unwrap();

        assert_eq!(driver.drain(), vec![SIGUSR2]);
        assert!(driver.drain().is_empty());

        driver.uninstall();
    }

    #[test]
    fn uninstalled_driver_records_nothing() {
        let mut driver = SignalDriver::new();
        driver.install(&[SIGUSR2]);
        driver.uninstall();

        assert!(driver.drain().is_empty());
    }
}
