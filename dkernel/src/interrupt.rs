//! Cooperative cancellation of long-running checks.

use std::sync::{
    atomic::{AtomicBool, Ordering},
    Arc,
};

use crate::result::{InferenceError, Ir};

/// A shared flag that can be raised from another thread to stop the type checker.
///
/// The checker polls the flag on every recursive step of inference, conversion and reduction,
/// so a raised flag makes the running operation fail with [`InferenceError::Interrupted`] promptly.
/// Clones share the same underlying flag.
#[derive(Debug, Clone, Default)]
pub struct InterruptFlag(Arc<AtomicBool>);

impl InterruptFlag {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set(&self, value: bool) {
        self.0.store(value, Ordering::Relaxed);
    }

    pub fn raise(&self) {
        self.set(true);
    }

    pub fn reset(&self) {
        self.set(false);
    }

    pub fn is_raised(&self) -> bool {
        self.0.load(Ordering::Relaxed)
    }

    /// Fails with [`InferenceError::Interrupted`] if the flag is raised.
    pub fn check(&self) -> Ir<()> {
        if self.is_raised() {
            Err(InferenceError::Interrupted)
        } else {
            Ok(())
        }
    }
}

#[cfg(test)]
mod tests {
    use crate::interrupt::*;

    #[test]
    fn clones_share_state() {
        let flag = InterruptFlag::new();
        let other = flag.clone();
        assert!(flag.check().is_ok());
        other.raise();
        assert!(flag.is_raised());
        assert_eq!(flag.check(), Err(InferenceError::Interrupted));
        flag.reset();
        assert!(!other.is_raised());
    }

    #[test]
    fn raised_from_another_thread() {
        let flag = InterruptFlag::new();
        let remote = flag.clone();
        std::thread::spawn(move || remote.raise())
            .join()
            .unwrap();
        assert!(flag.is_raised());
    }
}
