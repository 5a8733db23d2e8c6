// src/guard.rs
use std::sync::atomic::{AtomicBool, Ordering};

/// Holds an in-flight flag for as long as a run is executing.
///
/// Released on drop, so a run that panics still frees the slot.
#[derive(Debug)]
pub struct RunGuard<'a> {
    flag: &'a AtomicBool,
}

impl<'a> RunGuard<'a> {
    /// Returns `None` while another run holds the flag.
    pub fn try_acquire(flag: &'a AtomicBool) -> Option<Self> {
        flag.compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .ok()
            .map(|_| Self { flag })
    }
}

impl Drop for RunGuard<'_> {
    fn drop(&mut self) {
        self.flag.store(false, Ordering::Release);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_guard_excludes_second_run_until_dropped() {
        let flag = AtomicBool::new(false);

        let first = RunGuard::try_acquire(&flag);
        assert!(first.is_some());
        assert!(RunGuard::try_acquire(&flag).is_none());

        drop(first);
        assert!(RunGuard::try_acquire(&flag).is_some());
    }
}
