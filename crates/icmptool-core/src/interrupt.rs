use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

/// The longest uninterruptible slice of an interval sleep.
const SLEEP_SLICE: Duration = Duration::from_millis(10);

/// A cancellation token shared between a run and its controller.
///
/// Cloning yields a handle to the same token.  Runs check the token between
/// probes and while sleeping between probes, and return the partial result
/// gathered so far once it has been triggered.
#[derive(Debug, Clone, Default)]
pub struct Interrupt(Arc<AtomicBool>);

impl Interrupt {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Request that any run using this token stops.
    pub fn trigger(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    #[must_use]
    pub fn is_triggered(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }

    /// Sleep for `duration` unless triggered.
    ///
    /// Returns `true` if the full duration elapsed, `false` if the token was
    /// triggered before or during the sleep.  A duration too large to be
    /// represented as a deadline sleeps until triggered.
    pub fn sleep(&self, duration: Duration) -> bool {
        let deadline = Instant::now().checked_add(duration);
        loop {
            if self.is_triggered() {
                return false;
            }
            let slice = match deadline {
                Some(deadline) => {
                    let now = Instant::now();
                    if now >= deadline {
                        return true;
                    }
                    SLEEP_SLICE.min(deadline - now)
                }
                None => SLEEP_SLICE,
            };
            thread::sleep(slice);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_trigger_shared_between_clones() {
        let interrupt = Interrupt::new();
        let other = interrupt.clone();
        assert!(!other.is_triggered());
        interrupt.trigger();
        assert!(other.is_triggered());
    }

    #[test]
    fn test_sleep_completes() {
        let interrupt = Interrupt::new();
        let start = Instant::now();
        assert!(interrupt.sleep(Duration::from_millis(20)));
        assert!(start.elapsed() >= Duration::from_millis(20));
        assert!(interrupt.sleep(Duration::ZERO));
    }

    #[test]
    fn test_sleep_interrupted() {
        let interrupt = Interrupt::new();
        let other = interrupt.clone();
        let handle = thread::spawn(move || {
            thread::sleep(Duration::from_millis(20));
            other.trigger();
        });
        let start = Instant::now();
        assert!(!interrupt.sleep(Duration::from_secs(10)));
        assert!(start.elapsed() < Duration::from_secs(5));
        handle.join().unwrap();
    }

    #[test]
    fn test_sleep_unbounded_duration() {
        let interrupt = Interrupt::new();
        let other = interrupt.clone();
        let handle = thread::spawn(move || {
            thread::sleep(Duration::from_millis(20));
            other.trigger();
        });
        assert!(!interrupt.sleep(Duration::MAX));
        handle.join().unwrap();
    }
}
