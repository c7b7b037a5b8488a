//! Scoped wall-clock timing.

use std::time::{Duration, Instant};

use tracing::info;

/// Measures a named scope and logs the elapsed time when stopped or dropped.
///
/// ```
/// use trading_monitor::ScopedTimer;
///
/// let timer = ScopedTimer::new("load");
/// // ... work ...
/// let elapsed = timer.stop();
/// println!("load took {elapsed:?}");
/// ```
#[derive(Debug)]
pub struct ScopedTimer {
    name: &'static str,
    start: Instant,
    stopped: bool,
}

impl ScopedTimer {
    pub fn new(name: &'static str) -> Self {
        Self {
            name,
            start: Instant::now(),
            stopped: false,
        }
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    pub fn elapsed(&self) -> Duration {
        self.start.elapsed()
    }

    /// Log and return the elapsed time. The drop that follows logs nothing.
    pub fn stop(mut self) -> Duration {
        self.stopped = true;
        let elapsed = self.start.elapsed();
        log_elapsed(self.name, elapsed);
        elapsed
    }
}

impl Drop for ScopedTimer {
    fn drop(&mut self) {
        if !self.stopped {
            log_elapsed(self.name, self.start.elapsed());
        }
    }
}

fn log_elapsed(name: &str, elapsed: Duration) {
    info!(
        scope = name,
        elapsed_ms = elapsed.as_secs_f64() * 1_000.0,
        "{} took {:.3} ms",
        name,
        elapsed.as_secs_f64() * 1_000.0
    );
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::thread;

    #[test]
    fn test_stop_returns_elapsed() {
        let timer = ScopedTimer::new("sleep");
        thread::sleep(Duration::from_millis(5));
        assert_eq!(timer.name(), "sleep");
        assert!(timer.elapsed() >= Duration::from_millis(5));

        let elapsed = timer.stop();
        assert!(elapsed >= Duration::from_millis(5));
    }

    #[test]
    fn test_drop_without_stop() {
        let timer = ScopedTimer::new("dropped");
        drop(timer);
    }
}
