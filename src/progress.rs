//! Push-based progress delivery with wall-clock throttling.

use std::sync::mpsc::Sender;
use std::time::{Duration, Instant};

/// Receives progress updates from a running operation.
///
/// Implemented for closures; see [`channel_sink`] to drain updates on
/// another thread.
pub trait ProgressSink<P> {
    fn report(&mut self, progress: &P);
}

impl<P, F> ProgressSink<P> for F
where
    F: FnMut(&P),
{
    fn report(&mut self, progress: &P) {
        self(progress)
    }
}

/// Adapts an `mpsc::Sender` into a sink. Updates sent after the receiver
/// hung up are dropped.
pub fn channel_sink<P: Clone>(tx: Sender<P>) -> impl FnMut(&P) {
    move |progress: &P| {
        let _ = tx.send(progress.clone());
    }
}

/// Sink that drops every update.
#[derive(Clone, Copy, Debug, Default)]
pub struct NoProgress;

impl<P> ProgressSink<P> for NoProgress {
    fn report(&mut self, _progress: &P) {}
}

/// Lets at most one update through per `interval`. The first update always
/// passes.
///
/// ```rust
/// use std::time::Duration;
/// use treecmp::progress::ProgressThrottle;
///
/// let mut throttle = ProgressThrottle::new(Duration::from_secs(60));
/// assert!(throttle.ready());
/// assert!(!throttle.ready());
/// ```
#[derive(Debug)]
pub struct ProgressThrottle {
    interval: Duration,
    last_emit: Option<Instant>,
}

impl ProgressThrottle {
    pub fn new(interval: Duration) -> Self {
        Self {
            interval,
            last_emit: None,
        }
    }

    /// Returns true and stamps the current time when an update may be sent.
    pub fn ready(&mut self) -> bool {
        self.ready_at(Instant::now())
    }

    fn ready_at(&mut self, now: Instant) -> bool {
        match self.last_emit {
            Some(last) if now.saturating_duration_since(last) < self.interval => false,
            _ => {
                self.last_emit = Some(now);
                true
            }
        }
    }

    /// Sends `build()` to the sink if the interval has elapsed.
    pub fn emit<P, S, F>(&mut self, sink: &mut S, build: F)
    where
        S: ProgressSink<P> + ?Sized,
        F: FnOnce() -> P,
    {
        if self.ready() {
            sink.report(&build());
        }
    }

    /// Sends an update regardless of the interval.
    pub fn force<P, S>(&mut self, sink: &mut S, progress: P)
    where
        S: ProgressSink<P> + ?Sized,
    {
        self.last_emit = Some(Instant::now());
        sink.report(&progress);
    }
}

/// Integer percentage of `done` out of `total`, clamped to `0..=cap`.
pub fn percentage(done: usize, total: usize, cap: u8) -> u8 {
    if total == 0 {
        return 0;
    }
    let pct = (done.min(total) * 100) / total;
    (pct as u8).min(cap)
}
