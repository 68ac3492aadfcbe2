//! Sliding-window throttle for outbound API calls.

use std::collections::VecDeque;
use std::time::Duration;
use tokio::time::{sleep, Instant};

/// Allows at most `max_calls` request starts in any window of `interval`.
///
/// Start times are kept in a queue; once the queue is full the caller sleeps
/// until the oldest start has aged out of the window.
#[derive(Debug)]
pub struct Throttle {
    max_calls: usize,
    interval: Duration,
    call_times: VecDeque<Instant>,
}

impl Throttle {
    pub fn new(max_calls: usize, interval: Duration) -> Self {
        let max_calls = max_calls.max(1);
        Self {
            max_calls,
            interval,
            call_times: VecDeque::with_capacity(max_calls),
        }
    }

    /// Wait until a call may start, then record its start time.
    pub async fn wait(&mut self) {
        loop {
            let now = Instant::now();
            while let Some(&oldest) = self.call_times.front() {
                if now.duration_since(oldest) >= self.interval {
                    self.call_times.pop_front();
                } else {
                    break;
                }
            }

            if self.call_times.len() < self.max_calls {
                break;
            }

            if let Some(&oldest) = self.call_times.front() {
                let wait = self.interval.saturating_sub(now.duration_since(oldest));
                tracing::info!(
                    "Throttling API calls, sleeping for {:.1} seconds.",
                    wait.as_secs_f64()
                );
                sleep(wait).await;
            }
        }
        self.call_times.push_back(Instant::now());
    }
}
