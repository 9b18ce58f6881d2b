use crate::error::MirrorError;
use rand::Rng;
use std::time::Duration;

/// Randomized pause between consecutive snapshot fetches.
///
/// Each delay is drawn uniformly from `[min_delay, max_delay)`, or is exactly `min_delay`
/// when both bounds are equal. Two zero bounds disable pacing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Pacing {
    min_delay: Duration,
    max_delay: Duration,
}

impl Pacing {
    /// Pacing with delays drawn from `[0, max_delay)`.
    pub fn new(max_delay: Duration) -> Self {
        Pacing {
            min_delay: Duration::ZERO,
            max_delay,
        }
    }

    pub fn between(min_delay: Duration, max_delay: Duration) -> Result<Self, MirrorError> {
        if min_delay > max_delay {
            return Err(MirrorError::InvalidDelay(format!(
                "minimum {:?} exceeds maximum {:?}",
                min_delay, max_delay
            )));
        }
        Ok(Pacing {
            min_delay,
            max_delay,
        })
    }

    /// Builds a pacing from delay bounds in seconds, as accepted on the command line.
    pub fn from_secs_f64(min_delay_secs: f64, max_delay_secs: f64) -> Result<Self, MirrorError> {
        Pacing::between(secs(min_delay_secs)?, secs(max_delay_secs)?)
    }

    pub fn none() -> Self {
        Pacing::new(Duration::ZERO)
    }

    pub fn next_delay(&self) -> Duration {
        if self.min_delay >= self.max_delay {
            return self.min_delay;
        }
        let secs = rand::thread_rng()
            .gen_range(self.min_delay.as_secs_f64()..self.max_delay.as_secs_f64());
        Duration::from_secs_f64(secs)
    }

    /// Sleeps for the next drawn delay.
    pub async fn pause(&self) {
        let delay = self.next_delay();
        if !delay.is_zero() {
            tokio::time::sleep(delay).await;
        }
    }
}

impl Default for Pacing {
    fn default() -> Self {
        Pacing::new(Duration::from_secs(5))
    }
}

fn secs(value: f64) -> Result<Duration, MirrorError> {
    Duration::try_from_secs_f64(value)
        .map_err(|e| MirrorError::InvalidDelay(format!("{}: {}", value, e)))
}
