//! `Clock` backed by the embassy time driver.
//!
//! On the robot the driver comes from the HAL; on the host enable the
//! `embassy-time/std` feature.

use embassy_time::{Duration, Instant};

use super::Clock;

/// Wall-clock time from `embassy_time`, sleeping with a busy `block_for`.
#[derive(Debug, Clone, Copy, Default)]
pub struct EmbassyClock;

impl Clock for EmbassyClock {
    fn now(&self) -> Instant {
        Instant::now()
    }

    fn sleep(
        &mut self,
        duration: Duration,
    ) {
        embassy_time::block_for(duration);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sleep_advances_now() {
        let mut clock = EmbassyClock;
        let start = clock.now();
        clock.sleep(Duration::from_millis(2));
        assert!(clock.elapsed_since(start) >= Duration::from_millis(2));
    }
}
