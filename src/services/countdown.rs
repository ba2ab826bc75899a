use std::future::Future;
use std::time::Duration;

/// Cooperative one-second countdown for an in-progress attempt.
///
/// The state machine is synchronous so the tick contract is testable without
/// a clock: the tick that observes zero yields `Expired` exactly once and
/// deactivates the countdown. `drive` adapts it onto a tokio interval.
#[derive(Clone, Debug)]
pub struct Countdown {
    remaining_seconds: i64,
    active: bool,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum CountdownTick {
    Running { remaining_seconds: i64 },
    /// Yielded exactly once, on the tick that reaches zero.
    Expired,
    /// The countdown already expired or was cancelled; ticks are inert.
    Stopped,
}

impl Countdown {
    pub fn from_seconds(seconds: i64) -> Self {
        Countdown {
            remaining_seconds: seconds.max(0),
            active: true,
        }
    }

    pub fn from_minutes(minutes: i64) -> Self {
        Self::from_seconds(minutes * 60)
    }

    pub fn remaining_seconds(&self) -> i64 {
        self.remaining_seconds
    }

    pub fn is_active(&self) -> bool {
        self.active
    }

    /// Advances the countdown by one second. The flag flips before `Expired`
    /// is reported, so the terminal tick can never fire twice.
    pub fn tick(&mut self) -> CountdownTick {
        if !self.active {
            return CountdownTick::Stopped;
        }

        self.remaining_seconds -= 1;
        if self.remaining_seconds <= 0 {
            self.remaining_seconds = 0;
            self.active = false;
            return CountdownTick::Expired;
        }

        CountdownTick::Running {
            remaining_seconds: self.remaining_seconds,
        }
    }

    /// Stops the countdown without expiring it. No further ticks fire.
    pub fn cancel(&mut self) {
        self.active = false;
    }
}

/// Runs the countdown against wall-clock seconds and invokes `on_expire`
/// exactly once when it reaches zero. Returns when the countdown is done.
pub async fn drive<F, Fut>(mut countdown: Countdown, on_expire: F)
where
    F: FnOnce() -> Fut,
    Fut: Future<Output = ()>,
{
    let mut interval = tokio::time::interval(Duration::from_secs(1));
    // The first interval tick completes immediately; consume it so the
    // countdown starts a full second after `drive` is called.
    interval.tick().await;

    loop {
        interval.tick().await;
        match countdown.tick() {
            CountdownTick::Running { .. } => continue,
            CountdownTick::Expired => break,
            CountdownTick::Stopped => return,
        }
    }

    on_expire().await;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ten_minute_countdown_expires_exactly_once_at_zero() {
        let mut countdown = Countdown::from_minutes(10);
        let mut expirations = 0;

        for _ in 0..600 {
            if countdown.tick() == CountdownTick::Expired {
                expirations += 1;
                assert_eq!(countdown.remaining_seconds(), 0);
            }
        }

        assert_eq!(expirations, 1);
        assert!(!countdown.is_active());
    }

    #[test]
    fn does_not_expire_before_zero() {
        let mut countdown = Countdown::from_seconds(3);

        assert_eq!(
            countdown.tick(),
            CountdownTick::Running {
                remaining_seconds: 2
            }
        );
        assert_eq!(
            countdown.tick(),
            CountdownTick::Running {
                remaining_seconds: 1
            }
        );
        assert_eq!(countdown.tick(), CountdownTick::Expired);
    }

    #[test]
    fn ticks_after_expiry_are_inert() {
        let mut countdown = Countdown::from_seconds(1);
        assert_eq!(countdown.tick(), CountdownTick::Expired);

        for _ in 0..5 {
            assert_eq!(countdown.tick(), CountdownTick::Stopped);
        }
    }

    #[test]
    fn cancel_stops_without_expiring() {
        let mut countdown = Countdown::from_seconds(30);
        assert_eq!(
            countdown.tick(),
            CountdownTick::Running {
                remaining_seconds: 29
            }
        );

        countdown.cancel();
        assert_eq!(countdown.tick(), CountdownTick::Stopped);
        assert_eq!(countdown.tick(), CountdownTick::Stopped);
    }

    #[test]
    fn zero_duration_expires_on_first_tick() {
        let mut countdown = Countdown::from_seconds(0);
        assert_eq!(countdown.tick(), CountdownTick::Expired);
        assert_eq!(countdown.tick(), CountdownTick::Stopped);
    }

    #[actix_rt::test]
    async fn drive_invokes_expiry_callback() {
        use std::sync::atomic::{AtomicUsize, Ordering};
        use std::sync::Arc;

        let fired = Arc::new(AtomicUsize::new(0));
        let fired_clone = Arc::clone(&fired);

        // A one-second countdown expires on its first real tick.
        drive(Countdown::from_seconds(1), move || async move {
            fired_clone.fetch_add(1, Ordering::SeqCst);
        })
        .await;

        assert_eq!(fired.load(Ordering::SeqCst), 1);
    }
}
