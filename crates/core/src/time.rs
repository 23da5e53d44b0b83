use chrono::{DateTime, Duration, Utc};

/// Time source for the player, so elapsed-time measurements are testable.
#[derive(Debug, Clone, Copy, Default)]
pub enum Clock {
    #[default]
    Default,
    Fixed(DateTime<Utc>),
}

impl Clock {
    /// Returns a clock fixed at the given timestamp.
    #[must_use]
    pub fn fixed(at: DateTime<Utc>) -> Self {
        Self::Fixed(at)
    }

    /// Returns the current time according to the clock.
    #[must_use]
    pub fn now(&self) -> DateTime<Utc> {
        match self {
            Clock::Default => Utc::now(),
            Clock::Fixed(t) => *t,
        }
    }

    /// If this is a fixed clock, advance it by the given duration.
    ///
    /// Has no effect on `Clock::Default`.
    pub fn advance(&mut self, delta: Duration) {
        if let Clock::Fixed(t) = self {
            *t += delta;
        }
    }

    /// Milliseconds from `since` until now, clamped at zero.
    #[must_use]
    pub fn elapsed_ms(&self, since: DateTime<Utc>) -> u64 {
        elapsed_ms_between(since, self.now())
    }
}

/// Milliseconds between two instants; backdated ends count as zero.
#[must_use]
pub fn elapsed_ms_between(start: DateTime<Utc>, end: DateTime<Utc>) -> u64 {
    u64::try_from(end.signed_duration_since(start).num_milliseconds()).unwrap_or(0)
}

/// Deterministic timestamp for tests and examples (2023-11-14T22:13:20Z).
pub const FIXED_TEST_TIMESTAMP: i64 = 1_700_000_000;

/// Returns a deterministic `DateTime<Utc>` for tests and doc examples.
///
/// # Panics
///
/// Panics if the fixed timestamp cannot be represented.
#[must_use]
pub fn fixed_now() -> DateTime<Utc> {
    DateTime::<Utc>::from_timestamp(FIXED_TEST_TIMESTAMP, 0)
        .expect("fixed timestamp should be valid")
}

/// Returns a `Clock` fixed at the deterministic test timestamp.
#[must_use]
pub fn fixed_clock() -> Clock {
    Clock::fixed(fixed_now())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn elapsed_ms_follows_fixed_clock() {
        let start = fixed_now();
        let mut clock = fixed_clock();
        clock.advance(Duration::milliseconds(1_250));
        assert_eq!(clock.elapsed_ms(start), 1_250);
    }

    #[test]
    fn backdated_end_is_zero() {
        let start = fixed_now();
        assert_eq!(elapsed_ms_between(start, start - Duration::seconds(5)), 0);
    }
}
