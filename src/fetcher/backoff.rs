use std::time::Duration;

/// Delay before the retry that follows failed attempt `attempt` (0-based):
/// `base * (attempt + 1)`.
pub fn retry_delay(attempt: u32, base: Duration) -> Duration {
    base.saturating_mul(attempt.saturating_add(1))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_linear_progression() {
        let base = Duration::from_millis(250);

        assert_eq!(retry_delay(0, base), Duration::from_millis(250));
        assert_eq!(retry_delay(1, base), Duration::from_millis(500));
        assert_eq!(retry_delay(2, base), Duration::from_millis(750));
    }

    #[test]
    fn test_saturates_instead_of_overflowing() {
        let delay = retry_delay(u32::MAX, Duration::from_secs(u64::MAX / 2));
        assert_eq!(delay, Duration::MAX);
    }

    #[test]
    fn test_zero_base_means_no_wait() {
        assert_eq!(retry_delay(5, Duration::ZERO), Duration::ZERO);
    }
}
