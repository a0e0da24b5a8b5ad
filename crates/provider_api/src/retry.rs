use std::time::Duration;

/// Additional attempts after the initial request.
pub const DEFAULT_MAX_RETRIES: u32 = 3;
/// Base delay before the first retry.
pub const BASE_DELAY_MS: u64 = 1000;

/// HTTP statuses worth retrying. Everything else in the 4xx range is a
/// caller problem and is surfaced immediately.
pub fn is_transient_status(status: u16) -> bool {
    matches!(status, 408 | 429 | 500 | 502 | 503 | 504)
}

/// Exponential backoff delay for a retry attempt (0-based).
pub fn retry_delay(attempt: u32) -> Duration {
    let exponent = attempt.min(30);
    Duration::from_millis(BASE_DELAY_MS * 2u64.saturating_pow(exponent))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn transient_statuses_are_retryable() {
        for status in [408, 429, 500, 502, 503, 504] {
            assert!(is_transient_status(status), "status {status}");
        }
    }

    #[test]
    fn client_errors_are_not_retryable() {
        for status in [400, 401, 403, 404, 422] {
            assert!(!is_transient_status(status), "status {status}");
        }
    }

    #[test]
    fn delay_doubles_per_attempt() {
        assert_eq!(retry_delay(0).as_millis(), 1000);
        assert_eq!(retry_delay(1).as_millis(), 2000);
        assert_eq!(retry_delay(2).as_millis(), 4000);
    }
}
