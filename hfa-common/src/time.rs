//! Timestamp utilities

use chrono::{DateTime, NaiveDate, Utc};

/// Get current UTC timestamp
pub fn now() -> DateTime<Utc> {
    Utc::now()
}

/// Get current UTC calendar date
pub fn today() -> NaiveDate {
    Utc::now().date_naive()
}

/// Get current calendar year
pub fn current_year() -> i32 {
    use chrono::Datelike;
    today().year()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_now_returns_valid_timestamp() {
        let timestamp = now();
        // Should be a reasonable timestamp (after year 2000)
        assert!(timestamp.timestamp() > 946_684_800); // 2000-01-01 00:00:00 UTC
    }

    #[test]
    fn test_current_year_matches_today() {
        use chrono::Datelike;
        assert_eq!(current_year(), today().year());
        assert!(current_year() >= 2024);
    }
}
