//! Small path/time utilities shared across modules.

use once_cell::sync::Lazy;
use std::time::{Duration, SystemTime};

/// A sentinel substituted for a missing modification time: conceptually an
/// epoch value significantly older than any real file (§4.D tie-break note).
pub const MISSING_FILE_MODIFIED_TIME: SystemTime = SystemTime::UNIX_EPOCH;

/// The opposite sentinel (§4.E step 8's "maximumDate"): a time guaranteed
/// later than any real file's modification time. When a project's
/// declaration output bytes actually changed on emit, its recorded
/// declaration-content-change time is forced to this value instead of the
/// real write timestamp, so a downstream project built within the same
/// timestamp-resolution window can never mistake the change for
/// pseudo-up-to-date.
pub static MAXIMUM_DATE: Lazy<SystemTime> = Lazy::new(|| SystemTime::UNIX_EPOCH + Duration::from_secs(253_402_300_799));

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sentinel_is_older_than_now() {
        assert!(MISSING_FILE_MODIFIED_TIME < SystemTime::now());
    }

    #[test]
    fn maximum_date_is_later_than_now() {
        assert!(*MAXIMUM_DATE > SystemTime::now());
    }
}
