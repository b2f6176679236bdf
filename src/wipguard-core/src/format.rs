//! User-facing text for status lines and notifications.

use crate::ChangeSize;

/// `mm:ss`, minutes are not wrapped at an hour.
pub fn format_time(seconds: u64) -> String {
    format!("{:02}:{:02}", seconds / 60, seconds % 60)
}

pub fn time_till_revert_text(seconds_left: u64) -> String {
    format!("Auto-revert in {}", format_time(seconds_left))
}

pub const AUTO_REVERT_STARTED_TEXT: &str = "Auto-revert started";
pub const AUTO_REVERT_STOPPED_TEXT: &str = "Auto-revert stopped";

/// Status line for the current change size, e.g. `Change size: 42/80`.
pub fn change_size_text(size: ChangeSize, threshold: u32) -> String {
    format!("Change size: {size}/{threshold}")
}

/// Shown before the first size sample arrives.
pub fn initial_change_size_text(threshold: u32) -> String {
    format!("Change size: -/{threshold}")
}

pub fn change_size_too_big_text(size: ChangeSize, threshold: u32) -> String {
    format!(
        "Change size exceeded limit. Lines changed: {size}; limit: {threshold}. \
         Please commit, split or revert changes."
    )
}

pub fn commit_cancelled_text(size: ChangeSize, threshold: u32) -> String {
    format!(
        "Commit was cancelled because change size is above threshold. \
         Lines changed: {size}; limit: {threshold}."
    )
}

pub const UNTESTED_COMMIT_CANCELLED_TEXT: &str =
    "Commit was cancelled because no tests were run";

pub const CHANGES_REVERTED_TEXT: &str = "Current change list was reverted";

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_time() {
        assert_eq!(format_time(0), "00:00");
        assert_eq!(format_time(59), "00:59");
        assert_eq!(format_time(61), "01:01");
        assert_eq!(format_time(120), "02:00");
        assert_eq!(format_time(3600), "60:00");
    }

    #[test]
    fn test_status_texts() {
        assert_eq!(time_till_revert_text(90), "Auto-revert in 01:30");
        assert_eq!(change_size_text(ChangeSize::new(42), 80), "Change size: 42/80");
        assert_eq!(
            change_size_text(ChangeSize::approximate(42), 80),
            "Change size: ≈42/80"
        );
        assert_eq!(initial_change_size_text(80), "Change size: -/80");
    }
}
