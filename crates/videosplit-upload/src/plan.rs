//! Plan limits applied at enqueue time

use videosplit_auth::PlanTier;

/// Largest file accepted into the queue (500 MiB).
pub const MAX_FILE_BYTES: u64 = 500 * 1024 * 1024;

/// Container formats the split endpoint accepts, lowercase.
pub const ALLOWED_EXTENSIONS: [&str; 4] = ["mp4", "mov", "avi", "mkv"];

/// How many files a plan may hold in the queue at once.
pub fn capacity_for(tier: PlanTier) -> usize {
    match tier {
        PlanTier::Free => 1,
        PlanTier::Starter => 3,
        PlanTier::Pro => 5,
        PlanTier::Enterprise => 10,
    }
}

/// Whether `extension` (without the dot) is an allowed container, ignoring case.
pub fn is_allowed_extension(extension: &str) -> bool {
    ALLOWED_EXTENSIONS
        .iter()
        .any(|allowed| allowed.eq_ignore_ascii_case(extension))
}
