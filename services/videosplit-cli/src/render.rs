//! Terminal output for upload progress and the batch summary

use videosplit_gateway::FailureKind;
use videosplit_upload::{BatchReport, ItemOutcome, ItemStatus, Progress, Rejection};

/// One line per status transition, e.g. `[1/3] trip.mp4: done`.
pub fn progress_line(progress: &Progress, file_name: &str) -> String {
    let position = match progress.status {
        // Uploading is reported before the item counts as processed
        ItemStatus::Uploading | ItemStatus::Queued => progress.processed + 1,
        ItemStatus::Done | ItemStatus::Failed => progress.processed,
    };
    format!(
        "[{position}/{}] {file_name}: {}",
        progress.total, progress.status
    )
}

pub fn rejection_line(rejection: &Rejection) -> String {
    format!("skipped {rejection}")
}

pub fn failure_line(outcome: &ItemOutcome) -> Option<String> {
    let reason = outcome.result.as_ref().err()?;
    let hint = match reason.kind() {
        _ if reason.requires_login() => " (log in again)",
        Some(FailureKind::QuotaExceeded) => " (monthly minutes used up)",
        Some(FailureKind::RateLimited) => " (rate limited, try again later)",
        _ => "",
    };
    Some(format!("  {} failed: {reason}{hint}", outcome.file_name))
}

pub fn summary_line(succeeded: usize, total: usize) -> String {
    format!("{succeeded} of {total} succeeded")
}

/// Summary plus per-item failure reasons and the representative job.
pub fn report_lines(report: &BatchReport) -> Vec<String> {
    let mut lines: Vec<String> = report.outcomes.iter().filter_map(failure_line).collect();
    lines.push(summary_line(report.succeeded(), report.total()));
    if let Some((outcome, result)) = report.first_success() {
        lines.push(format!(
            "job {} ({}): {} segments, {:.1}s total",
            result.job_id, outcome.file_name, result.segments_count, result.total_duration
        ));
    }
    lines
}

#[cfg(test)]
mod tests {
    use super::*;
    use videosplit_upload::{SourceFile, UploadQueue};

    fn progress(processed: usize, total: usize, status: ItemStatus) -> Progress {
        let queue = UploadQueue::new();
        let item_id = queue
            .enqueue(SourceFile::from_bytes("a.mp4", b"x".to_vec()), 1)
            .unwrap();
        Progress {
            processed,
            total,
            item_id,
            status,
        }
    }

    #[test]
    fn uploading_shows_position_of_active_item() {
        let line = progress_line(&progress(1, 3, ItemStatus::Uploading), "b.mp4");
        assert_eq!(line, "[2/3] b.mp4: uploading");
    }

    #[test]
    fn terminal_shows_processed_count() {
        let line = progress_line(&progress(2, 3, ItemStatus::Failed), "b.mp4");
        assert_eq!(line, "[2/3] b.mp4: failed");
    }

    #[test]
    fn summary_counts() {
        assert_eq!(summary_line(3, 5), "3 of 5 succeeded");
    }

    #[test]
    fn rejection_is_prefixed() {
        let line = rejection_line(&Rejection::QueueFull {
            file_name: "c.mp4".into(),
            capacity: 1,
        });
        assert_eq!(line, "skipped c.mp4: queue is full (plan allows 1 files)");
    }

    #[test]
    fn failure_line_adds_hint_for_quota() {
        let queue = UploadQueue::new();
        let id = queue
            .enqueue(SourceFile::from_bytes("q.mp4", b"x".to_vec()), 1)
            .unwrap();
        let outcome = ItemOutcome {
            id,
            file_name: "q.mp4".into(),
            result: Err(videosplit_upload::UploadError::Gateway(
                videosplit_gateway::Error::RequestFailed {
                    status: 402,
                    kind: FailureKind::QuotaExceeded,
                    detail: None,
                    retry_after: None,
                },
            )),
        };
        assert_eq!(
            failure_line(&outcome).unwrap(),
            "  q.mp4 failed: request failed with status 402 (quota_exceeded) (monthly minutes used up)"
        );
    }
}
