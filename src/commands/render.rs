//! Plain-text rendering of scan reports

use crate::core::{ScanReport, StateCounts};
use crate::utils::shorten_path;

pub const PATH_DISPLAY_WIDTH: usize = 50;
const TAG_WIDTH: usize = 14;

/// Renders a report as a header line followed by one numbered line per
/// non-clean repository
pub fn render_report(report: &ScanReport) -> String {
    let mut lines = Vec::with_capacity(report.entries.len() + 1);
    let mut header = format!(
        "{} {} [{}] {}",
        report.completed_at.format("%H:%M:%S"),
        report.severity.symbol(),
        report.severity.text(),
        report.summary
    );
    let errors = StateCounts::tally(&report.statuses).errors;
    if errors > 0 {
        header.push_str(&format!(" ({errors} could not be checked)"));
    }
    lines.push(header);

    for (i, entry) in report.entries.iter().enumerate() {
        let tree_char = if i == report.entries.len() - 1 {
            "└─"
        } else {
            "├─"
        };
        lines.push(format!(
            "   {} {:>2}. {} {:<width$} {}",
            tree_char,
            i + 1,
            entry.state.symbol(),
            entry.tag,
            shorten_path(&entry.path.to_string_lossy(), PATH_DISPLAY_WIDTH),
            width = TAG_WIDTH
        ));
    }

    lines.join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::git::RepoStatus;

    #[test]
    fn test_render_lists_entries_in_order() {
        let report = ScanReport::from_statuses(vec![
            RepoStatus::classified("/r/b", false, Some((2, 0))),
            RepoStatus::classified("/r/a", true, None),
            RepoStatus::classified("/r/c", false, Some((0, 0))),
        ]);
        let text = render_report(&report);
        let lines: Vec<_> = text.lines().collect();

        assert_eq!(lines.len(), 3);
        assert!(lines[0].contains("[red] Dirty: 1. Unpushed: 1."));
        assert!(lines[1].contains("1. 🔴 DIRTY"));
        assert!(lines[1].ends_with("/r/a"));
        assert!(lines[2].contains("2. 🟡 AHEAD +2"));
        assert!(lines[2].starts_with("   └─"));
    }

    #[test]
    fn test_render_counts_unchecked_repositories() {
        let report = ScanReport::from_statuses(vec![
            RepoStatus::error("/r/gone"),
            RepoStatus::error("/r/locked"),
            RepoStatus::classified("/r/ok", false, Some((0, 0))),
        ]);
        let text = render_report(&report);

        assert_eq!(text.lines().count(), 1);
        assert!(text.ends_with("All repositories clean. (2 could not be checked)"));
    }

    #[test]
    fn test_render_global_error() {
        let report = ScanReport::global_error("config unreadable");
        let text = render_report(&report);
        assert_eq!(text.lines().count(), 1);
        assert!(text.contains("[error] Scan failed: config unreadable"));
    }
}
