//! Text summary builder for CLI output.

use crate::model::{format_duration, RunStatus, Stats};
use crate::sync::DashboardView;

/// Pre-formatted lines for text output.
pub struct TextSummary {
    pub lines: Vec<String>,
}

/// One-line status used by text mode and each `--watch` refresh.
pub fn status_line(status: &RunStatus, stats: &Stats) -> String {
    let mut line = format!(
        "Automation: {}",
        if status.is_running() { "Active" } else { "Inactive" }
    );
    if let Some(secs) = status.duration_seconds {
        line.push_str(&format!(" for {}", format_duration(secs)));
    }
    if let Some(count) = status.applications_count {
        line.push_str(&format!(" ({count} this run)"));
    }
    line.push_str(&format!(
        " | total {} ok {} failed {}",
        stats.total, stats.successful, stats.failed
    ));
    line
}

pub fn build_text_summary(view: &DashboardView, base_url: &str) -> TextSummary {
    let mut lines = Vec::new();
    lines.push(format!("Service: {base_url}"));
    lines.push(status_line(&view.status, &view.stats));
    if let Some(started) = view.status.start_time.as_deref() {
        lines.push(format!("Started: {started}"));
    }

    let stats = &view.stats;
    lines.push(format!(
        "Applications: total {} | successful {} | failed {} | pending {}",
        stats.total, stats.successful, stats.failed, stats.pending
    ));
    if let Some(skipped) = stats.skipped {
        lines.push(format!("Skipped: {skipped}"));
    }
    lines.push(format!("Success rate: {:.1}%", stats.success_rate));

    let recent = view.recent();
    if recent.is_empty() {
        lines.push("Recent: none yet".to_string());
    } else {
        lines.push("Recent:".to_string());
        for app in recent {
            lines.push(format!(
                "  [{}] {} @ {} ({}) {}",
                app.status.label(),
                app.title,
                app.company,
                app.location,
                app.applied_time_of_day()
            ));
        }
    }

    TextSummary { lines }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{Application, ApplicationId, ApplicationStatus, RunState};
    use pretty_assertions::assert_eq;

    fn app(n: i64) -> Application {
        Application {
            id: ApplicationId::Number(n),
            title: format!("Role {n}"),
            company: "Acme".into(),
            location: "Remote".into(),
            salary: String::new(),
            status: ApplicationStatus::Successful,
            applied_at: "2024-05-01 08:00:00".into(),
            url: None,
            keywords: None,
            job_type: None,
        }
    }

    #[test]
    fn running_status_line_shows_duration() {
        let status = RunStatus {
            state: RunState::Running,
            duration_seconds: Some(125),
            start_time: None,
            applications_count: Some(4),
        };
        let stats = Stats {
            total: 10,
            successful: 8,
            failed: 2,
            ..Stats::default()
        };
        assert_eq!(
            status_line(&status, &stats),
            "Automation: Active for 2m 5s (4 this run) | total 10 ok 8 failed 2"
        );
    }

    #[test]
    fn summary_lists_only_five_recent() {
        let view = DashboardView {
            applications: (1..=9).map(app).collect(),
            ..DashboardView::default()
        };
        let summary = build_text_summary(&view, "http://svc");
        let recent: Vec<&String> = summary.lines.iter().filter(|l| l.starts_with("  [")).collect();
        assert_eq!(recent.len(), 5);
        assert!(recent[0].contains("Role 1"));
        assert_eq!(summary.lines[1], "Automation: Inactive | total 0 ok 0 failed 0");
    }
}
