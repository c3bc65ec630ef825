use medisync_collections::{AlertRule, Notification, PinnedChart, ScheduledReport};
use medisync_session::ChatMessage;

pub(crate) fn render_answer(message: &ChatMessage) -> String {
    let mut lines = Vec::new();
    if message.content.trim().is_empty() {
        if !message.partial_content.trim().is_empty() {
            lines.push(format!("(incomplete) {}", message.partial_content.trim()));
        }
    } else {
        lines.push(message.content.trim().to_string());
    }
    if let Some(chart) = &message.chart {
        lines.push(format!("chart: {}", chart.kind));
    }
    if let Some(confidence) = message.confidence {
        lines.push(format!("confidence: {confidence}"));
    }
    for option in &message.follow_ups {
        lines.push(format!("- {option}"));
    }
    lines.join("\n")
}

pub(crate) fn render_chart(chart: &PinnedChart) -> String {
    format!(
        "{}\t{},{}\tsize={}\t{}",
        chart.id, chart.position.row, chart.position.column, chart.position.size, chart.title
    )
}

pub(crate) fn render_alert_rule(rule: &AlertRule) -> String {
    format!(
        "{}\t{}\t{} {} {}\t{}",
        rule.id,
        if rule.is_active { "active" } else { "paused" },
        rule.metric_id,
        rule.operator,
        rule.threshold,
        rule.name
    )
}

pub(crate) fn render_report(report: &ScheduledReport) -> String {
    format!(
        "{}\t{} {}\t{}\t{}",
        report.id, report.schedule_type, report.schedule_time, report.format, report.name
    )
}

pub(crate) fn render_notification(notification: &Notification) -> String {
    let title = notification
        .content
        .get("title")
        .and_then(|value| value.as_str())
        .unwrap_or("");
    format!(
        "{}\t{}\t{}\t{}",
        notification.id,
        if notification.is_read() { "read" } else { "unread" },
        notification.created_at.to_rfc3339(),
        title
    )
}
