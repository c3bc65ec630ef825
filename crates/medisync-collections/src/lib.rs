//! Server-backed collections (pinned charts, alert rules, scheduled reports,
//! notifications) kept in sync through optimistic mutations.
mod alert_rules;
mod charts;
mod item;
mod notifications;
mod remote;
mod scheduled_reports;
mod store;

pub use alert_rules::{
    alert_rule_store, AlertRule, AlertRuleDraft, AlertRulePatch, AlertRuleRemote, AlertRuleStore,
    RuleTestOutcome, ALERT_RULES_PATH,
};
pub use charts::{
    chart_store, layout_charts, ChartPosition, ChartPositionUpdate, ChartRemote, ChartStore,
    PinnedChart, PinnedChartDraft, PinnedChartPatch, CHARTS_PATH, DASHBOARD_COLUMNS,
};
pub use item::CollectionItem;
pub use notifications::{
    notification_store, Notification, NotificationDraft, NotificationPatch, NotificationRemote,
    NotificationStore, NOTIFICATIONS_PATH, STATUS_READ,
};
pub use remote::{CollectionRemote, HttpCollection};
pub use scheduled_reports::{
    scheduled_report_store, ReportRecipient, ScheduledReport, ScheduledReportDraft,
    ScheduledReportPatch, ScheduledReportStore, SCHEDULED_REPORTS_PATH,
};
pub use store::{CollectionSnapshot, OptimisticStore};
