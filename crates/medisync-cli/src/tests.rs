use clap::Parser;
use medisync_client::ChartSpec;
use medisync_session::ChatMessage;
use serde_json::json;

use crate::{
    cli_args::{ChartsCommand, Cli, CliCommand, NotificationsCommand},
    render::render_answer,
};

#[test]
fn parses_ask_with_multi_word_query_and_defaults() {
    let cli = Cli::try_parse_from(["medisync", "ask", "Show", "me", "revenue"]).expect("parse");
    match cli.command {
        CliCommand::Ask { query } => assert_eq!(query.join(" "), "Show me revenue"),
        other => panic!("unexpected command: {other:?}"),
    }
    assert_eq!(cli.locale, "en");
    assert!(cli.stream_idle_timeout_ms.is_none());
    assert!(!cli.json);
}

#[test]
fn parses_collection_subcommands_and_global_flags() {
    let cli = Cli::try_parse_from([
        "medisync",
        "--api-base",
        "http://127.0.0.1:9000/api/v1",
        "--stream-idle-timeout-ms",
        "1500",
        "charts",
        "reorder",
        "c",
        "a",
        "b",
        "--json",
    ])
    .expect("parse");
    assert_eq!(cli.api_base, "http://127.0.0.1:9000/api/v1");
    assert_eq!(cli.stream_idle_timeout_ms, Some(1_500));
    assert!(cli.json);
    match cli.command {
        CliCommand::Charts(args) => match args.command {
            ChartsCommand::Reorder { ids } => assert_eq!(ids, vec!["c", "a", "b"]),
            other => panic!("unexpected charts command: {other:?}"),
        },
        other => panic!("unexpected command: {other:?}"),
    }

    let cli = Cli::try_parse_from(["medisync", "notifications", "read", "n-1"]).expect("parse");
    assert!(matches!(
        cli.command,
        CliCommand::Notifications(args) if matches!(&args.command, NotificationsCommand::Read { id } if id == "n-1")
    ));

    let cli = Cli::try_parse_from(["medisync", "notifications", "read-all"]).expect("parse");
    assert!(matches!(
        cli.command,
        CliCommand::Notifications(args) if matches!(args.command, NotificationsCommand::ReadAll)
    ));
    assert!(Cli::try_parse_from(["medisync", "notifications", "delete", "n-1"]).is_err());
}

#[test]
fn rejects_zero_timeouts_and_empty_ask() {
    let error = Cli::try_parse_from(["medisync", "--request-timeout-ms", "0", "new-session"])
        .expect_err("zero timeout");
    assert!(error.to_string().contains("greater than 0"));
    assert!(Cli::try_parse_from(["medisync", "ask"]).is_err());
}

#[test]
fn render_answer_includes_chart_confidence_and_follow_ups() {
    let mut message = ChatMessage::assistant_placeholder("session-1");
    message.content = "Revenue is 1.2M".to_string();
    message.chart = Some(ChartSpec {
        kind: "bar".to_string(),
        payload: json!({}),
    });
    message.confidence = Some(0.9);
    message.follow_ups = vec!["By department".to_string()];

    assert_eq!(
        render_answer(&message),
        "Revenue is 1.2M\nchart: bar\nconfidence: 0.9\n- By department"
    );
}

#[test]
fn render_answer_marks_partial_progress() {
    let mut message = ChatMessage::assistant_placeholder("session-1");
    message.partial_content = "SELECT 1".to_string();
    assert_eq!(render_answer(&message), "(incomplete) SELECT 1");
}
