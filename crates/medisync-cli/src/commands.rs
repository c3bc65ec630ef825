use std::sync::{Arc, Mutex};

use anyhow::{bail, Context, Result};
use medisync_client::HttpQueryTransport;
use medisync_collections::{
    alert_rule_store, chart_store, notification_store, scheduled_report_store, CollectionItem,
    CollectionRemote, OptimisticStore,
};
use medisync_core::{lock_or_recover, ApiError};
use medisync_session::{ChatSession, ChatSessionConfig, MessageRole};
use serde::Serialize;

use crate::{
    bootstrap_helpers::{build_runtime, Runtime},
    cli_args::{
        AlertsCommand, ChartsCommand, Cli, CliCommand, NotificationsCommand, ReportsCommand,
    },
    render::{
        render_alert_rule, render_answer, render_chart, render_notification, render_report,
    },
};

pub(crate) async fn run_cli(cli: Cli) -> Result<()> {
    let runtime = build_runtime(&cli)?;
    match &cli.command {
        CliCommand::Ask { query } => run_ask(&cli, &runtime, &query.join(" ")).await,
        CliCommand::NewSession => {
            let session = chat_session(&cli, &runtime);
            println!("{}", session.new_session());
            Ok(())
        }
        CliCommand::Charts(args) => {
            let store = chart_store(runtime.backend.clone());
            match &args.command {
                ChartsCommand::List => list_items(&store, cli.json, render_chart).await,
                ChartsCommand::Delete { id } => {
                    checked(store.delete(id).await, "delete chart")?;
                    println!("deleted chart {id}");
                    Ok(())
                }
                ChartsCommand::Refresh { id } => {
                    let chart = checked(store.refresh_chart(id).await, "refresh chart")?;
                    print_items(std::slice::from_ref(&chart), cli.json, render_chart)
                }
                ChartsCommand::Reorder { ids } => {
                    checked(store.refresh().await, "load charts")?;
                    checked(store.reorder(ids).await, "reorder charts")?;
                    print_items(&store.items(), cli.json, render_chart)
                }
            }
        }
        CliCommand::Alerts(args) => {
            let store = alert_rule_store(runtime.backend.clone());
            match &args.command {
                AlertsCommand::List => list_items(&store, cli.json, render_alert_rule).await,
                AlertsCommand::Delete { id } => {
                    checked(store.delete(id).await, "delete alert rule")?;
                    println!("deleted alert rule {id}");
                    Ok(())
                }
                AlertsCommand::Enable { id } => {
                    checked(store.toggle(id, true).await, "enable alert rule")?;
                    println!("enabled alert rule {id}");
                    Ok(())
                }
                AlertsCommand::Disable { id } => {
                    checked(store.toggle(id, false).await, "disable alert rule")?;
                    println!("disabled alert rule {id}");
                    Ok(())
                }
                AlertsCommand::Test { id } => {
                    let notification =
                        checked(store.test_rule(id).await, "test alert rule")?;
                    print_items(std::slice::from_ref(&notification), cli.json, render_notification)
                }
            }
        }
        CliCommand::Reports(args) => {
            let store = scheduled_report_store(runtime.backend.clone());
            match &args.command {
                ReportsCommand::List => list_items(&store, cli.json, render_report).await,
                ReportsCommand::Delete { id } => {
                    checked(store.delete(id).await, "delete scheduled report")?;
                    println!("deleted scheduled report {id}");
                    Ok(())
                }
            }
        }
        CliCommand::Notifications(args) => {
            let store = notification_store(runtime.backend.clone());
            match &args.command {
                NotificationsCommand::List => {
                    list_items(&store, cli.json, render_notification).await
                }
                NotificationsCommand::Read { id } => {
                    checked(store.mark_read(id).await, "mark notification read")?;
                    println!("marked notification {id} read");
                    Ok(())
                }
                NotificationsCommand::ReadAll => {
                    let marked = checked(store.mark_all_read().await, "mark notifications read")?;
                    println!("marked {marked} notifications read");
                    Ok(())
                }
                NotificationsCommand::UnreadCount => {
                    let unread = checked(store.fetch_unread_count().await, "count unread")?;
                    println!("{unread}");
                    Ok(())
                }
            }
        }
    }
}

fn chat_session(cli: &Cli, runtime: &Runtime) -> ChatSession {
    let transport = Arc::new(HttpQueryTransport::new(runtime.backend.clone()));
    ChatSession::new(
        transport,
        runtime.store.clone(),
        ChatSessionConfig {
            locale: cli.locale.clone(),
            stream_idle_timeout_ms: cli.stream_idle_timeout_ms,
        },
    )
}

async fn run_ask(cli: &Cli, runtime: &Runtime, query: &str) -> Result<()> {
    let session = chat_session(cli, runtime);

    let last_progress = Arc::new(Mutex::new(String::new()));
    session.subscribe(move |message| {
        if message.role != MessageRole::Assistant || !message.streaming {
            return;
        }
        let progress = message.partial_content.trim();
        let mut last = lock_or_recover(&last_progress);
        if !progress.is_empty() && *last != progress {
            eprintln!("... {progress}");
            *last = progress.to_string();
        }
    });

    let aborter = session.clone();
    let ctrl_c = tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::debug!("ctrl-c received; aborting query");
            aborter.abort();
        }
    });
    session.send_message(query).await;
    ctrl_c.abort();

    let snapshot = session.snapshot();
    if let Some(error) = snapshot.error {
        bail!("query failed: {error}");
    }
    let Some(answer) = snapshot
        .messages
        .iter()
        .rev()
        .find(|message| message.role == MessageRole::Assistant)
    else {
        bail!("query must not be empty");
    };
    let rendered = render_answer(answer);
    if !rendered.is_empty() {
        println!("{rendered}");
    }
    tracing::debug!(session_id = %snapshot.session_id, "query finished");
    Ok(())
}

fn checked<T>(result: Result<T, ApiError>, action: &str) -> Result<T> {
    result.with_context(|| format!("failed to {action}"))
}

async fn list_items<T, R>(
    store: &OptimisticStore<T, R>,
    json: bool,
    render: fn(&T) -> String,
) -> Result<()>
where
    T: CollectionItem + Serialize,
    R: CollectionRemote<T>,
{
    checked(store.refresh().await, "list items")?;
    print_items(&store.items(), json, render)
}

fn print_items<T: Serialize>(items: &[T], json: bool, render: fn(&T) -> String) -> Result<()> {
    if json {
        let encoded = serde_json::to_string_pretty(items).context("failed to encode items")?;
        println!("{encoded}");
        return Ok(());
    }
    for item in items {
        println!("{}", render(item));
    }
    Ok(())
}
