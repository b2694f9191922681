use std::io::{self, IsTerminal};
use std::time::Duration;

use chrono::Utc;
use filestacker_core::catalog::{CatalogSnapshot, RefreshTrigger};
use filestacker_core::Session;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::sync::mpsc;

use crate::commands::common::{
    format_file_lines, format_relative_time, open_context, print_notifications, GlobalArgs,
};
use crate::error::CliError;

pub async fn run_watch(
    global: &GlobalArgs,
    interval: Option<u64>,
    search: Option<String>,
) -> Result<(), CliError> {
    let poll_interval = interval
        .filter(|secs| *secs > 0)
        .map(Duration::from_secs);
    let profile = open_context(global, poll_interval)?;
    let context = &profile.context;
    let Some(session) = context.gateway().restore().await? else {
        return Err(CliError::NotSignedIn(profile.profile_name));
    };

    let catalog = context.catalog();
    catalog.set_search(search);
    let mut changes = catalog.subscribe();

    let (trigger_tx, trigger_rx) = mpsc::channel(4);
    let stdin_task = tokio::spawn(forward_enter_presses(trigger_tx));
    let shutdown = async {
        if let Err(error) = tokio::signal::ctrl_c().await {
            tracing::warn!("Failed to listen for Ctrl-C: {}", error);
            std::future::pending::<()>().await;
        }
    };

    let polling = catalog.run(trigger_rx, shutdown);
    tokio::pin!(polling);
    let clear_screen = io::stdout().is_terminal();
    loop {
        tokio::select! {
            () = &mut polling => break,
            Ok(()) = changes.changed() => {
                changes.borrow_and_update();
                print_notifications(context.notifications());
                render(&session, &catalog.snapshot(), clear_screen);
            }
        }
    }

    stdin_task.abort();
    Ok(())
}

/// Treat each line on stdin as the user returning to the window.
async fn forward_enter_presses(triggers: mpsc::Sender<RefreshTrigger>) {
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    while let Ok(Some(_)) = lines.next_line().await {
        if triggers.send(RefreshTrigger::FocusRegained).await.is_err() {
            break;
        }
    }
}

fn render(session: &Session, snapshot: &CatalogSnapshot, clear_screen: bool) {
    if clear_screen {
        print!("\x1B[2J\x1B[H");
    }
    for line in format_watch_screen(session, snapshot, Utc::now().timestamp_millis()) {
        println!("{line}");
    }
}

pub fn format_watch_screen(
    session: &Session,
    snapshot: &CatalogSnapshot,
    now_ms: i64,
) -> Vec<String> {
    let mut lines = vec![format!(
        "{} | {}",
        session.org_name,
        session.display_label()
    )];

    let status = if snapshot.loading {
        "Loading files...".to_string()
    } else if let Some(error) = &snapshot.last_error {
        format!("Failed to load files: {error}")
    } else {
        match snapshot.last_refreshed_at {
            Some(at) => format!(
                "{} files, updated {}",
                snapshot.files.len(),
                format_relative_time(at, now_ms)
            ),
            None => format!("{} files", snapshot.files.len()),
        }
    };
    lines.push(status);
    lines.push(String::new());

    if snapshot.files.is_empty() && !snapshot.loading {
        lines.push("No files yet.".to_string());
    } else {
        lines.extend(format_file_lines(&snapshot.files));
    }

    lines.push(String::new());
    lines.push("Press Enter to refresh, Ctrl-C to quit.".to_string());
    lines
}
