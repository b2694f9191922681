use std::env;
use std::io::{self, BufRead, IsTerminal, Write};
use std::process::Command;
use std::time::Duration;

use chrono::Utc;
use filestacker_core::actions::{Confirm, Launcher};
use filestacker_core::api::HttpBackend;
use filestacker_core::notifications::{NotificationCenter, NotificationLevel};
use filestacker_core::{AppContext, FileId, FileRecord, Session};

use crate::auth::SessionStore;
use crate::config_profiles::{resolve_client_config, CliProfilesConfig};
use crate::error::CliError;

pub type Context = AppContext<HttpBackend, SessionStore>;

/// Global flags shared by every command.
#[derive(Debug, Clone, Default)]
pub struct GlobalArgs {
    pub profile: Option<String>,
    pub api_url: Option<String>,
}

/// A context bound to the selected profile.
pub struct ProfileContext {
    pub profile_name: String,
    pub context: Context,
}

pub fn open_context(
    global: &GlobalArgs,
    poll_interval: Option<Duration>,
) -> Result<ProfileContext, CliError> {
    let profiles = CliProfilesConfig::load()?;
    let profile_name = profiles.resolve_profile_name(global.profile.as_deref());
    let mut config = resolve_client_config(global.api_url.clone(), profiles.profile(&profile_name))?;
    if let Some(interval) = poll_interval {
        config = config.with_poll_interval(interval);
    }
    tracing::debug!(profile = %profile_name, api = %config.api_base_url, "Using profile");

    let context = AppContext::connect(config, SessionStore::new(&profile_name))?;
    Ok(ProfileContext {
        profile_name,
        context,
    })
}

/// Open a context and resume the stored session, loading the catalog.
pub async fn open_signed_in(global: &GlobalArgs) -> Result<(ProfileContext, Session), CliError> {
    let profile = open_context(global, None)?;
    let session = resume_session(&profile).await?;
    Ok((profile, session))
}

/// Resume the stored session and load the catalog with whatever search
/// term is already set.
pub async fn resume_session(profile: &ProfileContext) -> Result<Session, CliError> {
    let Some(session) = profile.context.init().await? else {
        return Err(CliError::NotSignedIn(profile.profile_name.clone()));
    };
    if print_notifications(profile.context.notifications()) {
        return Err(CliError::Reported);
    }
    Ok(session)
}

/// Print pending notifications. If `result` failed and the failure was
/// already shown as an error notification, return `CliError::Reported`.
pub fn finish<T>(
    notifications: &NotificationCenter,
    result: filestacker_core::Result<T>,
) -> Result<T, CliError> {
    let shown_error = print_notifications(notifications);
    match result {
        Ok(value) => Ok(value),
        Err(_) if shown_error => Err(CliError::Reported),
        Err(error) => Err(error.into()),
    }
}

/// Write pending notifications to stderr. Returns whether any was an error.
pub fn print_notifications(notifications: &NotificationCenter) -> bool {
    let mut shown_error = false;
    for notification in notifications.drain() {
        let marker = match notification.level {
            NotificationLevel::Info => "info",
            NotificationLevel::Success => "ok",
            NotificationLevel::Error => {
                shown_error = true;
                "error"
            }
        };
        eprintln!("[{marker}] {}", notification.message);
    }
    shown_error
}

pub fn normalize_file_identifier(id: &str) -> Result<String, CliError> {
    let trimmed = id.trim();
    if trimmed.is_empty() {
        Err(CliError::EmptyFileId)
    } else {
        Ok(trimmed.to_string())
    }
}

/// Resolve a full ID or a unique ID prefix against the loaded files.
pub fn resolve_file_id(query: &str, files: &[FileRecord]) -> Result<FileId, CliError> {
    let query = normalize_file_identifier(query)?;
    if let Some(file) = files.iter().find(|file| file.id.as_str() == query) {
        return Ok(file.id.clone());
    }

    let matching = files
        .iter()
        .filter(|file| file.id.as_str().starts_with(&query))
        .collect::<Vec<_>>();

    match matching.as_slice() {
        [] => Err(CliError::FileNotFound(query)),
        [file] => Ok(file.id.clone()),
        _ => {
            let options = matching
                .iter()
                .take(3)
                .map(|file| format!("{} ({})", short_id(&file.id), file.filename))
                .collect::<Vec<_>>()
                .join(", ");

            Err(CliError::AmbiguousFileId(format!(
                "ID prefix '{query}' is ambiguous; matches: {options}"
            )))
        }
    }
}

pub fn short_id(id: &FileId) -> String {
    id.as_str().chars().take(13).collect()
}

pub fn format_file_lines(files: &[FileRecord]) -> Vec<String> {
    let now_ms = Utc::now().timestamp_millis();
    files
        .iter()
        .map(|file| {
            let short_id = short_id(&file.id);
            let name = truncate(&file.filename, 40);
            let uploaded = file.uploaded_at_millis().map_or_else(
                || file.uploaded_at.clone(),
                |millis| format_relative_time(millis, now_ms),
            );
            format!(
                "{short_id:<13}  {name:<40}  {kind:<5}  {size:>10}  {uploaded:<10}  {owner}",
                kind = file.kind,
                size = file.human_size,
                owner = file.owner_name,
            )
        })
        .collect()
}

pub fn format_file_details(file: &FileRecord) -> Vec<String> {
    vec![
        format!("ID:        {}", file.id),
        format!("Name:      {}", file.filename),
        format!("Kind:      {}", file.kind),
        format!("Size:      {} ({} bytes)", file.human_size, file.size_bytes),
        format!(
            "Uploaded:  {}",
            file.uploaded_at_millis()
                .map_or_else(|| file.uploaded_at.clone(), format_timestamp)
        ),
        format!("Owner:     {}", file.owner_name),
        format!(
            "Stored at: {}",
            file.storage_path.as_deref().unwrap_or("(none)")
        ),
    ]
}

pub fn truncate(text: &str, max_chars: usize) -> String {
    let collapsed = text.split_whitespace().collect::<Vec<_>>().join(" ");
    if collapsed.chars().count() <= max_chars {
        collapsed
    } else {
        let take_len = max_chars.saturating_sub(3);
        let mut truncated = collapsed.chars().take(take_len).collect::<String>();
        truncated.push_str("...");
        truncated
    }
}

pub fn format_relative_time(timestamp_ms: i64, now_ms: i64) -> String {
    let diff = now_ms.saturating_sub(timestamp_ms);
    let minute = 60_000;
    let hour = 60 * minute;
    let day = 24 * hour;
    let week = 7 * day;
    let month = 30 * day;
    let year = 365 * day;

    if diff < minute {
        "just now".to_string()
    } else if diff < hour {
        format!("{}m ago", diff / minute)
    } else if diff < day {
        format!("{}h ago", diff / hour)
    } else if diff < week {
        format!("{}d ago", diff / day)
    } else if diff < month {
        format!("{}w ago", diff / week)
    } else if diff < year {
        format!("{}mo ago", diff / month)
    } else {
        format!("{}y ago", diff / year)
    }
}

pub fn format_timestamp(timestamp_ms: i64) -> String {
    chrono::DateTime::from_timestamp_millis(timestamp_ms).map_or_else(
        || timestamp_ms.to_string(),
        |date_time| date_time.format("%Y-%m-%d %H:%M:%S UTC").to_string(),
    )
}

/// Opens signed URLs with the platform's default handler.
///
/// `FILESTACKER_OPENER` (or `BROWSER`) overrides the command.
pub struct SystemOpener;

impl SystemOpener {
    fn command_line() -> String {
        env::var("FILESTACKER_OPENER")
            .or_else(|_| env::var("BROWSER"))
            .unwrap_or_else(|_| default_opener().to_string())
    }
}

impl Launcher for SystemOpener {
    fn launch(&self, url: &str) -> filestacker_core::Result<()> {
        let opener = Self::command_line();
        launch_opener(&opener, url).map_err(filestacker_core::Error::Io)
    }
}

pub fn launch_opener(opener: &str, url: &str) -> io::Result<()> {
    let mut parts = opener.split_whitespace();
    let Some(program) = parts.next() else {
        return Err(io::Error::other("empty opener command"));
    };

    let mut command = Command::new(program);
    command.args(parts);
    if cfg!(windows) && program.eq_ignore_ascii_case("cmd") {
        // `start` treats the first quoted argument as a window title.
        command.arg("");
    }
    let status = command.arg(url).status()?;
    if status.success() {
        Ok(())
    } else {
        Err(io::Error::other(format!(
            "`{opener}` exited with status {status}"
        )))
    }
}

pub const fn default_opener() -> &'static str {
    if cfg!(target_os = "macos") {
        "open"
    } else if cfg!(windows) {
        "cmd /C start"
    } else {
        "xdg-open"
    }
}

/// Yes/no prompt on the terminal. Non-interactive input declines unless
/// `assume_yes` is set.
pub struct TerminalConfirm {
    pub assume_yes: bool,
}

impl Confirm for TerminalConfirm {
    fn confirm(&self, prompt: &str) -> bool {
        if self.assume_yes {
            return true;
        }
        let stdin = io::stdin();
        if !stdin.is_terminal() {
            eprintln!("{prompt} Refusing without --yes on non-interactive input.");
            return false;
        }

        eprint!("{prompt} [y/N] ");
        let _ = io::stderr().flush();
        let mut answer = String::new();
        if stdin.lock().read_line(&mut answer).is_err() {
            return false;
        }
        is_affirmative(&answer)
    }
}

pub fn is_affirmative(answer: &str) -> bool {
    matches!(answer.trim().to_ascii_lowercase().as_str(), "y" | "yes")
}
