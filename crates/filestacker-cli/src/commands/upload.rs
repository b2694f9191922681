use std::io::{self, IsTerminal, Write};
use std::path::PathBuf;

use filestacker_core::api::LocalFile;
use filestacker_core::upload::UploadProgress;

use crate::commands::common::{finish, format_file_lines, open_signed_in, GlobalArgs};
use crate::error::CliError;

pub async fn run_upload(global: &GlobalArgs, paths: &[PathBuf]) -> Result<(), CliError> {
    let mut files = Vec::with_capacity(paths.len());
    for path in paths {
        files.push(LocalFile::from_path(path).await?);
    }

    let (profile, _session) = open_signed_in(global).await?;
    let context = &profile.context;
    let uploads = context.uploads();
    let show_progress = io::stderr().is_terminal();

    let mut progress = uploads.subscribe();
    let upload = uploads.upload(files);
    tokio::pin!(upload);
    let result = loop {
        tokio::select! {
            result = &mut upload => break result,
            Ok(()) = progress.changed() => {
                if show_progress {
                    render_progress(&progress.borrow_and_update());
                }
            }
        }
    };
    if show_progress {
        eprint!("\r\x1B[2K");
    }

    let report = finish(context.notifications(), result)?;
    for line in format_file_lines(&report.uploaded) {
        println!("{line}");
    }
    Ok(())
}

fn render_progress(progress: &UploadProgress) {
    if let Some(line) = format_progress(progress) {
        eprint!("\r\x1B[2K{line}");
        let _ = io::stderr().flush();
    }
}

pub fn format_progress(progress: &UploadProgress) -> Option<String> {
    if !progress.active {
        return None;
    }
    let current = progress.current.as_deref().unwrap_or("");
    Some(format!(
        "Uploading {}/{} [{:>3.0}%] {current}",
        (progress.completed + 1).min(progress.total),
        progress.total,
        progress.percent
    ))
}
