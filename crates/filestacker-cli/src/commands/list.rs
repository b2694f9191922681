use crate::commands::common::{format_file_lines, open_context, resume_session, GlobalArgs};
use crate::error::CliError;

pub async fn run_list(
    global: &GlobalArgs,
    search: Option<String>,
    as_json: bool,
) -> Result<(), CliError> {
    let profile = open_context(global, None)?;
    profile.context.catalog().set_search(search);
    resume_session(&profile).await?;

    let files = profile.context.catalog().files();
    if as_json {
        println!("{}", serde_json::to_string_pretty(&files)?);
    } else if files.is_empty() {
        eprintln!("No files found.");
    } else {
        for line in format_file_lines(&files) {
            println!("{line}");
        }
    }

    Ok(())
}
