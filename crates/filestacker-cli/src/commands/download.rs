use std::path::{Path, PathBuf};

use crate::commands::common::{finish, open_signed_in, resolve_file_id, GlobalArgs};
use crate::error::CliError;

pub async fn run_download(
    global: &GlobalArgs,
    id: &str,
    output: Option<&Path>,
) -> Result<(), CliError> {
    let destination = match output {
        Some(dir) => dir.to_path_buf(),
        None => std::env::current_dir()?,
    };

    let (profile, _session) = open_signed_in(global).await?;
    let context = &profile.context;
    let file_id = resolve_file_id(id, &context.catalog().files())?;

    let written: PathBuf = finish(
        context.notifications(),
        context.actions().download(&file_id, &destination).await,
    )?;
    println!("{}", written.display());
    Ok(())
}
