use crate::commands::common::{finish, open_signed_in, resolve_file_id, GlobalArgs, SystemOpener};
use crate::error::CliError;

pub async fn run_open(global: &GlobalArgs, id: &str) -> Result<(), CliError> {
    let (profile, _session) = open_signed_in(global).await?;
    let context = &profile.context;
    let file_id = resolve_file_id(id, &context.catalog().files())?;

    finish(
        context.notifications(),
        context.actions().open(&file_id, &SystemOpener).await,
    )?;
    println!("{file_id}");
    Ok(())
}
