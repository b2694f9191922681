use crate::commands::common::{finish, open_signed_in, resolve_file_id, GlobalArgs};
use crate::error::CliError;

pub async fn run_rename(global: &GlobalArgs, id: &str, name: &str) -> Result<(), CliError> {
    let (profile, _session) = open_signed_in(global).await?;
    let context = &profile.context;
    let file_id = resolve_file_id(id, &context.catalog().files())?;

    let renamed = finish(
        context.notifications(),
        context.actions().rename(&file_id, name).await,
    )?;
    println!("{}  {}", renamed.id, renamed.filename);
    Ok(())
}
