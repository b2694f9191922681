use crate::commands::common::{
    finish, open_signed_in, resolve_file_id, GlobalArgs, TerminalConfirm,
};
use crate::error::CliError;

pub async fn run_delete(global: &GlobalArgs, id: &str, assume_yes: bool) -> Result<(), CliError> {
    let (profile, _session) = open_signed_in(global).await?;
    let context = &profile.context;
    let file_id = resolve_file_id(id, &context.catalog().files())?;

    let confirm = TerminalConfirm { assume_yes };
    let deleted = finish(
        context.notifications(),
        context.actions().delete(&file_id, &confirm).await,
    )?;
    if deleted {
        println!("{file_id}");
    } else {
        eprintln!("Delete cancelled.");
    }
    Ok(())
}
