use crate::commands::common::{
    finish, format_file_details, open_signed_in, resolve_file_id, GlobalArgs,
};
use crate::error::CliError;

pub async fn run_show(global: &GlobalArgs, id: &str, as_json: bool) -> Result<(), CliError> {
    let (profile, _session) = open_signed_in(global).await?;
    let context = &profile.context;
    let file_id = resolve_file_id(id, &context.catalog().files())?;

    let file = finish(
        context.notifications(),
        context.actions().details(&file_id).await,
    )?;
    if as_json {
        println!("{}", serde_json::to_string_pretty(&file)?);
    } else {
        for line in format_file_details(&file) {
            println!("{line}");
        }
    }
    Ok(())
}
