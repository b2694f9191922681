use crate::commands::common::{finish, open_signed_in, GlobalArgs};
use crate::error::CliError;

pub async fn run_stats(global: &GlobalArgs, as_json: bool) -> Result<(), CliError> {
    let (profile, session) = open_signed_in(global).await?;
    let context = &profile.context;

    let stats = finish(context.notifications(), context.stats().await)?;
    if as_json {
        println!("{}", serde_json::to_string_pretty(&stats)?);
    } else {
        println!("Organization:  {}", session.org_name);
        println!("Files:         {}", stats.total_files);
        println!("Storage used:  {}", stats.human_storage_used());
    }
    Ok(())
}
