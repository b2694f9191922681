use filestacker_core::models::{SettingsUpdate, UserSettings};

use crate::cli::SettingsCommands;
use crate::commands::common::{finish, open_signed_in, GlobalArgs};
use crate::error::CliError;

pub async fn run_settings(command: SettingsCommands, global: &GlobalArgs) -> Result<(), CliError> {
    let (profile, _session) = open_signed_in(global).await?;
    let context = &profile.context;

    match command {
        SettingsCommands::Show { json } => {
            let settings = finish(context.notifications(), context.settings().await)?;
            print_settings(&settings, json)?;
        }
        SettingsCommands::Set {
            theme,
            notifications,
        } => {
            let update = SettingsUpdate {
                theme: theme.map(Into::into),
                notifications,
            };
            let settings = finish(
                context.notifications(),
                context.update_settings(&update).await,
            )?;
            print_settings(&settings, false)?;
        }
    }
    Ok(())
}

fn print_settings(settings: &UserSettings, as_json: bool) -> Result<(), CliError> {
    if as_json {
        println!("{}", serde_json::to_string_pretty(settings)?);
    } else {
        println!("Theme:          {}", settings.theme.as_str());
        println!(
            "Notifications:  {}",
            if settings.notifications { "on" } else { "off" }
        );
    }
    Ok(())
}
