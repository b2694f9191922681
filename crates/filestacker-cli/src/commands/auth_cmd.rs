use crate::cli::AuthCommands;
use crate::commands::common::{finish, open_context, GlobalArgs};
use crate::error::CliError;

pub async fn run_auth(command: AuthCommands, global: &GlobalArgs) -> Result<(), CliError> {
    let profile = open_context(global, None)?;
    let profile_name = profile.profile_name.as_str();
    let context = &profile.context;

    match command {
        AuthCommands::Login { email, password } => {
            let session = context.login(&email, &password).await;
            let session = finish(context.notifications(), session)?;
            println!(
                "Signed in profile '{profile_name}' as {} ({})",
                session.display_label(),
                session.org_name
            );
        }
        AuthCommands::Register {
            email,
            password,
            name,
            org,
        } => {
            let session = context.register(&email, &password, &name, &org).await;
            let session = finish(context.notifications(), session)?;
            println!(
                "Registered and signed in profile '{profile_name}' as {} ({})",
                session.display_label(),
                session.org_name
            );
        }
        AuthCommands::Status => match context.gateway().restore().await? {
            Some(session) => println!(
                "Profile '{profile_name}' is signed in as {} ({}) against {}",
                session.display_label(),
                session.org_name,
                context.config().api_base_url
            ),
            None => println!("Profile '{profile_name}' is not signed in."),
        },
        AuthCommands::Logout => {
            let restored = context.gateway().restore().await?;
            let result = context.teardown().await;
            if restored.is_none() {
                println!("Profile '{profile_name}' was not signed in.");
                return Ok(());
            }
            if let Err(error) = result {
                println!("Cleared local session for profile '{profile_name}'");
                return Err(error.into());
            }
            println!("Signed out profile '{profile_name}'");
        }
    }

    Ok(())
}
