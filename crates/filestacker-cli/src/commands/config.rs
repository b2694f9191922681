use filestacker_core::util::normalize_base_url;

use crate::cli::ConfigCommands;
use crate::commands::common::GlobalArgs;
use crate::config_profiles::{
    default_config_path, normalize_text_option, resolve_client_config, CliProfilesConfig,
};
use crate::error::CliError;

pub fn run_config(command: ConfigCommands, global: &GlobalArgs) -> Result<(), CliError> {
    match command {
        ConfigCommands::Init {
            api_base_url,
            poll_interval,
            no_activate,
        } => run_config_init(
            global.profile.as_deref(),
            api_base_url,
            poll_interval,
            no_activate,
        ),
        ConfigCommands::Show => run_config_show(global),
    }
}

pub fn run_config_init(
    profile_name: Option<&str>,
    api_base_url: Option<String>,
    poll_interval: Option<u64>,
    no_activate: bool,
) -> Result<(), CliError> {
    let mut config = CliProfilesConfig::load()?;
    let profile_name = config.resolve_profile_name(profile_name);

    let api_base_url = normalize_text_option(api_base_url)
        .map(validate_api_base_url)
        .transpose()?;
    if poll_interval == Some(0) {
        return Err(CliError::Config(
            "poll_interval must be at least 1 second".to_string(),
        ));
    }

    let profile = config.profile_mut_or_default(&profile_name);
    if let Some(url) = api_base_url {
        profile.api_base_url = Some(url);
    }
    if let Some(secs) = poll_interval {
        profile.poll_interval_secs = Some(secs);
    }

    if !no_activate {
        config.active_profile = Some(profile_name.clone());
    }

    let path = config.save()?;
    println!(
        "Profile '{}' initialized at {}",
        profile_name,
        path.display()
    );
    println!("Run `filestacker auth login --email <email> --password <password>` to sign in.");
    Ok(())
}

pub fn validate_api_base_url(url: String) -> Result<String, CliError> {
    normalize_base_url(&url).map_err(|error| CliError::Config(format!("api_base_url: {error}")))
}

fn run_config_show(global: &GlobalArgs) -> Result<(), CliError> {
    let config = CliProfilesConfig::load()?;
    let profile_name = config.resolve_profile_name(global.profile.as_deref());
    let client = resolve_client_config(global.api_url.clone(), config.profile(&profile_name))?;

    let path = default_config_path()?;
    println!("Config file:    {}", path.display());
    println!(
        "Active profile: {}",
        config.active_profile.as_deref().unwrap_or("(none)")
    );
    println!("Profile:        {profile_name}");
    println!("API base URL:   {}", client.api_base_url);
    println!("Poll interval:  {}s", client.poll_interval.as_secs());
    println!("Timeout:        {}s", client.request_timeout.as_secs());

    let others = config
        .profiles
        .keys()
        .filter(|name| **name != profile_name)
        .cloned()
        .collect::<Vec<_>>();
    if !others.is_empty() {
        println!("Other profiles: {}", others.join(", "));
    }
    Ok(())
}
