use super::prompts;
use crate::output::{table_with_header, Output};
use color_eyre::eyre::eyre;
use color_eyre::Result;
use comfy_table::Cell;
use owo_colors::OwoColorize;
use serde_json::json;

use anisync_config::{Config, PathManager, SyncTime};

pub fn run_config(cmd: crate::ConfigCommands, output: &Output) -> Result<()> {
    match cmd {
        crate::ConfigCommands::Init => init_config(output),
        crate::ConfigCommands::Show { full } => show_config(full, output),
    }
}

fn init_config(output: &Output) -> Result<()> {
    let path_manager = PathManager::default();
    path_manager
        .ensure_directories()
        .map_err(|e| eyre!("Failed to create configuration directories: {}", e))?;

    let config_file = path_manager.config_file();
    let mut config = if config_file.exists() {
        output.info(format!("Updating existing configuration at {}", config_file.display()));
        Config::load_from_file(&config_file)?
    } else {
        Config::template()
    };
    let mut cred_store = super::load_credentials(&path_manager)?;

    print_section_header("Plex", output);
    let server_default = non_empty(&config.plex.server_url).unwrap_or("http://localhost:32400");
    config.plex.server_url = prompts::prompt_required("Plex server URL", Some(server_default))?;
    config.plex.library =
        prompts::prompt_required("Anime library name", Some(config.plex.library.as_str()))?;
    if prompt_for_secret(cred_store.get_plex_token().is_some(), "Plex token")? {
        let token = prompts::prompt_secret("Plex token")?;
        if !token.is_empty() {
            cred_store.set_plex_token(token);
        }
    }

    print_section_header("MyAnimeList", output);
    config.myanimelist.username =
        prompts::prompt_required("MyAnimeList username", non_empty(&config.myanimelist.username))?;
    if prompt_for_secret(cred_store.get_mal_password().is_some(), "MyAnimeList password")? {
        let password = prompts::prompt_secret("MyAnimeList password")?;
        if !password.is_empty() {
            cred_store.set_mal_password(password);
        }
    }

    print_section_header("Schedule", output);
    let current_time = config.scheduler.sync_time.to_string();
    config.scheduler.sync_time = loop {
        let value = prompts::prompt_string("Daily sync time (HH:MM, local)", Some(current_time.as_str()))?;
        match SyncTime::parse(&value) {
            Ok(time) => break time,
            Err(e) => output.warn(e.to_string()),
        }
    };
    config.scheduler.run_on_startup = prompts::prompt_yes_no(
        "Run a sync when the daemon starts?",
        Some(config.scheduler.run_on_startup),
    )?;

    config.save_to_file(&config_file)?;
    cred_store
        .save()
        .map_err(|e| eyre!("Failed to save credentials: {}", e))?;

    output.println("");
    output.success(format!("Configuration saved to {}", config_file.display()));
    let missing = cred_store.missing();
    if !missing.is_empty() {
        output.warn(format!("Still missing credentials: {}", missing.join(", ")));
    }
    Ok(())
}

/// Ask before replacing a stored secret; always prompt when none is stored
fn prompt_for_secret(already_set: bool, name: &str) -> Result<bool> {
    if !already_set {
        return Ok(true);
    }
    prompts::prompt_yes_no(&format!("{} is already stored. Replace it?", name), Some(false))
}

fn show_config(full: bool, output: &Output) -> Result<()> {
    let path_manager = PathManager::default();
    let config_file = path_manager.config_file();

    if !config_file.exists() {
        output.warn(format!("Configuration file not found at: {}", config_file.display()));
        output.info("Run 'anisync config init' to create it.");
        return Ok(());
    }

    let config = Config::load_from_file(&config_file)?;
    let cred_store = super::load_credentials(&path_manager)?;
    let secret = |value: Option<&String>| match value {
        Some(v) if full => v.clone(),
        Some(v) => mask_string(v),
        None => "<not set>".to_string(),
    };
    let plex_token = secret(cred_store.get_plex_token());
    let mal_password = secret(cred_store.get_mal_password());

    if !output.is_human() {
        output.json(&json!({
            "config_file": config_file.display().to_string(),
            "data_dir": path_manager.data_dir().display().to_string(),
            "plex": {
                "server_url": config.plex.server_url,
                "library": config.plex.library,
                "token": plex_token,
            },
            "myanimelist": {
                "username": config.myanimelist.username,
                "password": mal_password,
            },
            "cross_reference": {
                "snapshot_url": config.cross_reference.snapshot_url,
            },
            "scheduler": {
                "sync_time": config.scheduler.sync_time.to_string(),
                "run_on_startup": config.scheduler.run_on_startup,
            },
            "browser": {
                "headless": config.browser.headless,
                "executable": config.browser.executable.as_ref().map(|p| p.display().to_string()),
            },
        }));
        return Ok(());
    }
    if output.is_quiet() {
        return Ok(());
    }

    let mut table = table_with_header(&["Setting", "Value"]);
    let rows = [
        ("Config file", config_file.display().to_string()),
        ("Data directory", path_manager.data_dir().display().to_string()),
        ("Plex server URL", config.plex.server_url.clone()),
        ("Plex library", config.plex.library.clone()),
        ("Plex token", plex_token),
        ("MyAnimeList username", config.myanimelist.username.clone()),
        ("MyAnimeList password", mal_password),
        ("Cross-reference snapshot", config.cross_reference.snapshot_url.clone()),
        ("Daily sync time", config.scheduler.sync_time.to_string()),
        ("Sync on startup", config.scheduler.run_on_startup.to_string()),
        ("Headless browser", config.browser.headless.to_string()),
        (
            "Chromium executable",
            config
                .browser
                .executable
                .as_ref()
                .map(|p| p.display().to_string())
                .unwrap_or_else(|| "auto-detect".to_string()),
        ),
    ];
    for (name, value) in rows {
        table.add_row(vec![Cell::new(name).fg(comfy_table::Color::Cyan), Cell::new(value)]);
    }
    output.table(&table);

    if let Err(e) = config.validate() {
        output.warn(e.to_string());
    }
    Ok(())
}

fn non_empty(value: &str) -> Option<&str> {
    Some(value).filter(|v| !v.trim().is_empty())
}

fn mask_string(s: &str) -> String {
    let chars: Vec<char> = s.chars().collect();
    if chars.len() <= 4 {
        return "*".repeat(chars.len());
    }
    let head: String = chars[..2].iter().collect();
    let tail: String = chars[chars.len() - 2..].iter().collect();
    format!("{}***{}", head, tail)
}

fn print_section_header(title: &str, output: &Output) {
    output.println("");
    output.println(format!("{}", title.bold().bright_cyan()));
    output.println(format!("{}", "─".repeat(title.len()).bright_cyan()));
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mask_string() {
        assert_eq!(mask_string("abcd"), "****");
        assert_eq!(mask_string("xK9sPlexToken42"), "xK***42");
        assert_eq!(mask_string("pässwörd"), "pä***rd");
    }

    #[test]
    fn test_non_empty() {
        assert_eq!(non_empty("  "), None);
        assert_eq!(non_empty("http://plex:32400"), Some("http://plex:32400"));
    }
}
