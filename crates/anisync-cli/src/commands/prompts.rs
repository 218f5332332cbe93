use color_eyre::Result;
use dialoguer::{Confirm, Input};

/// Prompt for a string value with optional default
pub fn prompt_string(prompt: &str, default: Option<&str>) -> Result<String> {
    let mut input_builder = Input::<String>::new().with_prompt(prompt).allow_empty(true);

    if let Some(default_value) = default {
        input_builder = input_builder.default(default_value.to_string());
    }

    input_builder
        .interact_text()
        .map(|value| value.trim().to_string())
        .map_err(|e| color_eyre::eyre::eyre!("Failed to read input: {}", e))
}

/// Prompt until a non-empty value is entered
pub fn prompt_required(prompt: &str, default: Option<&str>) -> Result<String> {
    loop {
        let value = prompt_string(prompt, default)?;
        if !value.is_empty() {
            return Ok(value);
        }
        eprintln!("A value is required");
    }
}

/// Prompt for a secret without echoing it
pub fn prompt_secret(prompt: &str) -> Result<String> {
    rpassword::prompt_password(format!("{}: ", prompt))
        .map(|value| value.trim().to_string())
        .map_err(|e| color_eyre::eyre::eyre!("Failed to read {}: {}", prompt, e))
}

/// Prompt for yes/no with optional default
pub fn prompt_yes_no(prompt: &str, default: Option<bool>) -> Result<bool> {
    let mut confirm_builder = Confirm::new().with_prompt(prompt);

    if let Some(default_value) = default {
        confirm_builder = confirm_builder.default(default_value);
    }

    confirm_builder
        .interact()
        .map_err(|e| color_eyre::eyre::eyre!("Failed to read confirmation: {}", e))
}
