//! Interactive prompts.

use dialoguer::{theme::ColorfulTheme, Confirm, Password};
use netfleet::reporter::OverwritePrompt;
use std::path::Path;

/// Asks on the terminal before overwriting an existing log file.
///
/// Without an attended terminal the answer is "no", so the prior log is kept
/// and appended to.
pub struct TerminalPrompt;

impl OverwritePrompt for TerminalPrompt {
    fn confirm_overwrite(&self, path: &Path) -> bool {
        if !console::user_attended() {
            return false;
        }

        Confirm::with_theme(&ColorfulTheme::default())
            .with_prompt(format!("Log file {} exists. Overwrite it?", path.display()))
            .default(false)
            .interact()
            .unwrap_or(false)
    }
}

/// Read a password without echo.
pub fn read_password(user: &str) -> anyhow::Result<String> {
    let password = Password::with_theme(&ColorfulTheme::default())
        .with_prompt(format!("Password for {}", user))
        .interact()?;
    Ok(password)
}
