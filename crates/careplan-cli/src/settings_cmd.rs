//! `careplan settings show|set`.

use anyhow::Result;

use careplan_core::settings::DisplaySettings;

use crate::SettingsCommands;
use crate::config;

pub fn run_settings_command(command: SettingsCommands) -> Result<()> {
    let path = config::settings_path();
    let mut settings = DisplaySettings::load(&path);
    match command {
        SettingsCommands::Show => {
            println!("theme    = {}", settings.theme);
            println!("fontSize = {}", settings.font_size);
        }
        SettingsCommands::Set { key, value } => {
            settings.set(&key, &value)?;
            settings.save(&path)?;
            println!("Saved {} to {}", key, path.display());
        }
    }
    Ok(())
}
