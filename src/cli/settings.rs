//! Code related to the CLI commands for the program settings file.
use crate::settings::{Settings, get_settings_file_path};
use anyhow::Result;
use clap::Subcommand;
use std::fs;

/// The available subcommands for managing the settings file.
#[derive(Subcommand)]
pub enum SettingsSubcommands {
    /// Show the contents of the settings file, or the defaults if there is none.
    Show,
    /// Show the default contents of the settings file.
    ShowDefault,
    /// Print the path to the settings file.
    Path,
}

impl SettingsSubcommands {
    /// Execute the supplied settings subcommand
    pub fn execute(self) -> Result<()> {
        match self {
            Self::Show => handle_show_command()?,
            Self::ShowDefault => print!("{}", Settings::default_file_contents()?),
            Self::Path => println!("{}", get_settings_file_path().display()),
        }

        Ok(())
    }
}

/// Handle the `settings show` command.
fn handle_show_command() -> Result<()> {
    let file_path = get_settings_file_path();
    if file_path.is_file() {
        print!("{}", fs::read_to_string(&file_path)?);
    } else {
        eprintln!(
            "No settings file found at {}; showing defaults",
            file_path.display()
        );
        print!("{}", Settings::default_file_contents()?);
    }

    Ok(())
}
