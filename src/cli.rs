// CLI module - command-line argument parsing and handlers
//
// Running without a subcommand starts the dashboard. Subcommands:
// - signup: create a user and store its tokens
// - logout: forget stored tokens
// - config --show/--path/--reset/--edit: manage the config file

use crate::config::{Config, VERSION};
use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use std::io::{BufRead, Write};
use std::process::Command;

/// CDR Dashboard - live view of call detail records
#[derive(Parser, Debug)]
#[command(name = "cdr-dash")]
#[command(version = VERSION)]
#[command(about = "Live dashboard for call detail records", long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Option<Commands>,

    /// Run headless: log poll events to stdout instead of drawing the TUI
    #[arg(long)]
    pub no_tui: bool,

    /// Ignore any stored token and log in with username and password
    #[arg(long)]
    pub login: bool,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Create a user, store its tokens and open the dashboard
    Signup {
        #[arg(long)]
        username: Option<String>,

        /// Prompted for when omitted
        #[arg(long)]
        password: Option<String>,
    },

    /// Forget stored tokens
    Logout,

    /// Manage configuration
    Config {
        /// Show effective configuration
        #[arg(long)]
        show: bool,

        /// Reset config file to defaults
        #[arg(long)]
        reset: bool,

        /// Open config file in $EDITOR
        #[arg(long)]
        edit: bool,

        /// Show config file path
        #[arg(long)]
        path: bool,
    },
}

/// Handle `config` flags
pub fn handle_config(show: bool, reset: bool, edit: bool, path: bool) -> Result<()> {
    if path {
        handle_config_path()
    } else if show {
        handle_config_show()
    } else if reset {
        handle_config_reset()
    } else if edit {
        handle_config_edit()
    } else {
        println!("Usage: cdr-dash config [--show|--reset|--edit|--path]");
        println!();
        println!("Options:");
        println!("  --show    Display effective configuration");
        println!("  --reset   Reset config file to defaults");
        println!("  --edit    Open config file in $EDITOR");
        println!("  --path    Show config file path");
        Ok(())
    }
}

fn config_path() -> Result<std::path::PathBuf> {
    Config::config_path().context("Could not determine config path")
}

fn handle_config_path() -> Result<()> {
    println!("{}", config_path()?.display());
    Ok(())
}

fn handle_config_show() -> Result<()> {
    let config = Config::from_env()?;

    println!("# Effective configuration (env > file > defaults)");
    println!();
    print!("{}", config.to_toml());

    println!();
    let path = config_path()?;
    if path.exists() {
        println!("# Source: {}", path.display());
    } else {
        println!("# Source: defaults (no config file)");
    }
    Ok(())
}

fn handle_config_reset() -> Result<()> {
    let path = config_path()?;

    if path.exists() {
        let answer = prompt(&format!(
            "Config file exists at {}. Overwrite? [y/N] ",
            path.display()
        ))?;
        if !answer.eq_ignore_ascii_case("y") {
            println!("Aborted.");
            return Ok(());
        }
    }

    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent).context("Error creating config directory")?;
    }
    std::fs::write(&path, Config::default().to_toml()).context("Error writing config")?;

    println!("Config reset to defaults: {}", path.display());
    Ok(())
}

fn handle_config_edit() -> Result<()> {
    let path = config_path()?;

    if !path.exists() {
        Config::ensure_config_exists();
        println!("Created new config file: {}", path.display());
    }

    let editor = std::env::var("EDITOR")
        .or_else(|_| std::env::var("VISUAL"))
        .unwrap_or_else(|_| {
            if cfg!(windows) {
                "notepad".to_string()
            } else {
                "nano".to_string()
            }
        });

    println!("Opening {} with {}", path.display(), editor);

    let status = Command::new(&editor)
        .arg(&path)
        .status()
        .with_context(|| format!("Failed to launch editor '{}' (set $EDITOR)", editor))?;
    if !status.success() {
        bail!("Editor exited with status: {}", status);
    }
    Ok(())
}

/// Ask a question on stderr and read one trimmed line from stdin
pub fn prompt(label: &str) -> Result<String> {
    eprint!("{}", label);
    std::io::stderr().flush().context("Failed to flush prompt")?;

    let mut input = String::new();
    let read = std::io::stdin()
        .lock()
        .read_line(&mut input)
        .context("Failed to read from stdin")?;
    if read == 0 {
        bail!("stdin closed");
    }
    Ok(input.trim().to_string())
}

/// Use the given value or prompt for it
pub fn value_or_prompt(value: Option<String>, label: &str) -> Result<String> {
    match value {
        Some(value) => Ok(value),
        None => prompt(label),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_signup_flags() {
        let cli = Cli::try_parse_from(["cdr-dash", "signup", "--username", "alice"]).unwrap();
        match cli.command {
            Some(Commands::Signup { username, password }) => {
                assert_eq!(username.as_deref(), Some("alice"));
                assert_eq!(password, None);
            }
            other => panic!("unexpected command: {:?}", other),
        }
    }

    #[test]
    fn bare_invocation_runs_dashboard() {
        let cli = Cli::try_parse_from(["cdr-dash", "--no-tui", "--login"]).unwrap();
        assert!(cli.command.is_none());
        assert!(cli.no_tui);
        assert!(cli.login);
    }

    #[test]
    fn given_value_skips_prompt() {
        assert_eq!(
            value_or_prompt(Some("bob".to_string()), "Username: ").unwrap(),
            "bob"
        );
    }
}
