use std::{
    io::{self, BufRead, Write},
    path::{Path, PathBuf},
};

use clap::Parser;
use serde::{Deserialize, Serialize};
use surveillance_station_client::config::StationConfig;

use crate::{Result, command::Command};

const CONFIG_DIR: &str = ".surveillance-station";
const CONFIG_FILE: &str = "config.toml";

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all(deserialize = "kebab-case"))]
pub struct Config {
    pub station: StationConfig,
    pub logging: Option<LoggingConfig>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all(deserialize = "kebab-case"))]
pub struct LoggingConfig {
    /// `EnvFilter` directives, used when `RUST_LOG` is unset.
    pub filter: Option<String>,
    #[serde(default = "default_ansi")]
    pub ansi: bool,
}

fn default_ansi() -> bool {
    true
}

#[derive(Parser, Debug)]
#[command(version, about)]
pub struct Args<T: serde::de::DeserializeOwned + Clone + Send + Sync + 'static> {
    /// Config file; defaults to `~/.surveillance-station/config.toml`
    #[arg(short, long, env = "SURVEILLANCE_STATION_CONFIG", value_parser = toml_from_file::<T>)]
    pub config: Option<T>,
    /// Load the config, then exit without contacting the station
    #[arg(long)]
    pub validate: bool,
    #[command(subcommand)]
    pub command: Option<Command>,
}

impl<T: serde::de::DeserializeOwned + Clone + Send + Sync + 'static> Args<T> {
    pub fn get_config(&self) -> Result<T> {
        match &self.config {
            Some(config) => Ok(config.clone()),
            None => toml_from_file(&default_config_path().to_string_lossy()),
        }
    }
}

/// `$HOME/.surveillance-station/config.toml`, or `config.toml` in the working
/// directory when `HOME` is unset.
pub fn default_config_path() -> PathBuf {
    std::env::var_os("HOME")
        .map(|home| PathBuf::from(home).join(CONFIG_DIR))
        .unwrap_or_default()
        .join(CONFIG_FILE)
}

pub fn toml_from_file<T: serde::de::DeserializeOwned>(path: &str) -> Result<T> {
    let toml = std::fs::read_to_string(path)?;
    config_from_toml(&toml)
}

/// TOML is routed through `serde_json::Value` so the same `Deserialize`
/// impls serve both formats.
pub fn config_from_toml<T: serde::de::DeserializeOwned>(toml: &str) -> Result<T> {
    let config_json: serde_json::Value = toml::from_str(toml)?;
    let config = serde_json::from_value(config_json)?;
    Ok(config)
}

/// Runs the interactive first-run setup when no config exists at the
/// default path. Returns that path either way.
pub async fn check_and_create_config() -> Result<PathBuf> {
    let path = default_config_path();
    if tokio::fs::try_exists(&path).await? {
        return Ok(path);
    }

    let rendered = {
        let stdin = io::stdin();
        let stdout = io::stdout();
        prompt_for_config(&mut stdin.lock(), &mut stdout.lock(), &path)?
    };

    if let Some(dir) = path.parent().filter(|dir| !dir.as_os_str().is_empty()) {
        tokio::fs::create_dir_all(dir).await?;
    }
    tokio::fs::write(&path, rendered).await?;
    println!("Wrote {}", path.display());

    Ok(path)
}

fn prompt_for_config(input: &mut impl BufRead, output: &mut impl Write, path: &Path) -> Result<String> {
    writeln!(output, "No configuration at {}.", path.display())?;
    writeln!(output, "Press Enter to keep the value in brackets.\n")?;

    let mut ask =
        |prompt: &str, default: &str| prompt_with_default(&mut *input, &mut *output, prompt, default);

    let url = ask("Station URL", "http://192.168.1.8:5000")?;
    let username = ask("Username", "admin")?;
    let password = ask(
        "Password (or file:/path, env:VAR)",
        "env:SURVEILLANCE_STATION_PASSWORD",
    )?;
    let timeout = ask("Request timeout (e.g., 10s, 1m)", "10s")?;
    let verify_ssl = ask("Verify SSL (true/false)", "true")?;

    Ok(render_config(&url, &username, &password, &timeout, &verify_ssl))
}

fn render_config(
    url: &str,
    username: &str,
    password: &str,
    timeout: &str,
    verify_ssl: &str,
) -> String {
    format!(
        r#"[station]
url = "{url}"
username = "{username}"
password = "{password}"
timeout = "{timeout}"
verify-ssl = {verify_ssl}

[logging]
filter = "info,reqwest=warn,hyper=warn"
"#
    )
}

fn prompt_with_default(
    input: &mut impl BufRead,
    output: &mut impl Write,
    prompt: &str,
    default: &str,
) -> Result<String> {
    write!(output, "{prompt} [{default}]: ")?;
    output.flush()?;

    let mut line = String::new();
    input.read_line(&mut line)?;

    Ok(match line.trim() {
        "" => default.to_string(),
        answer => answer.to_string(),
    })
}
