use color_eyre::{eyre::eyre, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::time::Duration;

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
  pub api: ApiConfig,
  /// Custom title for header (defaults to the API host if not set)
  pub title: Option<String>,
  /// Panel opened on start, e.g. "tags" or "workflows"
  pub default_panel: Option<String>,
  #[serde(default)]
  pub log: LogConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ApiConfig {
  /// Base url of the CRM API, e.g. "https://crm.example.com/api"
  pub url: String,
  /// Account used to sign in when no token is set
  pub email: Option<String>,
  /// Request timeout in seconds
  pub timeout_secs: Option<u64>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct LogConfig {
  /// Filter directive, e.g. "info" or "crmdeck=debug". RUST_LOG wins.
  pub level: Option<String>,
}

/// How the session is obtained at startup.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Auth {
  Token(String),
  Login { email: String, password: String },
}

impl Config {
  /// Load configuration from file.
  ///
  /// Search order:
  /// 1. Explicit path if provided
  /// 2. ./crmdeck.yaml (current directory)
  /// 3. $XDG_CONFIG_HOME/crmdeck/config.yaml
  pub fn load(explicit_path: Option<&Path>) -> Result<Self> {
    let path = if let Some(p) = explicit_path {
      if p.exists() {
        Some(p.to_path_buf())
      } else {
        return Err(eyre!("Config file not found: {}", p.display()));
      }
    } else {
      Self::find_config_file()
    };

    match path {
      Some(p) => Self::load_from_path(&p),
      None => Err(eyre!(
        "No configuration file found. Create one at ~/.config/crmdeck/config.yaml\n\
                 with at least:\n\n  api:\n    url: https://crm.example.com/api"
      )),
    }
  }

  fn find_config_file() -> Option<PathBuf> {
    let local = PathBuf::from("crmdeck.yaml");
    if local.exists() {
      return Some(local);
    }

    if let Some(config_dir) = dirs::config_dir() {
      let xdg_path = config_dir.join("crmdeck").join("config.yaml");
      if xdg_path.exists() {
        return Some(xdg_path);
      }
    }

    None
  }

  fn load_from_path(path: &Path) -> Result<Self> {
    let contents = std::fs::read_to_string(path)
      .map_err(|e| eyre!("Failed to read config file {}: {}", path.display(), e))?;

    let config: Config = serde_yaml::from_str(&contents)
      .map_err(|e| eyre!("Failed to parse config file {}: {}", path.display(), e))?;

    if config.api.url.trim().is_empty() {
      return Err(eyre!("api.url is empty in {}", path.display()));
    }
    Ok(config)
  }

  pub fn timeout(&self) -> Option<Duration> {
    self.api.timeout_secs.map(Duration::from_secs)
  }

  /// Header title: the configured one, else the API host.
  pub fn header_title(&self) -> String {
    self.title.clone().unwrap_or_else(|| {
      url::Url::parse(&self.api.url)
        .ok()
        .and_then(|u| u.host_str().map(String::from))
        .unwrap_or_else(|| self.api.url.clone())
    })
  }

  /// Token from the environment, else email + password sign-in.
  pub fn auth(&self) -> Result<Auth> {
    self.auth_from(|name| std::env::var(name).ok())
  }

  fn auth_from(&self, env: impl Fn(&str) -> Option<String>) -> Result<Auth> {
    let non_empty = |name: &str| env(name).filter(|v| !v.trim().is_empty());

    if let Some(token) = non_empty("CRMDECK_TOKEN").or_else(|| non_empty("CRM_API_TOKEN")) {
      return Ok(Auth::Token(token));
    }
    match (&self.api.email, non_empty("CRMDECK_PASSWORD")) {
      (Some(email), Some(password)) => Ok(Auth::Login {
        email: email.clone(),
        password,
      }),
      (Some(_), None) => Err(eyre!(
        "Password not found. Set CRMDECK_PASSWORD or provide a token via CRMDECK_TOKEN."
      )),
      (None, _) => Err(eyre!(
        "API token not found. Set CRMDECK_TOKEN or CRM_API_TOKEN environment variable."
      )),
    }
  }
}

/// Directory for log files: $XDG_DATA_HOME/crmdeck, falling back to the temp dir.
pub fn data_dir() -> PathBuf {
  dirs::data_dir()
    .unwrap_or_else(std::env::temp_dir)
    .join("crmdeck")
}
