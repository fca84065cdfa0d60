use std::{fs, path::Path, time::Duration};

use anyhow::Context;
use serde::Deserialize;
use url::Url;

use crate::error::ClientError;

pub const DEFAULT_CONFIG_FILE: &str = "binet-admin.toml";

#[derive(Debug, Clone, PartialEq)]
pub struct Settings {
    pub api_base_url: String,
    pub request_timeout_ms: u64,
    pub default_page_size: usize,
    pub email_send_pause_ms: u64,
    pub email_simulation_fallback: bool,
    pub email_sender: String,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            api_base_url: "http://localhost:8080".into(),
            request_timeout_ms: 10_000,
            default_page_size: 10,
            email_send_pause_ms: 100,
            email_simulation_fallback: true,
            email_sender: "binet.maroc@gmail.com".into(),
        }
    }
}

impl Settings {
    pub fn request_timeout(&self) -> Duration {
        Duration::from_millis(self.request_timeout_ms)
    }

    pub fn email_send_pause(&self) -> Duration {
        Duration::from_millis(self.email_send_pause_ms)
    }

    pub fn base_url(&self) -> Result<Url, ClientError> {
        let url = Url::parse(self.api_base_url.trim())
            .map_err(|_| ClientError::InvalidBaseUrl(self.api_base_url.clone()))?;
        if !matches!(url.scheme(), "http" | "https") || url.cannot_be_a_base() {
            return Err(ClientError::InvalidBaseUrl(self.api_base_url.clone()));
        }
        Ok(url)
    }
}

#[derive(Debug, Default, Deserialize)]
struct FileSettings {
    api_base_url: Option<String>,
    request_timeout_ms: Option<u64>,
    default_page_size: Option<usize>,
    email_send_pause_ms: Option<u64>,
    email_simulation_fallback: Option<bool>,
    email_sender: Option<String>,
}

/// Defaults, then the TOML file, then environment overrides.
///
/// An explicitly requested file must exist; the default file is optional.
pub fn load_settings(path: Option<&Path>) -> anyhow::Result<Settings> {
    let mut settings = Settings::default();

    let (path, required) = match path {
        Some(path) => (path, true),
        None => (Path::new(DEFAULT_CONFIG_FILE), false),
    };

    match fs::read_to_string(path) {
        Ok(raw) => {
            let file_cfg: FileSettings = toml::from_str(&raw)
                .with_context(|| format!("failed to parse config file '{}'", path.display()))?;
            apply_file_settings(&mut settings, file_cfg);
        }
        Err(err) if required => {
            return Err(err)
                .with_context(|| format!("failed to read config file '{}'", path.display()));
        }
        Err(_) => {}
    }

    apply_env_overrides(&mut settings, |key| std::env::var(key).ok());
    Ok(settings)
}

fn apply_file_settings(settings: &mut Settings, file_cfg: FileSettings) {
    if let Some(v) = file_cfg.api_base_url {
        settings.api_base_url = v;
    }
    if let Some(v) = file_cfg.request_timeout_ms {
        settings.request_timeout_ms = v;
    }
    if let Some(v) = file_cfg.default_page_size {
        settings.default_page_size = v;
    }
    if let Some(v) = file_cfg.email_send_pause_ms {
        settings.email_send_pause_ms = v;
    }
    if let Some(v) = file_cfg.email_simulation_fallback {
        settings.email_simulation_fallback = v;
    }
    if let Some(v) = file_cfg.email_sender {
        settings.email_sender = v;
    }
}

/// Plain names first, `APP__` names win when both are set.
pub(crate) fn apply_env_overrides(settings: &mut Settings, lookup: impl Fn(&str) -> Option<String>) {
    let get = |plain: &str, prefixed: &str| lookup(prefixed).or_else(|| lookup(plain));

    if let Some(v) = get("BINET_API_BASE_URL", "APP__API_BASE_URL") {
        settings.api_base_url = v;
    }
    if let Some(v) = get("BINET_REQUEST_TIMEOUT_MS", "APP__REQUEST_TIMEOUT_MS") {
        if let Ok(parsed) = v.parse::<u64>() {
            settings.request_timeout_ms = parsed;
        }
    }
    if let Some(v) = get("BINET_DEFAULT_PAGE_SIZE", "APP__DEFAULT_PAGE_SIZE") {
        if let Ok(parsed) = v.parse::<usize>() {
            settings.default_page_size = parsed;
        }
    }
    if let Some(v) = get("BINET_EMAIL_SEND_PAUSE_MS", "APP__EMAIL_SEND_PAUSE_MS") {
        if let Ok(parsed) = v.parse::<u64>() {
            settings.email_send_pause_ms = parsed;
        }
    }
    if let Some(v) = get(
        "BINET_EMAIL_SIMULATION_FALLBACK",
        "APP__EMAIL_SIMULATION_FALLBACK",
    ) {
        if let Ok(parsed) = v.parse::<bool>() {
            settings.email_simulation_fallback = parsed;
        }
    }
    if let Some(v) = get("BINET_EMAIL_SENDER", "APP__EMAIL_SENDER") {
        settings.email_sender = v;
    }
}
