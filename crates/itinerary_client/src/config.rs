use std::{fmt, fs, io, path::Path, str::FromStr, time::Duration};

use anyhow::{anyhow, bail, Context, Result};
use serde::Deserialize;
use shared::protocol::GENERATE_ITINERARY_PATH;
use tracing::warn;
use url::Url;

pub const DEFAULT_SETTINGS_FILE: &str = "planner.toml";
pub const DEFAULT_ENDPOINT_BASE_URL: &str = "http://127.0.0.1:8000";

/// What `submit` does while another submission is still pending.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OverlapPolicy {
    #[default]
    Reject,
    Supersede,
}

impl FromStr for OverlapPolicy {
    type Err = anyhow::Error;

    fn from_str(raw: &str) -> Result<Self> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "reject" => Ok(OverlapPolicy::Reject),
            "supersede" => Ok(OverlapPolicy::Supersede),
            other => Err(anyhow!(
                "unknown overlap policy '{other}' (expected 'reject' or 'supersede')"
            )),
        }
    }
}

impl fmt::Display for OverlapPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            OverlapPolicy::Reject => f.write_str("reject"),
            OverlapPolicy::Supersede => f.write_str("supersede"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Settings {
    pub endpoint_base_url: String,
    pub request_timeout_secs: Option<u64>,
    pub overlap_policy: OverlapPolicy,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            endpoint_base_url: DEFAULT_ENDPOINT_BASE_URL.into(),
            request_timeout_secs: None,
            overlap_policy: OverlapPolicy::default(),
        }
    }
}

#[derive(Debug, Default, Deserialize)]
struct FileSettings {
    endpoint_url: Option<String>,
    request_timeout_secs: Option<u64>,
    overlap_policy: Option<OverlapPolicy>,
}

impl Settings {
    /// Full URL of the generation endpoint.
    ///
    /// The base may be a bare origin, a path prefix, or already end in
    /// `/generate-itinerary`.
    pub fn endpoint_url(&self) -> Result<Url> {
        let raw = self.endpoint_base_url.trim();
        let mut url = Url::parse(raw)
            .with_context(|| format!("invalid itinerary endpoint url '{raw}'"))?;

        if url.cannot_be_a_base() || !matches!(url.scheme(), "http" | "https") {
            bail!("itinerary endpoint url '{raw}' must be an http(s) url");
        }

        if url
            .path()
            .trim_end_matches('/')
            .ends_with(&format!("/{GENERATE_ITINERARY_PATH}"))
        {
            return Ok(url);
        }

        if !url.path().ends_with('/') {
            let path = format!("{}/", url.path());
            url.set_path(&path);
        }

        url.join(GENERATE_ITINERARY_PATH)
            .with_context(|| format!("failed to build itinerary endpoint from '{raw}'"))
    }

    /// `None` (or zero) means the request may wait forever.
    pub fn request_timeout(&self) -> Option<Duration> {
        self.request_timeout_secs
            .filter(|secs| *secs > 0)
            .map(Duration::from_secs)
    }
}

/// Defaults, then the settings file, then environment overrides.
///
/// An explicit `path` must exist; the default `planner.toml` is optional.
pub fn load_settings(path: Option<&Path>) -> Result<Settings> {
    let mut settings = Settings::default();

    let (path, required) = match path {
        Some(path) => (path, true),
        None => (Path::new(DEFAULT_SETTINGS_FILE), false),
    };

    match fs::read_to_string(path) {
        Ok(raw) => {
            apply_file_settings(&mut settings, &raw)
                .with_context(|| format!("failed to parse settings file '{}'", path.display()))?;
        }
        Err(err) if err.kind() == io::ErrorKind::NotFound && !required => {}
        Err(err) => {
            return Err(err)
                .with_context(|| format!("failed to read settings file '{}'", path.display()));
        }
    }

    apply_env_overrides(&mut settings, |key| std::env::var(key).ok());

    Ok(settings)
}

fn apply_file_settings(settings: &mut Settings, raw: &str) -> Result<()> {
    let file_cfg: FileSettings = toml::from_str(raw)?;

    if let Some(v) = file_cfg.endpoint_url {
        settings.endpoint_base_url = v;
    }
    if let Some(v) = file_cfg.request_timeout_secs {
        settings.request_timeout_secs = Some(v);
    }
    if let Some(v) = file_cfg.overlap_policy {
        settings.overlap_policy = v;
    }

    Ok(())
}

fn apply_env_overrides(settings: &mut Settings, var: impl Fn(&str) -> Option<String>) {
    if let Some(v) = var("ITINERARY_ENDPOINT") {
        settings.endpoint_base_url = v;
    }
    if let Some(v) = var("APP__ENDPOINT_URL") {
        settings.endpoint_base_url = v;
    }

    if let Some(v) = var("APP__REQUEST_TIMEOUT_SECS") {
        match v.trim().parse::<u64>() {
            Ok(parsed) => settings.request_timeout_secs = Some(parsed),
            Err(_) => warn!(value = %v, "ignoring unparsable APP__REQUEST_TIMEOUT_SECS"),
        }
    }

    if let Some(v) = var("APP__OVERLAP_POLICY") {
        match v.parse::<OverlapPolicy>() {
            Ok(parsed) => settings.overlap_policy = parsed,
            Err(err) => warn!(error = %err, "ignoring APP__OVERLAP_POLICY"),
        }
    }
}

#[cfg(test)]
#[path = "tests/config_tests.rs"]
mod tests;
