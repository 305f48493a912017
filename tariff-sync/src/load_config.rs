/// `load_config` module: turns environment variables and an optional YAML catalog into [`Settings`].
///
/// This module is the only place where the environment and user-supplied YAML are read.
///
/// # Responsibilities
/// - Pick the built-in regime (`eu` → TARIC, `us` → Wove) and apply catalog overrides
/// - Check required credentials up front and name every missing variable at once
/// - Read the `RESET_EXISTING` / `DRY_RUN` switches with their historical semantics:
///   clearing stays on unless `RESET_EXISTING=false`, dry mode needs `DRY_RUN=true`
///
/// # Errors
/// Missing or malformed values surface as [`ConfigError`] wrapped in `anyhow::Error`, at the CLI boundary.
use anyhow::{Context, Result};
use clap::ValueEnum;
use serde::Deserialize;
use std::collections::HashSet;
use std::env;
use std::fs;
use std::path::Path;
use std::time::Duration;
use tariff_sync_core::config::{RegimeConfig, DEFAULT_HTTP_TIMEOUT};
use tariff_sync_core::error::ConfigError;
use tariff_sync_core::model::{MaterialCode, SourceTag};
use tariff_sync_core::taric::DEFAULT_TARIC_ENDPOINT;
use tariff_sync_core::wove::{WoveCredentials, DEFAULT_WOVE_BASE_URL};
use tracing::{error, info};

pub const SUPABASE_URL: &str = "SUPABASE_URL";
pub const SUPABASE_KEY: &str = "SUPABASE_KEY";
pub const WOVE_CLIENT_ID: &str = "WOVE_CLIENT_ID";
pub const WOVE_CLIENT_SECRET: &str = "WOVE_CLIENT_SECRET";

/// Destination regime selectable on the command line.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum RegimeKind {
    /// EU imports, TARIC measures
    Eu,
    /// US imports, Wove lookups
    Us,
}

impl RegimeKind {
    pub fn builtin(&self) -> RegimeConfig {
        match self {
            RegimeKind::Eu => RegimeConfig::eu_taric(),
            RegimeKind::Us => RegimeConfig::us_wove(),
        }
    }
}

/// Row store connection.
#[derive(Clone)]
pub struct StoreSettings {
    pub url: String,
    pub key: String,
}

impl std::fmt::Debug for StoreSettings {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StoreSettings")
            .field("url", &self.url)
            .field("key", &"***")
            .finish()
    }
}

/// Everything a subcommand needs, fully resolved.
#[derive(Debug, Clone)]
pub struct Settings {
    pub regime: RegimeConfig,
    pub reset_existing: bool,
    pub dry_run: bool,
    pub http_timeout: Duration,
    pub taric_endpoint: String,
    pub wove_base_url: String,
    pub store: Option<StoreSettings>,
    pub wove: Option<WoveCredentials>,
}

/// Overrides for a built-in regime, read from YAML.
#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct CatalogFile {
    #[serde(default)]
    pub countries: Option<Vec<String>>,
    #[serde(default)]
    pub materials: Option<Vec<MaterialCode>>,
    #[serde(default)]
    pub pacing_ms: Option<u64>,
}

/// Loads a YAML catalog and applies it over `kind`'s built-in regime.
pub fn load_catalog<P: AsRef<Path>>(kind: RegimeKind, path: P) -> Result<RegimeConfig> {
    let path_ref = path.as_ref();
    info!(catalog_path = ?path_ref, "Loading catalog from file");

    let content = match fs::read_to_string(path_ref) {
        Ok(content) => content,
        Err(e) => {
            error!(error = ?e, catalog_path = ?path_ref, "Failed to read catalog file");
            return Err(anyhow::anyhow!(
                "Failed to read catalog file {:?}: {}",
                path_ref,
                e
            ));
        }
    };

    let catalog: CatalogFile = match serde_yaml::from_str(&content) {
        Ok(catalog) => catalog,
        Err(e) => {
            error!(error = ?e, catalog_path = ?path_ref, "Failed to parse catalog YAML");
            return Err(anyhow::anyhow!("Failed to parse catalog YAML: {e}"));
        }
    };

    let regime = apply_catalog(kind.builtin(), catalog)?;
    regime.trace_loaded();
    Ok(regime)
}

fn apply_catalog(mut regime: RegimeConfig, catalog: CatalogFile) -> Result<RegimeConfig, ConfigError> {
    if let Some(countries) = catalog.countries {
        regime.countries = countries.into_iter().map(|c| c.trim().to_uppercase()).collect();
    }
    if let Some(materials) = catalog.materials {
        let mut names = HashSet::new();
        for m in &materials {
            if m.tariff_code.trim().is_empty() {
                return Err(ConfigError::Catalog(format!("material {} has no code", m.name)));
            }
            if !names.insert(m.name.as_str()) {
                return Err(ConfigError::Catalog(format!("duplicate material {}", m.name)));
            }
        }
        regime.materials = materials;
    }
    if let Some(ms) = catalog.pacing_ms {
        regime.pacing = Duration::from_millis(ms);
    }
    Ok(regime)
}

fn present(name: &str) -> Option<String> {
    env::var(name).ok().filter(|v| !v.is_empty())
}

/// Fails with every missing name when any of `names` is unset or empty.
pub fn require_env(names: &[&str]) -> Result<(), ConfigError> {
    let missing: Vec<String> = names
        .iter()
        .filter(|n| present(n).is_none())
        .map(|n| n.to_string())
        .collect();
    if missing.is_empty() {
        Ok(())
    } else {
        Err(ConfigError::MissingEnv(missing))
    }
}

/// `RESET_EXISTING`: on unless exactly `false`.
pub fn reset_existing_from_env() -> bool {
    env::var("RESET_EXISTING").map_or(true, |v| v != "false")
}

/// `DRY_RUN`: off unless exactly `true`.
pub fn dry_run_from_env() -> bool {
    env::var("DRY_RUN").is_ok_and(|v| v == "true")
}

fn http_timeout_from_env() -> Result<Duration, ConfigError> {
    match present("HTTP_TIMEOUT_SECS") {
        None => Ok(DEFAULT_HTTP_TIMEOUT),
        Some(raw) => match raw.parse::<u64>() {
            Ok(secs) if secs > 0 => Ok(Duration::from_secs(secs)),
            _ => Err(ConfigError::Invalid {
                key: "HTTP_TIMEOUT_SECS".into(),
                value: raw,
            }),
        },
    }
}

/// Resolves settings for `kind`. `needs_store` adds the row store credentials to the
/// required set; a Wove-sourced regime always requires the Wove credentials.
pub fn load_settings(
    kind: RegimeKind,
    catalog: Option<&Path>,
    needs_store: bool,
) -> Result<Settings> {
    let regime = match catalog {
        Some(path) => load_catalog(kind, path)?,
        None => kind.builtin(),
    };

    let mut required = Vec::new();
    if needs_store {
        required.extend([SUPABASE_URL, SUPABASE_KEY]);
    }
    if regime.source == SourceTag::Wove {
        required.extend([WOVE_CLIENT_ID, WOVE_CLIENT_SECRET]);
    }
    if let Err(e) = require_env(&required) {
        error!(error = %e, "Configuration precondition failed");
        return Err(e.into());
    }

    // Presence was checked above.
    let store = needs_store.then(|| StoreSettings {
        url: present(SUPABASE_URL).unwrap_or_default(),
        key: present(SUPABASE_KEY).unwrap_or_default(),
    });
    let wove = (regime.source == SourceTag::Wove).then(|| WoveCredentials {
        client_id: present(WOVE_CLIENT_ID).unwrap_or_default(),
        client_secret: present(WOVE_CLIENT_SECRET).unwrap_or_default(),
    });

    let settings = Settings {
        regime,
        reset_existing: reset_existing_from_env(),
        dry_run: dry_run_from_env(),
        http_timeout: http_timeout_from_env().context("reading HTTP timeout")?,
        taric_endpoint: present("TARIC_ENDPOINT")
            .unwrap_or_else(|| DEFAULT_TARIC_ENDPOINT.to_string()),
        wove_base_url: present("WOVE_BASE_URL")
            .unwrap_or_else(|| DEFAULT_WOVE_BASE_URL.to_string()),
        store,
        wove,
    };

    info!(
        destination = %settings.regime.destination,
        source = %settings.regime.source,
        reset_existing = settings.reset_existing,
        dry_run = settings.dry_run,
        timeout_secs = settings.http_timeout.as_secs(),
        "Settings loaded"
    );
    Ok(settings)
}
