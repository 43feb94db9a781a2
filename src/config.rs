//! Site configuration module.
//!
//! Handles loading, validating, and overriding the build configuration. The
//! configuration is an explicit value: it is assembled once at process start
//! (stock defaults → `config.toml` in the source root → environment → CLI
//! flags) and then passed by reference into the loader and the orchestrator.
//! Nothing below `main` reads the environment.
//!
//! ## Configuration Options
//!
//! ```toml
//! # All options are optional - defaults shown below
//!
//! site_name = "quiet_logos"         # Used in fallback titles and the index
//! lang = "en"                       # <html lang> of generated pages
//! stylesheet = "../css/style.css"   # Stylesheet reference, relative to the output root
//! source_extension = "md"           # Entries are YYYY-MM-DD.<source_extension>
//!
//! [template]
//! path = "_template.html"           # Relative to the source root
//! strict = false                    # Template problems: warn (false) or fail (true)
//!
//! [commentary]
//! mode = "stub"                     # "stub" = local engine, "real" = try remote first
//! # regenerate = "all"              # "all" | "latest-only"; omit for auto
//!
//! [remote]
//! endpoint = "https://api.openai.com/v1"
//! model = "gpt-4.1-mini"
//! timeout_secs = 45
//! max_output_tokens = 700
//! ```
//!
//! ## Environment
//!
//! [`apply_env`] layers these variables on top of the file:
//!
//! | Variable | Effect |
//! |----------|--------|
//! | `QUIET_LOGOS_MODE` | `commentary.mode` |
//! | `QUIET_LOGOS_REGENERATE` | `commentary.regenerate` |
//! | `OPENAI_API_KEY` | remote credential (never read from or written to the file) |
//! | `OPENAI_BASE_URL` | `remote.endpoint` |
//! | `QUIET_LOGOS_MODEL` | `remote.model` |
//! | `QUIET_LOGOS_TIMEOUT_S` | `remote.timeout_secs` |
//! | `QUIET_LOGOS_MAX_OUTPUT_TOKENS` | `remote.max_output_tokens` |
//! | `CI`, `GITHUB_ACTIONS` | mark the build as unattended |
//!
//! Unknown keys in `config.toml` are rejected to catch typos early.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::fs;
use std::path::Path;
use std::str::FromStr;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("TOML parse error: {0}")]
    Toml(#[from] toml::de::Error),
    #[error("Config validation error: {0}")]
    Validation(String),
}

/// Site configuration loaded from `config.toml`.
///
/// All fields have working defaults: an empty or absent file yields a
/// complete `stub`-mode build with no network access.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct SiteConfig {
    /// Site name, used in fallback entry titles and the index heading.
    pub site_name: String,
    /// Language tag for generated pages.
    pub lang: String,
    /// Stylesheet reference as seen from pages in the output root.
    pub stylesheet: String,
    /// Extension of entry files, without the dot.
    pub source_extension: String,
    /// Page template settings.
    pub template: TemplateConfig,
    /// Commentary strategy and regeneration policy.
    pub commentary: CommentaryConfig,
    /// Remote generation provider settings.
    pub remote: RemoteConfig,
}

impl Default for SiteConfig {
    fn default() -> Self {
        Self {
            site_name: "quiet_logos".to_string(),
            lang: "en".to_string(),
            stylesheet: "../css/style.css".to_string(),
            source_extension: "md".to_string(),
            template: TemplateConfig::default(),
            commentary: CommentaryConfig::default(),
            remote: RemoteConfig::default(),
        }
    }
}

impl SiteConfig {
    /// Validate config values are within acceptable ranges.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.site_name.trim().is_empty() {
            return Err(ConfigError::Validation("site_name must not be empty".into()));
        }
        if self.source_extension.is_empty() || self.source_extension.contains('.') {
            return Err(ConfigError::Validation(
                "source_extension must be a bare extension like \"md\"".into(),
            ));
        }
        if self.template.path.trim().is_empty() {
            return Err(ConfigError::Validation(
                "template.path must not be empty".into(),
            ));
        }
        if !(1..=MAX_TIMEOUT_SECS).contains(&self.remote.timeout_secs) {
            return Err(ConfigError::Validation(format!(
                "remote.timeout_secs must be 1-{MAX_TIMEOUT_SECS}"
            )));
        }
        if self.remote.max_output_tokens == 0 {
            return Err(ConfigError::Validation(
                "remote.max_output_tokens must be positive".into(),
            ));
        }
        if !(self.remote.endpoint.starts_with("http://")
            || self.remote.endpoint.starts_with("https://"))
        {
            return Err(ConfigError::Validation(
                "remote.endpoint must be an http(s) URL".into(),
            ));
        }
        Ok(())
    }
}

/// Longest accepted remote timeout.
const MAX_TIMEOUT_SECS: u64 = 600;

/// Page template settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct TemplateConfig {
    /// Template location relative to the source root.
    pub path: String,
    /// Treat template problems (missing placeholders) as fatal.
    pub strict: bool,
}

impl Default for TemplateConfig {
    fn default() -> Self {
        Self {
            path: "_template.html".to_string(),
            strict: false,
        }
    }
}

/// Which provider produces commentary.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum Mode {
    /// Local engine only
    #[default]
    Stub,
    /// Try the remote provider first, fall back to the local engine
    Real,
}

impl FromStr for Mode {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "stub" => Ok(Mode::Stub),
            "real" => Ok(Mode::Real),
            other => Err(ConfigError::Validation(format!(
                "unknown commentary mode {other:?} (expected stub or real)"
            ))),
        }
    }
}

impl fmt::Display for Mode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Mode::Stub => "stub",
            Mode::Real => "real",
        })
    }
}

/// Which entries get fresh commentary in a build.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "kebab-case")]
pub enum RegenerationPolicy {
    /// Recompute commentary for every entry
    All,
    /// Recompute only the newest entry; reuse earlier artifacts
    LatestOnly,
}

impl FromStr for RegenerationPolicy {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "all" => Ok(RegenerationPolicy::All),
            "latest-only" | "latest_only" | "latest" => Ok(RegenerationPolicy::LatestOnly),
            other => Err(ConfigError::Validation(format!(
                "unknown regeneration policy {other:?} (expected all or latest-only)"
            ))),
        }
    }
}

impl fmt::Display for RegenerationPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            RegenerationPolicy::All => "all",
            RegenerationPolicy::LatestOnly => "latest-only",
        })
    }
}

/// Commentary strategy and regeneration policy.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct CommentaryConfig {
    pub mode: Mode,
    /// Explicit policy. When absent, the policy follows [`Self::unattended`].
    pub regenerate: Option<RegenerationPolicy>,
    /// Set from the environment when the build runs without a person at
    /// the keyboard (CI).
    #[serde(skip)]
    pub unattended: bool,
}

impl CommentaryConfig {
    /// The policy in force: the explicit one, else `latest-only` for
    /// unattended builds and `all` otherwise.
    pub fn effective_policy(&self) -> RegenerationPolicy {
        self.regenerate.unwrap_or(if self.unattended {
            RegenerationPolicy::LatestOnly
        } else {
            RegenerationPolicy::All
        })
    }
}

/// Remote generation provider settings.
#[derive(Clone, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct RemoteConfig {
    /// API base URL; requests go to `{endpoint}/responses`.
    pub endpoint: String,
    pub model: String,
    /// Per-request timeout.
    pub timeout_secs: u64,
    /// Cap on the size of the generated reply.
    pub max_output_tokens: u32,
    /// Bearer credential. Environment only.
    #[serde(skip)]
    pub api_key: Option<String>,
}

impl Default for RemoteConfig {
    fn default() -> Self {
        Self {
            endpoint: "https://api.openai.com/v1".to_string(),
            model: "gpt-4.1-mini".to_string(),
            timeout_secs: 45,
            max_output_tokens: 700,
            api_key: None,
        }
    }
}

impl RemoteConfig {
    pub fn is_configured(&self) -> bool {
        self.api_key.as_deref().is_some_and(|k| !k.trim().is_empty())
    }
}

impl fmt::Debug for RemoteConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RemoteConfig")
            .field("endpoint", &self.endpoint)
            .field("model", &self.model)
            .field("timeout_secs", &self.timeout_secs)
            .field("max_output_tokens", &self.max_output_tokens)
            .field("api_key", &self.api_key.as_ref().map(|_| "<redacted>"))
            .finish()
    }
}

// =============================================================================
// Config loading, merging, and validation
// =============================================================================

/// Returns the stock default config as a `toml::Value::Table`.
///
/// This is the canonical representation of all default values, used as the
/// base layer for merging user overrides on top.
pub fn stock_defaults_value() -> toml::Value {
    toml::Value::try_from(SiteConfig::default()).expect("default config must serialize")
}

/// Recursively merge `overlay` on top of `base`.
///
/// Tables merge key-by-key; any other overlay value replaces the base value.
pub fn merge_toml(base: toml::Value, overlay: toml::Value) -> toml::Value {
    match (base, overlay) {
        (toml::Value::Table(mut base_table), toml::Value::Table(overlay_table)) => {
            for (key, overlay_val) in overlay_table {
                let merged = match base_table.remove(&key) {
                    Some(base_val) => merge_toml(base_val, overlay_val),
                    None => overlay_val,
                };
                base_table.insert(key, merged);
            }
            toml::Value::Table(base_table)
        }
        (_, overlay) => overlay,
    }
}

/// Load `config.toml` from a directory as a raw TOML value.
///
/// Returns `Ok(None)` if the directory has no `config.toml` (or doesn't
/// exist at all; a missing source root is reported by the loader).
pub fn load_raw_config(dir: &Path) -> Result<Option<toml::Value>, ConfigError> {
    let config_path = dir.join("config.toml");
    if !config_path.is_file() {
        return Ok(None);
    }
    let content = fs::read_to_string(&config_path)?;
    let value: toml::Value = toml::from_str(&content)?;
    Ok(Some(value))
}

/// Merge an optional overlay onto a base value, then deserialize and validate.
pub fn resolve_config(
    base: toml::Value,
    overlay: Option<toml::Value>,
) -> Result<SiteConfig, ConfigError> {
    let merged = match overlay {
        Some(ov) => merge_toml(base, ov),
        None => base,
    };
    let config: SiteConfig = merged.try_into()?;
    config.validate()?;
    Ok(config)
}

/// Load config from `config.toml` in the source root.
///
/// Merges user values on top of stock defaults, rejects unknown keys,
/// and validates the result.
pub fn load_config(root: &Path) -> Result<SiteConfig, ConfigError> {
    resolve_config(stock_defaults_value(), load_raw_config(root)?)
}

/// Layer environment variables on top of `config`.
///
/// `lookup` is the variable source (`|k| std::env::var(k).ok()` in the
/// binary, a map in tests). Blank values count as unset.
pub fn apply_env<F>(config: &mut SiteConfig, lookup: F) -> Result<(), ConfigError>
where
    F: Fn(&str) -> Option<String>,
{
    let var = |name: &str| {
        lookup(name)
            .map(|v| v.trim().to_string())
            .filter(|v| !v.is_empty())
    };

    if let Some(mode) = var("QUIET_LOGOS_MODE") {
        config.commentary.mode = mode.parse()?;
    }
    if let Some(policy) = var("QUIET_LOGOS_REGENERATE") {
        config.commentary.regenerate = Some(policy.parse()?);
    }
    if let Some(key) = var("OPENAI_API_KEY") {
        config.remote.api_key = Some(key);
    }
    if let Some(endpoint) = var("OPENAI_BASE_URL") {
        config.remote.endpoint = endpoint.trim_end_matches('/').to_string();
    }
    if let Some(model) = var("QUIET_LOGOS_MODEL") {
        config.remote.model = model;
    }
    if let Some(timeout) = var("QUIET_LOGOS_TIMEOUT_S") {
        config.remote.timeout_secs = parse_number("QUIET_LOGOS_TIMEOUT_S", &timeout)?;
    }
    if let Some(tokens) = var("QUIET_LOGOS_MAX_OUTPUT_TOKENS") {
        config.remote.max_output_tokens = parse_number("QUIET_LOGOS_MAX_OUTPUT_TOKENS", &tokens)?;
    }

    let flag = |name: &str| var(name).is_some_and(|v| v != "0" && !v.eq_ignore_ascii_case("false"));
    config.commentary.unattended = flag("CI") || flag("GITHUB_ACTIONS");

    config.validate()
}

fn parse_number<T: FromStr>(name: &str, value: &str) -> Result<T, ConfigError> {
    value
        .parse()
        .map_err(|_| ConfigError::Validation(format!("{name} must be a number, got {value:?}")))
}

/// Returns a fully-commented stock `config.toml` with all keys and explanations.
///
/// Used by the `gen-config` CLI command.
pub fn stock_config_toml() -> &'static str {
    r##"# quiet-logos Configuration
# =========================
# All settings are optional. Remove or comment out any you don't need.
# Values shown below are the defaults.
#
# Place this file in the source root, next to the YYYY-MM-DD.md entries.
# Unknown keys will cause an error.

# Site name, used in fallback entry titles ("<site_name> — <date>")
# and in the index heading.
site_name = "quiet_logos"

# Language tag of generated pages.
lang = "en"

# Stylesheet reference as seen from pages in the output root.
stylesheet = "../css/style.css"

# Entries are files named YYYY-MM-DD.<source_extension>.
source_extension = "md"

# ---------------------------------------------------------------------------
# Page template
# ---------------------------------------------------------------------------
[template]
# Template file, relative to the source root. Must contain the placeholders
# {{ title }}, {{ css }}, {{ content }} and <!-- commentary -->.
path = "_template.html"

# false: missing placeholders are reported as warnings.
# true:  missing placeholders abort the build.
strict = false

# ---------------------------------------------------------------------------
# Commentary
# ---------------------------------------------------------------------------
[commentary]
# "stub": local text-analysis engine only.
# "real": try the remote provider first (needs OPENAI_API_KEY), falling back
#         to the local engine on any failure.
mode = "stub"

# Which entries get fresh commentary:
#   "all"         every entry, every build
#   "latest-only" only the newest entry; others reuse earlier artifacts
# Omit to choose automatically: latest-only under CI, all otherwise.
# regenerate = "all"

# ---------------------------------------------------------------------------
# Remote provider (used only in "real" mode)
# ---------------------------------------------------------------------------
[remote]
endpoint = "https://api.openai.com/v1"
model = "gpt-4.1-mini"

# Single attempt per entry; on timeout the local engine is used.
timeout_secs = 45

# Upper bound on the size of the generated reply.
max_output_tokens = 700
"##
}
