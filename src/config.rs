use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::error::ChatError;
use crate::render::RenderStyle;

// ── Model aliases ─────────────────────────────────────────────────────────────

pub const DEFAULT_MODEL_ALIAS: &str = "GPT3.5";

const BUILTIN_MODELS: &[(&str, &str)] = &[
    ("GPT3.5", "gpt-3.5-turbo"),
    ("GPT4", "gpt-4"),
    ("GPT4o", "gpt-4o"),
];

// ── Profile ───────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Profile {
    /// OpenAI-compatible endpoint URL
    #[serde(default = "default_endpoint")]
    pub endpoint: String,
    /// Model alias, looked up in the built-in table and `[models]`
    #[serde(default = "default_model_alias")]
    pub model: String,
    /// Optional API key (sent as Bearer token)
    pub api_key: Option<String>,
    /// Render style: dark, light or ascii
    #[serde(default)]
    pub style: Option<String>,
    /// Print replies verbatim, no Markdown styling
    #[serde(default)]
    pub plain: bool,
    /// Seconds to wait for a reply before giving up on the turn
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

fn default_endpoint() -> String {
    "https://api.openai.com".to_string()
}

fn default_model_alias() -> String {
    DEFAULT_MODEL_ALIAS.to_string()
}

fn default_timeout_secs() -> u64 {
    60
}

impl Default for Profile {
    fn default() -> Self {
        Self {
            endpoint: default_endpoint(),
            model: default_model_alias(),
            api_key: None,
            style: None,
            plain: false,
            timeout_secs: default_timeout_secs(),
        }
    }
}

// ── Config file ───────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct ConfigFile {
    /// Which profile to use when none is specified
    #[serde(default = "default_profile_name")]
    pub default_profile: String,

    #[serde(default)]
    pub profiles: HashMap<String, Profile>,

    /// Extra model aliases: alias → provider model id
    #[serde(default)]
    pub models: HashMap<String, String>,
}

fn default_profile_name() -> String {
    "default".to_string()
}

impl ConfigFile {
    /// Load from disk, or return a default config if the file doesn't exist yet.
    pub fn load() -> Result<Self> {
        Self::load_from(&config_path())
    }

    pub fn load_from(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }
        let raw = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file at {}", path.display()))?;
        toml::from_str(&raw)
            .with_context(|| format!("Failed to parse config file at {}", path.display()))
    }

    /// Write a starter config file to disk (only if it doesn't exist).
    pub fn write_default_if_missing() -> Result<PathBuf> {
        let path = config_path();
        write_default_to(&path)?;
        Ok(path)
    }

    /// Resolve the active profile given an optional override name.
    pub fn resolve_profile(&self, name: Option<&str>) -> Option<&Profile> {
        let key = name.unwrap_or(&self.default_profile);
        self.profiles.get(key)
    }

    /// Provider model id for an alias. File aliases shadow built-ins.
    pub fn model_for_alias(&self, alias: &str) -> Option<String> {
        self.models.get(alias).cloned().or_else(|| {
            BUILTIN_MODELS
                .iter()
                .find(|(a, _)| *a == alias)
                .map(|(_, id)| id.to_string())
        })
    }

    fn known_aliases(&self) -> String {
        let mut aliases: Vec<&str> = BUILTIN_MODELS.iter().map(|(a, _)| *a).collect();
        aliases.extend(self.models.keys().map(String::as_str));
        aliases.sort_unstable();
        aliases.dedup();
        aliases.join(", ")
    }
}

fn write_default_to(path: &Path) -> Result<()> {
    if path.exists() {
        return Ok(());
    }
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }
    fs::write(path, DEFAULT_CONFIG_TOML)?;
    Ok(())
}

// ── Overrides from the command line / environment ─────────────────────────────

#[derive(Debug, Default, Clone)]
pub struct Overrides<'a> {
    pub profile: Option<&'a str>,
    pub endpoint: Option<&'a str>,
    pub model: Option<&'a str>,
    pub api_key: Option<&'a str>,
    pub style: Option<&'a str>,
    pub plain: bool,
    pub timeout_secs: Option<u64>,
}

// ── Session config (after merging file + overrides) ───────────────────────────

/// Everything a chat session needs, fixed for the life of the process.
#[derive(Debug, Clone)]
pub struct SessionConfig {
    pub endpoint: String,
    /// Alias as the user typed it (for display)
    pub model_alias: String,
    /// Provider model id sent on the wire
    pub model: String,
    pub api_key: String,
    pub style: RenderStyle,
    pub plain: bool,
    pub timeout: Duration,
    /// Profile name that was resolved (for display)
    pub profile_name: String,
    /// Draw the waiting spinner (stderr is a terminal)
    pub show_progress: bool,
}

impl SessionConfig {
    /// Merge config file profile with overrides.
    /// Priority: CLI args > env vars (handled by clap) > config file profile > built-in defaults
    pub fn resolve(file: &ConfigFile, overrides: &Overrides<'_>) -> Result<Self, ChatError> {
        let profile_name = overrides
            .profile
            .unwrap_or(&file.default_profile)
            .to_string();

        let base = file
            .resolve_profile(overrides.profile)
            .cloned()
            .unwrap_or_default();

        let api_key = overrides
            .api_key
            .map(str::to_string)
            .or(base.api_key)
            .filter(|k| !k.trim().is_empty())
            .ok_or(ChatError::MissingApiKey)?;

        let model_alias = overrides
            .model
            .map(str::to_string)
            .unwrap_or(base.model);
        let model = file
            .model_for_alias(&model_alias)
            .ok_or_else(|| ChatError::UnsupportedModel(model_alias.clone(), file.known_aliases()))?;

        let style = match overrides.style.map(str::to_string).or(base.style) {
            Some(name) => name.parse()?,
            None => RenderStyle::default(),
        };

        let timeout_secs = overrides.timeout_secs.unwrap_or(base.timeout_secs);

        let resolved = Self {
            endpoint: overrides
                .endpoint
                .map(str::to_string)
                .unwrap_or(base.endpoint),
            model_alias,
            model,
            api_key,
            style,
            plain: overrides.plain || base.plain,
            timeout: Duration::from_secs(timeout_secs),
            profile_name,
            show_progress: true,
        };
        tracing::debug!(
            profile = %resolved.profile_name,
            model = %resolved.model,
            style = %resolved.style,
            timeout_secs,
            "resolved session config"
        );
        Ok(resolved)
    }
}

// ── Paths ─────────────────────────────────────────────────────────────────────

pub fn config_path() -> PathBuf {
    dirs_config_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("chatcli")
        .join("config.toml")
}

fn dirs_config_dir() -> Option<PathBuf> {
    // XDG_CONFIG_HOME or ~/.config on Linux/macOS
    std::env::var("XDG_CONFIG_HOME")
        .ok()
        .map(PathBuf::from)
        .or_else(|| {
            std::env::var("HOME")
                .ok()
                .map(|h| PathBuf::from(h).join(".config"))
        })
}

// ── Default config template written by --init ─────────────────────────────────

const DEFAULT_CONFIG_TOML: &str = r#"# chatcli configuration
# Run `chatcli --init` to regenerate this file.

default_profile = "openai"

# ── OpenAI ───────────────────────────────────────────────────────────────────
[profiles.openai]
endpoint     = "https://api.openai.com"
model        = "GPT3.5"
timeout_secs = 60
style        = "dark"
# api_key    = "sk-..."   # or set $OPENAI_API_KEY

# ── Local OpenAI-compatible server ───────────────────────────────────────────
# [profiles.local]
# endpoint     = "http://localhost:11434"
# model        = "qwen"
# api_key      = "unused"
# timeout_secs = 120
# plain        = true

# ── Extra model aliases ──────────────────────────────────────────────────────
# Built in: GPT3.5 → gpt-3.5-turbo, GPT4 → gpt-4, GPT4o → gpt-4o
[models]
# qwen = "qwen3:14b"
"#;

#[cfg(test)]
mod tests {
    use super::*;

    fn with_key() -> Overrides<'static> {
        Overrides { api_key: Some("sk-test"), ..Default::default() }
    }

    #[test]
    fn test_defaults() {
        let cfg = SessionConfig::resolve(&ConfigFile::default(), &with_key()).unwrap();
        assert_eq!(cfg.model_alias, "GPT3.5");
        assert_eq!(cfg.model, "gpt-3.5-turbo");
        assert_eq!(cfg.endpoint, "https://api.openai.com");
        assert_eq!(cfg.timeout, Duration::from_secs(60));
        assert_eq!(cfg.style, RenderStyle::Dark);
        assert!(!cfg.plain);
    }

    #[test]
    fn test_missing_api_key() {
        let err = SessionConfig::resolve(&ConfigFile::default(), &Overrides::default()).unwrap_err();
        assert!(matches!(err, ChatError::MissingApiKey));

        let blank = Overrides { api_key: Some("  "), ..Default::default() };
        let err = SessionConfig::resolve(&ConfigFile::default(), &blank).unwrap_err();
        assert!(matches!(err, ChatError::MissingApiKey));
    }

    #[test]
    fn test_unknown_model_alias() {
        let overrides = Overrides { model: Some("GPT9"), ..with_key() };
        let err = SessionConfig::resolve(&ConfigFile::default(), &overrides).unwrap_err();
        assert!(matches!(err, ChatError::UnsupportedModel(ref a, _) if a == "GPT9"));
        assert!(err.to_string().contains("GPT3.5"));
    }

    #[test]
    fn test_unknown_style() {
        let overrides = Overrides { style: Some("neon"), ..with_key() };
        let err = SessionConfig::resolve(&ConfigFile::default(), &overrides).unwrap_err();
        assert!(matches!(err, ChatError::UnsupportedStyle(_)));
    }

    #[test]
    fn test_file_aliases_extend_builtins() {
        let mut file = ConfigFile::default();
        file.models.insert("qwen".into(), "qwen3:14b".into());
        assert_eq!(file.model_for_alias("qwen").as_deref(), Some("qwen3:14b"));
        assert_eq!(file.model_for_alias("GPT4").as_deref(), Some("gpt-4"));

        file.models.insert("GPT4".into(), "gpt-4-turbo".into());
        assert_eq!(file.model_for_alias("GPT4").as_deref(), Some("gpt-4-turbo"));
    }

    #[test]
    fn test_overrides_beat_profile() {
        let mut file = ConfigFile::default();
        file.profiles.insert(
            "default".into(),
            Profile {
                endpoint: "http://localhost:8080".into(),
                model: "GPT4".into(),
                api_key: Some("sk-file".into()),
                style: Some("light".into()),
                plain: false,
                timeout_secs: 10,
            },
        );

        let from_file = SessionConfig::resolve(&file, &Overrides::default()).unwrap();
        assert_eq!(from_file.api_key, "sk-file");
        assert_eq!(from_file.model, "gpt-4");
        assert_eq!(from_file.style, RenderStyle::Light);
        assert_eq!(from_file.timeout, Duration::from_secs(10));

        let overrides = Overrides {
            endpoint: Some("http://other"),
            model: Some("GPT4o"),
            api_key: Some("sk-cli"),
            style: Some("ascii"),
            plain: true,
            timeout_secs: Some(5),
            ..Default::default()
        };
        let cfg = SessionConfig::resolve(&file, &overrides).unwrap();
        assert_eq!(cfg.endpoint, "http://other");
        assert_eq!(cfg.model, "gpt-4o");
        assert_eq!(cfg.api_key, "sk-cli");
        assert_eq!(cfg.style, RenderStyle::Ascii);
        assert!(cfg.plain);
        assert_eq!(cfg.timeout, Duration::from_secs(5));
    }

    #[test]
    fn test_named_profile() {
        let mut file = ConfigFile::default();
        file.profiles.insert(
            "work".into(),
            Profile { model: "GPT4".into(), ..Default::default() },
        );
        let overrides = Overrides { profile: Some("work"), ..with_key() };
        let cfg = SessionConfig::resolve(&file, &overrides).unwrap();
        assert_eq!(cfg.profile_name, "work");
        assert_eq!(cfg.model, "gpt-4");
    }

    #[test]
    fn test_default_template_parses() {
        let file: ConfigFile = toml::from_str(DEFAULT_CONFIG_TOML).unwrap();
        assert_eq!(file.default_profile, "openai");
        let profile = file.resolve_profile(None).unwrap();
        assert_eq!(profile.model, "GPT3.5");
        assert_eq!(profile.timeout_secs, 60);
    }

    #[test]
    fn test_write_and_load_default() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("config.toml");
        write_default_to(&path).unwrap();
        let file = ConfigFile::load_from(&path).unwrap();
        assert!(file.profiles.contains_key("openai"));

        // never overwrites an existing file
        fs::write(&path, "default_profile = \"mine\"\n").unwrap();
        write_default_to(&path).unwrap();
        assert_eq!(ConfigFile::load_from(&path).unwrap().default_profile, "mine");
    }

    #[test]
    fn test_missing_file_is_default() {
        let dir = tempfile::tempdir().unwrap();
        let file = ConfigFile::load_from(&dir.path().join("absent.toml")).unwrap();
        assert!(file.profiles.is_empty());
        assert_eq!(file.default_profile, "default");
    }

    #[test]
    fn test_bad_toml_names_path() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        fs::write(&path, "profiles = 3").unwrap();
        let err = ConfigFile::load_from(&path).unwrap_err();
        assert!(format!("{err:#}").contains("config.toml"));
    }
}
