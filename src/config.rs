use serde::Deserialize;
use std::fmt;
use std::fs;
use std::path::Path;
use std::str::FromStr;

use crate::error::{Error, Result};

const DEFAULT_CONFIG: &str = include_str!("default_config.toml");

pub const API_KEY_VAR: &str = "NOTION_API_KEY";
pub const DATABASE_ID_VAR: &str = "NOTION_BLOG_DATABASE_ID";
pub const ENVIRONMENT_VAR: &str = "BLOG_ENV";

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
pub struct Config {
    pub site: SiteConfig,
    pub notion: NotionConfig,
    pub render: RenderConfig,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Environment {
    #[default]
    Development,
    Production,
}

impl Environment {
    pub fn is_production(self) -> bool {
        self == Environment::Production
    }
}

impl FromStr for Environment {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "development" | "dev" => Ok(Environment::Development),
            "production" | "prod" => Ok(Environment::Production),
            other => Err(format!("unknown environment: {other}")),
        }
    }
}

impl fmt::Display for Environment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Environment::Development => f.write_str("development"),
            Environment::Production => f.write_str("production"),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct SiteConfig {
    pub title: String,
    pub description: String,
    pub environment: Environment,
}

impl Default for SiteConfig {
    fn default() -> Self {
        Self {
            title: "My Notion Blog".to_string(),
            description: String::new(),
            environment: Environment::Development,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct NotionConfig {
    pub api_base: String,
    pub version: String,
    pub page_size: u32,
    pub timeout_secs: u64,
}

impl Default for NotionConfig {
    fn default() -> Self {
        Self {
            api_base: "https://api.notion.com/v1".to_string(),
            version: "2022-06-28".to_string(),
            page_size: 100,
            timeout_secs: 60,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct RenderConfig {
    /// Embed URLs on these hosts are treated as social-media posts
    pub social_domains: Vec<String>,
    pub social_embeds: bool,
}

impl Default for RenderConfig {
    fn default() -> Self {
        Self {
            social_domains: vec!["x.com".to_string(), "twitter.com".to_string()],
            social_embeds: false,
        }
    }
}

impl Config {
    /// The config embedded at build time. `build.rs` validates it, so a parse
    /// failure here can only fall back to the struct defaults.
    pub fn compiled_default() -> Self {
        toml::from_str(DEFAULT_CONFIG).unwrap_or_default()
    }

    /// Load config from a TOML file, or return the compiled default if the
    /// file does not exist.
    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Self::compiled_default());
        }
        let content = fs::read_to_string(path).map_err(|source| Error::ConfigRead {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml(&content).map_err(|source| Error::ConfigParse {
            path: path.to_path_buf(),
            source,
        })
    }

    /// Parse TOML on top of the compiled default. Sections and keys missing
    /// from `content` keep their default values.
    pub fn from_toml(content: &str) -> std::result::Result<Self, toml::de::Error> {
        let mut merged: toml::Table = DEFAULT_CONFIG.parse().unwrap_or_default();
        let overrides: toml::Table = content.parse()?;
        merge(&mut merged, overrides);
        toml::Value::Table(merged).try_into()
    }

    /// Apply `BLOG_ENV` if set.
    pub fn apply_env(&mut self) {
        let Ok(value) = std::env::var(ENVIRONMENT_VAR) else {
            return;
        };
        match value.parse() {
            Ok(environment) => self.site.environment = environment,
            Err(e) => log::warn!("ignoring {ENVIRONMENT_VAR}: {e}"),
        }
    }
}

fn merge(base: &mut toml::Table, overrides: toml::Table) {
    for (key, value) in overrides {
        match (base.get_mut(&key), value) {
            (Some(toml::Value::Table(base_table)), toml::Value::Table(table)) => {
                merge(base_table, table);
            }
            (_, value) => {
                base.insert(key, value);
            }
        }
    }
}

/// The two secrets needed to talk to the content API
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Credentials {
    pub api_key: String,
    pub database_id: String,
}

impl Credentials {
    pub fn from_env(environment: Environment) -> Result<Self> {
        Self::resolve(environment, |name| std::env::var(name).ok())
    }

    /// Look up both settings. A missing one is a warning in development, where
    /// it resolves to an empty string, and an error in production.
    pub fn resolve(
        environment: Environment,
        lookup: impl Fn(&str) -> Option<String>,
    ) -> Result<Self> {
        let require = |name: &'static str| -> Result<String> {
            match lookup(name).filter(|v| !v.trim().is_empty()) {
                Some(value) => Ok(value),
                None if environment.is_production() => Err(Error::MissingSetting { name }),
                None => {
                    log::warn!(
                        "{name} is missing from env, requests to the content API will fail"
                    );
                    Ok(String::new())
                }
            }
        };

        Ok(Self {
            api_key: require(API_KEY_VAR)?,
            database_id: require(DATABASE_ID_VAR)?,
        })
    }
}
