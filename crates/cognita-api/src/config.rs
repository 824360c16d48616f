use std::fmt;
use std::path::Path;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Current config version. Bump this when adding fields or changing shape.
/// Each bump requires a corresponding entry in [`migrate`].
const CURRENT_VERSION: u32 = 1;

pub const ENV_CONFIG_FILE: &str = "COGNITA_CONFIG";
const ENV_LISTEN_ADDR: &str = "COGNITA_LISTEN_ADDR";
const ENV_STORAGE: &str = "COGNITA_STORAGE";
const ENV_BUCKET: &str = "COGNITA_BUCKET";
const ENV_REGION: &str = "AWS_REGION";
const ENV_LLM_PROVIDER: &str = "COGNITA_LLM_PROVIDER";
const ENV_OPENAI_BASE_URL: &str = "OPENAI_BASE_URL";
const ENV_OPENAI_API_KEY: &str = "OPENAI_API_KEY";
const ENV_MODEL: &str = "COGNITA_MODEL";
const ENV_MAX_TOKENS: &str = "COGNITA_MAX_TOKENS";
const ENV_TEMPERATURE: &str = "COGNITA_TEMPERATURE";
const ENV_CORS_ORIGINS: &str = "COGNITA_CORS_ORIGINS";

const DEFAULT_LISTEN_ADDR: &str = "0.0.0.0:8080";
const DEFAULT_BUCKET: &str = "cognita";
const DEFAULT_REGION: &str = "us-east-1";
const DEFAULT_MODEL: &str = "gpt-4o-mini";

/// Service configuration. Built from an optional JSON file named by
/// `COGNITA_CONFIG`, then overridden by environment variables.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    /// Schema version. Missing or 0 = pre-versioned config.
    #[serde(default)]
    pub config_version: u32,
    #[serde(default = "default_listen_addr")]
    pub listen_addr: String,
    #[serde(default)]
    pub storage: StorageConfig,
    #[serde(default)]
    pub llm: LlmConfig,
    #[serde(default = "default_model")]
    pub model_id: String,
    #[serde(default)]
    pub max_tokens: Option<u32>,
    #[serde(default)]
    pub temperature: Option<f32>,
    /// Empty allows any origin.
    #[serde(default)]
    pub cors_allowed_origins: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(tag = "backend", rename_all = "snake_case")]
pub enum StorageConfig {
    S3 {
        bucket: String,
        region: String,
    },
    #[default]
    Memory,
}

#[derive(Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "provider", rename_all = "snake_case")]
pub enum LlmConfig {
    #[serde(rename = "openai")]
    OpenAi {
        base_url: String,
        #[serde(skip_serializing_if = "Option::is_none", default)]
        api_key: Option<String>,
    },
    Bedrock {
        region: String,
    },
}

impl Default for LlmConfig {
    fn default() -> Self {
        LlmConfig::OpenAi {
            base_url: cognita_llm::openai::DEFAULT_BASE_URL.to_string(),
            api_key: None,
        }
    }
}

impl fmt::Debug for LlmConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LlmConfig::OpenAi { base_url, api_key } => f
                .debug_struct("OpenAi")
                .field("base_url", base_url)
                .field("api_key", &api_key.as_deref().map(redact_secret))
                .finish(),
            LlmConfig::Bedrock { region } => {
                f.debug_struct("Bedrock").field("region", region).finish()
            }
        }
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            config_version: CURRENT_VERSION,
            listen_addr: default_listen_addr(),
            storage: StorageConfig::default(),
            llm: LlmConfig::default(),
            model_id: default_model(),
            max_tokens: None,
            temperature: None,
            cors_allowed_origins: Vec::new(),
        }
    }
}

fn default_listen_addr() -> String {
    DEFAULT_LISTEN_ADDR.to_string()
}

fn default_model() -> String {
    DEFAULT_MODEL.to_string()
}

impl AppConfig {
    /// Load from the process environment.
    pub fn load() -> eyre::Result<Self> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Load using `lookup` in place of the process environment.
    pub fn from_lookup<F>(lookup: F) -> eyre::Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = match lookup(ENV_CONFIG_FILE) {
            Some(path) => load_file(Path::new(&path))?,
            None => Self::default(),
        };
        config.apply_env(&lookup)?;
        Ok(config)
    }

    /// Parse a config document, migrating older versions.
    pub fn from_json(contents: &str) -> eyre::Result<Self> {
        // Parse as raw JSON so we can run migrations before deserializing.
        let json: serde_json::Value = serde_json::from_str(contents)?;
        let on_disk_version = json
            .get("config_version")
            .and_then(|v| v.as_u64())
            .unwrap_or(0) as u32;

        let migrated = migrate(json, on_disk_version)?;
        let config: AppConfig = serde_json::from_value(migrated)?;
        Ok(config)
    }

    fn apply_env<F>(&mut self, lookup: &F) -> eyre::Result<()>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(addr) = lookup(ENV_LISTEN_ADDR) {
            self.listen_addr = addr;
        }

        let region = lookup(ENV_REGION);
        let bucket = lookup(ENV_BUCKET);
        match lookup(ENV_STORAGE).as_deref() {
            Some("memory") => self.storage = StorageConfig::Memory,
            Some("s3") => self.storage.ensure_s3(),
            Some(other) => eyre::bail!("{ENV_STORAGE} must be \"s3\" or \"memory\", got {other:?}"),
            // A bucket on its own selects S3.
            None if bucket.is_some() => self.storage.ensure_s3(),
            None => {}
        }
        if let StorageConfig::S3 {
            bucket: b,
            region: r,
        } = &mut self.storage
        {
            if let Some(bucket) = bucket {
                *b = bucket;
            }
            if let Some(region) = &region {
                *r = region.clone();
            }
        }

        match lookup(ENV_LLM_PROVIDER).as_deref() {
            Some("openai") => {
                if !matches!(self.llm, LlmConfig::OpenAi { .. }) {
                    self.llm = LlmConfig::default();
                }
            }
            Some("bedrock") => {
                if !matches!(self.llm, LlmConfig::Bedrock { .. }) {
                    self.llm = LlmConfig::Bedrock {
                        region: DEFAULT_REGION.to_string(),
                    };
                }
            }
            Some(other) => {
                eyre::bail!("{ENV_LLM_PROVIDER} must be \"openai\" or \"bedrock\", got {other:?}")
            }
            None => {}
        }
        match &mut self.llm {
            LlmConfig::OpenAi { base_url, api_key } => {
                if let Some(url) = lookup(ENV_OPENAI_BASE_URL) {
                    *base_url = url;
                }
                if let Some(key) = lookup(ENV_OPENAI_API_KEY) {
                    *api_key = Some(key);
                }
            }
            LlmConfig::Bedrock { region: r } => {
                if let Some(region) = region {
                    *r = region;
                }
            }
        }

        if let Some(model) = lookup(ENV_MODEL) {
            self.model_id = model;
        }
        if let Some(max_tokens) = parse_env(lookup, ENV_MAX_TOKENS)? {
            self.max_tokens = Some(max_tokens);
        }
        if let Some(temperature) = parse_env(lookup, ENV_TEMPERATURE)? {
            self.temperature = Some(temperature);
        }
        if let Some(origins) = lookup(ENV_CORS_ORIGINS) {
            self.cors_allowed_origins = origins
                .split(',')
                .map(str::trim)
                .filter(|o| !o.is_empty())
                .map(str::to_string)
                .collect();
        }
        Ok(())
    }
}

impl StorageConfig {
    fn ensure_s3(&mut self) {
        if *self == StorageConfig::Memory {
            *self = StorageConfig::S3 {
                bucket: DEFAULT_BUCKET.to_string(),
                region: DEFAULT_REGION.to_string(),
            };
        }
    }
}

fn load_file(path: &Path) -> eyre::Result<AppConfig> {
    let contents = std::fs::read_to_string(path)
        .map_err(|e| eyre::eyre!("failed to read config at {}: {e}", path.display()))?;
    let config = AppConfig::from_json(&contents)?;
    tracing::info!(path = %path.display(), "config file loaded");
    Ok(config)
}

fn parse_env<F, T>(lookup: &F, name: &str) -> eyre::Result<Option<T>>
where
    F: Fn(&str) -> Option<String>,
    T: FromStr,
    T::Err: fmt::Display,
{
    lookup(name)
        .map(|raw| {
            raw.trim()
                .parse::<T>()
                .map_err(|e| eyre::eyre!("invalid {name} {raw:?}: {e}"))
        })
        .transpose()
}

/// Run sequential migrations from `from_version` up to [`CURRENT_VERSION`].
fn migrate(mut json: serde_json::Value, from_version: u32) -> eyre::Result<serde_json::Value> {
    if from_version > CURRENT_VERSION {
        return Err(eyre::eyre!(
            "config_version {from_version} is newer than this build supports ({CURRENT_VERSION}). \
             Please update Cognita."
        ));
    }

    // v0 → v1: flat `bucket`/`region` and `openai_api_key` moved into the
    // tagged `storage` and `llm` sections.
    if from_version < 1 {
        let obj = json
            .as_object_mut()
            .ok_or_else(|| eyre::eyre!("config is not a JSON object"))?;

        let region = obj.remove("region");
        if let Some(bucket) = obj.remove("bucket") {
            obj.insert(
                "storage".to_string(),
                serde_json::json!({
                    "backend": "s3",
                    "bucket": bucket,
                    "region": region.unwrap_or_else(|| DEFAULT_REGION.into()),
                }),
            );
        }
        if let Some(api_key) = obj.remove("openai_api_key") {
            obj.insert(
                "llm".to_string(),
                serde_json::json!({
                    "provider": "openai",
                    "base_url": cognita_llm::openai::DEFAULT_BASE_URL,
                    "api_key": api_key,
                }),
            );
        }
        obj.insert(
            "config_version".to_string(),
            serde_json::Value::Number(1.into()),
        );
        tracing::info!("migrated config v0 → v1 (nested storage and llm sections)");
    }

    Ok(json)
}

fn redact_secret(secret: &str) -> String {
    let chars: Vec<char> = secret.chars().collect();
    if chars.len() <= 8 {
        return "****".to_string();
    }
    let prefix: String = chars[..4].iter().collect();
    let suffix: String = chars[chars.len() - 4..].iter().collect();
    format!("{prefix}...{suffix}")
}
