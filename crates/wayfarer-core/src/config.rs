use crate::error::{Result, WayfarerError};
use crate::kinds::ContentKind;
use clap::Parser;
use std::path::PathBuf;
use std::time::Duration;

/// Environment-driven configuration for the engine.
///
/// Every option can be set through its environment variable; the long flags
/// exist so hosts and tests can override values explicitly.
#[derive(Parser, Debug, Clone)]
#[command(name = "wayfarer")]
#[command(about = "CMS cache and context reduction for the tourism assistant")]
pub struct Config {
    /// GraphQL endpoint of the content API
    #[arg(long, env = "WAYFARER_CMS_URL", default_value = "https://cms.falkenberg.se/graphql")]
    pub cms_url: String,

    /// Optional bearer token for the content API
    #[arg(long, env = "WAYFARER_CMS_TOKEN", hide_env_values = true)]
    pub cms_token: Option<String>,

    /// Language filter for pages
    #[arg(long, env = "WAYFARER_CMS_LANGUAGE", default_value = "SV")]
    pub cms_language: String,

    /// API key for the generative model
    #[arg(long, env = "GOOGLE_API_KEY", hide_env_values = true)]
    pub model_api_key: Option<String>,

    /// Generative model name
    #[arg(long, env = "WAYFARER_MODEL", default_value = "gemini-2.0-flash")]
    pub model: String,

    /// Timeout for one model call, in seconds
    #[arg(long, env = "WAYFARER_MODEL_TIMEOUT_SECS", default_value = "60")]
    pub model_timeout_secs: u64,

    /// Background refresh interval, in hours
    #[arg(long, env = "WAYFARER_REFRESH_HOURS", default_value = "3")]
    pub refresh_hours: u64,

    /// Events cache validity, in minutes
    #[arg(long, env = "WAYFARER_EVENTS_TTL_MINUTES", default_value = "30")]
    pub events_ttl_minutes: u64,

    /// Pages cache validity, in minutes
    #[arg(long, env = "WAYFARER_PAGES_TTL_MINUTES", default_value = "60")]
    pub pages_ttl_minutes: u64,

    /// Activity log file
    #[arg(long, env = "WAYFARER_LOG_FILE", default_value = "wayfarer_log.txt")]
    pub log_file: PathBuf,

    /// Municipality named in the prompts
    #[arg(long, env = "WAYFARER_MUNICIPALITY", default_value = "Falkenberg")]
    pub municipality: String,

    /// Website named in the pages prompt
    #[arg(long, env = "WAYFARER_SITE", default_value = "falkenberg.se")]
    pub site: String,
}

impl Config {
    /// Read the configuration from the process environment.
    pub fn from_env() -> Result<Self> {
        Self::try_parse_from(["wayfarer"]).map_err(|e| WayfarerError::Config(e.to_string()))
    }

    pub fn validate(&self) -> Result<()> {
        if self.cms_url.trim().is_empty() {
            return Err(WayfarerError::Config("cms_url must not be empty".into()));
        }
        if self.refresh_hours == 0 {
            return Err(WayfarerError::Config("refresh_hours must be at least 1".into()));
        }
        if self.events_ttl_minutes == 0 || self.pages_ttl_minutes == 0 {
            return Err(WayfarerError::Config("cache validity must be at least 1 minute".into()));
        }
        if self.model_timeout_secs == 0 {
            return Err(WayfarerError::Config("model_timeout_secs must be at least 1".into()));
        }
        Ok(())
    }

    pub fn refresh_interval(&self) -> Duration {
        Duration::from_secs(self.refresh_hours * 3600)
    }

    pub fn model_timeout(&self) -> Duration {
        Duration::from_secs(self.model_timeout_secs)
    }

    pub fn cache_config(&self) -> CacheConfig {
        CacheConfig::new()
            .with_events_validity(Duration::from_secs(self.events_ttl_minutes * 60))
            .with_pages_validity(Duration::from_secs(self.pages_ttl_minutes * 60))
    }

    pub fn model_config(&self) -> ModelConfig {
        ModelConfig::new(self.model.clone())
    }

    pub fn prompt_config(&self) -> PromptConfig {
        PromptConfig {
            municipality: self.municipality.clone(),
            site: self.site.clone(),
        }
    }
}

/// Per-kind cache validity.
#[derive(Debug, Clone)]
pub struct CacheConfig {
    /// Default: 30 minutes.
    pub events_validity: Duration,
    /// Default: 60 minutes.
    pub pages_validity: Duration,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            events_validity: ContentKind::Events.default_validity(),
            pages_validity: ContentKind::Pages.default_validity(),
        }
    }
}

impl CacheConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_events_validity(mut self, validity: Duration) -> Self {
        self.events_validity = validity;
        self
    }

    pub fn with_pages_validity(mut self, validity: Duration) -> Self {
        self.pages_validity = validity;
        self
    }

    pub fn validity(&self, kind: ContentKind) -> Duration {
        match kind {
            ContentKind::Events => self.events_validity,
            ContentKind::Pages => self.pages_validity,
        }
    }
}

/// Generation settings sent with every model call.
#[derive(Debug, Clone)]
pub struct ModelConfig {
    pub model: String,
    pub base_url: String,
    pub temperature: f32,
    pub top_p: f32,
    pub top_k: u32,
    pub max_output_tokens: u32,
}

impl Default for ModelConfig {
    fn default() -> Self {
        Self {
            model: "gemini-2.0-flash".to_string(),
            base_url: "https://generativelanguage.googleapis.com/v1beta".to_string(),
            temperature: 0.2,
            top_p: 0.95,
            top_k: 40,
            max_output_tokens: 8192,
        }
    }
}

impl ModelConfig {
    pub fn new(model: impl Into<String>) -> Self {
        Self {
            model: model.into(),
            ..Self::default()
        }
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    pub fn with_temperature(mut self, temperature: f32) -> Self {
        self.temperature = temperature;
        self
    }

    pub fn with_max_output_tokens(mut self, max: u32) -> Self {
        self.max_output_tokens = max;
        self
    }
}

/// Names substituted into the fixed system instructions.
#[derive(Debug, Clone)]
pub struct PromptConfig {
    pub municipality: String,
    pub site: String,
}

impl Default for PromptConfig {
    fn default() -> Self {
        Self {
            municipality: "Falkenberg".to_string(),
            site: "falkenberg.se".to_string(),
        }
    }
}
