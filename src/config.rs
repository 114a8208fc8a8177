use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub planner: PlannerConfig,
    #[serde(default)]
    pub sequencer: SequencerConfig,
}

/// Where the relay listens
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_host")]
    pub host: String,

    #[serde(default = "default_port")]
    pub port: u16,

    /// Allow any origin (the extension connects from a chrome-extension:// origin)
    #[serde(default = "default_true")]
    pub cors_enabled: bool,
}

fn default_host() -> String {
    "127.0.0.1".to_string()
}

fn default_port() -> u16 {
    crate::server::DEFAULT_PORT
}

fn default_true() -> bool {
    true
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            cors_enabled: true,
        }
    }
}

/// Alternate (LLM) planner settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PlannerConfig {
    /// Consult the LLM for ambiguous goals (default: false)
    #[serde(default)]
    pub llm_enabled: bool,

    #[serde(default = "default_model")]
    pub model: String,

    /// Ollama base URL (default: http://localhost:11434)
    #[serde(default)]
    pub base_url: Option<String>,

    #[serde(default = "default_llm_timeout")]
    pub timeout_secs: u64,

    #[serde(default = "default_max_tokens")]
    pub max_tokens: usize,
}

fn default_model() -> String {
    "mistral:latest".to_string()
}

fn default_llm_timeout() -> u64 {
    30
}

fn default_max_tokens() -> usize {
    1024
}

impl Default for PlannerConfig {
    fn default() -> Self {
        Self {
            llm_enabled: false,
            model: default_model(),
            base_url: None,
            timeout_secs: default_llm_timeout(),
            max_tokens: default_max_tokens(),
        }
    }
}

/// What to do when the extension reports a failed step
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(tag = "mode", rename_all = "snake_case")]
pub enum FailurePolicy {
    /// Record the failure and keep going
    #[default]
    Continue,
    /// Fail the task on the first failed step
    AbortOnFirstFailure,
    /// Fail the task after this many failures in a row
    AbortAfterConsecutive { failures: u32 },
}

impl FailurePolicy {
    /// Whether a task with this many consecutive failures should stop
    pub fn should_abort(&self, consecutive_failures: u32) -> bool {
        match self {
            FailurePolicy::Continue => false,
            FailurePolicy::AbortOnFirstFailure => consecutive_failures >= 1,
            FailurePolicy::AbortAfterConsecutive { failures } => {
                consecutive_failures >= (*failures).max(1)
            }
        }
    }
}

/// Task sequencing behaviour
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SequencerConfig {
    /// Wait after a navigation before issuing the next command (default: 2000)
    #[serde(default = "default_navigation_settle_ms")]
    pub navigation_settle_ms: u64,

    /// Wait after any other command (default: 500)
    #[serde(default = "default_step_settle_ms")]
    pub step_settle_ms: u64,

    #[serde(default)]
    pub failure_policy: FailurePolicy,

    /// Tasks with no progress for this long are reclaimed (default: 600)
    #[serde(default = "default_task_ttl")]
    pub task_ttl_secs: u64,

    /// How often expired tasks are swept (default: 30)
    #[serde(default = "default_reap_interval")]
    pub reap_interval_secs: u64,
}

fn default_navigation_settle_ms() -> u64 {
    2000
}

fn default_step_settle_ms() -> u64 {
    500
}

fn default_task_ttl() -> u64 {
    600
}

fn default_reap_interval() -> u64 {
    30
}

impl Default for SequencerConfig {
    fn default() -> Self {
        Self {
            navigation_settle_ms: default_navigation_settle_ms(),
            step_settle_ms: default_step_settle_ms(),
            failure_policy: FailurePolicy::default(),
            task_ttl_secs: default_task_ttl(),
            reap_interval_secs: default_reap_interval(),
        }
    }
}

impl SequencerConfig {
    pub fn navigation_settle(&self) -> Duration {
        Duration::from_millis(self.navigation_settle_ms)
    }

    pub fn step_settle(&self) -> Duration {
        Duration::from_millis(self.step_settle_ms)
    }

    pub fn task_ttl(&self) -> Duration {
        Duration::from_secs(self.task_ttl_secs)
    }
}

impl Config {
    /// Load the config file (or defaults) and apply environment overrides
    pub fn load() -> Result<Self> {
        let mut config = Self::load_file()?;
        config.apply_env_overrides();
        config.validate()?;
        Ok(config)
    }

    /// The config file as written, without environment overrides.
    /// Use this when the result is going to be saved back.
    pub fn load_file() -> Result<Self> {
        Self::read_from(&Self::config_path()?)
    }

    pub fn read_from(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }
        let content = std::fs::read_to_string(path).context("Failed to read config file")?;
        Self::from_toml(&content)
    }

    /// Reject settings the relay cannot run with
    pub fn validate(&self) -> Result<()> {
        if let Some(base_url) = self.planner.base_url.as_deref() {
            let parsed = url::Url::parse(base_url)
                .with_context(|| format!("Invalid Ollama base URL: {}", base_url))?;
            if !matches!(parsed.scheme(), "http" | "https") {
                anyhow::bail!("Ollama base URL must be http or https: {}", base_url);
            }
        }

        if self.server.host.trim().is_empty() {
            anyhow::bail!("Server host must not be empty");
        }

        Ok(())
    }

    pub fn from_toml(content: &str) -> Result<Self> {
        toml::from_str(content).context("Failed to parse config file")
    }

    pub fn save(&self) -> Result<()> {
        self.save_to(&Self::config_path()?)
    }

    pub fn save_to(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let content = toml::to_string_pretty(self)?;
        std::fs::write(path, content)?;

        Ok(())
    }

    pub fn config_path() -> Result<PathBuf> {
        let config_dir = dirs::config_dir().context("Could not determine config directory")?;
        Ok(config_dir.join("cortex-relay").join("config.toml"))
    }

    /// `USE_LLM`, `LLM_MODEL` and `OLLAMA_BASE_URL` win over the file
    pub fn apply_env_overrides(&mut self) {
        if let Ok(value) = std::env::var("USE_LLM") {
            self.planner.llm_enabled = value == "true" || value == "1";
        }

        if let Ok(model) = std::env::var("LLM_MODEL") {
            if !model.is_empty() {
                self.planner.model = model;
            }
        }

        if let Ok(base_url) = std::env::var("OLLAMA_BASE_URL") {
            if !base_url.is_empty() {
                self.planner.base_url = Some(base_url);
            }
        }
    }
}
