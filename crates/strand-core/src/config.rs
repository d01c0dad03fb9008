use figment::{
    providers::{Env, Format, Serialized, Toml},
    Figment,
};
use serde::{Deserialize, Serialize};

pub const DEFAULT_THREAD_NAME: &str = "strand-executor";
pub const ENV_PREFIX: &str = "STRAND_";

/// Top-level config (strand.toml + STRAND_* env overrides).
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct StrandConfig {
    #[serde(default)]
    pub executor: ExecutorConfig,
}

/// Worker thread settings for an executor.
///
/// The executor's immediate queue is always unbounded, so there is no
/// capacity knob here.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ExecutorConfig {
    /// OS thread name given to the worker.
    #[serde(default = "default_thread_name")]
    pub thread_name: String,
    /// Worker stack size in bytes. `None` keeps the platform default.
    #[serde(default)]
    pub stack_size: Option<usize>,
}

impl Default for ExecutorConfig {
    fn default() -> Self {
        Self {
            thread_name: default_thread_name(),
            stack_size: None,
        }
    }
}

fn default_thread_name() -> String {
    DEFAULT_THREAD_NAME.to_string()
}

impl StrandConfig {
    /// Load config from a TOML file with STRAND_* env var overrides.
    ///
    /// The file is the explicit path when given, else `~/.strand/strand.toml`.
    /// A missing file is not an error; defaults fill every absent key.
    /// Nested keys use a double underscore: `STRAND_EXECUTOR__THREAD_NAME`.
    pub fn load(config_path: Option<&str>) -> crate::error::Result<Self> {
        let path = config_path
            .map(String::from)
            .unwrap_or_else(default_config_path);

        let config: StrandConfig = Figment::from(Serialized::defaults(StrandConfig::default()))
            .merge(Toml::file(&path))
            .merge(Env::prefixed(ENV_PREFIX).split("__"))
            .extract()
            .map_err(|e| crate::error::StrandError::Config(e.to_string()))?;

        Ok(config)
    }
}

fn default_config_path() -> String {
    let home = std::env::var("HOME").unwrap_or_else(|_| ".".to_string());
    format!("{}/.strand/strand.toml", home)
}
