use std::collections::HashMap;
use std::{env, fmt};

use config::{Config, ConfigError, Environment, File, FileFormat};
use serde::Deserialize;

#[allow(dead_code)]
#[derive(Debug, Clone, Deserialize)]
pub struct App {
    pub name: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Server {
    pub http_port: u16,
    pub request_timeout: Option<u64>,
    pub body_limit_mb: Option<usize>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Logger {
    pub level: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DetectorBackend {
    Rustface,
    Opencv,
    None,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Detector {
    pub backend: DetectorBackend,
    pub model_path: Option<String>,
}

/// One ONNX embedding model served under `name`.
#[derive(Debug, Clone, Deserialize)]
pub struct RecognitionModel {
    pub name: String,
    pub path: String,
    pub input_size: u32,
    #[serde(default)]
    pub channels_last: bool,
    #[serde(default = "default_mean")]
    pub mean: f32,
    #[serde(default = "default_std")]
    pub std: f32,
    /// Per-metric overrides of the built-in verification thresholds.
    #[serde(default)]
    pub thresholds: HashMap<String, f32>,
}

fn default_mean() -> f32 {
    127.5
}

fn default_std() -> f32 {
    128.0
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct Recognition {
    #[serde(default)]
    pub models: Vec<RecognitionModel>,
}

#[allow(dead_code)]
#[derive(Debug, Clone, Deserialize)]
pub struct Settings {
    pub environment: Option<String>,
    pub server: Server,
    pub logger: Option<Logger>,
    pub detector: Detector,
    #[serde(default)]
    pub recognition: Recognition,
    pub app: App,
}

impl Settings {
    pub fn new() -> Result<Self, ConfigError> {
        let run_mode = env::var("RUN_MODE").unwrap_or_else(|_| "development".into());

        let mut builder = Self::defaults(Config::builder())?
            .add_source(File::with_name("conf/config.toml").format(FileFormat::Toml).required(false))
            .add_source(File::with_name(&format!("conf/{run_mode}")).required(false))
            .add_source(File::with_name("conf/local").required(false))
            .add_source(Environment::with_prefix("APP").prefix_separator("_").separator("__"));

        if let Ok(port) = env::var("PORT") {
            builder = builder.set_override("server.http_port", port)?;
        }

        builder.build()?.try_deserialize()
    }

    fn defaults(
        builder: config::ConfigBuilder<config::builder::DefaultState>,
    ) -> Result<config::ConfigBuilder<config::builder::DefaultState>, ConfigError> {
        builder
            .set_default("app.name", "rs-face-recognition-svc")?
            .set_default("server.http_port", 8001)?
            .set_default("server.request_timeout", 20)?
            .set_default("server.body_limit_mb", 20)?
            .set_default("logger.level", "info")?
            .set_default("detector.backend", "rustface")
    }
}

impl fmt::Display for Server {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "http://localhost:{}", &self.http_port)
    }
}
