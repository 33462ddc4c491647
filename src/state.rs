use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::path::PathBuf;
use std::str::FromStr;
use std::sync::Arc;

use crate::core::embeddings::Embedder;
use crate::error::{AppError, Result};

/// Environment variable holding the bind address
pub const ENV_HOST: &str = "SIMILARITY_HOST";
/// Environment variable holding the listen port
pub const ENV_PORT: &str = "SIMILARITY_PORT";
/// Environment variable holding the path to the model weights
pub const ENV_WEIGHTS: &str = "SIMILARITY_WEIGHTS";
/// Environment variable selecting the inference device
pub const ENV_DEVICE: &str = "SIMILARITY_DEVICE";
/// Environment variable holding the request body limit in bytes
pub const ENV_MAX_UPLOAD: &str = "SIMILARITY_MAX_UPLOAD_BYTES";

/// Where inference should run
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
pub enum DevicePreference {
    /// CUDA when available, CPU otherwise
    #[default]
    Auto,
    /// Always the CPU
    Cpu,
    /// A specific CUDA device
    Cuda(usize),
}

impl FromStr for DevicePreference {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "auto" => Ok(Self::Auto),
            "cpu" => Ok(Self::Cpu),
            "cuda" => Ok(Self::Cuda(0)),
            other => other
                .strip_prefix("cuda:")
                .and_then(|idx| idx.parse().ok())
                .map(Self::Cuda)
                .ok_or_else(|| AppError::Config(format!("unknown device '{}'", s))),
        }
    }
}

/// Configuration for the application
#[derive(Clone, Debug)]
pub struct Config {
    /// Address to bind the HTTP server to
    pub host: IpAddr,
    /// Port to listen on
    pub port: u16,
    /// Pretrained weight checkpoint loaded at startup
    pub weights_path: PathBuf,
    /// Inference device
    pub device: DevicePreference,
    /// Maximum request body size in bytes
    pub max_upload_size: usize,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            host: IpAddr::V4(Ipv4Addr::UNSPECIFIED),
            port: 8000,
            weights_path: PathBuf::from("resnet50.ot"),
            device: DevicePreference::Auto,
            max_upload_size: 100 * 1024 * 1024, // 100MB
        }
    }
}

impl Config {
    /// Build the configuration from the process environment.
    ///
    /// A `.env` file in the working directory is loaded first if present.
    /// Unset variables fall back to [`Config::default`].
    pub fn from_env() -> Result<Self> {
        if let Ok(path) = dotenv::dotenv() {
            log::debug!("Loaded environment from {}", path.display());
        }

        let mut config = Self::default();

        if let Some(host) = read_var(ENV_HOST) {
            config.host = parse_var(ENV_HOST, &host)?;
        }
        if let Some(port) = read_var(ENV_PORT) {
            config.port = parse_var(ENV_PORT, &port)?;
        }
        if let Some(weights) = read_var(ENV_WEIGHTS) {
            config.weights_path = PathBuf::from(weights);
        }
        if let Some(device) = read_var(ENV_DEVICE) {
            config.device = device.parse()?;
        }
        if let Some(limit) = read_var(ENV_MAX_UPLOAD) {
            config.max_upload_size = parse_var(ENV_MAX_UPLOAD, &limit)?;
        }

        Ok(config)
    }

    /// Socket address the server listens on
    pub fn socket_addr(&self) -> SocketAddr {
        SocketAddr::new(self.host, self.port)
    }
}

fn read_var(name: &str) -> Option<String> {
    std::env::var(name).ok().filter(|v| !v.trim().is_empty())
}

fn parse_var<T>(name: &str, value: &str) -> Result<T>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    value
        .trim()
        .parse()
        .map_err(|e| AppError::Config(format!("{}={:?}: {}", name, value, e)))
}

/// Application state that can be shared across handlers
#[derive(Clone, Debug)]
pub struct AppState {
    /// Application configuration
    pub config: Config,
    /// Shared embedding model instance, read-only after startup
    pub embedder: Arc<dyn Embedder>,
}

impl AppState {
    /// Create a new application state with default configuration
    pub fn new(embedder: Arc<dyn Embedder>) -> Arc<Self> {
        Self::with_config(Config::default(), embedder)
    }

    /// Create a new application state with custom configuration
    pub fn with_config(config: Config, embedder: Arc<dyn Embedder>) -> Arc<Self> {
        Arc::new(Self { config, embedder })
    }
}
