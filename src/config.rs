//! Server configuration
//!
//! All configuration is read from the environment (with `.env` support via
//! dotenvy in `main`). Every field has a default so the server can start
//! with no configuration at all.

use std::path::PathBuf;

/// Error type for configuration loading
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Invalid value for {var}: {value}")]
    InvalidValue { var: &'static str, value: String },
}

/// Top-level server configuration
#[derive(Debug, Clone)]
pub struct Config {
    pub server: ServerConfig,
    pub model: ModelConfig,
    pub storage: StorageConfig,
    pub raster: RasterConfig,
}

/// HTTP server settings
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Port to listen on
    pub port: u16,
}

/// Inference runner settings
#[derive(Debug, Clone)]
pub struct ModelConfig {
    /// Executable invoked for every inference call
    pub command: String,
    /// Extra arguments prepended before the per-request flags
    pub args: Vec<String>,
}

/// Local-disk storage roots
#[derive(Debug, Clone)]
pub struct StorageConfig {
    /// Directory uploaded files are persisted into
    pub upload_dir: PathBuf,
    /// Root directory for per-task output directories
    pub output_dir: PathBuf,
}

/// PDF rasterization settings
#[derive(Debug, Clone)]
pub struct RasterConfig {
    /// Target resolution for page images. 144 is twice the 72-DPI PDF
    /// baseline.
    pub dpi: f32,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            server: ServerConfig { port: 3030 },
            model: ModelConfig {
                command: "deepseek-ocr-infer".to_string(),
                args: Vec::new(),
            },
            storage: StorageConfig {
                upload_dir: PathBuf::from("./uploads"),
                output_dir: PathBuf::from("./outputs"),
            },
            raster: RasterConfig { dpi: 144.0 },
        }
    }
}

impl Config {
    /// Load configuration from environment variables
    pub fn from_env() -> Result<Self, ConfigError> {
        let mut config = Config::default();

        if let Ok(port) = std::env::var("PORT") {
            config.server.port =
                port.parse()
                    .map_err(|_| ConfigError::InvalidValue {
                        var: "PORT",
                        value: port.clone(),
                    })?;
        }

        if let Ok(command) = std::env::var("MODEL_COMMAND") {
            config.model.command = command;
        }

        if let Ok(args) = std::env::var("MODEL_ARGS") {
            config.model.args = args.split_whitespace().map(String::from).collect();
        }

        if let Ok(dir) = std::env::var("UPLOAD_DIR") {
            config.storage.upload_dir = PathBuf::from(dir);
        }

        if let Ok(dir) = std::env::var("OUTPUT_DIR") {
            config.storage.output_dir = PathBuf::from(dir);
        }

        if let Ok(dpi) = std::env::var("RASTER_DPI") {
            config.raster.dpi =
                dpi.parse()
                    .map_err(|_| ConfigError::InvalidValue {
                        var: "RASTER_DPI",
                        value: dpi.clone(),
                    })?;
        }

        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config() {
        let config = Config::default();
        assert_eq!(config.server.port, 3030);
        assert_eq!(config.raster.dpi, 144.0);
        assert_eq!(config.storage.upload_dir, PathBuf::from("./uploads"));
        assert_eq!(config.storage.output_dir, PathBuf::from("./outputs"));
    }
}
