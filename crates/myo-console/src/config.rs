//! Console configuration.

use std::net::SocketAddr;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

/// Console configuration.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// HTTP server settings.
    pub server: ServerConfig,
    /// Controller link settings.
    pub controller: ControllerConfig,
    /// Motion class gallery settings.
    pub gallery: GalleryConfig,
}

impl Config {
    /// Load configuration from the default path, or defaults if absent.
    pub fn load_default() -> Result<Self, ConfigError> {
        let path = default_config_path();
        if path.exists() {
            Self::load(&path)
        } else {
            Ok(Self::default())
        }
    }

    /// Load configuration from a file.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path.as_ref()).map_err(|e| ConfigError::Read {
            path: path.as_ref().to_path_buf(),
            source: e,
        })?;
        toml::from_str(&content).map_err(|e| ConfigError::Parse {
            path: path.as_ref().to_path_buf(),
            source: e,
        })
    }

    /// Save configuration to a file.
    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<(), ConfigError> {
        let content = toml::to_string_pretty(self).map_err(ConfigError::Serialize)?;

        if let Some(parent) = path.as_ref().parent() {
            std::fs::create_dir_all(parent).map_err(|e| ConfigError::Write {
                path: parent.to_path_buf(),
                source: e,
            })?;
        }

        std::fs::write(path.as_ref(), content).map_err(|e| ConfigError::Write {
            path: path.as_ref().to_path_buf(),
            source: e,
        })
    }

    /// Validate the configuration and return every problem found.
    ///
    /// ```
    /// use myo_console::Config;
    ///
    /// let config = Config::default();
    /// config.validate().expect("Default config should be valid");
    /// ```
    pub fn validate(&self) -> Result<(), ConfigError> {
        let mut errors = Vec::new();
        errors.extend(self.server.validate());
        errors.extend(self.controller.validate());
        errors.extend(self.gallery.validate());

        if errors.is_empty() {
            Ok(())
        } else {
            Err(ConfigError::Validation(errors))
        }
    }

    /// Load and validate configuration from a file.
    pub fn load_validated<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let config = Self::load(path)?;
        config.validate()?;
        Ok(config)
    }
}

/// HTTP server configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Bind address (e.g., "127.0.0.1:8080").
    pub bind: String,
    /// Directory holding the console page and its assets.
    pub static_dir: PathBuf,
    /// Status broadcast buffer per WebSocket client.
    pub broadcast_buffer: usize,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind: "127.0.0.1:8080".to_string(),
            static_dir: PathBuf::from("www"),
            broadcast_buffer: 100,
        }
    }
}

impl ServerConfig {
    pub fn validate(&self) -> Vec<ValidationError> {
        let mut errors = Vec::new();
        if let Some(error) = validate_socket_addr("server.bind", &self.bind) {
            errors.push(error);
        }
        if self.static_dir.as_os_str().is_empty() {
            errors.push(ValidationError {
                field: "server.static_dir".to_string(),
                message: "static directory cannot be empty".to_string(),
            });
        }
        if self.broadcast_buffer == 0 {
            errors.push(ValidationError {
                field: "server.broadcast_buffer".to_string(),
                message: "broadcast buffer must be at least 1".to_string(),
            });
        }
        errors
    }
}

/// Controller UDP link configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ControllerConfig {
    /// Where console commands are sent.
    pub command_addr: String,
    /// Where controller status datagrams are received.
    pub status_bind: String,
}

impl Default for ControllerConfig {
    fn default() -> Self {
        Self {
            command_addr: "127.0.0.1:9100".to_string(),
            status_bind: "127.0.0.1:9101".to_string(),
        }
    }
}

impl ControllerConfig {
    pub fn validate(&self) -> Vec<ValidationError> {
        [
            validate_socket_addr("controller.command_addr", &self.command_addr),
            validate_socket_addr("controller.status_bind", &self.status_bind),
        ]
        .into_iter()
        .flatten()
        .collect()
    }
}

/// Gallery configuration.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GalleryConfig {
    /// CSV file mapping class names to images. No gallery when unset.
    pub path: Option<PathBuf>,
}

impl GalleryConfig {
    pub fn validate(&self) -> Vec<ValidationError> {
        let mut errors = Vec::new();
        if let Some(path) = &self.path
            && path.as_os_str().is_empty()
        {
            errors.push(ValidationError {
                field: "gallery.path".to_string(),
                message: "gallery path cannot be empty string (omit instead)".to_string(),
            });
        }
        errors
    }
}

fn validate_socket_addr(field: &str, value: &str) -> Option<ValidationError> {
    if value.is_empty() {
        return Some(ValidationError {
            field: field.to_string(),
            message: "address cannot be empty".to_string(),
        });
    }
    match value.parse::<SocketAddr>() {
        Ok(addr) if addr.port() == 0 => Some(ValidationError {
            field: field.to_string(),
            message: "port cannot be 0".to_string(),
        }),
        Ok(_) => None,
        Err(_) => Some(ValidationError {
            field: field.to_string(),
            message: format!("invalid address '{}': expected format 'ip:port'", value),
        }),
    }
}

/// Configuration errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Failed to read config file {path}: {source}")]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("Failed to parse config file {path}: {source}")]
    Parse {
        path: PathBuf,
        source: toml::de::Error,
    },
    #[error("Failed to serialize config: {0}")]
    Serialize(toml::ser::Error),
    #[error("Failed to write config file {path}: {source}")]
    Write {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("Configuration validation failed:\n{}", format_validation_errors(.0))]
    Validation(Vec<ValidationError>),
}

/// A single validation error with context.
#[derive(Debug, Clone)]
pub struct ValidationError {
    /// The field path (e.g., `server.bind`).
    pub field: String,
    /// Description of the validation failure.
    pub message: String,
}

impl std::fmt::Display for ValidationError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.field, self.message)
    }
}

fn format_validation_errors(errors: &[ValidationError]) -> String {
    errors
        .iter()
        .map(|e| format!("  - {}", e))
        .collect::<Vec<_>>()
        .join("\n")
}

/// Default configuration file path.
pub fn default_config_path() -> PathBuf {
    dirs::config_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("myo")
        .join("console.toml")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_default() {
        let config = Config::default();
        assert_eq!(config.server.bind, "127.0.0.1:8080");
        assert_eq!(config.server.static_dir, PathBuf::from("www"));
        assert_eq!(config.controller.command_addr, "127.0.0.1:9100");
        assert!(config.gallery.path.is_none());
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_partial_toml() {
        let toml = r#"
            [controller]
            command_addr = "10.0.0.2:9100"

            [gallery]
            path = "gallery.csv"
        "#;
        let config: Config = toml::from_str(toml).unwrap();
        assert_eq!(config.controller.command_addr, "10.0.0.2:9100");
        assert_eq!(config.controller.status_bind, "127.0.0.1:9101");
        assert_eq!(config.gallery.path, Some(PathBuf::from("gallery.csv")));
        assert_eq!(config.server, ServerConfig::default());
    }

    #[test]
    fn test_config_save_and_load() {
        let temp_dir = tempfile::tempdir().unwrap();
        let config_path = temp_dir.path().join("nested").join("console.toml");

        let config = Config {
            server: ServerConfig {
                bind: "0.0.0.0:9090".to_string(),
                static_dir: PathBuf::from("/srv/console"),
                broadcast_buffer: 50,
            },
            controller: ControllerConfig::default(),
            gallery: GalleryConfig {
                path: Some(PathBuf::from("/srv/gallery.csv")),
            },
        };

        config.save(&config_path).unwrap();
        let loaded = Config::load_validated(&config_path).unwrap();
        assert_eq!(loaded, config);
    }

    #[test]
    fn test_load_errors() {
        let temp_dir = tempfile::tempdir().unwrap();
        let missing = temp_dir.path().join("missing.toml");
        assert!(matches!(
            Config::load(&missing),
            Err(ConfigError::Read { .. })
        ));

        let bad = temp_dir.path().join("bad.toml");
        std::fs::write(&bad, "[server\nbind = 1").unwrap();
        assert!(matches!(Config::load(&bad), Err(ConfigError::Parse { .. })));
    }

    #[test]
    fn test_validation_collects_all_errors() {
        let mut config = Config::default();
        config.server.bind = "localhost".to_string();
        config.server.broadcast_buffer = 0;
        config.controller.command_addr = "127.0.0.1:0".to_string();
        config.controller.status_bind = String::new();
        config.gallery.path = Some(PathBuf::new());

        let Err(ConfigError::Validation(errors)) = config.validate() else {
            panic!("expected validation errors");
        };
        let fields: Vec<&str> = errors.iter().map(|e| e.field.as_str()).collect();
        assert_eq!(
            fields,
            [
                "server.bind",
                "server.broadcast_buffer",
                "controller.command_addr",
                "controller.status_bind",
                "gallery.path",
            ]
        );

        let msg = ConfigError::Validation(errors).to_string();
        assert!(msg.contains("  - server.bind: invalid address 'localhost'"));
    }

    #[test]
    fn test_default_config_path() {
        let path = default_config_path();
        assert!(path.ends_with("myo/console.toml"));
    }
}
