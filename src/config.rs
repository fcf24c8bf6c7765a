//! Configuration for the aegis pipeline.
//!
//! Configuration sources (highest priority first):
//! 1. Environment variables (AEGIS_WORKSPACE_DIR, OLLAMA_BASE_URL, OLLAMA_MODEL)
//! 2. Config file (.aegis/config.yaml)
//! 3. Defaults (~/.aegis/workspace, http://localhost:11434, llama3.1)
//!
//! Config file discovery searches the current directory and parents for
//! .aegis/config.yaml. Each backend role (scanner, researcher, fixer,
//! reviewer) carries its own model settings; roles inherit the shared
//! model name unless overridden.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::Deserialize;

const DEFAULT_BASE_URL: &str = "http://localhost:11434";
const DEFAULT_MODEL: &str = "llama3.1";

/// Raw config file schema (matches YAML structure)
#[derive(Debug, Clone, Deserialize)]
pub struct ConfigFile {
    pub version: String,
    #[serde(default)]
    pub workspace_dir: Option<String>,
    #[serde(default)]
    pub ollama: Option<OllamaSection>,
    #[serde(default)]
    pub models: Option<ModelsSection>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct OllamaSection {
    pub base_url: Option<String>,
    pub model: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ModelsSection {
    pub scanner: Option<ModelOverride>,
    pub researcher: Option<ModelOverride>,
    pub fixer: Option<ModelOverride>,
    pub reviewer: Option<ModelOverride>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ModelOverride {
    pub model: Option<String>,
    pub temperature: Option<f64>,
    pub max_tokens: Option<u32>,
}

/// Settings for one backend role
#[derive(Debug, Clone)]
pub struct ModelSettings {
    pub model: String,
    pub temperature: f64,
    pub max_tokens: u32,
}

impl ModelSettings {
    fn resolve(shared_model: &str, temperature: f64, max_tokens: u32, over: Option<&ModelOverride>) -> Self {
        Self {
            model: over
                .and_then(|o| o.model.clone())
                .unwrap_or_else(|| shared_model.to_string()),
            temperature: over.and_then(|o| o.temperature).unwrap_or(temperature),
            max_tokens: over.and_then(|o| o.max_tokens).unwrap_or(max_tokens),
        }
    }
}

/// Resolved Ollama settings for all four roles
#[derive(Debug, Clone)]
pub struct OllamaConfig {
    pub base_url: String,
    pub scanner: ModelSettings,
    pub researcher: ModelSettings,
    pub fixer: ModelSettings,
    pub reviewer: ModelSettings,
}

/// Resolved configuration
#[derive(Debug, Clone)]
pub struct Config {
    /// Directory under which run workspaces are created
    pub workspace_dir: PathBuf,

    /// Ollama backend settings
    pub ollama: OllamaConfig,

    /// Path to config file (if found)
    pub config_file: Option<PathBuf>,
}

impl Config {
    /// Load configuration from all sources
    pub fn load() -> Result<Self> {
        let config_file = find_config_file();
        let file = match config_file {
            Some(ref path) => Some(load_config_file(path)?),
            None => None,
        };
        Ok(Self::resolve(file, config_file, |key| std::env::var(key).ok()))
    }

    fn resolve(
        file: Option<ConfigFile>,
        config_file: Option<PathBuf>,
        env: impl Fn(&str) -> Option<String>,
    ) -> Self {
        let workspace_dir = env("AEGIS_WORKSPACE_DIR")
            .map(PathBuf::from)
            .or_else(|| {
                file.as_ref()
                    .and_then(|f| f.workspace_dir.as_ref())
                    .map(PathBuf::from)
            })
            .unwrap_or_else(default_workspace_dir);

        let ollama_section = file.as_ref().and_then(|f| f.ollama.clone()).unwrap_or_default();
        let base_url = env("OLLAMA_BASE_URL")
            .or(ollama_section.base_url)
            .unwrap_or_else(|| DEFAULT_BASE_URL.to_string());
        let shared_model = env("OLLAMA_MODEL")
            .or(ollama_section.model)
            .unwrap_or_else(|| DEFAULT_MODEL.to_string());

        let models = file.as_ref().and_then(|f| f.models.clone()).unwrap_or_default();

        let ollama = OllamaConfig {
            base_url,
            scanner: ModelSettings::resolve(&shared_model, 0.1, 2048, models.scanner.as_ref()),
            researcher: ModelSettings::resolve(&shared_model, 0.2, 4096, models.researcher.as_ref()),
            fixer: ModelSettings::resolve(&shared_model, 0.1, 4096, models.fixer.as_ref()),
            reviewer: ModelSettings::resolve(&shared_model, 0.1, 2048, models.reviewer.as_ref()),
        };

        Self {
            workspace_dir,
            ollama,
            config_file,
        }
    }
}

fn default_workspace_dir() -> PathBuf {
    dirs::home_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(".aegis")
        .join("workspace")
}

/// Find config file by searching current directory and parents
fn find_config_file() -> Option<PathBuf> {
    let mut current = std::env::current_dir().ok()?;

    loop {
        let config_path = current.join(".aegis").join("config.yaml");
        if config_path.exists() {
            return Some(config_path);
        }

        if !current.pop() {
            break;
        }
    }

    None
}

/// Load and parse a config file
fn load_config_file(path: &Path) -> Result<ConfigFile> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file: {}", path.display()))?;

    serde_yaml::from_str(&content)
        .with_context(|| format!("Failed to parse config file: {}", path.display()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::TempDir;

    #[test]
    fn test_config_file_parsing() {
        let temp = TempDir::new().unwrap();
        let aegis_dir = temp.path().join(".aegis");
        std::fs::create_dir_all(&aegis_dir).unwrap();

        let config_path = aegis_dir.join("config.yaml");
        let mut file = std::fs::File::create(&config_path).unwrap();
        writeln!(
            file,
            r#"
version: "1.0"
workspace_dir: /tmp/aegis-work
ollama:
  base_url: http://ollama.internal:11434
  model: codellama
models:
  researcher:
    temperature: 0.3
    max_tokens: 8192
"#
        )
        .unwrap();

        let parsed = load_config_file(&config_path).unwrap();
        assert_eq!(parsed.version, "1.0");
        assert_eq!(parsed.workspace_dir.as_deref(), Some("/tmp/aegis-work"));

        // Ignore whatever OLLAMA_*/AEGIS_* vars the host has exported
        let config = Config::resolve(Some(parsed), Some(config_path), |_| None);
        assert_eq!(config.workspace_dir, PathBuf::from("/tmp/aegis-work"));
        assert_eq!(config.ollama.base_url, "http://ollama.internal:11434");
        // Role override applies on top of the shared model
        assert_eq!(config.ollama.researcher.model, "codellama");
        assert_eq!(config.ollama.researcher.temperature, 0.3);
        assert_eq!(config.ollama.researcher.max_tokens, 8192);
        // Other roles keep their defaults
        assert_eq!(config.ollama.scanner.model, "codellama");
        assert_eq!(config.ollama.scanner.temperature, 0.1);
        assert_eq!(config.ollama.scanner.max_tokens, 2048);
    }

    #[test]
    fn test_env_overrides_file_values() {
        let parsed = ConfigFile {
            version: "1.0".to_string(),
            workspace_dir: Some("/from/file".to_string()),
            ollama: Some(OllamaSection {
                base_url: Some("http://file-host:11434".to_string()),
                model: Some("file-model".to_string()),
            }),
            models: None,
        };

        let config = Config::resolve(Some(parsed), None, |key| match key {
            "OLLAMA_BASE_URL" => Some("http://env-host:11434".to_string()),
            "OLLAMA_MODEL" => Some("env-model".to_string()),
            _ => None,
        });

        assert_eq!(config.ollama.base_url, "http://env-host:11434");
        assert_eq!(config.ollama.scanner.model, "env-model");
        // No env override for the workspace dir, so the file value holds
        assert_eq!(config.workspace_dir, PathBuf::from("/from/file"));
    }

    #[test]
    fn test_role_defaults_without_file() {
        let config = Config::resolve(None, None, |_| None);

        assert_eq!(config.ollama.scanner.max_tokens, 2048);
        assert_eq!(config.ollama.researcher.max_tokens, 4096);
        assert_eq!(config.ollama.fixer.max_tokens, 4096);
        assert_eq!(config.ollama.reviewer.max_tokens, 2048);
        assert_eq!(config.ollama.researcher.temperature, 0.2);
    }
}
