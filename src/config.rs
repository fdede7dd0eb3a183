// src/config.rs

use anyhow::{Context, Result};
use serde::Deserialize;
use std::{env, fs, path::Path, path::PathBuf};

/// Root configuration loaded from `codegate.yaml`.
///
/// This file controls:
/// - Where the HTTP server listens
/// - How the completion backend is reached
/// - How the sandbox is entered and where snippets are staged
/// - Where the vector store and the event log live
///
/// Every section is optional. Environment variables (and `.env`)
/// override whatever the file says.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub server: ServerConfig,

    #[serde(default)]
    pub completion: CompletionConfig,

    #[serde(default)]
    pub sandbox: SandboxConfig,

    #[serde(default)]
    pub knowledge: KnowledgeConfig,

    #[serde(default)]
    pub logging: LoggingConfig,
}

/// HTTP listener configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_addr")]
    pub addr: String,

    /// Bearer token required on `/v1/*` when set.
    #[serde(default)]
    pub api_key: Option<String>,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            addr: default_addr(),
            api_key: None,
        }
    }
}

fn default_addr() -> String {
    "0.0.0.0:8000".to_string()
}

/// Completion backend configuration.
///
/// Example:
///
/// completion:
///   endpoint: http://ollama:11434/api/generate
///   model: llama2:13b-chat-q4_0
///   max_tokens: 1024
///   temperature: 0.7
///   timeout_secs: 30
#[derive(Debug, Clone, Deserialize)]
pub struct CompletionConfig {
    #[serde(default = "default_completion_endpoint")]
    pub endpoint: String,

    #[serde(default = "default_model")]
    pub model: String,

    #[serde(default = "default_max_tokens")]
    pub max_tokens: u32,

    #[serde(default = "default_temperature")]
    pub temperature: f32,

    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

impl Default for CompletionConfig {
    fn default() -> Self {
        Self {
            endpoint: default_completion_endpoint(),
            model: default_model(),
            max_tokens: default_max_tokens(),
            temperature: default_temperature(),
            timeout_secs: default_timeout_secs(),
        }
    }
}

fn default_completion_endpoint() -> String {
    "http://ollama:11434/api/generate".to_string()
}

fn default_model() -> String {
    "llama2:13b-chat-q4_0".to_string()
}

fn default_max_tokens() -> u32 {
    1024
}

fn default_temperature() -> f32 {
    0.7
}

fn default_timeout_secs() -> u64 {
    30
}

/// Sandbox configuration.
///
/// `launcher` is the command prefix that enters the isolated environment.
/// The staged snippet is written to `host_dir` and is visible inside the
/// sandbox as `sandbox_dir/<name>`.
///
/// Example:
///
/// sandbox:
///   launcher: [docker, exec, -i, chloe-code-sandbox-1]
///   host_dir: /workspace
///   sandbox_dir: /workspace
///   timeout_secs: 30
///
/// An empty launcher runs snippets on the local machine.
#[derive(Debug, Clone, Deserialize)]
pub struct SandboxConfig {
    #[serde(default = "default_launcher")]
    pub launcher: Vec<String>,

    #[serde(default = "default_shared_dir")]
    pub host_dir: PathBuf,

    #[serde(default = "default_shared_dir")]
    pub sandbox_dir: PathBuf,

    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

impl Default for SandboxConfig {
    fn default() -> Self {
        Self {
            launcher: default_launcher(),
            host_dir: default_shared_dir(),
            sandbox_dir: default_shared_dir(),
            timeout_secs: default_timeout_secs(),
        }
    }
}

fn default_launcher() -> Vec<String> {
    docker_launcher("chloe-code-sandbox-1")
}

fn docker_launcher(container: &str) -> Vec<String> {
    ["docker", "exec", "-i", container]
        .iter()
        .map(|s| s.to_string())
        .collect()
}

fn default_shared_dir() -> PathBuf {
    PathBuf::from("/workspace")
}

/// Vector store configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct KnowledgeConfig {
    #[serde(default = "default_vector_path")]
    pub path: PathBuf,
}

impl Default for KnowledgeConfig {
    fn default() -> Self {
        Self {
            path: default_vector_path(),
        }
    }
}

fn default_vector_path() -> PathBuf {
    env::var_os("HOME")
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from("."))
        .join(".codegate")
        .join("vectors")
}

/// Event log configuration.
///
/// Logs are written to `<root>/logs/app.<date>.log`, one JSON object per line.
#[derive(Debug, Clone, Deserialize)]
pub struct LoggingConfig {
    #[serde(default = "default_log_root")]
    pub root: PathBuf,

    #[serde(default = "default_retention_days")]
    pub retention_days: usize,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            root: default_log_root(),
            retention_days: default_retention_days(),
        }
    }
}

fn default_log_root() -> PathBuf {
    env::current_dir().unwrap_or_else(|_| PathBuf::from("."))
}

fn default_retention_days() -> usize {
    30
}

impl LoggingConfig {
    pub fn log_dir(&self) -> PathBuf {
        self.root.join("logs")
    }
}

impl Config {
    /// Load `codegate.yaml` from disk, then apply environment overrides.
    ///
    /// A missing file is not an error: every section has defaults.
    pub fn load(path: &Path) -> Result<Self> {
        let mut cfg = if path.exists() {
            let raw = fs::read_to_string(path)
                .with_context(|| format!("Failed to read config file: {:?}", path))?;

            serde_yaml::from_str::<Config>(&raw).context("Failed to parse YAML config")?
        } else {
            Config::default()
        };

        cfg.apply_env(|key| env::var(key).ok());
        Ok(cfg)
    }

    /// Apply environment overrides using the given lookup.
    pub fn apply_env<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(v) = lookup("CODEGATE_ADDR") {
            self.server.addr = v;
        }
        if let Some(v) = lookup("CODEGATE_API_KEY").filter(|v| !v.is_empty()) {
            self.server.api_key = Some(v);
        }
        if let Some(v) = lookup("COMPLETION_ENDPOINT") {
            self.completion.endpoint = v;
        }
        if let Some(v) = lookup("COMPLETION_MODEL") {
            self.completion.model = v;
        }
        if let Some(v) = lookup("SANDBOX_CONTAINER") {
            self.sandbox.launcher = docker_launcher(&v);
        }
        if let Some(v) = lookup("SANDBOX_HOST_DIR") {
            self.sandbox.host_dir = PathBuf::from(v);
        }
        if let Some(v) = lookup("VECTOR_STORE_PATH") {
            self.knowledge.path = PathBuf::from(v);
        }
        if let Some(v) = lookup("LOG_ROOT") {
            self.logging.root = PathBuf::from(v);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn defaults_match_the_reference_deployment() {
        let cfg = Config::default();

        assert_eq!(cfg.server.addr, "0.0.0.0:8000");
        assert_eq!(cfg.completion.model, "llama2:13b-chat-q4_0");
        assert_eq!(cfg.completion.max_tokens, 1024);
        assert_eq!(cfg.sandbox.timeout_secs, 30);
        assert_eq!(
            cfg.sandbox.launcher,
            vec!["docker", "exec", "-i", "chloe-code-sandbox-1"]
        );
        assert_eq!(cfg.logging.retention_days, 30);
    }

    #[test]
    fn partial_yaml_keeps_section_defaults() {
        let cfg: Config = serde_yaml::from_str(
            "sandbox:\n  launcher: []\n  timeout_secs: 5\ncompletion:\n  model: tiny\n",
        )
        .unwrap();

        assert!(cfg.sandbox.launcher.is_empty());
        assert_eq!(cfg.sandbox.timeout_secs, 5);
        assert_eq!(cfg.sandbox.host_dir, PathBuf::from("/workspace"));
        assert_eq!(cfg.completion.model, "tiny");
        assert_eq!(cfg.completion.max_tokens, 1024);
    }

    #[test]
    fn environment_overrides_file_values() {
        let vars: HashMap<&str, &str> = HashMap::from([
            ("LOG_ROOT", "/var/log/codegate"),
            ("VECTOR_STORE_PATH", "/data/vectors"),
            ("SANDBOX_CONTAINER", "box-2"),
            ("CODEGATE_API_KEY", ""),
        ]);

        let mut cfg = Config::default();
        cfg.apply_env(|k| vars.get(k).map(|v| v.to_string()));

        assert_eq!(cfg.logging.log_dir(), PathBuf::from("/var/log/codegate/logs"));
        assert_eq!(cfg.knowledge.path, PathBuf::from("/data/vectors"));
        assert_eq!(cfg.sandbox.launcher, vec!["docker", "exec", "-i", "box-2"]);
        assert!(cfg.server.api_key.is_none());
    }

    #[test]
    fn missing_file_falls_back_to_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let cfg = Config::load(&dir.path().join("nope.yaml")).unwrap();
        assert_eq!(cfg.completion.timeout_secs, 30);
    }
}
