// src/scaffold.rs

use anyhow::{Context, Result};
use std::path::Path;

/// Write a commented default config to `path` unless one already exists.
pub fn init_config(path: &Path) -> Result<()> {
    if path.exists() {
        tracing::info!("{} already exists (skipping)", path.display());
        return Ok(());
    }

    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        crate::util::ensure_dir(parent)?;
    }

    std::fs::write(path, default_config_yaml())
        .with_context(|| format!("Failed to write {:?}", path))?;
    tracing::info!("Created {}", path.display());
    Ok(())
}

fn default_config_yaml() -> &'static str {
    r#"# codegate configuration
#
# Every value below is the built-in default. Environment variables
# (CODEGATE_ADDR, CODEGATE_API_KEY, COMPLETION_ENDPOINT, COMPLETION_MODEL,
# SANDBOX_CONTAINER, SANDBOX_HOST_DIR, VECTOR_STORE_PATH, LOG_ROOT)
# take precedence.

server:
  addr: "0.0.0.0:8000"
  # api_key: change-me   # require "Authorization: Bearer <key>" on /v1/*

completion:
  endpoint: http://ollama:11434/api/generate
  model: llama2:13b-chat-q4_0
  max_tokens: 1024
  temperature: 0.7
  timeout_secs: 30

sandbox:
  launcher: [docker, exec, "-i", chloe-code-sandbox-1]   # [] runs locally
  host_dir: /workspace
  sandbox_dir: /workspace
  timeout_secs: 30

# knowledge:
#   path: ~/.codegate/vectors

logging:
  # root: .               # event log goes to <root>/logs
  retention_days: 30
"#
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;

    #[test]
    fn scaffold_parses_back_to_the_defaults() {
        let cfg: Config = serde_yaml::from_str(default_config_yaml()).unwrap();
        let defaults = Config::default();

        assert_eq!(cfg.server.addr, defaults.server.addr);
        assert!(cfg.server.api_key.is_none());
        assert_eq!(cfg.completion.endpoint, defaults.completion.endpoint);
        assert_eq!(cfg.completion.model, defaults.completion.model);
        assert_eq!(cfg.sandbox.launcher, defaults.sandbox.launcher);
        assert_eq!(cfg.sandbox.host_dir, defaults.sandbox.host_dir);
        assert_eq!(cfg.logging.retention_days, 30);
    }

    #[test]
    fn existing_file_is_left_alone() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("conf").join("codegate.yaml");

        init_config(&path).unwrap();
        assert!(std::fs::read_to_string(&path)
            .unwrap()
            .contains("chloe-code-sandbox-1"));

        std::fs::write(&path, "server:\n  addr: 127.0.0.1:9\n").unwrap();
        init_config(&path).unwrap();
        assert_eq!(
            std::fs::read_to_string(&path).unwrap(),
            "server:\n  addr: 127.0.0.1:9\n"
        );
    }
}
