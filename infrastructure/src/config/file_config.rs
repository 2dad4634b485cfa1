//! Raw TOML configuration data types
//!
//! These structs mirror the structure of `foreman.toml` exactly and are
//! deserialized directly. Builder methods turn the raw sections into the
//! runtime types the rest of the system consumes.

use crate::inference::BackendEndpoint;
use foreman_application::config::EngineParams;
use foreman_domain::{AgentRole, BackendId, RoleCatalog};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::PathBuf;

/// Complete file configuration (raw TOML structure)
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct FileConfig {
    /// Decision engine and collaboration tuning
    pub engine: EngineParams,
    /// Inference backend endpoints
    pub backends: FileBackendsConfig,
    /// Extra roles layered over the built-in team
    pub roster: FileRosterConfig,
    /// State and memory persistence locations
    pub storage: FileStorageConfig,
    /// Event stream settings
    pub events: FileEventsConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct FileBackendsConfig {
    pub local: FileBackendConfig,
    pub remote: FileBackendConfig,
    /// Additional named backends, addressable from role definitions
    pub custom: HashMap<String, FileBackendConfig>,
}

impl Default for FileBackendsConfig {
    fn default() -> Self {
        Self {
            local: FileBackendConfig {
                base_url: "http://localhost:11434/v1".to_string(),
                model: "llama3.1".to_string(),
                api_key_env: None,
            },
            remote: FileBackendConfig {
                base_url: "https://api.openai.com/v1".to_string(),
                model: "gpt-4o-mini".to_string(),
                api_key_env: Some("OPENAI_API_KEY".to_string()),
            },
            custom: HashMap::new(),
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct FileBackendConfig {
    pub base_url: String,
    pub model: String,
    /// Name of the environment variable holding the bearer token
    pub api_key_env: Option<String>,
}

impl FileBackendConfig {
    fn endpoint(&self) -> BackendEndpoint {
        let api_key = self
            .api_key_env
            .as_deref()
            .and_then(|name| std::env::var(name).ok());
        BackendEndpoint::new(&self.base_url, &self.model).with_api_key(api_key)
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct FileRosterConfig {
    pub roles: Vec<FileRoleConfig>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct FileRoleConfig {
    pub name: String,
    pub capabilities: Vec<String>,
    pub directive: String,
    /// Backend id: "local", "remote", or a custom backend name
    pub backend: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct FileStorageConfig {
    /// Directory holding the JSONL state journals
    pub state_dir: PathBuf,
    /// Memory journal file; unset keeps memory in-process only
    pub memory_journal: Option<PathBuf>,
}

impl Default for FileStorageConfig {
    fn default() -> Self {
        Self {
            state_dir: PathBuf::from(".foreman/state"),
            memory_journal: None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct FileEventsConfig {
    /// Broadcast channel capacity before slow subscribers miss events
    pub channel_capacity: usize,
}

impl Default for FileEventsConfig {
    fn default() -> Self {
        Self {
            channel_capacity: 64,
        }
    }
}

impl FileConfig {
    /// Resolve the backend table into gateway endpoints.
    pub fn endpoints(&self) -> HashMap<BackendId, BackendEndpoint> {
        let mut endpoints = HashMap::new();
        endpoints.insert(BackendId::Local, self.backends.local.endpoint());
        endpoints.insert(BackendId::Remote, self.backends.remote.endpoint());
        for (name, backend) in &self.backends.custom {
            endpoints.insert(BackendId::Custom(name.clone()), backend.endpoint());
        }
        endpoints
    }

    /// Build the role catalog: built-in team plus configured roles, with
    /// same-named configured roles replacing built-ins.
    pub fn catalog(&self) -> RoleCatalog {
        let mut catalog = RoleCatalog::builtin();
        for role in &self.roster.roles {
            let backend = role
                .backend
                .parse::<BackendId>()
                .unwrap_or(BackendId::Local);
            catalog.register(AgentRole::new(
                &role.name,
                role.capabilities.iter().cloned(),
                &role.directive,
                backend,
            ));
        }
        catalog
    }

    /// Check the configuration for problems worth telling the user about.
    /// Issues are reported, not fatal; loading still proceeds.
    pub fn validate(&self) -> Vec<String> {
        let mut issues = Vec::new();

        for (label, backend) in [
            ("backends.local", &self.backends.local),
            ("backends.remote", &self.backends.remote),
        ] {
            if backend.base_url.trim().is_empty() {
                issues.push(format!("{label}: base_url is empty"));
            }
            if backend.model.trim().is_empty() {
                issues.push(format!("{label}: model is empty"));
            }
        }

        for role in &self.roster.roles {
            if role.name.trim().is_empty() {
                issues.push("roster: role with empty name".to_string());
            }
            match role.backend.as_str() {
                "local" | "remote" => {}
                custom if self.backends.custom.contains_key(custom) => {}
                other => issues.push(format!(
                    "roster.{}: backend '{other}' is not configured",
                    role.name
                )),
            }
        }

        issues
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_are_valid() {
        let config = FileConfig::default();
        assert!(config.validate().is_empty());
        assert_eq!(config.engine.max_rounds, 8);
        assert_eq!(config.events.channel_capacity, 64);
    }

    #[test]
    fn test_parse_full_toml() {
        let config: FileConfig = toml::from_str(
            r#"
            [engine]
            max_rounds = 4
            local_timeout_ms = 1500

            [backends.local]
            base_url = "http://127.0.0.1:8080/v1"
            model = "qwen2.5"

            [backends.custom.fast]
            base_url = "http://127.0.0.1:9090/v1"
            model = "phi3"

            [[roster.roles]]
            name = "security_reviewer"
            capabilities = ["risk-analysis"]
            directive = "Call out security risks as RISK lines."
            backend = "fast"

            [storage]
            state_dir = "/tmp/foreman-state"
            "#,
        )
        .unwrap();

        assert_eq!(config.engine.max_rounds, 4);
        assert_eq!(config.engine.local_timeout_ms, 1500);
        // Untouched engine fields keep their defaults.
        assert_eq!(config.engine.remote_timeout_ms, 5000);
        assert_eq!(config.backends.local.model, "qwen2.5");
        assert!(config.validate().is_empty());

        let endpoints = config.endpoints();
        assert!(endpoints.contains_key(&BackendId::Custom("fast".to_string())));

        let catalog = config.catalog();
        assert!(catalog.get("security_reviewer").is_some());
        assert!(catalog.get("architect").is_some());
    }

    #[test]
    fn test_configured_role_replaces_builtin() {
        let config: FileConfig = toml::from_str(
            r#"
            [[roster.roles]]
            name = "developer"
            capabilities = ["code"]
            directive = "Write terse TASK lines only."
            backend = "remote"
            "#,
        )
        .unwrap();

        let catalog = config.catalog();
        let developer = catalog.get("developer").unwrap();
        assert_eq!(developer.directive, "Write terse TASK lines only.");
        assert_eq!(developer.preferred_backend, BackendId::Remote);
    }

    #[test]
    fn test_validate_flags_unknown_backend() {
        let config: FileConfig = toml::from_str(
            r#"
            [[roster.roles]]
            name = "reviewer"
            directive = "Review."
            backend = "gpu-cluster"
            "#,
        )
        .unwrap();

        let issues = config.validate();
        assert_eq!(issues.len(), 1);
        assert!(issues[0].contains("gpu-cluster"));
    }

    #[test]
    fn test_validate_flags_empty_model() {
        let config: FileConfig = toml::from_str(
            r#"
            [backends.remote]
            base_url = "https://api.example.com/v1"
            model = ""
            "#,
        )
        .unwrap();

        assert!(config.validate().iter().any(|i| i.contains("model is empty")));
    }
}
