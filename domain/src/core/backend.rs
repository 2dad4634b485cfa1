//! Backend identifier value object

use serde::{Deserialize, Serialize};
use std::str::FromStr;

/// An inference backend the coordinator can route prompts to (Value Object)
///
/// The coordinator always knows at least two independently-failing backends:
/// a fast local model and a richer remote model.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BackendId {
    /// Locally hosted model, fast but limited
    Local,
    /// Remote hosted model, richer but slower
    Remote,
    /// Custom-named backend from configuration
    Custom(String),
}

impl BackendId {
    /// Get the string identifier for this backend
    pub fn as_str(&self) -> &str {
        match self {
            BackendId::Local => "local",
            BackendId::Remote => "remote",
            BackendId::Custom(s) => s,
        }
    }
}

impl FromStr for BackendId {
    type Err = std::convert::Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(match s {
            "local" => BackendId::Local,
            "remote" => BackendId::Remote,
            other => BackendId::Custom(other.to_string()),
        })
    }
}

impl std::fmt::Display for BackendId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_known_backends_round_trip() {
        assert_eq!("local".parse::<BackendId>().unwrap(), BackendId::Local);
        assert_eq!("remote".parse::<BackendId>().unwrap(), BackendId::Remote);
        assert_eq!(BackendId::Remote.as_str(), "remote");
    }

    #[test]
    fn test_custom_backend() {
        let backend: BackendId = "gpu-box".parse().unwrap();
        assert_eq!(backend, BackendId::Custom("gpu-box".to_string()));
        assert_eq!(backend.to_string(), "gpu-box");
    }
}
