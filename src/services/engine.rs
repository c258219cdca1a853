//! Container engine capability surface.
//!
//! The orchestrator only talks to the engine through [`Engine`]; the Docker
//! implementation lives in `docker.rs`. Every call is blocking and bounded by
//! the implementation's timeout.

use serde_json::Value;
use std::collections::BTreeMap;

#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum EngineError {
    #[error("not found: {0}")]
    NotFound(String),
    #[error("conflict: {0}")]
    Conflict(String),
    /// The object was already in the requested state (e.g. start on a running container).
    #[error("already in requested state")]
    NotModified,
    #[error("engine unreachable: {0}")]
    Unreachable(String),
    #[error("engine error {status}: {message}")]
    Api { status: u16, message: String },
}

pub type EngineResult<T> = Result<T, EngineError>;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContainerSpec {
    pub name: String,
    pub image: String,
    pub env: BTreeMap<String, String>,
    pub network: String,
    /// `source:target[:mode]` binds; a bare name as source is a named volume.
    pub mounts: Vec<String>,
    /// Published as the same port on the host, e.g. `30303/tcp`.
    pub ports: Vec<String>,
    pub restart_policy: Option<String>,
}

impl ContainerSpec {
    pub fn env_list(&self) -> Vec<String> {
        self.env.iter().map(|(k, v)| format!("{k}={v}")).collect()
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ContainerDetails {
    pub running: bool,
    /// Networks the container is attached to.
    pub networks: Vec<String>,
    pub env: BTreeMap<String, String>,
    /// Full engine metadata as returned by inspect.
    pub metadata: Value,
}

impl ContainerDetails {
    pub fn attached_to(&self, network: &str) -> bool {
        self.networks.iter().any(|n| n == network)
    }
}

pub trait Engine {
    fn inspect_network(&self, name: &str) -> EngineResult<()>;
    fn create_network(&self, name: &str) -> EngineResult<()>;
    fn remove_network(&self, name: &str) -> EngineResult<()>;

    fn inspect_volume(&self, name: &str) -> EngineResult<()>;
    fn create_volume(&self, name: &str) -> EngineResult<()>;
    fn remove_volume(&self, name: &str) -> EngineResult<()>;

    fn pull_image(&self, image: &str) -> EngineResult<()>;

    fn create_container(&self, spec: &ContainerSpec) -> EngineResult<()>;
    fn start_container(&self, name: &str) -> EngineResult<()>;
    fn stop_container(&self, name: &str) -> EngineResult<()>;
    fn remove_container(&self, name: &str) -> EngineResult<()>;
    fn rename_container(&self, name: &str, new_name: &str) -> EngineResult<()>;
    fn inspect_container(&self, name: &str) -> EngineResult<ContainerDetails>;
}

/// Stand-in used when no client could be built; every call reports the
/// engine as unreachable, so commands that never touch the engine still run.
#[derive(Debug, Clone)]
pub struct Unavailable {
    reason: String,
}

impl Unavailable {
    pub fn new(reason: impl Into<String>) -> Self {
        Self {
            reason: reason.into(),
        }
    }

    fn fail<T>(&self) -> EngineResult<T> {
        Err(EngineError::Unreachable(self.reason.clone()))
    }
}

impl Engine for Unavailable {
    fn inspect_network(&self, _name: &str) -> EngineResult<()> {
        self.fail()
    }
    fn create_network(&self, _name: &str) -> EngineResult<()> {
        self.fail()
    }
    fn remove_network(&self, _name: &str) -> EngineResult<()> {
        self.fail()
    }
    fn inspect_volume(&self, _name: &str) -> EngineResult<()> {
        self.fail()
    }
    fn create_volume(&self, _name: &str) -> EngineResult<()> {
        self.fail()
    }
    fn remove_volume(&self, _name: &str) -> EngineResult<()> {
        self.fail()
    }
    fn pull_image(&self, _image: &str) -> EngineResult<()> {
        self.fail()
    }
    fn create_container(&self, _spec: &ContainerSpec) -> EngineResult<()> {
        self.fail()
    }
    fn start_container(&self, _name: &str) -> EngineResult<()> {
        self.fail()
    }
    fn stop_container(&self, _name: &str) -> EngineResult<()> {
        self.fail()
    }
    fn remove_container(&self, _name: &str) -> EngineResult<()> {
        self.fail()
    }
    fn rename_container(&self, _name: &str, _new_name: &str) -> EngineResult<()> {
        self.fail()
    }
    fn inspect_container(&self, _name: &str) -> EngineResult<ContainerDetails> {
        self.fail()
    }
}

/// Split `KEY=value` entries as reported by the engine.
pub fn parse_env(entries: &[String]) -> BTreeMap<String, String> {
    entries
        .iter()
        .filter_map(|e| e.split_once('='))
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn env_round_trips_through_engine_form() {
        let spec = ContainerSpec {
            name: "n".to_string(),
            image: "i".to_string(),
            env: BTreeMap::from([
                ("A".to_string(), "1".to_string()),
                ("B".to_string(), "x=y".to_string()),
            ]),
            network: "net".to_string(),
            mounts: vec![],
            ports: vec![],
            restart_policy: None,
        };
        let list = spec.env_list();
        assert_eq!(list, vec!["A=1".to_string(), "B=x=y".to_string()]);
        assert_eq!(parse_env(&list), spec.env);
    }

    #[test]
    fn unavailable_engine_reports_unreachable() {
        let engine = Unavailable::new("no socket");
        assert_eq!(
            engine.create_network("n"),
            Err(EngineError::Unreachable("no socket".to_string()))
        );
        assert!(matches!(
            engine.inspect_container("c"),
            Err(EngineError::Unreachable(_))
        ));
    }

    #[test]
    fn entries_without_separator_are_skipped() {
        let parsed = parse_env(&["PATH".to_string(), "X=1".to_string()]);
        assert_eq!(parsed.len(), 1);
        assert_eq!(parsed["X"], "1");
    }
}
