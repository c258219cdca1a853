//! Docker implementation of the engine capability surface (bollard).
//!
//! bollard is async; each call is driven to completion on a private
//! current-thread runtime and bounded by a timeout, so the rest of the crate
//! stays a linear sequence of blocking calls.

use crate::services::engine::{
    parse_env, ContainerDetails, ContainerSpec, Engine, EngineError, EngineResult,
};
use bollard::container::{
    Config, CreateContainerOptions, InspectContainerOptions, RemoveContainerOptions,
    RenameContainerOptions, StartContainerOptions, StopContainerOptions,
};
use bollard::image::CreateImageOptions;
use bollard::models::{HostConfig, PortBinding, RestartPolicy, RestartPolicyNameEnum};
use bollard::network::{CreateNetworkOptions, InspectNetworkOptions};
use bollard::volume::{CreateVolumeOptions, RemoveVolumeOptions};
use bollard::Docker;
use futures_util::TryStreamExt;
use std::collections::HashMap;
use std::future::Future;
use std::time::Duration;
use tracing::debug;

pub struct DockerEngine {
    docker: Docker,
    runtime: tokio::runtime::Runtime,
    timeout: Duration,
    pull_timeout: Duration,
}

impl DockerEngine {
    /// Build a client for `endpoint` (`unix://`, `tcp://` or `http://`), or
    /// the local defaults when `None`. No request is made until first use.
    pub fn connect(
        endpoint: Option<&str>,
        timeout: Duration,
        pull_timeout: Duration,
    ) -> EngineResult<Self> {
        let runtime = tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()
            .map_err(|e| EngineError::Unreachable(e.to_string()))?;
        let docker = {
            let _guard = runtime.enter();
            connect(endpoint, timeout)?
        };
        Ok(Self {
            docker,
            runtime,
            timeout,
            pull_timeout,
        })
    }

    fn call<T, F>(&self, what: &str, target: &str, fut: F) -> EngineResult<T>
    where
        F: Future<Output = Result<T, bollard::errors::Error>>,
    {
        self.call_within(self.timeout, what, target, fut)
    }

    fn call_within<T, F>(&self, limit: Duration, what: &str, target: &str, fut: F) -> EngineResult<T>
    where
        F: Future<Output = Result<T, bollard::errors::Error>>,
    {
        debug!(op = what, resource = %target, "engine call");
        let _guard = self.runtime.enter();
        match self.runtime.block_on(tokio::time::timeout(limit, fut)) {
            Ok(Ok(v)) => Ok(v),
            Ok(Err(e)) => {
                let err = classify(e);
                debug!(op = what, resource = %target, error = %err, "engine call failed");
                Err(err)
            }
            Err(_) => Err(EngineError::Unreachable(format!(
                "{what} {target} timed out after {}s",
                limit.as_secs()
            ))),
        }
    }
}

fn connect(endpoint: Option<&str>, timeout: Duration) -> EngineResult<Docker> {
    let secs = timeout.as_secs();
    let docker = match endpoint {
        None => Docker::connect_with_local_defaults(),
        #[cfg(unix)]
        Some(e) if e.starts_with("unix://") => {
            Docker::connect_with_unix(e, secs, bollard::API_DEFAULT_VERSION)
        }
        Some(e) if e.starts_with("tcp://") || e.starts_with("http://") => {
            Docker::connect_with_http(e, secs, bollard::API_DEFAULT_VERSION)
        }
        Some(e) => {
            return Err(EngineError::Unreachable(format!(
                "unsupported docker endpoint: {e}"
            )))
        }
    };
    docker.map_err(|e| EngineError::Unreachable(e.to_string()))
}

fn classify(err: bollard::errors::Error) -> EngineError {
    use bollard::errors::Error;
    match err {
        Error::DockerResponseServerError {
            status_code: 304, ..
        } => EngineError::NotModified,
        Error::DockerResponseServerError {
            status_code: 404,
            message,
        } => EngineError::NotFound(message),
        Error::DockerResponseServerError {
            status_code: 409,
            message,
        } => EngineError::Conflict(message),
        Error::DockerResponseServerError {
            status_code,
            message,
        } => EngineError::Api {
            status: status_code,
            message,
        },
        // Reported by the daemon inside a progress stream, e.g. a failed pull.
        Error::DockerStreamError { error } => EngineError::Api {
            status: 0,
            message: error,
        },
        other => EngineError::Unreachable(other.to_string()),
    }
}

/// `repo[:tag]`, where a colon inside a registry host does not start a tag.
fn split_image(image: &str) -> (String, String) {
    match image.rsplit_once(':') {
        Some((repo, tag)) if !tag.contains('/') => (repo.to_string(), tag.to_string()),
        _ => (image.to_string(), "latest".to_string()),
    }
}

fn restart_policy(name: &str) -> RestartPolicy {
    let name = match name {
        "always" => RestartPolicyNameEnum::ALWAYS,
        "unless-stopped" => RestartPolicyNameEnum::UNLESS_STOPPED,
        "on-failure" => RestartPolicyNameEnum::ON_FAILURE,
        _ => RestartPolicyNameEnum::NO,
    };
    RestartPolicy {
        name: Some(name),
        maximum_retry_count: None,
    }
}

impl Engine for DockerEngine {
    fn inspect_network(&self, name: &str) -> EngineResult<()> {
        self.call(
            "inspect network",
            name,
            self.docker
                .inspect_network(name, None::<InspectNetworkOptions<String>>),
        )
        .map(|_| ())
    }

    fn create_network(&self, name: &str) -> EngineResult<()> {
        let options = CreateNetworkOptions {
            name: name.to_string(),
            check_duplicate: true,
            driver: "bridge".to_string(),
            ..Default::default()
        };
        self.call("create network", name, self.docker.create_network(options))
            .map(|_| ())
    }

    fn remove_network(&self, name: &str) -> EngineResult<()> {
        self.call("remove network", name, self.docker.remove_network(name))
    }

    fn inspect_volume(&self, name: &str) -> EngineResult<()> {
        self.call("inspect volume", name, self.docker.inspect_volume(name))
            .map(|_| ())
    }

    fn create_volume(&self, name: &str) -> EngineResult<()> {
        let options = CreateVolumeOptions {
            name: name.to_string(),
            driver: "local".to_string(),
            ..Default::default()
        };
        self.call("create volume", name, self.docker.create_volume(options))
            .map(|_| ())
    }

    fn remove_volume(&self, name: &str) -> EngineResult<()> {
        self.call(
            "remove volume",
            name,
            self.docker.remove_volume(name, None::<RemoveVolumeOptions>),
        )
    }

    fn pull_image(&self, image: &str) -> EngineResult<()> {
        let (repo, tag) = split_image(image);
        let options = CreateImageOptions {
            from_image: repo,
            tag,
            ..Default::default()
        };
        let pull = self
            .docker
            .create_image(Some(options), None, None)
            .try_collect::<Vec<_>>();
        self.call_within(self.pull_timeout, "pull image", image, pull)
            .map(|_| ())
    }

    fn create_container(&self, spec: &ContainerSpec) -> EngineResult<()> {
        let mut exposed_ports = HashMap::new();
        let mut port_bindings = HashMap::new();
        for port in &spec.ports {
            let host_port = port.split('/').next().unwrap_or(port).to_string();
            exposed_ports.insert(port.clone(), HashMap::new());
            port_bindings.insert(
                port.clone(),
                Some(vec![PortBinding {
                    host_ip: None,
                    host_port: Some(host_port),
                }]),
            );
        }
        let host_config = HostConfig {
            binds: Some(spec.mounts.clone()),
            network_mode: Some(spec.network.clone()),
            port_bindings: Some(port_bindings),
            restart_policy: spec.restart_policy.as_deref().map(restart_policy),
            ..Default::default()
        };
        let config = Config {
            image: Some(spec.image.clone()),
            env: Some(spec.env_list()),
            exposed_ports: Some(exposed_ports),
            host_config: Some(host_config),
            ..Default::default()
        };
        let options = CreateContainerOptions {
            name: spec.name.clone(),
            ..Default::default()
        };
        self.call(
            "create container",
            &spec.name,
            self.docker.create_container(Some(options), config),
        )
        .map(|_| ())
    }

    fn start_container(&self, name: &str) -> EngineResult<()> {
        self.call(
            "start container",
            name,
            self.docker
                .start_container(name, None::<StartContainerOptions<String>>),
        )
    }

    fn stop_container(&self, name: &str) -> EngineResult<()> {
        self.call(
            "stop container",
            name,
            self.docker.stop_container(name, None::<StopContainerOptions>),
        )
    }

    fn remove_container(&self, name: &str) -> EngineResult<()> {
        let options = RemoveContainerOptions {
            force: true,
            ..Default::default()
        };
        self.call(
            "remove container",
            name,
            self.docker.remove_container(name, Some(options)),
        )
    }

    fn rename_container(&self, name: &str, new_name: &str) -> EngineResult<()> {
        let options = RenameContainerOptions {
            name: new_name.to_string(),
        };
        self.call(
            "rename container",
            name,
            self.docker.rename_container(name, options),
        )
    }

    fn inspect_container(&self, name: &str) -> EngineResult<ContainerDetails> {
        let resp = self.call(
            "inspect container",
            name,
            self.docker
                .inspect_container(name, None::<InspectContainerOptions>),
        )?;
        let metadata = serde_json::to_value(&resp).unwrap_or_default();
        let config = resp.config.as_ref();
        let mut networks: Vec<String> = resp
            .network_settings
            .as_ref()
            .and_then(|n| n.networks.as_ref())
            .map(|m| m.keys().cloned().collect())
            .unwrap_or_default();
        if let Some(mode) = resp.host_config.as_ref().and_then(|h| h.network_mode.clone()) {
            if !networks.contains(&mode) {
                networks.push(mode);
            }
        }
        Ok(ContainerDetails {
            running: resp.state.as_ref().and_then(|s| s.running).unwrap_or(false),
            networks,
            env: parse_env(config.and_then(|c| c.env.as_deref()).unwrap_or(&[])),
            metadata,
        })
    }
}
