//! Fullnode lifecycle state machine.
//!
//! The node state is never stored: every transition starts from what the
//! engine reports for the derived resource names. Engine failures are turned
//! into per-resource report steps and the transition carries on, except
//! [`EngineError::Unreachable`], which aborts the transition and is returned.
//! No rollback is attempted; a later `start`/`update` resumes from whatever
//! partial state is left.

use crate::domain::constants::{
    CHAINDATA_MOUNT, IDENTITY_ENV, P2P_PORT, PRIVATE_KEY_ENV, REDACTED, RESTART_POLICY,
};
use crate::domain::models::{
    ContainerInspect, ContainerState, InspectReport, LifecycleReport, NodeIdentity, NodeState,
    Observation, ResourceStatus, Role, StatusReport, Step,
};
use crate::services::engine::{ContainerDetails, ContainerSpec, Engine, EngineError, EngineResult};
use crate::services::environments::{EnvironmentRegistry, RegistryError};
use serde_json::Value;
use tracing::{debug, info, warn};

pub struct Orchestrator<'a, E: Engine + ?Sized> {
    engine: &'a E,
    registry: &'a EnvironmentRegistry,
}

fn label(kind: &str, name: &str) -> String {
    format!("{kind} {name}")
}

fn present(result: EngineResult<()>) -> EngineResult<bool> {
    match result {
        Ok(()) => Ok(true),
        Err(EngineError::NotFound(_)) => Ok(false),
        Err(e) => Err(e),
    }
}

fn found(result: EngineResult<ContainerDetails>) -> EngineResult<Option<ContainerDetails>> {
    match result {
        Ok(d) => Ok(Some(d)),
        Err(EngineError::NotFound(_)) => Ok(None),
        Err(e) => Err(e),
    }
}

/// Unreachable aborts; anything else becomes a failed step.
fn record(
    report: &mut LifecycleReport,
    action: &str,
    subject: &str,
    err: EngineError,
) -> EngineResult<()> {
    if let EngineError::Unreachable(_) = err {
        return Err(err);
    }
    warn!(action, resource = %subject, error = %err, "engine operation failed");
    report.push(Step::failed(action, subject, err.to_string()));
    Ok(())
}

fn redact(mut metadata: Value) -> Value {
    let prefix = format!("{PRIVATE_KEY_ENV}=");
    if let Some(env) = metadata
        .pointer_mut("/Config/Env")
        .and_then(Value::as_array_mut)
    {
        for entry in env.iter_mut() {
            if entry.as_str().is_some_and(|s| s.starts_with(&prefix)) {
                *entry = Value::String(format!("{prefix}{REDACTED}"));
            }
        }
    }
    metadata
}

impl<'a, E: Engine + ?Sized> Orchestrator<'a, E> {
    pub fn new(engine: &'a E, registry: &'a EnvironmentRegistry) -> Self {
        Self { engine, registry }
    }

    pub fn observe(&self, identity: &NodeIdentity) -> EngineResult<Observation> {
        let set = identity.resources();
        Ok(Observation {
            network: present(self.engine.inspect_network(&set.network))?,
            volume: present(self.engine.inspect_volume(&set.volume))?,
            tomochain: self.container_state(&set.tomochain)?,
            metrics: self.container_state(&set.metrics)?,
        })
    }

    fn container_state(&self, name: &str) -> EngineResult<ContainerState> {
        Ok(match found(self.engine.inspect_container(name))? {
            None => ContainerState::Absent,
            Some(d) if d.running => ContainerState::Running,
            Some(_) => ContainerState::Stopped,
        })
    }

    /// Engine-level definition of a service container for `identity`.
    pub fn container_spec(
        &self,
        identity: &NodeIdentity,
        role: Role,
        pkey: Option<&str>,
    ) -> Result<ContainerSpec, RegistryError> {
        let set = identity.resources();
        let mut env = self.registry.lookup(&identity.net, role)?.clone();
        let image = self.registry.image(&identity.net, role)?.to_string();
        let mut mounts = Vec::new();
        let mut ports = Vec::new();
        if role == Role::Tomochain {
            env.insert(IDENTITY_ENV.to_string(), identity.name.clone());
            if let Some(pkey) = pkey {
                env.insert(PRIVATE_KEY_ENV.to_string(), pkey.to_string());
            }
            mounts.push(format!("{}:{}", set.volume, CHAINDATA_MOUNT));
            ports.push(format!("{P2P_PORT}/tcp"));
            ports.push(format!("{P2P_PORT}/udp"));
        }
        Ok(ContainerSpec {
            name: set.container(role).to_string(),
            image,
            env,
            network: set.network.clone(),
            mounts,
            ports,
            restart_policy: Some(RESTART_POLICY.to_string()),
        })
    }

    /// First-time configuration: build every resource and start both containers.
    pub fn start_new(
        &self,
        identity: &NodeIdentity,
        pkey: &str,
        report: &mut LifecycleReport,
    ) -> EngineResult<()> {
        let set = identity.resources();
        info!(node = %identity.name, net = %identity.net, "configuring new fullnode");
        self.ensure_network(&set.network, report)?;
        self.ensure_volume(&set.volume, report)?;
        for role in Role::ALL {
            self.pull(identity, role, report)?;
        }
        for role in Role::ALL {
            let key = (role == Role::Tomochain).then_some(pkey);
            self.ensure_container(identity, role, key, report)?;
        }
        report.state = Some(self.observe(identity)?.state());
        Ok(())
    }

    /// Bring a remembered fullnode to running, repairing what is missing.
    pub fn start_existing(
        &self,
        identity: &NodeIdentity,
        repair_pkey: Option<&str>,
        report: &mut LifecycleReport,
    ) -> EngineResult<()> {
        let set = identity.resources();
        let obs = self.observe(identity)?;
        debug!(node = %identity.name, state = obs.state().as_str(), "observed fullnode");

        if !obs.network {
            self.create_network(&set.network, report)?;
        }
        if !obs.volume {
            self.create_volume(&set.volume, report)?;
        }
        for role in Role::ALL {
            let name = set.container(role);
            match obs.container(role) {
                ContainerState::Running => {
                    report.push(Step::satisfied(
                        "start",
                        &label("container", name),
                        "already running",
                    ));
                }
                ContainerState::Stopped => self.start_container(name, report)?,
                ContainerState::Absent => {
                    if role == Role::Tomochain && repair_pkey.is_none() {
                        report.push(Step::failed(
                            "create",
                            &label("container", name),
                            "container is missing, run start again with --pkey to recreate it",
                        ));
                        continue;
                    }
                    self.pull(identity, role, report)?;
                    let key = if role == Role::Tomochain {
                        repair_pkey
                    } else {
                        None
                    };
                    self.create_and_start(identity, role, key, report)?;
                }
            }
        }
        report.state = Some(self.observe(identity)?.state());
        Ok(())
    }

    /// Stop both containers; network and volume stay.
    pub fn stop(&self, identity: &NodeIdentity, report: &mut LifecycleReport) -> EngineResult<()> {
        let set = identity.resources();
        let obs = self.observe(identity)?;
        for role in Role::ALL {
            let name = set.container(role);
            let subject = label("container", name);
            match obs.container(role) {
                ContainerState::Running => match self.engine.stop_container(name) {
                    Ok(()) => report.push(Step::done("stop", &subject)),
                    Err(EngineError::NotModified) => {
                        report.push(Step::satisfied("stop", &subject, "already stopped"))
                    }
                    Err(EngineError::NotFound(_)) => {
                        report.push(Step::satisfied("stop", &subject, "already absent"))
                    }
                    Err(e) => record(report, "stop", &subject, e)?,
                },
                ContainerState::Stopped => {
                    report.push(Step::satisfied("stop", &subject, "already stopped"))
                }
                ContainerState::Absent => {
                    report.push(Step::satisfied("stop", &subject, "already absent"))
                }
            }
        }
        report.state = Some(self.observe(identity)?.state());
        Ok(())
    }

    /// Recreate the node container from the current registry while keeping
    /// the chain data volume. The replacement is created under a staging
    /// name first; the old container is stopped only once that succeeded.
    pub fn update(&self, identity: &NodeIdentity, report: &mut LifecycleReport) -> EngineResult<()> {
        let set = identity.resources();
        let staging = set.staging_container();
        let node = label("container", &set.tomochain);

        let current = found(self.engine.inspect_container(&set.tomochain))?;
        let staged = found(self.engine.inspect_container(&staging))?;
        let current = match (current, staged) {
            (Some(current), Some(_)) => {
                debug!(container = %staging, "removing leftover staging container");
                if let Err(e) = self.engine.remove_container(&staging) {
                    if !matches!(e, EngineError::NotFound(_)) {
                        record(report, "remove", &label("container", &staging), e)?;
                        return Ok(());
                    }
                }
                current
            }
            (Some(current), None) => current,
            (None, Some(staged)) => {
                // An earlier update removed the old container but never swapped names.
                match self.engine.rename_container(&staging, &set.tomochain) {
                    Ok(()) => report.push(Step::done("rename", &label("container", &staging))),
                    Err(e) => {
                        record(report, "rename", &label("container", &staging), e)?;
                        return Ok(());
                    }
                }
                staged
            }
            (None, None) => {
                report.push(Step::failed(
                    "update",
                    &node,
                    "container is missing, run start with --pkey to recreate it",
                ));
                report.state = Some(self.observe(identity)?.state());
                return Ok(());
            }
        };

        let Some(pkey) = current.env.get(PRIVATE_KEY_ENV).cloned() else {
            report.push(Step::failed(
                "update",
                &node,
                "private key not found in existing container",
            ));
            return Ok(());
        };

        self.pull(identity, Role::Tomochain, report)?;
        let mut spec = match self.container_spec(identity, Role::Tomochain, Some(&pkey)) {
            Ok(spec) => spec,
            Err(e) => {
                report.push(Step::failed("update", &node, e.to_string()));
                return Ok(());
            }
        };
        spec.name = staging.clone();
        if !self.create_container(&spec, report)? {
            return Ok(());
        }

        match self.engine.stop_container(&set.tomochain) {
            Ok(()) => report.push(Step::done("stop", &node)),
            Err(EngineError::NotModified) => {
                report.push(Step::satisfied("stop", &node, "already stopped"))
            }
            Err(EngineError::NotFound(_)) => {
                report.push(Step::satisfied("stop", &node, "already absent"))
            }
            Err(e) => record(report, "stop", &node, e)?,
        }
        match self.engine.remove_container(&set.tomochain) {
            Ok(()) => report.push(Step::done("remove", &node)),
            Err(EngineError::NotFound(_)) => {
                report.push(Step::satisfied("remove", &node, "already absent"))
            }
            Err(e) => {
                record(report, "remove", &node, e)?;
                return Ok(());
            }
        }
        match self.engine.rename_container(&staging, &set.tomochain) {
            Ok(()) => report.push(Step::done("rename", &label("container", &staging))),
            Err(e) => {
                record(report, "rename", &label("container", &staging), e)?;
                return Ok(());
            }
        }
        self.start_container(&set.tomochain, report)?;
        report.state = Some(self.observe(identity)?.state());
        Ok(())
    }

    /// Tear down every managed resource. Already-absent resources count as removed.
    pub fn remove(&self, identity: &NodeIdentity, report: &mut LifecycleReport) -> EngineResult<()> {
        let set = identity.resources();

        match self.engine.remove_container(&set.staging_container()) {
            Ok(()) | Err(EngineError::NotFound(_)) => {}
            Err(e) => record(report, "remove", &label("container", &set.staging_container()), e)?,
        }

        for role in Role::ALL {
            let name = set.container(role);
            let subject = label("container", name);
            match self.engine.stop_container(name) {
                Ok(()) | Err(EngineError::NotModified) | Err(EngineError::NotFound(_)) => {}
                Err(EngineError::Unreachable(m)) => return Err(EngineError::Unreachable(m)),
                Err(e) => debug!(container = %name, error = %e, "graceful stop failed, forcing removal"),
            }
            match self.engine.remove_container(name) {
                Ok(()) => report.push(Step::done("remove", &subject)),
                Err(EngineError::NotFound(_)) => {
                    report.push(Step::satisfied("remove", &subject, "already absent"))
                }
                Err(e) => record(report, "remove", &subject, e)?,
            }
        }

        let subject = label("volume", &set.volume);
        match self.engine.remove_volume(&set.volume) {
            Ok(()) => report.push(Step::done("remove", &subject)),
            Err(EngineError::NotFound(_)) => {
                report.push(Step::satisfied("remove", &subject, "already absent"))
            }
            Err(e) => record(report, "remove", &subject, e)?,
        }

        let subject = label("network", &set.network);
        match self.engine.remove_network(&set.network) {
            Ok(()) => report.push(Step::done("remove", &subject)),
            Err(EngineError::NotFound(_)) => {
                report.push(Step::satisfied("remove", &subject, "already absent"))
            }
            Err(e) => record(report, "remove", &subject, e)?,
        }

        report.state = Some(if report.has_failures() {
            self.observe(identity)?.state()
        } else {
            NodeState::Removed
        });
        Ok(())
    }

    pub fn status(&self, identity: &NodeIdentity) -> EngineResult<StatusReport> {
        let set = identity.resources();
        let obs = self.observe(identity)?;
        let presence = |p: bool| if p { "present" } else { "absent" }.to_string();
        let mut resources = vec![
            ResourceStatus {
                kind: "network".to_string(),
                name: set.network.clone(),
                state: presence(obs.network),
            },
            ResourceStatus {
                kind: "volume".to_string(),
                name: set.volume.clone(),
                state: presence(obs.volume),
            },
        ];
        for role in Role::ALL {
            resources.push(ResourceStatus {
                kind: role.as_str().to_string(),
                name: set.container(role).to_string(),
                state: obs.container(role).as_str().to_string(),
            });
        }
        Ok(StatusReport {
            node: identity.name.clone(),
            net: identity.net.clone(),
            state: obs.state(),
            resources,
        })
    }

    pub fn inspect(&self, identity: &NodeIdentity) -> EngineResult<InspectReport> {
        let set = identity.resources();
        let mut containers = Vec::new();
        for role in Role::ALL {
            let name = set.container(role);
            let details = found(self.engine.inspect_container(name))?;
            containers.push(ContainerInspect {
                role,
                name: name.to_string(),
                found: details.is_some(),
                metadata: details.map(|d| redact(d.metadata)),
            });
        }
        Ok(InspectReport {
            node: identity.name.clone(),
            containers,
        })
    }

    fn ensure_network(&self, name: &str, report: &mut LifecycleReport) -> EngineResult<()> {
        match present(self.engine.inspect_network(name)) {
            Ok(true) => {
                report.push(Step::satisfied(
                    "create",
                    &label("network", name),
                    "already exists",
                ));
                Ok(())
            }
            Ok(false) => self.create_network(name, report),
            Err(e) => record(report, "create", &label("network", name), e),
        }
    }

    fn create_network(&self, name: &str, report: &mut LifecycleReport) -> EngineResult<()> {
        let subject = label("network", name);
        match self.engine.create_network(name) {
            Ok(()) => report.push(Step::done("create", &subject)),
            Err(EngineError::Conflict(_)) => {
                report.push(Step::satisfied("create", &subject, "already exists"))
            }
            Err(e) => record(report, "create", &subject, e)?,
        }
        Ok(())
    }

    fn ensure_volume(&self, name: &str, report: &mut LifecycleReport) -> EngineResult<()> {
        match present(self.engine.inspect_volume(name)) {
            Ok(true) => {
                report.push(Step::satisfied(
                    "create",
                    &label("volume", name),
                    "already exists",
                ));
                Ok(())
            }
            Ok(false) => self.create_volume(name, report),
            Err(e) => record(report, "create", &label("volume", name), e),
        }
    }

    fn create_volume(&self, name: &str, report: &mut LifecycleReport) -> EngineResult<()> {
        let subject = label("volume", name);
        match self.engine.create_volume(name) {
            Ok(()) => report.push(Step::done("create", &subject)),
            Err(EngineError::Conflict(_)) => {
                report.push(Step::satisfied("create", &subject, "already exists"))
            }
            Err(e) => record(report, "create", &subject, e)?,
        }
        Ok(())
    }

    fn pull(&self, identity: &NodeIdentity, role: Role, report: &mut LifecycleReport) -> EngineResult<()> {
        let image = match self.registry.image(&identity.net, role) {
            Ok(image) => image,
            Err(e) => {
                report.push(Step::failed("pull", &label("image", role.as_str()), e.to_string()));
                return Ok(());
            }
        };
        let subject = label("image", image);
        match self.engine.pull_image(image) {
            Ok(()) => report.push(Step::done("pull", &subject)),
            Err(e) => record(report, "pull", &subject, e)?,
        }
        Ok(())
    }

    /// Create and start the role's container unless an earlier, interrupted
    /// run already created it on this node's network.
    fn ensure_container(
        &self,
        identity: &NodeIdentity,
        role: Role,
        pkey: Option<&str>,
        report: &mut LifecycleReport,
    ) -> EngineResult<()> {
        let set = identity.resources();
        let name = set.container(role);
        let subject = label("container", name);
        match found(self.engine.inspect_container(name)) {
            Ok(None) => self.create_and_start(identity, role, pkey, report),
            Ok(Some(existing)) if !existing.attached_to(&set.network) => {
                report.push(Step::failed(
                    "create",
                    &subject,
                    format!("name already in use by a container outside {}", set.network),
                ));
                Ok(())
            }
            Ok(Some(existing)) => {
                report.push(Step::satisfied("create", &subject, "already exists"));
                if existing.running {
                    report.push(Step::satisfied("start", &subject, "already running"));
                    Ok(())
                } else {
                    self.start_container(name, report)
                }
            }
            Err(e) => record(report, "create", &subject, e),
        }
    }

    fn create_and_start(
        &self,
        identity: &NodeIdentity,
        role: Role,
        pkey: Option<&str>,
        report: &mut LifecycleReport,
    ) -> EngineResult<()> {
        let spec = match self.container_spec(identity, role, pkey) {
            Ok(spec) => spec,
            Err(e) => {
                let subject = label("container", identity.resources().container(role));
                report.push(Step::failed("create", &subject, e.to_string()));
                return Ok(());
            }
        };
        if self.create_container(&spec, report)? {
            self.start_container(&spec.name, report)?;
        }
        Ok(())
    }

    /// `Ok(true)` when the container now exists under `spec.name`.
    fn create_container(&self, spec: &ContainerSpec, report: &mut LifecycleReport) -> EngineResult<bool> {
        let subject = label("container", &spec.name);
        match self.engine.create_container(spec) {
            Ok(()) => {
                report.push(Step::done("create", &subject));
                Ok(true)
            }
            Err(EngineError::Conflict(m)) => {
                report.push(Step::failed(
                    "create",
                    &subject,
                    format!("name already in use: {m}"),
                ));
                Ok(false)
            }
            Err(e) => record(report, "create", &subject, e).map(|_| false),
        }
    }

    fn start_container(&self, name: &str, report: &mut LifecycleReport) -> EngineResult<()> {
        let subject = label("container", name);
        match self.engine.start_container(name) {
            Ok(()) => report.push(Step::done("start", &subject)),
            Err(EngineError::NotModified) => {
                report.push(Step::satisfied("start", &subject, "already running"))
            }
            Err(e) => record(report, "start", &subject, e)?,
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn private_key_is_redacted_from_metadata() {
        let metadata = json!({
            "Name": "/test1_tomochain",
            "Config": {"Env": ["IDENTITY=test1", "PRIVATE_KEY=abcdef", "NETWORK_ID=90"]}
        });
        let redacted = redact(metadata);
        let env = redacted["Config"]["Env"].as_array().unwrap();
        assert_eq!(env[0], "IDENTITY=test1");
        assert_eq!(env[1], "PRIVATE_KEY=<redacted>");
        assert_eq!(env[2], "NETWORK_ID=90");
    }

    #[test]
    fn metadata_without_env_is_untouched() {
        let metadata = json!({"Name": "/x"});
        assert_eq!(redact(metadata.clone()), metadata);
    }
}
