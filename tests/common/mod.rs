#![allow(dead_code)]

use assert_cmd::cargo::cargo_bin_cmd;
use assert_cmd::Command;
use clap::Parser;
use serde_json::{json, Value};
use std::cell::{Cell, RefCell};
use std::collections::{BTreeMap, BTreeSet};
use std::fs;
use std::path::PathBuf;
use tempfile::TempDir;
use tmnd::cli::Cli;
use tmnd::commands::{self, Context};
use tmnd::domain::models::NodeIdentity;
use tmnd::services::engine::{ContainerDetails, ContainerSpec, Engine, EngineError, EngineResult};
use tmnd::services::environments::EnvironmentRegistry;
use tmnd::services::storage::ResourceStore;

pub const PKEY: &str = "012345678901234567890123456789012345678901234567890123456789012345";

#[derive(Debug, Clone)]
pub struct FakeContainer {
    pub spec: ContainerSpec,
    pub running: bool,
    /// Increases with every create, so recreation is observable.
    pub serial: u64,
}

#[derive(Default)]
struct FakeState {
    networks: BTreeSet<String>,
    volumes: BTreeSet<String>,
    images: BTreeSet<String>,
    containers: BTreeMap<String, FakeContainer>,
    serial: u64,
}

/// In-memory engine that records every call.
#[derive(Default)]
pub struct FakeEngine {
    state: RefCell<FakeState>,
    calls: RefCell<Vec<String>>,
    unreachable_after: Cell<Option<usize>>,
    failing_pulls: RefCell<BTreeSet<String>>,
}

impl FakeEngine {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn calls(&self) -> Vec<String> {
        self.calls.borrow().clone()
    }

    /// Calls that change engine state.
    pub fn mutating_calls(&self) -> Vec<String> {
        self.calls()
            .into_iter()
            .filter(|c| !c.starts_with("inspect"))
            .collect()
    }

    pub fn clear_calls(&self) {
        self.calls.borrow_mut().clear();
    }

    pub fn set_unreachable(&self) {
        self.unreachable_after.set(Some(self.calls.borrow().len()));
    }

    /// Let `n` more calls through, then fail every call as unreachable.
    pub fn unreachable_after(&self, n: usize) {
        self.unreachable_after
            .set(Some(self.calls.borrow().len() + n));
    }

    /// Make pulls of `image` fail the way a registry error does.
    pub fn fail_pull(&self, image: &str) {
        self.failing_pulls.borrow_mut().insert(image.to_string());
    }

    pub fn set_reachable(&self) {
        self.unreachable_after.set(None);
    }

    pub fn has_network(&self, name: &str) -> bool {
        self.state.borrow().networks.contains(name)
    }

    pub fn has_volume(&self, name: &str) -> bool {
        self.state.borrow().volumes.contains(name)
    }

    pub fn container(&self, name: &str) -> Option<FakeContainer> {
        self.state.borrow().containers.get(name).cloned()
    }

    pub fn container_names(&self) -> Vec<String> {
        self.state.borrow().containers.keys().cloned().collect()
    }

    pub fn insert_container(&self, spec: ContainerSpec, running: bool) {
        let mut state = self.state.borrow_mut();
        state.serial += 1;
        let serial = state.serial;
        state.containers.insert(
            spec.name.clone(),
            FakeContainer {
                spec,
                running,
                serial,
            },
        );
    }

    pub fn drop_container(&self, name: &str) {
        self.state.borrow_mut().containers.remove(name);
    }

    pub fn set_running(&self, name: &str, running: bool) {
        if let Some(c) = self.state.borrow_mut().containers.get_mut(name) {
            c.running = running;
        }
    }

    pub fn rename(&self, from: &str, to: &str) {
        let mut state = self.state.borrow_mut();
        if let Some(mut c) = state.containers.remove(from) {
            c.spec.name = to.to_string();
            state.containers.insert(to.to_string(), c);
        }
    }

    fn call(&self, entry: String) -> EngineResult<()> {
        let mut calls = self.calls.borrow_mut();
        let index = calls.len();
        calls.push(entry);
        match self.unreachable_after.get() {
            Some(limit) if index >= limit => {
                Err(EngineError::Unreachable("connection refused".to_string()))
            }
            _ => Ok(()),
        }
    }
}

fn not_found(what: &str, name: &str) -> EngineError {
    EngineError::NotFound(format!("no such {what}: {name}"))
}

impl Engine for FakeEngine {
    fn inspect_network(&self, name: &str) -> EngineResult<()> {
        self.call(format!("inspect_network {name}"))?;
        if self.has_network(name) {
            Ok(())
        } else {
            Err(not_found("network", name))
        }
    }

    fn create_network(&self, name: &str) -> EngineResult<()> {
        self.call(format!("create_network {name}"))?;
        if !self.state.borrow_mut().networks.insert(name.to_string()) {
            return Err(EngineError::Conflict(format!("network {name} already exists")));
        }
        Ok(())
    }

    fn remove_network(&self, name: &str) -> EngineResult<()> {
        self.call(format!("remove_network {name}"))?;
        let mut state = self.state.borrow_mut();
        if state.containers.values().any(|c| c.spec.network == name) {
            return Err(EngineError::Api {
                status: 403,
                message: format!("network {name} has active endpoints"),
            });
        }
        if !state.networks.remove(name) {
            return Err(not_found("network", name));
        }
        Ok(())
    }

    fn inspect_volume(&self, name: &str) -> EngineResult<()> {
        self.call(format!("inspect_volume {name}"))?;
        if self.has_volume(name) {
            Ok(())
        } else {
            Err(not_found("volume", name))
        }
    }

    fn create_volume(&self, name: &str) -> EngineResult<()> {
        self.call(format!("create_volume {name}"))?;
        self.state.borrow_mut().volumes.insert(name.to_string());
        Ok(())
    }

    fn remove_volume(&self, name: &str) -> EngineResult<()> {
        self.call(format!("remove_volume {name}"))?;
        let mut state = self.state.borrow_mut();
        let prefix = format!("{name}:");
        if state
            .containers
            .values()
            .any(|c| c.spec.mounts.iter().any(|m| m.starts_with(&prefix)))
        {
            return Err(EngineError::Conflict(format!("volume {name} is in use")));
        }
        if !state.volumes.remove(name) {
            return Err(not_found("volume", name));
        }
        Ok(())
    }

    fn pull_image(&self, image: &str) -> EngineResult<()> {
        self.call(format!("pull_image {image}"))?;
        if self.failing_pulls.borrow().contains(image) {
            return Err(EngineError::Api {
                status: 0,
                message: "toomanyrequests: rate limit exceeded".to_string(),
            });
        }
        self.state.borrow_mut().images.insert(image.to_string());
        Ok(())
    }

    fn create_container(&self, spec: &ContainerSpec) -> EngineResult<()> {
        self.call(format!("create_container {}", spec.name))?;
        {
            let state = self.state.borrow();
            if state.containers.contains_key(&spec.name) {
                return Err(EngineError::Conflict(format!(
                    "container name {} is already in use",
                    spec.name
                )));
            }
            if !state.networks.contains(&spec.network) {
                return Err(not_found("network", &spec.network));
            }
        }
        self.insert_container(spec.clone(), false);
        Ok(())
    }

    fn start_container(&self, name: &str) -> EngineResult<()> {
        self.call(format!("start_container {name}"))?;
        let mut state = self.state.borrow_mut();
        let c = state
            .containers
            .get_mut(name)
            .ok_or_else(|| not_found("container", name))?;
        if c.running {
            return Err(EngineError::NotModified);
        }
        c.running = true;
        Ok(())
    }

    fn stop_container(&self, name: &str) -> EngineResult<()> {
        self.call(format!("stop_container {name}"))?;
        let mut state = self.state.borrow_mut();
        let c = state
            .containers
            .get_mut(name)
            .ok_or_else(|| not_found("container", name))?;
        if !c.running {
            return Err(EngineError::NotModified);
        }
        c.running = false;
        Ok(())
    }

    fn remove_container(&self, name: &str) -> EngineResult<()> {
        self.call(format!("remove_container {name}"))?;
        self.state
            .borrow_mut()
            .containers
            .remove(name)
            .map(|_| ())
            .ok_or_else(|| not_found("container", name))
    }

    fn rename_container(&self, name: &str, new_name: &str) -> EngineResult<()> {
        self.call(format!("rename_container {name} {new_name}"))?;
        {
            let state = self.state.borrow();
            if !state.containers.contains_key(name) {
                return Err(not_found("container", name));
            }
            if state.containers.contains_key(new_name) {
                return Err(EngineError::Conflict(format!("{new_name} is already in use")));
            }
        }
        self.rename(name, new_name);
        Ok(())
    }

    fn inspect_container(&self, name: &str) -> EngineResult<ContainerDetails> {
        self.call(format!("inspect_container {name}"))?;
        let c = self
            .container(name)
            .ok_or_else(|| not_found("container", name))?;
        let status = if c.running { "running" } else { "exited" };
        Ok(ContainerDetails {
            running: c.running,
            networks: vec![c.spec.network.clone()],
            env: c.spec.env.clone(),
            metadata: json!({
                "Name": format!("/{name}"),
                "Config": {"Image": c.spec.image, "Env": c.spec.env_list()},
                "State": {"Running": c.running, "Status": status},
                "HostConfig": {"Binds": c.spec.mounts, "NetworkMode": c.spec.network},
            }),
        })
    }
}

/// Library-level harness: real command handlers against the fake engine and
/// a store in a temp dir.
pub struct Harness {
    _tmp: TempDir,
    pub store: ResourceStore,
    pub registry: EnvironmentRegistry,
    pub engine: FakeEngine,
}

impl Harness {
    pub fn new() -> Self {
        let tmp = TempDir::new().expect("create temp dir");
        let store = ResourceStore::open(&tmp.path().join("tmnd"));
        Self {
            _tmp: tmp,
            store,
            registry: EnvironmentRegistry::builtin(),
            engine: FakeEngine::new(),
        }
    }

    pub fn output(&self, args: &[&str]) -> String {
        let cli = Cli::try_parse_from(std::iter::once("tmnd").chain(args.iter().copied()))
            .expect("valid arguments");
        let command = cli.command.expect("a subcommand");
        let ctx = Context {
            engine: &self.engine,
            store: &self.store,
            registry: &self.registry,
            json: cli.json,
        };
        let mut buf = Vec::new();
        commands::run(&command, &ctx, &mut buf).expect("command completes");
        String::from_utf8(buf).expect("utf8 output")
    }

    pub fn run(&self, args: &[&str]) -> Vec<String> {
        self.output(args).lines().map(str::to_string).collect()
    }

    pub fn run_json(&self, args: &[&str]) -> Value {
        let mut full = vec!["--json"];
        full.extend_from_slice(args);
        serde_json::from_str(&self.output(&full)).expect("valid json output")
    }

    pub fn start_test1(&self) -> Vec<String> {
        self.run(&["start", "--name", "test1", "--net", "devnet", "--pkey", PKEY])
    }

    pub fn remembered(&self) -> Option<NodeIdentity> {
        self.store.load().expect("store readable")
    }
}

pub fn assert_no_failures(lines: &[String]) {
    for line in lines {
        assert!(!line.contains('✗'), "unexpected failure line: {line}");
    }
}

/// Binary-level environment with an isolated HOME.
pub struct TestEnv {
    _tmp: TempDir,
    pub home: PathBuf,
}

impl TestEnv {
    pub fn new() -> Self {
        let tmp = TempDir::new().expect("create temp dir");
        let home = tmp.path().join("home");
        fs::create_dir_all(&home).expect("create isolated home");
        Self { _tmp: tmp, home }
    }

    pub fn cmd(&self) -> Command {
        let mut cmd = cargo_bin_cmd!("tmnd");
        cmd.env("HOME", &self.home)
            .env_remove("DOCKER_HOST")
            .env_remove("TMND_LOG");
        cmd
    }

    pub fn remember(&self, name: &str, net: &str) {
        let dir = self.home.join(".config/tmnd");
        fs::create_dir_all(&dir).expect("create config dir");
        fs::write(
            dir.join("resources.json"),
            json!({"id": name, "name": name, "net": net}).to_string(),
        )
        .expect("write resource record");
    }

    pub fn stdout(&self, args: &[&str]) -> String {
        let out = self
            .cmd()
            .args(args)
            .assert()
            .success()
            .get_output()
            .stdout
            .clone();
        String::from_utf8(out).expect("utf8 output")
    }

    pub fn run_json(&self, args: &[&str]) -> Value {
        let out = self
            .cmd()
            .arg("--json")
            .args(args)
            .assert()
            .success()
            .get_output()
            .stdout
            .clone();
        serde_json::from_slice(&out).expect("valid json output")
    }
}
