use serde::{Deserialize, Serialize};
use serde_json::Value;

#[derive(Serialize)]
pub struct JsonOut<T: Serialize> {
    pub ok: bool,
    pub data: T,
}

#[derive(Serialize)]
pub struct JsonErr {
    pub ok: bool,
    pub error: ErrorBody,
}

#[derive(Serialize)]
pub struct ErrorBody {
    pub code: String,
    pub message: String,
}

/// The configured fullnode. `id` is the prefix applied to every engine object.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NodeIdentity {
    pub id: String,
    pub name: String,
    pub net: String,
}

impl NodeIdentity {
    pub fn new(name: &str, net: &str) -> Self {
        Self {
            id: name.to_string(),
            name: name.to_string(),
            net: net.to_string(),
        }
    }

    pub fn resources(&self) -> ManagedResourceSet {
        ManagedResourceSet::for_id(&self.id)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Tomochain,
    Metrics,
}

impl Role {
    pub const ALL: [Role; 2] = [Role::Tomochain, Role::Metrics];

    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Tomochain => "tomochain",
            Role::Metrics => "metrics",
        }
    }
}

impl std::fmt::Display for Role {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Engine object names derived from an identity. Never persisted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ManagedResourceSet {
    pub network: String,
    pub volume: String,
    pub tomochain: String,
    pub metrics: String,
}

impl ManagedResourceSet {
    pub fn for_id(id: &str) -> Self {
        Self {
            network: format!("{id}_tmnd"),
            volume: format!("{id}_chaindata"),
            tomochain: format!("{id}_tomochain"),
            metrics: format!("{id}_metrics"),
        }
    }

    pub fn container(&self, role: Role) -> &str {
        match role {
            Role::Tomochain => &self.tomochain,
            Role::Metrics => &self.metrics,
        }
    }

    /// Replacement node container built during `update` before the swap.
    pub fn staging_container(&self) -> String {
        format!("{}_next", self.tomochain)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ContainerState {
    Absent,
    Stopped,
    Running,
}

impl ContainerState {
    pub fn as_str(&self) -> &'static str {
        match self {
            ContainerState::Absent => "absent",
            ContainerState::Stopped => "stopped",
            ContainerState::Running => "running",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum NodeState {
    Unconfigured,
    Stopped,
    Running,
    Partial,
    Removed,
}

impl NodeState {
    pub fn as_str(&self) -> &'static str {
        match self {
            NodeState::Unconfigured => "unconfigured",
            NodeState::Stopped => "stopped",
            NodeState::Running => "running",
            NodeState::Partial => "partial",
            NodeState::Removed => "removed",
        }
    }
}

/// Point-in-time view of the managed resources as reported by the engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Observation {
    pub network: bool,
    pub volume: bool,
    pub tomochain: ContainerState,
    pub metrics: ContainerState,
}

impl Observation {
    pub fn container(&self, role: Role) -> ContainerState {
        match role {
            Role::Tomochain => self.tomochain,
            Role::Metrics => self.metrics,
        }
    }

    /// Nothing present at all reads as unconfigured; anything less than the
    /// full set is partial.
    pub fn state(&self) -> NodeState {
        let containers = [self.tomochain, self.metrics];
        if !self.network
            && !self.volume
            && containers.iter().all(|c| *c == ContainerState::Absent)
        {
            return NodeState::Unconfigured;
        }
        if !self.network || !self.volume || containers.contains(&ContainerState::Absent) {
            return NodeState::Partial;
        }
        if containers.iter().all(|c| *c == ContainerState::Running) {
            NodeState::Running
        } else {
            NodeState::Stopped
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Action {
    Start,
    Stop,
    Update,
    Remove,
}

impl Action {
    pub fn verb(&self) -> &'static str {
        match self {
            Action::Start => "Starting",
            Action::Stop => "Stopping",
            Action::Update => "Updating",
            Action::Remove => "Removing",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum StepStatus {
    Done,
    Satisfied,
    Failed,
}

/// One engine operation against one resource, as shown to the user.
#[derive(Debug, Clone, Serialize)]
pub struct Step {
    pub action: String,
    pub resource: String,
    pub status: StepStatus,
    pub detail: Option<String>,
}

impl Step {
    pub fn done(action: &str, resource: &str) -> Self {
        Self {
            action: action.to_string(),
            resource: resource.to_string(),
            status: StepStatus::Done,
            detail: None,
        }
    }

    pub fn satisfied(action: &str, resource: &str, detail: &str) -> Self {
        Self {
            action: action.to_string(),
            resource: resource.to_string(),
            status: StepStatus::Satisfied,
            detail: Some(detail.to_string()),
        }
    }

    pub fn failed(action: &str, resource: &str, reason: impl Into<String>) -> Self {
        Self {
            action: action.to_string(),
            resource: resource.to_string(),
            status: StepStatus::Failed,
            detail: Some(reason.into()),
        }
    }

    pub fn is_failed(&self) -> bool {
        self.status == StepStatus::Failed
    }
}

#[derive(Debug, Serialize)]
pub struct LifecycleReport {
    pub action: Action,
    pub node: String,
    pub warnings: Vec<String>,
    pub steps: Vec<Step>,
    pub state: Option<NodeState>,
}

impl LifecycleReport {
    pub fn new(action: Action, node: &str) -> Self {
        Self {
            action,
            node: node.to_string(),
            warnings: Vec::new(),
            steps: Vec::new(),
            state: None,
        }
    }

    pub fn push(&mut self, step: Step) {
        self.steps.push(step);
    }

    pub fn has_failures(&self) -> bool {
        self.steps.iter().any(Step::is_failed)
    }
}

#[derive(Debug, Serialize)]
pub struct ResourceStatus {
    pub kind: String,
    pub name: String,
    pub state: String,
}

#[derive(Debug, Serialize)]
pub struct StatusReport {
    pub node: String,
    pub net: String,
    pub state: NodeState,
    pub resources: Vec<ResourceStatus>,
}

#[derive(Debug, Serialize)]
pub struct ContainerInspect {
    pub role: Role,
    pub name: String,
    pub found: bool,
    pub metadata: Option<Value>,
}

#[derive(Debug, Serialize)]
pub struct InspectReport {
    pub node: String,
    pub containers: Vec<ContainerInspect>,
}
