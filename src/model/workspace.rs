use std::fmt;

use serde::{Deserialize, Deserializer, Serialize};

/// Backend identifier of a workspace. The API emits either numbers or strings.
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub struct WorkspaceId(pub String);

impl WorkspaceId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for WorkspaceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for WorkspaceId {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

impl<'de> Deserialize<'de> for WorkspaceId {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        #[derive(Deserialize)]
        #[serde(untagged)]
        enum Raw {
            Number(u64),
            Text(String),
        }

        Ok(match Raw::deserialize(deserializer)? {
            Raw::Number(n) => WorkspaceId(n.to_string()),
            Raw::Text(s) => WorkspaceId(s),
        })
    }
}

/// Low-level container state reported by the backend.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ContainerStatus {
    #[default]
    Created,
    Starting,
    Running,
    Stopped,
    Failed,
}

impl ContainerStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            ContainerStatus::Created => "created",
            ContainerStatus::Starting => "starting",
            ContainerStatus::Running => "running",
            ContainerStatus::Stopped => "stopped",
            ContainerStatus::Failed => "failed",
        }
    }
}

impl fmt::Display for ContainerStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Coarse projection of [`ContainerStatus`] shown to users.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum WorkspaceStatus {
    Running,
    Stopped,
    Error,
}

impl From<ContainerStatus> for WorkspaceStatus {
    fn from(status: ContainerStatus) -> Self {
        match status {
            ContainerStatus::Running => WorkspaceStatus::Running,
            ContainerStatus::Failed => WorkspaceStatus::Error,
            ContainerStatus::Created | ContainerStatus::Starting | ContainerStatus::Stopped => {
                WorkspaceStatus::Stopped
            }
        }
    }
}

impl fmt::Display for WorkspaceStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            WorkspaceStatus::Running => "Running",
            WorkspaceStatus::Stopped => "Stopped",
            WorkspaceStatus::Error => "Error",
        };
        f.write_str(s)
    }
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct ResourceUsage {
    #[serde(default)]
    pub cpu_usage: f64,
    #[serde(default)]
    pub memory_usage: f64,
    #[serde(default)]
    pub memory_total: f64,
    #[serde(default)]
    pub disk_usage: f64,
    #[serde(default)]
    pub disk_total: f64,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct TemplateSummary {
    pub name: String,
    #[serde(default)]
    pub language: String,
    #[serde(default)]
    pub icon: Option<String>,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Workspace {
    pub id: WorkspaceId,
    pub name: String,

    #[serde(default)]
    pub owner_username: String,

    #[serde(default)]
    pub container_status: ContainerStatus,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub container_url: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub container_password: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub resource_usage: Option<ResourceUsage>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub git_template_details: Option<TemplateSummary>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_accessed: Option<String>,
}

impl Workspace {
    /// Always derived from `container_status`; any `status` field on the wire is ignored.
    pub fn status(&self) -> WorkspaceStatus {
        WorkspaceStatus::from(self.container_status)
    }

    /// URL to hand to a browser, only once the container is actually up.
    pub fn launch_url(&self) -> Option<&str> {
        if self.container_status != ContainerStatus::Running {
            return None;
        }
        self.container_url.as_deref().filter(|url| !url.is_empty())
    }
}

/// Payload for `POST /api/workspaces/`.
#[derive(Clone, Debug, Default, Serialize)]
pub struct NewWorkspace {
    pub name: String,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub git_template: Option<u64>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub resource_class: Option<u64>,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct GitTemplate {
    pub id: u64,
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub language: String,
    #[serde(default)]
    pub repository_url: String,
    #[serde(default)]
    pub icon: Option<String>,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ResourceClass {
    pub id: u64,
    pub name: String,
    #[serde(default)]
    pub cpu_count: u32,
    #[serde(default)]
    pub memory_gb: f64,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub disk_space_gb: f64,
    #[serde(default)]
    pub gpu_count: u32,
    #[serde(default)]
    pub price_per_hour: String,
}
