//! Workspace CRUD, lifecycle actions, catalog, and log endpoints.

use super::*;
use crate::model::{GitTemplate, NewWorkspace, ResourceClass, Workspace, WorkspaceId};

fn workspace_path(id: &WorkspaceId) -> String {
    format!("{}{}/", WORKSPACES_PATH, id.as_str())
}

fn action_path(id: &WorkspaceId, action: &str) -> String {
    format!("{}{}/{}/", WORKSPACES_PATH, id.as_str(), action)
}

impl Gateway {
    pub async fn list_workspaces(&self) -> Result<Vec<Workspace>, GatewayError> {
        self.send_json(&ApiRequest::get(WORKSPACES_PATH)).await
    }

    pub async fn get_workspace(&self, id: &WorkspaceId) -> Result<Workspace, GatewayError> {
        self.send_json(&ApiRequest::get(workspace_path(id))).await
    }

    pub async fn create_workspace(&self, new: &NewWorkspace) -> Result<Workspace, GatewayError> {
        let request = ApiRequest::post(WORKSPACES_PATH).json(new)?;
        self.send_json(&request).await
    }

    pub async fn delete_workspace(&self, id: &WorkspaceId) -> Result<(), GatewayError> {
        self.send_empty(&ApiRequest::delete(workspace_path(id)))
            .await
    }

    pub async fn start_workspace(&self, id: &WorkspaceId) -> Result<(), GatewayError> {
        self.send_empty(&ApiRequest::post(action_path(id, "start")))
            .await
    }

    pub async fn stop_workspace(&self, id: &WorkspaceId) -> Result<(), GatewayError> {
        self.send_empty(&ApiRequest::post(action_path(id, "stop")))
            .await
    }

    pub async fn templates(&self) -> Result<Vec<GitTemplate>, GatewayError> {
        self.send_json(&ApiRequest::get(TEMPLATES_PATH)).await
    }

    pub async fn resources(&self) -> Result<Vec<ResourceClass>, GatewayError> {
        self.send_json(&ApiRequest::get(RESOURCES_PATH)).await
    }

    /// Raw log lines, oldest first.
    pub async fn workspace_logs(&self, id: &WorkspaceId) -> Result<Vec<String>, GatewayError> {
        let payload: LogsPayload = self
            .send_json(&ApiRequest::get(action_path(id, "logs")))
            .await?;
        Ok(payload.into_lines())
    }
}
