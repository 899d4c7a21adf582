use std::collections::BTreeMap;

use serde::Deserialize;
use serde_json::{Map, Value, json};
use snafu::prelude::*;
use tracing::{debug, info, warn};

use crate::ext::SendExt;

use super::client::{
    CreateIssueSnafu, JiraClient, JiraConnection, JiraError, ListSprintsSnafu,
    MoveToSprintSnafu, NoActiveSprintSnafu,
};

/// Issue type that is resolved from the summary.
pub const AUTO_ISSUE_TYPE: &str = "Auto";
const ACTIVE_STATE: &str = "active";

#[derive(Debug, Clone, Default)]
pub struct CreateIssueRequest {
    pub summary: String,
    pub description: String,
    pub assignee: String,
    pub issue_type: String,
    pub labels: Vec<String>,
    pub components: Vec<String>,
    pub custom_fields: BTreeMap<String, String>,
}

impl CreateIssueRequest {
    /// `Auto` becomes `Bug` for summaries mentioning a fix, `Task` otherwise.
    pub fn resolved_issue_type(&self) -> &str {
        if self.issue_type != AUTO_ISSUE_TYPE {
            return &self.issue_type;
        }
        if self.summary.to_lowercase().contains("fix") {
            "Bug"
        } else {
            "Task"
        }
    }

    fn fields(&self, project: &str, assignee: Option<Value>) -> Value {
        let mut fields = Map::new();
        fields.insert("project".into(), json!({ "key": project }));
        fields.insert("issuetype".into(), json!({ "name": self.resolved_issue_type() }));
        fields.insert("summary".into(), json!(self.summary));
        if !self.description.is_empty() {
            fields.insert("description".into(), json!(self.description));
        }
        if !self.labels.is_empty() {
            fields.insert("labels".into(), json!(self.labels));
        }

        let components: Vec<Value> = self
            .components
            .iter()
            .filter(|name| !name.is_empty())
            .map(|name| json!({ "name": name }))
            .collect();
        if !components.is_empty() {
            fields.insert("components".into(), Value::Array(components));
        }
        if let Some(assignee) = assignee {
            fields.insert("assignee".into(), assignee);
        }
        for (key, value) in &self.custom_fields {
            fields.insert(key.clone(), json!(value));
        }

        json!({ "fields": fields })
    }
}

#[derive(Debug, Deserialize)]
struct CreatedIssue {
    key: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct JiraUser {
    account_id: Option<String>,
    name: Option<String>,
}

#[derive(Debug, Deserialize)]
struct SprintPage {
    #[serde(default)]
    values: Vec<Sprint>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Sprint {
    pub id: u64,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub state: String,
}

impl JiraClient {
    /// Creates the issue and returns its key.
    pub fn create_issue(
        &self,
        project: &str,
        request: &CreateIssueRequest,
    ) -> Result<String, JiraError> {
        let assignee = if request.assignee.is_empty() {
            None
        } else {
            self.find_assignee(&request.assignee)
        };

        let payload = request.fields(project, assignee);
        debug!("Creating issue: {}", payload);
        let created: CreatedIssue = self
            .post("rest/api/2/issue")
            .json(&payload)
            .send_json()
            .context(CreateIssueSnafu)?;
        info!("Created issue {}", created.key);
        Ok(created.key)
    }

    /// Best effort: a failed lookup leaves the issue unassigned.
    fn find_assignee(&self, query: &str) -> Option<Value> {
        let users: Vec<JiraUser> = match self
            .get("rest/api/2/user/search")
            .query(&[("query", query)])
            .send_json()
        {
            Ok(users) => users,
            Err(e) => {
                warn!("Error finding user '{}': {}", query, e);
                return None;
            }
        };

        let user = users.into_iter().next();
        match user {
            Some(JiraUser {
                account_id: Some(id),
                ..
            }) => Some(json!({ "accountId": id })),
            Some(JiraUser { name: Some(name), .. }) => Some(json!({ "name": name })),
            _ => {
                warn!("No user matches '{}', leaving the issue unassigned", query);
                None
            }
        }
    }

    pub fn active_sprint(&self, board: u64) -> Result<Sprint, JiraError> {
        let page: SprintPage = self
            .get(&format!("rest/agile/1.0/board/{board}/sprint"))
            .query(&[("state", ACTIVE_STATE)])
            .send_json()
            .context(ListSprintsSnafu { board })?;

        page.values
            .into_iter()
            .find(|sprint| sprint.state == ACTIVE_STATE)
            .context(NoActiveSprintSnafu { board })
    }

    pub fn add_issue_to_sprint(&self, issue: &str, sprint: u64) -> Result<(), JiraError> {
        self.post(&format!("rest/agile/1.0/sprint/{sprint}/issue"))
            .json(&json!({ "issues": [issue] }))
            .send_checked()
            .context(MoveToSprintSnafu { issue, sprint })?;
        info!("Moved {} into sprint {}", issue, sprint);
        Ok(())
    }
}

/// Creates the issue and, when a board is configured, moves it into the active sprint.
pub fn create_issue(
    connection: &JiraConnection,
    request: &CreateIssueRequest,
) -> Result<String, JiraError> {
    let client = JiraClient::new(connection)?;
    let key = client.create_issue(&connection.project, request)?;

    if let Some(board) = connection.board {
        let sprint = client.active_sprint(board)?;
        debug!("Active sprint of board {}: {} ({})", board, sprint.name, sprint.id);
        client.add_issue_to_sprint(&key, sprint.id)?;
    }
    Ok(key)
}
