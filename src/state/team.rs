use std::sync::Arc;

use crate::api::ListFilter;
use crate::http::ApiClient;
use crate::models::{Project, Team};

pub struct TeamState {
    client: Arc<ApiClient>,
    pub loading: bool,
    pub teams: Vec<Team>,
    pub error: Option<String>,
}

impl TeamState {
    pub fn new(client: Arc<ApiClient>) -> Self {
        TeamState {
            client,
            loading: false,
            teams: Vec::new(),
            error: None,
        }
    }

    pub async fn load_teams(&mut self) -> bool {
        self.loading = true;
        self.error = None;

        let result = self.client.teams().list(&ListFilter::default()).await;
        let ok = match result {
            Ok(teams) => {
                self.teams = teams;
                true
            }
            Err(err) => {
                tracing::error!(error = %err, "Failed to load teams");
                self.error = Some(err.to_string());
                false
            }
        };

        self.loading = false;
        ok
    }

    pub fn team(&self, id: u64) -> Option<&Team> {
        self.teams.iter().find(|team| team.id == id)
    }

    /// Owner id of the team the project belongs to.
    pub fn project_owner(&self, project: Option<&Project>) -> Option<u64> {
        let team = self.team(project?.team)?;
        team.owner.as_ref().map(|owner| owner.id)
    }

    pub fn check_project_owner(&self, project: Option<&Project>, user_id: Option<u64>) -> bool {
        match (self.project_owner(project), user_id) {
            (Some(owner), Some(user)) => owner == user,
            _ => false,
        }
    }
}
