pub mod board;
pub mod session;
pub mod team;

use std::sync::Arc;

use crate::http::ApiClient;
use crate::models::Status;

pub use board::{board_columns, BoardColumn, BoardState, MoveError, NewTask, PendingMove};
pub use session::{display_name, SessionState};
pub use team::TeamState;

/// Every client-side store, wired to one shared API client.
pub struct Stores {
    pub session: SessionState,
    pub board: BoardState,
    pub teams: TeamState,
}

impl Stores {
    pub fn new(client: Arc<ApiClient>) -> Self {
        Stores {
            session: SessionState::new(client.clone()),
            board: BoardState::new(client.clone()),
            teams: TeamState::new(client),
        }
    }

    /// Loads teams, projects and the selected project's tasks.
    pub async fn reload(&mut self) -> bool {
        let teams = self.teams.load_teams().await;
        let projects = self.board.load_projects().await;
        let tasks = self.board.selected_project_id.is_none() || self.board.load_tasks(None).await;
        self.sync_session();
        teams && projects && tasks
    }

    /// Pulls the credential store back into the session after any request.
    /// Returns whether the session is still authenticated.
    pub fn sync_session(&mut self) -> bool {
        self.session.sync_tokens();
        self.session.is_authenticated()
    }

    pub async fn move_task(
        &mut self,
        task_id: u64,
        to_status: Status,
        to_index: usize,
        from_status: Option<Status>,
    ) -> bool {
        let moved = self
            .board
            .move_task(
                task_id,
                to_status,
                to_index,
                from_status,
                &self.session,
                &self.teams,
            )
            .await;
        self.sync_session();
        moved
    }
}
