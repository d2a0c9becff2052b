//! Tasks of the active project, grouped into status columns.
//!
//! Moving a task is optimistic: [`BoardState::begin_move`] rewrites the
//! local list immediately, [`PendingMove::persist`] sends the new status,
//! and [`BoardState::finish_move`] rolls the status back if the server
//! refused. Only the status is persisted; ordering inside a column is
//! local to this client.

use std::sync::Arc;

use chrono::NaiveDate;
use thiserror::Error;

use crate::api::ListFilter;
use crate::error::ApiError;
use crate::http::ApiClient;
use crate::models::{Project, Status, Task, TaskPatch, TaskRequest};
use crate::state::session::SessionState;
use crate::state::team::TeamState;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum MoveError {
    #[error("task {0} is not on the board")]
    TaskNotFound(u64),

    #[error("Only tasks assigned to you can be updated.")]
    Forbidden,
}

#[derive(Clone, Debug, PartialEq)]
pub struct BoardColumn {
    pub status: Status,
    pub title: &'static str,
    pub tasks: Vec<Task>,
}

/// Groups tasks into the fixed todo / in progress / done columns,
/// keeping their relative order.
pub fn board_columns(tasks: &[Task]) -> Vec<BoardColumn> {
    Status::ALL
        .iter()
        .map(|&status| BoardColumn {
            status,
            title: status.title(),
            tasks: tasks
                .iter()
                .filter(|task| task.status == status)
                .cloned()
                .collect(),
        })
        .collect()
}

/// New task list with `task_id` moved to `to_index` of the `to_status`
/// column. Tasks of the other columns come first, in their old order,
/// followed by the target column. `to_index` is clamped to the column.
pub fn reorder_for_move(
    tasks: &[Task],
    task_id: u64,
    to_status: Status,
    to_index: usize,
) -> Option<Vec<Task>> {
    let mut moved = tasks.iter().find(|task| task.id == task_id)?.clone();
    moved.status = to_status;

    let mut target: Vec<Task> = tasks
        .iter()
        .filter(|task| task.status == to_status && task.id != task_id)
        .cloned()
        .collect();
    let index = to_index.min(target.len());
    target.insert(index, moved);

    let mut next: Vec<Task> = tasks
        .iter()
        .filter(|task| task.status != to_status && task.id != task_id)
        .cloned()
        .collect();
    next.extend(target);
    Some(next)
}

/// A move that has been applied locally but not yet confirmed.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PendingMove {
    pub task_id: u64,
    pub to_status: Status,
    /// Status restored if persistence fails.
    pub rollback_status: Status,
}

impl PendingMove {
    pub async fn persist(&self, client: &ApiClient) -> Result<Task, ApiError> {
        client
            .tasks()
            .update(self.task_id, &TaskPatch::status(self.to_status))
            .await
    }
}

/// Fields accepted by the quick-add form.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct NewTask {
    pub title: String,
    pub description: Option<String>,
    pub due_date: Option<NaiveDate>,
    pub assignee: Option<u64>,
}

pub struct BoardState {
    client: Arc<ApiClient>,
    pub loading: bool,
    pub projects: Vec<Project>,
    pub selected_project_id: Option<u64>,
    pub tasks: Vec<Task>,
    pub error: Option<String>,
}

impl BoardState {
    pub fn new(client: Arc<ApiClient>) -> Self {
        BoardState {
            client,
            loading: false,
            projects: Vec::new(),
            selected_project_id: None,
            tasks: Vec::new(),
            error: None,
        }
    }

    pub fn project(&self, id: u64) -> Option<&Project> {
        self.projects.iter().find(|project| project.id == id)
    }

    pub fn selected_project(&self) -> Option<&Project> {
        self.project(self.selected_project_id?)
    }

    pub fn columns(&self) -> Vec<BoardColumn> {
        board_columns(&self.tasks)
    }

    /// Loads every project and selects the first one if nothing is selected.
    pub async fn load_projects(&mut self) -> bool {
        self.loading = true;
        self.error = None;

        let result = self.client.projects().list(&ListFilter::default()).await;
        let ok = match result {
            Ok(projects) => {
                self.projects = projects;
                if self.selected_project_id.is_none() {
                    self.selected_project_id = self.projects.first().map(|p| p.id);
                }
                true
            }
            Err(err) => self.fail("load projects", err),
        };

        self.loading = false;
        ok
    }

    /// Loads the tasks of `project_id`, or of the selected project.
    /// The backend returns every task; the board keeps only that project's.
    pub async fn load_tasks(&mut self, project_id: Option<u64>) -> bool {
        let target = match project_id.or(self.selected_project_id) {
            Some(id) => id,
            None => return false,
        };

        self.loading = true;
        self.error = None;

        let result = self.client.tasks().list(&ListFilter::default()).await;
        let ok = match result {
            Ok(tasks) => {
                self.tasks = tasks
                    .into_iter()
                    .filter(|task| task.project == target)
                    .collect();
                true
            }
            Err(err) => self.fail("load tasks", err),
        };

        self.loading = false;
        ok
    }

    pub async fn select_project(&mut self, id: u64) -> bool {
        self.selected_project_id = Some(id);
        self.load_tasks(Some(id)).await
    }

    /// Authorizes and applies a move locally.
    ///
    /// The acting user must be the task's assignee or the owner of the team
    /// owning the task's project. A rejected move leaves the tasks untouched.
    pub fn begin_move(
        &mut self,
        task_id: u64,
        to_status: Status,
        to_index: usize,
        from_status: Option<Status>,
        acting_user: Option<u64>,
        teams: &TeamState,
    ) -> Result<PendingMove, MoveError> {
        let task = self
            .tasks
            .iter()
            .find(|task| task.id == task_id)
            .ok_or(MoveError::TaskNotFound(task_id))?;
        let current_status = task.status;

        let allowed = match acting_user {
            Some(me) => {
                task.assignee == Some(me)
                    || teams.check_project_owner(self.project(task.project), Some(me))
            }
            None => false,
        };
        if !allowed {
            tracing::debug!(task_id, ?acting_user, "Move rejected");
            self.error = Some(MoveError::Forbidden.to_string());
            return Err(MoveError::Forbidden);
        }
        self.error = None;

        let rollback_status = from_status.unwrap_or(current_status);
        if let Some(next) = reorder_for_move(&self.tasks, task_id, to_status, to_index) {
            self.tasks = next;
        }

        Ok(PendingMove {
            task_id,
            to_status,
            rollback_status,
        })
    }

    /// Settles a move. On failure the error is recorded and the task's
    /// status is reset; its position inside the column is not restored.
    pub fn finish_move(&mut self, pending: PendingMove, result: Result<Task, ApiError>) -> bool {
        match result {
            Ok(_) => true,
            Err(err) => {
                tracing::warn!(
                    task_id = pending.task_id,
                    to = pending.to_status.as_str(),
                    rollback = pending.rollback_status.as_str(),
                    error = %err,
                    "Move failed, rolling back"
                );
                self.error = Some(err.to_string());
                for task in self.tasks.iter_mut().filter(|t| t.id == pending.task_id) {
                    task.status = pending.rollback_status;
                }
                false
            }
        }
    }

    pub async fn move_task(
        &mut self,
        task_id: u64,
        to_status: Status,
        to_index: usize,
        from_status: Option<Status>,
        session: &SessionState,
        teams: &TeamState,
    ) -> bool {
        let pending = match self.begin_move(
            task_id,
            to_status,
            to_index,
            from_status,
            session.user_id(),
            teams,
        ) {
            Ok(pending) => pending,
            Err(_) => return false,
        };
        let result = pending.persist(&self.client).await;
        self.finish_move(pending, result)
    }

    /// Creates a todo task in the selected project and puts it first.
    pub async fn add_task(&mut self, new_task: NewTask) -> bool {
        let project = match self.selected_project_id {
            Some(id) => id,
            None => return false,
        };

        self.loading = true;
        self.error = None;

        let request = TaskRequest {
            title: new_task.title,
            description: new_task.description,
            project,
            assignee: new_task.assignee,
            status: Some(Status::Todo),
            due_date: new_task.due_date,
        };
        let result = self.client.tasks().create(&request).await;
        let ok = match result {
            Ok(task) => {
                if task.project == project {
                    self.tasks.insert(0, task);
                }
                true
            }
            Err(err) => self.fail("add task", err),
        };

        self.loading = false;
        ok
    }

    pub async fn update_task(&mut self, task_id: u64, patch: TaskPatch) -> bool {
        self.loading = true;
        self.error = None;

        let result = self.client.tasks().update(task_id, &patch).await;
        let ok = match result {
            Ok(updated) => {
                for task in self.tasks.iter_mut().filter(|t| t.id == task_id) {
                    *task = updated.clone();
                }
                true
            }
            Err(err) => self.fail("update task", err),
        };

        self.loading = false;
        ok
    }

    pub async fn delete_task(&mut self, task_id: u64) -> bool {
        self.loading = true;
        self.error = None;

        let result = self.client.tasks().delete(task_id).await;
        let ok = match result {
            Ok(()) => {
                self.tasks.retain(|task| task.id != task_id);
                true
            }
            Err(err) => self.fail("delete task", err),
        };

        self.loading = false;
        ok
    }

    fn fail(&mut self, action: &str, err: ApiError) -> bool {
        tracing::warn!(action, error = %err, "Board action failed");
        self.error = Some(err.to_string());
        false
    }
}
