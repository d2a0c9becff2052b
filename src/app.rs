use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};
use ratatui::widgets::ListState;
use std::io;
use teamboard::models::{LoginPayload, Status, Task};
use teamboard::parser::parse_task_input;
use teamboard::state::{NewTask, Stores};

#[derive(PartialEq)]
pub enum Screen {
    Login,
    Board,
}

pub enum InputMode {
    Normal,
    Editing,
}

#[derive(PartialEq)]
pub enum LoginField {
    Username,
    Password,
}

pub struct App {
    pub stores: Stores,
    pub screen: Screen,
    pub input_mode: InputMode,
    pub login_field: LoginField,
    pub username: String,
    pub password: String,
    pub new_task_title: String,
    pub column: usize,
    pub state: ListState,
}

impl App {
    pub fn new(stores: Stores) -> App {
        let username = stores.session.username.clone();
        App {
            stores,
            screen: Screen::Login,
            input_mode: InputMode::Normal,
            login_field: LoginField::Username,
            username,
            password: String::new(),
            new_task_title: String::new(),
            column: 0,
            state: ListState::default(),
        }
    }

    /// Resumes a stored session if the backend still accepts it.
    pub async fn start(&mut self) {
        if self.stores.session.is_authenticated() && self.stores.session.load_me().await {
            self.enter_board().await;
        }
    }

    async fn enter_board(&mut self) {
        self.screen = Screen::Board;
        self.stores.reload().await;
        self.column = 0;
        self.reset_selection();
        self.check_session();
    }

    /// Falls back to the login screen once the client has dropped the
    /// stored session, e.g. after a refused token refresh.
    fn check_session(&mut self) {
        if self.screen != Screen::Board || self.stores.sync_session() {
            return;
        }
        tracing::info!("Session expired, returning to login");
        self.stores.board.tasks.clear();
        self.stores.board.error = None;
        self.stores.teams.error = None;
        self.stores.session.error = Some("Session expired. Please log in again.".to_string());
        self.input_mode = InputMode::Normal;
        self.password.clear();
        self.screen = Screen::Login;
    }

    /// Error of whichever store failed last, if any.
    pub fn error(&self) -> Option<&str> {
        self.stores
            .board
            .error
            .as_deref()
            .or(self.stores.teams.error.as_deref())
            .or(self.stores.session.error.as_deref())
    }

    pub fn column_tasks(&self) -> Vec<Task> {
        self.stores
            .board
            .columns()
            .into_iter()
            .nth(self.column)
            .map(|column| column.tasks)
            .unwrap_or_default()
    }

    pub fn selected_task(&self) -> Option<Task> {
        let index = self.state.selected()?;
        self.column_tasks().into_iter().nth(index)
    }

    fn reset_selection(&mut self) {
        if self.column_tasks().is_empty() {
            self.state.select(None);
        } else {
            self.state.select(Some(0));
        }
    }

    pub fn next(&mut self) {
        let len = self.column_tasks().len();
        if len == 0 {
            return;
        }
        let i = match self.state.selected() {
            Some(i) if i + 1 < len => i + 1,
            _ => 0,
        };
        self.state.select(Some(i));
    }

    pub fn previous(&mut self) {
        let len = self.column_tasks().len();
        if len == 0 {
            return;
        }
        let i = match self.state.selected() {
            Some(0) | None => len - 1,
            Some(i) => i - 1,
        };
        self.state.select(Some(i));
    }

    fn focus_column(&mut self, column: usize) {
        self.column = column.min(Status::ALL.len() - 1);
        self.reset_selection();
    }

    async fn move_selected(&mut self, forward: bool) {
        let task = match self.selected_task() {
            Some(task) => task,
            None => return,
        };
        let target = if forward {
            task.status.next()
        } else {
            task.status.previous()
        };
        let to_status = match target {
            Some(status) => status,
            None => return,
        };

        self.stores
            .move_task(task.id, to_status, 0, Some(task.status))
            .await;

        let status = self
            .stores
            .board
            .tasks
            .iter()
            .find(|t| t.id == task.id)
            .map(|t| t.status)
            .unwrap_or(task.status);
        if let Some(column) = Status::ALL.iter().position(|s| *s == status) {
            self.column = column;
        }
        let index = self.column_tasks().iter().position(|t| t.id == task.id);
        self.state.select(index);
    }

    async fn cycle_project(&mut self) {
        let projects = &self.stores.board.projects;
        if projects.is_empty() {
            return;
        }
        let current = self
            .stores
            .board
            .selected_project_id
            .and_then(|id| projects.iter().position(|p| p.id == id));
        let next = match current {
            Some(i) => (i + 1) % projects.len(),
            None => 0,
        };
        let id = projects[next].id;
        self.stores.board.select_project(id).await;
        self.reset_selection();
    }

    async fn submit_login(&mut self) {
        let payload = LoginPayload {
            username: self.username.trim().to_string(),
            password: self.password.clone(),
        };
        if self.stores.session.login(&payload).await {
            self.password.clear();
            self.enter_board().await;
        }
    }

    async fn submit_task(&mut self) {
        let parsed = parse_task_input(&self.new_task_title);
        if parsed.title.is_empty() {
            self.stores.board.error = Some("Task title cannot be empty.".to_string());
            return;
        }
        let added = self
            .stores
            .board
            .add_task(NewTask {
                title: parsed.title,
                description: None,
                due_date: parsed.due_date,
                assignee: parsed.assignee,
            })
            .await;
        if added {
            self.focus_column(0);
        }
    }

    pub async fn handle_input(&mut self, key: KeyEvent) -> io::Result<bool> {
        if key.modifiers.contains(KeyModifiers::CONTROL) && key.code == KeyCode::Char('c') {
            return Ok(true);
        }
        match self.screen {
            Screen::Login => self.handle_login_input(key).await,
            Screen::Board => self.handle_board_input(key).await,
        }
    }

    async fn handle_login_input(&mut self, key: KeyEvent) -> io::Result<bool> {
        match key.code {
            KeyCode::Esc => return Ok(true),
            KeyCode::Tab => {
                self.login_field = match self.login_field {
                    LoginField::Username => LoginField::Password,
                    LoginField::Password => LoginField::Username,
                };
            }
            KeyCode::Enter => {
                if self.username.trim().is_empty() || self.password.is_empty() {
                    self.stores.session.error =
                        Some("Username and password are required.".to_string());
                } else {
                    self.submit_login().await;
                }
            }
            KeyCode::Char(c) => match self.login_field {
                LoginField::Username => self.username.push(c),
                LoginField::Password => self.password.push(c),
            },
            KeyCode::Backspace => match self.login_field {
                LoginField::Username => {
                    self.username.pop();
                }
                LoginField::Password => {
                    self.password.pop();
                }
            },
            _ => {}
        }
        Ok(false)
    }

    async fn handle_board_input(&mut self, key: KeyEvent) -> io::Result<bool> {
        match self.input_mode {
            InputMode::Normal => match key.code {
                KeyCode::Char('q') => return Ok(true),
                KeyCode::Char('j') | KeyCode::Down => self.next(),
                KeyCode::Char('k') | KeyCode::Up => self.previous(),
                KeyCode::Char('h') | KeyCode::Left => {
                    self.focus_column(self.column.saturating_sub(1))
                }
                KeyCode::Char('l') | KeyCode::Right => self.focus_column(self.column + 1),
                KeyCode::Char('H') => self.move_selected(false).await,
                KeyCode::Char('L') => self.move_selected(true).await,
                KeyCode::Tab => self.cycle_project().await,
                KeyCode::Char('r') => {
                    self.stores.reload().await;
                    self.reset_selection();
                }
                KeyCode::Char('d') => {
                    if let Some(task) = self.selected_task() {
                        self.stores.board.delete_task(task.id).await;
                        self.reset_selection();
                    }
                }
                KeyCode::Char('a') => {
                    self.input_mode = InputMode::Editing;
                    self.new_task_title.clear();
                }
                KeyCode::Char('X') => {
                    self.stores.session.logout();
                    self.stores.board.tasks.clear();
                    self.password.clear();
                    self.screen = Screen::Login;
                }
                _ => {}
            },
            InputMode::Editing => match key.code {
                KeyCode::Enter => {
                    self.submit_task().await;
                    self.new_task_title.clear();
                    self.input_mode = InputMode::Normal;
                }
                KeyCode::Char(c) => self.new_task_title.push(c),
                KeyCode::Backspace => {
                    self.new_task_title.pop();
                }
                KeyCode::Esc => {
                    self.new_task_title.clear();
                    self.input_mode = InputMode::Normal;
                }
                _ => {}
            },
        }
        self.check_session();
        Ok(false)
    }
}
