use crate::app::{App, InputMode, LoginField, Screen};
use crossterm::event::{self, Event as CEvent};
use ratatui::{
    backend::Backend,
    layout::{Alignment, Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span, Text},
    widgets::{Block, Borders, Clear, List, ListItem, ListState, Paragraph, Tabs, Wrap},
    Frame, Terminal,
};
use std::io;
use std::time::Duration;
use teamboard::models::Task;
use teamboard::state::display_name;

fn centered_rect_absolute(width: u16, height: u16, r: Rect) -> Rect {
    let popup_layout = Layout::default()
        .direction(Direction::Vertical)
        .constraints(
            [
                Constraint::Length((r.height.saturating_sub(height)) / 2),
                Constraint::Length(height),
                Constraint::Length((r.height.saturating_sub(height) + 1) / 2),
            ]
            .as_ref(),
        )
        .split(r);

    Layout::default()
        .direction(Direction::Horizontal)
        .constraints(
            [
                Constraint::Length((r.width.saturating_sub(width)) / 2),
                Constraint::Length(width),
                Constraint::Length((r.width.saturating_sub(width) + 1) / 2),
            ]
            .as_ref(),
        )
        .split(popup_layout[1])[1]
}

fn key(label: &'static str, action: &'static str) -> [Span<'static>; 2] {
    [
        Span::styled(label, Style::default().fg(Color::Red)),
        Span::raw(action),
    ]
}

fn get_legend(screen: &Screen, input_mode: &InputMode) -> Text<'static> {
    let keys: Vec<[Span<'static>; 2]> = match (screen, input_mode) {
        (Screen::Login, _) => vec![
            key(" Tab ", ": Switch Field "),
            key(" Enter ", ": Log In "),
            key(" Esc ", ": Quit "),
        ],
        (Screen::Board, InputMode::Normal) => vec![
            key(" q ", ": Quit "),
            key(" j/k ", ": Select "),
            key(" h/l ", ": Column "),
            key(" H/L ", ": Move Task "),
            key(" Tab ", ": Project "),
            key(" a ", ": Add Task "),
            key(" d ", ": Delete "),
            key(" r ", ": Reload "),
            key(" X ", ": Log Out "),
        ],
        (Screen::Board, InputMode::Editing) => vec![
            key(" Enter ", ": Submit "),
            key(" Esc ", ": Cancel "),
        ],
    };
    Text::from(Line::from(keys.into_iter().flatten().collect::<Vec<_>>()))
}

fn status_line(app: &App) -> Line<'static> {
    if let Some(err) = app.error() {
        return Line::from(Span::styled(err.to_string(), Style::default().fg(Color::Red)));
    }
    let loading = app.stores.board.loading || app.stores.teams.loading || app.stores.session.loading;
    if loading {
        Line::from(Span::styled("Loading...", Style::default().fg(Color::Yellow)))
    } else if app.screen == Screen::Board {
        Line::from(format!("Signed in as {}", display_name(&app.stores.session)))
    } else {
        Line::from("")
    }
}

fn draw_login(f: &mut Frame, app: &App, area: Rect) {
    let popup_area = centered_rect_absolute(50, 8, area);
    let block = Block::default()
        .title("TeamBoard Login")
        .borders(Borders::ALL)
        .style(Style::default().fg(Color::Green));

    let field_style = |field: LoginField| {
        if app.login_field == field {
            Style::default().add_modifier(Modifier::BOLD).fg(Color::White)
        } else {
            Style::default().fg(Color::Gray)
        }
    };

    let lines = vec![
        Line::from(""),
        Line::from(vec![
            Span::styled("Username: ", field_style(LoginField::Username)),
            Span::raw(app.username.clone()),
        ]),
        Line::from(vec![
            Span::styled("Password: ", field_style(LoginField::Password)),
            Span::raw("*".repeat(app.password.chars().count())),
        ]),
    ];

    f.render_widget(Clear, popup_area);
    f.render_widget(Paragraph::new(lines).block(block), popup_area);
}

fn task_line(task: &Task) -> Line<'static> {
    let mut spans = vec![Span::raw(task.title.clone())];
    if let Some(due) = task.due_date {
        spans.push(Span::styled(
            format!(" ({})", due.format("%Y-%m-%d")),
            Style::default().fg(Color::Yellow),
        ));
    }
    Line::from(spans)
}

fn draw_board(f: &mut Frame, app: &mut App, area: Rect) {
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Length(3), Constraint::Min(0), Constraint::Length(4)].as_ref())
        .split(area);

    // Project tabs
    let board = &app.stores.board;
    let titles: Vec<Line> = board
        .projects
        .iter()
        .map(|p| Line::from(p.title.clone()))
        .collect();
    let selected = board
        .selected_project_id
        .and_then(|id| board.projects.iter().position(|p| p.id == id))
        .unwrap_or(0);
    let tabs = Tabs::new(titles)
        .block(Block::default().borders(Borders::ALL).title("Projects"))
        .select(selected)
        .highlight_style(Style::default().fg(Color::Green).add_modifier(Modifier::BOLD));
    f.render_widget(tabs, chunks[0]);

    // Columns
    let column_areas = Layout::default()
        .direction(Direction::Horizontal)
        .constraints(
            [
                Constraint::Ratio(1, 3),
                Constraint::Ratio(1, 3),
                Constraint::Ratio(1, 3),
            ]
            .as_ref(),
        )
        .split(chunks[1]);

    for (i, column) in app.stores.board.columns().into_iter().enumerate() {
        let focused = i == app.column;
        let title = format!("{} ({})", column.title, column.tasks.len());
        let border_style = if focused {
            Style::default().fg(Color::Green)
        } else {
            Style::default()
        };
        let block = Block::default()
            .borders(Borders::ALL)
            .title(title)
            .border_style(border_style);

        let items: Vec<ListItem> = column
            .tasks
            .iter()
            .map(|task| ListItem::new(task_line(task)))
            .collect();
        let list = List::new(items)
            .block(block)
            .highlight_style(Style::default().fg(Color::Green).add_modifier(Modifier::BOLD))
            .highlight_symbol(">> ");

        if focused {
            f.render_stateful_widget(list, column_areas[i], &mut app.state);
        } else {
            f.render_stateful_widget(list, column_areas[i], &mut ListState::default());
        }
    }

    // Task details
    let detail_block = Block::default().borders(Borders::ALL).title("Task Details");
    let detail = match app.selected_task() {
        Some(task) => {
            let assignee = match (&task.assignee_detail, task.assignee) {
                (Some(user), _) => user.username.clone(),
                (None, Some(id)) => format!("#{}", id),
                (None, None) => "Unassigned".to_string(),
            };
            let description = task
                .description
                .clone()
                .filter(|d| !d.trim().is_empty())
                .unwrap_or_else(|| "No description".to_string());
            vec![
                Line::from(vec![
                    Span::styled("Assignee: ", Style::default().add_modifier(Modifier::BOLD)),
                    Span::raw(assignee),
                ]),
                Line::from(description),
            ]
        }
        None => vec![Line::from("No task selected")],
    };
    f.render_widget(
        Paragraph::new(detail).block(detail_block).wrap(Wrap { trim: true }),
        chunks[2],
    );
}

fn draw_task_popup(f: &mut Frame, app: &App, area: Rect) {
    let popup_width = (area.width * 60 / 100).max(20);
    let popup_area = centered_rect_absolute(popup_width, 3, area);

    let popup_block = Block::default()
        .title("New Task (due:YYYY-MM-DD @user-id, Enter to Submit)")
        .borders(Borders::ALL)
        .style(Style::default().fg(Color::Green));

    let input = Paragraph::new(app.new_task_title.as_str())
        .style(Style::default().fg(Color::White))
        .block(popup_block)
        .wrap(Wrap { trim: false });

    f.render_widget(Clear, popup_area);
    f.render_widget(input, popup_area);
}

pub async fn run_app<B: Backend>(terminal: &mut Terminal<B>, mut app: App) -> io::Result<()> {
    loop {
        terminal.draw(|f| {
            let size = f.area();

            // Split the main layout into body, status and footer
            let chunks = Layout::default()
                .direction(Direction::Vertical)
                .margin(0)
                .constraints(
                    [Constraint::Min(0), Constraint::Length(1), Constraint::Length(2)].as_ref(),
                )
                .split(size);

            match app.screen {
                Screen::Login => draw_login(f, &app, chunks[0]),
                Screen::Board => {
                    draw_board(f, &mut app, chunks[0]);
                    if let InputMode::Editing = app.input_mode {
                        draw_task_popup(f, &app, chunks[0]);
                    }
                }
            }

            f.render_widget(Paragraph::new(status_line(&app)), chunks[1]);

            let legend = Paragraph::new(get_legend(&app.screen, &app.input_mode))
                .style(Style::default().fg(Color::White))
                .alignment(Alignment::Left)
                .wrap(Wrap { trim: true });

            f.render_widget(legend, chunks[2]);
        })?;

        // Handle input
        if event::poll(Duration::from_millis(100))? {
            if let CEvent::Key(key) = event::read()? {
                let should_quit = app.handle_input(key).await?;
                if should_quit {
                    return Ok(());
                }
            }
        }
    }
}
