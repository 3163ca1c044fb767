use anyhow::Result;
use crossterm::event::{self, Event, KeyCode, KeyEventKind, KeyModifiers};
use ratatui::{
    backend::Backend,
    layout::{Alignment, Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, BorderType, Borders, Clear, List, ListItem, ListState, Paragraph, Wrap},
    Frame, Terminal,
};
use std::time::{Duration, Instant};
use unicode_width::UnicodeWidthStr;

use crate::app::{guide_steps, App, Focus, Screen};
use crate::types::{InputMode, Side, ToastTone};

// Clean color palette for better visibility and modern look
const BASE_FG: Color = Color::Rgb(216, 222, 233); // Main text
const BASE_BG: Color = Color::Rgb(46, 52, 64); // Background
const ACCENT_COLOR: Color = Color::Rgb(136, 192, 208); // Primary accent
const SUCCESS_COLOR: Color = Color::Rgb(163, 190, 140); // Success/green
const WARNING_COLOR: Color = Color::Rgb(235, 203, 139); // Warning/yellow
const ERROR_COLOR: Color = Color::Rgb(191, 97, 106); // Failure/red
const HIGHLIGHT_BG: Color = Color::Rgb(59, 66, 82); // Selection background
const BORDER_COLOR: Color = Color::Rgb(76, 86, 106); // Inactive borders
const INPUT_TEXT: Color = Color::Rgb(235, 203, 139); // Input text - bright and visible

pub async fn run_app<B: Backend>(terminal: &mut Terminal<B>, mut app: App) -> Result<()> {
    let mut last_tick = Instant::now();
    let tick_rate = Duration::from_millis(250);

    loop {
        terminal.draw(|f| ui(f, &mut app))?;

        let timeout = tick_rate
            .checked_sub(last_tick.elapsed())
            .unwrap_or_else(|| Duration::from_secs(0));

        if crossterm::event::poll(timeout)? {
            if let Event::Key(key) = event::read()? {
                if key.kind == KeyEventKind::Press {
                    match app.input_mode {
                        InputMode::Normal => {
                            handle_normal_input(&mut app, key.code, key.modifiers).await?;
                        }
                        InputMode::Editing => {
                            handle_edit_input(&mut app, key.code).await?;
                        }
                    }
                }
            }
        }

        if last_tick.elapsed() >= tick_rate {
            app.on_tick();
            last_tick = Instant::now();
        }

        if app.should_quit {
            break;
        }
    }

    Ok(())
}

pub async fn handle_normal_input(
    app: &mut App,
    key: KeyCode,
    modifiers: KeyModifiers,
) -> Result<()> {
    if key == KeyCode::Char('c') && modifiers.contains(KeyModifiers::CONTROL) {
        app.should_quit = true;
        return Ok(());
    }

    if app.screen == Screen::Login {
        return handle_login_input(app, key).await;
    }

    // Popups swallow input while open, topmost first.
    if app.report.is_some() {
        match key {
            KeyCode::Esc | KeyCode::Char('v') => app.close_report(),
            KeyCode::Char('e') => app.export_report()?,
            _ => {}
        }
        return Ok(());
    }
    if app.show_completion_modal {
        match key {
            KeyCode::Enter => {
                app.show_completion_modal = false;
                app.switch_side(Side::Destination);
            }
            KeyCode::Esc => app.show_completion_modal = false,
            _ => {}
        }
        return Ok(());
    }
    if app.guide.open {
        match key {
            KeyCode::Enter => app.guide_next(),
            KeyCode::Esc => app.guide_skip(),
            _ => {}
        }
        return Ok(());
    }
    if app.show_help {
        if matches!(key, KeyCode::Esc | KeyCode::Char('h')) {
            app.toggle_help();
        }
        return Ok(());
    }

    match key {
        KeyCode::Char('q') => app.should_quit = true,
        KeyCode::Char('h') => app.toggle_help(),
        KeyCode::Char('g') => app.open_guide(),
        KeyCode::Char('s') => app.switch_side(Side::Source),
        KeyCode::Char('d') => app.switch_side(Side::Destination),
        KeyCode::Char('L') => app.logout(),
        KeyCode::Tab => {
            app.focus = match app.focus {
                Focus::Form => Focus::Queues,
                Focus::Queues => Focus::Form,
            };
        }
        KeyCode::Up => match app.focus {
            Focus::Form => app.move_form_cursor_up(),
            Focus::Queues => app.move_queue_cursor_up(),
        },
        KeyCode::Down => match app.focus {
            Focus::Form => app.move_form_cursor_down(),
            Focus::Queues => app.move_queue_cursor_down(),
        },
        KeyCode::Enter => match app.focus {
            Focus::Form => app.activate_current_field(),
            Focus::Queues => app.toggle_queue_at_cursor(),
        },
        KeyCode::Char(' ') => {
            if app.focus == Focus::Queues {
                app.toggle_queue_at_cursor();
            }
        }
        KeyCode::Char('c') => app.connect_toggle().await,
        KeyCode::Char('b') => app.run_active_operation().await,
        KeyCode::Char('v') => {
            let workflow = app.active();
            if let Some(name) = workflow
                .queue_managers
                .get(workflow.queue_cursor)
                .map(|qm| qm.name.clone())
            {
                app.view_report(name).await;
            }
        }
        KeyCode::Char('x') => app.active_mut().logs.clear(),
        KeyCode::Char('R') => {
            let workflow = match app.active_side {
                Side::Source => &mut app.source,
                Side::Destination => &mut app.destination,
            };
            workflow.reset_progress(&mut app.session);
        }
        _ => {}
    }
    Ok(())
}

async fn handle_login_input(app: &mut App, key: KeyCode) -> Result<()> {
    match key {
        KeyCode::Tab | KeyCode::Up | KeyCode::Down => {
            app.login.cursor = 1 - app.login.cursor;
        }
        KeyCode::Enter => {
            if app.login.cursor == 0 {
                app.login.cursor = 1;
            } else {
                app.submit_login().await;
            }
        }
        KeyCode::Char(c) => {
            if app.login.cursor == 0 {
                app.login.username.push(c);
            } else {
                app.login.password.push(c);
            }
        }
        KeyCode::Backspace => {
            if app.login.cursor == 0 {
                app.login.username.pop();
            } else {
                app.login.password.pop();
            }
        }
        _ => {}
    }
    Ok(())
}

pub async fn handle_edit_input(app: &mut App, key: KeyCode) -> Result<()> {
    match key {
        KeyCode::Enter => app.commit_edit(),
        KeyCode::Esc => app.cancel_edit(),
        KeyCode::Char(c) => app.input_buffer.push(c),
        KeyCode::Backspace => {
            app.input_buffer.pop();
        }
        _ => {}
    }
    Ok(())
}

fn ui(f: &mut Frame, app: &mut App) {
    match app.screen {
        Screen::Login => render_login(f, app),
        Screen::Workspace => render_workspace(f, app),
    }

    if app.show_help {
        render_help_popup(f);
    }
    if app.guide.open {
        render_guide_popup(f, app);
    }
    if app.show_completion_modal {
        render_completion_popup(f);
    }
    if app.report.is_some() {
        render_report_popup(f, app);
    }
    if app.toast.is_some() {
        render_toast(f, app);
    }
}

fn render_login(f: &mut Frame, app: &App) {
    let area = f.area();
    f.render_widget(
        Block::default().style(Style::default().bg(BASE_BG)),
        area,
    );

    let popup_area = centered_rect(50, 45, area);
    let block = Block::default()
        .title(" MQ Migration Console ")
        .title_alignment(Alignment::Center)
        .borders(Borders::ALL)
        .border_type(BorderType::Rounded)
        .style(Style::default().fg(ACCENT_COLOR).bg(BASE_BG));
    f.render_widget(block, popup_area);

    let inner = Rect {
        x: popup_area.x + 3,
        y: popup_area.y + 2,
        width: popup_area.width.saturating_sub(6),
        height: popup_area.height.saturating_sub(4),
    };
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(3),
            Constraint::Length(3),
            Constraint::Min(0),
        ])
        .split(inner);

    let field_style = |active: bool| {
        if active {
            Style::default().fg(INPUT_TEXT)
        } else {
            Style::default().fg(BASE_FG)
        }
    };
    let border = |active: bool| {
        if active {
            Style::default().fg(ACCENT_COLOR)
        } else {
            Style::default().fg(BORDER_COLOR)
        }
    };

    let username = Paragraph::new(app.login.username.as_str())
        .style(field_style(app.login.cursor == 0))
        .block(
            Block::default()
                .title("Username")
                .borders(Borders::ALL)
                .border_type(BorderType::Rounded)
                .style(border(app.login.cursor == 0)),
        );
    f.render_widget(username, chunks[0]);

    let masked = "\u{2022}".repeat(app.login.password.chars().count());
    let password = Paragraph::new(masked)
        .style(field_style(app.login.cursor == 1))
        .block(
            Block::default()
                .title("Password")
                .borders(Borders::ALL)
                .border_type(BorderType::Rounded)
                .style(border(app.login.cursor == 1)),
        );
    f.render_widget(password, chunks[1]);

    let hint = if app.is_submitting {
        "Signing in..."
    } else {
        "[Tab] Switch field | [Enter] Log in | [Ctrl+C] Quit"
    };
    f.render_widget(
        Paragraph::new(hint)
            .style(Style::default().fg(WARNING_COLOR))
            .alignment(Alignment::Center),
        chunks[2],
    );

    let active_field = if app.login.cursor == 0 {
        (chunks[0], app.login.username.width())
    } else {
        (chunks[1], app.login.password.chars().count())
    };
    f.set_cursor_position((
        active_field.0.x + active_field.1 as u16 + 1,
        active_field.0.y + 1,
    ));
}

fn render_workspace(f: &mut Frame, app: &mut App) {
    let main_chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(3),
            Constraint::Length(3),
            Constraint::Min(0),
            Constraint::Length(3),
        ])
        .split(f.area());

    render_header(f, main_chunks[0], app);
    render_progress(f, main_chunks[1], app);
    render_content(f, main_chunks[2], app);
    render_footer(f, main_chunks[3], app);
}

fn render_header(f: &mut Frame, area: Rect, app: &App) {
    let title = " MQ Migration Console ";
    let subtitle = format!(
        "{}  |  [s] Source  [d] Destination",
        app.active_side.title()
    );

    let header_block = Block::default()
        .title(title)
        .title_alignment(Alignment::Center)
        .borders(Borders::ALL)
        .border_type(BorderType::Rounded)
        .style(Style::default().fg(BASE_FG).bg(BASE_BG));

    let header_content = Paragraph::new(subtitle)
        .style(Style::default().fg(ACCENT_COLOR))
        .alignment(Alignment::Center)
        .block(header_block);

    f.render_widget(header_content, area);
}

fn render_progress(f: &mut Frame, area: Rect, app: &App) {
    let workflow = app.active();
    let progress = workflow.progress();
    let steps = progress.steps();
    let labels = crate::types::WorkflowProgress::step_labels(app.active_side);
    let current = progress.current_step();

    let mut spans: Vec<Span> = Vec::new();
    for (i, label) in labels.iter().enumerate() {
        let (marker, style) = if steps[i] {
            ("[x]", Style::default().fg(SUCCESS_COLOR))
        } else if current == Some(i) {
            (
                "[>]",
                Style::default()
                    .fg(WARNING_COLOR)
                    .add_modifier(Modifier::BOLD),
            )
        } else {
            ("[ ]", Style::default().fg(BORDER_COLOR))
        };
        if i > 0 {
            spans.push(Span::styled("  \u{2500}\u{2500}  ", Style::default().fg(BORDER_COLOR)));
        }
        spans.push(Span::styled(format!("{marker} {label}"), style));
    }

    f.render_widget(
        Paragraph::new(Line::from(spans))
            .alignment(Alignment::Center)
            .block(
                Block::default()
                    .title("Progress")
                    .borders(Borders::ALL)
                    .border_type(BorderType::Rounded)
                    .style(Style::default().fg(BORDER_COLOR)),
            ),
        area,
    );
}

fn render_content(f: &mut Frame, area: Rect, app: &mut App) {
    let chunks = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Percentage(40), Constraint::Percentage(60)])
        .split(area);

    render_form(f, chunks[0], app);

    let right = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Percentage(50), Constraint::Percentage(50)])
        .split(chunks[1]);

    render_queue_list(f, right[0], app);
    render_logs(f, right[1], app);
}

fn render_form(f: &mut Frame, area: Rect, app: &App) {
    let workflow = app.active();
    let fields = app.visible_fields();
    let editing = app.input_mode == InputMode::Editing;

    let items: Vec<ListItem> = fields
        .iter()
        .enumerate()
        .map(|(i, field)| {
            let selected = i == app.form_cursor && app.focus == Focus::Form;
            let raw = if selected && editing {
                app.input_buffer.clone()
            } else {
                workflow.profile.value(*field)
            };
            let shown = if field.is_secret() && !(selected && editing) {
                "\u{2022}".repeat(raw.chars().count())
            } else {
                raw
            };
            let value = if field.is_selector() {
                format!("\u{25c4} {shown} \u{25ba}")
            } else if shown.is_empty() {
                "-".to_string()
            } else {
                shown
            };

            let style = if selected && editing {
                Style::default().fg(INPUT_TEXT).add_modifier(Modifier::BOLD)
            } else if selected {
                Style::default()
                    .fg(ACCENT_COLOR)
                    .add_modifier(Modifier::BOLD)
            } else {
                Style::default().fg(BASE_FG)
            };
            ListItem::new(format!("  {:<16} {}", field.label(), value)).style(style)
        })
        .collect();

    let connected = matches!(
        workflow.connection_state,
        crate::types::ConnectionState::Connected
    );
    let title = if connected {
        format!("{} (connected)", app.active_side.title())
    } else {
        app.active_side.title().to_string()
    };
    let border = if app.focus == Focus::Form {
        Style::default().fg(ACCENT_COLOR)
    } else if connected {
        Style::default().fg(SUCCESS_COLOR)
    } else {
        Style::default().fg(BORDER_COLOR)
    };

    let list = List::new(items)
        .block(
            Block::default()
                .title(title)
                .borders(Borders::ALL)
                .border_type(BorderType::Rounded)
                .style(border),
        )
        .highlight_style(
            Style::default()
                .bg(HIGHLIGHT_BG)
                .add_modifier(Modifier::BOLD),
        );

    let mut state = ListState::default();
    if app.focus == Focus::Form {
        state.select(Some(app.form_cursor));
    }
    f.render_stateful_widget(list, area, &mut state);
}

fn render_queue_list(f: &mut Frame, area: Rect, app: &App) {
    let workflow = app.active();
    let title = format!(
        "Queue Managers ({} selected)",
        workflow.selected_queues.len()
    );
    let border = if app.focus == Focus::Queues {
        Style::default().fg(ACCENT_COLOR)
    } else {
        Style::default().fg(BORDER_COLOR)
    };

    if workflow.queue_managers.is_empty() {
        let hint = if matches!(
            workflow.connection_state,
            crate::types::ConnectionState::Connected
        ) {
            "No queue managers found."
        } else {
            "Connect first to list queue managers."
        };
        f.render_widget(
            Paragraph::new(hint)
                .alignment(Alignment::Center)
                .style(Style::default().fg(BORDER_COLOR))
                .block(
                    Block::default()
                        .title(title)
                        .borders(Borders::ALL)
                        .border_type(BorderType::Rounded)
                        .style(border),
                ),
            area,
        );
        return;
    }

    let items: Vec<ListItem> = workflow
        .queue_managers
        .iter()
        .map(|qm| {
            let checked = workflow.selected_queues.contains(&qm.name);
            let marker = if checked { "[x]" } else { "[ ]" };
            let style = if checked {
                Style::default().fg(SUCCESS_COLOR)
            } else {
                Style::default().fg(BASE_FG)
            };
            ListItem::new(format!("  {marker} {}  ({})", qm.name, qm.state)).style(style)
        })
        .collect();

    let list = List::new(items)
        .block(
            Block::default()
                .title(title)
                .borders(Borders::ALL)
                .border_type(BorderType::Rounded)
                .style(border),
        )
        .highlight_style(
            Style::default()
                .bg(HIGHLIGHT_BG)
                .add_modifier(Modifier::BOLD),
        )
        .highlight_symbol("\u{25ba} ");

    let mut state = ListState::default();
    if app.focus == Focus::Queues {
        state.select(Some(workflow.queue_cursor));
    }
    f.render_stateful_widget(list, area, &mut state);
}

fn render_logs(f: &mut Frame, area: Rect, app: &App) {
    let workflow = app.active();
    let visible = area.height.saturating_sub(2) as usize;
    let skip = workflow.logs.len().saturating_sub(visible);
    let lines: Vec<Line> = workflow
        .logs
        .lines()
        .skip(skip)
        .map(|line| Line::from(line.to_string()))
        .collect();

    let title = if workflow.is_running {
        format!("Event Logs ({} running...)", app.active_side.operation_label())
    } else {
        "Event Logs".to_string()
    };

    f.render_widget(
        Paragraph::new(lines)
            .style(Style::default().fg(BASE_FG))
            .block(
                Block::default()
                    .title(title)
                    .borders(Borders::ALL)
                    .border_type(BorderType::Rounded)
                    .style(Style::default().fg(BORDER_COLOR)),
            ),
        area,
    );
}

fn render_footer(f: &mut Frame, area: Rect, app: &App) {
    let help_text = if app.input_mode == InputMode::Editing {
        " [Enter] Confirm | [Esc] Cancel ".to_string()
    } else {
        format!(
            " [Tab] Focus | [Enter] Edit/Cycle | [Space] Select | [c] Connect | [b] {} | [v] Report | [g] Guide | [h] Help | [q] Quit ",
            app.active_side.operation_label()
        )
    };

    f.render_widget(
        Paragraph::new(help_text)
            .block(
                Block::default()
                    .title("Controls")
                    .borders(Borders::ALL)
                    .border_type(BorderType::Rounded)
                    .style(Style::default().fg(BORDER_COLOR)),
            )
            .alignment(Alignment::Center)
            .style(Style::default().fg(BASE_FG)),
        area,
    );
}

fn render_toast(f: &mut Frame, app: &App) {
    let Some(toast) = &app.toast else {
        return;
    };
    let area = f.area();
    let width = (toast.message.width() as u16 + 4).min(area.width.saturating_sub(2));
    let toast_area = Rect {
        x: area.width.saturating_sub(width + 1),
        y: area.height.saturating_sub(4),
        width,
        height: 3,
    };
    let style = match toast.tone {
        ToastTone::Success => Style::default().fg(SUCCESS_COLOR),
        ToastTone::Error => Style::default().fg(ERROR_COLOR),
    };

    f.render_widget(Clear, toast_area);
    f.render_widget(
        Paragraph::new(toast.message.as_str())
            .alignment(Alignment::Center)
            .block(
                Block::default()
                    .borders(Borders::ALL)
                    .border_type(BorderType::Rounded)
                    .style(style),
            ),
        toast_area,
    );
}

fn render_guide_popup(f: &mut Frame, app: &App) {
    let steps = guide_steps(app.active_side);
    let (title, body) = steps[app.guide.step.min(steps.len() - 1)];
    let popup_area = centered_rect(60, 35, f.area());
    f.render_widget(Clear, popup_area);

    let text = vec![
        Line::from(""),
        Line::from(Span::styled(
            title,
            Style::default()
                .fg(ACCENT_COLOR)
                .add_modifier(Modifier::BOLD),
        )),
        Line::from(""),
        Line::from(body),
        Line::from(""),
        Line::from(Span::styled(
            format!(
                "Step {}/{}  |  [Enter] Next  [Esc] Skip tour",
                app.guide.step + 1,
                steps.len()
            ),
            Style::default().fg(WARNING_COLOR),
        )),
    ];

    f.render_widget(
        Paragraph::new(text)
            .alignment(Alignment::Center)
            .wrap(Wrap { trim: true })
            .block(
                Block::default()
                    .title("Getting Started")
                    .title_alignment(Alignment::Center)
                    .borders(Borders::ALL)
                    .border_type(BorderType::Double)
                    .style(Style::default().fg(BASE_FG).bg(BASE_BG)),
            ),
        popup_area,
    );
}

fn render_completion_popup(f: &mut Frame) {
    let popup_area = centered_rect(55, 30, f.area());
    f.render_widget(Clear, popup_area);

    let text = vec![
        Line::from(""),
        Line::from(Span::styled(
            "Backup completed successfully!",
            Style::default()
                .fg(SUCCESS_COLOR)
                .add_modifier(Modifier::BOLD),
        )),
        Line::from(""),
        Line::from("Continue to the destination side to migrate the"),
        Line::from("backed-up queue managers."),
        Line::from(""),
        Line::from(vec![
            Span::styled(
                "[Enter] ",
                Style::default()
                    .fg(SUCCESS_COLOR)
                    .add_modifier(Modifier::BOLD),
            ),
            Span::styled("Go to Destination  ", Style::default().fg(BASE_FG)),
            Span::styled(
                "[Esc] ",
                Style::default().fg(ERROR_COLOR).add_modifier(Modifier::BOLD),
            ),
            Span::styled("Stay here", Style::default().fg(BASE_FG)),
        ]),
    ];

    f.render_widget(
        Paragraph::new(text)
            .alignment(Alignment::Center)
            .wrap(Wrap { trim: true })
            .block(
                Block::default()
                    .title("Backup Complete")
                    .title_alignment(Alignment::Center)
                    .borders(Borders::ALL)
                    .border_type(BorderType::Double)
                    .style(Style::default().fg(BASE_FG).bg(BASE_BG)),
            ),
        popup_area,
    );
}

fn render_report_popup(f: &mut Frame, app: &App) {
    let Some(view) = &app.report else {
        return;
    };
    let popup_area = centered_rect(70, 70, f.area());
    f.render_widget(Clear, popup_area);

    let mut lines: Vec<Line> = Vec::new();
    if view.loading {
        lines.push(Line::from(""));
        lines.push(Line::from(Span::styled(
            "Loading report...",
            Style::default().fg(WARNING_COLOR),
        )));
    } else if let Some(error) = &view.error {
        lines.push(Line::from(""));
        lines.push(Line::from(Span::styled(
            "Unable to load MQ report.",
            Style::default().fg(ERROR_COLOR).add_modifier(Modifier::BOLD),
        )));
        lines.push(Line::from(""));
        lines.push(Line::from(error.as_str()));
    } else if let Some(report) = &view.report {
        for (label, section) in report.sections() {
            lines.push(Line::from(Span::styled(
                format!("{label} ({})", section.count()),
                Style::default()
                    .fg(ACCENT_COLOR)
                    .add_modifier(Modifier::BOLD),
            )));
            if section.list_of_objects.is_empty() {
                lines.push(Line::from(Span::styled(
                    "  (none)",
                    Style::default().fg(BORDER_COLOR),
                )));
            }
            for object in &section.list_of_objects {
                let text = match &object.kind {
                    Some(kind) => format!("  {} [{}]", object.name, kind),
                    None => format!("  {}", object.name),
                };
                lines.push(Line::from(text));
            }
            lines.push(Line::from(""));
        }
        lines.push(Line::from(Span::styled(
            "[e] Save as text  [Esc] Close",
            Style::default().fg(WARNING_COLOR),
        )));
    }

    f.render_widget(
        Paragraph::new(lines)
            .wrap(Wrap { trim: false })
            .block(
                Block::default()
                    .title(format!(" MQ Report: {} ", view.queue_name))
                    .title_alignment(Alignment::Center)
                    .borders(Borders::ALL)
                    .border_type(BorderType::Rounded)
                    .style(Style::default().fg(BASE_FG).bg(BASE_BG)),
            ),
        popup_area,
    );
}

fn render_help_popup(f: &mut Frame) {
    let popup_area = centered_rect(80, 70, f.area());
    f.render_widget(Clear, popup_area);

    let help_text = vec![
        Line::from(Span::styled(
            "HELP - MQ Migration Console",
            Style::default()
                .fg(Color::Cyan)
                .add_modifier(Modifier::BOLD),
        )),
        Line::from(""),
        Line::from(Span::styled(
            "Navigation:",
            Style::default()
                .fg(Color::Yellow)
                .add_modifier(Modifier::BOLD),
        )),
        Line::from("  s/d       Switch between Source and Destination"),
        Line::from("  Tab       Switch focus between form and queue list"),
        Line::from("  \u{2191}/\u{2193}       Move within the focused panel"),
        Line::from("  Enter     Edit a field / cycle a selector / toggle a queue"),
        Line::from(""),
        Line::from(Span::styled(
            "Commands:",
            Style::default()
                .fg(Color::Yellow)
                .add_modifier(Modifier::BOLD),
        )),
        Line::from("  C         Test connection (press again to disconnect)"),
        Line::from("  Space     Toggle queue manager selection"),
        Line::from("  B         Run backup (source) or migration (destination)"),
        Line::from("  V         View MQ report for the highlighted queue manager"),
        Line::from("  X         Clear the event log"),
        Line::from("  Shift+R   Reset this side's progress"),
        Line::from("  G         Show the guided tour again"),
        Line::from("  Shift+L   Log out and clear the saved session"),
        Line::from("  H         Toggle this help screen"),
        Line::from("  Q         Quit application"),
        Line::from(""),
        Line::from(Span::styled(
            "Press H or Esc to close this help",
            Style::default().fg(Color::Yellow),
        )),
    ];

    let help = Paragraph::new(help_text)
        .block(Block::default().borders(Borders::ALL).title("Help"))
        .wrap(Wrap { trim: true })
        .style(Style::default().bg(Color::Black));

    f.render_widget(help, popup_area);
}

fn centered_rect(percent_x: u16, percent_y: u16, r: Rect) -> Rect {
    let popup_layout = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Percentage((100 - percent_y) / 2),
            Constraint::Percentage(percent_y),
            Constraint::Percentage((100 - percent_y) / 2),
        ])
        .split(r);

    Layout::default()
        .direction(Direction::Horizontal)
        .constraints([
            Constraint::Percentage((100 - percent_x) / 2),
            Constraint::Percentage(percent_x),
            Constraint::Percentage((100 - percent_x) / 2),
        ])
        .split(popup_layout[1])[1]
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::MockApiClientTrait;
    use crate::app::{App, Screen};
    use crate::session::SessionRepository;
    use crossterm::event::{KeyCode, KeyModifiers};

    fn create_test_app() -> App {
        let mock_client = MockApiClientTrait::new();
        let mut app = App::new(
            Box::new(mock_client),
            SessionRepository::in_memory(),
            "ws://localhost:8080".to_string(),
        );
        app.screen = Screen::Workspace;
        app.guide_seen = [true, true];
        app.guide.open = false;
        app
    }

    #[tokio::test]
    async fn test_handle_normal_input_toggle_help() {
        let mut app = create_test_app();
        assert!(!app.show_help);

        handle_normal_input(&mut app, KeyCode::Char('h'), KeyModifiers::NONE)
            .await
            .unwrap();
        assert!(app.show_help);

        handle_normal_input(&mut app, KeyCode::Char('h'), KeyModifiers::NONE)
            .await
            .unwrap();
        assert!(!app.show_help);
    }

    #[tokio::test]
    async fn test_handle_edit_input_char_and_backspace() {
        let mut app = create_test_app();
        app.input_mode = InputMode::Editing;

        handle_edit_input(&mut app, KeyCode::Char('a')).await.unwrap();
        assert_eq!(app.input_buffer, "a");

        handle_edit_input(&mut app, KeyCode::Char('b')).await.unwrap();
        assert_eq!(app.input_buffer, "ab");

        handle_edit_input(&mut app, KeyCode::Backspace).await.unwrap();
        assert_eq!(app.input_buffer, "a");

        handle_edit_input(&mut app, KeyCode::Backspace).await.unwrap();
        assert_eq!(app.input_buffer, "");
    }

    #[tokio::test]
    async fn test_handle_edit_input_escape_clears_buffer() {
        let mut app = create_test_app();
        app.input_mode = InputMode::Editing;
        app.input_buffer = "some text".to_string();

        handle_edit_input(&mut app, KeyCode::Esc).await.unwrap();
        assert_eq!(app.input_mode, InputMode::Normal);
        assert!(app.input_buffer.is_empty());
    }

    #[tokio::test]
    async fn test_side_switch_keys() {
        let mut app = create_test_app();
        assert_eq!(app.active_side, Side::Source);

        handle_normal_input(&mut app, KeyCode::Char('d'), KeyModifiers::NONE)
            .await
            .unwrap();
        assert_eq!(app.active_side, Side::Destination);

        handle_normal_input(&mut app, KeyCode::Char('s'), KeyModifiers::NONE)
            .await
            .unwrap();
        assert_eq!(app.active_side, Side::Source);
    }

    #[tokio::test]
    async fn test_login_input_routes_to_fields() {
        let mut app = create_test_app();
        app.screen = Screen::Login;

        handle_normal_input(&mut app, KeyCode::Char('m'), KeyModifiers::NONE)
            .await
            .unwrap();
        assert_eq!(app.login.username, "m");

        handle_normal_input(&mut app, KeyCode::Tab, KeyModifiers::NONE)
            .await
            .unwrap();
        handle_normal_input(&mut app, KeyCode::Char('p'), KeyModifiers::NONE)
            .await
            .unwrap();
        assert_eq!(app.login.password, "p");
        assert_eq!(app.login.username, "m");
    }
}
