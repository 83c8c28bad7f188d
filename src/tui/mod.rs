mod export;
mod help;
mod state;

use crate::cli::Cli;
use crate::engine::QueryClient;
use crate::form::DraftKind;
use crate::model::{OutputTone, SubmissionRecord, SubmitEvent};
use crate::orchestrator::{self, ChannelUi, SubmissionController, UiCommand};
use anyhow::{Context, Result};
use crossterm::{
    event::{self, Event, KeyCode, KeyEvent, KeyEventKind, KeyModifiers},
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use export::{copy_to_clipboard, export_record_json};
use help::draw_help;
use ratatui::{
    backend::CrosstermBackend,
    layout::{Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Paragraph, Tabs, Wrap},
    Terminal,
};
use state::UiState;
use std::sync::Arc;
use std::{io, time::Duration, time::Instant};
use tokio::sync::mpsc;
use tokio::sync::mpsc::{UnboundedReceiver, UnboundedSender};

pub async fn run(args: Cli) -> Result<()> {
    let cfg = crate::cli::build_config(&args)?;
    let client = QueryClient::new(&cfg)?;

    let (event_tx, event_rx) = mpsc::unbounded_channel::<SubmitEvent>();
    let (cmd_tx, cmd_rx) = mpsc::unbounded_channel::<UiCommand>();

    let controller = Arc::new(SubmissionController::new(
        client,
        ChannelUi::new(event_tx.clone()),
    ));
    tracing::info!(
        base_url = %cfg.base_url,
        endpoint = %controller.endpoint(),
        "interactive session started"
    );

    // TUI runs in a dedicated thread to keep all blocking I/O out of the Tokio runtime.
    let ui_args = args.clone();
    let endpoint = cfg.endpoint.clone();
    let ui_handle =
        std::thread::spawn(move || run_threaded(ui_args, endpoint, event_rx, cmd_tx));

    let res = orchestrator::run_controller(controller, event_tx, cmd_rx).await;

    let join_res = tokio::task::spawn_blocking(move || ui_handle.join()).await;
    if let Ok(joined) = join_res {
        match joined {
            Ok(Ok(())) => {}
            Ok(Err(e)) => return Err(e),
            Err(_) => return Err(anyhow::anyhow!("TUI thread panicked")),
        }
    }

    res
}

/// What the key loop should do after a key press.
enum KeyFlow {
    Continue,
    Quit,
}

/// Run the TUI loop on a dedicated thread.
pub fn run_threaded(
    args: Cli,
    endpoint: String,
    mut event_rx: UnboundedReceiver<SubmitEvent>,
    cmd_tx: UnboundedSender<UiCommand>,
) -> Result<()> {
    enable_raw_mode().context("enable raw mode")?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen).ok();

    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend).context("create terminal")?;
    terminal.clear().ok();

    let initial_load = terminal
        .size()
        .map(|size| ((size.height as usize).saturating_sub(2) * 3).max(20))
        .unwrap_or(66);

    // UiState is owned by the UI thread only.
    let mut state = UiState {
        endpoint,
        auto_save: args.auto_save,
        draft: crate::cli::build_draft(&args),
        initial_history_load_size: initial_load,
        ..Default::default()
    };
    state.set_history(crate::storage::load_recent(initial_load).unwrap_or_default());

    let tick_rate = Duration::from_millis(100);
    let mut last_tick = Instant::now();

    let res = loop {
        while let Ok(ev) = event_rx.try_recv() {
            let completed = matches!(ev, SubmitEvent::Completed { .. });
            state.apply_event(ev);
            if completed {
                handle_submission_completed(&args, &mut state);
            }
        }

        if last_tick.elapsed() >= tick_rate {
            state.tick();
            terminal.draw(|f| draw(f.area(), f, &state)).ok();
            last_tick = Instant::now();
        }

        if event::poll(Duration::from_millis(10)).unwrap_or(false) {
            if let Ok(Event::Key(k)) = event::read() {
                if k.kind != KeyEventKind::Press {
                    continue;
                }
                if let KeyFlow::Quit = handle_key(&mut state, &cmd_tx, k) {
                    let _ = cmd_tx.send(UiCommand::Quit);
                    break Ok(());
                }
            }
        }
    };

    disable_raw_mode().ok();
    let mut stdout = io::stdout();
    execute!(stdout, LeaveAlternateScreen).ok();
    res
}

fn handle_key(state: &mut UiState, cmd_tx: &UnboundedSender<UiCommand>, k: KeyEvent) -> KeyFlow {
    if k.modifiers == KeyModifiers::CONTROL && k.code == KeyCode::Char('c') {
        return KeyFlow::Quit;
    }

    // An open edit line takes every other key.
    if let Some(buf) = state.editing.as_mut() {
        match k.code {
            KeyCode::Esc => {
                state.cancel_edit();
                state.info = "Edit cancelled".into();
            }
            KeyCode::Enter => match state.commit_edit() {
                Ok(()) => state.info.clear(),
                Err(e) => state.info = format!("Invalid entry: {e}"),
            },
            KeyCode::Backspace => {
                buf.text.pop();
            }
            KeyCode::Char(c) => buf.text.push(c),
            _ => {}
        }
        return KeyFlow::Continue;
    }

    match (k.modifiers, k.code) {
        (_, KeyCode::Char('q')) => return KeyFlow::Quit,
        (_, KeyCode::Tab) => {
            state.tab = (state.tab + 1) % 3;
            if state.tab == 1 {
                state.history_selected = 0;
            }
        }
        (_, KeyCode::Char('?')) => state.tab = 2,
        (_, KeyCode::Char('t')) => {
            state.auto_save = !state.auto_save;
            state.info = if state.auto_save {
                "Auto-save enabled".into()
            } else {
                "Auto-save disabled".into()
            };
        }
        _ if state.tab == 0 => handle_form_key(state, cmd_tx, k),
        _ if state.tab == 1 => handle_history_key(state, k),
        _ => {}
    }
    KeyFlow::Continue
}

fn handle_form_key(state: &mut UiState, cmd_tx: &UnboundedSender<UiCommand>, k: KeyEvent) {
    match (k.modifiers, k.code) {
        // Plain `s` and Ctrl-S both land here.
        (_, KeyCode::Char('s')) => submit_draft(state, cmd_tx),
        (_, KeyCode::Char('a')) => state.begin_add(DraftKind::Text),
        (_, KeyCode::Char('f')) => state.begin_add(DraftKind::File),
        (_, KeyCode::Enter) => state.begin_edit(),
        (_, KeyCode::Char('d')) => {
            if let Some(removed) = state.delete_selected() {
                state.info = format!("Removed {}", removed.name);
            }
        }
        (_, KeyCode::Up) | (_, KeyCode::Char('k')) => state.select_prev(),
        (_, KeyCode::Down) | (_, KeyCode::Char('j')) => state.select_next(),
        (_, KeyCode::PageDown) => state.output_scroll = state.output_scroll.saturating_add(5),
        (_, KeyCode::PageUp) => state.output_scroll = state.output_scroll.saturating_sub(5),
        (_, KeyCode::Char('y')) => match copy_to_clipboard(&state.output) {
            Ok(()) => state.info = "✓ Output copied to clipboard".into(),
            Err(e) => state.info = format!("Clipboard copy failed: {e:#}"),
        },
        (_, KeyCode::Char('x')) => match state.last_record.clone() {
            Some(r) => export_and_show_path(r, state),
            None => state.info = "No settled submission to export yet.".into(),
        },
        _ => {}
    }
}

/// Capture the draft and hand it to the controller. Files are read here, so
/// an unreadable path is reported without entering the busy state.
fn submit_draft(state: &mut UiState, cmd_tx: &UnboundedSender<UiCommand>) {
    if !state.can_submit() {
        state.info = "Submission in progress…".into();
        return;
    }
    match state.draft.capture() {
        Ok(form) => {
            let parts = form.len();
            if cmd_tx.send(UiCommand::Submit(form)).is_ok() {
                state.info = format!("Submitted {parts} part(s)");
            } else {
                state.info = "Controller stopped; restart to submit".into();
            }
        }
        Err(e) => {
            tracing::warn!(error = %e, "form capture failed");
            state.info = format!("Cannot submit: {e}");
        }
    }
}

fn handle_history_key(state: &mut UiState, k: KeyEvent) {
    match k.code {
        KeyCode::Up | KeyCode::Char('k') => state.history_prev(),
        KeyCode::Down | KeyCode::Char('j') => state.history_next(),
        KeyCode::Char('r') => {
            let reload_size = state
                .initial_history_load_size
                .max(state.history_loaded_count);
            match crate::storage::load_recent(reload_size) {
                Ok(new_history) => {
                    let old_count = state.history.len();
                    state.set_history(new_history);
                    let new_count = state.history.len();
                    state.info = if new_count > old_count {
                        format!("Refreshed: {} new submission(s)", new_count - old_count)
                    } else if new_count < old_count {
                        format!("Refreshed: {} submission(s) removed", old_count - new_count)
                    } else {
                        "Refreshed".into()
                    };
                }
                Err(e) => state.info = format!("Refresh failed: {e:#}"),
            }
        }
        KeyCode::Char('d') => {
            if let Some(to_delete) = state.selected_history().cloned() {
                match crate::storage::delete_record(&to_delete) {
                    Ok(()) => {
                        let mut rest = std::mem::take(&mut state.history);
                        rest.remove(state.history_selected);
                        state.set_history(rest);
                        state.info = "Deleted".into();
                    }
                    Err(e) => state.info = format!("Delete failed: {e:#}"),
                }
            }
        }
        KeyCode::Char('x') => {
            if let Some(r) = state.selected_history().cloned() {
                export_and_show_path(r, state);
            }
        }
        KeyCode::Char('c') => {
            match state.selected_history().and_then(|r| r.outcome.thread_id()) {
                Some(id) => {
                    state.continue_thread(id);
                    state.tab = 0;
                }
                None => state.info = "Selected submission has no thread to continue.".into(),
            }
        }
        KeyCode::Char('y') => match state.last_exported_path.clone() {
            Some(path) => match copy_to_clipboard(&path) {
                Ok(()) => state.info = format!("✓ Copied to clipboard: {path}"),
                Err(e) => state.info = format!("Clipboard copy failed: {e:#}"),
            },
            None => state.info = "No exported file path to copy. Export a file first (x)".into(),
        },
        _ => {}
    }
}

fn export_and_show_path(r: SubmissionRecord, state: &mut UiState) {
    match export_record_json(&r) {
        Ok(p) => {
            state.last_exported_path = Some(p.to_string_lossy().to_string());
            state.info = format!("Exported JSON: {}", p.display());
        }
        Err(e) => state.info = format!("JSON export failed: {e:#}"),
    }
}

/// Save, export and reload history for the record the reducer just stored.
fn handle_submission_completed(args: &Cli, state: &mut UiState) {
    let Some(record) = state.last_record.clone() else {
        return;
    };
    let reload_size = (state.history_loaded_count + 1).max(state.initial_history_load_size);
    let processed = orchestrator::process_submission(args, reload_size, state.auto_save, &record);

    if let Some(path) = processed.auto_saved_path.as_ref() {
        state.info = format!("Saved: {}", path.display());
    }
    if !processed.export_messages.is_empty() {
        state.info = processed.export_messages.join("; ");
    }

    state.set_history(processed.history);
    if state.tab == 1 {
        state.history_selected = 0;
    }
}

fn draw(area: Rect, f: &mut ratatui::Frame, state: &UiState) {
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Length(3), Constraint::Min(0)].as_ref())
        .split(area);

    let tabs = Tabs::new(vec![
        Line::from("Form"),
        Line::from("History"),
        Line::from("Help"),
    ])
    .select(state.tab)
    .block(Block::default().borders(Borders::ALL).title("query-submit"))
    .highlight_style(Style::default().fg(Color::Yellow));
    f.render_widget(tabs, chunks[0]);

    match state.tab {
        0 => draw_form(chunks[1], f, state),
        1 => draw_history(chunks[1], f, state),
        _ => draw_help(chunks[1], f),
    }
}

fn key(k: &str) -> Span<'static> {
    Span::styled(k.to_string(), Style::default().fg(Color::Magenta))
}

fn draw_form(area: Rect, f: &mut ratatui::Frame, state: &UiState) {
    let edit_height = if state.editing.is_some() { 3 } else { 0 };
    let rows = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length((state.draft.entries.len().max(1) as u16).min(12) + 2),
            Constraint::Length(edit_height),
            Constraint::Length(3),
            Constraint::Min(3),
            Constraint::Length(1),
        ])
        .split(area);

    // Draft rows
    let mut lines: Vec<Line> = Vec::new();
    if state.draft.is_empty() {
        lines.push(Line::from(vec![
            Span::raw("Empty form: press "),
            key("a"),
            Span::raw(" to add a field, "),
            key("f"),
            Span::raw(" to add a file"),
        ]));
    }
    for (i, entry) in state.draft.entries.iter().enumerate() {
        let selected = i == state.selected;
        let tag = match entry.kind {
            DraftKind::Text => "[text] ",
            DraftKind::File => "[file] ",
        };
        let row_style = if selected {
            Style::default().add_modifier(Modifier::REVERSED)
        } else {
            Style::default()
        };
        lines.push(
            Line::from(vec![
                Span::raw(if selected { "› " } else { "  " }),
                Span::styled(tag, Style::default().fg(Color::Gray)),
                Span::styled(entry.name.clone(), Style::default().fg(Color::Cyan)),
                Span::raw(" = "),
                Span::raw(entry.value.clone()),
            ])
            .style(row_style),
        );
    }
    let title = format!("Form → {}", state.endpoint);
    f.render_widget(
        Paragraph::new(lines).block(Block::default().borders(Borders::ALL).title(title)),
        rows[0],
    );

    if let Some(buf) = state.editing.as_ref() {
        let title = match (buf.kind, buf.target) {
            (DraftKind::Text, None) => "New field (NAME=VALUE, Enter to add, Esc to cancel)",
            (DraftKind::File, None) => "New file ([NAME=]PATH, Enter to add, Esc to cancel)",
            (_, Some(_)) => "Edit row (Enter to save, Esc to cancel)",
        };
        f.render_widget(
            Paragraph::new(Line::from(vec![
                Span::raw(buf.text.clone()),
                Span::styled("▏", Style::default().fg(Color::Yellow)),
            ]))
            .block(Block::default().borders(Borders::ALL).title(title)),
            rows[1],
        );
    }

    // Submit affordance and loading indicator
    let submit_style = if state.submit_enabled {
        Style::default().fg(Color::Green).add_modifier(Modifier::BOLD)
    } else {
        Style::default()
            .fg(Color::DarkGray)
            .add_modifier(Modifier::DIM)
    };
    let mut submit_line = vec![Span::styled("[ Submit ]", submit_style)];
    if state.loading_visible {
        submit_line.push(Span::raw("  "));
        submit_line.push(Span::styled(
            format!("{} Waiting for the server", state.spinner()),
            Style::default().fg(Color::Yellow),
        ));
    } else {
        submit_line.push(Span::raw("  "));
        submit_line.push(key("s"));
        submit_line.push(Span::raw(" submit  "));
        submit_line.push(key("?"));
        submit_line.push(Span::raw(" help"));
    }
    f.render_widget(
        Paragraph::new(Line::from(submit_line)).block(Block::default().borders(Borders::ALL)),
        rows[2],
    );

    let output_style = match state.output_tone {
        OutputTone::Neutral => Style::default(),
        OutputTone::Error => Style::default().fg(Color::Red),
    };
    f.render_widget(
        Paragraph::new(state.output.as_str())
            .style(output_style)
            .wrap(Wrap { trim: false })
            .scroll((state.output_scroll, 0))
            .block(Block::default().borders(Borders::ALL).title("Output")),
        rows[3],
    );

    draw_status(rows[4], f, state);
}

fn draw_status(area: Rect, f: &mut ratatui::Frame, state: &UiState) {
    let auto = if state.auto_save { "on" } else { "off" };
    f.render_widget(
        Paragraph::new(Line::from(vec![
            Span::styled(
                format!("auto-save {auto}"),
                Style::default().fg(Color::DarkGray),
            ),
            Span::raw("  "),
            Span::raw(state.info.clone()),
        ])),
        area,
    );
}

fn draw_history(area: Rect, f: &mut ratatui::Frame, state: &UiState) {
    let rows = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Percentage(50),
            Constraint::Min(3),
            Constraint::Length(1),
        ])
        .split(area);

    let total_count = state.history.len();
    let current_pos = if total_count > 0 {
        state.history_selected + 1
    } else {
        0
    };
    let max_items = (rows[0].height as usize).saturating_sub(2).max(1);
    // Keep the selection on screen.
    let offset = state.history_selected.saturating_sub(max_items - 1);

    let mut lines: Vec<Line> = Vec::new();
    if state.history.is_empty() {
        lines.push(Line::from("No saved submissions yet."));
    }
    for (i, r) in state.history.iter().enumerate().skip(offset).take(max_items) {
        let selected = i == state.history_selected;
        let label_color = match r.tone {
            OutputTone::Neutral => Color::Green,
            OutputTone::Error => Color::Red,
        };
        let status = r
            .outcome
            .status()
            .map(|s| s.to_string())
            .unwrap_or_else(|| "---".into());
        let width = (rows[0].width as usize).saturating_sub(46).max(10);
        let line = Line::from(vec![
            Span::raw(if selected { "› " } else { "  " }),
            Span::styled(r.timestamp_utc.clone(), Style::default().fg(Color::Gray)),
            Span::raw(" "),
            Span::styled(format!("{:<11}", r.outcome.label()), Style::default().fg(label_color)),
            Span::raw(format!("{status:>4} ")),
            Span::raw(r.headline(width)),
        ]);
        lines.push(if selected {
            line.style(Style::default().add_modifier(Modifier::REVERSED))
        } else {
            line
        });
    }
    let title = format!("History ({current_pos}/{total_count})");
    f.render_widget(
        Paragraph::new(lines).block(Block::default().borders(Borders::ALL).title(title)),
        rows[0],
    );

    let detail = match state.selected_history() {
        Some(r) => {
            let mut text = String::new();
            for line in crate::text_summary::build_text_summary(r).lines {
                text.push_str(&line);
                text.push('\n');
            }
            text.push('\n');
            text.push_str(&r.output);
            text
        }
        None => String::new(),
    };
    f.render_widget(
        Paragraph::new(detail)
            .wrap(Wrap { trim: false })
            .block(Block::default().borders(Borders::ALL).title("Details")),
        rows[1],
    );

    draw_status(rows[2], f, state);
}
