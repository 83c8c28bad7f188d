use ratatui::{
    layout::Rect,
    style::Color,
    style::Style,
    text::{Line, Span},
    widgets::{Block, Borders, Paragraph},
    Frame,
};

fn key_line(key: &str, pad: usize, action: &str) -> Line<'static> {
    Line::from(vec![
        Span::raw("  "),
        Span::styled(key.to_string(), Style::default().fg(Color::Magenta)),
        Span::raw(format!("{:width$}{action}", "", width = pad)),
    ])
}

pub fn draw_help(area: Rect, f: &mut Frame) {
    let p = Paragraph::new(vec![
        Line::from("Keybinds:"),
        Line::from(vec![
            Span::raw("  "),
            Span::styled("q", Style::default().fg(Color::Magenta)),
            Span::raw(" / "),
            Span::styled("Ctrl-C", Style::default().fg(Color::Magenta)),
            Span::raw("  Quit (drops a request still in flight)"),
        ]),
        key_line("tab", 9, "Switch tabs"),
        key_line("?", 11, "Show this help"),
        key_line("t", 11, "Toggle auto-save"),
        Line::from(""),
        Line::from("Form tab:"),
        key_line("a", 11, "Add a text field (NAME=VALUE)"),
        key_line("f", 11, "Add a file ([NAME=]PATH, NAME defaults to files)"),
        key_line("enter", 7, "Edit selected row / confirm edit"),
        key_line("esc", 9, "Cancel edit"),
        key_line("d", 11, "Delete selected row"),
        Line::from(vec![
            Span::raw("  "),
            Span::styled("s", Style::default().fg(Color::Magenta)),
            Span::raw(" / "),
            Span::styled("Ctrl-S", Style::default().fg(Color::Magenta)),
            Span::raw("  Submit (ignored while a request is in flight)"),
        ]),
        key_line("PgUp/PgDn", 3, "Scroll output"),
        key_line("y", 11, "Copy output to clipboard"),
        key_line("x", 11, "Export last submission as JSON"),
        Line::from(""),
        Line::from("History tab:"),
        Line::from(vec![
            Span::raw("  "),
            Span::styled("↑/↓", Style::default().fg(Color::Magenta)),
            Span::raw(" or "),
            Span::styled("j/k", Style::default().fg(Color::Magenta)),
            Span::raw("  Navigate"),
        ]),
        key_line("c", 11, "Continue the selected submission's thread"),
        key_line("x", 11, "Export selected as JSON"),
        key_line("y", 11, "Copy exported path to clipboard"),
        key_line("d", 11, "Delete selected"),
        key_line("r", 11, "Refresh history"),
    ])
    .block(Block::default().borders(Borders::ALL).title("Help"));
    f.render_widget(p, area);
}
