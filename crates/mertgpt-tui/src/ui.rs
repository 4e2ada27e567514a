use ratatui::{
    Frame,
    layout::{Constraint, Layout, Rect},
    style::{Color, Modifier, Style, Stylize},
    text::{Line, Span, Text},
    widgets::{Block, Borders, Clear, Paragraph, Wrap},
};
use crate::app::{App, Screen, SettingsField, SettingsForm, ToastKind};
use mertgpt_core::Role;

/// Wrap text to fit within a given width, returning multiple lines
/// Breaks on word boundaries; a word wider than the line is split across rows
/// the same way the paragraph widget does it
fn wrap_text_to_width(text: &str, width: usize) -> Vec<String> {
    if width == 0 {
        return vec![text.to_string()];
    }

    let mut lines = Vec::new();
    let mut current_line = String::new();
    let mut current_len = 0;

    for word in text.split_whitespace() {
        let word_len = word.chars().count();

        if current_len > 0 && current_len + 1 + word_len <= width {
            current_line.push(' ');
            current_line.push_str(word);
            current_len += 1 + word_len;
            continue;
        }

        if current_len > 0 {
            lines.push(std::mem::take(&mut current_line));
        }

        // Long URLs, paths and code tokens take whole rows until the tail fits
        let mut chars = word.chars().peekable();
        current_line = chars.by_ref().take(width).collect();
        while chars.peek().is_some() {
            lines.push(std::mem::take(&mut current_line));
            current_line = chars.by_ref().take(width).collect();
        }
        current_len = current_line.chars().count();
    }

    if !current_line.is_empty() {
        lines.push(current_line);
    }

    if lines.is_empty() {
        lines.push(String::new());
    }

    lines
}

/// Rows a rendered line occupies once the paragraph wraps it
fn line_rows(line: &Line, width: usize) -> usize {
    let text: String = line.spans.iter().map(|s| s.content.as_ref()).collect();
    wrap_text_to_width(&text, width).len()
}

/// Parse a line of text and convert **bold** markdown to styled spans
fn parse_markdown_line(text: &str, base: Style) -> Line<'static> {
    let mut spans: Vec<Span<'static>> = Vec::new();
    let mut rest = text;

    while let Some(start) = rest.find("**") {
        let after = &rest[start + 2..];
        let Some(end) = after.find("**") else {
            break;
        };
        if end == 0 {
            // "****" is literal
            spans.push(Span::styled(rest[..start + 4].to_string(), base));
            rest = &after[2..];
            continue;
        }

        if start > 0 {
            spans.push(Span::styled(rest[..start].to_string(), base));
        }
        spans.push(Span::styled(
            after[..end].to_string(),
            base.add_modifier(Modifier::BOLD),
        ));
        rest = &after[end + 2..];
    }

    if !rest.is_empty() {
        spans.push(Span::styled(rest.to_string(), base));
    }

    if spans.is_empty() {
        Line::default()
    } else {
        Line::from(spans)
    }
}

/// Slice of `text` that keeps the cursor visible in `width` columns, plus the cursor column
fn visible_window(text: &str, cursor: usize, width: usize) -> (String, u16) {
    let scroll_offset = if width == 0 {
        0
    } else if cursor >= width {
        cursor - width + 1
    } else {
        0
    };

    let visible: String = text.chars().skip(scroll_offset).take(width).collect();
    (visible, (cursor - scroll_offset) as u16)
}

pub fn render(app: &mut App, frame: &mut Frame) {
    let area = frame.area();

    // Main layout: header, body, input, footer
    let [header_area, body_area, input_area, footer_area] = Layout::vertical([
        Constraint::Length(1),
        Constraint::Min(0),
        Constraint::Length(3),
        Constraint::Length(1),
    ])
    .areas(area);

    render_header(app, frame, header_area);

    match app.screen() {
        Screen::Welcome => render_welcome(app, frame, body_area),
        Screen::Chat => render_chat(app, frame, body_area),
    }

    render_input(app, frame, input_area);
    render_footer(app, frame, footer_area);

    if let Some(form) = &app.settings_form {
        render_settings_modal(form, frame, area);
    }
    render_toast(app, frame, area);
}

fn render_header(app: &App, frame: &mut Frame, area: Rect) {
    let title = Line::from(vec![
        Span::styled(" MertGPT ", Style::default().fg(Color::Cyan).bold()),
        Span::styled(
            format!("[{}]", app.controller.settings().model),
            Style::default().fg(Color::White),
        ),
        Span::raw(" "),
        Span::styled(
            format!("v{}", env!("CARGO_PKG_VERSION")),
            Style::default().fg(Color::Gray),
        ),
    ]);

    let header = Paragraph::new(title).style(Style::default().bg(Color::DarkGray));
    frame.render_widget(header, area);
}

fn render_footer(app: &App, frame: &mut Frame, area: Rect) {
    // Key style: dark background with bright text for visibility on both light/dark terminals
    let key_style = Style::default().bg(Color::DarkGray).fg(Color::White);
    let label_style = Style::default().bg(Color::Black).fg(Color::White);

    let hints: &[(&str, &str)] = if app.settings_form.is_some() {
        &[
            ("Tab", "next field"),
            ("↑↓", "model"),
            ("^R", "show key"),
            ("Enter", "save"),
            ("Esc", "cancel"),
        ]
    } else {
        &[
            ("Enter", "send"),
            ("^N", "new chat"),
            ("^S", "settings"),
            ("PgUp/PgDn", "scroll"),
            ("^C", "quit"),
        ]
    };

    let mut spans = Vec::with_capacity(hints.len() * 2);
    for (key, label) in hints {
        spans.push(Span::styled(format!(" {} ", key), key_style));
        spans.push(Span::styled(format!(" {} ", label), label_style));
    }

    frame.render_widget(Paragraph::new(Line::from(spans)), area);
}

fn render_welcome(app: &App, frame: &mut Frame, area: Rect) {
    let mut lines = vec![
        Line::default(),
        Line::from(Span::styled(
            "How can I help you today?",
            Style::default().fg(Color::Cyan).add_modifier(Modifier::BOLD),
        )),
        Line::default(),
        Line::from(Span::styled(
            "Type a message below and press Enter.",
            Style::default().fg(Color::DarkGray),
        )),
    ];

    if !app.controller.settings().has_api_key() {
        lines.push(Line::default());
        lines.push(Line::from(Span::styled(
            "No API key configured. Press Ctrl+S to open settings.",
            Style::default().fg(Color::Yellow),
        )));
    }

    let top_padding = area.height.saturating_sub(lines.len() as u16) / 3;
    let [_, text_area] =
        Layout::vertical([Constraint::Length(top_padding), Constraint::Min(0)]).areas(area);

    let welcome = Paragraph::new(Text::from(lines))
        .centered()
        .wrap(Wrap { trim: true });
    frame.render_widget(welcome, text_area);
}

fn render_chat(app: &mut App, frame: &mut Frame, area: Rect) {
    let mut lines: Vec<Line> = Vec::new();

    for entry in app.transcript.entries() {
        match entry.role {
            Role::User => {
                lines.push(Line::from(Span::styled(
                    "You:",
                    Style::default().fg(Color::Cyan).add_modifier(Modifier::BOLD),
                )));
                for line in entry.text.lines() {
                    lines.push(Line::from(line.to_string()));
                }
            }
            _ => {
                lines.push(Line::from(Span::styled(
                    "MGPT:",
                    Style::default().fg(Color::Yellow).add_modifier(Modifier::BOLD),
                )));
                let base = if entry.is_error {
                    Style::default().fg(Color::Red)
                } else {
                    Style::default()
                };
                for line in entry.text.lines() {
                    lines.push(parse_markdown_line(line, base));
                }
            }
        }
        lines.push(Line::default());
    }

    if app.transcript.is_typing() {
        lines.push(Line::from(Span::styled(
            "MGPT:",
            Style::default().fg(Color::Yellow).add_modifier(Modifier::BOLD),
        )));
        // Animated ellipsis: cycles through ".", "..", "..."
        let dots = ".".repeat((app.animation_frame as usize) + 1);
        lines.push(Line::from(Span::styled(
            format!("Thinking{}", dots),
            Style::default().fg(Color::DarkGray).add_modifier(Modifier::ITALIC),
        )));
    }

    // Keep the scroll offset within the content, following the tail when at the bottom
    let inner_width = area.width.saturating_sub(2) as usize;
    let inner_height = area.height.saturating_sub(2);
    app.chat_height = inner_height;

    let total_rows: usize = lines.iter().map(|l| line_rows(l, inner_width)).sum();
    let max_scroll = total_rows
        .saturating_sub(inner_height as usize)
        .min(u16::MAX as usize) as u16;
    if app.follow_tail || app.chat_scroll >= max_scroll {
        app.chat_scroll = max_scroll;
        app.follow_tail = true;
    }

    let chat_block = Block::default()
        .borders(Borders::ALL)
        .border_style(Style::default().fg(Color::DarkGray))
        .title(format!(" Chat ({} turns) ", app.controller.conversation().len()));

    let chat = Paragraph::new(Text::from(lines))
        .block(chat_block)
        .wrap(Wrap { trim: true })
        .scroll((app.chat_scroll, 0));

    frame.render_widget(chat, area);
}

fn render_input(app: &App, frame: &mut Frame, area: Rect) {
    let sending = app.controller.is_sending();
    let (border_color, title) = if sending {
        (Color::DarkGray, " Waiting for reply... ")
    } else {
        (Color::Yellow, " Message MGPT ")
    };

    let input_block = Block::default()
        .borders(Borders::ALL)
        .border_style(Style::default().fg(border_color))
        .title(title);

    // Inner width = total width - 2 (for borders)
    let inner_width = area.width.saturating_sub(2) as usize;
    let (visible_text, cursor_x) = visible_window(&app.input, app.input_cursor, inner_width);

    let input = Paragraph::new(visible_text)
        .style(Style::default().fg(Color::Cyan))
        .block(input_block);

    frame.render_widget(input, area);

    if app.settings_form.is_none() {
        frame.set_cursor_position((area.x + cursor_x + 1, area.y + 1));
    }
}

fn render_settings_modal(form: &SettingsForm, frame: &mut Frame, area: Rect) {
    // Calculate popup size and position (centered)
    let popup_width = 64.min(area.width.saturating_sub(4));
    let popup_height = 12.min(area.height.saturating_sub(2));

    let popup_x = (area.width.saturating_sub(popup_width)) / 2;
    let popup_y = (area.height.saturating_sub(popup_height)) / 2;

    let popup_area = Rect::new(popup_x, popup_y, popup_width, popup_height);

    // Clear the area behind the popup
    frame.render_widget(Clear, popup_area);

    let block = Block::default()
        .borders(Borders::ALL)
        .border_style(Style::default().fg(Color::Cyan))
        .title(" Settings ");

    let inner = block.inner(popup_area);
    frame.render_widget(block, popup_area);

    let fields = [
        (SettingsField::ApiKey, "API Key"),
        (SettingsField::Endpoint, "API Endpoint"),
        (SettingsField::Model, "Model (↑/↓ to choose)"),
    ];

    for (row, (field, label)) in fields.into_iter().enumerate() {
        let y = inner.y + (row as u16) * 3;
        if y + 1 >= inner.y + inner.height {
            break;
        }

        let focused = form.focus == field;
        let label_style = if focused {
            Style::default().fg(Color::Yellow).add_modifier(Modifier::BOLD)
        } else {
            Style::default().fg(Color::Gray)
        };
        frame.render_widget(
            Paragraph::new(label).style(label_style),
            Rect::new(inner.x, y, inner.width, 1),
        );

        // Mask the key one-for-one so the cursor column still lines up
        let value = form.field(field);
        let shown = if field == SettingsField::ApiKey && !form.reveal_key {
            "*".repeat(value.chars().count())
        } else {
            value.to_string()
        };

        let value_area = Rect::new(inner.x, y + 1, inner.width, 1);
        let cursor = if focused { form.cursor } else { 0 };
        let (visible, cursor_x) = visible_window(&shown, cursor, value_area.width as usize);

        frame.render_widget(
            Paragraph::new(visible).style(Style::default().fg(Color::Cyan)),
            value_area,
        );

        if focused {
            frame.set_cursor_position((value_area.x + cursor_x, value_area.y));
        }
    }
}

fn render_toast(app: &App, frame: &mut Frame, area: Rect) {
    let Some(toast) = &app.toast else {
        return;
    };

    let color = match toast.kind {
        ToastKind::Success => Color::Green,
        ToastKind::Error => Color::Red,
        ToastKind::Info => Color::Yellow,
    };

    let width = (toast.message.chars().count() as u16 + 4)
        .min(40)
        .min(area.width);
    let text_width = width.saturating_sub(2) as usize;
    let height = (wrap_text_to_width(&toast.message, text_width).len() as u16 + 2).min(area.height);
    let toast_area = Rect::new(area.width.saturating_sub(width + 1), 1, width, height);

    frame.render_widget(Clear, toast_area);
    let widget = Paragraph::new(toast.message.as_str())
        .style(Style::default().fg(Color::White).add_modifier(Modifier::BOLD))
        .wrap(Wrap { trim: true })
        .block(
            Block::default()
                .borders(Borders::ALL)
                .border_style(Style::default().fg(color)),
        );
    frame.render_widget(widget, toast_area);
}

#[cfg(test)]
mod tests {
    use super::*;
    use ratatui::{backend::TestBackend, Terminal};

    fn plain(line: &Line) -> String {
        line.spans.iter().map(|s| s.content.as_ref()).collect()
    }

    #[test]
    fn test_wrap_text_to_width_breaks_on_words() {
        let lines = wrap_text_to_width("the quick brown fox", 10);
        assert_eq!(lines, vec!["the quick", "brown fox"]);
        assert_eq!(wrap_text_to_width("", 10), vec![String::new()]);
    }

    #[test]
    fn test_wrap_text_to_width_splits_long_words() {
        let url = "https://example.com/a/very/long/path";
        let lines = wrap_text_to_width(&format!("see {} now", url), 10);
        assert_eq!(
            lines,
            vec!["see", "https://ex", "ample.com/", "a/very/lon", "g/path now"]
        );
    }

    #[test]
    fn test_line_rows_matches_rendered_paragraph() {
        let line = Line::from("x".repeat(50));
        assert_eq!(line_rows(&line, 10), 5);

        let mut terminal = Terminal::new(TestBackend::new(10, 8)).unwrap();
        terminal
            .draw(|frame| {
                let paragraph = Paragraph::new(line.clone()).wrap(Wrap { trim: true });
                frame.render_widget(paragraph, frame.area());
            })
            .unwrap();

        let buffer = terminal.backend().buffer();
        let rendered_rows = (0..8usize)
            .filter(|y| buffer.content[y * 10].symbol() == "x")
            .count();
        assert_eq!(rendered_rows, 5);
    }

    #[test]
    fn test_parse_markdown_line_bolds_pairs() {
        let line = parse_markdown_line("a **bold** move", Style::default());
        assert_eq!(line.spans.len(), 3);
        assert_eq!(line.spans[1].content, "bold");
        assert!(line.spans[1].style.add_modifier.contains(Modifier::BOLD));
        assert_eq!(plain(&line), "a bold move");
    }

    #[test]
    fn test_parse_markdown_line_keeps_unclosed_markers() {
        let line = parse_markdown_line("2 ** 3", Style::default());
        assert_eq!(plain(&line), "2 ** 3");
    }

    #[test]
    fn test_visible_window_scrolls_with_cursor() {
        assert_eq!(visible_window("abcdef", 2, 4), ("abcd".to_string(), 2));
        assert_eq!(visible_window("abcdef", 6, 4), ("def".to_string(), 3));
    }
}
