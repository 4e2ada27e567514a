use anyhow::Result;
use crossterm::event::{KeyCode, KeyEvent, KeyModifiers, MouseEvent, MouseEventKind};
use crate::app::{App, SettingsField};
use crate::tui::AppEvent;

/// Lines moved per mouse wheel notch
const WHEEL_LINES: u16 = 3;

/// Convert a character index to a byte index for UTF-8 safe string operations
fn char_to_byte_index(s: &str, char_idx: usize) -> usize {
    s.char_indices()
        .nth(char_idx)
        .map(|(i, _)| i)
        .unwrap_or(s.len())
}

pub fn handle_event(app: &mut App, event: AppEvent) -> Result<()> {
    match event {
        AppEvent::Key(key) => handle_key(app, key),
        AppEvent::Mouse(mouse) => handle_mouse(app, mouse),
        AppEvent::Resize => {}
        AppEvent::Tick => app.tick(),
        AppEvent::Completion(completion) => app.handle_completion(completion),
    }
    Ok(())
}

fn handle_key(app: &mut App, key: KeyEvent) {
    // Global keys that work everywhere
    let ctrl = key.modifiers.contains(KeyModifiers::CONTROL);
    if ctrl && matches!(key.code, KeyCode::Char('c') | KeyCode::Char('q')) {
        app.should_quit = true;
        return;
    }

    if app.settings_form.is_some() {
        handle_settings_key(app, key);
    } else {
        handle_chat_key(app, key);
    }
}

fn handle_chat_key(app: &mut App, key: KeyEvent) {
    let ctrl = key.modifiers.contains(KeyModifiers::CONTROL);

    match key.code {
        KeyCode::Char('n') if ctrl => app.new_chat(),
        KeyCode::Char('s') if ctrl => app.open_settings(),
        KeyCode::F(2) => app.open_settings(),
        KeyCode::Enter => app.submit_input(),
        KeyCode::Esc => {
            app.input.clear();
            app.input_cursor = 0;
        }
        KeyCode::PageUp => app.scroll_up(app.page_size()),
        KeyCode::PageDown => app.scroll_down(app.page_size()),
        _ => {
            edit_line(&mut app.input, &mut app.input_cursor, key);
        }
    }
}

fn handle_settings_key(app: &mut App, key: KeyEvent) {
    let ctrl = key.modifiers.contains(KeyModifiers::CONTROL);

    match key.code {
        KeyCode::Esc => app.close_settings(),
        KeyCode::Enter => app.save_settings(),
        _ => {
            let Some(form) = app.settings_form.as_mut() else {
                return;
            };
            match key.code {
                KeyCode::Tab => form.focus_next(),
                KeyCode::BackTab => form.focus_prev(),
                KeyCode::Char('r') if ctrl => form.reveal_key = !form.reveal_key,
                KeyCode::Up if form.focus == SettingsField::Model => form.cycle_model(false),
                KeyCode::Down if form.focus == SettingsField::Model => form.cycle_model(true),
                KeyCode::Up => form.focus_prev(),
                KeyCode::Down => form.focus_next(),
                _ => {
                    let (text, cursor) = form.active_mut();
                    edit_line(text, cursor, key);
                }
            }
        }
    }
}

/// Single-line editing shared by the chat input and the settings fields.
/// Returns false when the key is not an editing key.
fn edit_line(text: &mut String, cursor: &mut usize, key: KeyEvent) -> bool {
    if key
        .modifiers
        .intersects(KeyModifiers::CONTROL | KeyModifiers::ALT)
    {
        return false;
    }

    match key.code {
        KeyCode::Backspace => {
            if *cursor > 0 {
                *cursor -= 1;
                let byte_pos = char_to_byte_index(text, *cursor);
                text.remove(byte_pos);
            }
        }
        KeyCode::Delete => {
            if *cursor < text.chars().count() {
                let byte_pos = char_to_byte_index(text, *cursor);
                text.remove(byte_pos);
            }
        }
        KeyCode::Left => *cursor = cursor.saturating_sub(1),
        KeyCode::Right => *cursor = (*cursor + 1).min(text.chars().count()),
        KeyCode::Home => *cursor = 0,
        KeyCode::End => *cursor = text.chars().count(),
        KeyCode::Char(c) => {
            let byte_pos = char_to_byte_index(text, *cursor);
            text.insert(byte_pos, c);
            *cursor += 1;
        }
        _ => return false,
    }
    true
}

fn handle_mouse(app: &mut App, mouse: MouseEvent) {
    if app.settings_form.is_some() {
        return;
    }
    match mouse.kind {
        MouseEventKind::ScrollUp => app.scroll_up(WHEEL_LINES),
        MouseEventKind::ScrollDown => app.scroll_down(WHEEL_LINES),
        _ => {}
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn press(code: KeyCode) -> KeyEvent {
        KeyEvent::new(code, KeyModifiers::NONE)
    }

    fn type_str(text: &mut String, cursor: &mut usize, s: &str) {
        for c in s.chars() {
            edit_line(text, cursor, press(KeyCode::Char(c)));
        }
    }

    #[test]
    fn test_edit_line_handles_multibyte_text() {
        let mut text = String::new();
        let mut cursor = 0;
        type_str(&mut text, &mut cursor, "héllo");
        assert_eq!(cursor, 5);

        edit_line(&mut text, &mut cursor, press(KeyCode::Left));
        edit_line(&mut text, &mut cursor, press(KeyCode::Left));
        edit_line(&mut text, &mut cursor, press(KeyCode::Left));
        edit_line(&mut text, &mut cursor, press(KeyCode::Backspace));
        assert_eq!(text, "hllo");
        assert_eq!(cursor, 1);

        edit_line(&mut text, &mut cursor, press(KeyCode::Delete));
        assert_eq!(text, "hlo");
    }

    #[test]
    fn test_edit_line_ignores_control_chords() {
        let mut text = String::from("abc");
        let mut cursor = 3;
        let handled = edit_line(
            &mut text,
            &mut cursor,
            KeyEvent::new(KeyCode::Char('n'), KeyModifiers::CONTROL),
        );
        assert!(!handled);
        assert_eq!(text, "abc");
    }

    #[test]
    fn test_cursor_stays_in_bounds() {
        let mut text = String::from("ab");
        let mut cursor = 2;
        edit_line(&mut text, &mut cursor, press(KeyCode::Right));
        assert_eq!(cursor, 2);
        edit_line(&mut text, &mut cursor, press(KeyCode::Home));
        edit_line(&mut text, &mut cursor, press(KeyCode::Backspace));
        assert_eq!((text.as_str(), cursor), ("ab", 0));
        edit_line(&mut text, &mut cursor, press(KeyCode::End));
        assert_eq!(cursor, 2);
    }
}
