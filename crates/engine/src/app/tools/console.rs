use std::collections::VecDeque;

use winit::event::{ElementState, KeyEvent};
use winit::keyboard::{KeyCode, PhysicalKey};

use crate::app::rendering::{Canvas, LINE_ADVANCE};

const CONSOLE_PADDING: i32 = 4;
const CONSOLE_BG_COLOR: [u8; 4] = [10, 10, 14, 230];
const CONSOLE_BORDER_COLOR: [u8; 4] = [90, 110, 90, 255];
const CONSOLE_TEXT_COLOR: [u8; 4] = [200, 235, 200, 255];
const CONSOLE_PROMPT_PREFIX: &str = "> ";
const CONSOLE_HEIGHT_DIVISOR: i32 = 2;

pub(crate) const MAX_HISTORY_LINES: usize = 32;
pub(crate) const MAX_OUTPUT_LINES: usize = 128;
pub(crate) const MAX_PENDING_LINES: usize = 32;
pub(crate) const MAX_CURRENT_LINE_CHARS: usize = 72;

#[derive(Debug, Default)]
struct HistoryCursor {
    index: Option<usize>,
    draft: String,
}

/// Text console for debug commands. Submitted lines queue up until the
/// command processor drains them on the next frame.
#[derive(Debug, Default)]
pub(crate) struct ConsoleState {
    is_open: bool,
    current_line: String,
    history: VecDeque<String>,
    cursor: HistoryCursor,
    output_lines: VecDeque<String>,
    pending_lines: VecDeque<String>,
}

impl ConsoleState {
    pub(crate) fn is_open(&self) -> bool {
        self.is_open
    }

    pub(crate) fn toggle_open(&mut self) {
        self.is_open = !self.is_open;
        self.reset_input_line();
    }

    pub(crate) fn handle_key_event(&mut self, key_event: &KeyEvent) {
        if !self.is_open || key_event.state != ElementState::Pressed {
            return;
        }
        if let PhysicalKey::Code(code) = key_event.physical_key {
            self.handle_key_code(code);
        }
        if let Some(text) = key_event.text.as_ref() {
            self.append_printable_text(text);
        }
    }

    pub(crate) fn output_lines(&self) -> impl DoubleEndedIterator<Item = &str> {
        self.output_lines.iter().map(String::as_str)
    }

    pub(crate) fn current_line(&self) -> &str {
        &self.current_line
    }

    /// Appends command output; embedded newlines become separate lines.
    pub(crate) fn append_output(&mut self, text: impl AsRef<str>) {
        for line in text.as_ref().lines() {
            push_bounded(&mut self.output_lines, line.to_string(), MAX_OUTPUT_LINES);
        }
    }

    pub(crate) fn clear_output(&mut self) {
        self.output_lines.clear();
    }

    pub(crate) fn drain_pending_lines_into(&mut self, out: &mut Vec<String>) {
        out.extend(self.pending_lines.drain(..));
    }

    #[cfg(test)]
    pub(crate) fn push_pending_line_for_test(&mut self, line: &str) {
        push_bounded(&mut self.pending_lines, line.to_string(), MAX_PENDING_LINES);
    }

    fn handle_key_code(&mut self, key_code: KeyCode) {
        match key_code {
            KeyCode::Backspace => {
                self.current_line.pop();
            }
            KeyCode::Enter | KeyCode::NumpadEnter => self.submit_current_line(),
            KeyCode::Escape => {
                self.is_open = false;
                self.reset_input_line();
            }
            KeyCode::ArrowUp => self.recall_older(),
            KeyCode::ArrowDown => self.recall_newer(),
            _ => {}
        }
    }

    fn append_printable_text(&mut self, text: &str) {
        let room = MAX_CURRENT_LINE_CHARS.saturating_sub(self.current_line.chars().count());
        self.current_line
            .extend(text.chars().filter(|ch| !ch.is_control()).take(room));
    }

    fn reset_input_line(&mut self) {
        self.current_line.clear();
        self.cursor = HistoryCursor::default();
    }

    fn submit_current_line(&mut self) {
        let line = std::mem::take(&mut self.current_line);
        push_bounded(
            &mut self.output_lines,
            format!("{CONSOLE_PROMPT_PREFIX}{line}"),
            MAX_OUTPUT_LINES,
        );
        if !line.trim().is_empty() {
            push_bounded(&mut self.history, line.clone(), MAX_HISTORY_LINES);
        }
        push_bounded(&mut self.pending_lines, line, MAX_PENDING_LINES);
        self.cursor = HistoryCursor::default();
    }

    fn recall_older(&mut self) {
        let Some(last) = self.history.len().checked_sub(1) else {
            return;
        };
        let index = match self.cursor.index {
            Some(index) => index.saturating_sub(1),
            None => {
                self.cursor.draft = self.current_line.clone();
                last
            }
        };
        self.cursor.index = Some(index);
        self.current_line = self.history[index].clone();
    }

    fn recall_newer(&mut self) {
        let Some(index) = self.cursor.index else {
            return;
        };
        if index + 1 < self.history.len() {
            self.cursor.index = Some(index + 1);
            self.current_line = self.history[index + 1].clone();
        } else {
            self.cursor.index = None;
            self.current_line = std::mem::take(&mut self.cursor.draft);
        }
    }
}

fn push_bounded(queue: &mut VecDeque<String>, value: String, max_len: usize) {
    if queue.len() == max_len {
        queue.pop_front();
    }
    queue.push_back(value);
}

/// Draws the console over the lower half of the frame, newest output at the bottom.
pub(crate) fn draw_console(canvas: &mut Canvas, state: &ConsoleState) {
    if !state.is_open() || canvas.width() == 0 || canvas.height() == 0 {
        return;
    }
    let width = canvas.width() as i32;
    let height = canvas.height() as i32;
    let panel_height = (height / CONSOLE_HEIGHT_DIVISOR).max(LINE_ADVANCE + 2 * CONSOLE_PADDING);
    let top = height - panel_height;
    canvas.fill_rect(0, top, width, panel_height, CONSOLE_BG_COLOR);
    canvas.outline_rect(0, top, width, panel_height, CONSOLE_BORDER_COLOR);

    let prompt_y = height - CONSOLE_PADDING - LINE_ADVANCE;
    let prompt = format!("{CONSOLE_PROMPT_PREFIX}{}_", state.current_line());
    canvas.draw_text(CONSOLE_PADDING, prompt_y, &prompt, CONSOLE_TEXT_COLOR);

    let mut line_y = prompt_y - LINE_ADVANCE;
    for line in state.output_lines().rev() {
        if line_y < top + CONSOLE_PADDING {
            break;
        }
        canvas.draw_text(CONSOLE_PADDING, line_y, line, CONSOLE_TEXT_COLOR);
        line_y -= LINE_ADVANCE;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn submit(console: &mut ConsoleState, line: &str) {
        console.current_line = line.to_string();
        console.handle_key_code(KeyCode::Enter);
    }

    #[test]
    fn escape_closes_and_forgets_draft() {
        let mut console = ConsoleState::default();
        console.toggle_open();
        submit(&mut console, "heal_all");
        console.current_line = "dam".to_string();
        console.handle_key_code(KeyCode::ArrowUp);
        console.handle_key_code(KeyCode::Escape);

        assert!(!console.is_open());
        assert_eq!(console.current_line(), "");
        assert!(console.cursor.index.is_none());
        assert!(console.cursor.draft.is_empty());
    }

    #[test]
    fn enter_echoes_and_queues_line() {
        let mut console = ConsoleState::default();
        console.toggle_open();
        submit(&mut console, "recruit koral");

        assert_eq!(console.current_line(), "");
        assert_eq!(
            console.output_lines().last(),
            Some("> recruit koral")
        );
        let mut drained = Vec::new();
        console.drain_pending_lines_into(&mut drained);
        assert_eq!(drained, vec!["recruit koral".to_string()]);
        console.drain_pending_lines_into(&mut drained);
        assert_eq!(drained.len(), 1);
    }

    #[test]
    fn blank_lines_are_not_kept_in_history() {
        let mut console = ConsoleState::default();
        console.toggle_open();
        submit(&mut console, "   ");
        assert!(console.history.is_empty());
    }

    #[test]
    fn history_recall_walks_back_and_restores_draft() {
        let mut console = ConsoleState::default();
        console.toggle_open();
        submit(&mut console, "god");
        submit(&mut console, "noclip");

        console.current_line = "par".to_string();
        console.handle_key_code(KeyCode::ArrowUp);
        assert_eq!(console.current_line(), "noclip");
        console.handle_key_code(KeyCode::ArrowUp);
        assert_eq!(console.current_line(), "god");
        console.handle_key_code(KeyCode::ArrowUp);
        assert_eq!(console.current_line(), "god");
        console.handle_key_code(KeyCode::ArrowDown);
        assert_eq!(console.current_line(), "noclip");
        console.handle_key_code(KeyCode::ArrowDown);
        assert_eq!(console.current_line(), "par");
    }

    #[test]
    fn typed_text_skips_control_chars_and_is_capped() {
        let mut console = ConsoleState::default();
        console.toggle_open();
        console.append_printable_text("a\tb\n");
        assert_eq!(console.current_line(), "ab");
        console.append_printable_text(&"x".repeat(MAX_CURRENT_LINE_CHARS));
        assert_eq!(console.current_line().chars().count(), MAX_CURRENT_LINE_CHARS);
    }

    #[test]
    fn output_splits_lines_and_stays_bounded() {
        let mut console = ConsoleState::default();
        console.append_output("one\ntwo");
        assert_eq!(console.output_lines().count(), 2);
        for index in 0..MAX_OUTPUT_LINES {
            console.append_output(format!("line {index}"));
        }
        assert_eq!(console.output_lines().count(), MAX_OUTPUT_LINES);
        assert_eq!(console.output_lines().next(), Some("line 0"));
    }

    #[test]
    fn draw_is_safe_on_tiny_frames() {
        let mut frame = vec![0u8; 4];
        let mut canvas = Canvas::new(&mut frame, 1, 1);
        let mut console = ConsoleState::default();
        console.toggle_open();
        console.append_output("hello");
        draw_console(&mut canvas, &console);
        assert_eq!(frame.len(), 4);
    }
}
