use deswonder_engine::{DialogZone, TextPanel};
use tracing::debug;

const SILENT_CHARS: [char; 3] = [' ', '.', ','];
const PANEL_MARGIN: i32 = 8;
const PANEL_HEIGHT_LINES: i32 = 6;
const PANEL_LINE_HEIGHT: i32 = 7;
const WRAP_CHARS: usize = 70;

/// Splits a zone's `Text` property into pages. A bracketed list of quoted
/// strings (`['Hola', 'Adios']`) gives one page per entry; anything else,
/// including a malformed list, is a single page.
pub(crate) fn parse_pages(raw: &str) -> Vec<String> {
    let trimmed = raw.trim();
    let Some(inner) = trimmed
        .strip_prefix('[')
        .and_then(|rest| rest.strip_suffix(']'))
    else {
        return single_page(trimmed);
    };
    parse_quoted_list(inner).unwrap_or_else(|| single_page(trimmed))
}

fn single_page(text: &str) -> Vec<String> {
    if text.is_empty() {
        Vec::new()
    } else {
        vec![text.to_string()]
    }
}

fn parse_quoted_list(inner: &str) -> Option<Vec<String>> {
    let mut pages = Vec::new();
    let mut chars = inner.chars();
    while let Some(ch) = chars.next() {
        match ch {
            ' ' | '\t' | '\n' | '\r' | ',' => continue,
            '\'' | '"' => {
                let quote = ch;
                let mut page = String::new();
                loop {
                    match chars.next()? {
                        '\\' => match chars.next()? {
                            'n' => page.push('\n'),
                            escaped => page.push(escaped),
                        },
                        closing if closing == quote => break,
                        other => page.push(other),
                    }
                }
                pages.push(page);
            }
            _ => return None,
        }
    }
    Some(pages)
}

/// Greedy word wrap on character counts.
pub(crate) fn wrap_text(text: &str, max_chars: usize) -> Vec<String> {
    let mut lines = Vec::new();
    for paragraph in text.split('\n') {
        let mut line = String::new();
        for word in paragraph.split_whitespace() {
            let needed = if line.is_empty() {
                word.chars().count()
            } else {
                line.chars().count() + 1 + word.chars().count()
            };
            if needed > max_chars && !line.is_empty() {
                lines.push(std::mem::take(&mut line));
            }
            if !line.is_empty() {
                line.push(' ');
            }
            line.push_str(word);
        }
        lines.push(line);
    }
    lines
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum DialogProgress {
    /// The rest of the current page was revealed at once.
    Revealed,
    NextPage,
    Closed,
}

/// Typewriter state for one open dialog.
#[derive(Debug, Clone)]
pub(crate) struct DialogBox {
    pages: Vec<String>,
    page: usize,
    revealed: usize,
    ticks: u32,
    ticks_per_char: u32,
    sound: String,
    portrait: Option<String>,
}

impl DialogBox {
    pub(crate) fn new(
        pages: Vec<String>,
        ticks_per_char: u32,
        sound: impl Into<String>,
        portrait: Option<String>,
    ) -> Option<Self> {
        if pages.is_empty() {
            return None;
        }
        Some(Self {
            pages,
            page: 0,
            revealed: 0,
            ticks: 0,
            ticks_per_char: ticks_per_char.max(1),
            sound: sound.into(),
            portrait,
        })
    }

    fn page_text(&self) -> &str {
        &self.pages[self.page]
    }

    fn page_len(&self) -> usize {
        self.page_text().chars().count()
    }

    pub(crate) fn page_index(&self) -> usize {
        self.page
    }

    pub(crate) fn page_count(&self) -> usize {
        self.pages.len()
    }

    pub(crate) fn portrait(&self) -> Option<&str> {
        self.portrait.as_deref()
    }

    pub(crate) fn is_typing(&self) -> bool {
        self.revealed < self.page_len()
    }

    pub(crate) fn visible_text(&self) -> &str {
        let text = self.page_text();
        let end = text
            .char_indices()
            .nth(self.revealed)
            .map(|(index, _)| index)
            .unwrap_or(text.len());
        &text[..end]
    }

    /// Advances the typewriter one tick. Returns the sound key when a
    /// character that should blip was revealed.
    pub(crate) fn tick(&mut self) -> Option<&str> {
        if !self.is_typing() {
            return None;
        }
        self.ticks += 1;
        if self.ticks < self.ticks_per_char {
            return None;
        }
        self.ticks = 0;
        let revealed_char = self.page_text().chars().nth(self.revealed);
        self.revealed += 1;
        match revealed_char {
            Some(ch) if !SILENT_CHARS.contains(&ch) => Some(&self.sound),
            _ => None,
        }
    }

    pub(crate) fn confirm(&mut self) -> DialogProgress {
        if self.is_typing() {
            self.revealed = self.page_len();
            return DialogProgress::Revealed;
        }
        self.advance()
    }

    pub(crate) fn skip(&mut self) -> DialogProgress {
        self.advance()
    }

    fn advance(&mut self) -> DialogProgress {
        if self.page + 1 < self.pages.len() {
            self.page += 1;
            self.revealed = 0;
            self.ticks = 0;
            DialogProgress::NextPage
        } else {
            DialogProgress::Closed
        }
    }
}

#[derive(Debug, Clone, Default)]
pub(crate) struct DialogManager {
    active: Option<DialogBox>,
}

impl DialogManager {
    pub(crate) fn open_zone(&mut self, zone: &DialogZone) -> bool {
        let dialog = DialogBox::new(
            parse_pages(&zone.text),
            zone.ticks_per_char,
            zone.sound.clone(),
            zone.portrait.clone(),
        );
        match dialog {
            Some(dialog) => {
                debug!(pages = dialog.page_count(), sound = %zone.sound, "dialog_opened");
                self.active = Some(dialog);
                true
            }
            None => false,
        }
    }

    pub(crate) fn is_open(&self) -> bool {
        self.active.is_some()
    }

    #[cfg(test)]
    pub(crate) fn active(&self) -> Option<&DialogBox> {
        self.active.as_ref()
    }

    pub(crate) fn tick(&mut self) -> Option<String> {
        self.active
            .as_mut()
            .and_then(|dialog| dialog.tick().map(str::to_string))
    }

    pub(crate) fn confirm(&mut self) -> Option<DialogProgress> {
        let progress = self.active.as_mut()?.confirm();
        self.close_if_done(progress);
        Some(progress)
    }

    pub(crate) fn skip(&mut self) -> Option<DialogProgress> {
        let progress = self.active.as_mut()?.skip();
        self.close_if_done(progress);
        Some(progress)
    }

    pub(crate) fn close(&mut self) {
        self.active = None;
    }

    fn close_if_done(&mut self, progress: DialogProgress) {
        if progress == DialogProgress::Closed {
            debug!("dialog_closed");
            self.active = None;
        }
    }

    /// Text box along the bottom of the screen.
    pub(crate) fn panel(&self, screen_width: u32, screen_height: u32) -> Option<TextPanel> {
        let dialog = self.active.as_ref()?;
        let mut lines = Vec::new();
        if let Some(portrait) = dialog.portrait() {
            lines.push(format!("[{portrait}]"));
        }
        lines.extend(wrap_text(dialog.visible_text(), WRAP_CHARS));
        if !dialog.is_typing() && dialog.page_index() + 1 < dialog.page_count() {
            lines.push(">>".to_string());
        }
        Some(TextPanel {
            x: PANEL_MARGIN,
            y: screen_height as i32 - PANEL_MARGIN - PANEL_HEIGHT_LINES * PANEL_LINE_HEIGHT,
            width: screen_width as i32 - 2 * PANEL_MARGIN,
            lines,
            highlighted_line: None,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn zone(text: &str, speed: u32) -> DialogZone {
        DialogZone {
            text: text.to_string(),
            ticks_per_char: speed,
            sound: "default".to_string(),
            portrait: Some("ely_face".to_string()),
        }
    }

    #[test]
    fn list_literals_become_pages() {
        assert_eq!(parse_pages("['Hola', 'Adios']"), vec!["Hola", "Adios"]);
        assert_eq!(
            parse_pages(r#"["It's", 'a, b', 'x\'y']"#),
            vec!["It's", "a, b", "x'y"]
        );
    }

    #[test]
    fn plain_or_malformed_text_is_one_page() {
        assert_eq!(parse_pages("Hola mundo"), vec!["Hola mundo"]);
        assert_eq!(parse_pages("['unterminated]"), vec!["['unterminated]"]);
        assert_eq!(parse_pages("[1, 2]"), vec!["[1, 2]"]);
        assert!(parse_pages("   ").is_empty());
    }

    #[test]
    fn typewriter_reveals_one_char_per_speed_ticks_and_blips() {
        let mut dialog =
            DialogBox::new(vec!["Hi, yo".to_string()], 2, "beep", None).expect("dialog");
        assert_eq!(dialog.tick(), None);
        assert_eq!(dialog.tick(), Some("beep"));
        assert_eq!(dialog.visible_text(), "H");
        dialog.tick();
        dialog.tick();
        dialog.tick();
        assert_eq!(dialog.tick(), None);
        assert_eq!(dialog.visible_text(), "Hi,");
        dialog.tick();
        assert_eq!(dialog.tick(), None);
        assert_eq!(dialog.visible_text(), "Hi, ");
    }

    #[test]
    fn confirm_reveals_then_advances_then_closes() {
        let mut dialogs = DialogManager::default();
        assert!(dialogs.open_zone(&zone("['Uno', 'Dos']", 2)));
        assert_eq!(dialogs.confirm(), Some(DialogProgress::Revealed));
        assert_eq!(
            dialogs.active().map(DialogBox::visible_text),
            Some("Uno")
        );
        assert_eq!(dialogs.confirm(), Some(DialogProgress::NextPage));
        assert_eq!(dialogs.active().map(DialogBox::visible_text), Some(""));
        assert_eq!(dialogs.confirm(), Some(DialogProgress::Revealed));
        assert_eq!(dialogs.confirm(), Some(DialogProgress::Closed));
        assert!(!dialogs.is_open());
        assert_eq!(dialogs.confirm(), None);
    }

    #[test]
    fn skip_moves_on_even_while_typing() {
        let mut dialogs = DialogManager::default();
        dialogs.open_zone(&zone("['Uno', 'Dos']", 2));
        assert_eq!(dialogs.skip(), Some(DialogProgress::NextPage));
        assert_eq!(dialogs.skip(), Some(DialogProgress::Closed));
        assert!(!dialogs.is_open());
    }

    #[test]
    fn empty_text_does_not_open() {
        let mut dialogs = DialogManager::default();
        assert!(!dialogs.open_zone(&zone("", 2)));
        assert!(!dialogs.is_open());
    }

    #[test]
    fn panel_shows_portrait_and_wrapped_text() {
        let mut dialogs = DialogManager::default();
        dialogs.open_zone(&zone("['Uno', 'Dos']", 1));
        dialogs.confirm();
        let panel = dialogs.panel(320, 240).expect("panel");
        assert_eq!(panel.lines, vec!["[ely_face]", "Uno", ">>"]);
        assert_eq!(panel.width, 304);
    }

    #[test]
    fn wrap_breaks_on_words() {
        assert_eq!(
            wrap_text("uno dos tres", 7),
            vec!["uno dos".to_string(), "tres".to_string()]
        );
        assert_eq!(wrap_text("", 7), vec![String::new()]);
    }
}
