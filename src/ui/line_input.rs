use std::path::MAIN_SEPARATOR;

use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum InputResult {
    Continue,
    Submit,
    Cancel,
}

/// Tab-completion state for path fields.
#[derive(Default)]
struct Completion {
    candidates: Vec<String>,
    index: Option<usize>,
}

/// Single-line editor used for the message composer, setup fields and file
/// paths. The cursor is a char index so Japanese input edits cleanly.
pub struct LineInput {
    text: String,
    cursor: usize,
    masked: bool,
    paths: bool,
    completion: Completion,
    /// Set when the last completion attempt could not read the directory.
    pub completion_error: bool,
}

impl LineInput {
    pub fn new(text: &str) -> Self {
        Self {
            text: text.to_string(),
            cursor: text.chars().count(),
            masked: false,
            paths: false,
            completion: Completion::default(),
            completion_error: false,
        }
    }

    /// A field whose Tab key completes file system paths.
    pub fn path(text: &str) -> Self {
        Self {
            paths: true,
            ..Self::new(text)
        }
    }

    /// A field rendered as `*`s.
    pub fn secret() -> Self {
        Self {
            masked: true,
            ..Self::new("")
        }
    }

    pub fn value(&self) -> &str {
        &self.text
    }

    pub fn is_blank(&self) -> bool {
        self.text.trim().is_empty()
    }

    pub fn set(&mut self, text: &str) {
        self.text = text.to_string();
        self.cursor = self.text.chars().count();
        self.reset_completion();
    }

    /// Return the text and leave the field empty.
    pub fn take(&mut self) -> String {
        self.cursor = 0;
        self.reset_completion();
        std::mem::take(&mut self.text)
    }

    /// Insert pasted text at the cursor; newlines become spaces.
    pub fn paste(&mut self, pasted: &str) {
        for ch in pasted.chars() {
            self.insert(if ch == '\n' || ch == '\r' { ' ' } else { ch });
        }
    }

    /// Text before the cursor, the char under it, and the rest, for rendering.
    pub fn render_parts(&self) -> (String, Option<char>, String) {
        let shown: String = if self.masked {
            "*".repeat(self.text.chars().count())
        } else {
            self.text.clone()
        };
        let before: String = shown.chars().take(self.cursor).collect();
        let mut rest = shown.chars().skip(self.cursor);
        let at = rest.next();
        (before, at, rest.collect())
    }

    pub fn handle(&mut self, key: KeyEvent) -> InputResult {
        let ctrl = key.modifiers.contains(KeyModifiers::CONTROL);
        if !matches!(key.code, KeyCode::Tab | KeyCode::BackTab) {
            self.reset_completion();
        }
        let len = self.text.chars().count();
        match key.code {
            KeyCode::Esc => return InputResult::Cancel,
            KeyCode::Enter => return InputResult::Submit,
            KeyCode::Left => self.cursor = self.cursor.saturating_sub(1),
            KeyCode::Right => self.cursor = (self.cursor + 1).min(len),
            KeyCode::Home => self.cursor = 0,
            KeyCode::End => self.cursor = len,
            KeyCode::Backspace if self.cursor > 0 => {
                self.cursor -= 1;
                self.remove_at(self.cursor);
            }
            KeyCode::Delete if self.cursor < len => self.remove_at(self.cursor),
            KeyCode::Tab if self.paths => self.complete(true),
            KeyCode::BackTab if self.paths => self.complete(false),
            KeyCode::Char('a') if ctrl => self.cursor = 0,
            KeyCode::Char('e') if ctrl => self.cursor = len,
            KeyCode::Char('u') if ctrl => {
                self.text.clear();
                self.cursor = 0;
            }
            KeyCode::Char('w') if ctrl => self.delete_word_back(),
            KeyCode::Char(ch) if !ctrl => self.insert(ch),
            _ => {}
        }
        InputResult::Continue
    }

    fn byte_at(&self, char_idx: usize) -> usize {
        self.text
            .char_indices()
            .nth(char_idx)
            .map_or(self.text.len(), |(b, _)| b)
    }

    fn insert(&mut self, ch: char) {
        let at = self.byte_at(self.cursor);
        self.text.insert(at, ch);
        self.cursor += 1;
    }

    fn remove_at(&mut self, char_idx: usize) {
        let at = self.byte_at(char_idx);
        self.text.remove(at);
    }

    fn delete_word_back(&mut self) {
        let chars: Vec<char> = self.text.chars().collect();
        let mut start = self.cursor;
        while start > 0 && chars[start - 1].is_whitespace() {
            start -= 1;
        }
        while start > 0 && !chars[start - 1].is_whitespace() {
            start -= 1;
        }
        let (from, to) = (self.byte_at(start), self.byte_at(self.cursor));
        self.text.replace_range(from..to, "");
        self.cursor = start;
    }

    fn reset_completion(&mut self) {
        self.completion = Completion::default();
        self.completion_error = false;
    }

    fn complete(&mut self, forward: bool) {
        if self.cursor < self.text.chars().count() {
            return;
        }
        let next = match self.completion.index {
            None => {
                match path_candidates(&self.text) {
                    Ok(found) => self.completion.candidates = found,
                    Err(_) => {
                        self.completion_error = true;
                        return;
                    }
                }
                0
            }
            Some(i) => {
                let n = self.completion.candidates.len();
                if forward { (i + 1) % n } else { (i + n - 1) % n }
            }
        };
        let Some(choice) = self.completion.candidates.get(next).cloned() else {
            return;
        };
        self.completion.index = Some(next);
        self.text = choice;
        self.cursor = self.text.chars().count();
    }
}

/// Entries of the directory named by `seed` that start with its last
/// component. Directories first, each group sorted, hidden files only when
/// asked for.
fn path_candidates(seed: &str) -> std::io::Result<Vec<String>> {
    let split = seed.rfind(['/', '\\']).map_or(0, |i| i + 1);
    let (dir, partial) = seed.split_at(split);
    let listing_dir = match dir.strip_prefix('~') {
        Some(rest) => dirs::home_dir()
            .map(|h| format!("{}{rest}", h.display()))
            .unwrap_or_else(|| dir.to_string()),
        None if dir.is_empty() => ".".to_string(),
        None => dir.to_string(),
    };

    let mut found: Vec<(bool, String)> = Vec::new();
    for entry in std::fs::read_dir(listing_dir)?.take(1000) {
        let entry = entry?;
        let name = entry.file_name().to_string_lossy().to_string();
        if !name.starts_with(partial) || (name.starts_with('.') && !partial.starts_with('.')) {
            continue;
        }
        let is_dir = entry.file_type().is_ok_and(|t| t.is_dir());
        let suffix = if is_dir { MAIN_SEPARATOR.to_string() } else { String::new() };
        found.push((!is_dir, format!("{dir}{name}{suffix}")));
    }
    found.sort();
    Ok(found.into_iter().take(100).map(|(_, p)| p).collect())
}
