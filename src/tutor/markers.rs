use std::sync::LazyLock;

use regex::Regex;
use serde::{Deserialize, Serialize};

pub const FEEDBACK_MARKER: &str = "[フィードバック]";
pub const QUESTION_MARKER: &str = "[英語の質問]";
pub const PRACTICE_MARKER: &str = "[リピート練習]";

/// Labeled sections the role-play prompt asks the model to emit.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Section {
    Feedback,
    Question,
    RepeatPractice,
}

impl Section {
    pub const ALL: [Section; 3] = [Section::Feedback, Section::Question, Section::RepeatPractice];

    pub fn marker(self) -> &'static str {
        match self {
            Section::Feedback => FEEDBACK_MARKER,
            Section::Question => QUESTION_MARKER,
            Section::RepeatPractice => PRACTICE_MARKER,
        }
    }
}

/// Everything after the first occurrence of `marker`, trimmed. Empty when the
/// marker is missing.
pub fn after_marker(text: &str, marker: &str) -> String {
    match text.find(marker) {
        Some(pos) => text[pos + marker.len()..].trim().to_string(),
        None => String::new(),
    }
}

/// Content of the first `<tag>...</tag>` pair.
///
/// The first opening tag decides: if it is never closed, or another opening
/// tag of the same name appears before the close, the result is empty.
pub fn extract_tag(text: &str, tag: &str) -> String {
    let open = format!("<{tag}>");
    let close = format!("</{tag}>");

    let Some(start) = text.find(&open) else {
        return String::new();
    };
    let rest = &text[start + open.len()..];
    let Some(end) = rest.find(&close) else {
        return String::new();
    };
    let body = &rest[..end];
    if body.contains(&open) {
        return String::new();
    }
    body.trim().to_string()
}

/// Split `text` into labeled sections. Each section runs until the next
/// recognized marker (or end of text). Text before the first marker is dropped.
pub fn sections(text: &str) -> Vec<(Section, String)> {
    let mut hits: Vec<(usize, Section)> = Section::ALL
        .iter()
        .flat_map(|&section| {
            text.match_indices(section.marker())
                .map(move |(pos, _)| (pos, section))
        })
        .collect();
    hits.sort_by_key(|(pos, _)| *pos);

    hits.iter()
        .enumerate()
        .map(|(i, &(pos, section))| {
            let body_start = pos + section.marker().len();
            let body_end = hits.get(i + 1).map(|(next, _)| *next).unwrap_or(text.len());
            (section, text[body_start..body_end].trim().to_string())
        })
        .collect()
}

/// A role-play reply sliced into its sections. Missing sections are empty.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct RoleplayReply {
    pub feedback: String,
    pub question: String,
    pub practice: String,
}

impl RoleplayReply {
    pub fn parse(text: &str) -> Self {
        let mut reply = RoleplayReply::default();
        for (section, body) in sections(text) {
            let slot = match section {
                Section::Feedback => &mut reply.feedback,
                Section::Question => &mut reply.question,
                Section::RepeatPractice => &mut reply.practice,
            };
            if slot.is_empty() {
                *slot = body;
            }
        }
        reply
    }

    /// The segment sent to speech synthesis: the question wins over the
    /// repeat-practice sentence; feedback is never spoken.
    pub fn speakable(&self) -> Option<&str> {
        [&self.question, &self.practice]
            .into_iter()
            .find(|s| !s.is_empty())
            .map(String::as_str)
    }

    pub fn has_practice(&self) -> bool {
        !self.practice.is_empty()
    }

    pub fn is_empty(&self) -> bool {
        self.feedback.is_empty() && self.question.is_empty() && self.practice.is_empty()
    }
}

/// One kids' lesson card, parsed from the tag-formatted reply.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct KidsCard {
    pub praise: String,
    pub ai_en: String,
    pub ai_ja: String,
    pub ai_ruby: String,
    pub hint_en: String,
    pub hint_ja: String,
    pub hint_ruby: String,
}

impl KidsCard {
    pub fn parse(text: &str) -> Self {
        Self {
            praise: extract_tag(text, "praise"),
            ai_en: extract_tag(text, "ai_en"),
            ai_ja: extract_tag(text, "ai_ja"),
            ai_ruby: extract_tag(text, "ai_ruby"),
            hint_en: extract_tag(text, "hint_en"),
            hint_ja: extract_tag(text, "hint_ja"),
            hint_ruby: extract_tag(text, "hint_ruby"),
        }
    }

    pub fn speakable(&self) -> Option<&str> {
        (!self.ai_en.is_empty()).then_some(self.ai_en.as_str())
    }
}

/// Strip markdown emphasis and stray quotes so the speech engine does not
/// read them aloud. A quote survives only between two word characters
/// (`don't`).
pub fn clean_for_speech(text: &str) -> String {
    let stripped: Vec<char> = text
        .chars()
        .filter(|c| !matches!(c, '*' | '_' | '#' | '~'))
        .collect();
    let is_word = |c: Option<&char>| c.is_some_and(|c| c.is_alphanumeric() || *c == '_');

    let mut out = String::with_capacity(text.len());
    for (i, ch) in stripped.iter().enumerate() {
        if matches!(ch, '\'' | '"') {
            let prev = i.checked_sub(1).and_then(|p| stripped.get(p));
            let next = stripped.get(i + 1);
            if !is_word(prev) || !is_word(next) {
                continue;
            }
        }
        out.push(*ch);
    }
    out.trim().to_string()
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum RubyToken {
    Plain(String),
    Ruby { base: String, reading: String },
}

static RUBY_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"([A-Za-z.,!?']+)\(([\x{30A0}-\x{30FF}\x{3040}-\x{309F}]+)\)")
        .expect("ruby pattern is valid")
});

/// Split `What(ホワット) is(イズ) it?(イット)` into base/reading pairs.
pub fn parse_ruby(text: &str) -> Vec<RubyToken> {
    let mut tokens = Vec::new();
    let mut last = 0;
    for caps in RUBY_RE.captures_iter(text) {
        let whole = caps.get(0).map(|m| m.range()).unwrap_or(0..0);
        if whole.start > last {
            tokens.push(RubyToken::Plain(text[last..whole.start].to_string()));
        }
        tokens.push(RubyToken::Ruby {
            base: caps[1].to_string(),
            reading: caps[2].to_string(),
        });
        last = whole.end;
    }
    if last < text.len() {
        tokens.push(RubyToken::Plain(text[last..].to_string()));
    }
    tokens
}

/// One shadowing sentence with its translation.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Chunk {
    pub en: String,
    pub ja: String,
}

/// Parse `English || 日本語` lines; anything without `||` is ignored.
pub fn parse_chunks(text: &str) -> Vec<Chunk> {
    text.lines()
        .filter_map(|line| line.split_once("||"))
        .map(|(en, ja)| Chunk {
            en: en.trim().to_string(),
            ja: ja.trim().to_string(),
        })
        .filter(|chunk| !chunk.en.is_empty())
        .collect()
}
