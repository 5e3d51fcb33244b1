use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::tutor::configuration::Variant;
use crate::tutor::markers::{self, KidsCard};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Assistant,
}

/// How a turn participates in the model context and in the exported log.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TurnKind {
    /// Spoken exchange: sent to the model and exported.
    #[default]
    Dialogue,
    /// Synthetic instruction (start, skip, give up...): sent, not exported.
    Directive,
    /// Local commentary such as a recitation check: exported, never sent.
    Aside,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Turn {
    pub role: Role,
    pub content: String,
    #[serde(default)]
    pub kind: TurnKind,
    #[serde(default = "Utc::now")]
    pub at: DateTime<Utc>,
}

impl Turn {
    pub fn new(role: Role, kind: TurnKind, content: impl Into<String>) -> Self {
        Self {
            role,
            content: content.into(),
            kind,
            at: Utc::now(),
        }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self::new(Role::User, TurnKind::Dialogue, content)
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self::new(Role::Assistant, TurnKind::Dialogue, content)
    }

    pub fn directive(content: impl Into<String>) -> Self {
        Self::new(Role::User, TurnKind::Directive, content)
    }

    pub fn aside(role: Role, content: impl Into<String>) -> Self {
        Self::new(role, TurnKind::Aside, content)
    }

    pub fn in_context(&self) -> bool {
        self.kind != TurnKind::Aside
    }
}

/// Append-only, insertion-ordered log of turns.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Transcript {
    turns: Vec<Turn>,
}

impl Transcript {
    pub fn from_turns(turns: Vec<Turn>) -> Self {
        Self { turns }
    }

    pub fn append(&mut self, turn: Turn) {
        self.turns.push(turn);
    }

    pub fn last(&self) -> Option<&Turn> {
        self.turns.last()
    }

    /// Index and turn of the newest assistant dialogue turn.
    pub fn last_assistant(&self) -> Option<(usize, &Turn)> {
        self.turns
            .iter()
            .enumerate()
            .rev()
            .find(|(_, t)| t.role == Role::Assistant && t.kind == TurnKind::Dialogue)
    }

    pub fn turns(&self) -> &[Turn] {
        &self.turns
    }

    pub fn len(&self) -> usize {
        self.turns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.turns.is_empty()
    }

    /// Turns the model is allowed to see, oldest first.
    pub fn context_turns(&self) -> impl Iterator<Item = &Turn> {
        self.turns.iter().filter(|t| t.in_context())
    }

    /// Human-readable rendering: directives dropped, each labeled section of
    /// an assistant reply on its own lines.
    pub fn exportable_log(&self, variant: Variant) -> String {
        let mut blocks: Vec<String> = Vec::new();
        for turn in &self.turns {
            let (speaker, body) = match (turn.kind, turn.role) {
                (TurnKind::Directive, _) => continue,
                (TurnKind::Aside, _) => ("Note", turn.content.trim().to_string()),
                (TurnKind::Dialogue, Role::User) => ("You", turn.content.trim().to_string()),
                (TurnKind::Dialogue, Role::Assistant) => {
                    ("AI", render_assistant(variant, &turn.content))
                }
            };
            let indented: Vec<String> = body.lines().map(|l| format!("  {l}")).collect();
            blocks.push(format!("{speaker}:\n{}", indented.join("\n")));
        }
        blocks.join("\n\n")
    }
}

fn render_assistant(variant: Variant, content: &str) -> String {
    match variant {
        Variant::Roleplay => {
            let sections = markers::sections(content);
            if sections.is_empty() {
                return content.trim().to_string();
            }
            sections
                .iter()
                .map(|(section, body)| format!("{}\n{}", section.marker(), body))
                .collect::<Vec<_>>()
                .join("\n")
        }
        Variant::Kids => {
            let card = KidsCard::parse(content);
            if card.ai_en.is_empty() {
                return content.trim().to_string();
            }
            let mut lines = Vec::new();
            if !card.praise.is_empty() {
                lines.push(card.praise.clone());
            }
            lines.push(card.ai_en.clone());
            if !card.ai_ja.is_empty() {
                lines.push(format!("({})", card.ai_ja));
            }
            lines.join("\n")
        }
    }
}
