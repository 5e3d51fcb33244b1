use serde::{Deserialize, Serialize};

/// Longest reference document excerpt embedded in the system instruction.
pub const MAX_REFERENCE_CHARS: usize = 12_000;

pub const DEFAULT_MODEL: &str = "gemini-2.5-flash";
pub const MODELS: &[&str] = &["gemini-2.5-flash", "gemini-2.5-flash-lite", "gemini-2.5-pro"];

/// Target proficiency levels, shared by role-play and shadowing setup.
pub const LEVELS: &[&str] = &[
    "1: 幼児・超初心者（短い挨拶、簡単な単語）",
    "2: 小学生・英検5級（基礎的な自己紹介）",
    "3: 中学生・英検3級（日常的な出来事）",
    "4: 高校生・英検2級（やや長めの文）",
    "5: 上級・英検準1級〜（複雑な構文）",
];

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Variant {
    #[default]
    Roleplay,
    Kids,
}

/// What the model is told to do after a give-up has been practiced.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GiveUpPolicy {
    #[default]
    ContinueNarrative,
    FreshQuestion,
}

impl GiveUpPolicy {
    pub fn as_str(self) -> &'static str {
        match self {
            GiveUpPolicy::ContinueNarrative => "continue_narrative",
            GiveUpPolicy::FreshQuestion => "fresh_question",
        }
    }

    pub fn toggled(self) -> Self {
        match self {
            GiveUpPolicy::ContinueNarrative => GiveUpPolicy::FreshQuestion,
            GiveUpPolicy::FreshQuestion => GiveUpPolicy::ContinueNarrative,
        }
    }
}

pub struct KidsSituation {
    pub key: &'static str,
    pub persona: &'static str,
}

pub const KIDS_SITUATIONS: &[KidsSituation] = &[
    KidsSituation {
        key: "burger",
        persona: "You are a friendly staff at a hamburger shop.",
    },
    KidsSituation {
        key: "zoo",
        persona: "You are a friendly zookeeper showing animals.",
    },
    KidsSituation {
        key: "fruit",
        persona: "You are a fruit shop owner asking what fruits the child likes.",
    },
    KidsSituation {
        key: "park",
        persona: "You are a friendly child playing at the park.",
    },
];

/// Per-session settings. Never changed while the session runs; a different
/// configuration means a new session.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Configuration {
    #[serde(default)]
    pub variant: Variant,
    #[serde(default)]
    pub persona: String,
    #[serde(default = "default_level")]
    pub level: String,
    #[serde(default)]
    pub scenario: String,
    #[serde(default = "default_learner_name", alias = "name")]
    pub learner_name: String,
    #[serde(default)]
    pub reference_text: Option<String>,
    #[serde(default = "default_model")]
    pub model: String,
    #[serde(default)]
    pub give_up_policy: GiveUpPolicy,
}

fn default_level() -> String {
    LEVELS[2].to_string()
}

fn default_learner_name() -> String {
    "おともだち".to_string()
}

fn default_model() -> String {
    DEFAULT_MODEL.to_string()
}

impl Configuration {
    pub fn roleplay(persona: &str, level: &str, scenario: &str) -> Self {
        Self {
            variant: Variant::Roleplay,
            persona: persona.trim().to_string(),
            level: level.to_string(),
            scenario: scenario.trim().to_string(),
            learner_name: default_learner_name(),
            reference_text: None,
            model: default_model(),
            give_up_policy: GiveUpPolicy::default(),
        }
    }

    pub fn kids(learner_name: &str, situation: &str) -> Self {
        let name = learner_name.trim();
        Self {
            variant: Variant::Kids,
            persona: String::new(),
            level: LEVELS[0].to_string(),
            scenario: situation.trim().to_string(),
            learner_name: if name.is_empty() {
                default_learner_name()
            } else {
                name.to_string()
            },
            reference_text: None,
            model: default_model(),
            give_up_policy: GiveUpPolicy::default(),
        }
    }

    pub fn with_model(mut self, model: &str) -> Self {
        self.model = model.to_string();
        self
    }

    pub fn with_policy(mut self, policy: GiveUpPolicy) -> Self {
        self.give_up_policy = policy;
        self
    }

    /// Attach reference text, cut to `MAX_REFERENCE_CHARS`. Blank text clears it.
    pub fn with_reference(mut self, text: &str) -> Self {
        let trimmed = text.trim();
        self.reference_text = if trimmed.is_empty() {
            None
        } else {
            Some(trimmed.chars().take(MAX_REFERENCE_CHARS).collect())
        };
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn kids_blank_name_falls_back() {
        let config = Configuration::kids("  ", "park");
        assert_eq!(config.learner_name, "おともだち");
        assert_eq!(config.variant, Variant::Kids);
    }

    #[test]
    fn reference_is_truncated() {
        let long = "a".repeat(MAX_REFERENCE_CHARS + 50);
        let config = Configuration::roleplay("clerk", LEVELS[1], "shop").with_reference(&long);
        assert_eq!(config.reference_text.unwrap().chars().count(), MAX_REFERENCE_CHARS);

        let cleared = Configuration::roleplay("clerk", LEVELS[1], "shop").with_reference("   ");
        assert!(cleared.reference_text.is_none());
    }

    #[test]
    fn missing_fields_take_defaults() {
        let config: Configuration = serde_json::from_str(r#"{"scenario": "airport"}"#).unwrap();
        assert_eq!(config.variant, Variant::Roleplay);
        assert_eq!(config.model, DEFAULT_MODEL);
        assert_eq!(config.level, LEVELS[2]);
        assert_eq!(config.give_up_policy, GiveUpPolicy::ContinueNarrative);
    }
}
