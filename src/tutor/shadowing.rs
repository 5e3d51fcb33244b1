use std::collections::BTreeMap;

use crate::error::TutorError;
use crate::service::{LanguageModel, SpeechToText};
use crate::tutor::audio_gate::{AudioClip, AudioGate};
use crate::tutor::markers::{self, Chunk, RoleplayReply};
use crate::tutor::prompt;
use crate::tutor::recitation::{self, Verdict};
use crate::tutor::transcript::{Role, Transcript, TurnKind};

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum ShadowingView {
    #[default]
    EnglishAndJapanese,
    EnglishOnly,
    Blind,
}

impl ShadowingView {
    pub fn next(self) -> Self {
        match self {
            ShadowingView::EnglishAndJapanese => ShadowingView::EnglishOnly,
            ShadowingView::EnglishOnly => ShadowingView::Blind,
            ShadowingView::Blind => ShadowingView::EnglishAndJapanese,
        }
    }

    pub fn shows_english(self) -> bool {
        self != ShadowingView::Blind
    }

    pub fn shows_japanese(self) -> bool {
        self == ShadowingView::EnglishAndJapanese
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum JudgeOutcome {
    Duplicate,
    NoInput,
    Judged(Verdict),
}

/// Every question the role-play partner asked, one paragraph each.
pub fn script_from_transcript(transcript: &Transcript) -> String {
    transcript
        .turns()
        .iter()
        .filter(|t| t.role == Role::Assistant && t.kind == TurnKind::Dialogue)
        .map(|t| RoleplayReply::parse(&t.content).question)
        .filter(|q| !q.is_empty())
        .collect::<Vec<_>>()
        .join("\n\n")
}

/// A script split into sentences, with a verdict per practised sentence.
#[derive(Clone, Debug, Default)]
pub struct ShadowingDrill {
    pub script: String,
    pub chunks: Vec<Chunk>,
    pub verdicts: BTreeMap<usize, Verdict>,
    pub view: ShadowingView,
    gate: AudioGate,
}

impl ShadowingDrill {
    pub fn set_script(&mut self, script: &str) {
        self.script = script.trim().to_string();
    }

    pub fn generate_script(
        &mut self,
        model: &dyn LanguageModel,
        level: &str,
        situation: &str,
    ) -> Result<(), TutorError> {
        let script = model.generate(&prompt::shadowing_script(level, situation))?;
        if script.trim().is_empty() {
            return Err(TutorError::Service("empty script".to_string()));
        }
        self.set_script(&script);
        Ok(())
    }

    /// Replace the chunk list. On failure the previous chunks stay.
    pub fn split(&mut self, model: &dyn LanguageModel) -> Result<usize, TutorError> {
        if self.script.is_empty() {
            return Err(TutorError::invalid("split", "no_script"));
        }
        let reply = model.generate(&prompt::split_script(&self.script))?;
        let chunks = markers::parse_chunks(&reply);
        if chunks.is_empty() {
            return Err(TutorError::Service("no 'English || 日本語' lines in reply".to_string()));
        }
        log::info!("split script into {} chunks", chunks.len());
        self.chunks = chunks;
        self.verdicts.clear();
        Ok(self.chunks.len())
    }

    pub fn recorder_generation(&self) -> u64 {
        self.gate.recorder_generation()
    }

    /// Transcribe `clip` and judge it against chunk `index`.
    pub fn judge(
        &mut self,
        model: &dyn LanguageModel,
        speech: &dyn SpeechToText,
        index: usize,
        clip: &AudioClip,
    ) -> Result<JudgeOutcome, TutorError> {
        let expected = self
            .chunks
            .get(index)
            .map(|c| c.en.clone())
            .ok_or_else(|| TutorError::invalid("judge", "no_chunk"))?;
        if clip.is_empty() {
            return Ok(JudgeOutcome::NoInput);
        }
        let fingerprint = clip.fingerprint();
        if !self.gate.is_new(&fingerprint) {
            return Ok(JudgeOutcome::Duplicate);
        }

        let heard = speech.transcribe(&clip.bytes, &clip.mime)?;
        let heard = heard.trim();
        if heard.is_empty() {
            self.gate.commit(fingerprint);
            return Ok(JudgeOutcome::NoInput);
        }
        let verdict = recitation::check(model, &expected, heard)?;
        self.gate.commit(fingerprint);
        self.verdicts.insert(index, verdict.clone());
        Ok(JudgeOutcome::Judged(verdict))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::service::ServiceError;
    use crate::service::fake::{ScriptedModel, ScriptedSpeech};
    use crate::tutor::transcript::Turn;

    fn drill_with_chunks() -> ShadowingDrill {
        let mut drill = ShadowingDrill::default();
        drill.set_script("Hello. How are you?");
        let model = ScriptedModel::new(&["Hello. || こんにちは。\nHow are you? || 元気？"]);
        drill.split(&model).unwrap();
        drill
    }

    #[test]
    fn script_collects_questions_only() {
        let mut transcript = Transcript::default();
        transcript.append(Turn::directive("start"));
        transcript.append(Turn::assistant("[英語の質問]\nWhat is your name?"));
        transcript.append(Turn::user("Ken"));
        transcript.append(Turn::assistant("[フィードバック]\n- ok\n[英語の質問]\nWhere do you live?"));
        transcript.append(Turn::assistant("[リピート練習]\nI live in Tokyo."));
        assert_eq!(
            script_from_transcript(&transcript),
            "What is your name?\n\nWhere do you live?"
        );
    }

    #[test]
    fn split_ignores_lines_without_separator() {
        let mut drill = ShadowingDrill::default();
        drill.set_script("Hi there. Bye.");
        let model = ScriptedModel::new(&["Here you go:\nHi there. || やあ。\nBye. || じゃあね。"]);
        assert_eq!(drill.split(&model).unwrap(), 2);
        assert_eq!(drill.chunks[1].ja, "じゃあね。");
    }

    #[test]
    fn failed_split_keeps_previous_chunks() {
        let mut drill = drill_with_chunks();
        let model = ScriptedModel::new(&["sorry, I cannot"]);
        assert!(drill.split(&model).is_err());
        assert_eq!(drill.chunks.len(), 2);
    }

    #[test]
    fn split_without_script_is_refused() {
        let mut drill = ShadowingDrill::default();
        let model = ScriptedModel::default();
        assert!(drill.split(&model).is_err());
        assert_eq!(model.generate_count(), 0);
    }

    #[test]
    fn judge_records_verdict_and_gates_repeats() {
        let mut drill = drill_with_chunks();
        let model = ScriptedModel::default();
        let speech = ScriptedSpeech::new(&["hello"]);
        let clip = AudioClip::new(vec![3; 40], "audio/wav");

        let first = drill.judge(&model, &speech, 0, &clip).unwrap();
        assert!(matches!(first, JudgeOutcome::Judged(ref v) if v.exact));
        assert_eq!(drill.judge(&model, &speech, 0, &clip).unwrap(), JudgeOutcome::Duplicate);
        assert_eq!(speech.calls.get(), 1);
        assert!(drill.verdicts.contains_key(&0));
    }

    #[test]
    fn judge_failure_allows_retry() {
        let mut drill = drill_with_chunks();
        let model = ScriptedModel::default();
        model.push_err(ServiceError::Quota("429".into()));
        model.push("「you」が聞き取れませんでした。");
        let speech = ScriptedSpeech::new(&["how are", "how are"]);
        let clip = AudioClip::new(vec![9; 40], "audio/wav");

        assert!(drill.judge(&model, &speech, 1, &clip).is_err());
        let retried = drill.judge(&model, &speech, 1, &clip).unwrap();
        assert!(matches!(retried, JudgeOutcome::Judged(ref v) if !v.exact));
    }

    #[test]
    fn view_cycles() {
        let view = ShadowingView::default();
        assert!(view.shows_japanese());
        assert!(!view.next().shows_japanese());
        assert!(!view.next().next().shows_english());
        assert_eq!(view.next().next().next(), view);
    }
}
