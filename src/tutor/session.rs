use serde::{Deserialize, Serialize};

use crate::error::TutorError;
use crate::service::{ChatContext, LanguageModel, SpeechToText};
use crate::tutor::audio_gate::{AudioClip, AudioGate};
use crate::tutor::configuration::{Configuration, Variant};
use crate::tutor::markers::{KidsCard, RoleplayReply};
use crate::tutor::prompt;
use crate::tutor::recitation;
use crate::tutor::transcript::{Role, Transcript, Turn, TurnKind};

/// Stars needed before the kids' lesson offers a level change.
pub const STAMPS_PER_LEVEL: u32 = 5;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PracticeOrigin {
    Correction,
    GiveUp,
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum Mode {
    #[default]
    Normal,
    RepeatPractice {
        sentence: String,
        origin: PracticeOrigin,
    },
    GiveUp,
    LevelUpPending,
}

impl Mode {
    pub fn name(&self) -> &'static str {
        match self {
            Mode::Normal => "normal",
            Mode::RepeatPractice { .. } => "repeat_practice",
            Mode::GiveUp => "give_up",
            Mode::LevelUpPending => "level_up_pending",
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Progress {
    pub stamps: u32,
    pub level: u32,
    pub total_stamps: u32,
}

impl Default for Progress {
    fn default() -> Self {
        Self {
            stamps: 0,
            level: 1,
            total_stamps: 0,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum LevelChoice {
    Advance,
    Repeat,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NoteKind {
    Translation,
    Suggestion,
    LookUp,
}

/// Result of a one-off helper call, shown beside the conversation.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Note {
    pub kind: NoteKind,
    pub subject: String,
    pub text: String,
}

#[derive(Clone, Debug, PartialEq)]
pub struct Session {
    pub config: Configuration,
    pub transcript: Transcript,
    pub mode: Mode,
    pub progress: Progress,
    pub card: Option<KidsCard>,
    pub note: Option<Note>,
    pub last_played_index: Option<usize>,
    pub gate: AudioGate,
}

impl Session {
    pub fn new(config: Configuration) -> Self {
        Self {
            config,
            transcript: Transcript::default(),
            mode: Mode::Normal,
            progress: Progress::default(),
            card: None,
            note: None,
            last_played_index: None,
            gate: AudioGate::default(),
        }
    }

    pub fn variant(&self) -> Variant {
        self.config.variant
    }

    pub fn is_started(&self) -> bool {
        !self.transcript.is_empty()
    }

    fn state_name(&self) -> &'static str {
        if self.is_started() {
            self.mode.name()
        } else {
            "not_started"
        }
    }

    /// Text of a turn as the model receives it.
    pub fn wire_text(&self, turn: &Turn) -> String {
        match (turn.role, turn.kind) {
            (Role::User, TurnKind::Dialogue) => prompt::frame_utterance(self.variant(), &turn.content),
            _ => turn.content.clone(),
        }
    }

    /// System instruction plus every in-context turn, oldest first.
    pub fn chat_context(&self) -> ChatContext {
        ChatContext {
            model: self.config.model.clone(),
            system_instruction: prompt::system_instruction(&self.config, &self.progress),
            history: self
                .transcript
                .context_turns()
                .map(|t| (t.role, self.wire_text(t)))
                .collect(),
        }
    }

    pub fn last_reply(&self) -> RoleplayReply {
        self.transcript
            .last_assistant()
            .map(|(_, t)| RoleplayReply::parse(&t.content))
            .unwrap_or_default()
    }

    /// The English line the learner is currently answering.
    pub fn current_question(&self) -> Option<String> {
        match self.variant() {
            Variant::Roleplay => {
                let reply = self.last_reply();
                reply.speakable().map(str::to_string)
            }
            Variant::Kids => self
                .card
                .as_ref()
                .and_then(|c| c.speakable())
                .map(str::to_string),
        }
    }

    pub fn practice_sentence(&self) -> Option<&str> {
        match &self.mode {
            Mode::RepeatPractice { sentence, .. } => Some(sentence),
            _ => None,
        }
    }

    fn speakable_for(&self, turn: &Turn) -> Option<String> {
        match self.variant() {
            Variant::Roleplay => RoleplayReply::parse(&turn.content)
                .speakable()
                .map(str::to_string),
            Variant::Kids => KidsCard::parse(&turn.content)
                .speakable()
                .map(str::to_string),
        }
    }

    /// The newest assistant turn if it has not been auto-played yet.
    pub fn pending_playback(&self) -> Option<(usize, String)> {
        let (index, turn) = self.transcript.last_assistant()?;
        if self.last_played_index == Some(index) {
            return None;
        }
        self.speakable_for(turn).map(|text| (index, text))
    }

    pub fn mark_played(&mut self, index: usize) {
        self.last_played_index = Some(index);
    }

    pub fn level_ratio(&self) -> f64 {
        self.progress.stamps as f64 / STAMPS_PER_LEVEL as f64
    }
}

/// Learner actions, one handler each.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Action {
    Start,
    Answer(String),
    AnswerAudio(AudioClip),
    GiveUp,
    Resume,
    Skip,
    ChooseLevel(LevelChoice),
    Translate,
    SuggestAnswer,
    LookUp(String),
    Restart,
}

impl Action {
    pub fn name(&self) -> &'static str {
        match self {
            Action::Start => "start",
            Action::Answer(_) | Action::AnswerAudio(_) => "answer",
            Action::GiveUp => "give_up",
            Action::Resume => "resume",
            Action::Skip => "skip",
            Action::ChooseLevel(_) => "choose_level",
            Action::Translate => "translate",
            Action::SuggestAnswer => "suggest_answer",
            Action::LookUp(_) => "look_up",
            Action::Restart => "restart",
        }
    }
}

/// Side information about a completed action, for the status line.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Notice {
    /// The clip was already submitted; nothing happened.
    DuplicateAudio,
    /// Nothing intelligible was said; no turn was recorded.
    NoInput,
    Heard(String),
    Recited(recitation::Verdict),
    StarEarned(u32),
    LevelUpReady,
}

#[derive(Clone, Debug)]
pub struct Step {
    pub session: Session,
    pub notice: Option<Notice>,
}

impl Step {
    fn quiet(session: Session) -> Self {
        Self {
            session,
            notice: None,
        }
    }

    fn with(session: Session, notice: Notice) -> Self {
        Self {
            session,
            notice: Some(notice),
        }
    }
}

/// Drives a `Session` through the conversation state machine.
///
/// `handle` never mutates its input: it returns the next session, or an error
/// with the caller's session still valid, so a failed call can be retried.
pub struct Tutor<'a> {
    model: &'a dyn LanguageModel,
    speech: &'a dyn SpeechToText,
}

impl<'a> Tutor<'a> {
    pub fn new(model: &'a dyn LanguageModel, speech: &'a dyn SpeechToText) -> Self {
        Self { model, speech }
    }

    pub fn handle(&self, session: &Session, action: Action) -> Result<Step, TutorError> {
        let name = action.name();
        let from = session.state_name();
        let step = match action {
            Action::Start => self.start(session),
            Action::Answer(text) => self.answer(session, &text),
            Action::AnswerAudio(clip) => self.answer_audio(session, clip),
            Action::GiveUp => self.give_up(session),
            Action::Resume => self.resume(session),
            Action::Skip => self.skip(session),
            Action::ChooseLevel(choice) => self.choose_level(session, choice),
            Action::Translate => self.translate(session),
            Action::SuggestAnswer => self.suggest_answer(session),
            Action::LookUp(word) => self.look_up(session, &word),
            Action::Restart => self.start(&Session::new(session.config.clone())),
        };
        match &step {
            Ok(step) => log::info!("{name}: {from} -> {}", step.session.state_name()),
            Err(e) => log::warn!("{name} failed in {from}: {e}"),
        }
        step
    }

    /// Send `turn`, append it and the reply. The input session is untouched.
    fn exchange(&self, session: &Session, turn: Turn) -> Result<(Session, String), TutorError> {
        let context = session.chat_context();
        let message = session.wire_text(&turn);
        log::debug!(
            "sending {} chars with {} turns of history",
            message.len(),
            context.history.len()
        );
        let reply = self.model.send(&context, &message)?;

        let mut next = session.clone();
        next.transcript.append(turn);
        next.transcript.append(Turn::assistant(reply.clone()));
        next.note = None;
        if next.variant() == Variant::Kids {
            next.card = Some(KidsCard::parse(&reply));
        }
        Ok((next, reply))
    }

    fn start(&self, session: &Session) -> Result<Step, TutorError> {
        if session.is_started() {
            return Err(TutorError::invalid("start", session.state_name()));
        }
        let opening = Turn::directive(prompt::opening(session.variant()));
        let (mut next, _) = self.exchange(session, opening)?;
        next.mode = Mode::Normal;
        Ok(Step::quiet(next))
    }

    fn answer_audio(&self, session: &Session, clip: AudioClip) -> Result<Step, TutorError> {
        self.ensure_answerable(session)?;
        if clip.is_empty() {
            return Ok(Step::with(session.clone(), Notice::NoInput));
        }
        let fingerprint = clip.fingerprint();
        if !session.gate.is_new(&fingerprint) {
            log::debug!("ignoring re-delivered clip {fingerprint}");
            return Ok(Step::with(session.clone(), Notice::DuplicateAudio));
        }

        let heard = self.speech.transcribe(&clip.bytes, &clip.mime)?;
        let heard = heard.trim();
        if heard.is_empty() {
            let mut next = session.clone();
            next.gate.commit(fingerprint);
            return Ok(Step::with(next, Notice::NoInput));
        }

        let mut step = self.answer(session, heard)?;
        step.session.gate.commit(fingerprint);
        if step.notice.is_none() {
            step.notice = Some(Notice::Heard(heard.to_string()));
        }
        Ok(step)
    }

    fn ensure_answerable(&self, session: &Session) -> Result<(), TutorError> {
        let ok = session.is_started()
            && matches!(
                (session.variant(), &session.mode),
                (Variant::Roleplay, Mode::Normal)
                    | (Variant::Roleplay, Mode::RepeatPractice { .. })
                    | (Variant::Kids, Mode::Normal)
            );
        if ok {
            Ok(())
        } else {
            Err(TutorError::invalid("answer", session.state_name()))
        }
    }

    fn answer(&self, session: &Session, text: &str) -> Result<Step, TutorError> {
        self.ensure_answerable(session)?;
        let text = text.trim();
        if text.is_empty() {
            return Ok(Step::with(session.clone(), Notice::NoInput));
        }

        match (session.variant(), &session.mode) {
            (Variant::Roleplay, Mode::RepeatPractice { sentence, .. }) => {
                self.recite(session, sentence, text)
            }
            (Variant::Roleplay, _) => {
                let (mut next, reply) = self.exchange(session, Turn::user(text))?;
                let parsed = RoleplayReply::parse(&reply);
                next.mode = if parsed.has_practice() {
                    Mode::RepeatPractice {
                        sentence: parsed.practice,
                        origin: PracticeOrigin::Correction,
                    }
                } else {
                    Mode::Normal
                };
                Ok(Step::quiet(next))
            }
            (Variant::Kids, _) => self.kids_answer(session, text),
        }
    }

    fn recite(&self, session: &Session, sentence: &str, text: &str) -> Result<Step, TutorError> {
        let verdict = recitation::check(self.model, sentence, text)?;
        let mut next = session.clone();
        next.transcript.append(Turn::aside(Role::User, text));
        let summary = if verdict.exact {
            format!("✓ {sentence}")
        } else {
            verdict.comment.clone()
        };
        next.transcript.append(Turn::aside(Role::Assistant, summary));
        Ok(Step::with(next, Notice::Recited(verdict)))
    }

    fn kids_answer(&self, session: &Session, text: &str) -> Result<Step, TutorError> {
        let mut progress = session.progress;
        progress.stamps += 1;
        progress.total_stamps += 1;

        if progress.stamps % STAMPS_PER_LEVEL == 0 {
            let mut next = session.clone();
            next.transcript.append(Turn::user(text));
            next.progress = progress;
            next.mode = Mode::LevelUpPending;
            return Ok(Step::with(next, Notice::LevelUpReady));
        }

        let (mut next, _) = self.exchange(session, Turn::user(text))?;
        next.progress = progress;
        Ok(Step::with(next, Notice::StarEarned(progress.stamps)))
    }

    fn give_up(&self, session: &Session) -> Result<Step, TutorError> {
        let allowed = session.is_started()
            && session.variant() == Variant::Roleplay
            && matches!(
                session.mode,
                Mode::Normal | Mode::RepeatPractice { .. } | Mode::GiveUp
            );
        if !allowed {
            return Err(TutorError::invalid("give_up", session.state_name()));
        }

        let directive = Turn::directive(prompt::give_up(session.config.give_up_policy));
        let (mut next, reply) = self.exchange(session, directive)?;
        let parsed = RoleplayReply::parse(&reply);
        next.mode = if parsed.has_practice() {
            Mode::RepeatPractice {
                sentence: parsed.practice,
                origin: PracticeOrigin::GiveUp,
            }
        } else {
            Mode::GiveUp
        };
        Ok(Step::quiet(next))
    }

    fn resume(&self, session: &Session) -> Result<Step, TutorError> {
        let origin = match &session.mode {
            Mode::RepeatPractice { origin, .. } => *origin,
            Mode::GiveUp => PracticeOrigin::GiveUp,
            _ => return Err(TutorError::invalid("resume", session.state_name())),
        };
        let directive = Turn::directive(prompt::resume(origin, session.config.give_up_policy));
        let (mut next, _) = self.exchange(session, directive)?;
        next.mode = Mode::Normal;
        Ok(Step::quiet(next))
    }

    fn skip(&self, session: &Session) -> Result<Step, TutorError> {
        if !session.is_started() || session.mode != Mode::Normal {
            return Err(TutorError::invalid("skip", session.state_name()));
        }
        let directive = Turn::directive(prompt::skip(session.variant()));
        let (next, _) = self.exchange(session, directive)?;
        Ok(Step::quiet(next))
    }

    fn choose_level(&self, session: &Session, choice: LevelChoice) -> Result<Step, TutorError> {
        if session.mode != Mode::LevelUpPending {
            return Err(TutorError::invalid("choose_level", session.state_name()));
        }
        let mut staged = session.clone();
        staged.progress.stamps = 0;
        if choice == LevelChoice::Advance {
            staged.progress.level += 1;
        }
        staged.mode = Mode::Normal;

        let directive = Turn::directive(prompt::level_choice(choice, staged.progress.level));
        let (next, _) = self.exchange(&staged, directive)?;
        Ok(Step::quiet(next))
    }

    fn one_off(
        &self,
        session: &Session,
        kind: NoteKind,
        subject: String,
        prompt: String,
    ) -> Result<Step, TutorError> {
        let text = self.model.generate(&prompt)?;
        let mut next = session.clone();
        next.note = Some(Note {
            kind,
            subject,
            text: text.trim().to_string(),
        });
        Ok(Step::quiet(next))
    }

    /// The question a helper call is about; helpers exist for role-play only.
    fn helper_subject(&self, session: &Session, action: &'static str) -> Result<String, TutorError> {
        if session.variant() != Variant::Roleplay {
            return Err(TutorError::invalid(action, session.state_name()));
        }
        session
            .current_question()
            .ok_or_else(|| TutorError::invalid(action, session.state_name()))
    }

    fn translate(&self, session: &Session) -> Result<Step, TutorError> {
        let question = self.helper_subject(session, "translate")?;
        let prompt = prompt::translate(&question);
        self.one_off(session, NoteKind::Translation, question, prompt)
    }

    fn suggest_answer(&self, session: &Session) -> Result<Step, TutorError> {
        let question = self.helper_subject(session, "suggest_answer")?;
        let prompt = prompt::suggest_answer(&question, &session.config.level);
        self.one_off(session, NoteKind::Suggestion, question, prompt)
    }

    fn look_up(&self, session: &Session, word: &str) -> Result<Step, TutorError> {
        let word = word.trim();
        if word.is_empty() || session.variant() != Variant::Roleplay || !session.is_started() {
            return Err(TutorError::invalid("look_up", session.state_name()));
        }
        self.one_off(session, NoteKind::LookUp, word.to_string(), prompt::look_up(word))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::service::ServiceError;
    use crate::service::fake::{ScriptedModel, ScriptedSpeech};
    use crate::tutor::configuration::{GiveUpPolicy, LEVELS};

    const Q1: &str = "[英語の質問]\nWhat is your name?";
    const Q2: &str = "[フィードバック]\n- ok\n[英語の質問]\nWhere do you live?";
    const CORRECTION: &str = "[フィードバック]\n- past tense\n[リピート練習]\nI went to the park.";

    fn card(en: &str) -> String {
        format!("<praise>すごい！</praise><ai_en>{en}</ai_en><ai_ja>やく</ai_ja><hint_en>Yes.</hint_en>")
    }

    fn roleplay() -> Session {
        Session::new(Configuration::roleplay("waiter", LEVELS[2], "cafe"))
    }

    fn kids() -> Session {
        Session::new(Configuration::kids("けん", "park"))
    }

    fn started(session: Session, model: &ScriptedModel, speech: &ScriptedSpeech) -> Session {
        Tutor::new(model, speech)
            .handle(&session, Action::Start)
            .unwrap()
            .session
    }

    #[test]
    fn start_appends_directive_and_reply() {
        let model = ScriptedModel::new(&[Q1]);
        let speech = ScriptedSpeech::default();
        let session = started(roleplay(), &model, &speech);
        assert_eq!(session.transcript.len(), 2);
        assert_eq!(session.transcript.turns()[0].kind, TurnKind::Directive);
        assert_eq!(session.current_question().as_deref(), Some("What is your name?"));
        assert_eq!(session.mode, Mode::Normal);
    }

    #[test]
    fn start_twice_is_rejected() {
        let model = ScriptedModel::new(&[Q1]);
        let speech = ScriptedSpeech::default();
        let session = started(roleplay(), &model, &speech);
        let err = Tutor::new(&model, &speech)
            .handle(&session, Action::Start)
            .unwrap_err();
        assert!(matches!(err, TutorError::InvalidAction { action: "start", .. }));
    }

    #[test]
    fn answer_before_start_is_rejected() {
        let model = ScriptedModel::default();
        let speech = ScriptedSpeech::default();
        let err = Tutor::new(&model, &speech)
            .handle(&roleplay(), Action::Answer("hi".into()))
            .unwrap_err();
        assert!(matches!(err, TutorError::InvalidAction { state: "not_started", .. }));
        assert_eq!(model.send_count(), 0);
    }

    #[test]
    fn history_is_replayed_on_each_send() {
        let model = ScriptedModel::new(&[Q1, Q2]);
        let speech = ScriptedSpeech::default();
        let tutor = Tutor::new(&model, &speech);
        let session = started(roleplay(), &model, &speech);
        tutor
            .handle(&session, Action::Answer("My name is Ken.".into()))
            .unwrap();
        let sends = model.sends.borrow();
        let (context, message) = &sends[1];
        assert_eq!(message, "My name is Ken.");
        assert_eq!(context.history.len(), 2);
        assert_eq!(context.history[1].0, Role::Assistant);
    }

    #[test]
    fn correction_enters_repeat_practice() {
        let model = ScriptedModel::new(&[Q1, CORRECTION]);
        let speech = ScriptedSpeech::default();
        let session = started(roleplay(), &model, &speech);
        let step = Tutor::new(&model, &speech)
            .handle(&session, Action::Answer("I go park yesterday".into()))
            .unwrap();
        assert_eq!(
            step.session.mode,
            Mode::RepeatPractice {
                sentence: "I went to the park.".into(),
                origin: PracticeOrigin::Correction
            }
        );
    }

    #[test]
    fn repeat_practice_only_resume_returns_to_normal() {
        let model = ScriptedModel::new(&[Q1, CORRECTION]);
        let speech = ScriptedSpeech::default();
        let tutor = Tutor::new(&model, &speech);
        let session = started(roleplay(), &model, &speech);
        let practicing = tutor
            .handle(&session, Action::Answer("I go park".into()))
            .unwrap()
            .session;

        // skip and level choice are refused outright
        assert!(tutor.handle(&practicing, Action::Skip).is_err());
        assert!(
            tutor
                .handle(&practicing, Action::ChooseLevel(LevelChoice::Advance))
                .is_err()
        );

        // reciting keeps the mode
        let recited = tutor
            .handle(&practicing, Action::Answer("I went to the park".into()))
            .unwrap();
        assert_eq!(recited.session.mode.name(), "repeat_practice");
        assert!(matches!(recited.notice, Some(Notice::Recited(ref v)) if v.exact));

        // give-up without a practice sentence lands in GiveUp, never level-up
        model.push("[フィードバック]\n説明だけです。");
        let gave_up = tutor.handle(&recited.session, Action::GiveUp).unwrap().session;
        assert_eq!(gave_up.mode, Mode::GiveUp);

        model.push(Q2);
        let resumed = tutor.handle(&gave_up, Action::Resume).unwrap().session;
        assert_eq!(resumed.mode, Mode::Normal);
    }

    #[test]
    fn resume_instructs_narrative_continuation() {
        let model = ScriptedModel::new(&[Q1, CORRECTION, Q2]);
        let speech = ScriptedSpeech::default();
        let tutor = Tutor::new(&model, &speech);
        let session = started(roleplay(), &model, &speech);
        let practicing = tutor
            .handle(&session, Action::Answer("I go park".into()))
            .unwrap()
            .session;
        tutor.handle(&practicing, Action::Resume).unwrap();
        let sends = model.sends.borrow();
        assert!(sends.last().unwrap().1.contains("流れ"));
    }

    #[test]
    fn give_up_with_model_answer_enters_practice() {
        let model = ScriptedModel::new(&[Q1, CORRECTION]);
        let speech = ScriptedSpeech::default();
        let session = Session::new(
            Configuration::roleplay("waiter", LEVELS[2], "cafe").with_policy(GiveUpPolicy::FreshQuestion),
        );
        let tutor = Tutor::new(&model, &speech);
        let session = tutor.handle(&session, Action::Start).unwrap().session;
        let step = tutor.handle(&session, Action::GiveUp).unwrap();
        assert!(matches!(
            step.session.mode,
            Mode::RepeatPractice {
                origin: PracticeOrigin::GiveUp,
                ..
            }
        ));
        assert!(model.sends.borrow()[1].1.contains("新しい話題"));
    }

    #[test]
    fn failure_leaves_session_unchanged() {
        let model = ScriptedModel::new(&[Q1]);
        let speech = ScriptedSpeech::default();
        let tutor = Tutor::new(&model, &speech);
        let session = started(roleplay(), &model, &speech);
        model.push_err(ServiceError::Quota("429".into()));
        let before = session.clone();
        let err = tutor.handle(&session, Action::GiveUp).unwrap_err();
        assert!(matches!(err, TutorError::Quota(_)));
        assert_eq!(session, before);
    }

    #[test]
    fn duplicate_clip_is_submitted_once() {
        let model = ScriptedModel::new(&[Q1, Q2]);
        let speech = ScriptedSpeech::new(&["My name is Ken."]);
        let tutor = Tutor::new(&model, &speech);
        let session = started(roleplay(), &model, &speech);
        let clip = AudioClip::new(vec![7; 64], "audio/wav");

        let first = tutor
            .handle(&session, Action::AnswerAudio(clip.clone()))
            .unwrap();
        let second = tutor
            .handle(&first.session, Action::AnswerAudio(clip))
            .unwrap();

        assert_eq!(second.notice, Some(Notice::DuplicateAudio));
        assert_eq!(second.session.transcript.len(), 4);
        assert_eq!(model.send_count(), 2); // start + one answer
        assert_eq!(speech.calls.get(), 1);
        assert_eq!(second.session.gate.recorder_generation(), 1);
    }

    #[test]
    fn silent_clip_records_nothing() {
        let model = ScriptedModel::new(&[Q1]);
        let speech = ScriptedSpeech::new(&["   "]);
        let tutor = Tutor::new(&model, &speech);
        let session = started(roleplay(), &model, &speech);
        let step = tutor
            .handle(&session, Action::AnswerAudio(AudioClip::new(vec![0; 32], "audio/wav")))
            .unwrap();
        assert_eq!(step.notice, Some(Notice::NoInput));
        assert_eq!(step.session.transcript.len(), 2);
        assert_eq!(step.session.mode, Mode::Normal);
        assert_eq!(model.send_count(), 1);
    }

    #[test]
    fn failed_dialogue_does_not_commit_fingerprint() {
        let model = ScriptedModel::new(&[Q1]);
        let speech = ScriptedSpeech::new(&["Hello", "Hello"]);
        let tutor = Tutor::new(&model, &speech);
        let session = started(roleplay(), &model, &speech);
        let clip = AudioClip::new(vec![1; 16], "audio/wav");
        model.push_err(ServiceError::Request("timeout".into()));
        assert!(tutor.handle(&session, Action::AnswerAudio(clip.clone())).is_err());

        model.push(Q2);
        let retried = tutor.handle(&session, Action::AnswerAudio(clip)).unwrap();
        assert_eq!(retried.notice, Some(Notice::Heard("Hello".into())));
        assert_eq!(retried.session.transcript.len(), 4);
    }

    #[test]
    fn kids_level_up_after_five_stars() {
        let model = ScriptedModel::new(&[card("Hi!").as_str()]);
        let speech = ScriptedSpeech::default();
        let tutor = Tutor::new(&model, &speech);
        let mut session = started(kids(), &model, &speech);
        let mut pending_entries = 0;

        for i in 1..=5 {
            if i < 5 {
                model.push(&card("Next?"));
            }
            let step = tutor
                .handle(&session, Action::Answer(format!("answer {i}")))
                .unwrap();
            if step.session.mode == Mode::LevelUpPending {
                pending_entries += 1;
            }
            session = step.session;
        }
        assert_eq!(pending_entries, 1);
        assert_eq!(session.progress.stamps, 5);
        assert_eq!(model.send_count(), 5); // start + four answers

        // nothing but a level choice is accepted now
        assert!(tutor.handle(&session, Action::Skip).is_err());
        assert!(tutor.handle(&session, Action::Answer("more".into())).is_err());

        model.push(&card("Harder?"));
        let advanced = tutor
            .handle(&session, Action::ChooseLevel(LevelChoice::Advance))
            .unwrap()
            .session;
        assert_eq!(advanced.progress.stamps, 0);
        assert_eq!(advanced.progress.level, 2);
        assert_eq!(advanced.mode, Mode::Normal);
        assert!(model.sends.borrow().last().unwrap().0.system_instruction.contains("レベル2"));
    }

    #[test]
    fn kids_repeat_keeps_level() {
        let model = ScriptedModel::new(&[card("Same?").as_str()]);
        let speech = ScriptedSpeech::default();
        let mut session = kids();
        session.transcript.append(Turn::assistant(card("Hi")));
        session.progress.stamps = 5;
        session.mode = Mode::LevelUpPending;
        let step = Tutor::new(&model, &speech)
            .handle(&session, Action::ChooseLevel(LevelChoice::Repeat))
            .unwrap();
        assert_eq!(step.session.progress.stamps, 0);
        assert_eq!(step.session.progress.level, 1);
        assert_eq!(step.session.card.as_ref().unwrap().ai_en, "Same?");
    }

    #[test]
    fn kids_utterance_is_framed_on_the_wire() {
        let model = ScriptedModel::new(&[card("Hi!").as_str(), card("Nice!").as_str()]);
        let speech = ScriptedSpeech::default();
        let tutor = Tutor::new(&model, &speech);
        let session = started(kids(), &model, &speech);
        let step = tutor.handle(&session, Action::Answer("Apple".into())).unwrap();
        assert_eq!(step.session.transcript.last_assistant().map(|(i, _)| i), Some(3));
        assert!(model.sends.borrow()[1].1.starts_with("子供は「Apple」"));
        assert_eq!(step.session.transcript.turns()[2].content, "Apple");
        assert_eq!(step.notice, Some(Notice::StarEarned(1)));
    }

    #[test]
    fn playback_is_pending_once() {
        let model = ScriptedModel::new(&[Q1]);
        let speech = ScriptedSpeech::default();
        let mut session = started(roleplay(), &model, &speech);
        let (index, text) = session.pending_playback().unwrap();
        assert_eq!(text, "What is your name?");
        session.mark_played(index);
        assert!(session.pending_playback().is_none());
    }

    #[test]
    fn restart_discards_transcript() {
        let model = ScriptedModel::new(&[Q1, Q2, Q1]);
        let speech = ScriptedSpeech::default();
        let tutor = Tutor::new(&model, &speech);
        let session = started(roleplay(), &model, &speech);
        let session = tutor
            .handle(&session, Action::Answer("Ken".into()))
            .unwrap()
            .session;
        let restarted = tutor.handle(&session, Action::Restart).unwrap().session;
        assert_eq!(restarted.transcript.len(), 2);
        assert!(model.sends.borrow()[2].0.history.is_empty());
    }

    #[test]
    fn translate_stores_note_without_touching_transcript() {
        let model = ScriptedModel::new(&[Q1, "あなたの名前は何ですか？"]);
        let speech = ScriptedSpeech::default();
        let tutor = Tutor::new(&model, &speech);
        let session = started(roleplay(), &model, &speech);
        let step = tutor.handle(&session, Action::Translate).unwrap();
        let note = step.session.note.unwrap();
        assert_eq!(note.kind, NoteKind::Translation);
        assert_eq!(note.subject, "What is your name?");
        assert_eq!(step.session.transcript.len(), 2);
        assert_eq!(step.session.mode, Mode::Normal);
    }

    #[test]
    fn skip_asks_another_question_in_normal() {
        let model = ScriptedModel::new(&[Q1, Q2]);
        let speech = ScriptedSpeech::default();
        let session = started(roleplay(), &model, &speech);
        let step = Tutor::new(&model, &speech)
            .handle(&session, Action::Skip)
            .unwrap();

        assert_eq!(model.sends.borrow()[1].1, prompt::skip(Variant::Roleplay));
        assert_eq!(step.notice, None);
        assert_eq!(step.session.mode, Mode::Normal);
        assert_eq!(step.session.transcript.turns()[2].kind, TurnKind::Directive);
        assert_eq!(step.session.current_question().as_deref(), Some("Where do you live?"));
    }

    #[test]
    fn kids_skip_replaces_card_without_a_star() {
        let model = ScriptedModel::new(&[card("Do you like dogs?").as_str(), card("Is it red?").as_str()]);
        let speech = ScriptedSpeech::default();
        let session = started(kids(), &model, &speech);
        let step = Tutor::new(&model, &speech)
            .handle(&session, Action::Skip)
            .unwrap();

        assert_eq!(model.sends.borrow()[1].1, prompt::skip(Variant::Kids));
        assert_eq!(step.session.mode, Mode::Normal);
        assert_eq!(step.session.progress, Progress::default());
        assert_eq!(step.session.card.map(|c| c.ai_en).as_deref(), Some("Is it red?"));
    }

    #[test]
    fn suggest_answer_notes_an_idea_for_the_current_question() {
        let model = ScriptedModel::new(&[Q1, "  My name is Ken.\n私の名前はケンです。  "]);
        let speech = ScriptedSpeech::default();
        let session = started(roleplay(), &model, &speech);
        let step = Tutor::new(&model, &speech)
            .handle(&session, Action::SuggestAnswer)
            .unwrap();

        assert!(model.prompts.borrow()[0].contains("What is your name?"));
        let note = step.session.note.unwrap();
        assert_eq!(note.kind, NoteKind::Suggestion);
        assert_eq!(note.subject, "What is your name?");
        assert_eq!(note.text, "My name is Ken.\n私の名前はケンです。");
        assert_eq!(step.session.transcript, session.transcript);
        assert_eq!(model.send_count(), 1);
    }

    #[test]
    fn look_up_needs_a_word() {
        let model = ScriptedModel::new(&[Q1]);
        let speech = ScriptedSpeech::default();
        let session = started(roleplay(), &model, &speech);
        let err = Tutor::new(&model, &speech)
            .handle(&session, Action::LookUp("   ".into()))
            .unwrap_err();

        assert!(matches!(err, TutorError::InvalidAction { action: "look_up", .. }));
        assert_eq!(model.generate_count(), 0);
    }

    #[test]
    fn look_up_notes_the_meaning() {
        let model = ScriptedModel::new(&[Q1, "通勤する。例: I commute by train."]);
        let speech = ScriptedSpeech::default();
        let session = started(roleplay(), &model, &speech);
        let step = Tutor::new(&model, &speech)
            .handle(&session, Action::LookUp(" commute ".into()))
            .unwrap();

        assert_eq!(model.prompts.borrow()[0], prompt::look_up("commute"));
        let note = step.session.note.unwrap();
        assert_eq!(note.kind, NoteKind::LookUp);
        assert_eq!(note.subject, "commute");
        assert_eq!(step.session.transcript.len(), 2);
        assert_eq!(step.session.mode, Mode::Normal);
    }
}
