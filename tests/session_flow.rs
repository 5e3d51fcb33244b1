use std::cell::RefCell;
use std::collections::VecDeque;

use kaiwa::error::TutorError;
use kaiwa::service::{ChatContext, LanguageModel, ServiceError, SpeechToText};
use kaiwa::store::json_store::JsonStore;
use kaiwa::tutor::audio_gate::AudioClip;
use kaiwa::tutor::configuration::{Configuration, LEVELS};
use kaiwa::tutor::session::{Action, LevelChoice, Mode, Notice, Session, Tutor};
use kaiwa::tutor::transcript::Role;
use tempfile::TempDir;

const Q1: &str = "[英語の質問]\nWhat is your name?";
const Q2: &str = "[英語の質問]\nWhere did you go yesterday?";
const CORRECTION: &str = "[フィードバック]\n- past tense\n[リピート練習]\nI went to the park.";

#[derive(Default)]
struct Script {
    replies: RefCell<VecDeque<String>>,
    sent: RefCell<Vec<(ChatContext, String)>>,
}

impl Script {
    fn new(replies: &[&str]) -> Self {
        Self {
            replies: RefCell::new(replies.iter().map(|r| r.to_string()).collect()),
            sent: RefCell::default(),
        }
    }

    fn next(&self) -> Result<String, ServiceError> {
        self.replies
            .borrow_mut()
            .pop_front()
            .ok_or_else(|| ServiceError::Request("script exhausted".into()))
    }
}

impl LanguageModel for Script {
    fn send(&self, context: &ChatContext, message: &str) -> Result<String, ServiceError> {
        self.sent
            .borrow_mut()
            .push((context.clone(), message.to_string()));
        self.next()
    }

    fn generate(&self, _prompt: &str) -> Result<String, ServiceError> {
        self.next()
    }
}

struct Ears(RefCell<VecDeque<String>>);

impl Ears {
    fn hearing(lines: &[&str]) -> Self {
        Self(RefCell::new(lines.iter().map(|l| l.to_string()).collect()))
    }
}

impl SpeechToText for Ears {
    fn transcribe(&self, _audio: &[u8], _mime: &str) -> Result<String, ServiceError> {
        Ok(self.0.borrow_mut().pop_front().unwrap_or_default())
    }
}

fn card(question: &str) -> String {
    format!(
        "<praise>Great!</praise><ai_en>{question}</ai_en><ai_ja>しつもん</ai_ja><hint_en>I like it.</hint_en>"
    )
}

/// What the model should see as history when `session` makes its next call.
fn expected_history(session: &Session) -> Vec<(Role, String)> {
    session
        .transcript
        .context_turns()
        .map(|t| (t.role, session.wire_text(t)))
        .collect()
}

fn roleplay() -> Session {
    Session::new(Configuration::roleplay("a friendly barista", LEVELS[1], "ordering coffee"))
}

#[test]
fn roleplay_correction_then_repeat_then_resume() {
    let model = Script::new(&[Q1, Q2, CORRECTION, Q1]);
    let ears = Ears::hearing(&[]);
    let tutor = Tutor::new(&model, &ears);

    let s = tutor.handle(&roleplay(), Action::Start).unwrap().session;
    assert_eq!(s.mode, Mode::Normal);
    assert_eq!(s.current_question().as_deref(), Some("What is your name?"));

    let s = tutor.handle(&s, Action::Answer("My name is Ken.".into())).unwrap().session;
    assert_eq!(s.mode, Mode::Normal);

    let s = tutor.handle(&s, Action::Answer("I go park.".into())).unwrap().session;
    assert_eq!(s.practice_sentence(), Some("I went to the park."));

    // exact recitation is judged locally, so no reply is consumed
    let step = tutor.handle(&s, Action::Answer("i went to the park".into())).unwrap();
    assert!(matches!(step.notice, Some(Notice::Recited(ref v)) if v.exact));
    assert_eq!(model.replies.borrow().len(), 1);

    let s = tutor.handle(&step.session, Action::Resume).unwrap().session;
    assert_eq!(s.mode, Mode::Normal);
    assert!(model.replies.borrow().is_empty());
    assert_eq!(model.sent.borrow().len(), 4);
}

#[test]
fn export_hides_directives() {
    let model = Script::new(&[Q1, Q2]);
    let ears = Ears::hearing(&[]);
    let tutor = Tutor::new(&model, &ears);

    let s = tutor.handle(&roleplay(), Action::Start).unwrap().session;
    let s = tutor.handle(&s, Action::Answer("Ken.".into())).unwrap().session;
    let log = s.transcript.exportable_log(s.variant());

    let opening = model.sent.borrow()[0].1.clone();
    assert!(!log.contains(&opening));
    assert!(log.contains("You:\n  Ken."));
    assert!(log.contains("What is your name?"));
}

#[test]
fn failed_call_leaves_session_usable() {
    let model = Script::new(&[Q1]);
    let ears = Ears::hearing(&[]);
    let tutor = Tutor::new(&model, &ears);

    let s = tutor.handle(&roleplay(), Action::Start).unwrap().session;
    let before = s.transcript.len();
    let err = tutor.handle(&s, Action::Answer("Ken.".into())).unwrap_err();
    assert!(matches!(err, TutorError::Service(_)));
    assert_eq!(s.transcript.len(), before);
    assert_eq!(s.mode, Mode::Normal);

    model.replies.borrow_mut().push_back(Q2.to_string());
    let s = tutor.handle(&s, Action::Answer("Ken.".into())).unwrap().session;
    assert_eq!(s.transcript.len(), before + 2);
}

#[test]
fn same_clip_is_only_answered_once() {
    let model = Script::new(&[Q1, Q2]);
    let ears = Ears::hearing(&["My name is Ken."]);
    let tutor = Tutor::new(&model, &ears);

    let s = tutor.handle(&roleplay(), Action::Start).unwrap().session;
    let clip = AudioClip::new(vec![1, 2, 3, 4], "audio/wav");

    let first = tutor.handle(&s, Action::AnswerAudio(clip.clone())).unwrap();
    assert_eq!(first.notice, Some(Notice::Heard("My name is Ken.".into())));

    let again = tutor.handle(&first.session, Action::AnswerAudio(clip)).unwrap();
    assert_eq!(again.notice, Some(Notice::DuplicateAudio));
    assert_eq!(again.session.transcript.len(), first.session.transcript.len());
}

#[test]
fn kids_collect_five_stars_then_level_up() {
    let replies: Vec<String> = (0..6).map(|i| card(&format!("Question {i}?"))).collect();
    let refs: Vec<&str> = replies.iter().map(String::as_str).collect();
    let model = Script::new(&refs);
    let ears = Ears::hearing(&[]);
    let tutor = Tutor::new(&model, &ears);

    let mut s = tutor
        .handle(&Session::new(Configuration::kids("Hana", "zoo")), Action::Start)
        .unwrap()
        .session;
    assert_eq!(s.card.as_ref().map(|c| c.ai_en.as_str()), Some("Question 0?"));

    for n in 1..=4 {
        let step = tutor.handle(&s, Action::Answer("I like lions.".into())).unwrap();
        assert_eq!(step.notice, Some(Notice::StarEarned(n)));
        s = step.session;
    }
    let step = tutor.handle(&s, Action::Answer("Yes!".into())).unwrap();
    assert_eq!(step.notice, Some(Notice::LevelUpReady));
    assert_eq!(step.session.mode, Mode::LevelUpPending);
    s = step.session;

    assert!(tutor.handle(&s, Action::Answer("More!".into())).is_err());

    let s = tutor
        .handle(&s, Action::ChooseLevel(LevelChoice::Advance))
        .unwrap()
        .session;
    assert_eq!(s.mode, Mode::Normal);
    assert_eq!(s.progress.level, 2);
    assert_eq!(s.progress.stamps, 0);
    assert_eq!(s.progress.total_stamps, 5);
}

#[test]
fn saved_lesson_reloads_without_replaying() {
    let model = Script::new(&[Q1, CORRECTION]);
    let ears = Ears::hearing(&[]);
    let tutor = Tutor::new(&model, &ears);

    let s = tutor.handle(&roleplay(), Action::Start).unwrap().session;
    let s = tutor.handle(&s, Action::Answer("I go park.".into())).unwrap().session;
    assert!(s.pending_playback().is_some());

    let dir = TempDir::new().unwrap();
    let store = JsonStore::with_base_dir(dir.path().to_path_buf()).unwrap();
    let path = store.default_save_path("roleplay");
    store.save_session(&path, &s).unwrap();

    let loaded = store.load_session(&path).unwrap();
    assert_eq!(loaded.transcript, s.transcript);
    assert_eq!(loaded.mode, s.mode);
    assert_eq!(loaded.config, s.config);
    assert!(loaded.pending_playback().is_none());

    // the restored transcript is replayed as history on the next call
    model.replies.borrow_mut().push_back(Q2.to_string());
    let resumed = tutor.handle(&loaded, Action::Resume).unwrap().session;
    assert_eq!(resumed.mode, Mode::Normal);

    let sent = model.sent.borrow();
    let (context, _) = sent.last().unwrap();
    assert_eq!(context.history.len(), s.transcript.len());
    assert_eq!(context.history, expected_history(&s));
    assert_eq!(context.system_instruction, s.chat_context().system_instruction);
}

#[test]
fn kids_level_choice_survives_save_and_load() {
    let replies: Vec<String> = (0..6).map(|i| card(&format!("Question {i}?"))).collect();
    let refs: Vec<&str> = replies.iter().map(String::as_str).collect();
    let model = Script::new(&refs);
    let ears = Ears::hearing(&[]);
    let tutor = Tutor::new(&model, &ears);

    let mut s = tutor
        .handle(&Session::new(Configuration::kids("Hana", "park")), Action::Start)
        .unwrap()
        .session;
    for _ in 0..5 {
        s = tutor.handle(&s, Action::Answer("I see a dog.".into())).unwrap().session;
    }
    assert_eq!(s.mode, Mode::LevelUpPending);

    let dir = TempDir::new().unwrap();
    let store = JsonStore::with_base_dir(dir.path().to_path_buf()).unwrap();
    let path = store.default_save_path("kids");
    store.save_session(&path, &s).unwrap();

    let loaded = store.load_session(&path).unwrap();
    assert_eq!(loaded.mode, Mode::LevelUpPending);
    assert_eq!(loaded.progress, s.progress);
    assert_eq!(loaded.card, s.card);

    let next = tutor
        .handle(&loaded, Action::ChooseLevel(LevelChoice::Advance))
        .unwrap()
        .session;
    assert_eq!(next.mode, Mode::Normal);
    assert_eq!(next.progress.level, 2);
    assert_eq!(next.progress.stamps, 0);
    assert_eq!(next.card.map(|c| c.ai_en).as_deref(), Some("Question 5?"));

    let sent = model.sent.borrow();
    let (context, _) = sent.last().unwrap();
    assert_eq!(context.history.len(), 11);
    assert_eq!(context.history, expected_history(&s));
}
