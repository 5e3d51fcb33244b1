use std::path::PathBuf;

use anyhow::Result;
use rust_i18n::t;

use crate::audio::AudioDevice;
use crate::config::{Config, LOCALES, Secrets};
use crate::document;
use crate::error::TutorError;
use crate::service::gemini::{GeminiClient, GeminiSettings};
use crate::service::speech::TranslateTts;
use crate::service::{LanguageModel, SpeechToText, TextToSpeech};
use crate::store::json_store::JsonStore;
use crate::tutor::audio_gate::AudioClip;
use crate::tutor::configuration::{Configuration, KIDS_SITUATIONS, LEVELS, MODELS, Variant};
use crate::tutor::session::{Action, LevelChoice, Mode, Notice, Session, Tutor};
use crate::tutor::shadowing::{JudgeOutcome, ShadowingDrill, script_from_transcript};
use crate::ui::components::kids_card::KidsDisplay;
use crate::ui::components::menu::{Menu, MenuEntry};
use crate::ui::line_input::LineInput;
use crate::ui::theme::Theme;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum AppScreen {
    Login,
    Menu,
    RoleplaySetup,
    Conversation,
    KidsSetup,
    Kids,
    Shadowing,
    Settings,
}

/// Blocking work queued by a key press. The event loop draws the busy
/// overlay first and then calls `App::run_pending`.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Job {
    Lesson(Action),
    Record,
    Speak(String),
    ShadowGenerate,
    ShadowSplit,
    ShadowJudge(usize),
}

impl Job {
    pub fn busy_label(&self) -> String {
        match self {
            Job::Lesson(_) | Job::ShadowGenerate | Job::ShadowSplit => t!("busy.thinking"),
            Job::Record => t!("busy.recording"),
            Job::Speak(_) => t!("busy.speaking"),
            Job::ShadowJudge(_) => t!("busy.judging"),
        }
        .to_string()
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum StatusKind {
    Info,
    Error,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PathPurpose {
    Save,
    Load,
}

pub struct PathPrompt {
    pub purpose: PathPurpose,
    pub input: LineInput,
}

pub const ROLEPLAY_FIELDS: usize = 4;

pub struct RoleplaySetup {
    pub persona: LineInput,
    pub scenario: LineInput,
    pub level: usize,
    pub reference: LineInput,
    pub focus: usize,
    pub error: Option<String>,
}

impl Default for RoleplaySetup {
    fn default() -> Self {
        Self {
            persona: LineInput::new("a friendly hotel receptionist"),
            scenario: LineInput::new("checking in at a hotel in London"),
            level: 2,
            reference: LineInput::path(""),
            focus: 0,
            error: None,
        }
    }
}

pub const KIDS_FIELDS: usize = 4;

pub struct KidsSetup {
    pub name: LineInput,
    /// Index into `KIDS_SITUATIONS`; one past the end means the custom text.
    pub situation: usize,
    pub custom: LineInput,
    pub display: KidsDisplay,
    pub focus: usize,
}

impl Default for KidsSetup {
    fn default() -> Self {
        Self {
            name: LineInput::new("おともだち"),
            situation: 0,
            custom: LineInput::new(""),
            display: KidsDisplay::default(),
            focus: 0,
        }
    }
}

impl KidsSetup {
    pub fn is_custom(&self) -> bool {
        self.situation >= KIDS_SITUATIONS.len()
    }

    fn scenario(&self) -> String {
        KIDS_SITUATIONS
            .get(self.situation)
            .map(|s| s.persona.to_string())
            .unwrap_or_else(|| self.custom.value().trim().to_string())
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ShadowField {
    Situation,
    Script,
}

pub struct ShadowingPage {
    pub drill: ShadowingDrill,
    pub level: usize,
    pub situation: String,
    pub selected: usize,
    pub editing: Option<ShadowField>,
    pub input: LineInput,
}

impl Default for ShadowingPage {
    fn default() -> Self {
        Self {
            drill: ShadowingDrill::default(),
            level: 2,
            situation: "immigration at the airport".to_string(),
            selected: 0,
            editing: None,
            input: LineInput::new(""),
        }
    }
}

pub const SETTINGS_ROWS: usize = 5;

pub struct App {
    pub screen: AppScreen,
    pub menu: Menu,
    pub theme: &'static Theme,
    pub config: Config,
    secrets: Secrets,
    pub login: LineInput,
    pub roleplay_setup: RoleplaySetup,
    pub kids_setup: KidsSetup,
    pub roleplay: Option<Session>,
    pub kids: Option<Session>,
    pub kids_display: KidsDisplay,
    pub show_hint: bool,
    pub shadowing: ShadowingPage,
    pub composer: LineInput,
    pub scroll_back: u16,
    pub clip: Option<AudioClip>,
    pub path_prompt: Option<PathPrompt>,
    pub status: Option<(StatusKind, String)>,
    pub pending: Option<Job>,
    pub settings_selected: usize,
    pub should_quit: bool,
    model: Box<dyn LanguageModel>,
    speech: Box<dyn SpeechToText>,
    tts: Box<dyn TextToSpeech>,
    store: JsonStore,
    audio: AudioDevice,
}

impl App {
    pub fn new(config: Config, secrets: Secrets) -> Result<Self> {
        let gemini = GeminiClient::new(GeminiSettings {
            api_key: secrets.require_api_key()?.to_string(),
            base_url: config.api_base_url.clone(),
            script_model: config.script_model.clone(),
            transcription_model: config.transcription_model.clone(),
            timeout_secs: config.request_timeout_secs,
        })?;
        let tts = TranslateTts::new(&config.tts_base_url)?;
        let store = JsonStore::new()?;
        let audio = AudioDevice::new(
            config.record_command.clone(),
            config.player_command.clone(),
            &config.recording_mime,
            store.base_dir(),
        );
        Ok(Self::with_services(
            config,
            secrets,
            Box::new(gemini.clone()),
            Box::new(gemini),
            Box::new(tts),
            store,
            audio,
        ))
    }

    pub fn with_services(
        config: Config,
        secrets: Secrets,
        model: Box<dyn LanguageModel>,
        speech: Box<dyn SpeechToText>,
        tts: Box<dyn TextToSpeech>,
        store: JsonStore,
        audio: AudioDevice,
    ) -> Self {
        let theme: &'static Theme = Box::leak(Box::new(
            Theme::load(&config.theme).unwrap_or_default(),
        ));
        let screen = if secrets.password().is_some() {
            AppScreen::Login
        } else {
            AppScreen::Menu
        };
        Self {
            screen,
            menu: Menu::new(),
            theme,
            config,
            secrets,
            login: LineInput::secret(),
            roleplay_setup: RoleplaySetup::default(),
            kids_setup: KidsSetup::default(),
            roleplay: None,
            kids: None,
            kids_display: KidsDisplay::default(),
            show_hint: false,
            shadowing: ShadowingPage::default(),
            composer: LineInput::new(""),
            scroll_back: 0,
            clip: None,
            path_prompt: None,
            status: None,
            pending: None,
            settings_selected: 0,
            should_quit: false,
            model,
            speech,
            tts,
            store,
            audio,
        }
    }

    pub fn set_theme(&mut self, name: &str) -> bool {
        match Theme::load(name) {
            Some(theme) => {
                self.config.theme = name.to_string();
                self.theme = Box::leak(Box::new(theme));
                true
            }
            None => false,
        }
    }

    pub fn info(&mut self, text: impl Into<String>) {
        self.status = Some((StatusKind::Info, text.into()));
    }

    fn fail(&mut self, err: &TutorError) {
        self.status = Some((StatusKind::Error, format!("{}: {err}", err.headline())));
    }

    fn fail_plain(&mut self, text: String) {
        log::warn!("{text}");
        self.status = Some((StatusKind::Error, text));
    }

    // --- navigation ---

    pub fn try_login(&mut self) {
        let entered = self.login.take();
        if self.secrets.password().is_none_or(|pw| pw == entered) {
            self.status = None;
            self.screen = AppScreen::Menu;
        } else {
            self.fail_plain(t!("login.wrong").to_string());
        }
    }

    pub fn go_to_menu(&mut self) {
        self.screen = AppScreen::Menu;
        self.path_prompt = None;
        self.composer.take();
        self.clip = None;
    }

    pub fn open(&mut self, entry: MenuEntry) {
        self.status = None;
        match entry {
            MenuEntry::Roleplay => {
                self.screen = if self.roleplay.is_some() {
                    AppScreen::Conversation
                } else {
                    AppScreen::RoleplaySetup
                };
            }
            MenuEntry::Kids => {
                self.screen = if self.kids.is_some() {
                    AppScreen::Kids
                } else {
                    AppScreen::KidsSetup
                };
            }
            MenuEntry::Shadowing => self.screen = AppScreen::Shadowing,
            MenuEntry::Settings => {
                self.settings_selected = 0;
                self.screen = AppScreen::Settings;
            }
            MenuEntry::Quit => self.should_quit = true,
        }
    }

    /// Leave the current lesson for its setup screen, dropping the session.
    pub fn new_lesson(&mut self) {
        match self.active_variant() {
            Some(Variant::Roleplay) => {
                self.roleplay = None;
                self.screen = AppScreen::RoleplaySetup;
            }
            Some(Variant::Kids) => {
                self.kids = None;
                self.screen = AppScreen::KidsSetup;
            }
            None => {}
        }
        self.clip = None;
        self.scroll_back = 0;
    }

    pub fn active_variant(&self) -> Option<Variant> {
        match self.screen {
            AppScreen::Conversation => Some(Variant::Roleplay),
            AppScreen::Kids => Some(Variant::Kids),
            _ => None,
        }
    }

    pub fn lesson(&self) -> Option<&Session> {
        match self.active_variant()? {
            Variant::Roleplay => self.roleplay.as_ref(),
            Variant::Kids => self.kids.as_ref(),
        }
    }

    // --- setup ---

    pub fn start_roleplay(&mut self) {
        let setup = &mut self.roleplay_setup;
        if setup.persona.is_blank() || setup.scenario.is_blank() {
            setup.error = Some(t!("setup.missing_fields").to_string());
            return;
        }
        let mut config = Configuration::roleplay(
            setup.persona.value(),
            LEVELS[setup.level.min(LEVELS.len() - 1)],
            setup.scenario.value(),
        )
        .with_model(&self.config.model)
        .with_policy(self.config.give_up_policy);

        let path = setup.reference.value().trim().to_string();
        if !path.is_empty() {
            match document::extract_file(&PathBuf::from(&path)) {
                Ok(text) => config = config.with_reference(&text),
                Err(e) => {
                    setup.error = Some(format!("{}: {e}", e.headline()));
                    return;
                }
            }
        }
        setup.error = None;
        self.roleplay = Some(Session::new(config));
        self.screen = AppScreen::Conversation;
        self.scroll_back = 0;
        self.pending = Some(Job::Lesson(Action::Start));
    }

    pub fn start_kids(&mut self) {
        let setup = &self.kids_setup;
        let scenario = setup.scenario();
        if scenario.is_empty() {
            self.fail_plain(t!("setup.missing_fields").to_string());
            return;
        }
        let config = Configuration::kids(setup.name.value(), &scenario).with_model(&self.config.model);
        self.kids_display = setup.display;
        self.kids = Some(Session::new(config));
        self.show_hint = false;
        self.screen = AppScreen::Kids;
        self.pending = Some(Job::Lesson(Action::Start));
    }

    // --- lesson input ---

    /// Queue a lesson action unless another job is waiting.
    pub fn queue(&mut self, action: Action) {
        if self.lesson().is_some() && self.pending.is_none() {
            self.pending = Some(Job::Lesson(action));
        }
    }

    pub fn send_composer(&mut self) {
        if self.composer.is_blank() {
            self.info(t!("status.type_first"));
            return;
        }
        let text = self.composer.take();
        self.scroll_back = 0;
        self.queue(Action::Answer(text));
    }

    pub fn look_up_composer(&mut self) {
        if self.composer.is_blank() {
            self.info(t!("status.look_up_hint"));
            return;
        }
        let word = self.composer.value().trim().to_string();
        self.queue(Action::LookUp(word));
    }

    pub fn submit_recording(&mut self) {
        match self.clip.clone() {
            Some(clip) => self.queue(Action::AnswerAudio(clip)),
            None => self.info(t!("status.record_first")),
        }
    }

    pub fn choose_level(&mut self, choice: LevelChoice) {
        if self.lesson().is_some_and(|s| s.mode == Mode::LevelUpPending) {
            self.queue(Action::ChooseLevel(choice));
        }
    }

    pub fn replay(&mut self) {
        match self.lesson().and_then(|s| s.current_question()) {
            Some(text) => self.pending = Some(Job::Speak(text)),
            None => self.info(t!("status.nothing_to_play")),
        }
    }

    pub fn toggle_hint(&mut self) {
        self.show_hint = !self.show_hint;
        if !self.show_hint {
            return;
        }
        let hint = self
            .kids
            .as_ref()
            .and_then(|s| s.card.as_ref())
            .map(|c| c.hint_en.clone())
            .filter(|h| !h.is_empty());
        if let Some(hint) = hint {
            self.pending = Some(Job::Speak(hint));
        }
    }

    pub fn export_log(&mut self) {
        let Some(session) = self.lesson() else { return };
        match self.store.export_log(session) {
            Ok(path) => self.info(t!("status.exported", path = path.display())),
            Err(e) => self.fail_plain(format!("{}: {e:#}", t!("error.storage"))),
        }
    }

    pub fn open_path_prompt(&mut self, purpose: PathPurpose) {
        let name = match self.active_variant() {
            Some(Variant::Kids) => "kids",
            _ => "roleplay",
        };
        let default = self.store.default_save_path(name);
        self.path_prompt = Some(PathPrompt {
            purpose,
            input: LineInput::path(&default.display().to_string()),
        });
    }

    pub fn confirm_path_prompt(&mut self) {
        let Some(prompt) = self.path_prompt.take() else { return };
        let path = PathBuf::from(prompt.input.value().trim());
        match prompt.purpose {
            PathPurpose::Save => {
                let Some(session) = self.lesson() else { return };
                match self.store.save_session(&path, session) {
                    Ok(()) => self.info(t!("status.saved", path = path.display())),
                    Err(e) => self.fail_plain(format!("{}: {e:#}", t!("error.storage"))),
                }
            }
            PathPurpose::Load => match self.store.load_session(&path) {
                Ok(session) => {
                    log::info!("loaded {} turns from {}", session.transcript.len(), path.display());
                    match session.variant() {
                        Variant::Roleplay => {
                            self.roleplay = Some(session);
                            self.screen = AppScreen::Conversation;
                        }
                        Variant::Kids => {
                            self.kids = Some(session);
                            self.screen = AppScreen::Kids;
                        }
                    }
                    self.scroll_back = 0;
                    self.info(t!("status.loaded", path = path.display()));
                }
                Err(e) => self.fail_plain(format!("{}: {e:#}", t!("error.storage"))),
            },
        }
    }

    // --- shadowing ---

    pub fn shadow_from_transcript(&mut self) {
        let script = self
            .roleplay
            .as_ref()
            .map(|s| script_from_transcript(&s.transcript))
            .unwrap_or_default();
        if script.is_empty() {
            self.info(t!("shadowing.no_questions"));
            return;
        }
        self.shadowing.drill.set_script(&script);
        self.info(t!("shadowing.script_ready"));
    }

    pub fn shadow_begin_edit(&mut self, field: ShadowField) {
        let current = match field {
            ShadowField::Situation => self.shadowing.situation.clone(),
            ShadowField::Script => self.shadowing.drill.script.clone(),
        };
        self.shadowing.input.set(&current);
        self.shadowing.editing = Some(field);
    }

    pub fn shadow_commit_edit(&mut self) {
        let text = self.shadowing.input.take();
        match self.shadowing.editing.take() {
            Some(ShadowField::Situation) => self.shadowing.situation = text.trim().to_string(),
            Some(ShadowField::Script) => self.shadowing.drill.set_script(&text),
            None => {}
        }
    }

    pub fn shadow_select(&mut self, delta: isize) {
        let len = self.shadowing.drill.chunks.len();
        if len == 0 {
            return;
        }
        let next = self.shadowing.selected as isize + delta;
        self.shadowing.selected = next.clamp(0, len as isize - 1) as usize;
        self.clip = None;
    }

    pub fn shadow_play(&mut self) {
        let chunk = self.shadowing.drill.chunks.get(self.shadowing.selected);
        match chunk.map(|c| c.en.clone()) {
            Some(text) => self.pending = Some(Job::Speak(text)),
            None => self.info(t!("status.nothing_to_play")),
        }
    }

    pub fn shadow_judge(&mut self) {
        if self.clip.is_none() {
            self.info(t!("status.record_first"));
            return;
        }
        if self.shadowing.drill.chunks.is_empty() {
            return;
        }
        self.pending = Some(Job::ShadowJudge(self.shadowing.selected));
    }

    // --- settings ---

    pub fn settings_cycle(&mut self, forward: bool) {
        fn step<T: PartialEq + Clone>(items: &[T], current: &T, forward: bool) -> Option<T> {
            if items.is_empty() {
                return None;
            }
            let idx = items.iter().position(|i| i == current);
            let next = match (idx, forward) {
                (None, _) => 0,
                (Some(i), true) => (i + 1) % items.len(),
                (Some(i), false) => (i + items.len() - 1) % items.len(),
            };
            items.get(next).cloned()
        }

        match self.settings_selected {
            0 => {
                let themes = Theme::available_themes();
                if let Some(name) = step(&themes, &self.config.theme, forward) {
                    self.set_theme(&name);
                }
            }
            1 => {
                let next = step(LOCALES, &self.config.locale.as_str(), forward).map(str::to_string);
                if let Some(locale) = next {
                    rust_i18n::set_locale(&locale);
                    self.config.locale = locale;
                }
            }
            2 => {
                let next = step(MODELS, &self.config.model.as_str(), forward).map(str::to_string);
                if let Some(model) = next {
                    self.config.model = model;
                }
            }
            3 => self.config.give_up_policy = self.config.give_up_policy.toggled(),
            4 => self.config.autoplay = !self.config.autoplay,
            _ => {}
        }
    }

    pub fn leave_settings(&mut self) {
        if let Err(e) = self.config.save() {
            self.fail_plain(format!("{}: {e:#}", t!("error.storage")));
        }
        self.screen = AppScreen::Menu;
    }

    // --- blocking work ---

    pub fn run_pending(&mut self) {
        let Some(job) = self.pending.take() else { return };
        match job {
            Job::Lesson(action) => self.apply(action),
            Job::Record => self.record(),
            Job::Speak(text) => self.audio.speak(self.tts.as_ref(), &text, "replay"),
            Job::ShadowGenerate => {
                let level = LEVELS[self.shadowing.level.min(LEVELS.len() - 1)];
                let result = self.shadowing.drill.generate_script(
                    self.model.as_ref(),
                    level,
                    &self.shadowing.situation,
                );
                match result {
                    Ok(()) => self.info(t!("shadowing.script_ready")),
                    Err(e) => self.fail(&e),
                }
            }
            Job::ShadowSplit => match self.shadowing.drill.split(self.model.as_ref()) {
                Ok(n) => {
                    self.shadowing.selected = 0;
                    self.info(t!("shadowing.split_done", count = n));
                }
                Err(e) => self.fail(&e),
            },
            Job::ShadowJudge(index) => {
                let Some(clip) = self.clip.clone() else { return };
                let outcome = self.shadowing.drill.judge(
                    self.model.as_ref(),
                    self.speech.as_ref(),
                    index,
                    &clip,
                );
                match outcome {
                    Ok(JudgeOutcome::Duplicate) => self.info(t!("status.duplicate_audio")),
                    Ok(JudgeOutcome::NoInput) => self.info(t!("status.no_input")),
                    Ok(JudgeOutcome::Judged(v)) => {
                        self.clip = None;
                        if v.exact {
                            self.info(t!("status.recited_exact"));
                        } else {
                            self.info(t!("status.recited_close"));
                        }
                    }
                    Err(e) => self.fail(&e),
                }
            }
        }
    }

    fn record(&mut self) {
        let generation = match self.active_variant() {
            Some(_) => self.lesson().map(|s| s.gate.recorder_generation()),
            None if self.screen == AppScreen::Shadowing => {
                Some(self.shadowing.drill.recorder_generation())
            }
            None => None,
        };
        let Some(generation) = generation else { return };
        match self.audio.record(generation) {
            Ok(clip) if clip.is_empty() => {
                self.clip = None;
                self.info(t!("status.no_input"));
            }
            Ok(clip) => {
                self.info(t!("status.recorded", kb = clip.bytes.len() / 1024));
                self.clip = Some(clip);
            }
            Err(e) => self.fail_plain(format!("{}: {e:#}", t!("error.audio"))),
        }
    }

    fn apply(&mut self, action: Action) {
        let slot = match self.active_variant() {
            Some(Variant::Roleplay) => &mut self.roleplay,
            Some(Variant::Kids) => &mut self.kids,
            None => return,
        };
        let Some(current) = slot.as_ref() else { return };
        let submitted_audio = matches!(action, Action::AnswerAudio(_));
        let tutor = Tutor::new(self.model.as_ref(), self.speech.as_ref());
        let result = tutor.handle(current, action);
        match result {
            Ok(step) => {
                *slot = Some(step.session);
                if submitted_audio && !matches!(step.notice, Some(Notice::DuplicateAudio)) {
                    self.clip = None;
                }
                self.status = step
                    .notice
                    .map(|n| (StatusKind::Info, notice_text(&n)));
                self.autoplay();
            }
            Err(e) => self.fail(&e),
        }
    }

    /// Speak the newest assistant turn once, if autoplay is on.
    fn autoplay(&mut self) {
        if !self.config.autoplay {
            return;
        }
        let slot = match self.active_variant() {
            Some(Variant::Roleplay) => &mut self.roleplay,
            Some(Variant::Kids) => &mut self.kids,
            None => return,
        };
        let Some(session) = slot.as_mut() else { return };
        if let Some((index, text)) = session.pending_playback() {
            self.audio.speak(self.tts.as_ref(), &text, "reply");
            session.mark_played(index);
        }
    }
}

fn notice_text(notice: &Notice) -> String {
    match notice {
        Notice::DuplicateAudio => t!("status.duplicate_audio").to_string(),
        Notice::NoInput => t!("status.no_input").to_string(),
        Notice::Heard(text) => t!("status.heard", text = text).to_string(),
        Notice::Recited(v) if v.exact => t!("status.recited_exact").to_string(),
        Notice::Recited(_) => t!("status.recited_close").to_string(),
        Notice::StarEarned(n) => t!("status.star", count = n).to_string(),
        Notice::LevelUpReady => t!("kids.level_up").to_string(),
    }
}
