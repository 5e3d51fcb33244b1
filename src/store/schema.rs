use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::tutor::configuration::Configuration;
use crate::tutor::markers::KidsCard;
use crate::tutor::session::{Mode, Progress, Session};
use crate::tutor::transcript::Transcript;

pub const SAVE_VERSION: u32 = 1;

/// A lesson written to disk. Playback position and the audio gate are
/// per-run state and are not saved.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct SaveFile {
    pub kaiwa_save_version: u32,
    pub saved_at: DateTime<Utc>,
    pub config: Configuration,
    #[serde(default)]
    pub progress: Progress,
    #[serde(default)]
    pub mode: Mode,
    #[serde(default, alias = "messages")]
    pub turns: Transcript,
    #[serde(default)]
    pub card: Option<KidsCard>,
}

impl SaveFile {
    pub fn from_session(session: &Session) -> Self {
        Self {
            kaiwa_save_version: SAVE_VERSION,
            saved_at: Utc::now(),
            config: session.config.clone(),
            progress: session.progress,
            mode: session.mode.clone(),
            turns: session.transcript.clone(),
            card: session.card.clone(),
        }
    }

    pub fn into_session(self) -> Session {
        let mut session = Session::new(self.config);
        session.progress = self.progress;
        session.mode = self.mode;
        session.transcript = self.turns;
        session.card = self.card;
        // a restored lesson should not replay the last line on open
        session.last_played_index = session.transcript.last_assistant().map(|(i, _)| i);
        session
    }
}
