//! Recording and playback through external commands (`arecord`, `mpv`, ...).
//! A `{path}` argument is replaced with the file being written or played.

use std::fs;
use std::path::{Path, PathBuf};
use std::process::{Child, Command, Stdio};

use anyhow::{Context, Result, bail};

use crate::service::TextToSpeech;
use crate::tutor::audio_gate::AudioClip;
use crate::tutor::markers::clean_for_speech;

pub struct AudioDevice {
    record_command: Vec<String>,
    player_command: Vec<String>,
    mime: String,
    recordings_dir: PathBuf,
    speech_dir: PathBuf,
    player: Option<Child>,
}

impl AudioDevice {
    pub fn new(
        record_command: Vec<String>,
        player_command: Vec<String>,
        mime: &str,
        base_dir: &Path,
    ) -> Self {
        Self {
            record_command,
            player_command,
            mime: mime.to_string(),
            recordings_dir: base_dir.join("recordings"),
            speech_dir: base_dir.join("audio"),
            player: None,
        }
    }

    pub fn clip_path(&self, generation: u64) -> PathBuf {
        self.recordings_dir.join(format!("clip-{generation}.wav"))
    }

    /// Run the recorder to completion and return what it captured.
    ///
    /// The file name comes from the gate generation, so a clip recorded after
    /// a submission never shares a path with the one before it.
    pub fn record(&self, generation: u64) -> Result<AudioClip> {
        fs::create_dir_all(&self.recordings_dir)?;
        let path = self.clip_path(generation);
        if path.exists() {
            fs::remove_file(&path)?;
        }
        let (program, args) = expand(&self.record_command, &path)?;
        log::debug!("recording with {program} into {}", path.display());
        let status = Command::new(&program)
            .args(&args)
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .status()
            .with_context(|| format!("could not run recorder '{program}'"))?;
        if !status.success() {
            bail!("recorder '{program}' exited with {status}");
        }
        let bytes = fs::read(&path).unwrap_or_default();
        Ok(AudioClip::new(bytes, self.mime.clone()))
    }

    /// Start the player in the background. A player still running from an
    /// earlier call is stopped first.
    pub fn play_file(&mut self, path: &Path) -> Result<()> {
        self.stop_player();
        let (program, args) = expand(&self.player_command, path)?;
        let child = Command::new(&program)
            .args(&args)
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .spawn()
            .with_context(|| format!("could not run player '{program}'"))?;
        self.player = Some(child);
        Ok(())
    }

    /// Kill the current player if it is still running and reap it.
    pub fn stop_player(&mut self) {
        let Some(mut child) = self.player.take() else {
            return;
        };
        if let Ok(None) = child.try_wait() {
            log::debug!("stopping player {}", child.id());
            if let Err(e) = child.kill() {
                log::warn!("could not stop player: {e}");
            }
        }
        if let Err(e) = child.wait() {
            log::warn!("could not reap player: {e}");
        }
    }

    /// Clean, synthesize and play `text`. Failures are logged, never returned:
    /// a lesson goes on without sound.
    pub fn speak(&mut self, tts: &dyn TextToSpeech, text: &str, name: &str) {
        let cleaned = clean_for_speech(text);
        if cleaned.is_empty() {
            return;
        }
        let result = tts
            .synthesize(&cleaned, "en")
            .map_err(anyhow::Error::from)
            .and_then(|bytes| {
                // the old player may still be reading the file about to be replaced
                self.stop_player();
                fs::create_dir_all(&self.speech_dir)?;
                let path = self.speech_dir.join(format!("{name}.mp3"));
                fs::write(&path, bytes)?;
                self.play_file(&path)
            });
        if let Err(e) = result {
            log::warn!("speech playback failed: {e:#}");
        }
    }
}

impl Drop for AudioDevice {
    fn drop(&mut self) {
        self.stop_player();
    }
}

fn expand(template: &[String], path: &Path) -> Result<(String, Vec<String>)> {
    let path = path.to_string_lossy();
    let mut parts = template.iter().map(|arg| arg.replace("{path}", &path));
    let Some(program) = parts.next() else {
        bail!("audio command is empty");
    };
    Ok((program, parts.collect()))
}
