use std::fmt;
use std::hash::{DefaultHasher, Hash, Hasher};

/// A captured recording, as delivered by the recorder.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct AudioClip {
    pub bytes: Vec<u8>,
    pub mime: String,
}

impl AudioClip {
    pub fn new(bytes: Vec<u8>, mime: impl Into<String>) -> Self {
        Self {
            bytes,
            mime: mime.into(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }

    pub fn fingerprint(&self) -> Fingerprint {
        Fingerprint::of(&self.bytes)
    }
}

/// Content-derived identity of a clip: byte length plus a 64-bit hash.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct Fingerprint {
    len: usize,
    hash: u64,
}

impl Fingerprint {
    pub fn of(bytes: &[u8]) -> Self {
        let mut hasher = DefaultHasher::new();
        bytes.hash(&mut hasher);
        Self {
            len: bytes.len(),
            hash: hasher.finish(),
        }
    }
}

impl fmt::Display for Fingerprint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:016x}/{}", self.hash, self.len)
    }
}

/// Remembers the last clip that was submitted for transcription so a
/// re-delivered clip is not submitted twice.
///
/// Every commit bumps `recorder_generation`; the recorder names its next
/// capture after it, so a fresh recording never collides with a stale one.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct AudioGate {
    last: Option<Fingerprint>,
    recorder_generation: u64,
}

impl AudioGate {
    pub fn is_new(&self, fingerprint: &Fingerprint) -> bool {
        self.last.as_ref() != Some(fingerprint)
    }

    pub fn commit(&mut self, fingerprint: Fingerprint) {
        self.last = Some(fingerprint);
        self.recorder_generation += 1;
    }

    pub fn recorder_generation(&self) -> u64 {
        self.recorder_generation
    }
}
