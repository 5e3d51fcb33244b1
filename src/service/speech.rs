//! Speech synthesis through the Google Translate TTS endpoint.

use crate::service::{ServiceError, TextToSpeech};

/// The endpoint rejects queries longer than this many characters.
pub const MAX_CHUNK_CHARS: usize = 100;

pub struct TranslateTts {
    base_url: String,
    #[cfg(feature = "network")]
    http: reqwest::blocking::Client,
}

impl TranslateTts {
    #[cfg(feature = "network")]
    pub fn new(base_url: &str) -> Result<Self, ServiceError> {
        let http = reqwest::blocking::Client::builder()
            .timeout(std::time::Duration::from_secs(15))
            .build()
            .map_err(|e| ServiceError::Request(e.to_string()))?;
        Ok(Self {
            base_url: base_url.to_string(),
            http,
        })
    }

    #[cfg(not(feature = "network"))]
    pub fn new(base_url: &str) -> Result<Self, ServiceError> {
        Ok(Self {
            base_url: base_url.to_string(),
        })
    }

    fn chunk_url(&self, chunk: &str, language: &str, index: usize, total: usize) -> String {
        format!(
            "{}?ie=UTF-8&q={}&tl={}&total={total}&idx={index}&textlen={}&client=tw-ob",
            self.base_url,
            urlencoding::encode(chunk),
            urlencoding::encode(language),
            chunk.chars().count(),
        )
    }

    #[cfg(feature = "network")]
    fn fetch(&self, url: &str) -> Result<Vec<u8>, ServiceError> {
        let response = self
            .http
            .get(url)
            .header(reqwest::header::USER_AGENT, "Mozilla/5.0")
            .send()
            .map_err(|e| ServiceError::Request(e.to_string()))?;
        let status = response.status();
        if status.as_u16() == 429 {
            return Err(ServiceError::Quota("speech endpoint throttled".to_string()));
        }
        if !status.is_success() {
            return Err(ServiceError::Request(format!("HTTP {status}")));
        }
        let bytes = response
            .bytes()
            .map_err(|e| ServiceError::Response(e.to_string()))?;
        Ok(bytes.to_vec())
    }

    #[cfg(not(feature = "network"))]
    fn fetch(&self, _url: &str) -> Result<Vec<u8>, ServiceError> {
        Err(ServiceError::Offline)
    }
}

impl TextToSpeech for TranslateTts {
    /// MP3 frames can be concatenated, so each chunk's audio is appended.
    fn synthesize(&self, text: &str, language: &str) -> Result<Vec<u8>, ServiceError> {
        let chunks = split_for_speech(text, MAX_CHUNK_CHARS);
        let mut audio = Vec::new();
        for (i, chunk) in chunks.iter().enumerate() {
            let url = self.chunk_url(chunk, language, i, chunks.len());
            audio.extend(self.fetch(&url)?);
        }
        log::debug!("synthesized {} chunks, {} bytes", chunks.len(), audio.len());
        Ok(audio)
    }
}

/// Split at sentence ends, then at spaces, so no piece exceeds `max` chars.
/// A single word longer than `max` is cut hard.
pub fn split_for_speech(text: &str, max: usize) -> Vec<String> {
    let mut pieces = Vec::new();
    let mut current = String::new();

    for word in text.split_whitespace() {
        let mut word = word.to_string();
        while word.chars().count() > max {
            flush(&mut current, &mut pieces);
            let head: String = word.chars().take(max).collect();
            word = word.chars().skip(max).collect();
            pieces.push(head);
        }
        let needed = current.chars().count() + usize::from(!current.is_empty()) + word.chars().count();
        if needed > max {
            flush(&mut current, &mut pieces);
        }
        if !current.is_empty() {
            current.push(' ');
        }
        current.push_str(&word);
        if word.ends_with(['.', '!', '?']) {
            flush(&mut current, &mut pieces);
        }
    }
    flush(&mut current, &mut pieces);
    pieces
}

fn flush(current: &mut String, pieces: &mut Vec<String>) {
    if !current.is_empty() {
        pieces.push(std::mem::take(current));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sentences_become_separate_chunks() {
        assert_eq!(
            split_for_speech("Hello there. How are you?", 100),
            vec!["Hello there.", "How are you?"]
        );
    }

    #[test]
    fn long_sentence_splits_at_spaces() {
        let text = "one two three four five six";
        let pieces = split_for_speech(text, 9);
        assert!(pieces.iter().all(|p| p.chars().count() <= 9));
        assert_eq!(pieces.join(" "), text);
    }

    #[test]
    fn overlong_word_is_cut() {
        let pieces = split_for_speech("abcdefghij", 4);
        assert_eq!(pieces, vec!["abcd", "efgh", "ij"]);
    }

    #[test]
    fn blank_text_has_no_chunks() {
        assert!(split_for_speech("   ", 100).is_empty());
    }

    #[test]
    fn query_is_url_encoded() {
        let tts = TranslateTts::new("https://example.test/tts").unwrap();
        let url = tts.chunk_url("Don't stop & go", "en", 0, 1);
        assert!(url.contains("q=Don%27t%20stop%20%26%20go"));
        assert!(url.contains("tl=en"));
        assert!(url.ends_with("client=tw-ob"));
    }
}
