use icu_normalizer::ComposingNormalizerBorrowed;

use crate::error::TutorError;
use crate::service::LanguageModel;
use crate::tutor::prompt;

/// Fold a sentence for word-for-word comparison: NFKC (full-width to ASCII),
/// lowercase, curly apostrophes to straight ones, punctuation dropped.
pub fn normalize(text: &str) -> String {
    let nfkc = ComposingNormalizerBorrowed::new_nfkc();
    let folded = nfkc.normalize(text).to_lowercase().replace('\u{2019}', "'");
    folded
        .split(|c: char| !(c.is_alphanumeric() || c == '\''))
        .map(|w| w.trim_matches('\''))
        .filter(|w| !w.is_empty())
        .collect::<Vec<_>>()
        .join(" ")
}

pub fn matches(expected: &str, heard: &str) -> bool {
    let expected = normalize(expected);
    !expected.is_empty() && expected == normalize(heard)
}

/// Result of checking a recitation against the model sentence.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Verdict {
    pub heard: String,
    pub exact: bool,
    pub comment: String,
}

/// Exact matches are accepted locally; anything else goes to the strict judge.
pub fn check(model: &dyn LanguageModel, expected: &str, heard: &str) -> Result<Verdict, TutorError> {
    if matches(expected, heard) {
        return Ok(Verdict {
            heard: heard.to_string(),
            exact: true,
            comment: String::new(),
        });
    }
    let comment = model.generate(&prompt::judge(expected, heard))?;
    Ok(Verdict {
        heard: heard.to_string(),
        exact: false,
        comment: comment.trim().to_string(),
    })
}
