//! Confidence-language grading from the configured phrase lexicon.

use pledgewatch_core::ConfidenceLanguage;
use pledgewatch_core::config::ConfidenceLexicon;
use regex::Regex;

struct Phrase {
    pattern: Regex,
    len: usize,
    bucket: ConfidenceLanguage,
}

/// Compiled [`ConfidenceLexicon`].
pub struct ConfidenceClassifier {
    phrases: Vec<Phrase>,
    default_bucket: ConfidenceLanguage,
}

/// Case-insensitive, word-bounded, whitespace-tolerant pattern for a literal phrase.
pub(crate) fn phrase_regex(phrase: &str) -> Result<Regex, regex::Error> {
    let words: Vec<String> = phrase.split_whitespace().map(regex::escape).collect();
    Regex::new(&format!(r"(?i)\b{}\b", words.join(r"\s+")))
}

impl ConfidenceClassifier {
    pub fn new(lexicon: &ConfidenceLexicon) -> Result<Self, regex::Error> {
        let buckets = [
            (ConfidenceLanguage::Weak, &lexicon.weak),
            (ConfidenceLanguage::Moderate, &lexicon.moderate),
            (ConfidenceLanguage::Strong, &lexicon.strong),
        ];
        let mut phrases = Vec::new();
        for (bucket, list) in buckets {
            for phrase in list {
                if phrase.trim().is_empty() {
                    continue;
                }
                phrases.push(Phrase {
                    pattern: phrase_regex(phrase)?,
                    len: phrase.split_whitespace().collect::<Vec<_>>().join(" ").len(),
                    bucket,
                });
            }
        }
        Ok(Self {
            phrases,
            default_bucket: lexicon.default_bucket,
        })
    }

    /// The longest phrase found decides; equal lengths go to the weaker bucket.
    pub fn classify(&self, sentence: &str) -> ConfidenceLanguage {
        self.phrases
            .iter()
            .filter(|p| p.pattern.is_match(sentence))
            .max_by(|a, b| a.len.cmp(&b.len).then(b.bucket.cmp(&a.bucket)))
            .map_or(self.default_bucket, |p| p.bucket)
    }

    /// Byte spans of every lexicon phrase found in `sentence`.
    pub fn phrase_spans(&self, sentence: &str) -> Vec<(usize, usize)> {
        self.phrases
            .iter()
            .flat_map(|p| p.pattern.find_iter(sentence))
            .map(|m| (m.start(), m.end()))
            .collect()
    }
}
