//! Sentence splitting for press-release and transcript prose.
//!
//! A sentence ends at `.`, `!` or `?` followed by whitespace and an
//! upper-case letter, or at a line break. A period after a known
//! abbreviation ("Dr.", "Inc.") or a single-letter initial does not end one.

/// A sentence and its byte offset in the source text.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Sentence<'a> {
    pub start: usize,
    pub text: &'a str,
}

const ABBREVIATIONS: &[&str] = &[
    "dr", "mr", "mrs", "ms", "prof", "inc", "corp", "co", "ltd", "llc", "plc", "jr", "sr", "st",
    "vs", "no", "approx", "jan", "feb", "mar", "apr", "jun", "jul", "aug", "sep", "sept", "oct",
    "nov", "dec", "u.s", "e.g", "i.e", "etc",
];

pub fn split_sentences(text: &str) -> Vec<Sentence<'_>> {
    let mut out = Vec::new();
    let mut start = 0;
    for (i, c) in text.char_indices() {
        match c {
            '\n' => {
                push(&mut out, text, start, i);
                start = i + 1;
            }
            '.' | '!' | '?' => {
                let after = i + c.len_utf8();
                if ends_sentence(text, start, i, after) {
                    push(&mut out, text, start, after);
                    start = after;
                }
            }
            _ => {}
        }
    }
    push(&mut out, text, start, text.len());
    out
}

fn ends_sentence(text: &str, start: usize, mark: usize, after: usize) -> bool {
    let rest = &text[after..];
    if !rest.starts_with(char::is_whitespace) {
        return false;
    }
    let next = rest.trim_start_matches([' ', '\t', '\r']).chars().next();
    let Some(next) = next else { return true };
    if next != '\n' && !next.is_uppercase() {
        return false;
    }
    if &text[mark..after] != "." {
        return true;
    }
    let word = text[start..mark]
        .rsplit(char::is_whitespace)
        .next()
        .unwrap_or("")
        .trim_start_matches(['(', '"', '\'']);
    let is_initial = word.chars().count() == 1 && word.chars().all(char::is_uppercase);
    !is_initial && !ABBREVIATIONS.contains(&word.to_lowercase().as_str())
}

fn push<'a>(out: &mut Vec<Sentence<'a>>, text: &'a str, start: usize, end: usize) {
    if start >= end {
        return;
    }
    let raw = &text[start..end];
    let trimmed = raw.trim_start();
    let offset = start + (raw.len() - trimmed.len());
    let trimmed = trimmed.trim_end();
    if !trimmed.is_empty() {
        out.push(Sentence {
            start: offset,
            text: trimmed,
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn texts(input: &str) -> Vec<&str> {
        split_sentences(input).into_iter().map(|s| s.text).collect()
    }

    #[test]
    fn splits_on_terminal_punctuation() {
        assert_eq!(
            texts("We filed. Data is due in Q2 2025! Is it? Yes."),
            ["We filed.", "Data is due in Q2 2025!", "Is it?", "Yes."]
        );
    }

    #[test]
    fn abbreviations_and_initials_do_not_split() {
        assert_eq!(
            texts("Dr. Jane Doe of Acme Inc. Said nothing. John Q. Public agreed."),
            ["Dr. Jane Doe of Acme Inc. Said nothing.", "John Q. Public agreed."]
        );
    }

    #[test]
    fn lowercase_continuation_does_not_split() {
        assert_eq!(texts("Revenue rose 3.5 percent. ok then"), ["Revenue rose 3.5 percent. ok then"]);
    }

    #[test]
    fn line_breaks_end_sentences() {
        assert_eq!(texts("Headline\n\nBody text here"), ["Headline", "Body text here"]);
    }

    #[test]
    fn offsets_point_into_source() {
        let input = "First one.   Second one.";
        for s in split_sentences(input) {
            assert_eq!(&input[s.start..s.start + s.text.len()], s.text);
        }
    }
}
