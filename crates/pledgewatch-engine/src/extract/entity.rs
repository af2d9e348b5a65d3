//! Named-person and company attribution.
//!
//! People are found through two shapes, `Name Surname, [the company's] Role`
//! and `Role Name Surname`. Roles are normalised to their long form
//! ("CEO" → "Chief Executive Officer").

use once_cell::sync::Lazy;
use pledgewatch_store::name_key;
use regex::Regex;

const NAME: &str = r"[A-Z][a-z]+(?:\s+[A-Z]\.)?\s+[A-Z][A-Za-z'\-]+";

const ROLE: &str = r"(?i:chief\s+[a-z]+(?:\s+[a-z]+)?\s+officer|(?:senior\s+|executive\s+)?vice\s+president(?:\s+of\s+[a-z]+(?:\s+[a-z]+)?)?|head\s+of\s+[a-z]+(?:\s+[a-z]+)?|president|chairman|chairwoman|chair|ceo|cfo|coo|cmo|cso|cto)";

static NAME_THEN_ROLE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(&format!(
        r"\b(?P<name>{NAME}),\s+(?:(?:the\s+company's|[A-Z][A-Za-z&]*(?:\s+[A-Z][A-Za-z&]*)*'s)\s+)?(?P<role>{ROLE})\b"
    ))
    .expect("entity pattern compiles")
});

static ROLE_THEN_NAME: Lazy<Regex> = Lazy::new(|| {
    Regex::new(&format!(r"\b(?P<role>{ROLE})\s+(?P<name>{NAME})\b"))
        .expect("entity pattern compiles")
});

static COMPANY: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"\b(?P<name>[A-Z][A-Za-z0-9&\-]*(?:\s+[A-Z][A-Za-z0-9&\-]*){0,3})\s+(?P<suffix>Inc\.?|Corp\.?|Corporation|Therapeutics|Pharmaceuticals|Biosciences|Bio|Pharma|Ltd\.?)(?:\W|$)",
    )
    .expect("company pattern compiles")
});

/// Words that make a capitalised pair a company or a sentence opener rather than a person.
const NOT_A_PERSON: &[&str] = &[
    "inc", "corp", "corporation", "therapeutics", "pharmaceuticals", "biosciences", "bio",
    "pharma", "ltd", "holdings", "company", "group", "labs", "medical", "health", "the", "our",
    "we", "today", "said",
];

/// Capitalised words that open a sentence rather than a company name.
const LEADING_NOISE: &[&str] = &[
    "the", "today", "yesterday", "on", "in", "at", "and", "but", "however", "meanwhile", "shares",
    "said", "when", "while", "as", "for", "after", "before", "also", "monday", "tuesday",
    "wednesday", "thursday", "friday",
];

const ROLE_ABBREVIATIONS: &[(&str, &str)] = &[
    ("ceo", "Chief Executive Officer"),
    ("cfo", "Chief Financial Officer"),
    ("coo", "Chief Operating Officer"),
    ("cmo", "Chief Medical Officer"),
    ("cso", "Chief Scientific Officer"),
    ("cto", "Chief Technology Officer"),
    ("chairman", "Chair"),
    ("chairwoman", "Chair"),
];

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EntityMention {
    pub name: String,
    pub role: String,
    pub start: usize,
    pub end: usize,
}

/// Who the rule match at `[start, end)` is attributed to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Attribution {
    One(EntityMention),
    None,
    /// Several distinct people within the window.
    Ambiguous(Vec<String>),
}

pub fn normalize_role(raw: &str) -> String {
    let collapsed = raw.split_whitespace().collect::<Vec<_>>().join(" ");
    let lower = collapsed.to_lowercase();
    if let Some((_, long)) = ROLE_ABBREVIATIONS.iter().find(|(abbr, _)| *abbr == lower) {
        return long.to_string();
    }
    lower
        .split(' ')
        .map(|w| match w {
            "of" | "and" => w.to_string(),
            _ => {
                let mut chars = w.chars();
                chars
                    .next()
                    .map(|first| first.to_uppercase().chain(chars).collect())
                    .unwrap_or_default()
            }
        })
        .collect::<Vec<_>>()
        .join(" ")
}

fn plausible_person(name: &str) -> bool {
    name.split_whitespace()
        .all(|w| !NOT_A_PERSON.contains(&w.trim_end_matches('.').to_lowercase().as_str()))
}

/// Every person mention in `sentence`, in order of appearance, one per span.
pub fn find_entities(sentence: &str) -> Vec<EntityMention> {
    let mut found: Vec<EntityMention> = Vec::new();
    for re in [&*NAME_THEN_ROLE, &*ROLE_THEN_NAME] {
        for caps in re.captures_iter(sentence) {
            let (Some(name), Some(role)) = (caps.name("name"), caps.name("role")) else {
                continue;
            };
            if !plausible_person(name.as_str()) {
                continue;
            }
            if found
                .iter()
                .any(|f| name.start() < f.end && f.start < name.end())
            {
                continue;
            }
            found.push(EntityMention {
                name: name.as_str().split_whitespace().collect::<Vec<_>>().join(" "),
                role: normalize_role(role.as_str()),
                start: name.start(),
                end: name.end(),
            });
        }
    }
    found.sort_by_key(|m| m.start);
    found
}

/// Byte distance between two spans; zero when they overlap.
fn gap(a: (usize, usize), b: (usize, usize)) -> usize {
    if a.1 <= b.0 {
        b.0 - a.1
    } else if b.1 <= a.0 {
        a.0 - b.1
    } else {
        0
    }
}

/// Attribute the span `[start, end)` to the people mentioned within `window` bytes of it.
pub fn attribute(mentions: &[EntityMention], start: usize, end: usize, window: usize) -> Attribution {
    let in_scope: Vec<&EntityMention> = mentions
        .iter()
        .filter(|m| gap((m.start, m.end), (start, end)) <= window)
        .collect();
    let mut names: Vec<String> = in_scope.iter().map(|m| name_key(&m.name)).collect();
    names.sort();
    names.dedup();
    match names.len() {
        0 => Attribution::None,
        1 => Attribution::One(in_scope[0].clone()),
        _ => Attribution::Ambiguous(
            in_scope
                .iter()
                .map(|m| m.name.clone())
                .collect::<Vec<_>>(),
        ),
    }
}

/// First company-shaped mention in `text`, e.g. "Acme Therapeutics" or "Beta Corp".
pub fn detect_company(text: &str) -> Option<String> {
    for caps in COMPANY.captures_iter(text) {
        let (Some(name), Some(suffix)) = (caps.name("name"), caps.name("suffix")) else {
            continue;
        };
        let words: Vec<&str> = name
            .as_str()
            .split_whitespace()
            .skip_while(|w| LEADING_NOISE.contains(&w.to_lowercase().as_str()))
            .collect();
        if words.is_empty() {
            continue;
        }
        let suffix = suffix.as_str().trim_end_matches('.');
        return Some(format!("{} {suffix}", words.join(" ")));
    }
    None
}
