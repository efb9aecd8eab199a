//! Text normalization applied before scoring caption text against transcribed text.
//!
//! Captions and speech models disagree on casing, punctuation and how symbols
//! are written ("dell.com" vs "dell dot com"). Both sides go through the same
//! normalizer so that only wording differences count.

use regex::Regex;
use serde::{Deserialize, Serialize};

/// Filler words dropped from both streams by default.
pub const DEFAULT_FILLERS: &[&str] = &[
    "um", "uh", "ah", "er", "like", "you know", "i mean", "well", "so", "basically",
    "actually", "literally", "just", "kind of", "sort of", "you see",
];

/// Normalization switches.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct NormalizeOptions {
    /// Write symbols inside tokens as words (`dell.com` -> `dell dot com`).
    pub spoken_symbols: bool,
    /// Remove filler words.
    pub remove_fillers: bool,
    /// Filler words and phrases (lowercase).
    pub fillers: Vec<String>,
}

impl Default for NormalizeOptions {
    fn default() -> Self {
        Self {
            spoken_symbols: true,
            remove_fillers: true,
            fillers: DEFAULT_FILLERS.iter().map(|s| s.to_string()).collect(),
        }
    }
}

/// Compiled normalizer.
#[derive(Debug, Clone)]
pub struct TextNormalizer {
    options: NormalizeOptions,
    fillers: Vec<Vec<String>>,
    non_word: Regex,
    whitespace: Regex,
}

impl TextNormalizer {
    pub fn new(options: NormalizeOptions) -> Self {
        // Longest phrases first so "you know" wins over a single-word entry.
        let mut fillers: Vec<Vec<String>> = options
            .fillers
            .iter()
            .map(|f| f.split_whitespace().map(|w| w.to_lowercase()).collect::<Vec<_>>())
            .filter(|f| !f.is_empty())
            .collect();
        fillers.sort_by(|a, b| b.len().cmp(&a.len()));

        Self {
            options,
            fillers,
            non_word: Regex::new(r"[^\p{L}\p{N}\s]+").expect("Invalid regex"),
            whitespace: Regex::new(r"\s+").expect("Invalid regex"),
        }
    }

    pub fn options(&self) -> &NormalizeOptions {
        &self.options
    }

    /// Normalize text into a lowercase, punctuation-free, single-spaced string.
    pub fn normalize(&self, text: &str) -> String {
        self.tokens(text).join(" ")
    }

    /// Normalize text and split it into tokens.
    pub fn tokens(&self, text: &str) -> Vec<String> {
        let lowered = text.to_lowercase();
        let replaced = replace_typography(&lowered);
        let spoken = if self.options.spoken_symbols {
            speak_symbols(&replaced)
        } else {
            replaced
        };

        let stripped = self.non_word.replace_all(&spoken, " ");
        let collapsed = self.whitespace.replace_all(stripped.trim(), " ");

        let tokens: Vec<String> = collapsed
            .split(' ')
            .filter(|t| !t.is_empty())
            .map(str::to_string)
            .collect();

        if self.options.remove_fillers {
            self.drop_fillers(tokens)
        } else {
            tokens
        }
    }

    fn drop_fillers(&self, tokens: Vec<String>) -> Vec<String> {
        let mut kept = Vec::with_capacity(tokens.len());
        let mut i = 0;

        'outer: while i < tokens.len() {
            for filler in &self.fillers {
                let end = i + filler.len();
                if end <= tokens.len() && tokens[i..end] == filler[..] {
                    i = end;
                    continue 'outer;
                }
            }
            kept.push(tokens[i].clone());
            i += 1;
        }

        kept
    }
}

impl Default for TextNormalizer {
    fn default() -> Self {
        Self::new(NormalizeOptions::default())
    }
}

/// Map typographic characters to plain forms and drop quotes.
fn replace_typography(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => out.push_str(" and "),
            '…' => out.push_str("..."),
            '–' | '—' => out.push('-'),
            '\'' | '"' | '’' | '‘' | '“' | '”' | '″' | '′' | '„' | '‟' | '‚' | '‛' | '«' | '»'
            | '‹' | '›' | ',' => {}
            '\u{00a0}' => out.push(' '),
            _ => out.push(c),
        }
    }
    out
}

/// Speak symbols that sit inside tokens.
///
/// A dot is only spoken between two alphanumerics, so sentence punctuation is
/// left for the punctuation pass. Hyphens between alphanumerics split words.
fn speak_symbols(text: &str) -> String {
    let chars: Vec<char> = text.chars().collect();
    let mut out = String::with_capacity(text.len() + 16);

    for (i, &c) in chars.iter().enumerate() {
        let prev_alnum = i > 0 && chars[i - 1].is_alphanumeric();
        let next_alnum = chars.get(i + 1).is_some_and(|n| n.is_alphanumeric());
        let inner = prev_alnum && next_alnum;

        match c {
            '.' if inner => out.push_str(" dot "),
            '-' if inner => out.push(' '),
            '@' if prev_alnum || next_alnum => out.push_str(" at "),
            '/' if inner => out.push_str(" slash "),
            '_' if inner => out.push_str(" underscore "),
            '+' if prev_alnum || chars.get(i.wrapping_sub(1)) == Some(&'+') => out.push_str(" plus "),
            '#' if prev_alnum || next_alnum => out.push_str(" hash "),
            '=' => out.push_str(" equals "),
            '%' if prev_alnum => out.push_str(" percent "),
            _ => out.push(c),
        }
    }

    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_basic_normalization() {
        let n = TextNormalizer::default();
        assert_eq!(n.normalize("Hello, World!"), "hello world");
        assert_eq!(n.normalize("  Multiple   spaces\nand lines "), "multiple spaces and lines");
    }

    #[test]
    fn test_sentence_dot_is_dropped() {
        let n = TextNormalizer::default();
        assert_eq!(n.normalize("This is it."), "this is it");
    }

    #[test]
    fn test_spoken_symbols() {
        let n = TextNormalizer::default();
        assert_eq!(n.normalize("Visit dell.com today"), "visit dell dot com today");
        assert_eq!(n.normalize("mail me@example.org"), "mail me at example dot org");
        assert_eq!(n.normalize("R&D"), "r and d");
        assert_eq!(n.normalize("C++ and C#"), "c plus plus and c hash");
        assert_eq!(n.normalize("state-of-the-art"), "state of the art");
    }

    #[test]
    fn test_symbols_kept_silent_when_disabled() {
        let n = TextNormalizer::new(NormalizeOptions {
            spoken_symbols: false,
            remove_fillers: false,
            fillers: Vec::new(),
        });
        assert_eq!(n.normalize("dell.com"), "dell com");
        assert_eq!(n.normalize("well-known"), "well known");
    }

    #[test]
    fn test_filler_removal() {
        let n = TextNormalizer::default();
        assert_eq!(n.normalize("Um, you know, it works"), "it works");
        assert_eq!(n.normalize("I mean the server"), "the server");
        assert_eq!(n.normalize("I said hi"), "i said hi");
    }

    #[test]
    fn test_unicode_letters_survive() {
        let n = TextNormalizer::default();
        assert_eq!(n.normalize("¿Dónde está?"), "dónde está");
        assert_eq!(n.normalize("Größe"), "größe");
    }

    #[test]
    fn test_quotes_removed() {
        let n = TextNormalizer::default();
        assert_eq!(n.normalize("Don't \"quote\" me"), "dont quote me");
    }
}
