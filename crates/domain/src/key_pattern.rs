//! Redis-style glob patterns used for bulk cache invalidation.
//!
//! Supports `*` (any run of characters), `?` (exactly one character) and `\`
//! to escape either of them. Character classes are not supported and are
//! matched literally.

use fitgate_core::{AppError, AppResult};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Token {
    Literal(char),
    AnyChar,
    AnySequence,
}

/// Parsed key pattern.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KeyPattern {
    raw: String,
    tokens: Vec<Token>,
}

impl KeyPattern {
    /// Parses a pattern. Empty patterns are rejected.
    pub fn parse(pattern: &str) -> AppResult<Self> {
        if pattern.is_empty() {
            return Err(AppError::Validation(
                "cache key pattern must not be empty".to_owned(),
            ));
        }

        let mut tokens = Vec::with_capacity(pattern.len());
        let mut chars = pattern.chars();
        while let Some(character) = chars.next() {
            let token = match character {
                '*' => Token::AnySequence,
                '?' => Token::AnyChar,
                '\\' => Token::Literal(chars.next().unwrap_or('\\')),
                other => Token::Literal(other),
            };

            // Consecutive stars are equivalent to one.
            if token == Token::AnySequence && tokens.last() == Some(&Token::AnySequence) {
                continue;
            }
            tokens.push(token);
        }

        Ok(Self {
            raw: pattern.to_owned(),
            tokens,
        })
    }

    /// Escapes wildcard characters so `literal` only matches itself.
    #[must_use]
    pub fn escape(literal: &str) -> String {
        let mut escaped = String::with_capacity(literal.len());
        for character in literal.chars() {
            if matches!(character, '*' | '?' | '\\') {
                escaped.push('\\');
            }
            escaped.push(character);
        }
        escaped
    }

    /// Returns the pattern as written.
    #[must_use]
    pub fn as_str(&self) -> &str {
        self.raw.as_str()
    }

    /// Returns the literal text before the first wildcard.
    #[must_use]
    pub fn literal_prefix(&self) -> String {
        self.tokens
            .iter()
            .map_while(|token| match token {
                Token::Literal(character) => Some(*character),
                Token::AnyChar | Token::AnySequence => None,
            })
            .collect()
    }

    /// Returns whether the pattern matches the whole candidate.
    #[must_use]
    pub fn matches(&self, candidate: &str) -> bool {
        let text: Vec<char> = candidate.chars().collect();
        let mut pattern_index = 0;
        let mut text_index = 0;
        let mut backtrack: Option<(usize, usize)> = None;

        while text_index < text.len() {
            match self.tokens.get(pattern_index) {
                Some(Token::AnySequence) => {
                    backtrack = Some((pattern_index, text_index));
                    pattern_index += 1;
                }
                Some(Token::AnyChar) => {
                    pattern_index += 1;
                    text_index += 1;
                }
                Some(Token::Literal(character)) if *character == text[text_index] => {
                    pattern_index += 1;
                    text_index += 1;
                }
                _ => match backtrack {
                    Some((star_index, star_text_index)) => {
                        pattern_index = star_index + 1;
                        text_index = star_text_index + 1;
                        backtrack = Some((star_index, star_text_index + 1));
                    }
                    None => return false,
                },
            }
        }

        self.tokens[pattern_index..]
            .iter()
            .all(|token| *token == Token::AnySequence)
    }

    /// Returns whether any key of `namespace` could match this pattern.
    #[must_use]
    pub fn may_match_namespace(&self, namespace: &str) -> bool {
        let prefix = self.literal_prefix();
        let namespace_prefix = format!("{namespace}:");

        namespace_prefix.starts_with(prefix.as_str())
            || prefix.starts_with(namespace_prefix.as_str())
            || self.matches(namespace)
    }
}
