//! Key Pattern Module
//!
//! Glob matching used by `keys` and `clear` to select keys.

use std::fmt;

/// Pattern that selects every key.
pub const MATCH_ALL: &str = "*";

// == Key Matcher ==
/// Decides whether a key is selected by a pattern.
pub trait KeyMatcher: Send + Sync + fmt::Debug {
    fn is_match(&self, key: &str, pattern: &str) -> bool;
}

// == Glob Matcher ==
/// Shell-style glob matching over characters.
///
/// Supported patterns:
/// - `*` matches any run of characters, including none
/// - `?` matches exactly one character
/// - `[abc]`, `[a-z]` match one character from a set or range
/// - `[!abc]`, `[^abc]` match one character outside the set
/// - `\x` matches `x` literally
///
/// Keys are flat strings, not paths: `*` and `?` also match `/`, and there
/// is no `**` globstar. Brace alternatives such as `{a,b}` are not expanded;
/// the braces match themselves. Plug in another [`KeyMatcher`] for path-aware
/// semantics.
///
/// Matching runs in `O(key * pattern)` time whatever the number of stars.
#[derive(Debug, Clone, Copy, Default)]
pub struct GlobMatcher;

impl KeyMatcher for GlobMatcher {
    fn is_match(&self, key: &str, pattern: &str) -> bool {
        if pattern == MATCH_ALL {
            return true;
        }
        let tokens = tokenize(pattern);
        let key: Vec<char> = key.chars().collect();
        glob_match(&tokens, &key)
    }
}

#[derive(Debug, Clone, PartialEq)]
enum Token {
    Star,
    AnyOne,
    Literal(char),
    Class { negate: bool, body: Vec<char> },
}

impl Token {
    /// Whether this single-character token accepts `c`.
    fn accepts(&self, c: char) -> bool {
        match self {
            Token::Star | Token::AnyOne => true,
            Token::Literal(literal) => *literal == c,
            Token::Class { negate, body } => class_matches(body, c) != *negate,
        }
    }
}

fn tokenize(pattern: &str) -> Vec<Token> {
    let chars: Vec<char> = pattern.chars().collect();
    let mut rest = chars.as_slice();
    let mut tokens = Vec::new();

    while !rest.is_empty() {
        let (token, after) = match rest {
            ['*', after @ ..] => (Token::Star, after),
            ['?', after @ ..] => (Token::AnyOne, after),
            ['\\', literal, after @ ..] => (Token::Literal(*literal), after),
            ['[', after @ ..] => match split_class(after) {
                Some((body, after)) => {
                    let (negate, body) = match body {
                        ['!' | '^', body @ ..] => (true, body),
                        _ => (false, body),
                    };
                    let body = body.to_vec();
                    (Token::Class { negate, body }, after)
                }
                // Unterminated class: treat the bracket literally
                None => (Token::Literal('['), after),
            },
            [literal, after @ ..] => (Token::Literal(*literal), after),
            [] => break,
        };
        // Runs of stars match the same as one
        if !(token == Token::Star && tokens.last() == Some(&Token::Star)) {
            tokens.push(token);
        }
        rest = after;
    }
    tokens
}

/// Iterative wildcard match with single-star backtracking.
///
/// On a mismatch, only the most recent `*` is retried, one character further
/// into the text. Earlier stars never need revisiting: anything they could
/// absorb, the latest star can absorb too.
fn glob_match(tokens: &[Token], text: &[char]) -> bool {
    let mut p = 0;
    let mut t = 0;
    // (token index after the last star, text index that star resumes from)
    let mut backtrack: Option<(usize, usize)> = None;

    while t < text.len() {
        match tokens.get(p) {
            Some(Token::Star) => {
                backtrack = Some((p + 1, t));
                p += 1;
            }
            Some(token) if token.accepts(text[t]) => {
                p += 1;
                t += 1;
            }
            _ => match backtrack {
                Some((after_star, resume)) => {
                    p = after_star;
                    t = resume + 1;
                    backtrack = Some((after_star, resume + 1));
                }
                None => return false,
            },
        }
    }

    tokens[p..].iter().all(|token| *token == Token::Star)
}

/// Splits `abc]rest` into the class body `abc` and `rest`.
fn split_class(rest: &[char]) -> Option<(&[char], &[char])> {
    let close = rest.iter().position(|&c| c == ']')?;
    Some((&rest[..close], &rest[close + 1..]))
}

fn class_matches(body: &[char], c: char) -> bool {
    let mut rest = body;
    loop {
        rest = match rest {
            [] => return false,
            [low, '-', high, after @ ..] => {
                if *low <= c && c <= *high {
                    return true;
                }
                after
            }
            [single, after @ ..] => {
                if *single == c {
                    return true;
                }
                after
            }
        };
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::{Duration, Instant};

    fn is_match(key: &str, pattern: &str) -> bool {
        GlobMatcher.is_match(key, pattern)
    }

    #[test]
    fn test_match_all() {
        assert!(is_match("anything", "*"));
        assert!(is_match("", "*"));
        assert!(is_match("a/b/c", "*"));
    }

    #[test]
    fn test_literal() {
        assert!(is_match("foo", "foo"));
        assert!(!is_match("foo", "fo"));
        assert!(!is_match("fo", "foo"));
    }

    #[test]
    fn test_star() {
        assert!(is_match("foo1", "foo*"));
        assert!(is_match("foo", "foo*"));
        assert!(is_match("hello", "h*llo"));
        assert!(is_match("hllo", "h*llo"));
        assert!(!is_match("bar", "foo*"));
        assert!(is_match("xfoo", "**foo"));
    }

    #[test]
    fn test_question_mark() {
        assert!(is_match("hello", "h?llo"));
        assert!(is_match("hallo", "h?llo"));
        assert!(!is_match("hllo", "h?llo"));
        assert!(is_match("hé", "h?"));
    }

    #[test]
    fn test_character_class() {
        assert!(is_match("hello", "h[ae]llo"));
        assert!(is_match("hallo", "h[ae]llo"));
        assert!(!is_match("hillo", "h[ae]llo"));
        assert!(is_match("key5", "key[0-9]"));
        assert!(!is_match("keyx", "key[0-9]"));
    }

    #[test]
    fn test_negated_class() {
        assert!(!is_match("hello", "h[!e]llo"));
        assert!(is_match("hallo", "h[^e]llo"));
    }

    #[test]
    fn test_escape_and_unterminated_class() {
        assert!(is_match("a*b", "a\\*b"));
        assert!(!is_match("axb", "a\\*b"));
        assert!(is_match("[abc", "[abc"));
    }

    #[test]
    fn test_slash_and_braces_are_plain_characters() {
        assert!(is_match("user/1/name", "user*name"));
        assert!(is_match("a/b", "a?b"));
        assert!(is_match("{a,b}", "{a,b}"));
        assert!(!is_match("a", "{a,b}"));
    }

    #[test]
    fn test_star_backtracking() {
        assert!(is_match("abcbcd", "a*bcd"));
        assert!(is_match("mississippi", "m*iss*ppi"));
        assert!(!is_match("mississippi", "m*iss*ppx"));
        assert!(is_match("aab", "*a*b"));
        assert!(is_match("key:9", "*[0-9]"));
        assert!(!is_match("ab", "a*b*c"));
    }

    #[test]
    fn test_many_stars_match_in_bounded_time() {
        let key = "a".repeat(2_000);
        let pattern = format!("{}b", "*a".repeat(30));

        let started = Instant::now();
        assert!(!is_match(&key, &pattern));
        assert!(is_match(&format!("{}b", key), &pattern));
        assert!(
            started.elapsed() < Duration::from_secs(1),
            "matching took {:?}",
            started.elapsed()
        );
    }

    #[test]
    fn test_tokenize_collapses_stars() {
        assert_eq!(
            tokenize("a**?\\*[!x]"),
            vec![
                Token::Literal('a'),
                Token::Star,
                Token::AnyOne,
                Token::Literal('*'),
                Token::Class {
                    negate: true,
                    body: vec!['x'],
                },
            ]
        );
    }
}
