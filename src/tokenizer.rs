//! # Command Tokenizer Module
//!
//! Turns raw update text into the argument vector handed to the router.
//!
//! ## Features
//!
//! - Bot mention stripping (`/start@my_bot` becomes `/start`)
//! - Command classification on the `/` prefix
//! - Shell-style splitting with single and double quotes, no comment characters
//! - The inverse [`join`], so a stored token sequence re-tokenizes to itself

use regex::Regex;
use std::sync::LazyLock;

use crate::errors::ParseError;

/// Character that marks the first token of a command
pub const COMMAND_PREFIX: char = '/';

// "@" followed by a bot username
static MENTION_REGEX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"@[A-Za-z0-9_]+").expect("Mention pattern should be valid"));

/// Remove bot mentions and surrounding whitespace
pub fn clean(text: &str) -> String {
    MENTION_REGEX.replace_all(text, "").trim().to_string()
}

/// Whether cleaned text is a command
pub fn is_command(text: &str) -> bool {
    text.starts_with(COMMAND_PREFIX)
}

/// The first whitespace-separated word, lowercased
pub fn dispatch_key(text: &str) -> Option<String> {
    text.split_whitespace().next().map(str::to_lowercase)
}

#[derive(Clone, Copy, PartialEq)]
enum Quote {
    None,
    Single,
    Double,
}

/// Split text into tokens using shell quoting rules
///
/// # Examples
///
/// ```rust
/// use hookbot::tokenizer::tokenize;
///
/// let args = tokenize(r#"/cmd "hello world" plain"#)?;
/// assert_eq!(args, vec!["/cmd", "hello world", "plain"]);
/// # Ok::<(), hookbot::errors::ParseError>(())
/// ```
pub fn tokenize(text: &str) -> Result<Vec<String>, ParseError> {
    let mut tokens = Vec::new();
    let mut current = String::new();
    let mut in_token = false;
    let mut quote = Quote::None;
    let mut chars = text.chars().peekable();

    while let Some(c) = chars.next() {
        match quote {
            Quote::None => match c {
                c if c.is_whitespace() => {
                    if in_token {
                        tokens.push(std::mem::take(&mut current));
                        in_token = false;
                    }
                }
                '\'' => {
                    quote = Quote::Single;
                    in_token = true;
                }
                '"' => {
                    quote = Quote::Double;
                    in_token = true;
                }
                '\\' => {
                    let escaped = chars.next().ok_or(ParseError::TrailingEscape)?;
                    current.push(escaped);
                    in_token = true;
                }
                c => {
                    current.push(c);
                    in_token = true;
                }
            },
            Quote::Single => match c {
                '\'' => quote = Quote::None,
                c => current.push(c),
            },
            Quote::Double => match c {
                '"' => quote = Quote::None,
                '\\' if matches!(chars.peek(), Some('"') | Some('\\')) => {
                    if let Some(escaped) = chars.next() {
                        current.push(escaped);
                    }
                }
                c => current.push(c),
            },
        }
    }

    match quote {
        Quote::Single => return Err(ParseError::UnclosedQuote { quote: '\'' }),
        Quote::Double => return Err(ParseError::UnclosedQuote { quote: '"' }),
        Quote::None => {}
    }

    if in_token {
        tokens.push(current);
    }

    Ok(tokens)
}

/// Quote a single token so that [`tokenize`] reads it back unchanged
pub fn quote(token: &str) -> String {
    if token.is_empty() {
        return "''".to_string();
    }

    let needs_quoting = token
        .chars()
        .any(|c| c.is_whitespace() || matches!(c, '\'' | '"' | '\\'));

    if !needs_quoting {
        token.to_string()
    } else if !token.contains('\'') {
        format!("'{token}'")
    } else {
        let escaped = token.replace('\\', "\\\\").replace('"', "\\\"");
        format!("\"{escaped}\"")
    }
}

/// Join tokens back into command text
pub fn join<S: AsRef<str>>(tokens: &[S]) -> String {
    tokens
        .iter()
        .map(|t| quote(t.as_ref()))
        .collect::<Vec<_>>()
        .join(" ")
}
