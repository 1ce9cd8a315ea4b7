//! Request-Line Parser and Token Validator
//!
//! Turns one received line into a [`Request`]: a verb token plus an ordered
//! sequence of argument tokens, split on whitespace runs. A request is
//! transient and rebuilt for every line.
//!
//! ## Validation
//!
//! Tokens may only contain characters from the set
//! `{A-Z, a-z, 0-9, '.', '-', '_', '!'}`. Separators are not characters of
//! any token, so they never reach the check. Validation is a pure predicate;
//! the connection layer sends the `BAD REQUEST` reply and terminates when it
//! fails. A request is never dispatched until it passes.

/// True for characters allowed inside a request token.
#[inline]
pub fn is_valid_char(c: char) -> bool {
    c.is_ascii_alphanumeric() || matches!(c, '.' | '-' | '_' | '!')
}

/// A parsed request line.
///
/// The first token is the command verb (matched case-insensitively); the
/// rest are its arguments.
///
/// # Example
///
/// ```
/// use fileslice::protocol::Request;
///
/// let request = Request::parse("get_slice notes.txt 5 20").unwrap();
/// assert_eq!(request.verb(), "get_slice");
/// assert_eq!(request.args(), ["notes.txt", "5", "20"]);
/// assert!(request.is_valid());
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Request {
    tokens: Vec<String>,
}

impl Request {
    /// Splits a line into tokens on whitespace runs.
    ///
    /// Returns `None` when the line holds no tokens at all; an empty
    /// request line terminates the connection silently, so there is
    /// nothing to dispatch.
    pub fn parse(line: &str) -> Option<Self> {
        let tokens: Vec<String> = line.split_whitespace().map(str::to_owned).collect();
        if tokens.is_empty() {
            None
        } else {
            Some(Self { tokens })
        }
    }

    /// The command verb, lowercased for case-insensitive dispatch.
    pub fn verb(&self) -> String {
        self.tokens[0].to_ascii_lowercase()
    }

    /// The argument tokens following the verb.
    pub fn args(&self) -> &[String] {
        &self.tokens[1..]
    }

    /// True when every character of every token is in the allowed set.
    pub fn is_valid(&self) -> bool {
        self.tokens
            .iter()
            .all(|token| token.chars().all(is_valid_char))
    }
}
