//! Simple query string parsing
//!
//! Supported syntax:
//! - `word`: optional or required depending on the default operator
//! - `+word`: required
//! - `-word`: prohibited
//! - `a | b`: both sides optional, at least one must match
//! - `"some phrase"`: every word of the phrase must match
//! - `pre*`: any term starting with `pre`
//!
//! Parsing is lenient about stray operators, like the query parsers users
//! know from search boxes, but a query without a single meaningful token is
//! rejected.

use sift_core::{Error, Result};

/// Operator applied between terms without explicit `+`, `-` or `|`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum BooleanOperator {
    /// Any term may match
    #[default]
    Or,
    /// Every term must match
    And,
}

/// Occurrence requirement of a clause
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Occur {
    /// Must match
    Must,
    /// May match
    Should,
    /// Must not match
    MustNot,
}

/// Term of a clause, before analysis
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SimpleTerm {
    /// A single word
    Word(String),
    /// Prefix of a word (`pre*`)
    Prefix(String),
    /// Quoted phrase
    Phrase(String),
}

impl SimpleTerm {
    /// Raw text of the term
    pub fn text(&self) -> &str {
        match self {
            SimpleTerm::Word(s) | SimpleTerm::Prefix(s) | SimpleTerm::Phrase(s) => s,
        }
    }
}

/// One clause of a parsed query
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SimpleClause {
    /// Requirement
    pub occur: Occur,
    /// Term
    pub term: SimpleTerm,
}

/// A parsed simple query string
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SimpleQuery {
    /// Clauses in query order
    pub clauses: Vec<SimpleClause>,
}

impl SimpleQuery {
    /// Check whether every clause is prohibited
    pub fn is_purely_negative(&self) -> bool {
        self.clauses.iter().all(|c| c.occur == Occur::MustNot)
    }
}

#[derive(Debug)]
enum Token {
    Term {
        term: SimpleTerm,
        required: bool,
        negated: bool,
    },
    Or,
}

fn is_meaningful(text: &str) -> bool {
    text.chars().any(char::is_alphanumeric)
}

fn lex(query: &str) -> Vec<Token> {
    let chars: Vec<char> = query.chars().collect();
    let mut tokens = Vec::new();
    let mut i = 0;

    while i < chars.len() {
        let c = chars[i];
        if c.is_whitespace() {
            i += 1;
            continue;
        }
        if c == '|' {
            tokens.push(Token::Or);
            i += 1;
            continue;
        }

        let mut required = false;
        let mut negated = false;
        while i < chars.len() && (chars[i] == '+' || chars[i] == '-') {
            if chars[i] == '+' {
                required = true;
            } else {
                negated = true;
            }
            i += 1;
        }
        if i >= chars.len() {
            break;
        }

        let term = if chars[i] == '"' {
            i += 1;
            let start = i;
            while i < chars.len() && chars[i] != '"' {
                i += 1;
            }
            let text: String = chars[start..i].iter().collect();
            // Skip the closing quote; an unterminated phrase runs to the end
            i += 1;
            SimpleTerm::Phrase(text)
        } else {
            let start = i;
            while i < chars.len() && !chars[i].is_whitespace() && chars[i] != '|' && chars[i] != '"'
            {
                i += 1;
            }
            let word: String = chars[start..i].iter().collect();
            if word.ends_with('*') {
                SimpleTerm::Prefix(word.trim_end_matches('*').to_string())
            } else {
                SimpleTerm::Word(word)
            }
        };

        if is_meaningful(term.text()) {
            tokens.push(Token::Term {
                term,
                required,
                negated,
            });
        }
    }

    tokens
}

/// Parse a simple query string
///
/// # Errors
///
/// Returns [`Error::InvalidQueryString`] if no meaningful token remains.
pub fn parse(query: &str, default_operator: BooleanOperator) -> Result<SimpleQuery> {
    let tokens = lex(query);
    let is_or = |idx: Option<usize>| {
        idx.and_then(|i| tokens.get(i))
            .map_or(false, |t| matches!(t, Token::Or))
    };

    let mut clauses = Vec::new();
    for (idx, token) in tokens.iter().enumerate() {
        if let Token::Term {
            term,
            required,
            negated,
        } = token
        {
            let occur = if *negated {
                Occur::MustNot
            } else if *required {
                Occur::Must
            } else if is_or(idx.checked_sub(1)) || is_or(Some(idx + 1)) {
                Occur::Should
            } else {
                match default_operator {
                    BooleanOperator::And => Occur::Must,
                    BooleanOperator::Or => Occur::Should,
                }
            };
            clauses.push(SimpleClause {
                occur,
                term: term.clone(),
            });
        }
    }

    if clauses.is_empty() {
        return Err(Error::InvalidQueryString {
            query: query.to_string(),
            reason: "the query string must contain at least one meaningful token".to_string(),
        });
    }
    Ok(SimpleQuery { clauses })
}
