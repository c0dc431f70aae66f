//! Pipeline Definition Parser
//!
//! One operation per line. A line with a single `=` is a parameterless node
//! (`node=greyscale`); a line with more is a parameterized node whose
//! whitespace-separated tokens are `label=value` pairs
//! (`node=crop origin=10x20 size=30x40`, `node=noise noiseValue=0.2`).

use thiserror::Error;

use crate::config::{ParserOptions, UnknownKeywordPolicy};
use crate::operation::Operation;

pub const NODE_LABEL: &str = "node";
pub const NOISE_LABEL: &str = "noiseValue";
pub const ORIGIN_LABEL: &str = "origin";
pub const SIZE_LABEL: &str = "size";

/// A malformed definition line, with its 1-based number and raw text
#[derive(Debug, Error, PartialEq)]
#[error("line {line}: {kind} (in {content:?})")]
pub struct ParseError {
    pub line: usize,
    pub content: String,
    pub kind: ParseErrorKind,
}

#[derive(Debug, Error, PartialEq)]
pub enum ParseErrorKind {
    #[error("missing `node=` declaration")]
    MissingTag,

    #[error("unknown operation `{0}`")]
    UnknownOperation(String),

    #[error("`{keyword}` takes {expected} parameter(s), found {found}")]
    WrongParameterCount {
        keyword: String,
        expected: usize,
        found: usize,
    },

    #[error("expected `{expected}=...`, found `{found}`")]
    UnexpectedLabel { expected: &'static str, found: String },

    #[error("invalid number `{0}`")]
    InvalidNumber(String),

    #[error("expected a `<a>x<b>` pair, found `{0}`")]
    InvalidPair(String),
}

/// The two shapes a definition line can take
#[derive(Debug, PartialEq)]
enum LineForm<'a> {
    Blank,
    Parameterless(&'a str),
    Parameterized(Vec<&'a str>),
}

fn classify(line: &str) -> Result<LineForm<'_>, ParseErrorKind> {
    let trimmed = line.trim();
    if trimmed.is_empty() {
        return Ok(LineForm::Blank);
    }
    match trimmed.matches('=').count() {
        0 => Err(ParseErrorKind::MissingTag),
        1 => Ok(LineForm::Parameterless(trimmed)),
        _ => Ok(LineForm::Parameterized(trimmed.split_whitespace().collect())),
    }
}

/// Parse a whole definition, skipping blank lines.
pub fn parse_operations(text: &str, options: ParserOptions) -> Result<Vec<Operation>, ParseError> {
    let mut operations = vec![];

    for (idx, raw) in text.lines().enumerate() {
        let fail = |kind| ParseError {
            line: idx + 1,
            content: raw.to_string(),
            kind,
        };

        match classify(raw).map_err(fail)? {
            LineForm::Blank => continue,
            LineForm::Parameterless(token) => {
                operations.push(parse_parameterless(token, options.unknown_keyword).map_err(fail)?)
            }
            LineForm::Parameterized(tokens) => operations
                .push(parse_parameterized(&tokens, options.unknown_keyword).map_err(fail)?),
        }
    }

    Ok(operations)
}

/// Parse a single non-blank definition line.
pub fn parse_line(line: &str, options: ParserOptions) -> Result<Operation, ParseErrorKind> {
    match classify(line)? {
        LineForm::Blank => Err(ParseErrorKind::MissingTag),
        LineForm::Parameterless(token) => parse_parameterless(token, options.unknown_keyword),
        LineForm::Parameterized(tokens) => parse_parameterized(&tokens, options.unknown_keyword),
    }
}

fn parse_parameterless(
    token: &str,
    policy: UnknownKeywordPolicy,
) -> Result<Operation, ParseErrorKind> {
    let keyword = labelled(token, NODE_LABEL)?.trim();
    match keyword {
        "greyscale" => Ok(Operation::GreyScale),
        "normalise" => Ok(Operation::Normalise),
        "vignette" => Ok(Operation::Vignette),
        _ => match policy {
            UnknownKeywordPolicy::Fallback => Ok(Operation::Vignette),
            UnknownKeywordPolicy::Reject => Err(missing_parameters(keyword)),
        },
    }
}

fn missing_parameters(keyword: &str) -> ParseErrorKind {
    match parameter_count(keyword) {
        Some(expected) => ParseErrorKind::WrongParameterCount {
            keyword: keyword.to_string(),
            expected,
            found: 0,
        },
        None => ParseErrorKind::UnknownOperation(keyword.to_string()),
    }
}

fn parameter_count(keyword: &str) -> Option<usize> {
    match keyword {
        "greyscale" | "normalise" | "vignette" => Some(0),
        "noise" => Some(1),
        "crop" => Some(2),
        _ => None,
    }
}

fn parse_parameterized(
    tokens: &[&str],
    policy: UnknownKeywordPolicy,
) -> Result<Operation, ParseErrorKind> {
    let (head, params) = match tokens.split_first() {
        Some(split) => split,
        None => return Err(ParseErrorKind::MissingTag),
    };
    let keyword = labelled(head, NODE_LABEL)?;

    match (keyword, policy) {
        ("noise", _) => parse_noise(params),
        ("crop", _) => parse_crop(keyword, params),
        (_, UnknownKeywordPolicy::Fallback) => parse_crop(keyword, params),
        (_, UnknownKeywordPolicy::Reject) => match parameter_count(keyword) {
            Some(expected) => Err(ParseErrorKind::WrongParameterCount {
                keyword: keyword.to_string(),
                expected,
                found: params.len(),
            }),
            None => Err(ParseErrorKind::UnknownOperation(keyword.to_string())),
        },
    }
}

fn parse_noise(params: &[&str]) -> Result<Operation, ParseErrorKind> {
    let [value] = expect_params::<1>("noise", params)?;
    let literal = labelled(value, NOISE_LABEL)?;
    let amount = literal
        .parse::<f64>()
        .ok()
        .filter(|amount| amount.is_finite())
        .ok_or_else(|| ParseErrorKind::InvalidNumber(literal.to_string()))?;
    Ok(Operation::Noise { amount })
}

fn parse_crop(keyword: &str, params: &[&str]) -> Result<Operation, ParseErrorKind> {
    let [origin, size] = expect_params::<2>(keyword, params)?;
    let (origin_x, origin_y) = parse_pair(labelled(origin, ORIGIN_LABEL)?)?;
    let (width, height) = parse_pair(labelled(size, SIZE_LABEL)?)?;
    Ok(Operation::Crop {
        origin_x,
        origin_y,
        width,
        height,
    })
}

fn expect_params<'a, const N: usize>(
    keyword: &str,
    params: &[&'a str],
) -> Result<[&'a str; N], ParseErrorKind> {
    <[&str; N]>::try_from(params).map_err(|_| ParseErrorKind::WrongParameterCount {
        keyword: keyword.to_string(),
        expected: N,
        found: params.len(),
    })
}

/// The value of a `label=value` token, if its label is `label`
fn labelled<'a>(token: &'a str, label: &'static str) -> Result<&'a str, ParseErrorKind> {
    match token.split_once('=') {
        Some((key, value)) if key.trim() == label => Ok(value),
        _ => Err(ParseErrorKind::UnexpectedLabel {
            expected: label,
            found: token.to_string(),
        }),
    }
}

/// `"<a>x<b>"` -> `(a, b)`
fn parse_pair(value: &str) -> Result<(i64, i64), ParseErrorKind> {
    let (a, b) = value
        .split_once('x')
        .ok_or_else(|| ParseErrorKind::InvalidPair(value.to_string()))?;
    let number = |s: &str| {
        s.parse::<i64>()
            .map_err(|_| ParseErrorKind::InvalidNumber(s.to_string()))
    };
    Ok((number(a)?, number(b)?))
}
