//! Text validation and encoding
//!
//! Every text subtype funnels through [`encode`], which either returns the
//! exact string stored on the wire or the reason the input is rejected.
//!
//! Checkbox and multiselect values use the subtype's sentinel as a per-value
//! prefix:
//!
//! ```text
//! none selected:   ::CONTENT-XML-CHECKBOX::
//! a and b:         ::CONTENT-XML-CHECKBOX::a::CONTENT-XML-CHECKBOX::b
//! ```

use std::borrow::Cow;

use chrono::{Datelike, Local, NaiveDate};
use regex::Regex;
use serde::{Deserialize, Serialize};

use super::TextValue;
use crate::error::{Result, StructuredDataError};
use crate::schema::TextKind;

/// Tunable validation rules
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TextRules {
    /// Accepted distance, in years, between a date and the reference year
    pub date_year_window: i32,
    /// Year dates are checked against; the current year when `None`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reference_year: Option<i32>,
}

impl Default for TextRules {
    fn default() -> Self {
        Self {
            date_year_window: 10,
            reference_year: None,
        }
    }
}

impl TextRules {
    fn reference_year(&self) -> i32 {
        self.reference_year.unwrap_or_else(|| Local::now().year())
    }
}

/// Literal or regular-expression text matcher
#[derive(Debug, Clone)]
pub enum TextPattern {
    Literal(String),
    Regex(Regex),
}

impl TextPattern {
    pub fn literal(s: impl Into<String>) -> Self {
        TextPattern::Literal(s.into())
    }

    pub fn regex(pattern: &str) -> Result<Self> {
        Ok(TextPattern::Regex(Regex::new(pattern)?))
    }

    pub fn is_match(&self, haystack: &str) -> bool {
        match self {
            TextPattern::Literal(needle) => haystack.contains(needle.as_str()),
            TextPattern::Regex(re) => re.is_match(haystack),
        }
    }

    /// Replace every match. Regex replacements may use `$1`-style groups.
    pub fn replace<'a>(&self, haystack: &'a str, replacement: &str) -> Cow<'a, str> {
        match self {
            TextPattern::Literal(needle) if needle.is_empty() => Cow::Borrowed(haystack),
            TextPattern::Literal(needle) => {
                if haystack.contains(needle.as_str()) {
                    Cow::Owned(haystack.replace(needle.as_str(), replacement))
                } else {
                    Cow::Borrowed(haystack)
                }
            }
            TextPattern::Regex(re) => re.replace_all(haystack, replacement),
        }
    }
}

/// Validate `input` for a text node and return its stored encoding.
pub(crate) fn encode(
    identifier: &str,
    text: &TextValue,
    required: bool,
    input: &str,
    rules: &TextRules,
) -> Result<String> {
    let value = input.trim();
    let empty = || -> Result<String> {
        if required {
            Err(StructuredDataError::EmptyRequiredValue(identifier.to_string()))
        } else {
            Ok(text.kind.blank_value())
        }
    };

    match text.kind {
        TextKind::Plain | TextKind::Multiline | TextKind::Wysiwyg => {
            if value.is_empty() {
                return empty();
            }
            Ok(value.to_string())
        }
        TextKind::Datetime => {
            if value.is_empty() {
                return empty();
            }
            if !value.bytes().all(|b| b.is_ascii_digit()) {
                return Err(invalid_date(identifier, input));
            }
            Ok(value.to_string())
        }
        TextKind::Date => {
            if value.is_empty() {
                return empty();
            }
            normalize_date(value, rules).ok_or_else(|| invalid_date(identifier, input))
        }
        TextKind::Checkbox | TextKind::Multiselect => {
            encode_selection(identifier, text, required, value)
        }
        TextKind::Radio => {
            let tokens: Vec<&str> = value
                .split(';')
                .map(str::trim)
                .filter(|t| !t.is_empty())
                .collect();
            match tokens.as_slice() {
                [] => empty(),
                [token] => {
                    check_member(identifier, &text.items, token)?;
                    Ok(token.to_string())
                }
                _ => Err(StructuredDataError::MultipleValuesNotAllowed(
                    identifier.to_string(),
                )),
            }
        }
        TextKind::Dropdown => {
            if value.is_empty() {
                return empty();
            }
            if text.items.len() > 1 {
                check_member(identifier, &text.items, value)?;
            }
            Ok(input.to_string())
        }
    }
}

fn invalid_date(identifier: &str, input: &str) -> StructuredDataError {
    StructuredDataError::InvalidDateValue {
        identifier: identifier.to_string(),
        value: input.to_string(),
    }
}

fn check_member(identifier: &str, items: &[String], token: &str) -> Result<()> {
    if items.is_empty() || items.iter().any(|i| i == token) {
        Ok(())
    } else {
        Err(StructuredDataError::UnknownEnumValue {
            identifier: identifier.to_string(),
            value: token.to_string(),
        })
    }
}

/// `MM-DD-YYYY`, calendar-checked and within the year window
fn normalize_date(value: &str, rules: &TextRules) -> Option<String> {
    let mut parts = value.split('-');
    let (month, day, year) = (parts.next()?, parts.next()?, parts.next()?);
    if parts.next().is_some() {
        return None;
    }

    let digits = |s: &str, max_len: usize| {
        (!s.is_empty() && s.len() <= max_len && s.bytes().all(|b| b.is_ascii_digit()))
            .then(|| s.parse::<u32>().ok())
            .flatten()
    };
    let month = digits(month, 2)?;
    let day = digits(day, 2)?;
    if year.len() != 4 {
        return None;
    }
    let year = digits(year, 4)? as i32;

    let date = NaiveDate::from_ymd_opt(year, month, day)?;
    if (date.year() - rules.reference_year()).abs() > rules.date_year_window {
        return None;
    }
    Some(format!("{:02}-{:02}-{:04}", date.month(), date.day(), date.year()))
}

/// Split a selection given either as `a;b` or in sentinel-prefixed form
fn selection_tokens<'a>(value: &'a str, prefix: &str) -> Vec<&'a str> {
    let tokens: Vec<&'a str> = if value.contains(prefix) {
        value.split(prefix).collect()
    } else {
        value.split(';').collect()
    };
    let mut out: Vec<&'a str> = Vec::new();
    for token in tokens.into_iter().map(str::trim).filter(|t| !t.is_empty()) {
        if !out.contains(&token) {
            out.push(token);
        }
    }
    out
}

fn encode_selection(
    identifier: &str,
    text: &TextValue,
    required: bool,
    value: &str,
) -> Result<String> {
    let prefix = text.kind.sentinel().unwrap_or_default();
    let none_selected = || {
        if required {
            Err(StructuredDataError::EmptyRequiredValue(identifier.to_string()))
        } else {
            Ok(prefix.to_string())
        }
    };

    if text.items.len() <= 1 {
        // single-item field: the sole value, nothing, or the bare sentinel
        let token = value.strip_prefix(prefix).unwrap_or(value).trim();
        if token.is_empty() {
            return none_selected();
        }
        return match text.items.first() {
            Some(item) if item == token => Ok(format!("{prefix}{token}")),
            _ => Err(StructuredDataError::UnknownEnumValue {
                identifier: identifier.to_string(),
                value: token.to_string(),
            }),
        };
    }

    let tokens = selection_tokens(value, prefix);
    for token in &tokens {
        check_member(identifier, &text.items, token)?;
    }
    if tokens.is_empty() {
        return none_selected();
    }
    Ok(tokens.iter().map(|t| format!("{prefix}{t}")).collect())
}

/// Selected values of a checkbox or multiselect encoding
pub fn decode_selection(kind: TextKind, stored: &str) -> Vec<String> {
    match kind.sentinel() {
        Some(prefix) => selection_tokens(stored, prefix)
            .into_iter()
            .map(str::to_string)
            .collect(),
        None if stored.trim().is_empty() => Vec::new(),
        None => vec![stored.to_string()],
    }
}
