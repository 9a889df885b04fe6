//! Label selector expressions.
//!
//! Selectors filter list results by label. A selector is a comma-separated
//! list of requirements that must all hold:
//!
//! | Syntax              | Meaning                                 |
//! |---------------------|-----------------------------------------|
//! | `key`               | the label exists                        |
//! | `!key`              | the label does not exist                |
//! | `key=value`         | the label equals `value` (also `==`)    |
//! | `key!=value`        | the label does not equal `value`        |
//! | `key in (a,b)`      | the label is one of the listed values   |
//! | `key notin (a,b)`   | the label is none of the listed values  |
//!
//! Parsed selectors render canonically: requirements sorted by key, then
//! operator, then values, and set values sorted, so the same selector always
//! produces the same query string.
//!
//! # Example
//!
//! ```rust
//! use harbor_rest::clients::selector::Selector;
//!
//! let selector: Selector = "tier in (web, api), env=prod".parse().unwrap();
//! assert_eq!(selector.to_string(), "env=prod,tier in (api,web)");
//!
//! assert!("env=".parse::<Selector>().is_ok());
//! assert!("=prod".parse::<Selector>().is_err());
//! ```

use std::collections::BTreeSet;
use std::fmt;
use std::str::FromStr;

use thiserror::Error;

const MAX_NAME_LENGTH: usize = 63;
const MAX_PREFIX_LENGTH: usize = 253;

/// Error returned for a malformed selector expression.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[error("Invalid selector '{expression}': {reason}")]
pub struct SelectorError {
    /// The full expression that failed to parse.
    pub expression: String,
    /// What was wrong with it.
    pub reason: String,
}

/// The relation a [`Requirement`] checks.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Operator {
    /// `key`
    Exists,
    /// `!key`
    DoesNotExist,
    /// `key=value` or `key==value`
    Equals,
    /// `key!=value`
    NotEquals,
    /// `key in (a,b)`
    In,
    /// `key notin (a,b)`
    NotIn,
}

/// A single condition on one label key.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Requirement {
    key: String,
    operator: Operator,
    values: BTreeSet<String>,
}

impl Requirement {
    /// Returns the label key.
    #[must_use]
    pub fn key(&self) -> &str {
        &self.key
    }

    /// Returns the operator.
    #[must_use]
    pub const fn operator(&self) -> Operator {
        self.operator
    }

    /// Returns the values, sorted. Empty for `Exists` and `DoesNotExist`.
    #[must_use]
    pub const fn values(&self) -> &BTreeSet<String> {
        &self.values
    }

    fn single_value(&self) -> &str {
        self.values.iter().next().map_or("", String::as_str)
    }
}

impl fmt::Display for Requirement {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.operator {
            Operator::Exists => write!(f, "{}", self.key),
            Operator::DoesNotExist => write!(f, "!{}", self.key),
            Operator::Equals => write!(f, "{}={}", self.key, self.single_value()),
            Operator::NotEquals => write!(f, "{}!={}", self.key, self.single_value()),
            Operator::In | Operator::NotIn => {
                let keyword = if self.operator == Operator::In { "in" } else { "notin" };
                let values: Vec<&str> = self.values.iter().map(String::as_str).collect();
                write!(f, "{} {keyword} ({})", self.key, values.join(","))
            }
        }
    }
}

/// A parsed label selector.
///
/// The empty selector matches everything and renders as an empty string.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Selector {
    requirements: Vec<Requirement>,
}

impl Selector {
    /// Parses a selector expression.
    ///
    /// # Errors
    ///
    /// Returns [`SelectorError`] if the expression is malformed or contains
    /// an invalid label key or value.
    pub fn parse(expression: &str) -> Result<Self, SelectorError> {
        let fail = |reason: String| SelectorError {
            expression: expression.to_string(),
            reason,
        };

        if expression.trim().is_empty() {
            return Ok(Self::default());
        }

        let mut requirements = split_requirements(expression)
            .map_err(fail)?
            .into_iter()
            .map(|part| parse_requirement(part.trim()).map_err(fail))
            .collect::<Result<Vec<_>, _>>()?;
        requirements.sort_by(|a, b| {
            (&a.key, a.operator, &a.values).cmp(&(&b.key, b.operator, &b.values))
        });

        Ok(Self { requirements })
    }

    /// Returns `true` if the selector has no requirements.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.requirements.is_empty()
    }

    /// Returns the requirements, sorted by key, operator and values.
    #[must_use]
    pub fn requirements(&self) -> &[Requirement] {
        &self.requirements
    }
}

impl FromStr for Selector {
    type Err = SelectorError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl fmt::Display for Selector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, requirement) in self.requirements.iter().enumerate() {
            if i > 0 {
                f.write_str(",")?;
            }
            write!(f, "{requirement}")?;
        }
        Ok(())
    }
}

/// Splits on commas that are not inside a value list.
fn split_requirements(expression: &str) -> Result<Vec<&str>, String> {
    let mut parts = Vec::new();
    let mut depth = 0usize;
    let mut start = 0;

    for (i, c) in expression.char_indices() {
        match c {
            '(' => {
                if depth > 0 {
                    return Err("nested parentheses are not allowed".to_string());
                }
                depth += 1;
            }
            ')' => {
                if depth == 0 {
                    return Err("unexpected ')'".to_string());
                }
                depth -= 1;
            }
            ',' if depth == 0 => {
                parts.push(&expression[start..i]);
                start = i + 1;
            }
            _ => {}
        }
    }
    if depth != 0 {
        return Err("missing ')'".to_string());
    }
    parts.push(&expression[start..]);

    if parts.iter().any(|part| part.trim().is_empty()) {
        return Err("empty requirement".to_string());
    }
    Ok(parts)
}

fn parse_requirement(part: &str) -> Result<Requirement, String> {
    if let Some(key) = part.strip_prefix('!') {
        let key = key.trim();
        validate_key(key)?;
        return Ok(requirement(key, Operator::DoesNotExist, []));
    }

    if let Some(open) = part.find('(') {
        let mut words = part[..open].split_whitespace();
        let (Some(key), Some(keyword), None) = (words.next(), words.next(), words.next()) else {
            return Err(format!("expected 'key in (...)' or 'key notin (...)', got '{part}'"));
        };
        let operator = match keyword {
            "in" => Operator::In,
            "notin" => Operator::NotIn,
            other => return Err(format!("unknown set operator '{other}'")),
        };
        let Some(list) = part[open + 1..].strip_suffix(')') else {
            return Err(format!("unexpected characters after ')' in '{part}'"));
        };

        validate_key(key)?;
        let values: Vec<&str> = list.split(',').map(str::trim).collect();
        if values.iter().any(|v| v.is_empty()) {
            return Err(format!("'{key} {keyword}' requires a list of non-empty values"));
        }
        for value in &values {
            validate_value(value)?;
        }
        return Ok(requirement(key, operator, values));
    }

    let comparison = part
        .split_once("!=")
        .map(|(k, v)| (k, v, Operator::NotEquals))
        .or_else(|| part.split_once("==").map(|(k, v)| (k, v, Operator::Equals)))
        .or_else(|| part.split_once('=').map(|(k, v)| (k, v, Operator::Equals)));

    if let Some((key, value, operator)) = comparison {
        let (key, value) = (key.trim(), value.trim());
        validate_key(key)?;
        validate_value(value)?;
        return Ok(requirement(key, operator, [value]));
    }

    validate_key(part)?;
    Ok(requirement(part, Operator::Exists, []))
}

fn requirement<'a, I>(key: &str, operator: Operator, values: I) -> Requirement
where
    I: IntoIterator<Item = &'a str>,
{
    Requirement {
        key: key.to_string(),
        operator,
        values: values.into_iter().map(str::to_string).collect(),
    }
}

/// Label keys are an optional DNS subdomain prefix and `/`, then a name.
fn validate_key(key: &str) -> Result<(), String> {
    let name = match key.split_once('/') {
        Some((prefix, name)) => {
            if !is_valid_prefix(prefix) {
                return Err(format!("invalid label key prefix '{prefix}'"));
            }
            name
        }
        None => key,
    };
    if name.is_empty() || !is_valid_name(name) {
        return Err(format!("invalid label key '{key}'"));
    }
    Ok(())
}

fn validate_value(value: &str) -> Result<(), String> {
    if value.is_empty() || is_valid_name(value) {
        Ok(())
    } else {
        Err(format!("invalid label value '{value}'"))
    }
}

/// Up to 63 alphanumerics, `-`, `_` or `.`, starting and ending with an
/// alphanumeric.
fn is_valid_name(name: &str) -> bool {
    if name.is_empty() || name.len() > MAX_NAME_LENGTH {
        return false;
    }
    let bytes = name.as_bytes();
    if !bytes[0].is_ascii_alphanumeric() || !bytes[bytes.len() - 1].is_ascii_alphanumeric() {
        return false;
    }
    bytes
        .iter()
        .all(|&b| b.is_ascii_alphanumeric() || matches!(b, b'-' | b'_' | b'.'))
}

/// A lowercase DNS subdomain.
fn is_valid_prefix(prefix: &str) -> bool {
    if prefix.is_empty() || prefix.len() > MAX_PREFIX_LENGTH {
        return false;
    }
    prefix.split('.').all(|label| {
        !label.is_empty()
            && !label.starts_with('-')
            && !label.ends_with('-')
            && label
                .bytes()
                .all(|b| b.is_ascii_lowercase() || b.is_ascii_digit() || b == b'-')
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(expression: &str) -> Selector {
        expression.parse().unwrap()
    }

    #[test]
    fn test_empty_selector() {
        assert!(parse("").is_empty());
        assert!(parse("   ").is_empty());
        assert_eq!(parse("").to_string(), "");
    }

    #[test]
    fn test_equality_requirements() {
        let selector = parse("env=prod");
        assert_eq!(selector.requirements().len(), 1);
        assert_eq!(selector.requirements()[0].operator(), Operator::Equals);
        assert_eq!(selector.to_string(), "env=prod");

        assert_eq!(parse("env == prod").to_string(), "env=prod");
        assert_eq!(parse("env!=prod").to_string(), "env!=prod");
        assert_eq!(parse("env=").to_string(), "env=");
    }

    #[test]
    fn test_existence_requirements() {
        assert_eq!(parse("release").requirements()[0].operator(), Operator::Exists);
        assert_eq!(
            parse("!release").requirements()[0].operator(),
            Operator::DoesNotExist
        );
        assert_eq!(parse("! release").to_string(), "!release");
    }

    #[test]
    fn test_set_requirements() {
        let selector = parse("tier in (web, api, web)");
        let requirement = &selector.requirements()[0];
        assert_eq!(requirement.operator(), Operator::In);
        assert_eq!(requirement.values().len(), 2);
        assert_eq!(selector.to_string(), "tier in (api,web)");

        assert_eq!(parse("tier notin (db)").to_string(), "tier notin (db)");
    }

    #[test]
    fn test_canonical_order_is_by_key() {
        let a = parse("zone=eu,app=registry,!legacy");
        let b = parse("!legacy, zone=eu, app=registry");
        assert_eq!(a.to_string(), "app=registry,!legacy,zone=eu");
        assert_eq!(a.to_string(), b.to_string());
    }

    #[test]
    fn test_same_key_requirements_are_canonical() {
        let a = parse("a=1,a!=2");
        let b = parse("a!=2,a=1");
        assert_eq!(a.to_string(), "a=1,a!=2");
        assert_eq!(a.to_string(), b.to_string());

        let c = parse("tier notin (db), tier in (web,api), tier notin (cache)");
        let d = parse("tier notin (cache), tier in (api,web), tier notin (db)");
        assert_eq!(c.to_string(), d.to_string());
        assert_eq!(
            c.to_string(),
            "tier in (api,web),tier notin (cache),tier notin (db)"
        );
    }

    #[test]
    fn test_prefixed_keys() {
        assert_eq!(
            parse("goharbor.io/scope=project").to_string(),
            "goharbor.io/scope=project"
        );
        assert!("Goharbor.io/scope=project".parse::<Selector>().is_err());
        assert!("/scope=project".parse::<Selector>().is_err());
    }

    #[test]
    fn test_invalid_expressions() {
        let cases = [
            "=prod",
            "env=prod,",
            ",env=prod",
            "env=prod,,tier=web",
            "env in (a,b",
            "env in a,b)",
            "env in ()",
            "env within (a)",
            "env in (a) extra",
            "env in ((a))",
            "bad key=value",
            "env=-prod",
            "env=pr od",
        ];
        for case in cases {
            assert!(
                case.parse::<Selector>().is_err(),
                "expected '{case}' to be rejected"
            );
        }
    }

    #[test]
    fn test_name_length_limit() {
        let long = "a".repeat(MAX_NAME_LENGTH + 1);
        assert!(format!("{long}=x").parse::<Selector>().is_err());
        assert!(format!("k={long}").parse::<Selector>().is_err());

        let max = "a".repeat(MAX_NAME_LENGTH);
        assert!(format!("{max}={max}").parse::<Selector>().is_ok());
    }

    #[test]
    fn test_error_includes_expression() {
        let error = "env in (a".parse::<Selector>().unwrap_err();
        assert_eq!(error.expression, "env in (a");
        assert!(error.to_string().contains("missing ')'"));
    }
}
