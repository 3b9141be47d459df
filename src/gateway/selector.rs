use std::collections::BTreeMap;
use std::fmt;

use crate::GatewayError;
use crate::GatewayResult;

#[derive(Debug, Clone, PartialEq, Eq)]
enum Requirement {
    Equals(String, String),
    NotEquals(String, String),
    Exists(String),
    NotExists(String),
}

impl Requirement {
    fn matches(
        &self,
        labels: &BTreeMap<String, String>,
    ) -> bool {
        match self {
            Requirement::Equals(k, v) => labels.get(k) == Some(v),
            Requirement::NotEquals(k, v) => labels.get(k) != Some(v),
            Requirement::Exists(k) => labels.contains_key(k),
            Requirement::NotExists(k) => !labels.contains_key(k),
        }
    }
}

/// Equality/existence based label selector.
///
/// Grammar: comma separated requirements, all of which must hold:
/// `key=value`, `key==value`, `key!=value`, `key`, `!key`.
/// The empty selector matches everything.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LabelSelector {
    requirements: Vec<Requirement>,
}

impl LabelSelector {
    pub fn everything() -> Self {
        Self::default()
    }

    pub fn parse(raw: &str) -> GatewayResult<Self> {
        let mut requirements = Vec::new();

        for term in raw.split(',').map(str::trim) {
            if term.is_empty() {
                if raw.trim().is_empty() {
                    continue;
                }
                return Err(GatewayError::InvalidSelector(format!("empty requirement in {raw:?}")));
            }
            requirements.push(parse_requirement(term)?);
        }

        Ok(Self { requirements })
    }

    pub fn is_empty(&self) -> bool {
        self.requirements.is_empty()
    }

    pub fn matches(
        &self,
        labels: &BTreeMap<String, String>,
    ) -> bool {
        self.requirements.iter().all(|r| r.matches(labels))
    }
}

impl fmt::Display for LabelSelector {
    fn fmt(
        &self,
        f: &mut fmt::Formatter<'_>,
    ) -> fmt::Result {
        let terms: Vec<String> = self
            .requirements
            .iter()
            .map(|r| match r {
                Requirement::Equals(k, v) => format!("{k}={v}"),
                Requirement::NotEquals(k, v) => format!("{k}!={v}"),
                Requirement::Exists(k) => k.clone(),
                Requirement::NotExists(k) => format!("!{k}"),
            })
            .collect();
        f.write_str(&terms.join(","))
    }
}

fn parse_requirement(term: &str) -> GatewayResult<Requirement> {
    if let Some((k, v)) = term.split_once("!=") {
        return Ok(Requirement::NotEquals(key(k, term)?, value(v, term)?));
    }
    if let Some((k, v)) = term.split_once("==") {
        return Ok(Requirement::Equals(key(k, term)?, value(v, term)?));
    }
    if let Some((k, v)) = term.split_once('=') {
        return Ok(Requirement::Equals(key(k, term)?, value(v, term)?));
    }
    if let Some(k) = term.strip_prefix('!') {
        return Ok(Requirement::NotExists(key(k, term)?));
    }
    Ok(Requirement::Exists(key(term, term)?))
}

fn key(
    raw: &str,
    term: &str,
) -> GatewayResult<String> {
    let k = raw.trim();
    if k.is_empty() || !k.chars().all(is_label_char_or_separator) {
        return Err(GatewayError::InvalidSelector(format!("invalid key in {term:?}")));
    }
    Ok(k.to_string())
}

fn value(
    raw: &str,
    term: &str,
) -> GatewayResult<String> {
    let v = raw.trim();
    if !v.chars().all(is_label_char) {
        return Err(GatewayError::InvalidSelector(format!("invalid value in {term:?}")));
    }
    Ok(v.to_string())
}

fn is_label_char(c: char) -> bool {
    c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.')
}

// keys may carry a DNS prefix: `app.kubernetes.io/name`
fn is_label_char_or_separator(c: char) -> bool {
    is_label_char(c) || c == '/'
}
