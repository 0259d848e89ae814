use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::error::SwitchError;

// ============================================================================
// Switch table
// ============================================================================

/// Tokens passed through verbatim after all named switches.
pub const RAW: &str = "raw";

/// Tokens passed through verbatim in front of all named switches.
pub const WILDCARDS: &str = "wildcards";

/// Switches that may be given several times (`-i`, `-x`, `-m`, ...).
pub const REPEATABLE: &[&str] = &["i", "x", "m", "ai", "ax"];

/// Boolean switch whose `false` value is spelled out as `-ssc-`.
const CASE_SENSITIVE: &str = "ssc";

/// Value of a single archiver switch.
///
/// The shape decides how the switch is rendered:
/// - `Flag(true)` renders `-k`, `Flag(false)` renders nothing
/// - `Text(v)` renders `-kv`
/// - `List(vs)` renders one `-kv` per element (repeatable switches only)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum SwitchValue {
    Flag(bool),
    Text(String),
    List(Vec<String>),
}

impl SwitchValue {
    const fn shape(&self) -> &'static str {
        match self {
            Self::Flag(_) => "boolean",
            Self::Text(_) => "text",
            Self::List(_) => "list",
        }
    }
}

impl From<bool> for SwitchValue {
    fn from(value: bool) -> Self {
        Self::Flag(value)
    }
}

impl From<&str> for SwitchValue {
    fn from(value: &str) -> Self {
        Self::Text(value.to_string())
    }
}

impl From<String> for SwitchValue {
    fn from(value: String) -> Self {
        Self::Text(value)
    }
}

impl From<Vec<String>> for SwitchValue {
    fn from(value: Vec<String>) -> Self {
        Self::List(value)
    }
}

/// Archiver switches keyed by switch name (without the leading `-`).
///
/// Keys are kept in order, so serialization is deterministic regardless of the
/// order in which switches were set.
///
/// # Example
///
/// ```rust
/// use archrun_switches::Switches;
///
/// let switches = Switches::new()
///     .assume_yes(true)
///     .output_dir("/tmp/out")
///     .wildcards(["*.txt"]);
///
/// assert_eq!(
///     switches.to_args().unwrap(),
///     vec!["*.txt", "-o/tmp/out", "-y"]
/// );
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Switches {
    entries: BTreeMap<String, SwitchValue>,
}

impl Switches {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Set a switch to an arbitrary value, replacing any previous value.
    #[must_use]
    pub fn set(mut self, key: impl Into<String>, value: impl Into<SwitchValue>) -> Self {
        self.entries.insert(key.into(), value.into());
        self
    }

    /// Set a switch in place.
    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<SwitchValue>) {
        self.entries.insert(key.into(), value.into());
    }

    /// Remove a switch, returning its previous value.
    pub fn remove(&mut self, key: &str) -> Option<SwitchValue> {
        self.entries.remove(key)
    }

    #[must_use]
    pub fn get(&self, key: &str) -> Option<&SwitchValue> {
        self.entries.get(key)
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &SwitchValue)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v))
    }

    /// Password switch (`-p<password>`).
    #[must_use]
    pub fn password(self, password: impl Into<String>) -> Self {
        self.set("p", password.into())
    }

    /// Output directory switch (`-o<dir>`).
    #[must_use]
    pub fn output_dir(self, dir: impl Into<String>) -> Self {
        self.set("o", dir.into())
    }

    /// Archive type switch (`-t<type>`).
    #[must_use]
    pub fn archive_type(self, kind: impl Into<String>) -> Self {
        self.set("t", kind.into())
    }

    /// Recurse subdirectories (`-r`).
    #[must_use]
    pub fn recursive(self, on: bool) -> Self {
        self.set("r", on)
    }

    /// Assume yes on all queries (`-y`).
    #[must_use]
    pub fn assume_yes(self, on: bool) -> Self {
        self.set("y", on)
    }

    /// Append a compression method parameter (`-m<param>`).
    #[must_use]
    pub fn method(mut self, param: impl Into<String>) -> Self {
        self.push_list("m", param.into());
        self
    }

    /// Append an include pattern (`-i<pattern>`).
    #[must_use]
    pub fn include(mut self, pattern: impl Into<String>) -> Self {
        self.push_list("i", pattern.into());
        self
    }

    /// Append an exclude pattern (`-x<pattern>`).
    #[must_use]
    pub fn exclude(mut self, pattern: impl Into<String>) -> Self {
        self.push_list("x", pattern.into());
        self
    }

    /// Append tokens passed through verbatim after all other switches.
    #[must_use]
    pub fn raw<I, S>(mut self, tokens: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        for token in tokens {
            self.push_list(RAW, token.into());
        }
        self
    }

    /// Append tokens passed through verbatim before all other switches.
    #[must_use]
    pub fn wildcards<I, S>(mut self, patterns: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        for pattern in patterns {
            self.push_list(WILDCARDS, pattern.into());
        }
        self
    }

    /// Layer these switches over `defaults`; keys set here win.
    #[must_use]
    pub fn merged_over(&self, defaults: &Self) -> Self {
        let mut entries = defaults.entries.clone();
        entries.extend(self.entries.clone());
        Self { entries }
    }

    fn push_list(&mut self, key: &str, item: String) {
        let slot = self
            .entries
            .entry(key.to_string())
            .or_insert_with(|| SwitchValue::List(Vec::new()));
        match slot {
            SwitchValue::List(items) => items.push(item),
            SwitchValue::Text(existing) => {
                let first = std::mem::take(existing);
                *slot = SwitchValue::List(vec![first, item]);
            }
            SwitchValue::Flag(_) => *slot = SwitchValue::List(vec![item]),
        }
    }

    /// Serialize into command-line tokens.
    ///
    /// Order: wildcards, then named switches by key, then raw tokens.
    ///
    /// # Errors
    ///
    /// Returns [`SwitchError`] when a key is malformed or a value has a shape the
    /// switch does not support.
    pub fn to_args(&self) -> Result<Vec<String>, SwitchError> {
        let mut front = Vec::new();
        let mut named = Vec::new();
        let mut tail = Vec::new();

        for (key, value) in &self.entries {
            validate_key(key)?;
            match key.as_str() {
                WILDCARDS => front.extend(verbatim_tokens(key, value)?),
                RAW => tail.extend(verbatim_tokens(key, value)?),
                _ => push_named(&mut named, key, value)?,
            }
        }

        front.extend(named);
        front.extend(tail);
        Ok(front)
    }
}

/// Serialize optional switches into command-line tokens.
///
/// `None` and empty switches both yield an empty sequence.
///
/// # Errors
///
/// See [`Switches::to_args`].
pub fn serialize(switches: Option<&Switches>) -> Result<Vec<String>, SwitchError> {
    switches.map_or_else(|| Ok(Vec::new()), Switches::to_args)
}

fn validate_key(key: &str) -> Result<(), SwitchError> {
    let reason = if key.is_empty() {
        "name is empty"
    } else if key.starts_with('-') {
        "name must not include the leading '-'"
    } else if !key.chars().all(|c| c.is_ascii_alphanumeric()) {
        "name must be ASCII alphanumeric"
    } else {
        return Ok(());
    };

    Err(SwitchError::InvalidKey {
        key: key.to_string(),
        reason,
    })
}

fn validate_text(key: &str, value: &str) -> Result<(), SwitchError> {
    if value.is_empty() {
        return Err(SwitchError::EmptyValue {
            key: key.to_string(),
        });
    }
    if value.contains('\0') {
        return Err(SwitchError::InvalidValue {
            key: key.to_string(),
            reason: "contains a NUL byte",
        });
    }
    Ok(())
}

fn verbatim_tokens(key: &str, value: &SwitchValue) -> Result<Vec<String>, SwitchError> {
    let tokens = match value {
        SwitchValue::List(items) => items.clone(),
        SwitchValue::Text(item) => vec![item.clone()],
        SwitchValue::Flag(_) => {
            return Err(SwitchError::UnsupportedShape {
                key: key.to_string(),
                shape: value.shape(),
            });
        }
    };

    for token in &tokens {
        validate_text(key, token)?;
    }
    Ok(tokens)
}

fn push_named(out: &mut Vec<String>, key: &str, value: &SwitchValue) -> Result<(), SwitchError> {
    match value {
        SwitchValue::Flag(true) => out.push(format!("-{key}")),
        SwitchValue::Flag(false) if key == CASE_SENSITIVE => out.push(format!("-{key}-")),
        SwitchValue::Flag(false) => {}
        SwitchValue::Text(text) => {
            validate_text(key, text)?;
            out.push(format!("-{key}{text}"));
        }
        SwitchValue::List(items) if REPEATABLE.contains(&key) => {
            for item in items {
                validate_text(key, item)?;
                out.push(format!("-{key}{item}"));
            }
        }
        SwitchValue::List(_) => {
            return Err(SwitchError::UnsupportedShape {
                key: key.to_string(),
                shape: value.shape(),
            });
        }
    }
    Ok(())
}
