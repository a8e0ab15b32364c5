//! Named typed parameters attached to file and dataset headers.
//!
//! A parameter's type tag is derived from its value's kind, so the two can
//! never disagree — consumers may branch on either. Identity (equality,
//! ordering, hashing) is by name only; the value and tag are metadata.
//!
//! On-disk: `[form: u8][name: string8][kind: u8][payload]`, where form 0 is
//! a plain parameter and form 1 appends `[default payload][required: u8]`.
//! A parameter list is `[count: u32]` followed by that many parameters.

use std::cmp::Ordering;
use std::hash::{Hash, Hasher};
use std::io::Write;

use serde::Serialize;

use crate::codec::{read_string8, read_u8_at, read_u32_at, string8_size, write_string8};
use crate::error::{FileError, Result};
use crate::value::{Value, ValueKind};

const FORM_PLAIN: u8 = 0;
const FORM_DEFAULT_REQUIRED: u8 = 1;

// ── Parameter ──────────────────────────────────────────────────────

/// One (name, typed value) pair.
#[derive(Debug, Clone, Serialize)]
pub struct Parameter {
    pub name: String,
    pub value: Value,
}

impl Parameter {
    pub fn new(name: impl Into<String>, value: Value) -> Self {
        Self {
            name: name.into(),
            value,
        }
    }

    /// Type tag string, always in agreement with `value.kind()`.
    pub fn type_tag(&self) -> &'static str {
        self.value.type_tag()
    }

    /// Serialized size including the form tag.
    pub fn serialized_size(&self) -> usize {
        1 + string8_size(&self.name) + 1 + self.value.payload_size()
    }

    pub fn write_to<W: Write>(&self, writer: &mut W) -> Result<()> {
        writer.write_all(&[FORM_PLAIN])?;
        write_string8(writer, &self.name)?;
        writer.write_all(&[self.value.kind() as u8])?;
        self.value.write_payload(writer)
    }
}

// Identity is by name only.
impl PartialEq for Parameter {
    fn eq(&self, other: &Self) -> bool {
        self.name == other.name
    }
}

impl Eq for Parameter {}

impl PartialOrd for Parameter {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Parameter {
    fn cmp(&self, other: &Self) -> Ordering {
        self.name.cmp(&other.name)
    }
}

impl Hash for Parameter {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.name.hash(state);
    }
}

// ── DefaultRequiredParameter ───────────────────────────────────────

/// A parameter carrying a default value and a required flag, used where a
/// consumer needs to distinguish "absent, use default" from "must be set".
#[derive(Debug, Clone, Serialize)]
pub struct DefaultRequiredParameter {
    pub name: String,
    pub value: Value,
    pub default: Value,
    pub required: bool,
}

impl DefaultRequiredParameter {
    pub fn new(
        name: impl Into<String>,
        value: Value,
        default: Value,
        required: bool,
    ) -> Self {
        Self {
            name: name.into(),
            value,
            default,
            required,
        }
    }

    pub fn type_tag(&self) -> &'static str {
        self.value.type_tag()
    }

    pub fn serialized_size(&self) -> usize {
        1 + string8_size(&self.name)
            + 1
            + self.value.payload_size()
            + self.default.payload_size()
            + 1
    }

    pub fn write_to<W: Write>(&self, writer: &mut W) -> Result<()> {
        writer.write_all(&[FORM_DEFAULT_REQUIRED])?;
        write_string8(writer, &self.name)?;
        writer.write_all(&[self.value.kind() as u8])?;
        self.value.write_payload(writer)?;
        self.default.write_payload(writer)?;
        writer.write_all(&[self.required as u8])?;
        Ok(())
    }
}

impl PartialEq for DefaultRequiredParameter {
    fn eq(&self, other: &Self) -> bool {
        self.name == other.name
    }
}

impl Eq for DefaultRequiredParameter {}

impl PartialOrd for DefaultRequiredParameter {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for DefaultRequiredParameter {
    fn cmp(&self, other: &Self) -> Ordering {
        self.name.cmp(&other.name)
    }
}

// ── Parameter lists ────────────────────────────────────────────────

/// Serialized size of a parameter list (u32 count + parameters).
pub fn param_list_size(params: &[Parameter]) -> usize {
    4 + params.iter().map(Parameter::serialized_size).sum::<usize>()
}

pub fn write_param_list<W: Write>(writer: &mut W, params: &[Parameter]) -> Result<()> {
    writer.write_all(&(params.len() as u32).to_le_bytes())?;
    for param in params {
        param.write_to(writer)?;
    }
    Ok(())
}

/// Parse a parameter list at `pos`. A default/required parameter read from a
/// list is surfaced as its plain (name, value) view; the default and flag are
/// consumed so the stream stays aligned.
pub fn read_param_list(bytes: &[u8], pos: usize) -> Result<(Vec<Parameter>, usize)> {
    let count = read_u32_at(bytes, pos, "parameter list")? as usize;
    let mut pos = pos + 4;
    let mut params = Vec::with_capacity(count.min(1024));
    for _ in 0..count {
        let form = read_u8_at(bytes, pos, "parameter form")?;
        let (name, after_name) = read_string8(bytes, pos + 1, "parameter name")?;
        let kind_tag = read_u8_at(bytes, after_name, "parameter kind")?;
        let kind = ValueKind::from_u8(kind_tag).ok_or_else(|| {
            FileError::MalformedHeader(format!("unknown parameter kind tag {}", kind_tag))
        })?;
        let (value, after_value) = Value::read_payload(kind, bytes, after_name + 1)?;
        pos = match form {
            FORM_PLAIN => after_value,
            FORM_DEFAULT_REQUIRED => {
                let (_default, after_default) = Value::read_payload(kind, bytes, after_value)?;
                read_u8_at(bytes, after_default, "required flag")?;
                after_default + 1
            }
            other => {
                return Err(FileError::MalformedHeader(format!(
                    "unknown parameter form {}",
                    other
                )))
            }
        };
        params.push(Parameter { name, value });
    }
    Ok((params, pos))
}

/// Find a parameter by name.
pub fn find_param<'a>(params: &'a [Parameter], name: &str) -> Option<&'a Parameter> {
    params.iter().find(|p| p.name == name)
}
