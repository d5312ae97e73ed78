//! Typed-value codec for request-address parameters.
//!
//! Wire format (one parameter):
//! ```text
//! text      name=value
//! integer   name+integer=42
//! float     name+float=1.5
//! list      name+list=a,b,c        (empty list: name+list=)
//! map       name+map=k1=v1;k2=v2   (empty map:  name+map=)
//! ```
//! Parameters are joined with `&`. The form stays human-typeable, so there is
//! no escape for `,` `;` `=` inside list or map values: such values are
//! rejected. Only characters the query transport cannot carry literally are
//! percent-encoded.

use percent_encoding::{percent_decode_str, utf8_percent_encode, AsciiSet, CONTROLS};
use std::collections::HashSet;

use crate::types::{Error, Result};

/// Type suffix for integers.
pub const TYPE_INTEGER: &str = "integer";
/// Type suffix for floats.
pub const TYPE_FLOAT: &str = "float";
/// Type suffix for ordered lists.
pub const TYPE_LIST: &str = "list";
/// Type suffix for mappings.
pub const TYPE_MAP: &str = "map";

/// Separates list elements.
pub const LIST_SEPARATOR: char = ',';
/// Separates map entries.
pub const ENTRY_SEPARATOR: char = ';';
/// Separates a map key from its value, and a parameter key from its value.
pub const KEY_VALUE_SEPARATOR: char = '=';
/// Separates a parameter name from its type suffix.
pub const TYPE_SEPARATOR: char = '+';
/// Separates parameters in a query.
pub const PARAM_SEPARATOR: char = '&';

/// Characters escaped for the query transport.
const QUERY_ESCAPE: &AsciiSet = &CONTROLS
    .add(b' ')
    .add(b'"')
    .add(b'#')
    .add(b'%')
    .add(b'&')
    .add(b'+')
    .add(b'<')
    .add(b'>')
    .add(b'`')
    .add(b'{')
    .add(b'}');

/// Characters that may not appear in a parameter name.
const NAME_RESERVED: &[char] = &['+', '=', '&', '?', '#', '/', '%'];

/// A parameter value with an explicit wire type.
///
/// List elements and map values are text; nested typed values have no wire
/// form and fail to encode.
#[derive(Debug, Clone, PartialEq)]
pub enum TypedValue {
    Text(String),
    Integer(i64),
    Float(f64),
    List(Vec<TypedValue>),
    Map(Vec<(String, TypedValue)>),
}

impl TypedValue {
    /// Build a list of text elements.
    pub fn list<I, S>(items: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self::List(items.into_iter().map(|s| Self::Text(s.into())).collect())
    }

    /// Build a mapping of text values, preserving the given order.
    pub fn map<I, K, V>(entries: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        Self::Map(
            entries
                .into_iter()
                .map(|(k, v)| (k.into(), Self::Text(v.into())))
                .collect(),
        )
    }

    /// Wire type suffix, `None` for plain text.
    pub fn type_tag(&self) -> Option<&'static str> {
        match self {
            Self::Text(_) => None,
            Self::Integer(_) => Some(TYPE_INTEGER),
            Self::Float(_) => Some(TYPE_FLOAT),
            Self::List(_) => Some(TYPE_LIST),
            Self::Map(_) => Some(TYPE_MAP),
        }
    }

    pub fn as_text(&self) -> Option<&str> {
        match self {
            Self::Text(s) => Some(s),
            _ => None,
        }
    }
}

impl From<&str> for TypedValue {
    fn from(s: &str) -> Self {
        Self::Text(s.to_string())
    }
}

impl From<String> for TypedValue {
    fn from(s: String) -> Self {
        Self::Text(s)
    }
}

impl From<i64> for TypedValue {
    fn from(n: i64) -> Self {
        Self::Integer(n)
    }
}

impl From<i32> for TypedValue {
    fn from(n: i32) -> Self {
        Self::Integer(i64::from(n))
    }
}

impl From<u32> for TypedValue {
    fn from(n: u32) -> Self {
        Self::Integer(i64::from(n))
    }
}

impl From<f64> for TypedValue {
    fn from(f: f64) -> Self {
        Self::Float(f)
    }
}

/// Encode one parameter as `name[+type]=value`.
pub fn encode(name: &str, value: &TypedValue) -> Result<String> {
    validate_name(name)?;

    let body = match value {
        TypedValue::Text(s) => escape(s),
        TypedValue::Integer(n) => n.to_string(),
        TypedValue::Float(f) => {
            if !f.is_finite() {
                return Err(Error::unencodable(
                    name,
                    f.to_string(),
                    "non-finite floats have no decimal form",
                ));
            }
            f.to_string()
        }
        TypedValue::List(items) => encode_list(name, items)?,
        TypedValue::Map(entries) => encode_map(name, entries)?,
    };

    Ok(match value.type_tag() {
        Some(tag) => format!("{name}{TYPE_SEPARATOR}{tag}{KEY_VALUE_SEPARATOR}{body}"),
        None => format!("{name}{KEY_VALUE_SEPARATOR}{body}"),
    })
}

/// Encode an ordered parameter list, joined with `&` in the given order.
pub fn encode_params(params: &[(String, TypedValue)]) -> Result<String> {
    let mut seen = HashSet::with_capacity(params.len());
    let mut encoded = Vec::with_capacity(params.len());

    for (name, value) in params {
        if !seen.insert(name.as_str()) {
            return Err(Error::duplicate_key("parameters", name.clone()));
        }
        encoded.push(encode(name, value)?);
    }

    Ok(encoded.join("&"))
}

/// Decode one `name[+type]=value` parameter.
pub fn decode(wire: &str) -> Result<(String, TypedValue)> {
    let (key, raw) = wire
        .split_once(KEY_VALUE_SEPARATOR)
        .ok_or_else(|| Error::malformed_param(wire, "missing '='"))?;

    let (name, tag) = match key.split_once(TYPE_SEPARATOR) {
        Some((name, tag)) => (name, Some(tag)),
        None => (key, None),
    };
    if name.is_empty() {
        return Err(Error::malformed_param(wire, "empty parameter name"));
    }

    let value = match tag {
        None => TypedValue::Text(unescape(wire, raw)?),
        Some(TYPE_INTEGER) => raw
            .parse::<i64>()
            .map(TypedValue::Integer)
            .map_err(|_| mismatch(name, TYPE_INTEGER, raw))?,
        Some(TYPE_FLOAT) => match raw.parse::<f64>() {
            Ok(f) if f.is_finite() => TypedValue::Float(f),
            _ => return Err(mismatch(name, TYPE_FLOAT, raw)),
        },
        Some(TYPE_LIST) => decode_list(wire, raw)?,
        Some(TYPE_MAP) => decode_map(wire, name, raw)?,
        Some(other) => {
            return Err(Error::malformed_param(
                wire,
                format!("unknown type '{other}'"),
            ))
        }
    };

    Ok((name.to_string(), value))
}

/// Decode an `&`-joined parameter string, preserving order.
pub fn decode_params(query: &str) -> Result<Vec<(String, TypedValue)>> {
    let query = query.strip_prefix('?').unwrap_or(query);
    query
        .split(PARAM_SEPARATOR)
        .filter(|piece| !piece.is_empty())
        .map(decode)
        .collect()
}

fn validate_name(name: &str) -> Result<()> {
    let reserved = name
        .chars()
        .any(|c| NAME_RESERVED.contains(&c) || c.is_whitespace() || c.is_control());
    if name.is_empty() || reserved {
        return Err(Error::InvalidParamName {
            name: name.to_string(),
        });
    }
    Ok(())
}

fn encode_list(name: &str, items: &[TypedValue]) -> Result<String> {
    let mut parts = Vec::with_capacity(items.len());
    for item in items {
        let text = nested_text(name, item)?;
        if text.is_empty() {
            return Err(Error::unencodable(
                name,
                text,
                "empty list element is indistinguishable from an empty list",
            ));
        }
        if text.contains(LIST_SEPARATOR) {
            return Err(Error::unencodable(
                name,
                text,
                "list element contains ','",
            ));
        }
        parts.push(escape(text));
    }
    Ok(parts.join(","))
}

fn encode_map(name: &str, entries: &[(String, TypedValue)]) -> Result<String> {
    let mut seen = HashSet::with_capacity(entries.len());
    let mut parts = Vec::with_capacity(entries.len());

    for (key, value) in entries {
        if !seen.insert(key.as_str()) {
            return Err(Error::duplicate_key(name, key.clone()));
        }
        if key.is_empty() || key.contains([ENTRY_SEPARATOR, KEY_VALUE_SEPARATOR]) {
            return Err(Error::unencodable(
                name,
                key.clone(),
                "map key is empty or contains ';' or '='",
            ));
        }
        let text = nested_text(name, value)?;
        if text.contains([ENTRY_SEPARATOR, KEY_VALUE_SEPARATOR]) {
            return Err(Error::unencodable(
                name,
                text,
                "map value contains ';' or '='",
            ));
        }
        parts.push(format!("{}={}", escape(key), escape(text)));
    }

    Ok(parts.join(";"))
}

fn nested_text<'a>(name: &str, value: &'a TypedValue) -> Result<&'a str> {
    value.as_text().ok_or_else(|| {
        Error::unencodable(
            name,
            format!("{value:?}"),
            "list elements and map values must be text",
        )
    })
}

fn decode_list(wire: &str, raw: &str) -> Result<TypedValue> {
    if raw.is_empty() {
        return Ok(TypedValue::List(Vec::new()));
    }
    raw.split(LIST_SEPARATOR)
        .map(|item| {
            if item.is_empty() {
                return Err(Error::malformed_param(wire, "empty list element"));
            }
            unescape(wire, item).map(TypedValue::Text)
        })
        .collect::<Result<Vec<_>>>()
        .map(TypedValue::List)
}

fn decode_map(wire: &str, name: &str, raw: &str) -> Result<TypedValue> {
    if raw.is_empty() {
        return Ok(TypedValue::Map(Vec::new()));
    }

    let mut entries: Vec<(String, TypedValue)> = Vec::new();
    for entry in raw.split(ENTRY_SEPARATOR) {
        let (key, value) = entry
            .split_once(KEY_VALUE_SEPARATOR)
            .ok_or_else(|| Error::malformed_param(wire, format!("map entry {entry:?} has no '='")))?;
        let key = unescape(wire, key)?;
        if key.is_empty() {
            return Err(Error::malformed_param(wire, "empty map key"));
        }
        if entries.iter().any(|(k, _)| *k == key) {
            return Err(Error::duplicate_key(name, key));
        }
        entries.push((key, TypedValue::Text(unescape(wire, value)?)));
    }

    Ok(TypedValue::Map(entries))
}

fn escape(s: &str) -> String {
    utf8_percent_encode(s, QUERY_ESCAPE).to_string()
}

fn unescape(wire: &str, s: &str) -> Result<String> {
    percent_decode_str(s)
        .decode_utf8()
        .map(|decoded| decoded.into_owned())
        .map_err(|e| Error::malformed_param(wire, format!("invalid utf-8 after unescaping: {e}")))
}

fn mismatch(name: &str, expected: &'static str, literal: &str) -> Error {
    Error::TypeMismatch {
        name: name.to_string(),
        expected,
        literal: literal.to_string(),
    }
}
