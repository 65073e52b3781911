use std::fmt;

use indexmap::IndexMap;
use num_bigint::BigInt;
use num_traits::{ToPrimitive, Zero};
use serde::ser::{SerializeMap, SerializeSeq};
use serde::{Deserialize, Deserializer, Serialize, Serializer};

/// Longest piece of user input echoed back inside an error message.
pub const ECHO_LIMIT: usize = 20;

/// A dynamically shaped argument value.
///
/// Raw user input and normalized output share this type, so a normalized
/// value can be fed through the validator again.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum Value {
    #[default]
    Null,
    Bool(bool),
    Int(BigInt),
    Str(String),
    Array(Vec<Value>),
    Object(IndexMap<String, Value>),
}

impl Value {
    /// Parse JSON text, returning `None` if it is not valid JSON.
    pub fn parse_json(text: &str) -> Option<Value> {
        serde_json::from_str::<serde_json::Value>(text)
            .ok()
            .map(Value::from)
    }

    /// Take command line or form text as JSON when it parses, otherwise as
    /// a plain string.
    pub fn from_input(text: &str) -> Value {
        Value::parse_json(text).unwrap_or_else(|| Value::Str(text.to_owned()))
    }

    /// Javascript truthiness: `null`, `false`, `""` and `0` are falsy.
    pub fn is_truthy(&self) -> bool {
        match self {
            Value::Null => false,
            Value::Bool(b) => *b,
            Value::Int(n) => !n.is_zero(),
            Value::Str(s) => !s.is_empty(),
            Value::Array(_) | Value::Object(_) => true,
        }
    }

    /// Nothing was entered: `null`, an empty string, or an empty collection.
    pub fn is_empty(&self) -> bool {
        match self {
            Value::Null => true,
            Value::Str(s) => s.is_empty(),
            Value::Array(items) => items.is_empty(),
            Value::Object(map) => map.is_empty(),
            Value::Bool(_) | Value::Int(_) => false,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::Str(s) => Some(s),
            _ => None,
        }
    }

    /// The value as it is echoed in error messages, cut at [`ECHO_LIMIT`]
    /// characters.
    pub fn echo(&self) -> String {
        let text = self.to_string();

        if text.chars().count() > ECHO_LIMIT {
            let head: String = text.chars().take(ECHO_LIMIT).collect();
            format!("{head}...")
        } else {
            text
        }
    }

    pub fn to_json(&self) -> serde_json::Value {
        match self {
            Value::Null => serde_json::Value::Null,
            Value::Bool(b) => serde_json::Value::Bool(*b),
            Value::Int(n) => {
                if let Some(v) = n.to_i64() {
                    v.into()
                } else if let Some(v) = n.to_u64() {
                    v.into()
                } else {
                    serde_json::Value::String(n.to_string())
                }
            }
            Value::Str(s) => serde_json::Value::String(s.clone()),
            Value::Array(items) => {
                serde_json::Value::Array(items.iter().map(Value::to_json).collect())
            }
            Value::Object(map) => serde_json::Value::Object(
                map.iter()
                    .map(|(key, value)| (key.clone(), value.to_json()))
                    .collect(),
            ),
        }
    }
}

/// Decimal digits beyond which `Number()` overflows to `Infinity`.
const MAX_DECIMAL_DIGITS: i64 = 309;

/// Integer text as `Number()` reads it, restricted to integral results.
///
/// Accepts an optionally signed decimal with optional fraction and exponent
/// (`"-12"`, `"10.0"`, `"1e3"`, `"1.5E2"`), or an unsigned `0x`, `0o` or
/// `0b` literal. Blank text is zero.
pub fn parse_integer(text: &str) -> Option<BigInt> {
    let text = text.trim();

    if text.is_empty() {
        return Some(BigInt::zero());
    }

    let prefix = text.get(..2).map(str::to_ascii_lowercase);
    let radix = match prefix.as_deref() {
        Some("0x") => Some(16),
        Some("0o") => Some(8),
        Some("0b") => Some(2),
        _ => None,
    };

    if let Some(radix) = radix {
        let digits = &text[2..];
        if digits.is_empty() || !digits.chars().all(|c| c.is_digit(radix)) {
            return None;
        }
        return BigInt::parse_bytes(digits.as_bytes(), radix);
    }

    let (negative, unsigned) = match text.strip_prefix('-') {
        Some(rest) => (true, rest),
        None => (false, text.strip_prefix('+').unwrap_or(text)),
    };

    let (mantissa, exponent) = match unsigned.find(|c: char| c == 'e' || c == 'E') {
        Some(at) => (&unsigned[..at], unsigned[at + 1..].parse::<i64>().ok()?),
        None => (unsigned, 0),
    };

    let (int_part, fraction) = mantissa.split_once('.').unwrap_or((mantissa, ""));

    if int_part.is_empty() && fraction.is_empty() {
        return None;
    }
    if !int_part.bytes().chain(fraction.bytes()).all(|b| b.is_ascii_digit()) {
        return None;
    }

    let digits = format!("{int_part}{fraction}");
    let significant = digits.trim_start_matches('0');

    if significant.is_empty() {
        return Some(BigInt::zero());
    }

    let scale = exponent.checked_sub(i64::try_from(fraction.len()).ok()?)?;
    let width = i64::try_from(significant.len()).ok()?.checked_add(scale)?;

    if width > MAX_DECIMAL_DIGITS {
        return None;
    }

    let integral = if scale >= 0 {
        format!("{significant}{}", "0".repeat(usize::try_from(scale).ok()?))
    } else {
        let cut = usize::try_from(-scale).ok()?;
        if cut >= significant.len() {
            return None;
        }
        let (head, tail) = significant.split_at(significant.len() - cut);
        if !tail.bytes().all(|b| b == b'0') {
            return None;
        }
        head.to_owned()
    };

    let n = BigInt::parse_bytes(integral.as_bytes(), 10)?;

    Some(if negative { -n } else { n })
}

impl From<serde_json::Value> for Value {
    fn from(json: serde_json::Value) -> Self {
        match json {
            serde_json::Value::Null => Value::Null,
            serde_json::Value::Bool(b) => Value::Bool(b),
            // Number text is exact, so integers of any width survive.
            serde_json::Value::Number(n) => {
                let text = n.to_string();
                match parse_integer(&text) {
                    Some(v) => Value::Int(v),
                    None => Value::Str(text),
                }
            }
            serde_json::Value::String(s) => Value::Str(s),
            serde_json::Value::Array(items) => {
                Value::Array(items.into_iter().map(Value::from).collect())
            }
            serde_json::Value::Object(map) => Value::Object(
                map.into_iter()
                    .map(|(key, value)| (key, Value::from(value)))
                    .collect(),
            ),
        }
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::Str(s.to_owned())
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Value::Bool(b)
    }
}

impl From<i64> for Value {
    fn from(n: i64) -> Self {
        Value::Int(n.into())
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Str(s) => f.write_str(s),
            _ => f.write_str(&self.to_json().to_string()),
        }
    }
}

impl Serialize for Value {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            Value::Null => serializer.serialize_unit(),
            Value::Bool(b) => serializer.serialize_bool(*b),
            Value::Int(n) => {
                if let Some(v) = n.to_i64() {
                    serializer.serialize_i64(v)
                } else if let Some(v) = n.to_u64() {
                    serializer.serialize_u64(v)
                } else {
                    serializer.serialize_str(&n.to_string())
                }
            }
            Value::Str(s) => serializer.serialize_str(s),
            Value::Array(items) => {
                let mut seq = serializer.serialize_seq(Some(items.len()))?;
                for item in items {
                    seq.serialize_element(item)?;
                }
                seq.end()
            }
            Value::Object(entries) => {
                let mut map = serializer.serialize_map(Some(entries.len()))?;
                for (key, value) in entries {
                    map.serialize_entry(key, value)?;
                }
                map.end()
            }
        }
    }
}

impl<'de> Deserialize<'de> for Value {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        serde_json::Value::deserialize(deserializer).map(Value::from)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn integers() {
        assert_eq!(parse_integer("42"), Some(42.into()));
        assert_eq!(parse_integer(" -7 "), Some((-7).into()));
        assert_eq!(parse_integer("+3"), Some(3.into()));
        assert_eq!(parse_integer("0x1f"), Some(31.into()));
        assert_eq!(parse_integer("0o17"), Some(15.into()));
        assert_eq!(parse_integer("0B101"), Some(5.into()));
        assert_eq!(parse_integer("10.000"), Some(10.into()));
        assert_eq!(parse_integer("5."), Some(5.into()));
        assert_eq!(parse_integer("1e3"), Some(1000.into()));
        assert_eq!(parse_integer("1.5E2"), Some(150.into()));
        assert_eq!(parse_integer("2500e-2"), Some(25.into()));
        assert_eq!(parse_integer("-1e+2"), Some((-100).into()));
        assert_eq!(parse_integer("   "), Some(0.into()));
        assert_eq!(parse_integer("0.0e5"), Some(0.into()));

        assert_eq!(parse_integer("1.5"), None);
        assert_eq!(parse_integer("1e-3"), None);
        assert_eq!(parse_integer("15e-1"), None);
        assert_eq!(parse_integer(".5"), None);
        assert_eq!(parse_integer("."), None);
        assert_eq!(parse_integer("1e"), None);
        assert_eq!(parse_integer("1e400"), None);
        assert_eq!(parse_integer("NaN"), None);
        assert_eq!(parse_integer("Infinity"), None);
        assert_eq!(parse_integer("0x"), None);
        assert_eq!(parse_integer("0b102"), None);
        assert_eq!(parse_integer("-0x10"), None);
        assert_eq!(parse_integer("-"), None);
        assert_eq!(parse_integer("12abc"), None);
    }

    #[test]
    fn wide_json_integers_stay_exact() {
        let max = "340282366920938463463374607431768211455";
        let expected: BigInt = max.parse().unwrap();

        assert_eq!(Value::from_input(max), Value::Int(expected.clone()));
        assert_eq!(
            Value::parse_json(&format!("[{max}, 20000000000000000000]")),
            Some(Value::Array(vec![
                Value::Int(expected),
                Value::Int("20000000000000000000".parse().unwrap()),
            ]))
        );

        assert_eq!(Value::from_input("1.25"), Value::Str("1.25".into()));
        assert_eq!(Value::from_input("1e3"), Value::from(1000));
    }

    #[test]
    fn echo_is_cut() {
        let long = Value::Str("abcdefghijklmnopqrstuvwxyz".into());
        assert_eq!(long.echo(), "abcdefghijklmnopqrst...");

        let short = Value::Str("abc".into());
        assert_eq!(short.echo(), "abc");

        let array = Value::parse_json("[1,2,3]").unwrap();
        assert_eq!(array.echo(), "[1,2,3]");
    }

    #[test]
    fn truthiness() {
        assert!(!Value::Null.is_truthy());
        assert!(!Value::Str(String::new()).is_truthy());
        assert!(!Value::from(0).is_truthy());
        assert!(Value::from("0").is_truthy());
        assert!(Value::Array(Vec::new()).is_truthy());
    }

    #[test]
    fn big_integers_serialize_as_strings() {
        let big = Value::Int("340282366920938463463374607431768211455".parse().unwrap());
        assert_eq!(
            serde_json::to_string(&big).unwrap(),
            "\"340282366920938463463374607431768211455\""
        );
        assert_eq!(serde_json::to_string(&Value::from(-5)).unwrap(), "-5");
    }
}
