//! Launch argument values and their compact JSON encodings
use crate::game::launcher::rules::Rule;
use crate::game::version::decode::{decode_first, Shape};
use serde::de::Error as _;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use serde_json::value::RawValue;

/// One launch argument: a list of values gated by rule clauses.
///
/// On the wire this is a bare string, `{value: string, rules}` or
/// `{value: [string], rules}`; it is always written back in the most compact
/// of those that loses nothing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Argument {
    pub values: Vec<String>,
    pub rules: Vec<Rule>,
}

impl Argument {
    pub fn plain(value: impl Into<String>) -> Self {
        Self {
            values: vec![value.into()],
            rules: Vec::new(),
        }
    }

    pub fn conditional(values: Vec<String>, rules: Vec<Rule>) -> Self {
        Self { values, rules }
    }
}

#[derive(Deserialize)]
struct SingleValue {
    value: String,
    #[serde(default)]
    rules: Vec<Rule>,
}

#[derive(Deserialize)]
struct ManyValues {
    value: Vec<String>,
    #[serde(default)]
    rules: Vec<Rule>,
}

#[derive(Serialize)]
struct SingleValueRef<'a> {
    rules: &'a [Rule],
    value: &'a str,
}

#[derive(Serialize)]
struct ManyValuesRef<'a> {
    #[serde(skip_serializing_if = "<[Rule]>::is_empty")]
    rules: &'a [Rule],
    value: &'a [String],
}

fn from_string(s: &str) -> serde_json::Result<Argument> {
    serde_json::from_str::<String>(s).map(Argument::plain)
}

fn from_single(s: &str) -> serde_json::Result<Argument> {
    serde_json::from_str::<SingleValue>(s).map(|a| Argument::conditional(vec![a.value], a.rules))
}

fn from_many(s: &str) -> serde_json::Result<Argument> {
    serde_json::from_str::<ManyValues>(s).map(|a| Argument::conditional(a.value, a.rules))
}

const ARGUMENT_SHAPES: [Shape<Argument>; 3] = [
    Shape::new("string", from_string),
    Shape::new("single value", from_single),
    Shape::new("value list", from_many),
];

impl<'de> Deserialize<'de> for Argument {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = Box::<RawValue>::deserialize(deserializer)?;
        decode_first("argument", raw.get(), &ARGUMENT_SHAPES).map_err(D::Error::custom)
    }
}

impl Serialize for Argument {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self.values.as_slice() {
            [single] if self.rules.is_empty() => serializer.serialize_str(single),
            [single] => SingleValueRef {
                rules: &self.rules,
                value: single,
            }
            .serialize(serializer),
            values => ManyValuesRef {
                rules: &self.rules,
                value: values,
            }
            .serialize(serializer),
        }
    }
}
