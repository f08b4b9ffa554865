//! Records, questions and session history.

use serde::de::{self, MapAccess, Visitor};
use serde::ser::SerializeMap;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;

/// A single attribute value stored for a candidate entity.
///
/// An attribute that is missing from a [`Record`] altogether is "absent";
/// `Unknown` is an explicit unknown marker stored in the record.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum AttributeValue {
    Known(String),
    Unknown,
}

impl AttributeValue {
    pub fn known(value: impl Into<String>) -> Self {
        Self::Known(value.into())
    }

    /// The value, if it is known.
    pub fn as_known(&self) -> Option<&str> {
        match self {
            Self::Known(value) => Some(value),
            Self::Unknown => None,
        }
    }

    pub fn is_known(&self) -> bool {
        matches!(self, Self::Known(_))
    }
}

impl From<&str> for AttributeValue {
    fn from(value: &str) -> Self {
        Self::Known(value.to_string())
    }
}

impl From<String> for AttributeValue {
    fn from(value: String) -> Self {
        Self::Known(value)
    }
}

impl From<Option<&str>> for AttributeValue {
    fn from(value: Option<&str>) -> Self {
        value.map_or(Self::Unknown, Self::from)
    }
}

impl Serialize for AttributeValue {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            Self::Known(value) => serializer.serialize_str(value),
            Self::Unknown => serializer.serialize_none(),
        }
    }
}

struct AttributeValueVisitor;

impl<'de> Visitor<'de> for AttributeValueVisitor {
    type Value = AttributeValue;

    fn expecting(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str("a string, number, boolean or null")
    }

    fn visit_str<E: de::Error>(self, v: &str) -> Result<Self::Value, E> {
        Ok(AttributeValue::known(v))
    }

    fn visit_string<E: de::Error>(self, v: String) -> Result<Self::Value, E> {
        Ok(AttributeValue::Known(v))
    }

    fn visit_bool<E: de::Error>(self, v: bool) -> Result<Self::Value, E> {
        Ok(AttributeValue::Known(v.to_string()))
    }

    fn visit_i64<E: de::Error>(self, v: i64) -> Result<Self::Value, E> {
        Ok(AttributeValue::Known(v.to_string()))
    }

    fn visit_u64<E: de::Error>(self, v: u64) -> Result<Self::Value, E> {
        Ok(AttributeValue::Known(v.to_string()))
    }

    fn visit_f64<E: de::Error>(self, v: f64) -> Result<Self::Value, E> {
        if v.is_nan() {
            return Ok(AttributeValue::Unknown);
        }
        Ok(AttributeValue::Known(v.to_string()))
    }

    fn visit_unit<E: de::Error>(self) -> Result<Self::Value, E> {
        Ok(AttributeValue::Unknown)
    }

    fn visit_none<E: de::Error>(self) -> Result<Self::Value, E> {
        Ok(AttributeValue::Unknown)
    }

    fn visit_some<D: Deserializer<'de>>(self, deserializer: D) -> Result<Self::Value, D::Error> {
        deserializer.deserialize_any(self)
    }
}

impl<'de> Deserialize<'de> for AttributeValue {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        deserializer.deserialize_any(AttributeValueVisitor)
    }
}

/// One candidate entity: an ordered, sparse mapping of attribute names to values.
///
/// Insertion order is preserved; it defines the column order of the
/// dataset view built from a set of records.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Record {
    fields: Vec<(String, AttributeValue)>,
}

impl Record {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder-style insertion.
    pub fn with(mut self, name: impl Into<String>, value: impl Into<AttributeValue>) -> Self {
        self.insert(name, value);
        self
    }

    /// Insert or replace an attribute, keeping the original position on replace.
    pub fn insert(&mut self, name: impl Into<String>, value: impl Into<AttributeValue>) {
        let name = name.into();
        let value = value.into();
        match self.fields.iter_mut().find(|(field, _)| *field == name) {
            Some((_, slot)) => *slot = value,
            None => self.fields.push((name, value)),
        }
    }

    pub fn get(&self, name: &str) -> Option<&AttributeValue> {
        self.fields
            .iter()
            .find(|(field, _)| field == name)
            .map(|(_, value)| value)
    }

    /// The known value of an attribute; `None` when absent or unknown.
    pub fn known(&self, name: &str) -> Option<&str> {
        self.get(name).and_then(AttributeValue::as_known)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.get(name).is_some()
    }

    pub fn remove(&mut self, name: &str) -> Option<AttributeValue> {
        let index = self.fields.iter().position(|(field, _)| field == name)?;
        Some(self.fields.remove(index).1)
    }

    pub fn attributes(&self) -> impl Iterator<Item = &str> {
        self.fields.iter().map(|(name, _)| name.as_str())
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &AttributeValue)> {
        self.fields.iter().map(|(name, value)| (name.as_str(), value))
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }
}

impl<K: Into<String>, V: Into<AttributeValue>> FromIterator<(K, V)> for Record {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut record = Record::new();
        for (name, value) in iter {
            record.insert(name, value);
        }
        record
    }
}

impl Serialize for Record {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.fields.len()))?;
        for (name, value) in &self.fields {
            map.serialize_entry(name, value)?;
        }
        map.end()
    }
}

struct RecordVisitor;

impl<'de> Visitor<'de> for RecordVisitor {
    type Value = Record;

    fn expecting(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str("an object mapping attribute names to values")
    }

    fn visit_map<A: MapAccess<'de>>(self, mut access: A) -> Result<Self::Value, A::Error> {
        let mut record = Record::new();
        while let Some((name, value)) = access.next_entry::<String, AttributeValue>()? {
            record.insert(name, value);
        }
        Ok(record)
    }
}

impl<'de> Deserialize<'de> for Record {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        deserializer.deserialize_map(RecordVisitor)
    }
}

/// A question asked during a session, with the answer if one was given.
///
/// A question without an answer was asked but answered "unknown"; it never
/// excludes candidates.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Question {
    pub name: String,
    #[serde(default)]
    pub answer: Option<String>,
}

impl Question {
    pub fn answered(name: impl Into<String>, answer: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            answer: Some(answer.into()),
        }
    }

    pub fn unknown(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            answer: None,
        }
    }

    /// The answer, unless it is missing or empty. An empty answer counts as
    /// unknown.
    pub fn known_answer(&self) -> Option<&str> {
        self.answer.as_deref().filter(|answer| !answer.is_empty())
    }

    pub fn is_answered(&self) -> bool {
        self.known_answer().is_some()
    }
}

/// Ordered questions accumulated across turns.
///
/// The order only matters for depth counting and auditing.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct History {
    questions: Vec<Question>,
}

impl History {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, question: Question) {
        self.questions.push(question);
    }

    pub fn len(&self) -> usize {
        self.questions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.questions.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Question> {
        self.questions.iter()
    }

    /// Questions that carry an answer and therefore filter candidates.
    pub fn answered(&self) -> impl Iterator<Item = (&str, &str)> {
        self.questions
            .iter()
            .filter_map(|q| q.known_answer().map(|answer| (q.name.as_str(), answer)))
    }

    pub fn was_asked(&self, attribute: &str) -> bool {
        self.questions.iter().any(|q| q.name == attribute)
    }

    pub fn questions(&self) -> &[Question] {
        &self.questions
    }
}

impl From<Vec<Question>> for History {
    fn from(questions: Vec<Question>) -> Self {
        Self { questions }
    }
}

impl FromIterator<Question> for History {
    fn from_iter<I: IntoIterator<Item = Question>>(iter: I) -> Self {
        Self {
            questions: iter.into_iter().collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_record_preserves_insertion_order() {
        let record = Record::new()
            .with("size", "big")
            .with("color", "red")
            .with("cls", "X");
        let names: Vec<&str> = record.attributes().collect();
        assert_eq!(names, vec!["size", "color", "cls"]);
    }

    #[test]
    fn test_record_insert_replaces_in_place() {
        let mut record = Record::new().with("a", "1").with("b", "2");
        record.insert("a", "3");
        assert_eq!(record.len(), 2);
        assert_eq!(record.known("a"), Some("3"));
        assert_eq!(record.attributes().next(), Some("a"));
    }

    #[test]
    fn test_absent_and_unknown_are_distinct() {
        let record = Record::new().with("hair", AttributeValue::Unknown);
        assert!(record.contains("hair"));
        assert_eq!(record.known("hair"), None);
        assert!(!record.contains("eyes"));
    }

    #[test]
    fn test_record_json_order_and_scalars() {
        let json = r#"{"name": "Naruto", "episodes": 220, "ninja": true, "hair": null}"#;
        let record: Record = serde_json::from_str(json).unwrap();

        let names: Vec<&str> = record.attributes().collect();
        assert_eq!(names, vec!["name", "episodes", "ninja", "hair"]);
        assert_eq!(record.known("episodes"), Some("220"));
        assert_eq!(record.known("ninja"), Some("true"));
        assert_eq!(record.get("hair"), Some(&AttributeValue::Unknown));

        let back = serde_json::to_string(&record).unwrap();
        assert_eq!(
            back,
            r#"{"name":"Naruto","episodes":"220","ninja":"true","hair":null}"#
        );
    }

    #[test]
    fn test_history_answered_filters_unknowns() {
        let history: History = vec![
            Question::answered("color", "red"),
            Question::unknown("size"),
        ]
        .into();

        let answered: Vec<(&str, &str)> = history.answered().collect();
        assert_eq!(answered, vec![("color", "red")]);
        assert!(history.was_asked("size"));
        assert_eq!(history.len(), 2);
    }

    #[test]
    fn test_empty_answer_counts_as_unknown() {
        let history: History = serde_json::from_str(
            r#"[{"name": "color", "answer": ""}, {"name": "size", "answer": "big"}]"#,
        )
        .unwrap();

        let answered: Vec<(&str, &str)> = history.answered().collect();
        assert_eq!(answered, vec![("size", "big")]);
        assert!(!history.questions()[0].is_answered());
        assert!(history.was_asked("color"));
    }

    #[test]
    fn test_question_json_defaults_answer() {
        let question: Question = serde_json::from_str(r#"{"name": "color"}"#).unwrap();
        assert_eq!(question, Question::unknown("color"));
    }
}
