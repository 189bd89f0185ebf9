//! Ordered label-to-text records.

use serde::ser::{Serialize, SerializeMap, Serializer};

/// One extracted table row: labels mapped to trimmed cell text.
///
/// Keeps the column order of the source table when serialized. Inserting a
/// label that is already present replaces its value in place, so a table
/// with repeated header text yields the last cell under that label.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Record {
    fields: Vec<(String, String)>,
}

impl Record {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, label: impl Into<String>, value: impl Into<String>) {
        let label = label.into();
        let value = value.into();
        match self.fields.iter_mut().find(|(existing, _)| *existing == label) {
            Some((_, slot)) => *slot = value,
            None => self.fields.push((label, value)),
        }
    }

    pub fn get(&self, label: &str) -> Option<&str> {
        self.fields
            .iter()
            .find(|(existing, _)| existing == label)
            .map(|(_, value)| value.as_str())
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    pub fn labels(&self) -> impl Iterator<Item = &str> {
        self.fields.iter().map(|(label, _)| label.as_str())
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.fields
            .iter()
            .map(|(label, value)| (label.as_str(), value.as_str()))
    }
}

impl<L: Into<String>, V: Into<String>> FromIterator<(L, V)> for Record {
    fn from_iter<I: IntoIterator<Item = (L, V)>>(iter: I) -> Self {
        let mut record = Record::new();
        for (label, value) in iter {
            record.insert(label, value);
        }
        record
    }
}

impl Serialize for Record {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.fields.len()))?;
        for (label, value) in &self.fields {
            map.serialize_entry(label, value)?;
        }
        map.end()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_insert_keeps_column_order() {
        let record: Record = [("RANK", "1"), ("SCHOOL", "Georgia"), ("POINTS", "1550")]
            .into_iter()
            .collect();
        assert_eq!(record.labels().collect::<Vec<_>>(), vec!["RANK", "SCHOOL", "POINTS"]);
        assert_eq!(
            serde_json::to_string(&record).unwrap(),
            r#"{"RANK":"1","SCHOOL":"Georgia","POINTS":"1550"}"#
        );
    }

    #[test]
    fn test_duplicate_label_replaces_in_place() {
        let mut record = Record::new();
        record.insert("W", "3");
        record.insert("L", "1");
        record.insert("W", "9");
        assert_eq!(record.len(), 2);
        assert_eq!(record.get("W"), Some("9"));
        assert_eq!(record.iter().next(), Some(("W", "9")));
    }
}
