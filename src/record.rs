use std::fmt;
use std::str::FromStr;

use chrono::{Local, NaiveDateTime};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::LedgerError;
use crate::money::Amount;

#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum Category {
    Income,
    Expense,
}

impl Category {
    pub fn as_str(&self) -> &'static str {
        match self {
            Category::Income => "income",
            Category::Expense => "expense",
        }
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Category {
    type Err = LedgerError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "income" => Ok(Category::Income),
            "expense" => Ok(Category::Expense),
            _ => Err(LedgerError::InvalidCategory(s.to_string())),
        }
    }
}

/// A single income or expense entry.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct Record {
    record_id: Uuid,
    category: Category,
    amount: Amount,
    description: String,
    date: NaiveDateTime,
    #[serde(default)]
    tags: Vec<String>,
}

impl Record {
    pub fn new(
        category: Category,
        amount: Amount,
        description: String,
        date: Option<NaiveDateTime>,
        tags: Vec<String>,
    ) -> Self {
        Self {
            record_id: Uuid::new_v4(),
            category,
            amount,
            description,
            date: date.unwrap_or_else(|| Local::now().naive_local()),
            tags,
        }
    }

    pub fn id(&self) -> &Uuid {
        &self.record_id
    }

    pub fn category(&self) -> Category {
        self.category
    }

    pub fn amount(&self) -> &Amount {
        &self.amount
    }

    pub fn description(&self) -> &str {
        &self.description
    }

    pub fn date(&self) -> &NaiveDateTime {
        &self.date
    }

    pub fn tags(&self) -> &[String] {
        &self.tags
    }

    pub fn has_tag(&self, tag: &str) -> bool {
        self.tags.iter().any(|t| t == tag)
    }
}

/// The full, ordered collection of records persisted as one unit.
#[derive(Serialize, Deserialize, Debug, Clone, Default, PartialEq, Eq)]
pub struct RecordSet {
    records: Vec<Record>,
}

impl RecordSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, record: Record) {
        self.records.push(record);
    }

    pub fn get(&self, id: &Uuid) -> Option<&Record> {
        self.records.iter().find(|r| r.id() == id)
    }

    /// Removes the record with `id`, keeping the order of the rest.
    pub fn remove(&mut self, id: &Uuid) -> Option<Record> {
        let index = self.records.iter().position(|r| r.id() == id)?;
        Some(self.records.remove(index))
    }

    pub fn iter(&self) -> impl Iterator<Item = &Record> {
        self.records.iter()
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

impl FromIterator<Record> for RecordSet {
    fn from_iter<I: IntoIterator<Item = Record>>(iter: I) -> Self {
        Self {
            records: iter.into_iter().collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use serde_json::json;

    fn date() -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2024, 3, 1)
            .unwrap()
            .and_hms_micro_opt(9, 30, 0, 123_456)
            .unwrap()
    }

    fn salary() -> Record {
        Record::new(
            Category::Income,
            Amount::parse("1000.00").unwrap(),
            "Salary".into(),
            Some(date()),
            vec!["work".into(), "monthly".into()],
        )
    }

    #[test]
    fn category_parses_case_insensitively() {
        assert_eq!("Income".parse::<Category>().unwrap(), Category::Income);
        assert_eq!(" expense ".parse::<Category>().unwrap(), Category::Expense);
        match "transfer".parse::<Category>() {
            Err(LedgerError::InvalidCategory(c)) => assert_eq!(c, "transfer"),
            other => panic!("expected InvalidCategory, got: {other:?}"),
        }
    }

    #[test]
    fn new_record_gets_unique_id_and_default_date() {
        let a = Record::new(Category::Expense, Amount::parse("1").unwrap(), "a".into(), None, vec![]);
        let b = Record::new(Category::Expense, Amount::parse("1").unwrap(), "b".into(), None, vec![]);

        assert_ne!(a.id(), b.id());
        assert!(a.date().and_utc().timestamp() > 0);
    }

    #[test]
    fn record_set_json_layout() {
        let record = salary();
        let set: RecordSet = std::iter::once(record.clone()).collect();

        let value = serde_json::to_value(&set).unwrap();

        assert_eq!(
            value,
            json!({
                "records": [{
                    "record_id": record.id().to_string(),
                    "category": "income",
                    "amount": "1000.00",
                    "description": "Salary",
                    "date": "2024-03-01T09:30:00.123456",
                    "tags": ["work", "monthly"],
                }]
            })
        );
    }

    #[test]
    fn missing_tags_default_to_empty() {
        let value = json!({
            "records": [{
                "record_id": "0b6c1c5e-64a3-4a8e-9f1b-2a4d8c7e6f10",
                "category": "expense",
                "amount": "12.50",
                "description": "Lunch",
                "date": "2024-03-01T12:00:00",
            }]
        });

        let set: RecordSet = serde_json::from_value(value).unwrap();
        let record = set.iter().next().unwrap();

        assert!(record.tags().is_empty());
        assert_eq!(record.amount().as_str(), "12.50");
    }

    #[test]
    fn missing_required_field_is_rejected() {
        let value = json!({
            "records": [{
                "record_id": "0b6c1c5e-64a3-4a8e-9f1b-2a4d8c7e6f10",
                "category": "expense",
                "description": "Lunch",
                "date": "2024-03-01T12:00:00",
            }]
        });

        assert!(serde_json::from_value::<RecordSet>(value).is_err());
        assert!(serde_json::from_value::<RecordSet>(json!({})).is_err());
    }

    #[test]
    fn remove_keeps_order() {
        let records: Vec<Record> = (0..3)
            .map(|i| {
                Record::new(
                    Category::Expense,
                    Amount::parse("1").unwrap(),
                    format!("r{i}"),
                    Some(date()),
                    vec![],
                )
            })
            .collect();
        let middle = *records[1].id();
        let mut set: RecordSet = records.into_iter().collect();

        assert_eq!(set.remove(&middle).unwrap().description(), "r1");
        assert!(set.remove(&middle).is_none());

        let names: Vec<_> = set.iter().map(|r| r.description()).collect();
        assert_eq!(names, ["r0", "r2"]);
    }

    #[test]
    fn has_tag_matches_exactly() {
        let record = salary();
        assert!(record.has_tag("work"));
        assert!(!record.has_tag("Work"));
        assert!(!record.has_tag("wor"));
    }
}
