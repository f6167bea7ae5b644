use crate::core::dedup::DuplicateIdSet;
use crate::domain::model::Record;
use crate::utils::error::{MigrationError, Result};
use serde_json::Value;
use std::fmt;

/// Per-run state handed to derive functions.
pub struct TransferContext<'a> {
    pub duplicates: DuplicateIdSet<'a>,
}

pub type DeriveFn = dyn Fn(&Record, &str, &mut TransferContext<'_>) -> Result<Value> + Send + Sync;

/// Resolves a foreign key through a related table: take `take` from the row of
/// `table` whose `match_on` equals this record's `local`.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Lookup {
    pub table: String,
    pub local: String,
    pub match_on: String,
    pub take: String,
}

pub enum FieldRule {
    Copy,
    Derive(Box<DeriveFn>),
    Lookup(Lookup),
}

impl fmt::Debug for FieldRule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FieldRule::Copy => write!(f, "Copy"),
            FieldRule::Derive(_) => write!(f, "Derive(<fn>)"),
            FieldRule::Lookup(lookup) => write!(f, "Lookup({:?})", lookup),
        }
    }
}

/// Ordered destination fields and how each one is filled.
#[derive(Debug, Default)]
pub struct FieldMapping {
    fields: Vec<(String, FieldRule)>,
}

impl FieldMapping {
    pub fn new() -> Self {
        Self::default()
    }

    /// Every field copied as-is.
    pub fn copy_all(fields: &[&str]) -> Self {
        fields.iter().fold(Self::new(), |mapping, field| mapping.copy(field))
    }

    pub fn copy(self, field: &str) -> Self {
        self.rule(field, FieldRule::Copy)
    }

    pub fn derive<F>(self, field: &str, func: F) -> Self
    where
        F: Fn(&Record, &str, &mut TransferContext<'_>) -> Result<Value> + Send + Sync + 'static,
    {
        self.rule(field, FieldRule::Derive(Box::new(func)))
    }

    /// Fill `field` from a source field under another name.
    pub fn rename(self, field: &str, source: &str) -> Self {
        let source = source.to_string();
        self.derive(field, move |record, _, _| {
            record
                .get(&source)
                .cloned()
                .ok_or_else(|| MigrationError::MissingField {
                    path: source.clone(),
                })
        })
    }

    pub fn lookup(self, field: &str, table: &str, local: &str, match_on: &str, take: &str) -> Self {
        self.rule(
            field,
            FieldRule::Lookup(Lookup {
                table: table.to_string(),
                local: local.to_string(),
                match_on: match_on.to_string(),
                take: take.to_string(),
            }),
        )
    }

    /// A later rule for the same field replaces the earlier one in place.
    pub fn rule(mut self, field: &str, rule: FieldRule) -> Self {
        match self.fields.iter_mut().find(|(name, _)| name.as_str() == field) {
            Some(entry) => entry.1 = rule,
            None => self.fields.push((field.to_string(), rule)),
        }
        self
    }

    pub fn rules(&self) -> impl Iterator<Item = (&str, &FieldRule)> {
        self.fields.iter().map(|(name, rule)| (name.as_str(), rule))
    }

    pub fn lookups(&self) -> impl Iterator<Item = &Lookup> {
        self.fields.iter().filter_map(|(_, rule)| match rule {
            FieldRule::Lookup(lookup) => Some(lookup),
            _ => None,
        })
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_rules_keep_declaration_order() {
        let mapping = FieldMapping::copy_all(&["guid", "created_date", "comments"])
            .derive("created_date", |_, _, _| Ok(json!("2019-12-03")))
            .copy("institution");

        assert_eq!(
            mapping.rules().map(|(field, _)| field).collect::<Vec<_>>(),
            vec!["guid", "created_date", "comments", "institution"]
        );
        assert!(matches!(mapping.rules().nth(1), Some((_, FieldRule::Derive(_)))));
    }

    #[test]
    fn test_lookups_are_listed() {
        let mapping = FieldMapping::new()
            .copy("guid")
            .lookup("submission_id", "submissions", "individual_id", "individual_id", "id");

        let lookups: Vec<&Lookup> = mapping.lookups().collect();
        assert_eq!(lookups.len(), 1);
        assert_eq!(lookups[0].table, "submissions");
    }
}
