use crate::core::dedup::{DuplicateIdSet, DuplicatePolicy};
use crate::core::mapping::{FieldMapping, FieldRule, Lookup, TransferContext};
use crate::domain::model::{Record, RecordFilter};
use crate::domain::ports::RecordStore;
use crate::utils::error::{MigrationError, Result};
use serde_json::Value;
use std::collections::HashMap;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WriteMode {
    /// One bulk insert of new rows.
    Insert,
    /// Merge into existing rows matched on `key`.
    Update { key: String },
}

/// One direction of a record transfer: where rows come from, where they go, and how each field is filled.
#[derive(Debug)]
pub struct TransferPlan {
    pub source: String,
    pub destination: String,
    pub mapping: FieldMapping,
    pub filter: RecordFilter,
    pub write: WriteMode,
    pub duplicates: DuplicatePolicy,
    pub identity_field: String,
    pub purge_source: bool,
}

impl TransferPlan {
    pub fn new(source: &str, destination: &str, mapping: FieldMapping) -> Self {
        Self {
            source: source.to_string(),
            destination: destination.to_string(),
            mapping,
            filter: RecordFilter::All,
            write: WriteMode::Insert,
            duplicates: DuplicatePolicy::none(),
            identity_field: "guid".to_string(),
            purge_source: false,
        }
    }

    pub fn with_filter(mut self, filter: RecordFilter) -> Self {
        self.filter = filter;
        self
    }

    pub fn updating(mut self, key: &str) -> Self {
        self.write = WriteMode::Update {
            key: key.to_string(),
        };
        self
    }

    pub fn with_duplicates(mut self, duplicates: DuplicatePolicy) -> Self {
        self.duplicates = duplicates;
        self
    }

    pub fn identified_by(mut self, field: &str) -> Self {
        self.identity_field = field.to_string();
        self
    }

    /// Delete the transferred source rows once the write succeeds.
    pub fn purging_source(mut self) -> Self {
        self.purge_source = true;
        self
    }
}

/// What a related table holds for one `match_on` value.
#[derive(Debug, Clone, PartialEq)]
enum Referent {
    /// Exactly one row matched; `None` when that row lacks the `take` field.
    Unique(Option<Value>),
    /// This many rows matched.
    Ambiguous(usize),
}

type LookupIndex = HashMap<String, Referent>;

fn index_key(value: &Value) -> String {
    value.to_string()
}

fn index_rows(rows: &[Record], lookup: &Lookup) -> LookupIndex {
    let mut index = LookupIndex::new();
    for row in rows {
        let key = match row.get(&lookup.match_on) {
            Some(value) if !value.is_null() => index_key(value),
            _ => continue,
        };
        let taken = row.get(&lookup.take).cloned();
        index
            .entry(key)
            .and_modify(|referent| {
                *referent = match referent {
                    Referent::Unique(_) => Referent::Ambiguous(2),
                    Referent::Ambiguous(n) => Referent::Ambiguous(*n + 1),
                }
            })
            .or_insert(Referent::Unique(taken));
    }
    index
}

async fn build_lookup_indexes(
    store: &mut dyn RecordStore,
    mapping: &FieldMapping,
) -> Result<HashMap<Lookup, LookupIndex>> {
    let mut indexes = HashMap::new();
    for lookup in mapping.lookups() {
        if indexes.contains_key(lookup) {
            continue;
        }
        let rows = store.query(&lookup.table, &RecordFilter::All).await?;
        let index = index_rows(&rows, lookup);
        tracing::debug!(
            "Indexed {} rows of {} by {}",
            index.len(),
            lookup.table,
            lookup.match_on
        );
        indexes.insert(lookup.clone(), index);
    }
    Ok(indexes)
}

fn resolve_lookup(record: &Record, lookup: &Lookup, index: &LookupIndex) -> Result<Value> {
    let local = record
        .get(&lookup.local)
        .ok_or_else(|| MigrationError::MissingField {
            path: lookup.local.clone(),
        })?;
    if local.is_null() {
        return Err(MigrationError::InvalidValue {
            field: lookup.local.clone(),
            reason: format!("null reference into {}", lookup.table),
        });
    }
    match index.get(&index_key(local)) {
        Some(Referent::Unique(Some(value))) => Ok(value.clone()),
        Some(Referent::Unique(None)) => Err(MigrationError::MissingField {
            path: format!("{}.{}", lookup.table, lookup.take),
        }),
        Some(Referent::Ambiguous(count)) => Err(MigrationError::InvalidValue {
            field: lookup.match_on.clone(),
            reason: format!("{} rows in {} match {}", count, lookup.table, local),
        }),
        None => Err(MigrationError::RecordNotFound {
            table: lookup.table.clone(),
            key: lookup.match_on.clone(),
            value: local.to_string(),
        }),
    }
}

fn evaluate(
    record: &Record,
    field: &str,
    rule: &FieldRule,
    indexes: &HashMap<Lookup, LookupIndex>,
    ctx: &mut TransferContext<'_>,
) -> Result<Value> {
    match rule {
        FieldRule::Copy => record
            .get(field)
            .cloned()
            .ok_or_else(|| MigrationError::MissingField {
                path: field.to_string(),
            }),
        FieldRule::Derive(func) => func(record, field, ctx),
        FieldRule::Lookup(lookup) => match indexes.get(lookup) {
            Some(index) => resolve_lookup(record, lookup, index),
            None => Err(MigrationError::TableNotFound {
                table: lookup.table.clone(),
            }),
        },
    }
}

/// Builds one destination record, or reports the first field that could not be filled.
pub fn build_record(
    record: &Record,
    plan: &TransferPlan,
    indexes: &HashMap<Lookup, LookupIndex>,
    ctx: &mut TransferContext<'_>,
) -> Result<Record> {
    let mut built = Record::new();
    for (field, rule) in plan.mapping.rules() {
        let value = evaluate(record, field, rule, indexes, ctx).map_err(|source| {
            MigrationError::Construction {
                table: plan.destination.clone(),
                record: record.identity(&plan.identity_field),
                field: field.to_string(),
                source: Box::new(source),
            }
        })?;
        built.insert(field, value);
    }
    Ok(built)
}

/// Copies every source row that passes the plan's filter into the destination in one write.
///
/// Nothing is written unless every record builds. Returns the number of records written;
/// an empty selection writes nothing and is not an error.
pub async fn transfer(store: &mut dyn RecordStore, plan: &TransferPlan) -> Result<usize> {
    if plan.mapping.is_empty() {
        return Err(MigrationError::InvalidValue {
            field: plan.destination.clone(),
            reason: "field mapping is empty".to_string(),
        });
    }

    let sources = store.query(&plan.source, &plan.filter).await?;
    if sources.is_empty() {
        tracing::info!("No {} records to copy to {}", plan.source, plan.destination);
        return Ok(0);
    }

    tracing::info!(
        "Copying {} {} to {}",
        sources.len(),
        plan.source,
        plan.destination
    );

    let indexes = build_lookup_indexes(store, &plan.mapping).await?;
    let mut ctx = TransferContext {
        duplicates: DuplicateIdSet::new(&plan.duplicates),
    };

    let built = sources
        .iter()
        .map(|record| build_record(record, plan, &indexes, &mut ctx))
        .collect::<Result<Vec<Record>>>()?;

    let written = match &plan.write {
        WriteMode::Insert => store.bulk_insert(&plan.destination, built).await?,
        WriteMode::Update { key } => store.update(&plan.destination, key, built).await?,
    };

    if plan.purge_source {
        let purged = store.delete(&plan.source, &plan.filter).await?;
        tracing::debug!("Removed {} transferred rows from {}", purged, plan.source);
    }

    Ok(written)
}
