use crate::core::dedup::DuplicatePolicy;
use crate::core::mapping::FieldMapping;
use crate::core::nested::{build_nested, record_path};
use crate::core::transfer::TransferPlan;
use crate::domain::model::{Record, RecordFilter};
use crate::matchmaker::{INDIVIDUALS, SUBMISSIONS};
use crate::utils::error::{MigrationError, Result};
use serde_json::{json, Value};

pub const SUBMISSION_FIELDS: &[&str] = &[
    "guid",
    "created_date",
    "last_modified_date",
    "submission_id",
    "label",
    "contact_name",
    "contact_href",
    "features",
    "genomicFeatures",
    "deleted_date",
    "created_by_id",
    "deleted_by_id",
    "individual_id",
];

/// Submission fields read from `mme_submitted_data.patient`. Underscores separate nesting levels.
const PATIENT_FIELDS: &[&str] = &["label", "contact_name", "contact_href", "features", "genomicFeatures"];

const SUBMITTED_DATA: &str = "mme_submitted_data";
const GUID_MAX_LENGTH: usize = 30;

fn patient_path(field: &str) -> Vec<&str> {
    std::iter::once("patient").chain(field.split('_')).collect()
}

fn submitted_data_field(record: &Record, field: &str) -> Result<Value> {
    record_path(record, SUBMITTED_DATA, &patient_path(field))
}

/// `I000012_na20885` becomes `MS000012_na20885`, cut to the submission guid column width.
pub fn submission_guid(individual_guid: &str) -> String {
    individual_guid
        .replace('I', "MS")
        .chars()
        .take(GUID_MAX_LENGTH)
        .collect()
}

fn string_field<'a>(record: &'a Record, field: &str) -> Result<&'a str> {
    match record.get(field) {
        Some(Value::String(s)) => Ok(s.as_str()),
        Some(other) => Err(MigrationError::InvalidValue {
            field: field.to_string(),
            reason: format!("expected a string, found {}", other),
        }),
        None => Err(MigrationError::MissingField {
            path: field.to_string(),
        }),
    }
}

/// Individuals with submitted matchmaker data become submission rows.
pub fn forward(duplicates: DuplicatePolicy) -> TransferPlan {
    let mut mapping = FieldMapping::copy_all(SUBMISSION_FIELDS)
        .derive("guid", |record, field, _| {
            Ok(json!(submission_guid(string_field(record, field)?)))
        })
        .rename("created_date", "mme_submitted_date")
        .rename("deleted_date", "mme_deleted_date")
        .derive("last_modified_date", |record, _, _| {
            let source = if record.is_null("mme_deleted_date") {
                "mme_submitted_date"
            } else {
                "mme_deleted_date"
            };
            record
                .get(source)
                .cloned()
                .ok_or_else(|| MigrationError::MissingField {
                    path: source.to_string(),
                })
        })
        .rename("deleted_by_id", "mme_deleted_by_id")
        .rename("individual_id", "id")
        .derive("submission_id", |record, _, ctx| {
            let id = submitted_data_field(record, "id")?;
            Ok(match id.as_str() {
                Some(raw) => json!(ctx.duplicates.disambiguate(raw)),
                None => id,
            })
        });

    for field in PATIENT_FIELDS {
        mapping = mapping.derive(field, |record, field, _| submitted_data_field(record, field));
    }

    TransferPlan::new(INDIVIDUALS, SUBMISSIONS, mapping)
        .with_filter(RecordFilter::not_null(SUBMITTED_DATA))
        .with_duplicates(duplicates)
}

/// The patient document sent to external matchmaker nodes, rebuilt from a submission row.
pub fn external_match_json(submission: &Record) -> Result<Value> {
    let mut entries = Vec::with_capacity(PATIENT_FIELDS.len() + 1);
    let id = submission
        .get("submission_id")
        .cloned()
        .ok_or_else(|| MigrationError::MissingField {
            path: "submission_id".to_string(),
        })?;
    entries.push((vec!["patient", "id"], id));

    for field in PATIENT_FIELDS {
        let value = submission
            .get(field)
            .cloned()
            .ok_or_else(|| MigrationError::MissingField {
                path: field.to_string(),
            })?;
        entries.push((patient_path(field), value));
    }

    Ok(build_nested(
        entries
            .iter()
            .map(|(path, value)| (path.as_slice(), value.clone()))
            .collect(),
    ))
}

/// Writes submission data back onto the individual rows. The forward guid rewrite,
/// `last_modified_date` and any duplicate suffix are not undone.
pub fn reverse() -> TransferPlan {
    let mapping = FieldMapping::new()
        .rename("id", "individual_id")
        .rename("mme_deleted_by_id", "deleted_by_id")
        .rename("mme_deleted_date", "deleted_date")
        .rename("mme_submitted_date", "created_date")
        .derive(SUBMITTED_DATA, |record, _, _| external_match_json(record));

    TransferPlan::new(SUBMISSIONS, INDIVIDUALS, mapping)
        .updating("id")
        .purging_source()
}
