//! Moves matchmaker data out of the seqr tables into the standalone matchmaker tables.
//!
//! Forward: individuals with submitted data become submissions, results are
//! re-pointed from individuals to submissions, contact notes are copied, and the
//! legacy columns and tables are dropped. Reverse restores the legacy shape.

pub mod contact_notes;
pub mod results;
pub mod submissions;

use crate::core::dedup::{DuplicatePolicy, DEFAULT_DUPLICATE_SUFFIX};
use crate::core::migration::Migration;
use crate::domain::model::SchemaChange;

pub const MIGRATION_NAME: &str = "seqr.0002_matchmaker_tables";

pub const INDIVIDUALS: &str = "seqr_individual";
pub const SEQR_RESULTS: &str = "seqr_matchmakerresult";
pub const SEQR_CONTACT_NOTES: &str = "seqr_matchmakercontactnotes";
pub const SUBMISSIONS: &str = "matchmaker_matchmakersubmission";
pub const MATCHMAKER_RESULTS: &str = "matchmaker_matchmakerresult";
pub const MATCHMAKER_CONTACT_NOTES: &str = "matchmaker_matchmakercontactnotes";

/// Submission ids that were sent twice for individuals sharing an id across projects.
/// Matchmaker replaces on a repeated id, so the second one was never really stored.
pub const DUPLICATED_SUBMISSION_IDS: &[&str] = &[
    "89dcbe5e752737cb1991dd34dfae68c1",
    "BON_UC499_1_1",
    "WAL_CH2900_CH2901",
    "WAL_CH5200_CH5201",
    "WAL_CH5700_CH5701",
    "WAL_DC2200_DC2201",
    "WAL_DC3500_DC3501",
    "WAL_LIS4900_LIS4901",
    "WAL_PAC2800_PAC2801",
];

pub fn default_duplicates() -> DuplicatePolicy {
    DuplicatePolicy::new(DUPLICATED_SUBMISSION_IDS.iter().copied(), DEFAULT_DUPLICATE_SUFFIX)
}

const REMOVED_FIELDS: &[(&str, &str)] = &[
    (SEQR_CONTACT_NOTES, "created_by_id"),
    (SEQR_RESULTS, "created_by_id"),
    (SEQR_RESULTS, "individual_id"),
    (SEQR_RESULTS, "last_modified_by_id"),
    (INDIVIDUALS, "mme_deleted_by_id"),
    (INDIVIDUALS, "mme_deleted_date"),
    (INDIVIDUALS, "mme_id"),
    (INDIVIDUALS, "mme_submitted_data"),
    (INDIVIDUALS, "mme_submitted_date"),
];

pub fn migration(duplicates: DuplicatePolicy) -> Migration {
    let migration = Migration::new(MIGRATION_NAME)
        .transfer(
            "migrate submissions",
            submissions::forward(duplicates),
            submissions::reverse(),
        )
        .transfer("copy results", results::forward(), results::reverse())
        .transfer(
            "copy contact notes",
            contact_notes::forward(),
            contact_notes::reverse(),
        );

    REMOVED_FIELDS
        .iter()
        .fold(migration, |migration, (table, field)| {
            migration.schema(SchemaChange::remove_field(table, field))
        })
        .schema(SchemaChange::delete_table(SEQR_CONTACT_NOTES, &["guid"]))
        .schema(SchemaChange::delete_table(SEQR_RESULTS, &["guid"]))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::migration::Operation;

    #[test]
    fn test_operation_order() {
        let migration = migration(default_duplicates());
        let names: Vec<String> = migration.operations.iter().map(Operation::name).collect();

        assert_eq!(names[0], "migrate submissions");
        assert_eq!(names[1], "copy results");
        assert_eq!(names[2], "copy contact notes");
        assert_eq!(names[3], "remove field seqr_matchmakercontactnotes.created_by_id");
        assert_eq!(names.last().unwrap(), "delete table seqr_matchmakerresult");
        assert_eq!(names.len(), 3 + REMOVED_FIELDS.len() + 2);
    }

    #[test]
    fn test_reverse_results_read_matchmaker_results() {
        let reverse = results::reverse();
        assert_eq!(reverse.source, MATCHMAKER_RESULTS);
        assert_eq!(reverse.destination, SEQR_RESULTS);
    }

    #[test]
    fn test_default_duplicates() {
        let policy = default_duplicates();
        assert_eq!(policy.known.len(), 9);
        assert!(policy.known.contains("BON_UC499_1_1"));
        assert_eq!(policy.suffix, "_b");
    }
}
