use anyhow::Result;
use matchmaker_migrate::core::runner::MIGRATIONS_TABLE;
use matchmaker_migrate::core::RecordFilter;
use matchmaker_migrate::matchmaker::{
    self, INDIVIDUALS, MATCHMAKER_CONTACT_NOTES, MATCHMAKER_RESULTS, SEQR_CONTACT_NOTES,
    SEQR_RESULTS, SUBMISSIONS,
};
use matchmaker_migrate::utils::report;
use matchmaker_migrate::{
    Database, DuplicatePolicy, JsonFileStore, MemoryStore, MigrationError, MigrationRunner,
};
use serde_json::{json, Value};
use tempfile::TempDir;

fn patient(id: &str, label: &str) -> Value {
    json!({"patient": {
        "id": id,
        "label": label,
        "contact": {"name": "Sam Baxter", "href": "mailto:matchmaker@example.org"},
        "features": [{"id": "HP:0001252", "observed": "yes"}],
        "genomicFeatures": [{"gene": {"id": "ENSG00000186092"}}]
    }})
}

fn individual(id: i64, guid: &str, submitted: Option<Value>, deleted: Option<&str>) -> Value {
    let mme_id = submitted.as_ref().map(|data| data["patient"]["id"].clone());
    let submitted_date = submitted.as_ref().map(|_| "2018-05-23T09:07:49.719Z");
    json!({
        "id": id,
        "guid": guid,
        "created_by_id": 10,
        "mme_id": mme_id,
        "mme_submitted_data": submitted,
        "mme_submitted_date": submitted_date,
        "mme_deleted_date": deleted,
        "mme_deleted_by_id": deleted.map(|_| 11)
    })
}

fn result(guid: &str, individual_id: i64) -> Value {
    json!({
        "guid": guid,
        "created_date": "2018-06-01T00:00:00Z",
        "last_modified_date": "2018-06-02T00:00:00Z",
        "result_data": {"patient": {"id": format!("remote_{}", guid)}},
        "we_contacted": true,
        "host_contacted": false,
        "deemed_irrelevant": false,
        "flag_for_analysis": true,
        "comments": "called the clinician",
        "match_removed": false,
        "created_by_id": 10,
        "last_modified_by_id": 11,
        "individual_id": individual_id
    })
}

fn seqr_snapshot() -> Database {
    Database::new()
        .with_table(INDIVIDUALS, &["guid"])
        .with_table(SEQR_RESULTS, &["guid"])
        .with_table(SEQR_CONTACT_NOTES, &["guid"])
        .with_table(SUBMISSIONS, &["guid", "submission_id"])
        .with_table(MATCHMAKER_RESULTS, &["guid"])
        .with_table(MATCHMAKER_CONTACT_NOTES, &["guid"])
        .with_rows(
            INDIVIDUALS,
            vec![
                individual(1, "I000001_na19675", Some(patient("NA19675_1", "NA19675")), None),
                individual(2, "I000002_na19678", None, None),
                individual(
                    3,
                    "I000003_wal_ch2900",
                    Some(patient("WAL_CH2900_CH2901", "CH2900")),
                    Some("2019-02-01T12:00:00Z"),
                ),
                individual(
                    4,
                    "I000004_wal_ch2900",
                    Some(patient("WAL_CH2900_CH2901", "CH2900 (second project)")),
                    None,
                ),
            ],
        )
        .with_rows(
            SEQR_RESULTS,
            vec![result("MR0000001_NA19675", 1), result("MR0000002_CH2900", 3)],
        )
        .with_rows(
            SEQR_CONTACT_NOTES,
            vec![json!({
                "guid": "MCN000001_broad",
                "created_date": "2018-07-01T00:00:00Z",
                "last_modified_date": "2018-07-01T00:00:00Z",
                "institution": "broad institute",
                "comments": "prefers email",
                "created_by_id": 10
            })],
        )
}

fn row<'a>(db: &'a Database, table: &str, field: &str, value: Value) -> &'a matchmaker_migrate::core::Record {
    db.rows(table)
        .unwrap()
        .iter()
        .find(|r| r.get(field) == Some(&value))
        .unwrap_or_else(|| panic!("no {} row with {} = {}", table, field, value))
}

#[tokio::test]
async fn test_apply_moves_matchmaker_data() -> Result<()> {
    let runner = MigrationRunner::new(MemoryStore::new(seqr_snapshot()));
    let migration = matchmaker::migration(matchmaker::default_duplicates());

    let reports = runner.apply(&migration).await?;
    assert_eq!(reports[0].records, 3);
    assert_eq!(reports[1].records, 2);
    assert_eq!(reports[2].records, 1);

    let db = runner.store().snapshot().await;

    // Submissions: only individuals with submitted data, guid rewritten.
    let submissions = db.rows(SUBMISSIONS).unwrap();
    assert_eq!(submissions.len(), 3);
    let first = row(&db, SUBMISSIONS, "individual_id", json!(1));
    assert_eq!(first.get("guid"), Some(&json!("MS000001_na19675")));
    assert_eq!(first.get("submission_id"), Some(&json!("NA19675_1")));
    assert_eq!(first.get("label"), Some(&json!("NA19675")));
    assert_eq!(first.get("contact_name"), Some(&json!("Sam Baxter")));
    assert_eq!(first.get("contact_href"), Some(&json!("mailto:matchmaker@example.org")));
    assert_eq!(first.get("created_date"), Some(&json!("2018-05-23T09:07:49.719Z")));
    assert_eq!(first.get("last_modified_date"), Some(&json!("2018-05-23T09:07:49.719Z")));
    assert_eq!(first.get("deleted_date"), Some(&Value::Null));
    assert_eq!(first.get("created_by_id"), Some(&json!(10)));

    // A deleted submission is last modified when it was deleted.
    let deleted = row(&db, SUBMISSIONS, "individual_id", json!(3));
    assert_eq!(deleted.get("last_modified_date"), Some(&json!("2019-02-01T12:00:00Z")));
    assert_eq!(deleted.get("deleted_by_id"), Some(&json!(11)));

    // The known duplicate id keeps its value once and is suffixed after that.
    assert_eq!(deleted.get("submission_id"), Some(&json!("WAL_CH2900_CH2901")));
    let repeat = row(&db, SUBMISSIONS, "individual_id", json!(4));
    assert_eq!(repeat.get("submission_id"), Some(&json!("WAL_CH2900_CH2901_b")));

    // Results now point at submissions.
    let result = row(&db, MATCHMAKER_RESULTS, "guid", json!("MR0000002_CH2900"));
    assert_eq!(result.get("submission_id"), deleted.get("id"));
    assert_eq!(result.get("comments"), Some(&json!("called the clinician")));
    assert!(result.get("individual_id").is_none());

    let note = row(&db, MATCHMAKER_CONTACT_NOTES, "guid", json!("MCN000001_broad"));
    assert_eq!(note.get("institution"), Some(&json!("broad institute")));

    // Legacy columns and tables are gone.
    assert!(db.rows(SEQR_RESULTS).is_none());
    assert!(db.rows(SEQR_CONTACT_NOTES).is_none());
    let individual = row(&db, INDIVIDUALS, "id", json!(1));
    for field in ["mme_id", "mme_submitted_data", "mme_submitted_date", "mme_deleted_date", "mme_deleted_by_id"] {
        assert!(individual.get(field).is_none(), "{} should be removed", field);
    }

    assert_eq!(db.rows(MIGRATIONS_TABLE).unwrap().len(), 1);
    Ok(())
}

#[tokio::test]
async fn test_revert_restores_legacy_shape() -> Result<()> {
    let original = seqr_snapshot();
    let runner = MigrationRunner::new(MemoryStore::new(original.clone()));
    let migration = matchmaker::migration(matchmaker::default_duplicates());

    runner.apply(&migration).await?;
    runner.revert(&migration).await?;
    assert!(!runner.status(&migration).await?);

    let db = runner.store().snapshot().await;

    // Exact round trip for the submitted data of a non-duplicate individual.
    let restored = row(&db, INDIVIDUALS, "id", json!(1));
    let before = row(&original, INDIVIDUALS, "id", json!(1));
    for field in ["mme_submitted_data", "mme_submitted_date", "mme_deleted_date", "mme_deleted_by_id"] {
        assert_eq!(restored.get(field), before.get(field), "{} should round trip", field);
    }
    // mme_id is dropped for good.
    assert_eq!(restored.get("mme_id"), Some(&Value::Null));

    // Individuals that never submitted stay without data.
    assert_eq!(row(&db, INDIVIDUALS, "id", json!(2)).get("mme_submitted_data"), Some(&Value::Null));

    // The duplicate suffix is kept on the way back.
    let repeat = row(&db, INDIVIDUALS, "id", json!(4));
    assert_eq!(
        repeat.get("mme_submitted_data").unwrap()["patient"]["id"],
        json!("WAL_CH2900_CH2901_b")
    );
    assert_eq!(
        repeat.get("mme_submitted_data").unwrap()["patient"]["label"],
        json!("CH2900 (second project)")
    );

    // Results come back from the matchmaker results table with their individual.
    for guid in ["MR0000001_NA19675", "MR0000002_CH2900"] {
        let restored = row(&db, SEQR_RESULTS, "guid", json!(guid));
        let before = row(&original, SEQR_RESULTS, "guid", json!(guid));
        for field in matchmaker::results::RESULT_FIELDS {
            assert_eq!(restored.get(field), before.get(field), "{}.{}", guid, field);
        }
        assert_eq!(restored.get("individual_id"), before.get("individual_id"));
    }

    let note = row(&db, SEQR_CONTACT_NOTES, "guid", json!("MCN000001_broad"));
    assert_eq!(note.get("comments"), Some(&json!("prefers email")));
    assert_eq!(note.get("created_by_id"), Some(&json!(10)));

    assert!(db.rows(SUBMISSIONS).unwrap().is_empty());
    assert!(db.rows(MATCHMAKER_RESULTS).unwrap().is_empty());
    assert!(db.rows(MATCHMAKER_CONTACT_NOTES).unwrap().is_empty());

    // The forward direction can run again.
    runner.apply(&migration).await?;
    assert_eq!(runner.store().snapshot().await.rows(SUBMISSIONS).unwrap().len(), 3);
    Ok(())
}

#[tokio::test]
async fn test_construction_failure_leaves_snapshot_untouched() -> Result<()> {
    let temp_dir = TempDir::new()?;
    let store = JsonFileStore::new(temp_dir.path().join("seqr.json"));

    let mut broken = patient("NA20885", "NA20885");
    broken["patient"].as_object_mut().unwrap().remove("label");
    let db = seqr_snapshot().with_rows(
        INDIVIDUALS,
        vec![individual(5, "I000005_na20885", Some(broken), None)],
    );
    store.save(&db).await?;
    let before = std::fs::read(store.path())?;

    let runner = MigrationRunner::new(store);
    let migration = matchmaker::migration(matchmaker::default_duplicates());
    let err = runner.apply(&migration).await.unwrap_err();

    match err {
        MigrationError::Construction {
            table,
            record,
            field,
            source,
        } => {
            assert_eq!(table, SUBMISSIONS);
            assert_eq!(record, "I000005_na20885");
            assert_eq!(field, "label");
            assert!(source.to_string().contains("mme_submitted_data.patient.label"));
        }
        other => panic!("unexpected error: {:?}", other),
    }

    assert_eq!(std::fs::read(runner.store().path())?, before);
    Ok(())
}

#[tokio::test]
async fn test_without_duplicate_policy_the_insert_is_rejected() -> Result<()> {
    let runner = MigrationRunner::new(MemoryStore::new(seqr_snapshot()));
    let migration = matchmaker::migration(DuplicatePolicy::none());

    let err = runner.apply(&migration).await.unwrap_err();
    assert!(matches!(
        err,
        MigrationError::ConstraintViolation { ref table, ref field, .. }
            if table == SUBMISSIONS && field == "submission_id"
    ));

    let db = runner.store().snapshot().await;
    assert!(db.rows(SUBMISSIONS).unwrap().is_empty());
    assert!(db.rows(SEQR_RESULTS).is_some());
    Ok(())
}

#[tokio::test]
async fn test_nothing_submitted_is_not_an_error() -> Result<()> {
    let db = Database::new()
        .with_table(INDIVIDUALS, &["guid"])
        .with_table(SEQR_RESULTS, &["guid"])
        .with_table(SEQR_CONTACT_NOTES, &["guid"])
        .with_table(SUBMISSIONS, &["guid", "submission_id"])
        .with_table(MATCHMAKER_RESULTS, &["guid"])
        .with_table(MATCHMAKER_CONTACT_NOTES, &["guid"])
        .with_rows(INDIVIDUALS, vec![individual(2, "I000002_na19678", None, None)]);
    let runner = MigrationRunner::new(MemoryStore::new(db));
    let migration = matchmaker::migration(matchmaker::default_duplicates());

    let reports = runner.apply(&migration).await?;
    assert!(reports.iter().all(|r| r.records == 0));

    let db = runner.store().snapshot().await;
    assert!(db.rows(SUBMISSIONS).unwrap().is_empty());
    assert!(db
        .rows(INDIVIDUALS)
        .unwrap()
        .iter()
        .all(|r| r.get("mme_submitted_data").is_none()));
    Ok(())
}

#[tokio::test]
async fn test_json_store_apply_with_report() -> Result<()> {
    let temp_dir = TempDir::new()?;
    let store = JsonFileStore::new(temp_dir.path().join("seqr.json"));
    store.save(&seqr_snapshot()).await?;

    let runner = MigrationRunner::new(store);
    let migration = matchmaker::migration(matchmaker::default_duplicates());
    let reports = runner.apply(&migration).await?;

    let report_path = temp_dir.path().join("reports").join("apply.csv");
    report::write_csv_file(&report_path, &reports)?;

    let csv = std::fs::read_to_string(&report_path)?;
    assert!(csv.starts_with("step,direction,source,destination,records"));
    assert!(csv.contains("migrate submissions,forward,seqr_individual,matchmaker_matchmakersubmission,3"));

    let saved = runner.store().load().await?;
    assert_eq!(saved.rows(SUBMISSIONS).unwrap().len(), 3);
    assert_eq!(
        saved
            .query(MIGRATIONS_TABLE, &RecordFilter::All)?
            .first()
            .map(|r| r.identity("name")),
        Some(matchmaker::MIGRATION_NAME.to_string())
    );
    Ok(())
}
