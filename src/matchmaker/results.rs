use crate::core::mapping::FieldMapping;
use crate::core::transfer::TransferPlan;
use crate::matchmaker::{MATCHMAKER_RESULTS, SEQR_RESULTS, SUBMISSIONS};

pub const RESULT_FIELDS: &[&str] = &[
    "guid",
    "created_date",
    "last_modified_date",
    "result_data",
    "we_contacted",
    "host_contacted",
    "deemed_irrelevant",
    "flag_for_analysis",
    "comments",
    "match_removed",
    "created_by_id",
    "last_modified_by_id",
];

/// Each legacy result points at an individual; the new one points at that individual's submission.
pub fn forward() -> TransferPlan {
    TransferPlan::new(
        SEQR_RESULTS,
        MATCHMAKER_RESULTS,
        FieldMapping::copy_all(RESULT_FIELDS).lookup(
            "submission_id",
            SUBMISSIONS,
            "individual_id",
            "individual_id",
            "id",
        ),
    )
}

pub fn reverse() -> TransferPlan {
    TransferPlan::new(
        MATCHMAKER_RESULTS,
        SEQR_RESULTS,
        FieldMapping::copy_all(RESULT_FIELDS).lookup(
            "individual_id",
            SUBMISSIONS,
            "submission_id",
            "id",
            "individual_id",
        ),
    )
    .purging_source()
}
