use crate::core::mapping::FieldMapping;
use crate::core::transfer::TransferPlan;
use crate::matchmaker::{MATCHMAKER_CONTACT_NOTES, SEQR_CONTACT_NOTES};

pub const CONTACT_NOTE_FIELDS: &[&str] = &[
    "guid",
    "created_date",
    "last_modified_date",
    "institution",
    "comments",
    "created_by_id",
];

pub fn forward() -> TransferPlan {
    TransferPlan::new(
        SEQR_CONTACT_NOTES,
        MATCHMAKER_CONTACT_NOTES,
        FieldMapping::copy_all(CONTACT_NOTE_FIELDS),
    )
}

pub fn reverse() -> TransferPlan {
    TransferPlan::new(
        MATCHMAKER_CONTACT_NOTES,
        SEQR_CONTACT_NOTES,
        FieldMapping::copy_all(CONTACT_NOTE_FIELDS),
    )
    .purging_source()
}
