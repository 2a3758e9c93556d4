pub mod booking;
pub mod date_format;
pub mod place;
pub mod user;

use serde::{Deserialize, Serialize};

/// Outcome of a scoped delete, shaped the way existing clients read it.
#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct DeleteResult {
    pub acknowledged: bool,
    pub deleted_count: u64,
}

impl DeleteResult {
    pub fn new(deleted_count: u64) -> Self {
        Self {
            acknowledged: true,
            deleted_count,
        }
    }
}
