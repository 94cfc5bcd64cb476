use chrono::NaiveDate;

use crate::models::SubsetId;

/// Caps the end of every date range requested from the answer store.
pub trait DataLimiter: Send + Sync {
    /// `None` means no cap.
    fn latest_date_to_request(&self, subset: &SubsetId) -> Option<NaiveDate>;
}
