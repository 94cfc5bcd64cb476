use chrono::NaiveDate;
use dashmap::DashMap;
use tracing::info;

use metric_core::models::SubsetId;
use metric_core::traits::DataLimiter;

/// The same cap for every subset.
#[derive(Debug, Clone, Copy, Default)]
pub struct FixedDataLimiter {
    latest: Option<NaiveDate>,
}

impl FixedDataLimiter {
    pub fn new(latest: Option<NaiveDate>) -> Self {
        Self { latest }
    }

    pub fn unlimited() -> Self {
        Self::default()
    }
}

impl DataLimiter for FixedDataLimiter {
    fn latest_date_to_request(&self, _subset: &SubsetId) -> Option<NaiveDate> {
        self.latest
    }
}

/// Caps each subset at its most recent fully loaded day, as reported by
/// the ingestion side. Subsets never reported are unlimited.
#[derive(Debug, Default)]
pub struct SyncedDataLimiter {
    synced: DashMap<SubsetId, NaiveDate>,
}

impl SyncedDataLimiter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record that every answer up to and including `day` is loaded.
    /// Never moves a subset's cap backwards.
    pub fn record_sync(&self, subset: SubsetId, day: NaiveDate) {
        let latest = {
            let mut entry = self.synced.entry(subset.clone()).or_insert(day);
            if *entry < day {
                *entry = day;
            }
            *entry
        };
        info!(%subset, %latest, "answer store synced");
    }
}

impl DataLimiter for SyncedDataLimiter {
    fn latest_date_to_request(&self, subset: &SubsetId) -> Option<NaiveDate> {
        self.synced.get(subset).map(|day| *day)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn day(d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 3, d).unwrap()
    }

    #[test]
    fn synced_cap_only_moves_forward() {
        let limiter = SyncedDataLimiter::new();
        let uk = SubsetId::new("uk");
        assert_eq!(limiter.latest_date_to_request(&uk), None);
        limiter.record_sync(uk.clone(), day(10));
        limiter.record_sync(uk.clone(), day(4));
        assert_eq!(limiter.latest_date_to_request(&uk), Some(day(10)));
        assert_eq!(limiter.latest_date_to_request(&SubsetId::new("us")), None);
    }

    #[test]
    fn fixed_cap_applies_everywhere() {
        let limiter = FixedDataLimiter::new(Some(day(1)));
        assert_eq!(limiter.latest_date_to_request(&SubsetId::new("uk")), Some(day(1)));
        assert_eq!(FixedDataLimiter::unlimited().latest_date_to_request(&SubsetId::new("uk")), None);
    }
}
