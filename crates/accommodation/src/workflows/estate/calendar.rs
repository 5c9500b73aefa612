use chrono::{Duration, NaiveDate};
use serde::Serialize;

/// Half-open span of days `[start, end)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DateRange {
    start: NaiveDate,
    end: NaiveDate,
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("end date {end} must be after start date {start}")]
pub struct InvalidDateRange {
    pub start: NaiveDate,
    pub end: NaiveDate,
}

impl DateRange {
    pub fn new(start: NaiveDate, end: NaiveDate) -> Result<Self, InvalidDateRange> {
        if end > start {
            Ok(Self { start, end })
        } else {
            Err(InvalidDateRange { start, end })
        }
    }

    /// Range covering `days` nights from `start`. Returns `None` for zero days or overflow.
    pub fn from_duration(start: NaiveDate, days: u32) -> Option<Self> {
        if days == 0 {
            return None;
        }
        let end = start.checked_add_signed(Duration::days(i64::from(days)))?;
        Some(Self { start, end })
    }

    pub(crate) fn spanning(start: NaiveDate, end: NaiveDate) -> Self {
        Self {
            start,
            end: end.max(start),
        }
    }

    pub fn start(&self) -> NaiveDate {
        self.start
    }

    pub fn end(&self) -> NaiveDate {
        self.end
    }

    pub fn days(&self) -> i64 {
        (self.end - self.start).num_days()
    }

    pub fn overlaps(&self, other: &DateRange) -> bool {
        self.start < other.end && other.start < self.end
    }

    /// Number of days shared with `other`, zero when the ranges are disjoint.
    pub fn overlap_days(&self, other: &DateRange) -> i64 {
        let start = self.start.max(other.start);
        let end = self.end.min(other.end);
        (end - start).num_days().max(0)
    }

    pub fn extended_by(&self, days: u32) -> Self {
        let end = self
            .end
            .checked_add_signed(Duration::days(i64::from(days)))
            .unwrap_or(NaiveDate::MAX);
        Self {
            start: self.start,
            end,
        }
    }

    pub fn starting_earlier_by(&self, days: u32) -> Self {
        let start = self
            .start
            .checked_sub_signed(Duration::days(i64::from(days)))
            .unwrap_or(NaiveDate::MIN);
        Self {
            start,
            end: self.end,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn date(day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 5, day).expect("valid")
    }

    #[test]
    fn range_ending_on_start_does_not_overlap() {
        let booking = DateRange::new(date(1), date(10)).expect("valid");
        let search = DateRange::new(date(10), date(15)).expect("valid");
        assert!(!booking.overlaps(&search));
        assert!(!search.overlaps(&booking));
    }

    #[test]
    fn shared_day_overlaps() {
        let booking = DateRange::new(date(1), date(11)).expect("valid");
        let search = DateRange::new(date(10), date(15)).expect("valid");
        assert!(booking.overlaps(&search));
        assert_eq!(booking.overlap_days(&search), 1);
    }

    #[test]
    fn containment_counts_inner_days() {
        let outer = DateRange::new(date(1), date(30)).expect("valid");
        let inner = DateRange::from_duration(date(5), 7).expect("valid");
        assert!(outer.overlaps(&inner));
        assert_eq!(outer.overlap_days(&inner), 7);
    }

    #[test]
    fn rejects_empty_or_inverted_ranges() {
        assert!(DateRange::new(date(3), date(3)).is_err());
        assert!(DateRange::new(date(4), date(3)).is_err());
        assert!(DateRange::from_duration(date(3), 0).is_none());
    }

    #[test]
    fn extension_pushes_end_only() {
        let range = DateRange::new(date(1), date(5)).expect("valid");
        let extended = range.extended_by(2);
        assert_eq!(extended.start(), date(1));
        assert_eq!(extended.end(), date(7));
        assert_eq!(
            range.starting_earlier_by(1).start(),
            NaiveDate::from_ymd_opt(2024, 4, 30).unwrap()
        );
    }

    fn arb_range() -> impl Strategy<Value = DateRange> {
        (0i64..400, 1u32..60).prop_map(|(offset, days)| {
            let start = NaiveDate::from_ymd_opt(2024, 1, 1).unwrap() + Duration::days(offset);
            DateRange::from_duration(start, days).unwrap()
        })
    }

    proptest! {
        #[test]
        fn overlap_is_symmetric(a in arb_range(), b in arb_range()) {
            prop_assert_eq!(a.overlaps(&b), b.overlaps(&a));
            prop_assert_eq!(a.overlap_days(&b), b.overlap_days(&a));
        }

        #[test]
        fn overlap_agrees_with_shared_days(a in arb_range(), b in arb_range()) {
            prop_assert_eq!(a.overlaps(&b), a.overlap_days(&b) > 0);
        }

        #[test]
        fn adjacent_ranges_never_overlap(a in arb_range(), days in 1u32..60) {
            let next = DateRange::from_duration(a.end(), days).unwrap();
            prop_assert!(!a.overlaps(&next));
            prop_assert!(!next.overlaps(&a));
        }
    }
}
