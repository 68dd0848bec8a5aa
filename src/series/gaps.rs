use crate::core::bar::Bar;
use crate::core::calendar::business_days;
use chrono::NaiveDate;
use std::collections::HashSet;

/// Business days in `[from, to]` that have no bar, in ascending order.
pub fn find_missing(bars: &[Bar], from: NaiveDate, to: NaiveDate) -> Vec<NaiveDate> {
    let present: HashSet<NaiveDate> = bars.iter().map(|b| b.date).collect();
    business_days(from, to)
        .filter(|d| !present.contains(d))
        .collect()
}

/// The smallest range covering every missing date, if there are any.
pub fn covering_range(missing: &[NaiveDate]) -> Option<(NaiveDate, NaiveDate)> {
    let first = missing.iter().min()?;
    let last = missing.iter().max()?;
    Some((*first, *last))
}
