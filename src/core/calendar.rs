//! Business-day arithmetic. Weekends are the only non-trading days; holidays
//! are not modelled.

use chrono::{Datelike, Duration, NaiveDate, Weekday};

pub fn is_business_day(date: NaiveDate) -> bool {
    !matches!(date.weekday(), Weekday::Sat | Weekday::Sun)
}

/// Returns `date` itself when it is a weekday, otherwise steps back one day at
/// a time until a weekday is reached.
pub fn last_weekday(date: NaiveDate) -> NaiveDate {
    if is_business_day(date) {
        date
    } else {
        previous_business_day(date)
    }
}

/// The business day strictly before `date`.
pub fn previous_business_day(date: NaiveDate) -> NaiveDate {
    last_weekday(date - Duration::days(1))
}

/// Lazily walks the business days in `[from, to]`.
///
/// The iterator is `Clone`, so a cloned copy restarts from wherever the
/// original was when cloned.
pub fn business_days(from: NaiveDate, to: NaiveDate) -> BusinessDays {
    BusinessDays {
        next: from,
        end: to,
    }
}

/// Number of business-day steps from `from` (exclusive) to `to` (inclusive).
/// Returns zero when `to` is not after `from`.
pub fn business_days_between(from: NaiveDate, to: NaiveDate) -> usize {
    if to <= from {
        return 0;
    }
    business_days(from + Duration::days(1), to).count()
}

#[derive(Debug, Clone)]
pub struct BusinessDays {
    next: NaiveDate,
    end: NaiveDate,
}

impl Iterator for BusinessDays {
    type Item = NaiveDate;

    fn next(&mut self) -> Option<Self::Item> {
        while self.next <= self.end {
            let current = self.next;
            self.next = current + Duration::days(1);
            if is_business_day(current) {
                return Some(current);
            }
        }
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(s: &str) -> NaiveDate {
        NaiveDate::parse_from_str(s, "%Y-%m-%d").unwrap()
    }

    #[test]
    fn test_last_weekday_collapses_weekend_to_friday() {
        // 2017-04-08 is a Saturday
        assert_eq!(last_weekday(date("2017-04-08")), date("2017-04-07"));
        assert_eq!(last_weekday(date("2017-04-09")), date("2017-04-07"));
        assert_eq!(last_weekday(date("2017-04-10")), date("2017-04-10"));
    }

    #[test]
    fn test_previous_business_day() {
        assert_eq!(previous_business_day(date("2017-04-10")), date("2017-04-07"));
        assert_eq!(previous_business_day(date("2017-04-12")), date("2017-04-11"));
        assert_eq!(previous_business_day(date("2017-04-09")), date("2017-04-07"));
    }

    #[test]
    fn test_business_days_skips_weekends() {
        let days: Vec<_> = business_days(date("2017-04-06"), date("2017-04-11")).collect();
        assert_eq!(
            days,
            vec![
                date("2017-04-06"),
                date("2017-04-07"),
                date("2017-04-10"),
                date("2017-04-11"),
            ]
        );
    }

    #[test]
    fn test_business_days_is_restartable() {
        let mut days = business_days(date("2017-04-03"), date("2017-04-07"));
        days.next();
        let restarted = days.clone();
        assert_eq!(days.count(), 4);
        assert_eq!(restarted.count(), 4);
    }

    #[test]
    fn test_business_days_empty_when_reversed() {
        assert_eq!(business_days(date("2017-04-07"), date("2017-04-03")).count(), 0);
        assert_eq!(business_days(date("2017-04-08"), date("2017-04-09")).count(), 0);
    }

    #[test]
    fn test_business_days_between() {
        assert_eq!(business_days_between(date("2017-04-03"), date("2017-04-07")), 4);
        assert_eq!(business_days_between(date("2017-04-07"), date("2017-04-14")), 5);
        assert_eq!(business_days_between(date("2017-04-03"), date("2017-04-13")), 8);
        assert_eq!(business_days_between(date("2017-04-07"), date("2017-04-07")), 0);
    }
}
