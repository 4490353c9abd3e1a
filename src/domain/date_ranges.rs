// Date-range buckets for the metrics table columns
use super::metric::MetricFrequency;
use chrono::{Datelike, Days, Months, NaiveDate, Weekday};
use serde::Serialize;

/// Inclusive range of calendar days covered by one table column.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct DateRange {
    pub start: NaiveDate,
    pub end: NaiveDate,
}

/// The bucket of the given frequency that contains `date`.
///
/// Returns `None` only at the edges of chrono's supported calendar.
pub fn date_range_containing(
    frequency: MetricFrequency,
    date: NaiveDate,
    week_start: Weekday,
) -> Option<DateRange> {
    match frequency {
        MetricFrequency::Daily => Some(DateRange {
            start: date,
            end: date,
        }),
        MetricFrequency::Weekly => {
            let offset = (date.weekday().num_days_from_monday() + 7
                - week_start.num_days_from_monday())
                % 7;
            let start = date.checked_sub_days(Days::new(offset as u64))?;
            let end = start.checked_add_days(Days::new(6))?;
            Some(DateRange { start, end })
        }
        MetricFrequency::Monthly => {
            let start = first_of_month(date)?;
            let end = start.checked_add_months(Months::new(1))?.pred_opt()?;
            Some(DateRange { start, end })
        }
        MetricFrequency::Quarterly => {
            let start = first_of_month(date)?.checked_sub_months(Months::new(date.month0() % 3))?;
            let end = start.checked_add_months(Months::new(3))?.pred_opt()?;
            Some(DateRange { start, end })
        }
    }
}

/// `count` contiguous buckets, oldest first, ending with the one containing `anchor`.
pub fn get_date_ranges(
    frequency: MetricFrequency,
    anchor: NaiveDate,
    count: usize,
    week_start: Weekday,
) -> Vec<DateRange> {
    let mut ranges = Vec::with_capacity(count);
    let mut cursor = Some(anchor);

    while ranges.len() < count {
        let Some(range) = cursor.and_then(|d| date_range_containing(frequency, d, week_start)) else {
            break;
        };
        cursor = range.start.pred_opt();
        ranges.push(range);
    }

    ranges.reverse();
    ranges
}

fn first_of_month(date: NaiveDate) -> Option<NaiveDate> {
    date.checked_sub_days(Days::new(date.day0() as u64))
}
