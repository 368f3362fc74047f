//! Close-price series and weekly resampling.

use chrono::{Datelike, Duration, NaiveDate};

/// A single daily closing price observation.
#[derive(Debug, Clone, PartialEq)]
pub struct ClosePoint {
    pub date: NaiveDate,
    pub close: f64,
}

/// The Friday that ends the week containing `date` (weeks run Saturday
/// through Friday, so a Saturday observation belongs to the next Friday).
pub fn week_ending(date: NaiveDate) -> NaiveDate {
    let days_to_friday = (4 + 7 - date.weekday().num_days_from_monday()) % 7;
    date + Duration::days(days_to_friday as i64)
}

/// Resample a chronologically ordered daily series to weekly observations:
/// the last observed close in each week, labelled with that week's Friday.
/// Non-finite closes are dropped before grouping.
pub fn resample_weekly(points: &[ClosePoint]) -> Vec<ClosePoint> {
    let mut weekly: Vec<ClosePoint> = Vec::new();

    for point in points {
        if !point.close.is_finite() {
            continue;
        }
        let label = week_ending(point.date);
        if let Some(last) = weekly.last_mut() {
            if last.date == label {
                last.close = point.close;
                continue;
            }
        }
        weekly.push(ClosePoint {
            date: label,
            close: point.close,
        });
    }

    weekly
}
