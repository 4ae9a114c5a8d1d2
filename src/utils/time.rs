use chrono::{DateTime, Local, NaiveDate, NaiveTime, TimeZone, Utc};

/// This is the standard way of converting a date to a string in habitwatch.
pub fn date_key(date: NaiveDate) -> String {
    date.format("%Y-%m-%d").to_string()
}

/// Calendar day of an instant in local time.
pub fn local_day(moment: DateTime<Utc>) -> NaiveDate {
    moment.with_timezone(&Local).date_naive()
}

/// Canonical instant of a calendar day: local midnight. When midnight doesn't exist locally (DST
/// jumps) the earliest valid instant of that day is used, and UTC midnight as a last resort.
pub fn day_start(date: NaiveDate) -> DateTime<Utc> {
    let midnight = date.and_time(NaiveTime::MIN);
    Local
        .from_local_datetime(&midnight)
        .earliest()
        .or_else(|| {
            (1..=3)
                .filter_map(|h| NaiveTime::from_hms_opt(h, 0, 0))
                .find_map(|t| Local.from_local_datetime(&date.and_time(t)).earliest())
        })
        .map(|v| v.with_timezone(&Utc))
        .unwrap_or_else(|| Utc.from_utc_datetime(&midnight))
}
