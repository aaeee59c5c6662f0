use chrono::{DateTime, NaiveDate, Utc};
use chrono_tz::Tz;

use crate::{error::Error, types::Published, VideoDescriptor};

/// Parses the platform's 8-digit `YYYYMMDD` calendar date.
pub fn parse_compact_date(value: &str) -> Result<NaiveDate, Error> {
    if value.len() != 8 || !value.bytes().all(|b| b.is_ascii_digit()) {
        return Err(Error::ParseError("Expected an 8-digit YYYYMMDD date"));
    }
    Ok(NaiveDate::parse_from_str(value, "%Y%m%d")?)
}

/// Whether `descriptor` was published on the calendar day `reference` falls
/// on in `zone`. A descriptor without a publish date is never fresh.
pub fn is_fresh_today(descriptor: &VideoDescriptor, reference: DateTime<Utc>, zone: Tz) -> bool {
    let today = reference.with_timezone(&zone).date_naive();

    match descriptor.published {
        Some(Published::Date(date)) => date == today,
        Some(Published::At(instant)) => instant.with_timezone(&zone).date_naive() == today,
        None => false,
    }
}

#[cfg(test)]
mod tests {
    use chrono::{Duration, TimeZone};

    use super::*;
    use crate::MediaLocator;

    fn descriptor(published: Option<Published>) -> VideoDescriptor {
        VideoDescriptor {
            id: "abc123".into(),
            title: "Evening news".into(),
            media_locator: MediaLocator::Id("abc123".into()),
            published,
        }
    }

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 5, 1, 18, 30, 0).unwrap()
    }

    #[test]
    fn test_parse_compact_date() {
        assert_eq!(
            parse_compact_date("20240501").unwrap(),
            NaiveDate::from_ymd_opt(2024, 5, 1).unwrap()
        );
        assert!(matches!(
            parse_compact_date("2024-05-01"),
            Err(Error::ParseError(_))
        ));
        assert!(matches!(parse_compact_date("20241399"), Err(Error::Date(_))));
        assert!(parse_compact_date("").is_err());
    }

    #[test]
    fn test_absent_date_is_never_fresh() {
        let d = descriptor(None);
        assert!(!is_fresh_today(&d, now(), Tz::UTC));
        assert!(!is_fresh_today(&d, now(), Tz::Europe__Istanbul));
        assert!(!is_fresh_today(&d, now() - Duration::days(400), Tz::Asia__Tokyo));
    }

    #[test]
    fn test_today_is_fresh_and_yesterday_is_not() {
        let today = now().date_naive();
        let yesterday = today.pred_opt().unwrap();

        assert!(is_fresh_today(
            &descriptor(Some(Published::Date(today))),
            now(),
            Tz::UTC
        ));
        assert!(!is_fresh_today(
            &descriptor(Some(Published::Date(yesterday))),
            now(),
            Tz::UTC
        ));
    }

    #[test]
    fn test_reference_zone_shifts_today() {
        // 22:30 UTC on May 1st is already May 2nd in Istanbul (UTC+3)
        let late = Utc.with_ymd_and_hms(2024, 5, 1, 22, 30, 0).unwrap();
        let may_2 = NaiveDate::from_ymd_opt(2024, 5, 2).unwrap();
        let d = descriptor(Some(Published::Date(may_2)));

        assert!(is_fresh_today(&d, late, Tz::Europe__Istanbul));
        assert!(!is_fresh_today(&d, late, Tz::UTC));
    }

    #[test]
    fn test_feed_instant_compared_in_zone() {
        let published = Utc.with_ymd_and_hms(2024, 5, 1, 23, 15, 0).unwrap();
        let d = descriptor(Some(Published::At(published)));
        let reference = Utc.with_ymd_and_hms(2024, 5, 2, 8, 0, 0).unwrap();

        assert!(is_fresh_today(&d, reference, Tz::Europe__Istanbul));
        assert!(!is_fresh_today(&d, reference, Tz::UTC));
    }
}
