//! Datetime intervals for temporal filtering.

use crate::{Error, Result};
use chrono::{DateTime, NaiveDate, NaiveTime, TimeZone, Utc};
use std::str::FromStr;

/// A closed or half-open datetime interval.
///
/// A single instant is an interval whose start equals its end.
///
/// # Examples
///
/// ```
/// use stac_search::Interval;
///
/// let interval: Interval = "2023".parse().unwrap();
/// assert_eq!(interval.to_string(), "2023-01-01T00:00:00+00:00/2023-12-31T23:59:59.999999+00:00");
/// let interval: Interval = "2023-06-01T00:00:00Z/..".parse().unwrap();
/// assert!(interval.end.is_none());
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Interval {
    /// The start of the interval, inclusive.
    pub start: Option<DateTime<Utc>>,

    /// The end of the interval, inclusive.
    pub end: Option<DateTime<Utc>>,
}

impl Interval {
    /// Returns true if the closed range `[start, end]` overlaps this interval.
    ///
    /// # Examples
    ///
    /// ```
    /// use stac_search::Interval;
    ///
    /// let interval: Interval = "2023-06".parse().unwrap();
    /// let start = "2023-05-01T00:00:00Z".parse().unwrap();
    /// let end = "2023-06-02T00:00:00Z".parse().unwrap();
    /// assert!(interval.overlaps(start, end));
    /// ```
    pub fn overlaps(&self, start: DateTime<Utc>, end: DateTime<Utc>) -> bool {
        self.start.is_none_or(|s| end >= s) && self.end.is_none_or(|e| start <= e)
    }
}

impl FromStr for Interval {
    type Err = Error;

    fn from_str(s: &str) -> Result<Interval> {
        if let Some((start, end)) = s.split_once('/') {
            let start = if start.is_empty() || start == ".." {
                None
            } else {
                Some(parse_rfc3339(start).or_else(|_| expand_to_start(start))?)
            };
            let end = if end.is_empty() || end == ".." {
                None
            } else {
                Some(parse_rfc3339(end).or_else(|_| expand_to_end(end))?)
            };
            if start.is_none() && end.is_none() {
                return Err(Error::EmptyDatetimeInterval);
            }
            if let (Some(start), Some(end)) = (start, end) {
                if end < start {
                    return Err(Error::StartIsAfterEnd(
                        start.to_rfc3339(),
                        end.to_rfc3339(),
                    ));
                }
            }
            Ok(Interval { start, end })
        } else if let Ok(datetime) = parse_rfc3339(s) {
            Ok(Interval {
                start: Some(datetime),
                end: Some(datetime),
            })
        } else {
            Ok(Interval {
                start: Some(expand_to_start(s)?),
                end: Some(expand_to_end(s)?),
            })
        }
    }
}

impl std::fmt::Display for Interval {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match (self.start, self.end) {
            (Some(start), Some(end)) if start == end => write!(f, "{}", start.to_rfc3339()),
            (start, end) => write!(
                f,
                "{}/{}",
                start.map(|d| d.to_rfc3339()).unwrap_or("..".to_string()),
                end.map(|d| d.to_rfc3339()).unwrap_or("..".to_string())
            ),
        }
    }
}

/// Parses an RFC 3339 datetime into UTC.
pub fn parse_rfc3339(s: &str) -> Result<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(s.trim())
        .map(|datetime| datetime.with_timezone(&Utc))
        .map_err(Error::from)
}

fn expand_to_start(s: &str) -> Result<DateTime<Utc>> {
    let (year, month, day) = partial_date(s)?;
    let date = NaiveDate::from_ymd_opt(year, month.unwrap_or(1), day.unwrap_or(1))
        .ok_or_else(|| Error::UnrecognizedDateFormat(s.to_string()))?;
    Ok(Utc.from_utc_datetime(&date.and_time(NaiveTime::MIN)))
}

fn expand_to_end(s: &str) -> Result<DateTime<Utc>> {
    let (year, month, day) = partial_date(s)?;
    let date = match (month, day) {
        (Some(month), Some(day)) => NaiveDate::from_ymd_opt(year, month, day),
        (Some(month), None) => if month == 12 {
            NaiveDate::from_ymd_opt(year + 1, 1, 1)
        } else {
            NaiveDate::from_ymd_opt(year, month + 1, 1)
        }
        .and_then(|first| first.pred_opt()),
        (None, _) => NaiveDate::from_ymd_opt(year, 12, 31),
    }
    .and_then(|date| date.and_hms_micro_opt(23, 59, 59, 999_999))
    .ok_or(Error::InvalidYear(year))?;
    Ok(Utc.from_utc_datetime(&date))
}

/// Splits `YYYY`, `YYYY-MM`, or `YYYY-MM-DD` into its parts.
fn partial_date(s: &str) -> Result<(i32, Option<u32>, Option<u32>)> {
    let trimmed = s.trim();
    let unrecognized = || Error::UnrecognizedDateFormat(s.to_string());
    let parts: Vec<&str> = trimmed.split('-').collect();
    let widths_ok = match parts.len() {
        1 => parts[0].len() == 4,
        2 => parts[0].len() == 4 && parts[1].len() == 2,
        3 => parts[0].len() == 4 && parts[1].len() == 2 && parts[2].len() == 2,
        _ => false,
    };
    if !widths_ok || !parts.iter().all(|p| p.chars().all(|c| c.is_ascii_digit())) {
        return Err(unrecognized());
    }
    let year = parts[0].parse::<i32>().map_err(|_| unrecognized())?;
    let month = parts
        .get(1)
        .map(|m| m.parse::<u32>())
        .transpose()
        .map_err(|_| unrecognized())?;
    let day = parts
        .get(2)
        .map(|d| d.parse::<u32>())
        .transpose()
        .map_err(|_| unrecognized())?;
    if month.is_some_and(|m| !(1..=12).contains(&m)) {
        return Err(unrecognized());
    }
    Ok((year, month, day))
}

#[cfg(test)]
mod tests {
    use super::Interval;
    use rstest::rstest;

    #[rstest]
    #[case("2023", "2023-01-01T00:00:00+00:00/2023-12-31T23:59:59.999999+00:00")]
    #[case("2023-06", "2023-06-01T00:00:00+00:00/2023-06-30T23:59:59.999999+00:00")]
    #[case("2023-06-10", "2023-06-10T00:00:00+00:00/2023-06-10T23:59:59.999999+00:00")]
    #[case("2024-02", "2024-02-01T00:00:00+00:00/2024-02-29T23:59:59.999999+00:00")]
    #[case("2023-02", "2023-02-01T00:00:00+00:00/2023-02-28T23:59:59.999999+00:00")]
    #[case("2023-12", "2023-12-01T00:00:00+00:00/2023-12-31T23:59:59.999999+00:00")]
    #[case("2017/2018", "2017-01-01T00:00:00+00:00/2018-12-31T23:59:59.999999+00:00")]
    #[case("2020-01-01/..", "2020-01-01T00:00:00+00:00/..")]
    #[case("../2020-12-31", "../2020-12-31T23:59:59.999999+00:00")]
    #[case("2023-06-01T00:00:00Z", "2023-06-01T00:00:00+00:00")]
    #[case("2023-06-01T02:00:00+02:00", "2023-06-01T00:00:00+00:00")]
    #[case(
        "2023-01-01T00:00:00Z/2023-12-31T23:59:59Z",
        "2023-01-01T00:00:00+00:00/2023-12-31T23:59:59+00:00"
    )]
    #[case("2024-12-02T00:00:00Z/", "2024-12-02T00:00:00+00:00/..")]
    fn normalize(#[case] input: &str, #[case] expected: &str) {
        let interval: Interval = input.parse().unwrap();
        assert_eq!(interval.to_string(), expected);
    }

    #[rstest]
    #[case("../..")]
    #[case("/")]
    #[case("2023-13")]
    #[case("23")]
    #[case("not a date")]
    #[case("2023-02-30")]
    #[case("2024-01-01T00:00:00Z/2023-01-01T00:00:00Z")]
    fn invalid(#[case] input: &str) {
        let _ = input.parse::<Interval>().unwrap_err();
    }

    #[test]
    fn overlaps() {
        let interval: Interval = "2023-01-07T00:00:00Z".parse().unwrap();
        let instant = "2023-01-07T00:00:00Z".parse().unwrap();
        assert!(interval.overlaps(instant, instant));
        let later = "2023-01-08T00:00:00Z".parse().unwrap();
        assert!(!interval.overlaps(later, later));
        assert!(interval.overlaps(instant, later));
    }

    #[test]
    fn partial_date_covers_the_last_second() {
        let interval: Interval = "2023".parse().unwrap();
        let instant = "2023-12-31T23:59:59.5Z".parse().unwrap();
        assert!(interval.overlaps(instant, instant));
        let next_year = "2024-01-01T00:00:00Z".parse().unwrap();
        assert!(!interval.overlaps(next_year, next_year));
    }
}
