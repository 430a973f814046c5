//! Status-bar clock and "last edited" phrasing.

use chrono::{DateTime, Datelike, FixedOffset, NaiveDate, Timelike, Utc};
use regex::{Captures, Regex};
use std::sync::OnceLock;

const DAY_NAMES: [&str; 7] = [
    "Sunday",
    "Monday",
    "Tuesday",
    "Wednesday",
    "Thursday",
    "Friday",
    "Saturday",
];

const MONTH_NAMES: [&str; 12] = [
    "January",
    "February",
    "March",
    "April",
    "May",
    "June",
    "July",
    "August",
    "September",
    "October",
    "November",
    "December",
];

/// Mask used for history item dates.
pub const HISTORY_DATE_FORMAT: &str = "dd/mm/yyyy, HH:MM:ss";

/// Expands a named mask such as `isoDateTime` or `shortTime`.
fn named_mask(name: &str) -> Option<&'static str> {
    let mask = match name {
        "default" => "ddd mmm dd yyyy HH:MM:ss",
        "shortDate" => "m/d/yy",
        "paddedShortDate" => "mm/dd/yyyy",
        "mediumDate" => "mmm d, yyyy",
        "longDate" => "mmmm d, yyyy",
        "fullDate" => "dddd, mmmm d, yyyy",
        "shortTime" => "h:MM TT",
        "mediumTime" => "h:MM:ss TT",
        "longTime" => "h:MM:ss TT Z",
        "isoDate" => "yyyy-mm-dd",
        "isoTime" => "HH:MM:ss",
        "isoDateTime" => "yyyy-mm-dd'T'HH:MM:sso",
        "isoUtcDateTime" => "UTC:yyyy-mm-dd'T'HH:MM:ss'Z'",
        "expiresHeaderFormat" => "ddd, dd mmm yyyy HH:MM:ss Z",
        _ => return None,
    };
    Some(mask)
}

#[derive(Clone, Copy, PartialEq, Eq)]
enum Zone {
    Local,
    Utc,
    Gmt,
}

struct Stamp {
    moment: DateTime<FixedOffset>,
    zone: Zone,
    today: NaiveDate,
}

/// Formats `moment` with a dateformat-style mask such as
/// `dd/mm/yyyy - HH:MM:ss`, or one of the named masks. A `UTC:` or `GMT:`
/// prefix formats in UTC. Quoted runs are copied without their quotes.
/// `today` anchors the `DDD`/`DDDD` tokens ("Yesterday", "Today", ...).
pub fn format_date(moment: &DateTime<FixedOffset>, mask: &str, today: NaiveDate) -> String {
    static RE_TOKEN: OnceLock<Regex> = OnceLock::new();
    let re = RE_TOKEN.get_or_init(|| {
        Regex::new(
            r#"d{1,4}|D{3,4}|m{1,4}|yy(?:yy)?|HH?|hh?|MM?|ss?|TT?|tt?|W{1,2}|[LlopSZN]|"[^"]*"|'[^']*'"#,
        )
        .expect("valid date mask regex")
    });

    let mask = named_mask(mask).unwrap_or(mask);
    let (mask, zone) = match mask.get(..4) {
        Some("UTC:") => (&mask[4..], Zone::Utc),
        Some("GMT:") => (&mask[4..], Zone::Gmt),
        _ => (mask, Zone::Local),
    };
    let moment = match zone {
        Zone::Local => *moment,
        Zone::Utc | Zone::Gmt => moment.with_timezone(&Utc).fixed_offset(),
    };
    let stamp = Stamp {
        moment,
        zone,
        today,
    };

    re.replace_all(mask, |caps: &Captures| {
        let token = caps.get(0).map(|m| m.as_str()).unwrap_or_default();
        expand_token(&stamp, token)
    })
    .into_owned()
}

fn expand_token(stamp: &Stamp, token: &str) -> String {
    let moment = &stamp.moment;
    let day = moment.day();
    let weekday = moment.weekday().num_days_from_sunday() as usize;
    let month = moment.month0() as usize;
    let hour = moment.hour();
    let hour12 = match hour % 12 {
        0 => 12,
        h => h,
    };
    let pm = hour >= 12;
    let east = moment.offset().local_minus_utc() / 60;
    let sign = if east < 0 { '-' } else { '+' };
    let (off_h, off_m) = (east.abs() / 60, east.abs() % 60);

    match token {
        "d" => day.to_string(),
        "dd" => format!("{day:02}"),
        "ddd" => DAY_NAMES[weekday][..3].to_string(),
        "dddd" => DAY_NAMES[weekday].to_string(),
        "DDD" | "DDDD" => {
            let relative = match (moment.date_naive() - stamp.today).num_days() {
                -1 => Some(("Ysd", "Yesterday")),
                0 => Some(("Tdy", "Today")),
                1 => Some(("Tmw", "Tomorrow")),
                _ => None,
            };
            match (relative, token.len()) {
                (Some((short, _)), 3) => short.to_string(),
                (Some((_, long)), _) => long.to_string(),
                (None, 3) => DAY_NAMES[weekday][..3].to_string(),
                (None, _) => DAY_NAMES[weekday].to_string(),
            }
        }
        "m" => (month + 1).to_string(),
        "mm" => format!("{:02}", month + 1),
        "mmm" => MONTH_NAMES[month][..3].to_string(),
        "mmmm" => MONTH_NAMES[month].to_string(),
        "yy" => format!("{:02}", moment.year().rem_euclid(100)),
        "yyyy" => moment.year().to_string(),
        "h" => hour12.to_string(),
        "hh" => format!("{hour12:02}"),
        "H" => hour.to_string(),
        "HH" => format!("{hour:02}"),
        "M" => moment.minute().to_string(),
        "MM" => format!("{:02}", moment.minute()),
        "s" => moment.second().to_string(),
        "ss" => format!("{:02}", moment.second()),
        "l" => format!("{:03}", moment.timestamp_subsec_millis().min(999)),
        "L" => format!("{:02}", moment.timestamp_subsec_millis().min(999) / 10),
        "t" => if pm { "p" } else { "a" }.to_string(),
        "tt" => if pm { "pm" } else { "am" }.to_string(),
        "T" => if pm { "P" } else { "A" }.to_string(),
        "TT" => if pm { "PM" } else { "AM" }.to_string(),
        "o" => format!("{sign}{off_h:02}{off_m:02}"),
        "p" => format!("{sign}{off_h:02}:{off_m:02}"),
        "Z" => match stamp.zone {
            Zone::Gmt => "GMT".to_string(),
            Zone::Utc => "UTC".to_string(),
            Zone::Local if east == 0 => "UTC".to_string(),
            Zone::Local => format!("GMT{sign}{off_h:02}{off_m:02}"),
        },
        "W" => moment.iso_week().week().to_string(),
        "WW" => format!("{:02}", moment.iso_week().week()),
        "N" => moment.weekday().number_from_monday().to_string(),
        "S" => ordinal_suffix(day).to_string(),
        quoted => quoted[1..quoted.len() - 1].to_string(),
    }
}

fn ordinal_suffix(day: u32) -> &'static str {
    match (day % 10, day % 100) {
        (1, n) if n != 11 => "st",
        (2, n) if n != 12 => "nd",
        (3, n) if n != 13 => "rd",
        _ => "th",
    }
}

/// English relative time in the style of "3 minutes ago" / "in 2 days".
pub fn time_ago(then: DateTime<Utc>, now: DateTime<Utc>) -> String {
    const STEPS: [f64; 6] = [60.0, 60.0, 24.0, 7.0, 365.0 / 7.0 / 12.0, 12.0];
    const UNITS: [&str; 7] = ["second", "minute", "hour", "day", "week", "month", "year"];

    let seconds = (now - then).num_seconds();
    let future = seconds < 0;
    let mut diff = seconds.unsigned_abs() as f64;

    let mut index = 0;
    while index < STEPS.len() && diff >= STEPS[index] {
        diff /= STEPS[index];
        index += 1;
    }
    let diff = diff.floor() as u64;
    let mut slot = index * 2;
    if diff > if slot == 0 { 9 } else { 1 } {
        slot += 1;
    }

    if slot == 0 {
        return if future { "right now" } else { "just now" }.to_string();
    }
    let unit = UNITS[slot / 2];
    let plural = if diff > 1 { "s" } else { "" };
    if future {
        format!("in {diff} {unit}{plural}")
    } else {
        format!("{diff} {unit}{plural} ago")
    }
}

/// Parses a stored `lastEdited` value. `0`, empty and unreadable values mean
/// "never".
pub fn parse_last_edited(raw: &str) -> Option<DateTime<Utc>> {
    let raw = raw.trim();
    if raw.is_empty() || raw.parse::<f64>().is_ok_and(|n| n == 0.0) {
        return None;
    }
    if let Ok(moment) = DateTime::parse_from_rfc3339(raw) {
        return Some(moment.with_timezone(&Utc));
    }
    // Older builds stored `Date.prototype.toString()`, e.g.
    // "Mon Jan 01 2024 10:00:00 GMT+0100 (Central European Standard Time)".
    let head = raw.split(" (").next().unwrap_or(raw);
    DateTime::parse_from_str(head, "%a %b %d %Y %H:%M:%S GMT%z")
        .ok()
        .map(|moment| moment.with_timezone(&Utc))
}

pub fn last_edited_label(stored: Option<&str>, now: DateTime<Utc>) -> String {
    match stored.and_then(parse_last_edited) {
        Some(then) => format!("Last edited: {}", time_ago(then, now)),
        None => "Last edited: Never".to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone};

    fn moment() -> DateTime<FixedOffset> {
        FixedOffset::east_opt(2 * 3600)
            .unwrap()
            .with_ymd_and_hms(2024, 3, 2, 14, 5, 9)
            .unwrap()
    }

    fn day(d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 3, d).unwrap()
    }

    fn fmt(mask: &str) -> String {
        format_date(&moment(), mask, day(2))
    }

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 6, 1, 12, 0, 0).unwrap()
    }

    #[test]
    fn formats_default_mask() {
        assert_eq!(
            fmt("dd/mm/yyyy - HH:MM:ss"),
            "02/03/2024 - 14:05:09"
        );
    }

    #[test]
    fn formats_names_and_twelve_hour_clock() {
        assert_eq!(
            fmt("dddd, mmmm dS, yyyy h:MM TT"),
            "Saturday, March 2nd, 2024 2:05 PM"
        );
        assert_eq!(fmt("ddd mmm yy"), "Sat Mar 24");
    }

    #[test]
    fn copies_quoted_literals_and_offsets() {
        assert_eq!(fmt("'day' d 'at' H"), "day 2 at 14");
        assert_eq!(fmt("o"), "+0200");
    }

    #[test]
    fn formats_week_zone_and_weekday_tokens() {
        assert_eq!(fmt("W WW N"), "9 09 6");
        assert_eq!(fmt("p Z"), "+02:00 GMT+0200");
        assert_eq!(fmt("UTC:HH:MM Z o"), "12:05 UTC +0000");
        assert_eq!(fmt("GMT:H Z"), "12 GMT");
    }

    #[test]
    fn relative_day_names() {
        assert_eq!(fmt("DDDD DDD"), "Today Tdy");
        assert_eq!(format_date(&moment(), "DDDD DDD", day(3)), "Yesterday Ysd");
        assert_eq!(format_date(&moment(), "DDDD DDD", day(1)), "Tomorrow Tmw");
        assert_eq!(format_date(&moment(), "DDDD DDD", day(10)), "Saturday Sat");
    }

    #[test]
    fn expands_named_masks() {
        assert_eq!(fmt("isoDateTime"), "2024-03-02T14:05:09+0200");
        assert_eq!(fmt("isoUtcDateTime"), "2024-03-02T12:05:09Z");
        assert_eq!(fmt("shortTime"), "2:05 PM");
        assert_eq!(fmt("longTime"), "2:05:09 PM GMT+0200");
        assert_eq!(fmt("shortDate"), "3/2/24");
    }

    #[test]
    fn ordinal_suffixes() {
        let days: Vec<&str> = [1, 2, 3, 4, 11, 12, 13, 21, 22, 23]
            .into_iter()
            .map(ordinal_suffix)
            .collect();
        assert_eq!(
            days,
            vec!["st", "nd", "rd", "th", "th", "th", "th", "st", "nd", "rd"]
        );
    }

    #[test]
    fn relative_phrasing() {
        let cases = [
            (Duration::seconds(3), "just now"),
            (Duration::seconds(42), "42 seconds ago"),
            (Duration::seconds(61), "1 minute ago"),
            (Duration::minutes(5), "5 minutes ago"),
            (Duration::hours(1), "1 hour ago"),
            (Duration::days(3), "3 days ago"),
            (Duration::days(14), "2 weeks ago"),
            (Duration::days(400), "1 year ago"),
        ];
        for (ago, expected) in cases {
            assert_eq!(time_ago(now() - ago, now()), expected, "{ago:?}");
        }
        assert_eq!(time_ago(now() + Duration::hours(3), now()), "in 3 hours");
    }

    #[test]
    fn last_edited_never_and_legacy_values() {
        assert_eq!(last_edited_label(None, now()), "Last edited: Never");
        assert_eq!(last_edited_label(Some("0"), now()), "Last edited: Never");
        assert_eq!(last_edited_label(Some("garbage"), now()), "Last edited: Never");

        let recent = (now() - Duration::minutes(2)).to_rfc3339();
        assert_eq!(
            last_edited_label(Some(&recent), now()),
            "Last edited: 2 minutes ago"
        );

        let legacy = "Sat Jun 01 2024 13:00:00 GMT+0200 (Central European Summer Time)";
        assert_eq!(
            parse_last_edited(legacy),
            Some(Utc.with_ymd_and_hms(2024, 6, 1, 11, 0, 0).unwrap())
        );
    }
}
