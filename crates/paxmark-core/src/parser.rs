//! Staged parser for one manifest row.
//!
//! A row reads, in order: optional sequence number, reservation id, name,
//! four headcount digits, phone, `pickup→dropoff` route, flight label,
//! travel period, booking site and fare class. The first two stages are
//! mandatory; every later stage is optional and consumes the text it
//! matched so the next stage only sees what follows.

use std::sync::LazyLock;

use regex::Regex;

use crate::error::ParseFailure;
use crate::normalize::{normalize, unify_glyphs};
use crate::status::{Headcount, StatusValue};

static HEADER: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^(?:(?P<no>\d{1,2}))?(?P<resv>\d[A-Z]{1,2}-\d{4,})").expect("header pattern")
});
static HEADCOUNT: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"([0-9])([0-9])([0-9])([0-9])").expect("headcount pattern"));
static PHONE_HYPHENATED: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?:0\d{1,4}|[1-9]\d{1,3})-\d{2,4}-\d{3,4}").expect("phone pattern")
});
static PHONE_BARE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?:0\d{9,10}|[1-9]\d{8,10})").expect("phone pattern"));
static ROUTE_WITH_FLIGHT: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"([^→]+)→([^→]+?)(\d{1,3}便)").expect("route pattern"));
static FLIGHT: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(\d{1,3}便)").expect("flight pattern"));
static ROUTE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"([^→]+)→([^→]+)").expect("route pattern"));
static PERIOD: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\d{2}/\d{2}/\d{2}-\d{2}/\d{2}").expect("period pattern"));
static FARE_CLASS: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"([0-9I][0-9])$").expect("class pattern"));
static RESERVATION_LIKE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[A-Z0-9]{1,5}-[0-9]{3,}").expect("reservation pattern"));

/// Booking-site labels as they appear on manifests, in priority order.
pub const KNOWN_SITES: &[&str] = &[
    "ジャムジャムヒカク",
    "ジャムジャムライナー",
    "WILLER",
    "ラクテン",
    "ｼﾞｬﾑｼﾞｬﾑﾋｶｸ",
    "ｼﾞｬﾑｼﾞｬﾑﾗｲﾅｰ",
    "ﾗｸﾃﾝ",
];

/// Normalized form of each site paired with the first label spelling it.
static NORMALIZED_SITES: LazyLock<Vec<(String, &'static str)>> = LazyLock::new(|| {
    let mut sites: Vec<(String, &'static str)> = Vec::new();
    for label in KNOWN_SITES {
        let normalized = normalize(label);
        if !sites.iter().any(|(n, _)| *n == normalized) {
            sites.push((normalized, *label));
        }
    }
    sites
});

/// Route between two stops.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Route {
    pub pickup: String,
    pub dropoff: String,
}

/// One passenger row of a manifest.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct PassengerRecord {
    /// Printed row number, if any.
    pub sequence: Option<String>,
    pub reservation_id: String,
    pub name: String,
    /// Headcount digits as printed; the total is not checked against the sum.
    pub headcount: Headcount,
    pub phone: Option<String>,
    pub route: Option<Route>,
    /// Flight label such as `123便`.
    pub flight: Option<String>,
    pub travel_period: Option<String>,
    pub booking_site: Option<String>,
    pub fare_class: Option<String>,
    /// Zero-based page the row was found on.
    pub page_index: usize,
}

/// Remaining text of a row and the offset the next stage starts from.
struct Cursor {
    text: String,
    pos: usize,
}

impl Cursor {
    fn rest(&self) -> &str {
        &self.text[self.pos..]
    }

    fn advance(&mut self, by: usize) {
        self.pos += by;
    }

    /// Remove `start..end` (relative to the cursor) from the text.
    fn cut(&mut self, start: usize, end: usize) {
        let (start, end) = (self.pos + start, self.pos + end);
        self.text.replace_range(start..end, "");
    }
}

/// Parse one normalized manifest row.
///
/// Whitespace and dash/arrow variants are unified again before matching, so
/// lightly normalized input is accepted too.
pub fn parse_passenger_line(line: &str, page_index: usize) -> Result<PassengerRecord, ParseFailure> {
    let mut cursor = Cursor {
        text: unify_glyphs(line),
        pos: 0,
    };

    let (sequence, reservation_id) = parse_header(&mut cursor)?;
    let (name, headcount) = parse_name_and_headcount(&mut cursor)?;
    let phone = take_phone(&mut cursor);
    let (route, flight) = take_route_and_flight(&mut cursor);
    let travel_period = take_period(&mut cursor);
    let (booking_site, fare_class) = take_site_and_class(&cursor);

    Ok(PassengerRecord {
        sequence,
        reservation_id,
        name,
        headcount,
        phone,
        route,
        flight,
        travel_period,
        booking_site,
        fare_class,
        page_index,
    })
}

fn parse_header(cursor: &mut Cursor) -> Result<(Option<String>, String), ParseFailure> {
    let caps = HEADER
        .captures(cursor.rest())
        .ok_or(ParseFailure::MissingHeader)?;
    let sequence = caps.name("no").map(|m| m.as_str().to_string());
    let resv = caps
        .name("resv")
        .map(|m| m.as_str().to_string())
        .ok_or(ParseFailure::MissingHeader)?;
    let end = caps.get(0).map_or(0, |m| m.end());
    cursor.advance(end);
    Ok((sequence, resv))
}

fn parse_name_and_headcount(cursor: &mut Cursor) -> Result<(String, Headcount), ParseFailure> {
    let caps = HEADCOUNT
        .captures(cursor.rest())
        .ok_or(ParseFailure::MissingHeadcount)?;
    let whole = caps.get(0).ok_or(ParseFailure::MissingHeadcount)?;
    let name = cursor.rest()[..whole.start()].to_string();
    let digit = |i: usize| -> u32 {
        caps.get(i)
            .and_then(|m| m.as_str().parse().ok())
            .unwrap_or(0)
    };
    let headcount = Headcount::printed(digit(1), digit(2), digit(3), digit(4));
    let end = whole.end();
    cursor.advance(end);
    Ok((name, headcount))
}

/// Format a phone number by digit count: 11 digits as 3-4-4, 10 as 2-4-4.
pub fn normalize_phone(raw: &str) -> String {
    let digits: String = raw.chars().filter(|c| c.is_ascii_digit()).collect();
    match digits.len() {
        11 => format!("{}-{}-{}", &digits[..3], &digits[3..7], &digits[7..]),
        10 => format!("{}-{}-{}", &digits[..2], &digits[2..6], &digits[6..]),
        _ => raw.to_string(),
    }
}

fn take_phone(cursor: &mut Cursor) -> Option<String> {
    let found = [&*PHONE_HYPHENATED, &*PHONE_BARE]
        .iter()
        .find_map(|re| re.find(cursor.rest()))
        .map(|m| (m.start(), m.end(), m.as_str().to_string()))?;
    let (start, end, raw) = found;
    cursor.cut(start, end);
    Some(normalize_phone(&raw))
}

fn take_route_and_flight(cursor: &mut Cursor) -> (Option<Route>, Option<String>) {
    if let Some(caps) = ROUTE_WITH_FLIGHT.captures(cursor.rest()) {
        let route = Route {
            pickup: caps[1].to_string(),
            dropoff: caps[2].to_string(),
        };
        let flight = caps[3].to_string();
        let end = caps.get(0).map_or(0, |m| m.end());
        cursor.advance(end);
        return (Some(route), Some(flight));
    }

    let Some(m) = FLIGHT.find(cursor.rest()) else {
        return (None, None);
    };
    let (start, end) = (m.start(), m.end());
    let flight = m.as_str().to_string();
    let route = ROUTE
        .captures(&cursor.rest()[..start])
        .map(|caps| Route {
            pickup: caps[1].to_string(),
            dropoff: caps[2].to_string(),
        });
    cursor.advance(end);
    (route, Some(flight))
}

fn take_period(cursor: &mut Cursor) -> Option<String> {
    let m = PERIOD.find(cursor.rest())?;
    let (period, end) = (m.as_str().to_string(), m.end());
    cursor.advance(end);
    Some(period)
}

fn take_site_and_class(cursor: &Cursor) -> (Option<String>, Option<String>) {
    let rest = cursor.rest();
    let class_of = |text: &str| {
        FARE_CLASS
            .captures(text)
            .map(|caps| caps[1].to_string())
    };
    for (normalized, label) in NORMALIZED_SITES.iter() {
        if let Some((_, after)) = rest.split_once(normalized.as_str()) {
            return (Some(label.to_string()), class_of(after));
        }
    }
    (None, class_of(rest))
}

/// Status printed on a row: `NS` or `CXL` not followed by a letter or digit.
pub fn printed_status(line: &str) -> StatusValue {
    if has_standalone_token(line, "NS") {
        StatusValue::NoShow
    } else if has_standalone_token(line, "CXL") {
        StatusValue::Cancelled
    } else {
        StatusValue::None
    }
}

fn has_standalone_token(line: &str, token: &str) -> bool {
    line.match_indices(token).any(|(idx, _)| {
        !line[idx + token.len()..]
            .chars()
            .next()
            .is_some_and(|c| c.is_ascii_alphanumeric())
    })
}

/// Whether a line holds something shaped like a reservation id.
pub fn has_reservation_like_token(line: &str) -> bool {
    RESERVATION_LIKE.is_match(line)
}

#[cfg(test)]
mod tests {
    use super::*;

    const SCENARIO_A: &str =
        "05 9J-123456 田中太郎 2100 09012345678 成田空港→ホテルABC123便25/01/01-25/01/03WILLER01";

    #[test]
    fn parses_full_row() {
        let record = parse_passenger_line(&normalize(SCENARIO_A), 2).unwrap();
        assert_eq!(record.sequence.as_deref(), Some("05"));
        assert_eq!(record.reservation_id, "9J-123456");
        assert_eq!(record.name, "田中太郎");
        assert_eq!(record.headcount, Headcount::printed(2, 1, 0, 0));
        assert_eq!(record.phone.as_deref(), Some("090-1234-5678"));
        assert_eq!(
            record.route,
            Some(Route {
                pickup: "成田空港".to_string(),
                dropoff: "ホテルABC".to_string(),
            })
        );
        assert_eq!(record.flight.as_deref(), Some("123便"));
        assert_eq!(record.travel_period.as_deref(), Some("25/01/01-25/01"));
        assert_eq!(record.booking_site.as_deref(), Some("WILLER"));
        assert_eq!(record.fare_class.as_deref(), Some("01"));
        assert_eq!(record.page_index, 2);
    }

    #[test]
    fn missing_reservation_id_is_rejected() {
        assert_eq!(
            parse_passenger_line("合計人数 5 3 1 9", 0),
            Err(ParseFailure::MissingHeader)
        );
        assert_eq!(parse_passenger_line("", 0), Err(ParseFailure::MissingHeader));
    }

    #[test]
    fn missing_headcount_is_rejected() {
        assert_eq!(
            parse_passenger_line("9J-123456山田", 0),
            Err(ParseFailure::MissingHeadcount)
        );
    }

    #[test]
    fn sequence_number_is_optional() {
        let record = parse_passenger_line("9JA-0001山田1001", 0).unwrap();
        assert_eq!(record.sequence, None);
        assert_eq!(record.reservation_id, "9JA-0001");
        assert_eq!(record.name, "山田");
        assert_eq!(record.headcount, Headcount::printed(1, 0, 0, 1));
        assert_eq!(record.phone, None);
        assert_eq!(record.flight, None);
    }

    #[test]
    fn total_digit_is_kept_as_printed() {
        let record = parse_passenger_line("9J-1234佐藤2109", 0).unwrap();
        assert_eq!(record.headcount.total, 9);
    }

    #[test]
    fn hyphenated_phone_is_reformatted_and_removed() {
        let record =
            parse_passenger_line("1 9J-5555鈴木1001 03-1234-5678 東京→大阪12便", 0).unwrap();
        assert_eq!(record.phone.as_deref(), Some("03-1234-5678"));
        assert_eq!(record.flight.as_deref(), Some("12便"));
        assert_eq!(record.route.unwrap().pickup, "東京");
    }

    #[test]
    fn phone_not_starting_with_zero_is_accepted() {
        let record = parse_passenger_line("9J-5555Lee1001 336-5266-7188 A→B7便", 0).unwrap();
        // eleven digits are regrouped 3-4-4
        assert_eq!(record.phone.as_deref(), Some("336-5266-7188"));

        let record = parse_passenger_line("9J-5556Kim1001 15089178424 A→B7便", 0).unwrap();
        assert_eq!(record.phone.as_deref(), Some("150-8917-8424"));
    }

    #[test]
    fn bare_ten_digit_phone_is_grouped_two_four_four() {
        let record = parse_passenger_line("9J-5557Mori1001 0312345678 A→B7便", 0).unwrap();
        assert_eq!(record.phone.as_deref(), Some("03-1234-5678"));
        assert_eq!(normalize_phone("0312345678"), "03-1234-5678");
    }

    #[test]
    fn odd_length_phone_is_kept_raw() {
        assert_eq!(normalize_phone("123-456-7890"), "12-3456-7890");
        assert_eq!(normalize_phone("12-34-567"), "12-34-567");
    }

    #[test]
    fn flight_without_route_before_it() {
        let record = parse_passenger_line("9J-1111高橋1001 33便", 0).unwrap();
        assert_eq!(record.flight.as_deref(), Some("33便"));
        assert_eq!(record.route, None);
    }

    #[test]
    fn class_without_known_site() {
        let record = parse_passenger_line("9J-1111高橋1001 A→B33便 OTHERI2", 0).unwrap();
        assert_eq!(record.booking_site, None);
        assert_eq!(record.fare_class.as_deref(), Some("I2"));
    }

    #[test]
    fn halfwidth_site_label_matches_after_normalization() {
        let line = normalize("9J-2222伊藤1001 A→B9便ﾗｸﾃﾝ02");
        let record = parse_passenger_line(&line, 0).unwrap();
        assert_eq!(record.booking_site.as_deref(), Some("ラクテン"));
        assert_eq!(record.fare_class.as_deref(), Some("02"));
    }

    #[test]
    fn site_with_prolonged_mark_matches_after_normalization() {
        let line = normalize("9J-2223伊藤1001 A→B9便ジャムジャムライナー15");
        let record = parse_passenger_line(&line, 0).unwrap();
        assert_eq!(record.booking_site.as_deref(), Some("ジャムジャムライナー"));
        assert_eq!(record.fare_class.as_deref(), Some("15"));
    }

    #[test]
    fn printed_status_detection() {
        assert_eq!(printed_status("9J-1234 NS"), StatusValue::NoShow);
        assert_eq!(printed_status("9J-1234CXL"), StatusValue::Cancelled);
        assert_eq!(printed_status("9J-1234 NSX"), StatusValue::None);
        assert_eq!(printed_status("CXL1 NS2"), StatusValue::None);
        assert_eq!(printed_status("CXL1 NS"), StatusValue::NoShow);
        assert_eq!(printed_status("plain"), StatusValue::None);
    }

    #[test]
    fn reservation_like_token() {
        assert!(has_reservation_like_token("9J-123456"));
        assert!(!has_reservation_like_token("9J-12"));
    }
}
