//! Alert events, as broadcast by `wxrd`

use std::fmt;
use std::str::FromStr;

use chrono::{Duration, Local, NaiveDateTime};
use lazy_static::lazy_static;
use regex::Regex;
use thiserror::Error;

use crate::originator::Originator;

/// Producer tag carried by every decoded [`Event`]
pub const SOURCE: &str = "wxrd";

// wire format of the start time, without the `+HHMM` suffix
const START_TIME_FORMAT: &str = "%Y%m%dT%H%M%S";

// events issued closer together than this are the same event
const SAME_EVENT_MILLIS: i64 = 45_000;

/// A decoded weather alert
///
/// `wxrd` sends one alert per line, in the form
///
/// ```txt
/// WXR RWT 039103-039153 20061130T145709+0600
/// ```
///
/// with the fields
///
/// 1. originator code, like `WXR`
/// 2. event code, like `RWT`
/// 3. one or more location codes, separated by `-`
/// 4. issue time `YYYYMMDDTHHMMSS`, in the server's local time,
///    followed by the validity duration `+HHMM`.
///
/// ```
/// use chrono::NaiveDate;
/// use wxralert::{Event, Originator};
///
/// let evt = Event::parse("WXR RWT 039103-039153 20061130T145709+0600")
///     .expect("fail to parse");
///
/// assert_eq!(Originator::WeatherService, evt.originator());
/// assert_eq!("RWT", evt.event_type());
/// assert_eq!(&["039103", "039153"], evt.locations());
/// assert_eq!(
///     NaiveDate::from_ymd_opt(2006, 11, 30).unwrap().and_hms_opt(20, 57, 9).unwrap(),
///     evt.expires_time()
/// );
/// ```
///
/// Events compare equal if their origin, event code, and locations
/// match exactly and their issue times are within 45 seconds of
/// each other. The server may repeat an alert, and its issue time
/// is taken from its own clock when the alert is heard.
#[derive(Clone, Debug)]
pub struct Event {
    origin: String,
    event_type: String,
    locations: Vec<String>,
    event_time: NaiveDateTime,
    expires_time: NaiveDateTime,
    valid_fields: (u8, u8),
}

/// Reason a line could not be decoded
#[derive(Error, Clone, Debug, PartialEq, Eq)]
pub enum EventDecodeErr {
    /// The line does not have exactly four fields
    #[error("expected 4 fields but found {0}")]
    FieldCount(usize),

    /// The location field contains no location codes
    #[error("no location codes")]
    NoLocations,

    /// The time field does not look like `YYYYMMDDTHHMMSS+HHMM`
    #[error("time field does not match YYYYMMDDTHHMMSS+HHMM")]
    MalformedTime,

    /// The start time is not a valid calendar time
    #[error("invalid start time: {0}")]
    StartTime(#[from] chrono::ParseError),

    /// The expiration time cannot be represented
    #[error("expiration time out of range")]
    ExpiryOutOfRange,

    /// The line is longer than any alert could be
    #[error("line of {0} bytes is too long")]
    LineTooLong(usize),
}

/// A line which is not a valid alert
///
/// Retains the offending line for diagnostics.
#[derive(Error, Clone, Debug, PartialEq, Eq)]
#[error("failed to parse raw message '{line}'")]
pub struct InvalidEvent {
    line: String,
    #[source]
    cause: EventDecodeErr,
}

impl InvalidEvent {
    // a line which was cut short after `len` bytes
    pub(crate) fn too_long(prefix: String, len: usize) -> Self {
        Self {
            line: prefix,
            cause: EventDecodeErr::LineTooLong(len),
        }
    }

    /// The line, as received
    ///
    /// Only the start of an over-long line is kept.
    pub fn line(&self) -> &str {
        &self.line
    }

    /// Why the line was rejected
    pub fn cause(&self) -> &EventDecodeErr {
        &self.cause
    }
}

impl Event {
    /// Decode one line from the server
    ///
    /// Trailing line terminators should be removed first. Parsing is
    /// all-or-nothing: if any field is missing or malformed, the
    /// error carries the offending `line`.
    pub fn parse<S>(line: S) -> Result<Self, InvalidEvent>
    where
        S: AsRef<str>,
    {
        let line = line.as_ref();
        decode(line).map_err(|cause| InvalidEvent {
            line: line.to_owned(),
            cause,
        })
    }

    /// Originator code, as sent
    ///
    /// Usually one of `WXR`, `EAS`, `CIV`, or `PEP`, but this is
    /// not checked.
    pub fn origin(&self) -> &str {
        &self.origin
    }

    /// Originator code
    pub fn originator(&self) -> Originator {
        Originator::from(self.origin())
    }

    /// Who issued the alert, in words
    ///
    /// Unrecognized originator codes are returned verbatim.
    ///
    /// ```
    /// # use wxralert::Event;
    /// let evt = Event::parse("XYZ RWT 039103 20061130T145709+0600").unwrap();
    /// assert_eq!("XYZ", evt.origin_description());
    /// ```
    pub fn origin_description(&self) -> &str {
        match self.originator() {
            Originator::Unknown => self.origin(),
            orig => orig.as_display_str(),
        }
    }

    /// Event code, like `RWT`
    pub fn event_type(&self) -> &str {
        &self.event_type
    }

    /// Location codes, in the order listed on the wire
    ///
    /// Never empty.
    pub fn locations(&self) -> &[String] {
        &self.locations
    }

    /// Issue time, in the server's local time
    pub fn event_time(&self) -> NaiveDateTime {
        self.event_time
    }

    /// Expiration time, in the server's local time
    pub fn expires_time(&self) -> NaiveDateTime {
        self.expires_time
    }

    /// How long the alert is valid for, from its issue time
    pub fn valid_duration(&self) -> Duration {
        self.expires_time - self.event_time
    }

    /// Validity duration, as sent
    ///
    /// This is a tuple of (`hours`, `minutes`), exactly as they
    /// appear in the `+HHMM` suffix. The minutes are not
    /// normalized: `+0090` is `(0, 90)`.
    pub fn valid_duration_fields(&self) -> (u8, u8) {
        self.valid_fields
    }

    /// The system which produced this event
    ///
    /// Always [`SOURCE`].
    pub fn source(&self) -> &'static str {
        SOURCE
    }

    /// Is the alert still in effect at `now`?
    ///
    /// An alert remains active up to and including its
    /// expiration time.
    pub fn is_active_at(&self, now: &NaiveDateTime) -> bool {
        *now <= self.expires_time
    }

    /// Is the alert still in effect, by the local clock?
    pub fn is_active(&self) -> bool {
        self.is_active_at(&Local::now().naive_local())
    }
}

impl PartialEq for Event {
    fn eq(&self, other: &Self) -> bool {
        self.event_type == other.event_type
            && self.origin == other.origin
            && self.locations == other.locations
            && (self.event_time - other.event_time).num_milliseconds().abs() < SAME_EVENT_MILLIS
    }
}

impl FromStr for Event {
    type Err = InvalidEvent;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl TryFrom<String> for Event {
    type Error = InvalidEvent;

    #[inline]
    fn try_from(inp: String) -> Result<Self, Self::Error> {
        Self::parse(inp)
    }
}

/// Re-encodes the event in its wire format
impl fmt::Display for Event {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let (hours, minutes) = self.valid_fields;
        write!(
            f,
            "{} {} {} {}+{:02}{:02}",
            self.origin,
            self.event_type,
            self.locations.join("-"),
            self.event_time.format(START_TIME_FORMAT),
            hours,
            minutes
        )
    }
}

// Decode a line into its fields
//
// The line is split on whitespace into exactly four fields. The
// last is checked against the time pattern before chrono sees it,
// so that a stray suffix cannot be silently accepted.
fn decode(line: &str) -> Result<Event, EventDecodeErr> {
    lazy_static! {
        static ref TIME_RE: Regex = Regex::new(r"^([0-9]{8}T[0-9]{6})\+([0-9]{2})([0-9]{2})$")
            .expect("bad wxrd time regexp");
    }

    let fields: Vec<&str> = line.split_whitespace().collect();
    let [origin, event_type, locations, time] = fields.as_slice() else {
        return Err(EventDecodeErr::FieldCount(fields.len()));
    };

    let locations: Vec<String> = locations
        .split('-')
        .filter(|loc| !loc.is_empty())
        .map(str::to_owned)
        .collect();
    if locations.is_empty() {
        return Err(EventDecodeErr::NoLocations);
    }

    let caps = TIME_RE
        .captures(time)
        .ok_or(EventDecodeErr::MalformedTime)?;
    let event_time = NaiveDateTime::parse_from_str(&caps[1], START_TIME_FORMAT)?;
    let hours: u8 = caps[2]
        .parse()
        .map_err(|_e| EventDecodeErr::MalformedTime)?;
    let minutes: u8 = caps[3]
        .parse()
        .map_err(|_e| EventDecodeErr::MalformedTime)?;

    // calendar arithmetic: rolls over days, months, and years
    let expires_time = event_time
        .checked_add_signed(Duration::hours(hours as i64) + Duration::minutes(minutes as i64))
        .ok_or(EventDecodeErr::ExpiryOutOfRange)?;

    Ok(Event {
        origin: origin.to_string(),
        event_type: event_type.to_string(),
        locations,
        event_time,
        expires_time,
        valid_fields: (hours, minutes),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    use chrono::NaiveDate;

    fn datetime(y: i32, mo: u32, d: u32, h: u32, mi: u32, s: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(y, mo, d)
            .unwrap()
            .and_hms_opt(h, mi, s)
            .unwrap()
    }

    #[test]
    fn test_parse() {
        const LINE: &str = "WXR RWT 039103-039153 20061130T145709+0600";

        let evt = Event::parse(LINE).expect("bad event");
        assert_eq!(evt.origin(), "WXR");
        assert_eq!(evt.originator(), Originator::WeatherService);
        assert_eq!(evt.event_type(), "RWT");
        assert_eq!(evt.locations(), &["039103", "039153"]);
        assert_eq!(evt.event_time(), datetime(2006, 11, 30, 14, 57, 9));
        assert_eq!(evt.expires_time(), datetime(2006, 11, 30, 20, 57, 9));
        assert_eq!(evt.valid_duration(), Duration::hours(6));
        assert_eq!(evt.source(), "wxrd");
        assert_eq!(&format!("{}", evt), LINE);

        // deterministic
        let again: Event = LINE.parse().expect("bad event");
        assert_eq!(evt, again);
        assert_eq!(evt.expires_time(), again.expires_time());
    }

    #[test]
    fn test_parse_whitespace() {
        let evt = Event::parse("  CIV  EVI\t039049   20240101T000000+0015 ").expect("bad event");
        assert_eq!(evt.origin(), "CIV");
        assert_eq!(evt.event_type(), "EVI");
        assert_eq!(evt.locations(), &["039049"]);
        assert_eq!(evt.expires_time(), datetime(2024, 1, 1, 0, 15, 0));
    }

    #[test]
    fn test_parse_location_order() {
        let evt = Event::parse("WXR TOR 039153-039103-039035 20061130T145709+0030").unwrap();
        assert_eq!(evt.locations(), &["039153", "039103", "039035"]);

        // empty segments are skipped
        let evt = Event::parse("WXR TOR 039153--039103- 20061130T145709+0030").unwrap();
        assert_eq!(evt.locations(), &["039153", "039103"]);
    }

    #[test]
    fn test_expiry_rollover() {
        // across midnight
        let evt = Event::parse("WXR SVR 039103 20061130T220000+0230").unwrap();
        assert_eq!(evt.expires_time(), datetime(2006, 12, 1, 0, 30, 0));

        // across the end of the year
        let evt = Event::parse("WXR WSW 039103 20061231T231500+0145").unwrap();
        assert_eq!(evt.expires_time(), datetime(2007, 1, 1, 1, 0, 0));

        // leap day
        let evt = Event::parse("WXR WSW 039103 20080228T230000+0200").unwrap();
        assert_eq!(evt.expires_time(), datetime(2008, 2, 29, 1, 0, 0));

        // minutes beyond the hour still add up
        let evt = Event::parse("WXR FFW 039103 20061130T120000+0090").unwrap();
        assert_eq!(evt.expires_time(), datetime(2006, 11, 30, 13, 30, 0));
        assert_eq!(evt.valid_duration(), Duration::minutes(90));

        // zero duration
        let evt = Event::parse("WXR FFW 039103 20061130T120000+0000").unwrap();
        assert_eq!(evt.expires_time(), evt.event_time());
    }

    #[test]
    fn test_display_keeps_duration_fields() {
        for line in [
            "WXR FFW 039103 20061130T120000+0090",
            "WXR FFW 039103 20061130T120000+9960",
        ] {
            let evt = Event::parse(line).expect("bad event");
            let encoded = evt.to_string();
            assert_eq!(encoded, line);

            let again = Event::parse(&encoded).expect("re-encoded event rejected");
            assert_eq!(again.expires_time(), evt.expires_time());
        }

        let evt = Event::parse("WXR FFW 039103 20061130T120000+9960").unwrap();
        assert_eq!(evt.valid_duration_fields(), (99, 60));
        assert_eq!(evt.valid_duration(), Duration::minutes(99 * 60 + 60));
    }

    #[test]
    fn test_parse_errors() {
        // missing offset
        const NO_OFFSET: &str = "WXR RWT 039103 20061130T145709";
        let err = Event::parse(NO_OFFSET).expect_err("should not parse");
        assert_eq!(err.line(), NO_OFFSET);
        assert_eq!(err.cause(), &EventDecodeErr::MalformedTime);
        assert!(format!("{}", err).contains(NO_OFFSET));

        assert_eq!(
            Event::parse("WXR RWT 039103").unwrap_err().cause(),
            &EventDecodeErr::FieldCount(3)
        );
        assert_eq!(
            Event::parse("WXR RWT 039103 20061130T145709+0600 extra")
                .unwrap_err()
                .cause(),
            &EventDecodeErr::FieldCount(5)
        );
        assert_eq!(
            Event::parse("").unwrap_err().cause(),
            &EventDecodeErr::FieldCount(0)
        );
        assert_eq!(
            Event::parse("*").unwrap_err().cause(),
            &EventDecodeErr::FieldCount(1)
        );
        assert_eq!(
            Event::parse("WXR RWT --- 20061130T145709+0600")
                .unwrap_err()
                .cause(),
            &EventDecodeErr::NoLocations
        );
        assert_eq!(
            Event::parse("WXR RWT 039103 20061130T145709+06").unwrap_err().cause(),
            &EventDecodeErr::MalformedTime
        );
        assert_eq!(
            Event::parse("WXR RWT 039103 20061130T145709+06x0")
                .unwrap_err()
                .cause(),
            &EventDecodeErr::MalformedTime
        );

        // well-formed but not a real time
        let err = Event::parse("WXR RWT 039103 20061131T145709+0600").unwrap_err();
        assert!(matches!(err.cause(), EventDecodeErr::StartTime(_)));
        let err = Event::parse("WXR RWT 039103 20061130T255709+0600").unwrap_err();
        assert!(matches!(err.cause(), EventDecodeErr::StartTime(_)));
    }

    #[test]
    fn test_origin_description() {
        let describe = |org: &str| {
            Event::parse(format!("{} RWT 039103 20061130T145709+0600", org))
                .unwrap()
                .origin_description()
                .to_owned()
        };

        assert_eq!(describe("WXR"), "The National Weather Service");
        assert_eq!(describe("EAS"), "The Emergency Alert System");
        assert_eq!(describe("CIV"), "Civil Authority");
        assert_eq!(describe("PEP"), "Primary Entry Point System");
        assert_eq!(describe("NWS"), "NWS");
    }

    #[test]
    fn test_equality() {
        let base = Event::parse("WXR TOR 039103-039153 20061130T145709+0030").unwrap();

        let near = Event::parse("WXR TOR 039103-039153 20061130T145753+0100").unwrap();
        assert_eq!(base, near);

        let near = Event::parse("WXR TOR 039103-039153 20061130T145625+0030").unwrap();
        assert_eq!(base, near);

        let far = Event::parse("WXR TOR 039103-039153 20061130T145754+0030").unwrap();
        assert_ne!(base, far);

        let reordered = Event::parse("WXR TOR 039153-039103 20061130T145709+0030").unwrap();
        assert_ne!(base, reordered);

        let other_origin = Event::parse("EAS TOR 039103-039153 20061130T145709+0030").unwrap();
        assert_ne!(base, other_origin);

        let other_type = Event::parse("WXR SVR 039103-039153 20061130T145709+0030").unwrap();
        assert_ne!(base, other_type);
    }

    #[test]
    fn test_is_active() {
        let evt = Event::parse("WXR TOR 039103 20061130T145709+0030").unwrap();
        assert!(evt.is_active_at(&datetime(2006, 11, 30, 14, 57, 9)));
        assert!(evt.is_active_at(&datetime(2006, 11, 30, 15, 27, 9)));
        assert!(!evt.is_active_at(&datetime(2006, 11, 30, 15, 27, 10)));
        assert!(!evt.is_active());
    }
}
