//! Originator code

use std::fmt;
use std::str::FromStr;

use strum::EnumMessage;

/// Alert originator code
///
/// See [Event::originator()](crate::Event#method.originator).
/// Originator codes may be converted `from()` their wire string
/// representations. Using them `.as_ref()` will show the code;
/// using them via `Display` will show a human-readable string.
///
/// ```
/// use wxralert::Originator;
///
/// let orig = Originator::from("WXR");
/// assert_eq!(Originator::WeatherService, orig);
/// assert_eq!("WXR", orig.as_ref());
/// assert_eq!("The National Weather Service", orig.as_display_str());
/// assert_eq!("The National Weather Service", &format!("{}", orig));
///
/// assert_eq!(Originator::Unknown, Originator::from("HUH"));
/// ```
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, strum_macros::EnumMessage)]
pub enum Originator {
    /// An unknown originator code
    ///
    /// The server forwards whatever the receiver decoded, so any
    /// three-character code is accepted.
    #[strum(serialize = "OOO", detailed_message = "Unknown Originator")]
    Unknown,

    /// Primary Entry Point station for national activations
    #[strum(serialize = "PEP", detailed_message = "Primary Entry Point System")]
    PrimaryEntryPoint,

    /// Civil authorities
    #[strum(serialize = "CIV", detailed_message = "Civil Authority")]
    CivilAuthority,

    /// National Weather Service
    #[strum(serialize = "WXR", detailed_message = "The National Weather Service")]
    WeatherService,

    /// EAS participant (usu. broadcast station)
    #[strum(serialize = "EAS", detailed_message = "The Emergency Alert System")]
    EmergencyAlertSystem,
}

impl Originator {
    /// Human-readable string representation
    ///
    /// Converts to a human-readable string, like "`Civil Authority`."
    pub fn as_display_str(&self) -> &'static str {
        self.get_detailed_message().unwrap_or(self.as_str())
    }

    /// Wire string representation
    ///
    /// Returns the three-character code for this `Originator`
    pub fn as_str(&self) -> &'static str {
        self.get_serializations()[0]
    }
}

impl FromStr for Originator {
    type Err = strum::ParseError;

    /// Parse an exact wire code
    ///
    /// Unlike `from()`, unrecognized codes are an error.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "OOO" => Ok(Originator::Unknown),
            "PEP" => Ok(Originator::PrimaryEntryPoint),
            "CIV" => Ok(Originator::CivilAuthority),
            "WXR" => Ok(Originator::WeatherService),
            "EAS" => Ok(Originator::EmergencyAlertSystem),
            _ => Err(strum::ParseError::VariantNotFound),
        }
    }
}

impl From<&str> for Originator {
    fn from(s: &str) -> Originator {
        match Originator::from_str(s) {
            Ok(orig) => orig,
            Err(_e) => Originator::Unknown,
        }
    }
}

impl AsRef<str> for Originator {
    fn as_ref(&self) -> &'static str {
        self.as_str()
    }
}

impl fmt::Display for Originator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.as_display_str().fmt(f)
    }
}
