//! Human-readable alert text

use crate::event::Event;
use crate::lookup::{Lookup, TableUnavailable};

/// Description used for event codes which are not in the table
pub const UNKNOWN_EVENT: &str = "Unknown Event";

// "20:57 Nov 30 2006"
const FULL_TIME_FORMAT: &str = "%H:%M %b %d %Y";

// "20:57 30/11/2006"
const SHORT_TIME_FORMAT: &str = "%H:%M %d/%m/%Y";

/// Renders events as text
///
/// The `Formatter` owns the [`Lookup`] used to translate event
/// and location codes. It never modifies the events it is given.
///
/// ```
/// use wxralert::{CodeTable, Event, Formatter, Lookup};
///
/// let fmt = Formatter::new(Lookup::new(
///     Ok(CodeTable::from_iter([("RWT", "Required Weekly Test")])),
///     Ok(CodeTable::from_iter([("039103", "Allen"), ("039153", "Putnam")])),
/// ));
///
/// let evt = Event::parse("WXR RWT 039103-039153 20061130T145709+0600").unwrap();
/// assert_eq!(
///     "The National Weather Service has issued a Required Weekly Test \
///      for Allen and Putnam Counties until 20:57 Nov 30 2006.",
///     fmt.full_text(&evt).unwrap()
/// );
/// assert_eq!(
///     "Required Weekly Test until 20:57 30/11/2006",
///     fmt.abbreviated_text(&evt)
/// );
/// ```
#[derive(Clone, Debug)]
pub struct Formatter {
    lookup: Lookup,
}

impl Formatter {
    /// Create with the given code tables
    pub fn new(lookup: Lookup) -> Self {
        Self { lookup }
    }

    /// Code tables in use
    pub fn lookup(&self) -> &Lookup {
        &self.lookup
    }

    /// Description of the event code
    ///
    /// Codes which are not in the table are described as
    /// [`UNKNOWN_EVENT`]. An error is returned only if the
    /// event code table failed to load.
    pub fn event_type_description(&self, event: &Event) -> Result<&str, TableUnavailable> {
        Ok(self
            .lookup
            .event_description(event.event_type())?
            .unwrap_or(UNKNOWN_EVENT))
    }

    /// The affected counties, as a phrase
    ///
    /// Each location code is replaced with its name, or with the
    /// code in parentheses if it has none.
    ///
    /// | Locations   | Description             |
    /// |-------------|-------------------------|
    /// | `[A]`       | `A County`              |
    /// | `[A, B]`    | `A and B Counties`      |
    /// | `[A, B, C]` | `A, B and C Counties`   |
    pub fn location_description(&self, event: &Event) -> Result<String, TableUnavailable> {
        let names = event
            .locations()
            .iter()
            .map(|code| {
                Ok(match self.lookup.location_name(code)? {
                    Some(name) => name.to_owned(),
                    None => format!("({})", code),
                })
            })
            .collect::<Result<Vec<String>, TableUnavailable>>()?;

        Ok(join_counties(&names))
    }

    /// Complete sentence describing the event
    pub fn full_text(&self, event: &Event) -> Result<String, TableUnavailable> {
        Ok(format!(
            "{} has issued a {} for {} until {}.",
            event.origin_description(),
            self.event_type_description(event)?,
            self.location_description(event)?,
            event.expires_time().format(FULL_TIME_FORMAT)
        ))
    }

    /// Short description, suitable for SMS
    ///
    /// If the event code table is unavailable, the raw event code
    /// is used instead.
    pub fn abbreviated_text(&self, event: &Event) -> String {
        let what = self
            .event_type_description(event)
            .unwrap_or(event.event_type());
        format!(
            "{} until {}",
            what,
            event.expires_time().format(SHORT_TIME_FORMAT)
        )
    }

    /// Notification subject line
    ///
    /// The event code description, or a placeholder containing
    /// the raw event code if the table is unavailable.
    pub fn subject(&self, event: &Event) -> String {
        match self.event_type_description(event) {
            Ok(desc) => desc.to_owned(),
            Err(_e) => format!("unknown event ({})", event.event_type()),
        }
    }
}

// Join names into "A, B and C Counties"
fn join_counties<S>(names: &[S]) -> String
where
    S: AsRef<str>,
{
    let count = names.len();
    let mut out = String::new();
    for (i, name) in names.iter().enumerate() {
        out.push_str(name.as_ref());
        if i + 2 < count {
            out.push_str(", ");
        } else if i + 1 < count {
            out.push_str(" and ");
        }
    }

    if count == 1 {
        out.push_str(" County");
    } else {
        out.push_str(" Counties");
    }
    out
}
