//! Code → description tables
//!
//! Event codes and location codes are resolved to display strings
//! through two tables. Each is read from a simple `key=value` text
//! resource:
//!
//! ```txt
//! # comments start with '#' or '!'
//! RWT=Required Weekly Test
//! TOR=Tornado Warning
//! ```
//!
//! Built-in copies of both tables ship with this crate. The event
//! table lists the SAME event codes. The location table lists
//! Ohio counties by SAME location code (`PSSCCC`).

use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};

use log::{debug, error};
use thiserror::Error;

const BUILTIN_EVENTS: &str = include_str!("../resources/alerts.properties");
const BUILTIN_LOCATIONS: &str = include_str!("../resources/counties.properties");

/// A table of codes and their descriptions
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct CodeTable {
    entries: HashMap<String, String>,
}

/// Which table a lookup was made against
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, strum_macros::Display)]
pub enum Table {
    /// Event code descriptions
    #[strum(serialize = "event code")]
    Events,

    /// Location names
    #[strum(serialize = "location")]
    Locations,
}

/// A table resource could not be read
#[derive(Error, Debug)]
#[error("failed to load \"{}\"", .path.display())]
pub struct LookupLoadErr {
    path: PathBuf,
    #[source]
    source: std::io::Error,
}

/// A lookup was made against a table which failed to load
#[derive(Error, Clone, Copy, Debug, PartialEq, Eq, Hash)]
#[error("{0} table is unavailable")]
pub struct TableUnavailable(pub Table);

impl CodeTable {
    /// Parse a table from `key=value` text
    ///
    /// Lines which are blank or which start with `#` or `!` are
    /// ignored. Keys are separated from values by the first `=`
    /// or `:`. Both are trimmed of surrounding whitespace. Lines
    /// with no separator are skipped. Later entries replace
    /// earlier ones.
    pub fn parse(text: &str) -> Self {
        text.lines()
            .map(str::trim)
            .filter(|line| !line.is_empty() && !line.starts_with('#') && !line.starts_with('!'))
            .filter_map(|line| {
                let (key, value) = line.split_once(|c: char| c == '=' || c == ':')?;
                Some((key.trim(), value.trim()))
            })
            .filter(|(key, _value)| !key.is_empty())
            .collect()
    }

    /// Read a table from a `key=value` file
    pub fn from_path<P>(path: P) -> Result<Self, LookupLoadErr>
    where
        P: AsRef<Path>,
    {
        let path = path.as_ref();
        let text = fs::read_to_string(path).map_err(|source| LookupLoadErr {
            path: path.to_owned(),
            source,
        })?;

        let table = Self::parse(&text);
        debug!("loaded {} entries from \"{}\"", table.len(), path.display());
        Ok(table)
    }

    /// Event code descriptions shipped with this crate
    pub fn builtin_events() -> Self {
        Self::parse(BUILTIN_EVENTS)
    }

    /// Location names shipped with this crate
    pub fn builtin_locations() -> Self {
        Self::parse(BUILTIN_LOCATIONS)
    }

    /// Description for `code`, if known
    pub fn get(&self, code: &str) -> Option<&str> {
        self.entries.get(code).map(String::as_str)
    }

    /// Number of entries
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// True if the table has no entries
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl<K, V> FromIterator<(K, V)> for CodeTable
where
    K: Into<String>,
    V: Into<String>,
{
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self {
            entries: iter
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        }
    }
}

/// Resolves event and location codes to display strings
///
/// The `Lookup` is built once, at startup, and is read-only
/// afterwards. If either table fails to load, lookups against it
/// report [`TableUnavailable`]; the other table, and event
/// parsing, continue to work.
///
/// ```
/// use wxralert::{CodeTable, Lookup};
///
/// let lookup = Lookup::new(
///     Ok(CodeTable::from_iter([("RWT", "Required Weekly Test")])),
///     Ok(CodeTable::from_iter([("039103", "Allen")])),
/// );
///
/// assert_eq!(Ok(Some("Required Weekly Test")), lookup.event_description("RWT"));
/// assert_eq!(Ok(None), lookup.event_description("XYZ"));
/// assert_eq!(Ok(Some("Allen")), lookup.location_name("039103"));
/// ```
#[derive(Clone, Debug)]
pub struct Lookup {
    events: Option<CodeTable>,
    locations: Option<CodeTable>,
}

impl Lookup {
    /// Create from the results of loading each table
    ///
    /// Load failures are logged and the table is marked
    /// unavailable.
    pub fn new(
        events: Result<CodeTable, LookupLoadErr>,
        locations: Result<CodeTable, LookupLoadErr>,
    ) -> Self {
        Self {
            events: keep_table(Table::Events, events),
            locations: keep_table(Table::Locations, locations),
        }
    }

    /// Create with the built-in tables
    pub fn builtin() -> Self {
        Self::new(
            Ok(CodeTable::builtin_events()),
            Ok(CodeTable::builtin_locations()),
        )
    }

    /// Description of an event code
    ///
    /// Returns `Ok(None)` if the code is not in the table.
    pub fn event_description(&self, code: &str) -> Result<Option<&str>, TableUnavailable> {
        Ok(self
            .events
            .as_ref()
            .ok_or(TableUnavailable(Table::Events))?
            .get(code))
    }

    /// Name of a location code
    ///
    /// Returns `Ok(None)` if the code is not in the table.
    pub fn location_name(&self, code: &str) -> Result<Option<&str>, TableUnavailable> {
        Ok(self
            .locations
            .as_ref()
            .ok_or(TableUnavailable(Table::Locations))?
            .get(code))
    }
}

fn keep_table(which: Table, table: Result<CodeTable, LookupLoadErr>) -> Option<CodeTable> {
    match table {
        Ok(table) => Some(table),
        Err(err) => {
            error!("{} table unavailable: {}: {}", which, err, err.source);
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse() {
        const TEXT: &str = "
# comment
! also a comment
RWT=Required Weekly Test
  TOR = Tornado Warning
SVR: Severe Thunderstorm Warning
no separator here
=no key
EMPTY=
RWT=Required Weekly Test (again)
";

        let table = CodeTable::parse(TEXT);
        assert_eq!(table.len(), 4);
        assert_eq!(table.get("RWT"), Some("Required Weekly Test (again)"));
        assert_eq!(table.get("TOR"), Some("Tornado Warning"));
        assert_eq!(table.get("SVR"), Some("Severe Thunderstorm Warning"));
        assert_eq!(table.get("EMPTY"), Some(""));
        assert_eq!(table.get("no separator here"), None);
        assert!(CodeTable::parse("").is_empty());
    }

    #[test]
    fn test_builtin() {
        let events = CodeTable::builtin_events();
        assert_eq!(events.get("RWT"), Some("Required Weekly Test"));
        assert_eq!(events.get("TOR"), Some("Tornado Warning"));
        assert_eq!(events.get("XYZ"), None);

        let locations = CodeTable::builtin_locations();
        assert_eq!(locations.len(), 88);
        assert_eq!(locations.get("039103"), Some("Medina"));
        assert_eq!(locations.get("039161"), Some("Van Wert"));
    }

    #[test]
    fn test_from_path() {
        let err = CodeTable::from_path("/nonexistent/wxralert/alerts.properties")
            .expect_err("should not load");
        assert!(format!("{}", err).contains("alerts.properties"));
    }

    #[test]
    fn test_unavailable_table() {
        let missing = CodeTable::from_path("/nonexistent/wxralert/counties.properties");
        let lookup = Lookup::new(Ok(CodeTable::builtin_events()), missing);

        assert_eq!(
            lookup.event_description("RWT"),
            Ok(Some("Required Weekly Test"))
        );
        assert_eq!(
            lookup.location_name("039103"),
            Err(TableUnavailable(Table::Locations))
        );
        assert_eq!(
            format!("{}", TableUnavailable(Table::Locations)),
            "location table is unavailable"
        );
    }
}
