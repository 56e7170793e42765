//! Alert notifications
//!
//! A [`Notifier`] turns each [`Event`] into one [`Mail`] per
//! [`RecipientGroup`] and hands it to a [`Transport`]. Delivery is
//! best-effort: a failure to send to one group is logged and does
//! not prevent delivery to the others.

use std::fmt;
use std::io;

use log::{debug, error, info};

use crate::event::Event;
use crate::format::Formatter;

/// Default sender and primary addressee
pub const DEFAULT_MAILBOX: &str = "wxrd@localhost";

/// How much text a recipient group receives
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum DeliveryStyle {
    /// A complete sentence: who issued what, where, and until when
    FullText,

    /// The event description and expiration only, for SMS gateways
    Abbreviated,
}

/// Priority marking on outgoing mail
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum Priority {
    /// Marked urgent for mail clients which honor it
    #[default]
    Urgent,
}

impl Priority {
    /// Mail headers which carry this priority
    pub fn headers(&self) -> &'static [(&'static str, &'static str)] {
        match self {
            Priority::Urgent => &[("X-Priority", "1"), ("Priority", "urgent")],
        }
    }
}

/// A named list of addresses which share a delivery style
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RecipientGroup {
    name: String,
    addresses: Vec<String>,
    style: DeliveryStyle,
    priority: Priority,
}

impl RecipientGroup {
    /// Create an urgent-priority group
    pub fn new<S>(name: S, addresses: Vec<String>, style: DeliveryStyle) -> Self
    where
        S: Into<String>,
    {
        Self {
            name: name.into(),
            addresses,
            style,
            priority: Priority::Urgent,
        }
    }

    /// The "full-text" group, usually e-mail
    pub fn full_text(addresses: Vec<String>) -> Self {
        Self::new("full-text", addresses, DeliveryStyle::FullText)
    }

    /// The "abbreviated" group, usually SMS gateways
    pub fn abbreviated(addresses: Vec<String>) -> Self {
        Self::new("abbreviated", addresses, DeliveryStyle::Abbreviated)
    }

    /// Group name, for logging
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Member addresses
    pub fn addresses(&self) -> &[String] {
        &self.addresses
    }

    /// Delivery style
    pub fn style(&self) -> DeliveryStyle {
        self.style
    }

    /// Priority marking
    pub fn priority(&self) -> Priority {
        self.priority
    }

    /// True if there is nobody to send to
    pub fn is_empty(&self) -> bool {
        self.addresses.is_empty()
    }
}

/// Split a list of addresses
///
/// Addresses may be separated by commas or semicolons. They are
/// trimmed but not otherwise validated.
///
/// ```
/// use wxralert::parse_addresses;
///
/// assert_eq!(
///     vec!["a@example.com", "b@example.com", "c@example.com"],
///     parse_addresses("a@example.com, b@example.com;c@example.com")
/// );
/// ```
pub fn parse_addresses(list: &str) -> Vec<String> {
    list.split(|c: char| c == ',' || c == ';')
        .map(str::trim)
        .filter(|addr| !addr.is_empty())
        .map(str::to_owned)
        .collect()
}

/// An outgoing notification
///
/// `Display` renders the mail as an RFC 5322-style message,
/// suitable for `sendmail -t`.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Mail {
    /// Sender address
    pub from: String,

    /// Primary addressee
    pub to: String,

    /// Blind-copy recipients: the members of the group
    pub bcc: Vec<String>,

    /// Subject line
    pub subject: String,

    /// Message text
    pub body: String,

    /// Priority marking
    pub priority: Priority,
}

impl fmt::Display for Mail {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "From: {}", self.from)?;
        writeln!(f, "To: {}", self.to)?;
        if !self.bcc.is_empty() {
            writeln!(f, "Bcc: {}", self.bcc.join(", "))?;
        }
        writeln!(f, "Subject: {}", self.subject)?;
        for (name, value) in self.priority.headers() {
            writeln!(f, "{}: {}", name, value)?;
        }
        writeln!(f)?;
        writeln!(f, "{}", self.body)
    }
}

/// Delivers mail
///
/// Implementations should return promptly. Sending happens
/// on the same thread that reads from the server, and a hung
/// transport will delay every subsequent alert.
pub trait Transport {
    /// Send one message
    fn send(&mut self, mail: &Mail) -> io::Result<()>;
}

impl<T> Transport for &mut T
where
    T: Transport + ?Sized,
{
    fn send(&mut self, mail: &Mail) -> io::Result<()> {
        (**self).send(mail)
    }
}

impl<T> Transport for Box<T>
where
    T: Transport + ?Sized,
{
    fn send(&mut self, mail: &Mail) -> io::Result<()> {
        (**self).send(mail)
    }
}

/// Writes mail to the log instead of sending it
#[derive(Clone, Copy, Debug, Default)]
pub struct LogTransport;

impl Transport for LogTransport {
    fn send(&mut self, mail: &Mail) -> io::Result<()> {
        info!("not sending mail (no mail command):\n{}", mail);
        Ok(())
    }
}

/// Sends alert notifications to recipient groups
#[derive(Debug)]
pub struct Notifier<T> {
    formatter: Formatter,
    transport: T,
    from: String,
    to: String,
}

impl<T> Notifier<T>
where
    T: Transport,
{
    /// Create a notifier
    ///
    /// Mail is sent `from` the given address and addressed `to`
    /// a fixed mailbox. Group members are blind-copied.
    pub fn new<F, M>(formatter: Formatter, transport: T, from: F, to: M) -> Self
    where
        F: Into<String>,
        M: Into<String>,
    {
        Self {
            formatter,
            transport,
            from: from.into(),
            to: to.into(),
        }
    }

    /// Text formatter
    pub fn formatter(&self) -> &Formatter {
        &self.formatter
    }

    /// Underlying transport
    pub fn transport(&self) -> &T {
        &self.transport
    }

    /// Build the mail for one group
    ///
    /// Returns `None` if the group is empty. Full-text mail falls
    /// back to the abbreviated text if the code tables are
    /// unavailable.
    pub fn compose(&self, event: &Event, group: &RecipientGroup) -> Option<Mail> {
        if group.is_empty() {
            return None;
        }

        let body = match group.style() {
            DeliveryStyle::FullText => match self.formatter.full_text(event) {
                Ok(text) => text,
                Err(err) => {
                    error!("unable to describe event \"{}\": {}", event, err);
                    self.formatter.abbreviated_text(event)
                }
            },
            DeliveryStyle::Abbreviated => self.formatter.abbreviated_text(event),
        };

        Some(Mail {
            from: self.from.clone(),
            to: self.to.clone(),
            bcc: group.addresses().to_vec(),
            subject: self.formatter.subject(event),
            body,
            priority: group.priority(),
        })
    }

    /// Notify every group of `event`
    ///
    /// Empty groups are skipped. Transport errors are logged and
    /// do not stop delivery to the remaining groups. Returns the
    /// number of groups which were sent mail successfully.
    pub fn notify(&mut self, event: &Event, groups: &[RecipientGroup]) -> usize {
        let mut delivered = 0;
        for group in groups {
            let mail = match self.compose(event, group) {
                Some(mail) => mail,
                None => {
                    debug!("no {} recipients", group.name());
                    continue;
                }
            };

            match self.transport.send(&mail) {
                Ok(()) => {
                    debug!(
                        "sent \"{}\" to {} {} recipient(s)",
                        mail.subject,
                        mail.bcc.len(),
                        group.name()
                    );
                    delivered += 1;
                }
                Err(err) => {
                    error!("unable to send mail to {} recipients: {}", group.name(), err);
                }
            }
        }

        delivered
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use crate::lookup::{CodeTable, Lookup};

    const SAMPLE: &str = "WXR RWT 039103-039153 20061130T145709+0600";

    // records mail; fails for any mail containing `fail_for`
    #[derive(Debug, Default)]
    struct Recorder {
        sent: Vec<Mail>,
        fail_for: Option<String>,
    }

    impl Transport for Recorder {
        fn send(&mut self, mail: &Mail) -> io::Result<()> {
            if let Some(bad) = &self.fail_for {
                if mail.bcc.contains(bad) {
                    return Err(io::Error::new(io::ErrorKind::Other, "relay denied"));
                }
            }
            self.sent.push(mail.clone());
            Ok(())
        }
    }

    fn test_formatter() -> Formatter {
        Formatter::new(Lookup::new(
            Ok(CodeTable::from_iter([("RWT", "Required Weekly Test")])),
            Ok(CodeTable::from_iter([
                ("039103", "Allen"),
                ("039153", "Putnam"),
            ])),
        ))
    }

    fn test_groups() -> Vec<RecipientGroup> {
        vec![
            RecipientGroup::abbreviated(vec!["5551234567@sms.example.com".to_owned()]),
            RecipientGroup::full_text(vec![
                "alice@example.com".to_owned(),
                "bob@example.com".to_owned(),
            ]),
        ]
    }

    #[test]
    fn test_notify() {
        let mut notifier = Notifier::new(
            test_formatter(),
            Recorder::default(),
            "wxrd@example.com",
            DEFAULT_MAILBOX,
        );
        let evt = Event::parse(SAMPLE).unwrap();

        assert_eq!(notifier.notify(&evt, &test_groups()), 2);

        let sent = &notifier.transport().sent;
        assert_eq!(sent.len(), 2);

        assert_eq!(sent[0].from, "wxrd@example.com");
        assert_eq!(sent[0].to, "wxrd@localhost");
        assert_eq!(sent[0].bcc, vec!["5551234567@sms.example.com"]);
        assert_eq!(sent[0].subject, "Required Weekly Test");
        assert_eq!(sent[0].body, "Required Weekly Test until 20:57 30/11/2006");
        assert_eq!(sent[0].priority, Priority::Urgent);

        assert_eq!(sent[1].bcc, vec!["alice@example.com", "bob@example.com"]);
        assert_eq!(
            sent[1].body,
            "The National Weather Service has issued a Required Weekly Test for Allen and Putnam Counties until 20:57 Nov 30 2006."
        );
    }

    #[test]
    fn test_notify_skips_empty_groups() {
        let mut notifier = Notifier::new(
            test_formatter(),
            Recorder::default(),
            DEFAULT_MAILBOX,
            DEFAULT_MAILBOX,
        );
        let evt = Event::parse(SAMPLE).unwrap();
        let groups = vec![
            RecipientGroup::abbreviated(vec![]),
            RecipientGroup::full_text(vec!["alice@example.com".to_owned()]),
        ];

        assert_eq!(notifier.notify(&evt, &groups), 1);
        assert_eq!(notifier.transport().sent.len(), 1);
        assert!(notifier.compose(&evt, &groups[0]).is_none());
    }

    #[test]
    fn test_notify_continues_after_failure() {
        let recorder = Recorder {
            sent: vec![],
            fail_for: Some("5551234567@sms.example.com".to_owned()),
        };
        let mut notifier = Notifier::new(test_formatter(), recorder, DEFAULT_MAILBOX, DEFAULT_MAILBOX);
        let evt = Event::parse(SAMPLE).unwrap();

        assert_eq!(notifier.notify(&evt, &test_groups()), 1);
        let sent = &notifier.transport().sent;
        assert_eq!(sent.len(), 1);
        assert_eq!(sent[0].bcc, vec!["alice@example.com", "bob@example.com"]);
    }

    #[test]
    fn test_compose_without_tables() {
        let formatter = Formatter::new(Lookup::new(
            CodeTable::from_path("/nonexistent/wxralert/alerts.properties"),
            CodeTable::from_path("/nonexistent/wxralert/counties.properties"),
        ));
        let notifier = Notifier::new(formatter, LogTransport, DEFAULT_MAILBOX, DEFAULT_MAILBOX);
        let evt = Event::parse(SAMPLE).unwrap();

        let mail = notifier
            .compose(&evt, &RecipientGroup::full_text(vec!["a@example.com".to_owned()]))
            .unwrap();
        assert_eq!(mail.subject, "unknown event (RWT)");
        assert_eq!(mail.body, "RWT until 20:57 30/11/2006");
    }

    #[test]
    fn test_mail_display() {
        let mail = Mail {
            from: "wxrd@example.com".to_owned(),
            to: "wxrd@localhost".to_owned(),
            bcc: vec!["a@example.com".to_owned(), "b@example.com".to_owned()],
            subject: "Tornado Warning".to_owned(),
            body: "Tornado Warning until 15:27 30/11/2006".to_owned(),
            priority: Priority::Urgent,
        };

        assert_eq!(
            format!("{}", mail),
            "From: wxrd@example.com\n\
             To: wxrd@localhost\n\
             Bcc: a@example.com, b@example.com\n\
             Subject: Tornado Warning\n\
             X-Priority: 1\n\
             Priority: urgent\n\
             \n\
             Tornado Warning until 15:27 30/11/2006\n"
        );
    }

    #[test]
    fn test_parse_addresses() {
        assert_eq!(parse_addresses("a@x.com"), vec!["a@x.com"]);
        assert_eq!(parse_addresses(" a@x.com ;; b@x.com,"), vec!["a@x.com", "b@x.com"]);
        assert!(parse_addresses("").is_empty());
    }
}
