//! # wxralert: a client for `wxrd` weather-alert broadcasts
//!
//! `wxrd` listens to a weather radio receiver and re-broadcasts
//! each SAME alert it hears to TCP clients, one alert per line.
//! This crate connects to a `wxrd` server, decodes the alerts,
//! and notifies people about them.
//!
//! ## Disclaimer
//!
//! This crate is dual-licensed MIT and Apache 2.0. Read these licenses
//! carefully as they may affect your rights.
//!
//! This crate has not been certified for any purpose. Notification
//! is best-effort and delivery is **not** guaranteed. The author
//! **strongly discourages** its use in any safety-critical
//! applications. Always have at least two methods available for
//! receiving weather alerts.
//!
//! ## Example
//!
//! ```no_run
//! use wxralert::{
//!     Endpoint, Event, Formatter, LogTransport, Lookup, Notifier, RecipientGroup,
//!     DEFAULT_MAILBOX, DEFAULT_PORT,
//! };
//!
//! let groups = vec![
//!     RecipientGroup::full_text(vec!["alice@example.com".to_owned()]),
//!     RecipientGroup::abbreviated(vec!["5551234567@sms.example.com".to_owned()]),
//! ];
//! let mut notifier = Notifier::new(
//!     Formatter::new(Lookup::builtin()),
//!     LogTransport,
//!     DEFAULT_MAILBOX,
//!     DEFAULT_MAILBOX,
//! );
//!
//! let session = Endpoint::new("localhost", DEFAULT_PORT)
//!     .connect()
//!     .expect("unable to connect");
//! let summary = session.run(&mut |evt: Event| {
//!     notifier.notify(&evt, &groups);
//! });
//! println!("session ended: {:?}", summary.end);
//! ```
//!
//! ## Wire format
//!
//! Each alert is a single line of four whitespace-separated fields:
//!
//! ```txt
//! WXR RWT 039103-039153 20061130T145709+0600
//! ```
//!
//! * originator code
//! * event code
//! * location codes, separated by `-`
//! * issue time, in the server's local time, and the validity
//!   duration in hours and minutes
//!
//! The server also sends two banner lines when a client connects
//! and a keep-alive line, `*`, every ten seconds. See
//! [`Event`] for decoding and [`Formatter`] for display.

#![deny(unsafe_code)]
#![warn(missing_docs)]

mod event;
mod format;
mod lookup;
mod notify;
mod originator;
mod session;

pub use event::{Event, EventDecodeErr, InvalidEvent, SOURCE};
pub use format::{Formatter, UNKNOWN_EVENT};
pub use lookup::{CodeTable, Lookup, LookupLoadErr, Table, TableUnavailable};
pub use notify::{
    parse_addresses, DeliveryStyle, LogTransport, Mail, Notifier, Priority, RecipientGroup,
    Transport, DEFAULT_MAILBOX,
};
pub use originator::Originator;
pub use session::{
    CancelHandle, ConnectErr, Connected, Endpoint, EventHandler, LineSource, Reading, Session,
    SessionEnd, SessionSummary, DEFAULT_GREETING_LINES, DEFAULT_IDLE_TIMEOUT, DEFAULT_PORT,
    KEEPALIVE, MAX_LINE_LEN,
};
