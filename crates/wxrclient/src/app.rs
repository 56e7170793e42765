//! Connects the session to the notifier
//!
//! In live mode, one session is run against the server until it
//! ends. In test mode, a sample alert is run through the same
//! path without connecting.

use std::time::Duration;

use anyhow::Context;
use log::{debug, info, warn};
use wxralert::{
    Endpoint, Event, Notifier, RecipientGroup, Session, SessionEnd, SessionSummary, Transport,
};

use crate::cli::Args;

/// A Required Weekly Test for two Ohio counties
pub const SAMPLE_ALERT: &str = "WXR RWT 039103-039153 20061130T145709+0600";

/// Run the application
///
/// Runs one session with the given command-line `args`, sending
/// every alert through the `notifier`. Returns when the session
/// ends. The session is not re-opened.
pub fn run<T>(args: &Args, notifier: &mut Notifier<T>) -> Result<SessionSummary, anyhow::Error>
where
    T: Transport,
{
    let groups = args.recipient_groups();
    if groups.iter().all(RecipientGroup::is_empty) {
        warn!("no --email or --sms recipients: alerts will not be sent to anyone");
    }

    let mut handler = |event: Event| dispatch(&mut *notifier, &groups, event);

    if args.test {
        warn!("simulation (--test) mode: the following alert is NOT LIVE!");
        return Ok(Session::from_reader(SAMPLE_ALERT.as_bytes()).run(&mut handler));
    }

    let endpoint = Endpoint::new(args.host.as_str(), args.port)
        .with_idle_timeout(Duration::from_secs(args.idle_timeout))
        .with_greeting_lines(args.greeting_lines);

    let session = endpoint
        .connect()
        .with_context(|| format!("no wxrd server at --host {} --port {}", args.host, args.port))?;

    let summary = session.run(&mut handler);
    info!(
        "received {} alert(s), {} invalid line(s), {} keep-alive(s)",
        summary.events, summary.invalid, summary.keepalives
    );
    Ok(summary)
}

// Send one event to every group
fn dispatch<T>(notifier: &mut Notifier<T>, groups: &[RecipientGroup], event: Event)
where
    T: Transport,
{
    debug!("{}", event);
    if !event.is_active() {
        info!("alert has already expired: {}", event);
    }

    let sent = notifier.notify(&event, groups);
    debug!("notified {} recipient group(s)", sent);
}

/// Exit status for a finished session
///
/// Only an I/O failure is an error; the server hanging up or
/// going quiet is expected.
pub fn exit_code(end: &SessionEnd) -> i32 {
    if end.is_failure() {
        1
    } else {
        0
    }
}
