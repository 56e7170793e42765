//! Connection to a `wxrd` server
//!
//! A session moves through these states:
//!
//! ```txt
//!   Endpoint  (disconnected)
//!      ||
//!      || connect()                  ||=== keep-alive, alert, bad line ===||
//!      \/                            ||                                   ||
//! +-------------+              +-------------+                            ||
//! |  Connected  | == run() ==> |   Reading   | <==========================||
//! +-------------+              +-------------+
//!                                    ||
//!                                    || EOF, idle timeout, cancel, I/O error
//!                                    \/
//!                              SessionSummary  (closed)
//! ```
//!
//! Every line which is not the keep-alive is decoded as an
//! [`Event`] and handed to an [`EventHandler`]. Lines which fail
//! to decode are reported and skipped. The session ends when the
//! server closes the connection, when nothing has been received
//! for the idle timeout, or on any I/O error. Sessions are never
//! re-opened automatically.

use std::io::{self, BufRead, BufReader, Read};
use std::net::{Shutdown, TcpStream};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use log::{debug, error, info, warn};
use thiserror::Error;

use crate::event::{Event, InvalidEvent};

/// Keep-alive line, sent by the server every ten seconds
pub const KEEPALIVE: &str = "*";

/// Default server port
pub const DEFAULT_PORT: u16 = 9317;

/// Default read-idle timeout
pub const DEFAULT_IDLE_TIMEOUT: Duration = Duration::from_secs(30);

/// Number of banner lines the server sends on connect
pub const DEFAULT_GREETING_LINES: usize = 2;

/// Longest line accepted from the server, in bytes
///
/// Longer lines are discarded up to the next newline and reported
/// as invalid.
pub const MAX_LINE_LEN: usize = 1024;

/// Unable to connect to the server
#[derive(Error, Debug)]
#[error("unable to connect to {host}:{port}")]
pub struct ConnectErr {
    host: String,
    port: u16,
    #[source]
    source: io::Error,
}

/// Why a session ended
///
/// Only [`IoFailure`](SessionEnd::IoFailure) indicates that
/// something went wrong. The other variants are expected
/// conditions.
#[derive(Debug)]
pub enum SessionEnd {
    /// The server closed the connection
    EndOfStream,

    /// Nothing was received for the idle timeout
    IdleTimeout,

    /// The session was closed by a [`CancelHandle`]
    Cancelled,

    /// Reading failed
    IoFailure(io::Error),
}

impl SessionEnd {
    /// True if the session ended because of an error
    pub fn is_failure(&self) -> bool {
        matches!(self, SessionEnd::IoFailure(_))
    }
}

/// What happened during a session
#[derive(Debug)]
pub struct SessionSummary {
    /// Why the session ended
    pub end: SessionEnd,

    /// Alerts decoded and handled
    pub events: usize,

    /// Lines which could not be decoded
    pub invalid: usize,

    /// Keep-alive lines received
    pub keepalives: usize,
}

/// Receives decoded alerts
///
/// Any `FnMut(Event)` is an `EventHandler`.
pub trait EventHandler {
    /// Handle an alert
    fn handle_event(&mut self, event: Event);

    /// Handle a line which is not a valid alert
    ///
    /// The default implementation logs the error.
    fn handle_invalid(&mut self, err: InvalidEvent) {
        error!("{}: {}", err, err.cause());
    }
}

impl<F> EventHandler for F
where
    F: FnMut(Event),
{
    fn handle_event(&mut self, event: Event) {
        self(event)
    }
}

/// A buffered line source which may hold a connection
///
/// [`release()`](LineSource::release) is called once the session
/// has ended, to close the connection.
pub trait LineSource: BufRead {
    /// Close the underlying connection, if any
    fn release(&mut self) -> io::Result<()> {
        Ok(())
    }
}

impl LineSource for BufReader<TcpStream> {
    fn release(&mut self) -> io::Result<()> {
        self.get_ref().shutdown(Shutdown::Both)
    }
}

impl<T> LineSource for io::Cursor<T> where T: AsRef<[u8]> {}

impl LineSource for &[u8] {}

/// Closes a session from another thread
///
/// Cancelling shuts down the socket, which unblocks any pending
/// read. The session then ends with [`SessionEnd::Cancelled`].
#[derive(Debug)]
pub struct CancelHandle {
    stream: TcpStream,
    cancelled: Arc<AtomicBool>,
}

impl CancelHandle {
    /// Close the session
    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::SeqCst);
        if let Err(err) = self.stream.shutdown(Shutdown::Both) {
            debug!("cancel: {}", err);
        }
    }
}

/// Where to find the server
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Endpoint {
    host: String,
    port: u16,
    idle_timeout: Duration,
    greeting_lines: usize,
}

impl Endpoint {
    /// Server at `host` and `port`, with default settings
    pub fn new<S>(host: S, port: u16) -> Self
    where
        S: Into<String>,
    {
        Self {
            host: host.into(),
            port,
            idle_timeout: DEFAULT_IDLE_TIMEOUT,
            greeting_lines: DEFAULT_GREETING_LINES,
        }
    }

    /// End the session if nothing is received for this long
    ///
    /// A zero duration disables the timeout.
    pub fn with_idle_timeout(mut self, timeout: Duration) -> Self {
        self.idle_timeout = timeout;
        self
    }

    /// Skip this many banner lines after connecting
    pub fn with_greeting_lines(mut self, lines: usize) -> Self {
        self.greeting_lines = lines;
        self
    }

    /// Server host name
    pub fn host(&self) -> &str {
        &self.host
    }

    /// Server port
    pub fn port(&self) -> u16 {
        self.port
    }

    /// Connect to the server
    pub fn connect(&self) -> Result<Session<Connected>, ConnectErr> {
        let wrap = |source| ConnectErr {
            host: self.host.clone(),
            port: self.port,
            source,
        };

        let stream = TcpStream::connect((self.host.as_str(), self.port)).map_err(wrap)?;
        let timeout = if self.idle_timeout.is_zero() {
            None
        } else {
            Some(self.idle_timeout)
        };
        stream.set_read_timeout(timeout).map_err(wrap)?;

        info!("connected to {}:{}", self.host, self.port);
        Ok(Session {
            state: Connected {
                stream,
                greeting_lines: self.greeting_lines,
                cancelled: Arc::new(AtomicBool::new(false)),
            },
        })
    }
}

/// A session with a server, in state `S`
#[derive(Debug)]
pub struct Session<S> {
    state: S,
}

/// Connected, but not yet reading
#[derive(Debug)]
pub struct Connected {
    stream: TcpStream,
    greeting_lines: usize,
    cancelled: Arc<AtomicBool>,
}

/// Reading lines from `R`
#[derive(Debug)]
pub struct Reading<R> {
    source: R,
    greeting_lines: usize,
    cancelled: Arc<AtomicBool>,
}

impl Session<Connected> {
    /// Obtain a handle which can close this session
    pub fn cancel_handle(&self) -> io::Result<CancelHandle> {
        Ok(CancelHandle {
            stream: self.state.stream.try_clone()?,
            cancelled: self.state.cancelled.clone(),
        })
    }

    /// Start reading from the server
    pub fn into_reading(self) -> Session<Reading<BufReader<TcpStream>>> {
        self.into()
    }

    /// Read alerts until the session ends
    pub fn run<H>(self, handler: &mut H) -> SessionSummary
    where
        H: EventHandler + ?Sized,
    {
        self.into_reading().run(handler)
    }
}

impl<R> Session<Reading<R>>
where
    R: LineSource,
{
    /// Read alerts from any line source
    ///
    /// There is no banner and no connection to close.
    ///
    /// ```
    /// use wxralert::{Event, Session, SessionEnd};
    ///
    /// let input: &[u8] = b"*\nWXR RWT 039103 20061130T145709+0600\n";
    /// let mut events = vec![];
    /// let summary = Session::from_reader(input).run(&mut |evt: Event| events.push(evt));
    ///
    /// assert_eq!(1, events.len());
    /// assert_eq!(1, summary.keepalives);
    /// assert!(matches!(summary.end, SessionEnd::EndOfStream));
    /// ```
    pub fn from_reader(source: R) -> Self {
        Self {
            state: Reading {
                source,
                greeting_lines: 0,
                cancelled: Arc::new(AtomicBool::new(false)),
            },
        }
    }

    /// Skip this many banner lines before reading alerts
    pub fn with_greeting_lines(mut self, lines: usize) -> Self {
        self.state.greeting_lines = lines;
        self
    }

    /// Read alerts until the session ends
    ///
    /// Keep-alives are discarded. Each other line is decoded and
    /// passed to the `handler`; lines which fail to decode are
    /// passed to its `handle_invalid()`. When reading stops, the
    /// connection is released and a summary returned.
    pub fn run<H>(mut self, handler: &mut H) -> SessionSummary
    where
        H: EventHandler + ?Sized,
    {
        let mut summary = SessionSummary {
            end: SessionEnd::EndOfStream,
            events: 0,
            invalid: 0,
            keepalives: 0,
        };
        let mut buf = Vec::with_capacity(128);

        let end = loop {
            let received = match next_line(&mut self.state.source, &mut buf) {
                Ok(received) => received,
                Err(end) => break end,
            };

            if self.state.greeting_lines > 0 {
                self.state.greeting_lines -= 1;
                debug!("banner: {}", received.text());
                continue;
            }

            let line = match received {
                Received::Line(line) => line,
                Received::TooLong { prefix, len } => {
                    summary.invalid += 1;
                    handler.handle_invalid(InvalidEvent::too_long(prefix, len));
                    continue;
                }
            };

            debug!("received: {}", line);
            if line == KEEPALIVE {
                summary.keepalives += 1;
                continue;
            }

            match Event::parse(&line) {
                Ok(event) => {
                    summary.events += 1;
                    handler.handle_event(event);
                }
                Err(err) => {
                    summary.invalid += 1;
                    handler.handle_invalid(err);
                }
            }
        };

        summary.end = if self.state.cancelled.load(Ordering::SeqCst) {
            SessionEnd::Cancelled
        } else {
            end
        };

        match &summary.end {
            SessionEnd::EndOfStream => info!("server closed the connection"),
            SessionEnd::IdleTimeout => info!("no data from server; closing connection"),
            SessionEnd::Cancelled => info!("session cancelled"),
            SessionEnd::IoFailure(err) => error!("connection failed: {}", err),
        }

        debug!("closing connection");
        if let Err(err) = self.state.source.release() {
            match err.kind() {
                io::ErrorKind::NotConnected => debug!("close: {}", err),
                _ => warn!("unable to close connection: {}", err),
            }
        }

        summary
    }
}

impl From<Session<Connected>> for Session<Reading<BufReader<TcpStream>>> {
    fn from(session: Session<Connected>) -> Self {
        debug!("new state: reading");
        let Connected {
            stream,
            greeting_lines,
            cancelled,
        } = session.state;

        Self {
            state: Reading {
                source: BufReader::new(stream),
                greeting_lines,
                cancelled,
            },
        }
    }
}

// One line from the server
#[derive(Debug, PartialEq, Eq)]
enum Received {
    Line(String),

    // over MAX_LINE_LEN; only the first MAX_LINE_LEN bytes are kept
    TooLong { prefix: String, len: usize },
}

impl Received {
    fn text(&self) -> &str {
        match self {
            Received::Line(line) => line,
            Received::TooLong { prefix, .. } => prefix,
        }
    }
}

// Read the next line, without its terminator
//
// Invalid UTF-8 is replaced rather than rejected so that one bad
// byte costs only one line. At most MAX_LINE_LEN bytes, plus the
// terminator, are buffered. Errors map to the reason the session
// should end.
fn next_line<R>(source: &mut R, buf: &mut Vec<u8>) -> Result<Received, SessionEnd>
where
    R: BufRead + ?Sized,
{
    // room for the longest line and its "\r\n"
    const LIMIT: usize = MAX_LINE_LEN + 2;

    buf.clear();
    let mut len = match Read::take(&mut *source, LIMIT as u64).read_until(b'\n', buf) {
        Ok(0) => return Err(SessionEnd::EndOfStream),
        Ok(len) => len,
        Err(err) => return Err(read_failure(err)),
    };

    let terminated = buf.last() == Some(&b'\n');
    let overflowed = !terminated && len == LIMIT;
    if overflowed {
        len += discard_line(source).map_err(read_failure)?;
    }

    if terminated {
        buf.pop();
    }
    if buf.last() == Some(&b'\r') {
        buf.pop();
    }

    if overflowed || buf.len() > MAX_LINE_LEN {
        buf.truncate(MAX_LINE_LEN);
        Ok(Received::TooLong {
            prefix: String::from_utf8_lossy(buf).into_owned(),
            len,
        })
    } else {
        Ok(Received::Line(String::from_utf8_lossy(buf).into_owned()))
    }
}

// Skip the rest of the current line, including its newline
//
// Returns the number of bytes skipped.
fn discard_line<R>(source: &mut R) -> io::Result<usize>
where
    R: BufRead + ?Sized,
{
    let mut skipped = 0;
    loop {
        let available = match source.fill_buf() {
            Ok(available) => available,
            Err(err) if err.kind() == io::ErrorKind::Interrupted => continue,
            Err(err) => return Err(err),
        };

        if available.is_empty() {
            return Ok(skipped);
        }

        match available.iter().position(|&b| b == b'\n') {
            Some(newline) => {
                source.consume(newline + 1);
                return Ok(skipped + newline + 1);
            }
            None => {
                let used = available.len();
                source.consume(used);
                skipped += used;
            }
        }
    }
}

fn read_failure(err: io::Error) -> SessionEnd {
    if is_timeout(&err) {
        SessionEnd::IdleTimeout
    } else {
        SessionEnd::IoFailure(err)
    }
}

// read timeouts are WouldBlock on unix and TimedOut on windows
fn is_timeout(err: &io::Error) -> bool {
    matches!(
        err.kind(),
        io::ErrorKind::WouldBlock | io::ErrorKind::TimedOut
    )
}
