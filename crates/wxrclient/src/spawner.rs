//! Sends mail by spawning a mail command

use std::ffi::OsString;
use std::io::{self, Write};
use std::process::{Command, Stdio};

use log::debug;
use wxralert::{Mail, Transport};

/// Pipes each message to a sendmail-compatible command
///
/// The command is started once per message. The rendered
/// message is written to its standard input, which is then
/// closed. A non-zero exit status is a delivery failure.
#[derive(Clone, Debug)]
pub struct CommandTransport {
    cmd: OsString,
    args: Vec<OsString>,
    mailhost: Option<String>,
    mailuser: Option<String>,
}

impl CommandTransport {
    /// Run `cmd` with `args` for every message
    pub fn new<C, A, B>(cmd: C, args: A) -> Self
    where
        C: Into<OsString>,
        B: Into<OsString>,
        A: IntoIterator<Item = B>,
    {
        Self {
            cmd: cmd.into(),
            args: args.into_iter().map(Into::into).collect(),
            mailhost: None,
            mailuser: None,
        }
    }

    /// Tell the command which SMTP host and user to use
    pub fn with_smtp(mut self, mailhost: Option<String>, mailuser: Option<String>) -> Self {
        self.mailhost = mailhost;
        self.mailuser = mailuser;
        self
    }

    fn command(&self, mail: &Mail) -> Command {
        let mut cmd = Command::new(&self.cmd);
        cmd.stdin(Stdio::piped())
            .stdout(Stdio::inherit())
            .stderr(Stdio::inherit())
            .args(&self.args)
            .env(childenv::WXRCLIENT_FROM, &mail.from)
            .env(childenv::WXRCLIENT_TO, &mail.to)
            .env(childenv::WXRCLIENT_BCC, mail.bcc.join(" "))
            .env(childenv::WXRCLIENT_SUBJECT, &mail.subject)
            .env(
                childenv::WXRCLIENT_MAILHOST,
                self.mailhost.as_deref().unwrap_or(""),
            )
            .env(
                childenv::WXRCLIENT_MAILUSER,
                self.mailuser.as_deref().unwrap_or(""),
            );
        cmd
    }
}

impl Transport for CommandTransport {
    fn send(&mut self, mail: &Mail) -> io::Result<()> {
        let mut child = self.command(mail).spawn()?;
        debug!("spawned mail command PID {}", child.id());

        // the pipe is closed when dropped, at the end of this block
        let written = match child.stdin.take() {
            Some(mut pipe) => pipe.write_all(mail.to_string().as_bytes()),
            None => Err(io::Error::new(
                io::ErrorKind::BrokenPipe,
                "unable to create pipe to mail command",
            )),
        };

        let status = child.wait()?;
        written?;

        if status.success() {
            Ok(())
        } else {
            Err(io::Error::new(
                io::ErrorKind::Other,
                format!(
                    "mail command exited abnormally with status {}",
                    status.code().unwrap_or(1)
                ),
            ))
        }
    }
}

mod childenv {
    /// Sender address
    pub const WXRCLIENT_FROM: &str = "WXRCLIENT_FROM";

    /// Primary addressee
    pub const WXRCLIENT_TO: &str = "WXRCLIENT_TO";

    /// Blind-copy recipients, space-delimited
    ///
    /// ```txt
    /// alice@example.com bob@example.com
    /// ```
    pub const WXRCLIENT_BCC: &str = "WXRCLIENT_BCC";

    /// Subject line
    ///
    /// The event description, like "`Required Weekly Test`."
    pub const WXRCLIENT_SUBJECT: &str = "WXRCLIENT_SUBJECT";

    /// SMTP host from `--mailhost`, or empty
    pub const WXRCLIENT_MAILHOST: &str = "WXRCLIENT_MAILHOST";

    /// SMTP user from `--mailuser`, or empty
    pub const WXRCLIENT_MAILUSER: &str = "WXRCLIENT_MAILUSER";
}
