use std::fmt::Display;
use std::path::PathBuf;

use clap::{error::ErrorKind, CommandFactory, Parser};

use wxralert::{parse_addresses, RecipientGroup, DEFAULT_MAILBOX, DEFAULT_PORT};

const USAGE_SHORT: &str = r#"
This program connects to a wxrd server and listens for weather alerts. Each alert is mailed to the --email and --sms recipients.

See --help for more details.

ALWAYS TEST YOUR ALERTING SETUP!
"#;

const USAGE_LONG: &str = r#"
This program connects to a wxrd server and listens for weather alerts. Each alert is mailed to the --email and --sms recipients.

Arguments which follow "--" name a mail command. Each notification is piped to its standard input as a complete message, with From, To, Bcc, and Subject headers. Any sendmail-compatible program will work:

    wxrclient --host wxr.example.com \
        --email alice@example.com,bob@example.com \
        --sms 5551234567@sms.example.com \
        -- sendmail -t -i

The mail command receives the following additional environment variables:

  WXRCLIENT_FROM="wxrd@localhost"
  WXRCLIENT_TO="wxrd@localhost"
  WXRCLIENT_BCC="alice@example.com bob@example.com"
  WXRCLIENT_SUBJECT="Required Weekly Test"
  WXRCLIENT_MAILHOST="smtp.example.com" (from --mailhost)
  WXRCLIENT_MAILUSER="wxrd" (from --mailuser)

Without a mail command, notifications are only logged.

wxrclient exits when the server closes the connection or goes quiet for --idle-timeout seconds. Restart it with your service manager.

Use --test to mail a sample Required Weekly Test without connecting.

ALWAYS TEST YOUR ALERTING SETUP!
"#;

const ADVANCED: &str = "Advanced Options";

/// Top-level program arguments
#[derive(Parser, Clone, Debug)]
#[command(author = "Colin S. <https://github.com/cbs228/sameold>")]
#[command(version)]
#[command(about, long_about = None)]
#[command(after_help = USAGE_SHORT, after_long_help = USAGE_LONG)]
#[command(max_term_width = 100)]
pub struct Args {
    /// Verbosity level (-vvv for more)
    #[arg(short, long, default_value_t = 0, action = clap::ArgAction::Count)]
    pub verbose: u8,

    /// Print NOTHING
    #[arg(short, long)]
    pub quiet: bool,

    /// Host running wxrd
    #[arg(short = 't', long, default_value_t = String::from("localhost"))]
    pub host: String,

    /// Port on the host running wxrd
    #[arg(short, long, default_value_t = DEFAULT_PORT)]
    pub port: u16,

    /// E-mail address(es) for full-text alerts
    ///
    /// Separate multiple addresses with commas. May be repeated.
    #[arg(short, long)]
    pub email: Vec<String>,

    /// SMS gateway address(es) for abbreviated alerts
    ///
    /// Separate multiple addresses with commas. May be repeated.
    #[arg(short, long)]
    pub sms: Vec<String>,

    /// Sender address
    #[arg(short, long, default_value_t = DEFAULT_MAILBOX.to_string())]
    pub from: String,

    /// Primary addressee; recipients are blind-copied
    #[arg(long, default_value_t = DEFAULT_MAILBOX.to_string())]
    pub to: String,

    /// SMTP host, passed to the mail command
    #[arg(short, long)]
    pub mailhost: Option<String>,

    /// SMTP user, passed to the mail command
    #[arg(short = 'u', long)]
    pub mailuser: Option<String>,

    /// Mail a sample alert and exit, without connecting
    #[arg(short = 'T', long)]
    pub test: bool,

    /// Close the connection after this many quiet seconds (0 = never)
    #[arg(long, default_value_t = 30)]
    #[arg(hide_short_help = true)]
    #[arg(help_heading = ADVANCED)]
    pub idle_timeout: u64,

    /// Banner lines sent by the server on connect
    #[arg(long, default_value_t = 2)]
    #[arg(hide_short_help = true)]
    #[arg(help_heading = ADVANCED)]
    pub greeting_lines: usize,

    /// Event code descriptions (key=value file)
    ///
    /// Replaces the built-in table of SAME event codes.
    #[arg(long)]
    #[arg(hide_short_help = true)]
    #[arg(help_heading = ADVANCED)]
    pub alerts: Option<PathBuf>,

    /// Location names (key=value file)
    ///
    /// Replaces the built-in table of Ohio county codes.
    #[arg(long)]
    #[arg(hide_short_help = true)]
    #[arg(help_heading = ADVANCED)]
    pub counties: Option<PathBuf>,

    /// Mail command, like "sendmail -t -i". Optional.
    ///
    /// Arguments are provided VERBATIM to the mail command
    /// without shell interpretation.
    #[arg(last = true)]
    pub mailer: Vec<String>,
}

impl Args {
    /// Recipient groups, in the order they are notified
    ///
    /// SMS recipients are notified first because their gateways
    /// are usually the slowest to deliver.
    pub fn recipient_groups(&self) -> Vec<RecipientGroup> {
        vec![
            RecipientGroup::abbreviated(flatten_addresses(&self.sms)),
            RecipientGroup::full_text(flatten_addresses(&self.email)),
        ]
    }
}

fn flatten_addresses(lists: &[String]) -> Vec<String> {
    lists.iter().flat_map(|list| parse_addresses(list)).collect()
}

/// A program-level error with exit code
#[derive(Debug)]
pub struct CliError {
    error: anyhow::Error,
    exit_code: i32,
}

impl CliError {
    /// Create new error with a custom exit code
    pub fn new(error: anyhow::Error, code: i32) -> CliError {
        CliError {
            error,
            exit_code: code,
        }
    }

    /// Print this error to the terminal
    ///
    /// Errors from clap are printed verbatim. Other types of errors
    /// are printed indirectly via clap's fancy formatter.
    pub fn print(&self) -> std::io::Result<()> {
        if let Some(e) = self.error.downcast_ref::<clap::Error>() {
            e.print()
        } else {
            Args::command()
                .error(ErrorKind::Format, self.to_string())
                .print()
        }
    }

    /// Print this error to the terminal and exit
    pub fn exit(&self) -> ! {
        drop(self.print());
        std::process::exit(self.exit_code);
    }
}

impl Display for CliError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:?}", self.error)
    }
}

impl std::error::Error for CliError {}

impl From<anyhow::Error> for CliError {
    fn from(err: anyhow::Error) -> CliError {
        CliError::new(err, 1)
    }
}

impl From<clap::Error> for CliError {
    fn from(err: clap::Error) -> CliError {
        let code = if err.use_stderr() { 2 } else { 0 };
        CliError::new(err.into(), code)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use wxralert::DeliveryStyle;

    #[test]
    fn test_clap() {
        use clap::CommandFactory;
        Args::command().debug_assert();
    }

    #[test]
    fn test_defaults() {
        let args = Args::try_parse_from(["wxrclient"]).unwrap();
        assert_eq!(args.host, "localhost");
        assert_eq!(args.port, 9317);
        assert_eq!(args.idle_timeout, 30);
        assert_eq!(args.greeting_lines, 2);
        assert_eq!(args.from, "wxrd@localhost");
        assert_eq!(args.to, "wxrd@localhost");
        assert!(!args.test);
        assert!(args.mailer.is_empty());
        assert!(args.recipient_groups().iter().all(|g| g.is_empty()));
    }

    #[test]
    fn test_recipients_and_mailer() {
        let args = Args::try_parse_from([
            "wxrclient",
            "-t",
            "wxr.example.com",
            "-p",
            "9000",
            "-e",
            "alice@example.com,bob@example.com",
            "--email",
            "carol@example.com",
            "-s",
            "5551234567@sms.example.com",
            "-T",
            "--",
            "sendmail",
            "-t",
            "-i",
        ])
        .unwrap();

        assert_eq!(args.host, "wxr.example.com");
        assert_eq!(args.port, 9000);
        assert!(args.test);
        assert_eq!(args.mailer, vec!["sendmail", "-t", "-i"]);

        let groups = args.recipient_groups();
        assert_eq!(groups[0].style(), DeliveryStyle::Abbreviated);
        assert_eq!(groups[0].addresses(), &["5551234567@sms.example.com"]);
        assert_eq!(groups[1].style(), DeliveryStyle::FullText);
        assert_eq!(
            groups[1].addresses(),
            &["alice@example.com", "bob@example.com", "carol@example.com"]
        );
    }
}
