use clap::Parser;
use log::{info, LevelFilter};

use wxralert::{CodeTable, Formatter, LogTransport, Lookup, Notifier, Transport};

mod app;
mod cli;
mod spawner;

use cli::{Args, CliError};
use spawner::CommandTransport;

fn main() {
    match wxrclient() {
        Ok(0) => {}
        Ok(code) => std::process::exit(code),
        Err(cli_error) => cli_error.exit(),
    }
}

fn wxrclient() -> Result<i32, CliError> {
    // Parse options and start logging
    let args = Args::try_parse()?;
    log_setup(&args);

    let lookup = lookup_setup(&args);
    let mut notifier = Notifier::new(
        Formatter::new(lookup),
        transport_setup(&args),
        args.from.as_str(),
        args.to.as_str(),
    );

    let summary = app::run(&args, &mut notifier)?;
    Ok(app::exit_code(&summary.end))
}

fn log_setup(args: &Args) {
    if args.quiet {
        // no logging
        return;
    } else if std::env::var_os("RUST_LOG").is_none() {
        // parameter controls
        let log_filter = match args.verbose {
            0 => LevelFilter::Warn,
            1 => LevelFilter::Info,
            2 => LevelFilter::Debug,
            3 | _ => LevelFilter::Trace,
        };

        pretty_env_logger::formatted_builder()
            .filter_module("wxralert", log_filter)
            .filter_module("wxrclient", log_filter)
            .init();
    } else {
        // environment controls
        pretty_env_logger::init();
    }
}

// Load code tables, falling back to the built-in ones
//
// A table which fails to load is logged and left unavailable;
// alerts are still sent, with less detail.
fn lookup_setup(args: &Args) -> Lookup {
    let events = match &args.alerts {
        Some(path) => CodeTable::from_path(path),
        None => Ok(CodeTable::builtin_events()),
    };
    let locations = match &args.counties {
        Some(path) => CodeTable::from_path(path),
        None => Ok(CodeTable::builtin_locations()),
    };

    Lookup::new(events, locations)
}

fn transport_setup(args: &Args) -> Box<dyn Transport> {
    match args.mailer.split_first() {
        Some((cmd, cmd_args)) => {
            info!("sending mail with \"{}\"", args.mailer.join(" "));
            Box::new(
                CommandTransport::new(cmd, cmd_args)
                    .with_smtp(args.mailhost.clone(), args.mailuser.clone()),
            )
        }
        None => {
            info!("no mail command: alerts will be logged only");
            Box::new(LogTransport)
        }
    }
}
