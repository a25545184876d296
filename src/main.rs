mod args;

use std::process::ExitCode;

use clap::Parser;
use eyre::Context;
use safelog::Builder;

use crate::args::Args;

fn setup_tracing(verbose: u8) {
    let level = match verbose {
        0 => return,
        1 => tracing::Level::DEBUG,
        _ => tracing::Level::TRACE,
    };

    tracing_subscriber::fmt()
        .with_max_level(level)
        .with_writer(std::io::stderr)
        .init();
}

fn run(args: Args) -> eyre::Result<()> {
    setup_tracing(args.verbose);

    let mut logger = Builder::new()
        .with_config(args.to_config())
        .build()
        .context("Failed initializing logger")?;

    let message = args.message();
    if args.sensitive {
        logger.sensitive(&message);
    } else if args.init {
        logger.init_message(&message);
    } else {
        logger.log(args.record_level(), &message);
    }

    logger.flush();
    Ok(())
}

fn report(err: &eyre::Report) -> String {
    let mut out = format!("Error: {}\n", err);

    let causes: Vec<_> = err.chain().skip(1).collect();
    if !causes.is_empty() {
        out.push_str("\nCaused by:\n");
        for cause in causes {
            out.push_str(&format!("  {}\n", cause));
        }
    }

    out
}

fn main() -> ExitCode {
    let args = Args::parse();

    match run(args) {
        Err(err) => {
            eprint!("{}", report(&err));
            ExitCode::from(1)
        }
        Ok(_) => ExitCode::from(0),
    }
}
