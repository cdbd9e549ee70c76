//! gex CLI - tool dependency manager for Go projects

use anyhow::Result;
use clap::{CommandFactory, Parser};
use tracing_subscriber::EnvFilter;

mod cli;
mod commands;

use cli::{Action, Cli};
use gex::util::cancel::CancelToken;
use gex::util::shell::Shell;
use gex::util::GlobalContext;
use gex::Error;

fn main() {
    let cli = Cli::parse();

    let filter = if cli.verbose {
        EnvFilter::new("gex=debug")
    } else {
        EnvFilter::new("gex=info")
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .without_time()
        .init();

    let action = cli.action();
    if let Err(e) = run(&cli, &action) {
        let code = report(&e, &action);
        std::process::exit(code);
    }
}

fn run(cli: &Cli, action: &Action) -> Result<()> {
    if *action == Action::Help {
        Cli::command().print_help()?;
        return Ok(());
    }

    let cancel = CancelToken::new();
    let handler = cancel.clone();
    if let Err(e) = ctrlc::set_handler(move || handler.cancel()) {
        tracing::debug!("failed to install the interrupt handler: {}", e);
    }

    let mut ctx = GlobalContext::new()?;
    ctx.set_verbose(cli.verbose);
    ctx.set_jobs(cli.jobs);

    let shell = Shell::from_flags(cli.verbose, cli.no_color);
    let repo = ctx.create_repository(&cancel, shell)?;

    match action {
        Action::Add(specs) => commands::add(&repo, &cancel, specs),
        Action::Init => commands::init(&repo),
        Action::Build => commands::build(&repo, &cancel),
        Action::Regenerate => commands::regenerate(&repo, &cancel),
        Action::List => commands::list(&repo),
        Action::Run { tool, args } => commands::run(&repo, &cancel, tool, args),
        Action::Help => Ok(()),
    }
}

/// Print `err` and return the exit code.
///
/// A tool run through `gex <tool>` that exits non-zero passes its code on.
fn report(err: &anyhow::Error, action: &Action) -> i32 {
    let Some(gex_err) = err.downcast_ref::<Error>() else {
        eprintln!("error: {:#}", err);
        return 1;
    };

    if let Error::BuildAll { errors } = gex_err.root_cause() {
        if errors.len() > 1 {
            for e in errors {
                eprintln!("error: {}", e);
            }
        }
    }
    eprintln!("error: {:#}", err);

    match action {
        Action::Run { .. } => gex_err.exit_code().unwrap_or(1),
        _ => 1,
    }
}
