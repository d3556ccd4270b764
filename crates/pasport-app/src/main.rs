// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Pasport — sixteen-photo passport card composer.
//
// Entry point. Initialises logging, parses the command line, opens the backend
// services and runs one command.

mod cli;
mod commands;
mod services;

use std::process::ExitCode;

use clap::Parser;
use pasport_core::human_errors::{Severity, humanize_error};

use cli::Cli;
use services::app_services::AppServices;

fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    tracing::debug!(?cli, "Pasport starting");

    let result = AppServices::init(cli.db).and_then(|mut svc| commands::run(&mut svc, cli.cmd));
    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            tracing::error!(error = %e, "command failed");
            let human = humanize_error(&e);
            let prefix = match human.severity {
                Severity::Warning => "warning",
                Severity::ActionRequired | Severity::Permanent => "error",
            };
            eprintln!("{prefix}: {}\n  {}", human.message, human.suggestion);
            ExitCode::FAILURE
        }
    }
}
