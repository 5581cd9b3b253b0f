// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Folio — scan, clean, review and approve book spreads for downstream OCR.
//
// Entry point. Initialises logging, parses the command line and runs the
// requested operation or the HTTP server.

mod api;
mod cli;
mod services;

use std::process::ExitCode;

use clap::Parser;
use folio_core::human_errors::humanize_error;

#[tokio::main]
async fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = cli::Cli::parse();
    tracing::debug!(command = ?cli.command, "Folio starting");

    match cli::run(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            let human = humanize_error(&err);
            eprintln!("error: {err}");
            eprintln!("{}", human.message);
            eprintln!("{}", human.suggestion);
            if human.retriable {
                eprintln!("Running the same command again may work.");
            }
            ExitCode::FAILURE
        }
    }
}
