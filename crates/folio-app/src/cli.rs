// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Command-line interface. Every session operation is a subcommand that prints
// the resulting spread (or session) as JSON; `serve` starts the operator page.

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use folio_core::config::AppConfig;
use folio_core::error::Result;
use folio_core::types::SpreadIndex;
use serde::Serialize;

use crate::api;
use crate::services::config_dir::default_config_path;
use crate::services::session::open_workflow;

#[derive(Debug, Parser)]
#[command(name = "folio", version, about = "Scan, clean, review and approve book spreads")]
pub struct Cli {
    /// Configuration file (JSON). Missing file means defaults.
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    /// Work directory holding scans/, cleaned/ and session.json.
    #[arg(long, global = true)]
    pub work_dir: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Run the HTTP control surface and operator page.
    Serve {
        #[arg(long)]
        host: Option<String>,
        #[arg(long)]
        port: Option<u16>,
    },
    /// Print the session: next index and every spread.
    Status,
    /// Acquire the next spread, or the given index.
    Scan { index: Option<u32> },
    /// Re-acquire an existing spread without moving the counter.
    Rescan { index: u32 },
    /// Clean a scanned spread.
    Process {
        index: u32,
        /// Keep colour even if the configuration asks for grayscale.
        #[arg(long, conflicts_with = "grayscale")]
        color: bool,
        /// Force grayscale output.
        #[arg(long)]
        grayscale: bool,
    },
    /// Turn a cleaned spread upside down.
    Rotate { index: u32 },
    /// Straighten a cleaned spread.
    Deskew { index: u32 },
    /// Crop a cleaned spread to its content.
    Crop { index: u32 },
    /// Accept a cleaned spread.
    Approve { index: u32 },
    /// Set the index the next auto-indexed scan writes to.
    SetIndex { value: u32 },
}

impl Cli {
    /// Load the configuration file and apply command-line overrides.
    pub fn load_config(&self) -> Result<AppConfig> {
        let path = self.config.clone().unwrap_or_else(default_config_path);
        let mut config = AppConfig::load(&path)?;
        tracing::debug!(path = %path.display(), "Configuration loaded");

        if let Some(work_dir) = &self.work_dir {
            config.work_dir = work_dir.clone();
        }
        if let Command::Serve { host, port } = &self.command {
            if let Some(host) = host {
                config.server.host = host.clone();
            }
            if let Some(port) = port {
                config.server.port = *port;
            }
        }
        Ok(config)
    }
}

fn grayscale_override(color: bool, grayscale: bool) -> Option<bool> {
    match (color, grayscale) {
        (true, _) => Some(false),
        (_, true) => Some(true),
        _ => None,
    }
}

fn print_json(value: &impl Serialize) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

pub async fn run(cli: Cli) -> Result<()> {
    let config = cli.load_config()?;
    let workflow = open_workflow(&config)?;

    match cli.command {
        Command::Serve { .. } => api::serve(&config.server, workflow).await,
        Command::Status => print_json(&workflow.snapshot().await),
        Command::Scan { index } => {
            let index = index.map(SpreadIndex::new).transpose()?;
            print_json(&workflow.scan(index).await?)
        }
        Command::Rescan { index } => print_json(&workflow.rescan(SpreadIndex::new(index)?).await?),
        Command::Process {
            index,
            color,
            grayscale,
        } => {
            let spread = workflow
                .process(SpreadIndex::new(index)?, grayscale_override(color, grayscale))
                .await?;
            print_json(&spread)
        }
        Command::Rotate { index } => print_json(&workflow.rotate_180(SpreadIndex::new(index)?).await?),
        Command::Deskew { index } => print_json(&workflow.deskew(SpreadIndex::new(index)?).await?),
        Command::Crop { index } => print_json(&workflow.crop_borders(SpreadIndex::new(index)?).await?),
        Command::Approve { index } => print_json(&workflow.approve(SpreadIndex::new(index)?).await?),
        Command::SetIndex { value } => {
            workflow.set_next_index(value).await?;
            print_json(&workflow.snapshot().await)
        }
    }
}
