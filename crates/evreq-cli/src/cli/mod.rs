//! CLI for the evreq HTTP client.

mod commands;

use anyhow::Result;
use clap::{Parser, Subcommand};
use evreq_core::client::Client;
use evreq_core::config;
use std::path::PathBuf;

use commands::{run_download, run_get, run_upload};

/// Top-level CLI for the evreq HTTP client.
#[derive(Debug, Parser)]
#[command(name = "evreq")]
#[command(about = "evreq: event-tagged HTTP client with session-scoped retry", long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: CliCommand,
}

#[derive(Debug, Subcommand)]
pub enum CliCommand {
    /// Perform an HTTP request and print the response.
    Get {
        /// Target URL.
        url: String,

        /// Event name, used as the log and session correlation key.
        #[arg(long, default_value = "cli-get")]
        event: String,

        /// Extra header as `Name: value`. Repeatable.
        #[arg(long = "header", value_name = "HEADER")]
        headers: Vec<String>,

        /// Query parameter as `name=value`. Repeatable.
        #[arg(long = "param", value_name = "PARAM")]
        params: Vec<String>,

        /// Retries after the initial attempt (default from config).
        #[arg(long)]
        retries: Option<u32>,

        /// Request timeout in seconds (default 10).
        #[arg(long, value_name = "SECONDS")]
        timeout: Option<u64>,

        /// Decode the response as a JSON object and pretty-print it.
        #[arg(long)]
        json: bool,
    },

    /// Download a file into a directory.
    Download {
        /// Direct HTTP/HTTPS URL to download.
        url: String,

        /// Target directory.
        #[arg(long, default_value = ".")]
        dir: PathBuf,

        /// Event name, used as the log and session correlation key.
        #[arg(long, default_value = "cli-download")]
        event: String,

        /// Replace an existing file with the same name.
        #[arg(long)]
        overwrite: bool,

        /// Retries after the initial attempt (default from config).
        #[arg(long)]
        retries: Option<u32>,
    },

    /// Upload a file as multipart/form-data.
    Upload {
        /// Target URL.
        url: String,

        /// Local file to upload.
        file: PathBuf,

        /// Form field name on the server.
        #[arg(long, default_value = "file")]
        field: String,

        /// Event name, used as the log and session correlation key.
        #[arg(long, default_value = "cli-upload")]
        event: String,

        /// Retries after the initial attempt (default from config).
        #[arg(long)]
        retries: Option<u32>,
    },
}

impl CliCommand {
    pub async fn run_from_args() -> Result<()> {
        let cli = Cli::parse();
        let cfg = config::load_or_init()?;
        tracing::debug!("loaded config: {:?}", cfg);
        let client = Client::new(cfg);

        match cli.command {
            CliCommand::Get {
                url,
                event,
                headers,
                params,
                retries,
                timeout,
                json,
            } => run_get(&client, &url, &event, &headers, &params, retries, timeout, json).await?,
            CliCommand::Download {
                url,
                dir,
                event,
                overwrite,
                retries,
            } => run_download(&client, &url, &dir, &event, overwrite, retries).await?,
            CliCommand::Upload {
                url,
                file,
                field,
                event,
                retries,
            } => run_upload(&client, &url, &file, &field, &event, retries).await?,
        }

        Ok(())
    }
}
