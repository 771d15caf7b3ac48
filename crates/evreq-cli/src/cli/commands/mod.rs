//! CLI command handlers, one file per command.

mod download;
mod get;
mod upload;

pub use download::run_download;
pub use get::run_get;
pub use upload::run_upload;

use anyhow::{bail, Result};
use evreq_core::client::CallOptions;
use evreq_core::task::Task;

/// Apply the shared `--header`/`--param` style options onto a task.
fn apply_headers(mut task: Task, headers: &[String]) -> Result<Task> {
    for header in headers {
        match header.split_once(':') {
            Some((name, value)) => {
                task = task.with_header(name.trim(), value.trim());
            }
            None => bail!("header must be `Name: value`, got `{}`", header),
        }
    }
    Ok(task)
}

fn apply_params(mut task: Task, params: &[String]) -> Result<Task> {
    for param in params {
        match param.split_once('=') {
            Some((name, value)) => {
                task = task.with_parameter(name.trim(), value.trim());
            }
            None => bail!("param must be `name=value`, got `{}`", param),
        }
    }
    Ok(task)
}

fn call_options(retries: Option<u32>) -> CallOptions {
    match retries {
        Some(count) => CallOptions::new().retry_count(count),
        None => CallOptions::new(),
    }
}
