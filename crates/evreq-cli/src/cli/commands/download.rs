//! Download command: fetch a URL into a directory with progress output.

use anyhow::Result;
use evreq_core::client::Client;
use evreq_core::task::{DownloadObject, RequestEvent, Task};
use std::path::Path;

use super::call_options;

pub async fn run_download(
    client: &Client,
    url: &str,
    dir: &Path,
    event: &str,
    overwrite: bool,
    retries: Option<u32>,
) -> Result<()> {
    let task = Task::download(
        RequestEvent::new(event),
        url,
        DownloadObject::new(dir, overwrite),
    );
    let options = call_options(retries).progress(|fraction| {
        eprint!("\r{:5.1}%", f64::from(fraction) * 100.0);
    });

    let path = client.download(task, options).await?;
    eprintln!();
    println!("saved to {}", path.display());
    Ok(())
}
