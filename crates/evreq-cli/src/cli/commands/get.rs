//! Get command: plain request, response printed to stdout.

use anyhow::Result;
use evreq_core::client::{Client, Response, ResponseShape};
use evreq_core::task::{HttpMethod, RequestEvent, Task, Timeout};
use std::io::Write;
use std::time::Duration;

use super::{apply_headers, apply_params, call_options};

pub async fn run_get(
    client: &Client,
    url: &str,
    event: &str,
    headers: &[String],
    params: &[String],
    retries: Option<u32>,
    timeout: Option<u64>,
    json: bool,
) -> Result<()> {
    let mut task = Task::request(RequestEvent::new(event), HttpMethod::Get, url);
    if let Some(seconds) = timeout {
        task = task.with_timeout(Timeout::Custom(Duration::from_secs(seconds)));
    }
    task = apply_headers(task, headers)?;
    task = apply_params(task, params)?;

    let shape = if json {
        ResponseShape::Json
    } else {
        ResponseShape::Data
    };
    let response = client.request(task, call_options(retries).shape(shape)).await?;

    match response {
        Response::Json(map) => println!("{}", serde_json::to_string_pretty(&map)?),
        Response::Data(data) => {
            let mut stdout = std::io::stdout().lock();
            stdout.write_all(&data)?;
            if !data.ends_with(b"\n") {
                writeln!(stdout)?;
            }
        }
        Response::Empty => {}
    }
    Ok(())
}
