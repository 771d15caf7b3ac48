//! Upload command: send a local file as multipart/form-data.

use anyhow::{Context, Result};
use evreq_core::client::{Client, Response, ResponseShape};
use evreq_core::task::{FileMime, RequestEvent, Task, UploadObject};
use std::path::Path;

use super::call_options;

pub async fn run_upload(
    client: &Client,
    url: &str,
    file: &Path,
    field: &str,
    event: &str,
    retries: Option<u32>,
) -> Result<()> {
    let data = std::fs::read(file).with_context(|| format!("read {}", file.display()))?;
    let file_name = file
        .file_name()
        .map(|n| n.to_string_lossy().to_string())
        .unwrap_or_else(|| "upload.bin".to_string());
    let mime = mime_for(file);

    let task = Task::upload(
        RequestEvent::new(event),
        url,
        UploadObject::new(field, file_name, data, mime),
    );
    let response = client
        .upload(task, call_options(retries).shape(ResponseShape::Data))
        .await?;

    match response {
        Response::Data(data) if !data.is_empty() => {
            println!("{}", String::from_utf8_lossy(&data));
        }
        _ => println!("uploaded"),
    }
    Ok(())
}

fn mime_for(path: &Path) -> FileMime {
    match path.extension().and_then(|e| e.to_str()) {
        Some(ext) if ext.eq_ignore_ascii_case("png") => FileMime::Png,
        Some(ext) if ext.eq_ignore_ascii_case("zip") => FileMime::Zip,
        _ => FileMime::OctetStream,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn mime_follows_the_extension() {
        assert_eq!(mime_for(Path::new("a.png")), FileMime::Png);
        assert_eq!(mime_for(Path::new("a.ZIP")), FileMime::Zip);
        assert_eq!(mime_for(Path::new("a.tar.gz")), FileMime::OctetStream);
        assert_eq!(mime_for(Path::new("noext")), FileMime::OctetStream);
    }
}
