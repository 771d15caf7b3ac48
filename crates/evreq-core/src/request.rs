//! Request construction: URL assembly, parameter placement, body encoding.
//!
//! Parameters travel in the query string for GET/HEAD/DELETE and for the
//! upload/download variants; for the remaining methods they are JSON-encoded
//! into the body. Everything here is synchronous and failures surface to the
//! caller before any session is opened.

use serde_json::{Map, Value};
use url::Url;

use crate::error::Error;
use crate::task::{HttpMethod, Task, TaskKind};
use crate::transport::{Delivery, PreparedRequest, RequestBody};

fn carries_query(method: HttpMethod) -> bool {
    matches!(
        method,
        HttpMethod::Get | HttpMethod::Head | HttpMethod::Delete
    )
}

/// Assemble the transport-facing request for `task`.
pub fn build(task: &Task, delivery: Delivery) -> Result<PreparedRequest, Error> {
    let mut url =
        Url::parse(task.url()).map_err(|e| Error::invalid_parameter(format!("url: {}", e)))?;
    let method = task.method();

    let mut body = RequestBody::None;
    if !task.parameters().is_empty() {
        if carries_query(method) || !matches!(task.kind(), TaskKind::Request { .. }) {
            append_query(&mut url, task.parameters());
        } else {
            let bytes = serde_json::to_vec(task.parameters())
                .map_err(|e| Error::serialization(format!("request body: {}", e)))?;
            body = RequestBody::Json(bytes);
        }
    }

    if let TaskKind::Upload { object } = task.kind() {
        if object.data.is_empty() {
            return Err(Error::missing_value("upload payload"));
        }
        body = RequestBody::Multipart {
            field_name: object.field_name.clone(),
            file_name: object.file_name.clone(),
            mime: object.mime.as_str(),
            data: object.data.clone(),
        };
    }

    let headers = task
        .headers()
        .iter()
        .map(|(name, value)| (name.clone(), value.clone()))
        .collect();

    Ok(PreparedRequest {
        method,
        url: url.into(),
        headers,
        body,
        delivery,
    })
}

fn append_query(url: &mut Url, parameters: &Map<String, Value>) {
    let mut pairs = url.query_pairs_mut();
    for (name, value) in parameters {
        match value {
            Value::String(s) => pairs.append_pair(name, s),
            other => pairs.append_pair(name, &other.to_string()),
        };
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::task::RequestEvent;

    #[test]
    fn get_parameters_land_in_query() {
        let task = Task::request(RequestEvent::new("q"), HttpMethod::Get, "http://host/path")
            .with_parameter("a", "b")
            .with_parameter("n", 3);
        let prepared = build(&task, Delivery::Buffered).unwrap();
        assert!(prepared.url.contains("a=b"), "{}", prepared.url);
        assert!(prepared.url.contains("n=3"), "{}", prepared.url);
        assert!(matches!(prepared.body, RequestBody::None));
    }

    #[test]
    fn query_merges_with_existing_query() {
        let task = Task::request(
            RequestEvent::new("q"),
            HttpMethod::Get,
            "http://host/path?keep=1",
        )
        .with_parameter("a", "b");
        let prepared = build(&task, Delivery::Buffered).unwrap();
        assert!(prepared.url.contains("keep=1"), "{}", prepared.url);
        assert!(prepared.url.contains("a=b"), "{}", prepared.url);
    }

    #[test]
    fn headers_are_copied_through() {
        let task = Task::request(RequestEvent::new("h"), HttpMethod::Get, "http://host/")
            .with_header("X", "1");
        let prepared = build(&task, Delivery::Buffered).unwrap();
        assert!(prepared
            .headers
            .iter()
            .any(|(n, v)| n == "X" && v == "1"));
    }

    #[test]
    fn post_parameters_become_json_body() {
        let task = Task::request(RequestEvent::new("p"), HttpMethod::Post, "http://host/")
            .with_parameter("a", "b");
        let prepared = build(&task, Delivery::Buffered).unwrap();
        match prepared.body {
            RequestBody::Json(bytes) => {
                let value: Value = serde_json::from_slice(&bytes).unwrap();
                assert_eq!(value["a"], "b");
            }
            other => panic!("expected json body, got {:?}", other),
        }
        assert!(!prepared.url.contains("a=b"));
    }

    #[test]
    fn invalid_url_is_rejected() {
        let task = Task::request(RequestEvent::new("bad"), HttpMethod::Get, "not a url");
        let err = build(&task, Delivery::Buffered).unwrap_err();
        assert!(matches!(
            err.kind,
            crate::error::ErrorKind::InvalidParameter(_)
        ));
    }

    #[test]
    fn upload_builds_multipart_and_keeps_parameters_in_query() {
        let task = Task::upload(
            RequestEvent::new("up"),
            "http://host/files",
            crate::task::UploadObject::new(
                "file",
                "a.png",
                vec![1, 2, 3],
                crate::task::FileMime::Png,
            ),
        )
        .with_parameter("tag", "x");
        let prepared = build(&task, Delivery::Buffered).unwrap();
        assert_eq!(prepared.method, HttpMethod::Post);
        assert!(prepared.url.contains("tag=x"), "{}", prepared.url);
        match prepared.body {
            RequestBody::Multipart {
                field_name,
                file_name,
                mime,
                data,
            } => {
                assert_eq!(field_name, "file");
                assert_eq!(file_name, "a.png");
                assert_eq!(mime, "image/png");
                assert_eq!(data, vec![1, 2, 3]);
            }
            other => panic!("expected multipart body, got {:?}", other),
        }
    }

    #[test]
    fn empty_upload_payload_is_rejected() {
        let task = Task::upload(
            RequestEvent::new("up"),
            "http://host/files",
            crate::task::UploadObject::new("file", "a.png", vec![], crate::task::FileMime::Png),
        );
        let err = build(&task, Delivery::Buffered).unwrap_err();
        assert!(matches!(err.kind, crate::error::ErrorKind::MissingValue(_)));
    }
}
