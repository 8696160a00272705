//! Shared blocking HTTP layer: one agent, bearer auth, typed error mapping.
//! No retries or backoff; every failure goes straight back to the caller.

use std::io::Read;
use std::sync::OnceLock;
use std::time::Duration;

use rand::Rng;

use crate::error::{Result, SopdropError};

const DEFAULT_TIMEOUT_MS: u64 = 30_000;
pub const USER_AGENT: &str = concat!("sopdrop-client/", env!("CARGO_PKG_VERSION"));

fn timeout_from_env() -> u64 {
    std::env::var("SOPDROP_HTTP_TIMEOUT_MS")
        .ok()
        .and_then(|v| v.parse::<u64>().ok())
        .unwrap_or(DEFAULT_TIMEOUT_MS)
}

/// One Agent for the whole process: TCP connection reuse across calls.
fn agent() -> &'static ureq::Agent {
    static AGENT: OnceLock<ureq::Agent> = OnceLock::new();
    AGENT.get_or_init(|| {
        ureq::AgentBuilder::new()
            .timeout(Duration::from_millis(timeout_from_env()))
            .user_agent(USER_AGENT)
            .build()
    })
}

pub struct HttpResponse {
    pub status: u16,
    pub content_type: String,
    pub body: Vec<u8>,
}

impl HttpResponse {
    pub fn is_json(&self) -> bool {
        self.content_type.contains("application/json")
    }

    pub fn json(&self) -> Result<serde_json::Value> {
        Ok(serde_json::from_slice(&self.body)?)
    }
}

/// Pull the `error` field out of a JSON error body; fall back to the raw
/// body, then to the bare status code.
fn server_message(status: u16, body: &str) -> String {
    if let Ok(v) = serde_json::from_str::<serde_json::Value>(body) {
        if let Some(msg) = v.get("error").and_then(|e| e.as_str()) {
            return msg.to_string();
        }
    }
    let trimmed = body.trim();
    if trimmed.is_empty() {
        format!("HTTP {}", status)
    } else {
        trimmed.to_string()
    }
}

fn status_error(status: u16, url: &str, resp: ureq::Response) -> SopdropError {
    match status {
        401 => SopdropError::Auth("token missing or expired; run `sopdrop login`".to_string()),
        404 => SopdropError::NotFound(url.to_string()),
        _ => {
            let body = resp.into_string().unwrap_or_default();
            SopdropError::Server {
                status,
                message: server_message(status, &body),
            }
        }
    }
}

fn read_body(resp: ureq::Response) -> Result<HttpResponse> {
    let status = resp.status();
    let content_type = resp.content_type().to_string();
    let hint = resp
        .header("Content-Length")
        .and_then(|v| v.parse::<usize>().ok())
        .unwrap_or(0);
    let mut body = Vec::with_capacity(if hint > 0 { hint } else { 16 * 1024 });
    resp.into_reader()
        .read_to_end(&mut body)
        .map_err(|e| SopdropError::Network(e.to_string()))?;
    Ok(HttpResponse {
        status,
        content_type,
        body,
    })
}

fn finish(
    url: &str,
    outcome: std::result::Result<ureq::Response, ureq::Error>,
) -> Result<HttpResponse> {
    match outcome {
        Ok(resp) => read_body(resp),
        Err(ureq::Error::Status(code, resp)) => Err(status_error(code, url, resp)),
        Err(e) => Err(SopdropError::Network(e.to_string())),
    }
}

fn with_auth(req: ureq::Request, token: Option<&str>) -> ureq::Request {
    match token {
        Some(t) if !t.is_empty() => req.set("Authorization", &format!("Bearer {}", t)),
        _ => req,
    }
}

/// GET with url-encoded query pairs and optional bearer token.
pub fn get(url: &str, query: &[(&str, &str)], token: Option<&str>) -> Result<HttpResponse> {
    let mut req = agent().get(url).set("Accept", "application/json");
    for (k, v) in query {
        req = req.query(k, v);
    }
    finish(url, with_auth(req, token).call())
}

/// POST a JSON body with optional bearer token.
pub fn post_json(
    url: &str,
    body: &serde_json::Value,
    token: Option<&str>,
) -> Result<HttpResponse> {
    let req = agent()
        .post(url)
        .set("Accept", "application/json")
        .set("Content-Type", "application/json");
    let payload = serde_json::to_string(body)?;
    finish(url, with_auth(req, token).send_string(&payload))
}

fn boundary() -> String {
    let mut rng = rand::thread_rng();
    let suffix: String = (0..24)
        .map(|_| char::from_digit(rng.gen_range(0..16), 16).unwrap())
        .collect();
    format!("----SopdropUpload{}", suffix)
}

/// Assemble a multipart/form-data body: text fields plus one binary file
/// part, CRLF-delimited.
fn build_multipart(
    boundary: &str,
    fields: &[(&str, String)],
    file_field: &str,
    filename: &str,
    file_bytes: &[u8],
) -> Vec<u8> {
    let mut parts: Vec<Vec<u8>> = Vec::new();
    for (key, value) in fields {
        parts.push(format!("--{}", boundary).into_bytes());
        parts.push(format!("Content-Disposition: form-data; name=\"{}\"", key).into_bytes());
        parts.push(Vec::new());
        parts.push(value.clone().into_bytes());
    }
    parts.push(format!("--{}", boundary).into_bytes());
    parts.push(
        format!(
            "Content-Disposition: form-data; name=\"{}\"; filename=\"{}\"",
            file_field, filename
        )
        .into_bytes(),
    );
    parts.push(b"Content-Type: application/octet-stream".to_vec());
    parts.push(Vec::new());
    parts.push(file_bytes.to_vec());
    parts.push(format!("--{}--", boundary).into_bytes());
    parts.join(&b"\r\n"[..])
}

/// POST a multipart form (used for HDA uploads). Requires a bearer token.
pub fn post_multipart(
    url: &str,
    fields: &[(&str, String)],
    file_field: &str,
    filename: &str,
    file_bytes: &[u8],
    token: &str,
) -> Result<HttpResponse> {
    let boundary = boundary();
    let body = build_multipart(&boundary, fields, file_field, filename, file_bytes);
    let req = agent()
        .post(url)
        .set("Accept", "application/json")
        .set(
            "Content-Type",
            &format!("multipart/form-data; boundary={}", boundary),
        )
        .set("Authorization", &format!("Bearer {}", token));
    finish(url, req.send_bytes(&body))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_server_message_prefers_error_field() {
        assert_eq!(
            server_message(422, r#"{"error": "name already taken"}"#),
            "name already taken"
        );
        assert_eq!(server_message(500, "plain text"), "plain text");
        assert_eq!(server_message(502, ""), "HTTP 502");
    }

    #[test]
    fn test_build_multipart_layout() {
        let body = build_multipart(
            "----b",
            &[("name", "my-hda".to_string())],
            "file",
            "my.hda",
            b"\x00\x01binary",
        );
        let text = String::from_utf8_lossy(&body);
        assert!(text.starts_with("------b\r\n"));
        assert!(text.contains("Content-Disposition: form-data; name=\"name\"\r\n\r\nmy-hda"));
        assert!(text.contains("filename=\"my.hda\""));
        assert!(text.contains("Content-Type: application/octet-stream"));
        assert!(text.ends_with("------b--"));
    }

    #[test]
    fn test_boundary_is_unique_enough() {
        assert_ne!(boundary(), boundary());
    }
}
