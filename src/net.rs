//! Transport seams: the Wi-Fi radio and the HTTP session built on top of it.

use anyhow::Result;

use crate::fault::Fault;

/// Largest response body accepted from either API.
pub const MAX_BODY_BYTES: usize = 32 * 1024;

/// One HTTP session (socket pool + client). Dropped and rebuilt wholesale by
/// the session manager; never patched in place.
pub trait HttpClient {
    /// GET `url` and return the body, which must look like a JSON object.
    fn get(&mut self, url: &str) -> Result<String, Fault>;
}

/// The Wi-Fi side of the network stack.
pub trait Radio {
    type Client: HttpClient;

    /// Hard reset of the radio; drops any association.
    fn reset(&mut self);

    fn is_connected(&self) -> bool;

    /// One association attempt. Callers own the retry policy.
    fn connect(&mut self, ssid: &str, password: &str) -> Result<()>;

    /// Build a fresh HTTP session on the current association.
    fn open_client(&mut self) -> Result<Self::Client>;
}

/// Accumulates a response body with a hard size cap and fallible
/// allocation, so a short heap surfaces as `Fault::OutOfMemory` instead of an
/// abort.
#[derive(Debug, Default)]
pub struct BodyBuffer {
    bytes: Vec<u8>,
}

impl BodyBuffer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, chunk: &[u8]) -> Result<(), Fault> {
        if self.bytes.len() + chunk.len() > MAX_BODY_BYTES {
            return Err(Fault::Format(format!(
                "response too large (>{}KB)",
                MAX_BODY_BYTES / 1024
            )));
        }
        self.bytes
            .try_reserve(chunk.len())
            .map_err(|e| Fault::OutOfMemory(e.to_string()))?;
        self.bytes.extend_from_slice(chunk);
        Ok(())
    }

    /// Decode as UTF-8 and check the body is a JSON object.
    pub fn into_json_text(self) -> Result<String, Fault> {
        let text = String::from_utf8(self.bytes)
            .map_err(|e| Fault::Format(format!("body is not UTF-8: {}", e)))?;
        if !text.trim_start().starts_with('{') {
            return Err(Fault::Format("response is not JSON".to_string()));
        }
        Ok(text)
    }
}

/// Map an HTTP status line to a fault; only 200 is accepted.
pub fn check_status(status: u16) -> Result<(), Fault> {
    match status {
        200 => Ok(()),
        429 => Err(Fault::Transport("API rate limited (HTTP 429)".to_string())),
        408 | 504 => Err(Fault::Timeout(format!("HTTP {}", status))),
        s => Err(Fault::Transport(format!("HTTP error: status {}", s))),
    }
}

/// Drop the query string so API keys never reach the log.
pub fn redact(url: &str) -> &str {
    url.split('?').next().unwrap_or(url)
}
