use anyhow::Result;
use embedded_svc::http::client::Client;
use embedded_svc::io::Read;
use esp_idf_svc::http::client::{Configuration, EspHttpConnection};
use esp_idf_sys::EspError;
use log::info;

use crate::fault::Fault;
use crate::net::{check_status, redact, BodyBuffer, HttpClient};

const TIMEOUT_MS: u64 = 15_000;

/// Map an ESP-IDF error code onto the fault taxonomy.
fn classify(e: EspError) -> Fault {
    let code = e.code();
    if code == esp_idf_sys::ESP_ERR_NO_MEM as i32 {
        Fault::OutOfMemory(e.to_string())
    } else if code == esp_idf_sys::ESP_ERR_TIMEOUT as i32
        || code == esp_idf_sys::ESP_ERR_HTTP_EAGAIN as i32
    {
        Fault::Timeout(e.to_string())
    } else {
        Fault::Transport(e.to_string())
    }
}

/// One keep-alive HTTP connection. A rebuild drops it and opens a new one.
pub struct EspHttp {
    client: Client<EspHttpConnection>,
}

impl EspHttp {
    pub fn new() -> Result<Self> {
        let config = Configuration {
            timeout: Some(std::time::Duration::from_millis(TIMEOUT_MS)),
            ..Default::default()
        };
        let connection = EspHttpConnection::new(&config)?;
        Ok(Self {
            client: Client::wrap(connection),
        })
    }
}

impl HttpClient for EspHttp {
    fn get(&mut self, url: &str) -> Result<String, Fault> {
        let request = self.client.get(url).map_err(|e| classify(e.0))?;
        let mut response = request.submit().map_err(|e| classify(e.0))?;

        let status = response.status();
        info!("HTTP GET {} -> status {}", redact(url), status);
        check_status(status)?;

        let mut body = BodyBuffer::new();
        let mut buf = [0u8; 1024];
        loop {
            let n = response.read(&mut buf).map_err(|e| classify(e.0))?;
            if n == 0 {
                break;
            }
            body.push(&buf[..n])?;
        }
        body.into_json_text()
    }
}
