//! Host backends for running the board loop in a terminal.

use anyhow::Result;
use log::{error, info};
use reqwest::blocking::Client;
use std::io::Read;
use std::time::{Duration, Instant, SystemTime, UNIX_EPOCH};

use crate::board::Board;
use crate::fault::{Fault, RestartReason};
use crate::net::{check_status, redact, BodyBuffer, HttpClient, Radio};

const HTTP_TIMEOUT: Duration = Duration::from_secs(15);

/// Exit status used in place of a device restart, so a supervisor can tell
/// an escalation apart from a crash.
pub const RESTART_EXIT_CODE: i32 = 3;

/// Environment variable carrying config `key`, e.g. `stop_id` → `CTA_STOP_ID`.
pub fn env_var_name(key: &str) -> String {
    format!("CTA_{}", key.to_ascii_uppercase())
}

/// Config lookup over the process environment; empty values count as unset.
pub fn env_lookup(key: &str) -> Option<String> {
    std::env::var(env_var_name(key))
        .ok()
        .filter(|v| !v.trim().is_empty())
}

fn classify(e: reqwest::Error) -> Fault {
    if e.is_timeout() {
        Fault::Timeout(e.to_string())
    } else {
        Fault::Transport(e.to_string())
    }
}

fn classify_io(e: std::io::Error) -> Fault {
    match e.kind() {
        std::io::ErrorKind::TimedOut | std::io::ErrorKind::WouldBlock => {
            Fault::Timeout(e.to_string())
        }
        std::io::ErrorKind::OutOfMemory => Fault::OutOfMemory(e.to_string()),
        _ => Fault::Transport(e.to_string()),
    }
}

pub struct ReqwestClient {
    client: Client,
}

impl ReqwestClient {
    pub fn new() -> Result<Self> {
        let client = Client::builder().timeout(HTTP_TIMEOUT).build()?;
        Ok(Self { client })
    }
}

impl HttpClient for ReqwestClient {
    fn get(&mut self, url: &str) -> Result<String, Fault> {
        let mut response = self.client.get(url).send().map_err(classify)?;
        let status = response.status().as_u16();
        info!("HTTP GET {} -> status {}", redact(url), status);
        check_status(status)?;

        let mut body = BodyBuffer::new();
        let mut buf = [0u8; 1024];
        loop {
            let n = response.read(&mut buf).map_err(classify_io)?;
            if n == 0 {
                break;
            }
            body.push(&buf[..n])?;
        }
        body.into_json_text()
    }
}

/// The host is always online; reset and connect only flip a flag.
#[derive(Default)]
pub struct DesktopRadio {
    connected: bool,
}

impl Radio for DesktopRadio {
    type Client = ReqwestClient;

    fn reset(&mut self) {
        self.connected = false;
    }

    fn is_connected(&self) -> bool {
        self.connected
    }

    fn connect(&mut self, ssid: &str, _password: &str) -> Result<()> {
        info!("Host network stands in for WiFi '{}'", ssid);
        self.connected = true;
        Ok(())
    }

    fn open_client(&mut self) -> Result<ReqwestClient> {
        ReqwestClient::new()
    }
}

/// Wall clock is kept as an offset over the host clock so setting it never
/// touches the host.
pub struct DesktopBoard {
    boot: Instant,
    offset: i64,
}

impl DesktopBoard {
    pub fn new() -> Self {
        Self {
            boot: Instant::now(),
            offset: 0,
        }
    }

    fn host_epoch() -> i64 {
        SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_secs() as i64)
            .unwrap_or(0)
    }
}

impl Default for DesktopBoard {
    fn default() -> Self {
        Self::new()
    }
}

impl Board for DesktopBoard {
    fn monotonic(&self) -> Duration {
        self.boot.elapsed()
    }

    fn sleep(&mut self, duration: Duration) {
        std::thread::sleep(duration);
    }

    fn set_local_time(&mut self, epoch: i64) -> Result<()> {
        self.offset = epoch - Self::host_epoch();
        Ok(())
    }

    fn local_time(&self) -> i64 {
        Self::host_epoch() + self.offset
    }

    fn restart(&mut self, reason: RestartReason) -> ! {
        error!("Restarting: {}", reason);
        std::process::exit(RESTART_EXIT_CODE)
    }
}
