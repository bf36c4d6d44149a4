use log::{info, warn};
use serde::Deserialize;
use std::time::Duration;

use crate::arrivals::{clock_from_epoch, CLOCK_PLACEHOLDER};
use crate::board::Board;
use crate::config::Config;
use crate::fault::Fault;
use crate::net::HttpClient;

#[derive(Deserialize)]
struct TimeApiRoot {
    unixtime: i64,
    #[serde(default)]
    raw_offset: i64,
    #[serde(default)]
    dst_offset: i64,
}

pub fn time_url(cfg: &Config) -> String {
    format!("http://{}/api/timezone/{}", cfg.time_host, cfg.time_zone)
}

/// Local epoch seconds (`unixtime + raw_offset + dst_offset`).
pub fn parse_time_response(json: &str) -> Result<i64, Fault> {
    let root: TimeApiRoot = serde_json::from_str(json)?;
    root.unixtime
        .checked_add(root.raw_offset)
        .and_then(|t| t.checked_add(root.dst_offset))
        .ok_or_else(|| Fault::Format("time offsets out of range".to_string()))
}

/// One sync attempt. Never fails past this point: every problem is logged
/// and reported as `false`.
pub fn sync_time<C, B>(client: Option<&mut C>, board: &mut B, url: &str) -> bool
where
    C: HttpClient + ?Sized,
    B: Board + ?Sized,
{
    let Some(client) = client else {
        warn!("Time sync skipped: no network session");
        return false;
    };
    info!("Syncing time from {}", url);
    let epoch = match client.get(url).and_then(|body| parse_time_response(&body)) {
        Ok(epoch) => epoch,
        Err(e) => {
            warn!("Time sync failed: {}", e);
            return false;
        }
    };
    if let Err(e) = board.set_local_time(epoch) {
        warn!("Time sync failed to set clock: {}", e);
        return false;
    }
    info!("Time synchronized, local time {}", clock_from_epoch(epoch));
    true
}

/// Whether the wall clock can be trusted, and when we last tried to make it so.
#[derive(Debug, Clone)]
pub struct TimeKeeper {
    url: String,
    retry_interval: Duration,
    ready: bool,
    last_attempt: Option<Duration>,
}

impl TimeKeeper {
    pub fn new(cfg: &Config) -> Self {
        Self {
            url: time_url(cfg),
            retry_interval: cfg.time_sync_retry,
            ready: false,
            last_attempt: None,
        }
    }

    pub fn is_ready(&self) -> bool {
        self.ready
    }

    /// A retry is due when time is unset and the cooldown (monotonic) has
    /// passed since the previous attempt. The first attempt is always due.
    pub fn retry_due(&self, now: Duration) -> bool {
        if self.ready {
            return false;
        }
        match self.last_attempt {
            None => true,
            Some(last) => now.saturating_sub(last) >= self.retry_interval,
        }
    }

    /// Unconditional attempt (boot path).
    pub fn sync<C, B>(&mut self, client: Option<&mut C>, board: &mut B) -> bool
    where
        C: HttpClient + ?Sized,
        B: Board + ?Sized,
    {
        self.last_attempt = Some(board.monotonic());
        if sync_time(client, board, &self.url) {
            self.ready = true;
        }
        self.ready
    }

    /// Attempt only when `retry_due`. Returns whether an attempt was made.
    pub fn sync_if_due<C, B>(&mut self, client: Option<&mut C>, board: &mut B) -> bool
    where
        C: HttpClient + ?Sized,
        B: Board + ?Sized,
    {
        if !self.retry_due(board.monotonic()) {
            return false;
        }
        self.sync(client, board);
        true
    }

    /// Trusted local epoch, or `None` while unsynced.
    pub fn now<B: Board + ?Sized>(&self, board: &B) -> Option<i64> {
        self.ready.then(|| board.local_time())
    }

    /// `h:mmam` for the current time, or the placeholder.
    pub fn clock_text<B: Board + ?Sized>(&self, board: &B) -> String {
        self.now(board)
            .map(clock_from_epoch)
            .unwrap_or_else(|| CLOCK_PLACEHOLDER.to_string())
    }
}
