use log::{error, info, warn};
use std::time::Duration;

use crate::board::Board;
use crate::config::Config;
use crate::fault::RestartReason;
use crate::net::Radio;
use crate::views::{flash_status, Screen, STATUS_RESETTING_WIFI, STATUS_RETRY_WIFI, STATUS_WIFI_CONNECTED};

/// Settle time after a radio reset before the first association attempt.
const RADIO_SETTLE: Duration = Duration::from_secs(1);

/// Owns the radio and the current HTTP session, and escalates to a device
/// restart when rebuilding the network keeps failing.
pub struct SessionManager<R: Radio> {
    radio: R,
    session: Option<R::Client>,
    rebuilds: u32,
    max_rebuilds: u32,
    ssid: String,
    password: String,
    retry_delay: Duration,
}

impl<R: Radio> SessionManager<R> {
    pub fn new(radio: R, cfg: &Config) -> Self {
        Self {
            radio,
            session: None,
            rebuilds: 0,
            max_rebuilds: cfg.max_rebuilds_before_reset,
            ssid: cfg.wifi_ssid.clone(),
            password: cfg.wifi_pass.clone(),
            retry_delay: cfg.wifi_retry_delay,
        }
    }

    /// The live session, if the last (re)build produced one.
    pub fn client(&mut self) -> Option<&mut R::Client> {
        self.session.as_mut()
    }

    pub fn radio(&self) -> &R {
        &self.radio
    }

    /// Consecutive rebuilds since the last successful fetch.
    pub fn rebuild_count(&self) -> u32 {
        self.rebuilds
    }

    pub fn record_success(&mut self) {
        if self.rebuilds > 0 {
            info!("Network healthy again after {} rebuild(s)", self.rebuilds);
        }
        self.rebuilds = 0;
    }

    /// Boot-time association and session setup. Blocks until Wi-Fi is up.
    pub fn connect<B, S>(&mut self, board: &mut B, screen: &mut S)
    where
        B: Board + ?Sized,
        S: Screen + ?Sized,
    {
        self.establish(board, screen);
    }

    /// Tear the network down and build it again. The rebuild that reaches
    /// the configured limit restarts the device instead.
    pub fn reset_network<B, S>(&mut self, board: &mut B, screen: &mut S)
    where
        B: Board + ?Sized,
        S: Screen + ?Sized,
    {
        self.rebuilds += 1;
        warn!("Network rebuild {}/{}", self.rebuilds, self.max_rebuilds);
        if self.rebuilds >= self.max_rebuilds {
            error!("Network rebuild limit reached");
            board.restart(RestartReason::RebuildLimit {
                rebuilds: self.rebuilds,
            });
        }
        self.establish(board, screen);
    }

    fn establish<B, S>(&mut self, board: &mut B, screen: &mut S)
    where
        B: Board + ?Sized,
        S: Screen + ?Sized,
    {
        flash_status(screen, STATUS_RESETTING_WIFI);
        if let Some(old) = self.session.take() {
            drop(old);
            board.reclaim_memory();
        }

        info!("Resetting radio");
        self.radio.reset();
        board.sleep(RADIO_SETTLE);

        let mut attempt = 0u32;
        while !self.radio.is_connected() {
            attempt += 1;
            info!("Connecting to WiFi '{}' (attempt {})...", self.ssid, attempt);
            match self.radio.connect(&self.ssid, &self.password) {
                Ok(()) if self.radio.is_connected() => break,
                Ok(()) => warn!("WiFi associated but link is not up"),
                Err(e) => warn!("WiFi error: {}", e),
            }
            flash_status(screen, STATUS_RETRY_WIFI);
            board.sleep(self.retry_delay);
        }
        info!("WiFi connected");
        flash_status(screen, STATUS_WIFI_CONNECTED);

        match self.radio.open_client() {
            Ok(client) => self.session = Some(client),
            Err(e) => warn!("Failed to open HTTP session: {}", e),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{FakeBoard, FakeRadio, RecordingScreen};

    fn manager(radio: FakeRadio) -> SessionManager<FakeRadio> {
        SessionManager::new(radio, &Config::default())
    }

    #[test]
    fn connect_retries_until_associated() {
        let mut radio = FakeRadio::new();
        radio.connect_failures = 3;
        let mut mgr = manager(radio);
        let mut board = FakeBoard::new();
        let mut screen = RecordingScreen::default();

        mgr.connect(&mut board, &mut screen);

        assert!(mgr.client().is_some());
        assert_eq!(mgr.radio().connects, 4);
        assert_eq!(mgr.rebuild_count(), 0);
        let retries = screen.statuses.iter().filter(|s| *s == STATUS_RETRY_WIFI).count();
        assert_eq!(retries, 3);
        assert_eq!(screen.statuses.last().map(String::as_str), Some(STATUS_WIFI_CONNECTED));
        let backoff = Config::default().wifi_retry_delay;
        assert_eq!(board.sleeps, vec![RADIO_SETTLE, backoff, backoff, backoff]);
    }

    #[test]
    fn reset_replaces_session_and_counts() {
        let mut mgr = manager(FakeRadio::new());
        let mut board = FakeBoard::new();
        let mut screen = RecordingScreen::default();
        mgr.connect(&mut board, &mut screen);
        assert_eq!(mgr.radio().clients_opened, 1);

        mgr.reset_network(&mut board, &mut screen);
        assert_eq!(mgr.rebuild_count(), 1);
        assert_eq!(mgr.radio().resets, 2);
        assert_eq!(mgr.radio().clients_opened, 2);
        assert!(mgr.client().is_some());
        assert_eq!(board.reclaims, 1);
    }

    #[test]
    fn success_resets_counter() {
        let mut mgr = manager(FakeRadio::new());
        let mut board = FakeBoard::new();
        let mut screen = RecordingScreen::default();
        mgr.reset_network(&mut board, &mut screen);
        mgr.reset_network(&mut board, &mut screen);
        assert_eq!(mgr.rebuild_count(), 2);
        mgr.record_success();
        assert_eq!(mgr.rebuild_count(), 0);
        mgr.reset_network(&mut board, &mut screen);
        mgr.reset_network(&mut board, &mut screen);
        assert_eq!(mgr.rebuild_count(), 2);
    }

    #[test]
    fn one_below_limit_does_not_restart() {
        let mut mgr = manager(FakeRadio::new());
        let mut board = FakeBoard::new();
        let mut screen = RecordingScreen::default();
        for _ in 0..Config::default().max_rebuilds_before_reset - 1 {
            mgr.reset_network(&mut board, &mut screen);
        }
        assert_eq!(mgr.rebuild_count(), 2);
    }

    #[test]
    #[should_panic(expected = "restart: 3 consecutive network rebuilds")]
    fn limit_restarts_device() {
        let mut mgr = manager(FakeRadio::new());
        let mut board = FakeBoard::new();
        let mut screen = RecordingScreen::default();
        for _ in 0..Config::default().max_rebuilds_before_reset {
            mgr.reset_network(&mut board, &mut screen);
        }
    }

    #[test]
    fn failed_session_build_leaves_no_client() {
        let mut radio = FakeRadio::new();
        radio.open_failures = 1;
        let mut mgr = manager(radio);
        let mut board = FakeBoard::new();
        let mut screen = RecordingScreen::default();
        mgr.connect(&mut board, &mut screen);
        assert!(mgr.client().is_none());
    }
}
