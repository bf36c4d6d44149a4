pub mod board;
pub mod console;

use log::info;
use std::time::Duration;

use crate::arrivals::fit;
use crate::fault::Fault;

pub const STATUS_STARTING: &str = "Starting...";
pub const STATUS_RESETTING_WIFI: &str = "Resetting WiFi...";
pub const STATUS_RETRY_WIFI: &str = "Retry WiFi...";
pub const STATUS_WIFI_CONNECTED: &str = "WiFi Connected";
pub const STATUS_FETCHING: &str = "Fetching...";
pub const STATUS_REBUILDING: &str = "Rebuilding...";
pub const STATUS_RECONNECTING: &str = "Network issue... Reconnecting...";
pub const NO_ARRIVALS: &str = "No arrivals";

/// Busy indicator frames, one per tick.
pub const SPINNER: [&str; 4] = ["|", "/", "-", "\\"];

/// A text display with three regions: title, status line, arrival rows.
pub trait Screen {
    fn show_title(&mut self, text: &str);
    fn show_status(&mut self, text: &str);
    fn show_rows(&mut self, rows: &[String]);
    /// Push pending region changes to the physical display.
    fn present(&mut self) {}
}

/// Replace the status line and show it right away. Used before every
/// blocking network step so the screen never looks frozen.
pub fn flash_status<S: Screen + ?Sized>(screen: &mut S, text: &str) {
    screen.show_status(text);
    screen.present();
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    /// Counting down to the next refresh.
    Idle,
    /// A blocking fetch is running.
    Fetching,
}

/// Everything the board shows, mutated in place by the main loop.
#[derive(Debug, Clone)]
pub struct DisplayState {
    pub stop_name: String,
    pub direction: String,
    pub last_updated: String,
    seconds_to_refresh: u32,
    refresh_secs: u32,
    spinner: usize,
    phase: Phase,
    rows: Vec<String>,
}

impl DisplayState {
    pub fn new(max_results: usize, refresh_interval: Duration) -> Self {
        let refresh_secs = refresh_interval.as_secs().clamp(1, u32::MAX as u64) as u32;
        Self {
            stop_name: STATUS_STARTING.to_string(),
            direction: String::new(),
            last_updated: crate::arrivals::CLOCK_PLACEHOLDER.to_string(),
            seconds_to_refresh: refresh_secs,
            refresh_secs,
            spinner: 0,
            phase: Phase::Idle,
            rows: vec![String::new(); max_results.max(1)],
        }
    }

    pub fn rows(&self) -> &[String] {
        &self.rows
    }

    /// Fill the row slots from `lines`, blank padding or dropping extras.
    /// The slot count never changes.
    pub fn set_rows<I>(&mut self, lines: I)
    where
        I: IntoIterator<Item = String>,
    {
        let mut lines = lines.into_iter();
        for slot in self.rows.iter_mut() {
            *slot = lines.next().unwrap_or_default();
        }
    }

    /// One message in the first row, the rest blank.
    pub fn show_message(&mut self, text: &str) {
        self.set_rows([text.to_string()]);
    }

    pub fn seconds_to_refresh(&self) -> u32 {
        self.seconds_to_refresh
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    pub fn spinner_glyph(&self) -> &'static str {
        SPINNER[self.spinner % SPINNER.len()]
    }

    /// Advance one UI tick: spin, count down (never below zero). Returns
    /// true when the countdown has run out and a refresh is due.
    pub fn tick(&mut self, elapsed: Duration) -> bool {
        self.spinner = (self.spinner + 1) % SPINNER.len();
        let step = elapsed.as_secs().min(u32::MAX as u64) as u32;
        self.seconds_to_refresh = self.seconds_to_refresh.saturating_sub(step);
        self.phase == Phase::Idle && self.seconds_to_refresh == 0
    }

    pub fn begin_fetch(&mut self) {
        self.phase = Phase::Fetching;
    }

    /// Back to idle with a full countdown, whatever the fetch outcome.
    pub fn finish_fetch(&mut self) {
        self.phase = Phase::Idle;
        self.seconds_to_refresh = self.refresh_secs;
    }

    /// Retry on the next tick instead of waiting a full interval.
    pub fn refresh_soon(&mut self) {
        self.seconds_to_refresh = 1;
    }

    pub fn title_line(&self) -> String {
        if self.direction.is_empty() {
            self.stop_name.clone()
        } else {
            format!("{} {}", self.stop_name, self.direction)
        }
    }

    pub fn status_line(&self) -> String {
        format!(
            "Upd {}  {:>2}s {}",
            self.last_updated,
            self.seconds_to_refresh,
            self.spinner_glyph()
        )
    }

    /// Title and status only; rows are untouched.
    pub fn render_header<S: Screen + ?Sized>(&self, screen: &mut S) {
        screen.show_title(&self.title_line());
        screen.show_status(&self.status_line());
        screen.present();
    }

    pub fn render<S: Screen + ?Sized>(&self, screen: &mut S) {
        screen.show_title(&self.title_line());
        screen.show_status(&self.status_line());
        screen.show_rows(&self.rows);
        screen.present();
    }

    /// Copy the current frame to the log.
    pub fn mirror(&self) {
        info!("[DISPLAY] {}", self.title_line());
        for row in self.rows.iter().filter(|r| !r.is_empty()) {
            info!("  {}", row);
        }
    }
}

/// `Err: <kind>: <detail>` clipped to one row.
pub fn error_row(fault: &Fault, width: usize) -> String {
    let text = format!("Err: {}: {}", fault.label(), fault.detail());
    fit(&text, width).trim_end().to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn state() -> DisplayState {
        DisplayState::new(5, Duration::from_secs(30))
    }

    #[test]
    fn rows_always_have_fixed_slots() {
        let mut s = state();
        assert_eq!(s.rows().len(), 5);
        s.set_rows(vec!["a".to_string(); 9]);
        assert_eq!(s.rows().len(), 5);
        s.set_rows(vec!["b".to_string()]);
        assert_eq!(s.rows(), &["b", "", "", "", ""]);
        s.show_message(NO_ARRIVALS);
        assert_eq!(s.rows()[0], NO_ARRIVALS);
        assert!(s.rows()[1..].iter().all(String::is_empty));
    }

    #[test]
    fn countdown_reaches_zero_then_refreshes() {
        let mut s = DisplayState::new(1, Duration::from_secs(3));
        let tick = Duration::from_secs(1);
        assert!(!s.tick(tick));
        assert!(!s.tick(tick));
        assert!(s.tick(tick));
        assert_eq!(s.seconds_to_refresh(), 0);

        s.begin_fetch();
        assert_eq!(s.phase(), Phase::Fetching);
        assert!(!s.tick(tick), "no refresh while a fetch is running");
        s.finish_fetch();
        assert_eq!(s.phase(), Phase::Idle);
        assert_eq!(s.seconds_to_refresh(), 3);
    }

    #[test]
    fn refresh_soon_forces_next_tick() {
        let mut s = state();
        s.finish_fetch();
        s.refresh_soon();
        assert!(s.tick(Duration::from_secs(1)));
    }

    #[test]
    fn spinner_cycles() {
        let mut s = state();
        let mut seen = Vec::new();
        for _ in 0..SPINNER.len() {
            s.tick(Duration::from_secs(1));
            seen.push(s.spinner_glyph());
        }
        assert_eq!(seen, vec!["/", "-", "\\", "|"]);
    }

    #[test]
    fn header_lines() {
        let mut s = state();
        s.stop_name = "31st & Indiana".into();
        s.direction = "NB".into();
        s.last_updated = "2:35pm".into();
        assert_eq!(s.title_line(), "31st & Indiana NB");
        assert_eq!(s.status_line(), "Upd 2:35pm  30s |");
    }

    #[test]
    fn error_row_is_clipped() {
        let fault = Fault::Transport("connection reset by peer".into());
        assert_eq!(error_row(&fault, 20), "Err: net: connection");
        assert_eq!(error_row(&fault, 60), "Err: net: connection reset by peer");
        assert_eq!(error_row(&Fault::Format("bad".into()), 60), "Err: data: bad");
    }

    proptest! {
        #[test]
        fn countdown_never_negative(ticks in 0usize..200, step in 0u64..10, refresh in 1u64..120) {
            let mut s = DisplayState::new(3, Duration::from_secs(refresh));
            for _ in 0..ticks {
                s.tick(Duration::from_secs(step));
                prop_assert!(s.seconds_to_refresh() <= refresh as u32);
            }
            if step > 0 && ticks as u64 * step >= refresh {
                prop_assert_eq!(s.seconds_to_refresh(), 0);
            }
        }
    }
}
