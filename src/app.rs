//! The run-forever loop: one context object owning every piece of mutable
//! state, ticked once per `ui_tick`.

use log::{info, warn};

use crate::arrivals::{arrival_lines, direction_abbrev, line_width, stop_name};
use crate::board::Board;
use crate::config::Config;
use crate::fault::Fault;
use crate::fetcher::PredictionFetcher;
use crate::net::Radio;
use crate::session::SessionManager;
use crate::time_sync::TimeKeeper;
use crate::views::{
    error_row, flash_status, DisplayState, Screen, NO_ARRIVALS, STATUS_FETCHING,
    STATUS_RECONNECTING,
};

pub struct App<R: Radio, B: Board, S: Screen> {
    cfg: Config,
    session: SessionManager<R>,
    fetcher: PredictionFetcher,
    clock: TimeKeeper,
    state: DisplayState,
    board: B,
    screen: S,
}

impl<R: Radio, B: Board, S: Screen> App<R, B, S> {
    pub fn new(cfg: Config, radio: R, board: B, screen: S) -> Self {
        Self {
            session: SessionManager::new(radio, &cfg),
            fetcher: PredictionFetcher::new(&cfg),
            clock: TimeKeeper::new(&cfg),
            state: DisplayState::new(cfg.max_results, cfg.refresh_interval),
            cfg,
            board,
            screen,
        }
    }

    /// Boot sequence: associate, first time sync, first fetch. A failed
    /// first fetch is shown as an error row and the loop carries on.
    pub fn start(&mut self) {
        self.state.render(&mut self.screen);
        self.session.connect(&mut self.board, &mut self.screen);
        self.clock.sync(self.session.client(), &mut self.board);

        self.state.begin_fetch();
        flash_status(&mut self.screen, STATUS_FETCHING);
        if let Err(e) = self.refresh() {
            warn!("Initial fetch failed: {}", e);
            let width = line_width(self.cfg.dest_width);
            self.state.show_message(&error_row(&e, width));
        }
        self.state.finish_fetch();
        self.state.render(&mut self.screen);
    }

    /// One UI tick. Runs a refresh when the countdown has run out.
    pub fn tick(&mut self) {
        let due = self.state.tick(self.cfg.ui_tick);
        self.state.render_header(&mut self.screen);
        if !due {
            return;
        }

        self.state.begin_fetch();
        flash_status(&mut self.screen, STATUS_FETCHING);
        let result = self.refresh();
        self.state.finish_fetch();
        match result {
            Ok(()) => self.state.render(&mut self.screen),
            Err(e) => self.recover(&e),
        }
    }

    /// Tick forever, sleeping whatever is left of each tick interval.
    pub fn run(mut self) -> ! {
        self.start();
        loop {
            let started = self.board.monotonic();
            self.tick();
            let spent = self.board.monotonic().saturating_sub(started);
            let rest = self.cfg.ui_tick.saturating_sub(spent);
            if !rest.is_zero() {
                self.board.sleep(rest);
            }
        }
    }

    fn refresh(&mut self) -> Result<(), Fault> {
        let mut preds = self
            .fetcher
            .fetch(&mut self.session, &mut self.board, &mut self.screen)?;
        self.mark_updated_now();

        if preds.is_empty() {
            info!("No arrivals for stop {}", self.cfg.stop_id);
            self.state.show_message(NO_ARRIVALS);
        } else {
            self.state.stop_name = stop_name(&preds);
            self.state.direction = direction_abbrev(&preds).to_string();
            let now = self.clock.now(&self.board);
            self.state.set_rows(arrival_lines(
                &mut preds,
                self.cfg.max_results,
                self.cfg.dest_width,
                now,
            ));
        }

        if self.cfg.mirror_rows {
            self.state.mirror();
        }
        Ok(())
    }

    /// Stamp "updated" with the current clock, retrying time sync first when
    /// the clock is untrusted and the retry interval has passed.
    fn mark_updated_now(&mut self) {
        self.clock.sync_if_due(self.session.client(), &mut self.board);
        self.state.last_updated = self.clock.clock_text(&self.board);
    }

    /// A fault escaped the fetcher: rebuild now and refresh on the next tick.
    fn recover(&mut self, fault: &Fault) {
        warn!("Network issue: {}", fault);
        flash_status(&mut self.screen, STATUS_RECONNECTING);
        self.session.reset_network(&mut self.board, &mut self.screen);
        self.state.refresh_soon();
        self.state.render_header(&mut self.screen);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{EventLog, FakeBoard, FakeRadio, RecordingScreen};
    use std::time::Duration;

    const TIME: &str = r#"{"unixtime":1715524500,"raw_offset":-21600,"dst_offset":3600}"#;
    const PREDICTIONS: &str = r#"{"bustime-response":{"prd":[
        {"rt":"4","des":"Illinois Center","rtdir":"Northbound","prdctdn":"6","stpnm":"Cottage Grove & 35th"},
        {"rt":"X4","des":"Downtown","rtdir":"Northbound","prdctdn":"DUE","prdtm":"20240512 14:35","stpnm":"Cottage Grove & 35th"}
    ]}}"#;
    const EMPTY: &str = r#"{"bustime-response":{"error":[{"msg":"No arrival times"}]}}"#;

    type TestApp = App<FakeRadio, FakeBoard, RecordingScreen>;

    fn app(responses: Vec<Result<String, Fault>>) -> TestApp {
        App::new(
            Config::default(),
            FakeRadio::with_responses(responses),
            FakeBoard::new(),
            RecordingScreen::default(),
        )
    }

    fn ok(body: &str) -> Result<String, Fault> {
        Ok(body.to_string())
    }

    fn logged_app(responses: Vec<Result<String, Fault>>, log: &EventLog) -> TestApp {
        App::new(
            Config::default(),
            FakeRadio::with_responses(responses).with_log(log),
            FakeBoard::new(),
            RecordingScreen::with_log(log),
        )
    }

    fn position(log: &EventLog, pred: impl Fn(&str) -> bool) -> Option<usize> {
        log.borrow().iter().position(|e| pred(e.as_str()))
    }

    fn is_prediction_get(event: &str) -> bool {
        event.starts_with("GET ") && event.contains("getpredictions")
    }

    fn tick_until_refresh(app: &mut TestApp) {
        let ticks = app.state.seconds_to_refresh();
        for _ in 0..ticks {
            app.tick();
        }
    }

    #[test]
    fn start_syncs_time_then_renders_arrivals() {
        let mut app = app(vec![ok(TIME), ok(PREDICTIONS)]);
        app.start();

        assert_eq!(app.state.title_line(), "Cottage Grove & 35th NB");
        assert_eq!(app.state.last_updated, "9:35am");
        assert_eq!(
            &app.state.rows()[..3],
            &["X4 Downtown         DUE 2:35pm", "4  Illinois Center  6 9:41am", ""]
        );
        assert_eq!(app.screen.rows, app.state.rows());
        assert!(app.screen.statuses.iter().any(|s| s == STATUS_FETCHING));
        assert_eq!(app.state.seconds_to_refresh(), 30);
    }

    #[test]
    fn fetching_shows_before_the_request_goes_out() {
        let log = EventLog::default();
        let mut app = logged_app(vec![ok(TIME), ok(PREDICTIONS), ok(PREDICTIONS)], &log);
        let fetching = format!("status {}", STATUS_FETCHING);

        app.start();
        let shown = position(&log, |e| e == fetching).unwrap();
        let sent = position(&log, is_prediction_get).unwrap();
        assert!(shown < sent, "{:?}", log.borrow());
        assert!(position(&log, |e| e.contains("/api/timezone/")).unwrap() < shown);

        log.borrow_mut().clear();
        tick_until_refresh(&mut app);
        let shown = position(&log, |e| e == fetching).unwrap();
        let sent = position(&log, is_prediction_get).unwrap();
        assert!(shown < sent, "{:?}", log.borrow());
        assert_eq!(app.session.radio().remaining(), 0);
    }

    #[test]
    fn failed_initial_fetch_is_an_error_row() {
        let mut app = app(vec![]);
        app.start();

        assert_eq!(app.state.rows()[0], "Err: net: script exhausted");
        assert!(app.state.rows()[0].chars().count() <= line_width(app.cfg.dest_width));
        assert_eq!(app.state.last_updated, "--:--");
        assert_eq!(app.session.rebuild_count(), 1);
        assert_eq!(app.state.seconds_to_refresh(), 30);
    }

    #[test]
    fn empty_set_shows_no_arrivals() {
        let mut app = app(vec![ok(TIME), ok(EMPTY)]);
        app.start();
        assert_eq!(app.state.rows()[0], NO_ARRIVALS);
        assert!(app.state.rows()[1..].iter().all(String::is_empty));
    }

    #[test]
    fn refresh_fires_when_countdown_runs_out() {
        let mut app = app(vec![ok(TIME), ok(PREDICTIONS), ok(EMPTY)]);
        app.start();

        for _ in 0..29 {
            app.tick();
        }
        assert_eq!(app.state.seconds_to_refresh(), 1);
        assert_eq!(app.session.radio().remaining(), 1);

        app.tick();
        assert_eq!(app.session.radio().remaining(), 0);
        assert_eq!(app.state.rows()[0], NO_ARRIVALS);
        assert_eq!(app.state.seconds_to_refresh(), 30);
        assert_eq!(app.screen.statuses.last().map(String::as_str), Some("Upd 9:35am  30s -"));
    }

    #[test]
    fn escaped_fault_reconnects_and_refreshes_soon() {
        let mut app = app(vec![ok(TIME), ok(PREDICTIONS)]);
        app.start();
        let rows = app.state.rows().to_vec();

        tick_until_refresh(&mut app);

        assert!(app.screen.statuses.iter().any(|s| s == STATUS_RECONNECTING));
        assert_eq!(app.session.rebuild_count(), 2);
        assert_eq!(app.state.seconds_to_refresh(), 1);
        assert_eq!(app.state.rows(), &rows[..]);
    }

    #[test]
    #[should_panic(expected = "restart: 3 consecutive network rebuilds")]
    fn persistent_faults_escalate_to_restart() {
        let mut app = app(vec![ok(TIME), ok(PREDICTIONS)]);
        app.start();
        tick_until_refresh(&mut app);
        app.tick();
    }

    #[test]
    fn recovery_after_reconnect_clears_rebuilds() {
        let mut app = app(vec![
            ok(TIME),
            ok(PREDICTIONS),
            Err(Fault::Timeout("read".into())),
            Err(Fault::Transport("reset".into())),
            ok(PREDICTIONS),
        ]);
        app.start();
        tick_until_refresh(&mut app);
        assert_eq!(app.session.rebuild_count(), 2);

        app.tick();
        assert_eq!(app.session.rebuild_count(), 0);
        assert_eq!(app.state.seconds_to_refresh(), 30);
    }

    #[test]
    fn untrusted_clock_retries_sync_after_interval() {
        let mut app = app(vec![
            Err(Fault::Timeout("time".into())),
            ok(PREDICTIONS),
            ok(PREDICTIONS),
            ok(PREDICTIONS),
            ok(TIME),
        ]);
        app.start();
        assert_eq!(app.state.last_updated, "--:--");
        assert_eq!(app.state.rows()[1], "4  Illinois Center  6 --:--");

        // Too soon: no time request, the next prediction body is consumed.
        tick_until_refresh(&mut app);
        assert_eq!(app.session.radio().remaining(), 2);
        assert_eq!(app.state.last_updated, "--:--");

        app.board.advance(Config::default().time_sync_retry);
        tick_until_refresh(&mut app);
        assert_eq!(app.session.radio().remaining(), 0);
        assert_eq!(app.state.last_updated, "9:35am");
    }

    #[test]
    fn tick_only_touches_header() {
        let mut app = app(vec![ok(TIME), ok(PREDICTIONS)]);
        app.start();
        let presents = app.screen.presents;
        app.tick();
        assert_eq!(app.screen.presents, presents + 1);
        assert_eq!(app.state.seconds_to_refresh(), 29);
        assert_eq!(app.screen.statuses.last().map(String::as_str), Some("Upd 9:35am  29s /"));
        assert_eq!(app.board.sleeps, vec![Duration::from_secs(1)]);
    }
}
