//! Scripted stand-ins for the hardware seams, shared by unit tests.

use std::cell::RefCell;
use std::collections::VecDeque;
use std::rc::Rc;
use std::time::Duration;

use anyhow::anyhow;

use crate::board::Board;
use crate::fault::{Fault, RestartReason};
use crate::net::{HttpClient, Radio};
use crate::views::Screen;

type Script = Rc<RefCell<VecDeque<Result<String, Fault>>>>;

/// One ordered record of requests and screen updates across test doubles.
pub type EventLog = Rc<RefCell<Vec<String>>>;

fn record(log: &Option<EventLog>, event: String) {
    if let Some(log) = log {
        log.borrow_mut().push(event);
    }
}

/// Replays canned responses in order. Once the script runs dry every request
/// is a transport fault.
pub struct ScriptedClient {
    script: Script,
    log: Option<EventLog>,
    pub requests: Vec<String>,
}

impl ScriptedClient {
    pub fn new<I>(responses: I) -> Self
    where
        I: IntoIterator<Item = Result<String, Fault>>,
    {
        Self {
            script: Rc::new(RefCell::new(responses.into_iter().collect())),
            log: None,
            requests: Vec::new(),
        }
    }
}

impl HttpClient for ScriptedClient {
    fn get(&mut self, url: &str) -> Result<String, Fault> {
        self.requests.push(url.to_string());
        record(&self.log, format!("GET {}", url));
        self.script
            .borrow_mut()
            .pop_front()
            .unwrap_or_else(|| Err(Fault::Transport("script exhausted".into())))
    }
}

/// Radio whose sessions all read from one shared response script, so a test
/// can queue responses that span rebuilds.
pub struct FakeRadio {
    script: Script,
    log: Option<EventLog>,
    connected: bool,
    pub connect_failures: u32,
    pub open_failures: u32,
    pub resets: u32,
    pub connects: u32,
    pub clients_opened: u32,
}

impl FakeRadio {
    pub fn new() -> Self {
        Self::with_responses(Vec::new())
    }

    pub fn with_responses<I>(responses: I) -> Self
    where
        I: IntoIterator<Item = Result<String, Fault>>,
    {
        Self {
            script: Rc::new(RefCell::new(responses.into_iter().collect())),
            log: None,
            connected: false,
            connect_failures: 0,
            open_failures: 0,
            resets: 0,
            connects: 0,
            clients_opened: 0,
        }
    }

    /// Sessions opened from now on record their requests into `log`.
    pub fn with_log(mut self, log: &EventLog) -> Self {
        self.log = Some(Rc::clone(log));
        self
    }

    pub fn remaining(&self) -> usize {
        self.script.borrow().len()
    }
}

impl Radio for FakeRadio {
    type Client = ScriptedClient;

    fn reset(&mut self) {
        self.resets += 1;
        self.connected = false;
    }

    fn is_connected(&self) -> bool {
        self.connected
    }

    fn connect(&mut self, _ssid: &str, _password: &str) -> anyhow::Result<()> {
        self.connects += 1;
        if self.connect_failures > 0 {
            self.connect_failures -= 1;
            return Err(anyhow!("association refused"));
        }
        self.connected = true;
        Ok(())
    }

    fn open_client(&mut self) -> anyhow::Result<ScriptedClient> {
        if self.open_failures > 0 {
            self.open_failures -= 1;
            return Err(anyhow!("no sockets"));
        }
        self.clients_opened += 1;
        Ok(ScriptedClient {
            script: Rc::clone(&self.script),
            log: self.log.clone(),
            requests: Vec::new(),
        })
    }
}

/// Virtual time: `sleep` advances both clocks instantly. Restart panics so
/// tests can observe it with `should_panic`.
pub struct FakeBoard {
    pub mono: Duration,
    pub clock: Option<i64>,
    pub sleeps: Vec<Duration>,
    pub reclaims: u32,
}

impl FakeBoard {
    pub fn new() -> Self {
        Self {
            mono: Duration::ZERO,
            clock: None,
            sleeps: Vec::new(),
            reclaims: 0,
        }
    }

    pub fn advance(&mut self, d: Duration) {
        self.mono += d;
        if let Some(clock) = self.clock.as_mut() {
            *clock += d.as_secs() as i64;
        }
    }
}

impl Board for FakeBoard {
    fn monotonic(&self) -> Duration {
        self.mono
    }

    fn sleep(&mut self, duration: Duration) {
        self.sleeps.push(duration);
        self.advance(duration);
    }

    fn set_local_time(&mut self, epoch: i64) -> anyhow::Result<()> {
        self.clock = Some(epoch);
        Ok(())
    }

    fn local_time(&self) -> i64 {
        self.clock.unwrap_or(0)
    }

    fn reclaim_memory(&mut self) {
        self.reclaims += 1;
    }

    fn restart(&mut self, reason: RestartReason) -> ! {
        panic!("restart: {}", reason)
    }
}

#[derive(Default)]
pub struct RecordingScreen {
    log: Option<EventLog>,
    pub titles: Vec<String>,
    pub statuses: Vec<String>,
    pub rows: Vec<String>,
    pub presents: u32,
}

impl RecordingScreen {
    pub fn with_log(log: &EventLog) -> Self {
        Self {
            log: Some(Rc::clone(log)),
            ..Self::default()
        }
    }
}

impl Screen for RecordingScreen {
    fn show_title(&mut self, text: &str) {
        self.titles.push(text.to_string());
    }

    fn show_status(&mut self, text: &str) {
        self.statuses.push(text.to_string());
        record(&self.log, format!("status {}", text));
    }

    fn show_rows(&mut self, rows: &[String]) {
        self.rows = rows.to_vec();
    }

    fn present(&mut self) {
        self.presents += 1;
    }
}
