use log::{info, warn};
use std::time::Duration;

/// NVS namespace holding overrides on the device.
pub const NS: &str = "bus_cfg";

// NVS keys are limited to 15 characters.
pub const KEY_WIFI_SSID: &str = "wifi_ssid";
pub const KEY_WIFI_PASS: &str = "wifi_pass";
pub const KEY_API_KEY: &str = "api_key";
pub const KEY_API_HOST: &str = "api_host";
pub const KEY_STOP_ID: &str = "stop_id";
pub const KEY_ROUTES: &str = "routes";
pub const KEY_MAX_RESULTS: &str = "max_results";
pub const KEY_REFRESH_SECS: &str = "refresh_s";
pub const KEY_TICK_SECS: &str = "tick_s";
pub const KEY_DEST_WIDTH: &str = "dest_width";
pub const KEY_MAX_REBUILDS: &str = "max_rebuilds";
pub const KEY_TIME_RETRY_SECS: &str = "tsync_retry_s";
pub const KEY_RETRY_COOLDOWN_SECS: &str = "retry_cool_s";
pub const KEY_WIFI_BACKOFF_SECS: &str = "wifi_backoff_s";
pub const KEY_TIME_HOST: &str = "time_host";
pub const KEY_TIME_ZONE: &str = "time_zone";
pub const KEY_MIRROR_ROWS: &str = "mirror_rows";

/// Every key `Config::load` looks up, in load order.
pub const ALL_KEYS: [&str; 17] = [
    KEY_WIFI_SSID,
    KEY_WIFI_PASS,
    KEY_API_KEY,
    KEY_API_HOST,
    KEY_STOP_ID,
    KEY_ROUTES,
    KEY_MAX_RESULTS,
    KEY_REFRESH_SECS,
    KEY_TICK_SECS,
    KEY_DEST_WIDTH,
    KEY_MAX_REBUILDS,
    KEY_TIME_RETRY_SECS,
    KEY_RETRY_COOLDOWN_SECS,
    KEY_WIFI_BACKOFF_SECS,
    KEY_TIME_HOST,
    KEY_TIME_ZONE,
    KEY_MIRROR_ROWS,
];

const DEFAULT_WIFI_SSID: &str = match option_env!("LOCAL_WIFI_SSID") {
    Some(v) => v,
    None => "",
};
const DEFAULT_WIFI_PASS: &str = match option_env!("LOCAL_WIFI_PASS") {
    Some(v) => v,
    None => "",
};
const DEFAULT_API_KEY: &str = match option_env!("LOCAL_CTA_API_KEY") {
    Some(v) => v,
    None => "",
};
const DEFAULT_API_HOST: &str = "www.ctabustracker.com";
const DEFAULT_STOP_ID: &str = "1563";
const DEFAULT_ROUTES: &str = "1,4,X4";
const DEFAULT_MAX_RESULTS: usize = 5;
const DEFAULT_REFRESH_SECS: u64 = 30;
const DEFAULT_TICK_SECS: u64 = 1;
const DEFAULT_DEST_WIDTH: usize = 16;
const DEFAULT_MAX_REBUILDS: u32 = 3;
const DEFAULT_TIME_RETRY_SECS: u64 = 15 * 60;
const DEFAULT_RETRY_COOLDOWN_SECS: u64 = 2;
const DEFAULT_WIFI_BACKOFF_SECS: u64 = 2;
const DEFAULT_TIME_HOST: &str = "worldtimeapi.org";
const DEFAULT_TIME_ZONE: &str = "America/Chicago";

/// Static configuration, resolved once at boot.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    pub wifi_ssid: String,
    pub wifi_pass: String,
    pub api_key: String,
    pub api_host: String,
    pub stop_id: String,
    pub routes: Vec<String>,
    pub max_results: usize,
    pub refresh_interval: Duration,
    pub ui_tick: Duration,
    pub dest_width: usize,
    pub max_rebuilds_before_reset: u32,
    pub time_sync_retry: Duration,
    pub retry_cooldown: Duration,
    pub wifi_retry_delay: Duration,
    pub time_host: String,
    pub time_zone: String,
    /// Copy every rendered frame to the log.
    pub mirror_rows: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            wifi_ssid: DEFAULT_WIFI_SSID.to_string(),
            wifi_pass: DEFAULT_WIFI_PASS.to_string(),
            api_key: DEFAULT_API_KEY.to_string(),
            api_host: DEFAULT_API_HOST.to_string(),
            stop_id: DEFAULT_STOP_ID.to_string(),
            routes: parse_routes(DEFAULT_ROUTES),
            max_results: DEFAULT_MAX_RESULTS,
            refresh_interval: Duration::from_secs(DEFAULT_REFRESH_SECS),
            ui_tick: Duration::from_secs(DEFAULT_TICK_SECS),
            dest_width: DEFAULT_DEST_WIDTH,
            max_rebuilds_before_reset: DEFAULT_MAX_REBUILDS,
            time_sync_retry: Duration::from_secs(DEFAULT_TIME_RETRY_SECS),
            retry_cooldown: Duration::from_secs(DEFAULT_RETRY_COOLDOWN_SECS),
            wifi_retry_delay: Duration::from_secs(DEFAULT_WIFI_BACKOFF_SECS),
            time_host: DEFAULT_TIME_HOST.to_string(),
            time_zone: DEFAULT_TIME_ZONE.to_string(),
            mirror_rows: true,
        }
    }
}

/// Split a comma separated route filter, dropping blanks.
pub fn parse_routes(csv: &str) -> Vec<String> {
    csv.split(',')
        .map(str::trim)
        .filter(|r| !r.is_empty())
        .map(str::to_string)
        .collect()
}

fn parse_flag(s: &str) -> Option<bool> {
    match s.trim().to_ascii_lowercase().as_str() {
        "1" | "on" | "true" | "yes" => Some(true),
        "0" | "off" | "false" | "no" => Some(false),
        _ => None,
    }
}

fn parse_num<T: std::str::FromStr>(key: &str, raw: &str, default: T) -> T {
    match raw.trim().parse() {
        Ok(v) => v,
        Err(_) => {
            warn!("config {} = {:?} is not a number, using default", key, raw);
            default
        }
    }
}

impl Config {
    /// Build a config from compiled-in defaults overlaid with whatever
    /// `lookup` returns. `origin` only labels the log lines ("NVS", "env").
    pub fn load<F>(origin: &str, lookup: F) -> Config
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut cfg = Config::default();
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        if let Some(v) = get(KEY_WIFI_SSID) {
            cfg.wifi_ssid = v;
        }
        info!("{} wifi_ssid = {:?}", origin, cfg.wifi_ssid);
        if let Some(v) = get(KEY_WIFI_PASS) {
            cfg.wifi_pass = v;
        }
        info!("{} wifi_pass = <{} chars>", origin, cfg.wifi_pass.len());
        if let Some(v) = get(KEY_API_KEY) {
            cfg.api_key = v;
        }
        info!("{} api_key = <{} chars>", origin, cfg.api_key.len());
        if let Some(v) = get(KEY_API_HOST) {
            cfg.api_host = v;
        }
        if let Some(v) = get(KEY_STOP_ID) {
            cfg.stop_id = v;
        }
        if let Some(v) = get(KEY_ROUTES) {
            cfg.routes = parse_routes(&v);
        }
        info!(
            "{} stop_id = {:?} routes = {:?} host = {:?}",
            origin, cfg.stop_id, cfg.routes, cfg.api_host
        );

        if let Some(v) = get(KEY_MAX_RESULTS) {
            cfg.max_results = parse_num(KEY_MAX_RESULTS, &v, DEFAULT_MAX_RESULTS).max(1);
        }
        if let Some(v) = get(KEY_REFRESH_SECS) {
            let secs = parse_num(KEY_REFRESH_SECS, &v, DEFAULT_REFRESH_SECS).max(1);
            cfg.refresh_interval = Duration::from_secs(secs);
        }
        if let Some(v) = get(KEY_TICK_SECS) {
            let secs = parse_num(KEY_TICK_SECS, &v, DEFAULT_TICK_SECS).max(1);
            cfg.ui_tick = Duration::from_secs(secs);
        }
        if let Some(v) = get(KEY_DEST_WIDTH) {
            cfg.dest_width = parse_num(KEY_DEST_WIDTH, &v, DEFAULT_DEST_WIDTH);
        }
        if let Some(v) = get(KEY_MAX_REBUILDS) {
            cfg.max_rebuilds_before_reset =
                parse_num(KEY_MAX_REBUILDS, &v, DEFAULT_MAX_REBUILDS).max(1);
        }
        if let Some(v) = get(KEY_TIME_RETRY_SECS) {
            let secs = parse_num(KEY_TIME_RETRY_SECS, &v, DEFAULT_TIME_RETRY_SECS);
            cfg.time_sync_retry = Duration::from_secs(secs);
        }
        if let Some(v) = get(KEY_RETRY_COOLDOWN_SECS) {
            let secs = parse_num(KEY_RETRY_COOLDOWN_SECS, &v, DEFAULT_RETRY_COOLDOWN_SECS);
            cfg.retry_cooldown = Duration::from_secs(secs);
        }
        if let Some(v) = get(KEY_WIFI_BACKOFF_SECS) {
            let secs = parse_num(KEY_WIFI_BACKOFF_SECS, &v, DEFAULT_WIFI_BACKOFF_SECS);
            cfg.wifi_retry_delay = Duration::from_secs(secs);
        }
        info!(
            "{} results = {} refresh = {}s tick = {}s dest_width = {} max_rebuilds = {}",
            origin,
            cfg.max_results,
            cfg.refresh_interval.as_secs(),
            cfg.ui_tick.as_secs(),
            cfg.dest_width,
            cfg.max_rebuilds_before_reset
        );

        if let Some(v) = get(KEY_TIME_HOST) {
            cfg.time_host = v;
        }
        if let Some(v) = get(KEY_TIME_ZONE) {
            cfg.time_zone = v;
        }
        info!(
            "{} time = {}/{} (retry every {}s)",
            origin,
            cfg.time_host,
            cfg.time_zone,
            cfg.time_sync_retry.as_secs()
        );

        if let Some(v) = get(KEY_MIRROR_ROWS) {
            match parse_flag(&v) {
                Some(flag) => cfg.mirror_rows = flag,
                None => warn!("config {} = {:?} is not on/off, ignoring", KEY_MIRROR_ROWS, v),
            }
        }
        info!("{} mirror_rows = {}", origin, cfg.mirror_rows);

        if cfg.wifi_ssid.is_empty() {
            warn!("No WiFi SSID configured (set {} or secrets.local.rs)", KEY_WIFI_SSID);
        }
        if cfg.api_key.is_empty() {
            warn!("No CTA API key configured (set {} or secrets.local.rs)", KEY_API_KEY);
        }
        cfg
    }
}
