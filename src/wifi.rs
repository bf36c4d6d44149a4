use anyhow::{anyhow, Result};
use esp_idf_hal::modem::Modem;
use esp_idf_svc::eventloop::EspSystemEventLoop;
use esp_idf_svc::nvs::EspDefaultNvsPartition;
use esp_idf_svc::wifi::{AuthMethod, BlockingWifi, ClientConfiguration, Configuration, EspWifi};
use log::{info, warn};

use crate::http_client::EspHttp;
use crate::net::Radio;

/// Log WiFi/AP state from ESP-IDF internals.
fn log_wifi_diag(label: &str) {
    unsafe {
        let mut mode: esp_idf_sys::wifi_mode_t = 0;
        let mode_str = if esp_idf_sys::esp_wifi_get_mode(&mut mode) == esp_idf_sys::ESP_OK {
            match mode {
                x if x == esp_idf_sys::wifi_mode_t_WIFI_MODE_STA => "STA",
                x if x == esp_idf_sys::wifi_mode_t_WIFI_MODE_AP => "AP",
                x if x == esp_idf_sys::wifi_mode_t_WIFI_MODE_APSTA => "AP+STA",
                _ => "?",
            }
        } else {
            "off"
        };

        let mut ap_info: esp_idf_sys::wifi_ap_record_t = core::mem::zeroed();
        let ap_rc = esp_idf_sys::esp_wifi_sta_get_ap_info(&mut ap_info);
        if ap_rc == esp_idf_sys::ESP_OK {
            let ssid = core::str::from_utf8(&ap_info.ssid)
                .unwrap_or("?")
                .trim_end_matches('\0');
            info!(
                "WiFi [{}]: mode={} assoc=YES rssi={} ch={} ssid={}",
                label, mode_str, ap_info.rssi, ap_info.primary, ssid
            );
        } else {
            info!("WiFi [{}]: mode={} assoc=NO (ap_info err={})", label, mode_str, ap_rc);
        }
    }
}

/// Station-mode Wi-Fi. Credentials are applied on every `connect`, so a
/// reset followed by `connect` always starts from a clean driver state.
pub struct EspRadio {
    wifi: BlockingWifi<EspWifi<'static>>,
}

impl EspRadio {
    pub fn new(
        modem: Modem,
        sysloop: EspSystemEventLoop,
        nvs: Option<EspDefaultNvsPartition>,
    ) -> Result<Self> {
        let esp_wifi = EspWifi::new(modem, sysloop.clone(), nvs)?;
        let wifi = BlockingWifi::wrap(esp_wifi, sysloop)?;
        Ok(Self { wifi })
    }

    fn configure(&mut self, ssid: &str, password: &str) -> Result<()> {
        let auth = if password.is_empty() {
            AuthMethod::None
        } else {
            AuthMethod::WPA2Personal
        };

        let mut wifi_ssid = heapless::String::<32>::new();
        let mut wifi_pass = heapless::String::<64>::new();
        wifi_ssid
            .push_str(ssid)
            .map_err(|_| anyhow!("SSID longer than 32 bytes"))?;
        wifi_pass
            .push_str(password)
            .map_err(|_| anyhow!("password longer than 64 bytes"))?;

        self.wifi
            .set_configuration(&Configuration::Client(ClientConfiguration {
                ssid: wifi_ssid,
                password: wifi_pass,
                auth_method: auth,
                ..Default::default()
            }))?;
        Ok(())
    }
}

impl Radio for EspRadio {
    type Client = EspHttp;

    fn reset(&mut self) {
        if let Err(e) = self.wifi.disconnect() {
            info!("WiFi disconnect during reset: {}", e);
        }
        if let Err(e) = self.wifi.stop() {
            warn!("WiFi stop during reset failed: {}", e);
        }
        log_wifi_diag("reset");
    }

    fn is_connected(&self) -> bool {
        self.wifi.is_connected().unwrap_or(false) && self.wifi.is_up().unwrap_or(false)
    }

    fn connect(&mut self, ssid: &str, password: &str) -> Result<()> {
        let t0 = unsafe { esp_idf_sys::esp_timer_get_time() };
        self.configure(ssid, password)?;
        if !self.wifi.is_started()? {
            self.wifi.start()?;
        }
        let result = self.wifi.connect().and_then(|_| self.wifi.wait_netif_up());
        let elapsed_ms = (unsafe { esp_idf_sys::esp_timer_get_time() } - t0) / 1000;
        match result {
            Ok(()) => {
                let ip_info = self.wifi.wifi().sta_netif().get_ip_info()?;
                info!("WiFi connected in {}ms, IP: {}", elapsed_ms, ip_info.ip);
                log_wifi_diag("connect OK");
                Ok(())
            }
            Err(e) => {
                log_wifi_diag("connect FAIL");
                if let Err(de) = self.wifi.disconnect() {
                    info!("WiFi disconnect after failed connect: {}", de);
                }
                Err(anyhow!("association failed after {}ms: {}", elapsed_ms, e))
            }
        }
    }

    fn open_client(&mut self) -> Result<EspHttp> {
        EspHttp::new()
    }
}
