//! ESP-IDF implementation of the board services, plus NVS-backed config
//! lookup.

use anyhow::{bail, Result};
use esp_idf_hal::delay::FreeRtos;
use esp_idf_svc::nvs::{EspNvs, NvsDefault};
use log::{error, info};
use std::time::Duration;

use crate::board::Board;
use crate::fault::RestartReason;

pub struct EspBoard;

impl Board for EspBoard {
    fn monotonic(&self) -> Duration {
        let us = unsafe { esp_idf_sys::esp_timer_get_time() };
        Duration::from_micros(us.max(0) as u64)
    }

    fn sleep(&mut self, duration: Duration) {
        FreeRtos::delay_ms(duration.as_millis().min(u32::MAX as u128) as u32);
    }

    /// No TZ is configured, so the system clock holds local time directly.
    fn set_local_time(&mut self, epoch: i64) -> Result<()> {
        let tv = libc::timeval {
            tv_sec: epoch as libc::time_t,
            tv_usec: 0,
        };
        let rc = unsafe { libc::settimeofday(&tv, core::ptr::null()) };
        if rc != 0 {
            bail!("settimeofday failed: {}", rc);
        }
        Ok(())
    }

    fn local_time(&self) -> i64 {
        unsafe { libc::time(core::ptr::null_mut()) as i64 }
    }

    fn reclaim_memory(&mut self) {
        let heap_kb = unsafe { esp_idf_sys::esp_get_free_heap_size() } / 1024;
        let min_kb = unsafe { esp_idf_sys::esp_get_minimum_free_heap_size() } / 1024;
        info!("Heap: {} KB free (low water {} KB)", heap_kb, min_kb);
    }

    #[allow(unreachable_code)]
    fn restart(&mut self, reason: RestartReason) -> ! {
        error!("Restarting device: {}", reason);
        FreeRtos::delay_ms(100);
        unsafe { esp_idf_sys::esp_restart() };
        loop {
            FreeRtos::delay_ms(1000);
        }
    }
}

/// Read a string key, treating missing and empty values alike.
pub fn nvs_get_str(nvs: &EspNvs<NvsDefault>, key: &str) -> Option<String> {
    let len = match nvs.str_len(key) {
        Ok(Some(len)) => len,
        _ => return None,
    };

    let mut buf = vec![0u8; len];
    match nvs.get_str(key, &mut buf) {
        Ok(Some(val)) => {
            let s = val.trim_end_matches('\0').to_string();
            if s.is_empty() {
                None
            } else {
                Some(s)
            }
        }
        _ => None,
    }
}
