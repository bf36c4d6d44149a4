//! Bus arrival board: polls a transit prediction API and keeps a small
//! display current, recovering from network faults on its own.

pub mod app;
pub mod arrivals;
pub mod board;
pub mod config;
pub mod fault;
pub mod fetcher;
pub mod framebuffer;
pub mod layout;
pub mod net;
pub mod prediction;
pub mod session;
pub mod time_sync;
pub mod views;

#[cfg(target_os = "espidf")]
pub mod http_client;
#[cfg(target_os = "espidf")]
pub mod panel;
#[cfg(target_os = "espidf")]
pub mod platform;
#[cfg(target_os = "espidf")]
pub mod wifi;

#[cfg(not(target_os = "espidf"))]
pub mod desktop;

#[cfg(test)]
mod testing;
