use anyhow::Result;
use log::info;

use cta_bus_board::app::App;
use cta_bus_board::config::Config;

#[cfg(target_os = "espidf")]
fn main() -> Result<()> {
    use cta_bus_board::config;
    use cta_bus_board::panel::{self, PanelPins};
    use cta_bus_board::platform::{nvs_get_str, EspBoard};
    use cta_bus_board::views::board::BoardScreen;
    use cta_bus_board::wifi::EspRadio;
    use esp_idf_hal::gpio::OutputPin;
    use esp_idf_hal::peripherals::Peripherals;
    use esp_idf_svc::eventloop::EspSystemEventLoop;
    use esp_idf_svc::nvs::{EspDefaultNvsPartition, EspNvs};

    esp_idf_sys::link_patches();
    esp_idf_svc::log::EspLogger::initialize_default();

    info!("BOOT cta_bus_board v{}", env!("CARGO_PKG_VERSION"));

    let peripherals = Peripherals::take()?;
    let sysloop = EspSystemEventLoop::take()?;
    let nvs_partition = EspDefaultNvsPartition::take()?;

    let cfg = {
        let nvs = EspNvs::new(nvs_partition.clone(), config::NS, true)?;
        Config::load("NVS", |key| nvs_get_str(&nvs, key))
    };

    let pins = peripherals.pins;
    let panel = panel::init_panel(PanelPins {
        spi: peripherals.spi2,
        sclk: pins.gpio12.downgrade_output(),
        mosi: pins.gpio11.downgrade_output(),
        cs: pins.gpio10.downgrade_output(),
        dc: pins.gpio9.downgrade_output(),
        rst: pins.gpio8.downgrade_output(),
    })?;
    let screen = BoardScreen::new(panel);
    panel::enable_backlight();

    let radio = EspRadio::new(peripherals.modem, sysloop, Some(nvs_partition))?;
    App::new(cfg, radio, EspBoard, screen).run()
}

#[cfg(not(target_os = "espidf"))]
fn init_tracing() -> Result<()> {
    use anyhow::anyhow;
    use tracing_subscriber::{fmt, EnvFilter};

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    fmt().with_env_filter(filter).try_init().map_err(|err| anyhow!(err))
}

#[cfg(not(target_os = "espidf"))]
fn main() -> Result<()> {
    use cta_bus_board::desktop::{env_lookup, DesktopBoard, DesktopRadio};
    use cta_bus_board::views::console::ConsoleScreen;

    init_tracing()?;
    info!("BOOT cta_bus_board v{} (host)", env!("CARGO_PKG_VERSION"));

    let cfg = Config::load("env", env_lookup);
    let screen = ConsoleScreen::new(std::io::stdout());
    App::new(cfg, DesktopRadio::default(), DesktopBoard::new(), screen).run()
}
