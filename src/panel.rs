//! ST7789 320x240 SPI panel.

use anyhow::{anyhow, Result};
use esp_idf_hal::delay::Ets;
use esp_idf_hal::gpio::{AnyIOPin, AnyOutputPin, Output, PinDriver};
use esp_idf_hal::spi::{config::Config as SpiConfig, SpiDeviceDriver, SpiDriver, SpiDriverConfig, SPI2};
use esp_idf_hal::units::Hertz;
use log::info;
use mipidsi::interface::SpiInterface;
use mipidsi::models::ST7789;
use mipidsi::options::{ColorInversion, Orientation, Rotation};
use mipidsi::Builder;

use crate::layout::{SCREEN_H, SCREEN_W};

/// Backlight GPIO, driven directly through the IDF GPIO API.
pub const PIN_LCD_BL: i32 = 7;
const SPI_CLOCK_HZ: u32 = 40_000_000;

type OutPin = PinDriver<'static, AnyOutputPin, Output>;

pub type Panel = mipidsi::Display<
    SpiInterface<'static, SpiDeviceDriver<'static, SpiDriver<'static>>, OutPin>,
    ST7789,
    OutPin,
>;

pub struct PanelPins {
    pub spi: SPI2,
    pub sclk: AnyOutputPin,
    pub mosi: AnyOutputPin,
    pub cs: AnyOutputPin,
    pub dc: AnyOutputPin,
    pub rst: AnyOutputPin,
}

pub fn init_panel(pins: PanelPins) -> Result<Panel> {
    let spi = SpiDeviceDriver::new_single(
        pins.spi,
        pins.sclk,
        pins.mosi,
        Option::<AnyIOPin>::None,
        Some(pins.cs),
        &SpiDriverConfig::new(),
        &SpiConfig::new().baudrate(Hertz(SPI_CLOCK_HZ)),
    )?;
    let dc = PinDriver::output(pins.dc)?;
    let rst = PinDriver::output(pins.rst)?;

    // Lives as long as the panel, which is the whole program.
    let buffer: &'static mut [u8] = Box::leak(Box::new([0u8; 1024]));
    let di = SpiInterface::new(spi, dc, buffer);

    let panel = Builder::new(ST7789, di)
        .display_size(SCREEN_H as u16, SCREEN_W as u16)
        .orientation(Orientation::new().rotate(Rotation::Deg90))
        .invert_colors(ColorInversion::Inverted)
        .reset_pin(rst)
        .init(&mut Ets)
        .map_err(|e| anyhow!("ST7789 init failed: {:?}", e))?;
    info!("Panel ready ({}x{})", SCREEN_W, SCREEN_H);
    Ok(panel)
}

pub fn enable_backlight() {
    unsafe {
        let io_conf = esp_idf_sys::gpio_config_t {
            pin_bit_mask: 1u64 << (PIN_LCD_BL as u64),
            mode: esp_idf_sys::gpio_mode_t_GPIO_MODE_OUTPUT,
            pull_up_en: esp_idf_sys::gpio_pullup_t_GPIO_PULLUP_DISABLE,
            pull_down_en: esp_idf_sys::gpio_pulldown_t_GPIO_PULLDOWN_DISABLE,
            intr_type: esp_idf_sys::gpio_int_type_t_GPIO_INTR_DISABLE,
        };
        esp_idf_sys::gpio_config(&io_conf);
        esp_idf_sys::gpio_set_level(PIN_LCD_BL, 1);
    }
    info!("Backlight ON");
}
