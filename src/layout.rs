use embedded_graphics::pixelcolor::Rgb565;
use embedded_graphics::prelude::*;
use embedded_graphics::primitives::{PrimitiveStyleBuilder, Rectangle};

/// Convert 8-bit RGB to Rgb565.
pub const fn rgb(r: u8, g: u8, b: u8) -> Rgb565 {
    Rgb565::new(r >> 3, g >> 2, b >> 3)
}

// ── Colors ──────────────────────────────────────────────────────────

pub const BG: Rgb565 = rgb(27, 31, 39);
pub const LINE_COLOR: Rgb565 = rgb(56, 63, 76);
pub const TEXT_TITLE: Rgb565 = rgb(222, 225, 230);
pub const TEXT_STATUS: Rgb565 = rgb(182, 187, 196);
pub const TEXT_ROW: Rgb565 = rgb(232, 235, 240);
/// Rows for buses that are due now.
pub const TEXT_DUE: Rgb565 = rgb(166, 208, 255);

// ── Geometry (landscape 320x240 panel) ──────────────────────────────

pub const SCREEN_W: i32 = 320;
pub const SCREEN_H: i32 = 240;
pub const MARGIN_X: i32 = 8;

pub const TITLE_TOP: i32 = 0;
pub const TITLE_H: i32 = 28;
pub const TITLE_BASELINE: i32 = 20;

pub const STATUS_TOP: i32 = TITLE_TOP + TITLE_H;
pub const STATUS_H: i32 = 24;
pub const STATUS_BASELINE: i32 = STATUS_TOP + 18;

pub const HEADER_LINE_Y: i32 = STATUS_TOP + STATUS_H + 2;

pub const ROWS_TOP: i32 = HEADER_LINE_Y + 4;
pub const ROW_STRIDE_MAX: i32 = 34;
/// Distance from a row band's top to its text baseline.
pub const ROW_BASELINE: i32 = 20;

pub fn title_band() -> Rectangle {
    Rectangle::new(Point::new(0, TITLE_TOP), Size::new(SCREEN_W as u32, TITLE_H as u32))
}

pub fn status_band() -> Rectangle {
    Rectangle::new(Point::new(0, STATUS_TOP), Size::new(SCREEN_W as u32, STATUS_H as u32))
}

pub fn rows_band() -> Rectangle {
    Rectangle::new(
        Point::new(0, ROWS_TOP),
        Size::new(SCREEN_W as u32, (SCREEN_H - ROWS_TOP) as u32),
    )
}

/// Vertical distance between arrival rows so `count` rows fit the panel.
pub fn row_stride(count: usize) -> i32 {
    let count = count.max(1) as i32;
    ((SCREEN_H - ROWS_TOP - ROW_BASELINE) / count).min(ROW_STRIDE_MAX)
}

/// Fill a horizontal line across the full screen width.
pub fn draw_hline<D>(target: &mut D, y: i32, color: Rgb565)
where
    D: DrawTarget<Color = Rgb565>,
{
    let style = PrimitiveStyleBuilder::new().fill_color(color).build();
    Rectangle::new(Point::new(0, y), Size::new(target.bounding_box().size.width, 1))
        .into_styled(style)
        .draw(target)
        .ok();
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bands_do_not_overlap() {
        assert!(title_band().bottom_right().unwrap().y < status_band().top_left.y);
        assert!(status_band().bottom_right().unwrap().y < HEADER_LINE_Y);
        assert!(HEADER_LINE_Y < rows_band().top_left.y);
    }

    #[test]
    fn rows_fit_on_panel() {
        for count in 1..=10 {
            let last_baseline = ROWS_TOP + (count as i32 - 1) * row_stride(count) + ROW_BASELINE;
            assert!(last_baseline < SCREEN_H, "{} rows overflow", count);
        }
    }
}
