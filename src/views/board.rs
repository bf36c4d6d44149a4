use embedded_graphics::{
    mono_font::MonoTextStyle,
    pixelcolor::Rgb565,
    prelude::*,
    primitives::Rectangle,
    text::Text,
};
use log::warn;
use profont::{PROFONT_12_POINT, PROFONT_14_POINT};

use crate::framebuffer::Framebuffer;
use crate::layout::*;
use crate::views::Screen;

/// Draws the board into a RAM framebuffer and copies changed bands to the
/// panel on `present`. Unchanged regions are not redrawn.
pub struct BoardScreen<D> {
    fb: Framebuffer,
    panel: D,
    dirty: Vec<Rectangle>,
    title: String,
    status: String,
    rows: Vec<String>,
}

impl<D> BoardScreen<D>
where
    D: DrawTarget<Color = Rgb565>,
    D::Error: core::fmt::Debug,
{
    pub fn new(panel: D) -> Self {
        let mut fb = Framebuffer::new(SCREEN_W as u32, SCREEN_H as u32);
        fb.clear_color(BG);
        draw_hline(&mut fb, HEADER_LINE_Y, LINE_COLOR);
        Self {
            fb,
            panel,
            dirty: vec![Rectangle::new(Point::zero(), Size::new(SCREEN_W as u32, SCREEN_H as u32))],
            title: String::new(),
            status: String::new(),
            rows: Vec::new(),
        }
    }

    pub fn framebuffer(&self) -> &Framebuffer {
        &self.fb
    }

    pub fn panel(&self) -> &D {
        &self.panel
    }

    fn clear_band(&mut self, band: Rectangle) {
        self.fb.fill_solid(&band, BG).ok();
        self.dirty.push(band);
    }
}

fn row_color(row: &str) -> Rgb565 {
    if row.contains(" DUE ") {
        TEXT_DUE
    } else {
        TEXT_ROW
    }
}

impl<D> Screen for BoardScreen<D>
where
    D: DrawTarget<Color = Rgb565>,
    D::Error: core::fmt::Debug,
{
    fn show_title(&mut self, text: &str) {
        if self.title == text {
            return;
        }
        self.title = text.to_string();
        self.clear_band(title_band());
        let style = MonoTextStyle::new(&PROFONT_14_POINT, TEXT_TITLE);
        Text::new(text, Point::new(MARGIN_X, TITLE_BASELINE), style)
            .draw(&mut self.fb)
            .ok();
    }

    fn show_status(&mut self, text: &str) {
        if self.status == text {
            return;
        }
        self.status = text.to_string();
        self.clear_band(status_band());
        let style = MonoTextStyle::new(&PROFONT_12_POINT, TEXT_STATUS);
        Text::new(text, Point::new(MARGIN_X, STATUS_BASELINE), style)
            .draw(&mut self.fb)
            .ok();
    }

    fn show_rows(&mut self, rows: &[String]) {
        if self.rows == rows {
            return;
        }
        self.rows = rows.to_vec();
        self.clear_band(rows_band());
        let stride = row_stride(rows.len());
        for (i, row) in rows.iter().enumerate() {
            let y = ROWS_TOP + i as i32 * stride + ROW_BASELINE;
            let style = MonoTextStyle::new(&PROFONT_12_POINT, row_color(row));
            Text::new(row, Point::new(MARGIN_X, y), style)
                .draw(&mut self.fb)
                .ok();
        }
    }

    fn present(&mut self) {
        for area in self.dirty.drain(..) {
            if let Err(e) = self.fb.flush_area(&mut self.panel, &area) {
                warn!("panel flush failed: {:?}", e);
                break;
            }
        }
    }
}
