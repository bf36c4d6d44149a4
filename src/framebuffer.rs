use embedded_graphics::{
    draw_target::DrawTarget,
    geometry::{Dimensions, OriginDimensions, Size},
    pixelcolor::{raw::RawU16, Rgb565},
    prelude::*,
    primitives::Rectangle,
    Pixel,
};

/// RGB565 frame kept in RAM. Drawing happens here; only changed areas are
/// pushed to the panel, so a redraw never flickers.
pub struct Framebuffer {
    buf: Vec<u16>,
    width: u32,
    height: u32,
}

impl Framebuffer {
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            buf: vec![0; (width * height) as usize],
            width,
            height,
        }
    }

    pub fn clear_color(&mut self, color: Rgb565) {
        let raw = RawU16::from(color).into_inner();
        self.buf.fill(raw);
    }

    pub fn pixel(&self, x: u32, y: u32) -> Option<Rgb565> {
        if x >= self.width || y >= self.height {
            return None;
        }
        let raw = self.buf[(y * self.width + x) as usize];
        Some(Rgb565::from(RawU16::new(raw)))
    }

    /// Copy `area` (clipped to the frame) onto `target` at the same
    /// position.
    pub fn flush_area<D>(&self, target: &mut D, area: &Rectangle) -> Result<(), D::Error>
    where
        D: DrawTarget<Color = Rgb565>,
    {
        let area = area.intersection(&self.bounding_box());
        if area.is_zero_sized() {
            return Ok(());
        }
        let w = self.width;
        let colors = area.points().map(|p| {
            let raw = self.buf[(p.y as u32 * w + p.x as u32) as usize];
            Rgb565::from(RawU16::new(raw))
        });
        target.fill_contiguous(&area, colors)
    }
}

impl OriginDimensions for Framebuffer {
    fn size(&self) -> Size {
        Size::new(self.width, self.height)
    }
}

impl DrawTarget for Framebuffer {
    type Color = Rgb565;
    type Error = core::convert::Infallible;

    fn draw_iter<I>(&mut self, pixels: I) -> Result<(), Self::Error>
    where
        I: IntoIterator<Item = Pixel<Self::Color>>,
    {
        let w = self.width;
        let h = self.height;
        for Pixel(point, color) in pixels {
            let x = point.x;
            let y = point.y;
            if x >= 0 && y >= 0 && (x as u32) < w && (y as u32) < h {
                let idx = (y as u32 * w + x as u32) as usize;
                self.buf[idx] = RawU16::from(color).into_inner();
            }
        }
        Ok(())
    }

    fn fill_solid(&mut self, area: &Rectangle, color: Self::Color) -> Result<(), Self::Error> {
        let raw = RawU16::from(color).into_inner();
        let area = area.intersection(&self.bounding_box());
        let w = self.width;
        for y in area.rows() {
            let row_start = (y as u32 * w) as usize;
            for x in area.columns() {
                self.buf[row_start + x as usize] = raw;
            }
        }
        Ok(())
    }
}
