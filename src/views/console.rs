use log::warn;
use std::io::Write;

use crate::views::Screen;

/// Text-terminal stand-in for the panel, used by the desktop simulator.
/// A full frame is printed when the title or rows change; otherwise only the
/// status line.
pub struct ConsoleScreen<W: Write> {
    out: W,
    title: String,
    status: String,
    rows: Vec<String>,
    frame_dirty: bool,
    status_dirty: bool,
}

impl<W: Write> ConsoleScreen<W> {
    pub fn new(out: W) -> Self {
        Self {
            out,
            title: String::new(),
            status: String::new(),
            rows: Vec::new(),
            frame_dirty: false,
            status_dirty: false,
        }
    }

    pub fn into_inner(self) -> W {
        self.out
    }

    fn write_frame(&mut self) -> std::io::Result<()> {
        let width = self
            .rows
            .iter()
            .map(|r| r.chars().count())
            .chain([self.title.chars().count(), self.status.chars().count()])
            .max()
            .unwrap_or(0);
        let rule = "-".repeat(width + 4);
        writeln!(self.out, "{}", rule)?;
        writeln!(self.out, "| {:<w$} |", self.title, w = width)?;
        writeln!(self.out, "| {:<w$} |", self.status, w = width)?;
        writeln!(self.out, "{}", rule)?;
        for row in &self.rows {
            writeln!(self.out, "| {:<w$} |", row, w = width)?;
        }
        writeln!(self.out, "{}", rule)?;
        self.out.flush()
    }
}

impl<W: Write> Screen for ConsoleScreen<W> {
    fn show_title(&mut self, text: &str) {
        if self.title != text {
            self.title = text.to_string();
            self.frame_dirty = true;
        }
    }

    fn show_status(&mut self, text: &str) {
        if self.status != text {
            self.status = text.to_string();
            self.status_dirty = true;
        }
    }

    fn show_rows(&mut self, rows: &[String]) {
        if self.rows != rows {
            self.rows = rows.to_vec();
            self.frame_dirty = true;
        }
    }

    fn present(&mut self) {
        let result = if self.frame_dirty {
            self.write_frame()
        } else if self.status_dirty {
            writeln!(self.out, "  {}", self.status).and_then(|_| self.out.flush())
        } else {
            Ok(())
        };
        if let Err(e) = result {
            warn!("console screen write failed: {}", e);
        }
        self.frame_dirty = false;
        self.status_dirty = false;
    }
}
