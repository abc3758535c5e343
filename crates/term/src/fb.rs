//! Framebuffer and style types for terminal rendering.
//!
//! Cells are stored row-major so a row is one contiguous slice; drawing
//! helpers clip against the buffer instead of failing.

use std::ops::Range;

/// 24-bit RGB color.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Rgb {
    pub r: u8,
    pub g: u8,
    pub b: u8,
}

impl Rgb {
    pub const fn new(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b }
    }

    /// Mix towards white by `amount / 255`.
    pub const fn lighten(self, amount: u8) -> Self {
        const fn up(c: u8, amount: u8) -> u8 {
            let c = c as u16;
            (c + (255 - c) * amount as u16 / 255) as u8
        }
        Self::new(up(self.r, amount), up(self.g, amount), up(self.b, amount))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CellStyle {
    pub fg: Rgb,
    pub bg: Rgb,
    pub bold: bool,
    pub dim: bool,
}

impl CellStyle {
    pub const fn fg(fg: Rgb, bg: Rgb) -> Self {
        Self {
            fg,
            bg,
            bold: false,
            dim: false,
        }
    }

    pub const fn bold(self) -> Self {
        Self { bold: true, ..self }
    }

    pub const fn dim(self) -> Self {
        Self { dim: true, ..self }
    }
}

impl Default for CellStyle {
    fn default() -> Self {
        Self::fg(Rgb::new(220, 220, 220), Rgb::new(0, 0, 0))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Cell {
    pub ch: char,
    pub style: CellStyle,
}

impl Cell {
    pub const fn new(ch: char, style: CellStyle) -> Self {
        Self { ch, style }
    }
}

impl Default for Cell {
    fn default() -> Self {
        Self::new(' ', CellStyle::default())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FrameBuffer {
    width: u16,
    height: u16,
    cells: Vec<Cell>,
}

impl FrameBuffer {
    pub fn new(width: u16, height: u16) -> Self {
        Self {
            width,
            height,
            cells: vec![Cell::default(); usize::from(width) * usize::from(height)],
        }
    }

    pub fn width(&self) -> u16 {
        self.width
    }

    pub fn height(&self) -> u16 {
        self.height
    }

    pub fn same_size(&self, other: &FrameBuffer) -> bool {
        (self.width, self.height) == (other.width, other.height)
    }

    /// Resize in place, keeping the allocation when it is large enough.
    /// Contents are unspecified afterwards; callers clear before drawing.
    pub fn resize(&mut self, width: u16, height: u16) {
        self.width = width;
        self.height = height;
        self.cells
            .resize(usize::from(width) * usize::from(height), Cell::default());
    }

    /// Row `y`, or an empty slice past the bottom edge.
    pub fn row(&self, y: u16) -> &[Cell] {
        self.span(y, 0..self.width)
            .map_or(&[][..], |range| &self.cells[range])
    }

    pub fn get(&self, x: u16, y: u16) -> Option<Cell> {
        self.row(y).get(usize::from(x)).copied()
    }

    pub fn set(&mut self, x: u16, y: u16, cell: Cell) {
        if let Some(range) = self.span(y, x..x.saturating_add(1)) {
            self.cells[range].fill(cell);
        }
    }

    pub fn clear(&mut self, cell: Cell) {
        self.cells.fill(cell);
    }

    pub fn put_char(&mut self, x: u16, y: u16, ch: char, style: CellStyle) {
        self.set(x, y, Cell::new(ch, style));
    }

    /// Write `s` left to right, clipped at the right edge. Returns the column
    /// after the last character written.
    pub fn put_str(&mut self, x: u16, y: u16, s: &str, style: CellStyle) -> u16 {
        let Some(range) = self.span(y, x..self.width) else {
            return x;
        };
        let mut written = 0u16;
        for (slot, ch) in self.cells[range].iter_mut().zip(s.chars()) {
            *slot = Cell::new(ch, style);
            written += 1;
        }
        x + written
    }

    pub fn fill_rect(&mut self, x: u16, y: u16, w: u16, h: u16, ch: char, style: CellStyle) {
        let cell = Cell::new(ch, style);
        for row in y..y.saturating_add(h) {
            if let Some(range) = self.span(row, x..x.saturating_add(w)) {
                self.cells[range].fill(cell);
            }
        }
    }

    /// Single-line box outline.
    pub fn draw_box(&mut self, x: u16, y: u16, w: u16, h: u16, style: CellStyle) {
        if w < 2 || h < 2 {
            return;
        }
        let right = x.saturating_add(w - 1);
        let bottom = y.saturating_add(h - 1);
        let (inner_x, inner_y) = (x.saturating_add(1), y.saturating_add(1));
        self.fill_rect(inner_x, y, w - 2, 1, '─', style);
        self.fill_rect(inner_x, bottom, w - 2, 1, '─', style);
        self.fill_rect(x, inner_y, 1, h - 2, '│', style);
        self.fill_rect(right, inner_y, 1, h - 2, '│', style);
        self.put_char(x, y, '┌', style);
        self.put_char(right, y, '┐', style);
        self.put_char(x, bottom, '└', style);
        self.put_char(right, bottom, '┘', style);
    }

    /// Text content of row `y`, for tests and debugging.
    pub fn row_text(&self, y: u16) -> String {
        self.row(y).iter().map(|c| c.ch).collect()
    }

    /// Index range of columns `cols` on row `y`, clipped to the buffer.
    fn span(&self, y: u16, cols: Range<u16>) -> Option<Range<usize>> {
        if y >= self.height {
            return None;
        }
        let end = cols.end.min(self.width);
        if cols.start >= end {
            return None;
        }
        let base = usize::from(y) * usize::from(self.width);
        Some(base + usize::from(cols.start)..base + usize::from(end))
    }
}
