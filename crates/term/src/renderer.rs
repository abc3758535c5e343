//! TerminalRenderer: flushes a framebuffer to the real terminal.
//!
//! A frame is diffed against the previous one when both have the same size;
//! otherwise (first frame, resize, `invalidate`) the screen is cleared and
//! redrawn. Escape output is kept small: the cursor is only moved when a run
//! is not contiguous with the last printed cell, and style changes emit only
//! the attributes that differ.

use std::io::{self, Write};

use anyhow::Result;
use crossterm::{
    cursor,
    event::{KeyboardEnhancementFlags, PopKeyboardEnhancementFlags, PushKeyboardEnhancementFlags},
    style::{
        Attribute, Color, Print, ResetColor, SetAttribute, SetBackgroundColor, SetForegroundColor,
    },
    terminal, QueueableCommand,
};

use crate::fb::{Cell, CellStyle, FrameBuffer, Rgb};

const TITLE: &str = "Colour Balls";

pub struct TerminalRenderer {
    stdout: io::Stdout,
    last: Option<FrameBuffer>,
    out: Vec<u8>,
    /// Keyboard enhancement was pushed and must be popped on exit.
    enhanced: bool,
}

impl Default for TerminalRenderer {
    fn default() -> Self {
        Self::new()
    }
}

impl TerminalRenderer {
    pub fn new() -> Self {
        Self {
            stdout: io::stdout(),
            last: None,
            out: Vec::with_capacity(16 * 1024),
            enhanced: false,
        }
    }

    pub fn enter(&mut self) -> Result<()> {
        terminal::enable_raw_mode()?;
        self.last = None;
        self.out.clear();
        self.out
            .queue(terminal::EnterAlternateScreen)?
            .queue(terminal::SetTitle(TITLE))?
            .queue(terminal::DisableLineWrap)?
            .queue(cursor::Hide)?;
        // Modified Esc (the emergency key) is only distinguishable with
        // disambiguated escape codes.
        self.enhanced = terminal::supports_keyboard_enhancement().unwrap_or(false);
        if self.enhanced {
            self.out.queue(PushKeyboardEnhancementFlags(
                KeyboardEnhancementFlags::DISAMBIGUATE_ESCAPE_CODES,
            ))?;
        }
        self.write_out()
    }

    /// Restore the terminal. Safe to call after a failed `enter`.
    pub fn exit(&mut self) -> Result<()> {
        self.out.clear();
        if std::mem::take(&mut self.enhanced) {
            self.out.queue(PopKeyboardEnhancementFlags)?;
        }
        self.out
            .queue(SetAttribute(Attribute::Reset))?
            .queue(ResetColor)?
            .queue(cursor::Show)?
            .queue(terminal::EnableLineWrap)?
            .queue(terminal::LeaveAlternateScreen)?;
        self.write_out()?;
        terminal::disable_raw_mode()?;
        Ok(())
    }

    /// Next draw repaints everything.
    pub fn invalidate(&mut self) {
        self.last = None;
    }

    /// Draw `fb`. On return `fb` holds the frame before it (or a blank buffer
    /// of the same size) so the caller can render into it again.
    pub fn draw_swap(&mut self, fb: &mut FrameBuffer) -> Result<()> {
        self.out.clear();
        let mut spare = match self.last.take() {
            Some(prev) if prev.same_size(fb) => {
                encode_diff_into(&prev, fb, &mut self.out)?;
                prev
            }
            stale => {
                encode_full_into(fb, &mut self.out)?;
                let mut spare = stale.unwrap_or_else(|| FrameBuffer::new(0, 0));
                spare.resize(fb.width(), fb.height());
                spare
            }
        };
        if !self.out.is_empty() {
            self.write_out()?;
        }
        std::mem::swap(&mut spare, fb);
        self.last = Some(spare);
        Ok(())
    }

    fn write_out(&mut self) -> Result<()> {
        self.stdout.write_all(&self.out)?;
        self.stdout.flush()?;
        Ok(())
    }
}

/// Clear the screen and paint every cell of `fb`.
pub fn encode_full_into(fb: &FrameBuffer, out: &mut Vec<u8>) -> Result<()> {
    out.queue(terminal::Clear(terminal::ClearType::All))?;
    let mut pen = Pen::new(out);
    for y in 0..fb.height() {
        for (x, cell) in (0u16..).zip(fb.row(y)) {
            pen.put(x, y, *cell)?;
        }
    }
    pen.finish()?;
    Ok(())
}

/// Paint the cells of `next` that differ from `prev`. Writes nothing when the
/// frames are identical.
pub fn encode_diff_into(prev: &FrameBuffer, next: &FrameBuffer, out: &mut Vec<u8>) -> Result<()> {
    let mut pen = Pen::new(out);
    for (x, y, len) in changed_runs(prev, next) {
        for cx in x..x + len {
            if let Some(cell) = next.get(cx, y) {
                pen.put(cx, y, cell)?;
            }
        }
    }
    pen.finish()?;
    Ok(())
}

/// Tracks what the terminal already has so repeated state is not re-sent.
struct Pen<'a> {
    out: &'a mut Vec<u8>,
    style: Option<CellStyle>,
    cursor: Option<(u16, u16)>,
}

impl<'a> Pen<'a> {
    fn new(out: &'a mut Vec<u8>) -> Self {
        Self {
            out,
            style: None,
            cursor: None,
        }
    }

    fn put(&mut self, x: u16, y: u16, cell: Cell) -> io::Result<()> {
        if self.cursor != Some((x, y)) {
            self.out.queue(cursor::MoveTo(x, y))?;
        }
        self.set_style(cell.style)?;
        self.out.queue(Print(cell.ch))?;
        self.cursor = Some((x.saturating_add(1), y));
        Ok(())
    }

    fn set_style(&mut self, next: CellStyle) -> io::Result<()> {
        // SGR has no per-attribute "off" for bold and dim that leaves the
        // other alone, so dropping either goes through a full reset.
        let keep = self
            .style
            .filter(|prev| (next.bold || !prev.bold) && (next.dim || !prev.dim));
        match keep {
            Some(prev) if prev == next => return Ok(()),
            Some(prev) => {
                if prev.fg != next.fg {
                    self.out.queue(SetForegroundColor(color(next.fg)))?;
                }
                if prev.bg != next.bg {
                    self.out.queue(SetBackgroundColor(color(next.bg)))?;
                }
                if next.bold && !prev.bold {
                    self.out.queue(SetAttribute(Attribute::Bold))?;
                }
                if next.dim && !prev.dim {
                    self.out.queue(SetAttribute(Attribute::Dim))?;
                }
            }
            None => {
                self.out
                    .queue(SetAttribute(Attribute::Reset))?
                    .queue(SetForegroundColor(color(next.fg)))?
                    .queue(SetBackgroundColor(color(next.bg)))?;
                if next.bold {
                    self.out.queue(SetAttribute(Attribute::Bold))?;
                }
                if next.dim {
                    self.out.queue(SetAttribute(Attribute::Dim))?;
                }
            }
        }
        self.style = Some(next);
        Ok(())
    }

    fn finish(self) -> io::Result<()> {
        if self.style.is_some() {
            self.out
                .queue(ResetColor)?
                .queue(SetAttribute(Attribute::Reset))?;
        }
        Ok(())
    }
}

fn color(rgb: Rgb) -> Color {
    Color::Rgb {
        r: rgb.r,
        g: rgb.g,
        b: rgb.b,
    }
}

/// Horizontal runs `(x, y, len)` of differing cells. Frames of different
/// sizes differ everywhere.
fn changed_runs(prev: &FrameBuffer, next: &FrameBuffer) -> Vec<(u16, u16, u16)> {
    if !prev.same_size(next) {
        return (0..next.height()).map(|y| (0, y, next.width())).collect();
    }
    let mut runs = Vec::new();
    for y in 0..next.height() {
        let mut open: Option<u16> = None;
        for (x, (a, b)) in (0u16..).zip(prev.row(y).iter().zip(next.row(y))) {
            match (a != b, open) {
                (true, None) => open = Some(x),
                (false, Some(start)) => {
                    runs.push((start, y, x - start));
                    open = None;
                }
                _ => {}
            }
        }
        if let Some(start) = open {
            runs.push((start, y, next.width() - start));
        }
    }
    runs
}
