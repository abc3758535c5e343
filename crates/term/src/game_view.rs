//! GameView: maps a [`GameState`] into a terminal framebuffer.
//!
//! Pure, no I/O. Balls are drawn two columns wide to compensate for the
//! terminal glyph aspect ratio.

use crate::fb::{Cell, CellStyle, FrameBuffer, Rgb};
use crate::flash::FlashPhase;
use crate::types::{CellPos, GameState, Piece, COLOR_COUNT};

/// Terminal viewport dimensions.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Viewport {
    pub width: u16,
    pub height: u16,
}

impl Viewport {
    pub fn new(width: u16, height: u16) -> Self {
        Self { width, height }
    }
}

/// Everything drawn besides the game state itself.
#[derive(Debug, Clone, Copy, Default)]
pub struct HudView<'a> {
    pub flash: Option<FlashPhase>,
    pub paused: bool,
    pub offline: bool,
    pub message: Option<&'a str>,
}

const PLAY_BG: Rgb = Rgb::new(20, 20, 28);
const BALL: char = '●';

/// Colors for indices `1..=6`.
const BALL_COLORS: [Rgb; COLOR_COUNT as usize] = [
    Rgb::new(255, 65, 54),
    Rgb::new(46, 204, 64),
    Rgb::new(0, 116, 217),
    Rgb::new(255, 220, 0),
    Rgb::new(177, 13, 201),
    Rgb::new(255, 133, 27),
];

pub fn ball_color(index: u8) -> Option<Rgb> {
    BALL_COLORS.get(usize::from(index).checked_sub(1)?).copied()
}

pub struct GameView {
    /// Board cell width in terminal columns.
    cell_w: u16,
}

impl Default for GameView {
    fn default() -> Self {
        Self { cell_w: 2 }
    }
}

impl GameView {
    pub fn new(cell_w: u16) -> Self {
        Self {
            cell_w: cell_w.max(1),
        }
    }

    /// Render into an existing framebuffer, resizing it to the viewport.
    pub fn render_into(
        &self,
        state: &GameState,
        hud: &HudView<'_>,
        viewport: Viewport,
        fb: &mut FrameBuffer,
    ) {
        fb.resize(viewport.width, viewport.height);
        fb.clear(Cell::default());

        let cols = state.board.width() as u16;
        let rows = state.board.height() as u16;
        let frame_w = cols * self.cell_w + 2;
        let frame_h = rows + 2;
        // One row below the frame is kept for the status line.
        let origin_x = viewport.width.saturating_sub(frame_w) / 2;
        let origin_y = viewport.height.saturating_sub(frame_h + 1) / 2;

        let border = CellStyle::fg(Rgb::new(200, 200, 200), Rgb::new(0, 0, 0));
        fb.fill_rect(
            origin_x + 1,
            origin_y + 1,
            cols * self.cell_w,
            rows,
            ' ',
            CellStyle::fg(PLAY_BG, PLAY_BG),
        );
        fb.draw_box(origin_x, origin_y, frame_w, frame_h, border);

        for (r, row) in state.board.rows().iter().enumerate() {
            for (c, &color) in row.iter().enumerate() {
                let pos = CellPos::new(r as u8, c as u8);
                let flashing = state.matched_positions.contains(&pos);
                let cell = match (flashing, hud.flash) {
                    (true, Some(FlashPhase::Hidden)) => None,
                    (true, Some(FlashPhase::Highlight)) => ball_style(color, true),
                    _ => ball_style(color, false),
                };
                match cell {
                    Some(style) => self.draw_ball(fb, origin_x, origin_y, c as u16, r as u16, style),
                    None => self.draw_empty(fb, origin_x, origin_y, c as u16, r as u16),
                }
            }
        }

        if let Some(piece) = &state.current_piece {
            self.draw_piece(fb, origin_x, origin_y, cols, rows, piece);
        }

        self.draw_side_panel(fb, state, hud, viewport, origin_x + frame_w + 2, origin_y);

        if hud.paused {
            self.draw_overlay(fb, origin_x, origin_y, frame_w, frame_h, "PAUSED");
        } else if state.game_over {
            self.draw_overlay(fb, origin_x, origin_y, frame_w, frame_h, "GAME OVER");
        }

        if let Some(msg) = hud.message {
            let y = origin_y + frame_h;
            if y < viewport.height {
                let x = viewport
                    .width
                    .saturating_sub(msg.chars().count() as u16)
                    / 2;
                fb.put_str(x, y, msg, CellStyle::default().bold());
            }
        }
    }

    /// Convenience helper that allocates a new framebuffer.
    pub fn render(&self, state: &GameState, hud: &HudView<'_>, viewport: Viewport) -> FrameBuffer {
        let mut fb = FrameBuffer::new(viewport.width, viewport.height);
        self.render_into(state, hud, viewport, &mut fb);
        fb
    }

    fn draw_piece(
        &self,
        fb: &mut FrameBuffer,
        origin_x: u16,
        origin_y: u16,
        cols: u16,
        rows: u16,
        piece: &Piece,
    ) {
        for (x, y, color) in piece.cells() {
            if x < 0 || y < 0 || x as u16 >= cols || y as u16 >= rows {
                continue;
            }
            if let Some(style) = ball_style(color, false) {
                self.draw_ball(fb, origin_x, origin_y, x as u16, y as u16, style.bold());
            }
        }
    }

    fn draw_ball(&self, fb: &mut FrameBuffer, ox: u16, oy: u16, col: u16, row: u16, style: CellStyle) {
        let x = ox + 1 + col * self.cell_w;
        fb.put_char(x, oy + 1 + row, BALL, style);
        fb.fill_rect(x + 1, oy + 1 + row, self.cell_w - 1, 1, ' ', style);
    }

    fn draw_empty(&self, fb: &mut FrameBuffer, ox: u16, oy: u16, col: u16, row: u16) {
        let style = CellStyle::fg(Rgb::new(70, 70, 80), PLAY_BG).dim();
        let x = ox + 1 + col * self.cell_w;
        fb.put_char(x, oy + 1 + row, '·', style);
    }

    fn draw_side_panel(
        &self,
        fb: &mut FrameBuffer,
        state: &GameState,
        hud: &HudView<'_>,
        viewport: Viewport,
        panel_x: u16,
        top: u16,
    ) {
        if panel_x.saturating_add(12) > viewport.width {
            return;
        }
        let label = CellStyle::default().bold();
        let value = CellStyle::fg(Rgb::new(200, 200, 200), Rgb::new(0, 0, 0));

        let mut y = top;
        fb.put_str(panel_x, y, "SCORE", label);
        fb.put_str(panel_x, y + 1, &state.score.to_string(), value);
        y += 3;

        fb.put_str(panel_x, y, "LEVEL", label);
        fb.put_str(panel_x, y + 1, &state.level.to_string(), value);
        y += 3;

        fb.put_str(panel_x, y, "NEXT", label);
        let mut x = panel_x;
        for &color in &state.next_piece_colors {
            if let Some(style) = ball_style(color, false) {
                fb.put_char(x, y + 1, BALL, style);
            }
            x += self.cell_w;
        }
        y += 3;

        if hud.offline {
            let warn = CellStyle::fg(Rgb::new(255, 180, 0), Rgb::new(0, 0, 0)).bold();
            fb.put_str(panel_x, y, "OFFLINE", warn);
        }
    }

    fn draw_overlay(&self, fb: &mut FrameBuffer, x: u16, y: u16, w: u16, h: u16, text: &str) {
        let text_w = text.chars().count() as u16;
        let style = CellStyle::fg(Rgb::new(255, 255, 255), Rgb::new(0, 0, 0)).bold();
        fb.put_str(x + w.saturating_sub(text_w) / 2, y + h / 2, text, style);
    }
}

fn ball_style(color: u8, highlighted: bool) -> Option<CellStyle> {
    let fg = ball_color(color)?;
    let style = CellStyle::fg(fg, PLAY_BG);
    Some(if highlighted {
        CellStyle {
            fg: fg.lighten(140),
            ..style.bold()
        }
    } else {
        style
    })
}
