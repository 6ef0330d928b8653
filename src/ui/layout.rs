use ratatui::layout::Rect;
use unicode_width::{UnicodeWidthChar, UnicodeWidthStr};

use prompter::session::{DockPosition, Layout};

/// Word-wraps `text` to `width` columns. Blank lines survive; words wider
/// than a line are broken at character boundaries.
pub fn wrap_lines(text: &str, width: usize) -> Vec<String> {
    let width = width.max(1);
    let mut out = Vec::new();

    for raw in text.lines() {
        let mut line = String::new();
        let mut line_width = 0;

        for word in raw.split_whitespace() {
            let word_width = word.width();
            let sep = usize::from(!line.is_empty());

            if line_width + sep + word_width <= width {
                if sep == 1 {
                    line.push(' ');
                }
                line.push_str(word);
                line_width += sep + word_width;
                continue;
            }

            if !line.is_empty() {
                out.push(std::mem::take(&mut line));
                line_width = 0;
            }

            if word_width <= width {
                line.push_str(word);
                line_width = word_width;
            } else {
                for ch in word.chars() {
                    let w = ch.width().unwrap_or(0);
                    if line_width + w > width && !line.is_empty() {
                        out.push(std::mem::take(&mut line));
                        line_width = 0;
                    }
                    line.push(ch);
                    line_width += w;
                }
            }
        }
        out.push(line);
    }
    out
}

/// Columns available for text at `font_size`; larger fonts fit fewer.
pub fn wrap_width(columns: u16, font_size: u16, base_font_size: u16) -> usize {
    let scale = base_font_size.max(1) as f64 / font_size.max(1) as f64;
    ((columns as f64 * scale).floor() as usize).clamp(1, columns.max(1) as usize)
}

/// First wrapped line shown for a scroll position
pub fn scroll_offset(position: f64, total_lines: usize, visible_lines: usize) -> usize {
    let hidden = total_lines.saturating_sub(visible_lines);
    let position = if position.is_finite() {
        position.clamp(0.0, 1.0)
    } else {
        0.0
    };
    ((hidden as f64 * position).round() as usize).min(hidden)
}

/// Row of the reading guide inside a text area of `height` rows
pub fn guide_row(height: u16, guide_position: f64) -> u16 {
    if height == 0 {
        return 0;
    }
    ((height as f64 * guide_position).floor() as u16).min(height - 1)
}

/// Fixed rows of the normal layout
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NormalRegions {
    pub header: Rect,
    /// Bordered box around the text
    pub body: Rect,
    pub gauge: Rect,
    pub stats: Rect,
    pub legend: Rect,
}

pub fn normal_regions(area: Rect) -> NormalRegions {
    let row = |y: u16| Rect {
        x: area.x,
        y: y.min(area.bottom().saturating_sub(1)),
        width: area.width,
        height: u16::from(area.height > 0),
    };
    let body_height = area.height.saturating_sub(4);
    NormalRegions {
        header: row(area.y),
        body: Rect {
            x: area.x,
            y: area.y + 1.min(area.height),
            width: area.width,
            height: body_height,
        },
        gauge: row(area.y + 1 + body_height),
        stats: row(area.y + 2 + body_height),
        legend: row(area.y + 3 + body_height),
    }
}

/// Where the text goes for a layout. Compact mode is a strip docked to
/// one edge; presentation mode uses the whole screen.
pub fn text_area(area: Rect, layout: Layout, compact_lines: u16) -> Rect {
    if layout.presentation {
        return area;
    }
    if layout.compact {
        let strip = compact_strip(area, layout.dock, compact_lines);
        return Rect {
            height: strip.height.saturating_sub(1),
            y: match layout.dock {
                DockPosition::Top => strip.y,
                DockPosition::Bottom => strip.y + 1.min(strip.height),
            },
            ..strip
        };
    }
    let body = normal_regions(area).body;
    Rect {
        x: body.x + 1,
        y: body.y + 1,
        width: body.width.saturating_sub(2),
        height: body.height.saturating_sub(2),
    }
}

/// The whole compact window: text rows plus one status row
pub fn compact_strip(area: Rect, dock: DockPosition, compact_lines: u16) -> Rect {
    let height = compact_lines.saturating_add(1).min(area.height);
    let y = match dock {
        DockPosition::Top => area.y,
        DockPosition::Bottom => area.y + area.height - height,
    };
    Rect {
        x: area.x,
        y,
        width: area.width,
        height,
    }
}
