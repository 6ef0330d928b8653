pub mod layout;
pub mod screen;

use ratatui::{
    buffer::Buffer,
    layout::{Alignment, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Clear, Gauge, Paragraph, Widget},
    Frame,
};

use prompter::{
    countdown::{format_mm_ss, CountdownState},
    session::RecordingStatus,
    stats::StatsSnapshot,
};

use crate::{
    ui::layout::{compact_strip, guide_row, normal_regions, scroll_offset, text_area},
    App,
};

const LEGEND: &str =
    "space start/pause  ↑↓ PgUp PgDn speed  +/- font  r record  t timer  c cancel  m mini  d dock  f full  q quit";

pub fn draw(app: &App, f: &mut Frame) {
    screen::current_screen(app.controller.layout()).render(app, f);
}

/// Visible slice of the script, guide row highlighted
fn render_script(app: &App, area: Rect, buf: &mut Buffer) {
    if area.width == 0 || area.height == 0 {
        return;
    }
    let ctl = &app.controller;
    let lines = app.lines();
    let visible = area.height as usize;
    let offset = scroll_offset(ctl.position(), lines.len(), visible);
    let guide = guide_row(area.height, ctl.config().guide_position) as usize;

    let text_style = Style::default().add_modifier(Modifier::DIM);
    let guide_style = Style::default()
        .fg(Color::Yellow)
        .add_modifier(Modifier::BOLD);

    let rows: Vec<Line> = lines
        .iter()
        .skip(offset)
        .take(visible)
        .enumerate()
        .map(|(row, text)| {
            let style = if row == guide { guide_style } else { text_style };
            Line::from(Span::styled(text.as_str(), style))
        })
        .collect();

    // larger fonts wrap narrower; keep that column centred
    let width = app.wrap_width().min(area.width as usize) as u16;
    let column = Rect {
        x: area.x + (area.width - width) / 2,
        width,
        ..area
    };
    Paragraph::new(rows).render(column, buf);

    if column.x > area.x {
        if let Some(cell) = buf.cell_mut((column.x - 1, area.y + guide as u16)) {
            cell.set_symbol("›");
            cell.set_style(guide_style);
        }
    }
}

pub fn render_normal(app: &App, area: Rect, buf: &mut Buffer) {
    let ctl = &app.controller;
    let regions = normal_regions(area);
    let bold = Style::default().add_modifier(Modifier::BOLD);

    let state = if ctl.is_scrolling() {
        Span::styled("▶ SCROLLING", bold.fg(Color::Green))
    } else {
        Span::styled("❚❚ PAUSED", bold.fg(Color::Yellow))
    };
    let header = Line::from(vec![
        Span::styled(format!(" {} ", app.title), bold),
        state,
        Span::raw(format!(
            "   speed {}   font {}pt   dock {}",
            ctl.speed(),
            ctl.font_size(),
            ctl.layout().dock
        )),
    ]);
    Paragraph::new(header).render(regions.header, buf);

    Block::default()
        .borders(Borders::ALL)
        .border_style(Style::default().fg(Color::DarkGray))
        .render(regions.body, buf);
    render_script(app, text_area(area, ctl.layout(), ctl.config().compact_lines), buf);

    let snapshot = ctl.stats();
    Gauge::default()
        .gauge_style(Style::default().fg(Color::Cyan))
        .ratio(ctl.position().clamp(0.0, 1.0))
        .label(format!("{:.0}%", snapshot.progress_percent))
        .render(regions.gauge, buf);

    let mut status = vec![Span::styled(stats_line(&snapshot), bold)];
    status.extend(countdown_span(app));
    status.push(Span::raw("   "));
    status.push(recording_span(ctl.recording_status()));
    Paragraph::new(Line::from(status))
        .alignment(Alignment::Center)
        .render(regions.stats, buf);

    let legend = match &app.notice {
        Some(notice) => Span::styled(notice.as_str(), Style::default().fg(Color::Magenta)),
        None => Span::styled(LEGEND, Style::default().add_modifier(Modifier::ITALIC)),
    };
    Paragraph::new(legend).render(regions.legend, buf);
}

pub fn render_compact(app: &App, area: Rect, buf: &mut Buffer) {
    let ctl = &app.controller;
    let layout = ctl.layout();
    let compact_lines = ctl.config().compact_lines;
    let strip = compact_strip(area, layout.dock, compact_lines);
    let text = text_area(area, layout, compact_lines);

    Clear.render(strip, buf);
    render_script(app, text, buf);

    let status_y = if text.y == strip.y {
        text.bottom()
    } else {
        strip.y
    };
    if status_y >= strip.bottom() {
        return;
    }
    let snapshot = ctl.stats();
    let mut spans = vec![
        Span::styled(
            if ctl.is_scrolling() { "▶ " } else { "❚❚ " },
            Style::default().add_modifier(Modifier::BOLD),
        ),
        Span::raw(format!(
            "{:.0}%  {:.0} wpm  speed {}",
            snapshot.progress_percent,
            snapshot.words_per_minute,
            ctl.speed()
        )),
    ];
    spans.extend(countdown_span(app));
    if ctl.is_recording() {
        spans.push(Span::raw("  "));
        spans.push(recording_span(ctl.recording_status()));
    }
    Paragraph::new(Line::from(spans))
        .style(Style::default().bg(Color::DarkGray))
        .render(
            Rect {
                y: status_y,
                height: 1,
                ..strip
            },
            buf,
        );
}

pub fn render_presentation(app: &App, area: Rect, buf: &mut Buffer) {
    render_script(app, area, buf);
}

pub fn stats_line(snapshot: &StatsSnapshot) -> String {
    format!(
        "{:.0} wpm   {}/{} words   elapsed {}   left ~{}",
        snapshot.words_per_minute,
        snapshot.words_read,
        snapshot.total_words,
        format_mm_ss(snapshot.elapsed_seconds as u64),
        format_mm_ss(snapshot.remaining_seconds.round() as u64),
    )
}

fn countdown_span(app: &App) -> Option<Span<'static>> {
    match app.controller.countdown_state() {
        CountdownState::Running { remaining_seconds } => {
            let style = if remaining_seconds <= 30 {
                Style::default().fg(Color::Red).add_modifier(Modifier::BOLD)
            } else {
                Style::default().fg(Color::Cyan)
            };
            Some(Span::styled(
                format!("   ⏱ {}", format_mm_ss(remaining_seconds as u64)),
                style,
            ))
        }
        CountdownState::Idle => None,
    }
}

fn recording_span(status: &RecordingStatus) -> Span<'static> {
    let file_name = |p: &std::path::Path| {
        p.file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default()
    };
    match status {
        RecordingStatus::Ready => Span::styled("rec off", Style::default().fg(Color::DarkGray)),
        RecordingStatus::Recording(p) => Span::styled(
            format!("● REC {}", file_name(p)),
            Style::default().fg(Color::Red).add_modifier(Modifier::BOLD),
        ),
        RecordingStatus::Saved(p) => Span::styled(
            format!("saved {}", file_name(p)),
            Style::default().fg(Color::Green),
        ),
        RecordingStatus::Unavailable(reason) => {
            Span::styled(reason.clone(), Style::default().fg(Color::Yellow))
        }
    }
}
