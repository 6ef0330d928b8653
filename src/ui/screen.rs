use ratatui::Frame;

use prompter::session::Layout;

use crate::{
    ui::{render_compact, render_normal, render_presentation},
    App,
};

/// One way of laying out the session on the terminal
pub trait Screen {
    fn render(&self, app: &App, f: &mut Frame);
}

/// Text box with header, progress gauge, stats and key legend
pub struct NormalScreen;

impl Screen for NormalScreen {
    fn render(&self, app: &App, f: &mut Frame) {
        render_normal(app, f.area(), f.buffer_mut());
    }
}

/// A few rows of text docked to the top or bottom edge
pub struct CompactScreen;

impl Screen for CompactScreen {
    fn render(&self, app: &App, f: &mut Frame) {
        render_compact(app, f.area(), f.buffer_mut());
    }
}

/// Nothing but the text
pub struct PresentationScreen;

impl Screen for PresentationScreen {
    fn render(&self, app: &App, f: &mut Frame) {
        render_presentation(app, f.area(), f.buffer_mut());
    }
}

/// Presentation wins over compact
pub fn current_screen(layout: Layout) -> Box<dyn Screen> {
    if layout.presentation {
        Box::new(PresentationScreen)
    } else if layout.compact {
        Box::new(CompactScreen)
    } else {
        Box::new(NormalScreen)
    }
}
