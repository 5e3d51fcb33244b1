use ratatui::buffer::Buffer;
use ratatui::layout::Rect;
use ratatui::style::Style;
use ratatui::widgets::{Block, Widget};
use rust_i18n::t;

use crate::tutor::session::Progress;
use crate::ui::theme::Theme;

/// Bar showing how close the child is to the next level.
pub struct StarMeter<'a> {
    progress: Progress,
    ratio: f64,
    theme: &'a Theme,
}

impl<'a> StarMeter<'a> {
    pub fn new(progress: Progress, ratio: f64, theme: &'a Theme) -> Self {
        Self {
            progress,
            ratio: ratio.clamp(0.0, 1.0),
            theme,
        }
    }
}

impl Widget for StarMeter<'_> {
    fn render(self, area: Rect, buf: &mut Buffer) {
        let colors = &self.theme.colors;

        let block = Block::bordered()
            .title(format!(
                " {} ",
                t!("kids.level", level = self.progress.level)
            ))
            .border_style(Style::default().fg(colors.border()));
        let inner = block.inner(area);
        block.render(area, buf);

        if inner.width == 0 || inner.height == 0 {
            return;
        }

        let filled_width = (self.ratio * inner.width as f64).round() as u16;
        for x in inner.x..inner.x + inner.width {
            let style = if x < inner.x + filled_width {
                Style::default().fg(colors.bg()).bg(colors.bar_filled())
            } else {
                Style::default().fg(colors.fg()).bg(colors.bar_empty())
            };
            buf[(x, inner.y)].set_style(style);
        }

        let label = format!("★ {}", self.progress.total_stamps);
        let label_x = inner.x + inner.width.saturating_sub(label.chars().count() as u16) / 2;
        buf.set_string(label_x, inner.y, &label, Style::default().fg(colors.star()));
    }
}
