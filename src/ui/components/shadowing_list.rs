use ratatui::buffer::Buffer;
use ratatui::layout::Rect;
use ratatui::style::{Modifier, Style};
use ratatui::text::{Line, Span};
use ratatui::widgets::{Block, Paragraph, Widget, Wrap};
use rust_i18n::t;

use crate::tutor::shadowing::{ShadowingDrill, ShadowingView};
use crate::ui::theme::Theme;

/// Numbered sentence list with the verdict for each attempted line.
pub struct ShadowingList<'a> {
    drill: &'a ShadowingDrill,
    selected: usize,
    theme: &'a Theme,
}

impl<'a> ShadowingList<'a> {
    pub fn new(drill: &'a ShadowingDrill, selected: usize, theme: &'a Theme) -> Self {
        Self {
            drill,
            selected,
            theme,
        }
    }
}

fn view_label(view: ShadowingView) -> String {
    match view {
        ShadowingView::EnglishAndJapanese => t!("shadowing.view.both"),
        ShadowingView::EnglishOnly => t!("shadowing.view.english"),
        ShadowingView::Blind => t!("shadowing.view.blind"),
    }
    .to_string()
}

impl Widget for ShadowingList<'_> {
    fn render(self, area: Rect, buf: &mut Buffer) {
        let colors = &self.theme.colors;
        let view = self.drill.view;
        let block = Block::bordered()
            .title(format!(
                " {} ({}) ",
                t!("shadowing.title"),
                view_label(view)
            ))
            .border_style(Style::default().fg(colors.border_focused()));
        let inner = block.inner(area);
        block.render(area, buf);

        if self.drill.chunks.is_empty() {
            let hint = if self.drill.script.trim().is_empty() {
                t!("shadowing.empty")
            } else {
                t!("shadowing.unsplit")
            };
            Paragraph::new(hint.to_string())
                .style(Style::default().fg(colors.dim()))
                .wrap(Wrap { trim: true })
                .render(inner, buf);
            return;
        }

        let mut lines: Vec<Line> = Vec::new();
        let mut selected_row = 0usize;
        for (i, chunk) in self.drill.chunks.iter().enumerate() {
            let is_selected = i == self.selected;
            if is_selected {
                selected_row = lines.len();
            }
            let marker = if is_selected { ">" } else { " " };
            let english = if view.shows_english() {
                chunk.en.clone()
            } else {
                "…".to_string()
            };
            let mut style = Style::default().fg(colors.fg());
            if is_selected {
                style = style.fg(colors.accent()).add_modifier(Modifier::BOLD);
            }
            lines.push(Line::from(Span::styled(
                format!("{marker}{:>3}. {english}", i + 1),
                style,
            )));
            if view.shows_japanese() && !chunk.ja.is_empty() {
                lines.push(Line::from(Span::styled(
                    format!("      {}", chunk.ja),
                    Style::default().fg(colors.dim()),
                )));
            }
            if let Some(verdict) = self.drill.verdicts.get(&i) {
                let (mark, color) = if verdict.exact {
                    ("◎", colors.success())
                } else {
                    ("△", colors.warning())
                };
                lines.push(Line::from(vec![
                    Span::styled(format!("      {mark} "), Style::default().fg(color)),
                    Span::styled(verdict.heard.clone(), Style::default().fg(colors.user_text())),
                ]));
                for l in verdict.comment.lines().filter(|l| !l.trim().is_empty()) {
                    lines.push(Line::from(Span::styled(
                        format!("        {l}"),
                        Style::default().fg(colors.feedback()),
                    )));
                }
            }
        }

        let height = inner.height as usize;
        let offset = selected_row.saturating_sub(height.saturating_sub(3)) as u16;
        Paragraph::new(lines)
            .scroll((offset, 0))
            .render(inner, buf);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tutor::markers::Chunk;

    fn render_text(drill: &ShadowingDrill, w: u16, h: u16) -> String {
        let theme = Theme::default();
        let area = Rect::new(0, 0, w, h);
        let mut buf = Buffer::empty(area);
        ShadowingList::new(drill, 0, &theme).render(area, &mut buf);
        (0..h)
            .map(|y| (0..w).map(|x| buf[(x, y)].symbol().to_string()).collect::<String>())
            .collect::<Vec<_>>()
            .join("\n")
    }

    fn drill() -> ShadowingDrill {
        let mut drill = ShadowingDrill::default();
        drill.chunks = vec![Chunk {
            en: "See you tomorrow.".into(),
            ja: "mata-ashita".into(),
        }];
        drill
    }

    #[test]
    fn blind_view_hides_text() {
        let mut d = drill();
        assert!(render_text(&d, 40, 6).contains("See you tomorrow."));
        assert!(render_text(&d, 40, 6).contains("mata-ashita"));
        d.view = ShadowingView::Blind;
        let text = render_text(&d, 40, 6);
        assert!(!text.contains("See you tomorrow."));
        assert!(!text.contains("mata-ashita"));
    }

    #[test]
    fn english_only_view_drops_translation() {
        let mut d = drill();
        d.view = ShadowingView::EnglishOnly;
        let text = render_text(&d, 40, 6);
        assert!(text.contains("See you tomorrow."));
        assert!(!text.contains("mata-ashita"));
    }
}
