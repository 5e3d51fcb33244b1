use ratatui::buffer::Buffer;
use ratatui::layout::{Alignment, Constraint, Direction, Layout, Rect};
use ratatui::style::{Modifier, Style};
use ratatui::text::{Line, Span};
use ratatui::widgets::{Block, Paragraph, Widget, Wrap};
use rust_i18n::t;

use crate::tutor::markers::{KidsCard, RubyToken, parse_ruby};
use crate::tutor::session::{Progress, STAMPS_PER_LEVEL};
use crate::ui::layout::display_width;
use crate::ui::theme::Theme;

/// How the English line of a card is presented to the child.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum KidsDisplay {
    /// Katakana readings above each English word.
    #[default]
    Ruby,
    /// English with the hiragana translation below.
    Japanese,
    EnglishOnly,
}

impl KidsDisplay {
    pub fn next(self) -> Self {
        match self {
            KidsDisplay::Ruby => KidsDisplay::Japanese,
            KidsDisplay::Japanese => KidsDisplay::EnglishOnly,
            KidsDisplay::EnglishOnly => KidsDisplay::Ruby,
        }
    }

    pub fn label(self) -> String {
        match self {
            KidsDisplay::Ruby => t!("kids.display.ruby"),
            KidsDisplay::Japanese => t!("kids.display.japanese"),
            KidsDisplay::EnglishOnly => t!("kids.display.english"),
        }
        .to_string()
    }
}

/// Lay ruby text out as two rows, each reading centred over its word.
pub fn ruby_rows(text: &str) -> (String, String) {
    let mut top = String::new();
    let mut bottom = String::new();
    for token in parse_ruby(text) {
        match token {
            RubyToken::Plain(plain) => {
                top.push_str(&" ".repeat(display_width(&plain)));
                bottom.push_str(&plain);
            }
            RubyToken::Ruby { base, reading } => {
                let (bw, rw) = (display_width(&base), display_width(&reading));
                let cell = bw.max(rw);
                let pad = |w: usize| (" ".repeat((cell - w) / 2), " ".repeat(cell - w - (cell - w) / 2));
                let (rl, rr) = pad(rw);
                let (bl, br) = pad(bw);
                top.push_str(&format!("{rl}{reading}{rr}"));
                bottom.push_str(&format!("{bl}{base}{br}"));
            }
        }
    }
    (top.trim_end().to_string(), bottom.trim_end().to_string())
}

pub fn star_row(progress: &Progress) -> String {
    let earned = progress.stamps % STAMPS_PER_LEVEL;
    let earned = if earned == 0 && progress.stamps > 0 {
        STAMPS_PER_LEVEL
    } else {
        earned
    };
    let filled = "★".repeat(earned as usize);
    let empty = "☆".repeat((STAMPS_PER_LEVEL - earned) as usize);
    format!("{filled}{empty}")
}

pub struct KidsCardView<'a> {
    pub card: Option<&'a KidsCard>,
    pub progress: &'a Progress,
    pub display: KidsDisplay,
    pub show_hint: bool,
    pub theme: &'a Theme,
}

impl KidsCardView<'_> {
    fn english_lines(&self, en: &str, ja: &str, ruby: &str, style: Style) -> Vec<Line<'static>> {
        let colors = &self.theme.colors;
        let mut lines = Vec::new();
        match self.display {
            KidsDisplay::Ruby if !ruby.is_empty() => {
                let (top, bottom) = ruby_rows(ruby);
                lines.push(Line::from(Span::styled(top, Style::default().fg(colors.ruby()))));
                lines.push(Line::from(Span::styled(bottom, style)));
            }
            KidsDisplay::Japanese => {
                lines.push(Line::from(Span::styled(en.to_string(), style)));
                lines.push(Line::from(Span::styled(
                    ja.to_string(),
                    Style::default().fg(colors.feedback()),
                )));
            }
            _ => lines.push(Line::from(Span::styled(en.to_string(), style))),
        }
        lines
    }
}

impl Widget for KidsCardView<'_> {
    fn render(self, area: Rect, buf: &mut Buffer) {
        let colors = &self.theme.colors;
        let block = Block::bordered()
            .title(format!(
                " {} ",
                t!("kids.card_title", level = self.progress.level)
            ))
            .border_style(Style::default().fg(colors.border_focused()));
        let inner = block.inner(area);
        block.render(area, buf);

        let rows = Layout::default()
            .direction(Direction::Vertical)
            .constraints([
                Constraint::Length(2),
                Constraint::Length(2),
                Constraint::Min(3),
                Constraint::Length(4),
            ])
            .split(inner);

        Paragraph::new(Line::from(vec![
            Span::styled(star_row(self.progress), Style::default().fg(colors.star())),
            Span::styled(
                format!("  {}", t!("kids.total_stars", count = self.progress.total_stamps)),
                Style::default().fg(colors.dim()),
            ),
        ]))
        .alignment(Alignment::Center)
        .render(rows[0], buf);

        let Some(card) = self.card else {
            Paragraph::new(t!("kids.waiting").to_string())
                .alignment(Alignment::Center)
                .style(Style::default().fg(colors.dim()))
                .render(rows[2], buf);
            return;
        };

        if !card.praise.is_empty() {
            Paragraph::new(card.praise.clone())
                .alignment(Alignment::Center)
                .style(Style::default().fg(colors.star()).add_modifier(Modifier::BOLD))
                .wrap(Wrap { trim: true })
                .render(rows[1], buf);
        }

        let question_style = Style::default()
            .fg(colors.ai_text())
            .add_modifier(Modifier::BOLD);
        Paragraph::new(self.english_lines(&card.ai_en, &card.ai_ja, &card.ai_ruby, question_style))
            .alignment(Alignment::Center)
            .wrap(Wrap { trim: false })
            .render(rows[2], buf);

        if self.show_hint && !card.hint_en.is_empty() {
            let mut lines = vec![Line::from(Span::styled(
                t!("kids.hint").to_string(),
                Style::default().fg(colors.dim()),
            ))];
            lines.extend(self.english_lines(
                &card.hint_en,
                &card.hint_ja,
                &card.hint_ruby,
                Style::default().fg(colors.user_text()),
            ));
            Paragraph::new(lines)
                .alignment(Alignment::Center)
                .render(rows[3], buf);
        }
    }
}
