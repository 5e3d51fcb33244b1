use ratatui::buffer::Buffer;
use ratatui::layout::Rect;
use ratatui::style::{Modifier, Style};
use ratatui::text::{Line, Span};
use ratatui::widgets::{Block, Paragraph, Widget, Wrap};
use rust_i18n::t;

use crate::tutor::configuration::Variant;
use crate::tutor::markers::{self, KidsCard, Section};
use crate::tutor::session::{Mode, NoteKind, Session};
use crate::tutor::transcript::{Role, Turn, TurnKind};
use crate::ui::layout::wrapped_line_count;
use crate::ui::theme::Theme;

/// Scrolling conversation log. Directives are hidden; the newest turn is
/// kept in view unless the learner scrolled up.
pub struct TranscriptView<'a> {
    session: &'a Session,
    theme: &'a Theme,
    /// Rows scrolled up from the bottom.
    scroll_back: u16,
}

impl<'a> TranscriptView<'a> {
    pub fn new(session: &'a Session, theme: &'a Theme, scroll_back: u16) -> Self {
        Self {
            session,
            theme,
            scroll_back,
        }
    }

    fn turn_lines(&self, turn: &Turn) -> Vec<Line<'static>> {
        let colors = &self.theme.colors;
        let mut lines = Vec::new();
        match (turn.kind, turn.role) {
            (TurnKind::Directive, _) => return lines,
            (TurnKind::Aside, _) => {
                for l in turn.content.lines() {
                    lines.push(Line::from(Span::styled(
                        format!("    {l}"),
                        Style::default()
                            .fg(colors.dim())
                            .add_modifier(Modifier::ITALIC),
                    )));
                }
            }
            (TurnKind::Dialogue, Role::User) => {
                lines.push(Line::from(vec![
                    Span::styled(
                        format!("{} ", t!("chat.you")),
                        Style::default()
                            .fg(colors.user_text())
                            .add_modifier(Modifier::BOLD),
                    ),
                    Span::styled(turn.content.clone(), Style::default().fg(colors.user_text())),
                ]));
            }
            (TurnKind::Dialogue, Role::Assistant) => {
                lines.push(Line::from(Span::styled(
                    t!("chat.ai").to_string(),
                    Style::default()
                        .fg(colors.ai_text())
                        .add_modifier(Modifier::BOLD),
                )));
                match self.session.variant() {
                    Variant::Roleplay => lines.extend(self.roleplay_lines(&turn.content)),
                    Variant::Kids => lines.extend(self.kids_lines(&turn.content)),
                }
            }
        }
        lines.push(Line::from(""));
        lines
    }

    fn roleplay_lines(&self, content: &str) -> Vec<Line<'static>> {
        let colors = &self.theme.colors;
        let sections = markers::sections(content);
        if sections.is_empty() {
            return content
                .lines()
                .map(|l| Line::from(Span::styled(format!("  {l}"), Style::default().fg(colors.fg()))))
                .collect();
        }
        let mut lines = Vec::new();
        for (section, body) in sections {
            let style = match section {
                Section::Feedback => Style::default().fg(colors.feedback()),
                Section::Question => Style::default()
                    .fg(colors.ai_text())
                    .add_modifier(Modifier::BOLD),
                Section::RepeatPractice => Style::default()
                    .fg(colors.practice())
                    .add_modifier(Modifier::BOLD),
            };
            lines.push(Line::from(Span::styled(
                format!("  {}", section.marker()),
                Style::default().fg(colors.dim()),
            )));
            for l in body.lines() {
                lines.push(Line::from(Span::styled(format!("  {l}"), style)));
            }
        }
        lines
    }

    fn kids_lines(&self, content: &str) -> Vec<Line<'static>> {
        let colors = &self.theme.colors;
        let card = KidsCard::parse(content);
        let mut lines = Vec::new();
        if !card.praise.is_empty() {
            lines.push(Line::from(Span::styled(
                format!("  {}", card.praise),
                Style::default().fg(colors.star()),
            )));
        }
        lines.push(Line::from(Span::styled(
            format!("  {}", card.ai_en),
            Style::default().fg(colors.ai_text()),
        )));
        if !card.ai_ja.is_empty() {
            lines.push(Line::from(Span::styled(
                format!("  ({})", card.ai_ja),
                Style::default().fg(colors.feedback()),
            )));
        }
        lines
    }
}

impl Widget for TranscriptView<'_> {
    fn render(self, area: Rect, buf: &mut Buffer) {
        let colors = &self.theme.colors;
        let block = Block::bordered()
            .title(format!(" {} ", t!("chat.title")))
            .border_style(Style::default().fg(colors.border()));
        let inner = block.inner(area);
        block.render(area, buf);

        let lines: Vec<Line> = self
            .session
            .transcript
            .turns()
            .iter()
            .flat_map(|t| self.turn_lines(t))
            .collect();

        let width = inner.width as usize;
        let total: usize = lines
            .iter()
            .map(|l| wrapped_line_count(&l.to_string(), width))
            .sum();
        let bottom = total.saturating_sub(inner.height as usize) as u16;
        let offset = bottom.saturating_sub(self.scroll_back);

        Paragraph::new(lines)
            .wrap(Wrap { trim: false })
            .scroll((offset, 0))
            .render(inner, buf);
    }
}

/// Mode banner plus the latest helper note.
pub struct SidePanel<'a> {
    session: &'a Session,
    theme: &'a Theme,
}

impl<'a> SidePanel<'a> {
    pub fn new(session: &'a Session, theme: &'a Theme) -> Self {
        Self { session, theme }
    }
}

impl Widget for SidePanel<'_> {
    fn render(self, area: Rect, buf: &mut Buffer) {
        let colors = &self.theme.colors;
        let block = Block::bordered()
            .title(format!(" {} ", t!("side.title")))
            .border_style(Style::default().fg(colors.border()));
        let inner = block.inner(area);
        block.render(area, buf);

        let mut lines: Vec<Line> = Vec::new();
        match &self.session.mode {
            Mode::RepeatPractice { sentence, .. } => {
                lines.push(Line::from(Span::styled(
                    t!("side.repeat_practice").to_string(),
                    Style::default()
                        .fg(colors.practice())
                        .add_modifier(Modifier::BOLD),
                )));
                lines.push(Line::from(Span::styled(
                    format!("  {sentence}"),
                    Style::default().fg(colors.fg()),
                )));
                lines.push(Line::from(Span::styled(
                    t!("side.resume_hint").to_string(),
                    Style::default().fg(colors.dim()),
                )));
            }
            Mode::GiveUp => {
                lines.push(Line::from(Span::styled(
                    t!("side.give_up").to_string(),
                    Style::default().fg(colors.warning()),
                )));
                lines.push(Line::from(Span::styled(
                    t!("side.resume_hint").to_string(),
                    Style::default().fg(colors.dim()),
                )));
            }
            Mode::LevelUpPending => {
                lines.push(Line::from(Span::styled(
                    t!("kids.level_up").to_string(),
                    Style::default().fg(colors.star()),
                )));
            }
            Mode::Normal => {}
        }

        if let Some(note) = &self.session.note {
            let heading = match note.kind {
                NoteKind::Translation => t!("side.translation"),
                NoteKind::Suggestion => t!("side.suggestion"),
                NoteKind::LookUp => t!("side.look_up"),
            };
            if !lines.is_empty() {
                lines.push(Line::from(""));
            }
            lines.push(Line::from(Span::styled(
                format!("{heading}: {}", note.subject),
                Style::default().fg(colors.note()).add_modifier(Modifier::BOLD),
            )));
            for l in note.text.lines() {
                lines.push(Line::from(Span::styled(
                    format!("  {l}"),
                    Style::default().fg(colors.note()),
                )));
            }
        }

        Paragraph::new(lines)
            .wrap(Wrap { trim: false })
            .render(inner, buf);
    }
}
