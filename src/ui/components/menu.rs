use ratatui::buffer::Buffer;
use ratatui::layout::{Alignment, Constraint, Direction, Layout, Rect};
use ratatui::style::{Modifier, Style};
use ratatui::text::{Line, Span};
use ratatui::widgets::{Block, Paragraph, Widget};
use rust_i18n::t;

use crate::ui::theme::Theme;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum MenuEntry {
    Roleplay,
    Shadowing,
    Kids,
    Settings,
    Quit,
}

impl MenuEntry {
    pub const ALL: [MenuEntry; 5] = [
        MenuEntry::Roleplay,
        MenuEntry::Shadowing,
        MenuEntry::Kids,
        MenuEntry::Settings,
        MenuEntry::Quit,
    ];

    pub fn hotkey(self) -> char {
        match self {
            MenuEntry::Roleplay => '1',
            MenuEntry::Shadowing => '2',
            MenuEntry::Kids => '3',
            MenuEntry::Settings => 'c',
            MenuEntry::Quit => 'q',
        }
    }

    pub fn from_hotkey(ch: char) -> Option<Self> {
        Self::ALL.into_iter().find(|e| e.hotkey() == ch)
    }

    pub fn label(self) -> String {
        match self {
            MenuEntry::Roleplay => t!("menu.roleplay.label"),
            MenuEntry::Shadowing => t!("menu.shadowing.label"),
            MenuEntry::Kids => t!("menu.kids.label"),
            MenuEntry::Settings => t!("menu.settings.label"),
            MenuEntry::Quit => t!("menu.quit.label"),
        }
        .to_string()
    }

    fn description(self) -> String {
        match self {
            MenuEntry::Roleplay => t!("menu.roleplay.description"),
            MenuEntry::Shadowing => t!("menu.shadowing.description"),
            MenuEntry::Kids => t!("menu.kids.description"),
            MenuEntry::Settings => t!("menu.settings.description"),
            MenuEntry::Quit => t!("menu.quit.description"),
        }
        .to_string()
    }
}

pub struct Menu {
    pub selected: usize,
}

impl Menu {
    pub fn new() -> Self {
        Self { selected: 0 }
    }

    pub fn current(&self) -> MenuEntry {
        MenuEntry::ALL[self.selected]
    }

    pub fn next(&mut self) {
        self.selected = (self.selected + 1) % MenuEntry::ALL.len();
    }

    pub fn prev(&mut self) {
        self.selected = self
            .selected
            .checked_sub(1)
            .unwrap_or(MenuEntry::ALL.len() - 1);
    }
}

pub struct MenuView<'a> {
    pub menu: &'a Menu,
    pub theme: &'a Theme,
}

impl Widget for MenuView<'_> {
    fn render(self, area: Rect, buf: &mut Buffer) {
        let colors = &self.theme.colors;

        let block = Block::bordered()
            .border_style(Style::default().fg(colors.border()))
            .style(Style::default().bg(colors.bg()));
        let inner = block.inner(area);
        block.render(area, buf);

        let layout = Layout::default()
            .direction(Direction::Vertical)
            .constraints([Constraint::Length(5), Constraint::Min(0)])
            .split(inner);

        let title = Paragraph::new(vec![
            Line::from(""),
            Line::from(Span::styled(
                "kaiwa",
                Style::default()
                    .fg(colors.accent())
                    .add_modifier(Modifier::BOLD),
            )),
            Line::from(Span::styled(t!("menu.tagline"), Style::default().fg(colors.fg()))),
        ])
        .alignment(Alignment::Center);
        title.render(layout[0], buf);

        let rows = Layout::default()
            .direction(Direction::Vertical)
            .constraints(MenuEntry::ALL.map(|_| Constraint::Length(3)))
            .split(layout[1]);

        for (i, (entry, row)) in MenuEntry::ALL.iter().zip(rows.iter()).enumerate() {
            let selected = i == self.menu.selected;
            let label_style = if selected {
                Style::default()
                    .fg(colors.accent())
                    .add_modifier(Modifier::BOLD)
            } else {
                Style::default().fg(colors.fg())
            };
            let marker = if selected { ">" } else { " " };
            let lines = vec![
                Line::from(Span::styled(
                    format!(
                        " {marker} [{}] {}",
                        entry.hotkey(),
                        entry.label()
                    ),
                    label_style,
                )),
                Line::from(Span::styled(
                    format!("     {}", entry.description()),
                    Style::default().fg(colors.dim()),
                )),
            ];
            Paragraph::new(lines).render(*row, buf);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn navigation_wraps() {
        let mut menu = Menu::new();
        menu.prev();
        assert_eq!(menu.current(), MenuEntry::Quit);
        menu.next();
        assert_eq!(menu.current(), MenuEntry::Roleplay);
    }

    #[test]
    fn hotkeys_round_trip() {
        for entry in MenuEntry::ALL {
            assert_eq!(MenuEntry::from_hotkey(entry.hotkey()), Some(entry));
        }
        assert_eq!(MenuEntry::from_hotkey('z'), None);
    }
}
