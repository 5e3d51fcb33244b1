use ratatui::layout::{Constraint, Direction, Layout, Rect};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum LayoutTier {
    Wide,   // ≥100 cols: transcript + side panel
    Narrow, // side panel folded under the transcript
}

impl LayoutTier {
    pub fn from_area(area: Rect) -> Self {
        if area.width >= 100 {
            LayoutTier::Wide
        } else {
            LayoutTier::Narrow
        }
    }
}

/// Lesson screen regions: header, transcript, optional side panel, the
/// composer line and the key-hint footer.
pub struct LessonLayout {
    pub header: Rect,
    pub main: Rect,
    pub side: Rect,
    pub input: Rect,
    pub footer: Rect,
    pub tier: LayoutTier,
}

impl LessonLayout {
    pub fn new(area: Rect, footer_lines: u16) -> Self {
        let tier = LayoutTier::from_area(area);

        let vertical = Layout::default()
            .direction(Direction::Vertical)
            .constraints([
                Constraint::Length(1),
                Constraint::Min(6),
                Constraint::Length(3),
                Constraint::Length(footer_lines.max(1)),
            ])
            .split(area);

        let body = match tier {
            LayoutTier::Wide => Layout::default()
                .direction(Direction::Horizontal)
                .constraints([Constraint::Percentage(65), Constraint::Percentage(35)])
                .split(vertical[1]),
            LayoutTier::Narrow => Layout::default()
                .direction(Direction::Vertical)
                .constraints([Constraint::Min(4), Constraint::Length(7)])
                .split(vertical[1]),
        };

        Self {
            header: vertical[0],
            main: body[0],
            side: body[1],
            input: vertical[2],
            footer: vertical[3],
            tier,
        }
    }
}

/// Terminal columns taken by `text`; East Asian wide characters count double.
pub fn display_width(text: &str) -> usize {
    text.chars()
        .map(|c| match c as u32 {
            0x1100..=0x115F | 0x2E80..=0xA4CF | 0xAC00..=0xD7A3 | 0xF900..=0xFAFF | 0xFE30..=0xFE4F
            | 0xFF00..=0xFF60 | 0xFFE0..=0xFFE6 | 0x1F300..=0x1FAFF => 2,
            _ => 1,
        })
        .sum()
}

/// Rows a line of text occupies when wrapped at `width` columns.
pub fn wrapped_line_count(text: &str, width: usize) -> usize {
    if width == 0 {
        return 0;
    }
    display_width(text).max(1).div_ceil(width)
}

/// Pack key hints into as few lines of `width` as possible.
pub fn pack_hint_lines(hints: &[&str], width: usize) -> Vec<String> {
    let mut out: Vec<String> = Vec::new();
    if width == 0 {
        return out;
    }
    let mut current = String::new();
    for hint in hints.iter().filter(|h| !h.is_empty()) {
        let extra = if current.is_empty() { 2 } else { 2 + current.chars().count() };
        if !current.is_empty() && extra + hint.chars().count() > width {
            out.push(std::mem::take(&mut current));
        }
        current.push_str("  ");
        current.push_str(hint);
    }
    if !current.is_empty() {
        out.push(current);
    }
    out
}

pub fn centered_rect(percent_x: u16, percent_y: u16, area: Rect) -> Rect {
    const MIN_POPUP_WIDTH: u16 = 40;
    const MIN_POPUP_HEIGHT: u16 = 7;

    let w = (area.width.saturating_mul(percent_x.min(100)) / 100)
        .max(MIN_POPUP_WIDTH)
        .min(area.width);
    let h = (area.height.saturating_mul(percent_y.min(100)) / 100)
        .max(MIN_POPUP_HEIGHT)
        .min(area.height);

    Rect::new(
        area.x + (area.width - w) / 2,
        area.y + (area.height - h) / 2,
        w,
        h,
    )
}
