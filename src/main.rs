use std::fs::{self, OpenOptions};
use std::io;
use std::process::ExitCode;
use std::time::Duration;

use anyhow::Result;
use clap::Parser;
use crossterm::event::{DisableBracketedPaste, EnableBracketedPaste, KeyCode, KeyEvent, KeyModifiers};
use crossterm::execute;
use crossterm::terminal::{
    EnterAlternateScreen, LeaveAlternateScreen, disable_raw_mode, enable_raw_mode,
};
use ratatui::Terminal;
use ratatui::backend::CrosstermBackend;
use ratatui::layout::{Alignment, Constraint, Direction, Layout, Rect};
use ratatui::style::{Modifier, Style};
use ratatui::text::{Line, Span};
use ratatui::widgets::{Block, Clear, Paragraph, Widget, Wrap};
use rust_i18n::t;

use kaiwa::app::{
    App, AppScreen, Job, KIDS_FIELDS, PathPurpose, ROLEPLAY_FIELDS, SETTINGS_ROWS, ShadowField,
    StatusKind,
};
use kaiwa::config::{self, Config, Secrets};
use kaiwa::event::{AppEvent, EventHandler};
use kaiwa::tutor::configuration::{GiveUpPolicy, KIDS_SITUATIONS, LEVELS};
use kaiwa::tutor::session::{Action, LevelChoice, Mode};
use kaiwa::ui::components::chat::{SidePanel, TranscriptView};
use kaiwa::ui::components::kids_card::KidsCardView;
use kaiwa::ui::components::menu::{MenuEntry, MenuView};
use kaiwa::ui::components::shadowing_list::ShadowingList;
use kaiwa::ui::components::star_meter::StarMeter;
use kaiwa::ui::layout::{LessonLayout, centered_rect, pack_hint_lines};
use kaiwa::ui::line_input::{InputResult, LineInput};
use kaiwa::ui::theme::ThemeColors;

rust_i18n::i18n!("locales", fallback = "en");

#[derive(Parser)]
#[command(name = "kaiwa", version, about = "Terminal English conversation tutor")]
struct Cli {
    #[arg(short, long, help = "Theme name")]
    theme: Option<String>,

    #[arg(short, long, help = "Interface language (ja, en)")]
    locale: Option<String>,

    #[arg(short, long, help = "Conversation model")]
    model: Option<String>,
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    let mut config = Config::load().unwrap_or_default();
    if let Some(theme) = cli.theme {
        config.theme = theme;
    }
    if let Some(locale) = cli.locale {
        config.locale = locale;
    }
    if let Some(model) = cli.model {
        config.model = model;
    }
    config.normalize();

    // Credentials are checked before the terminal changes mode so the
    // message stays readable.
    let secrets = match Secrets::load() {
        Ok(secrets) => secrets,
        Err(e) => {
            eprintln!("{e}");
            return ExitCode::FAILURE;
        }
    };
    if let Err(e) = secrets.require_api_key() {
        eprintln!("{e}");
        return ExitCode::FAILURE;
    }

    init_logging();
    rust_i18n::set_locale(&config.locale);

    let mut app = match App::new(config, secrets) {
        Ok(app) => app,
        Err(e) => {
            eprintln!("Error: {e:#}");
            return ExitCode::FAILURE;
        }
    };

    match run_terminal(&mut app) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("Error: {e:?}");
            ExitCode::FAILURE
        }
    }
}

/// Log to `<data_dir>/kaiwa.log`; stderr belongs to the TUI.
fn init_logging() {
    let dir = config::data_dir();
    if fs::create_dir_all(&dir).is_err() {
        return;
    }
    let Ok(file) = OpenOptions::new()
        .create(true)
        .append(true)
        .open(dir.join("kaiwa.log"))
    else {
        return;
    };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"))
        .target(env_logger::Target::Pipe(Box::new(file)))
        .init();
}

fn run_terminal(app: &mut App) -> Result<()> {
    enable_raw_mode()?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen, EnableBracketedPaste)?;

    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;

    let events = EventHandler::new(Duration::from_millis(200));

    let result = run_app(&mut terminal, app, &events);

    disable_raw_mode()?;
    execute!(
        terminal.backend_mut(),
        DisableBracketedPaste,
        LeaveAlternateScreen
    )?;
    terminal.show_cursor()?;

    result
}

fn run_app(
    terminal: &mut Terminal<CrosstermBackend<io::Stdout>>,
    app: &mut App,
    events: &EventHandler,
) -> Result<()> {
    loop {
        terminal.draw(|frame| render(frame, app))?;

        // The frame above already shows the busy overlay.
        if app.pending.is_some() {
            app.run_pending();
            events.drain_keys();
            continue;
        }

        match events.next()? {
            AppEvent::Key(key) => handle_key(app, key),
            AppEvent::Paste(text) => handle_paste(app, &text),
            AppEvent::Tick | AppEvent::Resize => {}
        }

        if app.should_quit {
            return Ok(());
        }
    }
}

fn ctrl(key: &KeyEvent, ch: char) -> bool {
    key.modifiers.contains(KeyModifiers::CONTROL) && key.code == KeyCode::Char(ch)
}

fn handle_key(app: &mut App, key: KeyEvent) {
    if ctrl(&key, 'c') {
        app.should_quit = true;
        return;
    }

    if app.path_prompt.is_some() {
        handle_path_prompt_key(app, key);
        return;
    }

    match app.screen {
        AppScreen::Login => handle_login_key(app, key),
        AppScreen::Menu => handle_menu_key(app, key),
        AppScreen::RoleplaySetup => handle_roleplay_setup_key(app, key),
        AppScreen::KidsSetup => handle_kids_setup_key(app, key),
        AppScreen::Conversation | AppScreen::Kids => handle_lesson_key(app, key),
        AppScreen::Shadowing => handle_shadowing_key(app, key),
        AppScreen::Settings => handle_settings_key(app, key),
    }
}

fn focused_input(app: &mut App) -> Option<&mut LineInput> {
    if app.path_prompt.is_some() {
        return app.path_prompt.as_mut().map(|p| &mut p.input);
    }
    match app.screen {
        AppScreen::Login => Some(&mut app.login),
        AppScreen::RoleplaySetup => match app.roleplay_setup.focus {
            0 => Some(&mut app.roleplay_setup.persona),
            1 => Some(&mut app.roleplay_setup.scenario),
            3 => Some(&mut app.roleplay_setup.reference),
            _ => None,
        },
        AppScreen::KidsSetup => match app.kids_setup.focus {
            0 => Some(&mut app.kids_setup.name),
            2 => Some(&mut app.kids_setup.custom),
            _ => None,
        },
        AppScreen::Conversation | AppScreen::Kids => Some(&mut app.composer),
        AppScreen::Shadowing if app.shadowing.editing.is_some() => Some(&mut app.shadowing.input),
        _ => None,
    }
}

fn handle_paste(app: &mut App, text: &str) {
    if let Some(input) = focused_input(app) {
        input.paste(text);
    }
}

fn handle_path_prompt_key(app: &mut App, key: KeyEvent) {
    let Some(prompt) = app.path_prompt.as_mut() else {
        return;
    };
    match prompt.input.handle(key) {
        InputResult::Submit => app.confirm_path_prompt(),
        InputResult::Cancel => app.path_prompt = None,
        InputResult::Continue => {}
    }
}

fn handle_login_key(app: &mut App, key: KeyEvent) {
    match app.login.handle(key) {
        InputResult::Submit => app.try_login(),
        InputResult::Cancel => app.should_quit = true,
        InputResult::Continue => {}
    }
}

fn handle_menu_key(app: &mut App, key: KeyEvent) {
    match key.code {
        KeyCode::Esc => app.should_quit = true,
        KeyCode::Up | KeyCode::Char('k') => app.menu.prev(),
        KeyCode::Down | KeyCode::Char('j') => app.menu.next(),
        KeyCode::Enter => {
            let entry = app.menu.current();
            app.open(entry);
        }
        KeyCode::Char(ch) => {
            if let Some(entry) = MenuEntry::from_hotkey(ch) {
                app.open(entry);
            }
        }
        _ => {}
    }
}

fn handle_roleplay_setup_key(app: &mut App, key: KeyEvent) {
    let setup = &mut app.roleplay_setup;
    match key.code {
        KeyCode::Esc => app.go_to_menu(),
        KeyCode::Enter => app.start_roleplay(),
        KeyCode::Down => setup.focus = (setup.focus + 1) % ROLEPLAY_FIELDS,
        KeyCode::Up => setup.focus = (setup.focus + ROLEPLAY_FIELDS - 1) % ROLEPLAY_FIELDS,
        KeyCode::Right if setup.focus == 2 => setup.level = (setup.level + 1) % LEVELS.len(),
        KeyCode::Left if setup.focus == 2 => {
            setup.level = (setup.level + LEVELS.len() - 1) % LEVELS.len();
        }
        _ => {
            if let Some(input) = focused_input(app) {
                input.handle(key);
            }
        }
    }
}

fn handle_kids_setup_key(app: &mut App, key: KeyEvent) {
    let setup = &mut app.kids_setup;
    let choices = KIDS_SITUATIONS.len() + 1;
    match key.code {
        KeyCode::Esc => app.go_to_menu(),
        KeyCode::Enter => app.start_kids(),
        KeyCode::Down => setup.focus = (setup.focus + 1) % KIDS_FIELDS,
        KeyCode::Up => setup.focus = (setup.focus + KIDS_FIELDS - 1) % KIDS_FIELDS,
        KeyCode::Right if setup.focus == 1 => setup.situation = (setup.situation + 1) % choices,
        KeyCode::Left if setup.focus == 1 => {
            setup.situation = (setup.situation + choices - 1) % choices;
        }
        KeyCode::Right | KeyCode::Left if setup.focus == 3 => setup.display = setup.display.next(),
        _ => {
            if let Some(input) = focused_input(app) {
                input.handle(key);
            }
        }
    }
}

fn handle_lesson_key(app: &mut App, key: KeyEvent) {
    let kids = app.screen == AppScreen::Kids;
    let level_up = app.lesson().is_some_and(|s| s.mode == Mode::LevelUpPending);

    if level_up {
        match key.code {
            KeyCode::Char('u') => return app.choose_level(LevelChoice::Advance),
            KeyCode::Char('r') => return app.choose_level(LevelChoice::Repeat),
            KeyCode::Char(_) if !key.modifiers.contains(KeyModifiers::CONTROL) => return,
            _ => {}
        }
    }

    match key.code {
        KeyCode::Esc => return app.go_to_menu(),
        KeyCode::Enter => return app.send_composer(),
        KeyCode::PageUp => {
            app.scroll_back = app.scroll_back.saturating_add(5);
            return;
        }
        KeyCode::PageDown => {
            app.scroll_back = app.scroll_back.saturating_sub(5);
            return;
        }
        KeyCode::F(2) => return app.open_path_prompt(PathPurpose::Save),
        KeyCode::F(3) => return app.open_path_prompt(PathPurpose::Load),
        KeyCode::F(4) => return app.export_log(),
        KeyCode::Tab if kids => {
            app.kids_display = app.kids_display.next();
            return;
        }
        _ => {}
    }

    if key.modifiers.contains(KeyModifiers::CONTROL) {
        let handled = match key.code {
            KeyCode::Char('r') => {
                app.pending = Some(Job::Record);
                true
            }
            KeyCode::Char('s') => {
                app.submit_recording();
                true
            }
            KeyCode::Char('k') => {
                app.queue(Action::Skip);
                true
            }
            KeyCode::Char('p') => {
                app.replay();
                true
            }
            KeyCode::Char('n') => {
                app.queue(Action::Restart);
                true
            }
            KeyCode::Char('x') => {
                app.new_lesson();
                true
            }
            KeyCode::Char('o') if kids => {
                app.toggle_hint();
                true
            }
            KeyCode::Char('g') if !kids => {
                app.queue(Action::GiveUp);
                true
            }
            KeyCode::Char('d') if !kids => {
                app.queue(Action::Resume);
                true
            }
            KeyCode::Char('t') if !kids => {
                app.queue(Action::Translate);
                true
            }
            KeyCode::Char('y') if !kids => {
                app.queue(Action::SuggestAnswer);
                true
            }
            KeyCode::Char('l') if !kids => {
                app.look_up_composer();
                true
            }
            _ => false,
        };
        if handled {
            return;
        }
    }

    app.composer.handle(key);
}

fn handle_shadowing_key(app: &mut App, key: KeyEvent) {
    if app.shadowing.editing.is_some() {
        match app.shadowing.input.handle(key) {
            InputResult::Submit => app.shadow_commit_edit(),
            InputResult::Cancel => app.shadowing.editing = None,
            InputResult::Continue => {}
        }
        return;
    }

    let page = &mut app.shadowing;
    match key.code {
        KeyCode::Esc => app.go_to_menu(),
        KeyCode::Char('[') => page.level = (page.level + LEVELS.len() - 1) % LEVELS.len(),
        KeyCode::Char(']') => page.level = (page.level + 1) % LEVELS.len(),
        KeyCode::Char('i') => app.shadow_begin_edit(ShadowField::Situation),
        KeyCode::Char('e') => app.shadow_begin_edit(ShadowField::Script),
        KeyCode::Char('g') => app.pending = Some(Job::ShadowGenerate),
        KeyCode::Char('f') => app.shadow_from_transcript(),
        KeyCode::Char('s') => {
            if page.drill.script.is_empty() {
                app.info(t!("shadowing.empty"));
            } else {
                app.pending = Some(Job::ShadowSplit);
            }
        }
        KeyCode::Char('v') => page.drill.view = page.drill.view.next(),
        KeyCode::Up | KeyCode::Char('k') => app.shadow_select(-1),
        KeyCode::Down | KeyCode::Char('j') => app.shadow_select(1),
        KeyCode::Char('p') => app.shadow_play(),
        KeyCode::Char('r') if !page.drill.chunks.is_empty() => app.pending = Some(Job::Record),
        KeyCode::Enter => app.shadow_judge(),
        _ => {}
    }
}

fn handle_settings_key(app: &mut App, key: KeyEvent) {
    match key.code {
        KeyCode::Esc => app.leave_settings(),
        KeyCode::Up | KeyCode::Char('k') => {
            app.settings_selected = app.settings_selected.saturating_sub(1);
        }
        KeyCode::Down | KeyCode::Char('j') => {
            app.settings_selected = (app.settings_selected + 1).min(SETTINGS_ROWS - 1);
        }
        KeyCode::Enter | KeyCode::Right | KeyCode::Char('l') => app.settings_cycle(true),
        KeyCode::Left | KeyCode::Char('h') => app.settings_cycle(false),
        _ => {}
    }
}

// --- rendering ---

fn render(frame: &mut ratatui::Frame, app: &App) {
    let area = frame.area();
    let colors = &app.theme.colors;

    let bg = Block::default().style(Style::default().bg(colors.bg()));
    frame.render_widget(bg, area);

    match app.screen {
        AppScreen::Login => render_login(frame, app),
        AppScreen::Menu => render_menu(frame, app),
        AppScreen::RoleplaySetup => render_roleplay_setup(frame, app),
        AppScreen::KidsSetup => render_kids_setup(frame, app),
        AppScreen::Conversation => render_conversation(frame, app),
        AppScreen::Kids => render_kids(frame, app),
        AppScreen::Shadowing => render_shadowing(frame, app),
        AppScreen::Settings => render_settings(frame, app),
    }

    if let Some(prompt) = &app.path_prompt {
        let title = match prompt.purpose {
            PathPurpose::Save => t!("prompt.save"),
            PathPurpose::Load => t!("prompt.load"),
        };
        let popup = centered_rect(70, 20, area);
        frame.render_widget(Clear, popup);
        let block = Block::bordered()
            .title(format!(" {title} "))
            .border_style(Style::default().fg(colors.accent()))
            .style(Style::default().bg(colors.bg()));
        let inner = block.inner(popup);
        frame.render_widget(block, popup);
        let lines = vec![
            input_line(&prompt.input, true, colors),
            Line::from(""),
            Line::from(Span::styled(
                t!("prompt.hint").to_string(),
                Style::default().fg(colors.dim()),
            )),
        ];
        frame.render_widget(Paragraph::new(lines), inner);
    }

    if let Some(job) = &app.pending {
        render_busy(frame, app, &job.busy_label());
    }
}

fn render_busy(frame: &mut ratatui::Frame, app: &App, label: &str) {
    let colors = &app.theme.colors;
    let popup = centered_rect(30, 15, frame.area());
    frame.render_widget(Clear, popup);
    let block = Block::bordered()
        .border_style(Style::default().fg(colors.accent()))
        .style(Style::default().bg(colors.bg()));
    let inner = block.inner(popup);
    frame.render_widget(block, popup);
    let text = Paragraph::new(vec![
        Line::from(""),
        Line::from(Span::styled(
            format!("… {label}"),
            Style::default()
                .fg(colors.accent())
                .add_modifier(Modifier::BOLD),
        )),
    ])
    .alignment(Alignment::Center);
    frame.render_widget(text, inner);
}

fn input_line(input: &LineInput, focused: bool, colors: &ThemeColors) -> Line<'static> {
    let (before, at, after) = input.render_parts();
    let base = Style::default().fg(colors.fg());
    let mut spans = vec![Span::styled(before, base)];
    if focused {
        spans.push(Span::styled(
            at.map_or_else(|| " ".to_string(), |c| c.to_string()),
            base.add_modifier(Modifier::REVERSED),
        ));
    } else if let Some(c) = at {
        spans.push(Span::styled(c.to_string(), base));
    }
    spans.push(Span::styled(after, base));
    Line::from(spans)
}

fn render_header(frame: &mut ratatui::Frame, area: Rect, app: &App, title: &str, info: &str) {
    let colors = &app.theme.colors;
    let header = Paragraph::new(Line::from(vec![
        Span::styled(
            format!(" {title} "),
            Style::default()
                .fg(colors.header_fg())
                .bg(colors.header_bg())
                .add_modifier(Modifier::BOLD),
        ),
        Span::styled(
            format!(" {info}"),
            Style::default().fg(colors.dim()).bg(colors.header_bg()),
        ),
    ]))
    .style(Style::default().bg(colors.header_bg()));
    frame.render_widget(header, area);
}

/// Status line plus packed key hints.
fn footer_lines(app: &App, hints: &[String], width: u16) -> Vec<Line<'static>> {
    let colors = &app.theme.colors;
    let mut lines = Vec::new();
    if let Some((kind, text)) = &app.status {
        let color = match kind {
            StatusKind::Info => colors.success(),
            StatusKind::Error => colors.error(),
        };
        lines.push(Line::from(Span::styled(
            format!(" {text}"),
            Style::default().fg(color),
        )));
    }
    let refs: Vec<&str> = hints.iter().map(String::as_str).collect();
    for hint in pack_hint_lines(&refs, width as usize) {
        lines.push(Line::from(Span::styled(
            hint,
            Style::default().fg(colors.accent()),
        )));
    }
    lines
}

fn render_login(frame: &mut ratatui::Frame, app: &App) {
    let colors = &app.theme.colors;
    let area = centered_rect(50, 30, frame.area());
    let block = Block::bordered()
        .title(" kaiwa ")
        .border_style(Style::default().fg(colors.accent()));
    let inner = block.inner(area);
    frame.render_widget(block, area);

    let mut lines = vec![
        Line::from(Span::styled(
            t!("login.prompt").to_string(),
            Style::default().fg(colors.fg()),
        )),
        Line::from(""),
        input_line(&app.login, true, colors),
        Line::from(""),
    ];
    lines.extend(footer_lines(app, &[t!("hint.login").to_string()], inner.width));
    frame.render_widget(Paragraph::new(lines), inner);
}

fn render_menu(frame: &mut ratatui::Frame, app: &App) {
    let area = frame.area();
    let layout = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(1),
            Constraint::Min(0),
            Constraint::Length(2),
        ])
        .split(area);

    let mut info = String::new();
    if let Some(kids) = &app.kids {
        info = t!(
            "menu.kids_progress",
            level = kids.progress.level,
            stars = kids.progress.total_stamps
        )
        .to_string();
    }
    render_header(frame, layout[0], app, "kaiwa", &info);

    let menu_area = centered_rect(50, 90, layout[1]);
    frame.render_widget(
        MenuView {
            menu: &app.menu,
            theme: app.theme,
        },
        menu_area,
    );

    let hints = [t!("hint.menu").to_string()];
    frame.render_widget(
        Paragraph::new(footer_lines(app, &hints, area.width)),
        layout[2],
    );
}

fn field_lines(
    label: String,
    value: Line<'static>,
    selected: bool,
    colors: &ThemeColors,
) -> Vec<Line<'static>> {
    let indicator = if selected { " > " } else { "   " };
    let label_style = if selected {
        Style::default()
            .fg(colors.accent())
            .add_modifier(Modifier::BOLD)
    } else {
        Style::default().fg(colors.fg())
    };
    let mut value = value;
    value.spans.insert(0, Span::raw("     "));
    vec![
        Line::from(Span::styled(format!("{indicator}{label}"), label_style)),
        value,
        Line::from(""),
    ]
}

fn selector(text: &str, selected: bool, colors: &ThemeColors) -> Line<'static> {
    let style = if selected {
        Style::default().fg(colors.accent())
    } else {
        Style::default().fg(colors.dim())
    };
    Line::from(Span::styled(format!("< {text} >"), style))
}

fn render_roleplay_setup(frame: &mut ratatui::Frame, app: &App) {
    let colors = &app.theme.colors;
    let setup = &app.roleplay_setup;
    let area = centered_rect(80, 90, frame.area());
    let block = Block::bordered()
        .title(format!(" {} ", t!("setup.roleplay_title")))
        .border_style(Style::default().fg(colors.accent()));
    let inner = block.inner(area);
    frame.render_widget(block, area);

    let mut lines = Vec::new();
    lines.extend(field_lines(
        t!("setup.persona").to_string(),
        input_line(&setup.persona, setup.focus == 0, colors),
        setup.focus == 0,
        colors,
    ));
    lines.extend(field_lines(
        t!("setup.scenario").to_string(),
        input_line(&setup.scenario, setup.focus == 1, colors),
        setup.focus == 1,
        colors,
    ));
    lines.extend(field_lines(
        t!("setup.level").to_string(),
        selector(LEVELS[setup.level], setup.focus == 2, colors),
        setup.focus == 2,
        colors,
    ));
    lines.extend(field_lines(
        t!("setup.reference").to_string(),
        input_line(&setup.reference, setup.focus == 3, colors),
        setup.focus == 3,
        colors,
    ));
    if setup.reference.completion_error {
        lines.push(Line::from(Span::styled(
            format!("   {}", t!("setup.no_directory")),
            Style::default().fg(colors.warning()),
        )));
    }
    if let Some(err) = &setup.error {
        lines.push(Line::from(Span::styled(
            format!("   {err}"),
            Style::default().fg(colors.error()),
        )));
    }
    lines.push(Line::from(""));
    lines.extend(footer_lines(app, &[t!("hint.setup").to_string()], inner.width));
    frame.render_widget(Paragraph::new(lines).wrap(Wrap { trim: false }), inner);
}

fn render_kids_setup(frame: &mut ratatui::Frame, app: &App) {
    let colors = &app.theme.colors;
    let setup = &app.kids_setup;
    let area = centered_rect(80, 90, frame.area());
    let block = Block::bordered()
        .title(format!(" {} ", t!("setup.kids_title")))
        .border_style(Style::default().fg(colors.star()));
    let inner = block.inner(area);
    frame.render_widget(block, area);

    let situation = match KIDS_SITUATIONS.get(setup.situation).map(|s| s.key) {
        Some("burger") => t!("kids.situation.burger"),
        Some("zoo") => t!("kids.situation.zoo"),
        Some("fruit") => t!("kids.situation.fruit"),
        Some("park") => t!("kids.situation.park"),
        _ => t!("kids.situation.custom"),
    };

    let mut lines = Vec::new();
    lines.extend(field_lines(
        t!("setup.child_name").to_string(),
        input_line(&setup.name, setup.focus == 0, colors),
        setup.focus == 0,
        colors,
    ));
    lines.extend(field_lines(
        t!("setup.situation").to_string(),
        selector(&situation, setup.focus == 1, colors),
        setup.focus == 1,
        colors,
    ));
    let custom = if setup.is_custom() {
        input_line(&setup.custom, setup.focus == 2, colors)
    } else {
        Line::from(Span::styled(
            t!("setup.custom_unused").to_string(),
            Style::default().fg(colors.dim()),
        ))
    };
    lines.extend(field_lines(
        t!("setup.custom_situation").to_string(),
        custom,
        setup.focus == 2,
        colors,
    ));
    lines.extend(field_lines(
        t!("setup.display").to_string(),
        selector(&setup.display.label(), setup.focus == 3, colors),
        setup.focus == 3,
        colors,
    ));
    lines.extend(footer_lines(app, &[t!("hint.setup").to_string()], inner.width));
    frame.render_widget(Paragraph::new(lines).wrap(Wrap { trim: false }), inner);
}

fn composer_block(frame: &mut ratatui::Frame, area: Rect, app: &App, enabled: bool) {
    let colors = &app.theme.colors;
    let mut title = format!(" {} ", t!("chat.composer"));
    if app.clip.is_some() {
        title.push_str(&format!("[{}] ", t!("chat.clip_ready")));
    }
    let block = Block::bordered().title(title).border_style(Style::default().fg(if enabled {
        colors.border_focused()
    } else {
        colors.border()
    }));
    let inner = block.inner(area);
    frame.render_widget(block, area);
    frame.render_widget(Paragraph::new(input_line(&app.composer, enabled, colors)), inner);
}

fn render_conversation(frame: &mut ratatui::Frame, app: &App) {
    let Some(session) = app.roleplay.as_ref() else {
        return;
    };
    let area = frame.area();
    let hints: Vec<String> = [
        t!("hint.send"),
        t!("hint.record"),
        t!("hint.submit_audio"),
        t!("hint.give_up"),
        t!("hint.resume"),
        t!("hint.skip"),
        t!("hint.translate"),
        t!("hint.suggest"),
        t!("hint.look_up"),
        t!("hint.replay"),
        t!("hint.restart"),
        t!("hint.files"),
        t!("hint.back"),
    ]
    .into_iter()
    .map(|h| h.to_string())
    .collect();
    let footer = footer_lines(app, &hints, area.width);
    let layout = LessonLayout::new(area, footer.len() as u16);

    let level = session.config.level.split(':').next().unwrap_or_default();
    let info = format!(
        "{} | Lv {level} | {}",
        session.config.persona,
        mode_label(&session.mode)
    );
    render_header(frame, layout.header, app, &t!("menu.roleplay.label"), &info);

    frame.render_widget(TranscriptView::new(session, app.theme, app.scroll_back), layout.main);
    frame.render_widget(SidePanel::new(session, app.theme), layout.side);
    composer_block(frame, layout.input, app, true);
    frame.render_widget(Paragraph::new(footer), layout.footer);
}

fn mode_label(mode: &Mode) -> String {
    match mode {
        Mode::Normal => t!("mode.normal"),
        Mode::RepeatPractice { .. } => t!("mode.repeat_practice"),
        Mode::GiveUp => t!("mode.give_up"),
        Mode::LevelUpPending => t!("mode.level_up"),
    }
    .to_string()
}

fn render_kids(frame: &mut ratatui::Frame, app: &App) {
    let Some(session) = app.kids.as_ref() else {
        return;
    };
    let colors = &app.theme.colors;
    let area = frame.area();
    let hints: Vec<String> = [
        t!("hint.send"),
        t!("hint.record"),
        t!("hint.submit_audio"),
        t!("hint.hint"),
        t!("hint.skip"),
        t!("hint.replay"),
        t!("hint.display"),
        t!("hint.restart"),
        t!("hint.files"),
        t!("hint.back"),
    ]
    .into_iter()
    .map(|h| h.to_string())
    .collect();
    let footer = footer_lines(app, &hints, area.width);
    let layout = LessonLayout::new(area, footer.len() as u16);

    let info = format!(
        "{} | {}",
        session.config.learner_name,
        t!("kids.level", level = session.progress.level)
    );
    render_header(frame, layout.header, app, &t!("menu.kids.label"), &info);

    frame.render_widget(
        KidsCardView {
            card: session.card.as_ref(),
            progress: &session.progress,
            display: app.kids_display,
            show_hint: app.show_hint,
            theme: app.theme,
        },
        layout.main,
    );

    let side = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Length(3), Constraint::Min(0)])
        .split(layout.side);
    frame.render_widget(
        StarMeter::new(session.progress, session.level_ratio(), app.theme),
        side[0],
    );
    frame.render_widget(TranscriptView::new(session, app.theme, app.scroll_back), side[1]);

    let level_up = session.mode == Mode::LevelUpPending;
    composer_block(frame, layout.input, app, !level_up);
    frame.render_widget(Paragraph::new(footer), layout.footer);

    if level_up {
        let popup = centered_rect(50, 30, layout.main);
        frame.render_widget(Clear, popup);
        let block = Block::bordered()
            .border_style(Style::default().fg(colors.star()))
            .style(Style::default().bg(colors.bg()));
        let inner = block.inner(popup);
        frame.render_widget(block, popup);
        let lines = vec![
            Line::from(Span::styled(
                t!("kids.level_up").to_string(),
                Style::default()
                    .fg(colors.star())
                    .add_modifier(Modifier::BOLD),
            )),
            Line::from(""),
            Line::from(t!("kids.level_up_choice").to_string()),
        ];
        frame.render_widget(
            Paragraph::new(lines)
                .alignment(Alignment::Center)
                .wrap(Wrap { trim: true }),
            inner,
        );
    }
}

fn render_shadowing(frame: &mut ratatui::Frame, app: &App) {
    let colors = &app.theme.colors;
    let page = &app.shadowing;
    let area = frame.area();
    let hints: Vec<String> = [
        t!("hint.shadow_source"),
        t!("hint.shadow_split"),
        t!("hint.shadow_view"),
        t!("hint.shadow_level"),
        t!("hint.shadow_practice"),
        t!("hint.back"),
    ]
    .into_iter()
    .map(|h| h.to_string())
    .collect();
    let footer = footer_lines(app, &hints, area.width);
    let layout = LessonLayout::new(area, footer.len() as u16);

    let info = format!("{} | {}", LEVELS[page.level], page.situation);
    render_header(frame, layout.header, app, &t!("menu.shadowing.label"), &info);

    frame.render_widget(
        ShadowingList::new(&page.drill, page.selected, app.theme),
        layout.main,
    );

    let script = Block::bordered()
        .title(format!(" {} ", t!("shadowing.script")))
        .border_style(Style::default().fg(colors.border()));
    let script_inner = script.inner(layout.side);
    frame.render_widget(script, layout.side);
    let script_text = if page.drill.script.is_empty() {
        Paragraph::new(t!("shadowing.empty").to_string()).style(Style::default().fg(colors.dim()))
    } else {
        Paragraph::new(page.drill.script.clone()).style(Style::default().fg(colors.fg()))
    };
    frame.render_widget(script_text.wrap(Wrap { trim: false }), script_inner);

    let (title, focused) = match page.editing {
        Some(ShadowField::Situation) => (t!("shadowing.edit_situation"), true),
        Some(ShadowField::Script) => (t!("shadowing.edit_script"), true),
        None if app.clip.is_some() => (t!("chat.clip_ready"), false),
        None => (t!("shadowing.idle"), false),
    };
    let block = Block::bordered()
        .title(format!(" {title} "))
        .border_style(Style::default().fg(if focused {
            colors.border_focused()
        } else {
            colors.border()
        }));
    let inner = block.inner(layout.input);
    frame.render_widget(block, layout.input);
    if focused {
        frame.render_widget(Paragraph::new(input_line(&page.input, true, colors)), inner);
    }

    frame.render_widget(Paragraph::new(footer), layout.footer);
}

fn render_settings(frame: &mut ratatui::Frame, app: &App) {
    let colors = &app.theme.colors;
    let centered = centered_rect(60, 80, frame.area());

    let block = Block::bordered()
        .title(format!(" {} ", t!("settings.title")))
        .border_style(Style::default().fg(colors.accent()))
        .style(Style::default().bg(colors.bg()));
    let inner = block.inner(centered);
    block.render(centered, frame.buffer_mut());

    let autoplay = if app.config.autoplay {
        t!("settings.on")
    } else {
        t!("settings.off")
    };
    let policy = match app.config.give_up_policy {
        GiveUpPolicy::FreshQuestion => t!("settings.policy_fresh"),
        GiveUpPolicy::ContinueNarrative => t!("settings.policy_continue"),
    };
    let fields: Vec<(String, String)> = vec![
        (t!("settings.theme").to_string(), app.config.theme.clone()),
        (t!("settings.locale").to_string(), app.config.locale.clone()),
        (t!("settings.model").to_string(), app.config.model.clone()),
        (t!("settings.give_up_policy").to_string(), policy.to_string()),
        (t!("settings.autoplay").to_string(), autoplay.to_string()),
    ];

    let layout = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(2),
            Constraint::Length(fields.len() as u16 * 3),
            Constraint::Min(0),
            Constraint::Length(2),
        ])
        .split(inner);

    let rows = Layout::default()
        .direction(Direction::Vertical)
        .constraints(fields.iter().map(|_| Constraint::Length(3)).collect::<Vec<_>>())
        .split(layout[1]);

    for (i, (label, value)) in fields.into_iter().enumerate() {
        let selected = i == app.settings_selected;
        Paragraph::new(field_lines(
            label,
            selector(&value, selected, colors),
            selected,
            colors,
        ))
        .render(rows[i], frame.buffer_mut());
    }

    Paragraph::new(footer_lines(app, &[t!("hint.settings").to_string()], inner.width))
        .render(layout[3], frame.buffer_mut());
}
