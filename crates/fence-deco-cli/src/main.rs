use anyhow::{Context, Result};
use crossterm::{
    event::{self, DisableMouseCapture, EnableMouseCapture, Event, KeyCode},
    execute,
    terminal::{EnterAlternateScreen, LeaveAlternateScreen, disable_raw_mode, enable_raw_mode},
};
use fence_deco_config::Settings;
use fence_deco_engine::dom::encode;
use fence_deco_engine::dom::markdown::{RenderOptions, render_markdown};
use fence_deco_engine::highlight::next_theme;
use fence_deco_engine::live::{
    DecorationKind, HIGHLIGHT_CLASS, LINE_CLASS, LN_OFF_CLASS, LN_ON_CLASS,
};
use fence_deco_engine::parsing::rope::{LineRef, str_lines_with_spans};
use fence_deco_engine::reading::{HeaderModel, decorate_all};
use fence_deco_engine::{
    DecorationSet, EditorState, FsSource, LiveDecorator, PluginContext, SourceContext, ViewUpdate,
    io,
};
use ratatui::{
    Frame, Terminal,
    backend::CrosstermBackend,
    layout::{Constraint, Direction, Layout},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, List, ListItem, ListState, Paragraph},
};
use relative_path::RelativePathBuf;
use std::{
    env,
    io::{Stdout, stdout},
    path::{Path, PathBuf},
    process,
    rc::Rc,
};

struct App {
    notes_path: PathBuf,
    files: Vec<RelativePathBuf>,
    file_list_state: ListState,
    ctx: PluginContext,
    decorator: LiveDecorator,
    state: EditorState,
    lines: Vec<LineRef>,
    decorations: Rc<DecorationSet>,
    scroll: usize,
    status: String,
}

impl App {
    fn new(notes_path: PathBuf, settings: Settings) -> Result<Self> {
        let source = FsSource::new(&notes_path);
        let files = io::scan_markdown_files(&notes_path)?
            .iter()
            .filter_map(|path| source.relative(path))
            .collect();
        let ctx = PluginContext::activate(settings);
        let decorator = LiveDecorator::new(&ctx);

        let mut app = Self {
            notes_path,
            files,
            file_list_state: ListState::default(),
            ctx,
            decorator,
            state: EditorState::new(""),
            lines: Vec::new(),
            decorations: Rc::new(DecorationSet::default()),
            scroll: 0,
            status: String::new(),
        };

        // Select first item if available
        if !app.files.is_empty() {
            app.file_list_state.select(Some(0));
            app.load_selection();
        }

        Ok(app)
    }

    fn next_file(&mut self) {
        if self.files.is_empty() {
            return;
        }
        let i = match self.file_list_state.selected() {
            Some(i) => (i + 1) % self.files.len(),
            None => 0,
        };
        self.file_list_state.select(Some(i));
        self.load_selection();
    }

    fn previous_file(&mut self) {
        if self.files.is_empty() {
            return;
        }
        let i = match self.file_list_state.selected() {
            Some(0) | None => self.files.len() - 1,
            Some(i) => i - 1,
        };
        self.file_list_state.select(Some(i));
        self.load_selection();
    }

    fn load_selection(&mut self) {
        let Some(path) = self
            .file_list_state
            .selected()
            .and_then(|i| self.files.get(i))
        else {
            return;
        };
        let text = match io::read_file(path, &self.notes_path) {
            Ok(text) => text,
            Err(e) => {
                self.status = format!("Error reading file: {e}");
                String::new()
            }
        };
        self.state = EditorState::new(&text);
        self.lines = str_lines_with_spans(&text).collect();
        self.scroll = 0;
        self.refresh(true, true);
    }

    fn scroll_by(&mut self, delta: isize, height: usize) {
        let max = self.lines.len().saturating_sub(1);
        let next = self.scroll.saturating_add_signed(delta).min(max);
        if next != self.scroll {
            self.scroll = next;
            self.set_viewport(height);
            self.refresh(false, true);
        }
    }

    /// Viewport covering `height` lines from the scroll position.
    fn set_viewport(&mut self, height: usize) {
        let first = self.lines.get(self.scroll).map(|l| l.span.start);
        let last = self
            .lines
            .get((self.scroll + height).min(self.lines.len()).saturating_sub(1))
            .map(|l| l.span.end);
        self.state.viewport = match (first, last) {
            (Some(start), Some(end)) => vec![start..end],
            _ => Vec::new(),
        };
    }

    fn refresh(&mut self, doc_changed: bool, viewport_changed: bool) {
        let update = ViewUpdate {
            state: &self.state,
            doc_changed,
            viewport_changed,
        };
        self.decorations = self.decorator.update(&update, &self.ctx);
    }

    fn toggle_highlighting(&mut self) {
        let on = !self.ctx.highlighter().is_active();
        self.ctx.set_highlighting(on);
        self.status = format!("Highlighting {}", if on { "on" } else { "off" });
    }

    fn cycle_theme(&mut self) {
        let mut settings = self.ctx.highlighter().settings().clone();
        settings.theme = next_theme(&settings.theme).to_string();
        self.status = format!("Theme: {}", settings.theme);
        self.ctx.update_settings(settings);
    }

    fn reload(&mut self) {
        self.ctx.reload();
        self.load_selection();
        self.status = "Reloaded".to_string();
    }

    fn render_document(&self) -> Vec<Line<'static>> {
        let marks: Vec<_> = self.decorations.marks().collect();
        let mut out = Vec::new();
        let mut gutter_width = 0;
        let show_line_numbers = self.ctx.highlighter().settings().show_line_numbers;

        for line in self.lines.iter().skip(self.scroll) {
            for (_, header) in self
                .decorations
                .widgets()
                .filter(|(from, _)| *from == line.span.start)
            {
                out.push(header_line(header));
            }

            let deco = self
                .decorations
                .line_at(line.span.start)
                .filter(|d| d.has_class(LINE_CLASS));
            let mut spans = Vec::new();
            let mut base = Style::default();
            if let Some(deco) = deco {
                if deco.has_class(HIGHLIGHT_CLASS) {
                    base = base.bg(Color::Rgb(0x3a, 0x3f, 0x4b));
                }
                let numbered = deco.has_class(LN_ON_CLASS)
                    || (show_line_numbers && !deco.has_class(LN_OFF_CLASS));
                let label = if numbered {
                    deco.attr("data-line-number").unwrap_or_default()
                } else {
                    ""
                };
                if let Some(w) = deco
                    .attr("data-gutter-width")
                    .and_then(|w| w.parse::<usize>().ok())
                {
                    gutter_width = w;
                }
                let width = gutter_width.max(label.len());
                spans.push(Span::styled(
                    format!("{label:>width$} │ "),
                    Style::default().fg(Color::DarkGray),
                ));
            }

            let start = line.span.start;
            let end = start + line.text.len();
            let mut cursor = 0;
            for mark in marks.iter().filter(|m| m.from >= start && m.from < end) {
                let DecorationKind::Mark {
                    end: mark_end,
                    style,
                    ..
                } = &mark.kind
                else {
                    continue;
                };
                let (from, to) = (mark.from - start, (*mark_end).min(end) - start);
                if from < cursor {
                    continue;
                }
                if let (Some(before), Some(token)) = (line.text.get(cursor..from), line.text.get(from..to))
                {
                    spans.push(Span::styled(before.to_string(), base));
                    let mut token_style = base;
                    if let Some(style) = style {
                        if let Some(color) = hex_color(style.color) {
                            token_style = token_style.fg(color);
                        }
                        if style.bold {
                            token_style = token_style.add_modifier(Modifier::BOLD);
                        }
                        if style.italic {
                            token_style = token_style.add_modifier(Modifier::ITALIC);
                        }
                    }
                    spans.push(Span::styled(token.to_string(), token_style));
                    cursor = to;
                }
            }
            spans.push(Span::styled(
                line.text.get(cursor..).unwrap_or_default().to_string(),
                base,
            ));
            out.push(Line::from(spans));
        }

        out
    }
}

fn header_line(header: &HeaderModel) -> Line<'static> {
    let lang_style = Style::default()
        .fg(hex_color(&header.lang_color).unwrap_or(Color::Gray))
        .add_modifier(Modifier::BOLD);
    let border = Style::default().fg(hex_color(&header.border_color).unwrap_or(Color::Gray));
    let mut spans = vec![Span::styled("▌ ", border)];
    if !header.label.is_empty() {
        spans.push(Span::styled(header.label.clone(), lang_style));
    }
    if !header.title.is_empty() {
        spans.push(Span::raw("  "));
        spans.push(Span::styled(
            header.title.clone(),
            Style::default().fg(hex_color(&header.title_color).unwrap_or(Color::White)),
        ));
    }
    Line::from(spans)
}

/// `#rrggbb` to a terminal color.
fn hex_color(value: &str) -> Option<Color> {
    let hex = value.strip_prefix('#')?;
    if hex.len() != 6 {
        return None;
    }
    let channel = |i: usize| u8::from_str_radix(hex.get(i..i + 2)?, 16).ok();
    Some(Color::Rgb(channel(0)?, channel(2)?, channel(4)?))
}

/// Renders one file to decorated HTML on stdout.
fn render_file(file: &Path, settings: Settings) -> Result<()> {
    let text = std::fs::read_to_string(file)
        .with_context(|| format!("Failed to read {}", file.display()))?;
    let root_dir = file.parent().unwrap_or(Path::new("."));
    let source = FsSource::new(root_dir);
    let relative = source
        .relative(file)
        .context("File path is not valid UTF-8")?;
    let source_ctx = SourceContext {
        provider: &source,
        path: Some(relative.as_relative_path()),
    };

    let mut ctx = PluginContext::activate(settings);
    let mut rendered = render_markdown(&text, RenderOptions::default());
    let outcomes =
        ctx.with_env(|env| decorate_all(&mut rendered.dom, rendered.root, env, Some(&source_ctx)));
    log::info!("Processed {} code blocks in {}", outcomes.len(), file.display());

    let head = rendered.dom.create_element("head");
    ctx.install_styles(&mut rendered.dom, head);
    println!("{}", encode::html(&rendered.dom, head));
    println!("{}", rendered.html());
    ctx.deactivate(Some(&mut rendered.dom));
    Ok(())
}

fn main() -> Result<()> {
    env_logger::Builder::from_default_env()
        .filter_level(log::LevelFilter::Info)
        .init();

    let args: Vec<String> = env::args().collect();
    let config_path = Settings::config_path();

    let settings = match Settings::load() {
        Ok(settings) => settings.unwrap_or_default(),
        Err(e) => {
            eprintln!("Error: Failed to load config file: {e}");
            process::exit(1);
        }
    };

    if args.len() == 3 && args[1] == "render" {
        return render_file(Path::new(&args[2]), settings);
    }

    let notes_path;
    let from_config;

    if args.len() == 2 {
        // CLI argument provided - use it
        notes_path = PathBuf::from(&args[1]);
        from_config = false;
    } else if args.len() == 1 {
        // No CLI argument - try config file
        match settings.notes_path.clone() {
            Some(path) => {
                notes_path = path;
                from_config = true;
            }
            None => {
                eprintln!("Error: No notes path provided and none configured");
                eprintln!("Usage: {} <notes-folder-path>", args[0]);
                eprintln!("Or set notes_path in {}", config_path.display());
                process::exit(1);
            }
        }
    } else {
        eprintln!("Usage: {} [notes-folder-path]", args[0]);
        eprintln!("       {} render <file.md>", args[0]);
        process::exit(1);
    };

    if let Err(e) = io::validate_notes_dir(&notes_path) {
        let source = if from_config {
            format!(" from config file '{}'", config_path.display())
        } else {
            String::new()
        };
        eprintln!(
            "Error: Notes path '{}'{} is invalid: {e}",
            notes_path.display(),
            source
        );
        process::exit(1);
    }

    // Setup terminal
    enable_raw_mode()?;
    let mut stdout = stdout();
    execute!(stdout, EnterAlternateScreen, EnableMouseCapture)?;
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;

    let res = App::new(notes_path, settings).and_then(|mut app| run_app(&mut terminal, &mut app));

    // Restore terminal
    disable_raw_mode()?;
    execute!(
        terminal.backend_mut(),
        LeaveAlternateScreen,
        DisableMouseCapture
    )?;
    terminal.show_cursor()?;

    if let Err(err) = res {
        println!("{err:?}");
    }

    Ok(())
}

fn run_app(terminal: &mut Terminal<CrosstermBackend<Stdout>>, app: &mut App) -> Result<()> {
    loop {
        let height = usize::from(terminal.size()?.height.saturating_sub(6));
        if app.decorator.wants_refresh() {
            app.refresh(false, false);
        }
        terminal.draw(|f| ui(f, app))?;

        if let Event::Key(key) = event::read()? {
            match key.code {
                KeyCode::Char('q') => return Ok(()),
                KeyCode::Down | KeyCode::Char('j') => app.next_file(),
                KeyCode::Up | KeyCode::Char('k') => app.previous_file(),
                KeyCode::PageDown | KeyCode::Char('J') => {
                    app.scroll_by(height.max(1) as isize / 2, height)
                }
                KeyCode::PageUp | KeyCode::Char('K') => {
                    app.scroll_by(-(height.max(1) as isize / 2), height)
                }
                KeyCode::Char('h') => app.toggle_highlighting(),
                KeyCode::Char('t') => app.cycle_theme(),
                KeyCode::Char('r') => app.reload(),
                _ => {}
            }
        }
    }
}

fn ui(f: &mut Frame, app: &mut App) {
    let rows = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Min(0), Constraint::Length(2)].as_ref())
        .split(f.area());
    let chunks = Layout::default()
        .direction(Direction::Horizontal)
        .margin(1)
        .constraints([Constraint::Percentage(25), Constraint::Percentage(75)].as_ref())
        .split(rows[0]);

    // File list panel
    let file_items: Vec<ListItem> = app
        .files
        .iter()
        .map(|path| ListItem::new(vec![Line::from(vec![Span::raw(format!("📄 {path}"))])]))
        .collect();

    let files_list = List::new(file_items)
        .block(Block::default().borders(Borders::ALL).title("Files"))
        .highlight_style(Style::default().bg(Color::Yellow).fg(Color::Black));

    f.render_stateful_widget(files_list, chunks[0], &mut app.file_list_state);

    // Content panel
    let content_text = if app.lines.is_empty() {
        vec![Line::from("Select a file to view its content")]
    } else {
        app.render_document()
    };
    let title = format!(
        "Content ({} decorations, theme {})",
        app.decorations.len(),
        app.ctx.highlighter().settings().theme
    );
    let content =
        Paragraph::new(content_text).block(Block::default().borders(Borders::ALL).title(title));

    f.render_widget(content, chunks[1]);

    let help_text = Line::from(vec![
        Span::raw("q: Quit | ↑/k ↓/j: File | PgUp/K PgDn/J: Scroll | "),
        Span::raw("h: Highlighting | t: Theme | r: Reload  "),
        Span::styled(app.status.clone(), Style::default().fg(Color::Cyan)),
    ]);

    f.render_widget(Paragraph::new(vec![help_text]), rows[1]);
}
