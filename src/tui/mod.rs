// TUI module for rendering the terminal interface
pub mod colors;
pub mod helpers;
pub mod input;

// Re-exports
pub use colors::*;
pub use helpers::{calculate_progress, folder_label, truncate};
pub use input::{handle_key_event, handle_prompt_input, KeyAction, PromptAction};

use crate::decode::DecodedImage;
use crate::domain::KeyBindMap;
use crate::preview;
use crate::viewer::{CurrentView, ImageState, Progress};
use ratatui::{
    layout::{Alignment, Constraint, Direction, Layout, Rect},
    style::{Modifier, Style},
    text::{Line, Span},
    widgets::{Block, BorderType, Borders, Clear, Gauge, Paragraph, Wrap},
    Frame,
};
use std::path::Path;
use std::sync::Arc;

/// UI view state
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ViewState {
    /// Main image browsing view
    Browsing,
    /// Help overlay visible
    Help,
    /// Key bind overlay visible
    KeyBinds,
    /// Typing the path of another folder
    FolderPrompt,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatusKind {
    Info,
    Error,
}

/// One-line message shown above the footer until the next action
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StatusMessage {
    pub text: String,
    pub kind: StatusKind,
}

impl StatusMessage {
    pub fn info(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            kind: StatusKind::Info,
        }
    }

    pub fn error(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            kind: StatusKind::Error,
        }
    }
}

/// Everything one frame shows
#[derive(Debug, Clone, Copy)]
pub struct Screen<'a> {
    pub folder: Option<&'a Path>,
    pub view: Option<&'a CurrentView>,
    pub progress: Option<&'a Progress>,
    pub caching: bool,
    pub status: Option<&'a StatusMessage>,
}

/// Half-block rendering of the last image drawn, reused while neither the image nor the
/// area changes
#[derive(Default)]
pub struct RenderCache {
    key: Option<(usize, u16, u16)>,
    lines: Vec<Line<'static>>,
}

impl RenderCache {
    pub fn new() -> Self {
        Self::default()
    }

    fn lines_for(&mut self, image: &Arc<DecodedImage>, cols: u16, rows: u16) -> &[Line<'static>] {
        let key = (Arc::as_ptr(image) as usize, cols, rows);
        if self.key != Some(key) {
            self.lines = preview::render_to_fit(image, cols, rows);
            self.key = Some(key);
        }
        &self.lines
    }
}

/// Renders the browsing view
pub fn render(frame: &mut Frame, screen: &Screen, cache: &mut RenderCache) {
    let gauge_height = if screen.progress.is_some() { 3 } else { 0 };
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(4),            // Header
            Constraint::Length(gauge_height), // Prefetch gauge
            Constraint::Min(0),               // Image
            Constraint::Length(1),            // Status
            Constraint::Length(3),            // Footer
        ])
        .split(frame.area());

    render_header(frame, chunks[0], screen);
    if let Some(progress) = screen.progress {
        render_gauge(frame, chunks[1], progress);
    }
    render_content(frame, chunks[2], screen, cache);
    render_status(frame, chunks[3], screen.status);
    render_footer(frame, chunks[4], screen.caching);
}

fn render_header(frame: &mut Frame, area: Rect, screen: &Screen) {
    let folder = screen
        .folder
        .map(|p| p.display().to_string())
        .unwrap_or_else(|| "no folder".to_string());

    let (title_text, info) = match screen.view {
        Some(view) => (
            format!(" Image {}/{} ", view.index + 1, view.total),
            vec![
                Span::styled(
                    view.name.clone(),
                    Style::default()
                        .fg(TEXT_PRIMARY)
                        .add_modifier(Modifier::BOLD),
                ),
                Span::raw("  "),
                Span::styled(
                    format!("in {}", folder_label(&view.folder)),
                    Style::default().fg(ACCENT_SECONDARY),
                ),
            ],
        ),
        None => (
            " Picsort ".to_string(),
            vec![Span::styled(
                "No images to show",
                Style::default().fg(TEXT_SECONDARY),
            )],
        ),
    };

    let title_line = Line::from(vec![
        Span::styled(
            title_text,
            Style::default()
                .fg(ACCENT_HIGHLIGHT)
                .add_modifier(Modifier::BOLD),
        ),
        Span::styled(
            truncate(&folder, area.width.saturating_sub(20) as usize),
            Style::default().fg(TEXT_SECONDARY),
        ),
    ]);

    let header = Paragraph::new(vec![title_line, Line::from(info)])
        .block(
            Block::default()
                .borders(Borders::ALL)
                .border_type(BorderType::Rounded)
                .border_style(Style::default().fg(BORDER_COLOR)),
        )
        .alignment(Alignment::Left);

    frame.render_widget(header, area);
}

fn render_gauge(frame: &mut Frame, area: Rect, progress: &Progress) {
    let ratio = calculate_progress(progress.processed, progress.total);
    let gauge = Gauge::default()
        .block(
            Block::default()
                .title(" Caching ")
                .borders(Borders::ALL)
                .border_type(BorderType::Rounded)
                .border_style(Style::default().fg(BORDER_COLOR)),
        )
        .gauge_style(Style::default().fg(ACCENT_SECONDARY).bg(BG_DARK))
        .ratio(ratio)
        .label(format!(
            "{}/{} {}",
            progress.processed, progress.total, progress.name
        ));

    frame.render_widget(gauge, area);
}

fn render_content(frame: &mut Frame, area: Rect, screen: &Screen, cache: &mut RenderCache) {
    let Some(view) = screen.view else {
        frame.render_widget(render_empty_state_widget(), area);
        return;
    };

    let block = Block::default()
        .borders(Borders::ALL)
        .border_type(BorderType::Rounded)
        .border_style(Style::default().fg(BORDER_COLOR))
        .title(format!(" {} ", view.name));
    let inner = block.inner(area);

    match &view.image {
        ImageState::Ready(image) => {
            let lines = cache.lines_for(image, inner.width, inner.height).to_vec();
            let paragraph = Paragraph::new(lines)
                .block(block)
                .alignment(Alignment::Center);
            frame.render_widget(paragraph, area);
        }
        ImageState::Loading => {
            let paragraph = Paragraph::new(vec![
                Line::from(""),
                Line::from(Span::styled(
                    "Loading...",
                    Style::default()
                        .fg(TEXT_SECONDARY)
                        .add_modifier(Modifier::ITALIC),
                )),
            ])
            .block(block)
            .alignment(Alignment::Center);
            frame.render_widget(paragraph, area);
        }
        ImageState::Unavailable => {
            let paragraph = Paragraph::new(vec![
                Line::from(""),
                Line::from(Span::styled(
                    "[!] Could not decode this image",
                    Style::default()
                        .fg(ACCENT_PRIMARY)
                        .add_modifier(Modifier::BOLD),
                )),
                Line::from(""),
                Line::from(Span::styled(
                    "It can still be moved with a bound key.",
                    Style::default().fg(TEXT_SECONDARY),
                )),
            ])
            .block(block.border_style(Style::default().fg(ACCENT_PRIMARY)))
            .alignment(Alignment::Center)
            .wrap(Wrap { trim: false });
            frame.render_widget(paragraph, area);
        }
    }
}

/// Creates an empty state widget for when the folder holds no images
fn render_empty_state_widget() -> Paragraph<'static> {
    let lines = vec![
        Line::from(""),
        Line::from(""),
        Line::from(Span::styled(
            "No Images Found",
            Style::default()
                .fg(ACCENT_HIGHLIGHT)
                .add_modifier(Modifier::BOLD),
        )),
        Line::from(""),
        Line::from(Span::styled(
            "The folder holds no png, jpg, gif, bmp or webp files.",
            Style::default().fg(TEXT_SECONDARY),
        )),
        Line::from(""),
        Line::from(Span::styled(
            "Press f to open another folder.",
            Style::default().fg(TEXT_SECONDARY),
        )),
    ];

    Paragraph::new(lines)
        .block(
            Block::default()
                .borders(Borders::ALL)
                .border_type(BorderType::Rounded)
                .border_style(Style::default().fg(BORDER_COLOR))
                .title(" Image "),
        )
        .alignment(Alignment::Center)
}

fn render_status(frame: &mut Frame, area: Rect, status: Option<&StatusMessage>) {
    let Some(status) = status else {
        return;
    };
    let color = match status.kind {
        StatusKind::Info => ACCENT_SECONDARY,
        StatusKind::Error => ACCENT_PRIMARY,
    };
    let line = Paragraph::new(Line::from(Span::styled(
        format!(" {}", status.text),
        Style::default().fg(color),
    )));
    frame.render_widget(line, area);
}

fn render_footer(frame: &mut Frame, area: Rect, caching: bool) {
    let cache_label = if caching { "Cache on" } else { "Cache off" };
    let controls = Line::from(vec![
        Span::styled(
            " ←→ ",
            Style::default()
                .fg(ACCENT_HIGHLIGHT)
                .add_modifier(Modifier::BOLD),
        ),
        Span::styled("Browse", Style::default().fg(TEXT_SECONDARY)),
        Span::raw("  │  "),
        Span::styled("Tab ", Style::default().fg(ACCENT_SECONDARY)),
        Span::styled("Binds", Style::default().fg(TEXT_SECONDARY)),
        Span::raw("  │  "),
        Span::styled("f ", Style::default().fg(TEXT_SECONDARY)),
        Span::styled("Folder", Style::default().fg(TEXT_SECONDARY)),
        Span::raw("  │  "),
        Span::styled("c ", Style::default().fg(TEXT_SECONDARY)),
        Span::styled(cache_label, Style::default().fg(TEXT_SECONDARY)),
        Span::raw("  │  "),
        Span::styled("? ", Style::default().fg(TEXT_SECONDARY)),
        Span::styled("Help", Style::default().fg(TEXT_SECONDARY)),
        Span::raw("  │  "),
        Span::styled("Esc ", Style::default().fg(TEXT_SECONDARY)),
        Span::styled("Quit", Style::default().fg(TEXT_SECONDARY)),
    ]);

    let footer = Paragraph::new(controls)
        .block(
            Block::default()
                .borders(Borders::ALL)
                .border_type(BorderType::Rounded)
                .border_style(Style::default().fg(BORDER_COLOR)),
        )
        .alignment(Alignment::Center);

    frame.render_widget(footer, area);
}

fn overlay_block(title: &str) -> Block<'_> {
    Block::default()
        .title(title)
        .title_alignment(Alignment::Center)
        .borders(Borders::ALL)
        .border_type(BorderType::Rounded)
        .border_style(Style::default().fg(ACCENT_HIGHLIGHT))
        .style(Style::default().bg(BG_DARK))
}

fn shortcut(keys: &str, description: &str) -> Line<'static> {
    Line::from(vec![
        Span::styled(format!("  {:<10}", keys), Style::default().fg(ACCENT_SECONDARY)),
        Span::raw(description.to_string()),
    ])
}

/// Renders the help overlay
pub fn render_help_overlay(frame: &mut Frame) {
    let help_area = centered_rect(60, 70, frame.area());
    frame.render_widget(Clear, help_area);

    let block = overlay_block(" Help ");
    let inner = block.inner(help_area);
    frame.render_widget(block, help_area);

    let help_lines = vec![
        Line::from(""),
        Line::from(Span::styled(
            "Keyboard Shortcuts",
            Style::default()
                .fg(ACCENT_HIGHLIGHT)
                .add_modifier(Modifier::BOLD),
        )),
        Line::from(""),
        shortcut("→ ↓ Space", "Next image"),
        shortcut("← ↑ Bksp", "Previous image"),
        shortcut("bound key", "Move image to its folder"),
        Line::from(""),
        shortcut("Tab", "Show key binds"),
        shortcut("f", "Open another folder"),
        shortcut("c", "Toggle background caching"),
        shortcut("o / Enter", "Open in system viewer"),
        Line::from(""),
        shortcut("q / Esc", "Quit"),
        shortcut("?", "Toggle help"),
        Line::from(""),
        Line::from(Span::styled(
            "Bound keys take precedence over q, c, f and o.",
            Style::default().fg(TEXT_SECONDARY),
        )),
        Line::from(Span::styled(
            "Press ? or Esc to close",
            Style::default().fg(TEXT_SECONDARY),
        )),
    ];

    let paragraph = Paragraph::new(help_lines)
        .alignment(Alignment::Left)
        .style(Style::default().fg(TEXT_PRIMARY));

    frame.render_widget(paragraph, inner);
}

/// Renders the key bind overlay
pub fn render_keybinds_overlay(frame: &mut Frame, binds: &KeyBindMap) {
    let area = centered_rect(50, 60, frame.area());
    frame.render_widget(Clear, area);

    let block = overlay_block(" Key Binds ");
    let inner = block.inner(area);
    frame.render_widget(block, area);

    let mut lines = vec![Line::from("")];
    if binds.is_empty() {
        lines.push(Line::from(Span::styled(
            "No keys bound yet.",
            Style::default().fg(TEXT_SECONDARY),
        )));
        lines.push(Line::from(""));
        lines.push(Line::from(Span::styled(
            "Run picsort --bind k=Keep to add one.",
            Style::default().fg(TEXT_SECONDARY),
        )));
    } else {
        for bind in binds.iter() {
            lines.push(Line::from(vec![
                Span::styled(
                    format!("  {}  ", bind.key),
                    Style::default()
                        .fg(ACCENT_SECONDARY)
                        .add_modifier(Modifier::BOLD),
                ),
                Span::raw("→ "),
                Span::styled(folder_label(&bind.folder).to_string(), Style::default().fg(TEXT_PRIMARY)),
            ]));
        }
    }
    lines.push(Line::from(""));
    lines.push(Line::from(Span::styled(
        "Press Tab or Esc to close",
        Style::default().fg(TEXT_SECONDARY),
    )));

    let paragraph = Paragraph::new(lines)
        .alignment(Alignment::Left)
        .style(Style::default().fg(TEXT_PRIMARY));

    frame.render_widget(paragraph, inner);
}

/// Renders the prompt for the folder to open next
pub fn render_folder_prompt(frame: &mut Frame, input: &str) {
    let area = centered_rect(70, 30, frame.area());
    frame.render_widget(Clear, area);

    let block = overlay_block(" Open Folder ");
    let inner = block.inner(area);
    frame.render_widget(block, area);

    let lines = vec![
        Line::from(""),
        Line::from(vec![
            Span::styled("  Path: ", Style::default().fg(TEXT_SECONDARY)),
            Span::styled(
                format!("{}_", input),
                Style::default()
                    .fg(TEXT_PRIMARY)
                    .add_modifier(Modifier::BOLD),
            ),
        ]),
        Line::from(""),
        Line::from(vec![
            Span::styled("[Enter]", Style::default().fg(ACCENT_SECONDARY)),
            Span::raw(" open  "),
            Span::styled("[Esc]", Style::default().fg(ACCENT_PRIMARY)),
            Span::raw(" cancel"),
        ]),
    ];

    let paragraph = Paragraph::new(lines)
        .alignment(Alignment::Left)
        .style(Style::default().fg(TEXT_PRIMARY))
        .wrap(Wrap { trim: false });

    frame.render_widget(paragraph, inner);
}

/// Helper to create a centered rect
fn centered_rect(percent_x: u16, percent_y: u16, r: Rect) -> Rect {
    let popup_layout = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Percentage((100 - percent_y) / 2),
            Constraint::Percentage(percent_y),
            Constraint::Percentage((100 - percent_y) / 2),
        ])
        .split(r);

    Layout::default()
        .direction(Direction::Horizontal)
        .constraints([
            Constraint::Percentage((100 - percent_x) / 2),
            Constraint::Percentage(percent_x),
            Constraint::Percentage((100 - percent_x) / 2),
        ])
        .split(popup_layout[1])[1]
}
