use crate::app::{InputMode, InputState};
use crate::audio::{AudioEngine, MAX_VOLUME};
use crate::core::{Pane, PlayerCore};
use crate::library::BrowserEntryKind;
use ratatui::prelude::*;
use ratatui::widgets::{Block, Borders, List, ListItem, ListState, Paragraph, Wrap};
use std::time::Duration;

const APP_TITLE: &str = "superspoty  ";

struct Palette {
    bg: Color,
    panel_bg: Color,
    panel_alt_bg: Color,
    border: Color,
    focus_border: Color,
    text: Color,
    muted: Color,
    accent: Color,
    alert: Color,
    selected_bg: Color,
}

const PALETTE: Palette = Palette {
    bg: Color::Rgb(18, 18, 18),
    panel_bg: Color::Rgb(24, 24, 24),
    panel_alt_bg: Color::Rgb(33, 33, 33),
    border: Color::Rgb(83, 83, 83),
    focus_border: Color::Rgb(29, 185, 84),
    text: Color::Rgb(255, 255, 255),
    muted: Color::Rgb(179, 179, 179),
    accent: Color::Rgb(29, 185, 84),
    alert: Color::Rgb(245, 155, 35),
    selected_bg: Color::Rgb(40, 40, 40),
};

/// Screen areas of the selectable panes, used for mouse hit testing.
#[derive(Debug, Clone, Copy, Default)]
pub struct PaneRects {
    pub browser: Rect,
    pub tracks: Rect,
    pub playlists: Rect,
    pub info: Rect,
}

fn rows(area: Rect) -> std::rc::Rc<[Rect]> {
    Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(3),
            Constraint::Min(8),
            Constraint::Length(3),
            Constraint::Length(3),
        ])
        .split(area)
}

pub fn pane_rects(area: Rect) -> PaneRects {
    let vertical = rows(area);
    let body = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([
            Constraint::Percentage(30),
            Constraint::Percentage(45),
            Constraint::Percentage(25),
        ])
        .split(vertical[1]);
    let left = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Percentage(65), Constraint::Percentage(35)])
        .split(body[0]);

    PaneRects {
        browser: left[0],
        tracks: body[1],
        playlists: left[1],
        info: body[2],
    }
}

pub fn draw(frame: &mut Frame, core: &PlayerCore, audio: &dyn AudioEngine, input: &InputState) {
    let colors = &PALETTE;
    frame.render_widget(
        Block::default().style(Style::default().bg(colors.bg)),
        frame.area(),
    );

    let vertical = rows(frame.area());
    let rects = pane_rects(frame.area());
    let display = core.sequencer.display();

    let header = Paragraph::new(Line::from(vec![
        Span::styled(
            APP_TITLE,
            Style::default()
                .fg(colors.accent)
                .add_modifier(Modifier::BOLD),
        ),
        Span::styled(
            format!("{} ", display.play_symbol),
            Style::default().fg(colors.text).add_modifier(Modifier::BOLD),
        ),
        Span::styled(
            format!("Track {}", display.position),
            Style::default().fg(colors.text),
        ),
        Span::styled("  |  ", Style::default().fg(colors.muted)),
        Span::styled(display.shuffle_label, Style::default().fg(colors.alert)),
        Span::styled("  |  ", Style::default().fg(colors.muted)),
        Span::styled(display.repeat_label, Style::default().fg(colors.alert)),
    ]))
    .block(panel_block("Player", colors.panel_bg, colors.border));
    frame.render_widget(header, vertical[0]);

    draw_browser(frame, core, rects.browser);
    draw_playlists(frame, core, rects.playlists);
    draw_tracks(frame, core, rects.tracks);
    draw_info(frame, core, audio, rects.info);

    let timeline = Paragraph::new(Span::styled(
        timeline_line(audio, 30, 12),
        Style::default().fg(colors.text),
    ))
    .block(panel_block("Timeline", colors.panel_bg, colors.border))
    .wrap(Wrap { trim: true });
    frame.render_widget(timeline, vertical[2]);

    frame.render_widget(footer(core, input), vertical[3]);
}

fn border_for(core: &PlayerCore, pane: Pane) -> Color {
    if core.focus == pane {
        PALETTE.focus_border
    } else {
        PALETTE.border
    }
}

fn highlighted(list: List<'_>) -> List<'_> {
    list.highlight_style(
        Style::default()
            .bg(PALETTE.selected_bg)
            .fg(Color::White)
            .add_modifier(Modifier::BOLD),
    )
    .highlight_symbol("-> ")
}

fn draw_browser(frame: &mut Frame, core: &PlayerCore, area: Rect) {
    let colors = &PALETTE;
    let items: Vec<ListItem> = core
        .browser_entries
        .iter()
        .map(|entry| {
            let style = match entry.kind {
                BrowserEntryKind::Parent => Style::default().fg(colors.alert),
                BrowserEntryKind::Folder => Style::default().fg(colors.accent),
                BrowserEntryKind::Track => Style::default().fg(colors.text),
            };
            ListItem::new(Span::styled(entry.label.as_str(), style))
        })
        .collect();

    let mut state = ListState::default();
    state.select((!core.browser_entries.is_empty()).then_some(core.selected_browser));

    let title = format!("Browse / {}", core.browser_dir.display());
    let list = highlighted(List::new(items).block(panel_block(
        &title,
        colors.panel_bg,
        border_for(core, Pane::Browser),
    )));
    frame.render_stateful_widget(list, area, &mut state);
}

fn draw_playlists(frame: &mut Frame, core: &PlayerCore, area: Rect) {
    let colors = &PALETTE;
    let items: Vec<ListItem> = core
        .playlists
        .iter()
        .map(|playlist| {
            ListItem::new(Line::from(vec![
                Span::styled(playlist.name.as_str(), Style::default().fg(colors.text)),
                Span::styled(
                    format!("  ({})", playlist.songs.len()),
                    Style::default().fg(colors.muted),
                ),
            ]))
        })
        .collect();

    let mut state = ListState::default();
    state.select((!core.playlists.is_empty()).then_some(core.selected_playlist));

    let list = highlighted(List::new(items).block(panel_block(
        "Playlists",
        colors.panel_bg,
        border_for(core, Pane::Playlists),
    )));
    frame.render_stateful_widget(list, area, &mut state);
}

fn draw_tracks(frame: &mut Frame, core: &PlayerCore, area: Rect) {
    let colors = &PALETTE;
    let current = core.sequencer.current_index();
    let items: Vec<ListItem> = core
        .filtered
        .iter()
        .filter_map(|&idx| core.tracks.get(idx).map(|track| (idx, track)))
        .map(|(idx, track)| {
            let is_current = current == Some(idx);
            let marker = if is_current { "> " } else { "  " };
            let style = if is_current {
                Style::default().fg(colors.accent)
            } else {
                Style::default().fg(colors.text)
            };
            ListItem::new(Line::from(vec![
                Span::styled(marker, Style::default().fg(colors.accent)),
                Span::styled(track.label(), style),
            ]))
        })
        .collect();

    let mut state = ListState::default();
    state.select((!core.filtered.is_empty()).then_some(core.selected_track));

    let title = if core.search_query.trim().is_empty() {
        format!("Tracks ({})", core.tracks.len())
    } else {
        format!(
            "Tracks ({}/{}) matching \"{}\"",
            core.filtered.len(),
            core.tracks.len(),
            core.search_query
        )
    };
    let list = highlighted(List::new(items).block(panel_block(
        &title,
        colors.panel_bg,
        border_for(core, Pane::Tracks),
    )));
    frame.render_stateful_widget(list, area, &mut state);
}

fn draw_info(frame: &mut Frame, core: &PlayerCore, audio: &dyn AudioEngine, area: Rect) {
    let colors = &PALETTE;
    let now_playing = core.now_playing_for(audio.current_track());
    let title = now_playing.map_or("-", |track| track.title.as_str());
    let artist = now_playing
        .and_then(|track| track.artist.as_deref())
        .unwrap_or("-");
    let output = audio.output_name().unwrap_or_else(|| String::from("-"));

    let lines = vec![
        Line::from(Span::styled(
            "Now playing",
            Style::default()
                .fg(colors.accent)
                .add_modifier(Modifier::BOLD),
        )),
        Line::from(Span::styled(title, Style::default().fg(colors.text))),
        Line::from(Span::styled(
            format!("Artist  {artist}"),
            Style::default().fg(colors.muted),
        )),
        Line::from(""),
        Line::from(Span::styled(
            format!("Output  {output}"),
            Style::default().fg(colors.muted),
        )),
        Line::from(Span::styled(
            format!("Seek    {}s", core.seek_step_seconds),
            Style::default().fg(colors.muted),
        )),
    ];
    let info = Paragraph::new(lines)
        .block(panel_block("Song Info", colors.panel_alt_bg, colors.border))
        .wrap(Wrap { trim: true });
    frame.render_widget(info, area);
}

fn footer<'a>(core: &'a PlayerCore, input: &'a InputState) -> Paragraph<'a> {
    let colors = &PALETTE;
    let line = match input.mode {
        InputMode::Normal => Line::from(vec![
            Span::styled(
                "space play  n/p next/prev  s shuffle  r repeat  / search  w save  : cmd  q quit",
                Style::default().fg(colors.muted),
            ),
            Span::styled("  |  ", Style::default().fg(colors.muted)),
            Span::styled(core.status.as_str(), Style::default().fg(colors.text)),
        ]),
        mode => {
            let prompt = match mode {
                InputMode::Search => "Search: ",
                InputMode::SaveName => "Save playlist as: ",
                _ => ":",
            };
            Line::from(vec![
                Span::styled(prompt, Style::default().fg(colors.accent)),
                Span::styled(input.buffer.as_str(), Style::default().fg(colors.text)),
                Span::styled("_", Style::default().fg(colors.muted)),
            ])
        }
    };
    Paragraph::new(line).block(panel_block("Message", colors.panel_bg, colors.border))
}

fn panel_block(title: &str, bg: Color, border: Color) -> Block<'_> {
    Block::default()
        .borders(Borders::ALL)
        .title(Span::styled(
            format!(" {title} "),
            Style::default()
                .fg(PALETTE.text)
                .add_modifier(Modifier::BOLD),
        ))
        .border_style(Style::default().fg(border))
        .style(Style::default().bg(bg))
}

fn format_duration(duration: Duration) -> String {
    let total_seconds = duration.as_secs();
    let minutes = total_seconds / 60;
    let seconds = total_seconds % 60;
    format!("{minutes:02}:{seconds:02}")
}

fn progress_bar(ratio: Option<f64>, width: usize) -> String {
    let clamped = ratio.unwrap_or(0.0).clamp(0.0, 1.0);
    let filled = (clamped * width as f64).round() as usize;
    let mut bar = String::with_capacity(width + 2);
    bar.push('[');
    bar.push_str(&"#".repeat(filled));
    bar.push_str(&"-".repeat(width.saturating_sub(filled)));
    bar.push(']');
    bar
}

fn timeline_line(
    audio: &dyn AudioEngine,
    timeline_bar_width: usize,
    volume_bar_width: usize,
) -> String {
    let elapsed = audio.position().unwrap_or(Duration::ZERO);
    let total = audio.duration();
    let ratio = total.and_then(|duration| {
        let total_secs = duration.as_secs_f64();
        (total_secs > 0.0).then_some((elapsed.as_secs_f64() / total_secs).clamp(0.0, 1.0))
    });
    let volume = audio.volume();

    format!(
        "{} / {} {}  |  Vol {} {:>3}%  [ ] seek  +/- volume",
        format_duration(elapsed),
        total
            .map(format_duration)
            .unwrap_or_else(|| String::from("--:--")),
        progress_bar(ratio, timeline_bar_width),
        progress_bar(
            Some(f64::from(volume) / f64::from(MAX_VOLUME)),
            volume_bar_width
        ),
        volume
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn durations_render_as_minutes_and_seconds() {
        assert_eq!(format_duration(Duration::from_secs(0)), "00:00");
        assert_eq!(format_duration(Duration::from_secs(754)), "12:34");
    }

    #[test]
    fn progress_bar_clamps_ratio() {
        assert_eq!(progress_bar(Some(0.5), 4), "[##--]");
        assert_eq!(progress_bar(Some(3.0), 4), "[####]");
        assert_eq!(progress_bar(None, 2), "[--]");
    }

    #[test]
    fn pane_rects_do_not_overlap() {
        let rects = pane_rects(Rect::new(0, 0, 120, 40));
        assert!(!rects.browser.intersects(rects.tracks));
        assert!(!rects.browser.intersects(rects.playlists));
        assert!(!rects.tracks.intersects(rects.info));
        assert!(rects.browser.height > 0 && rects.playlists.height > 0);
    }
}
