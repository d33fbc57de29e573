//! Terminal rendering for streamed answers.
//!
//! While an answer streams, [`LiveAnswer`] prints the raw text as it grows.
//! Once the exchange completes, [`ChatRenderer::finish_live`] erases the raw
//! text (when it still fits on screen) and prints the answer again as
//! markdown, with `termimad` for prose and `syntect` for fenced code.

use std::io::Write;

use console::style;
use crossterm::style::Color;
use crossterm::{cursor, execute, terminal};
use syntect::easy::HighlightLines;
use syntect::highlighting::{Style, ThemeSet};
use syntect::parsing::SyntaxSet;
use syntect::util::as_24_bit_terminal_escaped;
use termimad::MadSkin;

use sme_types::conversation::SourceRef;

pub struct ChatRenderer {
    skin: MadSkin,
    syntax_set: SyntaxSet,
    theme_set: ThemeSet,
}

impl ChatRenderer {
    pub fn new(accent_color: Option<Color>) -> Self {
        let mut skin = MadSkin::default_dark();

        if let Some(color) = accent_color {
            let tc = Self::crossterm_to_termimad(color);
            skin.bold.set_fg(tc);
            skin.headers[0].set_fg(tc);
            skin.headers[1].set_fg(tc);
        }
        skin.inline_code
            .set_fg(termimad::crossterm::style::Color::Yellow);

        Self {
            skin,
            syntax_set: SyntaxSet::load_defaults_newlines(),
            theme_set: ThemeSet::load_defaults(),
        }
    }

    /// Render markdown, highlighting fenced code blocks.
    ///
    /// Consecutive prose lines are rendered together so lists and tables
    /// keep their layout. An unclosed fence is highlighted up to the end.
    pub fn render_markdown(&self, markdown: &str) -> String {
        let mut output = String::new();
        let mut prose = String::new();
        let mut code: Option<(String, String)> = None;

        for line in markdown.lines() {
            let is_fence = line.trim_start().starts_with("```");
            match code.take() {
                Some((lang, buf)) if is_fence => {
                    output.push_str(&self.highlight_code(&buf, &lang));
                }
                Some((lang, mut buf)) => {
                    buf.push_str(line);
                    buf.push('\n');
                    code = Some((lang, buf));
                }
                None if is_fence => {
                    self.flush_prose(&mut prose, &mut output);
                    let lang = line.trim_start().trim_start_matches('`').trim().to_string();
                    code = Some((lang, String::new()));
                }
                None => {
                    prose.push_str(line);
                    prose.push('\n');
                }
            }
        }

        if let Some((lang, buf)) = code {
            if !buf.is_empty() {
                output.push_str(&self.highlight_code(&buf, &lang));
            }
        }
        self.flush_prose(&mut prose, &mut output);

        output
    }

    /// Replace the raw streamed text with the rendered final answer.
    ///
    /// Falls back to leaving the raw text in place when stdout is not a
    /// terminal or the text has scrolled off screen; in that case the
    /// rendered copy is only printed if the raw text is incomplete.
    pub fn finish_live(&self, live: &LiveAnswer, final_text: &str) {
        let rendered = self.render_markdown(final_text);

        if !live.is_started() {
            println!();
            println!("{}", live.label_line());
            print_indented(&rendered);
            return;
        }

        let term = console::Term::stdout();
        let erased = term.is_term() && Self::erase_live(live);
        if erased {
            println!("{}", live.label_line());
            print_indented(&rendered);
        } else {
            println!();
            if live.printed() != final_text {
                print_indented(&rendered);
            }
        }
    }

    fn erase_live(live: &LiveAnswer) -> bool {
        let Ok((width, height)) = terminal::size() else {
            return false;
        };
        let rows = live.rows(usize::from(width));
        if rows == 0 || rows >= usize::from(height) {
            return false;
        }

        let mut stdout = std::io::stdout();
        let up = (rows - 1) as u16;
        let moved = if up == 0 {
            execute!(stdout, cursor::MoveToColumn(0))
        } else {
            execute!(stdout, cursor::MoveToPreviousLine(up))
        };
        moved.is_ok()
            && execute!(stdout, terminal::Clear(terminal::ClearType::FromCursorDown)).is_ok()
    }

    /// Print the numbered source list under an answer.
    pub fn print_sources(&self, sources: &[SourceRef]) {
        if sources.is_empty() {
            return;
        }
        println!();
        println!("  {}", style("Sources").bold());
        for line in source_lines(sources) {
            println!("  {}", style(line).dim());
        }
    }

    fn flush_prose(&self, prose: &mut String, output: &mut String) {
        if prose.trim().is_empty() {
            prose.clear();
            return;
        }
        output.push_str(&format!("{}", self.skin.term_text(prose)));
        prose.clear();
    }

    fn highlight_code(&self, code: &str, lang: &str) -> String {
        let syntax = if lang.is_empty() {
            self.syntax_set.find_syntax_plain_text()
        } else {
            self.syntax_set
                .find_syntax_by_token(lang)
                .unwrap_or_else(|| self.syntax_set.find_syntax_plain_text())
        };

        let mut output = String::new();
        output.push_str(&format!("{}\n", style(format!("--- {lang} ---")).dim()));

        let Some(theme) = self.theme_set.themes.get("base16-ocean.dark") else {
            output.push_str(code);
            return output;
        };
        let mut h = HighlightLines::new(syntax, theme);
        for line in code.lines() {
            let ranges: Vec<(Style, &str)> = h
                .highlight_line(line, &self.syntax_set)
                .unwrap_or_default();
            let escaped = as_24_bit_terminal_escaped(&ranges[..], false);
            output.push_str(&format!("{escaped}\x1b[0m\n"));
        }

        output
    }

    fn crossterm_to_termimad(color: Color) -> termimad::crossterm::style::Color {
        match color {
            Color::Cyan => termimad::crossterm::style::Color::Cyan,
            Color::Green => termimad::crossterm::style::Color::Green,
            Color::Yellow => termimad::crossterm::style::Color::Yellow,
            Color::Magenta => termimad::crossterm::style::Color::Magenta,
            Color::Blue => termimad::crossterm::style::Color::Blue,
            Color::Rgb { r, g, b } => termimad::crossterm::style::Color::Rgb { r, g, b },
            _ => termimad::crossterm::style::Color::Cyan,
        }
    }
}

/// Raw view of an answer that is still streaming.
///
/// The store reports the full accumulated text on every update; only the
/// part not yet on screen is printed.
pub struct LiveAnswer {
    label: String,
    printed: String,
    started: bool,
}

impl LiveAnswer {
    pub fn new(label: impl Into<String>) -> Self {
        Self {
            label: label.into(),
            printed: String::new(),
            started: false,
        }
    }

    pub fn is_started(&self) -> bool {
        self.started
    }

    pub fn printed(&self) -> &str {
        &self.printed
    }

    /// Show `content`, the full answer so far.
    pub fn update(&mut self, content: &str) {
        let Some(suffix) = self.unseen_suffix(content) else {
            tracing::debug!("streamed text diverged from what is on screen");
            return;
        };
        if suffix.is_empty() {
            return;
        }
        if !self.started {
            self.started = true;
            print!("\n{}", self.label_line());
        }
        print!("{suffix}");
        let _ = std::io::stdout().flush();
        self.printed.push_str(suffix);
    }

    fn unseen_suffix<'a>(&self, content: &'a str) -> Option<&'a str> {
        content.strip_prefix(self.printed.as_str())
    }

    fn label_line(&self) -> String {
        format!("  {} ", style(&self.label).cyan().bold())
    }

    /// Terminal rows occupied by the label and streamed text at `width` columns.
    pub fn rows(&self, width: usize) -> usize {
        if !self.started || width == 0 {
            return 0;
        }
        let text = format!("  {} {}", self.label, self.printed);
        text.split('\n')
            .map(|line| console::measure_text_width(line).div_ceil(width).max(1))
            .sum()
    }
}

fn print_indented(rendered: &str) {
    for line in rendered.trim_end().lines() {
        println!("  {line}");
    }
}

/// One `[n] title (kind) url` line per source.
pub fn source_lines(sources: &[SourceRef]) -> Vec<String> {
    sources
        .iter()
        .enumerate()
        .map(|(idx, source)| {
            let number = if source.id.is_empty() {
                (idx + 1).to_string()
            } else {
                source.id.clone()
            };
            let mut line = format!("[{number}] {} ({})", source.title, source.source_type);
            if let Some(url) = &source.url {
                line.push(' ');
                line.push_str(url);
            }
            line
        })
        .collect()
}
