//! Reply rendering for the terminal: raw text, or markdown turned into
//! ANSI-styled plain text.

use pulldown_cmark::{Event, Options, Parser, Tag, TagEnd};

use crate::config::RenderMode;

const BOLD: &str = "\x1b[1m";
const ITALIC: &str = "\x1b[3m";
const CODE: &str = "\x1b[36m";
const RESET: &str = "\x1b[0m";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Renderer {
    Plain,
    Markdown,
}

impl From<RenderMode> for Renderer {
    fn from(mode: RenderMode) -> Self {
        match mode {
            RenderMode::Plain => Renderer::Plain,
            RenderMode::Markdown => Renderer::Markdown,
        }
    }
}

impl Renderer {
    /// Whether partial text can be printed as it streams in.
    pub fn is_incremental(&self) -> bool {
        matches!(self, Renderer::Plain)
    }

    pub fn render(&self, text: &str) -> String {
        match self {
            Renderer::Plain => text.to_string(),
            Renderer::Markdown => markdown_to_terminal(text),
        }
    }
}

fn ensure_newline(out: &mut String) {
    if !out.is_empty() && !out.ends_with('\n') {
        out.push('\n');
    }
}

fn markdown_to_terminal(text: &str) -> String {
    let mut out = String::new();
    // Ordered lists carry their next number.
    let mut lists: Vec<Option<u64>> = Vec::new();
    // (url, offset in `out` where the link text starts)
    let mut links: Vec<(String, usize)> = Vec::new();
    let mut in_code_block = false;

    for event in Parser::new_ext(text, Options::ENABLE_STRIKETHROUGH | Options::ENABLE_TABLES) {
        match event {
            Event::Start(tag) => match tag {
                Tag::Heading { .. } | Tag::Strong => out.push_str(BOLD),
                Tag::Emphasis => out.push_str(ITALIC),
                Tag::CodeBlock(_) => {
                    ensure_newline(&mut out);
                    in_code_block = true;
                }
                Tag::List(start) => {
                    ensure_newline(&mut out);
                    lists.push(start);
                }
                Tag::Item => {
                    ensure_newline(&mut out);
                    out.push_str(&"  ".repeat(lists.len().saturating_sub(1)));
                    match lists.last_mut() {
                        Some(Some(n)) => {
                            out.push_str(&format!("{}. ", n));
                            *n += 1;
                        }
                        _ => out.push_str("- "),
                    }
                }
                Tag::Link { dest_url, .. } => links.push((dest_url.to_string(), out.len())),
                _ => {}
            },
            Event::End(tag) => match tag {
                TagEnd::Heading(_) => {
                    out.push_str(RESET);
                    out.push_str("\n\n");
                }
                TagEnd::Strong | TagEnd::Emphasis => out.push_str(RESET),
                TagEnd::Paragraph => {
                    out.push('\n');
                    if lists.is_empty() {
                        out.push('\n');
                    }
                }
                TagEnd::CodeBlock => {
                    in_code_block = false;
                    out.push('\n');
                }
                TagEnd::List(_) => {
                    lists.pop();
                    if lists.is_empty() {
                        ensure_newline(&mut out);
                        out.push('\n');
                    }
                }
                TagEnd::Item => ensure_newline(&mut out),
                TagEnd::Link => {
                    if let Some((url, start)) = links.pop() {
                        if out[start..] != url {
                            out.push_str(&format!(" ({})", url));
                        }
                    }
                }
                TagEnd::TableRow | TagEnd::TableHead => out.push('\n'),
                TagEnd::TableCell => out.push_str("  "),
                _ => {}
            },
            Event::Text(t) => {
                if in_code_block {
                    for line in t.lines() {
                        out.push_str("    ");
                        out.push_str(line);
                        out.push('\n');
                    }
                } else {
                    out.push_str(&t);
                }
            }
            Event::Code(c) => {
                out.push_str(CODE);
                out.push_str(&c);
                out.push_str(RESET);
            }
            Event::SoftBreak | Event::HardBreak => out.push('\n'),
            Event::Rule => out.push_str("────────\n\n"),
            _ => {}
        }
    }
    out.trim_end().to_string()
}
