//! Inline formatting for assistant replies.
//!
//! Handles the little markup the assistant actually produces:
//! - `*emphasis*` / `**emphasis**` (any number of asterisks, all rendered strong)
//! - bare `http(s)://` URLs, shown as a short "View on map" link
//!
//! Parsing is pure (`format`, `layout_turn`); the egui side only draws nodes.

use eframe::egui;
use regex::Regex;
use shared::transcript::{Turn, TurnKind, NO_IMAGE_SENTINEL};
use std::sync::LazyLock;

pub const MAP_LINK_LABEL: &str = "View on map";

const BASE_SIZE: f32 = 14.0;

static EMPHASIS_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\*+[^*]+\*+").expect("valid emphasis pattern"));
static URL_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"https?://\S+").expect("valid url pattern"));

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FormattedNode {
    Plain(String),
    Emphasis(String),
    Link { label: String, href: String },
}

/// Split a raw reply into renderable nodes, in source order.
pub fn format(raw: &str) -> Vec<FormattedNode> {
    if raw.is_empty() {
        return vec![FormattedNode::Plain(String::new())];
    }

    let mut nodes = Vec::new();
    let mut last = 0;
    for span in EMPHASIS_RE.find_iter(raw) {
        push_linked(&mut nodes, &raw[last..span.start()]);
        let content = span.as_str().trim_matches('*');
        if !content.is_empty() {
            nodes.push(FormattedNode::Emphasis(content.to_string()));
        }
        last = span.end();
    }
    push_linked(&mut nodes, &raw[last..]);
    nodes
}

/// Plain text with any URLs turned into map links.
fn push_linked(nodes: &mut Vec<FormattedNode>, text: &str) {
    let mut last = 0;
    for found in URL_RE.find_iter(text) {
        let cleaned = found
            .as_str()
            .trim_end_matches(|c| matches!(c, ')' | ']' | '.' | ','));
        // Nothing left after the scheme: keep it as text
        let has_target = cleaned
            .split_once("://")
            .map_or(false, |(_, rest)| !rest.is_empty());
        if !has_target {
            continue;
        }
        push_plain(nodes, &text[last..found.start()]);
        nodes.push(FormattedNode::Link {
            label: MAP_LINK_LABEL.to_string(),
            href: cleaned.to_string(),
        });
        last = found.start() + cleaned.len();
    }
    push_plain(nodes, &text[last..]);
}

fn push_plain(nodes: &mut Vec<FormattedNode>, text: &str) {
    if text.is_empty() {
        return;
    }
    if let Some(FormattedNode::Plain(prev)) = nodes.last_mut() {
        prev.push_str(text);
    } else {
        nodes.push(FormattedNode::Plain(text.to_string()));
    }
}

/// What a bubble shows for one turn
#[derive(Debug, PartialEq)]
pub enum TurnBody<'a> {
    Text(Vec<FormattedNode>),
    Image { url: &'a str, alt: Option<&'a str> },
    /// The assistant had no picture; draw the placeholder
    MissingImage { alt: Option<&'a str> },
}

pub fn layout_turn(turn: &Turn) -> TurnBody<'_> {
    match turn.kind {
        TurnKind::Text => TurnBody::Text(format(&turn.text)),
        TurnKind::Image => {
            let alt = turn.alt_text.as_deref();
            let url = turn.text.trim();
            let sentinel = url.trim_end_matches('.').eq_ignore_ascii_case(NO_IMAGE_SENTINEL);
            if url.is_empty() || sentinel {
                TurnBody::MissingImage { alt }
            } else {
                TurnBody::Image { url, alt }
            }
        }
    }
}

/// Draw formatted nodes as one wrapped paragraph.
pub fn render_nodes(ui: &mut egui::Ui, nodes: &[FormattedNode], base_color: egui::Color32) {
    let link_color = egui::Color32::from_rgb(100, 170, 240);

    ui.horizontal_wrapped(|ui| {
        ui.spacing_mut().item_spacing.x = 0.0;
        for node in nodes {
            match node {
                FormattedNode::Plain(text) => {
                    for (i, line) in text.split('\n').enumerate() {
                        if i > 0 {
                            ui.end_row();
                        }
                        if !line.is_empty() {
                            ui.label(egui::RichText::new(line).size(BASE_SIZE).color(base_color));
                        }
                    }
                }
                FormattedNode::Emphasis(text) => {
                    ui.label(
                        egui::RichText::new(text)
                            .size(BASE_SIZE)
                            .strong()
                            .color(base_color),
                    );
                }
                FormattedNode::Link { label, href } => {
                    ui.add(egui::Hyperlink::from_label_and_url(
                        egui::RichText::new(label)
                            .size(BASE_SIZE)
                            .color(link_color)
                            .underline(),
                        href,
                    ))
                    .on_hover_text(href);
                }
            }
        }
    });
}
