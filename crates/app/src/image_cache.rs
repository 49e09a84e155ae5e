//! Async image loading for image bubbles.
//!
//! Downloads run on the tokio runtime; decoded pixels come back over a
//! channel and become textures on the UI thread. Anything that fails to
//! load shows the placeholder instead.

use anyhow::{anyhow, Result};
use eframe::egui;
use reqwest::{Client, Url};
use std::collections::HashMap;
use std::sync::mpsc::{channel, Receiver, Sender};
use tokio::runtime::Handle;

const PLACEHOLDER_SIZE: [usize; 2] = [160, 120];
const MAX_IMAGE_BYTES: usize = 8 * 1024 * 1024;

enum ImageState {
    Loading,
    Ready(egui::TextureHandle),
    Failed,
}

type Loaded = (String, Result<egui::ColorImage>);

pub struct ImageCache {
    runtime: Handle,
    http: Client,
    base: Option<Url>,
    entries: HashMap<String, ImageState>,
    tx: Sender<Loaded>,
    rx: Receiver<Loaded>,
    placeholder: Option<egui::TextureHandle>,
}

impl ImageCache {
    /// `base` resolves relative image paths sent by the backend.
    pub fn new(runtime: Handle, base: Option<&str>) -> Self {
        let (tx, rx) = channel();
        Self {
            runtime,
            http: Client::new(),
            base: base.and_then(|b| Url::parse(b).ok()),
            entries: HashMap::new(),
            tx,
            rx,
            placeholder: None,
        }
    }

    /// Turn finished downloads into textures.
    pub fn poll(&mut self, ctx: &egui::Context) {
        while let Ok((url, result)) = self.rx.try_recv() {
            let state = match result {
                Ok(image) => ImageState::Ready(ctx.load_texture(
                    url.as_str(),
                    image,
                    egui::TextureOptions::LINEAR,
                )),
                Err(e) => {
                    tracing::info!(%url, "image unavailable, using placeholder: {:#}", e);
                    ImageState::Failed
                }
            };
            self.entries.insert(url, state);
        }
    }

    /// Texture for `url`: `None` while loading, the placeholder on failure.
    pub fn texture_for(&mut self, ctx: &egui::Context, url: &str) -> Option<egui::TextureHandle> {
        match self.entries.get(url) {
            Some(ImageState::Ready(texture)) => return Some(texture.clone()),
            Some(ImageState::Failed) => return Some(self.placeholder(ctx)),
            Some(ImageState::Loading) => return None,
            None => {}
        }

        let Some(resolved) = resolve_url(self.base.as_ref(), url) else {
            self.entries.insert(url.to_string(), ImageState::Failed);
            return Some(self.placeholder(ctx));
        };

        self.entries.insert(url.to_string(), ImageState::Loading);
        let http = self.http.clone();
        let tx = self.tx.clone();
        let key = url.to_string();
        let ctx = ctx.clone();
        self.runtime.spawn(async move {
            let result = fetch_image(&http, resolved).await;
            let _ = tx.send((key, result));
            ctx.request_repaint();
        });
        None
    }

    pub fn placeholder(&mut self, ctx: &egui::Context) -> egui::TextureHandle {
        self.placeholder
            .get_or_insert_with(|| {
                ctx.load_texture(
                    "image-placeholder",
                    placeholder_image(),
                    egui::TextureOptions::LINEAR,
                )
            })
            .clone()
    }
}

fn resolve_url(base: Option<&Url>, raw: &str) -> Option<Url> {
    let url = match Url::parse(raw) {
        Ok(url) => url,
        Err(_) => base?.join(raw).ok()?,
    };
    matches!(url.scheme(), "http" | "https").then_some(url)
}

async fn fetch_image(http: &Client, url: Url) -> Result<egui::ColorImage> {
    let resp = http.get(url).send().await?;
    if !resp.status().is_success() {
        return Err(anyhow!("image request failed: {}", resp.status()));
    }
    let bytes = resp.bytes().await?;
    if bytes.len() > MAX_IMAGE_BYTES {
        return Err(anyhow!("image too large ({} bytes)", bytes.len()));
    }
    decode_image(&bytes)
}

fn decode_image(bytes: &[u8]) -> Result<egui::ColorImage> {
    let image = image::load_from_memory(bytes)?;
    let rgba = image.to_rgba8();
    let size = [rgba.width() as usize, rgba.height() as usize];
    Ok(egui::ColorImage::from_rgba_unmultiplied(size, &rgba))
}

/// Grey card with a darker frame, drawn when a picture cannot be shown
fn placeholder_image() -> egui::ColorImage {
    let [w, h] = PLACEHOLDER_SIZE;
    let mut image = egui::ColorImage::new(PLACEHOLDER_SIZE, egui::Color32::from_gray(215));
    let frame = egui::Color32::from_gray(160);
    for y in 0..h {
        for x in 0..w {
            let edge = x < 3 || y < 3 || x >= w - 3 || y >= h - 3;
            // diagonals through the middle, like a crossed-out picture
            let diagonal = (x * h).abs_diff(y * w) < w * 2 || (x * h).abs_diff((h - 1 - y) * w) < w * 2;
            if edge || diagonal {
                image.pixels[y * w + x] = frame;
            }
        }
    }
    image
}
