mod chat_screen;
mod controller;
mod image_cache;
mod rich_text;
mod utils;

use anyhow::anyhow;
use chat_screen::ChatScreen;
use controller::ConversationController;
use eframe::egui;
use image_cache::ImageCache;
use providers::geolocation::{provider_from_settings, resolve_once, LocationCell};
use providers::naaj::NaajClient;
use services::clock::{CivilClock, Clock};
use services::transcript_store::{FileBackend, MemoryBackend, StorageBackend, TranscriptStore};
use std::sync::Arc;
use tracing_subscriber::EnvFilter;

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let (settings, found) = utils::load_settings_or_default();
    if !found {
        // First run: leave an editable copy next to the transcript state
        utils::save_settings(&settings);
    }

    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()?;

    let clock: Arc<dyn Clock> = match CivilClock::from_name(&settings.transcript.timezone) {
        Ok(clock) => Arc::new(clock),
        Err(e) => {
            tracing::warn!("{:#}; falling back to the default zone", e);
            Arc::new(CivilClock::default())
        }
    };

    let durable: Arc<dyn StorageBackend> = Arc::new(FileBackend::default_location());
    let session_scope: Arc<dyn StorageBackend> = if settings.transcript.persist_across_restarts {
        Arc::clone(&durable)
    } else {
        Arc::new(MemoryBackend::new())
    };
    let store = TranscriptStore::new(session_scope, durable, settings.phrases.greeting.clone());

    let location = LocationCell::new();
    if let Some(provider) = provider_from_settings(&settings.geolocation) {
        let cell = location.clone();
        runtime.spawn(async move {
            resolve_once(provider.as_ref(), &cell).await;
        });
    }

    let client = Arc::new(NaajClient::from_settings(&settings.backend, &settings.phrases)?);
    tracing::info!(base_url = client.base_url(), "naaj backend");

    let images = ImageCache::new(runtime.handle().clone(), Some(client.base_url()));
    let controller = ConversationController::start(store, clock, location, settings.phrases.clone());
    let screen = ChatScreen::new(runtime, controller, client, images);

    let options = eframe::NativeOptions {
        viewport: egui::ViewportBuilder::default()
            .with_title("Naaj-IA")
            .with_inner_size([420.0, 760.0])
            .with_min_inner_size([320.0, 480.0]),
        vsync: true,
        ..Default::default()
    };
    eframe::run_native(
        "Naaj-IA",
        options,
        Box::new(move |_cc: &eframe::CreationContext<'_>| -> Box<dyn eframe::App> {
            Box::new(screen)
        }),
    )
    .map_err(|e| anyhow!("window closed with error: {e}"))
}
