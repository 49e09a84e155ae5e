//! The chat window: timeline, input row, and a small review form.

use crate::controller::ConversationController;
use crate::image_cache::ImageCache;
use crate::rich_text::{layout_turn, render_nodes, TurnBody};
use eframe::egui;
use providers::naaj::NaajClient;
use shared::error::ClientError;
use shared::review::ReviewSubmission;
use shared::transcript::{ReplyTurn, Turn};
use std::sync::mpsc::{channel, Receiver, Sender};
use std::sync::Arc;
use std::time::Duration;
use tokio::runtime::Runtime;

const USER_BUBBLE: egui::Color32 = egui::Color32::from_rgb(0, 121, 107);
const NAAJ_BUBBLE: egui::Color32 = egui::Color32::from_rgb(236, 239, 241);
const NAAJ_TEXT: egui::Color32 = egui::Color32::from_rgb(33, 33, 33);
const IMAGE_MAX_WIDTH: f32 = 240.0;

type ReplyOutcome = Result<Vec<ReplyTurn>, ClientError>;

#[derive(Default)]
struct ReviewForm {
    open: bool,
    place_name: String,
    rating: u8,
    comment: String,
    address: String,
    sending: bool,
    status: Option<Result<String, String>>,
}

impl ReviewForm {
    /// Free-text reviews carry no place coordinates.
    fn to_submission(&self) -> ReviewSubmission {
        ReviewSubmission::new(self.place_name.trim(), self.rating, self.comment.trim())
            .address(self.address.trim())
    }
}

pub struct ChatScreen {
    runtime: Runtime,
    controller: ConversationController,
    client: Arc<NaajClient>,
    replies_tx: Sender<ReplyOutcome>,
    replies_rx: Receiver<ReplyOutcome>,
    reviews_tx: Sender<Result<(), ClientError>>,
    reviews_rx: Receiver<Result<(), ClientError>>,
    images: ImageCache,
    draft: String,
    review: ReviewForm,
}

impl ChatScreen {
    pub fn new(
        runtime: Runtime,
        controller: ConversationController,
        client: Arc<NaajClient>,
        images: ImageCache,
    ) -> Self {
        let (replies_tx, replies_rx) = channel();
        let (reviews_tx, reviews_rx) = channel();
        Self {
            runtime,
            controller,
            client,
            replies_tx,
            replies_rx,
            reviews_tx,
            reviews_rx,
            images,
            draft: String::new(),
            review: ReviewForm {
                rating: 5,
                ..Default::default()
            },
        }
    }

    fn poll_background(&mut self) {
        while let Ok(outcome) = self.replies_rx.try_recv() {
            self.controller.finish_submit(outcome);
        }
        while let Ok(result) = self.reviews_rx.try_recv() {
            self.review.sending = false;
            self.review.status = Some(match result {
                Ok(()) => {
                    self.review.place_name.clear();
                    self.review.comment.clear();
                    self.review.address.clear();
                    Ok("¡Gracias por tu reseña!".to_string())
                }
                Err(e) => Err(e.to_string()),
            });
        }
    }

    fn send_draft(&mut self, ctx: &egui::Context) {
        let text = std::mem::take(&mut self.draft);
        let Some(outgoing) = self.controller.begin_submit(&text) else {
            self.draft = text;
            return;
        };

        let client = Arc::clone(&self.client);
        let tx = self.replies_tx.clone();
        let ctx = ctx.clone();
        self.runtime.spawn(async move {
            let outcome = outgoing.send(client.as_ref()).await;
            let _ = tx.send(outcome);
            ctx.request_repaint();
        });
    }

    fn send_review(&mut self, ctx: &egui::Context) {
        let review = self.review.to_submission();
        if let Err(e) = review.validate() {
            self.review.status = Some(Err(e.to_string()));
            return;
        }

        self.review.sending = true;
        self.review.status = None;
        let client = Arc::clone(&self.client);
        let tx = self.reviews_tx.clone();
        let ctx = ctx.clone();
        self.runtime.spawn(async move {
            let result = client.submit_review(&review).await.map(|reply| {
                tracing::debug!(%reply, "review accepted");
            });
            let _ = tx.send(result);
            ctx.request_repaint();
        });
    }

    fn show_header(&mut self, ui: &mut egui::Ui) {
        ui.horizontal(|ui| {
            ui.heading("Naaj-IA");
            ui.label(
                egui::RichText::new(self.controller.session().date().to_string())
                    .small()
                    .weak(),
            );
            ui.with_layout(egui::Layout::right_to_left(egui::Align::Center), |ui| {
                if ui.button("Reseñar un lugar").clicked() {
                    self.review.open = !self.review.open;
                }
            });
        });
    }

    fn show_input(&mut self, ui: &mut egui::Ui) {
        let enabled = !self.controller.is_pending();
        let mut submit = false;

        ui.horizontal(|ui| {
            let width = (ui.available_width() - 80.0).max(80.0);
            let input = ui.add_enabled(
                enabled,
                egui::TextEdit::singleline(&mut self.draft)
                    .hint_text("Pregúntale algo a Naaj...")
                    .desired_width(width),
            );
            if input.lost_focus() && ui.input(|i| i.key_pressed(egui::Key::Enter)) {
                submit = true;
                input.request_focus();
            }
            let can_send = enabled && !self.draft.trim().is_empty();
            if ui.add_enabled(can_send, egui::Button::new("Enviar")).clicked() {
                submit = true;
            }
        });

        if submit {
            self.send_draft(ui.ctx());
        }
    }

    fn show_timeline(&mut self, ui: &mut egui::Ui) {
        let Self {
            controller, images, ..
        } = self;
        egui::ScrollArea::vertical()
            .stick_to_bottom(true)
            .auto_shrink([false, false])
            .show(ui, |ui| {
                let max_width = ui.available_width() * 0.75;
                for turn in controller.turns() {
                    show_bubble(ui, turn, images, max_width);
                    ui.add_space(6.0);
                }
                if let Some(typing) = controller.typing_indicator() {
                    ui.label(egui::RichText::new(typing).italics().weak());
                }
            });
    }

    fn show_review_window(&mut self, ctx: &egui::Context) {
        let mut open = self.review.open;
        let mut submit = false;
        egui::Window::new("Reseña")
            .open(&mut open)
            .collapsible(false)
            .resizable(false)
            .show(ctx, |ui| {
                let form = &mut self.review;
                ui.label("Lugar");
                ui.text_edit_singleline(&mut form.place_name);
                ui.label("Dirección (opcional)");
                ui.text_edit_singleline(&mut form.address);
                ui.add(egui::Slider::new(&mut form.rating, 1..=5).text("estrellas"));
                ui.label("Comentario");
                ui.text_edit_multiline(&mut form.comment);
                ui.horizontal(|ui| {
                    let ready = !form.sending && !form.place_name.trim().is_empty();
                    if ui.add_enabled(ready, egui::Button::new("Enviar reseña")).clicked() {
                        submit = true;
                    }
                    if form.sending {
                        ui.spinner();
                    }
                });
                match &form.status {
                    Some(Ok(msg)) => {
                        ui.colored_label(egui::Color32::from_rgb(46, 125, 50), msg);
                    }
                    Some(Err(msg)) => {
                        ui.colored_label(egui::Color32::from_rgb(198, 40, 40), msg);
                    }
                    None => {}
                }
            });
        self.review.open = open;
        if submit {
            self.send_review(ctx);
        }
    }
}

fn show_bubble(ui: &mut egui::Ui, turn: &Turn, images: &mut ImageCache, max_width: f32) {
    let (fill, text_color, layout) = if turn.is_user {
        (
            USER_BUBBLE,
            egui::Color32::WHITE,
            egui::Layout::right_to_left(egui::Align::TOP),
        )
    } else {
        (
            NAAJ_BUBBLE,
            NAAJ_TEXT,
            egui::Layout::left_to_right(egui::Align::TOP),
        )
    };

    ui.with_layout(layout, |ui| {
        egui::Frame::none()
            .fill(fill)
            .rounding(egui::Rounding::same(12.0))
            .inner_margin(egui::Margin::same(10.0))
            .show(ui, |ui| {
                ui.set_max_width(max_width);
                match layout_turn(turn) {
                    TurnBody::Text(nodes) => render_nodes(ui, &nodes, text_color),
                    TurnBody::Image { url, alt } => show_image(ui, images, Some(url), alt),
                    TurnBody::MissingImage { alt } => show_image(ui, images, None, alt),
                }
            });
    });
}

fn show_image(ui: &mut egui::Ui, images: &mut ImageCache, url: Option<&str>, alt: Option<&str>) {
    let texture = match url {
        Some(url) => images.texture_for(ui.ctx(), url),
        None => Some(images.placeholder(ui.ctx())),
    };
    ui.vertical(|ui| {
        match texture {
            Some(texture) => {
                let image = egui::Image::from_texture(egui::load::SizedTexture::from_handle(&texture))
                    .max_width(IMAGE_MAX_WIDTH)
                    .rounding(8.0);
                let response = ui.add(image);
                if let Some(alt) = alt {
                    response.on_hover_text(alt);
                }
            }
            None => {
                ui.spinner();
            }
        }
        if let Some(alt) = alt {
            ui.label(egui::RichText::new(alt).small().italics().color(NAAJ_TEXT));
        }
    });
}

impl eframe::App for ChatScreen {
    fn update(&mut self, ctx: &egui::Context, _frame: &mut eframe::Frame) {
        self.poll_background();
        self.images.poll(ctx);

        egui::TopBottomPanel::top("header").show(ctx, |ui| self.show_header(ui));
        egui::TopBottomPanel::bottom("input").show(ctx, |ui| {
            ui.add_space(4.0);
            self.show_input(ui);
            ui.add_space(4.0);
        });
        egui::CentralPanel::default().show(ctx, |ui| self.show_timeline(ui));
        if self.review.open {
            self.show_review_window(ctx);
        }

        if self.controller.is_pending() || self.review.sending {
            ctx.request_repaint_after(Duration::from_millis(250));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use shared::review::{DEFAULT_CATEGORY, UNKNOWN_ADDRESS};

    fn filled_form() -> ReviewForm {
        ReviewForm {
            place_name: "  Edzná ".into(),
            rating: 4,
            comment: "Muy bonito\n".into(),
            ..Default::default()
        }
    }

    #[test]
    fn test_form_review_has_no_coords() {
        let review = filled_form().to_submission();
        assert_eq!(review.place_name, "Edzná");
        assert_eq!(review.rating, 4);
        assert_eq!(review.comment, "Muy bonito");
        assert!(review.coords.is_none());
        assert_eq!(review.address, UNKNOWN_ADDRESS);
        assert_eq!(review.category, DEFAULT_CATEGORY);

        let body = serde_json::to_value(&review).unwrap();
        assert!(body["coords"].is_null());
    }

    #[test]
    fn test_form_review_keeps_typed_address() {
        let form = ReviewForm {
            address: "Calle 59, Campeche".into(),
            ..filled_form()
        };
        assert_eq!(form.to_submission().address, "Calle 59, Campeche");
        assert!(form.to_submission().validate().is_ok());
    }

    #[test]
    fn test_blank_form_fails_validation() {
        let form = ReviewForm {
            rating: 5,
            ..Default::default()
        };
        assert!(form.to_submission().validate().is_err());
    }
}
