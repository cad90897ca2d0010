// src/ui.rs - Native window display sink
use std::time::Duration;

use eframe::egui::{self, Color32, Pos2, Rect, Vec2};

use crate::app::DisplaySink;
use crate::video::Frame;

/// Shows the latest frame, scaled to fit while keeping its aspect ratio.
pub struct VideoWidget {
    texture: Option<egui::TextureHandle>,
    aspect_ratio: f32,
}

impl VideoWidget {
    pub fn new() -> Self {
        Self {
            texture: None,
            aspect_ratio: 4.0 / 3.0,
        }
    }

    pub fn update_frame(&mut self, ctx: &egui::Context, frame: &Frame) {
        let size = [frame.width() as usize, frame.height() as usize];
        let image = egui::ColorImage::from_rgb(size, frame.as_raw());

        if frame.height() > 0 {
            self.aspect_ratio = frame.width() as f32 / frame.height() as f32;
        }

        if let Some(texture) = self.texture.as_mut() {
            texture.set(image, egui::TextureOptions::default());
        } else {
            self.texture =
                Some(ctx.load_texture("video_frame", image, egui::TextureOptions::default()));
        }
    }

    pub fn show(&self, ui: &mut egui::Ui) {
        let available = ui.available_size();
        let mut size = Vec2::new(available.x, available.x / self.aspect_ratio);
        if size.y > available.y {
            size = Vec2::new(available.y * self.aspect_ratio, available.y);
        }

        ui.centered_and_justified(|ui| {
            let (rect, _response) = ui.allocate_exact_size(size, egui::Sense::hover());

            if let Some(texture) = &self.texture {
                ui.painter().image(
                    texture.id(),
                    rect,
                    Rect::from_min_max(Pos2::ZERO, Pos2::new(1.0, 1.0)),
                    Color32::WHITE,
                );
            } else {
                ui.painter().text(
                    rect.center(),
                    egui::Align2::CENTER_CENTER,
                    "No Video Signal",
                    egui::FontId::proportional(16.0),
                    Color32::from_rgb(150, 150, 155),
                );
            }
        });
    }
}

impl Default for VideoWidget {
    fn default() -> Self {
        Self::new()
    }
}

/// One repaint's view of the window as a [`DisplaySink`].
pub struct EguiDisplay<'a> {
    ctx: &'a egui::Context,
    video: &'a mut VideoWidget,
    quit_key: egui::Key,
}

impl<'a> EguiDisplay<'a> {
    pub fn new(ctx: &'a egui::Context, video: &'a mut VideoWidget, quit_key: egui::Key) -> Self {
        Self {
            ctx,
            video,
            quit_key,
        }
    }
}

impl DisplaySink for EguiDisplay<'_> {
    fn show(&mut self, frame: &Frame) {
        self.video.update_frame(self.ctx, frame);
    }

    // Key events were gathered before this repaint started, so the wait is
    // spent by scheduling the next repaint instead of blocking.
    fn poll_quit(&mut self, wait: Duration) -> bool {
        let quit = self.ctx.input(|i| i.key_pressed(self.quit_key));
        if !quit {
            self.ctx.request_repaint_after(wait);
        }
        quit
    }

    fn close(&mut self) {
        self.ctx.send_viewport_cmd(egui::ViewportCommand::Close);
    }
}
