// Ultralytics 🚀 AGPL-3.0 License - https://ultralytics.com/license
//
// 显示适配: RGB帧 → egui 纹理数据, 等比缩放到面板区域

use egui_macroquad::egui;
use image::RgbImage;

/// 面板标题栏高度
const TITLE_HEIGHT: f32 = 22.0;

/// 在 `box_w x box_h` 内保持宽高比的最大尺寸
pub fn fit_size(w: f32, h: f32, box_w: f32, box_h: f32) -> (f32, f32) {
    if w <= 0.0 || h <= 0.0 || box_w <= 0.0 || box_h <= 0.0 {
        return (0.0, 0.0);
    }
    let r = (box_w / w).min(box_h / h);
    (w * r, h * r)
}

/// RGB → RGBA (不透明)
pub fn to_color_image(image: &RgbImage) -> egui::ColorImage {
    let (w, h) = image.dimensions();
    egui::ColorImage::from_rgb([w as usize, h as usize], image.as_raw())
}

/// 带标题和边框的显示区域, 无内容时显示占位文字
pub struct Panel {
    title: &'static str,
    placeholder: &'static str,
    texture: Option<egui::TextureHandle>,
    revision: u64,
}

impl Panel {
    pub fn new(title: &'static str, placeholder: &'static str) -> Self {
        Self {
            title,
            placeholder,
            texture: None,
            revision: 0,
        }
    }

    /// 内容版本变化时重新上传纹理
    pub fn sync(&mut self, ctx: &egui::Context, image: Option<&RgbImage>, revision: u64) {
        if revision == self.revision {
            return;
        }
        self.revision = revision;
        let Some(image) = image else {
            self.texture = None;
            return;
        };
        let color = to_color_image(image);
        match self.texture.as_mut() {
            Some(texture) => texture.set(color, egui::TextureOptions::LINEAR),
            None => {
                self.texture =
                    Some(ctx.load_texture(self.title, color, egui::TextureOptions::LINEAR))
            }
        }
    }

    pub fn show(&self, ui: &mut egui::Ui, size: egui::Vec2) {
        ui.vertical(|ui| {
            ui.set_width(size.x);
            ui.label(egui::RichText::new(self.title).strong());
            let body = egui::vec2(size.x, (size.y - TITLE_HEIGHT).max(0.0));
            egui::Frame::group(ui.style()).show(ui, |ui| {
                ui.set_min_size(body);
                ui.set_max_size(body);
                ui.centered_and_justified(|ui| match &self.texture {
                    Some(texture) => {
                        let [w, h] = texture.size();
                        let (w, h) = fit_size(w as f32, h as f32, body.x, body.y);
                        let sized = egui::load::SizedTexture::new(texture.id(), egui::vec2(w, h));
                        ui.add(egui::Image::new(sized));
                    }
                    None => {
                        ui.label(self.placeholder);
                    }
                });
            });
        });
    }
}
