// Ultralytics 🚀 AGPL-3.0 License - https://ultralytics.com/license
//! 主界面 (macroquad + egui)
//!
//! 左右两个面板显示原图与标注图, 底部一排按钮和状态文字.
//! 每帧: 收取推理结果 → 定时轮询视频流 → 绘制 → 弹出待处理提示.

use std::time::Instant;

use egui_macroquad::egui;
use macroquad::prelude::*;

use crate::app::{Controller, Message, RfdDialogs};
use crate::display::Panel;
use crate::input::SourceOpener;

const MARGIN: f32 = 20.0;
const CONTROLS_HEIGHT: f32 = 90.0;

pub struct Renderer<O> {
    controller: Controller<O>,
    dialogs: RfdDialogs,
    original: Panel,
    tagged: Panel,
}

impl<O: SourceOpener> Renderer<O> {
    pub fn new(controller: Controller<O>) -> Self {
        Self {
            controller,
            dialogs: RfdDialogs,
            original: Panel::new("Original Image", "No Image Loaded"),
            tagged: Panel::new("Tagged Image", "No Detection Yet"),
        }
    }

    /// 一帧: 更新 → 绘制 → 提示框
    pub fn frame(&mut self) {
        self.controller.on_frame(Instant::now());

        clear_background(Color::from_rgba(240, 240, 240, 255));
        let messages = self.draw_egui();
        for message in messages {
            self.controller.update(message, &self.dialogs);
        }

        // 模态提示框会阻塞当前帧, 每帧最多弹一个
        if let Some(notice) = self.controller.state_mut().take_notice() {
            self.dialogs.show_notice(&notice);
        }
    }

    fn draw_egui(&mut self) -> Vec<Message> {
        let mut messages = Vec::new();
        let state = self.controller.state();
        let original = &mut self.original;
        let tagged = &mut self.tagged;

        egui_macroquad::ui(|egui_ctx| {
            original.sync(egui_ctx, state.original.image.as_ref(), state.original.revision);
            tagged.sync(egui_ctx, state.tagged.image.as_ref(), state.tagged.revision);

            egui::CentralPanel::default().show(egui_ctx, |ui| {
                let full = ui.available_size();
                let panel = egui::vec2(
                    ((full.x - MARGIN) / 2.0).max(0.0),
                    (full.y - CONTROLS_HEIGHT).max(0.0),
                );

                ui.horizontal(|ui| {
                    original.show(ui, panel);
                    ui.add_space(MARGIN);
                    tagged.show(ui, panel);
                });

                ui.add_space(10.0);
                ui.horizontal(|ui| {
                    let buttons = [
                        ("Select Image", Message::SelectImage),
                        ("Test Image", Message::TestImage),
                        ("Save Image", Message::SaveImage),
                        (state.video_label, Message::ToggleVideo),
                        (state.camera_label, Message::ToggleCamera),
                    ];
                    for (text, message) in buttons {
                        if ui.button(text).clicked() {
                            messages.push(message);
                        }
                    }
                });
                ui.label(state.info.as_str());
            });
        });
        egui_macroquad::draw();

        messages
    }
}
