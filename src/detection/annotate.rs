// Ultralytics 🚀 AGPL-3.0 License - https://ultralytics.com/license
//
// 检测结果可视化: 在图像副本上绘制检测框与标签

use std::path::Path;

use ab_glyph::{FontArc, PxScale};
use image::{Rgb, RgbImage};
use imageproc::drawing::{draw_filled_rect_mut, draw_hollow_rect_mut, draw_text_mut, text_size};
use imageproc::rect::Rect;
use tracing::{info, warn};

use super::types::Detection;

const LABEL_FONT_SIZE: f32 = 18.0;
const LABEL_PADDING: u32 = 3;

/// 未指定字体或指定字体不可用时依次尝试
const FALLBACK_FONTS: [&str; 9] = [
    "assets/font/msyh.ttc",
    "C:/Windows/Fonts/msyh.ttc",
    "C:/Windows/Fonts/arial.ttf",
    "/usr/share/fonts/truetype/dejavu/DejaVuSans.ttf",
    "/usr/share/fonts/TTF/DejaVuSans.ttf",
    "/usr/share/fonts/dejavu/DejaVuSans.ttf",
    "/usr/share/fonts/truetype/liberation/LiberationSans-Regular.ttf",
    "/System/Library/Fonts/Supplemental/Arial.ttf",
    "/Library/Fonts/Arial.ttf",
];
const BOX_THICKNESS: i32 = 2;

const BRIGHT_COLORS: [[u8; 3]; 12] = [
    [255, 0, 0],     // 红色
    [0, 255, 0],     // 绿色
    [0, 0, 255],     // 蓝色
    [255, 255, 0],   // 黄色
    [255, 0, 255],   // 品红
    [0, 255, 255],   // 青色
    [255, 128, 0],   // 橙色
    [255, 0, 128],   // 粉红
    [128, 255, 0],   // 黄绿
    [0, 128, 255],   // 天蓝
    [255, 255, 255], // 白色
    [128, 0, 255],   // 紫色
];

/// 标注器
#[derive(Clone, Default)]
pub struct Annotator {
    font: Option<FontArc>,
}

impl Annotator {
    /// 优先用指定字体, 否则查找常见系统字体; 都没有时只画框
    pub fn from_font_file(path: Option<&Path>) -> Self {
        let font = path.and_then(load_font).or_else(|| {
            FALLBACK_FONTS
                .into_iter()
                .map(Path::new)
                .filter(|p| p.is_file())
                .find_map(load_font)
        });
        if font.is_none() {
            warn!("⚠️ 未找到可用字体, 标注不显示类别文字");
        }
        Self { font }
    }

    pub fn color(class_id: usize) -> Rgb<u8> {
        Rgb(BRIGHT_COLORS[class_id % BRIGHT_COLORS.len()])
    }

    pub fn annotate(&self, frame: &RgbImage, detections: &[Detection]) -> RgbImage {
        let mut canvas = frame.clone();
        for det in detections {
            self.draw_detection(&mut canvas, det);
        }
        canvas
    }

    fn draw_detection(&self, canvas: &mut RgbImage, det: &Detection) {
        let (w, h) = canvas.dimensions();
        if w == 0 || h == 0 {
            return;
        }
        let x1 = (det.bbox.xmin().floor() as i32).clamp(0, w as i32 - 1);
        let y1 = (det.bbox.ymin().floor() as i32).clamp(0, h as i32 - 1);
        let x2 = (det.bbox.xmax().ceil() as i32).clamp(0, w as i32 - 1);
        let y2 = (det.bbox.ymax().ceil() as i32).clamp(0, h as i32 - 1);
        if x1 >= x2 || y1 >= y2 {
            return;
        }

        let color = Self::color(det.class_id);
        for t in 0..BOX_THICKNESS {
            let (bw, bh) = (x2 - x1 + 1 - 2 * t, y2 - y1 + 1 - 2 * t);
            if bw <= 0 || bh <= 0 {
                break;
            }
            draw_hollow_rect_mut(
                canvas,
                Rect::at(x1 + t, y1 + t).of_size(bw as u32, bh as u32),
                color,
            );
        }

        // 标签: "<类别> <置信度>", 无字体时不画空色块
        let Some(font) = &self.font else {
            return;
        };
        let label = format!("{} {:.2}", det.label, det.confidence());
        let scale = PxScale::from(LABEL_FONT_SIZE);
        let (text_w, text_h) = text_size(scale, font, &label);
        let bar_w = text_w + 2 * LABEL_PADDING;
        let bar_h = text_h + 2 * LABEL_PADDING;

        // 框上方放不下时画在框内
        let bar_y = if y1 >= bar_h as i32 {
            y1 - bar_h as i32
        } else {
            y1
        };
        draw_filled_rect_mut(canvas, Rect::at(x1, bar_y).of_size(bar_w, bar_h), color);
        draw_text_mut(
            canvas,
            text_color(color),
            x1 + LABEL_PADDING as i32,
            bar_y + LABEL_PADDING as i32,
            scale,
            font,
            &label,
        );
    }
}

fn load_font(path: &Path) -> Option<FontArc> {
    let bytes = match std::fs::read(path) {
        Ok(bytes) => bytes,
        Err(e) => {
            warn!("⚠️ 字体读取失败 {}: {}", path.display(), e);
            return None;
        }
    };
    match FontArc::try_from_vec(bytes) {
        Ok(font) => {
            info!("✅ 标注字体加载成功: {}", path.display());
            Some(font)
        }
        Err(e) => {
            warn!("⚠️ 字体解析失败 {}: {}", path.display(), e);
            None
        }
    }
}

/// 浅色底用黑字, 深色底用白字
fn text_color(bg: Rgb<u8>) -> Rgb<u8> {
    let [r, g, b] = bg.0;
    let luma = 0.299 * r as f32 + 0.587 * g as f32 + 0.114 * b as f32;
    if luma > 150.0 {
        Rgb([0, 0, 0])
    } else {
        Rgb([255, 255, 255])
    }
}
