// Ultralytics 🚀 AGPL-3.0 License - https://ultralytics.com/license
//
// YOLOv8 检测模型实现
// 包含: 模型加载、预处理(letterbox)、推理、后处理(解码 + NMS)

use std::time::Instant;

use fast_image_resize as fr;
use image::RgbImage;
use ndarray::{s, Array, ArrayD, Axis, Ix4};
use tracing::{debug, info, warn};

use crate::config::AppConfig;
use crate::detection::{Bbox, Detection, Detector};
use crate::ort_backend::{load_names_file, OrtBackend, OrtConfig, OrtEP};
use crate::{non_max_suppression, Error, Result};

/// letterbox 填充值
const PAD_VALUE: f32 = 144.0 / 255.0;
const CXYWH_OFFSET: usize = 4;

/// 等比缩放参数: 原图 → 模型输入 (左上对齐)
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Letterbox {
    pub ratio: f32,
    pub width: u32,
    pub height: u32,
}

impl Letterbox {
    pub fn new(w0: u32, h0: u32, size: u32) -> Self {
        let ratio = (size as f32 / w0 as f32).min(size as f32 / h0 as f32);
        Self {
            ratio,
            width: ((w0 as f32 * ratio).round() as u32).clamp(1, size),
            height: ((h0 as f32 * ratio).round() as u32).clamp(1, size),
        }
    }
}

pub struct YOLOv8 {
    engine: OrtBackend,
    names: Vec<String>,
    size: u32,
    conf: f32,
    iou: f32,
    resizer: fr::Resizer,
}

impl YOLOv8 {
    pub fn new(config: &AppConfig) -> Result<Self> {
        let ep = if config.cuda {
            OrtEP::CUDA(config.device_id)
        } else {
            OrtEP::CPU
        };
        let engine = OrtBackend::build(OrtConfig {
            f: config.model_path.clone(),
            ep,
            image_size: config.input_size,
        })?;

        // 类别名: 模型元数据 > names 文件 > 运行时按 classN 补齐
        let names = match (engine.names(), &config.names_path) {
            (Some(names), _) => names.clone(),
            (None, Some(path)) => load_names_file(path)?,
            (None, None) => {
                warn!("⚠️ 模型缺少 names 元数据, 使用 classN 作为类别名");
                Vec::new()
            }
        };

        Ok(Self {
            size: engine.image_size(),
            engine,
            names,
            conf: config.conf_threshold,
            iou: config.iou_threshold,
            resizer: fr::Resizer::new(),
        })
    }

    pub fn preprocess(&mut self, frame: &RgbImage) -> Result<(Array<f32, Ix4>, Letterbox)> {
        let (w0, h0) = frame.dimensions();
        if w0 == 0 || h0 == 0 {
            return Err(Error::Shape(format!("empty image {}x{}", w0, h0)));
        }
        let lb = Letterbox::new(w0, h0, self.size);

        let src = fr::images::ImageRef::new(w0, h0, frame.as_raw(), fr::PixelType::U8x3)
            .map_err(|e| Error::Resize(e.to_string()))?;
        let mut dst = fr::images::Image::new(lb.width, lb.height, fr::PixelType::U8x3);
        self.resizer
            .resize(
                &src,
                &mut dst,
                &fr::ResizeOptions::new()
                    .resize_alg(fr::ResizeAlg::Convolution(fr::FilterType::Bilinear)),
            )
            .map_err(|e| Error::Resize(e.to_string()))?;

        let size = self.size as usize;
        let mut xs = Array::from_elem((1, 3, size, size), PAD_VALUE);
        let row = lb.width as usize * 3;
        for (y, line) in dst.buffer().chunks_exact(row).enumerate() {
            for (x, rgb) in line.chunks_exact(3).enumerate() {
                xs[[0, 0, y, x]] = rgb[0] as f32 / 255.0;
                xs[[0, 1, y, x]] = rgb[1] as f32 / 255.0;
                xs[[0, 2, y, x]] = rgb[2] as f32 / 255.0;
            }
        }
        Ok((xs, lb))
    }

    pub fn label(&self, id: usize) -> String {
        self.names
            .get(id)
            .cloned()
            .unwrap_or_else(|| format!("class{}", id))
    }

    pub fn summary(&self) {
        info!(
            "📦 YOLOv8 | EP: {:?} | 输入: {}x{} | 类别: {} | conf: {} | iou: {}",
            self.engine.ep(),
            self.size,
            self.size,
            self.names.len(),
            self.conf,
            self.iou
        );
    }
}

/// 解码 `[1, 4 + nc, N]` 输出到原图坐标, 置信度过滤后做 NMS
pub fn postprocess(
    preds: &ArrayD<f32>,
    lb: Letterbox,
    w0: u32,
    h0: u32,
    conf: f32,
    iou: f32,
) -> Result<Vec<Bbox>> {
    let shape = preds.shape();
    if shape.len() != 3 || shape[1] <= CXYWH_OFFSET {
        return Err(Error::Shape(format!("expected [1, 4+nc, N], got {:?}", shape)));
    }
    let (w0, h0) = (w0 as f32, h0 as f32);

    let mut data: Vec<Bbox> = Vec::new();
    let anchor = preds.slice(s![0, .., ..]);
    for pred in anchor.axis_iter(Axis(1)) {
        let clss = pred.slice(s![CXYWH_OFFSET..]);
        let Some((id, &confidence)) = clss
            .iter()
            .enumerate()
            .reduce(|max, x| if x.1 > max.1 { x } else { max })
        else {
            continue;
        };
        if confidence < conf {
            continue;
        }

        let cx = pred[0] / lb.ratio;
        let cy = pred[1] / lb.ratio;
        let w = pred[2] / lb.ratio;
        let h = pred[3] / lb.ratio;
        let x1 = (cx - w / 2.).clamp(0., w0);
        let y1 = (cy - h / 2.).clamp(0., h0);
        let x2 = (cx + w / 2.).clamp(0., w0);
        let y2 = (cy + h / 2.).clamp(0., h0);
        data.push(Bbox::new(x1, y1, x2 - x1, y2 - y1, id, confidence));
    }

    non_max_suppression(&mut data, iou);
    Ok(data)
}

impl Detector for YOLOv8 {
    fn detect(&mut self, frame: &RgbImage) -> Result<Vec<Detection>> {
        let t_pre = Instant::now();
        let (xs, lb) = self.preprocess(frame)?;
        let pre = t_pre.elapsed();

        let t_run = Instant::now();
        let ys = self.engine.run(xs)?;
        let run = t_run.elapsed();

        let preds = ys
            .first()
            .ok_or_else(|| Error::Shape("model has no output".into()))?;
        let (w0, h0) = frame.dimensions();
        let bboxes = postprocess(preds, lb, w0, h0, self.conf, self.iou)?;
        debug!(
            "[Model] 预处理 {:?} | 推理 {:?} | {}个目标",
            pre,
            run,
            bboxes.len()
        );

        Ok(bboxes
            .into_iter()
            .map(|bbox| Detection {
                class_id: bbox.id(),
                label: self.label(bbox.id()),
                bbox,
            })
            .collect())
    }

    fn names(&self) -> &[String] {
        &self.names
    }
}
