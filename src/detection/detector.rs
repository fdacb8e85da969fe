// Ultralytics 🚀 AGPL-3.0 License - https://ultralytics.com/license
//! 检测器 (Detector)
//! 职责: 帧 → 模型推理 → 检测列表, 再交给标注器生成 DetectionResult

use std::time::Instant;

use image::RgbImage;
use tracing::debug;

use super::annotate::Annotator;
use super::types::{Detection, DetectionResult};
use crate::Result;

/// 统一的检测接口
///
/// 任何模型 (YOLOv8 或测试替身) 只需给出原图坐标系下的检测列表
pub trait Detector {
    fn detect(&mut self, frame: &RgbImage) -> Result<Vec<Detection>>;

    /// 类别名表, 下标即类别ID
    fn names(&self) -> &[String];
}

impl<D: Detector + ?Sized> Detector for Box<D> {
    fn detect(&mut self, frame: &RgbImage) -> Result<Vec<Detection>> {
        (**self).detect(frame)
    }

    fn names(&self) -> &[String] {
        (**self).names()
    }
}

/// 检测 + 标注
pub struct Pipeline<D> {
    detector: D,
    annotator: Annotator,
}

impl<D: Detector> Pipeline<D> {
    pub fn new(detector: D, annotator: Annotator) -> Self {
        Self {
            detector,
            annotator,
        }
    }

    pub fn run(&mut self, frame: &RgbImage) -> Result<DetectionResult> {
        let t = Instant::now();
        let detections = self.detector.detect(frame)?;
        let inference = t.elapsed();

        let annotated = self.annotator.annotate(frame, &detections);
        debug!(
            "🎯 检测: {}个目标 | 推理 {:.1}ms",
            detections.len(),
            inference.as_secs_f64() * 1000.0
        );

        Ok(DetectionResult {
            detections,
            annotated,
            inference,
        })
    }
}
