/// 模型实现
///
/// # 架构说明
///
/// 所有模型实现 `detection::Detector`, 标准流程:
///
/// ```text
/// 原始图片 → preprocess (letterbox) → ndarray张量
///          ↓
///     OrtBackend::run
///          ↓
///     原始输出 → postprocess (解码 + NMS) → Vec<Detection>
/// ```
///
/// ## 使用示例
/// ```no_run
/// use yolov8_gui::{AppConfig, Detector, YOLOv8};
///
/// let mut model = YOLOv8::new(&AppConfig::default())?;
/// let frame = image::open("bus.jpg")?.to_rgb8();
/// let detections = model.detect(&frame)?;
/// # Ok::<(), yolov8_gui::Error>(())
/// ```
pub mod yolov8; // YOLOv8 检测模型

pub use yolov8::{Letterbox, YOLOv8};
