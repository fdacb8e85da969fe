/// 检测系统 (Detection System)
///
/// - Detector:  统一检测接口 + 检测/标注流水线
/// - Annotator: 检测框与标签绘制
/// - Summary:   每帧类别计数
pub mod annotate;
pub mod detector;
pub mod summary;
pub mod types;

pub use annotate::Annotator;
pub use detector::{Detector, Pipeline};
pub use summary::{count_labels, summarize};
pub use types::{Bbox, Detection, DetectionResult};
