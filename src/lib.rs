// Ultralytics 🚀 AGPL-3.0 License - https://ultralytics.com/license
pub mod app; // 界面状态与消息分发
pub mod config; // 命令行与配置文件
pub mod detection; // 检测结果、标注与统计
pub mod display; // 显示适配 (RGB → egui 纹理)
pub mod error;
pub mod input; // 图片/视频/摄像头输入
pub mod models; // 模型接口与具体实现
pub mod ort_backend;
pub mod renderer; // macroquad + egui 主界面

pub use crate::config::{AppConfig, Args};
pub use crate::detection::{Bbox, Detection, DetectionResult, Detector, Pipeline};
pub use crate::error::{Error, Result};
pub use crate::models::YOLOv8;
pub use crate::ort_backend::{OrtBackend, OrtConfig, OrtEP};

/// 类别无关的非极大值抑制, 按置信度降序保留
pub fn non_max_suppression(xs: &mut Vec<Bbox>, iou_threshold: f32) {
    xs.sort_by(|b1, b2| b2.confidence().total_cmp(&b1.confidence()));

    let mut current_index = 0;
    for index in 0..xs.len() {
        let mut drop = false;
        for prev_index in 0..current_index {
            let iou = xs[prev_index].iou(&xs[index]);
            if iou > iou_threshold {
                drop = true;
                break;
            }
        }
        if !drop {
            xs.swap(current_index, index);
            current_index += 1;
        }
    }
    xs.truncate(current_index);
}

/// 本地时间戳字符串, 用于默认保存文件名
pub fn gen_time_string(delimiter: &str) -> String {
    let t_now = chrono::Local::now();
    let fmt = format!(
        "%Y{}%m{}%d{}%H{}%M{}%S",
        delimiter, delimiter, delimiter, delimiter, delimiter
    );
    t_now.format(&fmt).to_string()
}
