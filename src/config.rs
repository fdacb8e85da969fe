// Ultralytics 🚀 AGPL-3.0 License - https://ultralytics.com/license
//
// 命令行参数与 JSON 配置文件

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use clap::Parser;
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

/// 命令行参数, 显式给出的值覆盖配置文件
#[derive(Parser, Debug, Clone, Default)]
#[command(author, version, about = "YOLOv8 Object Detection GUI", long_about = None)]
pub struct Args {
    /// ONNX 模型路径
    #[arg(short, long)]
    pub model: Option<PathBuf>,

    /// 配置文件路径 (不存在时按默认值创建)
    #[arg(long, default_value = "yolo-gui.json")]
    pub config: PathBuf,

    /// 置信度阈值
    #[arg(long)]
    pub conf: Option<f32>,

    /// NMS IOU阈值
    #[arg(long)]
    pub iou: Option<f32>,

    /// 摄像头设备索引
    #[arg(long)]
    pub camera: Option<usize>,

    /// 使用 CUDA 推理
    #[arg(long)]
    pub cuda: bool,

    /// CUDA 设备ID
    #[arg(long, default_value_t = 0)]
    pub device_id: i32,

    /// 类别名文件 (每行一个), 模型元数据缺少 names 时使用
    #[arg(long)]
    pub names: Option<PathBuf>,

    /// 标注字体文件 (ttf/otf)
    #[arg(long)]
    pub font: Option<PathBuf>,
}

/// 应用配置
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    // === 模型 ===
    pub model_path: PathBuf,
    pub names_path: Option<PathBuf>,
    pub input_size: u32,           // 模型输入边长
    pub conf_threshold: f32,       // 检测置信度阈值
    pub iou_threshold: f32,        // NMS IOU阈值
    pub cuda: bool,
    pub device_id: i32,

    // === 输入 ===
    pub camera_index: usize,
    pub poll_interval_ms: u64, // 视频/摄像头轮询间隔

    // === 界面 ===
    pub font_path: Option<PathBuf>,
    pub window_width: i32,
    pub window_height: i32,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            model_path: PathBuf::from("model/best.onnx"),
            names_path: None,
            input_size: 640,
            conf_threshold: 0.25,
            iou_threshold: 0.45,
            cuda: false,
            device_id: 0,
            camera_index: 0,
            poll_interval_ms: 33,
            font_path: None,
            window_width: 1200,
            window_height: 650,
        }
    }
}

impl AppConfig {
    /// 从JSON文件加载配置, 文件不存在时写入默认配置
    pub fn load(path: &Path) -> Self {
        match fs::read_to_string(path) {
            Ok(json) => match serde_json::from_str(&json) {
                Ok(config) => {
                    info!("✅ 配置已从 {} 加载", path.display());
                    config
                }
                Err(e) => {
                    warn!("⚠️  配置文件解析失败: {}, 使用默认值", e);
                    Self::default()
                }
            },
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                info!("📝 配置文件不存在,创建默认配置...");
                let config = Self::default();
                config.save(path);
                config
            }
            // 读不了但文件存在: 不覆盖用户文件
            Err(e) => {
                warn!("⚠️  配置文件读取失败: {}, 使用默认值", e);
                Self::default()
            }
        }
    }

    /// 保存配置到JSON文件
    pub fn save(&self, path: &Path) {
        match serde_json::to_string_pretty(self) {
            Ok(json) => {
                if let Err(e) = fs::write(path, json) {
                    warn!("❌ 保存配置失败: {}", e);
                } else {
                    info!("💾 配置已保存到 {}", path.display());
                }
            }
            Err(e) => warn!("❌ 序列化配置失败: {}", e),
        }
    }

    /// 合并命令行参数
    pub fn with_args(mut self, args: &Args) -> Self {
        if let Some(model) = &args.model {
            self.model_path = model.clone();
        }
        if let Some(conf) = args.conf {
            self.conf_threshold = conf;
        }
        if let Some(iou) = args.iou {
            self.iou_threshold = iou;
        }
        if let Some(camera) = args.camera {
            self.camera_index = camera;
        }
        if args.cuda {
            self.cuda = true;
            self.device_id = args.device_id;
        }
        if args.names.is_some() {
            self.names_path = args.names.clone();
        }
        if args.font.is_some() {
            self.font_path = args.font.clone();
        }
        self
    }

    pub fn print_summary(&self) {
        info!("🎛️  当前配置:");
        info!("  模型: {}", self.model_path.display());
        info!(
            "  输入尺寸: {} | 置信度: {:.2} | IOU: {:.2}",
            self.input_size, self.conf_threshold, self.iou_threshold
        );
        info!(
            "  摄像头: {} | 轮询间隔: {}ms | CUDA: {}",
            self.camera_index, self.poll_interval_ms, self.cuda
        );
    }
}
