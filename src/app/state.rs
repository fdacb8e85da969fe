// Ultralytics 🚀 AGPL-3.0 License - https://ultralytics.com/license
//
// 界面状态: 由 Controller 独占修改, 渲染器只读

use std::collections::VecDeque;

use image::RgbImage;

use crate::detection::DetectionResult;
use crate::input::SourceKind;

pub const TEST_VIDEO: &str = "Test Video";
pub const STOP_VIDEO: &str = "Stop Video";
pub const TEST_CAMERA: &str = "Test Camera";
pub const STOP_CAMERA: &str = "Stop Camera";

/// 视频流状态机: Idle ⇄ Running
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum StreamState {
    #[default]
    Idle,
    Running { kind: SourceKind, generation: u64 },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NoticeLevel {
    Info,
    Warning,
}

/// 待弹出的提示框
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notice {
    pub level: NoticeLevel,
    pub title: String,
    pub text: String,
}

impl Notice {
    pub fn warning(text: impl Into<String>) -> Self {
        Self {
            level: NoticeLevel::Warning,
            title: "Warning".to_string(),
            text: text.into(),
        }
    }

    pub fn info(title: impl Into<String>, text: impl Into<String>) -> Self {
        Self {
            level: NoticeLevel::Info,
            title: title.into(),
            text: text.into(),
        }
    }
}

/// 一块显示区域的内容, `revision` 变化时渲染器重新上传纹理
#[derive(Debug, Clone, Default)]
pub struct View {
    pub image: Option<RgbImage>,
    pub revision: u64,
}

impl View {
    pub fn set(&mut self, image: RgbImage) {
        self.image = Some(image);
        self.revision += 1;
    }
}

#[derive(Debug)]
pub struct AppState {
    /// 已加载的静态图片
    pub image: Option<RgbImage>,
    /// 最近一次检测结果 (可保存)
    pub result: Option<DetectionResult>,
    pub original: View,
    pub tagged: View,
    pub info: String,
    pub stream: StreamState,
    pub video_label: &'static str,
    pub camera_label: &'static str,
    pub notices: VecDeque<Notice>,
}

impl Default for AppState {
    fn default() -> Self {
        Self {
            image: None,
            result: None,
            original: View::default(),
            tagged: View::default(),
            info: String::new(),
            stream: StreamState::Idle,
            video_label: TEST_VIDEO,
            camera_label: TEST_CAMERA,
            notices: VecDeque::new(),
        }
    }
}

impl AppState {
    pub fn warn(&mut self, text: impl Into<String>) {
        let notice = Notice::warning(text);
        tracing::warn!("⚠️ {}", notice.text);
        self.notices.push_back(notice);
    }

    pub fn notify(&mut self, title: impl Into<String>, text: impl Into<String>) {
        self.notices.push_back(Notice::info(title, text));
    }

    pub fn take_notice(&mut self) -> Option<Notice> {
        self.notices.pop_front()
    }

    /// 停止后两个按钮都恢复初始文字
    pub fn reset_stream_labels(&mut self) {
        self.stream = StreamState::Idle;
        self.video_label = TEST_VIDEO;
        self.camera_label = TEST_CAMERA;
    }
}
