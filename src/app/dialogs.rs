//! 文件/消息对话框

use std::path::PathBuf;

use rfd::{FileDialog, MessageButtons, MessageDialog, MessageLevel};

use super::state::{Notice, NoticeLevel};

/// 文件选择接口, 界面用原生对话框, 测试用脚本替身
pub trait Dialogs {
    fn pick_image(&self) -> Option<PathBuf>;
    fn pick_video(&self) -> Option<PathBuf>;
    fn save_image(&self, default_name: &str) -> Option<PathBuf>;
}

/// 原生对话框 (rfd)
#[derive(Debug, Default, Clone, Copy)]
pub struct RfdDialogs;

impl Dialogs for RfdDialogs {
    fn pick_image(&self) -> Option<PathBuf> {
        FileDialog::new()
            .set_title("Select Image")
            .add_filter("Images", &["png", "jpg", "jpeg"])
            .pick_file()
    }

    fn pick_video(&self) -> Option<PathBuf> {
        FileDialog::new()
            .set_title("Select Video")
            .add_filter("Video", &["mp4", "avi"])
            .pick_file()
    }

    fn save_image(&self, default_name: &str) -> Option<PathBuf> {
        FileDialog::new()
            .set_title("Save Image")
            .set_file_name(default_name)
            .add_filter("PNG", &["png"])
            .add_filter("JPG", &["jpg"])
            .save_file()
    }
}

impl RfdDialogs {
    /// 模态提示框
    pub fn show_notice(&self, notice: &Notice) {
        let level = match notice.level {
            NoticeLevel::Info => MessageLevel::Info,
            NoticeLevel::Warning => MessageLevel::Warning,
        };
        MessageDialog::new()
            .set_level(level)
            .set_title(notice.title.as_str())
            .set_description(notice.text.as_str())
            .set_buttons(MessageButtons::Ok)
            .show();
    }

    /// 致命错误提示, 调用方随后退出
    pub fn show_fatal(&self, text: &str) {
        MessageDialog::new()
            .set_level(MessageLevel::Error)
            .set_title("Error")
            .set_description(text)
            .set_buttons(MessageButtons::Ok)
            .show();
    }
}
