/// 界面逻辑 (App)
///
/// - state:      AppState, 显示内容与提示队列
/// - message:    按钮/定时器消息
/// - controller: 消息分发, 独占视频流会话
/// - worker:     推理工作线程
/// - timer:      固定间隔轮询
/// - dialogs:    文件对话框接口与 rfd 实现
pub mod controller;
pub mod dialogs;
pub mod message;
pub mod state;
pub mod timer;
pub mod worker;

pub use controller::Controller;
pub use dialogs::{Dialogs, RfdDialogs};
pub use message::Message;
pub use state::{AppState, Notice, NoticeLevel, StreamState, View};
pub use timer::PollTimer;
pub use worker::{InferenceWorker, Job, JobOrigin, JobOutput};
