/// 界面消息 (按钮 / 定时器 → Controller)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Message {
    SelectImage,
    TestImage,
    SaveImage,
    ToggleVideo,
    ToggleCamera,
    /// 轮询定时器到期, 读取下一帧
    Tick,
    StopStream,
}
