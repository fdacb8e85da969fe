//! 摄像头输入模块 - 独立的摄像头解码器
//!
//! 处理本地摄像头输入,支持 DirectShow(Windows) / AVFoundation(macOS) / V4L2(Linux)

use ez_ffmpeg::Input;
use tracing::{info, warn};

use super::decoder::FfmpegSource;
use super::SourceKind;
use crate::{Error, Result};

/// 摄像头解码器
pub struct CameraDecoder;

impl CameraDecoder {
    /// 打开指定索引的摄像头
    pub fn open(index: usize) -> Result<FfmpegSource> {
        let url = Self::format_camera_url(index)?;
        let format = Self::input_format();
        info!("🎥 摄像头解码器启动: {} (格式: {})", url, format);

        // 不指定分辨率和帧率, 让驱动协商默认值
        let input = Input::new(url).set_format(format);
        FfmpegSource::spawn(input, SourceKind::Camera)
    }

    /// 格式化摄像头URL - 根据平台选择
    fn format_camera_url(index: usize) -> Result<String> {
        #[cfg(target_os = "windows")]
        {
            // dshow 需要设备名
            let devices = get_camera_devices();
            devices
                .into_iter()
                .find(|(i, _)| *i == index)
                .map(|(_, name)| format!("video={}", name))
                .ok_or_else(|| Error::Decoder(format!("camera #{} not found", index)))
        }
        #[cfg(target_os = "linux")]
        {
            let path = format!("/dev/video{}", index);
            if !std::path::Path::new(&path).exists() {
                return Err(Error::Decoder(format!("camera {} not found", path)));
            }
            Ok(path)
        }
        #[cfg(not(any(target_os = "windows", target_os = "linux")))]
        {
            Ok(format!("{}", index))
        }
    }

    fn input_format() -> &'static str {
        if cfg!(target_os = "windows") {
            "dshow" // DirectShow
        } else if cfg!(target_os = "macos") {
            "avfoundation" // AVFoundation
        } else {
            "v4l2" // Video4Linux2
        }
    }
}

/// 获取可用的摄像头设备列表
pub fn get_camera_devices() -> Vec<(usize, String)> {
    match ez_ffmpeg::device::get_input_video_devices() {
        Ok(devices) => devices.into_iter().enumerate().collect(),
        Err(e) => {
            warn!("⚠️ 获取摄像头列表失败: {}", e);
            vec![]
        }
    }
}
