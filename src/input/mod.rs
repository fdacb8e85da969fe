/// 视频输入系统 (Video Input System)
///
/// - image_file:    静态图片读写
/// - DecodeFilter:  FFmpeg 帧过滤, YUV420P → RGB 后送入有界通道
/// - VideoDecoder:  本地视频文件 (mp4/avi)
/// - CameraDecoder: 本地摄像头 (DirectShow/AVFoundation/V4L2)
use std::path::Path;

use image::RgbImage;

use crate::Result;

pub mod camera;
pub mod decode_filter;
pub mod decoder;
pub mod image_file;

pub use camera::CameraDecoder;
pub use decode_filter::{yuv420p_to_rgb, DecodeFilter};
pub use decoder::{FfmpegSource, VideoDecoder};
pub use image_file::{load_image, save_image};

/// 视频流来源类型
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SourceKind {
    Video,
    Camera,
}

/// 一次非阻塞读取的结果
#[derive(Debug)]
pub enum FrameRead {
    Frame(RgbImage),
    /// 新帧尚未到达, 本次轮询跳过
    Pending,
    /// 流已结束
    End,
}

/// 可轮询的帧来源, `read` 在界面线程上调用, 不得阻塞
pub trait FrameSource: Send {
    fn read(&mut self) -> Result<FrameRead>;

    /// 释放底层句柄并终止解码, 之后的 read 均返回 `FrameRead::End`
    fn release(&mut self);
}

/// 打开视频/摄像头来源
pub trait SourceOpener {
    fn open_video(&self, path: &Path) -> Result<Box<dyn FrameSource>>;
    fn open_camera(&self, index: usize) -> Result<Box<dyn FrameSource>>;
}

/// 基于 FFmpeg 的来源
#[derive(Debug, Default, Clone, Copy)]
pub struct FfmpegOpener;

impl SourceOpener for FfmpegOpener {
    fn open_video(&self, path: &Path) -> Result<Box<dyn FrameSource>> {
        Ok(Box::new(VideoDecoder::open(path)?))
    }

    fn open_camera(&self, index: usize) -> Result<Box<dyn FrameSource>> {
        Ok(Box::new(CameraDecoder::open(index)?))
    }
}
