/// 本地视频文件解码器
/// Local video file decoder with software decoding only
use std::path::Path;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use crossbeam_channel::{Receiver, TryRecvError};
use ez_ffmpeg::core::context::null_output::create_null_output;
use ez_ffmpeg::filter::frame_pipeline_builder::FramePipelineBuilder;
use ez_ffmpeg::{AVMediaType, FfmpegContext, Input};
use image::RgbImage;
use tracing::{error, info};

use super::decode_filter::DecodeFilter;
use super::{FrameRead, FrameSource, SourceKind};
use crate::{Error, Result};

/// 解码队列长度
const FRAME_QUEUE: usize = 2;
/// 首帧等待上限 (摄像头打开较慢)
const FIRST_FRAME_TIMEOUT: Duration = Duration::from_secs(10);
/// 两帧之间的最大间隔, 超过视为解码卡死
const STALL_TIMEOUT: Duration = Duration::from_secs(3);

/// FFmpeg 解码来源: 解码线程 → 有界通道 → read()
///
/// `read` 只做 `try_recv`, 从不阻塞界面线程.
/// 摄像头来源每次取通道中最新的一帧, 较旧的直接丢弃.
pub struct FfmpegSource {
    kind: SourceKind,
    rx: Option<Receiver<RgbImage>>,
    stop: Arc<AtomicBool>,
    opened: Instant,
    last_frame: Option<Instant>,
    first_frame_timeout: Duration,
    stall_timeout: Duration,
}

impl FfmpegSource {
    /// 构建解码管线并启动; 调度器在独立线程中等待结束
    pub(crate) fn spawn(input: Input, kind: SourceKind) -> Result<Self> {
        let (tx, rx) = crossbeam_channel::bounded(FRAME_QUEUE);
        let stop = Arc::new(AtomicBool::new(false));

        let filter = DecodeFilter::new(tx, stop.clone());
        let filter = match kind {
            SourceKind::Camera => filter.latest_only(rx.clone()),
            SourceKind::Video => filter,
        };

        // 构建帧处理管线
        let pipe: FramePipelineBuilder = AVMediaType::AVMEDIA_TYPE_VIDEO.into();
        let pipe = pipe.filter("decode", Box::new(filter));
        let out = create_null_output().add_frame_pipeline(pipe);

        // 统一转成 YUV420P, 由 DecodeFilter 转 RGB
        let ctx = FfmpegContext::builder()
            .input(input)
            .filter_descs(["format=yuv420p"].into())
            .output(out)
            .build()
            .map_err(|e| Error::Decoder(format!("cannot build decoder: {}", e)))?;

        let sch = ctx
            .start()
            .map_err(|e| Error::Decoder(format!("cannot start decoder: {}", e)))?;

        std::thread::Builder::new()
            .name(format!("{:?}-decoder", kind).to_lowercase())
            .spawn(move || {
                if let Err(e) = sch.wait() {
                    error!("❌ 解码结束异常: {}", e);
                }
            })?;

        Ok(Self::with_receiver(rx, stop, kind))
    }

    fn with_receiver(rx: Receiver<RgbImage>, stop: Arc<AtomicBool>, kind: SourceKind) -> Self {
        Self {
            kind,
            rx: Some(rx),
            stop,
            opened: Instant::now(),
            last_frame: None,
            first_frame_timeout: FIRST_FRAME_TIMEOUT,
            stall_timeout: STALL_TIMEOUT,
        }
    }

    #[cfg(test)]
    pub(crate) fn from_receiver(rx: Receiver<RgbImage>, kind: SourceKind) -> Self {
        let mut source = Self::with_receiver(rx, Arc::new(AtomicBool::new(false)), kind);
        source.first_frame_timeout = Duration::from_millis(50);
        source.stall_timeout = Duration::from_millis(50);
        source
    }

    /// 距上一帧 (或打开时刻) 超时则报错
    fn check_stall(&self) -> Result<FrameRead> {
        let (since, limit) = match self.last_frame {
            Some(at) => (at, self.stall_timeout),
            None => (self.opened, self.first_frame_timeout),
        };
        let waited = since.elapsed();
        if waited > limit {
            return Err(Error::Decoder(format!(
                "no frame received for {:.1}s",
                waited.as_secs_f32()
            )));
        }
        Ok(FrameRead::Pending)
    }
}

impl FrameSource for FfmpegSource {
    fn read(&mut self) -> Result<FrameRead> {
        let Some(rx) = &self.rx else {
            return Ok(FrameRead::End);
        };
        match rx.try_recv() {
            Ok(frame) => {
                let frame = match self.kind {
                    SourceKind::Camera => rx.try_iter().last().unwrap_or(frame),
                    SourceKind::Video => frame,
                };
                self.last_frame = Some(Instant::now());
                Ok(FrameRead::Frame(frame))
            }
            Err(TryRecvError::Disconnected) => Ok(FrameRead::End),
            Err(TryRecvError::Empty) => self.check_stall(),
        }
    }

    /// 通知解码线程退出并关闭接收端
    fn release(&mut self) {
        self.stop.store(true, Ordering::Release);
        if self.rx.take().is_some() {
            info!("📹 {:?} 来源已释放", self.kind);
        }
    }
}

impl Drop for FfmpegSource {
    fn drop(&mut self) {
        self.release();
    }
}

/// 视频文件解码器
pub struct VideoDecoder;

impl VideoDecoder {
    pub fn open(path: &Path) -> Result<FfmpegSource> {
        if !path.is_file() {
            return Err(Error::Decoder(format!("file not found: {}", path.display())));
        }
        info!("🎬 视频解码器启动: {}", path.display());
        let input = Input::new(path.to_string_lossy().to_string());
        FfmpegSource::spawn(input, SourceKind::Video)
    }
}
