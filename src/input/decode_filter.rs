/// FFmpeg解码过滤器模块
/// FFmpeg decode filter module
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Instant;

use crossbeam_channel::{Receiver, Sender, TrySendError};
use ez_ffmpeg::filter::frame_filter::FrameFilter;
use ez_ffmpeg::filter::frame_filter_context::FrameFilterContext;
use ez_ffmpeg::{AVMediaType, Frame};
use image::RgbImage;
use tracing::{debug, info, warn};

/// 最大支持分辨率
const MAX_DIMENSION: u32 = 4096;

/// FFmpeg解码过滤器: YUV420P帧 → RGB帧 → 有界通道
///
/// 文件: 通道满时阻塞解码线程, 播放速度跟随界面轮询.
/// 摄像头: 通道满时丢弃最旧的帧, 采集不停顿, 界面总拿到最新画面.
/// `stop` 置位或接收端关闭后返回错误以终止解码.
#[derive(Clone)]
pub struct DecodeFilter {
    tx: Option<Sender<RgbImage>>,
    /// 仅摄像头: 用于挤掉最旧帧
    latest_only: Option<Receiver<RgbImage>>,
    stop: Arc<AtomicBool>,
    count: usize,
    last: Instant,
    dropped_frames: usize,  // 丢弃的帧数
    replaced_frames: usize, // 被新帧挤掉的帧数
    total_frames: usize,    // 总帧数
}

impl DecodeFilter {
    pub fn new(tx: Sender<RgbImage>, stop: Arc<AtomicBool>) -> Self {
        Self {
            tx: Some(tx),
            latest_only: None,
            stop,
            count: 0,
            last: Instant::now(),
            dropped_frames: 0,
            replaced_frames: 0,
            total_frames: 0,
        }
    }

    /// 实时来源: 队列满时用新帧替换最旧帧
    pub fn latest_only(mut self, rx: Receiver<RgbImage>) -> Self {
        self.latest_only = Some(rx);
        self
    }

    fn drop_frame(&mut self, reason: &str) -> Result<Option<Frame>, String> {
        self.dropped_frames += 1;
        if self.total_frames <= 10 {
            warn!("⚠️ 丢弃帧 #{}: {}", self.total_frames, reason);
        }
        Ok(None)
    }

    fn released(&self) -> bool {
        self.stop.load(Ordering::Acquire)
    }

    fn deliver(&mut self, image: RgbImage) -> Result<(), String> {
        let Some(tx) = &self.tx else {
            return Err("frame receiver released".to_string());
        };
        match push_frame(tx, self.latest_only.as_ref(), image) {
            Ok(replaced) => {
                if replaced {
                    self.replaced_frames += 1;
                }
                Ok(())
            }
            Err(()) => {
                self.tx = None;
                Err("frame receiver released".to_string())
            }
        }
    }
}

/// 投递一帧; 返回是否挤掉了旧帧, 接收端全部关闭时返回 Err
pub(crate) fn push_frame(
    tx: &Sender<RgbImage>,
    latest_only: Option<&Receiver<RgbImage>>,
    image: RgbImage,
) -> Result<bool, ()> {
    let Some(rx) = latest_only else {
        return tx.send(image).map(|_| false).map_err(|_| ());
    };
    match tx.try_send(image) {
        Ok(()) => Ok(false),
        Err(TrySendError::Full(image)) => {
            let _ = rx.try_recv();
            match tx.try_send(image) {
                // 仍然满: 放弃这一帧
                Ok(()) | Err(TrySendError::Full(_)) => Ok(true),
                Err(TrySendError::Disconnected(_)) => Err(()),
            }
        }
        Err(TrySendError::Disconnected(_)) => Err(()),
    }
}

impl FrameFilter for DecodeFilter {
    fn media_type(&self) -> AVMediaType {
        AVMediaType::AVMEDIA_TYPE_VIDEO
    }

    fn init(&mut self, _ctx: &FrameFilterContext) -> Result<(), String> {
        info!("✅ 解码线程启动");
        Ok(())
    }

    fn filter_frame(
        &mut self,
        frame: Frame,
        _ctx: &FrameFilterContext,
    ) -> Result<Option<Frame>, String> {
        if self.released() {
            self.tx = None;
            return Err("decoder aborted".to_string());
        }
        self.total_frames += 1;

        // 基本检查：空帧或损坏帧
        if frame.as_ptr().is_null() || frame.is_empty() || frame.is_corrupt() {
            return self.drop_frame("空帧/损坏帧");
        }

        let image = unsafe {
            let raw = &*frame.as_ptr();
            let w = raw.width as u32;
            let h = raw.height as u32;

            // 检查分辨率合法性
            if w == 0 || h == 0 || w > MAX_DIMENSION || h > MAX_DIMENSION {
                return self.drop_frame(&format!("非法分辨率 {}x{}", w, h));
            }

            // YUV420P数据指针
            let (y_plane, u_plane, v_plane) = (raw.data[0], raw.data[1], raw.data[2]);
            let y_stride = raw.linesize[0] as usize;
            let uv_stride = raw.linesize[1] as usize;

            if y_plane.is_null() || u_plane.is_null() || v_plane.is_null() {
                return self.drop_frame("YUV指针为空");
            }
            if y_stride < w as usize || uv_stride < (w as usize).div_ceil(2) {
                return self.drop_frame(&format!(
                    "步长异常 y_stride={} uv_stride={}",
                    y_stride, uv_stride
                ));
            }

            let (w_usize, h_usize) = (w as usize, h as usize);
            let uv_rows = h_usize.div_ceil(2);
            let y = std::slice::from_raw_parts(y_plane, y_stride * h_usize);
            let u = std::slice::from_raw_parts(u_plane, uv_stride * uv_rows);
            let v = std::slice::from_raw_parts(v_plane, uv_stride * uv_rows);

            let mut buffer = vec![0u8; w_usize * h_usize * 3];
            yuv420p_to_rgb(y, u, v, y_stride, uv_stride, &mut buffer, w_usize, h_usize);
            match RgbImage::from_raw(w, h, buffer) {
                Some(image) => image,
                None => return self.drop_frame("RGB缓冲区尺寸不符"),
            }
        };

        self.count += 1;
        if self.last.elapsed().as_secs_f64() >= 1.0 {
            let elapsed = self.last.elapsed().as_secs_f64();
            debug!(
                "📺 解码统计: 实际{:.1}fps | 总帧{} | 丢弃{} | 替换{}",
                self.count as f64 / elapsed,
                self.total_frames,
                self.dropped_frames,
                self.replaced_frames
            );
            self.last = Instant::now();
            self.count = 0;
        }

        self.deliver(image)?;
        Ok(Some(frame))
    }

    fn uninit(&mut self, _ctx: &FrameFilterContext) {
        // 关闭发送端, 接收方据此判断流结束
        self.tx = None;
        self.latest_only = None;
        info!(
            "✅ 解码线程退出 (总帧{} | 丢弃{} | 替换{})",
            self.total_frames, self.dropped_frames, self.replaced_frames
        );
    }
}

/// YUV420P → RGB (BT.601, 7位定点系数)
#[allow(clippy::too_many_arguments)]
pub fn yuv420p_to_rgb(
    y_plane: &[u8],
    u_plane: &[u8],
    v_plane: &[u8],
    y_stride: usize,
    uv_stride: usize,
    buffer: &mut [u8],
    width: usize,
    height: usize,
) {
    let mut out_idx = 0;
    for y in 0..height {
        let y_row = y * y_stride;
        let uv_row = (y >> 1) * uv_stride;

        for x in 0..width {
            let y_val = y_plane[y_row + x] as i32;
            let u_val = u_plane[uv_row + (x >> 1)] as i32 - 128;
            let v_val = v_plane[uv_row + (x >> 1)] as i32 - 128;

            buffer[out_idx] = (y_val + ((v_val * 179) >> 7)).clamp(0, 255) as u8;
            buffer[out_idx + 1] =
                (y_val - ((u_val * 44) >> 7) - ((v_val * 91) >> 7)).clamp(0, 255) as u8;
            buffer[out_idx + 2] = (y_val + ((u_val * 227) >> 7)).clamp(0, 255) as u8;
            out_idx += 3;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crossbeam_channel::bounded;

    fn tagged(n: u8) -> RgbImage {
        RgbImage::from_pixel(1, 1, image::Rgb([n, n, n]))
    }

    #[test]
    fn live_source_keeps_newest_frames() {
        let (tx, rx) = bounded(2);
        let drain = rx.clone();
        for n in 1..=4 {
            push_frame(&tx, Some(&drain), tagged(n)).unwrap();
        }
        let kept: Vec<u8> = rx.try_iter().map(|f| f.get_pixel(0, 0)[0]).collect();
        assert_eq!(kept, vec![3, 4]);
    }

    #[test]
    fn live_source_never_blocks_when_full() {
        let (tx, rx) = bounded(1);
        push_frame(&tx, Some(&rx), tagged(1)).unwrap();
        assert_eq!(push_frame(&tx, Some(&rx), tagged(2)), Ok(true));
    }

    #[test]
    fn file_source_reports_closed_receiver() {
        let (tx, rx) = bounded(1);
        drop(rx);
        assert!(push_frame(&tx, None, tagged(1)).is_err());
    }

    #[test]
    fn stop_flag_is_shared() {
        let (tx, _rx) = bounded(1);
        let stop = Arc::new(AtomicBool::new(false));
        let filter = DecodeFilter::new(tx, stop.clone());
        assert!(!filter.released());
        stop.store(true, Ordering::Release);
        assert!(filter.released());
    }

    #[test]
    fn neutral_chroma_is_gray() {
        // 2x2, 一个色度采样
        let y = [0u8, 64, 128, 255];
        let (u, v) = ([128u8], [128u8]);
        let mut out = [0u8; 12];
        yuv420p_to_rgb(&y, &u, &v, 2, 1, &mut out, 2, 2);
        assert_eq!(out, [0, 0, 0, 64, 64, 64, 128, 128, 128, 255, 255, 255]);
    }

    #[test]
    fn stride_padding_is_skipped() {
        // 宽1, 步长4: 填充字节不应出现在输出中
        let y = [100u8, 9, 9, 9, 200, 9, 9, 9];
        let (u, v) = ([128u8, 9], [128u8, 9]);
        let mut out = [0u8; 6];
        yuv420p_to_rgb(&y, &u, &v, 4, 2, &mut out, 1, 2);
        assert_eq!(out, [100, 100, 100, 200, 200, 200]);
    }

    #[test]
    fn strong_red_chroma_saturates() {
        let y = [128u8];
        let (u, v) = ([128u8], [255u8]);
        let mut out = [0u8; 3];
        yuv420p_to_rgb(&y, &u, &v, 1, 1, &mut out, 1, 1);
        assert_eq!(out[0], 255);
        assert!(out[1] < 128);
        assert_eq!(out[2], 128);
    }
}
