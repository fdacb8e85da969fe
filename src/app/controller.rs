// Ultralytics 🚀 AGPL-3.0 License - https://ultralytics.com/license
//! 消息分发 (Controller)
//!
//! 按钮/定时器产生 `Message`, 由 `update` 修改 `AppState`.
//! 视频流会话由 Controller 独占, 推理交给 `InferenceWorker`.

use std::time::{Duration, Instant};

use image::RgbImage;
use tracing::{debug, info, warn};

use super::dialogs::Dialogs;
use super::message::Message;
use super::state::{AppState, StreamState, STOP_CAMERA, STOP_VIDEO};
use super::timer::PollTimer;
use super::worker::{InferenceWorker, Job, JobOrigin, JobOutput};
use crate::config::AppConfig;
use crate::detection::{summarize, Detector, Pipeline};
use crate::input::{load_image, save_image, FrameRead, FrameSource, SourceKind, SourceOpener};
use crate::{gen_time_string, Result};

/// 活动中的视频流, Drop 时释放底层句柄
struct StreamSession {
    source: Box<dyn FrameSource>,
    generation: u64,
}

impl Drop for StreamSession {
    fn drop(&mut self) {
        self.source.release();
    }
}

pub struct Controller<O> {
    state: AppState,
    worker: InferenceWorker,
    opener: O,
    session: Option<StreamSession>,
    timer: PollTimer,
    generation: u64,
    camera_index: usize,
    /// 推理忙时收到的 TestImage, 空闲后补投
    pending_still: bool,
}

impl<O: SourceOpener> Controller<O> {
    pub fn new<D>(pipeline: Pipeline<D>, opener: O, config: &AppConfig) -> Result<Self>
    where
        D: Detector + Send + 'static,
    {
        Ok(Self {
            state: AppState::default(),
            worker: InferenceWorker::spawn(pipeline)?,
            opener,
            session: None,
            timer: PollTimer::new(Duration::from_millis(config.poll_interval_ms.max(1))),
            generation: 0,
            camera_index: config.camera_index,
            pending_still: false,
        })
    }

    pub fn state(&self) -> &AppState {
        &self.state
    }

    pub fn state_mut(&mut self) -> &mut AppState {
        &mut self.state
    }

    pub fn is_streaming(&self) -> bool {
        self.session.is_some()
    }

    pub fn is_busy(&self) -> bool {
        self.worker.is_busy()
    }

    pub fn update(&mut self, message: Message, dialogs: &dyn Dialogs) {
        debug!("📨 {:?}", message);
        match message {
            Message::SelectImage => self.select_image(dialogs),
            Message::TestImage => self.test_image(),
            Message::SaveImage => self.save_result(dialogs),
            Message::ToggleVideo => self.toggle_video(dialogs),
            Message::ToggleCamera => self.toggle_camera(),
            Message::Tick => self.tick(),
            Message::StopStream => self.stop_stream(),
        }
    }

    /// 每个界面帧调用一次: 收取推理结果, 定时器到期则读下一帧
    pub fn on_frame(&mut self, now: Instant) {
        self.poll_worker();
        if self.is_streaming() && self.timer.due(now) {
            self.tick();
        }
    }

    /// 非阻塞收取推理结果
    pub fn poll_worker(&mut self) {
        match self.worker.try_recv() {
            Ok(Some(output)) => self.apply(output),
            Ok(None) => {}
            Err(e) => self.worker_lost(e),
        }
    }

    /// 等待在途任务完成并应用结果; 无任务在途时立即返回 true
    pub fn wait_for_worker(&mut self, timeout: Duration) -> bool {
        let deadline = Instant::now() + timeout;
        while self.worker.is_busy() {
            let left = deadline.saturating_duration_since(Instant::now());
            if left.is_zero() {
                return false;
            }
            match self.worker.recv_timeout(left) {
                Ok(Some(output)) => self.apply(output),
                Ok(None) => return false,
                Err(e) => {
                    self.worker_lost(e);
                    return false;
                }
            }
        }
        true
    }

    fn select_image(&mut self, dialogs: &dyn Dialogs) {
        let Some(path) = dialogs.pick_image() else {
            return;
        };
        match load_image(&path) {
            Ok(image) => {
                self.state.original.set(image.clone());
                self.state.image = Some(image);
                self.state.info = "Image loaded".to_string();
            }
            Err(e) => self.state.warn(format!("Failed to load image: {}", e)),
        }
    }

    fn test_image(&mut self) {
        let Some(image) = self.state.image.clone() else {
            self.state.warn("Select image first");
            return;
        };
        if self.worker.is_busy() {
            debug!("⏳ 推理忙, TestImage 稍后执行");
            self.pending_still = true;
            return;
        }
        self.submit(JobOrigin::Still, image);
    }

    fn save_result(&mut self, dialogs: &dyn Dialogs) {
        let Some(result) = self.state.result.as_ref() else {
            self.state.warn("No result to save");
            return;
        };
        let default_name = format!("result_{}.png", gen_time_string(""));
        let Some(path) = dialogs.save_image(&default_name) else {
            return;
        };
        match save_image(&path, &result.annotated) {
            Ok(_) => self.state.notify("Saved", "Image saved successfully"),
            Err(e) => self.state.warn(format!("Failed to save image: {}", e)),
        }
    }

    fn toggle_video(&mut self, dialogs: &dyn Dialogs) {
        if self.is_streaming() {
            self.stop_stream();
            return;
        }
        let Some(path) = dialogs.pick_video() else {
            return;
        };
        match self.opener.open_video(&path) {
            Ok(source) => {
                info!("🎬 视频已打开: {}", path.display());
                self.start_stream(source, SourceKind::Video);
            }
            Err(e) => self.state.warn(format!("Failed to open video: {}", e)),
        }
    }

    fn toggle_camera(&mut self) {
        if self.is_streaming() {
            self.stop_stream();
            return;
        }
        match self.opener.open_camera(self.camera_index) {
            Ok(source) => {
                info!("📷 摄像头已打开: #{}", self.camera_index);
                self.start_stream(source, SourceKind::Camera);
            }
            Err(e) => self.state.warn(format!("Failed to open camera: {}", e)),
        }
    }

    fn start_stream(&mut self, source: Box<dyn FrameSource>, kind: SourceKind) {
        self.generation += 1;
        self.session = Some(StreamSession {
            source,
            generation: self.generation,
        });
        self.state.stream = StreamState::Running {
            kind,
            generation: self.generation,
        };
        match kind {
            SourceKind::Video => self.state.video_label = STOP_VIDEO,
            SourceKind::Camera => self.state.camera_label = STOP_CAMERA,
        }
        self.timer.start(Instant::now());
    }

    fn stop_stream(&mut self) {
        self.timer.stop();
        if let Some(session) = self.session.take() {
            info!("⏹️ 视频流已停止 (第{}路)", session.generation);
        }
        self.state.reset_stream_labels();
    }

    fn tick(&mut self) {
        let Some(session) = self.session.as_mut() else {
            return;
        };
        if self.worker.is_busy() {
            debug!("⏭️ 推理未完成, 丢弃本次轮询");
            return;
        }
        let generation = session.generation;
        match session.source.read() {
            Ok(FrameRead::Frame(frame)) => {
                self.state.original.set(frame.clone());
                self.submit(JobOrigin::Stream(generation), frame);
            }
            Ok(FrameRead::Pending) => debug!("⏳ 新帧未到, 跳过本次轮询"),
            Ok(FrameRead::End) => {
                info!("🏁 视频流结束");
                self.stop_stream();
            }
            Err(e) => {
                self.stop_stream();
                self.state.warn(format!("Stream stopped: {}", e));
            }
        }
    }

    fn submit(&mut self, origin: JobOrigin, frame: RgbImage) {
        match self.worker.submit(Job { origin, frame }) {
            Ok(_) => {}
            Err(e) => self.worker_lost(e),
        }
    }

    fn current_generation(&self) -> Option<u64> {
        self.session.as_ref().map(|s| s.generation)
    }

    fn apply(&mut self, output: JobOutput) {
        let current = match output.origin {
            JobOrigin::Still => true,
            JobOrigin::Stream(g) => self.current_generation() == Some(g),
        };
        if !current {
            debug!("🗑️ 丢弃过期结果 {:?}", output.origin);
        } else {
            match output.result {
                Ok(result) => {
                    self.state.info = summarize(&result.detections);
                    self.state.tagged.set(result.annotated.clone());
                    self.state.result = Some(result);
                }
                Err(e) => {
                    if matches!(output.origin, JobOrigin::Stream(_)) {
                        self.stop_stream();
                    }
                    self.state.warn(format!("Detection failed: {}", e));
                }
            }
        }

        if self.pending_still && !self.worker.is_busy() {
            self.pending_still = false;
            self.test_image();
        }
    }

    fn worker_lost(&mut self, e: crate::Error) {
        warn!("❌ {}", e);
        self.pending_still = false;
        if self.is_streaming() {
            self.stop_stream();
        }
        self.state.warn(format!("Detection failed: {}", e));
    }
}
