// Ultralytics 🚀 AGPL-3.0 License - https://ultralytics.com/license
//
// 用假检测器 / 假视频源 / 脚本化对话框驱动 Controller

use std::cell::Cell;
use std::collections::VecDeque;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use crossbeam_channel::{unbounded, Receiver, Sender};
use image::{Rgb, RgbImage};

use yolov8_gui::app::{Controller, Dialogs, Message, NoticeLevel, StreamState};
use yolov8_gui::detection::{Annotator, Bbox, Detection, Detector, Pipeline};
use yolov8_gui::input::{FrameRead, FrameSource, SourceKind, SourceOpener};
use yolov8_gui::{AppConfig, Error, Result};

const WAIT: Duration = Duration::from_secs(5);

// ---------- 假检测器 ----------

struct FakeDetector {
    names: Vec<String>,
    calls: Arc<AtomicUsize>,
    gate: Option<Receiver<()>>,
    fail: Arc<AtomicBool>,
}

impl Detector for FakeDetector {
    fn detect(&mut self, _frame: &RgbImage) -> Result<Vec<Detection>> {
        if let Some(gate) = &self.gate {
            let _ = gate.recv();
        }
        self.calls.fetch_add(1, Ordering::SeqCst);
        if self.fail.load(Ordering::SeqCst) {
            return Err(Error::Shape("expected [1, 84, N], got [1, 3]".into()));
        }
        Ok(vec![Detection {
            class_id: 0,
            label: self.names[0].clone(),
            bbox: Bbox::new(1.0, 1.0, 8.0, 8.0, 0, 0.9),
        }])
    }

    fn names(&self) -> &[String] {
        &self.names
    }
}

// ---------- 假视频源 ----------

#[derive(Clone, Copy)]
enum Step {
    Frame,
    Pending,
    End,
    Fail,
}

struct FakeSource {
    steps: VecDeque<Step>,
    reads: Arc<AtomicUsize>,
    released: Arc<AtomicBool>,
}

impl FrameSource for FakeSource {
    fn read(&mut self) -> Result<FrameRead> {
        self.reads.fetch_add(1, Ordering::SeqCst);
        match self.steps.pop_front().unwrap_or(Step::End) {
            Step::Frame => Ok(FrameRead::Frame(RgbImage::from_pixel(
                16,
                16,
                Rgb([90, 90, 90]),
            ))),
            Step::Pending => Ok(FrameRead::Pending),
            Step::End => Ok(FrameRead::End),
            Step::Fail => Err(Error::Decoder("device lost".into())),
        }
    }

    fn release(&mut self) {
        self.released.store(true, Ordering::SeqCst);
    }
}

/// 假视频源的读取次数与释放标记
#[derive(Default, Clone)]
struct SourceStats {
    reads: Arc<AtomicUsize>,
    released: Arc<AtomicBool>,
}

struct FakeOpener {
    steps: Vec<Step>,
    stats: SourceStats,
}

impl FakeOpener {
    fn source(&self) -> Box<dyn FrameSource> {
        self.stats.released.store(false, Ordering::SeqCst);
        Box::new(FakeSource {
            steps: self.steps.iter().copied().collect(),
            reads: self.stats.reads.clone(),
            released: self.stats.released.clone(),
        })
    }
}

impl SourceOpener for FakeOpener {
    fn open_video(&self, path: &Path) -> Result<Box<dyn FrameSource>> {
        assert_eq!(path, Path::new("clip.mp4"));
        Ok(self.source())
    }

    fn open_camera(&self, index: usize) -> Result<Box<dyn FrameSource>> {
        assert_eq!(index, 0);
        Ok(self.source())
    }
}

// ---------- 脚本化对话框 ----------

#[derive(Default)]
struct Script {
    image: Option<PathBuf>,
    video: Option<PathBuf>,
    save: Option<PathBuf>,
    save_asked: Cell<usize>,
}

impl Dialogs for Script {
    fn pick_image(&self) -> Option<PathBuf> {
        self.image.clone()
    }

    fn pick_video(&self) -> Option<PathBuf> {
        self.video.clone()
    }

    fn save_image(&self, default_name: &str) -> Option<PathBuf> {
        assert!(default_name.starts_with("result_"));
        self.save_asked.set(self.save_asked.get() + 1);
        self.save.clone()
    }
}

struct Harness {
    controller: Controller<FakeOpener>,
    calls: Arc<AtomicUsize>,
    fail: Arc<AtomicBool>,
    stats: SourceStats,
    gate: Option<Sender<()>>,
}

fn harness(steps: Vec<Step>, gated: bool) -> Harness {
    let calls = Arc::new(AtomicUsize::new(0));
    let fail = Arc::new(AtomicBool::new(false));
    let (gate_tx, gate_rx) = unbounded();
    let detector = FakeDetector {
        names: vec!["person".into()],
        calls: calls.clone(),
        gate: gated.then_some(gate_rx),
        fail: fail.clone(),
    };
    let stats = SourceStats::default();
    let opener = FakeOpener {
        steps,
        stats: stats.clone(),
    };
    let pipeline = Pipeline::new(detector, Annotator::default());
    let controller = Controller::new(pipeline, opener, &AppConfig::default()).unwrap();
    Harness {
        controller,
        calls,
        fail,
        stats,
        gate: gated.then_some(gate_tx),
    }
}

fn video_script() -> Script {
    Script {
        video: Some(PathBuf::from("clip.mp4")),
        ..Default::default()
    }
}

fn write_png(dir: &Path, name: &str) -> PathBuf {
    let path = dir.join(name);
    RgbImage::from_pixel(24, 16, Rgb([200, 10, 10]))
        .save(&path)
        .unwrap();
    path
}

// ---------- 静态图片 ----------

#[test]
fn test_image_without_image_warns_and_skips_detector() {
    let mut h = harness(vec![], false);
    h.controller.update(Message::TestImage, &Script::default());

    assert!(h.controller.wait_for_worker(WAIT));
    assert_eq!(h.calls.load(Ordering::SeqCst), 0);
    let notice = h.controller.state_mut().take_notice().unwrap();
    assert_eq!(notice.level, NoticeLevel::Warning);
    assert_eq!(notice.text, "Select image first");
    assert!(h.controller.state().result.is_none());
}

#[test]
fn save_without_result_warns_and_writes_nothing() {
    let dir = tempfile::tempdir().unwrap();
    let target = dir.path().join("out.png");
    let script = Script {
        save: Some(target.clone()),
        ..Default::default()
    };
    let mut h = harness(vec![], false);
    h.controller.update(Message::SaveImage, &script);

    assert_eq!(
        h.controller.state_mut().take_notice().unwrap().text,
        "No result to save"
    );
    assert_eq!(script.save_asked.get(), 0);
    assert!(!target.exists());
}

#[test]
fn select_detect_and_save_roundtrip() {
    let dir = tempfile::tempdir().unwrap();
    let script = Script {
        image: Some(write_png(dir.path(), "input.png")),
        save: Some(dir.path().join("result")),
        ..Default::default()
    };
    let mut h = harness(vec![], false);

    h.controller.update(Message::SelectImage, &script);
    assert_eq!(h.controller.state().info, "Image loaded");
    assert_eq!(h.controller.state().original.revision, 1);

    h.controller.update(Message::TestImage, &script);
    assert!(h.controller.wait_for_worker(WAIT));
    assert_eq!(h.calls.load(Ordering::SeqCst), 1);
    assert_eq!(h.controller.state().info, "Detected -> person: 1");
    assert_eq!(h.controller.state().tagged.revision, 1);

    h.controller.update(Message::SaveImage, &script);
    let notice = h.controller.state_mut().take_notice().unwrap();
    assert_eq!(notice.level, NoticeLevel::Info);
    assert_eq!(notice.text, "Image saved successfully");
    let saved = dir.path().join("result.png");
    assert_eq!(image::open(saved).unwrap().to_rgb8().dimensions(), (24, 16));
}

#[test]
fn undecodable_image_keeps_previous_state() {
    let dir = tempfile::tempdir().unwrap();
    let good = write_png(dir.path(), "good.png");
    let bad = dir.path().join("bad.png");
    std::fs::write(&bad, b"garbage").unwrap();

    let mut h = harness(vec![], false);
    h.controller.update(
        Message::SelectImage,
        &Script {
            image: Some(good),
            ..Default::default()
        },
    );
    h.controller.update(
        Message::SelectImage,
        &Script {
            image: Some(bad),
            ..Default::default()
        },
    );

    let state = h.controller.state_mut();
    assert!(state
        .take_notice()
        .unwrap()
        .text
        .starts_with("Failed to load image: "));
    assert_eq!(state.image.as_ref().unwrap().dimensions(), (24, 16));
    assert_eq!(state.original.revision, 1);
    assert_eq!(state.info, "Image loaded");
}

#[test]
fn cancelled_save_dialog_writes_nothing() {
    let dir = tempfile::tempdir().unwrap();
    let script = Script {
        image: Some(write_png(dir.path(), "input.png")),
        ..Default::default()
    };
    let mut h = harness(vec![], false);
    h.controller.update(Message::SelectImage, &script);
    h.controller.update(Message::TestImage, &script);
    assert!(h.controller.wait_for_worker(WAIT));

    h.controller.update(Message::SaveImage, &script);
    assert_eq!(script.save_asked.get(), 1);
    assert!(h.controller.state().notices.is_empty());
    let files: Vec<_> = std::fs::read_dir(dir.path()).unwrap().collect();
    assert_eq!(files.len(), 1);
}

#[test]
fn failed_save_warns_and_keeps_result() {
    let dir = tempfile::tempdir().unwrap();
    let target = dir.path().join("missing").join("out.png");
    let script = Script {
        image: Some(write_png(dir.path(), "input.png")),
        save: Some(target.clone()),
        ..Default::default()
    };
    let mut h = harness(vec![], false);
    h.controller.update(Message::SelectImage, &script);
    h.controller.update(Message::TestImage, &script);
    assert!(h.controller.wait_for_worker(WAIT));

    h.controller.update(Message::SaveImage, &script);
    let notice = h.controller.state_mut().take_notice().unwrap();
    assert_eq!(notice.level, NoticeLevel::Warning);
    assert!(notice.text.starts_with("Failed to save image: "));
    assert!(!target.exists());
    assert!(h.controller.state().result.is_some());
}

#[test]
fn still_detection_failure_warns_and_keeps_previous_result() {
    let dir = tempfile::tempdir().unwrap();
    let script = Script {
        image: Some(write_png(dir.path(), "input.png")),
        ..Default::default()
    };
    let mut h = harness(vec![], false);
    h.controller.update(Message::SelectImage, &script);
    h.controller.update(Message::TestImage, &script);
    assert!(h.controller.wait_for_worker(WAIT));

    h.fail.store(true, Ordering::SeqCst);
    h.controller.update(Message::TestImage, &script);
    assert!(h.controller.wait_for_worker(WAIT));

    let state = h.controller.state_mut();
    let notice = state.take_notice().unwrap();
    assert_eq!(notice.level, NoticeLevel::Warning);
    assert_eq!(
        notice.text,
        "Detection failed: unexpected tensor shape: expected [1, 84, N], got [1, 3]"
    );
    assert_eq!(state.tagged.revision, 1);
    assert_eq!(state.info, "Detected -> person: 1");
}

// ---------- 视频流 ----------

#[test]
fn video_toggle_sets_and_restores_label() {
    let mut h = harness(vec![Step::Frame; 4], false);
    let script = video_script();

    h.controller.update(Message::ToggleVideo, &script);
    assert!(h.controller.is_streaming());
    assert_eq!(h.controller.state().video_label, "Stop Video");
    assert_eq!(h.controller.state().camera_label, "Test Camera");
    assert_eq!(
        h.controller.state().stream,
        StreamState::Running {
            kind: SourceKind::Video,
            generation: 1
        }
    );

    h.controller.update(Message::ToggleVideo, &script);
    assert!(!h.controller.is_streaming());
    assert_eq!(h.controller.state().video_label, "Test Video");
    assert_eq!(h.controller.state().stream, StreamState::Idle);
    assert!(h.stats.released.load(Ordering::SeqCst));
}

#[test]
fn cancelled_video_dialog_stays_idle() {
    let mut h = harness(vec![Step::Frame], false);
    h.controller.update(Message::ToggleVideo, &Script::default());

    assert!(!h.controller.is_streaming());
    assert_eq!(h.controller.state().video_label, "Test Video");
    assert!(h.controller.state().notices.is_empty());
}

#[test]
fn either_button_stops_a_running_stream() {
    let mut h = harness(vec![Step::Frame; 4], false);
    h.controller.update(Message::ToggleCamera, &Script::default());
    assert_eq!(h.controller.state().camera_label, "Stop Camera");

    h.controller.update(Message::ToggleVideo, &video_script());
    assert!(!h.controller.is_streaming());
    assert_eq!(h.controller.state().camera_label, "Test Camera");
    assert_eq!(h.controller.state().video_label, "Test Video");
}

#[test]
fn end_of_stream_resets_both_labels() {
    let mut h = harness(vec![Step::End], false);
    h.controller.update(Message::ToggleCamera, &Script::default());
    h.controller.update(Message::Tick, &Script::default());

    let state = h.controller.state();
    assert_eq!(state.stream, StreamState::Idle);
    assert_eq!(state.video_label, "Test Video");
    assert_eq!(state.camera_label, "Test Camera");
    assert!(state.notices.is_empty());
    assert!(h.stats.released.load(Ordering::SeqCst));
}

#[test]
fn read_error_stops_stream_with_warning() {
    let mut h = harness(vec![Step::Fail], false);
    h.controller.update(Message::ToggleVideo, &video_script());
    h.controller.update(Message::Tick, &Script::default());

    assert!(!h.controller.is_streaming());
    let notice = h.controller.state_mut().take_notice().unwrap();
    assert!(notice.text.starts_with("Stream stopped: "));
}

#[test]
fn stream_frame_is_shown_and_detected() {
    let mut h = harness(vec![Step::Frame, Step::Frame], false);
    h.controller.update(Message::ToggleVideo, &video_script());
    h.controller.update(Message::Tick, &Script::default());
    assert!(h.controller.wait_for_worker(WAIT));

    let state = h.controller.state();
    assert_eq!(state.original.revision, 1);
    assert_eq!(state.tagged.revision, 1);
    assert_eq!(state.info, "Detected -> person: 1");
    assert!(state.result.is_some());
    assert!(h.controller.is_streaming());
}

#[test]
fn ticks_are_dropped_while_busy() {
    let mut h = harness(vec![Step::Frame; 4], true);
    h.controller.update(Message::ToggleVideo, &video_script());

    h.controller.update(Message::Tick, &Script::default());
    h.controller.update(Message::Tick, &Script::default());
    h.controller.update(Message::Tick, &Script::default());
    assert_eq!(h.stats.reads.load(Ordering::SeqCst), 1);

    h.gate.as_ref().unwrap().send(()).unwrap();
    assert!(h.controller.wait_for_worker(WAIT));
    h.controller.update(Message::Tick, &Script::default());
    assert_eq!(h.stats.reads.load(Ordering::SeqCst), 2);

    h.gate.as_ref().unwrap().send(()).unwrap();
    assert!(h.controller.wait_for_worker(WAIT));
}

#[test]
fn stale_results_from_stopped_session_are_ignored() {
    let mut h = harness(vec![Step::Frame; 4], true);
    h.controller.update(Message::ToggleVideo, &video_script());
    h.controller.update(Message::Tick, &Script::default());
    h.controller.update(Message::StopStream, &Script::default());

    h.gate.as_ref().unwrap().send(()).unwrap();
    assert!(h.controller.wait_for_worker(WAIT));

    assert_eq!(h.calls.load(Ordering::SeqCst), 1);
    let state = h.controller.state();
    assert_eq!(state.tagged.revision, 0);
    assert!(state.result.is_none());
    assert!(state.info.is_empty());
}

#[test]
fn test_image_while_busy_runs_after_stream_frame() {
    let dir = tempfile::tempdir().unwrap();
    let script = Script {
        image: Some(write_png(dir.path(), "still.png")),
        video: Some(PathBuf::from("clip.mp4")),
        ..Default::default()
    };
    let mut h = harness(vec![Step::Frame; 4], true);
    h.controller.update(Message::SelectImage, &script);
    h.controller.update(Message::ToggleVideo, &script);
    h.controller.update(Message::Tick, &script);
    h.controller.update(Message::TestImage, &script);

    // 视频帧完成后补投静态图
    let gate = h.gate.clone().unwrap();
    gate.send(()).unwrap();
    gate.send(()).unwrap();
    assert!(h.controller.wait_for_worker(WAIT));
    assert!(h.controller.wait_for_worker(WAIT));

    assert_eq!(h.calls.load(Ordering::SeqCst), 2);
    assert_eq!(h.controller.state().tagged.revision, 2);
    let result = h.controller.state().result.as_ref().unwrap();
    assert_eq!(result.annotated.dimensions(), (24, 16));
}

#[test]
fn pending_frame_keeps_stream_without_detecting() {
    let mut h = harness(vec![Step::Pending, Step::Frame], false);
    h.controller.update(Message::ToggleCamera, &Script::default());

    h.controller.update(Message::Tick, &Script::default());
    assert!(h.controller.is_streaming());
    assert!(!h.controller.is_busy());
    assert_eq!(h.controller.state().original.revision, 0);
    assert!(h.controller.state().notices.is_empty());

    h.controller.update(Message::Tick, &Script::default());
    assert!(h.controller.wait_for_worker(WAIT));
    assert_eq!(h.stats.reads.load(Ordering::SeqCst), 2);
    assert_eq!(h.calls.load(Ordering::SeqCst), 1);
    assert_eq!(h.controller.state().original.revision, 1);
}

#[test]
fn stream_detection_failure_stops_stream() {
    let mut h = harness(vec![Step::Frame; 4], false);
    h.fail.store(true, Ordering::SeqCst);
    h.controller.update(Message::ToggleVideo, &video_script());
    h.controller.update(Message::Tick, &Script::default());
    assert!(h.controller.wait_for_worker(WAIT));

    assert!(!h.controller.is_streaming());
    assert!(h.stats.released.load(Ordering::SeqCst));
    let state = h.controller.state_mut();
    assert_eq!(state.stream, StreamState::Idle);
    assert_eq!(state.video_label, "Test Video");
    assert_eq!(state.camera_label, "Test Camera");
    assert!(state.result.is_none());
    let notice = state.take_notice().unwrap();
    assert!(notice.text.starts_with("Detection failed: "));
}

#[test]
fn still_detection_failure_leaves_stream_running() {
    let dir = tempfile::tempdir().unwrap();
    let script = Script {
        image: Some(write_png(dir.path(), "still.png")),
        video: Some(PathBuf::from("clip.mp4")),
        ..Default::default()
    };
    let mut h = harness(vec![Step::Frame; 4], false);
    h.controller.update(Message::SelectImage, &script);
    h.controller.update(Message::ToggleVideo, &script);

    h.fail.store(true, Ordering::SeqCst);
    h.controller.update(Message::TestImage, &script);
    assert!(h.controller.wait_for_worker(WAIT));

    assert!(h.controller.is_streaming());
    assert_eq!(h.controller.state().video_label, "Stop Video");
    let notice = h.controller.state_mut().take_notice().unwrap();
    assert!(notice.text.starts_with("Detection failed: "));
}
