// Ultralytics 🚀 AGPL-3.0 License - https://ultralytics.com/license
//! 推理工作线程
//!
//! 界面线程只负责投递帧和收取结果, 检测在独立线程上串行执行.
//! 同一时刻最多一个任务在途, 忙时由调用方丢弃新帧.

use std::thread::JoinHandle;
use std::time::Duration;

use crossbeam_channel::{bounded, Receiver, RecvTimeoutError, Sender, TryRecvError};
use image::RgbImage;
use tracing::{debug, error, info};

use crate::detection::{DetectionResult, Detector, Pipeline};
use crate::{Error, Result};

/// 任务来源: 静态图片, 或某一代视频流
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JobOrigin {
    Still,
    Stream(u64),
}

pub struct Job {
    pub origin: JobOrigin,
    pub frame: RgbImage,
}

pub struct JobOutput {
    pub origin: JobOrigin,
    pub result: Result<DetectionResult>,
}

pub struct InferenceWorker {
    jobs: Option<Sender<Job>>,
    outputs: Receiver<JobOutput>,
    handle: Option<JoinHandle<()>>,
    in_flight: bool,
}

impl InferenceWorker {
    pub fn spawn<D>(mut pipeline: Pipeline<D>) -> Result<Self>
    where
        D: Detector + Send + 'static,
    {
        let (jobs, job_rx) = bounded::<Job>(1);
        let (out_tx, outputs) = bounded::<JobOutput>(1);

        let handle = std::thread::Builder::new()
            .name("inference".into())
            .spawn(move || {
                info!("🧠 推理线程已启动");
                for job in job_rx {
                    let result = pipeline.run(&job.frame);
                    if let Err(e) = &result {
                        error!("❌ 推理失败: {}", e);
                    }
                    let output = JobOutput {
                        origin: job.origin,
                        result,
                    };
                    if out_tx.send(output).is_err() {
                        break;
                    }
                }
                info!("🧠 推理线程已退出");
            })?;

        Ok(Self {
            jobs: Some(jobs),
            outputs,
            handle: Some(handle),
            in_flight: false,
        })
    }

    pub fn is_busy(&self) -> bool {
        self.in_flight
    }

    /// 投递一帧; 已有任务在途时返回 `Ok(false)` 且不投递
    pub fn submit(&mut self, job: Job) -> Result<bool> {
        if self.in_flight {
            debug!("⏭️ 推理忙, 跳过 {:?}", job.origin);
            return Ok(false);
        }
        let jobs = self.jobs.as_ref().ok_or(Error::WorkerGone)?;
        jobs.send(job).map_err(|_| Error::WorkerGone)?;
        self.in_flight = true;
        Ok(true)
    }

    /// 非阻塞收取结果
    pub fn try_recv(&mut self) -> Result<Option<JobOutput>> {
        match self.outputs.try_recv() {
            Ok(output) => {
                self.in_flight = false;
                Ok(Some(output))
            }
            Err(TryRecvError::Empty) => Ok(None),
            Err(TryRecvError::Disconnected) => {
                self.in_flight = false;
                Err(Error::WorkerGone)
            }
        }
    }

    /// 阻塞收取结果, 最多等待 `timeout`
    pub fn recv_timeout(&mut self, timeout: Duration) -> Result<Option<JobOutput>> {
        match self.outputs.recv_timeout(timeout) {
            Ok(output) => {
                self.in_flight = false;
                Ok(Some(output))
            }
            Err(RecvTimeoutError::Timeout) => Ok(None),
            Err(RecvTimeoutError::Disconnected) => {
                self.in_flight = false;
                Err(Error::WorkerGone)
            }
        }
    }
}

impl Drop for InferenceWorker {
    fn drop(&mut self) {
        // 关闭任务通道, 线程随之退出
        self.jobs.take();
        // 排空结果, 避免线程阻塞在 send 上
        while self.outputs.try_recv().is_ok() {}
        if let Some(handle) = self.handle.take() {
            let _ = handle.join();
        }
    }
}
