/// YOLOv8 目标检测界面
///
/// 静态图片 / 本地视频 / 摄像头, 左侧原图, 右侧标注结果
///
/// 主程序入口 - 直接运行: cargo run --bin yolov8-gui --release
use anyhow::Context;
use clap::Parser;
use macroquad::prelude::next_frame;
use macroquad::window::{Conf, Window};
use mimalloc::MiMalloc;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

use yolov8_gui::app::{Controller, RfdDialogs};
use yolov8_gui::detection::Annotator;
use yolov8_gui::input::FfmpegOpener;
use yolov8_gui::renderer::Renderer;
use yolov8_gui::{AppConfig, Args, Pipeline, YOLOv8};

#[global_allocator]
static GLOBAL: MiMalloc = MiMalloc;

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .init();

    let args = Args::parse();
    let config = AppConfig::load(&args.config).with_args(&args);
    config.print_summary();

    // 模型缺失: 弹窗后退出
    if !config.model_path.exists() {
        let text = format!("{} not found", config.model_path.display());
        error!("❌ {}", text);
        RfdDialogs.show_fatal(&text);
        std::process::exit(1);
    }

    let model = match YOLOv8::new(&config) {
        Ok(model) => model,
        Err(e) => {
            error!("❌ 模型加载失败: {}", e);
            RfdDialogs.show_fatal(&e.to_string());
            std::process::exit(1);
        }
    };
    model.summary();

    let annotator = Annotator::from_font_file(config.font_path.as_deref());
    let pipeline = Pipeline::new(model, annotator);
    let controller =
        Controller::new(pipeline, FfmpegOpener, &config).context("启动推理线程失败")?;

    let conf = Conf {
        window_title: "YOLOv8 Object Detection GUI".to_owned(),
        window_width: config.window_width,
        window_height: config.window_height,
        window_resizable: true,
        ..Default::default()
    };

    info!("✅ 系统就绪");
    Window::from_config(conf, async move {
        let mut renderer = Renderer::new(controller);
        loop {
            renderer.frame();
            next_frame().await;
        }
    });
    Ok(())
}
