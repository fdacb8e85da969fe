// Ultralytics 🚀 AGPL-3.0 License - https://ultralytics.com/license
//
// ONNX Runtime 推理后端: 会话构建、执行设备选择、元数据读取

use std::path::{Path, PathBuf};

use ndarray::{Array, ArrayD, IxDyn, Ix4};
use ort::execution_providers::CUDAExecutionProvider;
use ort::session::builder::GraphOptimizationLevel;
use ort::session::Session;
use ort::value::TensorRef;
use regex::Regex;
use tracing::{info, warn};

use crate::{Error, Result};

/// 执行设备
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OrtEP {
    CPU,
    CUDA(i32),
}

#[derive(Debug, Clone)]
pub struct OrtConfig {
    pub f: PathBuf,
    pub ep: OrtEP,
    pub image_size: u32,
}

fn ort_err<E: std::fmt::Display>(e: E) -> Error {
    Error::Ort(e.to_string())
}

pub struct OrtBackend {
    session: Session,
    input_name: String,
    ep: OrtEP,
    image_size: u32,
    names: Option<Vec<String>>,
}

impl OrtBackend {
    pub fn build(config: OrtConfig) -> Result<Self> {
        if !config.f.exists() {
            return Err(Error::ModelNotFound(config.f));
        }

        let mut builder = Session::builder()
            .map_err(ort_err)?
            .with_optimization_level(GraphOptimizationLevel::Level3)
            .map_err(ort_err)?;

        if let OrtEP::CUDA(device_id) = config.ep {
            builder = builder
                .with_execution_providers([CUDAExecutionProvider::default()
                    .with_device_id(device_id)
                    .build()])
                .map_err(ort_err)?;
        }

        let session = builder.commit_from_file(&config.f).map_err(ort_err)?;

        let input_name = session
            .inputs
            .first()
            .map(|input| input.name.clone())
            .ok_or_else(|| Error::Shape("model has no input".into()))?;

        let names = session
            .metadata()
            .ok()
            .and_then(|meta| meta.custom("names").ok().flatten())
            .map(|raw| parse_names(&raw))
            .filter(|names| !names.is_empty());

        info!(
            "✅ 模型加载成功: {} (输入: {}, EP: {:?}, 类别数: {})",
            config.f.display(),
            input_name,
            config.ep,
            names.as_ref().map_or(0, |n| n.len())
        );

        Ok(Self {
            session,
            input_name,
            ep: config.ep,
            image_size: config.image_size,
            names,
        })
    }

    /// 执行一次前向推理, 返回全部输出张量
    pub fn run(&mut self, xs: Array<f32, Ix4>) -> Result<Vec<ArrayD<f32>>> {
        let input = TensorRef::from_array_view(xs.view()).map_err(ort_err)?;
        let outputs = self
            .session
            .run(ort::inputs![self.input_name.as_str() => input])
            .map_err(ort_err)?;

        let mut ys = Vec::with_capacity(outputs.len());
        for (_, value) in outputs.iter() {
            let (shape, data) = value.try_extract_tensor::<f32>().map_err(ort_err)?;
            let dims: Vec<usize> = shape.iter().map(|&d| d.max(0) as usize).collect();
            ys.push(ArrayD::from_shape_vec(IxDyn(&dims), data.to_vec())?);
        }
        Ok(ys)
    }

    pub fn ep(&self) -> OrtEP {
        self.ep
    }

    pub fn image_size(&self) -> u32 {
        self.image_size
    }

    /// 模型元数据中的类别名
    pub fn names(&self) -> Option<&Vec<String>> {
        self.names.as_ref()
    }
}

/// 解析 ultralytics 导出的 names 元数据: `{0: 'person', 1: 'bicycle'}`
pub fn parse_names(raw: &str) -> Vec<String> {
    let re = match Regex::new(r#"(\d+)\s*:\s*(?:'((?:[^'\\]|\\.)*)'|"((?:[^"\\]|\\.)*)")"#) {
        Ok(re) => re,
        Err(e) => {
            warn!("⚠️ names 正则构建失败: {}", e);
            return Vec::new();
        }
    };

    let mut pairs: Vec<(usize, String)> = re
        .captures_iter(raw)
        .filter_map(|cap| {
            let id = cap.get(1)?.as_str().parse().ok()?;
            let name = cap.get(2).or_else(|| cap.get(3))?.as_str().to_string();
            Some((id, name))
        })
        .collect();
    pairs.sort_by_key(|(id, _)| *id);

    let len = pairs.last().map_or(0, |(id, _)| id + 1);
    let mut names: Vec<String> = (0..len).map(|i| format!("class{}", i)).collect();
    for (id, name) in pairs {
        names[id] = name;
    }
    names
}

/// 读取类别名文件, 每行一个
pub fn load_names_file(path: &Path) -> Result<Vec<String>> {
    let content = std::fs::read_to_string(path)?;
    Ok(content
        .lines()
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
        .collect())
}
