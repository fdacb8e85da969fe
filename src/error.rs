// Ultralytics 🚀 AGPL-3.0 License - https://ultralytics.com/license
//
// 库级错误类型
// Display 文本会出现在界面提示框中, 统一用英文

use std::path::PathBuf;

use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    #[error("{} not found", .0.display())]
    ModelNotFound(PathBuf),
    #[error("ONNX Runtime error: {0}")]
    Ort(String),
    #[error("{0}")]
    Image(#[from] image::ImageError),
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("{0}")]
    Decoder(String),
    #[error("unexpected tensor shape: {0}")]
    Shape(String),
    #[error("resize failed: {0}")]
    Resize(String),
    #[error("inference worker stopped")]
    WorkerGone,
}

impl From<ndarray::ShapeError> for Error {
    fn from(err: ndarray::ShapeError) -> Self {
        Error::Shape(err.to_string())
    }
}

pub type Result<T> = std::result::Result<T, Error>;
