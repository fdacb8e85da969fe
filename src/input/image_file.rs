//! 静态图片读写

use std::path::{Path, PathBuf};

use image::{ImageReader, RgbImage};
use tracing::info;

use crate::Result;

/// 读取图片并转为 RGB
pub fn load_image(path: &Path) -> Result<RgbImage> {
    let image = ImageReader::open(path)?
        .with_guessed_format()?
        .decode()?
        .to_rgb8();
    info!(
        "🖼️ 图片已加载: {} ({}x{})",
        path.display(),
        image.width(),
        image.height()
    );
    Ok(image)
}

/// 按扩展名保存图片, 无扩展名时补 `.png`; 返回实际写入路径
pub fn save_image(path: &Path, image: &RgbImage) -> Result<PathBuf> {
    let path = match path.extension() {
        Some(_) => path.to_path_buf(),
        None => path.with_extension("png"),
    };
    image.save(&path)?;
    info!("💾 图片已保存: {}", path.display());
    Ok(path)
}
