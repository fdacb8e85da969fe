// 构建脚本: Windows MSVC 下静态 FFmpeg 额外需要的系统库
use std::env;

fn main() {
    println!("cargo:rerun-if-changed=build.rs");

    let os = env::var("CARGO_CFG_TARGET_OS").unwrap_or_default();
    let target_env = env::var("CARGO_CFG_TARGET_ENV").unwrap_or_default();
    if os != "windows" || target_env != "msvc" {
        return;
    }

    // libmfx: Intel QSV | oleaut32/vfw32/strmiids: dshow 摄像头 | secur32: TLS
    for lib in ["libmfx", "libx264", "oleaut32", "vfw32", "secur32", "strmiids"] {
        println!("cargo:rustc-link-lib=dylib={}", lib);
    }
}
