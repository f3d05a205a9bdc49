use std::path::{Path, PathBuf};

/// 统一路径管理
///
/// 所有路径基于工作区根目录（通过 `CARGO_MANIFEST_DIR` 推导）。
///
/// # 使用示例
/// ```ignore
/// let config = RavelPath::config_path("cornell.toml");  // config/cornell.toml
/// let output = RavelPath::output_path("frame.png");     // target/ravel-output/frame.png
/// ```
pub struct RavelPath {}
// 核心路径
impl RavelPath {
    /// 获取工作区根目录
    ///
    /// 从 engine/crates/ravel-crate-tools 向上三级
    pub fn workspace_path() -> PathBuf {
        let manifest_dir = Path::new(env!("CARGO_MANIFEST_DIR"));
        manifest_dir.ancestors().nth(3).unwrap_or(manifest_dir).to_path_buf()
    }

    pub fn target_path() -> PathBuf {
        Self::workspace_path().join("target")
    }
}
// 根目录下
impl RavelPath {
    /// 获取 `config/` 目录下的文件路径
    pub fn config_path(filename: &str) -> PathBuf {
        Self::workspace_path().join("config").join(filename)
    }

    /// 渲染结果的输出目录：`target/ravel-output/`
    pub fn output_path(filename: &str) -> PathBuf {
        Self::target_path().join("ravel-output").join(filename)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_workspace_contains_engine_dir() {
        let workspace = RavelPath::workspace_path();
        assert!(workspace.join("engine").is_dir());
    }

    #[test]
    fn test_output_path_under_target() {
        let output = RavelPath::output_path("a.png");
        assert!(output.starts_with(RavelPath::target_path()));
        assert_eq!(output.file_name().and_then(|s| s.to_str()), Some("a.png"));
    }
}
