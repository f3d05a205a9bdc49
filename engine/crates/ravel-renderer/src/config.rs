//! 从 TOML 文件读取的渲染配置
//!
//! 所有 section 和字段都有默认值，空文件等价于默认配置。
//!
//! ```toml
//! [output]
//! width = 640
//! height = 360
//! frames = 64
//! entry_point = "render_graph"
//!
//! [environment]
//! sky_srgb = [0.0, 0.0, 1.0]
//! ground_srgb = [0.5, 0.5, 0.5]
//!
//! [accel]
//! instance_policy = "alpha_tested"
//! layer_mask = 1
//! ```

use std::path::{Path, PathBuf};

use serde::Deserialize;

use crate::settings::{CameraConfig, EnvironmentSettings, InstancePolicy, RendererSettings};

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to read config `{}`", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse config: {0}")]
    Parse(#[from] toml::de::Error),
}

/// 使用哪一个入口录制一帧
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EntryPoint {
    /// 直接录制命令，手动插入 barrier
    #[default]
    Direct,
    /// 通过 render graph 推导执行顺序与 barrier
    RenderGraph,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct OutputSection {
    pub width: u32,
    pub height: u32,
    /// 一共渲染多少帧
    pub frames: u32,
    pub entry_point: EntryPoint,
    /// 输出文件名，位于 target/ravel-output 下
    pub file_name: String,
}

impl Default for OutputSection {
    fn default() -> Self {
        Self {
            width: 640,
            height: 360,
            frames: 64,
            entry_point: EntryPoint::default(),
            file_name: "ravel-frame.png".to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct CameraSection {
    pub position: [f32; 3],
    pub yaw_deg: f32,
    pub pitch_deg: f32,
    pub fov_y_deg: f32,
    pub near: f32,
    pub far: f32,
    /// 在第几帧开始前移动相机，用于观察累积被重置
    pub move_at_frame: Option<u32>,
}

impl Default for CameraSection {
    fn default() -> Self {
        let projection = CameraConfig::default();
        Self {
            position: [0.0, 1.5, 6.0],
            yaw_deg: 0.0,
            pitch_deg: -10.0,
            fov_y_deg: projection.fov_y_deg,
            near: projection.near,
            far: projection.far,
            move_at_frame: None,
        }
    }
}

/// 颜色使用 sRGB 空间书写，加载时转换为线性空间
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct EnvironmentSection {
    pub sky_srgb: [f32; 3],
    pub ground_srgb: [f32; 3],
}

impl Default for EnvironmentSection {
    fn default() -> Self {
        Self {
            sky_srgb: [0.0, 0.0, 1.0],
            ground_srgb: [0.5, 0.5, 0.5],
        }
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct AccelSection {
    pub instance_policy: InstancePolicy,
    pub layer_mask: u32,
}

impl Default for AccelSection {
    fn default() -> Self {
        Self {
            instance_policy: InstancePolicy::default(),
            layer_mask: RendererSettings::DEFAULT_LAYER_MASK,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Default, Deserialize)]
#[serde(default)]
pub struct RendererConfig {
    pub output: OutputSection,
    pub camera: CameraSection,
    pub environment: EnvironmentSection,
    pub accel: AccelSection,
}

impl RendererConfig {
    pub fn from_toml_str(content: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(content)?)
    }

    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml_str(&content)
    }

    pub fn renderer_settings(&self) -> RendererSettings {
        RendererSettings {
            environment: EnvironmentSettings::from_srgb(
                self.environment.sky_srgb.into(),
                self.environment.ground_srgb.into(),
            ),
            instance_policy: self.accel.instance_policy,
            layer_mask: self.accel.layer_mask,
        }
    }

    pub fn camera_config(&self) -> CameraConfig {
        CameraConfig {
            fov_y_deg: self.camera.fov_y_deg,
            near: self.camera.near,
            far: self.camera.far,
        }
    }
}
