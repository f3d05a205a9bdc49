use ash::vk;
use ravel_gfx::resources::handles::GfxImageHandle;

use crate::render_graph::{RgExportInfo, RgImageState};

/// 图像资源条目
///
/// 只支持从外部导入的图像
#[derive(Clone, Debug)]
pub struct RgImageResource {
    /// 物理 image handle
    pub image_handle: GfxImageHandle,
    /// 导入时的状态
    pub initial_state: RgImageState,
    /// 图像格式（用于推断 barrier aspect）
    pub format: vk::Format,
    /// 调试名称
    pub name: String,
    /// 执行完毕后需要转换到的状态
    pub export: Option<RgExportInfo>,
}

// new & init
impl RgImageResource {
    /// 创建导入的图像资源
    pub fn imported(
        name: impl Into<String>,
        image_handle: GfxImageHandle,
        format: vk::Format,
        initial_state: RgImageState,
    ) -> Self {
        Self {
            image_handle,
            initial_state,
            format,
            name: name.into(),
            export: None,
        }
    }
}

// getters
impl RgImageResource {
    /// 根据格式推断 aspect flags
    #[inline]
    pub fn infer_aspect(&self) -> vk::ImageAspectFlags {
        match self.format {
            vk::Format::D16_UNORM | vk::Format::D32_SFLOAT | vk::Format::X8_D24_UNORM_PACK32 => {
                vk::ImageAspectFlags::DEPTH
            }
            vk::Format::S8_UINT => vk::ImageAspectFlags::STENCIL,
            vk::Format::D16_UNORM_S8_UINT | vk::Format::D24_UNORM_S8_UINT | vk::Format::D32_SFLOAT_S8_UINT => {
                vk::ImageAspectFlags::DEPTH | vk::ImageAspectFlags::STENCIL
            }
            _ => vk::ImageAspectFlags::COLOR,
        }
    }

    #[inline]
    pub fn is_exported(&self) -> bool {
        self.export.is_some()
    }
}
