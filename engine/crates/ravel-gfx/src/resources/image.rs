use ash::vk;

/// 创建 image 需要的描述信息
///
/// 只支持 2D，mip 和 array layer 都固定为 1
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct GfxImageDesc {
    pub extent: vk::Extent2D,
    pub format: vk::Format,
    pub usage: vk::ImageUsageFlags,
}

impl GfxImageDesc {
    #[inline]
    pub fn new_image_2d_info(extent: vk::Extent2D, format: vk::Format, usage: vk::ImageUsageFlags) -> Self {
        Self { extent, format, usage }
    }

    /// 光追输出以及累积使用的 HDR storage image
    #[inline]
    pub fn new_hdr_storage_2d(extent: vk::Extent2D) -> Self {
        Self::new_image_2d_info(
            extent,
            vk::Format::R32G32B32A32_SFLOAT,
            vk::ImageUsageFlags::STORAGE | vk::ImageUsageFlags::TRANSFER_SRC | vk::ImageUsageFlags::TRANSFER_DST,
        )
    }

    #[inline]
    pub fn texel_count(&self) -> usize {
        self.extent.width as usize * self.extent.height as usize
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.extent.width == 0 || self.extent.height == 0
    }
}

/// 格式相关的工具类
pub struct GfxFormatUtils;

impl GfxFormatUtils {
    /// 每个像素需要的字节数；不认识的格式返回 None
    pub fn pixel_size_in_bytes(format: vk::Format) -> Option<usize> {
        match format {
            vk::Format::R8G8B8A8_UNORM | vk::Format::R8G8B8A8_SRGB | vk::Format::B8G8R8A8_SRGB => Some(4),
            vk::Format::R16G16B16A16_SFLOAT => Some(8),
            vk::Format::R32G32B32A32_SFLOAT => Some(16),
            _ => None,
        }
    }
}
