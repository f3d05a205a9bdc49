use glam::Vec4;
use ravel_gfx::resources::image::GfxImageDesc;

/// CPU 端的 image，按行优先存放，第 0 行为图像顶部
pub struct SoftImage {
    pub(crate) desc: GfxImageDesc,
    pub(crate) name: String,
    pub(crate) texels: Vec<Vec4>,
}

impl SoftImage {
    pub(crate) fn new(desc: GfxImageDesc, name: impl Into<String>) -> Self {
        Self {
            texels: vec![Vec4::ZERO; desc.texel_count()],
            desc,
            name: name.into(),
        }
    }

    #[inline]
    pub fn desc(&self) -> &GfxImageDesc {
        &self.desc
    }

    #[inline]
    pub fn name(&self) -> &str {
        &self.name
    }

    #[inline]
    pub fn texels(&self) -> &[Vec4] {
        &self.texels
    }
}
