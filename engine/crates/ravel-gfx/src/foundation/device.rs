use crate::{
    commands::encoder::GfxCommandEncoder,
    error::GfxError,
    raytracing::acceleration::{GfxAccelInstance, GfxAccelSettings},
    resources::{
        handles::{GfxAccelHandle, GfxImageHandle},
        image::GfxImageDesc,
    },
};

/// 渲染核心需要的 device 能力
///
/// 所有资源都由 device 持有，外部通过 handle 访问。
/// destroy 一个已经失效的 handle 是合法的，什么也不做。
pub trait GfxDevice {
    fn device_name(&self) -> &str;

    /// 是否支持硬件光线查询
    fn supports_ray_tracing(&self) -> bool;

    fn create_image(&mut self, desc: &GfxImageDesc, debug_name: &str) -> Result<GfxImageHandle, GfxError>;

    fn destroy_image(&mut self, handle: GfxImageHandle);

    /// handle 失效时返回 None
    fn image_desc(&self, handle: GfxImageHandle) -> Option<GfxImageDesc>;

    fn create_accel(&mut self, settings: &GfxAccelSettings, debug_name: &str) -> Result<GfxAccelHandle, GfxError>;

    /// 用给定的 instance 集合重新构建加速结构，旧的内容全部丢弃
    fn build_accel(&mut self, handle: GfxAccelHandle, instances: &[GfxAccelInstance]) -> Result<(), GfxError>;

    fn destroy_accel(&mut self, handle: GfxAccelHandle);

    /// 当前帧的命令录制器
    fn encoder(&mut self) -> &mut dyn GfxCommandEncoder;
}
