use ash::vk;
use glam::{Vec3, Vec4};
use ravel_gfx::{
    commands::{barrier::GfxImageBarrier, encoder::GfxCommandEncoder},
    error::GfxError,
    foundation::device::GfxDevice,
    raytracing::{
        acceleration::{GfxAccelInstance, GfxAccelSettings},
        bindings::{AccumBindings, AccumPushConstants, RtBindings, RtPushConstants},
    },
    resources::{
        handles::{GfxAccelHandle, GfxGeometryHandle, GfxImageHandle},
        image::{GfxFormatUtils, GfxImageDesc},
    },
};
use slotmap::SlotMap;

use crate::{
    soft_accel::{SoftAccel, SoftHit},
    soft_geometry::SoftGeometry,
    soft_image::SoftImage,
    soft_kernel,
};

/// 录制过的命令统计，主要给测试使用
#[derive(Debug, Default, Clone)]
pub struct SoftGfxStats {
    pub trace_dispatches: u64,
    /// 所有 trace_rays 的 work item 总数
    pub traced_work_items: u64,
    pub accumulate_blits: u64,
    pub image_allocations: u64,
    pub accel_builds: u64,
    /// 按录制顺序排列的 barrier
    pub barriers: Vec<GfxImageBarrier>,
    /// 按 begin 顺序排列的 label
    pub labels: Vec<String>,
}

/// CPU 参考后端
///
/// 同时实现 [`GfxDevice`] 与 [`GfxCommandEncoder`]，命令在录制时立即执行
pub struct SoftGfx {
    device_name: String,
    ray_tracing: bool,
    /// 允许同时存在的 image 数量，用于模拟显存不足
    image_limit: Option<usize>,

    image_pool: SlotMap<GfxImageHandle, SoftImage>,
    accel_pool: SlotMap<GfxAccelHandle, SoftAccel>,
    geometry_pool: SlotMap<GfxGeometryHandle, SoftGeometry>,

    label_stack: Vec<String>,
    stats: SoftGfxStats,
}
// new & init
impl SoftGfx {
    pub fn new(device_name: impl Into<String>) -> Self {
        let device_name = device_name.into();
        log::info!("soft gfx device created: {}", device_name);
        Self {
            device_name,
            ray_tracing: true,
            image_limit: None,
            image_pool: SlotMap::with_key(),
            accel_pool: SlotMap::with_key(),
            geometry_pool: SlotMap::with_key(),
            label_stack: Vec::new(),
            stats: SoftGfxStats::default(),
        }
    }

    /// 模拟不支持光线查询的硬件
    pub fn without_ray_tracing(device_name: impl Into<String>) -> Self {
        let mut gfx = Self::new(device_name);
        gfx.ray_tracing = false;
        gfx
    }

    /// builder
    #[inline]
    pub fn with_image_limit(mut self, limit: usize) -> Self {
        self.image_limit = Some(limit);
        self
    }
}
// geometry
impl SoftGfx {
    pub fn register_geometry(&mut self, geometry: SoftGeometry) -> GfxGeometryHandle {
        self.geometry_pool.insert(geometry)
    }

    pub fn unregister_geometry(&mut self, handle: GfxGeometryHandle) -> Option<SoftGeometry> {
        self.geometry_pool.remove(handle)
    }
}
// 调试与测试使用的查询接口
impl SoftGfx {
    #[inline]
    pub fn stats(&self) -> &SoftGfxStats {
        &self.stats
    }

    pub fn reset_stats(&mut self) {
        self.stats = SoftGfxStats::default();
    }

    #[inline]
    pub fn live_image_count(&self) -> usize {
        self.image_pool.len()
    }

    #[inline]
    pub fn live_accel_count(&self) -> usize {
        self.accel_pool.len()
    }

    pub fn image(&self, handle: GfxImageHandle) -> Option<&SoftImage> {
        self.image_pool.get(handle)
    }

    pub fn image_pixels(&self, handle: GfxImageHandle) -> Option<&[Vec4]> {
        self.image_pool.get(handle).map(|image| image.texels())
    }

    pub fn accel(&self, handle: GfxAccelHandle) -> Option<&SoftAccel> {
        self.accel_pool.get(handle)
    }

    /// 上传整张 image 的内容，长度必须和 image 的像素数一致
    pub fn write_image(&mut self, handle: GfxImageHandle, texels: &[Vec4]) -> Result<(), GfxError> {
        let image = self.image_pool.get_mut(handle).ok_or(GfxError::InvalidHandle { kind: "image" })?;
        if image.texels.len() != texels.len() {
            return Err(GfxError::ExtentMismatch {
                expected: image.desc.extent,
                actual: vk::Extent2D {
                    width: texels.len() as u32,
                    height: 1,
                },
            });
        }
        image.texels.copy_from_slice(texels);
        Ok(())
    }

    pub fn fill_image(&mut self, handle: GfxImageHandle, value: Vec4) -> Result<(), GfxError> {
        let image = self.image_pool.get_mut(handle).ok_or(GfxError::InvalidHandle { kind: "image" })?;
        image.texels.fill(value);
        Ok(())
    }

    /// 在 shader 之外做一次光线查询
    pub fn trace_ray(&self, accel: GfxAccelHandle, origin: Vec3, dir: Vec3) -> Option<SoftHit> {
        self.accel_pool.get(accel)?.intersect(&self.geometry_pool, origin, dir, 0.0, f32::MAX)
    }
}
impl GfxDevice for SoftGfx {
    fn device_name(&self) -> &str {
        &self.device_name
    }

    fn supports_ray_tracing(&self) -> bool {
        self.ray_tracing
    }

    fn create_image(&mut self, desc: &GfxImageDesc, debug_name: &str) -> Result<GfxImageHandle, GfxError> {
        if desc.format != vk::Format::R32G32B32A32_SFLOAT {
            return Err(GfxError::UnsupportedFormat(desc.format));
        }
        if let Some(limit) = self.image_limit {
            if self.image_pool.len() >= limit {
                return Err(GfxError::AllocationFailed {
                    name: debug_name.to_string(),
                    reason: format!("image limit {} reached", limit),
                });
            }
        }

        let bytes = desc.texel_count() * GfxFormatUtils::pixel_size_in_bytes(desc.format).unwrap_or(0);
        log::debug!(
            "create image {}: {}x{}, {} bytes",
            debug_name,
            desc.extent.width,
            desc.extent.height,
            bytes
        );
        self.stats.image_allocations += 1;
        Ok(self.image_pool.insert(SoftImage::new(*desc, debug_name)))
    }

    fn destroy_image(&mut self, handle: GfxImageHandle) {
        if let Some(image) = self.image_pool.remove(handle) {
            log::debug!("destroy image {}", image.name);
        }
    }

    fn image_desc(&self, handle: GfxImageHandle) -> Option<GfxImageDesc> {
        self.image_pool.get(handle).map(|image| image.desc)
    }

    fn create_accel(&mut self, settings: &GfxAccelSettings, debug_name: &str) -> Result<GfxAccelHandle, GfxError> {
        if !self.ray_tracing {
            return Err(GfxError::RayTracingUnsupported(self.device_name.clone()));
        }
        log::debug!("create accel {}: {:?}", debug_name, settings);
        Ok(self.accel_pool.insert(SoftAccel::new(*settings, debug_name)))
    }

    fn build_accel(&mut self, handle: GfxAccelHandle, instances: &[GfxAccelInstance]) -> Result<(), GfxError> {
        let accel = self.accel_pool.get_mut(handle).ok_or(GfxError::InvalidHandle { kind: "accel" })?;
        accel.build(instances, &self.geometry_pool)?;
        self.stats.accel_builds += 1;
        Ok(())
    }

    fn destroy_accel(&mut self, handle: GfxAccelHandle) {
        if let Some(accel) = self.accel_pool.remove(handle) {
            log::debug!("destroy accel {}", accel.name());
        }
    }

    fn encoder(&mut self) -> &mut dyn GfxCommandEncoder {
        self
    }
}
impl GfxCommandEncoder for SoftGfx {
    fn begin_label(&mut self, label_name: &str, _label_color: Vec4) {
        self.label_stack.push(label_name.to_string());
        self.stats.labels.push(label_name.to_string());
    }

    fn end_label(&mut self) {
        if self.label_stack.pop().is_none() {
            log::warn!("end_label without matching begin_label");
        }
    }

    fn image_barrier(&mut self, barriers: &[GfxImageBarrier]) {
        // CPU 上命令立即执行，barrier 只需要记录
        self.stats.barriers.extend_from_slice(barriers);
    }

    fn trace_rays(
        &mut self,
        bindings: &RtBindings,
        push_constants: &RtPushConstants,
        extent: [u32; 3],
    ) -> Result<(), GfxError> {
        if !self.ray_tracing {
            return Err(GfxError::RayTracingUnsupported(self.device_name.clone()));
        }
        let accel = self.accel_pool.get(bindings.accel).ok_or(GfxError::InvalidHandle { kind: "accel" })?;
        let output = self.image_pool.get_mut(bindings.output).ok_or(GfxError::InvalidHandle { kind: "image" })?;

        let [width, height, depth] = extent;
        let requested = vk::Extent2D { width, height };
        if output.desc.extent != requested || depth != 1 {
            return Err(GfxError::ExtentMismatch {
                expected: output.desc.extent,
                actual: requested,
            });
        }

        soft_kernel::trace_image(accel, &self.geometry_pool, push_constants, width, &mut output.texels);

        self.stats.trace_dispatches += 1;
        self.stats.traced_work_items += width as u64 * height as u64 * depth as u64;
        Ok(())
    }

    fn blit_accumulate(
        &mut self,
        bindings: &AccumBindings,
        push_constants: &AccumPushConstants,
    ) -> Result<(), GfxError> {
        if bindings.output == bindings.current_frame {
            return Err(GfxError::ResourceAliasing("current_frame"));
        }
        if bindings.output == bindings.accumulation {
            return Err(GfxError::ResourceAliasing("accumulation"));
        }

        let [width, height] = push_constants.image_size;
        let expected = vk::Extent2D { width, height };
        for handle in [bindings.current_frame, bindings.accumulation, bindings.output] {
            let image = self.image_pool.get(handle).ok_or(GfxError::InvalidHandle { kind: "image" })?;
            if image.desc.extent != expected {
                return Err(GfxError::ExtentMismatch {
                    expected,
                    actual: image.desc.extent,
                });
            }
        }

        // output 和另外两张 image 不是同一个，先取出来避免同时借用
        let mut output = std::mem::take(&mut self.image_pool[bindings.output].texels);
        let current = &self.image_pool[bindings.current_frame].texels;
        let accumulation = &self.image_pool[bindings.accumulation].texels;
        soft_kernel::accumulate_image(current, accumulation, &mut output, push_constants.accum_frames);
        self.image_pool[bindings.output].texels = output;

        self.stats.accumulate_blits += 1;
        Ok(())
    }
}
impl Drop for SoftGfx {
    fn drop(&mut self) {
        if !self.image_pool.is_empty() || !self.accel_pool.is_empty() {
            log::warn!(
                "soft gfx {} dropped with {} images and {} accels alive",
                self.device_name,
                self.image_pool.len(),
                self.accel_pool.len()
            );
        }
        log::info!("soft gfx device destroyed: {}", self.device_name);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use glam::vec4;

    fn extent(width: u32, height: u32) -> vk::Extent2D {
        vk::Extent2D { width, height }
    }

    #[test]
    fn test_image_lifecycle() {
        let mut gfx = SoftGfx::new("test");
        let desc = GfxImageDesc::new_hdr_storage_2d(extent(4, 2));
        let image = gfx.create_image(&desc, "img").unwrap();
        assert_eq!(gfx.image_desc(image), Some(desc));
        assert_eq!(gfx.image_pixels(image).unwrap().len(), 8);

        gfx.destroy_image(image);
        assert!(gfx.image_desc(image).is_none());
        // 重复 destroy 不会出错
        gfx.destroy_image(image);
    }

    #[test]
    fn test_image_limit() {
        let mut gfx = SoftGfx::new("test").with_image_limit(1);
        let desc = GfxImageDesc::new_hdr_storage_2d(extent(2, 2));
        let first = gfx.create_image(&desc, "first").unwrap();
        let err = gfx.create_image(&desc, "second").unwrap_err();
        assert!(err.is_allocation_failure());
        gfx.destroy_image(first);
    }

    #[test]
    fn test_unsupported_format() {
        let mut gfx = SoftGfx::new("test");
        let desc =
            GfxImageDesc::new_image_2d_info(extent(2, 2), vk::Format::R8G8B8A8_UNORM, vk::ImageUsageFlags::STORAGE);
        assert!(matches!(gfx.create_image(&desc, "ldr"), Err(GfxError::UnsupportedFormat(_))));
    }

    #[test]
    fn test_no_accel_without_ray_tracing() {
        let mut gfx = SoftGfx::without_ray_tracing("old-gpu");
        assert!(!gfx.supports_ray_tracing());
        assert!(matches!(
            gfx.create_accel(&GfxAccelSettings::default(), "tlas"),
            Err(GfxError::RayTracingUnsupported(_))
        ));
    }

    #[test]
    fn test_blit_accumulate_rejects_aliasing() {
        let mut gfx = SoftGfx::new("test");
        let desc = GfxImageDesc::new_hdr_storage_2d(extent(2, 2));
        let a = gfx.create_image(&desc, "a").unwrap();
        let b = gfx.create_image(&desc, "b").unwrap();
        let push = AccumPushConstants {
            image_size: [2, 2],
            accum_frames: 0,
            _padding_0: 0,
        };

        let result = gfx.blit_accumulate(
            &AccumBindings {
                current_frame: a,
                accumulation: b,
                output: b,
            },
            &push,
        );
        assert!(matches!(result, Err(GfxError::ResourceAliasing("accumulation"))));
        assert_eq!(gfx.stats().accumulate_blits, 0);

        gfx.destroy_image(a);
        gfx.destroy_image(b);
    }

    #[test]
    fn test_blit_accumulate_blends() {
        let mut gfx = SoftGfx::new("test");
        let desc = GfxImageDesc::new_hdr_storage_2d(extent(2, 1));
        let raw = gfx.create_image(&desc, "raw").unwrap();
        let prev = gfx.create_image(&desc, "prev").unwrap();
        let out = gfx.create_image(&desc, "out").unwrap();
        gfx.fill_image(raw, vec4(0.0, 0.0, 1.0, 1.0)).unwrap();
        gfx.fill_image(prev, vec4(1.0, 0.0, 0.0, 1.0)).unwrap();

        gfx.blit_accumulate(
            &AccumBindings {
                current_frame: raw,
                accumulation: prev,
                output: out,
            },
            &AccumPushConstants {
                image_size: [2, 1],
                accum_frames: 1,
                _padding_0: 0,
            },
        )
        .unwrap();

        for texel in gfx.image_pixels(out).unwrap() {
            assert!(texel.abs_diff_eq(vec4(0.5, 0.0, 0.5, 1.0), 1e-6));
        }
        for handle in [raw, prev, out] {
            gfx.destroy_image(handle);
        }
    }

    #[test]
    fn test_trace_rays_extent_mismatch() {
        let mut gfx = SoftGfx::new("test");
        let accel = gfx.create_accel(&GfxAccelSettings::default(), "tlas").unwrap();
        gfx.build_accel(accel, &[]).unwrap();
        let output = gfx.create_image(&GfxImageDesc::new_hdr_storage_2d(extent(4, 4)), "raw").unwrap();

        let push = RtPushConstants {
            bottom_left: vec4(-1.0, -1.0, -1.0, 0.0),
            top_left: vec4(-1.0, 1.0, -1.0, 0.0),
            bottom_right: vec4(1.0, -1.0, -1.0, 0.0),
            top_right: vec4(1.0, 1.0, -1.0, 0.0),
            camera_pos: vec4(0.0, 0.0, 0.0, 1.0),
            sky_color: vec4(0.0, 0.0, 1.0, 1.0),
            ground_color: vec4(0.5, 0.5, 0.5, 1.0),
            frame_index: 0,
            _padding_0: [0; 3],
        };
        let bindings = RtBindings { accel, output };
        assert!(matches!(gfx.trace_rays(&bindings, &push, [8, 4, 1]), Err(GfxError::ExtentMismatch { .. })));

        gfx.trace_rays(&bindings, &push, [4, 4, 1]).unwrap();
        assert_eq!(gfx.stats().trace_dispatches, 1);
        assert_eq!(gfx.stats().traced_work_items, 16);
        // 空场景：上半部分为天空，下半部分为地面
        let pixels = gfx.image_pixels(output).unwrap();
        assert_eq!(pixels[0], vec4(0.0, 0.0, 1.0, 1.0));
        assert_eq!(pixels[15], vec4(0.5, 0.5, 0.5, 1.0));

        gfx.destroy_image(output);
        gfx.destroy_accel(accel);
    }
}
