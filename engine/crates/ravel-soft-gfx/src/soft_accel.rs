use glam::{Mat4, Vec3};
use ravel_gfx::{
    error::GfxError,
    raytracing::acceleration::{GfxAccelInstance, GfxAccelSettings, GfxInstanceFlags},
    resources::handles::GfxGeometryHandle,
};
use slotmap::SlotMap;

use crate::soft_geometry::SoftGeometry;

/// build 之后的 instance，缓存了逆矩阵与世界空间包围盒
#[derive(Debug, Clone)]
struct BuiltInstance {
    geometry: GfxGeometryHandle,
    transform: Mat4,
    inv_transform: Mat4,
    flags: GfxInstanceFlags,
    custom_index: u32,
    aabb_min: Vec3,
    aabb_max: Vec3,
}

/// 一次光线查询的结果，全部在世界空间
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SoftHit {
    pub t: f32,
    pub position: Vec3,
    /// 归一化，且朝向光线来的一侧
    pub normal: Vec3,
    pub albedo: Vec3,
    pub custom_index: u32,
}

/// 顶层加速结构
///
/// instance 数量很少，直接对每个 instance 的世界空间 AABB 做 slab test
pub struct SoftAccel {
    settings: GfxAccelSettings,
    name: String,
    instances: Vec<BuiltInstance>,
    build_count: u64,
}

impl SoftAccel {
    pub(crate) fn new(settings: GfxAccelSettings, name: impl Into<String>) -> Self {
        Self {
            settings,
            name: name.into(),
            instances: Vec::new(),
            build_count: 0,
        }
    }

    #[inline]
    pub fn name(&self) -> &str {
        &self.name
    }

    #[inline]
    pub fn settings(&self) -> &GfxAccelSettings {
        &self.settings
    }

    #[inline]
    pub fn instance_count(&self) -> usize {
        self.instances.len()
    }

    #[inline]
    pub fn build_count(&self) -> u64 {
        self.build_count
    }

    pub(crate) fn build(
        &mut self,
        instances: &[GfxAccelInstance],
        geometries: &SlotMap<GfxGeometryHandle, SoftGeometry>,
    ) -> Result<(), GfxError> {
        let mode_mask = self.settings.mode_mask;
        let built = instances
            .iter()
            .filter(|instance| instance.flags.contains(GfxInstanceFlags::ENABLED))
            .filter(|instance| mode_mask.intersects(instance.mode))
            .filter_map(|instance| {
                let Some(geometry) = geometries.get(instance.geometry) else {
                    return Some(Err(GfxError::InvalidHandle { kind: "geometry" }));
                };
                if instance.transform.determinant().abs() < f32::EPSILON {
                    log::warn!("accel {}: skip instance {} with singular transform", self.name, instance.custom_index);
                    return None;
                }
                let (aabb_min, aabb_max) = transform_aabb(&instance.transform, geometry.local_aabb());
                Some(Ok(BuiltInstance {
                    geometry: instance.geometry,
                    transform: instance.transform,
                    inv_transform: instance.transform.inverse(),
                    flags: instance.flags,
                    custom_index: instance.custom_index,
                    aabb_min,
                    aabb_max,
                }))
            })
            .collect::<Result<Vec<_>, _>>()?;

        self.instances = built;
        self.build_count += 1;
        Ok(())
    }

    /// 返回 (t_min, t_max) 内最近的交点
    pub fn intersect(
        &self,
        geometries: &SlotMap<GfxGeometryHandle, SoftGeometry>,
        origin: Vec3,
        dir: Vec3,
        t_min: f32,
        t_max: f32,
    ) -> Option<SoftHit> {
        let inv_dir = dir.recip();
        let mut closest: Option<SoftHit> = None;

        for instance in &self.instances {
            let limit = closest.map_or(t_max, |hit| hit.t);
            if !slab_test(origin, inv_dir, instance.aabb_min, instance.aabb_max, t_min, limit) {
                continue;
            }
            let Some(geometry) = geometries.get(instance.geometry) else {
                continue;
            };

            let local_origin = instance.inv_transform.transform_point3(origin);
            let local_dir = instance.inv_transform.transform_vector3(dir);
            // 只有 any-hit 开启时才执行 alpha test
            let alpha_test = instance.flags.contains(GfxInstanceFlags::UNIQUE_ANY_HIT);
            let accept = |p: Vec3| !alpha_test || !geometry.is_cut_out(p);

            let Some(local_hit) = geometry.intersect_local(local_origin, local_dir, t_min, limit, accept) else {
                continue;
            };

            let mut normal = instance.inv_transform.transpose().transform_vector3(local_hit.normal).normalize_or_zero();
            if normal.dot(dir) > 0.0 {
                normal = -normal;
            }
            closest = Some(SoftHit {
                t: local_hit.t,
                position: instance.transform.transform_point3(local_hit.position),
                normal,
                albedo: geometry.albedo,
                custom_index: instance.custom_index,
            });
        }

        closest
    }
}

fn transform_aabb(transform: &Mat4, (min, max): (Vec3, Vec3)) -> (Vec3, Vec3) {
    (0..8)
        .map(|i| {
            let corner = Vec3::new(
                if i & 1 == 0 { min.x } else { max.x },
                if i & 2 == 0 { min.y } else { max.y },
                if i & 4 == 0 { min.z } else { max.z },
            );
            transform.transform_point3(corner)
        })
        .fold((Vec3::splat(f32::MAX), Vec3::splat(f32::MIN)), |(lo, hi), p| (lo.min(p), hi.max(p)))
}

#[inline]
fn slab_test(origin: Vec3, inv_dir: Vec3, min: Vec3, max: Vec3, t_min: f32, t_max: f32) -> bool {
    let t0 = (min - origin) * inv_dir;
    let t1 = (max - origin) * inv_dir;
    // NaN（光线分量为 0 且起点在 slab 边界上）时 min/max 会忽略它
    let t_near = t0.min(t1).max_element().max(t_min);
    let t_far = t0.max(t1).min_element().min(t_max);
    t_near <= t_far
}
