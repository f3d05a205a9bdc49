use glam::{Vec3, vec3};

/// 几何体的形状，坐标均在 object space
#[derive(Debug, Clone)]
pub enum SoftGeometryKind {
    Triangles { positions: Vec<Vec3>, indices: Vec<[u32; 3]> },
    Sphere { center: Vec3, radius: f32 },
}

/// 注册到软件后端的几何体
#[derive(Debug, Clone)]
pub struct SoftGeometry {
    pub kind: SoftGeometryKind,
    /// 线性空间的反照率
    pub albedo: Vec3,
    /// 棋盘格镂空的格子边长（object space 的 xz 平面）
    ///
    /// 只有当 instance 带有 `UNIQUE_ANY_HIT` 时才会执行 alpha test，
    /// 否则按照不透明物体处理
    pub checker_cutout: Option<f32>,
}

/// object space 下的一次求交结果
#[derive(Debug, Clone, Copy)]
pub struct LocalHit {
    pub t: f32,
    pub position: Vec3,
    /// 未归一化，且没有翻转到光线一侧
    pub normal: Vec3,
}

impl SoftGeometry {
    pub fn sphere(center: Vec3, radius: f32, albedo: Vec3) -> Self {
        Self {
            kind: SoftGeometryKind::Sphere { center, radius },
            albedo,
            checker_cutout: None,
        }
    }

    /// 位于 y = 0 平面、法线朝 +Y 的正方形
    pub fn quad_xz(half_extent: f32, albedo: Vec3) -> Self {
        let h = half_extent;
        Self {
            kind: SoftGeometryKind::Triangles {
                positions: vec![vec3(-h, 0.0, -h), vec3(h, 0.0, -h), vec3(h, 0.0, h), vec3(-h, 0.0, h)],
                indices: vec![[0, 2, 1], [0, 3, 2]],
            },
            albedo,
            checker_cutout: None,
        }
    }

    /// 以原点为中心的立方体
    pub fn cube(half_extent: f32, albedo: Vec3) -> Self {
        let h = half_extent;
        let positions = (0..8)
            .map(|i| vec3(if i & 1 == 0 { -h } else { h }, if i & 2 == 0 { -h } else { h }, if i & 4 == 0 { -h } else { h }))
            .collect();
        #[rustfmt::skip]
        let indices = vec![
            [0, 2, 1], [1, 2, 3], // -z
            [4, 5, 6], [5, 7, 6], // +z
            [0, 1, 4], [1, 5, 4], // -y
            [2, 6, 3], [3, 6, 7], // +y
            [0, 4, 2], [2, 4, 6], // -x
            [1, 3, 5], [3, 7, 5], // +x
        ];
        Self {
            kind: SoftGeometryKind::Triangles { positions, indices },
            albedo,
            checker_cutout: None,
        }
    }

    /// builder
    #[inline]
    pub fn with_checker_cutout(mut self, cell_size: f32) -> Self {
        self.checker_cutout = Some(cell_size);
        self
    }

    /// object space 的包围盒
    pub fn local_aabb(&self) -> (Vec3, Vec3) {
        match &self.kind {
            SoftGeometryKind::Sphere { center, radius } => (*center - Vec3::splat(*radius), *center + Vec3::splat(*radius)),
            SoftGeometryKind::Triangles { positions, .. } => positions
                .iter()
                .fold((Vec3::splat(f32::MAX), Vec3::splat(f32::MIN)), |(min, max), p| (min.min(*p), max.max(*p))),
        }
    }

    /// 棋盘格中被挖空的格子
    #[inline]
    pub fn is_cut_out(&self, local_position: Vec3) -> bool {
        match self.checker_cutout {
            Some(cell) if cell > 0.0 => {
                let cx = (local_position.x / cell).floor() as i64;
                let cz = (local_position.z / cell).floor() as i64;
                (cx + cz).rem_euclid(2) == 1
            }
            _ => false,
        }
    }

    /// 求 (t_min, t_max) 内最近的、通过 `accept` 的交点
    ///
    /// `dir` 不要求归一化，t 以 `dir` 的长度为单位
    pub fn intersect_local(
        &self,
        origin: Vec3,
        dir: Vec3,
        t_min: f32,
        t_max: f32,
        accept: impl Fn(Vec3) -> bool,
    ) -> Option<LocalHit> {
        match &self.kind {
            SoftGeometryKind::Sphere { center, radius } => {
                let oc = origin - *center;
                let a = dir.length_squared();
                let half_b = oc.dot(dir);
                let c = oc.length_squared() - radius * radius;
                let discriminant = half_b * half_b - a * c;
                if a == 0.0 || discriminant < 0.0 {
                    return None;
                }
                let sqrt_d = discriminant.sqrt();
                [(-half_b - sqrt_d) / a, (-half_b + sqrt_d) / a]
                    .into_iter()
                    .filter(|t| *t > t_min && *t < t_max)
                    .map(|t| {
                        let position = origin + dir * t;
                        LocalHit {
                            t,
                            position,
                            normal: position - *center,
                        }
                    })
                    .find(|hit| accept(hit.position))
            }
            SoftGeometryKind::Triangles { positions, indices } => {
                let mut closest: Option<LocalHit> = None;
                for tri in indices {
                    let (Some(p0), Some(p1), Some(p2)) = (
                        positions.get(tri[0] as usize),
                        positions.get(tri[1] as usize),
                        positions.get(tri[2] as usize),
                    ) else {
                        continue;
                    };
                    let limit = closest.map_or(t_max, |hit| hit.t);
                    let Some(t) = intersect_triangle(origin, dir, *p0, *p1, *p2, t_min, limit) else {
                        continue;
                    };
                    let position = origin + dir * t;
                    if accept(position) {
                        closest = Some(LocalHit {
                            t,
                            position,
                            normal: (*p1 - *p0).cross(*p2 - *p0),
                        });
                    }
                }
                closest
            }
        }
    }
}

/// Möller–Trumbore
fn intersect_triangle(origin: Vec3, dir: Vec3, p0: Vec3, p1: Vec3, p2: Vec3, t_min: f32, t_max: f32) -> Option<f32> {
    const EPSILON: f32 = 1e-8;

    let e1 = p1 - p0;
    let e2 = p2 - p0;
    let pvec = dir.cross(e2);
    let det = e1.dot(pvec);
    if det.abs() < EPSILON {
        return None;
    }
    let inv_det = 1.0 / det;
    let tvec = origin - p0;
    let u = tvec.dot(pvec) * inv_det;
    if !(0.0..=1.0).contains(&u) {
        return None;
    }
    let qvec = tvec.cross(e1);
    let v = dir.dot(qvec) * inv_det;
    if v < 0.0 || u + v > 1.0 {
        return None;
    }
    let t = e2.dot(qvec) * inv_det;
    (t > t_min && t < t_max).then_some(t)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sphere_hit_front_face() {
        let sphere = SoftGeometry::sphere(Vec3::ZERO, 1.0, Vec3::ONE);
        let hit = sphere.intersect_local(vec3(0.0, 0.0, 5.0), vec3(0.0, 0.0, -1.0), 0.0, f32::MAX, |_| true).unwrap();
        assert!((hit.t - 4.0).abs() < 1e-5);
        assert!(hit.normal.normalize().abs_diff_eq(Vec3::Z, 1e-5));
    }

    #[test]
    fn test_sphere_miss() {
        let sphere = SoftGeometry::sphere(Vec3::ZERO, 1.0, Vec3::ONE);
        assert!(sphere.intersect_local(vec3(0.0, 2.0, 5.0), vec3(0.0, 0.0, -1.0), 0.0, f32::MAX, |_| true).is_none());
    }

    #[test]
    fn test_quad_hit_from_above() {
        let quad = SoftGeometry::quad_xz(1.0, Vec3::ONE);
        let hit = quad.intersect_local(vec3(0.2, 3.0, 0.3), vec3(0.0, -1.0, 0.0), 0.0, f32::MAX, |_| true).unwrap();
        assert!((hit.t - 3.0).abs() < 1e-5);
        assert!(hit.position.abs_diff_eq(vec3(0.2, 0.0, 0.3), 1e-5));
        // 只关心法线所在的轴
        assert!(hit.normal.normalize().y.abs() > 0.999);
    }

    #[test]
    fn test_cube_closest_face() {
        let cube = SoftGeometry::cube(1.0, Vec3::ONE);
        let hit = cube.intersect_local(vec3(0.1, 0.2, 10.0), vec3(0.0, 0.0, -1.0), 0.0, f32::MAX, |_| true).unwrap();
        assert!((hit.t - 9.0).abs() < 1e-5);
        assert_eq!(cube.local_aabb(), (Vec3::splat(-1.0), Vec3::splat(1.0)));
    }

    #[test]
    fn test_checker_cutout_rejects_hit() {
        let quad = SoftGeometry::quad_xz(2.0, Vec3::ONE).with_checker_cutout(1.0);
        // (0.5, 0.5) 位于 (0, 0) 格子，保留；(1.5, 0.5) 位于 (1, 0) 格子，挖空
        assert!(!quad.is_cut_out(vec3(0.5, 0.0, 0.5)));
        assert!(quad.is_cut_out(vec3(1.5, 0.0, 0.5)));
        assert!(quad.is_cut_out(vec3(-0.5, 0.0, 0.5)));

        let accept = |p: Vec3| !quad.is_cut_out(p);
        assert!(quad.intersect_local(vec3(1.5, 1.0, 0.5), vec3(0.0, -1.0, 0.0), 0.0, f32::MAX, accept).is_none());
        assert!(quad.intersect_local(vec3(0.5, 1.0, 0.5), vec3(0.0, -1.0, 0.0), 0.0, f32::MAX, accept).is_some());
    }
}
