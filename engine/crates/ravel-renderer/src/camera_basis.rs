use crate::settings::CameraConfig;

/// 一帧内的相机采样基
///
/// 四个角点是远平面四角在世界空间中的方向（单位向量），由 kernel 双线性插值得到每个像素的主光线
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CameraBasis {
    pub bottom_left: glam::Vec3,
    pub top_left: glam::Vec3,
    pub bottom_right: glam::Vec3,
    pub top_right: glam::Vec3,
    pub position: glam::Vec3,
    /// camera -> world，只用于检测相机是否移动
    pub camera_transform: glam::Mat4,
}

/// 从相机参数推导 [`CameraBasis`]
///
/// 相机在 local space 中看向 -Z，+Y 朝上，右手系
pub struct CameraSampleBasis;

impl CameraSampleBasis {
    /// # Params
    /// * `aspect` - 输出图像的宽高比
    /// * `camera_transform` - camera -> world
    pub fn compute(config: &CameraConfig, aspect: f32, camera_transform: glam::Mat4) -> CameraBasis {
        let half_height = config.far * (config.fov_y_deg.to_radians() * 0.5).tan();
        let half_width = half_height * aspect;

        let position = camera_transform.w_axis.truncate();
        // 远平面上的角点变换到世界空间，再求从相机位置出发的方向
        let corner_dir = |x: f32, y: f32| {
            let far_point = camera_transform.transform_point3(glam::vec3(x, y, -config.far));
            (far_point - position).normalize_or_zero()
        };

        CameraBasis {
            bottom_left: corner_dir(-half_width, -half_height),
            top_left: corner_dir(-half_width, half_height),
            bottom_right: corner_dir(half_width, -half_height),
            top_right: corner_dir(half_width, half_height),
            position,
            camera_transform,
        }
    }

    /// 两个 transform 的任意分量不同（按 bit 比较，没有容差）即认为相机移动了
    pub fn has_moved(current: &glam::Mat4, previous: &glam::Mat4) -> bool {
        current.to_cols_array().map(f32::to_bits) != previous.to_cols_array().map(f32::to_bits)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_identity_camera_corners() {
        let config = CameraConfig {
            fov_y_deg: 90.0,
            near: 0.1,
            far: 10.0,
        };
        let basis = CameraSampleBasis::compute(&config, 1.0, glam::Mat4::IDENTITY);

        let expected = glam::vec3(-1.0, 1.0, -1.0).normalize();
        assert!(basis.top_left.abs_diff_eq(expected, 1e-5));
        assert!(basis.bottom_right.abs_diff_eq(glam::vec3(1.0, -1.0, -1.0).normalize(), 1e-5));
        assert_eq!(basis.position, glam::Vec3::ZERO);

        for dir in [basis.bottom_left, basis.top_left, basis.bottom_right, basis.top_right] {
            assert!((dir.length() - 1.0).abs() < 1e-5);
        }
        // 四个角点对称，中心方向正对 -Z
        let center = (basis.bottom_left + basis.top_left + basis.bottom_right + basis.top_right).normalize();
        assert!(center.abs_diff_eq(glam::Vec3::NEG_Z, 1e-5));
    }

    #[test]
    fn test_aspect_widens_horizontal_extent() {
        let config = CameraConfig::default();
        let basis = CameraSampleBasis::compute(&config, 2.0, glam::Mat4::IDENTITY);
        let tan_half = (config.fov_y_deg.to_radians() * 0.5).tan();

        let tr = basis.top_right;
        assert!((tr.y / -tr.z - tan_half).abs() < 1e-4);
        assert!((tr.x / -tr.z - 2.0 * tan_half).abs() < 1e-4);
    }

    #[test]
    fn test_directions_independent_of_camera_position() {
        let config = CameraConfig::default();
        let rotation = glam::Quat::from_rotation_y(30f32.to_radians());
        let origin = CameraSampleBasis::compute(&config, 1.5, glam::Mat4::from_quat(rotation));
        let moved = CameraSampleBasis::compute(
            &config,
            1.5,
            glam::Mat4::from_rotation_translation(rotation, glam::vec3(100.0, -20.0, 35.0)),
        );

        assert!(origin.top_left.abs_diff_eq(moved.top_left, 1e-4));
        assert!(origin.bottom_right.abs_diff_eq(moved.bottom_right, 1e-4));
        assert_eq!(moved.position, glam::vec3(100.0, -20.0, 35.0));
    }

    #[test]
    fn test_has_moved_bitwise() {
        let a = glam::Mat4::from_translation(glam::vec3(1.0, 2.0, 3.0));
        assert!(!CameraSampleBasis::has_moved(&a, &glam::Mat4::from_cols_array(&a.to_cols_array())));

        for i in 0..16 {
            let mut cols = a.to_cols_array();
            cols[i] = f32::from_bits(cols[i].to_bits() + 1);
            let b = glam::Mat4::from_cols_array(&cols);
            assert!(CameraSampleBasis::has_moved(&b, &a), "component {i} not detected");
        }

        // 0.0 与 -0.0 数值相等但 bit 不同
        let mut cols = glam::Mat4::IDENTITY.to_cols_array();
        cols[1] = -0.0;
        assert!(CameraSampleBasis::has_moved(&glam::Mat4::from_cols_array(&cols), &glam::Mat4::IDENTITY));
    }
}
