/// 第一人称相机
///
/// 右手系，+Y 朝上，没有旋转时看向 -Z
#[derive(Debug, Clone, PartialEq)]
pub struct Camera {
    pub position: glam::Vec3,

    pub euler_yaw_deg: f32,
    pub euler_pitch_deg: f32,
    pub euler_roll_deg: f32,
}

impl Camera {
    /// 相机的上参考向量
    const CAMERA_UP: glam::Vec3 = glam::Vec3::new(0.0, 1.0, 0.0);

    /// YXZ 表示 Y(yaw)-X(Pitch)-Z(Roll) 的旋转顺序
    const CAMERA_EULER: glam::EulerRot = glam::EulerRot::YXZ;

    /// 没有旋转的情况下，相机看向的是 -Z
    const CAMERA_FORWARD: glam::Vec3 = glam::Vec3::new(0.0, 0.0, -1.0);

    const CAMERA_RIGHT: glam::Vec3 = glam::Vec3::new(1.0, 0.0, 0.0);

    const K_PITCH: f32 = 89.5;

    pub fn new(position: glam::Vec3, yaw_deg: f32, pitch_deg: f32) -> Self {
        Self {
            position,
            euler_yaw_deg: yaw_deg,
            euler_pitch_deg: pitch_deg.clamp(-Self::K_PITCH, Self::K_PITCH),
            euler_roll_deg: 0.0,
        }
    }

    #[inline]
    fn rotation(&self) -> glam::Quat {
        glam::Quat::from_euler(
            Self::CAMERA_EULER,
            self.euler_yaw_deg.to_radians(),
            self.euler_pitch_deg.to_radians(),
            self.euler_roll_deg.to_radians(),
        )
    }

    /// camera -> world
    pub fn world_transform(&self) -> glam::Mat4 {
        glam::Mat4::from_rotation_translation(self.rotation(), self.position)
    }

    pub fn get_view_matrix(&self) -> glam::Mat4 {
        glam::Mat4::look_to_rh(self.position, self.camera_forward(), self.camera_up())
    }

    pub fn camera_forward(&self) -> glam::Vec3 {
        self.rotation() * Self::CAMERA_FORWARD
    }

    pub fn camera_right(&self) -> glam::Vec3 {
        self.rotation() * Self::CAMERA_RIGHT
    }

    pub fn camera_up(&self) -> glam::Vec3 {
        self.rotation() * Self::CAMERA_UP
    }

    /// 朝相机看向的方向进行移动
    pub fn move_forward(&mut self, length: f32) {
        self.position += self.camera_forward() * length;
    }

    pub fn move_right(&mut self, length: f32) {
        self.position += self.camera_right() * length;
    }

    /// 朝世界的 Up 进行移动
    pub fn move_up(&mut self, length: f32) {
        self.position += Self::CAMERA_UP * length;
    }

    pub fn rotate_yaw(&mut self, angle: f32) {
        self.euler_yaw_deg += angle;
        self.euler_yaw_deg %= 360.0;
        if self.euler_yaw_deg < 0.0 {
            self.euler_yaw_deg += 360.0;
        }
    }

    pub fn rotate_pitch(&mut self, angle: f32) {
        self.euler_pitch_deg += angle;
        self.euler_pitch_deg = self.euler_pitch_deg.clamp(-Self::K_PITCH, Self::K_PITCH);
    }
}

impl Default for Camera {
    fn default() -> Self {
        Self {
            position: glam::Vec3::new(0.0, 0.0, 0.0),
            euler_yaw_deg: 0.0,
            euler_pitch_deg: 0.0,
            euler_roll_deg: 0.0,
        }
    }
}
