use ravel_gfx::raytracing::acceleration::GfxInstanceFlags;
use serde::Deserialize;

/// 环境光颜色，全部为线性空间
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EnvironmentSettings {
    /// 光线朝上未命中时返回的颜色
    pub sky_color: glam::Vec3,
    /// 光线朝下未命中时返回的颜色
    pub ground_color: glam::Vec3,
}

impl EnvironmentSettings {
    /// 使用 sRGB 空间的颜色创建，内部会转换到线性空间
    pub fn from_srgb(sky_srgb: glam::Vec3, ground_srgb: glam::Vec3) -> Self {
        Self {
            sky_color: srgb_to_linear(sky_srgb),
            ground_color: srgb_to_linear(ground_srgb),
        }
    }
}

impl Default for EnvironmentSettings {
    /// 天空纯蓝，地面 50% 灰
    fn default() -> Self {
        Self::from_srgb(glam::vec3(0.0, 0.0, 1.0), glam::Vec3::splat(0.5))
    }
}

/// sRGB 传递函数的逆变换
pub fn srgb_to_linear(srgb: glam::Vec3) -> glam::Vec3 {
    let f = |c: f32| {
        if c <= 0.04045 {
            c / 12.92
        } else {
            ((c + 0.055) / 1.055).powf(2.4)
        }
    };
    glam::vec3(f(srgb.x), f(srgb.y), f(srgb.z))
}

/// sRGB 传递函数，输入会先被 clamp 到 [0, 1]
pub fn linear_to_srgb(linear: glam::Vec3) -> glam::Vec3 {
    let f = |c: f32| {
        let c = c.clamp(0.0, 1.0);
        if c <= 0.0031308 {
            c * 12.92
        } else {
            1.055 * c.powf(1.0 / 2.4) - 0.055
        }
    };
    glam::vec3(f(linear.x), f(linear.y), f(linear.z))
}

/// 加入加速结构时，instance 使用哪种光线查询方式
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InstancePolicy {
    /// 只要最近交点
    #[default]
    Opaque,
    /// 额外开启 any-hit，用于 alpha test
    AlphaTested,
    /// 使用 renderable 自己声明的 flags
    PerRenderable,
}

impl InstancePolicy {
    /// renderable 自身没有 ENABLED 时返回 None，不加入加速结构
    pub fn instance_flags(self, renderable_flags: GfxInstanceFlags) -> Option<GfxInstanceFlags> {
        if !renderable_flags.contains(GfxInstanceFlags::ENABLED) {
            return None;
        }

        let opaque = GfxInstanceFlags::ENABLED | GfxInstanceFlags::CLOSEST_HIT_ONLY;
        Some(match self {
            InstancePolicy::Opaque => opaque,
            InstancePolicy::AlphaTested => opaque | GfxInstanceFlags::UNIQUE_ANY_HIT,
            InstancePolicy::PerRenderable => renderable_flags,
        })
    }
}

/// 相机投影参数
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CameraConfig {
    /// 垂直方向的视场角，单位为度
    pub fov_y_deg: f32,
    pub near: f32,
    pub far: f32,
}

impl Default for CameraConfig {
    fn default() -> Self {
        Self {
            fov_y_deg: 60.0,
            near: 0.1,
            far: 1000.0,
        }
    }
}

/// renderer 创建时确定的配置
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RendererSettings {
    pub environment: EnvironmentSettings,
    pub instance_policy: InstancePolicy,
    /// 第 i 位为 1 表示 layer i 的物体参与光追
    pub layer_mask: u32,
}

impl RendererSettings {
    /// 只有 layer 0 参与光追
    pub const DEFAULT_LAYER_MASK: u32 = 1;
}

impl Default for RendererSettings {
    fn default() -> Self {
        Self {
            environment: EnvironmentSettings::default(),
            instance_policy: InstancePolicy::default(),
            layer_mask: Self::DEFAULT_LAYER_MASK,
        }
    }
}
