//! Ray Tracing 所需的加速结构描述

use crate::resources::handles::GfxGeometryHandle;

bitflags::bitflags! {
    /// 每个 instance 参与哪些光线查询
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct GfxInstanceFlags: u32 {
        /// 参与求交
        const ENABLED = 1 << 0;
        /// 只需要最近交点，跳过 any-hit
        const CLOSEST_HIT_ONLY = 1 << 1;
        /// 每个候选交点只调用一次 any-hit（用于 alpha test）
        const UNIQUE_ANY_HIT = 1 << 2;
    }
}

bitflags::bitflags! {
    /// 加速结构接收哪些类型的 renderable
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct GfxAccelModeMask: u32 {
        const STATIC = 1 << 0;
        const DYNAMIC_TRANSFORM = 1 << 1;
        const DYNAMIC_GEOMETRY = 1 << 2;
    }
}

/// instance 的 transform 由谁来维护
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GfxAccelManagement {
    /// 每次 build 前由调用方重新读取所有 instance 的 transform
    Automatic,
    /// 调用方自己负责逐个更新
    Manual,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GfxAccelSettings {
    pub management: GfxAccelManagement,
    pub mode_mask: GfxAccelModeMask,
}

impl Default for GfxAccelSettings {
    fn default() -> Self {
        Self {
            management: GfxAccelManagement::Automatic,
            mode_mask: GfxAccelModeMask::all(),
        }
    }
}

/// 顶层加速结构中的一个 instance
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GfxAccelInstance {
    pub geometry: GfxGeometryHandle,
    /// object -> world
    pub transform: glam::Mat4,
    pub flags: GfxInstanceFlags,
    pub mode: GfxAccelModeMask,
    /// 对应 shader 中的 `InstanceCustomIndex`
    pub custom_index: u32,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_settings_accept_everything() {
        let settings = GfxAccelSettings::default();
        assert_eq!(settings.management, GfxAccelManagement::Automatic);
        assert!(settings.mode_mask.contains(GfxAccelModeMask::STATIC | GfxAccelModeMask::DYNAMIC_GEOMETRY));
    }

    #[test]
    fn test_instance_flags_bits() {
        let opaque = GfxInstanceFlags::ENABLED | GfxInstanceFlags::CLOSEST_HIT_ONLY;
        assert!(!opaque.contains(GfxInstanceFlags::UNIQUE_ANY_HIT));
        assert_eq!((opaque | GfxInstanceFlags::UNIQUE_ANY_HIT).bits(), 0b111);
    }
}
