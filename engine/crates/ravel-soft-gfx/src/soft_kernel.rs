//! CPU 上的 kernel 实现
//!
//! 光追 kernel 只做一次主光线求交：命中时用法线在天空色与地面色之间插值再乘以反照率，
//! 未命中时根据光线朝上还是朝下返回天空色或地面色。

use glam::{Vec3, Vec4, Vec4Swizzles};
use ravel_gfx::{raytracing::bindings::RtPushConstants, resources::handles::GfxGeometryHandle};
use rayon::prelude::*;
use slotmap::SlotMap;

use crate::{soft_accel::SoftAccel, soft_geometry::SoftGeometry};

/// 避免自相交
const RAY_T_MIN: f32 = 1e-4;

#[inline]
pub fn pcg_hash(input: u32) -> u32 {
    let state = input.wrapping_mul(747796405).wrapping_add(2891336453);
    let word = ((state >> ((state >> 28) + 4)) ^ state).wrapping_mul(277803737);
    (word >> 22) ^ word
}

/// [0, 1) 的均匀分布
#[inline]
fn hash_to_unit_f32(hash: u32) -> f32 {
    (hash >> 8) as f32 / (1u32 << 24) as f32
}

/// 用四个角点方向双线性插值出主光线方向
///
/// `u` 从左到右，`v` 从上到下，都在 [0, 1] 之间
#[inline]
pub fn interpolate_corners(push: &RtPushConstants, u: f32, v: f32) -> Vec3 {
    let top = push.top_left.xyz().lerp(push.top_right.xyz(), u);
    let bottom = push.bottom_left.xyz().lerp(push.bottom_right.xyz(), u);
    top.lerp(bottom, v).normalize_or_zero()
}

pub fn shade_miss(push: &RtPushConstants, dir: Vec3) -> Vec4 {
    let color = if dir.y > 0.0 { push.sky_color } else { push.ground_color };
    color.xyz().extend(1.0)
}

pub fn trace_image(
    accel: &SoftAccel,
    geometries: &SlotMap<GfxGeometryHandle, SoftGeometry>,
    push: &RtPushConstants,
    width: u32,
    output: &mut [Vec4],
) {
    if width == 0 {
        return;
    }
    let height = output.len() / width as usize;
    let frame_seed = pcg_hash(push.frame_index);
    let origin = push.camera_pos.xyz();
    let sky = push.sky_color.xyz();
    let ground = push.ground_color.xyz();

    output.par_chunks_mut(width as usize).enumerate().for_each(|(y, row)| {
        for (x, texel) in row.iter_mut().enumerate() {
            let pixel_index = (y * width as usize + x) as u32;
            let seed = pcg_hash(pixel_index ^ frame_seed);
            let jitter_x = hash_to_unit_f32(seed);
            let jitter_y = hash_to_unit_f32(pcg_hash(seed));

            let u = (x as f32 + jitter_x) / width as f32;
            let v = (y as f32 + jitter_y) / height as f32;
            let dir = interpolate_corners(push, u, v);

            *texel = match accel.intersect(geometries, origin, dir, RAY_T_MIN, f32::MAX) {
                Some(hit) => {
                    let sky_weight = hit.normal.y * 0.5 + 0.5;
                    (ground.lerp(sky, sky_weight) * hit.albedo).extend(1.0)
                }
                None => shade_miss(push, dir),
            };
        }
    });
}

/// `output = accumulation * n / (n + 1) + current / (n + 1)`
///
/// n 为 0 时直接拷贝当前帧，不做任何运算
pub fn accumulate_image(current: &[Vec4], accumulation: &[Vec4], output: &mut [Vec4], accum_frames: u32) {
    if accum_frames == 0 {
        output.par_iter_mut().zip(current.par_iter()).for_each(|(dst, src)| *dst = *src);
        return;
    }

    let n = accum_frames as f32;
    let history_weight = n / (n + 1.0);
    let sample_weight = 1.0 / (n + 1.0);
    output
        .par_iter_mut()
        .zip(current.par_iter().zip(accumulation.par_iter()))
        .for_each(|(dst, (cur, prev))| *dst = *prev * history_weight + *cur * sample_weight);
}
