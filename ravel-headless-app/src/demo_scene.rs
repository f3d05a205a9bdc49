//! 示例场景：地面、几个球、一个立方体，以及一块棋盘格镂空的面板

use ravel_gfx::raytracing::acceleration::GfxInstanceFlags;
use ravel_scene::{scene_manager::SceneManager, scene_object::SceneObject};
use ravel_soft_gfx::{soft_geometry::SoftGeometry, soft_gfx::SoftGfx};

pub struct DemoScene;

impl DemoScene {
    pub fn create(gfx: &mut SoftGfx, scene: &mut SceneManager) {
        let floor = gfx.register_geometry(SoftGeometry::quad_xz(8.0, glam::vec3(0.75, 0.75, 0.72)));
        scene.register_object(SceneObject::new("floor", floor, glam::Mat4::IDENTITY));

        let spheres = [
            ("sphere-red", glam::vec3(-1.6, 0.7, 0.0), 0.7, glam::vec3(0.85, 0.2, 0.15)),
            ("sphere-green", glam::vec3(0.0, 1.0, -1.2), 1.0, glam::vec3(0.2, 0.8, 0.3)),
            ("sphere-blue", glam::vec3(1.7, 0.5, 0.6), 0.5, glam::vec3(0.2, 0.35, 0.9)),
        ];
        for (name, center, radius, albedo) in spheres {
            let geometry = gfx.register_geometry(SoftGeometry::sphere(glam::Vec3::ZERO, radius, albedo));
            scene.register_object(SceneObject::new(name, geometry, glam::Mat4::from_translation(center)));
        }

        let cube = gfx.register_geometry(SoftGeometry::cube(0.45, glam::vec3(0.9, 0.75, 0.3)));
        scene.register_object(SceneObject::new(
            "cube",
            cube,
            glam::Mat4::from_rotation_translation(
                glam::Quat::from_rotation_y(30f32.to_radians()),
                glam::vec3(0.6, 0.45, 1.8),
            ),
        ));

        // 立起来的镂空面板，只有 any-hit 打开时镂空才生效
        let panel = gfx.register_geometry(
            SoftGeometry::quad_xz(1.2, glam::vec3(0.95, 0.95, 0.95)).with_checker_cutout(0.3),
        );
        scene.register_object(
            SceneObject::new(
                "checker-panel",
                panel,
                glam::Mat4::from_rotation_translation(
                    glam::Quat::from_rotation_x(90f32.to_radians()),
                    glam::vec3(-0.4, 1.2, -3.2),
                ),
            )
            .with_flags(GfxInstanceFlags::ENABLED | GfxInstanceFlags::UNIQUE_ANY_HIT),
        );

        log::info!("demo scene created: {} objects", scene.len());
    }
}
