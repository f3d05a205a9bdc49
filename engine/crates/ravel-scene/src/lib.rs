pub mod camera;
pub mod ray_traceable;
pub mod scene_manager;
pub mod scene_object;
