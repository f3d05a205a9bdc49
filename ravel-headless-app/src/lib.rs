pub mod demo_scene;
pub mod headless_app;
pub mod image_export;
