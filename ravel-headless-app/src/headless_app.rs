use anyhow::Context;
use ash::vk;
use ravel_crate_tools::{init_log::init_log, resource::RavelPath};
use ravel_renderer::{
    config::{EntryPoint, RendererConfig},
    renderer::{FrameOutput, ProgressiveRenderer},
};
use ravel_scene::{camera::Camera, scene_manager::SceneManager};
use ravel_soft_gfx::soft_gfx::SoftGfx;

use crate::{demo_scene::DemoScene, image_export};

pub fn panic_handler(info: &std::panic::PanicHookInfo) {
    log::error!("{}", info);
}

/// 没有窗口的渲染循环：固定帧数，最后把累积结果写到磁盘
pub struct HeadlessApp {
    config: RendererConfig,

    gfx: SoftGfx,
    scene: SceneManager,
    camera: Camera,
    renderer: ProgressiveRenderer,
}
// 总的 main 函数
impl HeadlessApp {
    /// 整个程序的入口
    pub fn run(config_name: &str) -> anyhow::Result<()> {
        Self::init_env();

        let config = Self::load_config(config_name)?;
        let mut app = Self::new(config)?;
        let result = app.render_all().and_then(|extent| app.export(extent));

        log::info!("end run.");
        app.destroy();
        result
    }

    pub fn init_env() {
        std::panic::set_hook(Box::new(panic_handler));
        init_log();
    }

    /// 配置文件不存在时使用默认配置，格式错误时报错
    fn load_config(config_name: &str) -> anyhow::Result<RendererConfig> {
        let path = RavelPath::config_path(config_name);
        if !path.is_file() {
            log::warn!("config {} not found, use default config", path.display());
            return Ok(RendererConfig::default());
        }

        let config = RendererConfig::load(&path).with_context(|| format!("load config {}", path.display()))?;
        log::info!("config loaded: {}", path.display());
        Ok(config)
    }
}
// new & init
impl HeadlessApp {
    pub fn new(config: RendererConfig) -> anyhow::Result<Self> {
        let mut gfx = SoftGfx::new("ravel-soft");
        let mut scene = SceneManager::new();
        DemoScene::create(&mut gfx, &mut scene);

        let camera = Camera::new(
            config.camera.position.into(),
            config.camera.yaw_deg,
            config.camera.pitch_deg,
        );

        let mut renderer = ProgressiveRenderer::new(config.renderer_settings());
        renderer
            .initialize(&mut gfx, &scene, &config.camera_config())
            .context("initialize progressive renderer")?;

        Ok(Self {
            config,
            gfx,
            scene,
            camera,
            renderer,
        })
    }
}
// update
impl HeadlessApp {
    /// 返回最后一帧的尺寸
    fn render_all(&mut self) -> anyhow::Result<vk::Extent2D> {
        let output = &self.config.output;
        let (width, height) = (output.width, output.height);
        log::info!(
            "render {} frames at {}x{} through {:?} path",
            output.frames,
            width,
            height,
            output.entry_point
        );

        for frame in 0..output.frames {
            if self.config.camera.move_at_frame == Some(frame) {
                self.camera.move_right(0.3);
                self.camera.rotate_yaw(-5.0);
                log::info!("camera moved at frame {}", frame);
            }

            let frame_output = match output.entry_point {
                EntryPoint::Direct => {
                    self.renderer.render_frame(&mut self.gfx, &self.scene, &self.camera, width, height)
                }
                EntryPoint::RenderGraph => {
                    self.renderer
                        .render_frame_with_graph(&mut self.gfx, &self.scene, &self.camera, width, height)
                }
            }
            .with_context(|| format!("render frame {}", frame))?;

            match frame_output {
                FrameOutput::Presented(result) => {
                    if result.sample_count.is_power_of_two() {
                        log::info!("frame {}: {} samples accumulated", frame, result.sample_count);
                    }
                }
                FrameOutput::NotReady => log::warn!("frame {}: renderer not ready", frame),
                FrameOutput::Disabled => anyhow::bail!("progressive renderer is disabled"),
            }
        }

        Ok(vk::Extent2D { width, height })
    }

    fn export(&self, extent: vk::Extent2D) -> anyhow::Result<()> {
        let result = self.renderer.latest_result().context("no frame has been presented")?;
        let pixels = self
            .gfx
            .image_pixels(result.image)
            .context("accumulated image is missing")?;

        let path = RavelPath::output_path(&self.config.output.file_name);
        image_export::save_png(pixels, extent, &path)?;
        log::info!("{} samples written to {}", result.sample_count, path.display());
        Ok(())
    }
}
// destroy
impl HeadlessApp {
    fn destroy(mut self) {
        self.renderer.destroy(&mut self.gfx);
    }
}
