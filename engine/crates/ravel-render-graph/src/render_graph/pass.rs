//! Pass 定义和构建器
//!
//! 提供 `RgPass` trait 用于声明式定义渲染 Pass，
//! 以及 `RgPassBuilder` 用于在 setup 阶段声明资源依赖。

use ravel_gfx::{commands::encoder::GfxCommandEncoder, error::GfxError, resources::handles::GfxImageHandle};
use slotmap::SecondaryMap;

use crate::render_graph::{RgExportInfo, RgImageHandle, RgImageState, executor::RgPassExecutor, RgResourceRegistry};

/// Pass 执行时的上下文
///
/// 提供 Pass 执行所需的资源访问和命令录制器。
pub struct RgPassContext<'a> {
    pub cmd: &'a mut dyn GfxCommandEncoder,

    /// 物理资源查询表
    pub(crate) image_handles: &'a SecondaryMap<RgImageHandle, GfxImageHandle>,
}

impl RgPassContext<'_> {
    /// 获取图像的物理句柄
    #[inline]
    pub fn get_image_handle(&self, handle: RgImageHandle) -> Option<GfxImageHandle> {
        self.image_handles.get(handle).copied()
    }
}

/// Pass 构建器
///
/// 在 `RgPass::setup()` 中使用，声明 Pass 的资源依赖。
pub struct RgPassBuilder<'a> {
    #[allow(dead_code)]
    pub(crate) name: String,

    pub(crate) image_reads: Vec<(RgImageHandle, RgImageState)>,
    pub(crate) image_writes: Vec<(RgImageHandle, RgImageState)>,

    pub(crate) resources: &'a mut RgResourceRegistry,
}

impl RgPassBuilder<'_> {
    /// 声明读取图像
    ///
    /// # 参数
    /// - `handle`: 要读取的图像句柄
    /// - `state`: 期望的图像状态（用于自动生成 barrier）
    #[inline]
    pub fn read_image(&mut self, handle: RgImageHandle, state: RgImageState) -> RgImageHandle {
        self.image_reads.push((handle, state));
        handle
    }

    /// 声明写入图像
    pub fn write_image(&mut self, handle: RgImageHandle, state: RgImageState) -> RgImageHandle {
        self.image_writes.push((handle, state));
        handle
    }

    /// 声明读写图像（同时读取和写入）
    ///
    /// 常用于累积操作
    pub fn read_write_image(&mut self, handle: RgImageHandle, state: RgImageState) -> RgImageHandle {
        self.read_image(handle, state);
        self.write_image(handle, state)
    }

    /// 将图像标记为 graph 的输出
    pub fn export_image(&mut self, handle: RgImageHandle, final_state: RgImageState) {
        if let Some(resource) = self.resources.get_image_mut(handle) {
            resource.export = Some(RgExportInfo::new(final_state));
        }
    }
}

/// Pass 节点数据（编译后使用）
pub struct RgPassNode<'a> {
    pub name: String,

    pub image_reads: Vec<(RgImageHandle, RgImageState)>,
    pub image_writes: Vec<(RgImageHandle, RgImageState)>,

    /// 为 true 时，即使输出没有被使用也不会被剔除
    pub has_side_effects: bool,

    /// 执行回调（类型擦除的 Pass 实现）
    pub(crate) executor: Box<dyn RgPassExecutor + 'a>,
}

/// RgPass trait
///
/// 定义渲染图中的一个 Pass。
///
/// Pass 不需要是 Send + Sync，RenderGraph 在单线程中使用。
/// Pass 可以借用外部资源，生命周期由 RenderGraphBuilder 的生命周期参数约束。
pub trait RgPass {
    /// 声明 Pass 的资源依赖
    fn setup(&mut self, builder: &mut RgPassBuilder);

    /// 执行 Pass 的渲染逻辑
    ///
    /// debug label 已经由 graph 插入，直接录制命令即可。
    fn execute(&mut self, ctx: &mut RgPassContext<'_>) -> Result<(), GfxError>;

    /// 输出没有被任何 Pass 读取、也没有被导出时，Pass 会被剔除，除非这里返回 true
    fn has_side_effects(&self) -> bool {
        false
    }
}
