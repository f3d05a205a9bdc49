//! RenderGraph - 声明式渲染图系统
//!
//! 提供自动依赖分析和 barrier 生成的渲染图抽象。
//!
//! # 核心概念
//!
//! - **RgImageHandle**: 虚拟资源句柄，在 graph 内部标识资源
//! - **RgImageState**: 资源状态描述，包含 stage、access、layout
//! - **RgPass**: 渲染 Pass trait，声明资源依赖和执行逻辑
//! - **RenderGraphBuilder**: 构建器，用于注册资源和 Pass
//! - **CompiledGraph**: 编译结果，包含执行顺序和预计算的 barriers
//!
//! # 使用示例
//!
//! ```ignore
//! struct MyComputePass {
//!     input: RgImageHandle,
//!     output: RgImageHandle,
//! }
//!
//! impl RgPass for MyComputePass {
//!     fn setup(&mut self, builder: &mut RgPassBuilder) {
//!         builder.read_image(self.input, RgImageState::STORAGE_READ_COMPUTE);
//!         builder.write_image(self.output, RgImageState::STORAGE_WRITE_COMPUTE);
//!     }
//!
//!     fn execute(&mut self, ctx: &mut RgPassContext<'_>) -> Result<(), GfxError> {
//!         let output = ctx.get_image_handle(self.output);
//!         // 录制命令...
//!         Ok(())
//!     }
//! }
//!
//! let mut builder = RenderGraphBuilder::new();
//! let input = builder.import_image("input", input_handle, vk::Format::R32G32B32A32_SFLOAT, RgImageState::UNDEFINED);
//! let output = builder.import_image("output", output_handle, vk::Format::R32G32B32A32_SFLOAT, RgImageState::UNDEFINED);
//! builder.add_pass("compute", MyComputePass { input, output });
//! builder.export_image(output, RgImageState::TRANSFER_SRC);
//!
//! let mut graph = builder.compile()?;
//! graph.execute(device.encoder())?;
//! ```
//!
//! 资源全部来自外部导入，graph 本身不负责分配。

mod barrier;
mod executor;
mod export_info;
mod graph;
mod image_resource;
mod pass;
mod resource_handle;
mod resource_registry;
mod resource_state;

pub use barrier::{PassBarriers, RgImageBarrierDesc};
pub use executor::{CompiledGraph, RenderGraphBuilder, RgError};
pub use export_info::RgExportInfo;
pub use graph::{DependencyEdge, DependencyGraph};
pub use image_resource::RgImageResource;
pub use pass::{RgPass, RgPassBuilder, RgPassContext, RgPassNode};
pub use resource_handle::RgImageHandle;
pub use resource_registry::RgResourceRegistry;
pub use resource_state::RgImageState;
