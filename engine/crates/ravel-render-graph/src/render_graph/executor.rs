//! RenderGraph 构建器和执行器
//!
//! 提供 `RenderGraphBuilder` 用于构建渲染图，
//! `CompiledGraph` 用于缓存编译结果并执行渲染。

use ash::vk;
use itertools::Itertools;
use ravel_gfx::{
    basic::color::LabelColor, commands::encoder::GfxCommandEncoder, error::GfxError,
    resources::handles::GfxImageHandle,
};
use slotmap::SecondaryMap;

use crate::render_graph::{
    PassBarriers, RgImageBarrierDesc, RgImageHandle, RgImageResource, RgImageState, RgPass, RgPassBuilder,
    RgPassContext, RgPassNode, RgResourceRegistry, graph::DependencyGraph,
};

#[derive(Debug, thiserror::Error)]
pub enum RgError {
    #[error("render graph cycle detected involving passes: {0:?}")]
    Cycle(Vec<String>),

    #[error("pass `{name}` failed: {source}")]
    Pass { name: String, source: GfxError },
}

/// 类型擦除的 Pass 执行器 trait
pub(crate) trait RgPassExecutor {
    fn execute(&mut self, ctx: &mut RgPassContext<'_>) -> Result<(), GfxError>;
}

/// 包装用户 Pass 实现的执行器
pub(crate) struct RgPassExecutorWrapper<P: RgPass> {
    pub pass: P,
}

impl<P: RgPass> RgPassExecutor for RgPassExecutorWrapper<P> {
    fn execute(&mut self, ctx: &mut RgPassContext<'_>) -> Result<(), GfxError> {
        self.pass.execute(ctx)
    }
}

/// RenderGraph 构建器
///
/// # 使用流程
///
/// 1. 创建 builder: `RenderGraphBuilder::new()`
/// 2. 导入外部资源: `builder.import_image(...)`
/// 3. 添加 Pass: `builder.add_pass("name", pass)`
/// 4. 编译: `builder.compile()`
/// 5. 执行: `compiled.execute(...)`
///
/// # 生命周期
///
/// `'a` 是 Pass 可以借用的外部资源的生命周期。
/// 这允许 Pass 直接可变借用外部的状态，而不需要使用 Rc/RefCell 包装。
pub struct RenderGraphBuilder<'a> {
    resources: RgResourceRegistry,

    /// Pass 节点列表（按添加顺序）
    passes: Vec<RgPassNode<'a>>,
}

impl Default for RenderGraphBuilder<'_> {
    fn default() -> Self {
        Self::new()
    }
}

impl<'a> RenderGraphBuilder<'a> {
    pub fn new() -> Self {
        Self {
            resources: RgResourceRegistry::new(),
            passes: Vec::new(),
        }
    }

    /// 导入外部图像资源
    ///
    /// # 参数
    /// - `name`: 资源调试名称
    /// - `image_handle`: 物理图像句柄
    /// - `format`: 图像格式（用于推断 barrier aspect）
    /// - `initial_state`: 图像的初始状态
    pub fn import_image(
        &mut self,
        name: impl Into<String>,
        image_handle: GfxImageHandle,
        format: vk::Format,
        initial_state: RgImageState,
    ) -> RgImageHandle {
        self.resources.register_image(RgImageResource::imported(name, image_handle, format, initial_state))
    }

    /// 将图像标记为 graph 的输出，执行结束后会转换到 `final_state`
    pub fn export_image(&mut self, handle: RgImageHandle, final_state: RgImageState) {
        if let Some(resource) = self.resources.get_image_mut(handle) {
            resource.export = Some(crate::render_graph::RgExportInfo::new(final_state));
        }
    }

    /// 添加 Pass
    ///
    /// # 参数
    /// - `name`: Pass 名称（用于调试 label）
    /// - `pass`: 实现了 `RgPass` trait 的 Pass 对象
    pub fn add_pass<P: RgPass + 'a>(&mut self, name: impl Into<String>, mut pass: P) -> &mut Self {
        let name = name.into();

        let mut builder = RgPassBuilder {
            name: name.clone(),
            image_reads: Vec::new(),
            image_writes: Vec::new(),
            resources: &mut self.resources,
        };

        pass.setup(&mut builder);

        let node = RgPassNode {
            name,
            image_reads: builder.image_reads,
            image_writes: builder.image_writes,
            has_side_effects: pass.has_side_effects(),
            executor: Box::new(RgPassExecutorWrapper { pass }),
        };

        self.passes.push(node);
        self
    }

    /// 编译渲染图
    ///
    /// 执行依赖分析、拓扑排序、Pass 剔除、barrier 计算。
    pub fn compile(self) -> Result<CompiledGraph<'a>, RgError> {
        let pass_count = self.passes.len();

        let image_reads = self.passes.iter().map(|p| p.image_reads.iter().map(|s| s.0).collect_vec()).collect_vec();
        let image_writes = self.passes.iter().map(|p| p.image_writes.iter().map(|s| s.0).collect_vec()).collect_vec();

        let dep_graph = DependencyGraph::analyze(pass_count, &image_reads, &image_writes);
        for edge in dep_graph.edges() {
            log::debug!(
                "render graph: {} -> {} ({} images)",
                self.passes[edge.producer].name,
                self.passes[edge.consumer].name,
                edge.images.len()
            );
        }

        let sorted = dep_graph
            .topological_sort()
            .map_err(|cycle| RgError::Cycle(cycle.iter().map(|&i| self.passes[i].name.clone()).collect()))?;

        let (execution_order, culled): (Vec<usize>, Vec<usize>) = {
            let alive = self.compute_alive_passes(&sorted);
            sorted.iter().partition(|&&i| alive[i])
        };
        for &pass_idx in &culled {
            log::debug!("render graph: cull pass {}", self.passes[pass_idx].name);
        }

        let (barriers, export_barriers) = self.compute_barriers(&execution_order);

        Ok(CompiledGraph {
            resources: self.resources,
            passes: self.passes,
            execution_order,
            culled,
            barriers,
            export_barriers,
        })
    }

    /// 从后往前遍历：Pass 有副作用，或者写入了被导出 / 被后续存活 Pass 读取的图像，则存活
    fn compute_alive_passes(&self, sorted: &[usize]) -> Vec<bool> {
        let mut alive = vec![false; self.passes.len()];
        let mut needed_images: std::collections::HashSet<RgImageHandle> = self
            .resources
            .iter_images()
            .filter(|(_, resource)| resource.is_exported())
            .map(|(handle, _)| handle)
            .collect();

        for &pass_idx in sorted.iter().rev() {
            let pass = &self.passes[pass_idx];
            let is_alive =
                pass.has_side_effects || pass.image_writes.iter().any(|(handle, _)| needed_images.contains(handle));
            if is_alive {
                alive[pass_idx] = true;
                needed_images.extend(pass.image_reads.iter().map(|(handle, _)| *handle));
            }
        }

        alive
    }

    /// 计算每个 Pass 需要的 barriers，以及执行结束后导出资源需要的 barriers
    ///
    /// 模拟 pass 的执行顺序，跟踪资源的状态变化，生成必要的 barriers
    fn compute_barriers(&self, execution_order: &[usize]) -> (Vec<PassBarriers>, Vec<RgImageBarrierDesc>) {
        let mut barriers = vec![PassBarriers::new(); self.passes.len()];

        let mut image_states: SecondaryMap<RgImageHandle, RgImageState> =
            self.resources.iter_images().map(|(handle, res)| (handle, res.initial_state)).collect();

        let get_image_aspect = |handle: RgImageHandle| {
            self.resources.get_image(handle).map_or(vk::ImageAspectFlags::COLOR, |res| res.infer_aspect())
        };

        for &pass_idx in execution_order {
            let pass = &self.passes[pass_idx];
            let pass_barriers = &mut barriers[pass_idx];

            // 收集此 Pass 中每个图像的使用，保持声明顺序
            // (handle, is_write, required_state)
            let mut image_usage: Vec<(RgImageHandle, bool, RgImageState)> = Vec::new();
            for (handle, state) in &pass.image_reads {
                if !image_usage.iter().any(|(h, _, _)| h == handle) {
                    image_usage.push((*handle, false, *state));
                }
            }
            // 写入会覆盖读取的目标状态
            for (handle, state) in &pass.image_writes {
                match image_usage.iter_mut().find(|(h, _, _)| h == handle) {
                    Some(usage) => *usage = (*handle, true, *state),
                    None => image_usage.push((*handle, true, *state)),
                }
            }

            for (handle, is_write, required_state) in image_usage {
                if let Some(&crt_state) = image_states.get(handle) {
                    pass_barriers.add_image_barrier(
                        RgImageBarrierDesc::new(handle, crt_state, required_state)
                            .with_aspect(get_image_aspect(handle)),
                    );

                    // 如果是写入或 layout 改变，更新状态
                    if is_write || crt_state.layout != required_state.layout {
                        image_states.insert(handle, required_state);
                    }
                }
            }
        }

        let export_barriers = self
            .resources
            .iter_images()
            .filter_map(|(handle, res)| {
                let export = res.export?;
                let crt_state = image_states.get(handle).copied().unwrap_or(res.initial_state);
                let barrier = RgImageBarrierDesc::new(handle, crt_state, export.final_state)
                    .with_aspect(get_image_aspect(handle));
                barrier.needs_barrier().then_some(barrier)
            })
            .collect();

        (barriers, export_barriers)
    }
}

/// 编译后的渲染图
///
/// 包含执行顺序、预计算的 barriers。
///
/// # 生命周期
///
/// `'a` 是 Pass 借用的外部资源的生命周期。
pub struct CompiledGraph<'a> {
    resources: RgResourceRegistry,
    passes: Vec<RgPassNode<'a>>,
    /// 执行顺序（拓扑排序后，已去掉被剔除的 Pass）
    execution_order: Vec<usize>,
    culled: Vec<usize>,
    /// 每个 Pass 的 barriers（按 pass 索引）
    barriers: Vec<PassBarriers>,
    export_barriers: Vec<RgImageBarrierDesc>,
}

impl CompiledGraph<'_> {
    pub fn execution_order(&self) -> &[usize] {
        &self.execution_order
    }

    pub fn pass_name(&self, index: usize) -> &str {
        &self.passes[index].name
    }

    /// 被剔除的 Pass 索引
    pub fn culled_passes(&self) -> &[usize] {
        &self.culled
    }

    pub fn pass_barriers(&self, index: usize) -> &PassBarriers {
        &self.barriers[index]
    }

    /// 执行渲染图
    ///
    /// 任意一个 Pass 失败都会立即返回，后续 Pass 不再执行
    pub fn execute(&mut self, cmd: &mut dyn GfxCommandEncoder) -> Result<(), RgError> {
        let image_handles: SecondaryMap<RgImageHandle, GfxImageHandle> =
            self.resources.iter_images().map(|(handle, res)| (handle, res.image_handle)).collect();

        for &pass_idx in &self.execution_order {
            let pass_barriers = &self.barriers[pass_idx];
            if pass_barriers.has_barriers() {
                Self::record_barriers(&self.resources, cmd, &pass_barriers.image_barriers);
            }

            let pass = &mut self.passes[pass_idx];
            cmd.begin_label(&pass.name, LabelColor::COLOR_PASS);
            let result = {
                let mut ctx = RgPassContext {
                    cmd: &mut *cmd,
                    image_handles: &image_handles,
                };
                pass.executor.execute(&mut ctx)
            };
            cmd.end_label();

            result.map_err(|source| RgError::Pass {
                name: pass.name.clone(),
                source,
            })?;
        }

        if !self.export_barriers.is_empty() {
            Self::record_barriers(&self.resources, cmd, &self.export_barriers);
        }

        Ok(())
    }

    fn record_barriers(
        resources: &RgResourceRegistry,
        cmd: &mut dyn GfxCommandEncoder,
        barrier_descs: &[RgImageBarrierDesc],
    ) {
        let image_barriers = barrier_descs
            .iter()
            .filter(|desc| desc.needs_barrier())
            .filter_map(|desc| {
                let res = resources.get_image(desc.handle)?;
                Some(desc.to_gfx_barrier(res.image_handle))
            })
            .collect_vec();

        if !image_barriers.is_empty() {
            cmd.image_barrier(&image_barriers);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ravel_gfx::{
        commands::barrier::GfxImageBarrier,
        raytracing::bindings::{AccumBindings, AccumPushConstants, RtBindings, RtPushConstants},
    };
    use slotmap::SlotMap;
    use std::{cell::RefCell, rc::Rc};

    #[derive(Default)]
    struct RecordingEncoder {
        events: Vec<String>,
        barriers: Vec<GfxImageBarrier>,
    }

    impl GfxCommandEncoder for RecordingEncoder {
        fn begin_label(&mut self, label_name: &str, _label_color: glam::Vec4) {
            self.events.push(format!("begin:{label_name}"));
        }
        fn end_label(&mut self) {
            self.events.push("end".to_string());
        }
        fn image_barrier(&mut self, barriers: &[GfxImageBarrier]) {
            self.events.push(format!("barrier:{}", barriers.len()));
            self.barriers.extend_from_slice(barriers);
        }
        fn trace_rays(&mut self, _: &RtBindings, _: &RtPushConstants, _: [u32; 3]) -> Result<(), GfxError> {
            Ok(())
        }
        fn blit_accumulate(&mut self, _: &AccumBindings, _: &AccumPushConstants) -> Result<(), GfxError> {
            Ok(())
        }
    }

    struct TestPass {
        reads: Vec<(RgImageHandle, RgImageState)>,
        writes: Vec<(RgImageHandle, RgImageState)>,
        side_effects: bool,
        fail: bool,
        log: Rc<RefCell<Vec<&'static str>>>,
        tag: &'static str,
    }

    impl TestPass {
        fn new(tag: &'static str, log: &Rc<RefCell<Vec<&'static str>>>) -> Self {
            Self {
                reads: Vec::new(),
                writes: Vec::new(),
                side_effects: false,
                fail: false,
                log: log.clone(),
                tag,
            }
        }
    }

    impl RgPass for TestPass {
        fn setup(&mut self, builder: &mut RgPassBuilder) {
            for (handle, state) in &self.reads {
                builder.read_image(*handle, *state);
            }
            for (handle, state) in &self.writes {
                builder.write_image(*handle, *state);
            }
        }

        fn execute(&mut self, ctx: &mut RgPassContext<'_>) -> Result<(), GfxError> {
            for (handle, _) in &self.writes {
                assert!(ctx.get_image_handle(*handle).is_some());
            }
            self.log.borrow_mut().push(self.tag);
            if self.fail { Err(GfxError::InvalidHandle { kind: "image" }) } else { Ok(()) }
        }

        fn has_side_effects(&self) -> bool {
            self.side_effects
        }
    }

    fn gfx_images(count: usize) -> Vec<GfxImageHandle> {
        let mut map: SlotMap<GfxImageHandle, ()> = SlotMap::with_key();
        (0..count).map(|_| map.insert(())).collect()
    }

    const FORMAT: vk::Format = vk::Format::R32G32B32A32_SFLOAT;

    #[test]
    fn test_write_then_read_emits_barrier() {
        let log = Rc::new(RefCell::new(Vec::new()));
        let phys = gfx_images(2);

        let mut builder = RenderGraphBuilder::new();
        let raw = builder.import_image("raw", phys[0], FORMAT, RgImageState::UNDEFINED);
        let out = builder.import_image("out", phys[1], FORMAT, RgImageState::UNDEFINED);

        let mut producer = TestPass::new("producer", &log);
        producer.writes.push((raw, RgImageState::STORAGE_WRITE_RAY_TRACING));
        let mut consumer = TestPass::new("consumer", &log);
        consumer.reads.push((raw, RgImageState::STORAGE_READ_COMPUTE));
        consumer.writes.push((out, RgImageState::STORAGE_WRITE_COMPUTE));

        builder.add_pass("producer", producer).add_pass("consumer", consumer);
        builder.export_image(out, RgImageState::TRANSFER_SRC);

        let mut graph = builder.compile().unwrap();
        assert_eq!(graph.execution_order(), &[0, 1]);
        assert!(graph.culled_passes().is_empty());

        // consumer 之前：raw 从 storage write 到 storage read
        let raw_barrier = graph.pass_barriers(1).image_barriers.iter().find(|b| b.handle == raw).unwrap();
        assert!(raw_barrier.src_state.is_write());
        assert_eq!(raw_barrier.dst_state, RgImageState::STORAGE_READ_COMPUTE);

        let mut encoder = RecordingEncoder::default();
        graph.execute(&mut encoder).unwrap();
        assert_eq!(*log.borrow(), vec!["producer", "consumer"]);

        // 最后一个 barrier 是导出 out
        let last = encoder.barriers.last().unwrap();
        assert_eq!(last.image, phys[1]);
        assert_eq!(last.new_layout, vk::ImageLayout::TRANSFER_SRC_OPTIMAL);
        assert!(encoder.events.contains(&"begin:consumer".to_string()));
    }

    #[test]
    fn test_unused_pass_is_culled() {
        let log = Rc::new(RefCell::new(Vec::new()));
        let phys = gfx_images(2);

        let mut builder = RenderGraphBuilder::new();
        let scratch = builder.import_image("scratch", phys[0], FORMAT, RgImageState::UNDEFINED);
        let kept = builder.import_image("kept", phys[1], FORMAT, RgImageState::UNDEFINED);

        let mut unused = TestPass::new("unused", &log);
        unused.writes.push((scratch, RgImageState::STORAGE_WRITE_COMPUTE));
        let mut side_effect = TestPass::new("side-effect", &log);
        side_effect.writes.push((kept, RgImageState::STORAGE_WRITE_COMPUTE));
        side_effect.side_effects = true;

        builder.add_pass("unused", unused).add_pass("side-effect", side_effect);
        let mut graph = builder.compile().unwrap();
        assert_eq!(graph.culled_passes(), &[0]);
        assert_eq!(graph.pass_name(graph.execution_order()[0]), "side-effect");

        graph.execute(&mut RecordingEncoder::default()).unwrap();
        assert_eq!(*log.borrow(), vec!["side-effect"]);
    }

    #[test]
    fn test_pass_error_stops_execution() {
        let log = Rc::new(RefCell::new(Vec::new()));
        let phys = gfx_images(1);

        let mut builder = RenderGraphBuilder::new();
        let image = builder.import_image("image", phys[0], FORMAT, RgImageState::UNDEFINED);

        let mut first = TestPass::new("first", &log);
        first.writes.push((image, RgImageState::STORAGE_WRITE_COMPUTE));
        first.side_effects = true;
        first.fail = true;
        let mut second = TestPass::new("second", &log);
        second.reads.push((image, RgImageState::STORAGE_READ_COMPUTE));
        second.side_effects = true;

        builder.add_pass("first", first).add_pass("second", second);
        let mut graph = builder.compile().unwrap();

        let mut encoder = RecordingEncoder::default();
        let err = graph.execute(&mut encoder).unwrap_err();
        assert!(matches!(err, RgError::Pass { ref name, .. } if name == "first"));
        assert_eq!(*log.borrow(), vec!["first"]);
        // label 仍然成对
        let begins = encoder.events.iter().filter(|e| e.starts_with("begin:")).count();
        let ends = encoder.events.iter().filter(|e| *e == "end").count();
        assert_eq!(begins, ends);
    }
}
