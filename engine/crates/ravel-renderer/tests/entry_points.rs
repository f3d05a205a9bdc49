mod common;

use ash::vk;
use ravel_gfx::{commands::barrier::GfxImageBarrier, resources::handles::GfxImageHandle};
use ravel_renderer::renderer::FrameOutput;
use ravel_soft_gfx::soft_gfx::SoftGfx;

use common::{TestWorld, build_world, image_pixels, initialized_renderer};

#[test]
fn test_direct_and_graph_paths_match() {
    let mut direct_world = build_world(SoftGfx::new("direct"));
    let mut graph_world = build_world(SoftGfx::new("graph"));
    let mut direct = initialized_renderer(&mut direct_world);
    let mut graph = initialized_renderer(&mut graph_world);

    for frame in 0..5 {
        if frame == 3 {
            direct_world.camera.move_forward(0.25);
            graph_world.camera.move_forward(0.25);
        }

        let a = direct
            .render_frame(&mut direct_world.gfx, &direct_world.scene, &direct_world.camera, 20, 12)
            .unwrap();
        let b = graph
            .render_frame_with_graph(&mut graph_world.gfx, &graph_world.scene, &graph_world.camera, 20, 12)
            .unwrap();
        let a = *a.presented().unwrap();
        let b = *b.presented().unwrap();

        assert_eq!(a.sample_count, b.sample_count);
        assert_eq!(a.slot, b.slot);
        assert_eq!(image_pixels(&direct_world, a.image), image_pixels(&graph_world, b.image));
    }

    assert_eq!(direct_world.gfx.stats().trace_dispatches, 5);
    assert_eq!(graph_world.gfx.stats().trace_dispatches, 5);

    direct.destroy(&mut direct_world.gfx);
    graph.destroy(&mut graph_world.gfx);
}

#[test]
fn test_paths_can_be_mixed_on_one_renderer() {
    let mut world = build_world(SoftGfx::new("soft"));
    let mut renderer = initialized_renderer(&mut world);

    let first = renderer.render_frame(&mut world.gfx, &world.scene, &world.camera, 16, 16).unwrap();
    let second = renderer
        .render_frame_with_graph(&mut world.gfx, &world.scene, &world.camera, 16, 16)
        .unwrap();
    let third = renderer.render_frame(&mut world.gfx, &world.scene, &world.camera, 16, 16).unwrap();

    let counts: Vec<_> = [first, second, third]
        .iter()
        .map(|output| output.presented().map(|r| r.sample_count))
        .collect();
    assert_eq!(counts, [Some(1), Some(2), Some(3)]);

    renderer.destroy(&mut world.gfx);
}

fn barriers_on(world: &TestWorld, image: GfxImageHandle) -> Vec<GfxImageBarrier> {
    world.gfx.stats().barriers.iter().filter(|b| b.image == image).cloned().collect()
}

/// 记录一帧，返回 (previous 缓冲的第一个 barrier, current 缓冲在导出前的第一个 barrier)
fn record_and_collect(
    world: &mut TestWorld,
    renderer: &mut ravel_renderer::renderer::ProgressiveRenderer,
    with_graph: bool,
    width: u32,
) -> (GfxImageBarrier, GfxImageBarrier) {
    world.gfx.reset_stats();
    let output = if with_graph {
        renderer.render_frame_with_graph(&mut world.gfx, &world.scene, &world.camera, width, 16)
    } else {
        renderer.render_frame(&mut world.gfx, &world.scene, &world.camera, width, 16)
    };
    let result = match output.unwrap() {
        FrameOutput::Presented(result) => result,
        other => panic!("frame was not presented: {other:?}"),
    };

    let previous = renderer.accumulation().slot_image(result.slot.other()).unwrap();
    let previous = barriers_on(world, previous).first().cloned().unwrap();
    let current = barriers_on(world, result.image).first().cloned().unwrap();
    (previous, current)
}

#[test]
fn test_barriers_start_from_last_use_when_paths_alternate() {
    let mut world = build_world(SoftGfx::new("soft"));
    let mut renderer = initialized_renderer(&mut world);

    // 新建的缓冲
    let (previous, current) = record_and_collect(&mut world, &mut renderer, false, 16);
    assert_eq!(previous.old_layout, vk::ImageLayout::UNDEFINED);
    assert_eq!(current.old_layout, vk::ImageLayout::UNDEFINED);
    assert_eq!(current.new_layout, vk::ImageLayout::GENERAL);

    // 直接录制之后：previous 刚被写入，current 刚被读取
    let (previous, current) = record_and_collect(&mut world, &mut renderer, false, 16);
    assert_eq!(previous.old_layout, vk::ImageLayout::GENERAL);
    assert_eq!(previous.src_stage, vk::PipelineStageFlags2::COMPUTE_SHADER);
    assert_eq!(previous.src_access, vk::AccessFlags2::SHADER_STORAGE_WRITE);
    assert_eq!(current.old_layout, vk::ImageLayout::GENERAL);
    assert_eq!(current.new_layout, vk::ImageLayout::GENERAL);

    // 直接录制之后走 graph
    let (previous, current) = record_and_collect(&mut world, &mut renderer, true, 16);
    assert_eq!(previous.old_layout, vk::ImageLayout::GENERAL);
    assert_eq!(previous.new_layout, vk::ImageLayout::GENERAL);
    assert_eq!(current.old_layout, vk::ImageLayout::GENERAL);

    // graph 导出之后再直接录制
    let (previous, current) = record_and_collect(&mut world, &mut renderer, false, 16);
    assert_eq!(previous.old_layout, vk::ImageLayout::TRANSFER_SRC_OPTIMAL);
    assert_eq!(previous.new_layout, vk::ImageLayout::GENERAL);
    assert_eq!(current.old_layout, vk::ImageLayout::GENERAL);

    // 两次 graph 之间，previous 同样从导出状态开始
    record_and_collect(&mut world, &mut renderer, true, 16);
    let (previous, _) = record_and_collect(&mut world, &mut renderer, true, 16);
    assert_eq!(previous.old_layout, vk::ImageLayout::TRANSFER_SRC_OPTIMAL);

    // 尺寸变化后缓冲重建，两个入口都从 UNDEFINED 开始
    let (previous, current) = record_and_collect(&mut world, &mut renderer, true, 24);
    assert_eq!(previous.old_layout, vk::ImageLayout::UNDEFINED);
    assert_eq!(current.old_layout, vk::ImageLayout::UNDEFINED);
    let (previous, _) = record_and_collect(&mut world, &mut renderer, false, 24);
    assert_eq!(previous.old_layout, vk::ImageLayout::TRANSFER_SRC_OPTIMAL);
    assert_eq!(renderer.frame_state().sample_index, 2);

    renderer.destroy(&mut world.gfx);
}
