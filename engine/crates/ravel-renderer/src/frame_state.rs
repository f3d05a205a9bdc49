/// 一个 renderer 实例跨帧保存的计数器和标记
///
/// 每个字段只由负责对应不变式的组件修改：
/// - `sample_index`：AccumulationEngine 递增，resize 与相机移动时清零
/// - `last_camera_transform`：每帧的 prepare 阶段更新
/// - `accel_ready`：AccelerationStructureManager rebuild 之后同步
/// - `buffers_ready`：AccumulationEngine resize 之后同步
#[derive(Debug, Clone, Default)]
pub struct FrameState {
    /// 当前累积缓冲中已经包含的样本数
    pub sample_index: u32,
    pub last_camera_transform: Option<glam::Mat4>,
    pub accel_ready: bool,
    pub buffers_ready: bool,

    /// 当前的帧序号，一直累加，只用于日志
    frame_id: u64,
}
// new & init
impl FrameState {
    pub fn new() -> Self {
        Self::default()
    }
}
// update
impl FrameState {
    #[inline]
    pub fn next_frame(&mut self) {
        self.frame_id = self.frame_id.wrapping_add(1);
    }

    /// 下一次累积直接使用新样本覆盖
    #[inline]
    pub fn reset_samples(&mut self) {
        self.sample_index = 0;
    }
}
// getters
impl FrameState {
    #[inline]
    pub fn frame_id(&self) -> u64 {
        self.frame_id
    }

    /// 加速结构和累积缓冲都可用时才能录制一帧
    #[inline]
    pub fn resources_ready(&self) -> bool {
        self.accel_ready && self.buffers_ready
    }

    #[inline]
    pub fn frame_name(&self) -> String {
        format!("[F{}]", self.frame_id)
    }
}
