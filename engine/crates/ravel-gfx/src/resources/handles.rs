use slotmap::new_key_type;

// 所有 GPU 资源都由 device 持有，外部只拿到代际索引
new_key_type! {
    /// Image Handle
    ///
    /// 指向一个 GPU Image 资源。
    pub struct GfxImageHandle;

    /// 顶层加速结构 Handle
    pub struct GfxAccelHandle;

    /// 几何体 Handle，由宿主在加载模型时注册
    pub struct GfxGeometryHandle;
}
