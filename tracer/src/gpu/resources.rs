use crate::gpu::context::Context;
use std::rc::Rc;
use wgpu::util::DeviceExt;
use wgpu::BufferUsages;

pub(crate) struct Resources {
    context: Rc<Context>,
}

impl Resources {
    #[must_use]
    pub(crate) fn new(context: Rc<Context>) -> Self {
        Self { context }
    }

    #[must_use]
    pub(crate) fn create_shader_module(&self, label: &str, shader_source_code: &str) -> wgpu::ShaderModule {
        self.context.device().create_shader_module(wgpu::ShaderModuleDescriptor {
            label: Some(label),
            source: wgpu::ShaderSource::Wgsl(shader_source_code.into()),
        })
    }

    #[must_use]
    pub(crate) fn create_buffer(&self, label: &str, usage: BufferUsages, buffer_data: &[u8]) -> Rc<wgpu::Buffer> {
        let buffer = self.context.device().create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some(label),
            contents: buffer_data,
            usage,
        });

        Rc::new(buffer)
    }

    #[must_use]
    pub(crate) fn create_uniform_buffer(&self, label: &str, buffer_data: &[u8]) -> Rc<wgpu::Buffer> {
        self.create_buffer(label, BufferUsages::UNIFORM | BufferUsages::COPY_DST, buffer_data)
    }

    #[must_use]
    pub(crate) fn create_storage_buffer(&self, label: &str, buffer_data: &[u8]) -> Rc<wgpu::Buffer> {
        self.create_buffer(label, Self::STORAGE_USAGE, buffer_data)
    }

    /// Device storage without an initial payload; wgpu guarantees zero
    /// initialization of fresh buffer memory.
    #[must_use]
    pub(crate) fn create_zeroed_storage_buffer(&self, label: &str, size_bytes: u64) -> Rc<wgpu::Buffer> {
        let buffer = self.context.device().create_buffer(&wgpu::BufferDescriptor {
            label: Some(label),
            size: size_bytes,
            usage: Self::STORAGE_USAGE,
            mapped_at_creation: false,
        });

        Rc::new(buffer)
    }

    // COPY_SRC backs the accumulation readback path
    const STORAGE_USAGE: BufferUsages = BufferUsages::STORAGE
        .union(BufferUsages::COPY_DST)
        .union(BufferUsages::COPY_SRC);
}
