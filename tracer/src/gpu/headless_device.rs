#[cfg(test)]
pub(crate) mod tests {
    use crate::gpu::context::Context;
    use std::rc::Rc;
    use std::sync::OnceLock;
    use wgpu::{Instance, Trace};

    const HEADLESS_DEVICE_LABEL: &str = "Tracer Headless Device";

    /* One instance for the whole test binary: massively parallel tests that
    each spin up their own backend instance can exhaust driver resources and
    fail spuriously, so every test shares this one. */
    static TEST_INSTANCE: OnceLock<Instance> = OnceLock::new();

    #[must_use]
    pub(crate) fn get_test_instance() -> &'static Instance {
        TEST_INSTANCE.get_or_init(|| {
            Instance::new(&wgpu::InstanceDescriptor {
                backends: wgpu::Backends::PRIMARY,
                ..Default::default()
            })
        })
    }

    #[must_use]
    pub(crate) fn create_headless_wgpu_context() -> Rc<Context> {
        Rc::new(pollster::block_on(create_headless_wgpu_device_async(get_test_instance())))
    }

    #[must_use]
    pub(crate) async fn create_headless_wgpu_device_async(instance: &Instance) -> Context {
        let adapter = instance
            .request_adapter(&wgpu::RequestAdapterOptions {
                power_preference: wgpu::PowerPreference::HighPerformance,
                compatible_surface: None,
                ..Default::default()
            })
            .await
            .expect("failed to find an adapter");

        let (device, queue) = adapter
            .request_device(&wgpu::DeviceDescriptor {
                label: Some(HEADLESS_DEVICE_LABEL),
                required_features: wgpu::Features::default(),
                required_limits: wgpu::Limits::default(),
                memory_hints: wgpu::MemoryHints::default(),
                trace: Trace::Off,
            })
            .await
            .expect("failed to create device");

        Context::new(device, queue)
    }
}
