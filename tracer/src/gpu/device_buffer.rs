use crate::gpu::resources::Resources;
use bytemuck::Pod;
use std::marker::PhantomData;
use std::rc::Rc;

/// Typed, resizable, device-resident array. The logical element count always
/// matches the storage behind the handle; resizing reallocates and discards
/// previous contents, so owners that need persistence re-populate themselves.
pub(crate) struct DeviceBuffer<T: Pod> {
    backend: Rc<wgpu::Buffer>,
    count: usize,
    label: &'static str,
    _element: PhantomData<T>,
}

impl<T: Pod> DeviceBuffer<T> {
    #[must_use]
    pub(crate) fn new(resources: &Resources, label: &'static str, count: usize) -> Self {
        assert!(count > 0);
        let backend = resources.create_zeroed_storage_buffer(label, Self::size_bytes_for(count));
        Self { backend, count, label, _element: PhantomData }
    }

    /// Allocates storage and uploads `contents` once; the payload is never
    /// re-sent afterwards. An empty slice gets a single zeroed marker element,
    /// so the handle stays bindable.
    #[must_use]
    pub(crate) fn with_contents(resources: &Resources, label: &'static str, contents: &[T]) -> Self {
        if contents.is_empty() {
            return Self::new(resources, label, 1);
        }
        let backend = resources.create_storage_buffer(label, bytemuck::cast_slice(contents));
        Self { backend, count: contents.len(), label, _element: PhantomData }
    }

    pub(crate) fn resize(&mut self, resources: &Resources, new_count: usize) {
        assert!(new_count > 0);
        self.backend = resources.create_zeroed_storage_buffer(self.label, Self::size_bytes_for(new_count));
        self.count = new_count;
    }

    #[must_use]
    pub(crate) fn count(&self) -> usize {
        self.count
    }

    #[must_use]
    pub(crate) fn size_bytes(&self) -> u64 {
        Self::size_bytes_for(self.count)
    }

    #[must_use]
    pub(crate) fn backend(&self) -> &Rc<wgpu::Buffer> {
        &self.backend
    }

    #[must_use]
    fn size_bytes_for(count: usize) -> u64 {
        (count * size_of::<T>()) as u64
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gpu::context::Context;
    use crate::gpu::headless_device::tests::create_headless_wgpu_context;
    use rstest::rstest;

    #[must_use]
    fn make_resources() -> (Resources, Rc<Context>) {
        let context = create_headless_wgpu_context();
        (Resources::new(context.clone()), context)
    }

    const TEST_ELEMENT_COUNT: usize = 7;

    #[test]
    fn test_new_zeroed() {
        let (resources, _context) = make_resources();

        let system_under_test = DeviceBuffer::<[f32; 4]>::new(&resources, "test-buffer", TEST_ELEMENT_COUNT);

        assert_eq!(system_under_test.count(), TEST_ELEMENT_COUNT);
        assert_eq!(system_under_test.size_bytes(), (TEST_ELEMENT_COUNT * size_of::<[f32; 4]>()) as u64);
        assert_eq!(system_under_test.backend().size(), system_under_test.size_bytes());
    }

    #[test]
    fn test_with_contents() {
        let (resources, _context) = make_resources();
        let payload: Vec<[f32; 4]> = vec![[1.0, 2.0, 3.0, 4.0]; TEST_ELEMENT_COUNT];

        let system_under_test = DeviceBuffer::with_contents(&resources, "test-buffer", payload.as_slice());

        assert_eq!(system_under_test.count(), TEST_ELEMENT_COUNT);
        assert_eq!(system_under_test.backend().size(), (TEST_ELEMENT_COUNT * size_of::<[f32; 4]>()) as u64);
    }

    #[test]
    fn test_with_empty_contents_keeps_handle_bindable() {
        let (resources, _context) = make_resources();
        let payload: Vec<[f32; 4]> = Vec::new();

        let system_under_test = DeviceBuffer::with_contents(&resources, "test-buffer", payload.as_slice());

        assert_eq!(system_under_test.count(), 1);
    }

    #[rstest]
    #[case(1)]
    #[case(TEST_ELEMENT_COUNT * 2)]
    fn test_resize_reallocates(#[case] new_count: usize) {
        let (resources, _context) = make_resources();
        let mut system_under_test = DeviceBuffer::<[f32; 4]>::new(&resources, "test-buffer", TEST_ELEMENT_COUNT);
        let old_backend = system_under_test.backend().clone();

        system_under_test.resize(&resources, new_count);

        assert_eq!(system_under_test.count(), new_count);
        assert_eq!(system_under_test.backend().size(), (new_count * size_of::<[f32; 4]>()) as u64);
        assert!(!Rc::ptr_eq(system_under_test.backend(), &old_backend));
    }

    #[test]
    #[should_panic(expected = "assertion failed")]
    fn test_zero_count_rejected() {
        let (resources, _context) = make_resources();
        let _system_under_test = DeviceBuffer::<[f32; 4]>::new(&resources, "test-buffer", 0);
    }
}
