use std::collections::HashMap;
use std::rc::Rc;
use wgpu::{BindGroup, BindingResource, Buffer, TextureView};

/// Accumulates slot-indexed resources for one bind group. Every stage owns a
/// fixed slot table; a slot bound twice is a programming error, hence the
/// asserts rather than silent replacement.
pub(crate) struct BindGroupBuilder<'a> {
    label: Option<&'a str>,
    layout: wgpu::BindGroupLayout,

    accumulated_buffer_entries: HashMap<u32, Rc<Buffer>>,
    accumulated_texture_entries: HashMap<u32, TextureView>,
}

impl<'a> BindGroupBuilder<'a> {
    #[must_use]
    pub(crate) fn new(label: Option<&'a str>, layout: wgpu::BindGroupLayout) -> Self {
        Self {
            label,
            layout,
            accumulated_buffer_entries: HashMap::new(),
            accumulated_texture_entries: HashMap::new(),
        }
    }

    pub(crate) fn set_buffer_entry(&mut self, slot: u32, buffer: Rc<Buffer>) -> &mut Self {
        assert_eq!(self.accumulated_texture_entries.contains_key(&slot), false, "slot already occupied by a texture");

        let previous = self.accumulated_buffer_entries.insert(slot, buffer);
        assert!(previous.is_none(), "slot {slot} already set");
        self
    }

    pub(crate) fn set_texture_entry(&mut self, slot: u32, texture_view: TextureView) -> &mut Self {
        assert_eq!(self.accumulated_buffer_entries.contains_key(&slot), false, "slot already occupied by a buffer");

        let previous = self.accumulated_texture_entries.insert(slot, texture_view);
        assert!(previous.is_none(), "slot {slot} already set");
        self
    }

    #[must_use]
    pub(crate) fn make_bind_group(&self, device: &wgpu::Device) -> BindGroup {
        let mut entries = Vec::new();
        self.accumulated_buffer_entries.iter().for_each(|(slot_number, buffer)| {
            entries.push(wgpu::BindGroupEntry {
                binding: *slot_number,
                resource: buffer.as_entire_binding(),
            });
        });
        self.accumulated_texture_entries.iter().for_each(|(slot_number, texture_view)| {
            entries.push(wgpu::BindGroupEntry {
                binding: *slot_number,
                resource: BindingResource::TextureView(texture_view),
            });
        });

        device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: self.label,
            layout: &self.layout,
            entries: entries.as_slice(),
        })
    }
}
