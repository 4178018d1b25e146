use std::cell::RefCell;
use std::collections::HashMap;
use std::rc::Rc;

use crate::driver::{BufferTarget, BufferUsage, GpuDriver};
use crate::types::{DataScalar, MAX_ATTRIBUTE_SLOTS};

/// One vertex attribute's layout within a stream's buffer.
#[derive(Debug, Clone, Copy)]
pub struct AttributeDescriptor {
    pub slot: u32,
    pub components: u32,
    pub scalar: DataScalar,
    pub stride: u32,
    pub start_offset: usize,
    pub instance_divisor: u32,
}

/// A single named GPU buffer backing one or more vertex attributes.
#[derive(Debug)]
pub struct AttributeStream {
    driver: Rc<RefCell<dyn GpuDriver>>,
    buffer_id: u32,
    dynamic: bool,
    descriptors: Vec<AttributeDescriptor>,
}

impl AttributeStream {
    fn new(driver: Rc<RefCell<dyn GpuDriver>>, dynamic: bool) -> Self {
        let buffer_id = driver.borrow_mut().create_buffer();
        AttributeStream {
            driver,
            buffer_id,
            dynamic,
            descriptors: Vec::new(),
        }
    }

    /// Static streams replace the whole buffer; dynamic streams write a
    /// sub-range starting at `offset`.
    pub fn upload_data(&self, data: &[u8], offset: usize) {
        let mut driver = self.driver.borrow_mut();
        driver.bind_buffer(BufferTarget::Array, self.buffer_id);
        if self.dynamic {
            driver.buffer_sub_data(BufferTarget::Array, offset, data);
        } else {
            driver.buffer_data(BufferTarget::Array, data, BufferUsage::Static);
        }
    }

    /// Convenience over [`AttributeStream::upload_data`] for typed vertex
    /// buffers, cast to bytes via [`bytemuck::cast_slice`].
    pub fn upload_data_typed<T: bytemuck::Pod>(&self, data: &[T], offset: usize) {
        self.upload_data(bytemuck::cast_slice(data), offset);
    }

    /// Dynamic streams only: pre-allocates `size` bytes of storage.
    pub fn reserve_space(&self, size: usize) {
        if !self.dynamic {
            log::warn!("AttributeStream::reserve_space called on a static stream, ignoring");
            return;
        }
        let mut driver = self.driver.borrow_mut();
        driver.bind_buffer(BufferTarget::Array, self.buffer_id);
        driver.buffer_data(BufferTarget::Array, &vec![0u8; size], BufferUsage::Dynamic);
    }

    pub fn descriptors(&self) -> &[AttributeDescriptor] {
        &self.descriptors
    }
}

/// The buffer backing the (always 32-bit unsigned) index stream of a
/// [`VertexData`].
#[derive(Debug)]
pub struct IndexStream {
    driver: Rc<RefCell<dyn GpuDriver>>,
    buffer_id: u32,
    dynamic: bool,
}

impl IndexStream {
    fn new(driver: Rc<RefCell<dyn GpuDriver>>) -> Self {
        let buffer_id = driver.borrow_mut().create_buffer();
        IndexStream {
            driver,
            buffer_id,
            dynamic: false,
        }
    }

    pub fn upload_data(&self, data: &[u8], offset: usize) {
        let mut driver = self.driver.borrow_mut();
        driver.bind_buffer(BufferTarget::ElementArray, self.buffer_id);
        if self.dynamic {
            driver.buffer_sub_data(BufferTarget::ElementArray, offset, data);
        } else {
            driver.buffer_data(BufferTarget::ElementArray, data, BufferUsage::Static);
        }
    }

    /// Convenience over [`IndexStream::upload_data`] for typed index
    /// buffers (normally `u32`), cast to bytes via [`bytemuck::cast_slice`].
    pub fn upload_data_typed<T: bytemuck::Pod>(&self, data: &[T], offset: usize) {
        self.upload_data(bytemuck::cast_slice(data), offset);
    }

    pub fn reserve(&mut self, size: usize) {
        self.dynamic = true;
        let mut driver = self.driver.borrow_mut();
        driver.bind_buffer(BufferTarget::ElementArray, self.buffer_id);
        driver.buffer_data(BufferTarget::ElementArray, &vec![0u8; size], BufferUsage::Dynamic);
    }
}

impl Drop for IndexStream {
    fn drop(&mut self) {
        self.driver.borrow_mut().delete_buffer(self.buffer_id);
    }
}

impl Drop for AttributeStream {
    fn drop(&mut self) {
        self.driver.borrow_mut().delete_buffer(self.buffer_id);
    }
}

/// A drawable unit: a set of named attribute streams, each with one or more
/// attribute descriptors, plus an optional index stream.
///
/// Total attribute-slot count across all streams is capped at
/// [`MAX_ATTRIBUTE_SLOTS`]; descriptors added past the cap are silently
/// dropped.
#[derive(Debug)]
pub struct VertexData {
    driver: Rc<RefCell<dyn GpuDriver>>,
    vao_id: u32,
    streams: HashMap<String, AttributeStream>,
    stream_order: Vec<String>,
    indices: Option<IndexStream>,
    next_slot: u32,
}

impl VertexData {
    pub fn new(driver: Rc<RefCell<dyn GpuDriver>>) -> Self {
        let vao_id = driver.borrow_mut().create_vertex_array();
        VertexData {
            driver,
            vao_id,
            streams: HashMap::new(),
            stream_order: Vec::new(),
            indices: None,
            next_slot: 0,
        }
    }

    /// Creates a new named attribute stream. Fails (returns `false`) on an
    /// empty or duplicate name.
    pub fn add_stream(&mut self, name: &str, dynamic: bool) -> bool {
        if name.is_empty() || self.streams.contains_key(name) {
            log::warn!("VertexData::add_stream: rejecting empty or duplicate name {:?}", name);
            return false;
        }
        let stream = AttributeStream::new(self.driver.clone(), dynamic);
        self.streams.insert(name.to_string(), stream);
        self.stream_order.push(name.to_string());
        true
    }

    pub fn stream(&self, name: &str) -> Option<&AttributeStream> {
        self.streams.get(name)
    }

    pub fn stream_mut(&mut self, name: &str) -> Option<&mut AttributeStream> {
        self.streams.get_mut(name)
    }

    /// Appends one attribute descriptor to `stream_name`'s stream, assigning
    /// it the next global slot id across this `VertexData`. Applied
    /// immediately against the stream's buffer and enabled on the VAO.
    /// Silently dropped once [`MAX_ATTRIBUTE_SLOTS`] slots are in use.
    pub fn add_descriptor(
        &mut self,
        stream_name: &str,
        components: u32,
        scalar: DataScalar,
        stride: u32,
        start_offset: usize,
        instance_divisor: u32,
    ) -> bool {
        if self.next_slot as usize >= MAX_ATTRIBUTE_SLOTS {
            log::warn!("VertexData::add_descriptor: slot cap ({}) reached, dropping descriptor", MAX_ATTRIBUTE_SLOTS);
            return false;
        }
        let slot = self.next_slot;
        let buffer_id = match self.streams.get(stream_name) {
            Some(s) => s.buffer_id,
            None => {
                log::warn!("VertexData::add_descriptor: unknown stream {:?}", stream_name);
                return false;
            }
        };
        let descriptor = AttributeDescriptor {
            slot,
            components,
            scalar,
            stride,
            start_offset,
            instance_divisor,
        };

        {
            let mut driver = self.driver.borrow_mut();
            driver.bind_vertex_array(self.vao_id);
            driver.bind_buffer(BufferTarget::Array, buffer_id);
            driver.enable_vertex_attrib_array(slot);
            driver.vertex_attrib_pointer(slot, components, scalar, stride, start_offset);
            if instance_divisor != 0 {
                driver.vertex_attrib_divisor(slot, instance_divisor);
            }
        }

        self.streams.get_mut(stream_name).unwrap().descriptors.push(descriptor);
        self.next_slot += 1;
        true
    }

    /// Total attribute slots currently in use.
    pub fn slot_count(&self) -> u32 {
        self.next_slot
    }

    pub fn upload_indices(&self, data: &[u8], offset: usize) {
        match &self.indices {
            Some(indices) => indices.upload_data(data, offset),
            None => log::warn!("VertexData::upload_indices called with no index stream present"),
        }
    }

    pub fn upload_indices_typed<T: bytemuck::Pod>(&self, data: &[T], offset: usize) {
        match &self.indices {
            Some(indices) => indices.upload_data_typed(data, offset),
            None => log::warn!("VertexData::upload_indices_typed called with no index stream present"),
        }
    }

    pub fn reserve_indices(&mut self, size: usize) {
        if self.indices.is_none() {
            self.indices = Some(IndexStream::new(self.driver.clone()));
        }
        self.indices.as_mut().unwrap().reserve(size);
    }

    pub fn has_indices(&self) -> bool {
        self.indices.is_some()
    }

    /// Selects this `VertexData` for subsequent draws. Invoked internally
    /// by [`crate::Context::set_vertex_data`].
    pub(crate) fn bind(&self) {
        let mut driver = self.driver.borrow_mut();
        driver.bind_vertex_array(self.vao_id);
        if let Some(indices) = &self.indices {
            driver.bind_buffer(BufferTarget::ElementArray, indices.buffer_id);
        }
    }

    pub(crate) fn gl_id(&self) -> u32 {
        self.vao_id
    }
}

impl Drop for VertexData {
    fn drop(&mut self) {
        self.driver.borrow_mut().delete_vertex_array(self.vao_id);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::MockDriver;

    #[test]
    fn slot_cap_enforced() {
        let (_, driver) = MockDriver::new_pair();
        let mut vd = VertexData::new(driver);
        vd.add_stream("pos", false);
        for _ in 0..20 {
            vd.add_descriptor("pos", 3, DataScalar::Float, 12, 0, 0);
        }
        assert_eq!(vd.slot_count(), MAX_ATTRIBUTE_SLOTS as u32);
    }

    #[test]
    fn duplicate_stream_name_rejected() {
        let (_, driver) = MockDriver::new_pair();
        let mut vd = VertexData::new(driver);
        assert!(vd.add_stream("pos", false));
        assert!(!vd.add_stream("pos", false));
    }

    #[test]
    fn empty_stream_name_rejected() {
        let (_, driver) = MockDriver::new_pair();
        let mut vd = VertexData::new(driver);
        assert!(!vd.add_stream("", false));
    }
}
