//! Test-only [`GpuDriver`] implementation.
//!
//! Generalized from the teacher's `MOCK_MODE` / `MockShaderProgram` pattern:
//! instead of a single mock struct with `println!` side effects, every call
//! is appended to an ordered command log that tests assert against.

use std::cell::RefCell;
use std::rc::Rc;

use crate::driver::{BufferTarget, BufferUsage, GpuDriver};
use crate::error::GlslStageError;
use crate::types::{
    AttachmentType, BindingType, CullMode, DataScalar, Filter, MipmapFilter, RenderMode, Stage,
    TextureFace, TextureFormat, TextureVariant, WrapMode,
};

/// One recorded driver call.
#[derive(Debug, Clone, PartialEq)]
pub enum DriverCommand {
    SetCullEnabled(bool),
    SetCullFace(CullMode),
    SetBlendEnabled(bool),
    SetBlendFuncDefault,
    SetDepthTestEnabled(bool),
    SetDepthMask(bool),
    SetViewport(i32, i32, u32, u32),
    SetClearColor(f32, f32, f32, f32),
    Clear(bool, bool, bool),
    CreateBuffer(u32),
    DeleteBuffer(u32),
    BindBuffer(BufferTargetTag, u32),
    BufferData(BufferTargetTag, usize, BufferUsageTag),
    BufferSubData(BufferTargetTag, usize, usize),
    CreateVertexArray(u32),
    DeleteVertexArray(u32),
    BindVertexArray(u32),
    EnableVertexAttribArray(u32),
    VertexAttribPointer(u32, u32, DataScalar, u32, usize),
    VertexAttribDivisor(u32, u32),
    CreateTexture(u32),
    DeleteTexture(u32),
    BindTexture(u32, TextureVariant, u32),
    UnbindTexture(u32, TextureVariant),
    TexImage(TextureVariant, TextureFace, u32, TextureFormat, u32, u32, bool),
    TexSubImage(TextureVariant, TextureFace, u32, u32, u32, u32, u32),
    TexWrap(TextureVariant, WrapMode, WrapMode),
    TexFilter(TextureVariant, Filter, Filter, MipmapFilter),
    TexBorderColor(TextureVariant),
    GenerateMipmap(u32, TextureVariant),
    CreateFramebuffer(u32),
    DeleteFramebuffer(u32),
    BindFramebuffer(BindingType, u32),
    FramebufferTexture(AttachmentType, u32, u32, TextureVariant, TextureFace, u32),
    DrawBuffers(Vec<u32>),
    BlitFramebuffer(u32, u32, AttachmentType),
    CompileShader(Stage),
    CreateProgram(u32),
    AttachShader(u32, u32),
    DetachShader(u32, u32),
    BindAttribLocation(u32, u32, String),
    LinkProgram(u32),
    DeleteShader(u32),
    DeleteProgram(u32),
    UseProgram(u32),
    GetUniformLocation(u32, String),
    Uniform1i(i32, i32),
    Uniform1f(i32, f32),
    Uniform2f(i32, [f32; 2]),
    Uniform3f(i32, [f32; 3]),
    Uniform4f(i32, [f32; 4]),
    UniformMatrix4(i32),
    DrawArrays(RenderMode, u32, u32),
    DrawElements(RenderMode, u32, usize),
    DrawElementsBaseVertex(RenderMode, u32, usize, i32),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BufferTargetTag {
    Array,
    ElementArray,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BufferUsageTag {
    Static,
    Dynamic,
}

impl From<BufferTarget> for BufferTargetTag {
    fn from(t: BufferTarget) -> Self {
        match t {
            BufferTarget::Array => BufferTargetTag::Array,
            BufferTarget::ElementArray => BufferTargetTag::ElementArray,
        }
    }
}

impl From<BufferUsage> for BufferUsageTag {
    fn from(u: BufferUsage) -> Self {
        match u {
            BufferUsage::Static => BufferUsageTag::Static,
            BufferUsage::Dynamic => BufferUsageTag::Dynamic,
        }
    }
}

/// A [`GpuDriver`] that performs no real GPU work: it hands out
/// incrementing fake handles and records every call it receives.
#[derive(Debug, Default)]
pub struct MockDriver {
    log: Vec<DriverCommand>,
    next_handle: u32,
    fail_next_compile: bool,
    fail_next_link: bool,
}

impl MockDriver {
    pub fn new() -> Self {
        MockDriver {
            log: Vec::new(),
            next_handle: 1,
            fail_next_compile: false,
            fail_next_link: false,
        }
    }

    /// Wrap in the shared handle every [`crate::Context`] and resource
    /// constructor expects.
    pub fn shared() -> Rc<RefCell<dyn GpuDriver>> {
        Rc::new(RefCell::new(MockDriver::new()))
    }

    /// Like [`MockDriver::shared`], but also returns a concretely-typed
    /// handle to the same driver so tests can inspect [`MockDriver::log`]
    /// after handing the trait-object handle to a [`crate::Context`] or
    /// resource constructor.
    pub fn new_pair() -> (Rc<RefCell<MockDriver>>, Rc<RefCell<dyn GpuDriver>>) {
        let concrete = Rc::new(RefCell::new(MockDriver::new()));
        let trait_obj: Rc<RefCell<dyn GpuDriver>> = concrete.clone();
        (concrete, trait_obj)
    }

    pub fn log(&self) -> &[DriverCommand] {
        &self.log
    }

    pub fn clear_log(&mut self) {
        self.log.clear();
    }

    /// Makes the next [`GpuDriver::compile_shader`] call return an error.
    pub fn fail_next_compile(&mut self) {
        self.fail_next_compile = true;
    }

    /// Makes the next [`GpuDriver::link_program`] call return an error.
    pub fn fail_next_link(&mut self) {
        self.fail_next_link = true;
    }

    fn alloc(&mut self) -> u32 {
        let id = self.next_handle;
        self.next_handle += 1;
        id
    }
}

impl GpuDriver for MockDriver {
    fn set_cull_enabled(&mut self, enabled: bool) {
        self.log.push(DriverCommand::SetCullEnabled(enabled));
    }

    fn set_cull_face(&mut self, mode: CullMode) {
        self.log.push(DriverCommand::SetCullFace(mode));
    }

    fn set_blend_enabled(&mut self, enabled: bool) {
        self.log.push(DriverCommand::SetBlendEnabled(enabled));
    }

    fn set_blend_func_default(&mut self) {
        self.log.push(DriverCommand::SetBlendFuncDefault);
    }

    fn set_depth_test_enabled(&mut self, enabled: bool) {
        self.log.push(DriverCommand::SetDepthTestEnabled(enabled));
    }

    fn set_depth_mask(&mut self, write: bool) {
        self.log.push(DriverCommand::SetDepthMask(write));
    }

    fn set_viewport(&mut self, x: i32, y: i32, width: u32, height: u32) {
        self.log.push(DriverCommand::SetViewport(x, y, width, height));
    }

    fn set_clear_color(&mut self, r: f32, g: f32, b: f32, a: f32) {
        self.log.push(DriverCommand::SetClearColor(r, g, b, a));
    }

    fn clear(&mut self, color: bool, depth: bool, stencil: bool) {
        self.log.push(DriverCommand::Clear(color, depth, stencil));
    }

    fn create_buffer(&mut self) -> u32 {
        let id = self.alloc();
        self.log.push(DriverCommand::CreateBuffer(id));
        id
    }

    fn delete_buffer(&mut self, id: u32) {
        self.log.push(DriverCommand::DeleteBuffer(id));
    }

    fn bind_buffer(&mut self, target: BufferTarget, id: u32) {
        self.log.push(DriverCommand::BindBuffer(target.into(), id));
    }

    fn buffer_data(&mut self, target: BufferTarget, data: &[u8], usage: BufferUsage) {
        self.log
            .push(DriverCommand::BufferData(target.into(), data.len(), usage.into()));
    }

    fn buffer_sub_data(&mut self, target: BufferTarget, offset: usize, data: &[u8]) {
        self.log
            .push(DriverCommand::BufferSubData(target.into(), offset, data.len()));
    }

    fn create_vertex_array(&mut self) -> u32 {
        let id = self.alloc();
        self.log.push(DriverCommand::CreateVertexArray(id));
        id
    }

    fn delete_vertex_array(&mut self, id: u32) {
        self.log.push(DriverCommand::DeleteVertexArray(id));
    }

    fn bind_vertex_array(&mut self, id: u32) {
        self.log.push(DriverCommand::BindVertexArray(id));
    }

    fn enable_vertex_attrib_array(&mut self, index: u32) {
        self.log.push(DriverCommand::EnableVertexAttribArray(index));
    }

    fn vertex_attrib_pointer(&mut self, index: u32, components: u32, scalar: DataScalar, stride: u32, offset: usize) {
        self.log
            .push(DriverCommand::VertexAttribPointer(index, components, scalar, stride, offset));
    }

    fn vertex_attrib_divisor(&mut self, index: u32, divisor: u32) {
        self.log.push(DriverCommand::VertexAttribDivisor(index, divisor));
    }

    fn create_texture(&mut self) -> u32 {
        let id = self.alloc();
        self.log.push(DriverCommand::CreateTexture(id));
        id
    }

    fn delete_texture(&mut self, id: u32) {
        self.log.push(DriverCommand::DeleteTexture(id));
    }

    fn bind_texture(&mut self, unit: u32, variant: TextureVariant, id: u32) {
        self.log.push(DriverCommand::BindTexture(unit, variant, id));
    }

    fn unbind_texture(&mut self, unit: u32, variant: TextureVariant) {
        self.log.push(DriverCommand::UnbindTexture(unit, variant));
    }

    fn tex_image(
        &mut self,
        _id: u32,
        variant: TextureVariant,
        face: TextureFace,
        level: u32,
        format: TextureFormat,
        width: u32,
        height: u32,
        data: Option<&[u8]>,
    ) {
        self.log.push(DriverCommand::TexImage(
            variant,
            face,
            level,
            format,
            width,
            height,
            data.is_some(),
        ));
    }

    #[allow(clippy::too_many_arguments)]
    fn tex_sub_image(
        &mut self,
        _id: u32,
        variant: TextureVariant,
        face: TextureFace,
        level: u32,
        x: u32,
        y: u32,
        width: u32,
        height: u32,
        _format: TextureFormat,
        _data: &[u8],
    ) {
        self.log
            .push(DriverCommand::TexSubImage(variant, face, level, x, y, width, height));
    }

    fn tex_wrap(&mut self, _id: u32, variant: TextureVariant, s: WrapMode, t: WrapMode) {
        self.log.push(DriverCommand::TexWrap(variant, s, t));
    }

    fn tex_filter(&mut self, _id: u32, variant: TextureVariant, min: Filter, mag: Filter, mipmap: MipmapFilter) {
        self.log.push(DriverCommand::TexFilter(variant, min, mag, mipmap));
    }

    fn tex_border_color(&mut self, _id: u32, variant: TextureVariant, _rgba: [f32; 4]) {
        self.log.push(DriverCommand::TexBorderColor(variant));
    }

    fn generate_mipmap(&mut self, id: u32, variant: TextureVariant) {
        self.log.push(DriverCommand::GenerateMipmap(id, variant));
    }

    fn create_framebuffer(&mut self) -> u32 {
        let id = self.alloc();
        self.log.push(DriverCommand::CreateFramebuffer(id));
        id
    }

    fn delete_framebuffer(&mut self, id: u32) {
        self.log.push(DriverCommand::DeleteFramebuffer(id));
    }

    fn bind_framebuffer(&mut self, binding: BindingType, id: u32) {
        self.log.push(DriverCommand::BindFramebuffer(binding, id));
    }

    fn framebuffer_texture(
        &mut self,
        attachment: AttachmentType,
        color_index: u32,
        texture_id: u32,
        variant: TextureVariant,
        face: TextureFace,
        level: u32,
    ) {
        self.log.push(DriverCommand::FramebufferTexture(
            attachment,
            color_index,
            texture_id,
            variant,
            face,
            level,
        ));
    }

    fn draw_buffers(&mut self, color_indices: &[u32]) {
        self.log.push(DriverCommand::DrawBuffers(color_indices.to_vec()));
    }

    fn blit_framebuffer(
        &mut self,
        src_id: u32,
        dst_id: u32,
        _src_w: u32,
        _src_h: u32,
        _dst_w: u32,
        _dst_h: u32,
        attachment: AttachmentType,
    ) {
        self.log.push(DriverCommand::BlitFramebuffer(src_id, dst_id, attachment));
    }

    fn compile_shader(&mut self, stage: Stage, _source: &str) -> Result<u32, GlslStageError> {
        self.log.push(DriverCommand::CompileShader(stage));
        if self.fail_next_compile {
            self.fail_next_compile = false;
            return Err(GlslStageError::Compile {
                stage,
                log: "mock compile failure".to_string(),
            });
        }
        Ok(self.alloc())
    }

    fn create_program(&mut self) -> u32 {
        let id = self.alloc();
        self.log.push(DriverCommand::CreateProgram(id));
        id
    }

    fn attach_shader(&mut self, program: u32, shader: u32) {
        self.log.push(DriverCommand::AttachShader(program, shader));
    }

    fn detach_shader(&mut self, program: u32, shader: u32) {
        self.log.push(DriverCommand::DetachShader(program, shader));
    }

    fn bind_attrib_location(&mut self, program: u32, index: u32, name: &str) {
        self.log
            .push(DriverCommand::BindAttribLocation(program, index, name.to_string()));
    }

    fn link_program(&mut self, program: u32) -> Result<(), GlslStageError> {
        self.log.push(DriverCommand::LinkProgram(program));
        if self.fail_next_link {
            self.fail_next_link = false;
            return Err(GlslStageError::Link {
                log: "mock link failure".to_string(),
            });
        }
        Ok(())
    }

    fn delete_shader(&mut self, id: u32) {
        self.log.push(DriverCommand::DeleteShader(id));
    }

    fn delete_program(&mut self, id: u32) {
        self.log.push(DriverCommand::DeleteProgram(id));
    }

    fn use_program(&mut self, id: u32) {
        self.log.push(DriverCommand::UseProgram(id));
    }

    fn get_uniform_location(&mut self, program: u32, name: &str) -> i32 {
        self.log
            .push(DriverCommand::GetUniformLocation(program, name.to_string()));
        if name.is_empty() {
            -1
        } else {
            // Deterministic pseudo-location so tests can assert caching behavior.
            (program as i32) * 1000 + name.len() as i32
        }
    }

    fn uniform1i(&mut self, location: i32, value: i32) {
        self.log.push(DriverCommand::Uniform1i(location, value));
    }

    fn uniform1f(&mut self, location: i32, value: f32) {
        self.log.push(DriverCommand::Uniform1f(location, value));
    }

    fn uniform2f(&mut self, location: i32, value: [f32; 2]) {
        self.log.push(DriverCommand::Uniform2f(location, value));
    }

    fn uniform3f(&mut self, location: i32, value: [f32; 3]) {
        self.log.push(DriverCommand::Uniform3f(location, value));
    }

    fn uniform4f(&mut self, location: i32, value: [f32; 4]) {
        self.log.push(DriverCommand::Uniform4f(location, value));
    }

    fn uniform_matrix4(&mut self, location: i32, _value: [f32; 16]) {
        self.log.push(DriverCommand::UniformMatrix4(location));
    }

    fn draw_arrays(&mut self, mode: RenderMode, first: u32, count: u32) {
        self.log.push(DriverCommand::DrawArrays(mode, first, count));
    }

    fn draw_elements(&mut self, mode: RenderMode, count: u32, byte_offset: usize) {
        self.log.push(DriverCommand::DrawElements(mode, count, byte_offset));
    }

    fn draw_elements_base_vertex(&mut self, mode: RenderMode, count: u32, byte_offset: usize, base_vertex: i32) {
        self.log
            .push(DriverCommand::DrawElementsBaseVertex(mode, count, byte_offset, base_vertex));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn records_calls_in_order() {
        let mut driver = MockDriver::new();
        driver.set_cull_enabled(true);
        driver.set_cull_face(CullMode::Back);
        assert_eq!(
            driver.log(),
            &[
                DriverCommand::SetCullEnabled(true),
                DriverCommand::SetCullFace(CullMode::Back),
            ]
        );
    }

    #[test]
    fn handles_increment() {
        let mut driver = MockDriver::new();
        let a = driver.create_buffer();
        let b = driver.create_buffer();
        assert_ne!(a, b);
    }
}
