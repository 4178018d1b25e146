//! The seam every GPU call is routed through.
//!
//! In production [`GlDriver`] makes the real `gl` crate calls. Under the
//! `testing` feature, [`crate::testing::MockDriver`] records calls instead
//! of executing them, which is what makes the property tests in this
//! crate's test suite checkable without a live OpenGL context.

use crate::error::GlslStageError;
use crate::types::{AttachmentType, BindingType, DataScalar, Stage, TextureFace, TextureFormat, TextureVariant};

/// Target a buffer binds to.
#[repr(u8)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BufferTarget {
    Array,
    ElementArray,
}

/// Usage hint for buffer storage.
#[repr(u8)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BufferUsage {
    Static,
    Dynamic,
}

/// Narrow abstraction over the underlying rasterization driver.
///
/// Every method corresponds to one or a small handful of real GPU calls.
/// Implementations must not attempt to cache or elide anything themselves —
/// that is [`crate::Context`]'s job; the driver always does exactly what it
/// is told.
pub trait GpuDriver: std::fmt::Debug {
    // -- capability toggles -------------------------------------------------
    fn set_cull_enabled(&mut self, enabled: bool);
    fn set_cull_face(&mut self, mode: crate::types::CullMode);
    fn set_blend_enabled(&mut self, enabled: bool);
    fn set_blend_func_default(&mut self);
    fn set_depth_test_enabled(&mut self, enabled: bool);
    fn set_depth_mask(&mut self, write: bool);
    fn set_viewport(&mut self, x: i32, y: i32, width: u32, height: u32);
    fn set_clear_color(&mut self, r: f32, g: f32, b: f32, a: f32);
    fn clear(&mut self, color: bool, depth: bool, stencil: bool);

    // -- buffers --------------------------------------------------------
    fn create_buffer(&mut self) -> u32;
    fn delete_buffer(&mut self, id: u32);
    fn bind_buffer(&mut self, target: BufferTarget, id: u32);
    fn buffer_data(&mut self, target: BufferTarget, data: &[u8], usage: BufferUsage);
    fn buffer_sub_data(&mut self, target: BufferTarget, offset: usize, data: &[u8]);

    // -- vertex arrays ----------------------------------------------------
    fn create_vertex_array(&mut self) -> u32;
    fn delete_vertex_array(&mut self, id: u32);
    fn bind_vertex_array(&mut self, id: u32);
    fn enable_vertex_attrib_array(&mut self, index: u32);
    #[allow(clippy::too_many_arguments)]
    fn vertex_attrib_pointer(
        &mut self,
        index: u32,
        components: u32,
        scalar: DataScalar,
        stride: u32,
        offset: usize,
    );
    fn vertex_attrib_divisor(&mut self, index: u32, divisor: u32);

    // -- textures ---------------------------------------------------------
    fn create_texture(&mut self) -> u32;
    fn delete_texture(&mut self, id: u32);
    fn bind_texture(&mut self, unit: u32, variant: TextureVariant, id: u32);
    fn unbind_texture(&mut self, unit: u32, variant: TextureVariant);
    #[allow(clippy::too_many_arguments)]
    fn tex_image(
        &mut self,
        id: u32,
        variant: TextureVariant,
        face: TextureFace,
        level: u32,
        format: TextureFormat,
        width: u32,
        height: u32,
        data: Option<&[u8]>,
    );
    #[allow(clippy::too_many_arguments)]
    fn tex_sub_image(
        &mut self,
        id: u32,
        variant: TextureVariant,
        face: TextureFace,
        level: u32,
        x: u32,
        y: u32,
        width: u32,
        height: u32,
        format: TextureFormat,
        data: &[u8],
    );
    fn tex_wrap(&mut self, id: u32, variant: TextureVariant, s: crate::types::WrapMode, t: crate::types::WrapMode);
    fn tex_filter(
        &mut self,
        id: u32,
        variant: TextureVariant,
        min: crate::types::Filter,
        mag: crate::types::Filter,
        mipmap: crate::types::MipmapFilter,
    );
    fn tex_border_color(&mut self, id: u32, variant: TextureVariant, rgba: [f32; 4]);
    fn generate_mipmap(&mut self, id: u32, variant: TextureVariant);

    // -- framebuffers -------------------------------------------------------
    fn create_framebuffer(&mut self) -> u32;
    fn delete_framebuffer(&mut self, id: u32);
    fn bind_framebuffer(&mut self, binding: BindingType, id: u32);
    #[allow(clippy::too_many_arguments)]
    fn framebuffer_texture(
        &mut self,
        attachment: AttachmentType,
        color_index: u32,
        texture_id: u32,
        variant: TextureVariant,
        face: TextureFace,
        level: u32,
    );
    fn draw_buffers(&mut self, color_indices: &[u32]);
    #[allow(clippy::too_many_arguments)]
    fn blit_framebuffer(
        &mut self,
        src_id: u32,
        dst_id: u32,
        src_w: u32,
        src_h: u32,
        dst_w: u32,
        dst_h: u32,
        attachment: AttachmentType,
    );

    // -- shaders ------------------------------------------------------------
    fn compile_shader(&mut self, stage: Stage, source: &str) -> Result<u32, GlslStageError>;
    fn create_program(&mut self) -> u32;
    fn attach_shader(&mut self, program: u32, shader: u32);
    fn detach_shader(&mut self, program: u32, shader: u32);
    fn bind_attrib_location(&mut self, program: u32, index: u32, name: &str);
    fn link_program(&mut self, program: u32) -> Result<(), GlslStageError>;
    fn delete_shader(&mut self, id: u32);
    fn delete_program(&mut self, id: u32);
    fn use_program(&mut self, id: u32);
    fn get_uniform_location(&mut self, program: u32, name: &str) -> i32;
    fn uniform1i(&mut self, location: i32, value: i32);
    fn uniform1f(&mut self, location: i32, value: f32);
    fn uniform2f(&mut self, location: i32, value: [f32; 2]);
    fn uniform3f(&mut self, location: i32, value: [f32; 3]);
    fn uniform4f(&mut self, location: i32, value: [f32; 4]);
    fn uniform_matrix4(&mut self, location: i32, value: [f32; 16]);

    // -- draw calls -----------------------------------------------------
    fn draw_arrays(&mut self, mode: crate::types::RenderMode, first: u32, count: u32);
    fn draw_elements(&mut self, mode: crate::types::RenderMode, count: u32, byte_offset: usize);
    fn draw_elements_base_vertex(
        &mut self,
        mode: crate::types::RenderMode,
        count: u32,
        byte_offset: usize,
        base_vertex: i32,
    );
}

/// Real `gl`-crate-backed [`GpuDriver`].
///
/// Every method is a thin, direct translation into the matching `gl::*`
/// call(s); no state is cached here, by design — caching is the Context's
/// job, not the driver's.
#[derive(Debug, Default)]
pub struct GlDriver {
    _private: (),
}

impl GlDriver {
    pub fn new() -> Self {
        GlDriver { _private: () }
    }

    fn gl_cull_face(mode: crate::types::CullMode) -> gl::types::GLenum {
        match mode {
            crate::types::CullMode::None => gl::BACK,
            crate::types::CullMode::Front => gl::FRONT,
            crate::types::CullMode::Back => gl::BACK,
            crate::types::CullMode::FrontAndBack => gl::FRONT_AND_BACK,
        }
    }

    fn gl_mode(mode: crate::types::RenderMode) -> gl::types::GLenum {
        match mode {
            crate::types::RenderMode::Triangles => gl::TRIANGLES,
            crate::types::RenderMode::Lines => gl::LINES,
            crate::types::RenderMode::LineStrip => gl::LINE_STRIP,
            crate::types::RenderMode::Points => gl::POINTS,
        }
    }

    fn gl_texture_target(variant: TextureVariant, face: TextureFace) -> gl::types::GLenum {
        match variant {
            TextureVariant::Plane2D => gl::TEXTURE_2D,
            TextureVariant::Cube => match face {
                TextureFace::PlusX => gl::TEXTURE_CUBE_MAP_POSITIVE_X,
                TextureFace::MinusX => gl::TEXTURE_CUBE_MAP_NEGATIVE_X,
                TextureFace::PlusY => gl::TEXTURE_CUBE_MAP_POSITIVE_Y,
                TextureFace::MinusY => gl::TEXTURE_CUBE_MAP_NEGATIVE_Y,
                TextureFace::PlusZ => gl::TEXTURE_CUBE_MAP_POSITIVE_Z,
                TextureFace::MinusZ => gl::TEXTURE_CUBE_MAP_NEGATIVE_Z,
                TextureFace::Plane => gl::TEXTURE_CUBE_MAP_POSITIVE_X,
            },
        }
    }

    fn gl_bind_target(variant: TextureVariant) -> gl::types::GLenum {
        match variant {
            TextureVariant::Plane2D => gl::TEXTURE_2D,
            TextureVariant::Cube => gl::TEXTURE_CUBE_MAP,
        }
    }

    fn internal_format(format: TextureFormat) -> gl::types::GLint {
        (match format {
            TextureFormat::R | TextureFormat::R16 => gl::RED,
            TextureFormat::Rg | TextureFormat::Rg16 => gl::RG,
            TextureFormat::Rgb | TextureFormat::Rgb16 => gl::RGB,
            TextureFormat::Rgba | TextureFormat::Rgba16 => gl::RGBA,
            TextureFormat::Srgb => gl::SRGB8,
            TextureFormat::Srgba => gl::SRGB8_ALPHA8,
            TextureFormat::Depth16 => gl::DEPTH_COMPONENT16,
            TextureFormat::Depth24 => gl::DEPTH24_STENCIL8,
            TextureFormat::Depth32 => gl::DEPTH_COMPONENT32F,
        }) as gl::types::GLint
    }

    fn pixel_format(format: TextureFormat) -> gl::types::GLenum {
        if format.is_depth() {
            if matches!(format, TextureFormat::Depth24) {
                gl::DEPTH_STENCIL
            } else {
                gl::DEPTH_COMPONENT
            }
        } else {
            match format.channel_count() {
                1 => gl::RED,
                2 => gl::RG,
                3 => gl::RGB,
                _ => gl::RGBA,
            }
        }
    }

    fn pixel_type(format: TextureFormat) -> gl::types::GLenum {
        if format.is_half_float() {
            gl::FLOAT
        } else if matches!(format, TextureFormat::Depth24) {
            gl::UNSIGNED_INT_24_8
        } else if format.is_depth() {
            gl::FLOAT
        } else {
            gl::UNSIGNED_BYTE
        }
    }
}

impl GpuDriver for GlDriver {
    fn set_cull_enabled(&mut self, enabled: bool) {
        unsafe {
            if enabled {
                gl::Enable(gl::CULL_FACE);
            } else {
                gl::Disable(gl::CULL_FACE);
            }
        }
    }

    fn set_cull_face(&mut self, mode: crate::types::CullMode) {
        unsafe {
            gl::CullFace(Self::gl_cull_face(mode));
        }
    }

    fn set_blend_enabled(&mut self, enabled: bool) {
        unsafe {
            if enabled {
                gl::Enable(gl::BLEND);
            } else {
                gl::Disable(gl::BLEND);
            }
        }
    }

    fn set_blend_func_default(&mut self) {
        unsafe {
            gl::BlendFunc(gl::SRC_ALPHA, gl::ONE_MINUS_SRC_ALPHA);
        }
    }

    fn set_depth_test_enabled(&mut self, enabled: bool) {
        unsafe {
            if enabled {
                gl::Enable(gl::DEPTH_TEST);
            } else {
                gl::Disable(gl::DEPTH_TEST);
            }
        }
    }

    fn set_depth_mask(&mut self, write: bool) {
        unsafe {
            gl::DepthMask(write as gl::types::GLboolean);
        }
    }

    fn set_viewport(&mut self, x: i32, y: i32, width: u32, height: u32) {
        unsafe {
            gl::Viewport(x, y, width as i32, height as i32);
        }
    }

    fn set_clear_color(&mut self, r: f32, g: f32, b: f32, a: f32) {
        unsafe {
            gl::ClearColor(r, g, b, a);
        }
    }

    fn clear(&mut self, color: bool, depth: bool, stencil: bool) {
        let mut mask = 0;
        if color {
            mask |= gl::COLOR_BUFFER_BIT;
        }
        if depth {
            mask |= gl::DEPTH_BUFFER_BIT;
        }
        if stencil {
            mask |= gl::STENCIL_BUFFER_BIT;
        }
        if mask != 0 {
            unsafe {
                gl::Clear(mask);
            }
        }
    }

    fn create_buffer(&mut self) -> u32 {
        let mut id = 0;
        unsafe {
            gl::GenBuffers(1, &mut id);
        }
        id
    }

    fn delete_buffer(&mut self, id: u32) {
        unsafe {
            gl::DeleteBuffers(1, &id);
        }
    }

    fn bind_buffer(&mut self, target: BufferTarget, id: u32) {
        let target = match target {
            BufferTarget::Array => gl::ARRAY_BUFFER,
            BufferTarget::ElementArray => gl::ELEMENT_ARRAY_BUFFER,
        };
        unsafe {
            gl::BindBuffer(target, id);
        }
    }

    fn buffer_data(&mut self, target: BufferTarget, data: &[u8], usage: BufferUsage) {
        let target = match target {
            BufferTarget::Array => gl::ARRAY_BUFFER,
            BufferTarget::ElementArray => gl::ELEMENT_ARRAY_BUFFER,
        };
        let usage = match usage {
            BufferUsage::Static => gl::STATIC_DRAW,
            BufferUsage::Dynamic => gl::DYNAMIC_DRAW,
        };
        unsafe {
            gl::BufferData(
                target,
                data.len() as gl::types::GLsizeiptr,
                data.as_ptr() as *const _,
                usage,
            );
        }
    }

    fn buffer_sub_data(&mut self, target: BufferTarget, offset: usize, data: &[u8]) {
        let target = match target {
            BufferTarget::Array => gl::ARRAY_BUFFER,
            BufferTarget::ElementArray => gl::ELEMENT_ARRAY_BUFFER,
        };
        unsafe {
            gl::BufferSubData(
                target,
                offset as gl::types::GLintptr,
                data.len() as gl::types::GLsizeiptr,
                data.as_ptr() as *const _,
            );
        }
    }

    fn create_vertex_array(&mut self) -> u32 {
        let mut id = 0;
        unsafe {
            gl::GenVertexArrays(1, &mut id);
        }
        id
    }

    fn delete_vertex_array(&mut self, id: u32) {
        unsafe {
            gl::DeleteVertexArrays(1, &id);
        }
    }

    fn bind_vertex_array(&mut self, id: u32) {
        unsafe {
            gl::BindVertexArray(id);
        }
    }

    fn enable_vertex_attrib_array(&mut self, index: u32) {
        unsafe {
            gl::EnableVertexAttribArray(index);
        }
    }

    fn vertex_attrib_pointer(
        &mut self,
        index: u32,
        components: u32,
        scalar: DataScalar,
        stride: u32,
        offset: usize,
    ) {
        unsafe {
            match scalar {
                DataScalar::Float => gl::VertexAttribPointer(
                    index,
                    components as i32,
                    gl::FLOAT,
                    gl::FALSE,
                    stride as i32,
                    offset as *const std::os::raw::c_void,
                ),
                DataScalar::Int => gl::VertexAttribIPointer(
                    index,
                    components as i32,
                    gl::INT,
                    stride as i32,
                    offset as *const std::os::raw::c_void,
                ),
            }
        }
    }

    fn vertex_attrib_divisor(&mut self, index: u32, divisor: u32) {
        unsafe {
            gl::VertexAttribDivisor(index, divisor);
        }
    }

    fn create_texture(&mut self) -> u32 {
        let mut id = 0;
        unsafe {
            gl::GenTextures(1, &mut id);
        }
        id
    }

    fn delete_texture(&mut self, id: u32) {
        unsafe {
            gl::DeleteTextures(1, &id);
        }
    }

    fn bind_texture(&mut self, unit: u32, variant: TextureVariant, id: u32) {
        unsafe {
            gl::ActiveTexture(gl::TEXTURE0 + unit);
            gl::BindTexture(Self::gl_bind_target(variant), id);
        }
    }

    fn unbind_texture(&mut self, unit: u32, variant: TextureVariant) {
        unsafe {
            gl::ActiveTexture(gl::TEXTURE0 + unit);
            gl::BindTexture(Self::gl_bind_target(variant), 0);
        }
    }

    fn tex_image(
        &mut self,
        id: u32,
        variant: TextureVariant,
        face: TextureFace,
        level: u32,
        format: TextureFormat,
        width: u32,
        height: u32,
        data: Option<&[u8]>,
    ) {
        unsafe {
            gl::BindTexture(Self::gl_bind_target(variant), id);
            let ptr = data
                .map(|d| d.as_ptr() as *const std::os::raw::c_void)
                .unwrap_or(std::ptr::null());
            gl::TexImage2D(
                Self::gl_texture_target(variant, face),
                level as i32,
                Self::internal_format(format),
                width as i32,
                height as i32,
                0,
                Self::pixel_format(format),
                Self::pixel_type(format),
                ptr,
            );
        }
    }

    fn tex_sub_image(
        &mut self,
        id: u32,
        variant: TextureVariant,
        face: TextureFace,
        level: u32,
        x: u32,
        y: u32,
        width: u32,
        height: u32,
        format: TextureFormat,
        data: &[u8],
    ) {
        unsafe {
            gl::BindTexture(Self::gl_bind_target(variant), id);
            gl::TexSubImage2D(
                Self::gl_texture_target(variant, face),
                level as i32,
                x as i32,
                y as i32,
                width as i32,
                height as i32,
                Self::pixel_format(format),
                Self::pixel_type(format),
                data.as_ptr() as *const std::os::raw::c_void,
            );
        }
    }

    fn tex_wrap(&mut self, id: u32, variant: TextureVariant, s: crate::types::WrapMode, t: crate::types::WrapMode) {
        let gl_wrap = |m: crate::types::WrapMode| match m {
            crate::types::WrapMode::None => gl::CLAMP_TO_EDGE,
            crate::types::WrapMode::Repeat => gl::REPEAT,
            crate::types::WrapMode::Clamp => gl::CLAMP_TO_EDGE,
        };
        let target = Self::gl_bind_target(variant);
        unsafe {
            gl::BindTexture(target, id);
            gl::TexParameteri(target, gl::TEXTURE_WRAP_S, gl_wrap(s) as i32);
            gl::TexParameteri(target, gl::TEXTURE_WRAP_T, gl_wrap(t) as i32);
        }
    }

    fn tex_filter(
        &mut self,
        id: u32,
        variant: TextureVariant,
        min: crate::types::Filter,
        mag: crate::types::Filter,
        mipmap: crate::types::MipmapFilter,
    ) {
        let gl_min = match (min, mipmap) {
            (crate::types::Filter::Nearest, crate::types::MipmapFilter::None) => gl::NEAREST,
            (crate::types::Filter::Linear, crate::types::MipmapFilter::None) => gl::LINEAR,
            (crate::types::Filter::Nearest, crate::types::MipmapFilter::Nearest) => gl::NEAREST_MIPMAP_NEAREST,
            (crate::types::Filter::Nearest, crate::types::MipmapFilter::Linear) => gl::NEAREST_MIPMAP_LINEAR,
            (crate::types::Filter::Linear, crate::types::MipmapFilter::Nearest) => gl::LINEAR_MIPMAP_NEAREST,
            (crate::types::Filter::Linear, crate::types::MipmapFilter::Linear) => gl::LINEAR_MIPMAP_LINEAR,
        };
        let gl_mag = match mag {
            crate::types::Filter::Nearest => gl::NEAREST,
            crate::types::Filter::Linear => gl::LINEAR,
        };
        let target = Self::gl_bind_target(variant);
        unsafe {
            gl::BindTexture(target, id);
            gl::TexParameteri(target, gl::TEXTURE_MIN_FILTER, gl_min as i32);
            gl::TexParameteri(target, gl::TEXTURE_MAG_FILTER, gl_mag as i32);
        }
    }

    fn tex_border_color(&mut self, id: u32, variant: TextureVariant, rgba: [f32; 4]) {
        let target = Self::gl_bind_target(variant);
        unsafe {
            gl::BindTexture(target, id);
            gl::TexParameterfv(target, gl::TEXTURE_BORDER_COLOR, rgba.as_ptr());
        }
    }

    fn generate_mipmap(&mut self, id: u32, variant: TextureVariant) {
        let target = Self::gl_bind_target(variant);
        unsafe {
            gl::BindTexture(target, id);
            gl::GenerateMipmap(target);
        }
    }

    fn create_framebuffer(&mut self) -> u32 {
        let mut id = 0;
        unsafe {
            gl::GenFramebuffers(1, &mut id);
        }
        id
    }

    fn delete_framebuffer(&mut self, id: u32) {
        unsafe {
            gl::DeleteFramebuffers(1, &id);
        }
    }

    fn bind_framebuffer(&mut self, binding: BindingType, id: u32) {
        let target = match binding {
            BindingType::Read => gl::READ_FRAMEBUFFER,
            BindingType::Draw => gl::DRAW_FRAMEBUFFER,
            BindingType::ReadWrite => gl::FRAMEBUFFER,
        };
        unsafe {
            gl::BindFramebuffer(target, id);
        }
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
        let attachment_point = match attachment {
            AttachmentType::Color => gl::COLOR_ATTACHMENT0 + color_index,
            AttachmentType::Depth => gl::DEPTH_ATTACHMENT,
            AttachmentType::Stencil => gl::DEPTH_STENCIL_ATTACHMENT,
        };
        unsafe {
            gl::FramebufferTexture2D(
                gl::FRAMEBUFFER,
                attachment_point,
                Self::gl_texture_target(variant, face),
                texture_id,
                level as i32,
            );
        }
    }

    fn draw_buffers(&mut self, color_indices: &[u32]) {
        let attachments: Vec<gl::types::GLenum> =
            color_indices.iter().map(|i| gl::COLOR_ATTACHMENT0 + i).collect();
        unsafe {
            if attachments.is_empty() {
                gl::DrawBuffer(gl::NONE);
            } else {
                gl::DrawBuffers(attachments.len() as i32, attachments.as_ptr());
            }
        }
    }

    fn blit_framebuffer(
        &mut self,
        src_id: u32,
        dst_id: u32,
        src_w: u32,
        src_h: u32,
        dst_w: u32,
        dst_h: u32,
        attachment: AttachmentType,
    ) {
        let mask = match attachment {
            AttachmentType::Color => gl::COLOR_BUFFER_BIT,
            AttachmentType::Depth => gl::DEPTH_BUFFER_BIT,
            AttachmentType::Stencil => gl::STENCIL_BUFFER_BIT,
        };
        unsafe {
            gl::BindFramebuffer(gl::READ_FRAMEBUFFER, src_id);
            gl::BindFramebuffer(gl::DRAW_FRAMEBUFFER, dst_id);
            gl::BlitFramebuffer(
                0,
                0,
                src_w as i32,
                src_h as i32,
                0,
                0,
                dst_w as i32,
                dst_h as i32,
                mask,
                gl::NEAREST,
            );
        }
    }

    fn compile_shader(&mut self, stage: Stage, source: &str) -> Result<u32, GlslStageError> {
        let gl_stage = match stage {
            Stage::Vertex => gl::VERTEX_SHADER,
            Stage::Fragment => gl::FRAGMENT_SHADER,
            Stage::Geometry => gl::GEOMETRY_SHADER,
        };
        unsafe {
            let shader = gl::CreateShader(gl_stage);
            let c_str = std::ffi::CString::new(source.as_bytes()).unwrap();
            gl::ShaderSource(shader, 1, &c_str.as_ptr(), std::ptr::null());
            gl::CompileShader(shader);

            let mut success = gl::FALSE as gl::types::GLint;
            gl::GetShaderiv(shader, gl::COMPILE_STATUS, &mut success);
            if success != gl::TRUE as gl::types::GLint {
                let log = read_info_log(shader, false);
                gl::DeleteShader(shader);
                return Err(GlslStageError::Compile { stage, log });
            }
            Ok(shader)
        }
    }

    fn create_program(&mut self) -> u32 {
        unsafe { gl::CreateProgram() }
    }

    fn attach_shader(&mut self, program: u32, shader: u32) {
        unsafe {
            gl::AttachShader(program, shader);
        }
    }

    fn detach_shader(&mut self, program: u32, shader: u32) {
        unsafe {
            gl::DetachShader(program, shader);
        }
    }

    fn bind_attrib_location(&mut self, program: u32, index: u32, name: &str) {
        let c_str = std::ffi::CString::new(name).unwrap();
        unsafe {
            gl::BindAttribLocation(program, index, c_str.as_ptr());
        }
    }

    fn link_program(&mut self, program: u32) -> Result<(), GlslStageError> {
        unsafe {
            gl::LinkProgram(program);
            let mut success = gl::FALSE as gl::types::GLint;
            gl::GetProgramiv(program, gl::LINK_STATUS, &mut success);
            if success != gl::TRUE as gl::types::GLint {
                let log = read_info_log(program, true);
                return Err(GlslStageError::Link { log });
            }
            Ok(())
        }
    }

    fn delete_shader(&mut self, id: u32) {
        unsafe {
            gl::DeleteShader(id);
        }
    }

    fn delete_program(&mut self, id: u32) {
        unsafe {
            gl::DeleteProgram(id);
        }
    }

    fn use_program(&mut self, id: u32) {
        unsafe {
            gl::UseProgram(id);
        }
    }

    fn get_uniform_location(&mut self, program: u32, name: &str) -> i32 {
        let c_str = std::ffi::CString::new(name).unwrap();
        unsafe { gl::GetUniformLocation(program, c_str.as_ptr()) }
    }

    fn uniform1i(&mut self, location: i32, value: i32) {
        unsafe {
            gl::Uniform1i(location, value);
        }
    }

    fn uniform1f(&mut self, location: i32, value: f32) {
        unsafe {
            gl::Uniform1f(location, value);
        }
    }

    fn uniform2f(&mut self, location: i32, value: [f32; 2]) {
        unsafe {
            gl::Uniform2f(location, value[0], value[1]);
        }
    }

    fn uniform3f(&mut self, location: i32, value: [f32; 3]) {
        unsafe {
            gl::Uniform3f(location, value[0], value[1], value[2]);
        }
    }

    fn uniform4f(&mut self, location: i32, value: [f32; 4]) {
        unsafe {
            gl::Uniform4f(location, value[0], value[1], value[2], value[3]);
        }
    }

    fn uniform_matrix4(&mut self, location: i32, value: [f32; 16]) {
        unsafe {
            gl::UniformMatrix4fv(location, 1, gl::FALSE, value.as_ptr());
        }
    }

    fn draw_arrays(&mut self, mode: crate::types::RenderMode, first: u32, count: u32) {
        unsafe {
            gl::DrawArrays(Self::gl_mode(mode), first as i32, count as i32);
        }
    }

    fn draw_elements(&mut self, mode: crate::types::RenderMode, count: u32, byte_offset: usize) {
        unsafe {
            gl::DrawElements(
                Self::gl_mode(mode),
                count as i32,
                gl::UNSIGNED_INT,
                byte_offset as *const std::os::raw::c_void,
            );
        }
    }

    fn draw_elements_base_vertex(
        &mut self,
        mode: crate::types::RenderMode,
        count: u32,
        byte_offset: usize,
        base_vertex: i32,
    ) {
        unsafe {
            gl::DrawElementsBaseVertex(
                Self::gl_mode(mode),
                count as i32,
                gl::UNSIGNED_INT,
                byte_offset as *const std::os::raw::c_void,
                base_vertex,
            );
        }
    }
}

unsafe fn read_info_log(id: u32, is_program: bool) -> String {
    let mut len = 0;
    if is_program {
        gl::GetProgramiv(id, gl::INFO_LOG_LENGTH, &mut len);
    } else {
        gl::GetShaderiv(id, gl::INFO_LOG_LENGTH, &mut len);
    }
    if len <= 0 {
        return String::new();
    }
    let mut buffer = vec![0u8; len as usize];
    if is_program {
        gl::GetProgramInfoLog(id, len, std::ptr::null_mut(), buffer.as_mut_ptr() as *mut gl::types::GLchar);
    } else {
        gl::GetShaderInfoLog(id, len, std::ptr::null_mut(), buffer.as_mut_ptr() as *mut gl::types::GLchar);
    }
    String::from_utf8_lossy(&buffer).trim_end_matches('\0').to_string()
}
