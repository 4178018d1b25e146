use std::cell::RefCell;
use std::rc::Rc;

use smallvec::SmallVec;

use crate::driver::{GlDriver, GpuDriver};
use crate::render_target::RenderTarget;
use crate::shader_program::ShaderProgram;
use crate::texture::Texture;
use crate::types::{
    BlendMode, CullMode, DepthMode, RenderMode, TextureVariant, MAX_SAMPLER_SLOTS,
};
use crate::vertex_data::VertexData;

/// Snapshot of pipeline state at a point in time.
///
/// Resource references are held as raw driver handles rather than borrowed
/// Rust references, sidestepping a borrow-checker fight the save/restore
/// stack would otherwise force: a handle that outlives its Rust wrapper is
/// the caller's bug, exactly as in the reference implementation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct ContextState {
    cull_mode: CullMode,
    blend_mode: BlendMode,
    depth_mode: DepthMode,
    shader: Option<u32>,
    render_target: u32,
    render_target_size: (u32, u32),
    vertex_data: Option<u32>,
}

/// Tracks which sampler slots currently hold a bound texture of each
/// variant, so [`Context::unbind_textures_by_variant`] and
/// [`Context::frame_begin`] know exactly what to release.
#[derive(Debug, Default)]
struct TextureBindTable {
    slots: [[bool; 2]; MAX_SAMPLER_SLOTS],
}

impl TextureBindTable {
    fn variant_index(variant: TextureVariant) -> usize {
        match variant {
            TextureVariant::Plane2D => 0,
            TextureVariant::Cube => 1,
        }
    }

    fn set(&mut self, slot: u32, variant: TextureVariant, bound: bool) {
        if (slot as usize) < MAX_SAMPLER_SLOTS {
            self.slots[slot as usize][Self::variant_index(variant)] = bound;
        }
    }

    fn is_set(&self, slot: u32, variant: TextureVariant) -> bool {
        (slot as usize) < MAX_SAMPLER_SLOTS && self.slots[slot as usize][Self::variant_index(variant)]
    }

    fn clear_all(&mut self) {
        self.slots = [[false; 2]; MAX_SAMPLER_SLOTS];
    }

    fn iter_set(&self) -> impl Iterator<Item = (u32, TextureVariant)> + '_ {
        self.slots.iter().enumerate().flat_map(|(slot, variants)| {
            variants.iter().enumerate().filter_map(move |(v, &bound)| {
                if bound {
                    let variant = if v == 0 { TextureVariant::Plane2D } else { TextureVariant::Cube };
                    Some((slot as u32, variant))
                } else {
                    None
                }
            })
        })
    }
}

/// One texture bound into a sampler slot, optionally paired with the
/// uniform name that should be set to that slot's index.
pub struct TextureBinding<'a> {
    pub slot: u32,
    pub texture: &'a Texture,
    pub uniform_name: Option<&'a str>,
}

/// Sole owner of the GPU state shadow, sole dispatcher of draw calls, and
/// factory for every other resource type.
///
/// Thread-affine to the thread that constructed it: the driver handle is
/// `Rc<RefCell<_>>`, which is not `Send`/`Sync`, so a `Context` cannot
/// accidentally cross a thread boundary.
pub struct Context {
    driver: Rc<RefCell<dyn GpuDriver>>,
    state: ContextState,
    saved: Vec<ContextState>,
    bind_table: TextureBindTable,
    default_target: Rc<RefCell<RenderTarget>>,
}

impl Context {
    /// Builds the default render target around `default_framebuffer_handle`
    /// (not owned — never deleted) and applies the cold-start pattern: the
    /// shadow starts at `{NONE, NONE, OFF, ...}` but the real initial apply
    /// forces depth to `READ_WRITE`, guaranteeing the GPU sees an explicit
    /// depth-enable on the very first frame.
    pub fn new(screen_width: u32, screen_height: u32, default_framebuffer_handle: u32) -> Self {
        Self::with_driver(Rc::new(RefCell::new(GlDriver::new())), screen_width, screen_height, default_framebuffer_handle)
    }

    /// Like [`Context::new`], but accepts an injected driver — used by
    /// tests to supply a `MockDriver`, and in principle by an embedder that
    /// wants to share one driver instance across multiple contexts.
    pub fn with_driver(driver: Rc<RefCell<dyn GpuDriver>>, screen_width: u32, screen_height: u32, default_framebuffer_handle: u32) -> Self {
        let default_target = Rc::new(RefCell::new(RenderTarget::wrap_default(
            driver.clone(),
            default_framebuffer_handle,
            screen_width,
            screen_height,
        )));

        let mut context = Context {
            driver,
            state: ContextState {
                cull_mode: CullMode::None,
                blend_mode: BlendMode::None,
                depth_mode: DepthMode::Off,
                shader: None,
                render_target: default_framebuffer_handle,
                render_target_size: (screen_width, screen_height),
                vertex_data: None,
            },
            saved: Vec::new(),
            bind_table: TextureBindTable::default(),
            default_target,
        };

        context.set_cull_mode(CullMode::None, false);
        context.set_depth_mode(DepthMode::ReadWrite, false);
        context.set_blend_mode(BlendMode::None, false);
        context
    }

    // -- factories ------------------------------------------------------

    pub fn create_texture(&self, variant: TextureVariant, format: crate::types::TextureFormat, width: u32, height: u32) -> Texture {
        Texture::create_from_format(self.driver.clone(), variant, format, width, height)
    }

    pub fn create_vertex_data(&self) -> VertexData {
        VertexData::new(self.driver.clone())
    }

    pub fn create_shader_program(&self) -> ShaderProgram {
        ShaderProgram::new(self.driver.clone())
    }

    pub fn create_render_target(&self, width: u32, height: u32) -> RenderTarget {
        RenderTarget::new(self.driver.clone(), width, height)
    }

    pub fn default_render_target(&self) -> Rc<RefCell<RenderTarget>> {
        self.default_target.clone()
    }

    // -- conditional-apply mode setters ----------------------------------

    pub fn set_cull_mode(&mut self, mode: CullMode, force_apply: bool) {
        if !force_apply && self.state.cull_mode == mode {
            return;
        }
        let mut driver = self.driver.borrow_mut();
        match mode {
            CullMode::None => driver.set_cull_enabled(false),
            other => {
                driver.set_cull_enabled(true);
                driver.set_cull_face(other);
            }
        }
        drop(driver);
        self.state.cull_mode = mode;
    }

    pub fn set_blend_mode(&mut self, mode: BlendMode, force_apply: bool) {
        if !force_apply && self.state.blend_mode == mode {
            return;
        }
        let mut driver = self.driver.borrow_mut();
        match mode {
            BlendMode::None => driver.set_blend_enabled(false),
            BlendMode::Default => {
                driver.set_blend_enabled(true);
                driver.set_blend_func_default();
            }
        }
        drop(driver);
        self.state.blend_mode = mode;
    }

    pub fn set_depth_mode(&mut self, mode: DepthMode, force_apply: bool) {
        if !force_apply && self.state.depth_mode == mode {
            return;
        }
        let mut driver = self.driver.borrow_mut();
        match mode {
            DepthMode::Off => driver.set_depth_test_enabled(false),
            DepthMode::ReadOnly => {
                driver.set_depth_test_enabled(true);
                driver.set_depth_mask(false);
            }
            DepthMode::ReadWrite => {
                driver.set_depth_test_enabled(true);
                driver.set_depth_mask(true);
            }
        }
        drop(driver);
        self.state.depth_mode = mode;
    }

    pub fn set_shader(&mut self, shader: Option<&ShaderProgram>, force_apply: bool) {
        let id = shader.map(|s| s.gl_id());
        if !force_apply && self.state.shader == id {
            return;
        }
        self.driver.borrow_mut().use_program(id.unwrap_or(0));
        self.state.shader = id;
    }

    pub fn set_render_target(&mut self, target: &Rc<RefCell<RenderTarget>>, force_apply: bool) {
        let (id, size) = {
            let t = target.borrow();
            (t.gl_id(), (t.width(), t.height()))
        };
        let size_changed = self.state.render_target_size != size;
        if !force_apply && self.state.render_target == id && !size_changed {
            return;
        }
        target.borrow().bind();
        if size_changed || force_apply {
            self.driver.borrow_mut().set_viewport(0, 0, size.0, size.1);
        }
        self.state.render_target = id;
        self.state.render_target_size = size;
    }

    pub fn set_vertex_data(&mut self, vertex_data: Option<&VertexData>, force_apply: bool) {
        let id = vertex_data.map(|v| v.gl_id());
        // Fixes the reference implementation's defect where binding "none"
        // left the shadow stale: the shadow is always written here.
        if !force_apply && self.state.vertex_data == id {
            return;
        }
        match vertex_data {
            Some(v) => v.bind(),
            None => self.driver.borrow_mut().bind_vertex_array(0),
        }
        self.state.vertex_data = id;
    }

    // -- texture binding --------------------------------------------------

    pub fn bind_textures(&mut self, bindings: &[TextureBinding]) {
        let mut driver = self.driver.borrow_mut();
        for binding in bindings {
            if binding.slot as usize >= MAX_SAMPLER_SLOTS {
                log::warn!("Context::bind_textures: slot {} exceeds MAX_SAMPLER_SLOTS, ignoring", binding.slot);
                continue;
            }
            driver.bind_texture(binding.slot, binding.texture.variant(), binding.texture.gl_id());
            self.bind_table.set(binding.slot, binding.texture.variant(), true);
        }
    }

    pub fn bind_textures_with_uniforms(&mut self, bindings: &[TextureBinding]) {
        self.bind_textures(bindings);
        let program_id = match self.state.shader {
            Some(id) => id,
            None => return,
        };
        let mut driver = self.driver.borrow_mut();
        for binding in bindings {
            if let Some(name) = binding.uniform_name {
                // Context only holds the bound program's id, not the ShaderProgram
                // itself, so this looks up the location fresh every call rather
                // than through ShaderProgram's cache.
                let location = driver.get_uniform_location(program_id, name);
                driver.uniform1i(location, binding.slot as i32);
            }
        }
    }

    pub fn unbind_all_textures(&mut self) {
        let set: SmallVec<[(u32, TextureVariant); MAX_SAMPLER_SLOTS]> = self.bind_table.iter_set().collect();
        let mut driver = self.driver.borrow_mut();
        for (slot, variant) in set {
            driver.unbind_texture(slot, variant);
        }
        self.bind_table.clear_all();
    }

    pub fn unbind_textures_by_variant(&mut self, variant: TextureVariant) {
        let matching: SmallVec<[u32; MAX_SAMPLER_SLOTS]> = self
            .bind_table
            .iter_set()
            .filter(|(_, v)| *v == variant)
            .map(|(slot, _)| slot)
            .collect();
        let mut driver = self.driver.borrow_mut();
        for slot in matching.iter().copied() {
            driver.unbind_texture(slot, variant);
            self.bind_table.set(slot, variant, false);
        }
    }

    fn texture_bound(&self, slot: u32, variant: TextureVariant) -> bool {
        self.bind_table.is_set(slot, variant)
    }

    // -- clearing ---------------------------------------------------------

    pub fn set_clear_color(&mut self, r: f32, g: f32, b: f32, a: f32) {
        self.driver.borrow_mut().set_clear_color(r, g, b, a);
    }

    pub fn clear_buffer(&mut self, color: bool, depth: bool, stencil: bool) {
        self.driver.borrow_mut().clear(color, depth, stencil);
    }

    // -- drawing ----------------------------------------------------------

    pub fn render_arrays(&mut self, mode: RenderMode, first: u32, count: u32) {
        self.driver.borrow_mut().draw_arrays(mode, first, count);
    }

    pub fn render_indexed(&mut self, mode: RenderMode, count: u32, byte_offset: usize) {
        self.driver.borrow_mut().draw_elements(mode, count, byte_offset);
    }

    pub fn render_indexed_base_vertex(&mut self, mode: RenderMode, count: u32, byte_offset: usize, base_vertex: i32) {
        self.driver.borrow_mut().draw_elements_base_vertex(mode, count, byte_offset, base_vertex);
    }

    // -- save / restore -----------------------------------------------------

    pub fn save_state(&mut self) {
        self.saved.push(self.state);
    }

    /// Pops the saved state and re-applies each field via the conditional
    /// setters, bringing the GPU back in line with the same diff discipline
    /// used for every other mutation.
    pub fn restore_state(&mut self) {
        let saved = match self.saved.pop() {
            Some(s) => s,
            None => {
                log::warn!("Context::restore_state: stack is empty, ignoring");
                return;
            }
        };
        self.set_cull_mode(saved.cull_mode, false);
        self.set_blend_mode(saved.blend_mode, false);
        self.set_depth_mode(saved.depth_mode, false);

        if self.state.shader != saved.shader {
            self.driver.borrow_mut().use_program(saved.shader.unwrap_or(0));
            self.state.shader = saved.shader;
        }
        if self.state.vertex_data != saved.vertex_data {
            self.driver.borrow_mut().bind_vertex_array(saved.vertex_data.unwrap_or(0));
            self.state.vertex_data = saved.vertex_data;
        }
        if self.state.render_target != saved.render_target || self.state.render_target_size != saved.render_target_size {
            self.driver.borrow_mut().bind_framebuffer(crate::types::BindingType::ReadWrite, saved.render_target);
            self.driver.borrow_mut().set_viewport(0, 0, saved.render_target_size.0, saved.render_target_size.1);
            self.state.render_target = saved.render_target;
            self.state.render_target_size = saved.render_target_size;
        }
    }

    // -- frame boundary -----------------------------------------------------

    /// Resets the Context to a canonical baseline: unbinds every texture,
    /// force-binds the default render target (always re-issuing the
    /// viewport), and clears the active vertex-data and shader bindings.
    pub fn frame_begin(&mut self) {
        self.unbind_all_textures();
        let default_target = self.default_target.clone();
        self.set_render_target(&default_target, true);
        self.set_vertex_data(None, true);
        self.set_shader(None, true);
    }

    /// Reserved for future flush/present hand-off; currently a semantic
    /// marker only.
    pub fn frame_end(&mut self) {}

    pub fn set_default_framebuffer_handle(&mut self, handle: u32) {
        let was_bound = self.state.render_target == self.default_target.borrow().gl_id();
        self.default_target.borrow_mut().set_default_framebuffer_handle(handle);
        if was_bound {
            self.state.render_target = handle;
        }
    }
}

/// Shadow-state inspection for tests. Kept behind the `testing` feature so
/// production code never depends on reaching into the shadow directly — all
/// production interaction goes through the conditional setters above.
#[cfg(any(test, feature = "testing"))]
impl Context {
    pub fn shadow_cull_mode(&self) -> CullMode {
        self.state.cull_mode
    }

    pub fn shadow_blend_mode(&self) -> BlendMode {
        self.state.blend_mode
    }

    pub fn shadow_depth_mode(&self) -> DepthMode {
        self.state.depth_mode
    }

    pub fn shadow_shader(&self) -> Option<u32> {
        self.state.shader
    }

    pub fn shadow_vertex_data(&self) -> Option<u32> {
        self.state.vertex_data
    }

    pub fn shadow_render_target(&self) -> u32 {
        self.state.render_target
    }

    pub fn texture_bind_table_is_set(&self, slot: u32, variant: TextureVariant) -> bool {
        self.texture_bound(slot, variant)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{DriverCommand, MockDriver};

    fn new_test_context() -> (Rc<RefCell<MockDriver>>, Context) {
        let (concrete, driver) = MockDriver::new_pair();
        let context = Context::with_driver(driver, 800, 600, 0);
        (concrete, context)
    }

    #[test]
    fn cold_start_forces_depth_enable() {
        let (concrete, _context) = new_test_context();
        let log = concrete.borrow();
        assert!(log.log().contains(&DriverCommand::SetDepthTestEnabled(true)));
        assert!(log.log().contains(&DriverCommand::SetDepthMask(true)));
        assert!(!log.log().contains(&DriverCommand::SetCullEnabled(true)));
        assert!(!log.log().contains(&DriverCommand::SetBlendEnabled(true)));
    }

    #[test]
    fn duplicate_shader_bind_is_elided() {
        let (concrete, mut context) = new_test_context();
        let program = context.create_shader_program();
        concrete.borrow_mut().clear_log();
        context.set_shader(Some(&program), false);
        context.set_shader(Some(&program), false);
        context.set_shader(Some(&program), false);
        let uses = concrete.borrow().log().iter().filter(|c| matches!(c, DriverCommand::UseProgram(_))).count();
        assert_eq!(uses, 1);
    }

    #[test]
    fn save_restore_roundtrip() {
        let (_, mut context) = new_test_context();
        context.set_cull_mode(CullMode::Back, false);
        context.set_blend_mode(BlendMode::Default, false);
        context.save_state();
        context.set_cull_mode(CullMode::Front, false);
        context.set_blend_mode(BlendMode::None, false);
        context.restore_state();
        assert_eq!(context.state.cull_mode, CullMode::Back);
        assert_eq!(context.state.blend_mode, BlendMode::Default);
    }

    #[test]
    fn frame_begin_clears_shader_and_vertex_data() {
        let (_, mut context) = new_test_context();
        let program = context.create_shader_program();
        context.set_shader(Some(&program), false);
        context.frame_begin();
        assert_eq!(context.state.shader, None);
        assert_eq!(context.state.vertex_data, None);
    }

    #[test]
    fn frame_begin_clears_texture_bind_table() {
        let (_, mut context) = new_test_context();
        let texture = context.create_texture(TextureVariant::Plane2D, crate::types::TextureFormat::Rgba, 4, 4);
        context.bind_textures(&[TextureBinding { slot: 3, texture: &texture, uniform_name: None }]);
        assert!(context.texture_bound(3, TextureVariant::Plane2D));
        context.frame_begin();
        assert!(!context.texture_bound(3, TextureVariant::Plane2D));
    }

    #[test]
    fn set_vertex_data_none_always_updates_shadow() {
        let (_, mut context) = new_test_context();
        let vd = context.create_vertex_data();
        context.set_vertex_data(Some(&vd), false);
        context.set_vertex_data(None, false);
        assert_eq!(context.state.vertex_data, None);
        context.set_vertex_data(Some(&vd), false);
        assert_eq!(context.state.vertex_data, Some(vd.gl_id()));
    }

    #[test]
    fn render_target_binding_emits_viewport_only_on_size_change() {
        let (concrete, mut context) = new_test_context();
        let target = Rc::new(RefCell::new(context.create_render_target(800, 600)));
        concrete.borrow_mut().clear_log();
        context.set_render_target(&target, false);
        let first = concrete.borrow().log().iter().filter(|c| matches!(c, DriverCommand::SetViewport(..))).count();
        context.set_render_target(&target, false);
        let second = concrete.borrow().log().iter().filter(|c| matches!(c, DriverCommand::SetViewport(..))).count();
        assert_eq!(first, second);

        let other = Rc::new(RefCell::new(context.create_render_target(256, 256)));
        context.set_render_target(&other, false);
        let third = concrete.borrow().log().iter().filter(|c| matches!(c, DriverCommand::SetViewport(..))).count();
        assert!(third > second);
    }
}
