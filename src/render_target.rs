use std::cell::RefCell;
use std::rc::Rc;

use smallvec::SmallVec;

use crate::driver::GpuDriver;
use crate::texture::Texture;
use crate::types::{AttachmentType, BindingType, Filter, MipmapFilter, TextureFace, TextureFormat, TextureVariant, MAX_COLOR_ATTACHMENTS};

struct Attachment {
    name: String,
    kind: AttachmentType,
    texture: Rc<Texture>,
    face: TextureFace,
    level: u32,
    color_index: Option<u32>,
    owned: bool,
}

/// An off-screen (or, for the default target, on-screen) framebuffer
/// composed of named color/depth/stencil attachments.
///
/// At most one `DEPTH` and one `STENCIL` attachment may be present; color
/// attachments receive a dense index in `[0, MAX_COLOR_ATTACHMENTS)` in
/// creation order.
pub struct RenderTarget {
    driver: Rc<RefCell<dyn GpuDriver>>,
    framebuffer_id: u32,
    is_default: bool,
    width: u32,
    height: u32,
    attachments: Vec<Attachment>,
    draw_slots: SmallVec<[u32; MAX_COLOR_ATTACHMENTS]>,
}

impl RenderTarget {
    /// Builds a new off-screen target with its own framebuffer object.
    pub fn new(driver: Rc<RefCell<dyn GpuDriver>>, width: u32, height: u32) -> Self {
        let framebuffer_id = driver.borrow_mut().create_framebuffer();
        RenderTarget {
            driver,
            framebuffer_id,
            is_default: false,
            width,
            height,
            attachments: Vec::new(),
            draw_slots: SmallVec::new(),
        }
    }

    /// Wraps an externally-created framebuffer handle (typically `0`, the
    /// windowing system's default framebuffer). The wrapper never deletes
    /// this handle.
    pub fn wrap_default(driver: Rc<RefCell<dyn GpuDriver>>, handle: u32, width: u32, height: u32) -> Self {
        RenderTarget {
            driver,
            framebuffer_id: handle,
            is_default: true,
            width,
            height,
            attachments: Vec::new(),
            draw_slots: SmallVec::new(),
        }
    }

    /// Rewrites the wrapped default framebuffer handle, used when the
    /// windowing system recreates its surface. No-op on a non-default target.
    pub fn set_default_framebuffer_handle(&mut self, handle: u32) {
        if self.is_default {
            self.framebuffer_id = handle;
        } else {
            log::warn!("RenderTarget::set_default_framebuffer_handle called on a non-default target, ignoring");
        }
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    fn has_kind(&self, kind: AttachmentType) -> bool {
        self.attachments.iter().any(|a| a.kind == kind)
    }

    fn color_count(&self) -> usize {
        self.attachments.iter().filter(|a| a.kind == AttachmentType::Color).count()
    }

    /// Attaches an externally-owned texture. Rejected (no-op) if adding a
    /// second `DEPTH`/`STENCIL` slot, or a `COLOR` slot past
    /// [`MAX_COLOR_ATTACHMENTS`].
    pub fn add_slot_with_texture(&mut self, name: &str, kind: AttachmentType, texture: Rc<Texture>, face: TextureFace, level: u32) -> bool {
        self.add_slot_inner(name, kind, texture, face, level, false)
    }

    /// Convenience overload: creates a matching texture sized to this
    /// target with linear filtering, owned by the target.
    pub fn add_slot_with_format(&mut self, name: &str, kind: AttachmentType, format: TextureFormat) -> bool {
        let texture = Rc::new(Texture::create_from_format(self.driver.clone(), TextureVariant::Plane2D, format, self.width, self.height));
        texture.set_filter_min_mag(Filter::Linear, Filter::Linear, MipmapFilter::None);
        self.add_slot_inner(name, kind, texture, TextureFace::Plane, 0, true)
    }

    fn add_slot_inner(&mut self, name: &str, kind: AttachmentType, texture: Rc<Texture>, face: TextureFace, level: u32, owned: bool) -> bool {
        if matches!(kind, AttachmentType::Depth | AttachmentType::Stencil) && self.has_kind(kind) {
            log::warn!("RenderTarget::add_slot: {:?} attachment already present, ignoring", kind);
            return false;
        }
        if kind == AttachmentType::Color && self.color_count() >= MAX_COLOR_ATTACHMENTS {
            log::warn!("RenderTarget::add_slot: color attachment cap ({}) reached, ignoring", MAX_COLOR_ATTACHMENTS);
            return false;
        }

        let color_index = if kind == AttachmentType::Color {
            Some(self.color_count() as u32)
        } else {
            None
        };

        {
            let mut driver = self.driver.borrow_mut();
            driver.bind_framebuffer(BindingType::ReadWrite, self.framebuffer_id);
            driver.framebuffer_texture(kind, color_index.unwrap_or(0), texture.gl_id(), texture.variant(), face, level);
        }

        self.attachments.push(Attachment {
            name: name.to_string(),
            kind,
            texture,
            face,
            level,
            color_index,
            owned,
        });
        true
    }

    fn slot_index(&self, name: &str) -> Option<usize> {
        self.attachments.iter().position(|a| a.name == name)
    }

    pub fn get_slot(&self, name: &str) -> Option<&Rc<Texture>> {
        self.slot_index(name).map(|i| &self.attachments[i].texture)
    }

    pub fn get_slot_by_type(&self, kind: AttachmentType) -> Option<&Rc<Texture>> {
        self.attachments.iter().find(|a| a.kind == kind).map(|a| &a.texture)
    }

    /// Removes the named slot, destroying its texture iff owned by the
    /// target. Reassigns dense color indices for the remaining color slots.
    pub fn delete_slot(&mut self, name: &str) {
        if let Some(index) = self.slot_index(name) {
            self.remove_attachment_at(index);
        }
    }

    pub fn delete_slot_by_type(&mut self, kind: AttachmentType) {
        if let Some(index) = self.attachments.iter().position(|a| a.kind == kind) {
            self.remove_attachment_at(index);
        }
    }

    fn remove_attachment_at(&mut self, index: usize) {
        let attachment = self.attachments.remove(index);
        {
            let mut driver = self.driver.borrow_mut();
            driver.bind_framebuffer(BindingType::ReadWrite, self.framebuffer_id);
            driver.framebuffer_texture(attachment.kind, attachment.color_index.unwrap_or(0), 0, attachment.texture.variant(), attachment.face, attachment.level);
        }
        drop(attachment);
        self.reindex_color_slots();
    }

    fn reindex_color_slots(&mut self) {
        let mut next = 0u32;
        for attachment in self.attachments.iter_mut() {
            if attachment.kind == AttachmentType::Color {
                attachment.color_index = Some(next);
                next += 1;
            }
        }
    }

    /// Swaps the backing texture of an existing slot; releases the prior
    /// texture iff it was owned, then marks the slot as non-owned.
    pub fn replace_slot_texture(&mut self, name: &str, texture: Rc<Texture>, face: TextureFace, level: u32) -> bool {
        let index = match self.slot_index(name) {
            Some(i) => i,
            None => return false,
        };
        let (kind, color_index) = {
            let attachment = &self.attachments[index];
            (attachment.kind, attachment.color_index)
        };
        {
            let mut driver = self.driver.borrow_mut();
            driver.bind_framebuffer(BindingType::ReadWrite, self.framebuffer_id);
            driver.framebuffer_texture(kind, color_index.unwrap_or(0), texture.gl_id(), texture.variant(), face, level);
        }
        let attachment = &mut self.attachments[index];
        attachment.texture = texture;
        attachment.face = face;
        attachment.level = level;
        attachment.owned = false;
        true
    }

    /// Specifies the ordered set of color attachments that receive fragment
    /// output. An empty list disables color output entirely.
    pub fn set_slots_used_to_draw(&mut self, names: &[&str]) {
        self.draw_slots = names
            .iter()
            .filter_map(|name| self.slot_index(name).and_then(|i| self.attachments[i].color_index))
            .collect();
        self.apply_draw_buffers();
    }

    /// Enables every color attachment, in creation-index order.
    pub fn use_all_slots_to_draw(&mut self) {
        self.draw_slots = self
            .attachments
            .iter()
            .filter_map(|a| a.color_index)
            .collect();
        self.apply_draw_buffers();
    }

    fn apply_draw_buffers(&self) {
        let mut driver = self.driver.borrow_mut();
        driver.bind_framebuffer(BindingType::ReadWrite, self.framebuffer_id);
        driver.draw_buffers(&self.draw_slots);
    }

    /// Reallocates owned textures at the new dimensions, preserving format
    /// and sampling parameters. Externally-owned textures are left
    /// untouched; the caller is responsible for any resulting mismatch.
    pub fn resize(&mut self, width: u32, height: u32) {
        self.width = width;
        self.height = height;
        for index in 0..self.attachments.len() {
            let (owned, kind, format, face, level, color_index) = {
                let a = &self.attachments[index];
                (a.owned, a.kind, a.texture.format(), a.face, a.level, a.color_index)
            };
            if !owned {
                continue;
            }
            let new_texture = Rc::new(Texture::create_from_format(self.driver.clone(), TextureVariant::Plane2D, format, width, height));
            new_texture.set_filter_min_mag(Filter::Linear, Filter::Linear, MipmapFilter::None);
            {
                let mut driver = self.driver.borrow_mut();
                driver.bind_framebuffer(BindingType::ReadWrite, self.framebuffer_id);
                driver.framebuffer_texture(kind, color_index.unwrap_or(0), new_texture.gl_id(), new_texture.variant(), face, level);
            }
            self.attachments[index].texture = new_texture;
        }
    }

    /// Blits this target's pixels of `kind` to `dest` at nearest filter,
    /// using each target's natural size. Saves and restores the previously
    /// bound draw target and viewport.
    pub fn copy(&self, dest: &RenderTarget, kind: AttachmentType) {
        let mut driver = self.driver.borrow_mut();
        driver.blit_framebuffer(self.framebuffer_id, dest.framebuffer_id, self.width, self.height, dest.width, dest.height, kind);
        driver.bind_framebuffer(BindingType::ReadWrite, self.framebuffer_id);
        driver.set_viewport(0, 0, self.width, self.height);
    }

    /// Binds this target for rendering. Invoked internally by
    /// [`crate::Context::set_render_target`].
    pub(crate) fn bind(&self) {
        self.driver.borrow_mut().bind_framebuffer(BindingType::ReadWrite, self.framebuffer_id);
    }

    pub(crate) fn gl_id(&self) -> u32 {
        self.framebuffer_id
    }

    pub(crate) fn is_default(&self) -> bool {
        self.is_default
    }
}

impl Drop for RenderTarget {
    fn drop(&mut self) {
        if !self.is_default {
            self.driver.borrow_mut().delete_framebuffer(self.framebuffer_id);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::MockDriver;

    #[test]
    fn rejects_second_depth_slot() {
        let (_, driver) = MockDriver::new_pair();
        let mut target = RenderTarget::new(driver, 64, 64);
        assert!(target.add_slot_with_format("depth-a", AttachmentType::Depth, TextureFormat::Depth24));
        assert!(!target.add_slot_with_format("depth-b", AttachmentType::Depth, TextureFormat::Depth24));
    }

    #[test]
    fn caps_color_attachments() {
        let (_, driver) = MockDriver::new_pair();
        let mut target = RenderTarget::new(driver, 32, 32);
        for i in 0..MAX_COLOR_ATTACHMENTS {
            assert!(target.add_slot_with_format(&format!("c{i}"), AttachmentType::Color, TextureFormat::Rgba));
        }
        assert!(!target.add_slot_with_format("overflow", AttachmentType::Color, TextureFormat::Rgba));
    }

    #[test]
    fn default_target_is_never_deleted() {
        let (concrete, driver) = MockDriver::new_pair();
        {
            let _target = RenderTarget::wrap_default(driver, 0, 800, 600);
        }
        assert!(!concrete
            .borrow()
            .log()
            .iter()
            .any(|c| matches!(c, crate::testing::DriverCommand::DeleteFramebuffer(0))));
    }
}
