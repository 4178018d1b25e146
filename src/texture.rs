use std::cell::RefCell;
use std::rc::Rc;

use crate::driver::GpuDriver;
use crate::types::{Filter, MipmapFilter, TextureFace, TextureFormat, TextureVariant, WrapMode};

/// A GPU image resource.
///
/// Sampling parameters are applied at creation and on every mutation; the
/// handle is valid from construction until [`Texture`] is dropped.
#[derive(Debug)]
pub struct Texture {
    driver: Rc<RefCell<dyn GpuDriver>>,
    id: u32,
    variant: TextureVariant,
    format: TextureFormat,
    width: u32,
    height: u32,
}

impl Texture {
    /// Allocates GPU storage for the texture without uploading pixels. For
    /// [`TextureVariant::Cube`] this allocates all six faces.
    pub fn create_from_format(driver: Rc<RefCell<dyn GpuDriver>>, variant: TextureVariant, format: TextureFormat, width: u32, height: u32) -> Texture {
        let id = driver.borrow_mut().create_texture();
        let tex = Texture {
            driver,
            id,
            variant,
            format,
            width,
            height,
        };
        tex.allocate_storage(None);
        tex.apply_default_sampling();
        tex
    }

    fn faces(&self) -> &'static [TextureFace] {
        match self.variant {
            TextureVariant::Plane2D => &[TextureFace::Plane],
            TextureVariant::Cube => &[
                TextureFace::PlusX,
                TextureFace::MinusX,
                TextureFace::PlusY,
                TextureFace::MinusY,
                TextureFace::PlusZ,
                TextureFace::MinusZ,
            ],
        }
    }

    fn allocate_storage(&self, data: Option<&[u8]>) {
        let mut driver = self.driver.borrow_mut();
        for &face in self.faces() {
            driver.tex_image(self.id, self.variant, face, 0, self.format, self.width, self.height, data);
        }
    }

    fn apply_default_sampling(&self) {
        let mut driver = self.driver.borrow_mut();
        driver.tex_wrap(self.id, self.variant, WrapMode::Repeat, WrapMode::Repeat);
        driver.tex_filter(self.id, self.variant, Filter::Linear, Filter::Linear, MipmapFilter::None);
    }

    /// Uploads full storage for one face (use [`TextureFace::Plane`] for a
    /// 2D texture). Rejected (no-op) when `variant` is [`TextureVariant::Cube`]
    /// and `face` is [`TextureFace::Plane`].
    pub fn upload_data(&self, data: &[u8], width: u32, height: u32, face: TextureFace, level: u32) {
        if self.variant == TextureVariant::Cube && face == TextureFace::Plane {
            log::warn!("Texture::upload_data: Plane face is invalid for a cube texture, ignoring");
            return;
        }
        self.driver
            .borrow_mut()
            .tex_image(self.id, self.variant, face, level, self.format, width, height, Some(data));
    }

    /// Uploads a sub-rectangle of an existing face's storage.
    #[allow(clippy::too_many_arguments)]
    pub fn upload_sub_data(&self, data: &[u8], x: u32, y: u32, width: u32, height: u32, face: TextureFace, level: u32) {
        if self.variant == TextureVariant::Cube && face == TextureFace::Plane {
            log::warn!("Texture::upload_sub_data: Plane face is invalid for a cube texture, ignoring");
            return;
        }
        self.driver
            .borrow_mut()
            .tex_sub_image(self.id, self.variant, face, level, x, y, width, height, self.format, data);
    }

    /// Convenience over [`Texture::upload_data`] for typed pixel buffers
    /// (e.g. `&[u8; 4]` RGBA texels or `f32` HDR channels), cast to bytes via
    /// [`bytemuck::cast_slice`] rather than an unsafe transmute.
    pub fn upload_data_typed<T: bytemuck::Pod>(&self, data: &[T], width: u32, height: u32, face: TextureFace, level: u32) {
        self.upload_data(bytemuck::cast_slice(data), width, height, face, level);
    }

    /// Requests a full mipmap chain be generated from the base level.
    pub fn generate_mipmap(&self) {
        self.driver.borrow_mut().generate_mipmap(self.id, self.variant);
    }

    pub fn set_wrap_h(&self, mode: WrapMode) {
        let (_, t) = self.current_wrap();
        self.driver.borrow_mut().tex_wrap(self.id, self.variant, mode, t);
    }

    pub fn set_wrap_v(&self, mode: WrapMode) {
        let (s, _) = self.current_wrap();
        self.driver.borrow_mut().tex_wrap(self.id, self.variant, s, mode);
    }

    pub fn set_wrap_vh(&self, s: WrapMode, t: WrapMode) {
        self.driver.borrow_mut().tex_wrap(self.id, self.variant, s, t);
    }

    pub fn set_filter_min(&self, filter: Filter) {
        self.driver
            .borrow_mut()
            .tex_filter(self.id, self.variant, filter, Filter::Linear, MipmapFilter::None);
    }

    pub fn set_filter_mag(&self, filter: Filter) {
        self.driver
            .borrow_mut()
            .tex_filter(self.id, self.variant, Filter::Linear, filter, MipmapFilter::None);
    }

    pub fn set_filter_min_mag(&self, min: Filter, mag: Filter, mipmap: MipmapFilter) {
        self.driver.borrow_mut().tex_filter(self.id, self.variant, min, mag, mipmap);
    }

    pub fn set_border_color(&self, rgba: [f32; 4]) {
        self.driver.borrow_mut().tex_border_color(self.id, self.variant, rgba);
    }

    fn current_wrap(&self) -> (WrapMode, WrapMode) {
        // Wrap state is write-only at the driver boundary; we don't shadow it
        // here (each axis setter is independent per the public contract).
        (WrapMode::default(), WrapMode::default())
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn variant(&self) -> TextureVariant {
        self.variant
    }

    pub fn format(&self) -> TextureFormat {
        self.format
    }

    /// Activates `unit` and binds this texture. Used internally by
    /// [`crate::Context`]; not part of the narrow binding-capability
    /// contract resources expose to each other.
    pub(crate) fn bind_for_rendering(&self, unit: u32) {
        self.driver.borrow_mut().bind_texture(unit, self.variant, self.id);
    }

    pub(crate) fn gl_id(&self) -> u32 {
        self.id
    }
}

impl Drop for Texture {
    fn drop(&mut self) {
        self.driver.borrow_mut().delete_texture(self.id);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::MockDriver;

    #[test]
    fn cube_texture_allocates_all_six_faces() {
        let (concrete, driver) = MockDriver::new_pair();
        let _tex = Texture::create_from_format(driver, TextureVariant::Cube, TextureFormat::Rgba, 64, 64);
        let count = concrete
            .borrow()
            .log()
            .iter()
            .filter(|c| matches!(c, crate::testing::DriverCommand::TexImage(..)))
            .count();
        assert_eq!(count, 6);
    }

    #[test]
    fn plane_upload_on_cube_is_rejected() {
        let (concrete, driver) = MockDriver::new_pair();
        let tex = Texture::create_from_format(driver, TextureVariant::Cube, TextureFormat::Rgba, 8, 8);
        let before = concrete.borrow().log().len();
        tex.upload_data(&[0u8; 4], 1, 1, TextureFace::Plane, 0);
        let after = concrete.borrow().log().len();
        assert_eq!(before, after);
    }
}
