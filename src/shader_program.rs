use std::cell::RefCell;
use std::collections::HashMap;
use std::rc::Rc;

use crate::driver::GpuDriver;
use crate::types::Stage;

/// A compiled program of vertex/fragment/optional-geometry stages, with a
/// lazily-populated, name-keyed uniform binding cache.
#[derive(Debug)]
pub struct ShaderProgram {
    driver: Rc<RefCell<dyn GpuDriver>>,
    program_id: u32,
    slots: HashMap<Stage, u32>,
    uniforms: HashMap<String, i32>,
    attribute_names: Vec<String>,
    prepared: bool,
}

impl ShaderProgram {
    pub fn new(driver: Rc<RefCell<dyn GpuDriver>>) -> Self {
        let program_id = driver.borrow_mut().create_program();
        ShaderProgram {
            driver,
            program_id,
            slots: HashMap::new(),
            uniforms: HashMap::new(),
            attribute_names: Vec::new(),
            prepared: false,
        }
    }

    /// Compiles `source` for `stage` and attaches it. A no-op if a slot for
    /// that stage already exists. On compile failure the slot is left empty
    /// and the error is logged.
    pub fn add_slot(&mut self, source: &str, stage: Stage) {
        if self.slots.contains_key(&stage) {
            log::warn!("ShaderProgram::add_slot: {:?} slot already present, ignoring", stage);
            return;
        }
        let mut driver = self.driver.borrow_mut();
        match driver.compile_shader(stage, source) {
            Ok(shader_id) => {
                driver.attach_shader(self.program_id, shader_id);
                self.slots.insert(stage, shader_id);
            }
            Err(err) => {
                log::error!("{err}");
            }
        }
    }

    /// Detaches and removes any existing slot for `stage`, then behaves as
    /// [`ShaderProgram::add_slot`].
    pub fn reload_slot(&mut self, source: &str, stage: Stage) {
        if let Some(shader_id) = self.slots.remove(&stage) {
            let mut driver = self.driver.borrow_mut();
            driver.detach_shader(self.program_id, shader_id);
            driver.delete_shader(shader_id);
        }
        self.prepared = false;
        self.add_slot(source, stage);
    }

    /// Binds vertex attribute names to slot indices `0..n` in order. Must be
    /// called before [`ShaderProgram::compile`] to take effect.
    pub fn set_attributes(&mut self, names: &[&str]) {
        self.attribute_names = names.iter().map(|s| s.to_string()).collect();
    }

    /// Requires both `Vertex` and `Fragment` slots; links and validates.
    /// Sets `prepared` iff both stages are present and linking succeeds.
    pub fn compile(&mut self) -> bool {
        self.prepared = false;
        if !self.slots.contains_key(&Stage::Vertex) || !self.slots.contains_key(&Stage::Fragment) {
            log::error!("ShaderProgram::compile: missing required Vertex or Fragment slot");
            return false;
        }

        let mut driver = self.driver.borrow_mut();
        for (index, name) in self.attribute_names.iter().enumerate() {
            driver.bind_attrib_location(self.program_id, index as u32, name);
        }

        match driver.link_program(self.program_id) {
            Ok(()) => {
                self.prepared = true;
                true
            }
            Err(err) => {
                log::error!("{err}");
                false
            }
        }
    }

    pub fn prepared(&self) -> bool {
        self.prepared
    }

    fn uniform_location(&mut self, name: &str) -> i32 {
        if let Some(&location) = self.uniforms.get(name) {
            return location;
        }
        let location = self.driver.borrow_mut().get_uniform_location(self.program_id, name);
        self.uniforms.insert(name.to_string(), location);
        location
    }

    pub fn set_int(&mut self, name: &str, value: i32) {
        let location = self.uniform_location(name);
        self.driver.borrow_mut().uniform1i(location, value);
    }

    pub fn set_float(&mut self, name: &str, value: f32) {
        let location = self.uniform_location(name);
        self.driver.borrow_mut().uniform1f(location, value);
    }

    pub fn set_float2(&mut self, name: &str, value: [f32; 2]) {
        let location = self.uniform_location(name);
        self.driver.borrow_mut().uniform2f(location, value);
    }

    pub fn set_float3(&mut self, name: &str, value: [f32; 3]) {
        let location = self.uniform_location(name);
        self.driver.borrow_mut().uniform3f(location, value);
    }

    pub fn set_float4(&mut self, name: &str, value: [f32; 4]) {
        let location = self.uniform_location(name);
        self.driver.borrow_mut().uniform4f(location, value);
    }

    pub fn set_matrix4x4(&mut self, name: &str, value: [f32; 16]) {
        let location = self.uniform_location(name);
        self.driver.borrow_mut().uniform_matrix4(location, value);
    }

    /// Activates the program. Invoked internally by
    /// [`crate::Context::set_shader`].
    pub(crate) fn bind(&self) {
        self.driver.borrow_mut().use_program(self.program_id);
    }

    pub(crate) fn gl_id(&self) -> u32 {
        self.program_id
    }
}

impl Drop for ShaderProgram {
    fn drop(&mut self) {
        let mut driver = self.driver.borrow_mut();
        for (_, shader_id) in self.slots.drain() {
            driver.delete_shader(shader_id);
        }
        driver.delete_program(self.program_id);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::MockDriver;

    #[test]
    fn compile_requires_vertex_and_fragment() {
        let (_, driver) = MockDriver::new_pair();
        let mut program = ShaderProgram::new(driver);
        program.add_slot("vertex source", Stage::Vertex);
        assert!(!program.compile());
        assert!(!program.prepared());
    }

    #[test]
    fn compile_succeeds_with_both_stages() {
        let (_, driver) = MockDriver::new_pair();
        let mut program = ShaderProgram::new(driver);
        program.add_slot("vertex source", Stage::Vertex);
        program.add_slot("fragment source", Stage::Fragment);
        assert!(program.compile());
        assert!(program.prepared());
    }

    #[test]
    fn reload_slot_detaches_before_delete() {
        let (concrete, driver) = MockDriver::new_pair();
        let mut program = ShaderProgram::new(driver);
        program.add_slot("vertex source v1", Stage::Vertex);
        let old_id = program.slots[&Stage::Vertex];
        concrete.borrow_mut().clear_log();
        program.reload_slot("vertex source v2", Stage::Vertex);

        let log = concrete.borrow();
        let detach_index = log.log().iter().position(|c| matches!(c, crate::testing::DriverCommand::DetachShader(_, id) if *id == old_id));
        let delete_index = log.log().iter().position(|c| matches!(c, crate::testing::DriverCommand::DeleteShader(id) if *id == old_id));
        assert!(detach_index.is_some() && delete_index.is_some());
        assert!(detach_index.unwrap() < delete_index.unwrap());
    }

    #[test]
    fn duplicate_slot_is_noop() {
        let (concrete, driver) = MockDriver::new_pair();
        let mut program = ShaderProgram::new(driver);
        program.add_slot("a", Stage::Vertex);
        let before = concrete.borrow().log().len();
        program.add_slot("b", Stage::Vertex);
        let after = concrete.borrow().log().len();
        assert_eq!(before, after);
    }

    #[test]
    fn uniform_location_is_cached() {
        let (concrete, driver) = MockDriver::new_pair();
        let mut program = ShaderProgram::new(driver);
        program.add_slot("v", Stage::Vertex);
        program.add_slot("f", Stage::Fragment);
        program.compile();
        program.set_int("u_tex", 0);
        let lookups_after_first =
            concrete.borrow().log().iter().filter(|c| matches!(c, crate::testing::DriverCommand::GetUniformLocation(..))).count();
        program.set_int("u_tex", 1);
        let lookups_after_second =
            concrete.borrow().log().iter().filter(|c| matches!(c, crate::testing::DriverCommand::GetUniformLocation(..))).count();
        assert_eq!(lookups_after_first, lookups_after_second);
    }
}
