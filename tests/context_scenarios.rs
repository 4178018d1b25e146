//! End-to-end scenarios exercising `Context` against a `MockDriver`, per
//! the concrete seeds enumerated alongside the property tests this crate
//! implements.

use std::cell::RefCell;
use std::rc::Rc;

use glint_gfx::testing::{DriverCommand, MockDriver};
use glint_gfx::{AttachmentType, BlendMode, Context, CullMode, RenderTarget, Stage, TextureBinding, TextureFace, TextureFormat, TextureVariant};

fn new_context() -> (Rc<RefCell<MockDriver>>, Context) {
    let (concrete, driver) = MockDriver::new_pair();
    let context = Context::with_driver(driver, 800, 600, 0);
    (concrete, context)
}

#[test]
fn cold_start_depth() {
    let (concrete, _context) = new_context();
    let log = concrete.borrow();
    assert!(log.log().contains(&DriverCommand::SetDepthTestEnabled(true)));
    assert!(log.log().contains(&DriverCommand::SetDepthMask(true)));
    assert!(!log.log().contains(&DriverCommand::SetCullEnabled(true)));
    assert!(!log.log().contains(&DriverCommand::SetBlendEnabled(true)));
}

#[test]
fn elide_duplicate_shader_binds() {
    let (concrete, mut context) = new_context();
    let program = context.create_shader_program();
    concrete.borrow_mut().clear_log();
    context.set_shader(Some(&program), false);
    context.set_shader(Some(&program), false);
    context.set_shader(Some(&program), false);
    let uses = concrete
        .borrow()
        .log()
        .iter()
        .filter(|c| matches!(c, DriverCommand::UseProgram(_)))
        .count();
    assert_eq!(uses, 1);
}

#[test]
fn save_restore_nesting() {
    let (concrete, mut context) = new_context();
    context.set_cull_mode(CullMode::Back, false);
    context.set_blend_mode(BlendMode::Default, false);
    concrete.borrow_mut().clear_log();

    context.save_state();
    context.set_cull_mode(CullMode::Front, false);
    context.set_blend_mode(BlendMode::None, false);
    context.restore_state();

    // The final two driver calls must reapply Back/Default.
    let log = concrete.borrow();
    assert!(log.log().contains(&DriverCommand::SetCullFace(CullMode::Back)));
    assert!(log.log().contains(&DriverCommand::SetBlendEnabled(true)));
}

#[test]
fn cube_attachment_binds_correct_face() {
    let (concrete, context) = new_context();
    let mut target = context.create_render_target(256, 256);
    let cube = Rc::new(context.create_texture(TextureVariant::Cube, TextureFormat::Rgba, 256, 256));
    concrete.borrow_mut().clear_log();
    target.add_slot_with_texture("env", AttachmentType::Color, cube, TextureFace::PlusZ, 0);

    let log = concrete.borrow();
    assert!(log.log().iter().any(|c| matches!(
        c,
        DriverCommand::FramebufferTexture(AttachmentType::Color, 0, _, TextureVariant::Cube, TextureFace::PlusZ, 0)
    )));
}

#[test]
fn frame_begin_clears_sticky_state() {
    let (concrete, mut context) = new_context();
    let program = context.create_shader_program();
    let vertex_data = context.create_vertex_data();
    let texture = context.create_texture(TextureVariant::Plane2D, TextureFormat::Rgba, 4, 4);
    let other_target = Rc::new(RefCell::new(context.create_render_target(64, 64)));

    context.bind_textures(&[TextureBinding { slot: 3, texture: &texture, uniform_name: None }]);
    context.set_shader(Some(&program), false);
    context.set_vertex_data(Some(&vertex_data), false);
    context.set_render_target(&other_target, false);

    concrete.borrow_mut().clear_log();
    context.frame_begin();

    let log = concrete.borrow();
    assert!(log.log().iter().any(|c| matches!(c, DriverCommand::UnbindTexture(3, TextureVariant::Plane2D))));
    assert!(log.log().contains(&DriverCommand::UseProgram(0)));
    assert!(log.log().contains(&DriverCommand::BindVertexArray(0)));
    assert!(log.log().iter().any(|c| matches!(c, DriverCommand::SetViewport(0, 0, 800, 600))));
}

#[test]
fn copy_restores_bound_target() {
    let (concrete, context) = new_context();
    let source = context.create_render_target(128, 128);
    let dest = context.create_render_target(64, 64);
    concrete.borrow_mut().clear_log();

    source.copy(&dest, AttachmentType::Color);

    let log = concrete.borrow();
    assert!(log.log().iter().any(|c| matches!(c, DriverCommand::BlitFramebuffer(_, _, AttachmentType::Color))));
    // The source target must be rebound (and its viewport reapplied) afterward.
    let last_two: Vec<_> = log.log().iter().rev().take(2).collect();
    assert!(last_two.iter().any(|c| matches!(c, DriverCommand::SetViewport(0, 0, 128, 128))));
}

#[test]
fn shader_compile_requires_both_stages() {
    let (_, context) = new_context();
    let mut program = context.create_shader_program();
    program.add_slot("vertex source", Stage::Vertex);
    assert!(!program.compile());
    program.add_slot("fragment source", Stage::Fragment);
    assert!(program.compile());
}

#[test]
fn shader_compile_failure_leaves_program_unprepared() {
    let (concrete, context) = new_context();
    let mut program = context.create_shader_program();
    concrete.borrow_mut().fail_next_compile();
    program.add_slot("broken vertex source", Stage::Vertex);
    program.add_slot("fragment source", Stage::Fragment);
    assert!(!program.compile());
    assert!(!program.prepared());
}
