//! Property tests for the invariants a faithful shadow-state implementation
//! must hold for any input, not just the seed scenarios in
//! `context_scenarios.rs`.

use proptest::prelude::*;

use glint_gfx::testing::{DriverCommand, MockDriver};
use glint_gfx::{AttachmentType, BlendMode, Context, CullMode, DataScalar, DepthMode, TextureFormat, TextureVariant, MAX_ATTRIBUTE_SLOTS};

fn new_context() -> (std::rc::Rc<std::cell::RefCell<MockDriver>>, Context) {
    let (concrete, driver) = MockDriver::new_pair();
    let context = Context::with_driver(driver, 640, 480, 0);
    (concrete, context)
}

fn cull_mode(v: u8) -> CullMode {
    match v % 4 {
        0 => CullMode::None,
        1 => CullMode::Front,
        2 => CullMode::Back,
        _ => CullMode::FrontAndBack,
    }
}

fn blend_mode(v: u8) -> BlendMode {
    if v % 2 == 0 {
        BlendMode::None
    } else {
        BlendMode::Default
    }
}

fn depth_mode(v: u8) -> DepthMode {
    match v % 3 {
        0 => DepthMode::Off,
        1 => DepthMode::ReadOnly,
        _ => DepthMode::ReadWrite,
    }
}

proptest! {
    /// P1: repeating the same setter call never emits more than one driver
    /// command for the underlying mode toggle.
    #[test]
    fn p1_redundant_sets_are_elided(mode in any::<u8>(), repeats in 1usize..8) {
        let (concrete, mut context) = new_context();
        let mode = cull_mode(mode);
        concrete.borrow_mut().clear_log();
        for _ in 0..repeats {
            context.set_cull_mode(mode, false);
        }
        let toggles = concrete.borrow().log().iter().filter(|c| matches!(c, DriverCommand::SetCullEnabled(_))).count();
        prop_assert!(toggles <= 1);
    }

    /// P2: after restore, the shadow equals the state at the moment of save,
    /// regardless of what happened in between.
    #[test]
    fn p2_save_restore_identity(
        a_cull in any::<u8>(), a_blend in any::<u8>(), a_depth in any::<u8>(),
        b_cull in any::<u8>(), b_blend in any::<u8>(), b_depth in any::<u8>(),
    ) {
        let (_, mut context) = new_context();
        context.set_cull_mode(cull_mode(a_cull), false);
        context.set_blend_mode(blend_mode(a_blend), false);
        context.set_depth_mode(depth_mode(a_depth), false);
        context.save_state();

        context.set_cull_mode(cull_mode(b_cull), false);
        context.set_blend_mode(blend_mode(b_blend), false);
        context.set_depth_mode(depth_mode(b_depth), false);
        context.restore_state();

        prop_assert_eq!(context.shadow_cull_mode(), cull_mode(a_cull));
        prop_assert_eq!(context.shadow_blend_mode(), blend_mode(a_blend));
        prop_assert_eq!(context.shadow_depth_mode(), depth_mode(a_depth));
    }

    /// P3: after FrameBegin, the default target, no shader, no vertex data,
    /// and an empty texture bind table hold regardless of prior state.
    #[test]
    fn p3_frame_begin_resets_to_baseline(slot in 0u32..31, bind_shader in any::<bool>(), bind_vertex in any::<bool>()) {
        let (_, mut context) = new_context();
        let texture = context.create_texture(TextureVariant::Plane2D, TextureFormat::Rgba, 4, 4);
        context.bind_textures(&[glint_gfx::TextureBinding { slot, texture: &texture, uniform_name: None }]);
        if bind_shader {
            let program = context.create_shader_program();
            context.set_shader(Some(&program), false);
        }
        if bind_vertex {
            let vd = context.create_vertex_data();
            context.set_vertex_data(Some(&vd), false);
        }

        context.frame_begin();

        prop_assert_eq!(context.shadow_shader(), None);
        prop_assert_eq!(context.shadow_vertex_data(), None);
        prop_assert_eq!(context.shadow_render_target(), 0);
        prop_assert!(!context.texture_bind_table_is_set(slot, TextureVariant::Plane2D));
    }

    /// P4: at most MAX_ATTRIBUTE_SLOTS descriptors ever get a slot assigned.
    #[test]
    fn p4_attribute_slot_cap(k in 0usize..40) {
        let (_, context) = new_context();
        let mut vd = context.create_vertex_data();
        vd.add_stream("pos", false);
        for _ in 0..k {
            vd.add_descriptor("pos", 3, DataScalar::Float, 12, 0, 0);
        }
        prop_assert_eq!(vd.slot_count() as usize, k.min(MAX_ATTRIBUTE_SLOTS));
    }

    /// P5: a render target never holds two depth or two stencil slots, and
    /// never more than MAX_COLOR_ATTACHMENTS color slots.
    #[test]
    fn p5_attachment_cardinality(depth_attempts in 0usize..4, stencil_attempts in 0usize..4, color_attempts in 0usize..16) {
        let (_, context) = new_context();
        let mut target = context.create_render_target(32, 32);
        for i in 0..depth_attempts {
            target.add_slot_with_format(&format!("d{i}"), AttachmentType::Depth, TextureFormat::Depth24);
        }
        for i in 0..stencil_attempts {
            target.add_slot_with_format(&format!("s{i}"), AttachmentType::Stencil, TextureFormat::Depth24);
        }
        for i in 0..color_attempts {
            target.add_slot_with_format(&format!("c{i}"), AttachmentType::Color, TextureFormat::Rgba);
        }
        prop_assert_eq!(target.get_slot_by_type(AttachmentType::Depth).is_some(), depth_attempts > 0);
        prop_assert_eq!(target.get_slot_by_type(AttachmentType::Stencil).is_some(), stencil_attempts > 0);
    }
}
