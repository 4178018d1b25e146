//! Measures the cost of the conditional-apply fast path: repeated setter
//! calls with an unchanged value should cost little more than the shadow
//! comparison itself.

use criterion::{black_box, criterion_group, criterion_main, Criterion};

use glint_gfx::testing::MockDriver;
use glint_gfx::{BlendMode, Context, CullMode, DepthMode};

fn bench_redundant_cull_mode(c: &mut Criterion) {
    let driver = MockDriver::shared();
    let mut context = Context::with_driver(driver, 1920, 1080, 0);
    context.set_cull_mode(CullMode::Back, false);

    c.bench_function("redundant_set_cull_mode", |b| {
        b.iter(|| {
            context.set_cull_mode(black_box(CullMode::Back), false);
        })
    });
}

fn bench_redundant_blend_mode(c: &mut Criterion) {
    let driver = MockDriver::shared();
    let mut context = Context::with_driver(driver, 1920, 1080, 0);
    context.set_blend_mode(BlendMode::Default, false);

    c.bench_function("redundant_set_blend_mode", |b| {
        b.iter(|| {
            context.set_blend_mode(black_box(BlendMode::Default), false);
        })
    });
}

fn bench_alternating_depth_mode(c: &mut Criterion) {
    let driver = MockDriver::shared();
    let mut context = Context::with_driver(driver, 1920, 1080, 0);
    let modes = [DepthMode::Off, DepthMode::ReadOnly, DepthMode::ReadWrite];

    c.bench_function("alternating_set_depth_mode", |b| {
        let mut i = 0usize;
        b.iter(|| {
            context.set_depth_mode(black_box(modes[i % modes.len()]), false);
            i += 1;
        })
    });
}

criterion_group!(benches, bench_redundant_cull_mode, bench_redundant_blend_mode, bench_alternating_depth_mode);
criterion_main!(benches);
