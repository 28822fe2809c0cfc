//! Criterion benchmarks for the patch graph (`patchbay-core`).
//!
//! Measures engine overhead with trivial object kinds. Two axes:
//!
//! - **Fan-out** - one `send` through an outlet with N receivers
//! - **DSP** - compile and `tick` for chains of signal nodes at varying block sizes
//!
//! Run with: `cargo bench -p patchbay-core -- graph/`
#![allow(missing_docs)]

#[path = "../tests/common/mod.rs"]
mod common;

use std::hint::black_box;
use std::sync::Arc;

use common::{create, setup};
use criterion::{BenchmarkId, Criterion, criterion_group, criterion_main};
use patchbay_core::{DspContext, Element, Page};

const SAMPLE_RATE: u32 = 48_000;
const BLOCK_SIZES: &[usize] = &[64, 256, 1024];

/// `t.const~ -> t.mix~ -> ... -> t.probe~`
fn signal_chain(length: usize) -> Arc<Page> {
    let page = Page::new();
    let mut previous = create(&page, "t.const~ 0.5");
    for _ in 0..length {
        let next = create(&page, "t.mix~");
        page.connect(&previous, 0, &next, 1);
        previous = next;
    }
    let probe = create(&page, "t.probe~");
    page.connect(&previous, 0, &probe, 0);
    page
}

fn bench_fan_out(c: &mut Criterion) {
    setup();
    let mut group = c.benchmark_group("graph/fan_out");
    for &receivers in &[1usize, 8, 64] {
        let page = Page::new();
        let source = create(&page, "t.source");
        for _ in 0..receivers {
            let sink = create(&page, "t.bouncer");
            page.connect(&source, 0, &sink, 0);
        }
        let message = [Element::from(1), Element::from(0.5)];
        group.bench_with_input(
            BenchmarkId::from_parameter(receivers),
            &receivers,
            |b, _| b.iter(|| source.send(0, black_box(&message))),
        );
    }
    group.finish();
}

fn bench_compile(c: &mut Criterion) {
    setup();
    let mut group = c.benchmark_group("graph/compile");
    for &length in &[4usize, 32, 128] {
        let page = signal_chain(length);
        let boxes = page.boxes();
        let links = page.links();
        group.bench_with_input(BenchmarkId::from_parameter(length), &length, |b, _| {
            b.iter(|| DspContext::compile(SAMPLE_RATE, 256, black_box(&boxes), &links));
        });
    }
    group.finish();
}

fn bench_tick(c: &mut Criterion) {
    setup();
    let mut group = c.benchmark_group("graph/tick");
    for &block_size in BLOCK_SIZES {
        let page = signal_chain(16);
        page.start_dsp(SAMPLE_RATE, block_size);
        group.bench_with_input(
            BenchmarkId::from_parameter(block_size),
            &block_size,
            |b, _| b.iter(|| page.tick_dsp()),
        );
        page.stop_dsp();
    }
    group.finish();
}

criterion_group!(benches, bench_fan_out, bench_compile, bench_tick);
criterion_main!(benches);
