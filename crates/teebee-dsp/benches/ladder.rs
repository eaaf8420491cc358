use criterion::{black_box, criterion_group, criterion_main, Criterion};
use teebee_dsp::{FilterCore, FilterMode, LinearSmoother};

fn bench_ladder(c: &mut Criterion) {
    let input: Vec<f32> = (0..512).map(|n| ((n as f32) * 0.031).sin() * 0.7).collect();
    for mode in [FilterMode::Tb303, FilterMode::LowPass24] {
        let mut filter = FilterCore::new();
        filter.set_sample_rate(48_000.0);
        filter.set_mode(mode);
        filter.set_resonance(0.8);
        c.bench_function(&format!("ladder {} x512", mode.label()), |b| {
            b.iter(|| {
                let mut acc = 0.0f32;
                for &x in &input {
                    acc += filter.process_sample(black_box(x));
                }
                acc
            })
        });
    }
}

fn bench_modulated_ladder(c: &mut Criterion) {
    let mut filter = FilterCore::new();
    filter.set_sample_rate(48_000.0);
    let mut cutoff = LinearSmoother::new(200.0);
    cutoff.reset(48_000.0, 0.001);
    c.bench_function("ladder TB-303 x512 cutoff ramp", |b| {
        b.iter(|| {
            cutoff.set_target(if cutoff.target() > 1_000.0 { 200.0 } else { 5_000.0 });
            let mut acc = 0.0f32;
            for n in 0..512 {
                filter.set_cutoff(cutoff.next_value());
                acc += filter.process_sample(black_box(if n % 64 == 0 { 1.0 } else { 0.0 }));
            }
            acc
        })
    });
}

criterion_group!(benches, bench_ladder, bench_modulated_ladder);
criterion_main!(benches);
