use criterion::{black_box, criterion_group, criterion_main, BatchSize, Criterion};
use indexmap::IndexMap;
use once_cell::sync::Lazy;
use pulsecal_rs::converter::SerializedInstruction;
use pulsecal_rs::expression::Expression;
use pulsecal_rs::instruction::Channel;
use pulsecal_rs::{CalibrationEntry, DeferredSequenceDefinition};

/// A sequence of alternating phase shifts and delays, each referencing its own parameter.
static SEQUENCE: Lazy<Vec<SerializedInstruction>> = Lazy::new(|| {
    (0..64)
        .flat_map(|index| {
            [
                SerializedInstruction::new("fc", index * 16)
                    .with_channel(Channel::Drive(0))
                    .with_phase(format!("-(theta_{index}) + pi").as_str()),
                SerializedInstruction::new("delay", index * 16)
                    .with_channel(Channel::Drive(0))
                    .with_duration(16.0),
            ]
        })
        .collect()
});

fn defined() -> DeferredSequenceDefinition {
    let mut entry = DeferredSequenceDefinition::new().with_name("bench");
    entry
        .define(SEQUENCE.clone())
        .expect("defining never fails");
    entry
}

fn benchmark_deferred_build(c: &mut Criterion) {
    c.bench_function("deferred_build", |b| {
        b.iter_batched(
            defined,
            |entry| black_box(entry.get_signature().map(|signature| signature.len())),
            BatchSize::SmallInput,
        )
    });
}

fn benchmark_partial_binding(c: &mut Criterion) {
    let entry = defined();
    let values = vec![Expression::from(0.5); 32];
    c.bench_function("partial_binding", |b| {
        b.iter(|| black_box(entry.get_schedule(&values, &IndexMap::new())))
    });
}

criterion_group!(benches, benchmark_deferred_build, benchmark_partial_binding);
criterion_main!(benches);
