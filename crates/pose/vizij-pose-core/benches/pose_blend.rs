//! Repeated blended loads against a cached resolution, the slider-scrub path.
//!
//! Run with: cargo bench -p vizij-pose-core

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use vizij_pose_core::{
    AttrRecord, LoadOptions, MemoryScene, ObjectRecord, PoseEngine, TransferDocument, Value,
};

const CHANNELS: [&str; 9] = [
    "translateX", "translateY", "translateZ", "rotateX", "rotateY", "rotateZ", "scaleX", "scaleY",
    "scaleZ",
];

fn rig(object_count: usize) -> (MemoryScene, TransferDocument) {
    let mut scene = MemoryScene::new();
    let mut pose = TransferDocument::new();
    for i in 0..object_count {
        let name = format!("rig:ctl_{i}");
        scene.add_transform(&name);
        let mut record = ObjectRecord::default();
        for (c, attr) in CHANNELS.iter().enumerate() {
            record.attrs.insert(
                attr.to_string(),
                AttrRecord {
                    type_name: "double".into(),
                    value: Value::Float((i + c) as f64 * 0.5),
                },
            );
        }
        pose.insert_object(name, record);
    }
    (scene, pose)
}

fn bench_cached_load(c: &mut Criterion) {
    let mut group = c.benchmark_group("pose_blend");

    for object_count in [10, 100, 1_000] {
        let (mut scene, pose) = rig(object_count);
        let mut engine = PoseEngine::new(pose);
        let mut opts = LoadOptions::default();
        let _ = engine.load(&mut scene, &opts);

        group.bench_with_input(
            BenchmarkId::new("cached_scrub", object_count),
            &object_count,
            |b, _| {
                let mut tick = 0u32;
                b.iter(|| {
                    tick = (tick + 1) % 100;
                    opts.blend = f64::from(tick);
                    black_box(engine.load(&mut scene, black_box(&opts)).ok())
                });
            },
        );

        group.bench_with_input(
            BenchmarkId::new("resolve_and_load", object_count),
            &object_count,
            |b, _| {
                let uncached = LoadOptions {
                    cache: false,
                    ..LoadOptions::default()
                };
                b.iter(|| black_box(engine.load(&mut scene, &uncached).ok()));
            },
        );
    }
    group.finish();
}

criterion_group!(benches, bench_cached_load);
criterion_main!(benches);
