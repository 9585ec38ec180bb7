use criterion::{BatchSize, Criterion, criterion_group, criterion_main};
use std::time::Duration;
use terraspiel_core::{World, WorldConfig, assets};

fn bench_world_ticks(c: &mut Criterion) {
    let mut group = c.benchmark_group("world_tick");
    group.sample_size(30);
    group.warm_up_time(Duration::from_secs(2));
    group.measurement_time(Duration::from_secs(8));

    for &fill in &[0.15_f64, 0.45] {
        group.bench_function(format!("ticks64_fill{}", (fill * 100.0) as u32), |b| {
            b.iter_batched(
                || {
                    let registry = assets::default_elements().expect("elements");
                    let rules = assets::default_rules(&registry).expect("rules");
                    let config = WorldConfig {
                        width: 192,
                        height: 128,
                        rng_seed: Some(0xBEEF),
                    };
                    let mut world = World::new(config, registry, rules).expect("world");
                    let picks = ["SAND", "SOIL", "WATER", "CLOUD", "PLANT", "OIL"];
                    let cells = (192.0 * 128.0 * fill) as usize;
                    for index in 0..cells {
                        let x = (index * 13) as i32 % 192;
                        let y = (index * 29) as i32 % 128;
                        let name = picks[index % picks.len()];
                        let _ = world.place(x, y, name);
                    }
                    world
                },
                |mut world| {
                    for _ in 0..64 {
                        world.tick();
                    }
                },
                BatchSize::LargeInput,
            );
        });
    }
    group.finish();
}

criterion_group!(benches, bench_world_ticks);
criterion_main!(benches);
