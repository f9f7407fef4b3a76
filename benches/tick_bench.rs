use criterion::{criterion_group, criterion_main, BatchSize, Criterion};
use gridlife::{Simulation, SimulationConfig};
use std::time::Duration;

fn bench_config(agents_per_type: usize) -> SimulationConfig {
    let mut config = SimulationConfig::with_agent_types(2);
    config.seed = 0xBEEF;
    config.environment.width = 100;
    config.environment.height = 100;
    for agents in &mut config.agents {
        agents.initial_count = agents_per_type;
    }
    for disease in &mut config.disease {
        disease.initial_infection = 0.1;
    }
    config.production[0].production_mode = true;
    config
}

fn bench_ticks(c: &mut Criterion) {
    let mut group = c.benchmark_group("tick");
    group.sample_size(20);
    group.measurement_time(Duration::from_secs(5));

    // Ticks per bench iteration (override via GRIDLIFE_BENCH_TICKS)
    let ticks: u64 = std::env::var("GRIDLIFE_BENCH_TICKS")
        .ok()
        .and_then(|s| s.parse::<u64>().ok())
        .filter(|v| *v > 0)
        .unwrap_or(50);

    for agents in [50usize, 250, 1000] {
        group.bench_function(format!("ticks{}_agents{}", ticks, agents * 2), |b| {
            b.iter_batched(
                || Simulation::new(bench_config(agents)).expect("valid bench config"),
                |mut sim| {
                    sim.run(ticks).expect("tick");
                    sim
                },
                BatchSize::LargeInput,
            )
        });
    }
    group.finish();
}

criterion_group!(benches, bench_ticks);
criterion_main!(benches);
