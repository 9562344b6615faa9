//! Benchmark: EIT forward solve scaling
//!
//! Measures how the forward model scales with mesh refinement for a
//! 16-electrode adjacent protocol:
//! 1. Element stiffness computation
//! 2. Full `solve_eit` (lead fields, voltages, Jacobian)
//!
//! Run with:
//!   cargo bench -p math-eit-fem --bench forward_scaling
//!
//! Thread scaling:
//!   RAYON_NUM_THREADS=1 cargo bench -p math-eit-fem --bench forward_scaling
//!   RAYON_NUM_THREADS=4 cargo bench -p math-eit-fem --bench forward_scaling

use criterion::{BenchmarkId, Criterion, Throughput, black_box, criterion_group, criterion_main};
use math_eit_fem::{Forward, MeasurementParser, Protocol, StimulationPattern, compute_ke};
use math_eit_mesh::layer_circle;
use std::time::Duration;

const N_EL: usize = 16;

fn bench_element_stiffness(c: &mut Criterion) {
    let mut group = c.benchmark_group("element_stiffness");
    group.warm_up_time(Duration::from_secs(1));
    group.measurement_time(Duration::from_secs(3));

    for &n_layer in &[4, 8, 12, 16] {
        let Ok((mesh, _)) = layer_circle(N_EL, 8, n_layer) else {
            continue;
        };
        group.throughput(Throughput::Elements(mesh.num_elements() as u64));
        group.bench_with_input(BenchmarkId::new("layers", n_layer), &mesh, |b, mesh| {
            b.iter(|| black_box(compute_ke(mesh)));
        });
    }

    group.finish();
}

fn bench_solve_eit(c: &mut Criterion) {
    let mut group = c.benchmark_group("solve_eit");
    group.warm_up_time(Duration::from_secs(2));
    group.measurement_time(Duration::from_secs(8));
    group.sample_size(10);

    let Ok(pattern) = StimulationPattern::adjacent(N_EL) else {
        return;
    };
    let Ok(protocol) = Protocol::new(pattern, N_EL, 1, MeasurementParser::Std) else {
        return;
    };

    for &n_layer in &[4, 8, 12] {
        let Ok((mesh, electrodes)) = layer_circle(N_EL, 8, n_layer) else {
            continue;
        };
        let Ok(fwd) = Forward::new(&mesh, &electrodes) else {
            continue;
        };
        println!(
            "layers={n_layer}: {} nodes, {} elements",
            mesh.num_nodes(),
            mesh.num_elements()
        );
        group.throughput(Throughput::Elements(mesh.num_elements() as u64));
        group.bench_with_input(BenchmarkId::new("layers", n_layer), &mesh, |b, mesh| {
            b.iter(|| black_box(fwd.solve_eit(&protocol, &mesh.perm)));
        });
    }

    group.finish();
}

criterion_group!(benches, bench_element_stiffness, bench_solve_eit);
criterion_main!(benches);
