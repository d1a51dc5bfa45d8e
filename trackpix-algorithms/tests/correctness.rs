#![allow(
    clippy::uninlined_format_args,
    clippy::cast_possible_truncation,
    clippy::float_cmp,
    clippy::unreadable_literal
)]
use approx::assert_relative_eq;
use trackpix_algorithms::{
    calc_cluster_properties, create_measurement, parallel_sparse_ccl, sparse_ccl,
    Clusterizer, DbscanGowerClustering, DbscanParams, MeasurementCreation, SparseCclClustering,
    NOISE,
};
use trackpix_core::ordering::sort_cells;
use trackpix_core::{
    Cell, CellCollection, ClusterCollection, ClusteringConfig, Connectivity,
    DetectorDescription, IdentitySignal, ModuleDescription,
};

/// Deterministic pseudo-random sorted cells on a few small modules.
fn generate_cells(seed: u64, n: usize, modules: u32, extent: u32) -> CellCollection {
    let mut rng_seed = seed;
    let mut rand = || {
        rng_seed = (rng_seed.wrapping_mul(1103515245).wrapping_add(12345)) & 0x7fffffff;
        rng_seed as u32
    };
    let mut cells: CellCollection = (0..n)
        .map(|_| {
            let module = rand() % modules;
            let ch0 = rand() % extent;
            let ch1 = rand() % extent;
            let activation = f64::from(rand() % 16 + 1);
            Cell::new(module, ch0, ch1, activation)
        })
        .collect();
    sort_cells(&mut cells);
    cells
}

/// Connected components by exhaustive pairwise comparison.
fn reference_labels(cells: &CellCollection, connectivity: Connectivity) -> Vec<usize> {
    let n = cells.len();
    let mut labels = vec![usize::MAX; n];
    let mut next = 0;
    for start in 0..n {
        if labels[start] != usize::MAX {
            continue;
        }
        labels[start] = next;
        let mut stack = vec![start];
        while let Some(i) = stack.pop() {
            for j in 0..n {
                if labels[j] == usize::MAX && connectivity.is_adjacent(&cells.get(i), &cells.get(j))
                {
                    labels[j] = next;
                    stack.push(j);
                }
            }
        }
        next += 1;
    }
    labels
}

fn assert_same_partition(a: &[u32], b: &[usize]) {
    assert_eq!(a.len(), b.len());
    for i in 0..a.len() {
        for j in (i + 1)..a.len() {
            assert_eq!(
                a[i] == a[j],
                b[i] == b[j],
                "cells {} and {} disagree on cluster membership",
                i,
                j
            );
        }
    }
}

fn unit_detector(modules: u64) -> DetectorDescription {
    DetectorDescription::new(
        (0..modules)
            .map(|id| ModuleDescription::new(100 + id).with_reference(-0.5, -0.5))
            .collect(),
    )
    .unwrap()
}

#[test]
fn test_scenario_strip_clusters() {
    let cells: CellCollection = [1, 2, 5]
        .into_iter()
        .map(|ch0| Cell::new(0, ch0, 0, 1.0))
        .collect();
    let clusters = SparseCclClustering::new(Connectivity::Strip1D)
        .cluster(&cells)
        .unwrap();
    assert_eq!(clusters.cell_indices, vec![vec![0, 1], vec![2]]);
}

#[test]
#[should_panic(expected = "no cell above threshold")]
fn test_scenario_sub_threshold_cluster_panics() {
    let detector = DetectorDescription::new(vec![ModuleDescription::new(1).with_threshold(5.0)])
        .unwrap();
    let cells: CellCollection = std::iter::once(Cell::new(0, 3, 3, 2.0)).collect();
    let _ = create_measurement(&[0], &cells, &detector, &IdentitySignal, 0);
}

#[test]
fn test_scenario_density_noise() {
    let features = vec![vec![0.0, 0.0], vec![0.05, 0.05], vec![10.0, 10.0]];
    let labels = DbscanGowerClustering::new(DbscanParams {
        eps: 0.3,
        min_pts: 2,
    })
    .cluster(&features)
    .unwrap();
    assert_eq!(labels, vec![1, 1, NOISE]);
}

#[test]
fn test_scenario_equal_weights() {
    let detector = unit_detector(1);
    let cells: CellCollection = (0..3).map(|ch0| Cell::new(0, ch0, 0, 1.0)).collect();
    let props =
        calc_cluster_properties(&[0, 1, 2], &cells, detector.get(0).unwrap(), &IdentitySignal);
    assert_relative_eq!(props.mean[0], 1.0, epsilon = 1e-12);
    assert_relative_eq!(props.mean[1], 0.0, epsilon = 1e-12);
    assert_relative_eq!(props.variance[0], 2.0 / 3.0, epsilon = 1e-12);
    assert_relative_eq!(props.variance[1], 0.0, epsilon = 1e-12);
}

#[test]
fn test_labels_match_reference_components() {
    for (seed, connectivity) in [
        (1, Connectivity::Pixel2D),
        (2, Connectivity::Pixel2D),
        (3, Connectivity::Strip1D),
        (4, Connectivity::Strip1D),
    ] {
        let cells = generate_cells(seed, 300, 3, 24);
        let mut labels = vec![0; cells.len()];
        let n = sparse_ccl(&cells, connectivity, &mut labels).unwrap();
        let reference = reference_labels(&cells, connectivity);

        assert_same_partition(&labels, &reference);
        assert_eq!(n, reference.iter().max().map_or(0, |&m| m + 1));

        // Dense and numbered in order of first appearance.
        let mut next = 0;
        for &label in &labels {
            assert!(label <= next, "label {} skips ahead of {}", label, next);
            if label == next {
                next += 1;
            }
        }
        assert_eq!(next as usize, n);
    }
}

#[test]
fn test_relabeling_a_cluster_keeps_it_whole() {
    for connectivity in [Connectivity::Pixel2D, Connectivity::Strip1D] {
        let cells = generate_cells(7, 500, 2, 40);
        let clusters = SparseCclClustering::new(connectivity).cluster(&cells).unwrap();
        assert!(clusters.len() > 1);

        for parallel in [false, true] {
            let algo = SparseCclClustering::new(connectivity).with_parallel(parallel);
            for cluster in clusters.iter() {
                // Cluster members are listed in input order, so the subset stays sorted.
                let subset = cells.select(cluster);
                let (labels, n) = algo.label(&subset).unwrap();
                assert_eq!(n, 1, "{:?} cluster of {} cells split", connectivity, cluster.len());
                assert!(labels.iter().all(|&l| l == 0));
            }
        }
    }
}

#[test]
fn test_parallel_matches_sequential() {
    for seed in 10..14 {
        for connectivity in [Connectivity::Strip1D, Connectivity::Pixel2D] {
            let cells = generate_cells(seed, 5_000, 4, 64);
            let mut sequential = vec![0; cells.len()];
            let mut parallel = vec![0; cells.len()];
            let n_seq = sparse_ccl(&cells, connectivity, &mut sequential).unwrap();
            let n_par = parallel_sparse_ccl(&cells, connectivity, &mut parallel).unwrap();
            assert_eq!(n_seq, n_par, "seed {} {:?}", seed, connectivity);
            assert_eq!(sequential, parallel, "seed {} {:?}", seed, connectivity);
        }
    }
}

#[test]
fn test_mean_is_permutation_invariant() {
    let detector = unit_detector(1);
    let cells: CellCollection = [(3, 4, 2.0), (4, 4, 7.5), (4, 5, 1.25), (5, 6, 3.0)]
        .into_iter()
        .map(|(c0, c1, a)| Cell::new(0, c0, c1, a))
        .collect();
    let module = detector.get(0).unwrap();
    let forward = calc_cluster_properties(&[0, 1, 2, 3], &cells, module, &IdentitySignal);
    let reversed = calc_cluster_properties(&[3, 2, 1, 0], &cells, module, &IdentitySignal);
    let shuffled = calc_cluster_properties(&[2, 0, 3, 1], &cells, module, &IdentitySignal);

    for other in [reversed, shuffled] {
        for axis in 0..2 {
            assert_relative_eq!(forward.mean[axis], other.mean[axis], epsilon = 1e-12);
            assert_relative_eq!(forward.variance[axis], other.variance[axis], epsilon = 1e-12);
        }
    }
}

#[test]
fn test_mean_is_offset_invariant() {
    let cells: CellCollection = [(0, 0, 1.0), (1, 0, 2.0), (2, 1, 1.0)]
        .into_iter()
        .map(|(c0, c1, a)| Cell::new(0, c0, c1, a))
        .collect();
    let near = ModuleDescription::new(1);
    let far = ModuleDescription::new(1).with_reference(1.0e6, -2.5e6);

    let a = calc_cluster_properties(&[0, 1, 2], &cells, &near, &IdentitySignal);
    let b = calc_cluster_properties(&[0, 1, 2], &cells, &far, &IdentitySignal);
    assert_relative_eq!(b.mean[0] - 1.0e6, a.mean[0], epsilon = 1e-6);
    assert_relative_eq!(b.mean[1] + 2.5e6, a.mean[1], epsilon = 1e-6);
    assert_relative_eq!(a.variance[0], b.variance[0], epsilon = 1e-9);
    assert_relative_eq!(a.variance[1], b.variance[1], epsilon = 1e-9);
}

#[test]
fn test_total_weight_is_exact_sum_above_threshold() {
    let module = ModuleDescription::new(1).with_threshold(4.0);
    let cells = generate_cells(21, 200, 1, 1000);
    let cluster: Vec<usize> = (0..cells.len()).collect();
    let props = calc_cluster_properties(&cluster, &cells, &module, &IdentitySignal);

    let expected: f64 = cells.activation.iter().filter(|&&a| a > 4.0).sum();
    let count = cells.activation.iter().filter(|&&a| a > 4.0).count();
    assert_eq!(props.total_weight, expected);
    assert_eq!(props.cells, count);
}

#[test]
fn test_full_chain_on_two_modules() {
    let detector = unit_detector(2);
    let mut cells = CellCollection::new();
    // Module 0: a 2x2 block; module 1: two separate strips of pixels.
    for (c0, c1) in [(10, 10), (10, 11), (11, 10), (11, 11)] {
        cells.push(Cell::new(0, c0, c1, 1.0));
    }
    for (c0, c1) in [(0, 0), (1, 0), (7, 3)] {
        cells.push(Cell::new(1, c0, c1, 2.0));
    }

    for parallel in [false, true] {
        let config = ClusteringConfig::default().with_parallel(parallel);
        let out = Clusterizer::new(config).unwrap().run(&cells, &detector).unwrap();
        assert_eq!(out.measurements.len(), 3);
        assert_eq!(out.labels, vec![0, 0, 0, 0, 1, 1, 2]);

        let m = &out.measurements[0];
        assert_eq!(m.surface_link, 100);
        assert_relative_eq!(m.x(), 10.5, epsilon = 1e-12);
        assert_relative_eq!(m.y(), 10.5, epsilon = 1e-12);
        assert_relative_eq!(m.variance[0], 0.25 + 1.0 / 12.0, epsilon = 1e-12);

        assert_eq!(out.measurements[1].surface_link, 101);
        assert_relative_eq!(out.measurements[1].x(), 0.5, epsilon = 1e-12);
        assert_eq!(out.measurements[2].cluster_size, 1);
        assert!(out
            .measurements
            .iter()
            .enumerate()
            .all(|(i, m)| m.measurement_id == i));
    }
}

#[test]
fn test_density_and_ccl_agree_on_compact_clusters() {
    let detector = unit_detector(1);
    let mut cells = CellCollection::new();
    for origin in [0u32, 20, 40] {
        for c0 in origin..origin + 3 {
            for c1 in 0..3 {
                cells.push(Cell::new(0, c0, c1, 1.0));
            }
        }
    }

    let ccl = Clusterizer::new(ClusteringConfig::default())
        .unwrap()
        .run(&cells, &detector)
        .unwrap();
    let density = Clusterizer::new(ClusteringConfig::default().with_density_clustering(true))
        .unwrap()
        .run(&cells, &detector)
        .unwrap();

    assert_eq!(ccl.clusters, density.clusters);
    assert_eq!(ccl.measurements, density.measurements);
}

#[test]
fn test_invalid_configs_rejected() {
    assert!(Clusterizer::new(ClusteringConfig::default().with_min_pts(0)).is_err());
    assert!(Clusterizer::new(ClusteringConfig::default().with_eps(-0.1)).is_err());
    assert!(Clusterizer::new(ClusteringConfig::default().with_eps(f64::NAN)).is_err());
    assert!(Clusterizer::new(ClusteringConfig::default().with_eps(0.0)).is_ok());
}

#[test]
fn test_reducer_on_labeled_clusters() {
    let detector = unit_detector(3);
    let cells = generate_cells(33, 1_000, 3, 50);
    let clusters: ClusterCollection = SparseCclClustering::default().cluster(&cells).unwrap();
    let measurements = MeasurementCreation::new()
        .with_parallel(true)
        .create(&cells, &clusters, &detector)
        .unwrap();

    assert_eq!(measurements.len(), clusters.len());
    for (m, cluster) in measurements.iter().zip(clusters.iter()) {
        assert_eq!(m.cluster_size, cluster.len());
        assert_eq!(m.module_index, cells.module_index[cluster[0]]);
        assert!(m.variance[0] >= 1.0 / 12.0 - 1e-12);
    }
}
