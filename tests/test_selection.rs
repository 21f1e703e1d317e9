mod common;
use common::sines;
use ndarray::{array, Array2};
use neuro_ts::service::select::{average_linkage, select_greater_values};
use neuro_ts::{ErrorKind, GroupClustering, Key, MetricThreshold, TimeseriesService};

fn svc() -> TimeseriesService {
    TimeseriesService::new()
}

// ── Thresholds ────────────────────────────────────────────────────────────────

#[test]
fn metric_threshold_variants() {
    let ts = sines(100, &[5.0, 5.0, 5.0, 5.0]);
    let metric = [0.2, 0.9, 0.1, 0.8];

    let (sub, idx) = svc().select_by_metric(&ts, &metric, MetricThreshold::threshold(0.5)).unwrap();
    assert_eq!(idx, vec![1, 3]);
    assert_eq!(sub.space_labels(), &["ch1".to_string(), "ch3".to_string()]);

    let (_, idx) = svc().select_by_metric(&ts, &metric, MetricThreshold::percentile(50.0)).unwrap();
    assert_eq!(idx, vec![1, 3]);

    let (_, idx) = svc().select_by_metric(&ts, &metric, MetricThreshold::count(1)).unwrap();
    assert_eq!(idx, vec![1]);

    let err = svc().select_by_metric(&ts, &metric[..3], MetricThreshold::count(1)).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Value);
}

#[test]
fn nothing_above_threshold_is_an_error() {
    let ts = sines(100, &[5.0, 5.0]);
    let err = svc().select_by_metric(&ts, &[0.1, 0.2], MetricThreshold::threshold(1.0)).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Value);
}

#[test]
fn power_is_recomputed_when_missing_or_mis_sized() {
    let ts = sines(1000, &[10.0, 10.0, 10.0]);
    let (_, given) = svc().select_by_power(&ts, Some(&[9.0, 1.0, 1.0][..]), MetricThreshold::count(1)).unwrap();
    assert_eq!(given, vec![0]);
    let (_, recomputed) = svc().select_by_power(&ts, Some(&[9.0][..]), MetricThreshold::count(1)).unwrap();
    assert_eq!(recomputed, vec![2]);
}

#[test]
fn sorted_unique_indices() {
    let sel = select_greater_values(&[3.0, 1.0, 5.0, 4.0], MetricThreshold::count(3));
    assert_eq!(sel, vec![0, 2, 3]);
}

// ── Clustering ────────────────────────────────────────────────────────────────

fn block_distance() -> Array2<f64> {
    array![
        [0.0, 0.1, 0.1, 0.9, 0.9, 0.9],
        [0.1, 0.0, 0.1, 0.9, 0.9, 0.9],
        [0.1, 0.1, 0.0, 0.9, 0.9, 0.9],
        [0.9, 0.9, 0.9, 0.0, 0.2, 0.2],
        [0.9, 0.9, 0.9, 0.2, 0.0, 0.2],
        [0.9, 0.9, 0.9, 0.2, 0.2, 0.0],
    ]
}

#[test]
fn linkage_finds_blocks() {
    assert_eq!(average_linkage(&block_distance(), 2), vec![vec![0, 1, 2], vec![3, 4, 5]]);
    assert_eq!(average_linkage(&block_distance(), 6).len(), 6);
}

#[test]
fn hierarchical_selection_picks_best_per_cluster() {
    let ts = sines(50, &[1.0; 6]);
    let metric = [0.3, 0.9, 0.1, 0.5, 0.7, 0.2];
    let groups = GroupClustering { n_groups: 4, members_per_group: 2 };
    // min(max(4, 3), 4 / 2) = 2 clusters, 2 members each
    let (sub, idx) = svc()
        .select_by_hierarchical_group_metric_clustering(&ts, &block_distance(), None, Some(&metric[..]), groups)
        .unwrap();
    assert_eq!(idx, vec![0, 1, 3, 4]);
    assert_eq!(sub.number_of_labels(), 4);
}

#[test]
fn disconnectivity_reweights_distance() {
    let ts = sines(50, &[1.0; 6]);
    // Pulling 2 towards 3..5 and pushing it from 0..1 moves it across blocks.
    let mut dc = Array2::<f64>::ones((6, 6));
    for j in 0..2 {
        dc[[2, j]] = 20.0;
        dc[[j, 2]] = 20.0;
    }
    for j in 3..6 {
        dc[[2, j]] = 0.01;
        dc[[j, 2]] = 0.01;
    }
    let metric = [0.0, 0.0, 1.0, 0.5, 0.5, 0.5];
    let groups = GroupClustering { n_groups: 2, members_per_group: 1 };
    let (_, idx) = svc()
        .select_by_hierarchical_group_metric_clustering(&ts, &block_distance(), Some(&dc), Some(&metric[..]), groups)
        .unwrap();
    assert_eq!(idx, vec![0, 2]);
}

#[test]
fn correlation_power_groups_correlated_channels() {
    // ch0/ch1 identical in shape, ch2/ch3 identical in shape; amplitude grows with index.
    let ts = sines(1000, &[10.0, 10.0, 30.0, 30.0]);
    let groups = GroupClustering { n_groups: 2, members_per_group: 1 };
    let (_, idx) = svc().select_by_correlation_power(&ts, None, None, None, groups).unwrap();
    assert_eq!(idx, vec![1, 3]);
}

#[test]
fn gain_matrix_power_uses_gain_rows() {
    let ts = sines(1000, &[10.0, 20.0, 30.0, 40.0]);
    let gain = array![
        [1.0, 0.0, 0.2],
        [0.9, 0.1, 0.2],
        [0.0, 1.0, 0.3],
        [0.1, 0.9, 0.3],
    ];
    let groups = GroupClustering { n_groups: 2, members_per_group: 1 };
    let (_, idx) = svc().select_by_gain_matrix_power(&ts, &gain, None, None, groups).unwrap();
    assert_eq!(idx, vec![1, 3]);

    let bad = Array2::<f64>::zeros((3, 3));
    assert!(svc().select_by_gain_matrix_power(&ts, &bad, None, None, groups).is_err());
}

// ── Regions of interest ───────────────────────────────────────────────────────

#[test]
fn rois_by_label_and_index() {
    let ts = sines(20, &[1.0, 2.0, 3.0, 4.0]);
    let all = ["ch0", "ch1", "ch2", "ch3"];
    let (sub, idx) = svc()
        .select_by_rois(&ts, &[Key::from("ch3"), Key::Index(1), Key::from("ch1")], &all)
        .unwrap();
    assert_eq!(idx, vec![1, 3]);
    assert_eq!(sub.space_labels(), &["ch1".to_string(), "ch3".to_string()]);

    let err = svc().select_by_rois(&ts, &[Key::Index(7)], &all).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Index);
    let err = svc().select_by_rois(&ts, &[Key::from("ch9")], &all).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Lookup);
}

#[test]
fn rois_proximity_union() {
    let ts = sines(20, &[1.0, 2.0, 3.0, 4.0]);
    let proximity = array![[0.9, 0.1, 0.0, 0.0], [0.0, 0.0, 0.2, 0.8]];
    let (_, idx) = svc()
        .select_by_rois_proximity(&ts, &proximity, MetricThreshold::threshold(0.5))
        .unwrap();
    assert_eq!(idx, vec![0, 3]);
    assert!(svc()
        .select_by_rois_proximity(&ts, &Array2::zeros((2, 3)), MetricThreshold::threshold(0.5))
        .is_err());
}
