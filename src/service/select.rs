//! Channel selection by metric thresholding and hierarchical clustering.
//!
//! ```text
//! threshold   keep values ≥ th
//! percentile  th = percentile(values, p), then as above
//! count       the n largest values
//! (none)      the values above the elbow of the sorted curve
//! ```
//!
//! Group selection clusters channels by a distance matrix (average linkage)
//! and keeps the best members of every cluster.
use ndarray::Array2;

use super::normalize::percentile;
use crate::error::{Error, Result};

/// How [`select_greater_values`] picks its values. The first set field wins,
/// in declaration order.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct MetricThreshold {
    pub threshold: Option<f64>,
    /// Percentile (0–100) turned into a threshold.
    pub percentile: Option<f64>,
    /// Number of largest values to keep.
    pub count: Option<usize>,
}

impl MetricThreshold {
    pub fn threshold(th: f64) -> Self {
        Self { threshold: Some(th), ..Self::default() }
    }

    pub fn percentile(p: f64) -> Self {
        Self { percentile: Some(p), ..Self::default() }
    }

    pub fn count(n: usize) -> Self {
        Self { count: Some(n), ..Self::default() }
    }
}

/// Cluster count and members kept per cluster for group selection.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GroupClustering {
    /// Requested clusters. Default: `10`.
    pub n_groups: usize,
    /// Default: `1`.
    pub members_per_group: usize,
}

impl Default for GroupClustering {
    fn default() -> Self {
        Self { n_groups: 10, members_per_group: 1 }
    }
}

/// Sorted indices of the values `criterion` selects.
pub fn select_greater_values(values: &[f64], criterion: MetricThreshold) -> Vec<usize> {
    if values.is_empty() {
        return vec![];
    }
    let th = match criterion {
        MetricThreshold { threshold: Some(th), .. } => Some(th),
        MetricThreshold { percentile: Some(p), .. } => Some(percentile(values, p)),
        _ => None,
    };
    let mut out: Vec<usize> = match (th, criterion.count) {
        (Some(th), _) => (0..values.len()).filter(|&i| values[i] >= th).collect(),
        (None, Some(n)) => descending_order(values).into_iter().take(n).collect(),
        (None, None) => {
            let elbow = curve_elbow_point(values).max(1);
            descending_order(values).into_iter().take(elbow).collect()
        }
    };
    out.sort_unstable();
    out
}

/// Position of the elbow of `values` sorted in descending order: the
/// maximum of the third derivative of the cumulative sum.
pub fn curve_elbow_point(values: &[f64]) -> usize {
    let mut sorted = values.to_vec();
    sorted.sort_by(|a, b| b.total_cmp(a));
    let cumsum: Vec<f64> = sorted
        .iter()
        .scan(0.0, |acc, &v| {
            *acc += v;
            Some(*acc)
        })
        .collect();
    let grad = gradient(&gradient(&gradient(&cumsum)));
    grad.iter()
        .enumerate()
        .fold((0, f64::NEG_INFINITY), |best, (i, &g)| if g > best.1 { (i, g) } else { best })
        .0
}

/// Second-order central differences, one-sided at the ends.
fn gradient(v: &[f64]) -> Vec<f64> {
    let n = v.len();
    if n < 2 {
        return vec![0.0; n];
    }
    (0..n)
        .map(|i| match i {
            0 => v[1] - v[0],
            i if i == n - 1 => v[n - 1] - v[n - 2],
            i => (v[i + 1] - v[i - 1]) / 2.0,
        })
        .collect()
}

fn descending_order(values: &[f64]) -> Vec<usize> {
    let mut order: Vec<usize> = (0..values.len()).collect();
    order.sort_by(|&a, &b| values[b].total_cmp(&values[a]));
    order
}

/// Agglomerative clustering with average linkage, merged until
/// `n_clusters` remain. Each cluster lists its members in ascending order;
/// clusters are ordered by their smallest member.
pub fn average_linkage(distance: &Array2<f64>, n_clusters: usize) -> Vec<Vec<usize>> {
    let n = distance.nrows();
    let mut clusters: Vec<Vec<usize>> = (0..n).map(|i| vec![i]).collect();
    let linkage = |a: &[usize], b: &[usize]| {
        let sum: f64 = a.iter().flat_map(|&i| b.iter().map(move |&j| distance[[i, j]])).sum();
        sum / (a.len() * b.len()) as f64
    };
    while clusters.len() > n_clusters.max(1) {
        let mut best = (0, 1, f64::INFINITY);
        for a in 0..clusters.len() {
            for b in a + 1..clusters.len() {
                let d = linkage(&clusters[a], &clusters[b]);
                if d < best.2 {
                    best = (a, b, d);
                }
            }
        }
        let (a, b, _) = best;
        let merged = clusters.swap_remove(b);
        clusters[a].extend(merged);
    }
    for c in clusters.iter_mut() {
        c.sort_unstable();
    }
    clusters.sort_by_key(|c| c[0]);
    clusters
}

/// Cluster channels by `distance` (optionally weighted elementwise by
/// `disconnectivity`) and keep `members_per_group` per cluster: the ones
/// with the highest `metric`, or the first ones without a metric.
///
/// The cluster count is `min(max(n_groups, 3), n_groups / members_per_group)`
/// clamped to `[1, n_channels]`. Returns sorted unique indices.
pub fn select_by_hierarchical_group_metric_clustering(
    distance: &Array2<f64>,
    disconnectivity: Option<&Array2<f64>>,
    metric: Option<&[f64]>,
    groups: GroupClustering,
) -> Result<Vec<usize>> {
    let n = distance.nrows();
    if distance.ncols() != n {
        return Err(Error::InvalidParameter(format!(
            "distance matrix must be square, got {:?}",
            distance.shape()
        )));
    }
    if let Some(m) = metric.filter(|m| m.len() != n) {
        return Err(Error::InvalidParameter(format!(
            "metric has {} values for {n} channels",
            m.len()
        )));
    }
    if groups.members_per_group == 0 {
        return Err(Error::InvalidParameter("members_per_group must be ≥ 1".into()));
    }
    if n == 0 {
        return Ok(vec![]);
    }
    let distance = match disconnectivity {
        Some(dc) if dc.shape() == distance.shape() => distance * dc,
        _ => distance.clone(),
    };

    let n_clusters = groups
        .n_groups
        .max(3)
        .min(groups.n_groups / groups.members_per_group)
        .clamp(1, n);

    let mut selected: Vec<usize> = Vec::new();
    for members in average_linkage(&distance, n_clusters) {
        match metric {
            Some(m) => {
                let mut ranked = members.clone();
                ranked.sort_by(|&a, &b| m[b].total_cmp(&m[a]));
                selected.extend(ranked.into_iter().take(groups.members_per_group));
            }
            None => selected.extend(members.into_iter().take(groups.members_per_group)),
        }
    }
    selected.sort_unstable();
    selected.dedup();
    Ok(selected)
}

/// Pearson correlation between the rows of `signals`.
pub fn corrcoef(signals: &Array2<f64>) -> Array2<f64> {
    let n = signals.nrows();
    let centred: Vec<Vec<f64>> = signals
        .rows()
        .into_iter()
        .map(|row| {
            let m = row.mean().unwrap_or(0.0);
            row.iter().map(|v| v - m).collect()
        })
        .collect();
    let norms: Vec<f64> = centred
        .iter()
        .map(|r| r.iter().map(|v| v * v).sum::<f64>().sqrt())
        .collect();
    Array2::from_shape_fn((n, n), |(i, j)| {
        let dot: f64 = centred[i].iter().zip(&centred[j]).map(|(a, b)| a * b).sum();
        dot / (norms[i] * norms[j])
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;

    #[test]
    fn threshold_and_percentile() {
        let v = [0.1, 5.0, 3.0, 0.2, 4.0];
        assert_eq!(select_greater_values(&v, MetricThreshold::threshold(3.0)), vec![1, 2, 4]);
        assert_eq!(select_greater_values(&v, MetricThreshold::percentile(100.0)), vec![1]);
        assert_eq!(select_greater_values(&v, MetricThreshold::count(2)), vec![1, 4]);
    }

    #[test]
    fn elbow_fallback_keeps_the_large_values() {
        let v = [10.0, 0.1, 9.5, 0.2, 0.1, 9.8, 0.0, 0.3];
        assert_eq!(select_greater_values(&v, MetricThreshold::default()), vec![0, 2, 5]);
    }

    #[test]
    fn gradient_matches_central_differences() {
        assert_eq!(gradient(&[1.0, 2.0, 4.0, 7.0]), vec![1.0, 1.5, 2.5, 3.0]);
    }

    #[test]
    fn two_obvious_clusters() {
        let d = array![
            [0.0, 0.1, 0.9, 0.9],
            [0.1, 0.0, 0.9, 0.9],
            [0.9, 0.9, 0.0, 0.2],
            [0.9, 0.9, 0.2, 0.0],
        ];
        assert_eq!(average_linkage(&d, 2), vec![vec![0, 1], vec![2, 3]]);
    }

    #[test]
    fn best_member_per_cluster() {
        let d = array![
            [0.0, 0.1, 0.9, 0.9],
            [0.1, 0.0, 0.9, 0.9],
            [0.9, 0.9, 0.0, 0.2],
            [0.9, 0.9, 0.2, 0.0],
        ];
        let metric = [1.0, 3.0, 5.0, 2.0];
        let groups = GroupClustering { n_groups: 2, members_per_group: 1 };
        let sel = select_by_hierarchical_group_metric_clustering(&d, None, Some(&metric[..]), groups).unwrap();
        assert_eq!(sel, vec![1, 2]);
    }

    #[test]
    fn cluster_count_is_clamped() {
        let d = Array2::<f64>::zeros((2, 2));
        let groups = GroupClustering { n_groups: 10, members_per_group: 1 };
        let sel = select_by_hierarchical_group_metric_clustering(&d, None, None, groups).unwrap();
        assert_eq!(sel, vec![0, 1]);
    }

    #[test]
    fn corrcoef_of_scaled_rows() {
        let s = array![[1.0, 2.0, 3.0], [2.0, 4.0, 6.0], [3.0, 2.0, 1.0]];
        let c = corrcoef(&s);
        approx::assert_abs_diff_eq!(c[[0, 1]], 1.0, epsilon = 1e-12);
        approx::assert_abs_diff_eq!(c[[0, 2]], -1.0, epsilon = 1e-12);
    }
}
