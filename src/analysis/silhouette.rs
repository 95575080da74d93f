use std::collections::BTreeMap;

use super::kmeans::squared_distance;

/// Mean silhouette coefficient over all points, using Euclidean distance.
/// Returns 0.0 when fewer than two clusters are present or when every
/// point sits in its own cluster.
pub fn silhouette_score(points: &[Vec<f64>], labels: &[usize]) -> f64 {
    let mut sizes: BTreeMap<usize, usize> = BTreeMap::new();
    for &label in labels {
        *sizes.entry(label).or_insert(0) += 1;
    }

    let n = points.len();
    if sizes.len() < 2 || sizes.len() >= n {
        return 0.0;
    }

    let total: f64 = (0..n)
        .map(|i| point_silhouette(i, points, labels, &sizes))
        .sum();

    #[allow(clippy::cast_precision_loss)]
    let score = total / n as f64;
    score
}

fn point_silhouette(
    i: usize,
    points: &[Vec<f64>],
    labels: &[usize],
    sizes: &BTreeMap<usize, usize>,
) -> f64 {
    let own = labels[i];
    let own_size = sizes.get(&own).copied().unwrap_or(0);
    if own_size <= 1 {
        return 0.0;
    }

    let mut sums: BTreeMap<usize, f64> = BTreeMap::new();
    for (j, point) in points.iter().enumerate() {
        if j != i {
            *sums.entry(labels[j]).or_insert(0.0) += squared_distance(&points[i], point).sqrt();
        }
    }

    #[allow(clippy::cast_precision_loss)]
    let a = sums.get(&own).copied().unwrap_or(0.0) / (own_size - 1) as f64;
    let b = sums
        .iter()
        .filter(|(label, _)| **label != own)
        .map(|(label, sum)| {
            #[allow(clippy::cast_precision_loss)]
            let size = sizes.get(label).copied().unwrap_or(1) as f64;
            sum / size
        })
        .fold(f64::INFINITY, f64::min);

    let denominator = a.max(b);
    if denominator > 0.0 {
        (b - a) / denominator
    } else {
        0.0
    }
}
