use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

#[derive(Debug, Clone)]
pub struct KMeans {
    pub n_clusters: usize,
    pub n_init: usize,
    pub max_iter: usize,
    /// Relative to the mean per-feature variance of the data.
    pub tol: f64,
    pub seed: u64,
}

#[derive(Debug, Clone)]
pub struct KMeansFit {
    pub labels: Vec<usize>,
    pub centroids: Vec<Vec<f64>>,
    pub inertia: f64,
}

impl KMeans {
    pub fn new(n_clusters: usize) -> Self {
        Self {
            n_clusters,
            n_init: 10,
            max_iter: 300,
            tol: 1e-4,
            seed: 42,
        }
    }

    /// Partition `points` into `n_clusters` groups, keeping the lowest
    /// inertia over `n_init` seeded runs. `None` when there are fewer
    /// points than clusters.
    pub fn fit(&self, points: &[Vec<f64>]) -> Option<KMeansFit> {
        if self.n_clusters == 0 || points.len() < self.n_clusters {
            return None;
        }

        let mut rng = StdRng::seed_from_u64(self.seed);
        let tol = self.tol * mean_variance(points);

        (0..self.n_init.max(1))
            .map(|_| self.run_once(points, tol, &mut rng))
            .min_by(|a, b| a.inertia.total_cmp(&b.inertia))
    }

    fn run_once(&self, points: &[Vec<f64>], tol: f64, rng: &mut StdRng) -> KMeansFit {
        let mut centroids = init_centroids(points, self.n_clusters, rng);

        for _ in 0..self.max_iter {
            let labels = assign(points, &centroids);
            let updated = update_centroids(points, &labels, &centroids);
            let shift: f64 = centroids
                .iter()
                .zip(&updated)
                .map(|(old, new)| squared_distance(old, new))
                .sum();
            centroids = updated;

            if shift <= tol {
                break;
            }
        }

        let labels = assign(points, &centroids);
        let inertia = points
            .iter()
            .zip(&labels)
            .map(|(point, &label)| squared_distance(point, &centroids[label]))
            .sum();

        KMeansFit {
            labels,
            centroids,
            inertia,
        }
    }
}

/// Greedy k-means++: each new centre is the best of several candidates
/// sampled proportionally to squared distance from existing centres.
fn init_centroids(points: &[Vec<f64>], k: usize, rng: &mut StdRng) -> Vec<Vec<f64>> {
    #[allow(
        clippy::cast_precision_loss,
        clippy::cast_possible_truncation,
        clippy::cast_sign_loss
    )]
    let trials = 2 + (k as f64).ln().floor() as usize;

    let first = rng.random_range(0..points.len());
    let mut centroids = vec![points[first].clone()];
    let mut closest: Vec<f64> = points
        .iter()
        .map(|p| squared_distance(p, &points[first]))
        .collect();

    while centroids.len() < k {
        let potential: f64 = closest.iter().sum();
        let mut best: Option<(usize, Vec<f64>, f64)> = None;

        for _ in 0..trials {
            let candidate = sample_index(&closest, potential, rng);
            let distances: Vec<f64> = points
                .iter()
                .zip(&closest)
                .map(|(p, &d)| d.min(squared_distance(p, &points[candidate])))
                .collect();
            let candidate_potential: f64 = distances.iter().sum();

            if best
                .as_ref()
                .is_none_or(|(_, _, pot)| candidate_potential < *pot)
            {
                best = Some((candidate, distances, candidate_potential));
            }
        }

        if let Some((index, distances, _)) = best {
            centroids.push(points[index].clone());
            closest = distances;
        }
    }

    centroids
}

fn sample_index(weights: &[f64], total: f64, rng: &mut StdRng) -> usize {
    if total <= 0.0 {
        return rng.random_range(0..weights.len());
    }

    let target = rng.random::<f64>() * total;
    let mut cumulative = 0.0;
    for (i, weight) in weights.iter().enumerate() {
        cumulative += weight;
        if cumulative > target {
            return i;
        }
    }
    weights.len() - 1
}

fn assign(points: &[Vec<f64>], centroids: &[Vec<f64>]) -> Vec<usize> {
    points
        .iter()
        .map(|point| nearest(point, centroids).0)
        .collect()
}

fn nearest(point: &[f64], centroids: &[Vec<f64>]) -> (usize, f64) {
    centroids
        .iter()
        .enumerate()
        .map(|(i, c)| (i, squared_distance(point, c)))
        .fold((0, f64::INFINITY), |best, current| {
            if current.1 < best.1 {
                current
            } else {
                best
            }
        })
}

/// Mean of each cluster's members. A cluster left without members takes
/// the point farthest from its current centre that has not already been
/// used for another empty cluster.
fn update_centroids(
    points: &[Vec<f64>],
    labels: &[usize],
    previous: &[Vec<f64>],
) -> Vec<Vec<f64>> {
    let dims = points.first().map_or(0, Vec::len);
    let mut sums = vec![vec![0.0; dims]; previous.len()];
    let mut sizes = vec![0usize; previous.len()];

    for (point, &label) in points.iter().zip(labels) {
        sizes[label] += 1;
        for (sum, value) in sums[label].iter_mut().zip(point) {
            *sum += value;
        }
    }

    let mut farthest: Vec<(usize, f64)> = points
        .iter()
        .zip(labels)
        .map(|(point, &label)| squared_distance(point, &previous[label]))
        .enumerate()
        .collect();
    farthest.sort_by(|a, b| b.1.total_cmp(&a.1));
    let mut reseeds = farthest.into_iter().map(|(i, _)| i);

    sums.into_iter()
        .zip(sizes)
        .map(|(sum, size)| {
            if size == 0 {
                reseeds
                    .next()
                    .map_or_else(|| vec![0.0; dims], |i| points[i].clone())
            } else {
                #[allow(clippy::cast_precision_loss)]
                let size = size as f64;
                sum.into_iter().map(|v| v / size).collect()
            }
        })
        .collect()
}

fn mean_variance(points: &[Vec<f64>]) -> f64 {
    let dims = points.first().map_or(0, Vec::len);
    if dims == 0 || points.is_empty() {
        return 0.0;
    }

    #[allow(clippy::cast_precision_loss)]
    let n = points.len() as f64;
    let total: f64 = (0..dims)
        .map(|d| {
            let mean = points.iter().map(|p| p[d]).sum::<f64>() / n;
            points.iter().map(|p| (p[d] - mean).powi(2)).sum::<f64>() / n
        })
        .sum();

    #[allow(clippy::cast_precision_loss)]
    let dims = dims as f64;
    total / dims
}

pub fn squared_distance(a: &[f64], b: &[f64]) -> f64 {
    a.iter().zip(b).map(|(x, y)| (x - y).powi(2)).sum()
}
