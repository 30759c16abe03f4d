//! Least-median-of-squares similarity fit.
//!
//! With five correspondences every pair of points defines an exact
//! similarity, so the search is exhaustive and deterministic: all ten
//! candidates are scored by their median squared residual, the best one
//! selects inliers, and a least-squares refit over those inliers gives the
//! final transform.

use crate::alignment::domain::affine_transform::AffineTransform;
use crate::alignment::domain::similarity_estimator::SimilarityEstimator;
use crate::detection::domain::face_landmarks::NUM_LANDMARKS;

/// Points closer than this are treated as the same point.
const MIN_SPAN: f64 = 1e-6;
/// Smallest / largest scatter eigenvalue below which points are collinear.
const MIN_SPREAD_RATIO: f64 = 1e-6;
/// Lower bound on the inlier distance, in pixels.
const MIN_INLIER_DISTANCE: f64 = 1.0;
const MIN_SCALE: f64 = 1e-8;

type Points = [(f64, f64); NUM_LANDMARKS];

#[derive(Clone, Copy, Debug, Default)]
pub struct LmedsSimilarityEstimator;

impl LmedsSimilarityEstimator {
    pub fn new() -> Self {
        Self
    }
}

impl SimilarityEstimator for LmedsSimilarityEstimator {
    fn estimate(&self, src: &Points, dst: &Points) -> Option<AffineTransform> {
        if !all_finite(src) || !all_finite(dst) || is_degenerate(src) || is_degenerate(dst) {
            return None;
        }

        let (best, median) = best_pair_candidate(src, dst)?;

        let n = NUM_LANDMARKS as f64;
        let sigma = 2.5 * 1.4826 * (1.0 + 5.0 / (n - 2.0)) * median.sqrt();
        let limit = sigma.max(MIN_INLIER_DISTANCE).powi(2);

        let inliers: Vec<usize> = (0..NUM_LANDMARKS)
            .filter(|&i| squared_residual(&best, src[i], dst[i]) <= limit)
            .collect();
        log::trace!("lmeds: median {median:.4}, {} inliers", inliers.len());

        let refined = least_squares(src, dst, &inliers)?;
        if refined.scale() < MIN_SCALE || !refined.is_finite() {
            return None;
        }
        Some(refined)
    }
}

/// Exact fit of every point pair; the one with the smallest median squared
/// residual wins, earlier pairs on ties.
fn best_pair_candidate(src: &Points, dst: &Points) -> Option<(AffineTransform, f64)> {
    let mut best: Option<(AffineTransform, f64)> = None;
    for i in 0..NUM_LANDMARKS {
        for j in (i + 1)..NUM_LANDMARKS {
            let Some(candidate) = from_pair(src[i], src[j], dst[i], dst[j]) else {
                continue;
            };
            let median = median_squared_residual(&candidate, src, dst);
            if best.as_ref().map_or(true, |(_, m)| median < *m) {
                best = Some((candidate, median));
            }
        }
    }
    best
}

/// Similarity taking `p1 → q1` and `p2 → q2`, treating points as complex
/// numbers: `q = s·p + t`.
fn from_pair(p1: (f64, f64), p2: (f64, f64), q1: (f64, f64), q2: (f64, f64)) -> Option<AffineTransform> {
    let (px, py) = (p2.0 - p1.0, p2.1 - p1.1);
    let (qx, qy) = (q2.0 - q1.0, q2.1 - q1.1);
    let norm = px * px + py * py;
    if norm < MIN_SPAN * MIN_SPAN {
        return None;
    }
    let a = (qx * px + qy * py) / norm;
    let b = (qy * px - qx * py) / norm;
    let tx = q1.0 - (a * p1.0 - b * p1.1);
    let ty = q1.1 - (b * p1.0 + a * p1.1);
    Some(AffineTransform::similarity(a, b, tx, ty))
}

/// Closed-form similarity minimizing squared error over `indices`.
fn least_squares(src: &Points, dst: &Points, indices: &[usize]) -> Option<AffineTransform> {
    if indices.len() < 2 {
        return None;
    }
    let k = indices.len() as f64;
    let mean = |pts: &Points| {
        let (sx, sy) = indices
            .iter()
            .fold((0.0, 0.0), |(sx, sy), &i| (sx + pts[i].0, sy + pts[i].1));
        (sx / k, sy / k)
    };
    let (mx, my) = mean(src);
    let (mu, mv) = mean(dst);

    let (mut num_a, mut num_b, mut den) = (0.0, 0.0, 0.0);
    for &i in indices {
        let (x, y) = (src[i].0 - mx, src[i].1 - my);
        let (u, v) = (dst[i].0 - mu, dst[i].1 - mv);
        num_a += x * u + y * v;
        num_b += x * v - y * u;
        den += x * x + y * y;
    }
    if den < MIN_SPAN * MIN_SPAN {
        return None;
    }
    let (a, b) = (num_a / den, num_b / den);
    Some(AffineTransform::similarity(
        a,
        b,
        mu - (a * mx - b * my),
        mv - (b * mx + a * my),
    ))
}

fn squared_residual(t: &AffineTransform, p: (f64, f64), q: (f64, f64)) -> f64 {
    let (u, v) = t.apply(p.0, p.1);
    (u - q.0).powi(2) + (v - q.1).powi(2)
}

fn median_squared_residual(t: &AffineTransform, src: &Points, dst: &Points) -> f64 {
    let mut residuals = [0.0; NUM_LANDMARKS];
    for (r, (p, q)) in residuals.iter_mut().zip(src.iter().zip(dst)) {
        *r = squared_residual(t, *p, *q);
    }
    residuals.sort_by(f64::total_cmp);
    residuals[NUM_LANDMARKS / 2]
}

fn all_finite(points: &Points) -> bool {
    points.iter().all(|(x, y)| x.is_finite() && y.is_finite())
}

/// Coincident or collinear point sets, judged by the eigenvalues of their
/// scatter matrix.
fn is_degenerate(points: &Points) -> bool {
    let n = NUM_LANDMARKS as f64;
    let mx = points.iter().map(|p| p.0).sum::<f64>() / n;
    let my = points.iter().map(|p| p.1).sum::<f64>() / n;
    let (mut sxx, mut syy, mut sxy) = (0.0, 0.0, 0.0);
    for (x, y) in points {
        let (dx, dy) = (x - mx, y - my);
        sxx += dx * dx;
        syy += dy * dy;
        sxy += dx * dy;
    }
    let half_trace = (sxx + syy) / 2.0;
    let spread = (((sxx - syy) / 2.0).powi(2) + sxy * sxy).sqrt();
    let (largest, smallest) = (half_trace + spread, half_trace - spread);
    largest < MIN_SPAN * MIN_SPAN || smallest / largest < MIN_SPREAD_RATIO
}
