use crate::detection::domain::proposal::Proposal;

/// Greedy non-maximum suppression over decoded proposals.
///
/// Proposals are ranked by score with a stable sort, so exact-score ties
/// keep their input order. Each kept proposal removes every remaining one
/// whose (inclusive-pixel) IoU with it exceeds the threshold. Landmarks
/// travel with their box.
#[derive(Clone, Debug)]
pub struct NonMaxSuppressor {
    iou_threshold: f64,
}

impl NonMaxSuppressor {
    pub fn new(iou_threshold: f64) -> Self {
        Self { iou_threshold }
    }

    pub fn suppress(&self, mut proposals: Vec<Proposal>) -> Vec<Proposal> {
        proposals.sort_by(|a, b| b.score.total_cmp(&a.score));

        let mut suppressed = vec![false; proposals.len()];
        let mut keep = Vec::new();

        for i in 0..proposals.len() {
            if suppressed[i] {
                continue;
            }
            for j in (i + 1)..proposals.len() {
                if !suppressed[j] && proposals[i].bbox.iou(&proposals[j].bbox) > self.iou_threshold
                {
                    suppressed[j] = true;
                }
            }
            keep.push(i);
        }

        let mut kept = Vec::with_capacity(keep.len());
        let mut keep = keep.into_iter().peekable();
        for (i, p) in proposals.into_iter().enumerate() {
            if keep.peek() == Some(&i) {
                keep.next();
                kept.push(p);
            }
        }
        kept
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::detection::domain::face_landmarks::FaceLandmarks;
    use crate::shared::bbox::BBox;
    use approx::assert_relative_eq;

    fn proposal(x1: f64, y1: f64, x2: f64, y2: f64, score: f64) -> Proposal {
        Proposal {
            bbox: BBox::new(x1, y1, x2, y2),
            score,
            landmarks: FaceLandmarks::new([(x1, y1); 5]),
        }
    }

    /// Deterministic pseudo-random boxes (LCG), clustered so many overlap.
    fn scattered(n: usize) -> Vec<Proposal> {
        let mut state: u64 = 0x2545_f491_4f6c_dd1d;
        let mut next = || {
            state = state.wrapping_mul(6364136223846793005).wrapping_add(1442695040888963407);
            (state >> 33) as f64 / (1u64 << 31) as f64
        };
        (0..n)
            .map(|_| {
                let x = next() * 200.0;
                let y = next() * 200.0;
                let s = 20.0 + next() * 60.0;
                proposal(x, y, x + s, y + s, next())
            })
            .collect()
    }

    #[test]
    fn test_suppresses_overlapping() {
        let kept = NonMaxSuppressor::new(0.4).suppress(vec![
            proposal(0.0, 0.0, 100.0, 100.0, 0.9),
            proposal(5.0, 5.0, 105.0, 105.0, 0.8),
        ]);
        assert_eq!(kept.len(), 1);
        assert_relative_eq!(kept[0].score, 0.9);
    }

    #[test]
    fn test_keeps_non_overlapping() {
        let kept = NonMaxSuppressor::new(0.4).suppress(vec![
            proposal(0.0, 0.0, 50.0, 50.0, 0.9),
            proposal(200.0, 200.0, 250.0, 250.0, 0.8),
        ]);
        assert_eq!(kept.len(), 2);
    }

    #[test]
    fn test_output_sorted_by_score() {
        let kept = NonMaxSuppressor::new(0.4).suppress(vec![
            proposal(0.0, 0.0, 50.0, 50.0, 0.5),
            proposal(200.0, 200.0, 250.0, 250.0, 0.9),
            proposal(400.0, 0.0, 450.0, 50.0, 0.7),
        ]);
        let scores: Vec<f64> = kept.iter().map(|p| p.score).collect();
        assert_eq!(scores, vec![0.9, 0.7, 0.5]);
    }

    #[test]
    fn test_empty_input() {
        assert!(NonMaxSuppressor::new(0.4).suppress(Vec::new()).is_empty());
    }

    #[test]
    fn test_iou_equal_to_threshold_is_kept() {
        // Inclusive widths: a = 10x10 px, b shifted 5 px → IoU = 50/150.
        let threshold = 50.0 / 150.0;
        let kept = NonMaxSuppressor::new(threshold).suppress(vec![
            proposal(0.0, 0.0, 9.0, 9.0, 0.9),
            proposal(5.0, 0.0, 14.0, 9.0, 0.8),
        ]);
        assert_eq!(kept.len(), 2);
    }

    #[test]
    fn test_landmarks_travel_with_box() {
        let kept = NonMaxSuppressor::new(0.4).suppress(vec![
            proposal(3.0, 4.0, 60.0, 60.0, 0.6),
            proposal(100.0, 110.0, 160.0, 160.0, 0.95),
        ]);
        assert_eq!(kept[0].landmarks.points()[0], (100.0, 110.0));
        assert_eq!(kept[1].landmarks.points()[0], (3.0, 4.0));
    }

    #[test]
    fn test_equal_scores_keep_input_order() {
        let kept = NonMaxSuppressor::new(0.4).suppress(vec![
            proposal(10.0, 0.0, 60.0, 50.0, 0.8),
            proposal(12.0, 0.0, 62.0, 50.0, 0.8),
        ]);
        assert_eq!(kept.len(), 1);
        assert_relative_eq!(kept[0].bbox.x1, 10.0);
    }

    #[test]
    fn test_chain_only_suppresses_against_kept() {
        // b overlaps a and c; a suppresses b, so c survives even though
        // it overlaps b.
        let kept = NonMaxSuppressor::new(0.3).suppress(vec![
            proposal(0.0, 0.0, 99.0, 99.0, 0.9),
            proposal(40.0, 0.0, 139.0, 99.0, 0.8),
            proposal(80.0, 0.0, 179.0, 99.0, 0.7),
        ]);
        let scores: Vec<f64> = kept.iter().map(|p| p.score).collect();
        assert_eq!(scores, vec![0.9, 0.7]);
    }

    #[test]
    fn test_result_is_subset_with_bounded_overlap() {
        let threshold = 0.4;
        let input = scattered(300);
        let kept = NonMaxSuppressor::new(threshold).suppress(input.clone());

        assert!(!kept.is_empty());
        assert!(kept.iter().all(|k| input.contains(k)));
        for (i, a) in kept.iter().enumerate() {
            for b in &kept[i + 1..] {
                assert!(a.bbox.iou(&b.bbox) <= threshold);
            }
        }
    }

    #[test]
    fn test_never_drops_top_candidate() {
        let input = scattered(300);
        let best = input
            .iter()
            .max_by(|a, b| a.score.total_cmp(&b.score))
            .unwrap()
            .clone();
        let kept = NonMaxSuppressor::new(0.1).suppress(input);
        assert_eq!(kept[0], best);
    }
}
