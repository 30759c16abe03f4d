use thiserror::Error;

/// A raw embedding whose L2 norm is zero or not finite.
#[derive(Error, Debug, Clone, PartialEq)]
#[error("degenerate embedding of dimension {dimension}: norm is {norm}")]
pub struct DegenerateEmbedding {
    pub dimension: usize,
    pub norm: f64,
}

/// A unit-length face embedding.
///
/// Only constructible through [`Embedding::normalize`], so every value in
/// the system has norm 1 and similarity is a plain dot product.
#[derive(Clone, Debug, PartialEq)]
pub struct Embedding(Vec<f32>);

impl Embedding {
    /// Divide `raw` by its L2 norm.
    pub fn normalize(mut raw: Vec<f32>) -> Result<Self, DegenerateEmbedding> {
        let norm = raw
            .iter()
            .map(|&v| (v as f64) * (v as f64))
            .sum::<f64>()
            .sqrt();
        if norm == 0.0 || !norm.is_finite() {
            return Err(DegenerateEmbedding {
                dimension: raw.len(),
                norm,
            });
        }
        for v in &mut raw {
            *v = (*v as f64 / norm) as f32;
        }
        Ok(Self(raw))
    }

    pub fn as_slice(&self) -> &[f32] {
        &self.0
    }

    pub fn dimension(&self) -> usize {
        self.0.len()
    }

    /// Cosine similarity; both sides are unit length.
    pub fn similarity(&self, other: &Embedding) -> f32 {
        debug_assert_eq!(self.dimension(), other.dimension());
        self.0.iter().zip(&other.0).map(|(a, b)| a * b).sum()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use rstest::rstest;

    #[test]
    fn test_normalize_scales_to_unit_length() {
        let e = Embedding::normalize(vec![3.0, 4.0]).unwrap();
        assert_relative_eq!(e.as_slice()[0], 0.6);
        assert_relative_eq!(e.as_slice()[1], 0.8);
    }

    #[test]
    fn test_normalize_keeps_unit_vector() {
        let e = Embedding::normalize(vec![0.0, 1.0, 0.0]).unwrap();
        assert_eq!(e.as_slice(), &[0.0, 1.0, 0.0]);
    }

    #[rstest]
    #[case::zero(vec![0.0, 0.0, 0.0])]
    #[case::empty(vec![])]
    #[case::nan(vec![1.0, f32::NAN])]
    #[case::infinite(vec![f32::INFINITY, 1.0])]
    fn test_degenerate_input_is_rejected(#[case] raw: Vec<f32>) {
        let dimension = raw.len();
        let err = Embedding::normalize(raw).unwrap_err();
        assert_eq!(err.dimension, dimension);
    }

    #[test]
    fn test_self_similarity_is_one() {
        let e = Embedding::normalize(vec![0.2, -1.3, 0.7, 2.2]).unwrap();
        assert_relative_eq!(e.similarity(&e), 1.0, epsilon = 1e-6);
    }

    #[test]
    fn test_orthogonal_similarity_is_zero() {
        let a = Embedding::normalize(vec![1.0, 0.0]).unwrap();
        let b = Embedding::normalize(vec![0.0, 5.0]).unwrap();
        assert_relative_eq!(a.similarity(&b), 0.0);
    }

    #[test]
    fn test_large_values_do_not_overflow() {
        let e = Embedding::normalize(vec![3.0e30, 4.0e30]).unwrap();
        assert_relative_eq!(e.as_slice()[1], 0.8, epsilon = 1e-6);
    }
}
