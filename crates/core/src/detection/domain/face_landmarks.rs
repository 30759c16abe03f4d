//! 5-point face landmarks in detector order:
//! left eye, right eye, nose tip, left mouth corner, right mouth corner.

pub const NUM_LANDMARKS: usize = 5;

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct FaceLandmarks {
    points: [(f64, f64); NUM_LANDMARKS],
}

impl FaceLandmarks {
    pub fn new(points: [(f64, f64); NUM_LANDMARKS]) -> Self {
        Self { points }
    }

    pub fn points(&self) -> &[(f64, f64); NUM_LANDMARKS] {
        &self.points
    }

    /// Divide every coordinate by `ratio` (resized → original frame).
    pub fn unscale(&self, ratio: f64) -> Self {
        let mut points = self.points;
        for p in &mut points {
            *p = (p.0 / ratio, p.1 / ratio);
        }
        Self { points }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unscale() {
        let lm = FaceLandmarks::new([(10.0, 20.0); 5]).unscale(0.5);
        assert!(lm.points().iter().all(|p| *p == (20.0, 40.0)));
    }
}
