/// A 2×3 affine matrix mapping `(x, y)` to
/// `(m00·x + m01·y + m02, m10·x + m11·y + m12)`.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct AffineTransform {
    m: [[f64; 3]; 2],
}

impl AffineTransform {
    pub fn new(m: [[f64; 3]; 2]) -> Self {
        Self { m }
    }

    /// Rotation + uniform scale + translation:
    /// `u = a·x − b·y + tx`, `v = b·x + a·y + ty`.
    pub fn similarity(a: f64, b: f64, tx: f64, ty: f64) -> Self {
        Self {
            m: [[a, -b, tx], [b, a, ty]],
        }
    }

    pub fn identity() -> Self {
        Self::similarity(1.0, 0.0, 0.0, 0.0)
    }

    pub fn matrix(&self) -> &[[f64; 3]; 2] {
        &self.m
    }

    pub fn apply(&self, x: f64, y: f64) -> (f64, f64) {
        let m = &self.m;
        (
            m[0][0] * x + m[0][1] * y + m[0][2],
            m[1][0] * x + m[1][1] * y + m[1][2],
        )
    }

    /// Uniform scale factor, meaningful for similarity transforms.
    pub fn scale(&self) -> f64 {
        self.determinant().abs().sqrt()
    }

    pub fn is_finite(&self) -> bool {
        self.m.iter().flatten().all(|v| v.is_finite())
    }

    /// Inverse mapping, or `None` when the linear part is singular.
    pub fn inverse(&self) -> Option<Self> {
        let det = self.determinant();
        if !det.is_finite() || det.abs() < 1e-12 {
            return None;
        }
        let [[a, b, tx], [c, d, ty]] = self.m;
        let (ia, ib, ic, id) = (d / det, -b / det, -c / det, a / det);
        Some(Self {
            m: [
                [ia, ib, -(ia * tx + ib * ty)],
                [ic, id, -(ic * tx + id * ty)],
            ],
        })
    }

    fn determinant(&self) -> f64 {
        self.m[0][0] * self.m[1][1] - self.m[0][1] * self.m[1][0]
    }
}
