#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Circle {
    pub radius: f64,
}

impl Circle {
    /// Returns `None` unless the radius is finite and strictly positive.
    pub fn new(radius: f64) -> Option<Self> {
        (radius.is_finite() && radius > 0.0).then_some(Self { radius })
    }

    /// Uniformly scales the radius. A non-positive factor leaves it unchanged.
    pub fn scale(&mut self, factor: f64) {
        if factor.is_finite() && factor > 0.0 {
            self.radius *= factor;
        }
    }
}
