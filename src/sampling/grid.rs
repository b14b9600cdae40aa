//! Enumeration of the ellipticity grid.
//!
//! Every pass over the grid (counting, sequential sampling, parallel
//! sampling) goes through [`EllipticityGrid`], so a precomputed count always
//! equals the number of points a run produces.
//!
//! Order: the origin; then `(0, ∓e2)` pairs up the e2 axis; then for each e1
//! step the pair `(∓e1, 0)` followed by the quadruples
//! `(-e1, -e2), (e1, -e2), (-e1, e2), (e1, e2)`. A point is inside when its
//! squared magnitude is strictly below the squared maximum; each component
//! is compared through its square so the two axes round the same way.

/// Iterator over the `(e1, e2)` grid points inside a circle.
#[derive(Debug, Clone)]
pub struct EllipticityGrid {
    step: f64,
    max_sqr: f64,
    e1: f64,
    e2: f64,
    phase: Phase,
    pending: [(f64, f64); 4],
    pending_len: usize,
    pending_pos: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Phase {
    Origin,
    Axis,
    RowStart,
    Row,
    Done,
}

impl EllipticityGrid {
    /// Grid with spacing `step` inside `e1² + e2² < max_ellipticity²`.
    ///
    /// A non-positive (or NaN) step yields the origin alone.
    pub fn new(max_ellipticity: f64, step: f64) -> Self {
        Self {
            step,
            max_sqr: max_ellipticity * max_ellipticity,
            e1: 0.0,
            e2: 0.0,
            phase: Phase::Origin,
            pending: [(0.0, 0.0); 4],
            pending_len: 0,
            pending_pos: 0,
        }
    }

    fn stepping(&self) -> bool {
        self.step > 0.0
    }

    fn emit(&mut self, points: &[(f64, f64)]) {
        self.pending[..points.len()].copy_from_slice(points);
        self.pending_len = points.len();
        self.pending_pos = 0;
    }

    /// Advance the state machine by one transition, queueing 0 to 4 points.
    fn advance(&mut self) {
        match self.phase {
            Phase::Origin => {
                self.emit(&[(0.0, 0.0)]);
                self.e2 = self.step;
                self.phase = if self.stepping() {
                    Phase::Axis
                } else {
                    Phase::Done
                };
            }
            Phase::Axis => {
                let e2 = self.e2;
                if e2 * e2 < self.max_sqr {
                    self.emit(&[(0.0, -e2), (0.0, e2)]);
                    self.e2 += self.step;
                } else {
                    self.e1 = self.step;
                    self.phase = Phase::RowStart;
                }
            }
            Phase::RowStart => {
                let e1 = self.e1;
                if e1 * e1 < self.max_sqr {
                    self.emit(&[(-e1, 0.0), (e1, 0.0)]);
                    self.e2 = self.step;
                    self.phase = Phase::Row;
                } else {
                    self.phase = Phase::Done;
                }
            }
            Phase::Row => {
                let (e1, e2) = (self.e1, self.e2);
                if e2 * e2 < self.max_sqr - e1 * e1 {
                    self.emit(&[(-e1, -e2), (e1, -e2), (-e1, e2), (e1, e2)]);
                    self.e2 += self.step;
                } else {
                    self.e1 += self.step;
                    self.phase = Phase::RowStart;
                }
            }
            Phase::Done => {}
        }
    }
}

impl Iterator for EllipticityGrid {
    type Item = (f64, f64);

    fn next(&mut self) -> Option<(f64, f64)> {
        loop {
            if self.pending_pos < self.pending_len {
                let point = self.pending[self.pending_pos];
                self.pending_pos += 1;
                return Some(point);
            }
            if self.phase == Phase::Done {
                return None;
            }
            self.advance();
        }
    }
}

impl std::iter::FusedIterator for EllipticityGrid {}

/// Number of points [`EllipticityGrid::new`] would yield.
pub fn count_samples(max_ellipticity: f64, step: f64) -> usize {
    EllipticityGrid::new(max_ellipticity, step).count()
}
