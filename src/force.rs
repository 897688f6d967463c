//! Applied force elements.
//!
//! Forces are interactions that do not constrain motion: they contribute an
//! equal-and-opposite wrench pair to the two bound parts and carry no
//! direction matrix or residuals.

use crate::constraint::MarkerPair;
use crate::error::ConstraintError;
use crate::model::{MarkerId, MarkerState};
use crate::spatial::{transform_force_screw, Screw};
use crate::Result;

/// A scalar force or torque applied along one axis of marker-I's frame.
///
/// The magnitude acts on the part owning marker I; the part owning marker J
/// receives the reaction. Axes 0-2 are forces along x/y/z, axes 3-5 torques
/// about them.
#[derive(Debug, Clone)]
pub struct SingleComponentForce {
    pair: MarkerPair,
    axis: usize,
    fce: f64,
}

impl SingleComponentForce {
    /// Create a force element acting along the given axis (0-5).
    ///
    /// # Errors
    ///
    /// Returns [`ConstraintError::AxisOutOfRange`] if `axis` is not in
    /// `0..6`.
    pub fn new(
        name: impl Into<String>,
        mak_i: MarkerId,
        mak_j: MarkerId,
        axis: usize,
    ) -> Result<Self> {
        if axis >= 6 {
            return Err(ConstraintError::AxisOutOfRange { axis });
        }
        Ok(Self {
            pair: MarkerPair::new(name, mak_i, mak_j),
            axis,
            fce: 0.0,
        })
    }

    /// The interaction name.
    #[must_use]
    pub fn name(&self) -> &str {
        self.pair.name()
    }

    /// Marker I (where the force acts).
    #[must_use]
    pub fn mak_i(&self) -> MarkerId {
        self.pair.mak_i()
    }

    /// Marker J (where the reaction acts).
    #[must_use]
    pub fn mak_j(&self) -> MarkerId {
        self.pair.mak_j()
    }

    /// The component axis (0-5).
    #[must_use]
    pub fn axis(&self) -> usize {
        self.axis
    }

    /// The commanded magnitude.
    #[must_use]
    pub fn fce(&self) -> f64 {
        self.fce
    }

    /// Set the commanded magnitude.
    pub fn set_fce(&mut self, fce: f64) {
        self.fce = fce;
    }

    /// Ground-frame force screws applied to the two parts: `(on I, on J)`.
    /// The pair always sums to zero.
    #[must_use]
    pub fn glb_fs(&self, mak_i: &MarkerState) -> (Screw, Screw) {
        let mut f_loc = Screw::zeros();
        f_loc[self.axis] = self.fce;
        let fs_i = transform_force_screw(&mak_i.pm, &f_loc);
        (fs_i, -fs_i)
    }
}
