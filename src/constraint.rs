//! The constraint contract shared by joints and driven motions.
//!
//! A constraint binds two markers and exposes, for the current marker
//! kinematics, its constrained subspace of the 6D relative-motion space
//! (`direction_matrix`, rows expressed in marker-I's frame) and the
//! position/velocity/acceleration deviation from satisfaction
//! (`position_residual` / `velocity_residual` / `acceleration_residual`).
//! A solver drives the residuals to zero and writes the reaction forces
//! back through `set_cf`.

use nalgebra::{DMatrix, DVector, Isometry3};

use crate::error::ConstraintError;
use crate::model::{MarkerId, MarkerState};
use crate::spatial::{inv_transform_screw, pose_to_screw, screw_cross, Screw};
use crate::Result;

/// The two markers an interaction binds, fixed for its lifetime.
#[derive(Debug, Clone)]
pub struct MarkerPair {
    name: String,
    mak_i: MarkerId,
    mak_j: MarkerId,
}

impl MarkerPair {
    /// Create a marker pair.
    #[must_use]
    pub fn new(name: impl Into<String>, mak_i: MarkerId, mak_j: MarkerId) -> Self {
        Self {
            name: name.into(),
            mak_i,
            mak_j,
        }
    }

    /// The interaction name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Marker I (the frame residuals are expressed in).
    #[must_use]
    pub fn mak_i(&self) -> MarkerId {
        self.mak_i
    }

    /// Marker J.
    #[must_use]
    pub fn mak_j(&self) -> MarkerId {
        self.mak_j
    }
}

/// Project a screw through a direction matrix.
fn project(c: &DMatrix<f64>, s: &Screw) -> DVector<f64> {
    c * DVector::from_column_slice(s.as_slice())
}

/// Generic position residual: pose-screw of J relative to I, projected
/// through the direction matrix.
pub(crate) fn base_position_residual(
    c: &DMatrix<f64>,
    mak_i_pm: &Isometry3<f64>,
    mak_j_pm: &Isometry3<f64>,
) -> DVector<f64> {
    let ps = pose_to_screw(&mak_i_pm.inv_mul(mak_j_pm));
    project(c, &ps)
}

/// Generic velocity residual: relative velocity screw in marker-I's frame,
/// projected through the direction matrix.
pub(crate) fn base_velocity_residual(
    c: &DMatrix<f64>,
    mak_i: &MarkerState,
    mak_j: &MarkerState,
) -> DVector<f64> {
    let dv = inv_transform_screw(&mak_i.pm, &(mak_j.vs - mak_i.vs));
    project(c, &dv)
}

/// Generic acceleration residual: the Coriolis/centripetal coupling term
/// `vI × vJ` in marker-I's frame, projected and negated.
pub(crate) fn base_acceleration_residual(
    c: &DMatrix<f64>,
    mak_i: &MarkerState,
    mak_j: &MarkerState,
) -> DVector<f64> {
    let cross = screw_cross(&mak_i.vs, &mak_j.vs);
    -project(c, &inv_transform_screw(&mak_i.pm, &cross))
}

/// Common interface of all constraint variants.
///
/// Every method is a pure function of the supplied marker kinematics; the
/// direction matrix is rebuilt on each call (the universal joint's direction
/// row depends on the current relative orientation), so no evaluation leaves
/// hidden scratch state behind.
pub trait Constraint {
    /// The interaction name.
    fn name(&self) -> &str;

    /// Marker I.
    fn mak_i(&self) -> MarkerId;

    /// Marker J.
    fn mak_j(&self) -> MarkerId;

    /// Number of constrained rows (1-6).
    fn dim(&self) -> usize;

    /// The `dim × 6` constraint direction matrix, rows expressed in
    /// marker-I's frame over `[tx, ty, tz, rx, ry, rz]`.
    fn direction_matrix(
        &self,
        mak_i_pm: &Isometry3<f64>,
        mak_j_pm: &Isometry3<f64>,
    ) -> DMatrix<f64>;

    /// Constraint reaction force along each constrained direction.
    fn cf(&self) -> &DVector<f64>;

    /// Overwrite the reaction force; `cf` must have length `dim`.
    ///
    /// # Errors
    ///
    /// Returns [`ConstraintError::DimensionMismatch`] on wrong length.
    fn set_cf(&mut self, cf: &[f64]) -> Result<()>;

    /// Position-violation vector for the given marker poses. Zero exactly
    /// when the markers are in the relationship the constraint demands.
    fn position_residual(
        &self,
        mak_i_pm: &Isometry3<f64>,
        mak_j_pm: &Isometry3<f64>,
    ) -> DVector<f64> {
        base_position_residual(&self.direction_matrix(mak_i_pm, mak_j_pm), mak_i_pm, mak_j_pm)
    }

    /// Velocity-violation vector for the given marker states.
    fn velocity_residual(&self, mak_i: &MarkerState, mak_j: &MarkerState) -> DVector<f64> {
        base_velocity_residual(&self.direction_matrix(&mak_i.pm, &mak_j.pm), mak_i, mak_j)
    }

    /// Acceleration-violation vector for the given marker states.
    fn acceleration_residual(&self, mak_i: &MarkerState, mak_j: &MarkerState) -> DVector<f64> {
        base_acceleration_residual(&self.direction_matrix(&mak_i.pm, &mak_j.pm), mak_i, mak_j)
    }
}

/// Implements the [`Constraint`] accessors every variant shares verbatim:
/// the `pair`/`cf` field pass-throughs.
macro_rules! impl_pair_accessors {
    () => {
        fn name(&self) -> &str {
            self.pair.name()
        }

        fn mak_i(&self) -> MarkerId {
            self.pair.mak_i()
        }

        fn mak_j(&self) -> MarkerId {
            self.pair.mak_j()
        }

        fn cf(&self) -> &nalgebra::DVector<f64> {
            &self.cf
        }

        fn set_cf(&mut self, cf: &[f64]) -> crate::Result<()> {
            crate::constraint::copy_cf(&mut self.cf, cf)
        }
    };
}
pub(crate) use impl_pair_accessors;

/// Validate and copy a reaction-force slice into storage.
pub(crate) fn copy_cf(storage: &mut DVector<f64>, cf: &[f64]) -> Result<()> {
    if cf.len() != storage.len() {
        return Err(ConstraintError::DimensionMismatch {
            expected: storage.len(),
            actual: cf.len(),
        });
    }
    storage.copy_from_slice(cf);
    Ok(())
}
