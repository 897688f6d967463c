//! Single-axis driven motion.
//!
//! A [`Motion`] constrains one component of the relative motion between its
//! two markers and prescribes its value: position `mp`, velocity `mv`, and
//! acceleration `ma` along the selected axis of
//! `[tx, ty, tz, rx, ry, rz]`. The residuals are the base kinematic
//! deviations plus the prescribed values, so driving them to zero places the
//! mechanism at the commanded coordinate.

use nalgebra::{DMatrix, DVector, Isometry3};

use crate::constraint::{
    base_acceleration_residual, base_position_residual, base_velocity_residual,
    impl_pair_accessors, Constraint, MarkerPair,
};
use crate::error::ConstraintError;
use crate::model::{MarkerId, MarkerState};
use crate::spatial::{axis_distance, relative_acc_screw, relative_screw};
use crate::Result;

/// Sign with a dead zero, so static friction contributes nothing at rest.
fn sgn(v: f64) -> f64 {
    if v > 0.0 {
        1.0
    } else if v < 0.0 {
        -1.0
    } else {
        0.0
    }
}

/// A driven joint coordinate along one axis of the relative-motion space.
///
/// The motion coordinate measures marker I relative to marker J. `mp` is
/// stored pre-scaled by the transmission: external values pass through
/// `(mp + mp_offset) · mp_factor` on the way in and the inverse on the way
/// out, so a gear ratio or unit change lives entirely inside this struct.
#[derive(Debug, Clone)]
pub struct Motion {
    pair: MarkerPair,
    axis: usize,
    frc_coe: [f64; 3],
    mp_offset: f64,
    mp_factor: f64,
    mp: f64,
    mv: f64,
    ma: f64,
    cf: DVector<f64>,
}

impl Motion {
    /// Create a motion driving the given axis (0-5).
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
            frc_coe: [0.0; 3],
            mp_offset: 0.0,
            mp_factor: 1.0,
            mp: 0.0,
            mv: 0.0,
            ma: 0.0,
            cf: DVector::zeros(1),
        })
    }

    /// Set the friction coefficients `[static, viscous, inertial]`.
    #[must_use]
    pub fn with_frc_coe(mut self, frc_coe: [f64; 3]) -> Self {
        self.frc_coe = frc_coe;
        self
    }

    /// Set the position offset applied before scaling.
    #[must_use]
    pub fn with_mp_offset(mut self, mp_offset: f64) -> Self {
        self.mp_offset = mp_offset;
        self
    }

    /// Set the position scale factor (transmission ratio).
    #[must_use]
    pub fn with_mp_factor(mut self, mp_factor: f64) -> Self {
        self.mp_factor = mp_factor;
        self
    }

    /// The driven axis (0-5).
    #[must_use]
    pub fn axis(&self) -> usize {
        self.axis
    }

    /// The friction coefficients `[static, viscous, inertial]`.
    #[must_use]
    pub fn frc_coe(&self) -> [f64; 3] {
        self.frc_coe
    }

    /// The position offset.
    #[must_use]
    pub fn mp_offset(&self) -> f64 {
        self.mp_offset
    }

    /// The position scale factor.
    #[must_use]
    pub fn mp_factor(&self) -> f64 {
        self.mp_factor
    }

    /// Prescribed position, in external units.
    #[must_use]
    pub fn mp(&self) -> f64 {
        self.mp / self.mp_factor - self.mp_offset
    }

    /// Set the prescribed position, in external units.
    pub fn set_mp(&mut self, mp: f64) {
        self.mp = (mp + self.mp_offset) * self.mp_factor;
    }

    /// Prescribed velocity.
    #[must_use]
    pub fn mv(&self) -> f64 {
        self.mv
    }

    /// Set the prescribed velocity.
    pub fn set_mv(&mut self, mv: f64) {
        self.mv = mv;
    }

    /// Prescribed acceleration.
    #[must_use]
    pub fn ma(&self) -> f64 {
        self.ma
    }

    /// Set the prescribed acceleration.
    pub fn set_ma(&mut self, ma: f64) {
        self.ma = ma;
    }

    /// Total actuator force: dynamic reaction plus friction.
    #[must_use]
    pub fn mf(&self) -> f64 {
        self.mf_dyn() + self.mf_frc()
    }

    /// Set the total actuator force; the dynamic part absorbs the difference
    /// with the current friction force.
    pub fn set_mf(&mut self, mf: f64) {
        self.cf[0] = mf - self.mf_frc();
    }

    /// Dynamic (constraint-reaction) part of the actuator force.
    #[must_use]
    pub fn mf_dyn(&self) -> f64 {
        self.cf[0]
    }

    /// Friction force from the current prescribed velocity and acceleration:
    /// `sgn(mv)·c0 + mv·c1 + ma·c2`.
    #[must_use]
    pub fn mf_frc(&self) -> f64 {
        sgn(self.mv) * self.frc_coe[0] + self.mv * self.frc_coe[1] + self.ma * self.frc_coe[2]
    }

    /// Resynchronize `mp` from the actual marker poses.
    pub fn upd_mp(&mut self, mak_i: &MarkerState, mak_j: &MarkerState) {
        self.set_mp(axis_distance(&mak_j.pm, &mak_i.pm, self.axis));
    }

    /// Resynchronize `mv` from the actual marker velocities.
    pub fn upd_mv(&mut self, mak_i: &MarkerState, mak_j: &MarkerState) {
        self.set_mv(relative_screw(&mak_j.pm, &mak_j.vs, &mak_i.vs)[self.axis]);
    }

    /// Resynchronize `ma` from the actual marker accelerations.
    pub fn upd_ma(&mut self, mak_i: &MarkerState, mak_j: &MarkerState) {
        self.set_ma(
            relative_acc_screw(&mak_j.pm, &mak_j.vs, &mak_j.acc, &mak_i.vs, &mak_i.acc)
                [self.axis],
        );
    }
}

impl Constraint for Motion {
    impl_pair_accessors!();

    fn dim(&self) -> usize {
        1
    }

    fn direction_matrix(&self, _: &Isometry3<f64>, _: &Isometry3<f64>) -> DMatrix<f64> {
        DMatrix::from_fn(1, 6, |_, c| if c == self.axis { 1.0 } else { 0.0 })
    }

    fn position_residual(
        &self,
        mak_i_pm: &Isometry3<f64>,
        mak_j_pm: &Isometry3<f64>,
    ) -> DVector<f64> {
        let c = self.direction_matrix(mak_i_pm, mak_j_pm);
        let mut cp = base_position_residual(&c, mak_i_pm, mak_j_pm);
        cp[0] += self.mp();
        cp
    }

    fn velocity_residual(&self, mak_i: &MarkerState, mak_j: &MarkerState) -> DVector<f64> {
        let c = self.direction_matrix(&mak_i.pm, &mak_j.pm);
        let mut cv = base_velocity_residual(&c, mak_i, mak_j);
        cv[0] += self.mv;
        cv
    }

    fn acceleration_residual(&self, mak_i: &MarkerState, mak_j: &MarkerState) -> DVector<f64> {
        let c = self.direction_matrix(&mak_i.pm, &mak_j.pm);
        let mut ca = base_acceleration_residual(&c, mak_i, mak_j);
        ca[0] += self.ma;
        ca
    }
}
