//! Six-DOF driven motion: a full prescribed relative pose.
//!
//! [`GeneralMotion`] constrains all six relative coordinates between its
//! markers and drives marker I to the pose `mpm` relative to marker J. The
//! canonical prescribed state is the pose plus a velocity and acceleration
//! screw, both expressed in marker-J's frame; every other parametrization
//! (Euler angles, quaternions, homogeneous-matrix derivatives,
//! point-referenced vectors) converts through the canonical state using the
//! *current* pose and velocity as context.

use nalgebra::{
    DMatrix, DVector, Isometry3, Matrix4, Quaternion, Translation3, UnitQuaternion, Vector3,
    Vector6,
};

use crate::constraint::{
    base_velocity_residual, impl_pair_accessors, Constraint, MarkerPair,
};
use crate::model::{MarkerId, MarkerState};
use crate::spatial::{
    aa_to_screw, ae_to_screw, am_to_screw, angular, aq_to_screw, euler_to_rotation,
    inv_transform_screw, linear, pose_to_screw, relative_acc_screw, relative_screw,
    rotation_to_euler, screw, screw_to_aa, screw_to_ae, screw_to_am, screw_to_aq, screw_to_va,
    screw_to_ve, screw_to_vm, screw_to_vq, va_to_screw, ve_to_screw, vm_to_screw, vq_to_screw,
    EulerSeq, Screw,
};

/// A driven six-DOF pose between two markers.
#[derive(Debug, Clone)]
pub struct GeneralMotion {
    pair: MarkerPair,
    mpm: Isometry3<f64>,
    mvs: Screw,
    mas: Screw,
    cf: DVector<f64>,
}

impl GeneralMotion {
    /// Create a general motion with identity prescribed pose, at rest.
    #[must_use]
    pub fn new(name: impl Into<String>, mak_i: MarkerId, mak_j: MarkerId) -> Self {
        Self {
            pair: MarkerPair::new(name, mak_i, mak_j),
            mpm: Isometry3::identity(),
            mvs: Screw::zeros(),
            mas: Screw::zeros(),
            cf: DVector::zeros(6),
        }
    }

    // ------------------------------------------------------------------
    // Prescribed pose
    // ------------------------------------------------------------------

    /// Prescribed pose of marker I in marker J's frame.
    #[must_use]
    pub fn mpm(&self) -> &Isometry3<f64> {
        &self.mpm
    }

    /// Set the prescribed pose.
    pub fn set_mpm(&mut self, mpm: Isometry3<f64>) {
        self.mpm = mpm;
    }

    /// Prescribed pose as `[position, euler angles]` for the given sequence.
    #[must_use]
    pub fn mpe(&self, seq: EulerSeq) -> Vector6<f64> {
        screw(
            self.mpm.translation.vector,
            rotation_to_euler(&self.mpm.rotation, seq),
        )
    }

    /// Set the prescribed pose from `[position, euler angles]`.
    pub fn set_mpe(&mut self, pe: &Vector6<f64>, seq: EulerSeq) {
        self.mpm = Isometry3::from_parts(
            Translation3::from(linear(pe)),
            euler_to_rotation(&angular(pe), seq),
        );
    }

    /// Prescribed pose as position plus unit quaternion.
    #[must_use]
    pub fn mpq(&self) -> (Vector3<f64>, UnitQuaternion<f64>) {
        (self.mpm.translation.vector, self.mpm.rotation)
    }

    /// Set the prescribed pose from position plus unit quaternion.
    pub fn set_mpq(&mut self, p: &Vector3<f64>, q: &UnitQuaternion<f64>) {
        self.mpm = Isometry3::from_parts(Translation3::from(*p), *q);
    }

    // ------------------------------------------------------------------
    // Prescribed velocity
    // ------------------------------------------------------------------

    /// Prescribed velocity screw, in marker-J's frame.
    #[must_use]
    pub fn mvs(&self) -> &Screw {
        &self.mvs
    }

    /// Set the prescribed velocity screw.
    pub fn set_mvs(&mut self, mvs: Screw) {
        self.mvs = mvs;
    }

    /// Prescribed velocity as `[ṗ, ė]` for the given Euler sequence, at the
    /// current prescribed pose.
    #[must_use]
    pub fn mve(&self, seq: EulerSeq) -> Vector6<f64> {
        screw_to_ve(&self.mvs, &self.mpe(seq), seq)
    }

    /// Set the prescribed velocity from `[ṗ, ė]`.
    pub fn set_mve(&mut self, ve: &Vector6<f64>, seq: EulerSeq) {
        self.mvs = ve_to_screw(&self.mpe(seq), ve, seq);
    }

    /// Prescribed velocity as `(ṗ, q̇)` at the current prescribed pose.
    #[must_use]
    pub fn mvq(&self) -> (Vector3<f64>, Quaternion<f64>) {
        screw_to_vq(&self.mvs, &self.mpm.translation.vector, &self.mpm.rotation)
    }

    /// Set the prescribed velocity from `(ṗ, q̇)`.
    pub fn set_mvq(&mut self, pdot: &Vector3<f64>, qdot: &Quaternion<f64>) {
        self.mvs = vq_to_screw(
            &self.mpm.translation.vector,
            &self.mpm.rotation,
            pdot,
            qdot,
        );
    }

    /// Prescribed velocity as the homogeneous-matrix derivative.
    #[must_use]
    pub fn mvm(&self) -> Matrix4<f64> {
        screw_to_vm(&self.mvs, &self.mpm)
    }

    /// Set the prescribed velocity from a homogeneous-matrix derivative.
    pub fn set_mvm(&mut self, vm: &Matrix4<f64>) {
        self.mvs = vm_to_screw(&self.mpm, vm);
    }

    /// Prescribed velocity as point-referenced `[vp, ω]` at the prescribed
    /// position.
    #[must_use]
    pub fn mva(&self) -> Vector6<f64> {
        screw_to_va(&self.mvs, &self.mpm.translation.vector)
    }

    /// Set the prescribed velocity from point-referenced `[vp, ω]`.
    pub fn set_mva(&mut self, va: &Vector6<f64>) {
        self.mvs = va_to_screw(&self.mpm.translation.vector, va);
    }

    // ------------------------------------------------------------------
    // Prescribed acceleration
    // ------------------------------------------------------------------

    /// Prescribed acceleration screw, in marker-J's frame.
    #[must_use]
    pub fn mas(&self) -> &Screw {
        &self.mas
    }

    /// Set the prescribed acceleration screw.
    pub fn set_mas(&mut self, mas: Screw) {
        self.mas = mas;
    }

    /// Prescribed acceleration as `[p̈, ë]` for the given Euler sequence.
    #[must_use]
    pub fn mae(&self, seq: EulerSeq) -> Vector6<f64> {
        screw_to_ae(&self.mvs, &self.mas, &self.mpe(seq), seq)
    }

    /// Set the prescribed acceleration from `[p̈, ë]`, using the current
    /// prescribed velocity for the convective terms.
    pub fn set_mae(&mut self, ae: &Vector6<f64>, seq: EulerSeq) {
        let pe = self.mpe(seq);
        let ve = self.mve(seq);
        self.mas = ae_to_screw(&pe, &ve, ae, seq);
    }

    /// Prescribed acceleration as `(p̈, q̈)`.
    #[must_use]
    pub fn maq(&self) -> (Vector3<f64>, Quaternion<f64>) {
        screw_to_aq(
            &self.mvs,
            &self.mas,
            &self.mpm.translation.vector,
            &self.mpm.rotation,
        )
    }

    /// Set the prescribed acceleration from `(p̈, q̈)`.
    pub fn set_maq(&mut self, pddot: &Vector3<f64>, qddot: &Quaternion<f64>) {
        let p = self.mpm.translation.vector;
        let q = self.mpm.rotation;
        let (pdot, qdot) = screw_to_vq(&self.mvs, &p, &q);
        self.mas = aq_to_screw(&p, &q, &pdot, &qdot, pddot, qddot);
    }

    /// Prescribed acceleration as the homogeneous-matrix second derivative.
    #[must_use]
    pub fn mam(&self) -> Matrix4<f64> {
        screw_to_am(&self.mvs, &self.mas, &self.mpm)
    }

    /// Set the prescribed acceleration from a homogeneous-matrix second
    /// derivative.
    pub fn set_mam(&mut self, am: &Matrix4<f64>) {
        self.mas = am_to_screw(&self.mpm, &self.mvs, am);
    }

    /// Prescribed acceleration as point-referenced `[ap, ω̇]`.
    #[must_use]
    pub fn maa(&self) -> Vector6<f64> {
        screw_to_aa(&self.mvs, &self.mas, &self.mpm.translation.vector)
    }

    /// Set the prescribed acceleration from point-referenced `[ap, ω̇]`.
    pub fn set_maa(&mut self, aa: &Vector6<f64>) {
        let va = self.mva();
        self.mas = aa_to_screw(&self.mpm.translation.vector, &va, aa);
    }

    // ------------------------------------------------------------------
    // Reaction wrench
    // ------------------------------------------------------------------

    /// Reaction wrench along all six directions.
    #[must_use]
    pub fn mfs(&self) -> Screw {
        Screw::from_column_slice(self.cf.as_slice())
    }

    /// Set the reaction wrench.
    pub fn set_mfs(&mut self, mfs: &Screw) {
        self.cf.copy_from_slice(mfs.as_slice());
    }

    // ------------------------------------------------------------------
    // Resynchronization
    // ------------------------------------------------------------------

    /// Resynchronize the prescribed pose from the actual marker poses.
    pub fn upd_mpm(&mut self, mak_i: &MarkerState, mak_j: &MarkerState) {
        self.mpm = mak_j.pm.inv_mul(&mak_i.pm);
    }

    /// Resynchronize the prescribed velocity from the actual marker
    /// velocities.
    pub fn upd_mvs(&mut self, mak_i: &MarkerState, mak_j: &MarkerState) {
        self.mvs = relative_screw(&mak_j.pm, &mak_j.vs, &mak_i.vs);
    }

    /// Resynchronize the prescribed acceleration from the actual marker
    /// accelerations.
    pub fn upd_mas(&mut self, mak_i: &MarkerState, mak_j: &MarkerState) {
        self.mas = relative_acc_screw(&mak_j.pm, &mak_j.vs, &mak_j.acc, &mak_i.vs, &mak_i.acc);
    }
}

impl Constraint for GeneralMotion {
    impl_pair_accessors!();

    fn dim(&self) -> usize {
        6
    }

    fn direction_matrix(&self, _: &Isometry3<f64>, _: &Isometry3<f64>) -> DMatrix<f64> {
        DMatrix::identity(6, 6)
    }

    /// Pose-screw of the gap between marker I and its commanded pose
    /// `pmJ · mpm`.
    fn position_residual(
        &self,
        mak_i_pm: &Isometry3<f64>,
        mak_j_pm: &Isometry3<f64>,
    ) -> DVector<f64> {
        let target = mak_j_pm * self.mpm;
        let ps = pose_to_screw(&mak_i_pm.inv_mul(&target));
        DVector::from_column_slice(ps.as_slice())
    }

    fn velocity_residual(&self, mak_i: &MarkerState, mak_j: &MarkerState) -> DVector<f64> {
        let c = self.direction_matrix(&mak_i.pm, &mak_j.pm);
        let prescribed = inv_transform_screw(&self.mpm, &self.mvs);
        base_velocity_residual(&c, mak_i, mak_j) + DVector::from_column_slice(prescribed.as_slice())
    }

    /// The prescribed acceleration expressed in marker-I's frame. Unlike the
    /// joints there is no Coriolis projection term here; the prescribed
    /// screw already carries the full relative acceleration.
    fn acceleration_residual(&self, _mak_i: &MarkerState, _mak_j: &MarkerState) -> DVector<f64> {
        let ca = inv_transform_screw(&self.mpm, &self.mas);
        DVector::from_column_slice(ca.as_slice())
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use crate::model::PartId;
    use approx::assert_relative_eq;

    fn pair() -> (MarkerId, MarkerId) {
        (
            MarkerId::new(PartId::new(0), 0),
            MarkerId::new(PartId::new(1), 0),
        )
    }

    fn sample() -> GeneralMotion {
        let (i, j) = pair();
        let mut gm = GeneralMotion::new("gm1", i, j);
        gm.set_mpm(Isometry3::from_parts(
            Translation3::new(0.3, -0.1, 0.8),
            UnitQuaternion::from_scaled_axis(Vector3::new(0.2, 0.4, -0.3)),
        ));
        gm.set_mvs(Screw::new(0.1, -0.2, 0.05, 0.3, 0.1, -0.4));
        gm.set_mas(Screw::new(-0.6, 0.2, 0.9, 0.1, -0.2, 0.3));
        gm
    }

    #[test]
    fn test_pe_round_trip() {
        let mut gm = sample();
        for seq in [EulerSeq::XYZ, EulerSeq::ZYX, EulerSeq::ZYZ] {
            let pe = gm.mpe(seq);
            let mpm = *gm.mpm();
            gm.set_mpe(&pe, seq);
            assert_relative_eq!(
                gm.mpm().to_homogeneous(),
                mpm.to_homogeneous(),
                epsilon = 1e-9
            );
        }
    }

    #[test]
    fn test_pq_round_trip() {
        let mut gm = sample();
        let (p, q) = gm.mpq();
        let mpm = *gm.mpm();
        gm.set_mpq(&p, &q);
        assert_relative_eq!(
            gm.mpm().to_homogeneous(),
            mpm.to_homogeneous(),
            epsilon = 1e-12
        );
    }

    #[test]
    fn test_velocity_round_trips() {
        let mut gm = sample();
        let mvs = *gm.mvs();

        let ve = gm.mve(EulerSeq::ZYX);
        gm.set_mve(&ve, EulerSeq::ZYX);
        assert_relative_eq!(*gm.mvs(), mvs, epsilon = 1e-9);

        let (pdot, qdot) = gm.mvq();
        gm.set_mvq(&pdot, &qdot);
        assert_relative_eq!(*gm.mvs(), mvs, epsilon = 1e-9);

        let vm = gm.mvm();
        gm.set_mvm(&vm);
        assert_relative_eq!(*gm.mvs(), mvs, epsilon = 1e-9);

        let va = gm.mva();
        gm.set_mva(&va);
        assert_relative_eq!(*gm.mvs(), mvs, epsilon = 1e-9);
    }

    #[test]
    fn test_acceleration_round_trips() {
        let mut gm = sample();
        let mas = *gm.mas();

        let ae = gm.mae(EulerSeq::ZYX);
        gm.set_mae(&ae, EulerSeq::ZYX);
        assert_relative_eq!(*gm.mas(), mas, epsilon = 1e-9);

        let (pddot, qddot) = gm.maq();
        gm.set_maq(&pddot, &qddot);
        assert_relative_eq!(*gm.mas(), mas, epsilon = 1e-9);

        let am = gm.mam();
        gm.set_mam(&am);
        assert_relative_eq!(*gm.mas(), mas, epsilon = 1e-9);

        let aa = gm.maa();
        gm.set_maa(&aa);
        assert_relative_eq!(*gm.mas(), mas, epsilon = 1e-9);
    }

    #[test]
    fn test_position_residual_zero_at_commanded_pose() {
        let (i, j) = pair();
        let mut gm = GeneralMotion::new("gm1", i, j);
        let pm_j = Isometry3::from_parts(
            Translation3::new(1.0, 0.0, 0.0),
            UnitQuaternion::from_scaled_axis(Vector3::new(0.0, 0.0, 0.5)),
        );
        let mpm = Isometry3::from_parts(
            Translation3::new(0.0, 0.2, 0.0),
            UnitQuaternion::from_scaled_axis(Vector3::new(0.1, 0.0, 0.0)),
        );
        gm.set_mpm(mpm);
        let pm_i = pm_j * mpm;
        let cp = gm.position_residual(&pm_i, &pm_j);
        assert_eq!(cp.len(), 6);
        assert_relative_eq!(cp.norm(), 0.0, epsilon = 1e-12);
    }

    #[test]
    fn test_residuals_vanish_after_resync() {
        let (i, j) = pair();
        let mut gm = GeneralMotion::new("gm1", i, j);
        let mut mak_i = MarkerState::at_pose(Isometry3::from_parts(
            Translation3::new(0.5, 0.0, 1.0),
            UnitQuaternion::from_scaled_axis(Vector3::new(0.0, 0.3, 0.0)),
        ));
        mak_i.vs = Screw::new(0.2, 0.0, -0.1, 0.0, 0.5, 0.0);
        let mut mak_j = MarkerState::at_pose(Isometry3::translation(0.0, -0.4, 0.0));
        mak_j.vs = Screw::new(0.0, 0.1, 0.0, 0.2, 0.0, 0.0);

        gm.upd_mpm(&mak_i, &mak_j);
        gm.upd_mvs(&mak_i, &mak_j);

        let cp = gm.position_residual(&mak_i.pm, &mak_j.pm);
        assert_relative_eq!(cp.norm(), 0.0, epsilon = 1e-12);
        let cv = gm.velocity_residual(&mak_i, &mak_j);
        assert_relative_eq!(cv.norm(), 0.0, epsilon = 1e-12);
    }

    #[test]
    fn test_mfs_round_trip() {
        let mut gm = sample();
        let w = Screw::new(1.0, -2.0, 3.0, 0.5, 0.0, -0.5);
        gm.set_mfs(&w);
        assert_relative_eq!(gm.mfs(), w, epsilon = 1e-14);
        assert_relative_eq!(gm.cf()[3], 0.5, epsilon = 1e-14);
    }
}
