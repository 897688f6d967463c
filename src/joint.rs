//! Joint variants: permanently active constraints with fixed constrained
//! subspaces.
//!
//! Each joint selects rows of the 6D relative-motion space
//! `[tx, ty, tz, rx, ry, rz]` (expressed in marker-I's frame). Joints carry
//! no prescribed values; the implicit target is always the zero vector.

use nalgebra::{DMatrix, DVector, Isometry3, Vector3};
use std::f64::consts::FRAC_PI_2;

use crate::constraint::{
    base_acceleration_residual, base_position_residual, impl_pair_accessors, Constraint, MarkerPair,
};
use crate::model::{MarkerId, MarkerState};

// ============================================================================
// Revolute
// ============================================================================

/// Revolute (hinge) joint: free rotation about the shared z-axis, dim 5.
///
/// Constrains the three translations plus the two rotation components built
/// from the cross product of the two z-axes, so the rotational residual
/// vanishes exactly when the axes are parallel without any trigonometric
/// inverse.
#[derive(Debug, Clone)]
pub struct RevoluteJoint {
    pair: MarkerPair,
    cf: DVector<f64>,
}

impl RevoluteJoint {
    /// Create a revolute joint between two markers.
    #[must_use]
    pub fn new(name: impl Into<String>, mak_i: MarkerId, mak_j: MarkerId) -> Self {
        Self {
            pair: MarkerPair::new(name, mak_i, mak_j),
            cf: DVector::zeros(5),
        }
    }
}

impl Constraint for RevoluteJoint {
    impl_pair_accessors!();

    fn dim(&self) -> usize {
        5
    }

    fn direction_matrix(&self, _: &Isometry3<f64>, _: &Isometry3<f64>) -> DMatrix<f64> {
        #[rustfmt::skip]
        let rows = [
            1.0, 0.0, 0.0, 0.0, 0.0, 0.0,
            0.0, 1.0, 0.0, 0.0, 0.0, 0.0,
            0.0, 0.0, 1.0, 0.0, 0.0, 0.0,
            0.0, 0.0, 0.0, 1.0, 0.0, 0.0,
            0.0, 0.0, 0.0, 0.0, 1.0, 0.0,
        ];
        DMatrix::from_row_slice(5, 6, &rows)
    }

    fn position_residual(
        &self,
        mak_i_pm: &Isometry3<f64>,
        mak_j_pm: &Isometry3<f64>,
    ) -> DVector<f64> {
        let rel = mak_i_pm.inv_mul(mak_j_pm);
        let t = rel.translation.vector;
        let m = rel.rotation.to_rotation_matrix().into_inner();
        // Rows 3 and 4 are the x/y components of z_i × z_j in I's frame.
        DVector::from_column_slice(&[t.x, t.y, t.z, -m[(1, 2)], m[(0, 2)]])
    }
}

// ============================================================================
// Prismatic
// ============================================================================

/// Prismatic (sliding) joint: free translation along the shared z-axis,
/// dim 5. Constrains `[tx, ty]` and all three rotations.
#[derive(Debug, Clone)]
pub struct PrismaticJoint {
    pair: MarkerPair,
    cf: DVector<f64>,
}

impl PrismaticJoint {
    /// Create a prismatic joint between two markers.
    #[must_use]
    pub fn new(name: impl Into<String>, mak_i: MarkerId, mak_j: MarkerId) -> Self {
        Self {
            pair: MarkerPair::new(name, mak_i, mak_j),
            cf: DVector::zeros(5),
        }
    }
}

impl Constraint for PrismaticJoint {
    impl_pair_accessors!();

    fn dim(&self) -> usize {
        5
    }

    fn direction_matrix(&self, _: &Isometry3<f64>, _: &Isometry3<f64>) -> DMatrix<f64> {
        #[rustfmt::skip]
        let rows = [
            1.0, 0.0, 0.0, 0.0, 0.0, 0.0,
            0.0, 1.0, 0.0, 0.0, 0.0, 0.0,
            0.0, 0.0, 0.0, 1.0, 0.0, 0.0,
            0.0, 0.0, 0.0, 0.0, 1.0, 0.0,
            0.0, 0.0, 0.0, 0.0, 0.0, 1.0,
        ];
        DMatrix::from_row_slice(5, 6, &rows)
    }

    fn position_residual(
        &self,
        mak_i_pm: &Isometry3<f64>,
        mak_j_pm: &Isometry3<f64>,
    ) -> DVector<f64> {
        let c = self.direction_matrix(mak_i_pm, mak_j_pm);
        base_position_residual(&c, mak_i_pm, mak_j_pm)
    }
}

// ============================================================================
// Universal
// ============================================================================

/// Universal (Cardan) joint: two rotational DOF about crossing axes, dim 4.
///
/// The fourth direction row is recomputed every evaluation from the current
/// relative orientation: the projection of marker-J's z-axis onto marker-I's
/// x-y plane, normalized.
///
/// # Precondition
///
/// The two z-axes must not be collinear: the projection then has zero norm
/// and the normalization divides by zero. This singular configuration is not
/// defended against; NaN propagates to the solver.
#[derive(Debug, Clone)]
pub struct UniversalJoint {
    pair: MarkerPair,
    cf: DVector<f64>,
}

impl UniversalJoint {
    /// Create a universal joint between two markers.
    #[must_use]
    pub fn new(name: impl Into<String>, mak_i: MarkerId, mak_j: MarkerId) -> Self {
        Self {
            pair: MarkerPair::new(name, mak_i, mak_j),
            cf: DVector::zeros(4),
        }
    }
}

impl Constraint for UniversalJoint {
    impl_pair_accessors!();

    fn dim(&self) -> usize {
        4
    }

    fn direction_matrix(
        &self,
        mak_i_pm: &Isometry3<f64>,
        mak_j_pm: &Isometry3<f64>,
    ) -> DMatrix<f64> {
        // z_i × z_j in I's frame; z_i is (0,0,1) there, so the cross product
        // is (-y, x, 0) of J's z-axis components.
        let zj = (mak_i_pm.rotation.inverse() * mak_j_pm.rotation) * Vector3::z();
        let norm = zj.x.hypot(zj.y);
        #[rustfmt::skip]
        let rows = [
            1.0, 0.0, 0.0, 0.0,           0.0,          0.0,
            0.0, 1.0, 0.0, 0.0,           0.0,          0.0,
            0.0, 0.0, 1.0, 0.0,           0.0,          0.0,
            0.0, 0.0, 0.0, -zj.y / norm,  zj.x / norm,  0.0,
        ];
        DMatrix::from_row_slice(4, 6, &rows)
    }

    fn position_residual(
        &self,
        mak_i_pm: &Isometry3<f64>,
        mak_j_pm: &Isometry3<f64>,
    ) -> DVector<f64> {
        let rel = mak_i_pm.inv_mul(mak_j_pm);
        let t = rel.translation.vector;
        let m = rel.rotation.to_rotation_matrix().into_inner();
        // The z-axes must cross at 90°.
        let angle = -FRAC_PI_2 + m[(2, 2)].acos();
        DVector::from_column_slice(&[t.x, t.y, t.z, angle])
    }

    fn acceleration_residual(&self, mak_i: &MarkerState, mak_j: &MarkerState) -> DVector<f64> {
        let c = self.direction_matrix(&mak_i.pm, &mak_j.pm);
        let mut ca = base_acceleration_residual(&c, mak_i, mak_j);

        // Quadratic coupling of the two spin rates about the crossing axes
        // (the universal joint's non-holonomic term). All quantities are
        // dotted pairwise, so any common frame works; use ground.
        let zi = mak_i.pm.rotation * Vector3::z();
        let zj = mak_j.pm.rotation * Vector3::z();
        let wm = Vector3::new(mak_i.vs[3], mak_i.vs[4], mak_i.vs[5]);
        let wn = Vector3::new(mak_j.vs[3], mak_j.vs[4], mak_j.vs[5]);

        let iwm = zi.dot(&wm);
        let jwm = zj.dot(&wm);
        let iwn = zi.dot(&wn);
        let jwn = zj.dot(&wn);

        ca[3] += 2.0 * jwm * iwn - jwm * iwm - jwn * iwn;
        ca
    }
}

// ============================================================================
// Spherical
// ============================================================================

/// Spherical (ball) joint: all rotation free, dim 3. Constrains only the
/// three translations, computed as the plain relative position.
#[derive(Debug, Clone)]
pub struct SphericalJoint {
    pair: MarkerPair,
    cf: DVector<f64>,
}

impl SphericalJoint {
    /// Create a spherical joint between two markers.
    #[must_use]
    pub fn new(name: impl Into<String>, mak_i: MarkerId, mak_j: MarkerId) -> Self {
        Self {
            pair: MarkerPair::new(name, mak_i, mak_j),
            cf: DVector::zeros(3),
        }
    }
}

impl Constraint for SphericalJoint {
    impl_pair_accessors!();

    fn dim(&self) -> usize {
        3
    }

    fn direction_matrix(&self, _: &Isometry3<f64>, _: &Isometry3<f64>) -> DMatrix<f64> {
        #[rustfmt::skip]
        let rows = [
            1.0, 0.0, 0.0, 0.0, 0.0, 0.0,
            0.0, 1.0, 0.0, 0.0, 0.0, 0.0,
            0.0, 0.0, 1.0, 0.0, 0.0, 0.0,
        ];
        DMatrix::from_row_slice(3, 6, &rows)
    }

    fn position_residual(
        &self,
        mak_i_pm: &Isometry3<f64>,
        mak_j_pm: &Isometry3<f64>,
    ) -> DVector<f64> {
        // Rotation is unconstrained, so no pose-screw is needed.
        let pp = mak_i_pm.inverse_transform_point(&nalgebra::Point3::from(
            mak_j_pm.translation.vector,
        ));
        DVector::from_column_slice(&[pp.x, pp.y, pp.z])
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use crate::model::PartId;
    use crate::spatial::Screw;
    use approx::assert_relative_eq;
    use nalgebra::{Translation3, UnitQuaternion};

    fn pair() -> (MarkerId, MarkerId) {
        (
            MarkerId::new(PartId::new(0), 0),
            MarkerId::new(PartId::new(1), 0),
        )
    }

    fn pose(t: [f64; 3], scaled_axis: [f64; 3]) -> Isometry3<f64> {
        Isometry3::from_parts(
            Translation3::new(t[0], t[1], t[2]),
            UnitQuaternion::from_scaled_axis(Vector3::new(
                scaled_axis[0],
                scaled_axis[1],
                scaled_axis[2],
            )),
        )
    }

    #[test]
    fn test_revolute_satisfied_configuration() {
        let (i, j) = pair();
        let joint = RevoluteJoint::new("r1", i, j);
        // Coincident origins, parallel z-axes, arbitrary rotation about z.
        let pm_i = pose([0.4, -0.2, 0.9], [0.0, 0.0, 0.3]);
        let pm_j = pose([0.4, -0.2, 0.9], [0.0, 0.0, 1.4]);
        let cp = joint.position_residual(&pm_i, &pm_j);
        assert_eq!(cp.len(), 5);
        assert_relative_eq!(cp.norm(), 0.0, epsilon = 1e-12);
    }

    #[test]
    fn test_revolute_constrained_perturbations() {
        let (i, j) = pair();
        let joint = RevoluteJoint::new("r1", i, j);
        let pm_i = Isometry3::identity();

        // Translation along a constrained direction shows up in the matching
        // row, proportionally.
        let cp = joint.position_residual(&pm_i, &Isometry3::translation(0.0, 1e-3, 0.0));
        assert_relative_eq!(cp[1], 1e-3, epsilon = 1e-12);

        // Tilting the z-axis about x shows up in the first rotation row.
        let cp = joint.position_residual(&pm_i, &pose([0.0; 3], [1e-3, 0.0, 0.0]));
        assert!(cp[3].abs() > 5e-4);
        assert_relative_eq!(cp[4], 0.0, epsilon = 1e-9);
    }

    #[test]
    fn test_revolute_free_direction_stays_zero() {
        let (i, j) = pair();
        let joint = RevoluteJoint::new("r1", i, j);
        let cp = joint.position_residual(&Isometry3::identity(), &pose([0.0; 3], [0.0, 0.0, 0.2]));
        assert_relative_eq!(cp.norm(), 0.0, epsilon = 1e-12);
    }

    #[test]
    fn test_prismatic_free_slide() {
        let (i, j) = pair();
        let joint = PrismaticJoint::new("p1", i, j);
        let cp = joint.position_residual(&Isometry3::identity(), &Isometry3::translation(0.0, 0.0, 0.7));
        assert_eq!(cp.len(), 5);
        assert_relative_eq!(cp.norm(), 0.0, epsilon = 1e-12);
    }

    #[test]
    fn test_prismatic_constrained_rotation() {
        let (i, j) = pair();
        let joint = PrismaticJoint::new("p1", i, j);
        let cp = joint.position_residual(&Isometry3::identity(), &pose([0.0; 3], [0.0, 0.0, 1e-3]));
        assert_relative_eq!(cp[4], 1e-3, epsilon = 1e-9);
    }

    #[test]
    fn test_universal_satisfied_configuration() {
        let (i, j) = pair();
        let joint = UniversalJoint::new("u1", i, j);
        // J's z-axis tipped 90° about x: perpendicular to I's z-axis.
        let pm_i = Isometry3::identity();
        let pm_j = pose([0.0; 3], [FRAC_PI_2, 0.0, 0.0]);
        let cp = joint.position_residual(&pm_i, &pm_j);
        assert_eq!(cp.len(), 4);
        assert_relative_eq!(cp.norm(), 0.0, epsilon = 1e-12);
    }

    #[test]
    fn test_universal_axis_angle_deviation() {
        let (i, j) = pair();
        let joint = UniversalJoint::new("u1", i, j);
        // 80° instead of 90°: deviation of -10°.
        let pm_j = pose([0.0; 3], [80f64.to_radians(), 0.0, 0.0]);
        let cp = joint.position_residual(&Isometry3::identity(), &pm_j);
        assert_relative_eq!(cp[3], -(10f64.to_radians()), epsilon = 1e-10);
    }

    #[test]
    fn test_universal_direction_row_normalized() {
        let (i, j) = pair();
        let joint = UniversalJoint::new("u1", i, j);
        let pm_j = pose([0.0; 3], [FRAC_PI_2, 0.0, 0.0]);
        let c = joint.direction_matrix(&Isometry3::identity(), &pm_j);
        let row = Vector3::new(c[(3, 3)], c[(3, 4)], c[(3, 5)]);
        assert_relative_eq!(row.norm(), 1.0, epsilon = 1e-12);
        // J's z-axis lies along -y in I's frame; the row is z_i × z_j = (1,0,0).
        assert_relative_eq!(row.x, 1.0, epsilon = 1e-12);
    }

    #[test]
    fn test_universal_coupling_vanishes_at_rest() {
        let (i, j) = pair();
        let joint = UniversalJoint::new("u1", i, j);
        let mak_i = MarkerState::at_pose(Isometry3::identity());
        let mak_j = MarkerState::at_pose(pose([0.0; 3], [FRAC_PI_2, 0.0, 0.0]));
        let ca = joint.acceleration_residual(&mak_i, &mak_j);
        assert_relative_eq!(ca.norm(), 0.0, epsilon = 1e-14);
    }

    #[test]
    fn test_universal_coupling_term() {
        let (i, j) = pair();
        let joint = UniversalJoint::new("u1", i, j);
        // General spins on both bodies, J tipped 90° about x so its z-axis
        // lies along global -y.
        let mak_i = MarkerState::new(
            Isometry3::identity(),
            Screw::new(0.0, 0.0, 0.0, 0.5, 0.7, 2.0),
            Screw::zeros(),
        );
        let mak_j = MarkerState::new(
            pose([0.0; 3], [FRAC_PI_2, 0.0, 0.0]),
            Screw::new(0.0, 0.0, 0.0, 1.0, -0.3, 0.4),
            Screw::zeros(),
        );
        // zi = (0,0,1), zj = (0,-1,0):
        // iwm = 2.0, jwm = -0.7, iwn = 0.4, jwn = 0.3, so the coupling is
        // 2·(-0.7)(0.4) - (-0.7)(2.0) - (0.3)(0.4) = 0.72 on top of the
        // Coriolis projection -(wm × wn).x = -0.88.
        let ca = joint.acceleration_residual(&mak_i, &mak_j);
        assert_relative_eq!(ca[3], -0.16, epsilon = 1e-12);

        let c = joint.direction_matrix(&mak_i.pm, &mak_j.pm);
        let base = crate::constraint::base_acceleration_residual(&c, &mak_i, &mak_j);
        assert_relative_eq!(ca[3] - base[3], 0.72, epsilon = 1e-12);
        // Translation rows carry no coupling.
        for k in 0..3 {
            assert_relative_eq!(ca[k], base[k], epsilon = 1e-14);
        }
    }

    #[test]
    fn test_spherical_satisfied_and_perturbed() {
        let (i, j) = pair();
        let joint = SphericalJoint::new("s1", i, j);
        let pm_i = pose([1.0, 2.0, 3.0], [0.5, -0.2, 0.1]);
        // Same origin, wildly different rotation: satisfied.
        let pm_j = pose([1.0, 2.0, 3.0], [-0.9, 0.4, 1.2]);
        let cp = joint.position_residual(&pm_i, &pm_j);
        assert_eq!(cp.len(), 3);
        assert_relative_eq!(cp.norm(), 0.0, epsilon = 1e-12);

        // Offset origin: proportional residual in I's frame.
        let pm_j = pose([1.0, 2.0, 3.001], [-0.9, 0.4, 1.2]);
        let cp = joint.position_residual(&pm_i, &pm_j);
        assert_relative_eq!(cp.norm(), 1e-3, epsilon = 1e-9);
    }

    #[test]
    fn test_joint_cf_round_trip() {
        let (i, j) = pair();
        let mut joint = RevoluteJoint::new("r1", i, j);
        joint.set_cf(&[1.0, 2.0, 3.0, 4.0, 5.0]).unwrap();
        assert_relative_eq!(joint.cf()[4], 5.0, epsilon = 1e-14);
        assert!(joint.set_cf(&[1.0, 2.0]).is_err());
    }
}
