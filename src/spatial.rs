//! Screw (spatial-vector) algebra for rigid-body kinematics.
//!
//! Pure math used by the constraint kernel: pose-screw conversion (SE(3)
//! log/exp), screw frame changes, the motion cross product, and the pose,
//! velocity, and acceleration parametrization conversions (Euler angles,
//! quaternion, homogeneous matrix, point-referenced vectors).
//!
//! # Conventions
//!
//! Screws are `Vector6<f64>` with the **linear part first**:
//! `[tx, ty, tz, rx, ry, rz]`, matching the row ordering of constraint
//! direction matrices. The linear part of a velocity or acceleration screw
//! is referenced to the origin of the frame it is expressed in (the ground
//! origin for global screws), so every frame rigidly attached to a body
//! shares the body's screw.

use nalgebra::{
    Isometry3, Matrix3, Matrix4, Quaternion, Translation3, Unit, UnitQuaternion, Vector3, Vector6,
};

/// 6D motion or force screw: `[linear (3), angular (3)]`.
pub type Screw = Vector6<f64>;

/// Build a screw from its linear and angular parts.
#[inline]
#[must_use]
pub fn screw(lin: Vector3<f64>, ang: Vector3<f64>) -> Screw {
    Screw::new(lin.x, lin.y, lin.z, ang.x, ang.y, ang.z)
}

/// Extract the linear part (first 3 components) of a screw.
#[inline]
#[must_use]
pub fn linear(s: &Screw) -> Vector3<f64> {
    Vector3::new(s[0], s[1], s[2])
}

/// Extract the angular part (last 3 components) of a screw.
#[inline]
#[must_use]
pub fn angular(s: &Screw) -> Vector3<f64> {
    Vector3::new(s[3], s[4], s[5])
}

/// Skew-symmetric (cross-product) matrix of a vector.
#[inline]
#[must_use]
pub fn skew(v: &Vector3<f64>) -> Matrix3<f64> {
    Matrix3::new(0.0, -v.z, v.y, v.z, 0.0, -v.x, -v.y, v.x, 0.0)
}

fn unskew(m: &Matrix3<f64>) -> Vector3<f64> {
    // Symmetrized extraction; exact for a true skew matrix.
    Vector3::new(
        0.5 * (m[(2, 1)] - m[(1, 2)]),
        0.5 * (m[(0, 2)] - m[(2, 0)]),
        0.5 * (m[(1, 0)] - m[(0, 1)]),
    )
}

/// Pose-screw of a rigid transform (SE(3) logarithm).
///
/// Zero exactly when `pm` is the identity; to first order equals
/// `[translation, rotation vector]`, which is what makes it usable as a
/// Newton-Raphson residual.
#[must_use]
pub fn pose_to_screw(pm: &Isometry3<f64>) -> Screw {
    let w = pm.rotation.scaled_axis();
    let t = pm.translation.vector;
    let theta = w.norm();

    let s = skew(&w);
    // V(θ)⁻¹ = I − S/2 + c·S², c = 1/θ² − 1/(2θ·tan(θ/2)), c → 1/12 as θ → 0.
    let c = if theta < 1e-6 {
        1.0 / 12.0
    } else {
        1.0 / (theta * theta) - 1.0 / (2.0 * theta * (0.5 * theta).tan())
    };
    let v = t - 0.5 * (s * t) + c * (s * (s * t));
    screw(v, w)
}

/// Rigid transform of a pose-screw (SE(3) exponential). Inverse of
/// [`pose_to_screw`].
#[must_use]
pub fn screw_to_pose(ps: &Screw) -> Isometry3<f64> {
    let v = linear(ps);
    let w = angular(ps);
    let theta = w.norm();

    let s = skew(&w);
    let (a, b) = if theta < 1e-6 {
        (0.5, 1.0 / 6.0)
    } else {
        (
            (1.0 - theta.cos()) / (theta * theta),
            (theta - theta.sin()) / (theta * theta * theta),
        )
    };
    let t = v + a * (s * v) + b * (s * (s * v));
    Isometry3::from_parts(
        Translation3::from(t),
        UnitQuaternion::from_scaled_axis(w),
    )
}

/// Express a motion screw, given in the frame `pm` is measured in, in the
/// frame `pm` describes.
#[must_use]
pub fn inv_transform_screw(pm: &Isometry3<f64>, s: &Screw) -> Screw {
    let rt = pm.rotation.inverse();
    let p = pm.translation.vector;
    let v = linear(s);
    let w = angular(s);
    screw(rt * (v + w.cross(&p)), rt * w)
}

/// Express a motion screw, given in the frame `pm` describes, in the frame
/// `pm` is measured in. Inverse of [`inv_transform_screw`].
#[must_use]
pub fn transform_screw(pm: &Isometry3<f64>, s: &Screw) -> Screw {
    let r = pm.rotation;
    let p = pm.translation.vector;
    let w = r * angular(s);
    screw(r * linear(s) - w.cross(&p), w)
}

/// Express a force screw `[force, torque]`, given in the frame `pm`
/// describes, in the frame `pm` is measured in.
#[must_use]
pub fn transform_force_screw(pm: &Isometry3<f64>, fs: &Screw) -> Screw {
    let r = pm.rotation;
    let p = pm.translation.vector;
    let f = r * linear(fs);
    let tau = r * angular(fs) + p.cross(&f);
    screw(f, tau)
}

/// Motion-screw cross product `s1 × s2` (the Coriolis coupling term).
#[must_use]
pub fn screw_cross(s1: &Screw, s2: &Screw) -> Screw {
    let v1 = linear(s1);
    let w1 = angular(s1);
    let v2 = linear(s2);
    let w2 = angular(s2);
    screw(w1.cross(&v2) + v1.cross(&w2), w1.cross(&w2))
}

/// Velocity screw of `target` relative to `base`, expressed in the base
/// frame, from both bodies' global screws.
#[must_use]
pub fn relative_screw(pm_base: &Isometry3<f64>, vs_base: &Screw, vs_target: &Screw) -> Screw {
    inv_transform_screw(pm_base, &(vs_target - vs_base))
}

/// Acceleration screw of `target` relative to `base`, expressed in the base
/// frame. Includes the convective term from the base frame's own motion.
#[must_use]
pub fn relative_acc_screw(
    pm_base: &Isometry3<f64>,
    vs_base: &Screw,
    acc_base: &Screw,
    vs_target: &Screw,
    acc_target: &Screw,
) -> Screw {
    let rel = acc_target - acc_base - screw_cross(vs_base, vs_target);
    inv_transform_screw(pm_base, &rel)
}

/// Displacement of `pm_target` relative to `pm_base` along one of the six
/// coordinate directions (translation for axes 0-2, rotation angle about the
/// coordinate axis for 3-5).
///
/// The rotational solve assumes the relative orientation is (close to) a pure
/// rotation about the requested axis.
#[must_use]
pub fn axis_distance(pm_base: &Isometry3<f64>, pm_target: &Isometry3<f64>, axis: usize) -> f64 {
    let rel = pm_base.inv_mul(pm_target);
    if axis < 3 {
        rel.translation.vector[axis]
    } else {
        let m = rel.rotation.to_rotation_matrix().into_inner();
        let k = axis - 3;
        let i = (k + 1) % 3;
        let j = (k + 2) % 3;
        (m[(j, i)] - m[(i, j)]).atan2(m[(i, i)] + m[(j, j)])
    }
}

// ============================================================================
// Euler-angle parametrization
// ============================================================================

/// A coordinate rotation axis.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum Axis {
    /// X axis.
    X,
    /// Y axis.
    Y,
    /// Z axis.
    Z,
}

impl Axis {
    fn index(self) -> usize {
        match self {
            Self::X => 0,
            Self::Y => 1,
            Self::Z => 2,
        }
    }

    fn unit_axis(self) -> Unit<Vector3<f64>> {
        match self {
            Self::X => Vector3::x_axis(),
            Self::Y => Vector3::y_axis(),
            Self::Z => Vector3::z_axis(),
        }
    }
}

/// An intrinsic Euler-angle sequence (proper, like ZYZ, or Tait-Bryan, like
/// ZYX). Adjacent axes must differ.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct EulerSeq {
    axes: [Axis; 3],
}

impl EulerSeq {
    /// The Z-Y-Z proper Euler sequence.
    pub const ZYZ: Self = Self {
        axes: [Axis::Z, Axis::Y, Axis::Z],
    };
    /// The Z-Y-X (yaw-pitch-roll) Tait-Bryan sequence.
    pub const ZYX: Self = Self {
        axes: [Axis::Z, Axis::Y, Axis::X],
    };
    /// The X-Y-Z Tait-Bryan sequence.
    pub const XYZ: Self = Self {
        axes: [Axis::X, Axis::Y, Axis::Z],
    };

    /// Create a sequence; returns `None` if adjacent axes repeat.
    #[must_use]
    pub fn new(axes: [Axis; 3]) -> Option<Self> {
        if axes[0] == axes[1] || axes[1] == axes[2] {
            None
        } else {
            Some(Self { axes })
        }
    }

    /// The three rotation axes, first to last.
    #[must_use]
    pub fn axes(&self) -> [Axis; 3] {
        self.axes
    }

    fn is_proper(self) -> bool {
        self.axes[0] == self.axes[2]
    }
}

fn parity(i: usize, j: usize, k: usize) -> f64 {
    if matches!((i, j, k), (0, 1, 2) | (1, 2, 0) | (2, 0, 1)) {
        1.0
    } else {
        -1.0
    }
}

/// Compose a rotation from intrinsic Euler angles.
#[must_use]
pub fn euler_to_rotation(angles: &Vector3<f64>, seq: EulerSeq) -> UnitQuaternion<f64> {
    let [a0, a1, a2] = seq.axes;
    UnitQuaternion::from_axis_angle(&a0.unit_axis(), angles[0])
        * UnitQuaternion::from_axis_angle(&a1.unit_axis(), angles[1])
        * UnitQuaternion::from_axis_angle(&a2.unit_axis(), angles[2])
}

/// Extract intrinsic Euler angles from a rotation.
///
/// The middle angle is taken in `[0, π]` for proper sequences and
/// `[-π/2, π/2]` for Tait-Bryan sequences.
#[must_use]
pub fn rotation_to_euler(r: &UnitQuaternion<f64>, seq: EulerSeq) -> Vector3<f64> {
    let m = r.to_rotation_matrix().into_inner();
    let i = seq.axes[0].index();
    let j = seq.axes[1].index();

    if seq.is_proper() {
        let k = 3 - i - j;
        let eps = parity(i, j, k);
        let t1 = m[(j, i)].atan2(-eps * m[(k, i)]);
        let t2 = m[(i, i)].clamp(-1.0, 1.0).acos();
        let t3 = m[(i, j)].atan2(eps * m[(i, k)]);
        Vector3::new(t1, t2, t3)
    } else {
        let k = seq.axes[2].index();
        let eps = parity(i, j, k);
        let t1 = (-eps * m[(j, k)]).atan2(m[(k, k)]);
        let t2 = (eps * m[(i, k)]).clamp(-1.0, 1.0).asin();
        let t3 = (-eps * m[(i, j)]).atan2(m[(i, i)]);
        Vector3::new(t1, t2, t3)
    }
}

/// Instantaneous rotation axes of an Euler sequence as matrix columns, so
/// that `ω = M · ė`.
fn euler_rate_axes(angles: &Vector3<f64>, seq: EulerSeq) -> [Vector3<f64>; 3] {
    let [a0, a1, a2] = seq.axes;
    let r1 = UnitQuaternion::from_axis_angle(&a0.unit_axis(), angles[0]);
    let r12 = r1 * UnitQuaternion::from_axis_angle(&a1.unit_axis(), angles[1]);
    [
        a0.unit_axis().into_inner(),
        r1 * a1.unit_axis().into_inner(),
        r12 * a2.unit_axis().into_inner(),
    ]
}

fn solve3(m: &Matrix3<f64>, rhs: &Vector3<f64>) -> Vector3<f64> {
    // Gimbal lock makes the axes matrix singular; NaN propagates per the
    // kernel's numeric-edge-case policy.
    m.lu()
        .solve(rhs)
        .unwrap_or_else(|| Vector3::repeat(f64::NAN))
}

/// Velocity screw from Euler-angle position `pe = [p, e]` and rate
/// `ve = [ṗ, ė]`.
#[must_use]
pub fn ve_to_screw(pe: &Vector6<f64>, ve: &Vector6<f64>, seq: EulerSeq) -> Screw {
    let p = linear(pe);
    let e = angular(pe);
    let u = euler_rate_axes(&e, seq);
    let w = u[0] * ve[3] + u[1] * ve[4] + u[2] * ve[5];
    screw(linear(ve) - w.cross(&p), w)
}

/// Euler-angle rate `[ṗ, ė]` from a velocity screw at pose `pe`.
///
/// Singular at gimbal lock of the sequence.
#[must_use]
pub fn screw_to_ve(vs: &Screw, pe: &Vector6<f64>, seq: EulerSeq) -> Vector6<f64> {
    let p = linear(pe);
    let e = angular(pe);
    let w = angular(vs);
    let u = euler_rate_axes(&e, seq);
    let m = Matrix3::from_columns(&u);
    let edot = solve3(&m, &w);
    screw(linear(vs) + w.cross(&p), edot)
}

/// Acceleration screw from Euler position, rate, and second derivative
/// `ae = [p̈, ë]`.
#[must_use]
pub fn ae_to_screw(
    pe: &Vector6<f64>,
    ve: &Vector6<f64>,
    ae: &Vector6<f64>,
    seq: EulerSeq,
) -> Screw {
    let p = linear(pe);
    let e = angular(pe);
    let u = euler_rate_axes(&e, seq);
    let w1 = u[0] * ve[3];
    let w12 = w1 + u[1] * ve[4];
    let w = w12 + u[2] * ve[5];
    let gamma = w1.cross(&(u[1] * ve[4])) + w12.cross(&(u[2] * ve[5]));
    let dw = u[0] * ae[3] + u[1] * ae[4] + u[2] * ae[5] + gamma;
    let a0 = linear(ae) - dw.cross(&p) - w.cross(&linear(ve));
    screw(a0, dw)
}

/// Euler second derivative `[p̈, ë]` from velocity and acceleration screws
/// at pose `pe`.
#[must_use]
pub fn screw_to_ae(vs: &Screw, acc: &Screw, pe: &Vector6<f64>, seq: EulerSeq) -> Vector6<f64> {
    let p = linear(pe);
    let e = angular(pe);
    let w = angular(vs);
    let dw = angular(acc);
    let u = euler_rate_axes(&e, seq);
    let m = Matrix3::from_columns(&u);
    let edot = solve3(&m, &w);
    let w1 = u[0] * edot[0];
    let w12 = w1 + u[1] * edot[1];
    let gamma = w1.cross(&(u[1] * edot[1])) + w12.cross(&(u[2] * edot[2]));
    let eddot = solve3(&m, &(dw - gamma));
    let pdot = linear(vs) + w.cross(&p);
    let pddot = linear(acc) + dw.cross(&p) + w.cross(&pdot);
    screw(pddot, eddot)
}

// ============================================================================
// Quaternion parametrization
// ============================================================================

/// Velocity screw from quaternion position `(p, q)` and rate `(ṗ, q̇)`.
#[must_use]
pub fn vq_to_screw(
    p: &Vector3<f64>,
    q: &UnitQuaternion<f64>,
    pdot: &Vector3<f64>,
    qdot: &Quaternion<f64>,
) -> Screw {
    let w = (qdot * q.conjugate().into_inner()).imag() * 2.0;
    screw(pdot - w.cross(p), w)
}

/// Quaternion rate `(ṗ, q̇)` from a velocity screw at pose `(p, q)`.
#[must_use]
pub fn screw_to_vq(
    vs: &Screw,
    p: &Vector3<f64>,
    q: &UnitQuaternion<f64>,
) -> (Vector3<f64>, Quaternion<f64>) {
    let w = angular(vs);
    let qdot = Quaternion::from_parts(0.0, w) * q.into_inner() * 0.5;
    (linear(vs) + w.cross(p), qdot)
}

/// Acceleration screw from quaternion position, rate, and second derivative.
#[must_use]
pub fn aq_to_screw(
    p: &Vector3<f64>,
    q: &UnitQuaternion<f64>,
    pdot: &Vector3<f64>,
    qdot: &Quaternion<f64>,
    pddot: &Vector3<f64>,
    qddot: &Quaternion<f64>,
) -> Screw {
    let qc = q.conjugate().into_inner();
    let w = (qdot * qc).imag() * 2.0;
    let dw = ((qddot * qc) + (qdot * qdot.conjugate())).imag() * 2.0;
    let a0 = pddot - dw.cross(p) - w.cross(pdot);
    screw(a0, dw)
}

/// Quaternion second derivative `(p̈, q̈)` from velocity and acceleration
/// screws at pose `(p, q)`.
#[must_use]
pub fn screw_to_aq(
    vs: &Screw,
    acc: &Screw,
    p: &Vector3<f64>,
    q: &UnitQuaternion<f64>,
) -> (Vector3<f64>, Quaternion<f64>) {
    let w = angular(vs);
    let dw = angular(acc);
    let qdot = Quaternion::from_parts(0.0, w) * q.into_inner() * 0.5;
    let qddot =
        (Quaternion::from_parts(0.0, dw) * q.into_inner() + Quaternion::from_parts(0.0, w) * qdot)
            * 0.5;
    let pdot = linear(vs) + w.cross(p);
    let pddot = linear(acc) + dw.cross(p) + w.cross(&pdot);
    (pddot, qddot)
}

// ============================================================================
// Homogeneous-matrix parametrization
// ============================================================================

/// Velocity screw from a pose and the elementwise derivative of its
/// homogeneous matrix.
#[must_use]
pub fn vm_to_screw(pm: &Isometry3<f64>, vm: &Matrix4<f64>) -> Screw {
    let r = pm.rotation.to_rotation_matrix().into_inner();
    let p = pm.translation.vector;
    let rdot = vm.fixed_view::<3, 3>(0, 0).into_owned();
    let pdot = vm.fixed_view::<3, 1>(0, 3).into_owned();
    let w = unskew(&(rdot * r.transpose()));
    screw(pdot - w.cross(&p), w)
}

/// Elementwise derivative of the homogeneous matrix of `pm` from a velocity
/// screw.
#[must_use]
pub fn screw_to_vm(vs: &Screw, pm: &Isometry3<f64>) -> Matrix4<f64> {
    let r = pm.rotation.to_rotation_matrix().into_inner();
    let p = pm.translation.vector;
    let w = angular(vs);
    let mut m = Matrix4::zeros();
    m.fixed_view_mut::<3, 3>(0, 0).copy_from(&(skew(&w) * r));
    m.fixed_view_mut::<3, 1>(0, 3)
        .copy_from(&(linear(vs) + w.cross(&p)));
    m
}

/// Acceleration screw from a pose, its current velocity screw, and the
/// second elementwise derivative of its homogeneous matrix.
#[must_use]
pub fn am_to_screw(pm: &Isometry3<f64>, vs: &Screw, am: &Matrix4<f64>) -> Screw {
    let r = pm.rotation.to_rotation_matrix().into_inner();
    let p = pm.translation.vector;
    let w = angular(vs);
    let rddot = am.fixed_view::<3, 3>(0, 0).into_owned();
    let pddot = am.fixed_view::<3, 1>(0, 3).into_owned();
    let sw = skew(&w);
    let dw = unskew(&(rddot * r.transpose() - sw * sw));
    let pdot = linear(vs) + w.cross(&p);
    screw(pddot - dw.cross(&p) - w.cross(&pdot), dw)
}

/// Second elementwise derivative of the homogeneous matrix of `pm` from
/// velocity and acceleration screws.
#[must_use]
pub fn screw_to_am(vs: &Screw, acc: &Screw, pm: &Isometry3<f64>) -> Matrix4<f64> {
    let r = pm.rotation.to_rotation_matrix().into_inner();
    let p = pm.translation.vector;
    let w = angular(vs);
    let dw = angular(acc);
    let sw = skew(&w);
    let pdot = linear(vs) + w.cross(&p);
    let mut m = Matrix4::zeros();
    m.fixed_view_mut::<3, 3>(0, 0)
        .copy_from(&((skew(&dw) + sw * sw) * r));
    m.fixed_view_mut::<3, 1>(0, 3)
        .copy_from(&(linear(acc) + dw.cross(&p) + w.cross(&pdot)));
    m
}

// ============================================================================
// Point-referenced parametrization
// ============================================================================

/// Velocity screw from `va = [vp, ω]`, where `vp` is the velocity of the
/// body point currently at `p`.
#[must_use]
pub fn va_to_screw(p: &Vector3<f64>, va: &Vector6<f64>) -> Screw {
    let w = angular(va);
    screw(linear(va) - w.cross(p), w)
}

/// Point-referenced velocity `[vp, ω]` at `p` from a velocity screw.
#[must_use]
pub fn screw_to_va(vs: &Screw, p: &Vector3<f64>) -> Vector6<f64> {
    let w = angular(vs);
    screw(linear(vs) + w.cross(p), w)
}

/// Acceleration screw from point-referenced velocity and acceleration
/// `aa = [ap, ω̇]` at `p`.
#[must_use]
pub fn aa_to_screw(p: &Vector3<f64>, va: &Vector6<f64>, aa: &Vector6<f64>) -> Screw {
    let w = angular(va);
    let dw = angular(aa);
    let a0 = linear(aa) - dw.cross(p) - w.cross(&linear(va));
    screw(a0, dw)
}

/// Point-referenced acceleration `[ap, ω̇]` at `p` from velocity and
/// acceleration screws.
#[must_use]
pub fn screw_to_aa(vs: &Screw, acc: &Screw, p: &Vector3<f64>) -> Vector6<f64> {
    let w = angular(vs);
    let dw = angular(acc);
    let vp = linear(vs) + w.cross(p);
    screw(linear(acc) + dw.cross(p) + w.cross(&vp), dw)
}
