//! Constraint kernel for multibody mechanism simulation.
//!
//! This crate provides the interaction layer of a mechanism solver: joints,
//! driven motions, and force elements defined between pairs of markers
//! (body-fixed frames). Each constraint reports, for the current marker
//! kinematics, which components of the 6D relative-motion space it
//! constrains and how far the mechanism currently deviates from
//! satisfaction.
//!
//! # Interaction Types
//!
//! - [`RevoluteJoint`]: rotation about a shared z-axis (dim 5)
//! - [`PrismaticJoint`]: translation along a shared z-axis (dim 5)
//! - [`UniversalJoint`]: two crossing rotation axes (dim 4)
//! - [`SphericalJoint`]: ball-and-socket (dim 3)
//! - [`Motion`]: one driven relative coordinate with friction model (dim 1)
//! - [`GeneralMotion`]: a fully prescribed relative pose (dim 6)
//! - [`SingleComponentForce`]: an applied force/torque pair, not a constraint
//!
//! # Constraint Formulation
//!
//! Every constraint exposes a `dim × 6` direction matrix over the
//! relative-motion coordinates `[tx, ty, tz, rx, ry, rz]` in marker-I's
//! frame, plus three residual vectors:
//!
//! ```text
//! cp = 0   at the demanded relative pose      (Newton-Raphson residual)
//! cv = 0   at the demanded relative velocity
//! ca       right-hand side of the acceleration equation
//! ```
//!
//! The surrounding solver owns assembly and iteration; this crate is a
//! deterministic, side-effect-free numeric kernel with no I/O of its own
//! beyond the XML persistence in [`xml`].
//!
//! # Example
//!
//! ```
//! use mech_constraint::{Constraint, Marker, Model, Part, RevoluteJoint};
//! use nalgebra::Isometry3;
//!
//! let mut model = Model::new();
//! let mut ground = Part::new("ground");
//! let g = ground.add_marker(Marker::new("hinge_j", Isometry3::identity()));
//! let ground_id = model.add_part(ground);
//! let mut link = Part::new("link1");
//! let l = link.add_marker(Marker::new("hinge_i", Isometry3::identity()));
//! let link_id = model.add_part(link);
//!
//! let joint = RevoluteJoint::new(
//!     "hinge",
//!     mech_constraint::MarkerId::new(link_id, l),
//!     mech_constraint::MarkerId::new(ground_id, g),
//! );
//!
//! let mak_i = model.marker_state(joint.mak_i()).unwrap();
//! let mak_j = model.marker_state(joint.mak_j()).unwrap();
//! let cp = joint.position_residual(&mak_i.pm, &mak_j.pm);
//! assert!(cp.norm() < 1e-12);
//! ```

#![doc(html_root_url = "https://docs.rs/mech-constraint/0.1.0")]
#![deny(clippy::unwrap_used, clippy::expect_used)]
#![warn(missing_docs)]
#![allow(clippy::missing_const_for_fn)]

mod constraint;
mod error;
mod force;
mod general_motion;
mod joint;
mod model;
mod motion;
pub mod spatial;
pub mod xml;

pub use constraint::{Constraint, MarkerPair};
pub use error::ConstraintError;
pub use force::SingleComponentForce;
pub use general_motion::GeneralMotion;
pub use joint::{PrismaticJoint, RevoluteJoint, SphericalJoint, UniversalJoint};
pub use model::{Marker, MarkerId, MarkerState, Model, Part, PartId};
pub use motion::Motion;
pub use spatial::{Axis, EulerSeq, Screw};
pub use xml::{read_interactions, write_interactions, Element};

/// Convenience alias for results with [`ConstraintError`].
pub type Result<T> = std::result::Result<T, ConstraintError>;
