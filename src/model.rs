//! Minimal part/marker container.
//!
//! Interactions reference markers by arena index into a [`Model`]; the model
//! owns parts, parts own markers. The surrounding solver is responsible for
//! writing part poses and screws after each iteration; this module only
//! derives per-marker state from them.

use nalgebra::Isometry3;

use crate::spatial::Screw;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Index of a part within a [`Model`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct PartId(pub usize);

impl PartId {
    /// Create a part id from a raw index.
    #[must_use]
    pub const fn new(index: usize) -> Self {
        Self(index)
    }

    /// Get the raw index.
    #[must_use]
    pub const fn raw(self) -> usize {
        self.0
    }
}

/// Index of a marker: owning part plus position within that part.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct MarkerId {
    /// The owning part.
    pub part: PartId,
    /// Index of the marker within the part.
    pub index: usize,
}

impl MarkerId {
    /// Create a marker id.
    #[must_use]
    pub const fn new(part: PartId, index: usize) -> Self {
        Self { part, index }
    }
}

/// A named reference frame rigidly attached to a part.
#[derive(Debug, Clone)]
pub struct Marker {
    name: String,
    prt_pm: Isometry3<f64>,
}

impl Marker {
    /// Create a marker with the given pose relative to its part.
    #[must_use]
    pub fn new(name: impl Into<String>, prt_pm: Isometry3<f64>) -> Self {
        Self {
            name: name.into(),
            prt_pm,
        }
    }

    /// The marker name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Pose of the marker in its part's frame.
    #[must_use]
    pub fn prt_pm(&self) -> &Isometry3<f64> {
        &self.prt_pm
    }
}

/// A rigid body with a global pose, velocity screw, and acceleration screw.
#[derive(Debug, Clone)]
pub struct Part {
    name: String,
    pm: Isometry3<f64>,
    vs: Screw,
    acc: Screw,
    markers: Vec<Marker>,
}

impl Part {
    /// Create a part at the identity pose, at rest.
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            pm: Isometry3::identity(),
            vs: Screw::zeros(),
            acc: Screw::zeros(),
            markers: Vec::new(),
        }
    }

    /// The part name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Global pose of the part.
    #[must_use]
    pub fn pm(&self) -> &Isometry3<f64> {
        &self.pm
    }

    /// Set the global pose.
    pub fn set_pm(&mut self, pm: Isometry3<f64>) {
        self.pm = pm;
    }

    /// Global velocity screw of the part.
    #[must_use]
    pub fn vs(&self) -> &Screw {
        &self.vs
    }

    /// Set the global velocity screw.
    pub fn set_vs(&mut self, vs: Screw) {
        self.vs = vs;
    }

    /// Global acceleration screw of the part.
    #[must_use]
    pub fn acc(&self) -> &Screw {
        &self.acc
    }

    /// Set the global acceleration screw.
    pub fn set_acc(&mut self, acc: Screw) {
        self.acc = acc;
    }

    /// Add a marker; returns its index within this part.
    pub fn add_marker(&mut self, marker: Marker) -> usize {
        self.markers.push(marker);
        self.markers.len() - 1
    }

    /// Find a marker by name.
    #[must_use]
    pub fn find_marker(&self, name: &str) -> Option<usize> {
        self.markers.iter().position(|m| m.name() == name)
    }

    /// Get a marker by index.
    #[must_use]
    pub fn marker(&self, index: usize) -> Option<&Marker> {
        self.markers.get(index)
    }

    /// Iterate over the part's markers.
    pub fn markers(&self) -> impl Iterator<Item = &Marker> {
        self.markers.iter()
    }
}

/// Kinematic snapshot of a marker, consumed by constraint evaluation.
///
/// A plain value: evaluations never touch the model directly, so snapshots
/// can be shared freely across worker threads.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MarkerState {
    /// Global pose of the marker.
    pub pm: Isometry3<f64>,
    /// Global velocity screw (origin-referenced, body-wide).
    pub vs: Screw,
    /// Global acceleration screw.
    pub acc: Screw,
}

impl MarkerState {
    /// Create a marker state.
    #[must_use]
    pub fn new(pm: Isometry3<f64>, vs: Screw, acc: Screw) -> Self {
        Self { pm, vs, acc }
    }

    /// A marker at the given pose, at rest.
    #[must_use]
    pub fn at_pose(pm: Isometry3<f64>) -> Self {
        Self::new(pm, Screw::zeros(), Screw::zeros())
    }
}

/// Arena of parts and their markers.
#[derive(Debug, Clone, Default)]
pub struct Model {
    parts: Vec<Part>,
}

impl Model {
    /// Create an empty model.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Whether the model has no parts yet.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.parts.is_empty()
    }

    /// Add a part; returns its id.
    pub fn add_part(&mut self, part: Part) -> PartId {
        self.parts.push(part);
        PartId::new(self.parts.len() - 1)
    }

    /// Get a part by id.
    #[must_use]
    pub fn part(&self, id: PartId) -> Option<&Part> {
        self.parts.get(id.raw())
    }

    /// Get a part mutably by id.
    pub fn part_mut(&mut self, id: PartId) -> Option<&mut Part> {
        self.parts.get_mut(id.raw())
    }

    /// Find a part by name.
    #[must_use]
    pub fn find_part(&self, name: &str) -> Option<PartId> {
        self.parts
            .iter()
            .position(|p| p.name() == name)
            .map(PartId::new)
    }

    /// Find a marker by part and marker name.
    #[must_use]
    pub fn find_marker(&self, part_name: &str, marker_name: &str) -> Option<MarkerId> {
        let part_id = self.find_part(part_name)?;
        let index = self.part(part_id)?.find_marker(marker_name)?;
        Some(MarkerId::new(part_id, index))
    }

    /// Resolve a marker id to its part and marker.
    #[must_use]
    pub fn marker(&self, id: MarkerId) -> Option<(&Part, &Marker)> {
        let part = self.part(id.part)?;
        let marker = part.marker(id.index)?;
        Some((part, marker))
    }

    /// Kinematic state of a marker, derived from its part: the marker pose
    /// composes with the part pose, the screws are the part's.
    #[must_use]
    pub fn marker_state(&self, id: MarkerId) -> Option<MarkerState> {
        let (part, marker) = self.marker(id)?;
        Some(MarkerState::new(
            part.pm() * marker.prt_pm(),
            *part.vs(),
            *part.acc(),
        ))
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use nalgebra::{Translation3, UnitQuaternion, Vector3};

    #[test]
    fn test_lookup_by_name() {
        let mut model = Model::new();
        let mut part = Part::new("link1");
        part.add_marker(Marker::new("joint_i", Isometry3::identity()));
        model.add_part(part);

        let id = model.find_marker("link1", "joint_i").unwrap();
        assert_eq!(id.part, PartId::new(0));
        assert_eq!(id.index, 0);

        assert!(model.find_marker("link1", "missing").is_none());
        assert!(model.find_marker("missing", "joint_i").is_none());
    }

    #[test]
    fn test_marker_state_composes_part_pose() {
        let mut model = Model::new();
        let mut part = Part::new("link1");
        part.set_pm(Isometry3::from_parts(
            Translation3::new(1.0, 0.0, 0.0),
            UnitQuaternion::from_axis_angle(&Vector3::z_axis(), std::f64::consts::FRAC_PI_2),
        ));
        let idx = part.add_marker(Marker::new("m", Isometry3::translation(1.0, 0.0, 0.0)));
        let pid = model.add_part(part);

        let state = model.marker_state(MarkerId::new(pid, idx)).unwrap();
        // Part at (1,0,0) rotated 90° about z; marker offset (1,0,0) lands
        // at (1,1,0).
        assert_relative_eq!(state.pm.translation.vector.x, 1.0, epsilon = 1e-12);
        assert_relative_eq!(state.pm.translation.vector.y, 1.0, epsilon = 1e-12);
    }

    #[test]
    fn test_marker_screws_are_body_wide() {
        let mut model = Model::new();
        let mut part = Part::new("link1");
        let vs = Screw::new(0.1, 0.2, 0.3, 0.4, 0.5, 0.6);
        part.set_vs(vs);
        let a = part.add_marker(Marker::new("a", Isometry3::identity()));
        let b = part.add_marker(Marker::new("b", Isometry3::translation(0.0, 2.0, 0.0)));
        let pid = model.add_part(part);

        let sa = model.marker_state(MarkerId::new(pid, a)).unwrap();
        let sb = model.marker_state(MarkerId::new(pid, b)).unwrap();
        assert_relative_eq!(sa.vs, sb.vs, epsilon = 1e-14);
        assert_relative_eq!(sa.vs, vs, epsilon = 1e-14);
    }
}
