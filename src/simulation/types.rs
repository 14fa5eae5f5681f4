//! Core types for the traffic simulation
//!
//! Id handles and geometry shared by every component. Ids index Vec
//! arenas owned by the road network, so cross-references between
//! junctions, roads and vehicles never form ownership cycles.

/// Handle for a junction in the network arena
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct JunctionId(pub usize);

/// Handle for a road in the network arena
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct RoadId(pub usize);

/// Handle for a building record
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct BuildingId(pub usize);

/// Handle for a vehicle agent
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct VehicleId(pub usize);

/// Fixed cost added to every road's polyline length.
///
/// Keeps degenerate short roads from having near-zero routing weight and
/// accounts for the junction tiles at either end.
pub const ROAD_BASE_COST: f32 = 2.0;

/// Two directions count as parallel when their unit dot product is above
/// `1.0 - TURN_DOT_EPSILON`.
pub const TURN_DOT_EPSILON: f32 = 1e-3;

/// Two junction arms count as geometrically opposite when the dot product
/// of their outgoing unit directions is at or below this threshold.
pub const OPPOSITE_DOT_THRESHOLD: f32 = -0.95;

/// Tolerance for "this point coincides with that junction" checks.
pub const ENDPOINT_TOLERANCE: f32 = 0.25;

/// A 3D position in the simulation
///
/// Movement and angles happen on the x/z ground plane; y is carried along
/// for elevation-aware consumers.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Position {
    pub x: f32,
    pub y: f32,
    pub z: f32,
}

impl Position {
    pub fn new(x: f32, y: f32, z: f32) -> Self {
        Self { x, y, z }
    }

    pub fn distance(&self, other: &Position) -> f32 {
        let dx = self.x - other.x;
        let dy = self.y - other.y;
        let dz = self.z - other.z;
        (dx * dx + dy * dy + dz * dz).sqrt()
    }

    pub fn lerp(&self, other: &Position, t: f32) -> Position {
        Position {
            x: self.x + (other.x - self.x) * t,
            y: self.y + (other.y - self.y) * t,
            z: self.z + (other.z - self.z) * t,
        }
    }

    /// Calculate the angle from this position to another (Y-axis rotation)
    pub fn angle_to(&self, other: &Position) -> f32 {
        let dx = other.x - self.x;
        let dz = other.z - self.z;
        let direction_len = (dx * dx + dz * dz).sqrt();
        if direction_len > 0.0 {
            (dx / direction_len).atan2(dz / direction_len)
        } else {
            0.0
        }
    }

    /// Unit direction on the ground plane from this position to another.
    ///
    /// Returns `None` when the two positions coincide on the plane.
    pub fn direction_to(&self, other: &Position) -> Option<(f32, f32)> {
        let dx = other.x - self.x;
        let dz = other.z - self.z;
        let len = (dx * dx + dz * dz).sqrt();
        if len > 1e-6 {
            Some((dx / len, dz / len))
        } else {
            None
        }
    }
}

/// Total arc length of a polyline on the ground plane
pub fn polyline_length(points: &[Position]) -> f32 {
    points
        .windows(2)
        .map(|pair| pair[0].distance(&pair[1]))
        .sum()
}

/// Smallest signed difference between two Y-axis angles, in (-pi, pi]
pub fn angle_delta(from: f32, to: f32) -> f32 {
    let mut delta = to - from;
    while delta > std::f32::consts::PI {
        delta -= std::f32::consts::TAU;
    }
    while delta <= -std::f32::consts::PI {
        delta += std::f32::consts::TAU;
    }
    delta
}
