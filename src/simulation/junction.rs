//! Junction records and crossing arbitration
//!
//! A junction owns its ordered incident road arms and, when
//! light-controlled, its phase controller. It also carries a
//! reserve/release crossing hook: stop-controlled junctions use it today
//! to serialize crossings, and a richer merge arbitration policy can
//! replace it without touching the vehicle loop.

use super::lights::TrafficLightController;
use super::types::{JunctionId, Position, RoadId, VehicleId};

/// Time a vehicle needs to clear a stop-controlled junction
pub const CROSSING_TIME: f32 = 0.25;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JunctionKind {
    /// Uncontrolled pass-through
    Plain,
    /// Crossings serialized through the reservation hook
    StopControlled,
    /// Phases run by a TrafficLightController
    LightControlled,
}

/// A node of the road graph
#[derive(Debug, Clone)]
pub struct Junction {
    pub id: JunctionId,
    pub position: Position,
    pub kind: JunctionKind,
    /// Incident road arms, clockwise order fixed by `RoadNetwork::finalize`.
    /// A self-loop road appears twice, once per attachment.
    pub roads: Vec<RoadId>,
    pub controller: Option<TrafficLightController>,
    /// Reservation hook state
    occupied_by: Option<VehicleId>,
    occupation_timer: f32,
    /// Throughput counter, reset on read
    exited: u32,
}

impl Junction {
    pub fn new(id: JunctionId, position: Position, kind: JunctionKind) -> Self {
        Self {
            id,
            position,
            kind,
            roads: Vec::new(),
            controller: None,
            occupied_by: None,
            occupation_timer: 0.0,
            exited: 0,
        }
    }

    /// Arm index of a road at this junction (first attachment for loops)
    pub fn arm_index(&self, road: RoadId) -> Option<usize> {
        self.roads.iter().position(|r| *r == road)
    }

    /// Reservation hook: try to cross.
    ///
    /// A free junction is claimed and the caller waits out the crossing
    /// time; the holder may proceed once the timer has run down; everyone
    /// else waits.
    pub fn can_proceed(&mut self, vehicle: VehicleId) -> bool {
        match self.occupied_by {
            None => {
                self.occupied_by = Some(vehicle);
                self.occupation_timer = 0.0;
                false
            }
            Some(holder) if holder == vehicle => self.occupation_timer >= CROSSING_TIME,
            Some(_) => false,
        }
    }

    /// Whether this vehicle currently holds the reservation
    pub fn is_held_by(&self, vehicle: VehicleId) -> bool {
        self.occupied_by == Some(vehicle)
    }

    /// Reservation hook: give the junction back after crossing
    pub fn release(&mut self, vehicle: VehicleId) {
        if self.occupied_by == Some(vehicle) {
            self.occupied_by = None;
            self.occupation_timer = 0.0;
        }
    }

    /// Advance the occupation timer while someone holds the junction
    pub fn update_timer(&mut self, dt: f32) {
        if self.occupied_by.is_some() {
            self.occupation_timer += dt;
        }
    }

    /// Drop any reservation, used on world reset
    pub fn clear_reservation(&mut self) {
        self.occupied_by = None;
        self.occupation_timer = 0.0;
    }

    pub fn record_exit(&mut self) {
        self.exited += 1;
    }

    /// Vehicles that passed through since the last read; resets on read
    pub fn vehicles_exited_since_last_step(&mut self) -> u32 {
        std::mem::take(&mut self.exited)
    }
}
