//! Vehicle agent motion loop
//!
//! Each tick a vehicle consumes a distance budget (`velocity * dt`)
//! against its remaining waypoint path, scanning ahead for the nearest
//! obstacle: a controlled junction boundary or another vehicle on the
//! same road. Queues propagate backward implicitly, by followers adopting
//! the status of the vehicle ahead tick after tick, with no explicit
//! queue structure on the road.

use ordered_float::OrderedFloat;
use std::collections::{HashMap, VecDeque};

use super::junction::JunctionKind;
use super::network::RoadNetwork;
use super::planner::PathPoint;
use super::types::{angle_delta, JunctionId, Position, RoadId, VehicleId};

/// Distance from a junction at which a crossing reservation is attempted
pub const JUNCTION_APPROACH_DISTANCE: f32 = 1.0;

/// Heading reorientation rate, fraction of remaining turn per second
pub const HEADING_TURN_RATE: f32 = 8.0;

/// Waypoint arrival tolerance
const ARRIVAL_EPSILON: f32 = 1e-3;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VehicleStatus {
    Driving,
    WaitingForLight,
    WaitingForVehicle,
}

/// Data-only behavior parameters. One table entry per vehicle variant;
/// no subtype hierarchy.
#[derive(Debug, Clone, Copy)]
pub struct VehiclePreset {
    pub max_velocity: f32,
    pub acceleration: f32,
    pub lookahead: f32,
    pub stop_gap: f32,
}

/// The only preset in use today
pub const PASSENGER_CAR: VehiclePreset = VehiclePreset {
    max_velocity: 6.0,
    acceleration: 4.0,
    lookahead: 4.0,
    stop_gap: 0.8,
};

/// What the world should do with a vehicle after its update
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VehicleUpdate {
    Continue,
    /// Path exhausted; remove at the tick boundary
    Retire,
}

/// A single vehicle traveling an expanded trip path
#[derive(Debug, Clone)]
pub struct VehicleAgent {
    pub id: VehicleId,
    pub preset: VehiclePreset,
    /// Remaining waypoints, consumed front-to-back; only ever shrinks
    pub trip: VecDeque<PathPoint>,
    pub status: VehicleStatus,
    pub velocity: f32,
    pub heading: f32,
    pub position: Position,
    pub current_road: RoadId,
    pub offset: OrderedFloat<f32>,
    /// Travel direction on the current road, true = toward increasing
    /// offset
    pub forward: bool,
    /// Light arm this vehicle is queued on, if waiting at a red light
    pub waiting_arm: Option<(JunctionId, usize)>,
}

impl VehicleAgent {
    /// Build an agent at the head of an expanded path. None when the
    /// path is empty.
    pub fn new(id: VehicleId, preset: VehiclePreset, path: Vec<PathPoint>) -> Option<Self> {
        let first = path.first()?.clone();
        let heading = path
            .get(1)
            .map(|next| first.position.angle_to(&next.position))
            .unwrap_or(0.0);
        let forward = path
            .iter()
            .find(|point| {
                point.road == first.road && (point.offset - first.offset).abs() > f32::EPSILON
            })
            .map(|point| point.offset > first.offset)
            .unwrap_or(true);
        Some(Self {
            id,
            preset,
            trip: path.into(),
            status: VehicleStatus::Driving,
            velocity: 0.0,
            heading,
            position: first.position,
            current_road: first.road,
            offset: OrderedFloat(first.offset),
            forward,
            waiting_arm: None,
        })
    }

    pub fn spawn_position(&self) -> Position {
        self.position
    }

    /// Advance the agent by one tick.
    ///
    /// `others` holds every other active vehicle (the world removes this
    /// one from the map while updating it) and is only read, so obstacle
    /// scans observe the previous committed state.
    pub fn update(
        &mut self,
        dt: f32,
        net: &mut RoadNetwork,
        others: &HashMap<VehicleId, VehicleAgent>,
    ) -> VehicleUpdate {
        if self.trip.is_empty() {
            return VehicleUpdate::Retire;
        }

        let prev = Some((self.current_road, self.forward, self.offset));
        self.status = VehicleStatus::Driving;
        self.waiting_arm = None;
        self.velocity = (self.velocity + self.preset.acceleration * dt).min(self.preset.max_velocity);

        let mut budget = self.velocity * dt;
        while budget > 0.0 && !self.trip.is_empty() {
            self.forward = self.travel_direction();
            let vehicle_obstacle = self.scan_vehicle_ahead(net);
            let junction_obstacle = self.next_junction_within(self.preset.lookahead);

            // A car queued right ahead also blocks us from claiming a
            // reservation we don't already hold.
            let blocked_by_vehicle = vehicle_obstacle
                .map(|(gap, _)| gap <= self.preset.stop_gap)
                .unwrap_or(false);

            let mut junction_block: Option<(JunctionId, f32, Option<usize>)> = None;
            if let Some((junction_id, distance)) = junction_obstacle {
                let arm = net.junction(junction_id).arm_index(self.current_road);
                match net.junction(junction_id).kind {
                    JunctionKind::LightControlled => {
                        let green = arm
                            .and_then(|arm| {
                                net.junction(junction_id)
                                    .controller
                                    .as_ref()
                                    .map(|c| c.is_green(arm))
                            })
                            .unwrap_or(true);
                        if !green {
                            junction_block = Some((junction_id, distance, arm));
                        }
                    }
                    JunctionKind::StopControlled => {
                        if distance <= JUNCTION_APPROACH_DISTANCE {
                            let junction = net.junction_mut(junction_id);
                            if (!blocked_by_vehicle || junction.is_held_by(self.id))
                                && !junction.can_proceed(self.id)
                            {
                                junction_block = Some((junction_id, distance, None));
                            }
                        }
                    }
                    JunctionKind::Plain => {}
                }
            }

            // Stop-gap handling: nearest blocking obstacle wins.
            let junction_gap = junction_block.map(|(_, d, _)| d).unwrap_or(f32::INFINITY);
            let vehicle_gap = vehicle_obstacle.map(|(d, _)| d).unwrap_or(f32::INFINITY);

            if vehicle_gap <= self.preset.stop_gap && vehicle_gap <= junction_gap {
                let ahead = vehicle_obstacle.and_then(|(_, id)| others.get(&id));
                match ahead {
                    Some(other) => {
                        self.status = match other.status {
                            VehicleStatus::Driving => VehicleStatus::WaitingForVehicle,
                            waiting => waiting,
                        };
                        // A follower held behind a light queue is part of
                        // that queue.
                        if self.status == VehicleStatus::WaitingForLight {
                            self.waiting_arm = other.waiting_arm;
                        }
                    }
                    None => self.status = VehicleStatus::WaitingForVehicle,
                }
                self.velocity = 0.0;
                break;
            }
            if junction_gap <= self.preset.stop_gap {
                if let Some((junction_id, _, arm)) = junction_block {
                    self.status = VehicleStatus::WaitingForLight;
                    self.velocity = 0.0;
                    if let Some(arm) = arm {
                        self.waiting_arm = Some((junction_id, arm));
                    }
                }
                break;
            }

            // Clear to advance: never move past an obstacle's stop gap.
            let target = match self.trip.front() {
                Some(point) => point.clone(),
                None => break,
            };
            let to_waypoint = self.position.distance(&target.position);
            // Consume waypoints we are already standing on, such as the
            // spawn point itself or coincident smoothing samples.
            if to_waypoint <= ARRIVAL_EPSILON {
                self.arrive_at_waypoint(net, &target);
                continue;
            }
            let mut step = budget.min(to_waypoint);
            if junction_gap.is_finite() {
                step = step.min((junction_gap - self.preset.stop_gap).max(0.0));
            }
            if vehicle_gap.is_finite() {
                step = step.min((vehicle_gap - self.preset.stop_gap).max(0.0));
            }
            if step <= 0.0 {
                break;
            }

            self.advance(step, &target, dt);
            budget -= step;

            if self.position.distance(&target.position) <= ARRIVAL_EPSILON {
                self.arrive_at_waypoint(net, &target);
            }
        }

        net.update_vehicle_position(self.id, self.current_road, self.forward, self.offset, prev);
        VehicleUpdate::Continue
    }

    /// Move toward the target waypoint and reorient the heading
    fn advance(&mut self, step: f32, target: &PathPoint, dt: f32) {
        let to_waypoint = self.position.distance(&target.position);
        if to_waypoint > ARRIVAL_EPSILON {
            let t = (step / to_waypoint).min(1.0);
            self.position = self.position.lerp(&target.position, t);

            let goal = self.position.angle_to(&target.position);
            let blend = (HEADING_TURN_RATE * dt).min(1.0);
            self.heading += angle_delta(self.heading, goal) * blend;
        }

        // Keep the parametric offset continuous for the road index.
        if target.road == self.current_road {
            let delta = target.offset - self.offset.0;
            if delta.abs() > f32::EPSILON {
                self.forward = delta > 0.0;
            }
            let moved = delta.signum() * step.min(delta.abs());
            self.offset = OrderedFloat(self.offset.0 + moved);
        } else {
            self.current_road = target.road;
            self.offset = OrderedFloat(target.offset);
        }
    }

    /// Consume the reached waypoint; junction markers release any
    /// reservation and count toward junction throughput.
    fn arrive_at_waypoint(&mut self, net: &mut RoadNetwork, target: &PathPoint) {
        self.trip.pop_front();
        if let Some(junction_id) = target.junction {
            let junction = net.junction_mut(junction_id);
            junction.release(self.id);
            junction.record_exit();
        }
    }

    /// Travel direction on the current road, read from the next waypoint
    /// that actually moves the offset. Falls back to the committed
    /// direction through coincident-offset smoothing clusters.
    fn travel_direction(&self) -> bool {
        match self.trip.front() {
            Some(point)
                if point.road == self.current_road
                    && (point.offset - self.offset.0).abs() > f32::EPSILON =>
            {
                point.offset > self.offset.0
            }
            _ => self.forward,
        }
    }

    /// Nearest same-direction vehicle ahead on the current road within
    /// lookahead
    fn scan_vehicle_ahead(&self, net: &RoadNetwork) -> Option<(f32, VehicleId)> {
        net.vehicle_ahead(self.current_road, self.forward, self.offset)
            .filter(|(gap, _)| *gap <= self.preset.lookahead)
    }

    /// First junction marker on the remaining path within lookahead,
    /// with its distance along the path.
    fn next_junction_within(&self, lookahead: f32) -> Option<(JunctionId, f32)> {
        let mut distance = 0.0;
        let mut previous = self.position;
        for point in &self.trip {
            distance += previous.distance(&point.position);
            if distance > lookahead {
                return None;
            }
            if let Some(junction) = point.junction {
                return Some((junction, distance));
            }
            previous = point.position;
        }
        None
    }
}
