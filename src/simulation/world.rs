//! Main simulation world that ties everything together
//!
//! One tick runs, in strict order: traffic-light controllers, vehicle
//! agents, congestion sampling, then scheduler admission. Vehicle
//! retirement and pending-to-active promotion happen only at the tick
//! boundary so iteration over the active set stays stable, and every
//! cross-agent read observes the previous tick's committed state.

use log::info;
use std::collections::HashMap;

use super::congestion::{CongestionConfig, CongestionTracker};
use super::junction::JunctionKind;
use super::lights::{LightStatus, PhaseMode};
use super::network::{BuildingKind, RoadAccess, RoadNetwork};
use super::planner::PathPlanner;
use super::scheduler::{SchedulerConfig, TripScheduler};
use super::types::{JunctionId, Position, VehicleId};
use super::vehicle::{VehicleAgent, VehicleStatus, VehicleUpdate};

/// Lifetime counters surfaced by the summary and the CLI runner
#[derive(Debug, Clone, Copy, Default)]
pub struct RunStats {
    pub total_spawned: u64,
    pub total_retired: u64,
}

/// The main simulation world
pub struct SimWorld {
    pub network: RoadNetwork,
    planner: PathPlanner,
    pub vehicles: HashMap<VehicleId, VehicleAgent>,
    scheduler: TripScheduler,
    /// One congestion tracker per light-controlled junction
    trackers: HashMap<JunctionId, CongestionTracker>,
    next_vehicle_id: usize,
    /// Simulated time in seconds
    pub time: f32,
    pub stats: RunStats,
}

impl SimWorld {
    fn new_internal(mut network: RoadNetwork, scheduler: TripScheduler) -> Self {
        network.finalize();
        let trackers = network
            .junctions()
            .filter(|junction| junction.controller.is_some())
            .map(|junction| (junction.id, CongestionTracker::new(CongestionConfig::default())))
            .collect();
        Self {
            network,
            planner: PathPlanner::default(),
            vehicles: HashMap::new(),
            scheduler,
            trackers,
            next_vehicle_id: 0,
            time: 0.0,
            stats: RunStats::default(),
        }
    }

    /// Wrap a generated road network; finalizes arm ordering and light
    /// controllers.
    pub fn new(network: RoadNetwork) -> Self {
        Self::new_internal(network, TripScheduler::new(SchedulerConfig::default()))
    }

    /// Like `new` but with a seeded RNG for reproducible simulations
    pub fn new_with_seed(network: RoadNetwork, seed: u64) -> Self {
        Self::new_internal(
            network,
            TripScheduler::with_seed(SchedulerConfig::default(), seed),
        )
    }

    pub fn planner(&self) -> &PathPlanner {
        &self.planner
    }

    pub fn active_count(&self) -> usize {
        self.vehicles.len()
    }

    pub fn pending_count(&self) -> usize {
        self.scheduler.pending_len()
    }

    /// Main simulation tick
    pub fn tick(&mut self, dt: f32) {
        self.time += dt;

        // (1) Traffic lights and junction reservation timers.
        for junction in self.network.junctions_mut() {
            junction.update_timer(dt);
            if let Some(controller) = junction.controller.as_mut() {
                controller.tick(dt);
            }
        }

        // (2) Vehicles: remove, update against the rest of the map, then
        // reinsert, so each agent reads the others' committed state.
        let mut retired = Vec::new();
        // Fixed id order: update order is observable through reservations
        // and the road index, and seeded runs must replay identically.
        let mut ids: Vec<VehicleId> = self.vehicles.keys().copied().collect();
        ids.sort_by_key(|id| id.0);
        for id in ids {
            if let Some(mut vehicle) = self.vehicles.remove(&id) {
                let result = vehicle.update(dt, &mut self.network, &self.vehicles);
                self.vehicles.insert(id, vehicle);
                if result == VehicleUpdate::Retire {
                    retired.push(id);
                }
            }
        }

        // Rebuild per-arm queue counts from the vehicles now waiting.
        let vehicles = &self.vehicles;
        for junction in self.network.junctions_mut() {
            let arms = junction.roads.len();
            if let Some(controller) = junction.controller.as_mut() {
                let mut counts = vec![0usize; arms];
                for vehicle in vehicles.values() {
                    if let Some((waiting_junction, arm)) = vehicle.waiting_arm {
                        if waiting_junction == junction.id && arm < arms {
                            counts[arm] += 1;
                        }
                    }
                }
                controller.record_queues(&counts, dt);
            }
        }

        // (3) Congestion sampling.
        for (junction_id, tracker) in &mut self.trackers {
            if let Some(controller) = self.network.junction(*junction_id).controller.as_ref() {
                tracker.tick(controller, dt);
            }
        }

        // (4) Tick boundary: retirement, admission, promotion.
        for id in retired {
            self.vehicles.remove(&id);
            self.network.clear_vehicle(id);
            self.stats.total_retired += 1;
        }

        let next_id = VehicleId(self.next_vehicle_id);
        if self.scheduler.try_schedule(
            &self.network,
            &self.planner,
            self.time,
            self.vehicles.len(),
            next_id,
        ) {
            self.next_vehicle_id += 1;
        }

        for agent in self.scheduler.promote_pending(&self.vehicles) {
            self.network.update_vehicle_position(
                agent.id,
                agent.current_road,
                agent.forward,
                agent.offset,
                None,
            );
            self.stats.total_spawned += 1;
            self.vehicles.insert(agent.id, agent);
        }
    }

    /// Atomic episode-boundary reset: drops every agent (active and
    /// pending), congestion windows, reservations and throughput
    /// counters. Graph shape and light schedules are untouched.
    pub fn reset(&mut self) {
        let ids: Vec<VehicleId> = self.vehicles.keys().copied().collect();
        for id in ids {
            self.network.clear_vehicle(id);
        }
        self.vehicles.clear();
        self.scheduler.clear_pending();
        for tracker in self.trackers.values_mut() {
            tracker.reset();
        }
        for junction in self.network.junctions_mut() {
            junction.clear_reservation();
            let _ = junction.vehicles_exited_since_last_step();
        }
    }

    // --- control-layer surface ---

    /// Reconfigure a junction's light schedule; false when the junction
    /// has no controller or validation rejects the request.
    pub fn configure_lights(
        &mut self,
        junction: JunctionId,
        green_intervals: &[f32],
        mode: PhaseMode,
    ) -> bool {
        self.network
            .junction_mut(junction)
            .controller
            .as_mut()
            .map(|controller| controller.configure(green_intervals, mode))
            .unwrap_or(false)
    }

    pub fn set_light_phase(&mut self, junction: JunctionId, arm: usize) -> bool {
        self.network
            .junction_mut(junction)
            .controller
            .as_mut()
            .map(|controller| controller.set_phase(arm))
            .unwrap_or(false)
    }

    pub fn congestion(&self, junction: JunctionId) -> Option<&CongestionTracker> {
        self.trackers.get(&junction)
    }

    pub fn congestion_mut(&mut self, junction: JunctionId) -> Option<&mut CongestionTracker> {
        self.trackers.get_mut(&junction)
    }

    /// Throughput counter for a junction; resets on read
    pub fn vehicles_exited_since_last_step(&mut self, junction: JunctionId) -> u32 {
        self.network
            .junction_mut(junction)
            .vehicles_exited_since_last_step()
    }

    // --- rendering-facing read-only views ---

    pub fn vehicle_states(
        &self,
    ) -> impl Iterator<Item = (VehicleId, Position, f32, VehicleStatus)> + '_ {
        self.vehicles
            .values()
            .map(|vehicle| (vehicle.id, vehicle.position, vehicle.heading, vehicle.status))
    }

    /// A selected vehicle's remaining waypoints
    pub fn remaining_waypoints(&self, vehicle: VehicleId) -> Option<Vec<Position>> {
        self.vehicles
            .get(&vehicle)
            .map(|v| v.trip.iter().map(|point| point.position).collect())
    }

    pub fn light_statuses(&self, junction: JunctionId) -> Option<Vec<LightStatus>> {
        let junction = self.network.junction(junction);
        let controller = junction.controller.as_ref()?;
        Some(
            (0..controller.light_count())
                .filter_map(|arm| controller.status(arm))
                .collect(),
        )
    }

    /// One-line state summary for the CLI runner
    pub fn summary(&self) -> String {
        format!(
            "t={:.1}s junctions={} roads={} active={} pending={} spawned={} retired={}",
            self.time,
            self.network.junction_count(),
            self.network.road_count(),
            self.vehicles.len(),
            self.scheduler.pending_len(),
            self.stats.total_spawned,
            self.stats.total_retired,
        )
    }

    /// Log the final statistics block
    pub fn log_final_stats(&self) {
        info!("=== SIMULATION COMPLETE ===");
        info!("Elapsed time: {:.2}s", self.time);
        info!("Total vehicles spawned: {}", self.stats.total_spawned);
        info!("Total vehicles retired: {}", self.stats.total_retired);
        info!("Active vehicles: {}", self.vehicles.len());
        info!("Total junctions: {}", self.network.junction_count());
        info!("Total roads: {}", self.network.road_count());
    }

    /// Small generated-style demo network: a 3x3 grid with a
    /// light-controlled core, stop-controlled corners, and home/work
    /// buildings hanging off the grid roads. Stands in for the external
    /// generator in tests and the CLI runner.
    pub fn create_demo_world(seed: Option<u64>) -> Self {
        let mut net = RoadNetwork::new();
        let spacing = 20.0;

        let mut grid = [[JunctionId(0); 3]; 3];
        for (row, grid_row) in grid.iter_mut().enumerate() {
            for (col, slot) in grid_row.iter_mut().enumerate() {
                let x = (col as f32 - 1.0) * spacing;
                let z = (row as f32 - 1.0) * spacing;
                let corner = (row != 1) && (col != 1);
                let kind = if corner {
                    JunctionKind::StopControlled
                } else {
                    JunctionKind::LightControlled
                };
                *slot = net.add_junction(Position::new(x, 0.0, z), kind);
            }
        }

        let mut horizontal = Vec::new();
        let mut vertical = Vec::new();
        for row in 0..3 {
            for col in 0..2 {
                let a = net.junction(grid[row][col]).position;
                let b = net.junction(grid[row][col + 1]).position;
                let mid = a.lerp(&b, 0.5);
                if let Ok(road) = net.add_road(grid[row][col], grid[row][col + 1], vec![a, mid, b]) {
                    horizontal.push((road, mid));
                }
            }
        }
        for row in 0..2 {
            for col in 0..3 {
                let a = net.junction(grid[row][col]).position;
                let b = net.junction(grid[row + 1][col]).position;
                let mid = a.lerp(&b, 0.5);
                if let Ok(road) = net.add_road(grid[row][col], grid[row + 1][col], vec![a, mid, b]) {
                    vertical.push((road, mid));
                }
            }
        }

        // Homes along the top and bottom rows, workplaces through the
        // middle of the grid.
        let homes = [horizontal[0], horizontal[1], horizontal[4], horizontal[5]];
        for (road, point) in homes {
            net.add_building(
                Position::new(point.x, 0.0, point.z + 3.0),
                BuildingKind::Home,
                vec![RoadAccess { road, point }],
            );
        }
        let works = [horizontal[2], horizontal[3], vertical[1], vertical[4]];
        for (road, point) in works {
            net.add_building(
                Position::new(point.x + 3.0, 0.0, point.z),
                BuildingKind::Work,
                vec![RoadAccess { road, point }],
            );
        }

        match seed {
            Some(seed) => Self::new_with_seed(net, seed),
            None => Self::new(net),
        }
    }
}
