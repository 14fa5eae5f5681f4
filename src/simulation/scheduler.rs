//! Time-of-day demand model and spawn admission
//!
//! Converts the simulated clock into commute-shaped trip demand: a
//! Gaussian morning peak of home-to-work trips, a Gaussian evening peak
//! of work-to-home trips, and a flat baseline of random errands. New
//! vehicles queue as pending until their spawn point is clear of active
//! traffic.

use log::{debug, warn};
use rand::rngs::StdRng;
use rand::seq::IndexedRandom;
use rand::Rng;
use rand::SeedableRng;
use std::collections::{HashMap, VecDeque};

use super::network::{BuildingKind, RoadAccess, RoadNetwork};
use super::planner::PathPlanner;
use super::types::VehicleId;
use super::vehicle::{VehicleAgent, PASSENGER_CAR};

#[derive(Debug, Clone)]
pub struct SchedulerConfig {
    /// Simulated seconds in one day
    pub day_length: f32,
    /// Target active vehicles per building
    pub vehicle_multiplier: f32,
    /// Origin/destination pairs closer than this are rejected
    pub min_trip_distance: f32,
    /// Radius that must be free of active vehicles before a pending
    /// vehicle is promoted
    pub spawn_clearance: f32,
    /// Peak centers as day fractions
    pub morning_peak: f32,
    pub evening_peak: f32,
    pub peak_width: f32,
    /// Flat random-errand demand
    pub random_baseline: f32,
    /// Endpoint resamples before giving up for a tick
    pub max_resamples: usize,
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            day_length: 600.0,
            vehicle_multiplier: 0.5,
            min_trip_distance: 15.0,
            spawn_clearance: 2.0,
            morning_peak: 0.3,
            evening_peak: 0.75,
            peak_width: 0.08,
            random_baseline: 0.25,
            max_resamples: 8,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TripKind {
    HomeToWork,
    WorkToHome,
    Random,
}

/// Demand model plus the pending spawn queue
pub struct TripScheduler {
    pub config: SchedulerConfig,
    pending: VecDeque<VehicleAgent>,
    /// Optional seeded RNG for reproducible simulations
    rng: Option<StdRng>,
    /// Total vehicles ever scheduled
    pub scheduled: u64,
}

impl TripScheduler {
    pub fn new(config: SchedulerConfig) -> Self {
        Self {
            config,
            pending: VecDeque::new(),
            rng: None,
            scheduled: 0,
        }
    }

    pub fn with_seed(config: SchedulerConfig, seed: u64) -> Self {
        Self {
            rng: Some(StdRng::seed_from_u64(seed)),
            ..Self::new(config)
        }
    }

    fn random_range(&mut self, range: std::ops::Range<f32>) -> f32 {
        match &mut self.rng {
            Some(rng) => rng.random_range(range),
            None => rand::rng().random_range(range),
        }
    }

    fn choose_random<'a, T>(&mut self, slice: &'a [T]) -> Option<&'a T> {
        if slice.is_empty() {
            return None;
        }
        match &mut self.rng {
            Some(rng) => slice.choose(rng),
            None => slice.choose(&mut rand::rng()),
        }
    }

    /// Fraction of the simulated day in [0, 1)
    pub fn time_of_day(&self, clock: f32) -> f32 {
        (clock / self.config.day_length).rem_euclid(1.0)
    }

    /// Normalized probabilities for (HomeToWork, WorkToHome, Random)
    pub fn trip_probabilities(&self, time_of_day: f32) -> [f32; 3] {
        let morning = gaussian(time_of_day, self.config.morning_peak, self.config.peak_width);
        let evening = gaussian(time_of_day, self.config.evening_peak, self.config.peak_width);
        let baseline = self.config.random_baseline;
        let total = morning + evening + baseline;
        [morning / total, evening / total, baseline / total]
    }

    /// Active-vehicle target derived from the building count
    pub fn target_active(&self, net: &RoadNetwork) -> usize {
        (self.config.vehicle_multiplier * net.buildings().len() as f32).round() as usize
    }

    pub fn pending_len(&self) -> usize {
        self.pending.len()
    }

    pub fn clear_pending(&mut self) {
        self.pending.clear();
    }

    /// Admission: schedule at most one new trip this tick when below the
    /// demand target. Returns true when `next_id` was consumed.
    pub fn try_schedule(
        &mut self,
        net: &RoadNetwork,
        planner: &PathPlanner,
        clock: f32,
        active_count: usize,
        next_id: VehicleId,
    ) -> bool {
        if active_count + self.pending.len() >= self.target_active(net) {
            return false;
        }
        let kind = self.pick_kind(clock);

        // Bounded resampling; a network where every pair fails to route
        // is a generator defect, not a per-tick error. Sampling-side
        // rejections (same building, too-short trips) are routine on
        // small maps and stay quiet.
        let mut route_failures = 0usize;
        for _ in 0..self.config.max_resamples {
            let (origin, dest) = match self.sample_endpoints(net, kind) {
                Some(pair) => pair,
                None => continue,
            };
            let path = planner.plan_trip(net, &origin, &dest);
            if path.is_empty() {
                route_failures += 1;
                continue;
            }
            if let Some(agent) = VehicleAgent::new(next_id, PASSENGER_CAR, path) {
                self.pending.push_back(agent);
                self.scheduled += 1;
                return true;
            }
        }
        if route_failures > 0 {
            warn!(
                "{route_failures} of {} endpoint samples had no route; network may be disconnected",
                self.config.max_resamples
            );
        } else {
            debug!(
                "No admissible endpoint pair within {} resamples",
                self.config.max_resamples
            );
        }
        false
    }

    fn pick_kind(&mut self, clock: f32) -> TripKind {
        let [home_work, work_home, _] = self.trip_probabilities(self.time_of_day(clock));
        let roll = self.random_range(0.0..1.0);
        if roll < home_work {
            TripKind::HomeToWork
        } else if roll < home_work + work_home {
            TripKind::WorkToHome
        } else {
            TripKind::Random
        }
    }

    /// Pick an origin/destination access pair for a trip kind, rejecting
    /// pairs below the minimum travel distance.
    fn sample_endpoints(
        &mut self,
        net: &RoadNetwork,
        kind: TripKind,
    ) -> Option<(RoadAccess, RoadAccess)> {
        let (origin_pool, dest_pool) = match kind {
            TripKind::HomeToWork => (
                net.buildings_of_kind(BuildingKind::Home),
                net.buildings_of_kind(BuildingKind::Work),
            ),
            TripKind::WorkToHome => (
                net.buildings_of_kind(BuildingKind::Work),
                net.buildings_of_kind(BuildingKind::Home),
            ),
            TripKind::Random => {
                let all: Vec<_> = net.buildings().iter().map(|b| b.id).collect();
                (all.clone(), all)
            }
        };

        let origin_id = *self.choose_random(&origin_pool)?;
        let dest_id = *self.choose_random(&dest_pool)?;
        if origin_id == dest_id {
            return None;
        }
        let origin = net.building(origin_id);
        let dest = net.building(dest_id);
        if origin.position.distance(&dest.position) < self.config.min_trip_distance {
            return None;
        }
        let origin_access = self.choose_random(&origin.accesses)?.clone();
        let dest_access = self.choose_random(&dest.accesses)?.clone();
        Some((origin_access, dest_access))
    }

    /// Promote pending vehicles whose spawn point is clear of every
    /// active vehicle. Runs at the tick boundary only.
    pub fn promote_pending(
        &mut self,
        active: &HashMap<VehicleId, VehicleAgent>,
    ) -> Vec<VehicleAgent> {
        let clearance = self.config.spawn_clearance;
        let mut promoted = Vec::new();
        let mut still_pending = VecDeque::new();
        while let Some(agent) = self.pending.pop_front() {
            let spawn = agent.spawn_position();
            let blocked = active
                .values()
                .any(|other| other.position.distance(&spawn) < clearance)
                || promoted
                    .iter()
                    .any(|other: &VehicleAgent| other.position.distance(&spawn) < clearance);
            if blocked {
                still_pending.push_back(agent);
            } else {
                promoted.push(agent);
            }
        }
        self.pending = still_pending;
        promoted
    }
}

fn gaussian(t: f32, center: f32, width: f32) -> f32 {
    let offset = t - center;
    (-(offset * offset) / (2.0 * width * width)).exp()
}
