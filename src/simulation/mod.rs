//! Urban traffic simulation core
//!
//! Road-network graph, A* route planning, traffic-light phase machines,
//! vehicle agents and congestion statistics. Runs headless; rendering,
//! map generation and the control/learning layer are external
//! collaborators talking through the public surface re-exported here.

mod congestion;
mod junction;
mod lights;
mod network;
mod planner;
mod scheduler;
mod types;
mod vehicle;
mod world;

// Re-export public types for external use
// These may not be used within this crate but are part of the public API
#[allow(unused_imports)]
pub use congestion::{
    CongestionConfig, CongestionTracker, MAX_QUEUE_PER_LIGHT, MAX_WAIT_PER_LIGHT,
};
#[allow(unused_imports)]
pub use junction::{Junction, JunctionKind, CROSSING_TIME};
#[allow(unused_imports)]
pub use lights::{
    LightStatus, PhaseMode, TrafficLight, TrafficLightController, DEFAULT_GREEN, MAX_GREEN,
    MIN_GREEN, OPPOSITE_INTERVAL_TOLERANCE, RED_BUFFER, YELLOW_INTERVAL,
};
#[allow(unused_imports)]
pub use network::{Building, BuildingKind, Road, RoadAccess, RoadEdge, RoadNetwork};
#[allow(unused_imports)]
pub use planner::{PathPlanner, PathPoint};
#[allow(unused_imports)]
pub use scheduler::{SchedulerConfig, TripKind, TripScheduler};
#[allow(unused_imports)]
pub use types::{
    BuildingId, JunctionId, Position, RoadId, VehicleId, ENDPOINT_TOLERANCE,
    OPPOSITE_DOT_THRESHOLD, ROAD_BASE_COST, TURN_DOT_EPSILON,
};
#[allow(unused_imports)]
pub use vehicle::{
    VehicleAgent, VehiclePreset, VehicleStatus, VehicleUpdate, JUNCTION_APPROACH_DISTANCE,
    PASSENGER_CAR,
};
pub use world::{RunStats, SimWorld};
