//! Urban Traffic Simulation Library
//!
//! A headless urban traffic simulation core: generated road networks,
//! routed vehicle agents, timed traffic lights and congestion metrics.

pub mod simulation;
