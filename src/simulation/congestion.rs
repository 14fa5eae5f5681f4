//! Per-junction congestion statistics
//!
//! A fixed-capacity ring buffer of composite samples over a junction's
//! light queues and waiting times, read by the supervisory control layer.
//! The running sum is maintained incrementally so `average` never rescans
//! the window.

use std::collections::VecDeque;

use super::lights::TrafficLightController;

/// Assumed worst-case queue length per light, for normalization
pub const MAX_QUEUE_PER_LIGHT: f32 = 10.0;

/// Assumed worst-case accumulated waiting time per light, in
/// vehicle-seconds, for normalization
pub const MAX_WAIT_PER_LIGHT: f32 = 60.0;

#[derive(Debug, Clone)]
pub struct CongestionConfig {
    /// Window capacity in samples
    pub capacity: usize,
    /// Simulated seconds between samples
    pub sample_period: f32,
    pub queue_weight: f32,
    pub wait_weight: f32,
}

impl Default for CongestionConfig {
    fn default() -> Self {
        Self {
            capacity: 30,
            sample_period: 1.0,
            queue_weight: 0.5,
            wait_weight: 0.5,
        }
    }
}

/// Sliding-window congestion score for one junction
#[derive(Debug, Clone)]
pub struct CongestionTracker {
    config: CongestionConfig,
    window: VecDeque<f32>,
    cumulative: f32,
    elapsed: f32,
    last_queues: Vec<usize>,
    last_waits: Vec<f32>,
}

impl CongestionTracker {
    pub fn new(config: CongestionConfig) -> Self {
        Self {
            window: VecDeque::with_capacity(config.capacity),
            config,
            cumulative: 0.0,
            elapsed: 0.0,
            last_queues: Vec::new(),
            last_waits: Vec::new(),
        }
    }

    /// Advance the sampling clock and take a sample from the controller
    /// whenever a full period has elapsed.
    pub fn tick(&mut self, controller: &TrafficLightController, dt: f32) {
        self.elapsed += dt;
        while self.elapsed >= self.config.sample_period {
            self.elapsed -= self.config.sample_period;
            self.push_sample(controller);
        }
    }

    /// Enqueue one composite sample, evicting the oldest past capacity
    pub fn push_sample(&mut self, controller: &TrafficLightController) {
        self.last_queues = controller.queue_lengths();
        self.last_waits = controller.total_waiting_times();

        let lights = controller.light_count();
        if lights == 0 {
            return;
        }
        let total_queue: usize = self.last_queues.iter().sum();
        let total_wait: f32 = self.last_waits.iter().sum();
        let normalized_queue = total_queue as f32 / (lights as f32 * MAX_QUEUE_PER_LIGHT);
        let normalized_wait = total_wait / (lights as f32 * MAX_WAIT_PER_LIGHT);
        let sample =
            self.config.queue_weight * normalized_queue + self.config.wait_weight * normalized_wait;

        self.window.push_back(sample);
        self.cumulative += sample;
        while self.window.len() > self.config.capacity {
            if let Some(oldest) = self.window.pop_front() {
                self.cumulative -= oldest;
            }
        }
    }

    /// Mean of the current window, 0 when empty
    pub fn average(&self) -> f32 {
        if self.window.is_empty() {
            0.0
        } else {
            self.cumulative / self.window.len() as f32
        }
    }

    /// True only once the window is full; partial windows never report
    pub fn ready_to_report(&self) -> bool {
        self.window.len() >= self.config.capacity
    }

    pub fn sample_count(&self) -> usize {
        self.window.len()
    }

    /// Raw per-arm queue lengths from the last sample
    pub fn queue_lengths(&self) -> &[usize] {
        &self.last_queues
    }

    /// Raw per-arm accumulated waiting times from the last sample
    pub fn total_waiting_times(&self) -> &[f32] {
        &self.last_waits
    }

    /// Clear window, cumulative sum and the sampling clock
    pub fn reset(&mut self) {
        self.window.clear();
        self.cumulative = 0.0;
        self.elapsed = 0.0;
        self.last_queues.clear();
        self.last_waits.clear();
    }
}
