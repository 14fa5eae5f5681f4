//! Traffic light phase state machine
//!
//! One controller per light-controlled junction. The controller owns one
//! light per incident road arm, in the junction's clockwise arm order, and
//! cycles an active-index cursor through timed Green/Yellow/Red phases.
//! `configure` and `set_phase` are the only externally writable surface;
//! they are consumed by the supervisory control layer.

/// Fixed yellow-phase duration in seconds
pub const YELLOW_INTERVAL: f32 = 4.0;

/// Fixed all-red buffer between phases in seconds
pub const RED_BUFFER: f32 = 4.0;

/// Bounds accepted by `configure` for per-arm green intervals
pub const MIN_GREEN: f32 = 5.0;
pub const MAX_GREEN: f32 = 90.0;

/// Green interval assigned to every arm at construction
pub const DEFAULT_GREEN: f32 = 20.0;

/// Opposite arms must have green intervals equal within this tolerance
/// for Double mode to be accepted.
pub const OPPOSITE_INTERVAL_TOLERANCE: f32 = 0.01;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LightStatus {
    Red,
    Yellow,
    Green,
}

/// How many arms go green at once
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PhaseMode {
    /// Exactly one arm is green per phase
    Single,
    /// An arm and its geometric opposite are green together; arms without
    /// an opposite partner (the isolated arm of a 3-way junction) fall
    /// back to Single behavior for their phase
    Double,
}

/// One signal head governing a single junction arm
#[derive(Debug, Clone)]
pub struct TrafficLight {
    pub status: LightStatus,
    pub green_interval: f32,
    /// Vehicles currently queued on this arm, rebuilt every tick
    pub queue_len: usize,
    /// Accumulated vehicle-seconds of waiting since this arm last went green
    pub waiting_time: f32,
}

impl TrafficLight {
    fn new() -> Self {
        Self {
            status: LightStatus::Red,
            green_interval: DEFAULT_GREEN,
            queue_len: 0,
            waiting_time: 0.0,
        }
    }

    fn clear_queue(&mut self) {
        self.queue_len = 0;
        self.waiting_time = 0.0;
    }
}

/// Timed phase machine over one junction's lights
#[derive(Debug, Clone)]
pub struct TrafficLightController {
    lights: Vec<TrafficLight>,
    /// Geometric opposite partner per arm, from the junction's arm layout
    opposite: Vec<Option<usize>>,
    active: usize,
    phase: LightStatus,
    elapsed: f32,
    mode: PhaseMode,
}

impl TrafficLightController {
    /// Build a controller for a junction with the given per-arm opposite
    /// partners. The first arm starts green.
    pub fn new(opposite: Vec<Option<usize>>) -> Self {
        let mut controller = Self {
            lights: opposite.iter().map(|_| TrafficLight::new()).collect(),
            opposite,
            active: 0,
            phase: LightStatus::Green,
            elapsed: 0.0,
            mode: PhaseMode::Single,
        };
        controller.apply_phase();
        controller
    }

    pub fn light_count(&self) -> usize {
        self.lights.len()
    }

    pub fn mode(&self) -> PhaseMode {
        self.mode
    }

    pub fn active_index(&self) -> usize {
        self.active
    }

    pub fn status(&self, arm: usize) -> Option<LightStatus> {
        self.lights.get(arm).map(|light| light.status)
    }

    pub fn is_green(&self, arm: usize) -> bool {
        self.status(arm) == Some(LightStatus::Green)
    }

    /// Arms lit by the current phase: the active arm plus, in Double mode,
    /// its opposite partner when one exists.
    fn active_arms(&self) -> Vec<usize> {
        match self.mode {
            PhaseMode::Single => vec![self.active],
            PhaseMode::Double => match self.opposite[self.active] {
                Some(partner) if partner != self.active => vec![self.active, partner],
                _ => vec![self.active],
            },
        }
    }

    /// Set every light red, then apply `phase` to the active arms
    fn apply_phase(&mut self) {
        for light in &mut self.lights {
            light.status = LightStatus::Red;
        }
        let phase = self.phase;
        for arm in self.active_arms() {
            self.lights[arm].status = phase;
            if phase == LightStatus::Green {
                self.lights[arm].clear_queue();
            }
        }
    }

    /// Advance the phase machine by one time step
    pub fn tick(&mut self, dt: f32) {
        if self.lights.is_empty() {
            return;
        }
        self.elapsed += dt;
        match self.phase {
            LightStatus::Green => {
                if self.elapsed > self.lights[self.active].green_interval {
                    self.phase = LightStatus::Yellow;
                    self.elapsed = 0.0;
                    self.apply_phase();
                }
            }
            LightStatus::Yellow => {
                if self.elapsed > YELLOW_INTERVAL {
                    self.phase = LightStatus::Red;
                    self.elapsed = 0.0;
                    for arm in self.active_arms() {
                        self.lights[arm].clear_queue();
                    }
                    self.apply_phase();
                }
            }
            LightStatus::Red => {
                if self.elapsed > RED_BUFFER {
                    self.active = (self.active + 1) % self.lights.len();
                    self.phase = LightStatus::Green;
                    self.elapsed = 0.0;
                    self.apply_phase();
                }
            }
        }
    }

    /// Replace per-arm green intervals and the phase mode.
    ///
    /// Rejects (returning false, state untouched) when the interval count
    /// doesn't match the light count, any interval is outside
    /// [MIN_GREEN, MAX_GREEN], or Double mode is requested with unequal
    /// intervals on geometrically opposite arms.
    pub fn configure(&mut self, green_intervals: &[f32], mode: PhaseMode) -> bool {
        if green_intervals.len() != self.lights.len() {
            return false;
        }
        if green_intervals
            .iter()
            .any(|interval| *interval < MIN_GREEN || *interval > MAX_GREEN)
        {
            return false;
        }
        if mode == PhaseMode::Double {
            for (arm, partner) in self.opposite.iter().enumerate() {
                if let Some(partner) = partner {
                    let diff = (green_intervals[arm] - green_intervals[*partner]).abs();
                    if diff > OPPOSITE_INTERVAL_TOLERANCE {
                        return false;
                    }
                }
            }
        }
        for (light, interval) in self.lights.iter_mut().zip(green_intervals) {
            light.green_interval = *interval;
        }
        self.mode = mode;
        true
    }

    /// Force the phase cursor to the given arm and restart its green phase.
    /// Returns false for an out-of-range arm index.
    pub fn set_phase(&mut self, arm: usize) -> bool {
        if arm >= self.lights.len() {
            return false;
        }
        self.active = arm;
        self.phase = LightStatus::Green;
        self.elapsed = 0.0;
        self.apply_phase();
        true
    }

    /// Record this tick's per-arm queue counts and accumulate waiting time
    pub fn record_queues(&mut self, counts: &[usize], dt: f32) {
        for (light, count) in self.lights.iter_mut().zip(counts) {
            light.queue_len = *count;
            light.waiting_time += *count as f32 * dt;
        }
    }

    pub fn queue_lengths(&self) -> Vec<usize> {
        self.lights.iter().map(|light| light.queue_len).collect()
    }

    pub fn total_waiting_times(&self) -> Vec<f32> {
        self.lights.iter().map(|light| light.waiting_time).collect()
    }

    pub fn green_intervals(&self) -> Vec<f32> {
        self.lights
            .iter()
            .map(|light| light.green_interval)
            .collect()
    }
}
