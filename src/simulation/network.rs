//! Road network graph
//!
//! Junctions, roads and buildings live in Vec arenas addressed by the id
//! handles from `types`, with a petgraph mirror used for route search.
//! The network also keeps the per-road vehicle position index that
//! replaces a physics-engine forward raycast: vehicles are keyed by their
//! parametric offset along a road, partitioned by travel direction, and
//! "nearest obstacle ahead" becomes a BTreeMap range scan.

use anyhow::{Context, Result};
use ordered_float::OrderedFloat;
use petgraph::graph::{NodeIndex, UnGraph};
use petgraph::visit::EdgeRef;
use std::collections::{BTreeMap, HashMap};
use std::ops::Bound;

use super::junction::{Junction, JunctionKind};
use super::lights::TrafficLightController;
use super::types::{
    polyline_length, BuildingId, JunctionId, Position, RoadId, VehicleId, ENDPOINT_TOLERANCE,
    OPPOSITE_DOT_THRESHOLD, ROAD_BASE_COST, TURN_DOT_EPSILON,
};

/// Edge data for the route graph
#[derive(Debug, Clone, Copy)]
pub struct RoadEdge {
    pub road: RoadId,
    /// Road length scaled by 100 for integer weights, minimum 1
    pub weight: u32,
}

impl RoadEdge {
    fn new(road: RoadId, length: f32) -> Self {
        let weight = (length * 100.0) as u32;
        Self {
            road,
            weight: weight.max(1),
        }
    }
}

/// A graph edge with a physical polyline between two junctions.
///
/// `a` and `b` may be the same junction, forming a self-loop road.
#[derive(Debug, Clone)]
pub struct Road {
    pub id: RoadId,
    pub a: JunctionId,
    pub b: JunctionId,
    /// Ordered waypoints; first coincides with `a`, last with `b`
    pub path: Vec<Position>,
    /// Prefix arc lengths per vertex, so offsets need no rescanning
    cumulative: Vec<f32>,
    /// Polyline length plus the fixed per-tile constant
    pub length: f32,
}

impl Road {
    pub fn is_loop(&self) -> bool {
        self.a == self.b
    }

    /// Arc length of the polyline alone, without the per-tile constant
    pub fn polyline_len(&self) -> f32 {
        self.cumulative.last().copied().unwrap_or(0.0)
    }

    /// Parametric offset of a polyline vertex
    pub fn offset_of(&self, index: usize) -> f32 {
        self.cumulative[index]
    }

    /// Index of the polyline vertex nearest to a point
    pub fn nearest_index(&self, point: &Position) -> usize {
        let mut best = 0;
        let mut best_dist = f32::INFINITY;
        for (index, vertex) in self.path.iter().enumerate() {
            let dist = point.distance(vertex);
            if dist < best_dist {
                best_dist = dist;
                best = index;
            }
        }
        best
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BuildingKind {
    Home,
    Work,
}

/// Where a building meets a road: the road and a spawn point on its path
#[derive(Debug, Clone)]
pub struct RoadAccess {
    pub road: RoadId,
    pub point: Position,
}

#[derive(Debug, Clone)]
pub struct Building {
    pub id: BuildingId,
    pub position: Position,
    pub kind: BuildingKind,
    pub accesses: Vec<RoadAccess>,
}

/// Immutable-after-finalize graph of junctions and roads.
///
/// The external generator drives `add_junction` / `add_road` /
/// `add_building` and then calls `finalize`, which fixes arm ordering and
/// instantiates light controllers. Graph shape never changes afterwards;
/// only controller state, reservations and the vehicle index mutate.
#[derive(Default)]
pub struct RoadNetwork {
    junctions: Vec<Junction>,
    roads: Vec<Road>,
    buildings: Vec<Building>,

    graph: UnGraph<JunctionId, RoadEdge>,
    node_of: Vec<NodeIndex>,

    /// Vehicles keyed by parametric offset, per road and travel
    /// direction. Opposing streams on one polyline never see each other.
    vehicles_on_roads: HashMap<(RoadId, bool), BTreeMap<OrderedFloat<f32>, VehicleId>>,
}

impl RoadNetwork {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_junction(&mut self, position: Position, kind: JunctionKind) -> JunctionId {
        let id = JunctionId(self.junctions.len());
        self.junctions.push(Junction::new(id, position, kind));
        self.node_of.push(self.graph.add_node(id));
        id
    }

    /// Add a road whose polyline runs from junction `a` to junction `b`
    pub fn add_road(&mut self, a: JunctionId, b: JunctionId, path: Vec<Position>) -> Result<RoadId> {
        if path.len() < 2 {
            anyhow::bail!("Road polyline needs at least two points");
        }
        let start = self.junctions[a.0].position;
        let end = self.junctions[b.0].position;
        if path[0].distance(&start) > ENDPOINT_TOLERANCE
            || path[path.len() - 1].distance(&end) > ENDPOINT_TOLERANCE
        {
            anyhow::bail!("Road polyline endpoints must coincide with the junction positions");
        }
        let id = RoadId(self.roads.len());
        let mut cumulative = Vec::with_capacity(path.len());
        let mut total = 0.0;
        cumulative.push(0.0);
        for pair in path.windows(2) {
            total += pair[0].distance(&pair[1]);
            cumulative.push(total);
        }
        let length = polyline_length(&path) + ROAD_BASE_COST;
        self.graph
            .add_edge(self.node_of[a.0], self.node_of[b.0], RoadEdge::new(id, length));
        self.roads.push(Road {
            id,
            a,
            b,
            path,
            cumulative,
            length,
        });
        Ok(id)
    }

    pub fn add_building(
        &mut self,
        position: Position,
        kind: BuildingKind,
        accesses: Vec<RoadAccess>,
    ) -> BuildingId {
        let id = BuildingId(self.buildings.len());
        self.buildings.push(Building {
            id,
            position,
            kind,
            accesses,
        });
        id
    }

    /// Fix arm ordering for every junction and attach light controllers.
    ///
    /// Must run once after construction and before the first tick.
    pub fn finalize(&mut self) {
        for index in 0..self.junctions.len() {
            let id = JunctionId(index);
            let (roads, opposite) = self.order_roads_around_junction(id);
            let junction = &mut self.junctions[index];
            junction.roads = roads;
            if junction.kind == JunctionKind::LightControlled && !junction.roads.is_empty() {
                junction.controller = Some(TrafficLightController::new(opposite));
            }
        }
    }

    /// Clockwise arm ordering around a junction, with the near-opposite
    /// partner of each arm.
    ///
    /// Arms sort by the angle of their outgoing direction. Pure angle sort
    /// is unreliable for 3-way junctions at shallow angles, so those
    /// additionally test arm pairs for near-opposite directions
    /// (dot <= OPPOSITE_DOT_THRESHOLD) and place the detected pair at
    /// indices 0 and 2 with the isolated arm between them.
    pub fn order_roads_around_junction(
        &self,
        junction: JunctionId,
    ) -> (Vec<RoadId>, Vec<Option<usize>>) {
        // One arm per attachment; a self-loop contributes both ends.
        let mut arms: Vec<(RoadId, (f32, f32))> = Vec::new();
        for road in &self.roads {
            if road.a == junction {
                if let Some(dir) = outgoing_direction(&road.path, false) {
                    arms.push((road.id, dir));
                }
            }
            if road.b == junction {
                if let Some(dir) = outgoing_direction(&road.path, true) {
                    arms.push((road.id, dir));
                }
            }
        }
        // Clockwise from the +x axis.
        arms.sort_by(|(_, da), (_, db)| {
            let angle_a = da.0.atan2(da.1);
            let angle_b = db.0.atan2(db.1);
            angle_b.partial_cmp(&angle_a).unwrap_or(std::cmp::Ordering::Equal)
        });

        if arms.len() == 3 {
            if let Some((i, j)) = most_opposite_pair(&arms) {
                let isolated = (0..3).find(|k| *k != i && *k != j).unwrap_or(0);
                let reordered = vec![arms[i].clone(), arms[isolated].clone(), arms[j].clone()];
                let roads = reordered.iter().map(|(road, _)| *road).collect();
                return (roads, vec![Some(2), None, Some(0)]);
            }
        }

        let mut opposite = vec![None; arms.len()];
        for i in 0..arms.len() {
            let mut best: Option<(usize, f32)> = None;
            for j in 0..arms.len() {
                if i == j {
                    continue;
                }
                let dot = arms[i].1 .0 * arms[j].1 .0 + arms[i].1 .1 * arms[j].1 .1;
                if dot <= OPPOSITE_DOT_THRESHOLD
                    && best.map_or(true, |(_, best_dot)| dot < best_dot)
                {
                    best = Some((j, dot));
                }
            }
            opposite[i] = best.map(|(j, _)| j);
        }
        (arms.into_iter().map(|(road, _)| road).collect(), opposite)
    }

    /// The junction at the other end of a road (itself for a self-loop)
    pub fn other_junction(&self, road: RoadId, junction: JunctionId) -> JunctionId {
        let road = &self.roads[road.0];
        if road.a == junction {
            road.b
        } else {
            road.a
        }
    }

    /// A polyline vertex is a turn when the incoming and outgoing
    /// directions are non-parallel within epsilon.
    pub fn is_turn_point(&self, road: RoadId, index: usize) -> bool {
        let path = &self.roads[road.0].path;
        if index == 0 || index + 1 >= path.len() {
            return false;
        }
        let incoming = match path[index - 1].direction_to(&path[index]) {
            Some(dir) => dir,
            None => return false,
        };
        let outgoing = match path[index].direction_to(&path[index + 1]) {
            Some(dir) => dir,
            None => return false,
        };
        let dot = incoming.0 * outgoing.0 + incoming.1 * outgoing.1;
        dot < 1.0 - TURN_DOT_EPSILON
    }

    /// Vertex indices of the inclusive sub-polyline between two points on
    /// a road, ordered to start at `from`'s side.
    ///
    /// On a self-loop road whose target lies past the path midpoint, the
    /// `from` index is mirrored to the far side before ordering so the
    /// split picks the correct arc.
    pub fn split_indices(&self, road: RoadId, from: &Position, to: &Position) -> Vec<usize> {
        let record = &self.roads[road.0];
        let mut from_index = record.nearest_index(from);
        let to_index = record.nearest_index(to);
        if record.is_loop() && record.offset_of(to_index) > record.polyline_len() / 2.0 {
            from_index = record.path.len() - 1 - from_index;
        }
        if from_index <= to_index {
            (from_index..=to_index).collect()
        } else {
            (to_index..=from_index).rev().collect()
        }
    }

    /// Inclusive sub-polyline between two points on a road
    pub fn split_path(&self, road: RoadId, from: &Position, to: &Position) -> Vec<Position> {
        let path = &self.roads[road.0].path;
        self.split_indices(road, from, to)
            .into_iter()
            .map(|index| path[index])
            .collect()
    }

    pub fn junction(&self, id: JunctionId) -> &Junction {
        &self.junctions[id.0]
    }

    pub fn junction_mut(&mut self, id: JunctionId) -> &mut Junction {
        &mut self.junctions[id.0]
    }

    pub fn road(&self, id: RoadId) -> &Road {
        &self.roads[id.0]
    }

    pub fn building(&self, id: BuildingId) -> &Building {
        &self.buildings[id.0]
    }

    pub fn junctions(&self) -> impl Iterator<Item = &Junction> {
        self.junctions.iter()
    }

    pub fn junctions_mut(&mut self) -> impl Iterator<Item = &mut Junction> {
        self.junctions.iter_mut()
    }

    pub fn buildings(&self) -> &[Building] {
        &self.buildings
    }

    pub fn buildings_of_kind(&self, kind: BuildingKind) -> Vec<BuildingId> {
        self.buildings
            .iter()
            .filter(|building| building.kind == kind)
            .map(|building| building.id)
            .collect()
    }

    pub fn junction_count(&self) -> usize {
        self.junctions.len()
    }

    pub fn road_count(&self) -> usize {
        self.roads.len()
    }

    pub(crate) fn graph(&self) -> &UnGraph<JunctionId, RoadEdge> {
        &self.graph
    }

    pub(crate) fn node_of(&self, junction: JunctionId) -> NodeIndex {
        self.node_of[junction.0]
    }

    /// Move a vehicle's entry in the road position index.
    ///
    /// `forward` is the travel direction: true means toward increasing
    /// offset (from junction `a` to `b`).
    pub fn update_vehicle_position(
        &mut self,
        vehicle: VehicleId,
        road: RoadId,
        forward: bool,
        offset: OrderedFloat<f32>,
        prev: Option<(RoadId, bool, OrderedFloat<f32>)>,
    ) {
        if let Some((prev_road, prev_forward, prev_offset)) = prev {
            if let Some(index) = self.vehicles_on_roads.get_mut(&(prev_road, prev_forward)) {
                if index.get(&prev_offset) == Some(&vehicle) {
                    index.remove(&prev_offset);
                }
            }
        }
        self.vehicles_on_roads
            .entry((road, forward))
            .or_default()
            .insert(offset, vehicle);
    }

    /// Drop a vehicle from the position index entirely
    pub fn clear_vehicle(&mut self, vehicle: VehicleId) {
        for index in self.vehicles_on_roads.values_mut() {
            index.retain(|_, id| *id != vehicle);
        }
    }

    /// Nearest same-direction vehicle ahead of `offset` on a road.
    /// Oncoming traffic never blocks; None means clear ahead.
    pub fn vehicle_ahead(
        &self,
        road: RoadId,
        forward: bool,
        offset: OrderedFloat<f32>,
    ) -> Option<(f32, VehicleId)> {
        let index = self.vehicles_on_roads.get(&(road, forward))?;
        let entry = if forward {
            index
                .range((Bound::Excluded(offset), Bound::Unbounded))
                .next()
        } else {
            index
                .range((Bound::Unbounded, Bound::Excluded(offset)))
                .next_back()
        };
        entry.map(|(ahead_offset, id)| ((ahead_offset.0 - offset.0).abs(), *id))
    }

    /// Find the route-graph edge with the lowest weight between two
    /// adjacent junctions.
    pub fn road_between(&self, from: JunctionId, to: JunctionId) -> Result<RoadId> {
        self.graph
            .edges_connecting(self.node_of[from.0], self.node_of[to.0])
            .min_by_key(|edge| edge.weight().weight)
            .map(|edge| edge.weight().road)
            .with_context(|| format!("No road connects {:?} to {:?}", from, to))
    }
}

/// Unit direction leaving a polyline endpoint, skipping duplicate points
fn outgoing_direction(path: &[Position], from_end: bool) -> Option<(f32, f32)> {
    if from_end {
        let last = path.last()?;
        path.iter().rev().skip(1).find_map(|point| last.direction_to(point))
    } else {
        let first = path.first()?;
        path.iter().skip(1).find_map(|point| first.direction_to(point))
    }
}

/// Most anti-parallel arm pair at or below the opposite threshold
fn most_opposite_pair(arms: &[(RoadId, (f32, f32))]) -> Option<(usize, usize)> {
    let mut best: Option<(usize, usize, f32)> = None;
    for i in 0..arms.len() {
        for j in (i + 1)..arms.len() {
            let dot = arms[i].1 .0 * arms[j].1 .0 + arms[i].1 .1 * arms[j].1 .1;
            if dot <= OPPOSITE_DOT_THRESHOLD && best.map_or(true, |(_, _, b)| dot < b) {
                best = Some((i, j, dot));
            }
        }
    }
    best.map(|(i, j, _)| (i, j))
}
