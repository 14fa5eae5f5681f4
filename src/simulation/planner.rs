//! Route planning and waypoint expansion
//!
//! A* over the junction graph (edge weight = road length, heuristic =
//! straight-line distance, both scaled to integers the same way so the
//! heuristic stays admissible), followed by expansion of the road route
//! into a dense waypoint path a vehicle can drive: road polylines are
//! concatenated in traversal order, first/last roads are split at the
//! trip's spawn points, and corners get Bezier rounding so headings never
//! jump discontinuously.

use log::warn;
use petgraph::algo::astar;

use super::network::{RoadAccess, RoadNetwork};
use super::types::{JunctionId, Position, RoadId, TURN_DOT_EPSILON};

/// One waypoint of an expanded trip path.
///
/// Carries the owning road and the parametric offset along it for the
/// vehicle position index, plus a marker on waypoints where the path
/// passes through a junction.
#[derive(Debug, Clone)]
pub struct PathPoint {
    pub position: Position,
    pub road: RoadId,
    pub offset: f32,
    pub junction: Option<JunctionId>,
}

/// A* route planner plus waypoint expansion
#[derive(Debug, Clone)]
pub struct PathPlanner {
    /// Interpolated points per rounded corner
    pub smoothing_segments: usize,
}

impl Default for PathPlanner {
    fn default() -> Self {
        Self {
            smoothing_segments: 4,
        }
    }
}

impl PathPlanner {
    /// Cheapest road sequence between two junctions, with its scaled cost.
    ///
    /// None means unreachable; callers resample endpoints rather than
    /// treating this as an error.
    pub fn route_with_cost(
        &self,
        net: &RoadNetwork,
        from: JunctionId,
        to: JunctionId,
    ) -> Option<(u32, Vec<RoadId>)> {
        if from == to {
            return Some((0, Vec::new()));
        }
        let goal = net.node_of(to);
        let goal_pos = net.junction(to).position;
        let (cost, nodes) = astar(
            net.graph(),
            net.node_of(from),
            |node| node == goal,
            |edge| edge.weight().weight,
            // Node indices mirror the junction arena one-to-one.
            |node| {
                let pos = net.junction(JunctionId(node.index())).position;
                (pos.distance(&goal_pos) * 100.0) as u32
            },
        )?;

        let mut roads = Vec::with_capacity(nodes.len().saturating_sub(1));
        for pair in nodes.windows(2) {
            match net.road_between(JunctionId(pair[0].index()), JunctionId(pair[1].index())) {
                Ok(road) => roads.push(road),
                Err(err) => {
                    warn!("Route reconstruction failed: {err:#}");
                    return None;
                }
            }
        }
        Some((cost, roads))
    }

    /// Junction-to-junction road sequence; empty when unreachable
    pub fn find_route(&self, net: &RoadNetwork, from: JunctionId, to: JunctionId) -> Vec<RoadId> {
        self.route_with_cost(net, from, to)
            .map(|(_, roads)| roads)
            .unwrap_or_default()
    }

    /// Expand an origin/destination road access pair into a drivable
    /// waypoint path. Empty when no route connects the two accesses.
    pub fn plan_trip(
        &self,
        net: &RoadNetwork,
        origin: &RoadAccess,
        dest: &RoadAccess,
    ) -> Vec<PathPoint> {
        if origin.road == dest.road {
            let points = self.points_on_road(net, origin.road, &origin.point, &dest.point, false);
            return self.smooth(points);
        }

        let best = self.best_endpoints(net, origin, dest);
        let (enter, exit, route) = match best {
            Some(found) => found,
            None => return Vec::new(),
        };

        let mut raw = self.points_on_road(
            net,
            origin.road,
            &origin.point,
            &net.junction(enter).position,
            false,
        );
        if let Some(last) = raw.last_mut() {
            last.junction = Some(enter);
        }

        let mut current = enter;
        for road_id in route {
            let record = net.road(road_id);
            let forward = record.a == current;
            let count = record.path.len();
            let indices: Vec<usize> = if forward {
                (1..count).collect()
            } else {
                (0..count - 1).rev().collect()
            };
            for index in indices {
                raw.push(PathPoint {
                    position: record.path[index],
                    road: road_id,
                    offset: record.offset_of(index),
                    junction: None,
                });
            }
            current = net.other_junction(road_id, current);
            if let Some(last) = raw.last_mut() {
                last.junction = Some(current);
            }
        }
        debug_assert_eq!(current, exit);

        let tail = self.points_on_road(net, dest.road, &net.junction(exit).position, &dest.point, true);
        raw.extend(tail);

        self.smooth(raw)
    }

    /// Choose the endpoint-junction pair minimizing route cost plus the
    /// approach/departure distances along the access roads.
    fn best_endpoints(
        &self,
        net: &RoadNetwork,
        origin: &RoadAccess,
        dest: &RoadAccess,
    ) -> Option<(JunctionId, JunctionId, Vec<RoadId>)> {
        let origin_road = net.road(origin.road);
        let dest_road = net.road(dest.road);
        let mut origin_ends = vec![origin_road.a];
        if origin_road.b != origin_road.a {
            origin_ends.push(origin_road.b);
        }
        let mut dest_ends = vec![dest_road.a];
        if dest_road.b != dest_road.a {
            dest_ends.push(dest_road.b);
        }

        let mut best: Option<(u32, JunctionId, JunctionId, Vec<RoadId>)> = None;
        for enter in &origin_ends {
            let approach = (origin.point.distance(&net.junction(*enter).position) * 100.0) as u32;
            for exit in &dest_ends {
                if let Some((cost, route)) = self.route_with_cost(net, *enter, *exit) {
                    let depart =
                        (net.junction(*exit).position.distance(&dest.point) * 100.0) as u32;
                    let total = cost + approach + depart;
                    if best.as_ref().map_or(true, |(b, ..)| total < *b) {
                        best = Some((total, *enter, *exit, route));
                    }
                }
            }
        }
        best.map(|(_, enter, exit, route)| (enter, exit, route))
    }

    /// Sub-polyline of one road as path points, optionally dropping the
    /// first vertex when it duplicates the previous segment's last point.
    fn points_on_road(
        &self,
        net: &RoadNetwork,
        road: RoadId,
        from: &Position,
        to: &Position,
        skip_first: bool,
    ) -> Vec<PathPoint> {
        let record = net.road(road);
        let indices = net.split_indices(road, from, to);
        indices
            .into_iter()
            .skip(if skip_first { 1 } else { 0 })
            .map(|index| PathPoint {
                position: record.path[index],
                road,
                offset: record.offset_of(index),
                junction: None,
            })
            .collect()
    }

    /// Quadratic-Bezier corner rounding at turns and junction
    /// pass-throughs. Straight runs pass through untouched.
    fn smooth(&self, points: Vec<PathPoint>) -> Vec<PathPoint> {
        if points.len() < 3 || self.smoothing_segments == 0 {
            return points;
        }
        let mut out: Vec<PathPoint> = Vec::with_capacity(points.len() * 2);
        out.push(points[0].clone());
        for index in 1..points.len() - 1 {
            let prev = &points[index - 1];
            let corner = &points[index];
            let next = &points[index + 1];
            if !Self::is_corner(prev, corner, next) {
                out.push(corner.clone());
                continue;
            }
            let entry = prev.position.lerp(&corner.position, 0.5);
            let exit = corner.position.lerp(&next.position, 0.5);
            let segments = self.smoothing_segments;
            let marker_at = segments / 2;
            for step in 0..=segments {
                let t = step as f32 / segments as f32;
                out.push(PathPoint {
                    position: bezier_quadratic(&entry, &corner.position, &exit, t),
                    road: corner.road,
                    offset: corner.offset,
                    junction: if step == marker_at { corner.junction } else { None },
                });
            }
        }
        if let Some(last) = points.last() {
            out.push(last.clone());
        }
        out
    }

    fn is_corner(prev: &PathPoint, corner: &PathPoint, next: &PathPoint) -> bool {
        if corner.junction.is_some() {
            return true;
        }
        let incoming = match prev.position.direction_to(&corner.position) {
            Some(dir) => dir,
            None => return false,
        };
        let outgoing = match corner.position.direction_to(&next.position) {
            Some(dir) => dir,
            None => return false,
        };
        incoming.0 * outgoing.0 + incoming.1 * outgoing.1 < 1.0 - TURN_DOT_EPSILON
    }
}

fn bezier_quadratic(a: &Position, control: &Position, b: &Position, t: f32) -> Position {
    let ab = a.lerp(control, t);
    let bc = control.lerp(b, t);
    ab.lerp(&bc, t)
}
