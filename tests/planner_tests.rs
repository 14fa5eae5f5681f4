//! Route planning and trip expansion tests

use urban_sim::simulation::{
    JunctionId, JunctionKind, PathPlanner, Position, RoadAccess, RoadId, RoadNetwork,
};

fn straight(a: Position, b: Position) -> Vec<Position> {
    vec![a, a.lerp(&b, 0.5), b]
}

fn junction(net: &mut RoadNetwork, x: f32, z: f32) -> JunctionId {
    net.add_junction(Position::new(x, 0.0, z), JunctionKind::Plain)
}

fn connect(net: &mut RoadNetwork, a: JunctionId, b: JunctionId) -> RoadId {
    let pa = net.junction(a).position;
    let pb = net.junction(b).position;
    net.add_road(a, b, straight(pa, pb)).unwrap()
}

#[test]
fn route_prefers_the_shorter_path() {
    let mut net = RoadNetwork::new();
    let a = junction(&mut net, 0.0, 0.0);
    let b = junction(&mut net, 10.0, 0.0);
    let c = junction(&mut net, 0.0, 30.0);
    let d = junction(&mut net, 10.0, 30.0);
    let direct = connect(&mut net, a, b);
    connect(&mut net, a, c);
    connect(&mut net, c, d);
    connect(&mut net, d, b);
    net.finalize();

    let planner = PathPlanner::default();
    assert_eq!(planner.find_route(&net, a, b), vec![direct]);
}

#[test]
fn route_to_self_is_empty_with_zero_cost() {
    let mut net = RoadNetwork::new();
    let a = junction(&mut net, 0.0, 0.0);
    let b = junction(&mut net, 10.0, 0.0);
    connect(&mut net, a, b);
    net.finalize();

    let planner = PathPlanner::default();
    let (cost, roads) = planner.route_with_cost(&net, a, a).unwrap();
    assert_eq!(cost, 0);
    assert!(roads.is_empty());
}

#[test]
fn unreachable_destination_yields_no_route() {
    let mut net = RoadNetwork::new();
    let a = junction(&mut net, 0.0, 0.0);
    let b = junction(&mut net, 10.0, 0.0);
    let c = junction(&mut net, 100.0, 0.0);
    let d = junction(&mut net, 110.0, 0.0);
    connect(&mut net, a, b);
    connect(&mut net, c, d);
    net.finalize();

    let planner = PathPlanner::default();
    assert!(planner.find_route(&net, a, c).is_empty());
    assert!(planner.route_with_cost(&net, a, c).is_none());
}

#[test]
fn same_road_trip_stays_on_the_road() {
    let mut net = RoadNetwork::new();
    let a = junction(&mut net, 0.0, 0.0);
    let b = junction(&mut net, 40.0, 0.0);
    let path: Vec<Position> = (0..5)
        .map(|i| Position::new(i as f32 * 10.0, 0.0, 0.0))
        .collect();
    let road = net.add_road(a, b, path).unwrap();
    net.finalize();

    let planner = PathPlanner::default();
    let origin = RoadAccess {
        road,
        point: Position::new(10.0, 0.0, 0.0),
    };
    let dest = RoadAccess {
        road,
        point: Position::new(30.0, 0.0, 0.0),
    };
    let trip = planner.plan_trip(&net, &origin, &dest);
    assert_eq!(trip.len(), 3);
    assert_eq!(trip.first().unwrap().position.x, 10.0);
    assert_eq!(trip.last().unwrap().position.x, 30.0);
    assert!(trip.iter().all(|point| point.road == road));
    assert!(trip.iter().all(|point| point.junction.is_none()));
}

#[test]
fn unreachable_trip_yields_an_empty_path() {
    let mut net = RoadNetwork::new();
    let a = junction(&mut net, 0.0, 0.0);
    let b = junction(&mut net, 30.0, 0.0);
    let c = junction(&mut net, 100.0, 0.0);
    let d = junction(&mut net, 130.0, 0.0);
    let first = connect(&mut net, a, b);
    let second = connect(&mut net, c, d);
    net.finalize();

    let planner = PathPlanner::default();
    let origin = RoadAccess {
        road: first,
        point: Position::new(15.0, 0.0, 0.0),
    };
    let dest = RoadAccess {
        road: second,
        point: Position::new(115.0, 0.0, 0.0),
    };
    assert!(planner.plan_trip(&net, &origin, &dest).is_empty());
}

#[test]
fn trip_across_a_junction_marks_it_once() {
    let mut net = RoadNetwork::new();
    let a = junction(&mut net, 0.0, 0.0);
    let mid = junction(&mut net, 30.0, 0.0);
    let c = junction(&mut net, 60.0, 0.0);
    let first = connect(&mut net, a, mid);
    let second = connect(&mut net, mid, c);
    net.finalize();

    let planner = PathPlanner::default();
    let origin = RoadAccess {
        road: first,
        point: Position::new(15.0, 0.0, 0.0),
    };
    let dest = RoadAccess {
        road: second,
        point: Position::new(45.0, 0.0, 0.0),
    };
    let trip = planner.plan_trip(&net, &origin, &dest);
    assert!(!trip.is_empty());
    assert_eq!(trip.first().unwrap().position.x, 15.0);
    assert_eq!(trip.last().unwrap().position.x, 45.0);

    let markers: Vec<_> = trip
        .iter()
        .filter_map(|point| point.junction.map(|j| (j, point.position)))
        .collect();
    assert_eq!(markers.len(), 1);
    assert_eq!(markers[0].0, mid);
    assert!(markers[0].1.distance(&net.junction(mid).position) < 0.01);
}

#[test]
fn corner_smoothing_cuts_the_turn_vertex() {
    let mut net = RoadNetwork::new();
    let a = junction(&mut net, 0.0, 0.0);
    let corner = junction(&mut net, 20.0, 0.0);
    let c = junction(&mut net, 20.0, 20.0);
    let first = connect(&mut net, a, corner);
    let second = connect(&mut net, corner, c);
    net.finalize();

    let planner = PathPlanner::default();
    let origin = RoadAccess {
        road: first,
        point: Position::new(10.0, 0.0, 0.0),
    };
    let dest = RoadAccess {
        road: second,
        point: Position::new(20.0, 0.0, 10.0),
    };
    let trip = planner.plan_trip(&net, &origin, &dest);
    assert!(trip.len() > 3, "smoothing should add interpolated points");

    // The rounded path never touches the sharp corner vertex.
    let corner_pos = net.junction(corner).position;
    let closest = trip
        .iter()
        .map(|point| point.position.distance(&corner_pos))
        .fold(f32::INFINITY, f32::min);
    assert!(closest > 0.5);
    // The junction marker survives smoothing.
    assert!(trip.iter().any(|point| point.junction == Some(corner)));
}

#[test]
fn reversed_road_storage_still_expands_contiguously() {
    let mut net = RoadNetwork::new();
    let a = junction(&mut net, 0.0, 0.0);
    let b = junction(&mut net, 30.0, 0.0);
    let c = junction(&mut net, 60.0, 0.0);
    let d = junction(&mut net, 90.0, 0.0);
    let first = connect(&mut net, a, b);
    // Middle road stored against the travel direction.
    let pc = net.junction(c).position;
    let pb = net.junction(b).position;
    net.add_road(c, b, straight(pc, pb)).unwrap();
    let last = connect(&mut net, c, d);
    net.finalize();

    let planner = PathPlanner::default();
    let origin = RoadAccess {
        road: first,
        point: Position::new(15.0, 0.0, 0.0),
    };
    let dest = RoadAccess {
        road: last,
        point: Position::new(75.0, 0.0, 0.0),
    };
    let trip = planner.plan_trip(&net, &origin, &dest);
    assert!(!trip.is_empty());

    // Waypoints progress monotonically with no reversal jumps.
    for pair in trip.windows(2) {
        assert!(pair[1].position.x >= pair[0].position.x - 0.01);
        assert!(pair[0].position.distance(&pair[1].position) < 16.0);
    }
    assert_eq!(
        trip.iter().filter(|point| point.junction.is_some()).count(),
        2
    );
}
