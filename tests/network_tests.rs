//! Road network geometry and arm-ordering tests

use ordered_float::OrderedFloat;
use urban_sim::simulation::{
    BuildingKind, JunctionId, JunctionKind, Position, RoadAccess, RoadNetwork, VehicleId,
};

fn cross_network() -> (RoadNetwork, JunctionId, [JunctionId; 4]) {
    // Four-arm cross: center at origin, arms to +x, -x, +z, -z.
    let mut net = RoadNetwork::new();
    let center = net.add_junction(Position::new(0.0, 0.0, 0.0), JunctionKind::LightControlled);
    let east = net.add_junction(Position::new(20.0, 0.0, 0.0), JunctionKind::Plain);
    let west = net.add_junction(Position::new(-20.0, 0.0, 0.0), JunctionKind::Plain);
    let north = net.add_junction(Position::new(0.0, 0.0, 20.0), JunctionKind::Plain);
    let south = net.add_junction(Position::new(0.0, 0.0, -20.0), JunctionKind::Plain);
    for other in [east, west, north, south] {
        let a = net.junction(center).position;
        let b = net.junction(other).position;
        net.add_road(center, other, vec![a, b]).unwrap();
    }
    net.finalize();
    (net, center, [east, west, north, south])
}

#[test]
fn cross_junction_orders_four_arms_with_opposites() {
    let (net, center, _) = cross_network();
    let (roads, opposite) = net.order_roads_around_junction(center);
    assert_eq!(roads.len(), 4);
    // Every arm of a symmetric cross has an opposite partner.
    for (arm, partner) in opposite.iter().enumerate() {
        let partner = partner.expect("cross arm must have an opposite");
        assert_eq!(opposite[partner], Some(arm));
    }
}

#[test]
fn arm_ordering_is_deterministic() {
    let (net_a, center_a, _) = cross_network();
    let (net_b, center_b, _) = cross_network();
    assert_eq!(
        net_a.order_roads_around_junction(center_a).0,
        net_b.order_roads_around_junction(center_b).0
    );
}

#[test]
fn three_arm_junction_places_opposite_pair_around_isolated_arm() {
    let mut net = RoadNetwork::new();
    let center = net.add_junction(Position::new(0.0, 0.0, 0.0), JunctionKind::LightControlled);
    let east = net.add_junction(Position::new(20.0, 0.0, 0.0), JunctionKind::Plain);
    // Slightly bent west arm; the dot-product test still pairs it with east.
    let west = net.add_junction(Position::new(-20.0, 0.0, 2.0), JunctionKind::Plain);
    let north = net.add_junction(Position::new(0.0, 0.0, 20.0), JunctionKind::Plain);
    let mut roads = Vec::new();
    for other in [east, west, north] {
        let a = net.junction(center).position;
        let b = net.junction(other).position;
        roads.push(net.add_road(center, other, vec![a, b]).unwrap());
    }
    net.finalize();

    let (ordered, opposite) = net.order_roads_around_junction(center);
    assert_eq!(opposite, vec![Some(2), None, Some(0)]);
    // The isolated arm sits between the paired ones.
    assert_eq!(ordered[1], roads[2]);
}

#[test]
fn other_junction_resolves_both_ends() {
    let (net, center, arms) = cross_network();
    let road = net.junction(center).roads[0];
    let far = net.other_junction(road, center);
    assert!(arms.contains(&far));
    assert_eq!(net.other_junction(road, far), center);
}

#[test]
fn turn_points_are_detected_by_direction_change() {
    let mut net = RoadNetwork::new();
    let a = net.add_junction(Position::new(0.0, 0.0, 0.0), JunctionKind::Plain);
    let b = net.add_junction(Position::new(10.0, 0.0, 10.0), JunctionKind::Plain);
    let bent = net
        .add_road(
            a,
            b,
            vec![
                Position::new(0.0, 0.0, 0.0),
                Position::new(10.0, 0.0, 0.0),
                Position::new(10.0, 0.0, 10.0),
            ],
        )
        .unwrap();
    let c = net.add_junction(Position::new(0.0, 0.0, 20.0), JunctionKind::Plain);
    let d = net.add_junction(Position::new(20.0, 0.0, 20.0), JunctionKind::Plain);
    let straight = net
        .add_road(
            c,
            d,
            vec![
                Position::new(0.0, 0.0, 20.0),
                Position::new(10.0, 0.0, 20.0),
                Position::new(20.0, 0.0, 20.0),
            ],
        )
        .unwrap();

    assert!(net.is_turn_point(bent, 1));
    assert!(!net.is_turn_point(straight, 1));
    // Endpoints are never turns.
    assert!(!net.is_turn_point(bent, 0));
    assert!(!net.is_turn_point(bent, 2));
}

#[test]
fn split_path_covers_the_road_from_either_endpoint() {
    let mut net = RoadNetwork::new();
    let a = net.add_junction(Position::new(0.0, 0.0, 0.0), JunctionKind::Plain);
    let b = net.add_junction(Position::new(40.0, 0.0, 0.0), JunctionKind::Plain);
    let path: Vec<Position> = (0..5)
        .map(|i| Position::new(i as f32 * 10.0, 0.0, 0.0))
        .collect();
    let road = net.add_road(a, b, path).unwrap();

    let target = Position::new(20.0, 0.0, 0.0);
    let from_a = net.split_path(road, &net.junction(a).position, &target);
    let from_b = net.split_path(road, &net.junction(b).position, &target);

    // Each half starts at its junction's side and ends at the target.
    assert_eq!(from_a.first().unwrap().x, 0.0);
    assert_eq!(from_b.first().unwrap().x, 40.0);
    assert_eq!(from_a.last().unwrap().x, 20.0);
    assert_eq!(from_b.last().unwrap().x, 20.0);
    // Together the two splits cover every vertex, overlapping only at the target.
    assert_eq!(from_a.len() + from_b.len(), 6);
}

#[test]
fn split_is_independent_of_road_storage_direction() {
    let vertices: Vec<Position> = (0..5)
        .map(|i| Position::new(i as f32 * 10.0, 0.0, 0.0))
        .collect();
    let target = Position::new(30.0, 0.0, 0.0);

    let mut forward = RoadNetwork::new();
    let a = forward.add_junction(Position::new(0.0, 0.0, 0.0), JunctionKind::Plain);
    let b = forward.add_junction(Position::new(40.0, 0.0, 0.0), JunctionKind::Plain);
    let road = forward.add_road(a, b, vertices.clone()).unwrap();
    let split_forward = forward.split_path(road, &forward.junction(a).position, &target);

    // Same geometry, stored in the opposite direction.
    let mut reversed = RoadNetwork::new();
    let a2 = reversed.add_junction(Position::new(0.0, 0.0, 0.0), JunctionKind::Plain);
    let b2 = reversed.add_junction(Position::new(40.0, 0.0, 0.0), JunctionKind::Plain);
    let backwards: Vec<Position> = vertices.into_iter().rev().collect();
    let road2 = reversed.add_road(b2, a2, backwards).unwrap();
    let split_reversed = reversed.split_path(road2, &reversed.junction(a2).position, &target);

    assert_eq!(split_forward.len(), split_reversed.len());
    for (lhs, rhs) in split_forward.iter().zip(&split_reversed) {
        assert!(lhs.distance(rhs) < 1e-6);
    }
    assert_eq!(split_forward.first().unwrap().x, 0.0);
}

#[test]
fn self_loop_split_mirrors_past_the_midpoint() {
    let mut net = RoadNetwork::new();
    let hub = net.add_junction(Position::new(0.0, 0.0, 0.0), JunctionKind::Plain);
    // A loop leaving and returning to the hub.
    let path = vec![
        Position::new(0.0, 0.0, 0.0),
        Position::new(10.0, 0.0, 0.0),
        Position::new(10.0, 0.0, 10.0),
        Position::new(0.0, 0.0, 10.0),
        Position::new(0.0, 0.0, 0.0),
    ];
    let road = net.add_road(hub, hub, path).unwrap();

    // Target on the far half: the from index mirrors to the loop's far end,
    // picking the short arc back from the hub.
    let target = Position::new(0.0, 0.0, 10.0);
    let split = net.split_path(road, &net.junction(hub).position, &target);
    assert_eq!(split.len(), 2);
    assert_eq!(split.last().unwrap().z, 10.0);
}

#[test]
fn vehicle_index_partitions_by_travel_direction() {
    let mut net = RoadNetwork::new();
    let a = net.add_junction(Position::new(0.0, 0.0, 0.0), JunctionKind::Plain);
    let b = net.add_junction(Position::new(40.0, 0.0, 0.0), JunctionKind::Plain);
    let road = net
        .add_road(
            a,
            b,
            vec![Position::new(0.0, 0.0, 0.0), Position::new(40.0, 0.0, 0.0)],
        )
        .unwrap();

    let east = VehicleId(0);
    let west = VehicleId(1);
    net.update_vehicle_position(east, road, true, OrderedFloat(10.0), None);
    net.update_vehicle_position(west, road, false, OrderedFloat(20.0), None);

    // Oncoming traffic on the shared polyline is invisible to the scan.
    assert!(net.vehicle_ahead(road, true, OrderedFloat(10.0)).is_none());
    assert!(net.vehicle_ahead(road, false, OrderedFloat(20.0)).is_none());

    // A same-direction vehicle ahead is found with its gap.
    let lead = VehicleId(2);
    net.update_vehicle_position(lead, road, true, OrderedFloat(14.0), None);
    assert_eq!(
        net.vehicle_ahead(road, true, OrderedFloat(10.0)),
        Some((4.0, lead))
    );
}

#[test]
fn buildings_are_filtered_by_kind() {
    let (mut net, center, _) = cross_network();
    let road = net.junction(center).roads[0];
    let point = net.road(road).path[0];
    net.add_building(point, BuildingKind::Home, vec![RoadAccess { road, point }]);
    net.add_building(point, BuildingKind::Work, vec![RoadAccess { road, point }]);
    assert_eq!(net.buildings_of_kind(BuildingKind::Home).len(), 1);
    assert_eq!(net.buildings_of_kind(BuildingKind::Work).len(), 1);
    assert_eq!(net.buildings().len(), 2);
}
