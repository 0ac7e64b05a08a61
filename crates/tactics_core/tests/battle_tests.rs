//! Battle flow tests.
//!
//! Drives full sessions through the public API and checks what the
//! presentation layer is told.

use std::cell::RefCell;
use std::rc::Rc;

use tactics_core::prelude::*;
use tactics_test_utils::fixtures::{coord, duel_session, empty_session, finish_moves, spawn};
use tactics_test_utils::recording::{GatewayEvent, RecordingGateway};

#[test]
fn test_duel_first_attack_halves_health() {
    let gateway = RecordingGateway::new();
    let (mut session, a, b) = duel_session(gateway.boxed());
    session.start().unwrap();

    assert!(session.attackable_units(a).unwrap().contains(&b));

    let outcome = session.attack(a, b).unwrap();
    assert_eq!(outcome.remaining_health, 5);

    let unit_b = session.units().get(b).unwrap();
    assert_eq!(unit_b.current_health(), 5);
    let unit_a = session.units().get(a).unwrap();
    assert!(unit_a.has_attacked_this_round());
    assert!(unit_a.has_moved_this_round());

    assert_eq!(
        gateway.events(),
        vec![
            GatewayEvent::TurnStarted(TeamColor::Red),
            GatewayEvent::Attacked(outcome),
        ]
    );
}

#[test]
fn test_duel_second_attack_kills_and_third_is_rejected() {
    let (session, a, b) = duel_session(Box::new(NullGateway));
    let table = session.balancing().clone();
    let mut registry = session.units().clone();
    let resolver = CombatResolver::new(&table);
    let mut gateway = RecordingGateway::new();

    resolver.resolve_attack(a, b, &mut registry, &mut gateway).unwrap();
    let outcome = resolver.resolve_attack(a, b, &mut registry, &mut gateway).unwrap();
    assert!(outcome.defender_died);
    assert!(registry.get(b).is_none());
    assert_eq!(registry.require(b), Err(BattleError::UnknownUnit(b)));
    assert_eq!(gateway.deaths(), vec![b]);

    assert_eq!(
        resolver.resolve_attack(a, b, &mut registry, &mut gateway),
        Err(BattleError::InvalidTarget { attacker: a, defender: b })
    );
}

#[test]
fn test_killing_last_enemy_ends_battle() {
    let gateway = RecordingGateway::new();
    let (mut session, a, b) = duel_session(gateway.boxed());
    session.start().unwrap();

    session.attack(a, b).unwrap();
    session.end_turn().unwrap();
    session.end_turn().unwrap();
    session.attack(a, b).unwrap();

    assert_eq!(
        session.state(),
        TurnState::BattleOver {
            winner: Some(TeamColor::Red)
        }
    );
    let events = gateway.events();
    assert_eq!(events.last(), Some(&GatewayEvent::Died(b)));
    assert_eq!(session.end_turn(), Err(BattleError::BattleOver));
}

#[test]
fn test_destination_surrounded_by_units_is_unreachable() {
    let mut session = empty_session(7, 7, Box::new(NullGateway));
    let mover = spawn(&mut session, TeamColor::Red, UnitType::Recon, 0, 3);
    for (x, y) in [(4, 4), (5, 3), (4, 2), (3, 3)] {
        spawn(&mut session, TeamColor::Blue, UnitType::Infantry, x, y);
    }
    session.start().unwrap();

    let search = session.best_route(mover, coord(4, 3)).unwrap();
    assert!(search.route.is_empty());
    assert!(!search.debug.is_empty());
    assert_eq!(
        search.into_result(coord(0, 3), coord(4, 3)),
        Err(BattleError::NoPathFound {
            from: coord(0, 3),
            to: coord(4, 3)
        })
    );
    assert!(!session.walkable_tiles(mover).unwrap().contains(&coord(4, 3)));
}

#[test]
fn test_direction_between_is_stable() {
    for _ in 0..100 {
        assert_eq!(
            CardinalDirection::between(coord(0, 0), coord(1, 0)),
            Ok(CardinalDirection::East)
        );
    }
    assert_eq!(
        CardinalDirection::between(coord(0, 0), coord(1, 1)),
        Err(BattleError::InvalidDirection {
            from: coord(0, 0),
            to: coord(1, 1)
        })
    );
}

#[test]
fn test_turn_transition_resets_only_new_team() {
    let mut session = empty_session(6, 6, Box::new(NullGateway));
    let red = spawn(&mut session, TeamColor::Red, UnitType::Infantry, 0, 0);
    let blue = spawn(&mut session, TeamColor::Blue, UnitType::Infantry, 0, 2);
    let blue_far = spawn(&mut session, TeamColor::Blue, UnitType::Tank, 5, 5);
    session.start().unwrap();

    session.attack(red, blue).unwrap();
    let transition = session.end_turn().unwrap();
    assert_eq!(transition.started, TeamColor::Blue);
    assert_eq!(transition.units_reset, 2);

    // Red keeps its spent flags during Blue's turn.
    assert!(session.units().get(red).unwrap().has_attacked_this_round());
    session.attack(blue, red).unwrap();
    assert!(session.can_act(blue_far));

    let transition = session.end_turn().unwrap();
    assert_eq!(transition.round, 2);
    assert!(!session.units().get(red).unwrap().has_attacked_this_round());
    assert!(session.units().get(blue).unwrap().has_attacked_this_round());
}

#[test]
fn test_move_reports_each_step_and_faces_along_route() {
    let gateway = RecordingGateway::new();
    let mut session = empty_session(6, 6, gateway.boxed());
    let tank = spawn(&mut session, TeamColor::Red, UnitType::Tank, 0, 0);
    spawn(&mut session, TeamColor::Blue, UnitType::Infantry, 5, 5);
    session.start().unwrap();
    gateway.take();

    let done = Rc::new(RefCell::new(None));
    let sink = Rc::clone(&done);
    let route = session
        .begin_move(tank, coord(2, 2), move |completion| *sink.borrow_mut() = Some(completion.destination))
        .unwrap();
    assert_eq!(route.step_count(), 4);

    let completions = finish_moves(&mut session, 100);
    assert_eq!(completions.len(), 1);
    assert_eq!(*done.borrow(), Some(coord(2, 2)));
    assert_eq!(gateway.steps_of(tank), route.tiles()[1..].to_vec());

    let facings: Vec<CardinalDirection> = gateway
        .events()
        .into_iter()
        .filter_map(|event| match event {
            GatewayEvent::Moved { facing, .. } => Some(facing),
            _ => None,
        })
        .collect();
    let expected: Vec<CardinalDirection> = route
        .steps()
        .map(|(from, to)| CardinalDirection::between(from, to).unwrap())
        .collect();
    assert_eq!(facings, expected);

    // Nothing in range after the move, so the tank is done for the round.
    assert!(!session.can_act(tank));
}

#[test]
fn test_rough_terrain_limits_reach() {
    let map = tactics_test_utils::fixtures::map_from_rows(&[
        ".....",
        "~~~~~",
        ".....",
    ]);
    let mut session = BattleSession::new(
        tactics_test_utils::fixtures::standard_table(),
        map,
        tactics_test_utils::fixtures::red_vs_blue(),
        Box::new(NullGateway),
    )
    .unwrap();
    // Artillery has 2 movement: it can enter the rough row but not cross it.
    let artillery = spawn(&mut session, TeamColor::Red, UnitType::Artillery, 2, 0);

    let reach = session.walkable_tiles(artillery).unwrap();
    assert!(reach.contains(&coord(2, 1)));
    assert!(!reach.contains(&coord(2, 2)));
    assert!(reach.contains(&coord(0, 0)));
}

#[test]
fn test_action_options_follow_flags() {
    let (mut session, a, b) = duel_session(Box::new(NullGateway));
    assert!(session.action_options(a).unwrap().is_empty());

    session.start().unwrap();
    let options = session.action_options(a).unwrap();
    assert!(options.walkable.contains(&coord(0, 0)));
    assert!(options.attackable.contains(&b));
    assert!(session.action_options(b).unwrap().is_empty());

    session.attack(a, b).unwrap();
    assert!(session.action_options(a).unwrap().is_empty());
}

#[test]
fn test_turn_listeners_run_in_registration_order() {
    let (mut session, _, _) = duel_session(Box::new(NullGateway));
    let log = Rc::new(RefCell::new(Vec::new()));

    let start_log = Rc::clone(&log);
    session
        .add_turn_start_listener("camera", move |team| start_log.borrow_mut().push(format!("focus {team}")))
        .unwrap();
    let end_log = Rc::clone(&log);
    session
        .add_turn_end_listener("DeselectUnit", move |team| end_log.borrow_mut().push(format!("deselect {team}")))
        .unwrap();

    session.start().unwrap();
    session.end_turn().unwrap();
    assert!(session.remove_turn_end_listener("DeselectUnit"));
    session.end_turn().unwrap();

    assert_eq!(
        *log.borrow(),
        vec!["focus Red", "deselect Red", "focus Blue", "focus Red"]
    );
}

#[test]
fn test_team_without_units_loses_its_turns() {
    let gateway = RecordingGateway::new();
    let teams = vec![
        Team::player(TeamColor::Red),
        Team::remote(TeamColor::Blue),
        Team::remote(TeamColor::Green),
    ];
    let mut session = BattleSession::new(
        tactics_test_utils::fixtures::standard_table(),
        TileMap::new(6, 6),
        teams,
        gateway.boxed(),
    )
    .unwrap()
    .with_move_speed(Fixed::ONE)
    .unwrap();
    let red = spawn(&mut session, TeamColor::Red, UnitType::Artillery, 0, 0);
    let blue = spawn(&mut session, TeamColor::Blue, UnitType::Infantry, 0, 3);
    spawn(&mut session, TeamColor::Green, UnitType::Tank, 5, 5);

    let started = Rc::new(RefCell::new(Vec::new()));
    let sink = Rc::clone(&started);
    session
        .add_turn_start_listener("hud", move |team| sink.borrow_mut().push(team))
        .unwrap();
    session.start().unwrap();

    // Artillery hits for 9; Infantry has 10 health, so two rounds to kill.
    session.attack(red, blue).unwrap();
    session.end_turn().unwrap();
    session.end_turn().unwrap();
    session.end_turn().unwrap();
    let outcome = session.attack(red, blue).unwrap();
    assert!(outcome.defender_died);
    assert!(matches!(session.state(), TurnState::Active(TeamColor::Red)));

    let transition = session.end_turn().unwrap();
    assert_eq!(transition.started, TeamColor::Green);
    let transition = session.end_turn().unwrap();
    assert_eq!((transition.started, transition.round), (TeamColor::Red, 3));

    use TeamColor::{Blue, Green, Red};
    assert_eq!(*started.borrow(), vec![Red, Blue, Green, Red, Green, Red]);
    let announced: Vec<TeamColor> = gateway
        .events()
        .into_iter()
        .filter_map(|event| match event {
            GatewayEvent::TurnStarted(team) => Some(team),
            _ => None,
        })
        .collect();
    assert_eq!(announced, *started.borrow());
}

#[test]
fn test_scenario_from_assets_loads() {
    let table = UnitBalancingTable::from_ron_str(
        "balancing.ron",
        include_str!("../../../assets/data/balancing.ron"),
    )
    .unwrap();
    assert_eq!(table.len(), UnitType::ALL.len());

    for (name, text) in [
        ("skirmish.ron", include_str!("../../../assets/data/scenarios/skirmish.ron")),
        ("river_crossing.ron", include_str!("../../../assets/data/scenarios/river_crossing.ron")),
    ] {
        let scenario = ScenarioData::from_ron_str(name, text).unwrap();
        let mut session = BattleSession::from_scenario(table.clone(), &scenario, Box::new(NullGateway)).unwrap();
        assert_eq!(session.units().len(), scenario.units.len(), "{name}");
        assert_eq!(session.start().unwrap(), TeamColor::Red);
    }
}
