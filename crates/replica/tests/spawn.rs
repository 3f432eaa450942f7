mod common;

use std::collections::HashSet;

use glam::{Quat, Vec3};
use replica::{ConnectionId, Frame, NetworkEvent, ReplicationError, SendTarget, Transform, Value};

use common::*;

#[test]
fn test_spawn_sends_per_recipient_authority() {
    let mut net = server();
    let owner = connect(&mut net, 7);
    let other = connect(&mut net, 8);
    let third = connect(&mut net, 9);
    take_sent(&mut net);

    let id = net.spawn(TURRET_PREFAB, Some(owner), false).unwrap();

    let sent = take_sent(&mut net);
    assert_eq!(sent.len(), 3);
    for (target, frame) in sent {
        let Frame::TargetRpc(call) = frame else {
            panic!("expected a target rpc spawn frame");
        };
        assert_eq!(call.method, "SpawnObject");
        assert_eq!(call.entity_id, id);
        assert_eq!(call.component_index, 0);
        assert_eq!(call.args[0], Value::Int(TURRET_PREFAB as i32));

        let SendTarget::Connection(to) = target else {
            panic!("spawn frames are targeted");
        };
        let expected_authority = to == owner;
        assert!([owner, other, third].contains(&to));
        assert_eq!(call.args[1], Value::Bool(expected_authority));
        assert_eq!(call.args[4], Value::Bool(false));
    }

    let entity = net.entity(id).unwrap();
    assert_eq!(entity.owner(), Some(owner));
    assert!(!entity.has_authority());
    assert!(net.connections().unwrap().get(owner).unwrap().owns(id));
}

#[test]
fn test_spawned_ids_are_distinct() {
    let mut net = server();
    let ids: HashSet<_> = (0..200)
        .map(|_| net.spawn(EMPTY_PREFAB, None, true).unwrap())
        .collect();
    assert_eq!(ids.len(), 200);
    assert_eq!(net.world().entity_count(), 200);
}

#[test]
fn test_spawn_unknown_prefab() {
    let mut net = server();
    connect(&mut net, 1);
    take_sent(&mut net);

    let err = net.spawn(99, None, true).unwrap_err();
    assert_eq!(err, ReplicationError::UnknownPrefab(99));
    assert!(net.world().is_empty());
    assert!(take_sent(&mut net).is_empty());
}

#[test]
fn test_spawn_requires_server() {
    let mut net = network(Default::default());
    assert_eq!(net.spawn(EMPTY_PREFAB, None, true), Err(ReplicationError::NotServer));
}

#[test]
fn test_server_authority_keeps_ownership() {
    let mut net = server();
    let conn = connect(&mut net, 3);
    take_sent(&mut net);

    let id = net.spawn(TURRET_PREFAB, Some(conn), true).unwrap();
    let entity = net.entity(id).unwrap();
    assert_eq!(entity.owner(), None);
    assert!(entity.has_authority());

    let sent = take_sent(&mut net);
    let Frame::TargetRpc(call) = &sent[0].1 else {
        panic!("expected spawn frame");
    };
    assert_eq!(call.args[1], Value::Bool(false));
}

#[test]
fn test_spawn_runs_start_hooks_once() {
    let mut net = server();
    let id = net.spawn(PLAYER_PREFAB, None, true).unwrap();
    assert!(net.entity(id).unwrap().is_started());
    assert_eq!(score_of(&net, id).started, 1);
}

#[test]
fn test_spawn_carries_transform() {
    let mut net = server();
    connect(&mut net, 1);
    take_sent(&mut net);

    let transform = Transform {
        position: Vec3::new(4.0, 0.0, -2.0),
        rotation: Quat::from_rotation_y(1.0),
    };
    let id = net.spawn_at(TURRET_PREFAB, None, true, transform).unwrap();
    assert_eq!(net.entity(id).unwrap().transform, transform);

    let sent = take_sent(&mut net);
    let Frame::TargetRpc(call) = &sent[0].1 else {
        panic!("expected spawn frame");
    };
    assert_eq!(call.args[2], Value::Vec3(transform.position));
    assert_eq!(call.args[3], Value::Quat(transform.rotation));
}

#[test]
fn test_destroy_by_non_owner_is_rejected() {
    let mut net = server();
    let a = connect(&mut net, 1);
    let b = connect(&mut net, 2);
    let id = net.spawn(TURRET_PREFAB, Some(b), false).unwrap();
    take_sent(&mut net);

    let err = net.destroy(id, Some(a), false).unwrap_err();
    assert!(err.is_authority_violation());
    assert!(net.world().contains(id));
    assert!(net.connections().unwrap().get(b).unwrap().owns(id));
    assert!(take_sent(&mut net).is_empty());
}

#[test]
fn test_destroy_by_owner_notifies_everyone() {
    let mut net = server();
    let a = connect(&mut net, 1);
    let b = connect(&mut net, 2);
    let id = net.spawn(TURRET_PREFAB, Some(a), false).unwrap();
    take_sent(&mut net);
    net.drain_events();

    net.destroy(id, Some(a), false).unwrap();

    assert!(!net.world().contains(id));
    assert!(!net.connections().unwrap().get(a).unwrap().owns(id));
    let targets: Vec<_> = take_sent(&mut net)
        .into_iter()
        .map(|(target, frame)| {
            let Frame::TargetRpc(call) = frame else {
                panic!("expected destroy frame");
            };
            assert_eq!(call.method, "DestroyObject");
            assert_eq!(call.entity_id, id);
            target
        })
        .collect();
    assert_eq!(
        targets,
        vec![SendTarget::Connection(a), SendTarget::Connection(b)]
    );
    assert_eq!(
        net.drain_events(),
        vec![NetworkEvent::EntityDestroyed { entity: id }]
    );
}

#[test]
fn test_server_authority_destroy_bypasses_ownership() {
    let mut net = server();
    let a = connect(&mut net, 1);
    let id = net.spawn(TURRET_PREFAB, Some(a), false).unwrap();

    net.destroy(id, None, true).unwrap();
    assert!(net.world().is_empty());
}

#[test]
fn test_destroy_unknown_entity() {
    let mut net = server();
    let id = replica::EntityId::generate();
    assert!(matches!(
        net.destroy(id, None, true),
        Err(ReplicationError::UnresolvedTarget { entity, .. }) if entity == id
    ));
}

#[test]
fn test_spawn_for_unknown_owner_fails() {
    let mut net = server();
    let err = net.spawn(TURRET_PREFAB, Some(ConnectionId(42)), false).unwrap_err();
    assert_eq!(err, ReplicationError::UnknownConnection(ConnectionId(42)));
    assert!(net.world().is_empty());
}

#[test]
fn test_failed_send_does_not_abort_spawn_or_destroy() {
    let mut net = server();
    let a = connect(&mut net, 1);
    let b = connect(&mut net, 2);
    let c = connect(&mut net, 3);
    take_sent(&mut net);
    net.transport_mut().unreachable.push(b);

    let id = net.spawn(TURRET_PREFAB, Some(a), false).unwrap();
    let targets: Vec<_> = take_sent(&mut net).into_iter().map(|(target, _)| target).collect();
    assert_eq!(targets, vec![SendTarget::Connection(a), SendTarget::Connection(c)]);
    assert!(net.world().contains(id));

    net.destroy(id, Some(a), false).unwrap();
    let targets: Vec<_> = take_sent(&mut net).into_iter().map(|(target, _)| target).collect();
    assert_eq!(targets, vec![SendTarget::Connection(a), SendTarget::Connection(c)]);
    assert!(!net.world().contains(id));
}
