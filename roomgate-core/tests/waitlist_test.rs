//! Waitlist behaviour through the public API.
//!
//! Covers seat accounting, FIFO promotion and the dense-position invariant
//! under arbitrary sequences of admissions and departures.

mod helpers;

use helpers::{guest, host, join, located_room, memory_gate};
use proptest::prelude::*;
use roomgate_core::membership::MembershipStatus;
use roomgate_core::{Roomgate, RoomId, RoomgateError, UserId};

fn positions(gate: &Roomgate, room: RoomId) -> Vec<u32> {
    gate.list_waitlist(&host(), room)
        .unwrap()
        .entries
        .iter()
        .map(|m| m.queue_position.unwrap())
        .collect()
}

fn waitlisted_users(gate: &Roomgate, room: RoomId) -> Vec<UserId> {
    gate.list_waitlist(&host(), room)
        .unwrap()
        .entries
        .iter()
        .map(|m| m.user_id)
        .collect()
}

#[test]
fn single_seat_room_queues_and_promotes_in_order() {
    let t = memory_gate();
    let gate = &t.gate;
    let room = located_room(gate, "Chef's table", Some(1));

    let a = join(gate, room, 10).unwrap();
    let b = join(gate, room, 11).unwrap();
    let c = join(gate, room, 12).unwrap();

    assert_eq!(a.status, MembershipStatus::Active);
    assert_eq!(b.status, MembershipStatus::Waitlisted);
    assert_eq!(b.queue_position, Some(1));
    assert_eq!(c.queue_position, Some(2));

    // A free seat does not promote anyone by itself.
    gate.leave(&guest(10), room).unwrap();
    assert_eq!(positions(gate, room), vec![1, 2]);
    assert_eq!(gate.capacity_info(room).unwrap().active_count, 0);

    let promoted = gate.promote(&host(), room, b.id).unwrap();
    assert_eq!(promoted.status, MembershipStatus::Active);
    assert_eq!(promoted.queue_position, None);

    assert_eq!(waitlisted_users(gate, room), vec![UserId::new(12)]);
    assert_eq!(positions(gate, room), vec![1]);
    let info = gate.capacity_info(room).unwrap();
    assert_eq!(info.active_count, 1);
    assert!(!info.has_free_slot());
}

#[test]
fn removing_middle_entry_closes_gap() {
    let t = memory_gate();
    let gate = &t.gate;
    let room = located_room(gate, "Queue", Some(1));
    join(gate, room, 10).unwrap();
    join(gate, room, 11).unwrap();
    let middle = join(gate, room, 12).unwrap();
    join(gate, room, 13).unwrap();
    assert_eq!(positions(gate, room), vec![1, 2, 3]);

    let removed = gate.remove_from_waitlist(&host(), room, middle.id).unwrap();
    assert_eq!(removed.status, MembershipStatus::Removed);
    assert_eq!(removed.queue_position, None);

    assert_eq!(positions(gate, room), vec![1, 2]);
    assert_eq!(
        waitlisted_users(gate, room),
        vec![UserId::new(11), UserId::new(13)]
    );
}

#[test]
fn only_head_of_queue_can_be_promoted() {
    let t = memory_gate();
    let gate = &t.gate;
    let room = located_room(gate, "Strict", Some(1));
    let seated = join(gate, room, 10).unwrap();
    join(gate, room, 11).unwrap();
    let second = join(gate, room, 12).unwrap();

    gate.kick(&host(), room, seated.id).unwrap();
    assert!(matches!(
        gate.promote(&host(), room, second.id),
        Err(RoomgateError::InvalidState(_))
    ));
}

#[test]
fn promotion_into_full_room_is_refused() {
    let t = memory_gate();
    let gate = &t.gate;
    let room = located_room(gate, "Full", Some(1));
    join(gate, room, 10).unwrap();
    let head = join(gate, room, 11).unwrap();

    let err = gate.promote(&host(), room, head.id).unwrap_err();
    assert!(matches!(err, RoomgateError::InvalidState(ref m) if m == "Room is full"));
}

#[test]
fn waitlisted_member_sees_own_position() {
    let t = memory_gate();
    let gate = &t.gate;
    let room = located_room(gate, "Popular", Some(1));
    join(gate, room, 10).unwrap();
    join(gate, room, 11).unwrap();
    join(gate, room, 12).unwrap();

    let standing = gate.waitlist_position(&guest(12), room).unwrap();
    assert_eq!(standing.position, 2);
    assert_eq!(standing.waitlist_length, 2);

    gate.leave(&guest(11), room).unwrap();
    let standing = gate.waitlist_position(&guest(12), room).unwrap();
    assert_eq!(standing.position, 1);
    assert_eq!(standing.waitlist_length, 1);

    assert!(matches!(
        gate.waitlist_position(&guest(10), room),
        Err(RoomgateError::NotFound(_))
    ));
}

#[test]
fn waitlist_is_host_only() {
    let t = memory_gate();
    let gate = &t.gate;
    let room = located_room(gate, "Private queue", Some(1));
    join(gate, room, 10).unwrap();

    assert!(matches!(
        gate.list_waitlist(&guest(10), room),
        Err(RoomgateError::Forbidden(_))
    ));
}

#[test]
fn raising_capacity_leaves_queue_for_host_to_promote() {
    let t = memory_gate();
    let gate = &t.gate;
    let room = located_room(gate, "Growing", Some(1));
    join(gate, room, 10).unwrap();
    let head = join(gate, room, 11).unwrap();

    let update = roomgate_core::room::RoomUpdate {
        capacity: Some(Some(2)),
        ..Default::default()
    };
    gate.update_room(&host(), room, &update).unwrap();
    assert_eq!(positions(gate, room), vec![1]);

    gate.promote(&host(), room, head.id).unwrap();
    assert_eq!(gate.capacity_info(room).unwrap().active_count, 2);
}

// ============================================================================
// Dense positions under arbitrary operation sequences
// ============================================================================

#[derive(Debug, Clone)]
enum Op {
    Admit(i64),
    Leave(i64),
    Remove(i64),
    PromoteHead,
}

fn op_strategy() -> impl Strategy<Value = Op> {
    let user = 10_i64..18;
    prop_oneof![
        3 => user.clone().prop_map(Op::Admit),
        2 => user.clone().prop_map(Op::Leave),
        1 => user.prop_map(Op::Remove),
        1 => Just(Op::PromoteHead),
    ]
}

fn apply(gate: &Roomgate, room: RoomId, op: &Op) {
    // Individual operations may legitimately fail (already a member, not on
    // the waitlist, room full); only the invariants matter here.
    match *op {
        Op::Admit(user) => {
            let _ = join(gate, room, user);
        }
        Op::Leave(user) => {
            let _ = gate.leave(&guest(user), room);
        }
        Op::Remove(user) => {
            if let Ok(Some(m)) = gate.members().membership_of(room, UserId::new(user)) {
                let _ = gate.remove_from_waitlist(&host(), room, m.id);
            }
        }
        Op::PromoteHead => {
            let view = gate.list_waitlist(&host(), room).unwrap();
            if let Some(head) = view.entries.first() {
                let _ = gate.promote(&host(), room, head.id);
            }
        }
    }
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    #[test]
    fn positions_stay_dense_and_capacity_holds(
        capacity in 1_u32..4,
        ops in prop::collection::vec(op_strategy(), 1..40),
    ) {
        let t = memory_gate();
        let gate = &t.gate;
        let room = located_room(gate, "Fuzzed", Some(capacity));

        for op in &ops {
            apply(gate, room, op);

            let view = gate.list_waitlist(&host(), room).unwrap();
            let expected: Vec<u32> = (1..=u32::try_from(view.entries.len()).unwrap()).collect();
            let actual: Vec<u32> = view.entries.iter().map(|m| m.queue_position.unwrap()).collect();
            prop_assert_eq!(actual, expected);
            prop_assert!(view.capacity.active_count <= capacity);
        }
    }
}
