use std::cell::RefCell;
use std::rc::Rc;
use std::time::{Duration, Instant};

use clash::collision::{
    ActorId, CollisionArbiter, CollisionEndpoint, CollisionKey, CollisionOutcome, CollisionResult,
    EndpointConfig, ToggleBroadcast, Verdict, VisibilityView,
};
use clash::net::{ClientMessage, ServerMessage};
use glam::Vec3;

type Inbox = Rc<RefCell<Vec<(ActorId, CollisionResult)>>>;
type Handler = Box<dyn FnMut(ActorId, CollisionResult)>;

fn arbiter(actors: &[ActorId]) -> (CollisionArbiter<Handler>, Inbox) {
    let inbox: Inbox = Rc::default();
    let mut arbiter = CollisionArbiter::<Handler>::default();
    for &actor in actors {
        let inbox = inbox.clone();
        arbiter.register_handler(
            actor,
            Box::new(move |target, result| inbox.borrow_mut().push((target, result))),
        );
    }
    (arbiter, inbox)
}

#[test]
fn rapid_duplicate_reports_resolve_once() {
    let (mut arbiter, inbox) = arbiter(&[1, 2]);
    let now = Instant::now();

    // Both sides report before either velocity is known.
    assert_eq!(arbiter.report_collision(1, 2, now), CollisionOutcome::Deferred);
    assert_eq!(
        arbiter.report_collision(2, 1, now + Duration::from_millis(5)),
        CollisionOutcome::Suppressed
    );

    arbiter.report_velocity(1, Vec3::new(2.0, 0.0, 0.0));
    arbiter.report_velocity(2, Vec3::new(1.0, 0.0, 0.0));
    let outcomes = arbiter.poll_retries(now + Duration::from_millis(100));

    assert_eq!(outcomes.len(), 1);
    assert_eq!(inbox.borrow().len(), 2);
    assert!(arbiter.next_retry_at().is_none());
}

#[test]
fn faster_actor_wins_and_ties_go_to_second() {
    let (mut arbiter, inbox) = arbiter(&[1, 2]);
    let now = Instant::now();

    arbiter.report_velocity(1, Vec3::new(0.0, 0.0, 5.0));
    arbiter.report_velocity(2, Vec3::new(3.0, 0.0, 0.0));
    assert_eq!(
        arbiter.report_collision(1, 2, now),
        CollisionOutcome::Resolved(CollisionResult { winner: 1, loser: 2 })
    );

    arbiter.report_velocity(1, Vec3::new(4.0, 0.0, 0.0));
    arbiter.report_velocity(2, Vec3::new(0.0, 0.0, -4.0));
    assert_eq!(
        arbiter.report_collision(1, 2, now),
        CollisionOutcome::Resolved(CollisionResult { winner: 2, loser: 1 })
    );

    let delivered: Vec<ActorId> = inbox.borrow().iter().map(|(target, _)| *target).collect();
    assert_eq!(delivered, vec![1, 2, 2, 1]);
}

#[test]
fn missing_velocity_is_abandoned_and_key_reusable() {
    let (mut arbiter, inbox) = arbiter(&[1, 2]);
    let start = Instant::now();
    arbiter.report_velocity(1, Vec3::X);

    assert_eq!(arbiter.report_collision(1, 2, start), CollisionOutcome::Deferred);
    let outcomes = arbiter.poll_retries(start + Duration::from_millis(100));

    assert_eq!(
        outcomes,
        vec![CollisionOutcome::Abandoned(CollisionKey::new(1, 2))]
    );
    assert!(inbox.borrow().is_empty());
    assert!(!arbiter.is_active(CollisionKey::new(1, 2)));
    assert_eq!(arbiter.stats().abandoned, 1);

    // No second retry is ever scheduled.
    assert!(arbiter.poll_retries(start + Duration::from_secs(10)).is_empty());

    arbiter.report_velocity(2, Vec3::ZERO);
    let later = start + Duration::from_secs(1);
    assert!(matches!(
        arbiter.report_collision(2, 1, later),
        CollisionOutcome::Resolved(_)
    ));
}

#[test]
fn full_exchange_between_two_endpoints() {
    let start = Instant::now();
    let config = EndpointConfig::default();
    let mut fast = CollisionEndpoint::new(1, true, config.clone());
    let mut slow = CollisionEndpoint::new(2, true, config);
    fast.on_attach();
    slow.on_attach();

    let (mut arbiter, inbox) = arbiter(&[1, 2]);
    let mut broadcast = ToggleBroadcast::new();

    // The fast side's collision report lands before the slow side's velocity.
    let mut outgoing = fast.on_contact(2, Vec3::new(6.0, 0.0, 0.0));
    outgoing.extend(slow.on_contact(1, Vec3::new(1.0, 0.0, 0.0)));
    let mut outcomes = Vec::new();
    for message in outgoing {
        match message {
            ClientMessage::VelocityReport { actor, velocity } => {
                arbiter.report_velocity(actor, Vec3::from_array(velocity))
            }
            ClientMessage::CollisionReport { reporter, other } => {
                outcomes.push(arbiter.report_collision(reporter, other, start));
            }
            other => panic!("unexpected message {:?}", other),
        }
    }
    assert_eq!(
        outcomes,
        vec![CollisionOutcome::Deferred, CollisionOutcome::Suppressed]
    );
    assert!(inbox.borrow().is_empty());

    let retried = arbiter.poll_retries(start + arbiter.config().retry_delay);
    assert_eq!(
        retried,
        vec![CollisionOutcome::Resolved(CollisionResult { winner: 1, loser: 2 })]
    );

    let verdicts = inbox.borrow().clone();
    assert_eq!(verdicts.len(), 2);
    for (target, result) in verdicts {
        let endpoint = if target == 1 { &mut fast } else { &mut slow };
        match endpoint.apply_verdict(result, start) {
            Verdict::Won => assert_eq!(target, 1),
            Verdict::Lost(ClientMessage::ToggleRequest { actor, disabled }) => {
                assert_eq!(actor, 2);
                assert!(broadcast.publish(actor, disabled));
            }
            other => panic!("unexpected verdict {:?}", other),
        }
    }

    assert!(fast.is_visible());
    assert!(!slow.is_visible());
    assert_eq!(broadcast.get(2), Some(true));

    let request = slow.poll(start + Duration::from_secs(3));
    if let Some(ClientMessage::ToggleRequest { actor, disabled }) = request {
        assert!(broadcast.publish(actor, disabled));
    } else {
        panic!("expected a re-enable request, got {:?}", request);
    }
    assert!(slow.is_visible());
}

#[test]
fn late_joining_observer_sees_disabled_first() {
    let mut broadcast = ToggleBroadcast::new();
    broadcast.publish(2, true);

    let mut late = VisibilityView::new();
    for (actor, disabled) in broadcast.snapshot() {
        let message = ServerMessage::ToggleBroadcast { actor, disabled };
        let decoded = ServerMessage::decode(&message.encode().unwrap()).unwrap();
        if let ServerMessage::ToggleBroadcast { actor, disabled } = decoded {
            assert!(late.apply(actor, disabled));
        }
    }
    assert!(!late.is_visible(2));

    // The re-enable that follows flips it back exactly once.
    assert!(broadcast.publish(2, false));
    assert!(late.apply(2, false));
    assert!(!late.apply(2, false));
    assert!(late.is_visible(2));
}
