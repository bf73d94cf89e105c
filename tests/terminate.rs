use rdb_harness_test_utils::init_tracing;

use std::time::Duration;

use rdb_harness::errors::HarnessError;
use rdb_harness::terminate::{
    GroupSignal, GroupTerminator, Phase, ProcessGroupId, SignalResult, TerminationPolicy,
    POLL_INTERVAL,
};
use rdb_harness_test_utils::fake_clock::FakeClock;
use rdb_harness_test_utils::fake_group::{Behaviour, FakeGroup};

fn group() -> ProcessGroupId {
    ProcessGroupId::new(4242).unwrap()
}

fn policy(grace_ms: u64, kill_ms: u64) -> TerminationPolicy {
    TerminationPolicy::new(Duration::from_millis(grace_ms), Duration::from_millis(kill_ms))
}

fn setup(behaviour: Behaviour) -> (FakeClock, FakeGroup) {
    init_tracing();
    let clock = FakeClock::new();
    let group = FakeGroup::new(behaviour, clock.clone());
    (clock, group)
}

#[test]
fn group_exiting_on_sigterm_returns_without_waiting_out_the_grace_window() {
    let (clock, fake) = setup(Behaviour::ExitsOnTerm);
    let terminator = GroupTerminator::new(&clock, &fake, &fake);

    let outcome = terminator.terminate(group(), policy(5_000, 20_000)).unwrap();

    assert_eq!(outcome.confirmed_in, Phase::GracePoll);
    assert!(outcome.elapsed < POLL_INTERVAL);
    assert_eq!(fake.count(GroupSignal::Terminate), 1);
    assert_eq!(fake.count(GroupSignal::Kill), 0);
    assert_eq!(fake.times_listed(), 0);
}

#[test]
fn slow_shutdown_within_grace_is_polled_not_killed() {
    let (clock, fake) = setup(Behaviour::ExitsAfter(Duration::from_millis(750)));
    let terminator = GroupTerminator::new(&clock, &fake, &fake);

    let outcome = terminator.terminate(group(), policy(5_000, 20_000)).unwrap();

    assert_eq!(outcome.confirmed_in, Phase::GracePoll);
    assert!(outcome.elapsed >= Duration::from_millis(750));
    assert!(outcome.elapsed < Duration::from_millis(750) + 2 * POLL_INTERVAL);
    assert_eq!(fake.count(GroupSignal::Kill), 0);
}

#[test]
fn group_ignoring_sigterm_is_killed_after_the_grace_deadline() {
    let (clock, fake) = setup(Behaviour::IgnoresTerm);
    let terminator = GroupTerminator::new(&clock, &fake, &fake);
    let policy = policy(1_000, 3_000);

    let outcome = terminator.terminate(group(), policy).unwrap();

    let first_kill = fake.first_sent_at(GroupSignal::Kill).unwrap();
    assert!(first_kill >= policy.grace_timeout);
    assert!(outcome.elapsed >= policy.grace_timeout);
    assert!(outcome.elapsed < policy.grace_timeout + policy.kill_timeout + POLL_INTERVAL);
    assert!(!fake.is_alive());
}

#[test]
fn zero_grace_skips_sigterm_entirely() {
    let (clock, fake) = setup(Behaviour::IgnoresTerm);
    let terminator = GroupTerminator::new(&clock, &fake, &fake);

    terminator.terminate(group(), policy(0, 1_000)).unwrap();

    assert_eq!(fake.count(GroupSignal::Terminate), 0);
    assert_eq!(fake.first_sent_at(GroupSignal::Kill), Some(Duration::ZERO));
}

#[test]
fn missing_group_succeeds_immediately_regardless_of_timeouts() {
    let (clock, fake) = setup(Behaviour::Missing);
    let terminator = GroupTerminator::new(&clock, &fake, &fake);

    for policy in [policy(0, 0), policy(5_000, 20_000), policy(0, 60_000)] {
        let outcome = terminator.terminate(group(), policy).unwrap();
        assert_eq!(outcome.elapsed, Duration::ZERO);
        assert_eq!(outcome.last_result, SignalResult::NoSuchGroup);
    }
    assert_eq!(clock.elapsed(), Duration::ZERO);
    assert_eq!(fake.count(GroupSignal::Kill), 0);
}

#[test]
fn terminating_twice_is_idempotent() {
    let (clock, fake) = setup(Behaviour::IgnoresTerm);
    let terminator = GroupTerminator::new(&clock, &fake, &fake);

    terminator.terminate(group(), policy(500, 2_000)).unwrap();
    let before = clock.elapsed();
    let again = terminator.terminate(group(), policy(500, 2_000)).unwrap();

    assert_eq!(again.elapsed, Duration::ZERO);
    assert_eq!(clock.elapsed(), before);
}

#[test]
fn permission_denied_counts_as_not_ours() {
    let (clock, fake) = setup(Behaviour::Foreign);
    let terminator = GroupTerminator::new(&clock, &fake, &fake);

    let outcome = terminator.terminate(group(), policy(5_000, 20_000)).unwrap();

    assert_eq!(outcome.last_result, SignalResult::NotPermitted);
    assert_eq!(fake.signals(), vec![GroupSignal::Terminate]);
}

#[test]
fn unexpected_errno_is_propagated() {
    let (clock, fake) = setup(Behaviour::Broken);
    let terminator = GroupTerminator::new(&clock, &fake, &fake);

    let err = terminator.terminate(group(), policy(1_000, 1_000)).unwrap_err();
    assert!(matches!(err, HarnessError::Signal { group: 4242, .. }));
}

#[test]
fn unkillable_group_fails_with_listing_after_kill_deadline() {
    let (clock, fake) = setup(Behaviour::Unkillable);
    let fake = fake.with_listing(&["4242 4242 D tester rethinkdb serve"]);
    let terminator = GroupTerminator::new(&clock, &fake, &fake);
    let policy = policy(1_000, 2_000);

    let err = terminator.terminate(group(), policy).unwrap_err();

    match err {
        HarnessError::TerminationTimeout {
            group,
            elapsed,
            listing,
        } => {
            assert_eq!(group, 4242);
            // Counted from the call, not from the end of the grace window.
            assert!(elapsed >= policy.kill_timeout);
            assert!(elapsed < policy.grace_timeout + policy.kill_timeout);
            assert!(elapsed <= policy.kill_timeout + POLL_INTERVAL);
            assert!(listing.contains("rethinkdb serve"));
        }
        other => panic!("expected TerminationTimeout, got {other:?}"),
    }
    assert_eq!(fake.times_listed(), 1);
    // t = 1.0, 1.1, ..., 1.9
    assert_eq!(fake.count(GroupSignal::Kill), 10);
}

#[test]
fn kill_deadline_inside_the_grace_window_still_sends_one_sigkill() {
    let (clock, fake) = setup(Behaviour::Unkillable);
    let fake = fake.with_listing(&["4242 4242 S tester rethinkdb serve"]);
    let terminator = GroupTerminator::new(&clock, &fake, &fake);
    let policy = policy(2_000, 500);

    let err = terminator.terminate(group(), policy).unwrap_err();

    match err {
        HarnessError::TerminationTimeout { elapsed, .. } => {
            assert!(elapsed >= policy.grace_timeout);
            assert!(elapsed <= policy.grace_timeout + POLL_INTERVAL);
        }
        other => panic!("expected TerminationTimeout, got {other:?}"),
    }
    assert_eq!(fake.count(GroupSignal::Kill), 1);
    assert_eq!(
        fake.first_sent_at(GroupSignal::Kill),
        Some(policy.grace_timeout)
    );
}

#[test]
fn group_dying_on_sigkill_is_done_before_the_kill_deadline() {
    let (clock, fake) = setup(Behaviour::IgnoresTerm);
    let terminator = GroupTerminator::new(&clock, &fake, &fake);
    let policy = policy(1_000, 1_500);

    let outcome = terminator.terminate(group(), policy).unwrap();

    assert!(outcome.elapsed < policy.kill_timeout);
    assert_eq!(fake.count(GroupSignal::Kill), 1);
}

#[test]
fn empty_ps_listing_overrides_a_lingering_group() {
    let (clock, fake) = setup(Behaviour::Unkillable);
    let fake = fake.with_empty_listing();
    let terminator = GroupTerminator::new(&clock, &fake, &fake);

    let outcome = terminator.terminate(group(), policy(100, 300)).unwrap();

    assert_eq!(outcome.confirmed_in, Phase::Verify);
    assert_eq!(fake.times_listed(), 1);
}

#[test]
fn custom_poll_interval_is_respected() {
    let (clock, fake) = setup(Behaviour::Unkillable);
    let terminator = GroupTerminator::new(&clock, &fake, &fake)
        .with_poll_interval(Duration::from_millis(500));

    let _ = terminator.terminate(group(), policy(0, 2_000));

    // One kill per poll until the deadline: t = 0, 0.5, 1.0, 1.5.
    assert_eq!(fake.count(GroupSignal::Kill), 4);
}
