//! Cross-engine invariant tests for state and membership history.

use std::sync::Arc;

use chrono::{DateTime, NaiveDate, TimeZone, Utc};
use club_core::common::MemberId;
use club_core::domains::audit::ActivityLog;
use club_core::domains::intervals::IntervalLedger;
use club_core::domains::member::{
    AttentionThresholds, MemberStateEngine, StateCatalog,
};
use club_core::domains::membership::{MembershipEngine, MembershipPlan, PlanCatalog};

fn state_engine() -> MemberStateEngine {
    MemberStateEngine::new(
        Arc::new(StateCatalog::with_defaults()),
        Arc::new(ActivityLog::new()),
        AttentionThresholds::default(),
    )
}

fn membership_engine() -> MembershipEngine {
    let plans = Arc::new(PlanCatalog::new());
    plans.add(MembershipPlan {
        name: "Basic".to_string(),
        code: "basic".to_string(),
        price_components: Vec::new(),
        active: true,
    });
    MembershipEngine::new(plans, Arc::new(ActivityLog::new()))
}

fn at(day: u32, hour: u32) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2026, 3, day, hour, 0, 0).unwrap()
}

fn d(day: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(2026, 3, day).unwrap()
}

#[test]
fn state_history_never_overlaps_after_arbitrary_transitions() {
    let engine = state_engine();
    let member = MemberId::new();

    let sequence = [
        ("pending", at(1, 8)),
        ("joining", at(2, 9)),
        ("active", at(5, 10)),
        ("active", at(6, 10)), // idempotent repeat
        ("inactive", at(9, 12)),
        ("active", at(12, 8)),
        ("left", at(20, 18)),
    ];
    for (state, now) in sequence {
        engine.set_state(member, state, None, None, None, now).unwrap();
    }

    let history = engine.history(member);
    // every instant across the range is covered by at most one interval
    for day in 1..25 {
        for hour in [0, 8, 9, 10, 12, 18] {
            let instant = at(day, hour);
            let covering = history.iter().filter(|i| i.covers(instant)).count();
            assert!(covering <= 1, "{covering} intervals cover {instant}");
        }
    }
    // exactly one open interval remains
    assert_eq!(history.iter().filter(|i| i.end.is_none()).count(), 1);
}

#[test]
fn set_state_twice_produces_one_interval_set_membership_twice_produces_two() {
    let states = state_engine();
    let memberships = membership_engine();
    let member = MemberId::new();

    states
        .set_state(member, "active", None, None, None, at(1, 8))
        .unwrap();
    states
        .set_state(member, "active", None, None, None, at(2, 8))
        .unwrap();
    assert_eq!(
        states
            .history(member)
            .iter()
            .filter(|i| i.value == "active")
            .count(),
        1,
        "state engine must skip the duplicate assignment"
    );

    memberships
        .set_membership(member, "basic", None, None, None, d(1))
        .unwrap();
    memberships
        .set_membership(member, "basic", None, None, None, d(10))
        .unwrap();
    assert_eq!(
        memberships.history(member).len(),
        2,
        "membership engine must record the renewal explicitly"
    );
}

#[test]
fn membership_history_never_overlaps() {
    let engine = membership_engine();
    let member = MemberId::new();

    engine
        .set_membership(member, "basic", None, None, None, d(1))
        .unwrap();
    engine
        .set_membership(member, "basic", None, None, None, d(10))
        .unwrap();
    engine
        .end_current_membership(member, Some(d(20)), None, d(15))
        .unwrap();
    engine
        .set_membership(member, "basic", Some(d(22)), None, None, d(22))
        .unwrap();

    let history = engine.history(member);
    for day in 1..28 {
        let date = d(day);
        let covering = history
            .iter()
            .filter(|i| {
                i.date_start <= date && i.date_end.map_or(true, |end| date < end)
            })
            .count();
        assert!(covering <= 1, "{covering} membership intervals cover {date}");
    }
}

#[test]
fn transition_is_atomic_under_concurrent_reads() {
    // a reader sampling the covered instant must never observe a gap while
    // a writer transitions values back and forth
    let ledger: Arc<IntervalLedger<u32, DateTime<Utc>>> = Arc::new(IntervalLedger::new());
    let member = MemberId::new();
    let t0 = at(1, 8);

    ledger.open_interval(member, 0, t0, None, None).unwrap();

    let writer = {
        let ledger = ledger.clone();
        std::thread::spawn(move || {
            for round in 1..500u32 {
                ledger
                    .transition(member, round, Some(t0), None, None, t0)
                    .unwrap();
            }
        })
    };
    let reader = {
        let ledger = ledger.clone();
        std::thread::spawn(move || {
            for _ in 0..2000 {
                assert!(
                    ledger.current_value(member, t0).is_some(),
                    "reader observed a gap between close and open"
                );
            }
        })
    };

    writer.join().unwrap();
    reader.join().unwrap();
}
