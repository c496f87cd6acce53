//! Property tests for feed replay and daily statistics.

use std::collections::HashSet;

use chrono::{Duration, TimeZone, Utc};
use clinic_visits_core::controller::VisitList;
use clinic_visits_core::feed::ChangeEvent;
use clinic_visits_core::models::{Department, Visit, VisitRecord, VisitStatus};
use clinic_visits_core::stats::DailyStats;
use proptest::prelude::*;

#[derive(Debug, Clone)]
enum Op {
    Insert(u8, String),
    Update(u8, String),
    Delete(u8),
}

fn op_strategy() -> impl Strategy<Value = Op> {
    let id = 0u8..4;
    prop_oneof![
        (id.clone(), "[a-z]{1,6}").prop_map(|(id, name)| Op::Insert(id, name)),
        (id.clone(), "[a-z]{1,6}").prop_map(|(id, name)| Op::Update(id, name)),
        id.prop_map(Op::Delete),
    ]
}

fn record(id: u8, name: &str) -> VisitRecord {
    VisitRecord {
        id: format!("visit-{}", id),
        name: name.to_string(),
        age: 40,
        gender: "Other".into(),
        service: "Laboratory".into(),
        status: "waiting".into(),
        created_at: "2026-10-19T08:15:00.000000Z".into(),
        created_by: "uid-1".into(),
        seen_at: None,
    }
}

fn to_event(op: &Op) -> ChangeEvent {
    match op {
        Op::Insert(id, name) => ChangeEvent::Insert(record(*id, name)),
        Op::Update(id, name) => ChangeEvent::Update(record(*id, name)),
        Op::Delete(id) => ChangeEvent::Delete {
            id: format!("visit-{}", id),
        },
    }
}

/// Reference model: (id, name) pairs, newest first.
fn replay_model(ops: &[Op]) -> Vec<(String, String)> {
    let mut model: Vec<(String, String)> = Vec::new();
    for op in ops {
        match op {
            Op::Insert(id, name) => {
                let id = format!("visit-{}", id);
                if !model.iter().any(|(m, _)| *m == id) {
                    model.insert(0, (id, name.clone()));
                }
            }
            Op::Update(id, name) => {
                let id = format!("visit-{}", id);
                if let Some(entry) = model.iter_mut().find(|(m, _)| *m == id) {
                    entry.1 = name.clone();
                }
            }
            Op::Delete(id) => {
                let id = format!("visit-{}", id);
                model.retain(|(m, _)| *m != id);
            }
        }
    }
    model
}

proptest! {
    #[test]
    fn feed_replay_matches_model(ops in prop::collection::vec(op_strategy(), 0..40)) {
        let mut list = VisitList::default();
        for op in &ops {
            list.apply(to_event(op)).unwrap();
        }

        let actual: Vec<(String, String)> = list
            .as_slice()
            .iter()
            .map(|v| (v.id.clone(), v.name.clone()))
            .collect();
        prop_assert_eq!(actual, replay_model(&ops));

        let unique: HashSet<&str> = list.as_slice().iter().map(|v| v.id.as_str()).collect();
        prop_assert_eq!(unique.len(), list.len());
    }

    #[test]
    fn daily_stats_counts_are_consistent(
        visits in prop::collection::vec((0usize..7, any::<bool>(), 0i64..72), 0..30)
    ) {
        let now = Utc.with_ymd_and_hms(2026, 10, 19, 23, 0, 0).unwrap();

        let visits: Vec<Visit> = visits
            .iter()
            .enumerate()
            .map(|(i, (service, seen, hours_ago))| {
                let created_at = now - Duration::hours(*hours_ago);
                Visit {
                    id: format!("v{}", i),
                    name: format!("Patient {}", i),
                    age: 20,
                    gender: "Female".into(),
                    service: Department::ALL[*service],
                    status: if *seen { VisitStatus::Seen } else { VisitStatus::Waiting },
                    created_at,
                    seen_at: seen.then_some(created_at),
                    created_by: "anon".into(),
                }
            })
            .collect();

        let stats = DailyStats::compute_at(&visits, now);
        let expected_today = visits.iter().filter(|v| v.created_at.date_naive() == now.date_naive()).count();

        prop_assert_eq!(stats.total_today, expected_today);
        prop_assert_eq!(stats.waiting_today + stats.seen_today, stats.total_today);
        prop_assert_eq!(stats.today_visits.len(), stats.total_today);

        let by_service_total: usize = stats.by_service.iter().map(|l| l.count).sum();
        prop_assert_eq!(by_service_total, stats.total_today);

        if stats.total_today > 0 {
            let percent_total: f64 = stats.by_service.iter().map(|l| stats.share(l.count)).sum();
            prop_assert!((percent_total - 100.0).abs() < 1e-9);
        } else {
            prop_assert_eq!(stats.seen_percent(), 0.0);
        }
    }
}
