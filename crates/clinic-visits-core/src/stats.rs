//! Same-day statistics derived from the visit list.
//!
//! Always a full recompute; clinic lists are small.

use chrono::{DateTime, Duration, Local, NaiveTime, TimeZone, Utc};
use serde::Serialize;

use crate::models::{Department, Visit, VisitStatus};

/// Visit count for one department.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ServiceLoad {
    pub service: Department,
    pub count: usize,
}

/// Today's cohort and its counts.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct DailyStats {
    pub total_today: usize,
    pub waiting_today: usize,
    pub seen_today: usize,
    /// In order of each department's first visit today
    pub by_service: Vec<ServiceLoad>,
    /// Today's visits, newest first
    pub today_visits: Vec<Visit>,
}

/// First instant of `now`'s calendar day in its own time zone.
///
/// If local midnight does not exist (DST gap), the first valid hour is used.
pub fn start_of_day<Tz: TimeZone>(now: &DateTime<Tz>) -> DateTime<Utc> {
    let tz = now.timezone();
    let midnight = now.date_naive().and_time(NaiveTime::MIN);

    (0..24)
        .find_map(|hour| {
            tz.from_local_datetime(&(midnight + Duration::hours(hour)))
                .earliest()
        })
        .map(|start| start.with_timezone(&Utc))
        .unwrap_or_else(|| now.with_timezone(&Utc))
}

fn percent(count: usize, total: usize) -> f64 {
    if total == 0 {
        return 0.0;
    }
    count as f64 / total as f64 * 100.0
}

impl DailyStats {
    /// Statistics for today on the local clock.
    pub fn compute(visits: &[Visit]) -> Self {
        Self::compute_at(visits, Local::now())
    }

    /// Statistics for the day containing `now`, in `now`'s time zone.
    pub fn compute_at<Tz: TimeZone>(visits: &[Visit], now: DateTime<Tz>) -> Self {
        let today_start = start_of_day(&now);

        let today_visits: Vec<Visit> = visits
            .iter()
            .filter(|v| v.created_at >= today_start)
            .cloned()
            .collect();

        let mut by_service: Vec<ServiceLoad> = Vec::new();
        for visit in &today_visits {
            match by_service.iter_mut().find(|load| load.service == visit.service) {
                Some(load) => load.count += 1,
                None => by_service.push(ServiceLoad {
                    service: visit.service,
                    count: 1,
                }),
            }
        }

        let count_status = |status: VisitStatus| {
            today_visits.iter().filter(|v| v.status == status).count()
        };

        Self {
            total_today: today_visits.len(),
            waiting_today: count_status(VisitStatus::Waiting),
            seen_today: count_status(VisitStatus::Seen),
            by_service,
            today_visits,
        }
    }

    /// `count` as a percentage of today's total; 0 when there are no visits.
    pub fn share(&self, count: usize) -> f64 {
        percent(count, self.total_today)
    }

    /// Today's visits for a department.
    pub fn count_for(&self, service: Department) -> usize {
        self.by_service
            .iter()
            .find(|load| load.service == service)
            .map_or(0, |load| load.count)
    }

    /// A department's share of today's load, for progress bars.
    pub fn service_percent(&self, service: Department) -> f64 {
        self.share(self.count_for(service))
    }

    pub fn seen_percent(&self) -> f64 {
        self.share(self.seen_today)
    }
}
