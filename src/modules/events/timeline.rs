//! Classification of events relative to "now": timeline status, urgency and
//! the calendar windows used by `GET /events/period/{period}`.

use chrono::{DateTime, Datelike, Duration, NaiveDate, NaiveTime, TimeZone, Utc};
use std::collections::BTreeMap;

use crate::modules::events::model::{
    Event, EventWithTimeline, PeriodKind, PeriodStats, PeriodWindow, TimelineStatus, Urgency,
    UrgencyItem, UrgencySummary,
};

const SECONDS_PER_DAY: f64 = 86_400.0;
const UPCOMING_DAYS: i64 = 30;

/// Whole days until `starts_at`, rounded up; negative once the start has passed.
pub fn days_until(starts_at: DateTime<Utc>, now: DateTime<Utc>) -> i64 {
    let seconds = (starts_at - now).num_milliseconds() as f64 / 1000.0;
    (seconds / SECONDS_PER_DAY).ceil() as i64
}

pub fn urgency(days_until: i64) -> Urgency {
    match days_until {
        d if d < 0 => Urgency::Overdue,
        0..=3 => Urgency::Urgent,
        4..=7 => Urgency::Soon,
        _ => Urgency::Future,
    }
}

pub fn timeline_status(
    starts_at: DateTime<Utc>,
    ends_at: DateTime<Utc>,
    now: DateTime<Utc>,
) -> TimelineStatus {
    if now < starts_at {
        TimelineStatus::Scheduled
    } else if now > ends_at {
        TimelineStatus::Completed
    } else {
        TimelineStatus::InProgress
    }
}

fn start_of(day: NaiveDate) -> DateTime<Utc> {
    Utc.from_utc_datetime(&day.and_time(NaiveTime::MIN))
}

fn end_of(day: NaiveDate) -> DateTime<Utc> {
    start_of(day) + Duration::days(1) - Duration::milliseconds(1)
}

/// Window covered by a period, in UTC. Weeks run Sunday to Saturday.
pub fn window(kind: PeriodKind, now: DateTime<Utc>) -> PeriodWindow {
    let today = now.date_naive();
    let (start, end) = match kind {
        PeriodKind::Day => (start_of(today), end_of(today)),
        PeriodKind::Week => {
            let sunday = today - Duration::days(i64::from(today.weekday().num_days_from_sunday()));
            (start_of(sunday), end_of(sunday + Duration::days(6)))
        }
        PeriodKind::Month => {
            let first = today.with_day(1).unwrap_or(today);
            let next_month = if first.month() == 12 {
                NaiveDate::from_ymd_opt(first.year() + 1, 1, 1)
            } else {
                NaiveDate::from_ymd_opt(first.year(), first.month() + 1, 1)
            };
            let last = next_month
                .and_then(|d| d.pred_opt())
                .unwrap_or(today);
            (start_of(first), end_of(last))
        }
        PeriodKind::Upcoming => (now, now + Duration::days(UPCOMING_DAYS)),
    };

    PeriodWindow { start, end }
}

pub fn annotate(event: Event, now: DateTime<Utc>) -> EventWithTimeline {
    let days = days_until(event.starts_at, now);
    let status = timeline_status(event.starts_at, event.ends_at, now);
    EventWithTimeline {
        urgency: urgency(days),
        days_until: days,
        timeline_status: status,
        in_progress: status == TimelineStatus::InProgress,
        event,
    }
}

/// Result of classifying the events of a window.
#[derive(Debug)]
pub struct PeriodBreakdown {
    pub stats: PeriodStats,
    pub urgency_summary: UrgencySummary,
    pub data: BTreeMap<String, Vec<EventWithTimeline>>,
}

/// Statistics and the urgency summary cover every event in the window; the
/// grouped data holds only events matching `status`.
pub fn breakdown(
    events: Vec<Event>,
    status: Option<TimelineStatus>,
    now: DateTime<Utc>,
) -> PeriodBreakdown {
    let mut stats = PeriodStats {
        total: events.len(),
        ..PeriodStats::default()
    };
    let mut urgency_summary = UrgencySummary::default();
    let mut data: BTreeMap<String, Vec<EventWithTimeline>> = BTreeMap::new();

    for event in events {
        let annotated = annotate(event, now);
        *stats.by_status.entry(annotated.timeline_status).or_default() += 1;

        let item = || UrgencyItem {
            id: annotated.event.id,
            title: annotated.event.title.clone(),
            starts_at: annotated.event.starts_at,
            kind: annotated.event.kind,
            days_until: annotated.days_until,
            timeline_status: annotated.timeline_status,
        };
        match annotated.urgency {
            Urgency::Urgent => urgency_summary.urgent.push(item()),
            Urgency::Soon => urgency_summary.soon.push(item()),
            Urgency::Overdue | Urgency::Future => {}
        }

        if status.is_none_or(|s| s == annotated.timeline_status) {
            stats.filtered += 1;
            let day = annotated.event.starts_at.format("%Y-%m-%d").to_string();
            data.entry(day).or_default().push(annotated);
        }
    }

    PeriodBreakdown {
        stats,
        urgency_summary,
        data,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::modules::events::model::{EventKind, EventStatus};
    use escola_models::{EventId, UserId};

    fn at(s: &str) -> DateTime<Utc> {
        DateTime::parse_from_rfc3339(s).unwrap().with_timezone(&Utc)
    }

    fn event(title: &str, starts_at: DateTime<Utc>, hours: i64) -> Event {
        Event {
            id: EventId::new(),
            title: title.to_string(),
            description: "Conteúdo do bimestre".to_string(),
            kind: EventKind::Exam,
            starts_at,
            ends_at: starts_at + Duration::hours(hours),
            class_ids: vec![],
            created_by: UserId::new(),
            creator_name: "Carlos".to_string(),
            subject: Some("Matemática".to_string()),
            location: None,
            status: EventStatus::Scheduled,
            created_at: starts_at,
            updated_at: starts_at,
        }
    }

    #[test]
    fn test_days_until_rounds_up() {
        let now = at("2024-05-10T12:00:00Z");
        assert_eq!(days_until(at("2024-05-10T13:00:00Z"), now), 1);
        assert_eq!(days_until(at("2024-05-10T12:00:00Z"), now), 0);
        assert_eq!(days_until(at("2024-05-13T12:00:00Z"), now), 3);
        assert_eq!(days_until(at("2024-05-09T00:00:00Z"), now), -1);
        assert_eq!(days_until(at("2024-05-10T06:00:00Z"), now), 0);
    }

    #[test]
    fn test_urgency_thresholds() {
        assert_eq!(urgency(-1), Urgency::Overdue);
        assert_eq!(urgency(0), Urgency::Urgent);
        assert_eq!(urgency(3), Urgency::Urgent);
        assert_eq!(urgency(4), Urgency::Soon);
        assert_eq!(urgency(7), Urgency::Soon);
        assert_eq!(urgency(8), Urgency::Future);
    }

    #[test]
    fn test_timeline_status() {
        let start = at("2024-05-10T08:00:00Z");
        let end = at("2024-05-10T10:00:00Z");
        assert_eq!(
            timeline_status(start, end, at("2024-05-10T07:59:00Z")),
            TimelineStatus::Scheduled
        );
        assert_eq!(timeline_status(start, end, start), TimelineStatus::InProgress);
        assert_eq!(timeline_status(start, end, end), TimelineStatus::InProgress);
        assert_eq!(
            timeline_status(start, end, at("2024-05-10T10:00:01Z")),
            TimelineStatus::Completed
        );
    }

    #[test]
    fn test_week_runs_sunday_to_saturday() {
        // 2024-05-15 is a Wednesday
        let w = window(PeriodKind::Week, at("2024-05-15T15:30:00Z"));
        assert_eq!(w.start, at("2024-05-12T00:00:00Z"));
        assert_eq!(w.end, at("2024-05-18T23:59:59.999Z"));
    }

    #[test]
    fn test_month_window_includes_last_day() {
        let w = window(PeriodKind::Month, at("2024-02-10T09:00:00Z"));
        assert_eq!(w.start, at("2024-02-01T00:00:00Z"));
        assert_eq!(w.end, at("2024-02-29T23:59:59.999Z"));

        let dec = window(PeriodKind::Month, at("2024-12-31T23:00:00Z"));
        assert_eq!(dec.end, at("2024-12-31T23:59:59.999Z"));
    }

    #[test]
    fn test_day_and_upcoming_windows() {
        let now = at("2024-05-10T12:00:00Z");
        let day = window(PeriodKind::Day, now);
        assert_eq!(day.start, at("2024-05-10T00:00:00Z"));
        assert_eq!(day.end, at("2024-05-10T23:59:59.999Z"));

        let upcoming = window(PeriodKind::Upcoming, now);
        assert_eq!(upcoming.start, now);
        assert_eq!(upcoming.end, at("2024-06-09T12:00:00Z"));
    }

    #[test]
    fn test_breakdown_groups_by_day_and_filters_by_status() {
        let now = at("2024-05-10T12:00:00Z");
        let events = vec![
            event("Prova em andamento", at("2024-05-10T11:00:00Z"), 2),
            event("Trabalho", at("2024-05-12T09:00:00Z"), 1),
            event("Seminário", at("2024-05-16T09:00:00Z"), 1),
            event("Feira", at("2024-05-30T09:00:00Z"), 1),
        ];

        let all = breakdown(events.clone(), None, now);
        assert_eq!(all.stats.total, 4);
        assert_eq!(all.stats.filtered, 4);
        assert_eq!(all.stats.by_status[&TimelineStatus::Scheduled], 3);
        assert_eq!(all.stats.by_status[&TimelineStatus::InProgress], 1);
        assert_eq!(all.data.len(), 4);
        assert!(all.data["2024-05-10"][0].in_progress);

        let urgent: Vec<&str> = all
            .urgency_summary
            .urgent
            .iter()
            .map(|i| i.title.as_str())
            .collect();
        assert_eq!(urgent, vec!["Prova em andamento", "Trabalho"]);
        assert_eq!(all.urgency_summary.soon.len(), 1);
        assert_eq!(all.urgency_summary.soon[0].title, "Seminário");

        let in_progress = breakdown(events, Some(TimelineStatus::InProgress), now);
        assert_eq!(in_progress.stats.total, 4);
        assert_eq!(in_progress.stats.filtered, 1);
        assert_eq!(in_progress.data.len(), 1);
        assert_eq!(in_progress.urgency_summary.urgent.len(), 2);
    }
}
