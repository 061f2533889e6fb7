//! Office-hours availability of a contact at a given instant.

use chrono::{Datelike, Duration, NaiveDateTime, Timelike};

use crate::modules::contacts::model::{
    Availability, AvailabilityStatus, ClockTime, NextSlot, OfficeHours, SchoolDay, TimeRemaining,
};

/// Days looked ahead for the next slot; 7 wraps to the same weekday next week.
const LOOKAHEAD_DAYS: u32 = 7;

fn clock_time(at: NaiveDateTime) -> ClockTime {
    // hour() < 24 and minute() < 60 always hold
    ClockTime::from_hm(at.hour() as u16, at.minute() as u16).unwrap_or_default()
}

fn slots_on(schedule: &[OfficeHours], day: SchoolDay) -> Vec<&OfficeHours> {
    let mut slots: Vec<&OfficeHours> = schedule.iter().filter(|s| s.day == day).collect();
    slots.sort_by_key(|s| s.start_time);
    slots
}

/// First slot starting after `at`, searching forward day by day.
pub fn next_slot(schedule: &[OfficeHours], at: NaiveDateTime) -> Option<NextSlot> {
    let now = clock_time(at);

    (0..=LOOKAHEAD_DAYS).find_map(|offset| {
        let date = at.date() + Duration::days(i64::from(offset));
        let day = SchoolDay::from_chrono(date.weekday())?;

        slots_on(schedule, day)
            .into_iter()
            .find(|slot| offset > 0 || slot.start_time > now)
            .map(|slot| NextSlot {
                day,
                slot: slot.clone(),
                days_until: offset,
            })
    })
}

pub fn check_availability(schedule: &[OfficeHours], at: NaiveDateTime) -> Availability {
    let now = clock_time(at);
    let today = SchoolDay::from_chrono(at.weekday())
        .map(|day| slots_on(schedule, day))
        .unwrap_or_default();

    if let Some(slot) = today.iter().find(|slot| slot.contains(now)) {
        let remaining = slot.end_time.minutes() - now.minutes();
        return Availability::available_now((*slot).clone(), TimeRemaining::from_minutes(remaining));
    }

    let status = if today.is_empty() {
        AvailabilityStatus::Unavailable
    } else {
        AvailabilityStatus::OutsideHours
    };

    Availability::not_available(status, next_slot(schedule, at))
}
