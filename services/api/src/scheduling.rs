//! Time-slot availability for a doctor's day.
//!
//! The working window and slot width are fixed configuration constants. A
//! candidate slot is bookable unless its half-open interval overlaps a
//! schedule-blocking appointment's interval in wall-clock minutes.
//!
//! Note the asymmetry with the create/update guard: that guard rejects only
//! an exact (doctor, date, time) collision and ignores durations, while this
//! view is fully interval-aware. Both behaviors are kept as-is.

use chrono::{NaiveTime, Timelike};

pub const WORK_DAY_START_MIN: i32 = 9 * 60;
pub const WORK_DAY_END_MIN: i32 = 17 * 60;
pub const SLOT_MINUTES: i32 = 30;

fn minutes_of(t: NaiveTime) -> i32 {
    (t.hour() * 60 + t.minute()) as i32
}

pub fn format_minutes(total: i32) -> String {
    format!("{:02}:{:02}", (total / 60) % 24, total % 60)
}

/// Every candidate slot start across the working window, in minutes.
pub fn slot_starts() -> impl Iterator<Item = i32> {
    (WORK_DAY_START_MIN..WORK_DAY_END_MIN).step_by(SLOT_MINUTES as usize)
}

/// Bookable "HH:MM" slot starts, ascending, given the day's schedule-blocking
/// appointments as (start, duration-minutes) pairs.
pub fn available_slots(booked: &[(NaiveTime, i32)]) -> Vec<String> {
    slot_starts()
        .filter(|&slot_start| {
            let slot_end = slot_start + SLOT_MINUTES;
            !booked.iter().any(|&(start, duration)| {
                let apt_start = minutes_of(start);
                let apt_end = apt_start + duration.max(0);
                slot_start < apt_end && slot_end > apt_start
            })
        })
        .map(format_minutes)
        .collect()
}

/// End of an appointment as "HH:MM", wrapped at midnight.
pub fn end_time(start: NaiveTime, duration_minutes: i32) -> String {
    format_minutes(minutes_of(start) + duration_minutes)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn t(h: u32, m: u32) -> NaiveTime {
        NaiveTime::from_hms_opt(h, m, 0).unwrap()
    }

    #[test]
    fn empty_day_exposes_full_grid() {
        let slots = available_slots(&[]);
        assert_eq!(slots.len(), 16);
        assert_eq!(slots.first().map(String::as_str), Some("09:00"));
        assert_eq!(slots.last().map(String::as_str), Some("16:30"));
        // ascending and on the half hour
        for pair in slots.windows(2) {
            assert!(pair[0] < pair[1]);
        }
    }

    #[test]
    fn booked_and_free_partition_the_grid() {
        let booked = vec![(t(10, 0), 30), (t(13, 0), 60)];
        let free = available_slots(&booked);
        let grid: Vec<String> = slot_starts().map(format_minutes).collect();
        for slot in &grid {
            let blocked = ["10:00", "13:00", "13:30"].contains(&slot.as_str());
            assert_eq!(free.contains(slot), !blocked, "slot {slot}");
        }
        assert_eq!(free.len(), grid.len() - 3);
    }

    #[test]
    fn long_appointment_blocks_every_touched_slot() {
        // 45 minutes starting mid-slot straddles two grid slots
        let free = available_slots(&[(t(10, 15), 45)]);
        assert!(!free.contains(&"10:00".to_string()));
        assert!(!free.contains(&"10:30".to_string()));
        assert!(free.contains(&"11:00".to_string()));
    }

    #[test]
    fn duration_past_closing_blocks_up_to_boundary_only() {
        // 16:30 + 240min runs past 17:00; only in-window slots exist to block
        let free = available_slots(&[(t(16, 30), 240)]);
        assert!(!free.contains(&"16:30".to_string()));
        assert!(free.contains(&"16:00".to_string()));
        assert_eq!(free.len(), 15);
    }

    #[test]
    fn appointment_outside_window_blocks_nothing() {
        let free = available_slots(&[(t(18, 0), 30), (t(7, 30), 60)]);
        assert_eq!(free.len(), 16);
    }

    #[test]
    fn appointment_ending_at_slot_start_does_not_block_it() {
        // half-open intervals: [09:00, 09:30) does not touch the 09:30 slot
        let free = available_slots(&[(t(9, 0), 30)]);
        assert!(!free.contains(&"09:00".to_string()));
        assert!(free.contains(&"09:30".to_string()));
    }

    #[test]
    fn idempotent_for_same_input() {
        let booked = vec![(t(9, 0), 90), (t(14, 30), 15)];
        assert_eq!(available_slots(&booked), available_slots(&booked));
    }

    #[test]
    fn end_time_wraps_past_midnight() {
        assert_eq!(end_time(t(10, 0), 30), "10:30");
        assert_eq!(end_time(t(16, 45), 30), "17:15");
        assert_eq!(end_time(t(23, 30), 60), "00:30");
    }
}
