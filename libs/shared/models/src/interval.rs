use chrono::{NaiveTime, Timelike};

/// Half-open interval overlap: [a_start, a_end) and [b_start, b_end)
/// intersect iff max(a_start, b_start) < min(a_end, b_end).
///
/// Every booking, reschedule and shift-validation path funnels through this
/// one comparison.
pub fn overlaps<T: PartialOrd>(a_start: T, a_end: T, b_start: T, b_end: T) -> bool {
    let lower = if a_start > b_start { a_start } else { b_start };
    let upper = if a_end < b_end { a_end } else { b_end };
    lower < upper
}

/// Normalize a time-of-day to minutes since midnight. Wall-clock values
/// arrive as "HH:mm" strings and must be compared numerically, never
/// lexically.
pub fn minute_of_day(time: NaiveTime) -> u32 {
    time.hour() * 60 + time.minute()
}
