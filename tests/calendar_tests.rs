use chrono::NaiveDate;
use tugas::calendar::{
    add_days, is_next_week, is_same_week, nearest_weekday, start_of_week, weekday_index,
    WeekWindow,
};

fn d(y: i32, m: u32, day: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, day).unwrap()
}

#[test]
fn add_days_handles_negative_offsets() {
    assert_eq!(add_days(d(2025, 10, 3), 4), d(2025, 10, 7));
    assert_eq!(add_days(d(2025, 10, 3), -3), d(2025, 9, 30));
    assert_eq!(add_days(d(2025, 1, 1), -1), d(2024, 12, 31));
}

#[test]
fn start_of_week_is_the_monday_at_or_before() {
    // 2025-10-06 is a Monday
    assert_eq!(start_of_week(d(2025, 10, 6)), d(2025, 10, 6));
    assert_eq!(start_of_week(d(2025, 10, 8)), d(2025, 10, 6));
    // Sunday belongs to the week of the preceding Monday
    assert_eq!(start_of_week(d(2025, 10, 12)), d(2025, 10, 6));
}

#[test]
fn same_week_spans_monday_to_sunday() {
    assert!(is_same_week(d(2025, 10, 6), d(2025, 10, 10)));
    assert!(is_same_week(d(2025, 10, 6), d(2025, 10, 12)));
    assert!(!is_same_week(d(2025, 10, 6), d(2025, 10, 5)));
    assert!(!is_same_week(d(2025, 10, 6), d(2025, 10, 13)));
}

#[test]
fn next_week_is_the_following_monday_through_sunday() {
    let base = d(2025, 10, 3); // Friday; its week starts 2025-09-29
    assert!(is_next_week(d(2025, 10, 6), base));
    assert!(is_next_week(d(2025, 10, 10), base));
    assert!(is_next_week(d(2025, 10, 12), base));
    assert!(!is_next_week(d(2025, 10, 5), base));
    assert!(!is_next_week(d(2025, 10, 13), base));
}

#[test]
fn week_windows_align_with_the_predicates() {
    let base = d(2025, 10, 3);
    let current = WeekWindow::current(base);
    assert_eq!(current.start(), d(2025, 9, 29));
    assert_eq!(current.end(), d(2025, 10, 5));
    assert!(current.contains(base));
    let next = WeekWindow::next(base);
    assert_eq!(next.start(), d(2025, 10, 6));
    assert_eq!(next.end(), d(2025, 10, 12));
    assert!(!next.contains(base));
}

#[test]
fn weekday_index_is_sunday_based() {
    assert_eq!(weekday_index(d(2025, 10, 5)), 0); // Sunday
    assert_eq!(weekday_index(d(2025, 10, 6)), 1); // Monday
    assert_eq!(weekday_index(d(2025, 10, 11)), 6); // Saturday
}

#[test]
fn nearest_weekday_returns_base_on_a_hit() {
    let friday = d(2025, 10, 3);
    assert_eq!(nearest_weekday(friday, 5), friday);
    assert_eq!(nearest_weekday(friday, 1), d(2025, 10, 6));
    assert_eq!(nearest_weekday(friday, 3), d(2025, 10, 8));
}
