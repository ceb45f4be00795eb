//! Calendar arithmetic for the monthly billing trigger.

use std::time::Duration;

use chrono::{DateTime, Datelike, NaiveDate, NaiveTime, TimeZone};

/// Local midnight on the first day of the month after `now`.
///
/// When midnight does not exist locally (a DST gap), the first valid instant
/// after it is used.
pub fn next_billing_instant<Tz: TimeZone>(now: &DateTime<Tz>) -> DateTime<Tz> {
    let today = now.date_naive();
    let (year, month) = if today.month() == 12 {
        (today.year() + 1, 1)
    } else {
        (today.year(), today.month() + 1)
    };

    // Day 1 exists in every month.
    let first = NaiveDate::from_ymd_opt(year, month, 1).unwrap_or(today);
    let mut local = first.and_time(NaiveTime::MIN);
    let tz = now.timezone();

    loop {
        if let Some(instant) = tz.from_local_datetime(&local).earliest() {
            return instant;
        }
        local += chrono::Duration::minutes(15);
    }
}

/// What the trigger should do next.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TriggerStep {
    /// The target is inside the final window: sleep `wait`, then run the sweep.
    Fire { wait: Duration },
    /// The target is still far away: sleep `wait`, then recompute.
    Recheck { wait: Duration },
}

/// Decide between arming the one-shot fire and re-checking later.
///
/// Long sleeps are never used to reach a distant target: the trigger wakes at
/// least every `recheck_interval` and only commits to a single sleep once less
/// than `fire_window` remains, so timer drift is bounded by the window.
pub fn plan_next_step(
    remaining: chrono::Duration,
    fire_window: Duration,
    recheck_interval: Duration,
) -> TriggerStep {
    let remaining = match remaining.to_std() {
        Ok(r) => r,
        // Target already passed.
        Err(_) => return TriggerStep::Fire { wait: Duration::ZERO },
    };

    if remaining <= fire_window {
        return TriggerStep::Fire { wait: remaining };
    }

    let until_window = remaining - fire_window;
    TriggerStep::Recheck {
        wait: recheck_interval.min(until_window).max(Duration::from_millis(1)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{FixedOffset, Timelike, Utc};
    use proptest::prelude::*;

    const DAY: Duration = Duration::from_secs(24 * 60 * 60);

    #[test]
    fn next_instant_is_first_of_next_month_at_midnight() {
        let now = Utc.with_ymd_and_hms(2024, 3, 15, 13, 30, 0).unwrap();
        assert_eq!(
            next_billing_instant(&now),
            Utc.with_ymd_and_hms(2024, 4, 1, 0, 0, 0).unwrap()
        );
    }

    #[test]
    fn december_rolls_over_to_january() {
        let now = Utc.with_ymd_and_hms(2023, 12, 31, 23, 59, 59).unwrap();
        assert_eq!(
            next_billing_instant(&now),
            Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap()
        );
    }

    #[test]
    fn exactly_at_midnight_on_the_first_targets_the_following_month() {
        let now = Utc.with_ymd_and_hms(2024, 2, 1, 0, 0, 0).unwrap();
        assert_eq!(
            next_billing_instant(&now),
            Utc.with_ymd_and_hms(2024, 3, 1, 0, 0, 0).unwrap()
        );
    }

    #[test]
    fn midnight_is_local_to_the_timezone() {
        let cet = FixedOffset::east_opt(3600).unwrap();
        let now = cet.with_ymd_and_hms(2024, 5, 20, 8, 0, 0).unwrap();
        let next = next_billing_instant(&now);

        assert_eq!(next, cet.with_ymd_and_hms(2024, 6, 1, 0, 0, 0).unwrap());
        assert_eq!(
            next.with_timezone(&Utc),
            Utc.with_ymd_and_hms(2024, 5, 31, 23, 0, 0).unwrap()
        );
    }

    #[test]
    fn missing_local_midnight_resolves_to_first_valid_instant() {
        // Paraguay sprang forward at 00:00 on 2017-10-01; local midnight never happened.
        let tz = chrono_tz::America::Asuncion;
        let now = tz.with_ymd_and_hms(2017, 9, 15, 12, 0, 0).unwrap();
        let next = next_billing_instant(&now);

        assert_eq!(next.naive_local().to_string(), "2017-10-01 01:00:00");
        assert_eq!(
            next.with_timezone(&Utc),
            Utc.with_ymd_and_hms(2017, 10, 1, 4, 0, 0).unwrap()
        );
    }

    #[test]
    fn month_boundary_without_transition_stays_at_midnight() {
        let tz = chrono_tz::America::Asuncion;
        let now = tz.with_ymd_and_hms(2017, 4, 10, 9, 0, 0).unwrap();
        let next = next_billing_instant(&now);

        assert_eq!(next.naive_local().to_string(), "2017-05-01 00:00:00");
    }

    #[test]
    fn far_target_rechecks_after_the_interval() {
        let step = plan_next_step(chrono::Duration::days(20), DAY, DAY);
        assert_eq!(step, TriggerStep::Recheck { wait: DAY });
    }

    #[test]
    fn recheck_never_overshoots_the_window() {
        let step = plan_next_step(chrono::Duration::hours(30), DAY, DAY);
        assert_eq!(
            step,
            TriggerStep::Recheck {
                wait: Duration::from_secs(6 * 60 * 60)
            }
        );
    }

    #[test]
    fn target_inside_window_fires_after_remaining_time() {
        let step = plan_next_step(chrono::Duration::hours(5), DAY, DAY);
        assert_eq!(
            step,
            TriggerStep::Fire {
                wait: Duration::from_secs(5 * 60 * 60)
            }
        );
    }

    #[test]
    fn past_target_fires_immediately() {
        let step = plan_next_step(chrono::Duration::seconds(-3), DAY, DAY);
        assert_eq!(step, TriggerStep::Fire { wait: Duration::ZERO });
    }

    proptest! {
        #![proptest_config(ProptestConfig { cases: 256, .. ProptestConfig::default() })]

        #[test]
        fn next_instant_is_a_future_first_of_month_midnight(
            secs in 946_684_800i64..4_102_444_800i64,
            offset_hours in -12i32..=14,
        ) {
            let tz = FixedOffset::east_opt(offset_hours * 3600).unwrap();
            let now = tz.timestamp_opt(secs, 0).unwrap();
            let next = next_billing_instant(&now);

            prop_assert!(next > now);
            prop_assert_eq!(next.day(), 1);
            prop_assert_eq!(next.hour(), 0);
            prop_assert_eq!(next.minute(), 0);
            prop_assert!(next - now <= chrono::Duration::days(31));
        }

        #[test]
        fn recheck_waits_never_reach_into_the_window(
            remaining_secs in 0i64..5_000_000,
            window_secs in 1u64..200_000,
            recheck_secs in 1u64..200_000,
        ) {
            let window = Duration::from_secs(window_secs);
            let step = plan_next_step(
                chrono::Duration::seconds(remaining_secs),
                window,
                Duration::from_secs(recheck_secs),
            );
            let remaining = Duration::from_secs(remaining_secs as u64);

            match step {
                TriggerStep::Fire { wait } => {
                    prop_assert!(remaining <= window);
                    prop_assert_eq!(wait, remaining);
                }
                TriggerStep::Recheck { wait } => {
                    prop_assert!(remaining > window);
                    prop_assert!(wait <= remaining - window);
                    prop_assert!(wait <= Duration::from_secs(recheck_secs));
                }
            }
        }
    }
}
