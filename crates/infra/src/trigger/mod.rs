//! Monthly scheduling of the billing sweep.
//!
//! The trigger wakes periodically, recomputes the next "first of the month,
//! local midnight" instant, and only arms a single sleep once that instant is
//! within the fire window. Shutdown interrupts any pending sleep.

mod schedule;
mod worker;

pub use schedule::{next_billing_instant, plan_next_step, TriggerStep};
pub use worker::{BillingTrigger, NowFn, TriggerConfig, TriggerHandle};
