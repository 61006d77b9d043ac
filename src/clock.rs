use chrono::{DateTime, NaiveDate, NaiveDateTime, TimeDelta, TimeZone, Utc};
use chrono_tz::Tz;

/// Wall clock in the user's timezone.
pub trait Clock: Send + Sync + 'static {
    fn now(&self) -> NaiveDateTime;

    fn today(&self) -> NaiveDate {
        self.now().date()
    }

    /// Elapsed time until the wall clock shows `target`.
    fn until(&self, target: NaiveDateTime) -> TimeDelta {
        target - self.now()
    }
}

pub struct LocalClock {
    timezone: Tz,
}

impl LocalClock {
    pub fn new(timezone: Tz) -> Self {
        Self { timezone }
    }

    fn until_from(&self, target: NaiveDateTime, now: DateTime<Utc>) -> TimeDelta {
        match self.timezone.from_local_datetime(&target).earliest() {
            Some(target) => target.with_timezone(&Utc) - now,
            // Skipped by a DST jump.
            None => target - now.with_timezone(&self.timezone).naive_local(),
        }
    }
}

impl Clock for LocalClock {
    fn now(&self) -> NaiveDateTime {
        Utc::now().with_timezone(&self.timezone).naive_local()
    }

    fn until(&self, target: NaiveDateTime) -> TimeDelta {
        self.until_from(target, Utc::now())
    }
}
