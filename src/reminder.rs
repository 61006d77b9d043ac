use std::{fmt, str::FromStr};

use chrono::{Datelike, NaiveDate, NaiveTime, Timelike};

pub type ReminderId = String;

/// Placeholder rendered when a day-part has no stored time.
pub const NO_TIME: &str = "NONE";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum DayPart {
    #[default]
    Morning,
    Noon,
    Evening,
}

impl DayPart {
    pub const ALL: [DayPart; 3] = [DayPart::Morning, DayPart::Noon, DayPart::Evening];

    /// First and last minute a time picker offers for this day-part.
    pub fn time_range(&self) -> (NaiveTime, NaiveTime) {
        let (start, end) = match self {
            DayPart::Morning => (0, 11),
            DayPart::Noon => (12, 16),
            DayPart::Evening => (17, 23),
        };

        (
            NaiveTime::from_hms_opt(start, 0, 0).unwrap_or(NaiveTime::MIN),
            NaiveTime::from_hms_opt(end, 59, 0).unwrap_or(NaiveTime::MIN),
        )
    }

    pub fn clamp_time(&self, time: NaiveTime) -> NaiveTime {
        let (start, end) = self.time_range();
        time.clamp(start, end)
    }
}

impl fmt::Display for DayPart {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            DayPart::Morning => "Morning",
            DayPart::Noon => "Noon",
            DayPart::Evening => "Evening",
        };
        f.write_str(name)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum PillIcon {
    #[default]
    Blue,
    White,
    Orange,
    Polygon,
    Red,
    Other,
}

impl PillIcon {
    pub fn as_str(&self) -> &'static str {
        match self {
            PillIcon::Blue => "blue",
            PillIcon::White => "white",
            PillIcon::Orange => "orange",
            PillIcon::Polygon => "polygon",
            PillIcon::Red => "red",
            PillIcon::Other => "other",
        }
    }
}

impl FromStr for PillIcon {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "blue" => Ok(PillIcon::Blue),
            "white" => Ok(PillIcon::White),
            "orange" => Ok(PillIcon::Orange),
            "polygon" => Ok(PillIcon::Polygon),
            "red" => Ok(PillIcon::Red),
            "other" => Ok(PillIcon::Other),
            _ => Err(()),
        }
    }
}

/// Number of pills per dose. Never zero.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct Dosage(u32);

impl Dosage {
    pub const ONE: Dosage = Dosage(1);

    pub fn new(count: u32) -> Option<Self> {
        (count >= 1).then_some(Self(count))
    }

    pub fn clamped(count: u32) -> Self {
        Self(count.max(1))
    }

    pub fn count(&self) -> u32 {
        self.0
    }

    pub fn formatted(&self) -> String {
        let plural = if self.0 > 1 { "s" } else { "" };
        format!("Take {} pill{}", self.0, plural)
    }
}

impl Default for Dosage {
    fn default() -> Self {
        Self::ONE
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct ReminderFireTime(NaiveTime);

impl ReminderFireTime {
    pub fn new(inner: NaiveTime) -> Self {
        let normalized_time = inner
            .with_second(0)
            .and_then(|time| time.with_nanosecond(0))
            .unwrap_or(inner);
        Self(normalized_time)
    }

    pub fn time(&self) -> &NaiveTime {
        &self.0
    }

    pub fn into_time(self) -> NaiveTime {
        self.0
    }

    /// Twelve hour clock, e.g. `8:05 PM`.
    pub fn formatted(&self) -> String {
        self.0.format("%-I:%M %p").to_string()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DailyTrigger {
    pub hour: u32,
    pub minute: u32,
}

impl DailyTrigger {
    pub fn time(&self) -> NaiveTime {
        NaiveTime::from_hms_opt(self.hour, self.minute, 0).unwrap_or(NaiveTime::MIN)
    }
}

impl From<&ReminderFireTime> for DailyTrigger {
    fn from(value: &ReminderFireTime) -> Self {
        Self {
            hour: value.time().hour(),
            minute: value.time().minute(),
        }
    }
}

/// The single day-part a reminder fires in.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReminderSchedule {
    pub day_part: DayPart,
    pub fire_at: ReminderFireTime,
}

/// When the taken flag was last touched.
///
/// Records written before full dates were stored only know the day of the
/// month, so those are compared by day number alone.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MarkedDay {
    Date(NaiveDate),
    DayOfMonth(u32),
}

impl MarkedDay {
    pub fn is_same_day(&self, today: NaiveDate) -> bool {
        match self {
            MarkedDay::Date(date) => *date == today,
            MarkedDay::DayOfMonth(day) => *day == today.day(),
        }
    }

    pub fn day_of_month(&self) -> u32 {
        match self {
            MarkedDay::Date(date) => date.day(),
            MarkedDay::DayOfMonth(day) => *day,
        }
    }

    pub fn date(&self) -> Option<NaiveDate> {
        match self {
            MarkedDay::Date(date) => Some(*date),
            MarkedDay::DayOfMonth(_) => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Reminder {
    pub id: ReminderId,
    pub name: String,
    pub dosage: Dosage,
    pub icon: PillIcon,
    pub schedule: ReminderSchedule,
    pub taken: bool,
    pub last_marked: MarkedDay,
}

impl Reminder {
    pub fn time_for(&self, day_part: DayPart) -> Option<&ReminderFireTime> {
        (self.schedule.day_part == day_part).then_some(&self.schedule.fire_at)
    }

    pub fn formatted_time(&self, day_part: DayPart) -> String {
        self.time_for(day_part)
            .map(ReminderFireTime::formatted)
            .unwrap_or_else(|| NO_TIME.to_string())
    }

    pub fn formatted_dosage(&self) -> String {
        self.dosage.formatted()
    }

    pub fn notification_time_of_day(&self) -> DailyTrigger {
        DailyTrigger::from(&self.schedule.fire_at)
    }

    pub fn notification_title(&self) -> String {
        format!("It's time to take your {}", self.name)
    }

    pub fn toggle_taken(&mut self, today: NaiveDate) {
        self.taken = !self.taken;
        self.last_marked = MarkedDay::Date(today);
    }
}

/// Clears `taken` when it was last marked on a different day than `today`.
pub fn apply_daily_reset(mut reminder: Reminder, today: NaiveDate) -> Reminder {
    if reminder.taken && !reminder.last_marked.is_same_day(today) {
        log::debug!("Resetting taken flag for reminder {}", reminder.id);
        reminder.taken = false;
    }
    reminder
}
