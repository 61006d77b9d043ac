use chrono::{NaiveDate, NaiveTime};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::reminder::{
    DayPart, Dosage, MarkedDay, PillIcon, Reminder, ReminderFireTime, ReminderId,
    ReminderSchedule,
};

/// One entry of the `reminders` table as it sits in the preference store.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StoredReminder {
    pub name: String,
    pub dosage: u32,
    pub icon: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub morning_time: Option<NaiveTime>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub noon_time: Option<NaiveTime>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub evening_time: Option<NaiveTime>,
    pub taken: bool,
    #[serde(default)]
    pub last_marked_day: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_marked_date: Option<NaiveDate>,
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum InvalidRecord {
    #[error("dosage must be at least 1")]
    ZeroDosage,

    #[error("no time of day is set")]
    NoTime,
}

impl StoredReminder {
    pub fn time_for(&self, day_part: DayPart) -> Option<NaiveTime> {
        match day_part {
            DayPart::Morning => self.morning_time,
            DayPart::Noon => self.noon_time,
            DayPart::Evening => self.evening_time,
        }
    }

    /// Sets the time for `day_part` and drops the other two.
    pub fn set_time(&mut self, day_part: DayPart, time: NaiveTime) {
        self.morning_time = None;
        self.noon_time = None;
        self.evening_time = None;
        match day_part {
            DayPart::Morning => self.morning_time = Some(time),
            DayPart::Noon => self.noon_time = Some(time),
            DayPart::Evening => self.evening_time = Some(time),
        }
    }

    pub fn stamp(&mut self, marked: MarkedDay) {
        self.last_marked_day = marked.day_of_month();
        self.last_marked_date = marked.date();
    }

    pub fn marked_day(&self) -> MarkedDay {
        match self.last_marked_date {
            Some(date) => MarkedDay::Date(date),
            None => MarkedDay::DayOfMonth(self.last_marked_day),
        }
    }

    pub fn into_reminder(self, id: ReminderId) -> Result<Reminder, InvalidRecord> {
        let dosage = Dosage::new(self.dosage).ok_or(InvalidRecord::ZeroDosage)?;
        let schedule = DayPart::ALL
            .iter()
            .find_map(|part| {
                self.time_for(*part).map(|time| ReminderSchedule {
                    day_part: *part,
                    fire_at: ReminderFireTime::new(time),
                })
            })
            .ok_or(InvalidRecord::NoTime)?;
        let icon = self.icon.parse().unwrap_or_else(|_| {
            log::warn!("Unknown pill icon {}, defaulting to blue", self.icon);
            PillIcon::Blue
        });
        let last_marked = self.marked_day();

        Ok(Reminder {
            id,
            name: self.name,
            dosage,
            icon,
            schedule,
            taken: self.taken,
            last_marked,
        })
    }
}

impl From<&Reminder> for StoredReminder {
    fn from(value: &Reminder) -> Self {
        let mut stored = Self {
            name: value.name.clone(),
            dosage: value.dosage.count(),
            icon: value.icon.as_str().to_string(),
            morning_time: None,
            noon_time: None,
            evening_time: None,
            taken: value.taken,
            last_marked_day: 0,
            last_marked_date: None,
        };
        stored.set_time(value.schedule.day_part, value.schedule.fire_at.into_time());
        stored.stamp(value.last_marked);
        stored
    }
}
