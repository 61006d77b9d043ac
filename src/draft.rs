use chrono::{NaiveDate, NaiveTime};

use crate::{
    error::ValidationError,
    reminder::{DayPart, Dosage, MarkedDay, NO_TIME, PillIcon, ReminderFireTime},
    storage::StoredReminder,
};

/// A reminder being composed on the add-medication screen.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ReminderDraft {
    name: String,
    dosage: Dosage,
    icon: PillIcon,
    day_part: DayPart,
    morning_time: Option<ReminderFireTime>,
    noon_time: Option<ReminderFireTime>,
    evening_time: Option<ReminderFireTime>,
}

impl ReminderDraft {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn dosage(&self) -> Dosage {
        self.dosage
    }

    pub fn icon(&self) -> PillIcon {
        self.icon
    }

    pub fn day_part(&self) -> DayPart {
        self.day_part
    }

    pub fn set_name(&mut self, name: impl Into<String>) {
        self.name = name.into();
    }

    pub fn set_dosage(&mut self, count: u32) {
        self.dosage = Dosage::clamped(count);
    }

    pub fn set_icon(&mut self, icon: PillIcon) {
        self.icon = icon;
    }

    /// Switches the picker to `day_part` and clears whatever time it held.
    pub fn select_day_part(&mut self, day_part: DayPart) {
        self.day_part = day_part;
        self.set_time(None);
    }

    /// Stores `time` for the selected day-part, clamped into its range.
    pub fn set_time(&mut self, time: Option<NaiveTime>) {
        let day_part = self.day_part;
        let time = time.map(|time| ReminderFireTime::new(day_part.clamp_time(time)));
        *self.time_slot(day_part) = time;
    }

    pub fn time_for(&self, day_part: DayPart) -> Option<&ReminderFireTime> {
        match day_part {
            DayPart::Morning => self.morning_time.as_ref(),
            DayPart::Noon => self.noon_time.as_ref(),
            DayPart::Evening => self.evening_time.as_ref(),
        }
    }

    pub fn formatted_time(&self, day_part: DayPart) -> String {
        self.time_for(day_part)
            .map(ReminderFireTime::formatted)
            .unwrap_or_else(|| NO_TIME.to_string())
    }

    pub fn formatted_dosage(&self) -> String {
        self.dosage.formatted()
    }

    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.name.is_empty() {
            return Err(ValidationError::MissingName);
        }
        if DayPart::ALL.iter().all(|part| self.time_for(*part).is_none()) {
            return Err(ValidationError::MissingTime);
        }
        Ok(())
    }

    pub fn is_valid(&self) -> bool {
        self.validate().is_ok()
    }

    /// Storage form of the draft: a single time field, not taken, stamped
    /// with `today`.
    pub fn to_persistable(&self, today: NaiveDate) -> Result<StoredReminder, ValidationError> {
        self.validate()?;

        let (day_part, fire_at) = self
            .time_for(self.day_part)
            .map(|time| (self.day_part, *time))
            .or_else(|| {
                DayPart::ALL
                    .iter()
                    .find_map(|part| self.time_for(*part).map(|time| (*part, *time)))
            })
            .ok_or(ValidationError::MissingTime)?;

        let mut stored = StoredReminder {
            name: self.name.clone(),
            dosage: self.dosage.count(),
            icon: self.icon.as_str().to_string(),
            morning_time: None,
            noon_time: None,
            evening_time: None,
            taken: false,
            last_marked_day: 0,
            last_marked_date: None,
        };
        stored.set_time(day_part, fire_at.into_time());
        stored.stamp(MarkedDay::Date(today));

        Ok(stored)
    }

    fn time_slot(&mut self, day_part: DayPart) -> &mut Option<ReminderFireTime> {
        match day_part {
            DayPart::Morning => &mut self.morning_time,
            DayPart::Noon => &mut self.noon_time,
            DayPart::Evening => &mut self.evening_time,
        }
    }
}

/// Alert shown after the user taps "Add this Medication".
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AddReminderAlert {
    Added,
    Missing,
}

impl AddReminderAlert {
    pub fn title(&self) -> &'static str {
        match self {
            AddReminderAlert::Added => "Great Job",
            AddReminderAlert::Missing => "Something's missing",
        }
    }

    pub fn message(&self) -> &'static str {
        match self {
            AddReminderAlert::Added => "Your pill reminder has been added",
            AddReminderAlert::Missing => "Make sure you entered the pill name and selected a time",
        }
    }
}
