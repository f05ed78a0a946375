use crate::clock::ClockTime;
use chrono::Weekday;
use serde::{Deserialize, Serialize};

/// A lesson submitted for one class on one weekday. Start and end must sit on
/// period boundaries of that day.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScheduleEntry {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    pub day: Weekday,
    pub start_time: ClockTime,
    pub end_time: ClockTime,
    pub subject: String,
    pub class_id: String,
    pub teacher_id: String,
}

/// Class and teacher stamped onto entries produced by an import.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OwnerContext {
    pub class_id: String,
    pub teacher_id: String,
}

impl OwnerContext {
    pub fn new(class_id: impl Into<String>, teacher_id: impl Into<String>) -> Self {
        Self {
            class_id: class_id.into(),
            teacher_id: teacher_id.into(),
        }
    }
}

impl ScheduleEntry {
    pub fn new(
        owner: &OwnerContext,
        day: Weekday,
        start_time: ClockTime,
        end_time: ClockTime,
        subject: impl Into<String>,
    ) -> Self {
        Self {
            id: None,
            day,
            start_time,
            end_time,
            subject: subject.into(),
            class_id: owner.class_id.clone(),
            teacher_id: owner.teacher_id.clone(),
        }
    }

    pub fn with_id(mut self, id: impl Into<String>) -> Self {
        self.id = Some(id.into());
        self
    }

    pub fn owner(&self) -> OwnerContext {
        OwnerContext::new(self.class_id.clone(), self.teacher_id.clone())
    }

    /// Same day and the half-open time ranges intersect.
    pub fn overlaps(&self, other: &ScheduleEntry) -> bool {
        self.day == other.day
            && self.start_time < other.end_time
            && other.start_time < self.end_time
    }

    /// Human label used in conflict messages.
    pub fn describe(&self) -> String {
        match &self.id {
            Some(id) => format!("{} [{id}]", self.subject),
            None => self.subject.clone(),
        }
    }
}
