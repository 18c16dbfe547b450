//! Blackout dates and site closures.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use service_core::error::AppError;
use std::fmt;
use uuid::Uuid;

use super::common::{DateRange, Stay};
use super::RuleEntity;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ClosureReason {
    Maintenance,
    Seasonal,
    Event,
    Emergency,
    Other,
}

impl ClosureReason {
    pub fn as_str(&self) -> &'static str {
        match self {
            ClosureReason::Maintenance => "maintenance",
            ClosureReason::Seasonal => "seasonal",
            ClosureReason::Event => "event",
            ClosureReason::Emergency => "emergency",
            ClosureReason::Other => "other",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "maintenance" => Some(ClosureReason::Maintenance),
            "seasonal" => Some(ClosureReason::Seasonal),
            "event" => Some(ClosureReason::Event),
            "emergency" => Some(ClosureReason::Emergency),
            "other" => Some(ClosureReason::Other),
            _ => None,
        }
    }
}

impl fmt::Display for ClosureReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Derived from the dates at read time; never stored.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BlackoutStatus {
    Past,
    Active,
    Upcoming,
}

impl BlackoutStatus {
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "past" => Some(BlackoutStatus::Past),
            "active" => Some(BlackoutStatus::Active),
            "upcoming" => Some(BlackoutStatus::Upcoming),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Blackout {
    pub id: Uuid,
    pub campground_id: Uuid,
    /// A single closed site. Takes precedence over `site_class_ids`.
    pub site_id: Option<String>,
    /// Closed site classes. With no `site_id` and no classes the closure
    /// is park-wide.
    pub site_class_ids: Vec<String>,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    pub reason: ClosureReason,
    pub note: Option<String>,
    pub is_active: bool,
    pub created_utc: DateTime<Utc>,
    pub updated_utc: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct NewBlackout {
    pub site_id: Option<String>,
    pub site_class_ids: Vec<String>,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    pub reason: ClosureReason,
    pub note: Option<String>,
    pub is_active: bool,
}

#[derive(Debug, Clone, Default)]
pub struct BlackoutPatch {
    pub site_id: Option<Option<String>>,
    pub site_class_ids: Option<Vec<String>>,
    pub start_date: Option<NaiveDate>,
    pub end_date: Option<NaiveDate>,
    pub reason: Option<ClosureReason>,
    pub note: Option<Option<String>>,
    pub is_active: Option<bool>,
}

impl Blackout {
    pub fn new(campground_id: Uuid, input: NewBlackout) -> Result<Self, AppError> {
        let now = Utc::now();
        let blackout = Self {
            id: Uuid::new_v4(),
            campground_id,
            site_id: input.site_id.filter(|s| !s.trim().is_empty()),
            site_class_ids: input.site_class_ids,
            start_date: input.start_date,
            end_date: input.end_date,
            reason: input.reason,
            note: input.note,
            is_active: input.is_active,
            created_utc: now,
            updated_utc: now,
        };
        blackout.validate()?;
        Ok(blackout)
    }

    pub fn apply(&mut self, patch: BlackoutPatch) -> Result<(), AppError> {
        if let Some(site) = patch.site_id {
            self.site_id = site.filter(|s| !s.trim().is_empty());
        }
        if let Some(classes) = patch.site_class_ids {
            self.site_class_ids = classes;
        }
        if let Some(start) = patch.start_date {
            self.start_date = start;
        }
        if let Some(end) = patch.end_date {
            self.end_date = end;
        }
        if let Some(reason) = patch.reason {
            self.reason = reason;
        }
        if let Some(note) = patch.note {
            self.note = note;
        }
        if let Some(active) = patch.is_active {
            self.is_active = active;
        }
        self.updated_utc = Utc::now();
        self.validate()
    }

    pub fn validate(&self) -> Result<(), AppError> {
        self.range().validate("blackout")
    }

    pub fn range(&self) -> DateRange {
        DateRange::new(self.start_date, self.end_date)
    }

    pub fn status(&self, today: NaiveDate) -> BlackoutStatus {
        if self.end_date < today {
            BlackoutStatus::Past
        } else if self.start_date > today {
            BlackoutStatus::Upcoming
        } else {
            BlackoutStatus::Active
        }
    }

    pub fn is_park_wide(&self) -> bool {
        self.site_id.is_none() && self.site_class_ids.is_empty()
    }

    /// Whether the closure covers the requested site or its class.
    pub fn applies_to(&self, site_id: Option<&str>, site_class_id: Option<&str>) -> bool {
        if self.is_park_wide() {
            return true;
        }
        if let Some(closed) = &self.site_id {
            return site_id == Some(closed.as_str());
        }
        site_class_id.is_some_and(|class| self.site_class_ids.iter().any(|c| c == class))
    }

    pub fn overlaps(&self, stay: &Stay) -> bool {
        self.range().overlaps(stay)
    }
}

impl RuleEntity for Blackout {
    fn id(&self) -> Uuid {
        self.id
    }
    fn campground_id(&self) -> Uuid {
        self.campground_id
    }
    fn is_active(&self) -> bool {
        self.is_active
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(s: &str) -> NaiveDate {
        NaiveDate::parse_from_str(s, "%Y-%m-%d").unwrap()
    }

    fn closure(site_id: Option<&str>, classes: &[&str]) -> Blackout {
        Blackout::new(
            Uuid::new_v4(),
            NewBlackout {
                site_id: site_id.map(str::to_string),
                site_class_ids: classes.iter().map(|c| c.to_string()).collect(),
                start_date: date("2026-07-01"),
                end_date: date("2026-07-10"),
                reason: ClosureReason::Maintenance,
                note: None,
                is_active: true,
            },
        )
        .unwrap()
    }

    #[test]
    fn test_status_is_derived_from_today() {
        let b = closure(None, &[]);
        assert_eq!(b.status(date("2026-06-30")), BlackoutStatus::Upcoming);
        assert_eq!(b.status(date("2026-07-01")), BlackoutStatus::Active);
        assert_eq!(b.status(date("2026-07-10")), BlackoutStatus::Active);
        assert_eq!(b.status(date("2026-07-11")), BlackoutStatus::Past);
    }

    #[test]
    fn test_scope() {
        assert!(closure(None, &[]).applies_to(Some("A1"), Some("RV")));
        assert!(closure(Some("A1"), &[]).applies_to(Some("A1"), Some("RV")));
        assert!(!closure(Some("A1"), &[]).applies_to(Some("A2"), Some("RV")));
        assert!(closure(None, &["RV"]).applies_to(None, Some("RV")));
        assert!(!closure(None, &["RV"]).applies_to(None, Some("TENT")));
    }

    #[test]
    fn test_end_before_start_rejected() {
        let result = Blackout::new(
            Uuid::new_v4(),
            NewBlackout {
                site_id: None,
                site_class_ids: vec![],
                start_date: date("2026-07-10"),
                end_date: date("2026-07-01"),
                reason: ClosureReason::Other,
                note: None,
                is_active: true,
            },
        );
        assert!(result.is_err());
    }
}
