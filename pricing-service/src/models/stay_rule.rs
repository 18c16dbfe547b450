//! Minimum/maximum night stay rules.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use service_core::error::AppError;
use uuid::Uuid;

use super::common::{require_name, DateRange, Stay};
use super::RuleEntity;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StayRule {
    pub id: Uuid,
    pub campground_id: Uuid,
    pub name: String,
    pub min_nights: i32,
    pub max_nights: i32,
    /// Site classes this rule restricts. Empty means every class.
    pub site_classes: Vec<String>,
    /// Empty means the rule is not date-scoped.
    pub date_ranges: Vec<DateRange>,
    /// Bypass the rule when arrival is fewer than this many days away.
    pub ignore_days_before: i32,
    pub is_active: bool,
    pub created_utc: DateTime<Utc>,
    pub updated_utc: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct NewStayRule {
    pub name: String,
    pub min_nights: i32,
    pub max_nights: i32,
    pub site_classes: Vec<String>,
    pub date_ranges: Vec<DateRange>,
    pub ignore_days_before: i32,
    pub is_active: bool,
}

#[derive(Debug, Clone, Default)]
pub struct StayRulePatch {
    pub name: Option<String>,
    pub min_nights: Option<i32>,
    pub max_nights: Option<i32>,
    pub site_classes: Option<Vec<String>>,
    pub date_ranges: Option<Vec<DateRange>>,
    pub ignore_days_before: Option<i32>,
    pub is_active: Option<bool>,
}

impl StayRule {
    pub fn new(campground_id: Uuid, input: NewStayRule) -> Result<Self, AppError> {
        let now = Utc::now();
        let rule = Self {
            id: Uuid::new_v4(),
            campground_id,
            name: input.name.trim().to_string(),
            min_nights: input.min_nights,
            max_nights: input.max_nights,
            site_classes: normalize_classes(input.site_classes),
            date_ranges: input.date_ranges,
            ignore_days_before: input.ignore_days_before,
            is_active: input.is_active,
            created_utc: now,
            updated_utc: now,
        };
        rule.validate()?;
        Ok(rule)
    }

    pub fn apply(&mut self, patch: StayRulePatch) -> Result<(), AppError> {
        if let Some(name) = patch.name {
            self.name = name.trim().to_string();
        }
        if let Some(min) = patch.min_nights {
            self.min_nights = min;
        }
        if let Some(max) = patch.max_nights {
            self.max_nights = max;
        }
        if let Some(classes) = patch.site_classes {
            self.site_classes = normalize_classes(classes);
        }
        if let Some(ranges) = patch.date_ranges {
            self.date_ranges = ranges;
        }
        if let Some(days) = patch.ignore_days_before {
            self.ignore_days_before = days;
        }
        if let Some(active) = patch.is_active {
            self.is_active = active;
        }
        self.updated_utc = Utc::now();
        self.validate()
    }

    pub fn validate(&self) -> Result<(), AppError> {
        require_name(&self.name, "Stay rule")?;
        if self.min_nights < 1 {
            return Err(AppError::BadRequest(anyhow::anyhow!(
                "minNights must be at least 1"
            )));
        }
        if self.min_nights > self.max_nights {
            return Err(AppError::BadRequest(anyhow::anyhow!(
                "minNights ({}) cannot exceed maxNights ({})",
                self.min_nights,
                self.max_nights
            )));
        }
        if self.ignore_days_before < 0 {
            return Err(AppError::BadRequest(anyhow::anyhow!(
                "ignoreDaysBefore cannot be negative"
            )));
        }
        for range in &self.date_ranges {
            range.validate("stay rule dateRanges")?;
        }
        Ok(())
    }

    /// Scope match: site class (or all classes) and date ranges (or undated).
    pub fn applies_to(&self, site_class_id: Option<&str>, stay: &Stay) -> bool {
        let class_match = self.site_classes.is_empty()
            || site_class_id.is_some_and(|class| self.site_classes.iter().any(|c| c == class));
        let date_match =
            self.date_ranges.is_empty() || self.date_ranges.iter().any(|r| r.overlaps(stay));
        class_match && date_match
    }

    pub fn bypassed_for(&self, lead_time_days: i64) -> bool {
        lead_time_days < self.ignore_days_before as i64
    }
}

fn normalize_classes(classes: Vec<String>) -> Vec<String> {
    let mut out: Vec<String> = Vec::with_capacity(classes.len());
    for class in classes {
        let class = class.trim().to_string();
        if !class.is_empty() && !out.contains(&class) {
            out.push(class);
        }
    }
    out
}

impl RuleEntity for StayRule {
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
    use chrono::NaiveDate;

    fn date(s: &str) -> NaiveDate {
        NaiveDate::parse_from_str(s, "%Y-%m-%d").unwrap()
    }

    fn rv_rule() -> NewStayRule {
        NewStayRule {
            name: "RV minimum".to_string(),
            min_nights: 7,
            max_nights: 21,
            site_classes: vec!["RV".to_string()],
            date_ranges: vec![],
            ignore_days_before: 14,
            is_active: true,
        }
    }

    #[test]
    fn test_min_above_max_rejected() {
        let mut input = rv_rule();
        input.min_nights = 10;
        input.max_nights = 5;
        assert!(StayRule::new(Uuid::new_v4(), input).is_err());
    }

    #[test]
    fn test_scope_by_class_and_dates() {
        let stay = Stay::new(date("2026-07-01"), date("2026-07-04")).unwrap();
        let rule = StayRule::new(Uuid::new_v4(), rv_rule()).unwrap();
        assert!(rule.applies_to(Some("RV"), &stay));
        assert!(!rule.applies_to(Some("TENT"), &stay));

        let mut dated = rv_rule();
        dated.date_ranges = vec![DateRange::new(date("2026-12-20"), date("2027-01-02"))];
        let dated = StayRule::new(Uuid::new_v4(), dated).unwrap();
        assert!(!dated.applies_to(Some("RV"), &stay));
    }

    #[test]
    fn test_bypass_is_strictly_less_than() {
        let rule = StayRule::new(Uuid::new_v4(), rv_rule()).unwrap();
        assert!(rule.bypassed_for(5));
        assert!(rule.bypassed_for(13));
        assert!(!rule.bypassed_for(14));
        assert!(!rule.bypassed_for(20));
    }

    #[test]
    fn test_site_classes_deduplicated() {
        let mut input = rv_rule();
        input.site_classes = vec![" RV ".into(), "RV".into(), "".into(), "CABIN".into()];
        let rule = StayRule::new(Uuid::new_v4(), input).unwrap();
        assert_eq!(rule.site_classes, vec!["RV".to_string(), "CABIN".to_string()]);
    }
}
