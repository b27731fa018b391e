//! Search, filter, sort and paging over an already-fetched patient list.

use std::cmp::Ordering;
use std::fmt;
use std::str::FromStr;

use chrono::NaiveDate;
use serde::Serialize;

use careplan_db::models::{Patient, Period};

use crate::completeness::{PlanIndex, needs_monthly_plan};

pub const DEFAULT_PER_PAGE: usize = 20;

/// Which patients to keep relative to the current month's plan.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum PlanFilter {
    #[default]
    All,
    NeedsPlan,
    HasPlan,
}

impl FromStr for PlanFilter {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "all" => Ok(Self::All),
            "needs-plan" => Ok(Self::NeedsPlan),
            "has-plan" => Ok(Self::HasPlan),
            other => Err(format!(
                "invalid plan filter {other:?} (expected all, needs-plan, or has-plan)"
            )),
        }
    }
}

impl fmt::Display for PlanFilter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::All => "all",
            Self::NeedsPlan => "needs-plan",
            Self::HasPlan => "has-plan",
        })
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum SortKey {
    #[default]
    Name,
    Age,
    CareLevel,
    /// Registration time.
    Created,
}

impl FromStr for SortKey {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "name" => Ok(Self::Name),
            "age" => Ok(Self::Age),
            "care-level" => Ok(Self::CareLevel),
            "created" => Ok(Self::Created),
            other => Err(format!(
                "invalid sort key {other:?} (expected name, age, care-level, or created)"
            )),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PatientQuery {
    /// Case-insensitive substring matched against name and address.
    pub search: Option<String>,
    pub filter: PlanFilter,
    pub sort: SortKey,
    pub descending: bool,
    /// 1-based.
    pub page: usize,
    pub per_page: usize,
}

impl Default for PatientQuery {
    fn default() -> Self {
        Self {
            search: None,
            filter: PlanFilter::All,
            sort: SortKey::Name,
            descending: false,
            page: 1,
            per_page: DEFAULT_PER_PAGE,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Page<T> {
    pub items: Vec<T>,
    /// Matches before paging.
    pub total: usize,
    pub page: usize,
    pub per_page: usize,
}

impl<T> Page<T> {
    pub fn total_pages(&self) -> usize {
        if self.per_page == 0 {
            return 0;
        }
        self.total.div_ceil(self.per_page)
    }
}

fn matches_search(patient: &Patient, needle: &str) -> bool {
    patient.name.to_lowercase().contains(needle) || patient.address.to_lowercase().contains(needle)
}

/// Run `query` over `patients`. `index` and `current` decide the plan filter;
/// `today` is used for age ordering.
pub fn apply_query(
    patients: Vec<Patient>,
    query: &PatientQuery,
    index: &PlanIndex,
    current: Period,
    today: NaiveDate,
) -> Page<Patient> {
    let needle = query
        .search
        .as_deref()
        .map(|s| s.trim().to_lowercase())
        .filter(|s| !s.is_empty());

    let mut matched: Vec<Patient> = patients
        .into_iter()
        .filter(|p| needle.as_deref().is_none_or(|n| matches_search(p, n)))
        .filter(|p| match query.filter {
            PlanFilter::All => true,
            PlanFilter::NeedsPlan => needs_monthly_plan(p.id, current, index),
            PlanFilter::HasPlan => !needs_monthly_plan(p.id, current, index),
        })
        .collect();

    matched.sort_by(|a, b| {
        let ord = match query.sort {
            SortKey::Name => Ordering::Equal,
            SortKey::Age => a.age_on(today).cmp(&b.age_on(today)),
            SortKey::CareLevel => a.care_level.cmp(&b.care_level),
            SortKey::Created => a.created_at.cmp(&b.created_at),
        }
        .then_with(|| a.name.cmp(&b.name));
        if query.descending { ord.reverse() } else { ord }
    });

    let total = matched.len();
    let per_page = query.per_page.max(1);
    let page = query.page.max(1);
    let items = matched
        .into_iter()
        .skip((page - 1).saturating_mul(per_page))
        .take(per_page)
        .collect();

    Page {
        items,
        total,
        page,
        per_page,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::completeness::PlanIndexEntry;
    use crate::fixtures;

    fn march() -> Period {
        Period::new(3, 2025).unwrap()
    }

    fn today() -> NaiveDate {
        NaiveDate::from_ymd_opt(2025, 3, 20).unwrap()
    }

    fn index() -> PlanIndex {
        fixtures::care_plans()
            .iter()
            .map(|p| {
                (
                    p.patient_id,
                    PlanIndexEntry {
                        plan_id: p.id,
                        last_updated: p.updated_at,
                        period: p.period(),
                        status: p.status,
                    },
                )
            })
            .collect()
    }

    fn names(page: &Page<Patient>) -> Vec<&str> {
        page.items.iter().map(|p| p.name.as_str()).collect()
    }

    #[test]
    fn search_matches_name_or_address() {
        let query = PatientQuery {
            search: Some("渋谷".into()),
            ..Default::default()
        };
        let page = apply_query(fixtures::patients(), &query, &index(), march(), today());
        assert_eq!(names(&page), vec!["田中 花子"]);
    }

    #[test]
    fn filter_by_plan_presence() {
        let needs = PatientQuery {
            filter: PlanFilter::NeedsPlan,
            ..Default::default()
        };
        let page = apply_query(fixtures::patients(), &needs, &index(), march(), today());
        assert_eq!(names(&page), vec!["佐藤 健太"]);

        let has = PatientQuery {
            filter: PlanFilter::HasPlan,
            ..Default::default()
        };
        let page = apply_query(fixtures::patients(), &has, &index(), march(), today());
        assert_eq!(page.total, 2);
    }

    #[test]
    fn sort_by_care_level_descending_and_paginate() {
        let query = PatientQuery {
            sort: SortKey::CareLevel,
            descending: true,
            per_page: 2,
            page: 2,
            ..Default::default()
        };
        let page = apply_query(fixtures::patients(), &query, &PlanIndex::new(), march(), today());
        assert_eq!(page.total, 3);
        assert_eq!(page.total_pages(), 2);
        assert_eq!(names(&page), vec!["田中 花子"]);
    }

    #[test]
    fn page_far_past_the_end_is_empty() {
        let query = PatientQuery {
            page: usize::MAX,
            ..Default::default()
        };
        let page = apply_query(fixtures::patients(), &query, &PlanIndex::new(), march(), today());
        assert!(page.items.is_empty());
        assert_eq!(page.total, 3);
        assert_eq!(page.page, usize::MAX);
    }

    #[test]
    fn sort_by_age() {
        let query = PatientQuery {
            sort: SortKey::Age,
            ..Default::default()
        };
        let page = apply_query(fixtures::patients(), &query, &PlanIndex::new(), march(), today());
        assert_eq!(names(&page), vec!["田中 花子", "鈴木 一郎", "佐藤 健太"]);
    }

    #[test]
    fn parse_filter_and_sort() {
        assert_eq!("needs-plan".parse::<PlanFilter>(), Ok(PlanFilter::NeedsPlan));
        assert_eq!("care-level".parse::<SortKey>(), Ok(SortKey::CareLevel));
        assert!("oldest".parse::<SortKey>().is_err());
    }
}
