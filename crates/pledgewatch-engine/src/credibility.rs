//! Credibility scoring over a set of promise records.
//!
//! # Formula
//!
//! `score = (on_time × 1.0 + late × 0.5 + failed × 0.0) / resolved`
//!
//! The score is undefined (serialised as `null`) when nothing is resolved,
//! which is distinct from a genuinely poor score. `avg_delay_days` averages
//! the delay of late deliveries only.

use std::collections::{BTreeMap, BTreeSet};

use chrono::NaiveDate;
use pledgewatch_core::config::CredibilityConfig;
use pledgewatch_core::{Promise, PromiseState, PromiseType};
use pledgewatch_store::name_key;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RedFlag {
    LowCredibility,
    FailuresExceedDeliveries,
    ChronicDelays,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Tier {
    High,
    Moderate,
    Low,
    Unrated,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TypeBreakdown {
    pub resolved: usize,
    pub on_time: usize,
    pub late: usize,
    pub failed: usize,
    pub on_time_rate: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CredibilityReport {
    /// Entity or company the report is about.
    pub subject: String,
    pub company: Option<String>,
    pub resolved_total: usize,
    pub on_time: usize,
    pub late: usize,
    pub failed: usize,
    pub pending: usize,
    /// Pending with a deadline already behind `as_of`.
    pub overdue_pending: usize,
    pub credibility_score: Option<f64>,
    pub avg_delay_days: Option<f64>,
    pub red_flags: Vec<RedFlag>,
    pub tier: Tier,
    pub by_promise_type: BTreeMap<PromiseType, TypeBreakdown>,
    /// Distinct people, for company reports.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub entities: Option<usize>,
}

#[derive(Default)]
struct Tally {
    on_time: usize,
    late: usize,
    failed: usize,
}

impl Tally {
    fn add(&mut self, state: PromiseState) {
        match state {
            PromiseState::DeliveredOnTime => self.on_time += 1,
            PromiseState::DeliveredLate => self.late += 1,
            PromiseState::Failed => self.failed += 1,
            PromiseState::Pending => {}
        }
    }

    fn resolved(&self) -> usize {
        self.on_time + self.late + self.failed
    }

    fn score(&self) -> Option<f64> {
        let resolved = self.resolved();
        (resolved > 0).then(|| (self.on_time as f64 + 0.5 * self.late as f64) / resolved as f64)
    }
}

pub struct CredibilityScorer<'a> {
    config: &'a CredibilityConfig,
}

impl<'a> CredibilityScorer<'a> {
    pub fn new(config: &'a CredibilityConfig) -> Self {
        Self { config }
    }

    pub fn tier(&self, score: Option<f64>) -> Tier {
        match score {
            None => Tier::Unrated,
            Some(s) if s >= self.config.high_tier => Tier::High,
            Some(s) if s >= self.config.moderate_tier => Tier::Moderate,
            Some(_) => Tier::Low,
        }
    }

    /// Score one entity's promises.
    pub fn score(
        &self,
        subject: &str,
        company: Option<&str>,
        promises: &[Promise],
        as_of: NaiveDate,
    ) -> CredibilityReport {
        let mut tally = Tally::default();
        let mut by_type: BTreeMap<PromiseType, Tally> = BTreeMap::new();
        let mut delays = Vec::new();
        let mut pending = 0;
        let mut overdue_pending = 0;

        for p in promises {
            tally.add(p.state);
            by_type.entry(p.promise_type).or_default().add(p.state);
            match p.state {
                PromiseState::Pending => {
                    pending += 1;
                    if p.is_overdue(as_of) {
                        overdue_pending += 1;
                    }
                }
                PromiseState::DeliveredLate => {
                    delays.push(p.resolution_delay_days.unwrap_or(0) as f64);
                }
                _ => {}
            }
        }

        let credibility_score = tally.score();
        let avg_delay_days =
            (!delays.is_empty()).then(|| delays.iter().sum::<f64>() / delays.len() as f64);

        let mut red_flags = Vec::new();
        if credibility_score.is_some_and(|s| s < self.config.low_score) {
            red_flags.push(RedFlag::LowCredibility);
        }
        if tally.failed > tally.on_time + tally.late {
            red_flags.push(RedFlag::FailuresExceedDeliveries);
        }
        if avg_delay_days.is_some_and(|d| d > self.config.chronic_delay_days) {
            red_flags.push(RedFlag::ChronicDelays);
        }

        let by_promise_type = by_type
            .into_iter()
            .filter(|(_, t)| t.resolved() > 0)
            .map(|(ty, t)| {
                let breakdown = TypeBreakdown {
                    resolved: t.resolved(),
                    on_time: t.on_time,
                    late: t.late,
                    failed: t.failed,
                    on_time_rate: Some(t.on_time as f64 / t.resolved() as f64),
                };
                (ty, breakdown)
            })
            .collect();

        CredibilityReport {
            subject: subject.to_string(),
            company: company.map(str::to_string),
            resolved_total: tally.resolved(),
            on_time: tally.on_time,
            late: tally.late,
            failed: tally.failed,
            pending,
            overdue_pending,
            credibility_score,
            avg_delay_days,
            red_flags,
            tier: self.tier(credibility_score),
            by_promise_type,
            entities: None,
        }
    }

    /// Score every promise of a company, counting the distinct people behind them.
    pub fn score_company(
        &self,
        company: &str,
        promises: &[Promise],
        as_of: NaiveDate,
    ) -> CredibilityReport {
        let mut report = self.score(company, Some(company), promises, as_of);
        let people: BTreeSet<String> = promises.iter().map(|p| name_key(&p.entity_name)).collect();
        report.entities = Some(people.len());
        report
    }
}
