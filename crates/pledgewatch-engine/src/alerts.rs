//! Alert rules over credibility reports, submission predictions, and upcoming deadlines.

use chrono::NaiveDate;
use pledgewatch_core::config::AlertConfig;
use pledgewatch_core::{Alert, AlertKind, Promise, Severity};

use crate::credibility::{CredibilityReport, RedFlag};
use crate::risk::{Confidence, SubmissionPrediction};

/// One alert per credibility red flag.
pub fn credibility_alerts(report: &CredibilityReport) -> Vec<Alert> {
    let score = report
        .credibility_score
        .map(|s| format!("{s:.2}"))
        .unwrap_or_else(|| "unrated".to_string());
    report
        .red_flags
        .iter()
        .map(|flag| match flag {
            RedFlag::LowCredibility => Alert::new(
                Severity::High,
                AlertKind::Credibility,
                &report.subject,
                format!("credibility score {score} is below the low-credibility line"),
                "discount forward guidance from this source",
            ),
            RedFlag::FailuresExceedDeliveries => Alert::new(
                Severity::High,
                AlertKind::Credibility,
                &report.subject,
                format!(
                    "{} failed commitments against {} delivered",
                    report.failed,
                    report.on_time + report.late
                ),
                "verify new commitments independently before relying on them",
            ),
            RedFlag::ChronicDelays => Alert::new(
                Severity::Medium,
                AlertKind::Timeline,
                &report.subject,
                format!(
                    "late deliveries average {:.0} days past deadline",
                    report.avg_delay_days.unwrap_or_default()
                ),
                "add the average delay to stated timelines",
            ),
        })
        .collect()
}

/// Risk-band, extension, and low-confidence alerts for one prediction.
pub fn prediction_alerts(prediction: &SubmissionPrediction, config: &AlertConfig) -> Vec<Alert> {
    let subject = format!("{} ({})", prediction.drug_name, prediction.company);
    let p = prediction.approval_probability;
    let mut alerts = Vec::new();

    if p < config.high_risk_below {
        alerts.push(Alert::new(
            Severity::High,
            AlertKind::Regulatory,
            &subject,
            format!("approval probability {:.0}% is in the high-risk band", p * 100.0),
            "prepare for a complete response letter",
        ));
    } else if p < config.medium_risk_below {
        alerts.push(Alert::new(
            Severity::Medium,
            AlertKind::Regulatory,
            &subject,
            format!("approval probability {:.0}% is in the medium-risk band", p * 100.0),
            "watch for label restrictions or post-marketing requirements",
        ));
    }

    if prediction.extension_probability > config.extension_alert_above {
        alerts.push(Alert::new(
            Severity::Medium,
            AlertKind::Timeline,
            &subject,
            format!(
                "review extension likely ({:.0}%); expected decision in {} days",
                prediction.extension_probability * 100.0,
                prediction.expected_timeline_days
            ),
            "plan around a later decision date",
        ));
    }

    if prediction.confidence == Confidence::Lowered {
        let flags: Vec<&str> = prediction.flags.iter().map(|f| f.as_str()).collect();
        alerts.push(Alert::new(
            Severity::Low,
            AlertKind::Regulatory,
            &subject,
            format!("prediction made with lowered confidence: {}", flags.join(", ")),
            "add division reference data or precedent cases",
        ));
    }
    alerts
}

/// A low catalyst alert for each pending promise in `promises`.
pub fn alerts_for_upcoming(promises: &[Promise], as_of: NaiveDate) -> Vec<Alert> {
    promises
        .iter()
        .filter_map(|p| {
            let deadline = p.extracted_deadline?;
            let days = (deadline - as_of).num_days();
            Some(Alert::new(
                Severity::Low,
                AlertKind::Catalyst,
                &p.entity_name,
                format!(
                    "{} commitment due {deadline} ({days} days): {}",
                    p.promise_type, p.deadline_expression
                ),
                format!("check {} disclosures for delivery", p.company),
            ))
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::risk::{PredictedOutcome, ScoreFlag};
    use std::collections::BTreeMap;

    use crate::credibility::Tier;

    fn report(flags: Vec<RedFlag>) -> CredibilityReport {
        CredibilityReport {
            subject: "Jane Doe".into(),
            company: None,
            resolved_total: 3,
            on_time: 1,
            late: 0,
            failed: 2,
            pending: 0,
            overdue_pending: 0,
            credibility_score: Some(1.0 / 3.0),
            avg_delay_days: None,
            red_flags: flags,
            tier: Tier::Low,
            by_promise_type: BTreeMap::new(),
            entities: None,
        }
    }

    fn prediction(p: f64, extension: f64, flags: Vec<ScoreFlag>) -> SubmissionPrediction {
        let confidence = if flags.is_empty() {
            Confidence::Standard
        } else {
            Confidence::Lowered
        };
        SubmissionPrediction {
            submission_id: "s1".into(),
            drug_name: "ACM-101".into(),
            company: "Acme".into(),
            division: "oncology".into(),
            approval_probability: p,
            predicted_outcome: PredictedOutcome::ApprovalWithConditions,
            expected_timeline_days: 200,
            extension_probability: extension,
            deadline_reliability: 1.0 - extension,
            adcom_likely: false,
            adcom_probability: 0.3,
            precedent_refs: vec![],
            factor_breakdown: vec![],
            risk_factors: vec![],
            positive_factors: vec![],
            timeline_factors: vec![],
            common_rejection_reasons: vec![],
            flags,
            confidence,
        }
    }

    #[test]
    fn each_red_flag_raises_one_alert() {
        let alerts = credibility_alerts(&report(vec![
            RedFlag::LowCredibility,
            RedFlag::FailuresExceedDeliveries,
        ]));
        assert_eq!(alerts.len(), 2);
        assert!(alerts.iter().all(|a| a.severity == Severity::High));
        assert!(alerts[1].message.contains("2 failed commitments against 1 delivered"));
        assert!(credibility_alerts(&report(vec![])).is_empty());
    }

    #[test]
    fn risk_bands() {
        let config = AlertConfig::default();
        let high = prediction_alerts(&prediction(0.35, 0.3, vec![]), &config);
        assert_eq!(high.len(), 1);
        assert_eq!(high[0].severity, Severity::High);

        let medium = prediction_alerts(&prediction(0.55, 0.3, vec![]), &config);
        assert_eq!(medium[0].severity, Severity::Medium);

        assert!(prediction_alerts(&prediction(0.75, 0.3, vec![]), &config).is_empty());
    }

    #[test]
    fn extension_and_confidence_alerts() {
        let config = AlertConfig::default();
        let alerts = prediction_alerts(&prediction(0.8, 0.75, vec![ScoreFlag::UnknownDivision]), &config);
        let kinds: Vec<(Severity, AlertKind)> = alerts.iter().map(|a| (a.severity, a.kind)).collect();
        assert_eq!(
            kinds,
            vec![
                (Severity::Medium, AlertKind::Timeline),
                (Severity::Low, AlertKind::Regulatory),
            ]
        );
        assert_eq!(
            alerts[1].message,
            "prediction made with lowered confidence: unknown_division"
        );
        for flag in [ScoreFlag::UnknownDivision, ScoreFlag::PrecedentNotFound] {
            let json = serde_json::to_string(&flag).unwrap();
            assert_eq!(json, format!("\"{}\"", flag.as_str()));
        }
    }
}
