//! Risk factor evaluation
//!
//! Pure functions over (current event, 30-day history, config). Given the
//! same inputs the analyzer always produces the same score and factor set,
//! which is what makes analyses reviewable after the fact.
//!
//! The history slice is expected to contain the current transaction (it has
//! already committed); comparisons against "historical" behavior exclude it
//! by transaction id.

use chrono::Duration;
use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;
use serde_json::json;

use playgate_core::{
    AlertType, Severity, Transaction, TransactionCreated, TransactionStatus, TransactionType,
};

use crate::config::AmlConfig;

// Factor identifiers, stable in stored factor blobs
pub const FACTOR_LARGE_VALUE: &str = "large_value";
pub const FACTOR_AMOUNT_PATTERN: &str = "amount_pattern";
pub const FACTOR_TIME_PATTERN: &str = "time_pattern";
pub const FACTOR_FREQUENCY: &str = "frequency";
pub const FACTOR_RAPID_WITHDRAWAL: &str = "rapid_withdrawal";
pub const FACTOR_COMPOSITE: &str = "composite";

// Minimum history before pattern factors engage
const AMOUNT_MIN_RECORDS: usize = 5;
const TIME_MIN_RECORDS: usize = 5;

const AMOUNT_Z_THRESHOLD: f64 = 2.5;
const SIGMA_FLOOR_RATIO: f64 = 0.01;
const RANGE_MARGIN: f64 = 0.5;
const TIME_ACTIVITY_RATIO: f64 = 0.10;
const FREQUENCY_RATIO: f64 = 3.0;
const FREQUENCY_MIN_COUNT: usize = 4;
const RAPID_MAGNITUDE_RATIO: f64 = 0.8;
const RAPID_BET_CONSUMPTION_RATIO: f64 = 0.25;

/// One factor's verdict
#[derive(Debug, Clone)]
pub struct FactorOutcome {
    pub kind: &'static str,
    pub detected: bool,
    pub score: f64,
    pub report_required: bool,
    pub details: serde_json::Value,
}

/// Full analysis of one transaction
#[derive(Debug, Clone)]
pub struct Analysis {
    /// Clamped to [0, 100]
    pub score: f64,
    /// Detected factors only
    pub factors: Vec<FactorOutcome>,
    pub report_required: bool,
    pub alert_type: AlertType,
    /// None means no alert is emitted
    pub severity: Option<Severity>,
}

/// Evaluate every factor and combine.
pub fn evaluate(event: &TransactionCreated, history: &[Transaction], config: &AmlConfig) -> Analysis {
    // Only applied history informs behavior; rolled-back entries are noise.
    let completed: Vec<&Transaction> = history
        .iter()
        .filter(|t| t.status == TransactionStatus::Completed)
        .collect();

    let mut factors = Vec::new();
    for outcome in [
        large_value(event, config),
        amount_pattern(event, &completed),
        time_pattern(event, &completed),
        frequency(event, &completed),
        rapid_withdrawal(event, &completed),
    ] {
        if outcome.detected {
            factors.push(outcome);
        }
    }

    let base_score: f64 = factors.iter().map(|f| f.score).sum();
    if let Some(composite) = composite_bonus(&factors, base_score) {
        factors.push(composite);
    }

    let score = factors
        .iter()
        .map(|f| f.score)
        .sum::<f64>()
        .clamp(0.0, 100.0);
    let report_required = factors.iter().any(|f| f.report_required);
    let fired = factors.iter().filter(|f| f.kind != FACTOR_COMPOSITE).count();

    Analysis {
        score,
        alert_type: alert_type(&factors),
        severity: severity(score, fired, report_required),
        report_required,
        factors,
    }
}

fn dec_f64(value: Decimal) -> f64 {
    value.to_f64().unwrap_or(0.0)
}

/// Large-value threshold: flat +40 and a regulatory report.
fn large_value(event: &TransactionCreated, config: &AmlConfig) -> FactorOutcome {
    let threshold = config.threshold_for(event.currency.code());
    let detected = event.amount >= threshold;
    FactorOutcome {
        kind: FACTOR_LARGE_VALUE,
        detected,
        score: if detected { 40.0 } else { 0.0 },
        report_required: detected,
        details: json!({
            "amount": event.amount.to_string(),
            "threshold": threshold.to_string(),
            "currency": event.currency.code(),
        }),
    }
}

fn abstain(kind: &'static str, reason: &str) -> FactorOutcome {
    FactorOutcome {
        kind,
        detected: false,
        score: 0.0,
        report_required: false,
        details: json!({ "abstained": reason }),
    }
}

/// Amount deviation against same-type history: z-score past 2.5 sigma (with
/// the sigma floored at 1% of the mean), or falling outside the historical
/// [min, max] range by more than 50%.
fn amount_pattern(event: &TransactionCreated, history: &[&Transaction]) -> FactorOutcome {
    let amounts: Vec<f64> = history
        .iter()
        .filter(|t| t.id != event.transaction_id && t.tx_type == event.tx_type)
        .map(|t| dec_f64(t.amount))
        .collect();

    if amounts.len() < AMOUNT_MIN_RECORDS {
        return abstain(FACTOR_AMOUNT_PATTERN, "insufficient history");
    }

    let mean = amounts.iter().sum::<f64>() / amounts.len() as f64;
    let variance = amounts.iter().map(|a| (a - mean).powi(2)).sum::<f64>() / amounts.len() as f64;
    let sigma = variance.sqrt().max(SIGMA_FLOOR_RATIO * mean).max(f64::MIN_POSITIVE);

    let current = dec_f64(event.amount);
    let z = (current - mean).abs() / sigma;

    let min = amounts.iter().cloned().fold(f64::INFINITY, f64::min);
    let max = amounts.iter().cloned().fold(f64::NEG_INFINITY, f64::max);
    let outside_range = current < min * (1.0 - RANGE_MARGIN) || current > max * (1.0 + RANGE_MARGIN);

    let detected = z > AMOUNT_Z_THRESHOLD || outside_range;
    let score = if z > AMOUNT_Z_THRESHOLD {
        (10.0 + (z - AMOUNT_Z_THRESHOLD) * 5.0).min(25.0)
    } else if outside_range {
        15.0
    } else {
        0.0
    };

    FactorOutcome {
        kind: FACTOR_AMOUNT_PATTERN,
        detected,
        score,
        report_required: false,
        details: json!({
            "current": current,
            "mean": mean,
            "sigma": sigma,
            "z_score": z,
            "historical_min": min,
            "historical_max": max,
            "outside_range": outside_range,
        }),
    }
}

/// Time-of-day/weekday deviation: the transaction lands in an hour bin that
/// is empty or carries under 10% of the player's activity, on an unusual
/// weekday too (or in a completely unseen hour).
fn time_pattern(event: &TransactionCreated, history: &[&Transaction]) -> FactorOutcome {
    use chrono::{Datelike, Timelike};

    let past: Vec<&&Transaction> = history
        .iter()
        .filter(|t| t.id != event.transaction_id)
        .collect();
    if past.len() < TIME_MIN_RECORDS {
        return abstain(FACTOR_TIME_PATTERN, "insufficient history");
    }

    let total = past.len() as f64;
    let min_count = (total * TIME_ACTIVITY_RATIO).max(1.0);

    let mut hour_bins = [0usize; 24];
    let mut day_bins = [0usize; 7];
    for t in &past {
        hour_bins[t.created_at.hour() as usize] += 1;
        day_bins[t.created_at.weekday().num_days_from_monday() as usize] += 1;
    }

    let hour = event.created_at.hour() as usize;
    let day = event.created_at.weekday().num_days_from_monday() as usize;

    let unusual_hour = (hour_bins[hour] as f64) < min_count;
    let unusual_day = (day_bins[day] as f64) < min_count;
    let empty_hour = hour_bins[hour] == 0;

    let detected = (unusual_hour && unusual_day) || (unusual_hour && empty_hour);

    FactorOutcome {
        kind: FACTOR_TIME_PATTERN,
        detected,
        score: if detected { 15.0 } else { 0.0 },
        report_required: false,
        details: json!({
            "hour": hour,
            "hour_count": hour_bins[hour],
            "weekday": day,
            "weekday_count": day_bins[day],
            "min_expected": min_count,
        }),
    }
}

/// Burst detection: the last 24 hours hold more than three times the
/// player's daily average, with at least four transactions. Abstains when
/// there is no history older than the 24-hour window to average over.
fn frequency(event: &TransactionCreated, history: &[&Transaction]) -> FactorOutcome {
    let day_ago = event.created_at - Duration::hours(24);
    let week_ago = event.created_at - Duration::days(7);
    let month_ago = event.created_at - Duration::days(30);

    let f24 = history.iter().filter(|t| t.created_at > day_ago).count();
    let older = history.iter().filter(|t| t.created_at <= day_ago).count();
    if older == 0 {
        return abstain(FACTOR_FREQUENCY, "no history beyond 24h");
    }

    let count_7d = history.iter().filter(|t| t.created_at > week_ago).count();
    let count_30d = history.iter().filter(|t| t.created_at > month_ago).count();
    let f7 = count_7d as f64 / 7.0;
    let f30 = count_30d as f64 / 30.0;
    let baseline = f7.max(f30);

    let detected = (f24 as f64) > FREQUENCY_RATIO * baseline && f24 >= FREQUENCY_MIN_COUNT;

    FactorOutcome {
        kind: FACTOR_FREQUENCY,
        detected,
        score: if detected { 20.0 } else { 0.0 },
        report_required: false,
        details: json!({
            "count_24h": f24,
            "daily_avg_7d": f7,
            "daily_avg_30d": f30,
            "baseline": baseline,
        }),
    }
}

/// Deposit promptly pulled back out: the withdrawal is covered (>= 80%) by
/// deposits from the preceding 24 hours on the same wallet, and intervening
/// bets consumed no meaningful fraction of those deposits.
fn rapid_withdrawal(event: &TransactionCreated, history: &[&Transaction]) -> FactorOutcome {
    if event.tx_type != TransactionType::Withdrawal {
        return abstain(FACTOR_RAPID_WITHDRAWAL, "not a withdrawal");
    }

    let day_ago = event.created_at - Duration::hours(24);
    let window: Vec<&&Transaction> = history
        .iter()
        .filter(|t| {
            t.id != event.transaction_id
                && t.wallet_id == event.wallet_id
                && t.created_at > day_ago
        })
        .collect();

    let deposits: f64 = window
        .iter()
        .filter(|t| t.tx_type == TransactionType::Deposit)
        .map(|t| dec_f64(t.amount))
        .sum();
    if deposits <= 0.0 {
        return abstain(FACTOR_RAPID_WITHDRAWAL, "no recent deposit");
    }

    let bets: f64 = window
        .iter()
        .filter(|t| t.tx_type == TransactionType::Bet)
        .map(|t| dec_f64(t.amount))
        .sum();

    let withdrawal = dec_f64(event.amount);
    let covered = deposits >= RAPID_MAGNITUDE_RATIO * withdrawal;
    let played_through = bets >= RAPID_BET_CONSUMPTION_RATIO * deposits;
    let detected = covered && !played_through;

    FactorOutcome {
        kind: FACTOR_RAPID_WITHDRAWAL,
        detected,
        score: if detected { 25.0 } else { 0.0 },
        report_required: false,
        details: json!({
            "withdrawal": withdrawal,
            "deposits_24h": deposits,
            "bets_24h": bets,
        }),
    }
}

/// Combinations of factors represent more risk than each alone: up to +40
/// extra once two or more fire, scaled by count and accumulated severity.
fn composite_bonus(fired: &[FactorOutcome], base_score: f64) -> Option<FactorOutcome> {
    if fired.len() < 2 {
        return None;
    }
    let extra = (15.0 * (fired.len() as f64 - 1.0) + 0.1 * base_score).min(40.0);
    Some(FactorOutcome {
        kind: FACTOR_COMPOSITE,
        detected: true,
        score: extra,
        report_required: false,
        details: json!({
            "factors_fired": fired.iter().map(|f| f.kind).collect::<Vec<_>>(),
            "base_score": base_score,
        }),
    })
}

fn alert_type(factors: &[FactorOutcome]) -> AlertType {
    if factors.iter().any(|f| f.kind == FACTOR_LARGE_VALUE) {
        AlertType::Threshold
    } else {
        AlertType::Pattern
    }
}

/// Alert emission rule. Between 20 and 40 an alert needs corroboration
/// from a second factor; a regulatory-report factor never goes out below
/// high severity.
fn severity(score: f64, fired: usize, report_required: bool) -> Option<Severity> {
    let base = if score >= 80.0 {
        Some(Severity::Critical)
    } else if score >= 60.0 {
        Some(Severity::High)
    } else if score >= 40.0 {
        Some(Severity::Medium)
    } else if score >= 20.0 && fired >= 2 {
        Some(Severity::Low)
    } else {
        None
    };

    match base {
        Some(s) if report_required && s < Severity::High => Some(Severity::High),
        other => other,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{DateTime, Duration, TimeZone, Utc};
    use playgate_core::Currency;
    use rust_decimal_macros::dec;
    use uuid::Uuid;

    fn base_time() -> DateTime<Utc> {
        // A Wednesday, 14:00 UTC
        Utc.with_ymd_and_hms(2026, 3, 4, 14, 0, 0).unwrap()
    }

    fn tx(
        tx_type: TransactionType,
        amount: Decimal,
        created_at: DateTime<Utc>,
        wallet_id: Uuid,
    ) -> Transaction {
        Transaction {
            id: Uuid::new_v4(),
            reference_id: Uuid::new_v4().to_string(),
            wallet_id,
            player_id: "p-1".into(),
            partner_id: Uuid::new_v4(),
            tx_type,
            amount,
            currency: Currency::Usd,
            status: TransactionStatus::Completed,
            original_balance: Decimal::ZERO,
            updated_balance: Decimal::ZERO,
            original_transaction_id: None,
            game_id: None,
            round_id: None,
            metadata: None,
            created_at,
        }
    }

    fn event(
        tx_type: TransactionType,
        amount: Decimal,
        created_at: DateTime<Utc>,
        wallet_id: Uuid,
    ) -> TransactionCreated {
        TransactionCreated {
            transaction_id: Uuid::new_v4(),
            reference_id: "ref".into(),
            wallet_id,
            player_id: "p-1".into(),
            partner_id: Uuid::new_v4(),
            tx_type,
            currency: Currency::Usd,
            amount,
            updated_balance: amount,
            game_id: None,
            round_id: None,
            created_at,
        }
    }

    #[test]
    fn test_large_value_fires_at_threshold() {
        let config = AmlConfig::default();
        let wallet = Uuid::new_v4();
        let e = event(TransactionType::Deposit, dec!(10_000), base_time(), wallet);
        let outcome = large_value(&e, &config);
        assert!(outcome.detected);
        assert_eq!(outcome.score, 40.0);
        assert!(outcome.report_required);

        let e = event(TransactionType::Deposit, dec!(9_999.99), base_time(), wallet);
        assert!(!large_value(&e, &config).detected);
    }

    #[test]
    fn test_amount_pattern_abstains_on_thin_history() {
        let wallet = Uuid::new_v4();
        let history: Vec<Transaction> = (0..3)
            .map(|i| {
                tx(
                    TransactionType::Deposit,
                    dec!(100),
                    base_time() - Duration::days(i),
                    wallet,
                )
            })
            .collect();
        let refs: Vec<&Transaction> = history.iter().collect();
        let e = event(TransactionType::Deposit, dec!(5_000), base_time(), wallet);
        assert!(!amount_pattern(&e, &refs).detected);
    }

    #[test]
    fn test_amount_pattern_detects_outlier() {
        let wallet = Uuid::new_v4();
        let history: Vec<Transaction> = (0..10)
            .map(|i| {
                tx(
                    TransactionType::Deposit,
                    dec!(100),
                    base_time() - Duration::days(i + 1),
                    wallet,
                )
            })
            .collect();
        let refs: Vec<&Transaction> = history.iter().collect();

        let e = event(TransactionType::Deposit, dec!(5_000), base_time(), wallet);
        let outcome = amount_pattern(&e, &refs);
        assert!(outcome.detected);
        assert_eq!(outcome.score, 25.0);

        // A typical amount stays quiet
        let e = event(TransactionType::Deposit, dec!(101), base_time(), wallet);
        assert!(!amount_pattern(&e, &refs).detected);
    }

    #[test]
    fn test_amount_pattern_only_considers_same_type() {
        let wallet = Uuid::new_v4();
        // Plenty of bets, but no deposit history
        let history: Vec<Transaction> = (0..10)
            .map(|i| {
                tx(
                    TransactionType::Bet,
                    dec!(10),
                    base_time() - Duration::days(i + 1),
                    wallet,
                )
            })
            .collect();
        let refs: Vec<&Transaction> = history.iter().collect();
        let e = event(TransactionType::Deposit, dec!(5_000), base_time(), wallet);
        assert!(!amount_pattern(&e, &refs).detected);
    }

    #[test]
    fn test_time_pattern_detects_unseen_hour() {
        let wallet = Uuid::new_v4();
        // Activity always at 14:00 on weekdays
        let history: Vec<Transaction> = (0..10)
            .map(|i| {
                tx(
                    TransactionType::Bet,
                    dec!(10),
                    base_time() - Duration::days(i + 1),
                    wallet,
                )
            })
            .collect();
        let refs: Vec<&Transaction> = history.iter().collect();

        // 03:00 was never seen
        let night = Utc.with_ymd_and_hms(2026, 3, 4, 3, 0, 0).unwrap();
        let e = event(TransactionType::Bet, dec!(10), night, wallet);
        assert!(time_pattern(&e, &refs).detected);

        // 14:00 is the player's normal slot
        let e = event(TransactionType::Bet, dec!(10), base_time(), wallet);
        assert!(!time_pattern(&e, &refs).detected);
    }

    #[test]
    fn test_frequency_burst_detection() {
        let wallet = Uuid::new_v4();
        let mut history: Vec<Transaction> = Vec::new();
        // Sparse older history: one transaction a week
        for week in 1..4 {
            history.push(tx(
                TransactionType::Bet,
                dec!(10),
                base_time() - Duration::days(7 * week),
                wallet,
            ));
        }
        // Burst today
        for hour in 0..5 {
            history.push(tx(
                TransactionType::Bet,
                dec!(10),
                base_time() - Duration::hours(hour),
                wallet,
            ));
        }
        let refs: Vec<&Transaction> = history.iter().collect();
        let e = event(TransactionType::Bet, dec!(10), base_time(), wallet);
        assert!(frequency(&e, &refs).detected);
    }

    #[test]
    fn test_frequency_abstains_without_older_history() {
        let wallet = Uuid::new_v4();
        let history: Vec<Transaction> = (0..6)
            .map(|i| {
                tx(
                    TransactionType::Bet,
                    dec!(10),
                    base_time() - Duration::hours(i),
                    wallet,
                )
            })
            .collect();
        let refs: Vec<&Transaction> = history.iter().collect();
        let e = event(TransactionType::Bet, dec!(10), base_time(), wallet);
        assert!(!frequency(&e, &refs).detected);
    }

    #[test]
    fn test_frequency_requires_minimum_count() {
        let wallet = Uuid::new_v4();
        let mut history = vec![tx(
            TransactionType::Bet,
            dec!(10),
            base_time() - Duration::days(20),
            wallet,
        )];
        // Three in 24h: above the ratio but under the minimum count
        for hour in 0..3 {
            history.push(tx(
                TransactionType::Bet,
                dec!(10),
                base_time() - Duration::hours(hour),
                wallet,
            ));
        }
        let refs: Vec<&Transaction> = history.iter().collect();
        let e = event(TransactionType::Bet, dec!(10), base_time(), wallet);
        assert!(!frequency(&e, &refs).detected);
    }

    #[test]
    fn test_rapid_withdrawal_detected() {
        let wallet = Uuid::new_v4();
        let history = vec![tx(
            TransactionType::Deposit,
            dec!(1_000),
            base_time() - Duration::hours(3),
            wallet,
        )];
        let refs: Vec<&Transaction> = history.iter().collect();
        let e = event(TransactionType::Withdrawal, dec!(900), base_time(), wallet);
        assert!(rapid_withdrawal(&e, &refs).detected);
    }

    #[test]
    fn test_rapid_withdrawal_defeated_by_play_through() {
        let wallet = Uuid::new_v4();
        let history = vec![
            tx(
                TransactionType::Deposit,
                dec!(1_000),
                base_time() - Duration::hours(3),
                wallet,
            ),
            tx(
                TransactionType::Bet,
                dec!(400),
                base_time() - Duration::hours(2),
                wallet,
            ),
        ];
        let refs: Vec<&Transaction> = history.iter().collect();
        let e = event(TransactionType::Withdrawal, dec!(900), base_time(), wallet);
        assert!(!rapid_withdrawal(&e, &refs).detected);
    }

    #[test]
    fn test_rapid_withdrawal_needs_coverage() {
        let wallet = Uuid::new_v4();
        let history = vec![tx(
            TransactionType::Deposit,
            dec!(100),
            base_time() - Duration::hours(3),
            wallet,
        )];
        let refs: Vec<&Transaction> = history.iter().collect();
        let e = event(TransactionType::Withdrawal, dec!(900), base_time(), wallet);
        assert!(!rapid_withdrawal(&e, &refs).detected);
    }

    #[test]
    fn test_severity_buckets_and_low_corroboration() {
        assert_eq!(severity(85.0, 1, false), Some(Severity::Critical));
        assert_eq!(severity(65.0, 1, false), Some(Severity::High));
        assert_eq!(severity(45.0, 1, false), Some(Severity::Medium));
        assert_eq!(severity(25.0, 2, false), Some(Severity::Low));
        assert_eq!(severity(25.0, 1, false), None);
        assert_eq!(severity(10.0, 3, false), None);
    }

    #[test]
    fn test_report_required_escalates_to_high() {
        // A lone large-value hit scores 40 (medium) but must page a human
        assert_eq!(severity(40.0, 1, true), Some(Severity::High));
        // Already critical stays critical
        assert_eq!(severity(85.0, 1, true), Some(Severity::Critical));
    }

    #[test]
    fn test_evaluate_is_deterministic() {
        let wallet = Uuid::new_v4();
        let config = AmlConfig::default();
        let history: Vec<Transaction> = (0..8)
            .map(|i| {
                tx(
                    TransactionType::Deposit,
                    dec!(100),
                    base_time() - Duration::days(i + 1),
                    wallet,
                )
            })
            .collect();
        let e = event(TransactionType::Deposit, dec!(12_000), base_time(), wallet);

        let a = evaluate(&e, &history, &config);
        let b = evaluate(&e, &history, &config);
        assert_eq!(a.score, b.score);
        assert_eq!(
            a.factors.iter().map(|f| f.kind).collect::<Vec<_>>(),
            b.factors.iter().map(|f| f.kind).collect::<Vec<_>>()
        );
    }

    #[test]
    fn test_evaluate_first_large_deposit() {
        // Scenario: first-ever transaction of 15000 USD. Only the threshold
        // factor can fire; the alert goes out at high severity with a
        // report attached.
        let wallet = Uuid::new_v4();
        let config = AmlConfig::default();
        let e = event(TransactionType::Deposit, dec!(15_000), base_time(), wallet);
        let current = tx(TransactionType::Deposit, dec!(15_000), base_time(), wallet);

        let analysis = evaluate(&e, std::slice::from_ref(&current), &config);
        assert_eq!(analysis.score, 40.0);
        assert_eq!(analysis.alert_type, AlertType::Threshold);
        assert_eq!(analysis.severity, Some(Severity::High));
        assert!(analysis.report_required);
    }

    #[test]
    fn test_evaluate_quiet_history_scores_zero() {
        let wallet = Uuid::new_v4();
        let config = AmlConfig::default();
        let e = event(TransactionType::Deposit, dec!(100.00), base_time(), wallet);
        let analysis = evaluate(&e, &[], &config);
        assert_eq!(analysis.score, 0.0);
        assert_eq!(analysis.severity, None);
        assert!(analysis.factors.is_empty());
    }

    #[test]
    fn test_composite_fires_on_two_factors() {
        let fired = vec![
            FactorOutcome {
                kind: FACTOR_LARGE_VALUE,
                detected: true,
                score: 40.0,
                report_required: true,
                details: json!({}),
            },
            FactorOutcome {
                kind: FACTOR_RAPID_WITHDRAWAL,
                detected: true,
                score: 25.0,
                report_required: false,
                details: json!({}),
            },
        ];
        let bonus = composite_bonus(&fired, 65.0).unwrap();
        assert_eq!(bonus.score, 15.0 + 6.5);
        assert!(composite_bonus(&fired[..1], 40.0).is_none());
    }
}
