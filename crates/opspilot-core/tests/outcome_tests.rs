use chrono::{Duration as ChronoDuration, Utc};
use opspilot_core::{accuracy, OutcomeConfig, OutcomeError, OutcomeFilter, OutcomeTracker};
use opspilot_model::{
    ActionStatus, Category, ExecutionResult, MetricValue, OutcomeStatus, Priority, Recommendation,
    Tier,
};
use opspilot_test_utils::{classified, recommendation, FixedMetricSource};
use proptest::prelude::*;
use std::sync::Arc;
use std::time::Duration;

fn executed(rec: &Recommendation) -> opspilot_model::ClassifiedAction {
    let mut action = classified(Tier::Automated, rec.clone(), Duration::from_secs(10));
    action.status = ActionStatus::Completed;
    action.execution_result = Some(ExecutionResult::success("done"));
    action
}

#[test]
fn test_stock_level_accuracy() {
    let score = accuracy(
        &[MetricValue::new("Stock Level", 85.0, "%")],
        &[MetricValue::new("Stock Level", 80.0, "%")],
    )
    .unwrap();
    assert!((score - 0.941).abs() < 1e-3);
}

#[tokio::test(start_paused = true)]
async fn test_follow_up_uses_metric_source() {
    let tracker = OutcomeTracker::new(OutcomeConfig::default());
    let source = Arc::new(FixedMetricSource::new(vec![MetricValue::new("Stock Level", 80.0, "%")]));
    tracker.set_metric_source(source.clone());

    let rec = recommendation(Category::Inventory, Priority::Medium, 0.7, Vec::new());
    let outcome = tracker.start_tracking(&rec, &executed(&rec)).unwrap();
    assert_eq!(outcome.promised.timeframe_minutes, 60);

    tokio::time::sleep(Duration::from_secs(59 * 60)).await;
    assert_eq!(source.calls(), 0);

    tokio::time::sleep(Duration::from_secs(2 * 60)).await;
    assert_eq!(source.calls(), 1);
    let measured = tracker.get(outcome.id).unwrap();
    assert_eq!(measured.status, OutcomeStatus::Completed);
    assert!((measured.accuracy - 80.0 / 85.0).abs() < 1e-9);
}

#[tokio::test(start_paused = true)]
async fn test_manual_update_cancels_follow_up() {
    let tracker = OutcomeTracker::new(OutcomeConfig::default());
    let source = Arc::new(FixedMetricSource::new(vec![MetricValue::new("Stock Level", 10.0, "%")]));
    tracker.set_metric_source(source.clone());

    let rec = recommendation(Category::Labor, Priority::Low, 0.6, Vec::new());
    let outcome = tracker.start_tracking(&rec, &executed(&rec)).unwrap();
    tracker
        .update_outcome(outcome.id, vec![MetricValue::new("Stock Level", 85.0, "%")])
        .unwrap();

    tokio::time::sleep(Duration::from_secs(2 * 60 * 60)).await;
    assert_eq!(source.calls(), 0);
    assert!((tracker.get(outcome.id).unwrap().accuracy - 1.0).abs() < f64::EPSILON);
}

#[tokio::test(start_paused = true)]
async fn test_without_source_outcome_stays_in_progress() {
    let tracker = OutcomeTracker::new(OutcomeConfig::default());
    let rec = recommendation(Category::Safety, Priority::High, 0.9, Vec::new());
    let outcome = tracker.start_tracking(&rec, &executed(&rec)).unwrap();

    tokio::time::sleep(Duration::from_secs(10 * 60)).await;
    assert_eq!(tracker.get(outcome.id).unwrap().status, OutcomeStatus::InProgress);
    assert!(tracker.update_outcome(outcome.id, Vec::new()).is_ok());
}

#[tokio::test(start_paused = true)]
async fn test_stats_filter_and_breakdown() {
    let tracker = OutcomeTracker::new(OutcomeConfig::default());
    let inventory = recommendation(Category::Inventory, Priority::Medium, 0.7, Vec::new());
    let labor = recommendation(Category::Labor, Priority::Medium, 0.7, Vec::new());
    let untouched = recommendation(Category::Labor, Priority::Medium, 0.7, Vec::new());

    let a = tracker.start_tracking(&inventory, &executed(&inventory)).unwrap();
    let b = tracker.start_tracking(&labor, &executed(&labor)).unwrap();
    tracker.start_tracking(&untouched, &executed(&untouched)).unwrap();

    tracker
        .update_outcome(a.id, vec![MetricValue::new("Stock Level", 85.0, "%")])
        .unwrap();
    tracker
        .update_outcome(b.id, vec![MetricValue::new("Stock Level", 40.0, "%")])
        .unwrap();

    let stats = tracker.stats(&OutcomeFilter::new());
    assert_eq!(stats.count, 3);
    assert_eq!(stats.measured, 2);
    assert!((stats.success_rate - 0.5).abs() < f64::EPSILON);
    let expected_mean = (1.0 + 40.0 / 85.0) / 2.0;
    assert!((stats.mean_accuracy - expected_mean).abs() < 1e-9);
    assert_eq!(stats.by_category[&Category::Labor].count, 2);

    let labor_only = tracker.stats(&OutcomeFilter::new().with_category(Category::Labor));
    assert_eq!(labor_only.count, 2);
    assert_eq!(labor_only.measured, 1);

    let future = tracker.stats(&OutcomeFilter::new().since(Utc::now() + ChronoDuration::hours(1)));
    assert_eq!(future.count, 0);
    assert!(future.mean_accuracy.abs() < f64::EPSILON);
}

#[tokio::test(start_paused = true)]
async fn test_unknown_outcome_is_not_found() {
    let tracker = OutcomeTracker::new(OutcomeConfig::default());
    let err = tracker
        .update_outcome(opspilot_model::OutcomeId::new(), Vec::new())
        .unwrap_err();
    assert!(matches!(err, OutcomeError::NotFound(_)));
}

proptest! {
    #[test]
    fn prop_accuracy_in_unit_interval(
        pairs in proptest::collection::vec((-1.0e6f64..1.0e6, -1.0e6f64..1.0e6), 1..8)
    ) {
        let promised: Vec<MetricValue> = pairs
            .iter()
            .enumerate()
            .map(|(i, (p, _))| MetricValue::new(format!("m{i}"), *p, ""))
            .collect();
        let achieved: Vec<MetricValue> = pairs
            .iter()
            .enumerate()
            .map(|(i, (_, a))| MetricValue::new(format!("m{i}"), *a, ""))
            .collect();

        let score = accuracy(&promised, &achieved).unwrap();
        prop_assert!((0.0..=1.0).contains(&score));
    }

    #[test]
    fn prop_equal_values_are_perfect(values in proptest::collection::vec(-1.0e6f64..1.0e6, 1..8)) {
        let metrics: Vec<MetricValue> = values
            .iter()
            .enumerate()
            .map(|(i, v)| MetricValue::new(format!("m{i}"), *v, ""))
            .collect();
        prop_assert_eq!(accuracy(&metrics, &metrics), Some(1.0));
    }
}
