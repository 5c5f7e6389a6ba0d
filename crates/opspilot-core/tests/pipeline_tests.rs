use opspilot_core::{
    AlertFilter, AnalysisContract, OpsPipeline, OutcomeFilter, PipelineConfig, PipelineError,
};
use opspilot_model::{
    ActionStatus, Category, DataFactor, ImpactScope, Issue, MetricValue, OutcomeStatus, Severity,
    Tier,
};
use opspilot_test_utils::{
    context, safety_issue, setup_test_pipeline, FailingAnalyzer, FixedMetricSource,
    PanickingAnalyzer, RecordingExecutor, StaticAnalyzer,
};
use pretty_assertions::assert_eq;
use std::sync::Arc;
use std::time::Duration;

fn analyzers(list: Vec<Arc<dyn AnalysisContract>>) -> Vec<Arc<dyn AnalysisContract>> {
    list
}

#[tokio::test]
async fn test_confident_multi_zone_safety_issue_is_critical_warehouse_alert() {
    let pipeline = setup_test_pipeline();
    let issue = safety_issue(0.85, &["zone-a", "zone-b", "zone-c"]);
    let reports = pipeline
        .run_analyses(
            &context(),
            &analyzers(vec![Arc::new(StaticAnalyzer::new("safety", vec![issue]))]),
        )
        .await;

    let alerts = pipeline.detect_alerts(&context(), &reports);
    assert_eq!(alerts.len(), 1);
    let alert = &alerts[0];
    assert_eq!(alert.severity, Severity::Critical);
    assert_eq!(alert.impact.scope, ImpactScope::Warehouse);
    assert!((alert.impact.magnitude - 1.0).abs() < 1e-9);
    assert_eq!(alert.impact.time_window_minutes, 5);
}

#[tokio::test]
async fn test_same_issue_from_two_analyzers_yields_one_alert() {
    let pipeline = setup_test_pipeline();
    let low = Issue::new(Category::Maintenance, "Low battery", 0.6)
        .with_entities(["R-7", "R-3"])
        .with_factor(DataFactor::new("battery", 14.0).with_unit("%"));
    let high = Issue::new(Category::Maintenance, "Low battery", 0.9).with_entities(["R-3", "R-7"]);

    let reports = pipeline
        .run_analyses(
            &context(),
            &analyzers(vec![
                Arc::new(StaticAnalyzer::new("fleet", vec![low])),
                Arc::new(StaticAnalyzer::new("battery", vec![high])),
            ]),
        )
        .await;
    let alerts = pipeline.detect_alerts(&context(), &reports);

    assert_eq!(alerts.len(), 1);
    assert!((alerts[0].confidence - 0.9).abs() < f64::EPSILON);
    assert_eq!(alerts[0].explainability.data_factors.len(), 1);

    // Detecting the same signature in a later cycle refreshes, never duplicates
    let again = pipeline.detect_alerts(&context(), &reports);
    assert_eq!(again[0].id, alerts[0].id);
    assert_eq!(pipeline.get_active_alerts(&AlertFilter::new()).len(), 1);
}

#[tokio::test]
async fn test_failing_analyzers_degrade_alone() {
    let pipeline = setup_test_pipeline();
    let reports = pipeline
        .run_analyses(
            &context(),
            &analyzers(vec![
                Arc::new(FailingAnalyzer("inventory".into())),
                Arc::new(StaticAnalyzer::new(
                    "labor",
                    vec![Issue::new(Category::Labor, "Short shift", 0.7)],
                )),
                Arc::new(PanickingAnalyzer("slotting".into())),
            ]),
        )
        .await;

    let names: Vec<&str> = reports.iter().map(|r| r.analyzer.as_str()).collect();
    assert_eq!(names, ["inventory", "labor", "slotting"]);
    assert!(reports[0].is_degraded());
    assert!(reports[0].result.issues.is_empty());
    assert!(reports[0].result.confidence.abs() < f64::EPSILON);
    assert!(!reports[1].is_degraded());
    assert_eq!(reports[1].result.issues.len(), 1);
    assert!(reports[2].is_degraded());
}

#[tokio::test]
async fn test_analyzer_output_is_bounded() {
    let pipeline = OpsPipeline::new(PipelineConfig::new().with_max_issues(2)).unwrap();
    let issues = (0..5)
        .map(|i| Issue::new(Category::General, format!("issue {i}"), f64::from(i) / 10.0))
        .collect();
    let reports = pipeline
        .run_analyses(&context(), &analyzers(vec![Arc::new(StaticAnalyzer::new("noisy", issues))]))
        .await;
    let titles: Vec<&str> = reports[0].result.issues.iter().map(|i| i.title.as_str()).collect();
    assert_eq!(titles, ["issue 4", "issue 3"]);
}

#[tokio::test]
async fn test_every_alert_gets_a_recommendation() {
    let pipeline = setup_test_pipeline();
    let issues: Vec<Issue> = Category::ALL
        .iter()
        .map(|c| Issue::new(*c, format!("{c} trouble"), 0.65).with_zones(["zone-a"]))
        .collect();
    let alerts = pipeline.alerts();
    let detected = pipeline.detect_alerts(
        &context(),
        &pipeline
            .run_analyses(
                &context(),
                &analyzers(vec![Arc::new(StaticAnalyzer::new("all", issues))]),
            )
            .await,
    );
    assert_eq!(alerts.len(), Category::ALL.len());

    for alert in &detected {
        let recs = pipeline.generate_recommendations(alert, &context());
        assert!(recs[0].is_primary());
        assert!(!recs[0].actions.is_empty());
        assert_eq!(pipeline.recommendations().for_alert(alert.id).len(), recs.len());
    }
}

#[tokio::test(start_paused = true)]
async fn test_cycle_queues_automated_actions_and_tracks_outcomes() {
    let pipeline = setup_test_pipeline();
    let source = Arc::new(FixedMetricSource::new(vec![
        MetricValue::new("Operational Efficiency", 84.0, "%"),
    ]));
    pipeline.set_metric_source(source.clone());

    let issue = Issue::new(Category::General, "Dock door left open", 0.95).with_zones(["dock-1"]);
    let report = pipeline
        .run_cycle(
            &context(),
            &analyzers(vec![Arc::new(StaticAnalyzer::new("doors", vec![issue]))]),
        )
        .await;

    assert_eq!(report.alerts.len(), 1);
    assert_eq!(report.recommendations.len(), 2);
    assert_eq!(report.actions.len(), 1);
    let action = &report.actions[0];
    assert_eq!(action.tier, Tier::Automated);
    assert_eq!(report.queued, vec![action.id]);
    assert_eq!(pipeline.get_pending_items().len(), 1);

    tokio::time::sleep(Duration::from_secs(11)).await;
    let item = pipeline.scheduler().get_item(action.id).unwrap();
    assert_eq!(item.status(), ActionStatus::Completed);

    let outcome = pipeline.outcomes().for_action(action.id).unwrap();
    assert_eq!(outcome.status, OutcomeStatus::InProgress);
    assert_eq!(outcome.promised.timeframe_minutes, 30);

    tokio::time::sleep(Duration::from_secs(30 * 60 + 1)).await;
    let measured = pipeline.outcomes().get(outcome.id).unwrap();
    assert_eq!(source.calls(), 1);
    assert_eq!(measured.status, OutcomeStatus::Completed);
    assert!((measured.accuracy - 84.0 / 85.0).abs() < 1e-9);

    let stats = pipeline.get_outcome_stats(&OutcomeFilter::new());
    assert_eq!(stats.count, 1);
    assert_eq!(stats.measured, 1);
    assert!((stats.success_rate - 1.0).abs() < f64::EPSILON);
}

#[tokio::test(start_paused = true)]
async fn test_objected_action_gets_no_outcome() {
    let pipeline = setup_test_pipeline();
    let executor = Arc::new(RecordingExecutor::new());
    let issue = Issue::new(Category::General, "Dock door left open", 0.95).with_zones(["dock-1"]);
    let report = pipeline
        .run_cycle(
            &context(),
            &analyzers(vec![Arc::new(StaticAnalyzer::new("doors", vec![issue]))]),
        )
        .await;
    let id = report.queued[0];
    pipeline.register_executor(id, executor.clone());

    tokio::time::sleep(Duration::from_secs(5)).await;
    pipeline.object_to_action(id, "door is being repaired").unwrap();
    tokio::time::sleep(Duration::from_secs(60)).await;

    assert_eq!(executor.count(), 0);
    assert!(pipeline.outcomes().for_action(id).is_none());
    let err = pipeline.object_to_action(id, "again").unwrap_err();
    assert!(err.is_invalid_transition());
}

#[tokio::test(start_paused = true)]
async fn test_persistent_issue_is_acted_on_once() {
    let pipeline = setup_test_pipeline();
    let doors = || -> Vec<Arc<dyn AnalysisContract>> {
        let issue =
            Issue::new(Category::General, "Dock door left open", 0.95).with_zones(["dock-1"]);
        vec![Arc::new(StaticAnalyzer::new("doors", vec![issue]))]
    };

    let first = pipeline.run_cycle(&context(), &doors()).await;
    assert_eq!(first.queued.len(), 1);
    assert!(first.refreshed.is_empty());
    let alert_id = first.alerts[0].id;

    let second = pipeline.run_cycle(&context(), &doors()).await;
    assert_eq!(second.alerts.len(), 1);
    assert_eq!(second.alerts[0].id, alert_id);
    assert_eq!(second.refreshed, vec![alert_id]);
    assert!(second.recommendations.is_empty());
    assert!(second.actions.is_empty());
    assert!(second.queued.is_empty());
    assert_eq!(pipeline.get_pending_items().len(), 1);
    assert_eq!(pipeline.recommendations().for_alert(alert_id).len(), 2);

    tokio::time::sleep(Duration::from_secs(11)).await;
    assert_eq!(pipeline.outcomes().len(), 1);

    pipeline.resolve_alert(alert_id).unwrap();
    let third = pipeline.run_cycle(&context(), &doors()).await;
    assert_ne!(third.alerts[0].id, alert_id);
    assert_eq!(third.queued.len(), 1);
}

#[tokio::test(start_paused = true)]
async fn test_assisted_actions_wait_for_approval() {
    let pipeline = setup_test_pipeline();
    let issue = Issue::new(Category::Maintenance, "Conveyor motor overheating", 0.45)
        .with_entities(["CV-1", "CV-2", "CV-3"])
        .with_severity(Severity::High);
    let report = pipeline
        .run_cycle(
            &context(),
            &analyzers(vec![Arc::new(StaticAnalyzer::new("conveyor", vec![issue]))]),
        )
        .await;

    assert!(report.queued.is_empty());
    assert_eq!(report.awaiting_approval.len(), 1);
    let action = report.actions[0].clone();
    assert_eq!(action.tier, Tier::Assisted);

    let err = pipeline.queue_action(action.clone(), Duration::from_secs(1)).unwrap_err();
    assert!(matches!(err, PipelineError::Scheduler(_)));

    pipeline.approve_action(action.clone()).unwrap();
    tokio::time::sleep(Duration::from_millis(10)).await;
    assert_eq!(
        pipeline.scheduler().get_item(action.id).unwrap().status(),
        ActionStatus::Completed
    );
    assert!(pipeline.outcomes().for_action(action.id).is_some());
}

#[tokio::test]
async fn test_alert_lifecycle_through_pipeline() {
    let pipeline = setup_test_pipeline();
    let alerts = pipeline.detect_alerts(
        &context(),
        &pipeline
            .run_analyses(
                &context(),
                &analyzers(vec![Arc::new(StaticAnalyzer::new(
                    "labor",
                    vec![Issue::new(Category::Labor, "Short shift", 0.7)],
                ))]),
            )
            .await,
    );
    let id = alerts[0].id;

    pipeline.acknowledge_alert(id).unwrap();
    assert_eq!(pipeline.get_active_alerts(&AlertFilter::new()).len(), 1);
    pipeline.resolve_alert(id).unwrap();
    assert!(pipeline.get_active_alerts(&AlertFilter::new()).is_empty());
    assert!(pipeline.dismiss_alert(id).unwrap_err().is_invalid_transition());

    pipeline.clear();
    assert!(pipeline.alerts().is_empty());
}
