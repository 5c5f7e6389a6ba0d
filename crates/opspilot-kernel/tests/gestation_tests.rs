use chrono::Utc;
use opspilot_kernel::{
    DefaultDispatcher, GestationConfig, GestationItem, GestationScheduler, SchedulerError,
    ValidityCheck,
};
use opspilot_model::{ActionStatus, ClassifiedAction, Tier};
use opspilot_test_utils::{
    automated_action, camera_recommendation, classified, FailingExecutor, PanickingExecutor,
    RecordingExecutor,
};
use parking_lot::Mutex;
use proptest::prelude::*;
use std::sync::Arc;
use std::time::Duration;

/// Collects statuses seen by completion callbacks
#[derive(Default)]
struct Recorder(Mutex<Vec<ActionStatus>>);

impl Recorder {
    fn record(&self, item: &GestationItem) {
        self.0.lock().push(item.status());
    }

    fn seen(&self) -> Vec<ActionStatus> {
        self.0.lock().clone()
    }
}

const GESTATION: Duration = Duration::from_secs(10);

fn scheduler() -> GestationScheduler {
    GestationScheduler::new(GestationConfig::default())
}

struct NeverValid;

impl ValidityCheck for NeverValid {
    fn is_valid(&self, _action: &ClassifiedAction, _now: chrono::DateTime<Utc>) -> bool {
        false
    }
}

#[tokio::test(start_paused = true)]
async fn test_objection_during_gestation_cancels_execution() {
    let scheduler = scheduler();
    let executor = Arc::new(RecordingExecutor::new());
    let action = automated_action();
    let id = action.id;
    scheduler.register_executor(id, executor.clone());
    scheduler.queue(action, GESTATION).unwrap();

    tokio::time::sleep(Duration::from_millis(5_000)).await;
    let item = scheduler.object_to_action(id, "operator on site").unwrap();
    assert_eq!(item.status(), ActionStatus::Objected);
    assert_eq!(item.objection.as_ref().map(|o| o.reason.as_str()), Some("operator on site"));

    tokio::time::sleep(Duration::from_secs(20)).await;
    let item = scheduler.get_item(id).unwrap();
    assert_eq!(item.status(), ActionStatus::Objected);
    assert!(item.action.execution_result.is_none());
    assert_eq!(executor.count(), 0);
}

#[tokio::test(start_paused = true)]
async fn test_action_executes_after_gestation() {
    let scheduler = scheduler();
    let executor = Arc::new(RecordingExecutor::new());
    let action = automated_action();
    let id = action.id;
    scheduler.register_executor(id, executor.clone());
    scheduler.queue(action, GESTATION).unwrap();

    tokio::time::sleep(Duration::from_millis(9_900)).await;
    assert_eq!(scheduler.get_item(id).unwrap().status(), ActionStatus::Pending);

    tokio::time::sleep(Duration::from_millis(200)).await;
    let item = scheduler.get_item(id).unwrap();
    assert_eq!(item.status(), ActionStatus::Completed);
    assert!(item.action.execution_result.unwrap().success);
    assert_eq!(executor.executed(), vec![id]);
    assert!(scheduler.pending_items().is_empty());
}

#[tokio::test(start_paused = true)]
async fn test_default_dispatcher_describes_actions() {
    let scheduler = GestationScheduler::with_parts(
        GestationConfig::default(),
        Arc::new(DefaultDispatcher::new()),
        Arc::new(opspilot_kernel::ExpiryCheck),
    );
    let action = automated_action();
    let id = action.id;
    scheduler.queue(action, GESTATION).unwrap();

    tokio::time::sleep(Duration::from_secs(11)).await;
    let result = scheduler.get_item(id).unwrap().action.execution_result.unwrap();
    assert!(result.success);
    assert!(result.message.starts_with("Executed 1 action(s)"));
    assert!(result.data.is_some());
}

#[tokio::test(start_paused = true)]
async fn test_double_objection_is_invalid() {
    let scheduler = scheduler();
    let action = automated_action();
    let id = action.id;
    scheduler.queue(action, GESTATION).unwrap();

    scheduler.object_to_action(id, "first").unwrap();
    let err = scheduler.object_to_action(id, "second").unwrap_err();
    assert!(err.is_invalid_transition());
    assert_eq!(
        scheduler.get_item(id).unwrap().objection.unwrap().reason,
        "first"
    );
}

#[tokio::test(start_paused = true)]
async fn test_objecting_after_execution_is_invalid() {
    let scheduler = scheduler();
    let action = automated_action();
    let id = action.id;
    scheduler.queue(action, GESTATION).unwrap();

    tokio::time::sleep(Duration::from_secs(11)).await;
    let err = scheduler.object_to_action(id, "too late").unwrap_err();
    assert!(matches!(
        err,
        SchedulerError::InvalidTransition {
            from: ActionStatus::Completed,
            to: ActionStatus::Objected,
            ..
        }
    ));
    assert_eq!(scheduler.get_item(id).unwrap().status(), ActionStatus::Completed);
}

#[tokio::test(start_paused = true)]
async fn test_expired_recommendation_is_not_executed() {
    let scheduler = scheduler();
    let executor = Arc::new(RecordingExecutor::new());
    let mut rec = camera_recommendation(0.9);
    rec.expires_at = Some(Utc::now() - chrono::Duration::seconds(1));
    let action = classified(Tier::Automated, rec, GESTATION);
    let id = action.id;
    scheduler.register_executor(id, executor.clone());
    scheduler.queue(action, GESTATION).unwrap();

    tokio::time::sleep(Duration::from_secs(11)).await;
    let item = scheduler.get_item(id).unwrap();
    assert_eq!(item.status(), ActionStatus::Expired);
    assert!(item.action.execution_result.is_none());
    assert!(item.finalized_at.is_some());
    assert_eq!(executor.count(), 0);
}

#[tokio::test(start_paused = true)]
async fn test_custom_validity_check_expires_items() {
    let scheduler = GestationScheduler::with_parts(
        GestationConfig::default(),
        Arc::new(DefaultDispatcher::new()),
        Arc::new(NeverValid),
    );
    let action = automated_action();
    let id = action.id;
    scheduler.queue(action, GESTATION).unwrap();

    tokio::time::sleep(Duration::from_secs(11)).await;
    assert_eq!(scheduler.get_item(id).unwrap().status(), ActionStatus::Expired);
}

#[tokio::test(start_paused = true)]
async fn test_failing_executor_completes_with_failure() {
    let scheduler = scheduler();
    let action = automated_action();
    let id = action.id;
    scheduler.register_executor(id, Arc::new(FailingExecutor));
    scheduler.queue(action, GESTATION).unwrap();

    tokio::time::sleep(Duration::from_secs(11)).await;
    let item = scheduler.get_item(id).unwrap();
    assert_eq!(item.status(), ActionStatus::Completed);
    let result = item.action.execution_result.unwrap();
    assert!(!result.success);
    assert!(result.error.unwrap().contains("fleet manager offline"));
}

#[tokio::test(start_paused = true)]
async fn test_panicking_executor_completes_with_failure() {
    let scheduler = scheduler();
    let action = automated_action();
    let id = action.id;
    scheduler.register_executor(id, Arc::new(PanickingExecutor));
    scheduler.queue(action, GESTATION).unwrap();

    tokio::time::sleep(Duration::from_secs(11)).await;
    let item = scheduler.get_item(id).unwrap();
    assert_eq!(item.status(), ActionStatus::Completed);
    assert!(!item.action.execution_result.unwrap().success);
}

#[tokio::test(start_paused = true)]
async fn test_completion_callbacks_see_terminal_items() {
    let scheduler = scheduler();
    let recorder = Arc::new(Recorder::default());
    let sink = Arc::clone(&recorder);
    scheduler.on_completion(Arc::new(move |item: &GestationItem| sink.record(item)));

    let executed = automated_action();
    let objected = automated_action();
    let objected_id = objected.id;
    scheduler.queue(executed, GESTATION).unwrap();
    scheduler.queue(objected, GESTATION).unwrap();

    scheduler.object_to_action(objected_id, "no").unwrap();
    tokio::time::sleep(Duration::from_secs(11)).await;

    assert_eq!(
        recorder.seen(),
        vec![ActionStatus::Objected, ActionStatus::Completed]
    );
}

#[tokio::test(start_paused = true)]
async fn test_finalized_items_are_purged_after_retention() {
    let scheduler = GestationScheduler::new(
        GestationConfig::default().with_retention(Duration::from_secs(60)),
    );
    let action = automated_action();
    let id = action.id;
    scheduler.queue(action, GESTATION).unwrap();

    tokio::time::sleep(Duration::from_secs(30)).await;
    assert!(scheduler.get_item(id).is_some());

    tokio::time::sleep(Duration::from_secs(45)).await;
    assert!(scheduler.get_item(id).is_none());
    assert!(scheduler.is_empty());
}

#[tokio::test(start_paused = true)]
async fn test_pending_items_sorted_by_execute_time() {
    let scheduler = scheduler();
    let later = automated_action();
    let sooner = automated_action();
    let (later_id, sooner_id) = (later.id, sooner.id);
    scheduler.queue(later, Duration::from_secs(45)).unwrap();
    scheduler.queue(sooner, Duration::from_secs(10)).unwrap();

    let ids: Vec<_> = scheduler.pending_items().iter().map(GestationItem::id).collect();
    assert_eq!(ids, vec![sooner_id, later_id]);
}

#[tokio::test(start_paused = true)]
async fn test_executed_item_cannot_be_requeued() {
    let scheduler = scheduler();
    let action = automated_action();
    let id = action.id;
    scheduler.queue(action, GESTATION).unwrap();
    tokio::time::sleep(Duration::from_secs(11)).await;

    let done = scheduler.get_item(id).unwrap().action;
    let err = scheduler.queue(done, GESTATION).unwrap_err();
    assert!(matches!(
        err,
        SchedulerError::InvalidTransition { from: ActionStatus::Completed, .. }
    ));
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    #[test]
    fn prop_never_both_objected_and_executed(objection_ms in 0u64..20_000) {
        let runtime = tokio::runtime::Builder::new_current_thread()
            .enable_time()
            .start_paused(true)
            .build()
            .unwrap();

        runtime.block_on(async {
            let scheduler = scheduler();
            let executor = Arc::new(RecordingExecutor::new());
            let action = automated_action();
            let id = action.id;
            scheduler.register_executor(id, executor.clone());
            scheduler.queue(action, GESTATION).unwrap();

            tokio::time::sleep(Duration::from_millis(objection_ms)).await;
            let objection = scheduler.object_to_action(id, "race");
            tokio::time::sleep(Duration::from_secs(30)).await;

            let item = scheduler.get_item(id).unwrap();
            match item.status() {
                ActionStatus::Objected => {
                    assert!(objection.is_ok());
                    assert!(item.action.execution_result.is_none());
                    assert_eq!(executor.count(), 0);
                }
                ActionStatus::Completed => {
                    assert!(objection.unwrap_err().is_invalid_transition());
                    assert!(item.objection.is_none());
                    assert_eq!(executor.count(), 1);
                }
                other => panic!("unexpected status {other}"),
            }
        });
    }
}
