use super::*;

#[test]
fn fresh_run_has_full_catalog_pending() {
    let run = TestRun::start();
    assert_eq!(run.status, RunStatus::Running);
    assert_eq!(run.end_time, None);
    let names: Vec<StepName> = run.steps.iter().map(|s| s.name).collect();
    assert_eq!(names, StepName::CATALOG);
    assert!(run.steps.iter().all(|s| s.status == TestStatus::Pending && s.started_at.is_none()));
}

#[test]
fn finish_settles_status() {
    let mut ok = TestRun::start();
    ok.finish(false);
    assert_eq!(ok.status, RunStatus::Completed);
    assert!(ok.end_time.is_some());

    let mut failed = TestRun::start();
    failed.steps[1].status = TestStatus::Failed;
    failed.finish(false);
    assert_eq!(failed.status, RunStatus::Failed);

    let mut cancelled = TestRun::start();
    cancelled.finish(true);
    assert_eq!(cancelled.status, RunStatus::Failed);
}

#[test]
fn catalog_labels_are_human_readable() {
    let labels: Vec<&str> = StepName::CATALOG.iter().map(|s| s.label()).collect();
    assert_eq!(
        labels,
        [
            "Initialize Preview",
            "Parse HTML Structure",
            "Load CSS Styles",
            "Execute JavaScript",
            "Capture Console Output",
            "Render Complete"
        ]
    );
    assert_eq!(serde_json::to_value(StepName::LoadCssStyles).unwrap(), "Load CSS Styles");
}

#[test]
fn run_serializes_with_browser_field_names() {
    let run = TestRun::start();
    let value = serde_json::to_value(&run).unwrap();
    assert!(value.get("startTime").is_some());
    assert!(value["endTime"].is_null());
    assert_eq!(value["status"], "running");
    assert_eq!(value["steps"][0]["status"], "pending");
    assert!(value["steps"][0]["timestamp"].is_null());
}

#[test]
fn log_keeps_last_fifty_in_order() {
    let mut log = RunLog::default();
    for i in 0..LOG_CAPACITY + 3 {
        log.push("Test Run", TestStatus::Running, Some(i.to_string()));
    }
    assert_eq!(log.entries().len(), LOG_CAPACITY);
    assert_eq!(log.entries()[0].message.as_deref(), Some("3"));
    let last = log.entries().last().unwrap();
    assert_eq!(last.message, Some((LOG_CAPACITY + 2).to_string()));
}

#[test]
fn terminal_statuses() {
    assert!(TestStatus::Completed.is_terminal());
    assert!(TestStatus::Failed.is_terminal());
    assert!(!TestStatus::Pending.is_terminal());
    assert!(!TestStatus::Running.is_terminal());
}
