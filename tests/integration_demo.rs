//! Integration tests for the scripted rebinding scenario.

use svcbind::handlers::{DemoStep, execute_demo};
use svcbind_core::{RebindStrategy, Settings};

fn bound_sequence(steps: &[DemoStep]) -> Vec<Option<&str>> {
    steps.iter().map(|s| s.bound.as_deref()).collect()
}

#[test]
fn test_demo_rebinds_under_both_strategies() {
    for strategy in [RebindStrategy::Suspend, RebindStrategy::Locking] {
        let report = execute_demo(&Settings::with_defaults(), Some(strategy)).unwrap();

        assert_eq!(report.strategy, strategy);
        assert_eq!(
            bound_sequence(&report.steps),
            vec![
                None,
                Some("english"),
                Some("french"),
                Some("english"),
                Some("french"),
                None
            ],
            "{strategy}"
        );
    }
}

#[test]
fn test_demo_tracks_satisfaction_and_greetings() {
    let report = execute_demo(&Settings::with_defaults(), None).unwrap();
    assert_eq!(report.strategy, RebindStrategy::Suspend);

    let first = &report.steps[0];
    assert!(!first.satisfied);
    assert_eq!(first.greeting, None);

    let french = &report.steps[2];
    assert!(french.satisfied);
    assert_eq!(french.greeting.as_deref(), Some("Bonjour, world !"));

    let last = report.steps.last().unwrap();
    assert!(!last.satisfied);
}

#[test]
fn test_demo_honours_language_settings() {
    let mut settings = Settings::with_defaults();
    settings.add_language_filter = Some(true);
    settings.language_tag = Some("cxx".to_string());
    settings.default_strategy = Some(RebindStrategy::Locking);

    let report = execute_demo(&settings, None).unwrap();
    assert_eq!(report.strategy, RebindStrategy::Locking);
    assert_eq!(report.steps[1].bound.as_deref(), Some("english"));
}

#[test]
fn test_demo_report_renders() {
    let report = execute_demo(&Settings::with_defaults(), None).unwrap();
    let rendered = report.to_string();
    assert!(rendered.starts_with("strategy: suspend"));
    assert!(rendered.contains("Hello, world!"));
    assert_eq!(rendered.lines().count(), report.steps.len() + 1);
}
