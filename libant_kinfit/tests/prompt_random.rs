use approx::assert_relative_eq;

use libant_kinfit::cut_counter::CutCounter;
use libant_kinfit::prompt_random::{Case, PromptRandomConfig, PromptRandomWindow, TimeRange};

/// Fill a flat time distribution covering all windows
fn fill_flat(window: &mut PromptRandomWindow, counter: &mut CutCounter) {
    let step = 0.1;
    for i in 0..1500 {
        let time = -75.0 + (i as f64 + 0.5) * step;
        window.set_time(time);
        match window.fill_weight() {
            Some(weight) => counter.fill_weighted("Weighted", weight),
            None => counter.fill("Outside"),
        }
        match window.state() {
            Case::Prompt => counter.fill("Prompt"),
            Case::Random => counter.fill("Random"),
            Case::Outside => (),
        }
    }
}

#[test]
fn test_flat_background_cancels() {
    let mut window = PromptRandomWindow::from_config(&PromptRandomConfig::default()).unwrap();
    let mut counter = CutCounter::new();
    fill_flat(&mut window, &mut counter);

    assert_eq!(counter.get("Prompt"), 140.0);
    assert_eq!(counter.get("Random"), 1100.0);
    assert_relative_eq!(counter.get("Weighted"), 0.0, epsilon = 1e-9);
}

#[test]
fn test_asymmetric_windows_cancel() {
    let mut window = PromptRandomWindow::new(
        vec![TimeRange::new(-3.0, 5.0)],
        vec![TimeRange::new(-60.0, -20.0), TimeRange::new(30.0, 40.0)],
    )
    .unwrap();
    assert_relative_eq!(window.ratio(), 8.0 / 50.0);
    let mut counter = CutCounter::new();
    fill_flat(&mut window, &mut counter);
    assert_relative_eq!(counter.get("Weighted"), 0.0, epsilon = 1e-9);
}

#[test]
fn test_bad_windows() {
    assert!(PromptRandomWindow::new(
        vec![TimeRange::new(-7.0, 7.0), TimeRange::new(5.0, 9.0)],
        vec![TimeRange::new(10.0, 60.0)],
    )
    .is_err());
    assert!(PromptRandomWindow::new(vec![TimeRange::new(-7.0, 7.0)], Vec::new()).is_err());
    assert!(
        PromptRandomWindow::new(vec![TimeRange::new(7.0, 7.0)], vec![TimeRange::new(10.0, 60.0)])
            .is_err()
    );
}
