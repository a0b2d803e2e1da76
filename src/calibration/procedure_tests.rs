use super::*;

fn durations() -> PhaseDurations {
    PhaseDurations {
        relax: Duration::from_secs(15),
        tension: Duration::from_secs(15),
    }
}

#[test]
fn test_run_starts_in_relax() {
    let now = Instant::now();
    let run = CalibrationRun::start(durations(), now);

    assert_eq!(run.phase(), CalibrationPhase::Relax);
    assert_eq!(run.durations(), durations());
    assert_eq!(run.remaining(now), Duration::from_secs(15));
    assert_eq!(run.progress(now).relax_samples, 0);
}

#[test]
fn test_relax_hands_over_to_tension() {
    let start = Instant::now();
    let mut run = CalibrationRun::start(durations(), start);

    assert_eq!(
        run.advance(start + Duration::from_secs(14)),
        CalibrationStep::Continue
    );

    let handover = start + Duration::from_millis(15_100);
    assert_eq!(
        run.advance(handover),
        CalibrationStep::Entered {
            phase: CalibrationPhase::Tension,
            remaining: Duration::from_secs(15),
        }
    );
    assert_eq!(run.phase(), CalibrationPhase::Tension);

    // Tension is measured from the handover
    assert_eq!(
        run.advance(start + Duration::from_secs(30)),
        CalibrationStep::Continue
    );
    assert_eq!(
        run.advance(handover + Duration::from_secs(15)),
        CalibrationStep::Finished
    );
}

#[test]
fn test_samples_go_to_current_phase() {
    let start = Instant::now();
    let mut run = CalibrationRun::start(durations(), start);

    run.record(5.0);
    run.record(6.0);
    run.advance(start + Duration::from_secs(15));
    run.record(80.0);

    let progress = run.progress(start + Duration::from_secs(16));
    assert_eq!(progress.phase, CalibrationPhase::Tension);
    assert_eq!(progress.relax_samples, 2);
    assert_eq!(progress.tension_samples, 1);
    assert_eq!(progress.remaining_ms, 14_000);
}

#[test]
fn test_finish_uses_relax_min_and_tension_max() {
    let start = Instant::now();
    let mut run = CalibrationRun::start(durations(), start);

    for value in [5.0, 6.0, 4.0] {
        run.record(value);
    }
    run.advance(start + Duration::from_secs(15));
    for value in [80.0, 95.0, 90.0] {
        run.record(value);
    }

    let profile = run.finish(1_700_000_000).unwrap();
    assert_eq!(profile.baseline, 4.0);
    assert_eq!(profile.max_value, 95.0);
    assert_eq!(profile.captured_at, 1_700_000_000);
}

#[test]
fn test_finish_fails_on_empty_relax() {
    let start = Instant::now();
    let mut run = CalibrationRun::start(durations(), start);
    run.advance(start + Duration::from_secs(15));
    run.record(90.0);

    assert_eq!(
        run.finish(0),
        Err(CalibrationError::EmptyPhase {
            phase: CalibrationPhase::Relax
        })
    );
}

#[test]
fn test_finish_fails_on_empty_tension() {
    let start = Instant::now();
    let mut run = CalibrationRun::start(durations(), start);
    run.record(3.0);
    run.advance(start + Duration::from_secs(15));

    assert_eq!(
        run.finish(0),
        Err(CalibrationError::EmptyPhase {
            phase: CalibrationPhase::Tension
        })
    );
}

#[test]
fn test_phase_durations_from_config() {
    let config = CalibrationConfig {
        relax_secs: 3,
        tension_secs: 7,
        ..CalibrationConfig::default()
    };
    let durations = PhaseDurations::from(&config);
    assert_eq!(durations.relax, Duration::from_secs(3));
    assert_eq!(durations.tension, Duration::from_secs(7));
}
