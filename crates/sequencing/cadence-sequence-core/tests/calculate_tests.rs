use std::time::Duration;

use cadence_sequence_core::{
    AnimationSequence, BoxedUnit, Config, SequenceError, TimedAnimation, UnitControl, UnitFault,
};
use cadence_sequence_core::AnimationHooks;

fn fixed(ms: u64) -> BoxedUnit {
    Box::new(TimedAnimation::fixed(None, Duration::from_millis(ms)))
}

fn fixed_blocking(ms: u64) -> BoxedUnit {
    Box::new(TimedAnimation::fixed(None, Duration::from_millis(ms)).blocking(true))
}

/// it should take duration/tick steps under continuous evaluation
#[test]
fn continuous_ticks_match_duration_over_step() {
    let mut sequence = AnimationSequence::new(Config::default());
    sequence.enqueue_add_primary(vec![fixed(1000)]);
    let ticks = sequence
        .calculate_continuous(Duration::from_millis(250))
        .unwrap();
    assert_eq!(ticks, 4);
    assert_eq!(sequence.count_running_animations(), 0);
}

/// it should reject a zero tick size instead of looping forever
#[test]
fn continuous_rejects_a_zero_tick() {
    let mut sequence = AnimationSequence::new(Config::default());
    sequence.enqueue_add_primary(vec![fixed(1000)]);
    assert!(matches!(
        sequence.calculate_continuous(Duration::ZERO),
        Err(SequenceError::ZeroTickSize)
    ));
}

/// it should finish the same work in a single event-driven step
#[test]
fn event_driven_jumps_straight_to_the_finish() {
    let mut sequence = AnimationSequence::new(Config::default());
    sequence.enqueue_add_primary(vec![fixed(1000)]);
    let report = sequence.calculate_event_driven().unwrap();

    assert_eq!(report.steps.len(), 1);
    assert_eq!(report.steps[0].duration, Duration::from_millis(1000));
    assert_eq!(report.steps[0].finished, 1);
    assert_eq!(report.total_duration(), Duration::from_millis(1000));
    assert_eq!(report.total_finished(), 1);
}

/// it should step once per blocking unit with that unit's remaining time
#[test]
fn event_driven_steps_follow_the_blocking_chain() {
    let mut sequence = AnimationSequence::new(Config::default());
    sequence.enqueue_add_primary(vec![fixed_blocking(300), fixed_blocking(200)]);
    let report = sequence.calculate_event_driven().unwrap();

    let durations: Vec<Duration> = report.steps.iter().map(|s| s.duration).collect();
    assert_eq!(
        durations,
        vec![Duration::from_millis(300), Duration::from_millis(200)]
    );
    assert_eq!(report.total_duration(), Duration::from_millis(500));
    assert_eq!(report.total_finished(), 2);
    assert!(report.steps.iter().enumerate().all(|(i, s)| s.index == i));
}

/// it should reach the same end state under both evaluation strategies
#[test]
fn strategies_agree_on_the_end_state() {
    let build = || {
        let mut sequence = AnimationSequence::new(Config::default());
        sequence.enqueue_add_primary(vec![fixed_blocking(100), fixed(60), fixed(40)]);
        sequence.enqueue_add_secondary(vec![fixed(80)]);
        sequence
    };

    let mut continuous = build();
    continuous
        .calculate_continuous(Duration::from_millis(20))
        .unwrap();
    let mut event_driven = build();
    event_driven.calculate_event_driven().unwrap();

    assert_eq!(continuous.count_running_animations(), 0);
    assert_eq!(event_driven.count_running_animations(), 0);
}

/// it should use a duration fixed at start time for event-driven stepping
#[test]
fn event_driven_honours_start_time_durations() {
    struct DistanceBased;
    impl AnimationHooks for DistanceBased {
        fn on_start(&mut self, ctl: &mut UnitControl) -> Result<(), UnitFault> {
            ctl.set_fixed_time(Duration::from_millis(640))
        }
    }

    let mut sequence = AnimationSequence::new(Config::default());
    sequence.enqueue_add_primary(vec![Box::new(
        TimedAnimation::fixed(None, Duration::ZERO)
            .with_hooks(Box::new(DistanceBased))
            .blocking(true),
    ) as BoxedUnit]);

    let report = sequence.calculate_event_driven().unwrap();
    assert_eq!(report.total_duration(), Duration::from_millis(640));
}

/// it should fall back to the default cycle for unpredictable units
#[test]
fn event_driven_polls_unpredictable_units_at_the_default_cycle() {
    struct FinishAfter {
        ticks: usize,
    }
    impl AnimationHooks for FinishAfter {
        fn on_tick(&mut self, ctl: &mut UnitControl) -> Result<(), UnitFault> {
            self.ticks -= 1;
            if self.ticks == 0 {
                ctl.notify_finished();
            }
            Ok(())
        }
    }

    let config = Config::default();
    let cycle = config.default_cycle_time;
    let mut sequence = AnimationSequence::new(config);
    sequence.enqueue_add_primary(vec![Box::new(
        TimedAnimation::event_driven(None).with_hooks(Box::new(FinishAfter { ticks: 3 })),
    ) as BoxedUnit]);

    let report = sequence.calculate_event_driven().unwrap();
    assert_eq!(report.steps.len(), 3);
    assert!(report.steps.iter().all(|s| s.duration == cycle));
}
