use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use cadence_api_core::{TargetId, UpdateState};
use cadence_sequence_core::{
    AnimationSequence, BatchOutcome, BuilderError, Config, SequenceBuilder,
};
use cadence_test_fixtures::{recording_unit, Journal, JournalEntry};

fn tick(sequence: &mut AnimationSequence, ms: u64) {
    let mut state = UpdateState::new(Duration::from_millis(ms));
    sequence.update(&mut state).unwrap();
}

fn drive_to_idle(sequence: &mut AnimationSequence, ms: u64, max_ticks: usize) {
    for _ in 0..max_ticks {
        tick(sequence, ms);
        if sequence.count_running_animations() == 0 {
            return;
        }
    }
    panic!("sequence still running after {max_ticks} ticks");
}

/// it should run the finished callback only after every unit in the batch
#[test]
fn finished_callback_runs_after_the_whole_batch() {
    let journal = Journal::new();
    let fired = Arc::new(AtomicUsize::new(0));
    let mut sequence = AnimationSequence::new(Config::default());

    let mut builder = SequenceBuilder::attached(sequence.handle(), None);
    builder
        .add(Box::new(recording_unit(
            "a",
            None,
            Duration::from_millis(20),
            &journal,
        )))
        .unwrap();
    builder
        .add(Box::new(recording_unit(
            "b",
            None,
            Duration::from_millis(40),
            &journal,
        )))
        .unwrap();
    let flag = fired.clone();
    let probe = journal.clone();
    builder.on_finished(move || {
        assert_eq!(probe.finish_order(), vec!["a", "b"]);
        flag.fetch_add(1, Ordering::SeqCst);
    });
    builder.apply().unwrap();

    drive_to_idle(&mut sequence, 20, 8);
    assert_eq!(fired.load(Ordering::SeqCst), 1);
}

/// it should reject a second apply of the same builder
#[test]
fn builder_is_single_use() {
    let mut sequence = AnimationSequence::new(Config::default());
    let mut builder = SequenceBuilder::attached(sequence.handle(), None);
    builder.wait(Duration::from_millis(10)).unwrap();
    builder.apply().unwrap();

    assert!(matches!(builder.apply(), Err(BuilderError::AlreadyApplied)));
    assert!(matches!(
        builder.wait(Duration::from_millis(10)),
        Err(BuilderError::AlreadyApplied)
    ));
    drive_to_idle(&mut sequence, 10, 4);
}

/// it should refuse to apply while detached or empty
#[test]
fn detached_and_empty_builders_fail_fast() {
    let mut detached = SequenceBuilder::detached(Some(TargetId(1)));
    detached.wait(Duration::from_millis(10)).unwrap();
    assert!(matches!(detached.apply(), Err(BuilderError::Detached)));

    let sequence = AnimationSequence::new(Config::default());
    let mut empty = SequenceBuilder::attached(sequence.handle(), None);
    assert!(matches!(empty.apply(), Err(BuilderError::Empty)));
}

/// it should stamp the ignore-pause flag across the whole batch
#[test]
fn ignore_pause_is_stamped_at_finalization() {
    let journal = Journal::new();
    let mut sequence = AnimationSequence::new(Config::default());

    let mut builder = SequenceBuilder::attached(sequence.handle(), None);
    builder
        .add(Box::new(recording_unit(
            "immune",
            None,
            Duration::from_millis(20),
            &journal,
        )))
        .unwrap();
    builder.ignore_pause(true);
    builder.apply().unwrap();

    let mut state = UpdateState::new_paused(Duration::from_millis(20));
    sequence.update(&mut state).unwrap();
    assert_eq!(journal.finish_order(), vec!["immune"]);
}

/// it should signal Finished once a notified batch completes
#[test]
fn notified_batch_signals_finished() {
    let mut sequence = AnimationSequence::new(Config::default());
    let mut builder = SequenceBuilder::attached(sequence.handle(), None);
    builder.wait(Duration::from_millis(20)).unwrap();
    let signal = builder.apply_notified().unwrap();

    assert_eq!(signal.try_outcome(), None);
    drive_to_idle(&mut sequence, 20, 8);
    assert_eq!(signal.try_outcome(), Some(BatchOutcome::Finished));
}

/// it should signal Canceled when a notified batch is torn down
#[test]
fn notified_batch_signals_canceled() {
    let mut sequence = AnimationSequence::new(Config::default());
    let mut builder = SequenceBuilder::attached(sequence.handle(), None);
    builder.wait(Duration::from_millis(100)).unwrap();
    let signal = builder.apply_notified().unwrap();

    tick(&mut sequence, 10);
    sequence.enqueue_cancel_all();
    tick(&mut sequence, 10);
    assert_eq!(signal.try_outcome(), Some(BatchOutcome::Canceled));
    assert_eq!(sequence.count_running_animations(), 0);
}

/// it should run a secondary notified batch alongside primary work
#[test]
fn secondary_notified_batch_runs_in_parallel() {
    let mut sequence = AnimationSequence::new(Config::default());
    let mut primary = SequenceBuilder::attached(sequence.handle(), None);
    primary.wait(Duration::from_millis(100)).unwrap();
    primary.apply().unwrap();

    let mut side = SequenceBuilder::attached(sequence.handle(), None);
    side.wait(Duration::from_millis(20)).unwrap();
    let signal = side.apply_as_secondary_notified().unwrap();

    // Three ticks: the delay, then the completion marker, then the callback
    // step; the 100ms primary batch is still mid-flight throughout.
    for _ in 0..3 {
        tick(&mut sequence, 20);
    }
    assert_eq!(signal.try_outcome(), Some(BatchOutcome::Finished));
    assert_eq!(sequence.count_running_animations(), 1);
}

/// it should rerun a rewinding batch every cycle until canceled
#[test]
fn rewinding_batch_repeats_until_canceled() {
    let journal = Journal::new();
    let mut sequence = AnimationSequence::new(Config::default());

    let mut builder = SequenceBuilder::attached(sequence.handle(), None);
    builder
        .add(Box::new(recording_unit(
            "looped",
            None,
            Duration::from_millis(10),
            &journal,
        )))
        .unwrap();
    builder.apply_and_rewind().unwrap();

    for _ in 0..3 {
        tick(&mut sequence, 10);
    }
    assert_eq!(
        journal.count(|e| matches!(e, JournalEntry::Finished("looped"))),
        3
    );
    assert_eq!(sequence.count_running_animations(), 1);

    sequence.enqueue_cancel_all();
    tick(&mut sequence, 10);
    assert_eq!(sequence.count_running_animations(), 0);
}

/// it should refuse completion callbacks on a rewinding batch
#[test]
fn rewinding_batch_rejects_callbacks() {
    let sequence = AnimationSequence::new(Config::default());
    let mut builder = SequenceBuilder::attached(sequence.handle(), None);
    builder.wait(Duration::from_millis(10)).unwrap();
    builder.on_finished(|| {});
    assert!(matches!(
        builder.apply_and_rewind(),
        Err(BuilderError::CallbacksUnsupported)
    ));
}
