use std::{sync::Arc, time::Duration};

use ledgrid_app::{
    blink_sequence, Error, Matrix, PatternKind, PatternOptions, PatternSequence, TaskRegistry,
    TaskStatus,
};
use rand::{rngs::StdRng, SeedableRng};

const TIME_UNIT: Duration = Duration::from_millis(10);

fn registry(rows: usize, cols: usize) -> TaskRegistry {
    let _ = env_logger::try_init();
    TaskRegistry::new(Arc::new(Matrix::new(rows, cols)), TIME_UNIT)
}

async fn advance(units: u32) {
    tokio::time::sleep(TIME_UNIT * units).await;
}

#[tokio::test(start_paused = true)]
async fn test_pattern_groups_by_brightness() {
    let registry = registry(2, 2);

    let ids = registry.schedule_pattern(&[[50_u8, 50], [0, 80]], 1, 3, true);
    assert_eq!(ids.len(), 2);

    advance(2).await;
    assert_eq!(
        registry.matrix().brightness_grid(),
        vec![vec![50, 50], vec![0, 80]]
    );
    for &id in &ids {
        assert_eq!(registry.task_status(id), Some(TaskStatus::Fired));
    }

    advance(3).await;
    assert_eq!(registry.matrix().brightness_grid(), vec![vec![0, 0], vec![0, 0]]);
}

#[tokio::test(start_paused = true)]
async fn test_dark_pattern_schedules_nothing() {
    let registry = registry(2, 2);

    let ids = registry.schedule_pattern(&[[0_u8, 0], [0, 0]], 0, 1, true);
    assert!(ids.is_empty());
    assert_eq!(registry.task_count(), 0);
}

#[tokio::test(start_paused = true)]
async fn test_sequence_plays_steps_in_order() {
    let registry = registry(1, 2);
    let mut sequence = PatternSequence::new(&registry, "columns");
    sequence.add_column_step(0, 100, 2, 1).unwrap();
    sequence.add_column_step(1, 50, 2, 0).unwrap();
    assert_eq!(sequence.len(), 2);
    assert_eq!(sequence.total_duration(), 5);

    let ids = sequence.run_once(0);
    assert_eq!(ids.len(), 2);

    advance(1).await;
    assert_eq!(registry.matrix().brightness_grid(), vec![vec![100, 0]]);

    // Transition pause between the steps.
    tokio::time::sleep(TIME_UNIT * 3 / 2).await;
    assert_eq!(registry.matrix().brightness_grid(), vec![vec![0, 0]]);

    tokio::time::sleep(TIME_UNIT * 3 / 2).await;
    assert_eq!(registry.matrix().brightness_grid(), vec![vec![0, 50]]);

    advance(2).await;
    assert_eq!(registry.matrix().brightness_grid(), vec![vec![0, 0]]);
    assert_eq!(registry.active_task_count(), 0);
}

#[tokio::test(start_paused = true)]
async fn test_sequence_loop_and_stop() {
    let registry = registry(1, 1);
    let mut sequence = PatternSequence::new(&registry, "blink");
    sequence.add_step(vec![vec![70]], 2, 1).unwrap();

    let ids = sequence.run_loop(3, 2);
    assert_eq!(ids.len(), 3);

    advance(3).await;
    assert_eq!(registry.task_status(ids[0]), Some(TaskStatus::Fired));

    sequence.stop(&ids);
    assert_eq!(registry.task_status(ids[1]), Some(TaskStatus::Cancelled));
    assert_eq!(registry.task_status(ids[2]), Some(TaskStatus::Cancelled));

    advance(10).await;
    assert_eq!(registry.task_status(ids[0]), Some(TaskStatus::Completed));
    assert_eq!(registry.matrix().devices()[0].brightness(), 0);
}

#[tokio::test(start_paused = true)]
async fn test_sequence_offsets_stop_at_time_range() {
    let registry = registry(1, 1);
    let mut sequence = PatternSequence::new(&registry, "long");
    sequence.add_step(vec![vec![40]], u32::MAX - 1, 0).unwrap();
    sequence.add_step(vec![vec![60]], 5, 0).unwrap();
    assert_eq!(sequence.total_duration(), u32::MAX);

    // The second step would start past the last representable offset.
    let ids = sequence.run_once(10);
    assert_eq!(ids.len(), 1);

    advance(11).await;
    assert_eq!(registry.matrix().devices()[0].brightness(), 40);
    assert_eq!(registry.task_status(ids[0]), Some(TaskStatus::Fired));

    // Only the first repetition fits.
    let ids = sequence.run_loop(3, 0);
    assert_eq!(ids.len(), 2);
    assert_eq!(registry.task_count(), 3);
}

#[tokio::test(start_paused = true)]
async fn test_sequence_rejects_bad_steps() {
    let registry = registry(2, 3);
    let mut sequence = PatternSequence::new(&registry, "broken");

    assert_eq!(
        sequence.add_step(vec![vec![10, 10, 10]], 1, 0),
        Err(Error::PatternDimensions)
    );
    assert_eq!(
        sequence.add_step(vec![vec![10, 10], vec![10, 10]], 1, 0),
        Err(Error::PatternDimensions)
    );
    assert_eq!(sequence.add_row_step(2, 10, 1, 0), Err(Error::InvalidAddress));
    assert_eq!(sequence.add_column_step(3, 10, 1, 0), Err(Error::InvalidAddress));
    assert!(sequence.is_empty());
    assert!(sequence.run_once(0).is_empty());

    sequence.add_row_step(1, 10, 1, 0).unwrap();
    sequence.clear();
    assert!(sequence.is_empty());
}

#[tokio::test(start_paused = true)]
async fn test_named_patterns_fill_sequence() {
    let registry = registry(3, 4);
    let mut rng = StdRng::seed_from_u64(1);
    let options = PatternOptions {
        steps: 4,
        ..PatternOptions::default()
    };

    let expected = [
        (PatternKind::Chase, 4),
        (PatternKind::Wave, 5),
        (PatternKind::Pulse, 8),
        (PatternKind::Spiral, 12),
        (PatternKind::Sparkle, 4),
    ];
    for (kind, frames) in expected {
        let mut sequence = PatternSequence::new(&registry, kind.to_string());
        kind.extend(&mut sequence, &options, &mut rng).unwrap();
        assert_eq!(sequence.len(), frames, "{kind}");
        assert_eq!(
            sequence.total_duration(),
            options.duration_per_step * u32::try_from(frames).unwrap()
        );
    }
}

#[tokio::test(start_paused = true)]
async fn test_blink_sequence_lights_one_device_at_a_time() {
    let _ = env_logger::try_init();
    let matrix = Arc::new(Matrix::new(1, 2));
    matrix.all_on(30);

    let handle = tokio::spawn({
        let matrix = matrix.clone();
        async move { blink_sequence(&matrix, TIME_UNIT, 2).await }
    });

    advance(1).await;
    assert_eq!(matrix.brightness_grid(), vec![vec![100, 0]]);

    advance(2).await;
    assert_eq!(matrix.brightness_grid(), vec![vec![0, 100]]);

    handle.await.unwrap();
    assert_eq!(matrix.brightness_grid(), vec![vec![0, 0]]);
}
