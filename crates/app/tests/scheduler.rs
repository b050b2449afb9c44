use std::{sync::Arc, time::Duration};

use ledgrid_app::{Error, Schedule, TaskId, TaskRegistry, TaskStatus};
use ledgrid_core::{test_utils::MemorySinkBank, Matrix};

const TIME_UNIT: Duration = Duration::from_millis(10);

fn registry(rows: usize, cols: usize) -> TaskRegistry {
    let _ = env_logger::try_init();
    TaskRegistry::new(Arc::new(Matrix::new(rows, cols)), TIME_UNIT)
}

async fn advance(units: u32) {
    tokio::time::sleep(TIME_UNIT * units).await;
}

#[tokio::test(start_paused = true)]
async fn test_task_restores_original_brightness() {
    let registry = registry(1, 3);
    registry.matrix().devices()[0].set_brightness(30);

    let id = registry
        .schedule_device(0, Schedule::new(2, 3).with_brightness(80))
        .unwrap();
    assert_eq!(registry.task_status(id), Some(TaskStatus::Pending));
    assert_eq!(registry.active_task_count(), 1);

    advance(1).await;
    assert_eq!(registry.matrix().brightness_grid(), vec![vec![30, 0, 0]]);

    advance(2).await;
    assert_eq!(registry.task_status(id), Some(TaskStatus::Fired));
    assert_eq!(registry.matrix().brightness_grid(), vec![vec![80, 0, 0]]);

    advance(3).await;
    assert_eq!(registry.task_status(id), Some(TaskStatus::Completed));
    assert_eq!(registry.matrix().brightness_grid(), vec![vec![30, 0, 0]]);
    assert_eq!(registry.active_task_count(), 0);
}

#[tokio::test(start_paused = true)]
async fn test_dark_device_is_turned_off_after_task() {
    let registry = registry(1, 1);

    registry
        .schedule_device(0, Schedule::new(0, 2).with_brightness(80))
        .unwrap();

    advance(1).await;
    assert_eq!(registry.matrix().devices()[0].brightness(), 80);

    advance(2).await;
    assert_eq!(registry.matrix().devices()[0].brightness(), 0);
}

#[tokio::test(start_paused = true)]
async fn test_restore_disabled_turns_device_off() {
    let registry = registry(1, 1);
    registry.matrix().devices()[0].set_brightness(40);

    registry
        .schedule_device(0, Schedule::new(1, 1).with_restore(false))
        .unwrap();

    advance(3).await;
    assert_eq!(registry.matrix().devices()[0].brightness(), 0);
}

#[tokio::test(start_paused = true)]
async fn test_cancel_before_fire() {
    let registry = registry(2, 2);
    registry.matrix().devices()[3].set_brightness(10);

    let id = registry.schedule_row(1, Schedule::new(5, 5)).unwrap();
    assert!(registry.cancel(id));
    assert_eq!(registry.task_status(id), Some(TaskStatus::Cancelled));
    assert_eq!(registry.active_task_count(), 0);

    advance(20).await;
    assert_eq!(registry.matrix().brightness_grid(), vec![vec![0, 0], vec![0, 10]]);
    assert_eq!(registry.task_status(id), Some(TaskStatus::Cancelled));

    // Cancellation is idempotent.
    assert!(!registry.cancel(id));
    assert_eq!(registry.try_cancel(id), Err(Error::AlreadyFired));
}

#[tokio::test(start_paused = true)]
async fn test_cancel_after_fire_is_rejected() {
    let registry = registry(1, 2);

    let id = registry.schedule_column(1, Schedule::new(1, 4)).unwrap();
    advance(2).await;
    assert_eq!(registry.task_status(id), Some(TaskStatus::Fired));

    assert!(!registry.cancel(id));
    assert_eq!(registry.matrix().brightness_grid(), vec![vec![0, 100]]);

    // The fired task still completes.
    advance(5).await;
    assert_eq!(registry.task_status(id), Some(TaskStatus::Completed));
    assert_eq!(registry.matrix().brightness_grid(), vec![vec![0, 0]]);
}

#[tokio::test(start_paused = true)]
async fn test_cancel_unknown_task() {
    let registry = registry(1, 1);

    assert!(!registry.cancel(TaskId(42)));
    assert_eq!(registry.try_cancel(TaskId(42)), Err(Error::TaskNotFound));
    assert_eq!(registry.task_status(TaskId(42)), None);
}

#[tokio::test(start_paused = true)]
async fn test_invalid_selections() {
    let registry = registry(2, 3);

    assert_eq!(
        registry.schedule_devices([6, 100], Schedule::new(0, 1)),
        Err(Error::EmptySelection)
    );
    assert_eq!(
        registry.schedule_devices(Vec::new(), Schedule::new(0, 1)),
        Err(Error::EmptySelection)
    );
    assert_eq!(
        registry.schedule_row(2, Schedule::new(0, 1)),
        Err(Error::InvalidAddress)
    );
    assert_eq!(
        registry.schedule_column(3, Schedule::new(0, 1)),
        Err(Error::InvalidAddress)
    );
    assert_eq!(registry.task_count(), 0);

    // Unknown identifiers are skipped as long as something remains.
    let id = registry
        .schedule_devices([5, 5, 17], Schedule::new(0, 2))
        .unwrap();
    advance(1).await;
    assert_eq!(
        registry.matrix().brightness_grid(),
        vec![vec![0, 0, 0], vec![0, 0, 100]]
    );
    assert_eq!(registry.task_status(id), Some(TaskStatus::Fired));
}

#[tokio::test(start_paused = true)]
async fn test_schedule_all_and_compact() {
    let registry = registry(2, 2);

    let first = registry.schedule_all(Schedule::new(0, 1)).unwrap();
    let second = registry.schedule_all(Schedule::new(1, 1)).unwrap();
    let third = registry.schedule_all(Schedule::new(50, 1)).unwrap();
    assert!(first < second && second < third);
    assert!(registry.cancel(second));

    advance(3).await;
    assert_eq!(registry.task_status(first), Some(TaskStatus::Completed));
    assert_eq!(registry.task_count(), 3);
    assert_eq!(registry.active_task_count(), 1);

    assert_eq!(registry.compact(), 2);
    assert_eq!(registry.task_count(), 1);
    assert_eq!(registry.task_status(first), None);
    assert_eq!(registry.task_status(third), Some(TaskStatus::Pending));

    // Identifiers are never reused.
    let fourth = registry.schedule_all(Schedule::new(0, 1)).unwrap();
    assert!(fourth > third);
}

#[tokio::test(start_paused = true)]
async fn test_task_drives_sinks() {
    let _ = env_logger::try_init();

    let mut bank = MemorySinkBank::new(1);
    let matrix = Arc::new(Matrix::with_sinks(1, 3, 16, &mut bank));
    let registry = TaskRegistry::new(matrix, TIME_UNIT);
    let sink = bank.sink(0).unwrap();

    registry
        .schedule_device(1, Schedule::new(0, 2).with_brightness(50))
        .unwrap();

    advance(1).await;
    assert_eq!(sink.duty(1), Some(32768));

    advance(2).await;
    assert_eq!(sink.duty(1), Some(0));
}

#[tokio::test(start_paused = true)]
async fn test_huge_delays_keep_tasks_cancellable() {
    let _ = env_logger::try_init();
    let matrix = Arc::new(Matrix::new(1, 2));
    let registry = TaskRegistry::new(matrix, Duration::from_millis(u64::MAX));

    let far = registry
        .schedule_device(0, Schedule::new(u32::MAX, 1))
        .unwrap();
    let lit = registry
        .schedule_device(1, Schedule::new(0, u32::MAX))
        .unwrap();

    tokio::time::sleep(Duration::from_secs(1)).await;
    assert_eq!(registry.task_status(far), Some(TaskStatus::Pending));
    assert_eq!(registry.task_status(lit), Some(TaskStatus::Fired));
    assert_eq!(registry.matrix().brightness_grid(), vec![vec![0, 100]]);

    assert!(registry.cancel(far));
    assert_eq!(registry.task_status(far), Some(TaskStatus::Cancelled));
    assert_eq!(registry.active_task_count(), 1);
}

#[tokio::test(start_paused = true)]
async fn test_dropping_registry_aborts_timers() {
    let matrix = {
        let registry = registry(1, 1);
        registry.schedule_device(0, Schedule::new(2, 2)).unwrap();
        registry.matrix().clone()
    };

    advance(5).await;
    assert_eq!(matrix.devices()[0].brightness(), 0);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_concurrent_scheduling_yields_unique_ids() {
    let registry = Arc::new(registry(2, 2));

    let workers: Vec<_> = (0..4)
        .map(|_| {
            let registry = registry.clone();
            std::thread::spawn(move || {
                (0..50)
                    .map(|i| {
                        registry
                            .schedule_device(i % 4, Schedule::new(10_000, 1))
                            .unwrap()
                    })
                    .collect::<Vec<_>>()
            })
        })
        .collect();

    let mut all_ids = Vec::new();
    for worker in workers {
        let ids = worker.join().unwrap();
        // Every thread observes increasing identifiers.
        assert!(ids.windows(2).all(|pair| pair[0] < pair[1]));
        all_ids.extend(ids);
    }

    all_ids.sort_unstable();
    all_ids.dedup();
    assert_eq!(all_ids.len(), 200);
    assert_eq!(registry.active_task_count(), 200);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_fire_and_cancel_race_has_single_winner() {
    let _ = env_logger::try_init();

    for _ in 0..200 {
        let registry = TaskRegistry::new(Arc::new(Matrix::new(1, 1)), Duration::from_secs(1));
        let id = registry
            .schedule_device(0, Schedule::new(0, 60).with_brightness(70))
            .unwrap();
        let cancelled = registry.cancel(id);

        // Let the activation timer run to the end on the worker threads.
        let mut brightness = 0;
        for _ in 0..100 {
            tokio::time::sleep(Duration::from_millis(1)).await;
            brightness = registry.matrix().devices()[0].brightness();
            if cancelled || brightness == 70 {
                break;
            }
        }

        if cancelled {
            assert_eq!(registry.task_status(id), Some(TaskStatus::Cancelled));
            assert_eq!(brightness, 0);
            assert_eq!(registry.active_task_count(), 0);
        } else {
            assert_eq!(registry.task_status(id), Some(TaskStatus::Fired));
            assert_eq!(brightness, 70);
        }
    }
}
