use burn::backend::NdArray;
use burn::prelude::*;

use layerforge::TrainError;
use layerforge::config::PoolOptions;
use layerforge::pool::{HistoryPool, ImagePool};
use layerforge::rng::DeterministicRng;

type TestBackend = NdArray<f32>;

fn pool(capacity: i64, probability: f64, seed: u64) -> HistoryPool<u32> {
    HistoryPool::with_rng(capacity, probability, DeterministicRng::new(seed)).unwrap()
}

#[test]
fn capacity_one_always_swapping() {
    let mut pool = pool(1, 1.0, 7);
    assert_eq!(pool.query(1), 1);
    assert_eq!(pool.entries(), &[1]);
    assert_eq!(pool.query(2), 1);
    assert_eq!(pool.entries(), &[2]);
    assert_eq!(pool.query(3), 2);
    assert_eq!(pool.entries(), &[3]);
}

#[test]
fn capacity_one_never_swapping() {
    let mut pool = pool(1, 0.0, 7);
    assert_eq!(pool.query(1), 1);
    assert_eq!(pool.query(2), 2);
    assert_eq!(pool.query(3), 3);
    assert_eq!(pool.entries(), &[1]);
}

#[test]
fn capacity_one_with_even_odds() {
    for seed in 0..16 {
        let mut pool = pool(1, 0.5, seed);
        assert_eq!(pool.query(1), 1);
        let second = pool.query(2);
        match second {
            1 => assert_eq!(pool.entries(), &[2]),
            2 => assert_eq!(pool.entries(), &[1]),
            other => panic!("unexpected value {other}"),
        }
        let held = pool.entries()[0];
        let third = pool.query(3);
        assert!(third == 3 || third == held);
        assert_eq!(pool.len(), 1);
    }
}

#[test]
fn full_pool_returns_new_input_or_prior_member() {
    let capacity = 5;
    let mut pool = pool(capacity, 0.5, 42);
    for value in 0..capacity as u32 {
        assert_eq!(pool.query(value), value);
    }
    assert_eq!(pool.len(), capacity as usize);

    let mut returned_stored = 0;
    for value in 100..300u32 {
        let before: Vec<u32> = pool.entries().to_vec();
        let returned = pool.query(value);
        if returned == value {
            assert_eq!(pool.entries(), before.as_slice());
        } else {
            returned_stored += 1;
            assert!(before.contains(&returned));
            assert!(pool.entries().contains(&value));
            assert!(!pool.entries().contains(&returned));
        }
        assert_eq!(pool.len(), capacity as usize);
    }
    assert!(returned_stored > 50 && returned_stored < 150, "{returned_stored}");
}

#[test]
fn zero_capacity_is_identity() {
    let mut pool = pool(0, 0.5, 1);
    for value in 0..10 {
        assert_eq!(pool.query(value), value);
    }
    assert!(pool.is_empty());
}

#[test]
fn invalid_settings_are_rejected() {
    assert!(matches!(
        HistoryPool::<u32>::with_rng(-1, 0.5, DeterministicRng::new(0)),
        Err(TrainError::Configuration(_))
    ));
    assert!(matches!(
        HistoryPool::<u32>::with_rng(4, 1.5, DeterministicRng::new(0)),
        Err(TrainError::Configuration(_))
    ));
    assert!(HistoryPool::<u32>::new(&PoolOptions::with_capacity(-3)).is_err());
}

#[test]
fn image_pool_queries_each_batch_element() {
    let device = Default::default();
    let mut pool: ImagePool<TestBackend> =
        ImagePool::with_rng(2, 1.0, DeterministicRng::new(3)).unwrap();
    let images =
        Tensor::<TestBackend, 1>::from_floats([0.0, 1.0, 2.0], &device).reshape([3, 1, 1, 1]);

    let returned = pool.query_batch(images);
    assert_eq!(returned.dims(), [3, 1, 1, 1]);
    let values = returned.into_data().to_vec::<f32>().unwrap();
    assert_eq!(&values[..2], &[0.0, 1.0]);
    assert!(values[2] == 0.0 || values[2] == 1.0);
    assert_eq!(pool.len(), 2);

    let mut disabled: ImagePool<TestBackend> =
        ImagePool::new(&PoolOptions::with_capacity(0)).unwrap();
    let images = Tensor::<TestBackend, 1>::from_floats([5.0, 6.0], &device).reshape([2, 1, 1, 1]);
    let values = disabled
        .query_batch(images)
        .into_data()
        .to_vec::<f32>()
        .unwrap();
    assert_eq!(values, vec![5.0, 6.0]);
    assert!(disabled.is_empty());
}
