use enkf_optimizer::storage::RecordStorage;
use enkf_optimizer::{EnkfOptimizer, Error, RunState, Step};

use super::{config, counting_factory, x_of};

#[test]
fn factory_is_called_twice_per_slot() {
    let mut calls = 0;
    let opt = EnkfOptimizer::builder(config(4, 3))
        .build(|| {
            calls += 1;
            enkf_optimizer::Individual::new().with("x", f64::from(calls))
        })
        .unwrap();
    assert_eq!(calls, 8);

    // The population comes from the second batch of calls.
    let xs: Vec<f64> = opt.ask().unwrap().iter().map(x_of).collect();
    assert_eq!(xs, vec![5.0, 6.0, 7.0, 8.0]);
}

#[test]
fn fresh_optimizer_awaits_generation_zero() {
    let opt = EnkfOptimizer::builder(config(3, 2))
        .build(counting_factory())
        .unwrap();
    assert_eq!(opt.state(), RunState::AwaitingFitness { generation: 0 });
    assert_eq!(opt.generation(), 0);
    assert_eq!(opt.ask().unwrap().len(), 3);
    assert_eq!(opt.ensemble().shape(), (3, 1));
    assert!(opt.current_fitness().is_infinite());
    assert!(opt.finish().is_none());
    assert!(opt.storage().is_empty());
}

#[test]
fn tell_advances_one_generation() {
    let mut opt = EnkfOptimizer::builder(config(3, 5))
        .build(counting_factory())
        .unwrap();
    let step = opt.tell(&[1.0, 2.0, 3.0]).unwrap();
    assert_eq!(step, Step::Continue { generation: 1 });
    assert_eq!(opt.generation(), 1);
    assert_eq!(opt.state(), RunState::AwaitingFitness { generation: 1 });
    assert!((opt.current_fitness() - 3.0).abs() < f64::EPSILON);
    assert_eq!(opt.storage().len(), 1);
}

#[test]
fn wrong_fitness_length_leaves_state_untouched() {
    let mut opt = EnkfOptimizer::builder(config(4, 3))
        .build(counting_factory())
        .unwrap();
    let ensemble = opt.ensemble().clone();
    let population = opt.ask().unwrap().to_vec();

    let err = opt.tell(&[1.0, 2.0, 3.0]).unwrap_err();
    assert!(matches!(
        err,
        Error::DimensionMismatch {
            expected: 4,
            got: 3,
            ..
        }
    ));

    assert_eq!(opt.generation(), 0);
    assert_eq!(opt.ensemble(), &ensemble);
    assert_eq!(opt.ask().unwrap(), population.as_slice());
    assert!(opt.storage().is_empty());

    // The same generation can still be told.
    assert!(opt.tell(&[1.0, 2.0, 3.0, 4.0]).is_ok());
}

#[test]
fn singular_update_is_surfaced_without_state_change() {
    let cfg = config(4, 3).observations(vec![0.0, 0.0]).gamma(1e-20);
    let mut opt = EnkfOptimizer::builder(cfg)
        .build(counting_factory())
        .unwrap();
    let ensemble = opt.ensemble().clone();

    // Perfectly correlated outputs make Cpp rank one.
    let fitness: Vec<Vec<f64>> = (1..=4).map(|v| vec![f64::from(v); 2]).collect();
    let err = opt.tell_vectors(&fitness).unwrap_err();
    assert!(matches!(err, Error::NumericalInstability { .. }));
    assert_eq!(opt.ensemble(), &ensemble);
    assert_eq!(opt.generation(), 0);
    assert!(opt.best().fitness.is_infinite());
}

#[test]
fn multi_observation_fitness_uses_member_maximum() {
    let cfg = config(3, 2).observations(vec![0.0, 0.0]);
    let mut opt = EnkfOptimizer::builder(cfg)
        .build(counting_factory())
        .unwrap();
    opt.tell_vectors(&[vec![1.0, 9.0], vec![3.0, 2.0], vec![0.5, 0.0]])
        .unwrap();
    let best = opt.best();
    assert_eq!(best.individual, 0);
    assert!((best.fitness - 9.0).abs() < f64::EPSILON);
}

#[test]
fn scalar_tell_needs_single_observation() {
    let cfg = config(2, 2).observations(vec![0.0, 0.0]);
    let mut opt = EnkfOptimizer::builder(cfg)
        .build(counting_factory())
        .unwrap();
    assert!(matches!(
        opt.tell(&[1.0, 2.0]),
        Err(Error::DimensionMismatch { .. })
    ));
}
