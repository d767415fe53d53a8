use std::sync::Arc;

use enkf_optimizer::storage::{MemoryStorage, RecordStorage};
use enkf_optimizer::{EnkfOptimizer, Error, Step};

use super::{config, counting_factory, x_of};

#[test]
fn three_generations_fixed_fitness() {
    let storage = Arc::new(MemoryStorage::new());
    let mut opt = EnkfOptimizer::builder(config(4, 3))
        .storage(Arc::clone(&storage))
        .build(counting_factory())
        .unwrap();

    let schedule = [
        [1.0, 2.0, 3.0, 4.0],
        [2.0, 2.0, 2.0, 2.0],
        [5.0, 1.0, 1.0, 1.0],
    ];
    let mut steps = Vec::new();
    for fitness in &schedule {
        assert!(opt.ask().is_some());
        steps.push(opt.tell(fitness).unwrap());
    }

    assert_eq!(steps[0], Step::Continue { generation: 1 });
    assert_eq!(steps[1], Step::Continue { generation: 2 });
    let Step::Terminated(best) = steps[2] else {
        panic!("run should have terminated, got {:?}", steps[2]);
    };
    assert_eq!(best.generation, 2);
    assert_eq!(best.individual, 0);
    assert!((best.fitness - 5.0).abs() < f64::EPSILON);

    let records = storage.records();
    assert_eq!(records.len(), 3);
    for (g, record) in records.iter().enumerate() {
        assert_eq!(record.generation, g);
        assert_eq!(record.shape(), (4, 1));
    }

    assert!(opt.ask().is_none());
    assert!(matches!(opt.tell(&[0.0; 4]), Err(Error::Terminated)));

    let result = opt.finish().unwrap();
    assert_eq!(result.generations, 3);
    assert_eq!(result.best, best);
    assert!(result.individual.is_some());
}

#[test]
fn next_population_is_the_updated_ensemble() {
    let storage = Arc::new(MemoryStorage::new());
    let mut opt = EnkfOptimizer::builder(config(4, 3))
        .storage(Arc::clone(&storage))
        .build(counting_factory())
        .unwrap();
    opt.tell(&[1.0, 2.0, 3.0, 4.0]).unwrap();

    let record = storage.last().unwrap();
    let xs: Vec<f64> = opt.ask().unwrap().iter().map(x_of).collect();
    let weights: Vec<f64> = record.weights.iter().map(|row| row[0]).collect();
    assert_eq!(xs, weights);
    assert_eq!(opt.ensemble(), &record.to_matrix());
}

#[test]
fn optimize_drives_the_loop() {
    let mut opt = EnkfOptimizer::builder(config(6, 8).seed(3))
        .build(counting_factory())
        .unwrap();
    let mut evaluations = 0;
    let result = opt
        .optimize(|population| {
            evaluations += 1;
            Ok::<_, Error>(population.iter().map(|ind| -x_of(ind).powi(2)).collect())
        })
        .unwrap();

    assert_eq!(evaluations, 8);
    assert_eq!(result.generations, 8);
    assert_eq!(opt.storage().len(), 8);
    assert!(result.best.fitness <= 0.0);
}

#[derive(Debug)]
enum HarnessError {
    Simulation(&'static str),
    Optimizer(Error),
}

impl From<Error> for HarnessError {
    fn from(e: Error) -> Self {
        HarnessError::Optimizer(e)
    }
}

#[test]
fn evaluator_errors_propagate_unchanged() {
    let mut opt = EnkfOptimizer::builder(config(3, 5))
        .build(counting_factory())
        .unwrap();
    let mut calls = 0;
    let err = opt
        .optimize(|population| {
            calls += 1;
            if calls == 2 {
                return Err(HarnessError::Simulation("solver diverged"));
            }
            Ok(vec![1.0; population.len()])
        })
        .unwrap_err();
    assert!(matches!(err, HarnessError::Simulation("solver diverged")));
    assert_eq!(opt.generation(), 1);

    let err = opt
        .optimize(|_| Ok::<_, HarnessError>(vec![1.0]))
        .unwrap_err();
    assert!(matches!(
        err,
        HarnessError::Optimizer(Error::DimensionMismatch { .. })
    ));
}
