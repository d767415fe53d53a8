use enkf_optimizer::{EnkfOptimizer, Error, RunState, Step};

use super::{config, counting_factory};

#[test]
fn threshold_stops_early() {
    let mut opt = EnkfOptimizer::builder(config(4, 10).stop_criterion(3.0))
        .build(counting_factory())
        .unwrap();
    assert_eq!(opt.tell(&[0.0, 1.0, 2.0, 2.5]).unwrap(), Step::Continue { generation: 1 });
    let step = opt.tell(&[1.0, 2.0, 3.0, 0.0]).unwrap();
    assert!(matches!(step, Step::Terminated(best) if best.generation == 1 && best.individual == 2));
    assert_eq!(opt.state(), RunState::Terminated);
    assert_eq!(opt.finish().unwrap().generations, 2);
}

#[test]
fn infinite_threshold_runs_full_budget() {
    let mut opt = EnkfOptimizer::builder(config(3, 4))
        .build(counting_factory())
        .unwrap();
    let mut told = 0;
    while opt.ask().is_some() {
        opt.tell(&[1e9, 1e10, 1e11]).unwrap();
        told += 1;
    }
    assert_eq!(told, 4);
}

#[test]
fn single_generation_budget() {
    let mut opt = EnkfOptimizer::builder(config(2, 1))
        .build(counting_factory())
        .unwrap();
    assert!(matches!(opt.tell(&[0.0, 1.0]).unwrap(), Step::Terminated(_)));
    assert!(matches!(opt.tell(&[0.0, 1.0]), Err(Error::Terminated)));
}

#[test]
fn best_is_monotonic() {
    let mut opt = EnkfOptimizer::builder(config(3, 6))
        .build(counting_factory())
        .unwrap();
    let schedule = [
        [1.0, 0.0, 0.0],
        [0.5, 0.5, 0.5],
        [0.0, 3.0, 1.0],
        [3.0, 2.0, 1.0],
        [-1.0, -2.0, -3.0],
        [2.0, 2.0, 2.0],
    ];
    let mut previous = f64::NEG_INFINITY;
    for fitness in &schedule {
        opt.tell(fitness).unwrap();
        let best = opt.best().fitness;
        assert!(best >= previous);
        previous = best;
    }
    // Ties do not replace the record.
    let best = opt.best();
    assert_eq!((best.generation, best.individual), (2, 1));
}
