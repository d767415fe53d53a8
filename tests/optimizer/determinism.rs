use enkf_optimizer::storage::RecordStorage;
use enkf_optimizer::{EnkfConfig, EnkfOptimizer, GenerationRecord, Individual};

fn run(cfg: EnkfConfig) -> Vec<GenerationRecord> {
    let mut factory_rng = fastrand::Rng::with_seed(99);
    let mut opt = EnkfOptimizer::builder(cfg)
        .build(move || {
            Individual::new()
                .with("a", factory_rng.f64() * 4.0 - 2.0)
                .with("b", vec![factory_rng.f64(), factory_rng.f64()])
        })
        .unwrap();
    opt.optimize(|population| {
        Ok::<_, enkf_optimizer::Error>(
            population
                .iter()
                .map(|ind| {
                    let a = ind.get("a").unwrap().as_slice()[0];
                    let b = ind.get("b").unwrap().as_slice();
                    -(a.powi(2) + b[0].powi(2) + (b[1] - 1.0).powi(2))
                })
                .collect(),
        )
    })
    .unwrap();
    opt.storage().records()
}

fn sampled(method: &str, seed: u64) -> EnkfConfig {
    EnkfConfig::default()
        .pop_size(12)
        .n_iteration(6)
        .observations(vec![0.0])
        .seed(seed)
        .sample(true)
        .best_n(0.25)
        .worst_n(0.5)
        .pick_method(method)
}

#[test]
fn same_seed_same_trajectory() {
    for method in enkf_optimizer::sampling::PICK_METHODS {
        let a = run(sampled(method, 17));
        let b = run(sampled(method, 17));
        assert_eq!(a.len(), 6);
        assert_eq!(a, b, "method {method} is not reproducible");
    }
}

#[test]
fn different_seeds_diverge_with_sampling() {
    let a = run(sampled("random", 1));
    let b = run(sampled("random", 2));
    assert_ne!(a, b);
}
