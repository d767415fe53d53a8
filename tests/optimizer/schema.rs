use enkf_optimizer::{EnkfOptimizer, Error, Individual, ParamValue};

use super::config;

#[test]
fn array_fields_keep_their_shape() {
    let mut opt = EnkfOptimizer::builder(config(3, 2))
        .build(|| {
            Individual::new()
                .with("gain", 1.0)
                .with(
                    "weights",
                    ParamValue::Array {
                        shape: vec![2, 2],
                        values: vec![0.1, 0.2, 0.3, 0.4],
                    },
                )
        })
        .unwrap();
    assert_eq!(opt.schemas().len(), 3);
    assert!(opt.schemas().iter().all(|s| s == &opt.schemas()[0]));
    assert_eq!(opt.schemas()[0].width(), 5);
    assert_eq!(opt.ensemble().shape(), (3, 5));

    opt.tell(&[0.0, 1.0, 2.0]).unwrap();
    for ind in opt.ask().unwrap() {
        assert!(matches!(
            ind.get("weights"),
            Some(ParamValue::Array { shape, .. }) if shape == &vec![2, 2]
        ));
        assert!(ind.get("gain").unwrap().as_scalar().is_some());
    }
}

#[test]
fn bounding_applies_to_every_generation() {
    let mut next = 0.0;
    let mut opt = EnkfOptimizer::builder(config(4, 4))
        .bounding_func(|ind| ind.map_values(|_, v| v.clamp(0.0, 6.5)))
        .build(move || {
            next += 1.0;
            Individual::new().with("x", next)
        })
        .unwrap();
    while let Some(population) = opt.ask() {
        assert!(population.iter().all(|ind| {
            let x = ind.get("x").unwrap().as_slice()[0];
            (0.0..=6.5).contains(&x)
        }));
        let fitness: Vec<f64> = (0..population.len()).map(|i| i as f64 * 10.0).collect();
        opt.tell(&fitness).unwrap();
    }
}

#[test]
fn bounding_that_breaks_schema_is_rejected() {
    let err = EnkfOptimizer::builder(config(2, 2))
        .bounding_func(|ind| ind.with("extra", 0.0))
        .build(|| Individual::new().with("x", 0.0))
        .err()
        .unwrap();
    assert!(matches!(err, Error::SchemaMismatch { field, .. } if field == "extra"));
}

#[test]
fn slots_must_flatten_to_the_same_width() {
    let mut calls = 0;
    let err = EnkfOptimizer::builder(config(2, 2))
        .build(|| {
            calls += 1;
            if calls == 2 {
                Individual::new().with("x", vec![0.0, 1.0])
            } else {
                Individual::new().with("x", 0.0)
            }
        })
        .err()
        .unwrap();
    assert!(matches!(err, Error::Configuration(_)));
}

#[test]
fn empty_individual_is_rejected() {
    let err = EnkfOptimizer::builder(config(2, 2))
        .build(Individual::new)
        .err()
        .unwrap();
    assert!(matches!(err, Error::Configuration(_)));
}
