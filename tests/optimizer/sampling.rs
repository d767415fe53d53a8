use enkf_optimizer::{EnkfOptimizer, Error};

use super::{config, counting_factory, x_of};

#[test]
fn unknown_pick_method_is_rejected_at_build() {
    let cfg = config(4, 3).sample(true).pick_method("tournament");
    let err = EnkfOptimizer::builder(cfg)
        .build(counting_factory())
        .err()
        .unwrap();
    assert!(matches!(err, Error::Configuration(msg) if msg.contains("tournament")));
}

#[test]
fn zero_fraction_sampling_matches_no_sampling() {
    let fitness = [1.0, 2.0, 3.0, 4.0];

    let mut plain = EnkfOptimizer::builder(config(4, 3))
        .build(counting_factory())
        .unwrap();
    plain.tell(&fitness).unwrap();

    for (best_n, worst_n) in [(0.0, 0.5), (0.5, 0.0)] {
        let cfg = config(4, 3).sample(true).best_n(best_n).worst_n(worst_n);
        let mut sampled = EnkfOptimizer::builder(cfg)
            .build(counting_factory())
            .unwrap();
        sampled.tell(&fitness).unwrap();
        assert_eq!(sampled.ensemble(), plain.ensemble());
    }
}

#[test]
fn elite_copies_replace_worst_before_update() {
    // Noise-free copies and identical outputs after resampling: the worst
    // member becomes the best one and the update has nothing to spread.
    let cfg = config(2, 3)
        .sample(true)
        .best_n(0.5)
        .worst_n(0.5)
        .pick_method("best_first")
        .kwargs(enkf_optimizer::sampling::PolicyKwargs {
            pick_probability: 1.0,
            scale: 0.0,
            ..Default::default()
        });
    let mut opt = EnkfOptimizer::builder(cfg)
        .build(counting_factory())
        .unwrap();
    let before: Vec<f64> = opt.ask().unwrap().iter().map(x_of).collect();
    opt.tell(&[1.0, 5.0]).unwrap();
    let after: Vec<f64> = opt.ask().unwrap().iter().map(x_of).collect();
    assert_eq!(after, vec![before[1], before[1]]);
}
