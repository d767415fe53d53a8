use enkf_optimizer::{EnkfOptimizer, Error};

use super::{config, counting_factory, x_of};

fn next_xs(opt: &EnkfOptimizer) -> Vec<f64> {
    opt.ask().unwrap().iter().map(x_of).collect()
}

#[test]
fn zero_gamma_means_no_observation_noise() {
    // Population x = 3, 4, 5 with outputs equal to x: the gain is
    // Cup / (Cpp + gamma) = (2/3) / (2/3 + gamma).
    let fitness = [vec![3.0], vec![4.0], vec![5.0]];

    let mut exact = EnkfOptimizer::builder(config(3, 3).observations(vec![9.0]).gamma(0.0))
        .build(counting_factory())
        .unwrap();
    exact.tell_vectors(&fitness).unwrap();
    for x in next_xs(&exact) {
        assert!((x - 9.0).abs() < 1e-9, "x = {x}");
    }

    let mut noisy = EnkfOptimizer::builder(config(3, 3).observations(vec![9.0]).gamma(1.0))
        .build(counting_factory())
        .unwrap();
    noisy.tell_vectors(&fitness).unwrap();
    assert!((next_xs(&noisy)[0] - 5.4).abs() < 1e-9);
}

#[test]
fn zero_gamma_with_constant_outputs_is_singular() {
    let mut opt = EnkfOptimizer::builder(config(3, 3).gamma(0.0))
        .build(counting_factory())
        .unwrap();
    assert!(matches!(
        opt.tell(&[2.0, 2.0, 2.0]),
        Err(Error::NumericalInstability { .. })
    ));
    assert_eq!(opt.generation(), 0);
}

#[test]
fn depth_slices_are_applied_in_order() {
    // Population x = 2, 3; each member reports r = 2 values for k = 1.
    // Slice 0 (g = 0, 2): gain 0.25 -> x = 2.75, 3.25.
    // Slice 1 (g = 1, 3): gain 0.125 -> x = 3.0, 3.25.
    let mut opt = EnkfOptimizer::builder(config(2, 3).observations(vec![3.0]).gamma(1.0))
        .build(counting_factory())
        .unwrap();
    assert_eq!(next_xs(&opt), vec![2.0, 3.0]);

    opt.tell_vectors(&[vec![0.0, 1.0], vec![2.0, 3.0]]).unwrap();
    let xs = next_xs(&opt);
    assert!((xs[0] - 3.0).abs() < 1e-12, "xs = {xs:?}");
    assert!((xs[1] - 3.25).abs() < 1e-12, "xs = {xs:?}");
}

#[test]
fn non_finite_fitness_is_rejected_without_state_change() {
    let mut opt = EnkfOptimizer::builder(config(4, 3))
        .build(counting_factory())
        .unwrap();
    let ensemble = opt.ensemble().clone();

    assert!(matches!(
        opt.tell(&[1.0, f64::NAN, 2.0, 3.0]),
        Err(Error::NonFiniteFitness { member: 1 })
    ));
    assert!(matches!(
        opt.tell(&[1.0, 2.0, 3.0, f64::INFINITY]),
        Err(Error::NonFiniteFitness { member: 3 })
    ));

    assert_eq!(opt.generation(), 0);
    assert_eq!(opt.ensemble(), &ensemble);
    assert!(opt.best().fitness.is_infinite());
    assert!(opt.tell(&[1.0, 2.0, 3.0, 4.0]).is_ok());
}
