#![allow(
    clippy::cast_sign_loss,
    clippy::cast_precision_loss,
    clippy::cast_possible_truncation
)]

mod ask_tell;
mod determinism;
mod end_to_end;
mod sampling;
mod schema;
mod stop_condition;
mod update_step;

use enkf_optimizer::{EnkfConfig, Individual};

/// A single observation at zero, no early stop.
fn config(pop_size: usize, n_iteration: usize) -> EnkfConfig {
    EnkfConfig::default()
        .pop_size(pop_size)
        .n_iteration(n_iteration)
        .observations(vec![0.0])
}

/// Factory producing `x = 0, 1, 2, ...` on successive calls.
fn counting_factory() -> impl FnMut() -> Individual {
    let mut next = 0.0;
    move || {
        let ind = Individual::new().with("x", next);
        next += 1.0;
        ind
    }
}

fn x_of(ind: &Individual) -> f64 {
    ind.get("x").and_then(enkf_optimizer::ParamValue::as_scalar).unwrap()
}
