//! Training a small feed-forward image classifier with burn's autodiff and optimizers,
//! narrated step by step.
//!
//! The crate only sequences calls: load and normalize images, declare a stack of linear
//! stages, compute a loss, run the backward pass, step the optimizer, and repeat.

pub mod config;
pub mod dataloader;
pub mod datasets;
pub mod loss;
pub mod nn;
pub mod optim;
pub mod plot;
pub mod train;

#[cfg(test)]
#[macro_export]
macro_rules! assert_eq_float {
    ($a:expr, $b:expr) => {
        let (a, b) = ($a, $b);
        assert!((a - b).abs() < 1e-6, "{} != {}", a, b);
    };
}
