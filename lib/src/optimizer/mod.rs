use crate::model::ParamOps;

/// Trait for gradient-based optimizers.
///
/// Optimizers are responsible for updating model parameters based on computed gradients.
/// Training logic (`Trainer`) is decoupled from parameter update logic, so any model
/// whose parameters implement [`ParamOps`] can be paired with any optimizer.
///
/// # Example
/// ```ignore
/// use formation_recommender::model::LogisticParams;
/// use formation_recommender::optimizer::{Optimizer, SGD};
/// use ndarray::arr1;
///
/// let params = LogisticParams { weights: arr1(&[1.0, 2.0, 3.0]), bias: 0.5 };
/// let gradients = LogisticParams { weights: arr1(&[0.1, -0.2, 0.05]), bias: -0.01 };
/// let sgd = SGD::new(0.01);
/// let updated_params = sgd.step(&params, &gradients);
/// ```
pub trait Optimizer<P> {
    /// Performs an optimization step using the update rule:
    /// ```text
    /// params_new = params - learning_rate * gradients
    /// ```
    ///
    /// Inputs are not mutated; a new parameter set is returned.
    fn step(&self, params: &P, gradients: &P) -> P;
}

/// Stochastic Gradient Descent (SGD) optimizer.
///
/// ```text
/// θ ← θ - η · ∇L(θ)
/// ```
/// where `η` is the learning rate and `∇L(θ)` is the loss gradient.
/// Stateless: no momentum, no adaptive learning rates.
#[derive(Clone, Copy, Debug)]
pub struct SGD {
    lr: f64,
}

impl SGD {
    /// Creates a new SGD optimizer with the specified learning rate.
    pub fn new(lr: f64) -> Self {
        Self { lr }
    }

    /// Returns the current learning rate.
    pub fn learning_rate(&self) -> f64 {
        self.lr
    }
}

impl<P: ParamOps> Optimizer<P> for SGD {
    fn step(&self, params: &P, grads: &P) -> P {
        // single scale + add instead of scale + subtract
        params.add(&grads.scale(-self.lr))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::LogisticParams;
    use ndarray::arr1;

    fn params(weights: &[f64], bias: f64) -> LogisticParams {
        LogisticParams {
            weights: arr1(weights),
            bias,
        }
    }

    #[test]
    fn test_sgd_new_initialization() {
        let sgd = SGD::new(0.01);
        assert_eq!(sgd.learning_rate(), 0.01);
    }

    #[test]
    fn test_sgd_step_correctness() {
        let sgd = SGD::new(0.1);
        let updated = sgd.step(&params(&[2.0, 3.0], 1.0), &params(&[1.0, -1.0], 0.5));

        // weights: [2.0 - 0.1*1.0, 3.0 - 0.1*(-1.0)] = [1.9, 3.1]
        assert!((updated.weights[0] - 1.9).abs() < 1e-12);
        assert!((updated.weights[1] - 3.1).abs() < 1e-12);
        // bias: 1.0 - 0.1*0.5
        assert!((updated.bias - 0.95).abs() < 1e-12);
    }

    #[test]
    fn test_sgd_step_zero_gradients() {
        let sgd = SGD::new(0.1);
        let p = params(&[1.0, 2.0], 0.5);
        let updated = sgd.step(&p, &params(&[0.0, 0.0], 0.0));
        assert_eq!(updated, p);
    }

    #[test]
    fn test_sgd_step_zero_learning_rate() {
        let sgd = SGD::new(0.0);
        let p = params(&[1.0, 2.0], 0.5);
        let updated = sgd.step(&p, &params(&[1.0, 1.0], 1.0));
        assert_eq!(updated, p);
    }

    #[test]
    fn test_sgd_step_does_not_mutate_inputs() {
        let sgd = SGD::new(0.1);
        let p = params(&[1.0, 2.0], 0.5);
        let g = params(&[0.5, 0.3], 0.1);
        let (p_copy, g_copy) = (p.clone(), g.clone());

        let _ = sgd.step(&p, &g);

        assert_eq!(p, p_copy);
        assert_eq!(g, g_copy);
    }
}
