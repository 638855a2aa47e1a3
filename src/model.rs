//! Model seams for the live agent
//!
//! Decision models are injected behind the `Predictor` trait so the
//! agent never depends on a concrete inference backend. A `ModelPool`
//! fans one feature row out to several per-opponent models; a
//! `MergeModel` feeds the pool's outputs into a second-stage model.

/// A scalar-output model over one cleaned feature row
pub trait Predictor: Send + Sync {
    fn predict(&self, row: &[f64]) -> f64;
}

impl<F> Predictor for F
where
    F: Fn(&[f64]) -> f64 + Send + Sync,
{
    fn predict(&self, row: &[f64]) -> f64 {
        self(row)
    }
}

/// A fixed set of models evaluated on the same row
pub struct ModelPool {
    models: Vec<Box<dyn Predictor>>,
}

impl ModelPool {
    pub fn new(models: Vec<Box<dyn Predictor>>) -> Self {
        ModelPool { models }
    }

    pub fn len(&self) -> usize {
        self.models.len()
    }

    pub fn is_empty(&self) -> bool {
        self.models.is_empty()
    }

    /// Outputs of every model, in pool order
    pub fn predict(&self, row: &[f64]) -> Vec<f64> {
        self.models.iter().map(|m| m.predict(row)).collect()
    }

    /// Output of a single pool member
    pub fn predict_model(&self, row: &[f64], num: usize) -> f64 {
        self.models[num].predict(row)
    }
}

/// Two-stage model: a pool of first-stage models whose outputs feed a
/// merging second stage
pub struct MergeModel {
    pool: ModelPool,
    merger: Box<dyn Predictor>,
}

impl MergeModel {
    pub fn new(pool: ModelPool, merger: Box<dyn Predictor>) -> Self {
        MergeModel { pool, merger }
    }

    /// Merged prediction, or a single first-stage model's output when
    /// `model_num` pins one
    pub fn predict(&self, row: &[f64], model_num: Option<usize>) -> f64 {
        match model_num {
            Some(num) => self.pool.predict_model(row, num),
            None => self.merger.predict(&self.pool.predict(row)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn merge_model() -> MergeModel {
        let pool = ModelPool::new(vec![
            Box::new(|row: &[f64]| row[0] + 1.0),
            Box::new(|row: &[f64]| row[0] + 2.0),
        ]);
        // merger sums the pool outputs
        MergeModel::new(pool, Box::new(|row: &[f64]| -> f64 { row.iter().sum() }))
    }

    #[test]
    fn test_pool_orders_outputs() {
        let pool = ModelPool::new(vec![
            Box::new(|_: &[f64]| 0.25),
            Box::new(|_: &[f64]| 0.75),
        ]);
        assert_eq!(pool.predict(&[0.0]), vec![0.25, 0.75]);
        assert_eq!(pool.predict_model(&[0.0], 1), 0.75);
    }

    #[test]
    fn test_merge_combines_pool_outputs() {
        let model = merge_model();
        assert_eq!(model.predict(&[10.0], None), 23.0);
    }

    #[test]
    fn test_merge_pins_single_model() {
        let model = merge_model();
        assert_eq!(model.predict(&[10.0], Some(0)), 11.0);
        assert_eq!(model.predict(&[10.0], Some(1)), 12.0);
    }
}
