use std::collections::HashMap;
use std::io::Read;
use std::path::Path;

use serde::Deserialize;

use crate::error::{AppError, AppResult};
use crate::models::Rating;

/// Passes over a new reader's ratings when fitting their factors
const FOLD_IN_EPOCHS: usize = 100;
const FOLD_IN_LEARNING_RATE: f64 = 0.01;
const FOLD_IN_REGULARIZATION: f64 = 0.05;

/// Rating estimator for (user, book) pairs
///
/// Implemented by the trained latent-factor model in production; tests plug in
/// stubs. Estimation is synchronous and infallible: unknown users or books
/// still receive an estimate.
#[cfg_attr(test, mockall::automock)]
pub trait Predictor: Send + Sync {
    /// Estimated rating `user_id` would give `book_id`
    fn estimate(&self, user_id: u32, book_id: u32) -> f64;

    /// Estimated ratings for `book_ids` by a reader absent from training,
    /// known only by `ratings`; one estimate per book, in order
    fn estimate_unseen(&self, ratings: &[Rating], book_ids: &[u32]) -> Vec<f64>;

    /// Predictor name for logging
    fn name(&self) -> &'static str;
}

/// Learned bias and latent factors for one user or one book
#[derive(Debug, Clone, Deserialize)]
pub struct Factors {
    #[serde(default)]
    pub bias: f64,
    #[serde(default)]
    pub factors: Vec<f64>,
}

/// Matrix-factorization model exported from an offline SVD training run
///
/// `estimate = mean + b_u + b_i + q_i . p_u`; the user terms are dropped for
/// unknown users, the book terms for unknown books, and the factor product
/// whenever either side is unknown. The result is clamped to the rating scale.
#[derive(Debug, Clone, Deserialize)]
pub struct SvdModel {
    global_mean: f64,
    rating_scale: (f64, f64),
    #[serde(default)]
    users: HashMap<u32, Factors>,
    #[serde(default)]
    items: HashMap<u32, Factors>,
}

impl SvdModel {
    /// Loads a JSON model file
    pub fn load(path: impl AsRef<Path>) -> AppResult<Self> {
        let file = std::fs::File::open(path.as_ref())?;
        Self::from_reader(std::io::BufReader::new(file))
    }

    pub fn from_reader(reader: impl Read) -> AppResult<Self> {
        let model: SvdModel = serde_json::from_reader(reader)?;
        model.validate()?;
        tracing::info!(
            users = model.users.len(),
            items = model.items.len(),
            global_mean = model.global_mean,
            "Prediction model loaded"
        );
        Ok(model)
    }

    fn validate(&self) -> AppResult<()> {
        let (lo, hi) = self.rating_scale;
        if lo.is_nan() || hi.is_nan() || lo >= hi {
            return Err(AppError::Internal(format!(
                "Model rating scale is empty: [{}, {}]",
                lo, hi
            )));
        }

        let mut rank = None;
        for factors in self.users.values().chain(self.items.values()) {
            match rank {
                None => rank = Some(factors.factors.len()),
                Some(r) if r != factors.factors.len() => {
                    return Err(AppError::Internal(format!(
                        "Model factor vectors have inconsistent lengths ({} vs {})",
                        r,
                        factors.factors.len()
                    )));
                }
                Some(_) => {}
            }
        }
        Ok(())
    }
}

impl SvdModel {
    fn rank(&self) -> usize {
        self.items
            .values()
            .chain(self.users.values())
            .next()
            .map_or(0, |f| f.factors.len())
    }

    /// Unclamped `mean + b_u + b_i + q_i . p_u`, skipping absent terms
    fn raw_estimate(&self, user: Option<&Factors>, item: Option<&Factors>) -> f64 {
        let mut est = self.global_mean;
        if let Some(u) = user {
            est += u.bias;
        }
        if let Some(i) = item {
            est += i.bias;
        }
        if let (Some(u), Some(i)) = (user, item) {
            est += u
                .factors
                .iter()
                .zip(&i.factors)
                .map(|(p, q)| p * q)
                .sum::<f64>();
        }
        est
    }

    fn clamp(&self, est: f64) -> f64 {
        let (lo, hi) = self.rating_scale;
        est.clamp(lo, hi)
    }

    /// Fits bias and factors for a new reader against the trained book factors
    ///
    /// Regularized SGD over the reader's ratings with every book's parameters
    /// held fixed. Books unknown to the model only inform the bias.
    pub fn fold_in(&self, ratings: &[Rating]) -> Factors {
        let mut user = Factors {
            bias: 0.0,
            factors: vec![0.0; self.rank()],
        };

        for _ in 0..FOLD_IN_EPOCHS {
            for rating in ratings {
                let item = self.items.get(&rating.book_id);
                let err = f64::from(rating.rating) - self.raw_estimate(Some(&user), item);
                user.bias += FOLD_IN_LEARNING_RATE * (err - FOLD_IN_REGULARIZATION * user.bias);
                if let Some(item) = item {
                    for (p, q) in user.factors.iter_mut().zip(&item.factors) {
                        *p += FOLD_IN_LEARNING_RATE * (err * q - FOLD_IN_REGULARIZATION * *p);
                    }
                }
            }
        }

        user
    }
}

impl Predictor for SvdModel {
    fn estimate(&self, user_id: u32, book_id: u32) -> f64 {
        self.clamp(self.raw_estimate(self.users.get(&user_id), self.items.get(&book_id)))
    }

    fn estimate_unseen(&self, ratings: &[Rating], book_ids: &[u32]) -> Vec<f64> {
        let user = self.fold_in(ratings);
        tracing::debug!(rated = ratings.len(), bias = user.bias, "Folded in new reader");
        book_ids
            .iter()
            .map(|id| self.clamp(self.raw_estimate(Some(&user), self.items.get(id))))
            .collect()
    }

    fn name(&self) -> &'static str {
        "svd"
    }
}
