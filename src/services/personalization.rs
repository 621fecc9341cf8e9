use std::collections::HashSet;

use crate::{
    db::Catalog,
    error::{AppError, AppResult},
    models::{Rating, RecommendedBook, TitleRatings},
    services::Predictor,
};

/// Default number of personalized recommendations
pub const DEFAULT_RECOMMENDATIONS: usize = 5;

/// A visitor's submitted ratings, re-keyed as a synthetic catalog user
#[derive(Debug, Clone, PartialEq)]
pub struct NewUserProfile {
    pub user_id: u32,
    pub ratings: Vec<Rating>,
}

/// Historical ratings followed by one synthetic user's ratings
///
/// Borrowed view over the catalog's table; nothing is written back.
#[derive(Debug, Clone, Copy)]
pub struct ExtendedRatings<'a> {
    base: &'a [Rating],
    extra: &'a [Rating],
}

impl<'a> ExtendedRatings<'a> {
    pub fn new(base: &'a [Rating], extra: &'a [Rating]) -> Self {
        Self { base, extra }
    }

    pub fn iter(&self) -> impl Iterator<Item = &'a Rating> {
        self.base.iter().chain(self.extra.iter())
    }

    pub fn len(&self) -> usize {
        self.base.len() + self.extra.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn rated_by(&self, user_id: u32) -> HashSet<u32> {
        self.iter()
            .filter(|r| r.user_id == user_id)
            .map(|r| r.book_id)
            .collect()
    }
}

/// Turns free-form title ratings into predictor-ranked recommendations
pub struct Personalizer<'a> {
    catalog: &'a Catalog,
    predictor: &'a dyn Predictor,
}

impl<'a> Personalizer<'a> {
    pub fn new(catalog: &'a Catalog, predictor: &'a dyn Predictor) -> Self {
        Self { catalog, predictor }
    }

    /// Maps titles to book ids under a fresh synthetic user id
    ///
    /// The id is one past the largest historical user id. Fails with every
    /// title that has no exact match in the catalog.
    pub fn resolve_new_user(&self, title_ratings: &TitleRatings) -> AppResult<NewUserProfile> {
        let user_id = self.catalog.max_user_id().map_or(1, |max| max + 1);

        let mut ratings = Vec::with_capacity(title_ratings.len());
        let mut unknown = Vec::new();
        for (title, &rating) in title_ratings {
            match self.catalog.book_id_for_title(title) {
                Some(book_id) => ratings.push(Rating {
                    user_id,
                    book_id,
                    rating,
                }),
                None => unknown.push(title.clone()),
            }
        }

        if !unknown.is_empty() {
            tracing::warn!(titles = ?unknown, "Ratings reference titles missing from the catalog");
            return Err(AppError::UnknownTitles(unknown));
        }

        tracing::debug!(user_id, rated = ratings.len(), "Resolved new user");
        Ok(NewUserProfile { user_id, ratings })
    }

    /// Historical ratings extended with `profile`'s synthetic rows
    pub fn extended_ratings<'p>(&self, profile: &'p NewUserProfile) -> ExtendedRatings<'p>
    where
        'a: 'p,
    {
        ExtendedRatings::new(self.catalog.ratings(), &profile.ratings)
    }

    /// Catalog book ids, in table order, that `user_id` has not rated
    pub fn unread_books(&self, ratings: &ExtendedRatings<'_>, user_id: u32) -> Vec<u32> {
        let read = ratings.rated_by(user_id);
        self.catalog
            .books()
            .iter()
            .map(|b| b.book_id)
            .filter(|id| !read.contains(id))
            .collect()
    }

    /// Top `n` unread books for a historical `user_id` by estimated rating
    ///
    /// Equal estimates keep catalog order.
    pub fn rank_unread(
        &self,
        ratings: &ExtendedRatings<'_>,
        user_id: u32,
        n: usize,
    ) -> AppResult<Vec<RecommendedBook>> {
        let candidates = self.unread_books(ratings, user_id);
        check_capacity(n, candidates.len())?;

        let estimates = candidates
            .into_iter()
            .map(|book_id| (book_id, self.predictor.estimate(user_id, book_id)))
            .collect();
        self.top_n(user_id, estimates, n)
    }

    /// Resolves `title_ratings` to a new user and ranks that user's unread books
    ///
    /// The synthetic user is unknown to the predictor, so its estimates come
    /// from the profile ratings folded into the model.
    pub fn recommend(&self, title_ratings: &TitleRatings, n: usize) -> AppResult<Vec<RecommendedBook>> {
        let profile = self.resolve_new_user(title_ratings)?;
        let ratings = self.extended_ratings(&profile);
        let candidates = self.unread_books(&ratings, profile.user_id);
        check_capacity(n, candidates.len())?;

        let estimates = self.predictor.estimate_unseen(&profile.ratings, &candidates);
        if estimates.len() != candidates.len() {
            return Err(AppError::Internal(format!(
                "Predictor {} returned {} estimates for {} books",
                self.predictor.name(),
                estimates.len(),
                candidates.len()
            )));
        }

        self.top_n(profile.user_id, candidates.into_iter().zip(estimates).collect(), n)
    }

    fn top_n(
        &self,
        user_id: u32,
        mut estimates: Vec<(u32, f64)>,
        n: usize,
    ) -> AppResult<Vec<RecommendedBook>> {
        estimates.sort_by(|a, b| b.1.total_cmp(&a.1));
        estimates.truncate(n);

        tracing::debug!(
            user_id,
            predictor = self.predictor.name(),
            returned = estimates.len(),
            "Ranked unread books"
        );

        estimates
            .into_iter()
            .map(|(book_id, estimate)| {
                self.catalog
                    .book(book_id)
                    .map(|book| RecommendedBook::new(book, estimate))
                    .ok_or_else(|| AppError::Internal(format!("Book {} vanished from catalog", book_id)))
            })
            .collect()
    }
}

fn check_capacity(requested: usize, available: usize) -> AppResult<()> {
    if requested > available {
        return Err(AppError::InsufficientCandidates {
            requested,
            available,
        });
    }
    Ok(())
}
