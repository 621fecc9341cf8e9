use crate::models::{Book, BookCard, ScoredBook};

/// Number of books on the home page's popular list
pub const HOME_LIST_SIZE: usize = 5;

/// Ratings-count percentile that a book must reach to be trusted on its own average
const MIN_VOTES_QUANTILE: f64 = 0.95;

/// Scores every book with a weighted (Bayesian) average rating
///
/// `score = v/(v+m) * R + m/(m+v) * C`, where `v` is the book's ratings count,
/// `m` the 95th percentile of ratings counts, `R` the book's average rating and
/// `C` the median average rating of the catalog. Books with few ratings are
/// pulled toward `C`. The input is not modified.
pub fn score_books(books: &[Book]) -> Vec<ScoredBook> {
    if books.is_empty() {
        return Vec::new();
    }

    let counts: Vec<f64> = books.iter().map(|b| b.ratings_count as f64).collect();
    let averages: Vec<f64> = books.iter().map(|b| b.average_rating).collect();
    let m = quantile(&counts, MIN_VOTES_QUANTILE);
    let c = quantile(&averages, 0.5);

    books
        .iter()
        .map(|book| ScoredBook {
            book: BookCard::from(book),
            score: weighted_rating(book.ratings_count as f64, m, book.average_rating, c),
        })
        .collect()
}

/// Top `n` books by descending weighted score; equal scores keep catalog order
pub fn top_rated(books: &[Book], n: usize) -> Vec<ScoredBook> {
    let mut scored = score_books(books);
    scored.sort_by(|a, b| b.score.total_cmp(&a.score));
    scored.truncate(n);
    scored
}

fn weighted_rating(v: f64, m: f64, r: f64, c: f64) -> f64 {
    if v + m == 0.0 {
        return c;
    }
    (v / (v + m)) * r + (m / (m + v)) * c
}

/// Quantile with linear interpolation between the closest ranks
fn quantile(values: &[f64], q: f64) -> f64 {
    let mut sorted = values.to_vec();
    sorted.sort_by(f64::total_cmp);

    let pos = q * (sorted.len() - 1) as f64;
    let lo = pos.floor() as usize;
    let hi = pos.ceil() as usize;
    sorted[lo] + (sorted[hi] - sorted[lo]) * (pos - lo as f64)
}
