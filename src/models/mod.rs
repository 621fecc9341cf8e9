use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Lowest rating a reader can give a book
pub const MIN_RATING: u8 = 1;
/// Highest rating a reader can give a book
pub const MAX_RATING: u8 = 5;

/// A catalog entry, as stored in the books CSV
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Book {
    pub book_id: u32,
    pub title: String,
    #[serde(default)]
    pub authors: String,
    #[serde(default, deserialize_with = "csv::invalid_option")]
    pub year: Option<i32>,
    #[serde(default, deserialize_with = "csv::invalid_option")]
    pub pages: Option<u32>,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub genres: String,
    pub average_rating: f64,
    pub ratings_count: u64,
    #[serde(default)]
    pub small_image_url: String,
}

/// A single historical (or synthetic) rating
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct Rating {
    pub user_id: u32,
    pub book_id: u32,
    pub rating: u8,
}

/// Title -> rating entries a visitor has submitted
pub type TitleRatings = BTreeMap<String, u8>;

/// Listing projection used by the popularity and genre pages
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct BookCard {
    pub book_id: u32,
    pub title: String,
    pub authors: String,
    pub year: Option<i32>,
    pub genres: String,
    pub average_rating: f64,
    pub small_image_url: String,
}

impl From<&Book> for BookCard {
    fn from(book: &Book) -> Self {
        Self {
            book_id: book.book_id,
            title: book.title.clone(),
            authors: book.authors.clone(),
            year: book.year,
            genres: book.genres.clone(),
            average_rating: book.average_rating,
            small_image_url: book.small_image_url.clone(),
        }
    }
}

/// A book card with its weighted popularity score
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct ScoredBook {
    #[serde(flatten)]
    pub book: BookCard,
    pub score: f64,
}

/// A personalized recommendation with the predictor's estimated rating
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct RecommendedBook {
    pub book_id: u32,
    pub title: String,
    pub authors: String,
    pub year: Option<i32>,
    pub pages: Option<u32>,
    pub description: String,
    pub genres: String,
    pub average_rating: f64,
    pub small_image_url: String,
    pub estimate: f64,
}

impl RecommendedBook {
    pub fn new(book: &Book, estimate: f64) -> Self {
        Self {
            book_id: book.book_id,
            title: book.title.clone(),
            authors: book.authors.clone(),
            year: book.year,
            pages: book.pages,
            description: book.description.clone(),
            genres: book.genres.clone(),
            average_rating: book.average_rating,
            small_image_url: book.small_image_url.clone(),
            estimate,
        }
    }
}

/// Returns true when `rating` lies on the accepted rating scale
pub fn is_valid_rating(rating: i64) -> bool {
    (MIN_RATING as i64..=MAX_RATING as i64).contains(&rating)
}
