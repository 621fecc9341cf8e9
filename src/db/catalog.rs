use std::collections::{HashMap, HashSet};
use std::io::Read;
use std::path::Path;

use crate::error::AppResult;
use crate::models::{Book, BookCard, Rating};

/// Number of books shown on a genre page
pub const GENRE_PAGE_SIZE: usize = 9;

/// In-memory book catalog and historical ratings
///
/// Loaded once at startup and shared read-only between requests. Books keep
/// the order of the source file; that order is what "table order" means for
/// genre listings and tie-breaks.
#[derive(Debug, Default)]
pub struct Catalog {
    books: Vec<Book>,
    ratings: Vec<Rating>,
    by_id: HashMap<u32, usize>,
    by_title: HashMap<String, u32>,
}

impl Catalog {
    /// Builds a catalog from already-parsed rows
    ///
    /// Books repeating an earlier `book_id` are dropped. A title maps to the
    /// first book carrying it.
    pub fn new(books: Vec<Book>, ratings: Vec<Rating>) -> Self {
        let mut kept = Vec::with_capacity(books.len());
        let mut by_id = HashMap::with_capacity(books.len());
        let mut by_title = HashMap::with_capacity(books.len());

        for book in books {
            if by_id.contains_key(&book.book_id) {
                tracing::warn!(book_id = book.book_id, title = %book.title, "Dropping duplicate book id");
                continue;
            }
            by_id.insert(book.book_id, kept.len());
            if by_title.contains_key(&book.title) {
                tracing::debug!(book_id = book.book_id, title = %book.title, "Title already mapped to an earlier book");
            } else {
                by_title.insert(book.title.clone(), book.book_id);
            }
            kept.push(book);
        }

        Self {
            books: kept,
            ratings,
            by_id,
            by_title,
        }
    }

    /// Loads both CSV tables from disk
    pub fn load(books_path: impl AsRef<Path>, ratings_path: impl AsRef<Path>) -> AppResult<Self> {
        let books_file = std::fs::File::open(books_path.as_ref())?;
        let ratings_file = std::fs::File::open(ratings_path.as_ref())?;
        Self::from_readers(books_file, ratings_file)
    }

    /// Parses both tables from CSV readers with headers
    pub fn from_readers(books: impl Read, ratings: impl Read) -> AppResult<Self> {
        let books: Vec<Book> = csv::Reader::from_reader(books)
            .deserialize()
            .collect::<Result<_, _>>()?;
        let ratings: Vec<Rating> = csv::Reader::from_reader(ratings)
            .deserialize()
            .collect::<Result<_, _>>()?;

        let catalog = Self::new(books, ratings);
        tracing::info!(
            books = catalog.books.len(),
            ratings = catalog.ratings.len(),
            "Catalog loaded"
        );
        Ok(catalog)
    }

    pub fn books(&self) -> &[Book] {
        &self.books
    }

    pub fn ratings(&self) -> &[Rating] {
        &self.ratings
    }

    pub fn book(&self, book_id: u32) -> Option<&Book> {
        self.by_id.get(&book_id).map(|&idx| &self.books[idx])
    }

    /// Resolves a title to the id of the first book with exactly that title
    pub fn book_id_for_title(&self, title: &str) -> Option<u32> {
        self.by_title.get(title).copied()
    }

    /// Largest user id among the historical ratings
    pub fn max_user_id(&self) -> Option<u32> {
        self.ratings.iter().map(|r| r.user_id).max()
    }

    /// Ids of every book rated by `user_id` in the historical table
    pub fn books_rated_by(&self, user_id: u32) -> HashSet<u32> {
        self.ratings
            .iter()
            .filter(|r| r.user_id == user_id)
            .map(|r| r.book_id)
            .collect()
    }

    /// First `limit` books whose genre text contains `genre`, ignoring case
    pub fn books_by_genre(&self, genre: &str, limit: usize) -> Vec<BookCard> {
        let needle = genre.to_lowercase();
        self.books
            .iter()
            .filter(|book| book.genres.to_lowercase().contains(&needle))
            .take(limit)
            .map(BookCard::from)
            .collect()
    }
}
