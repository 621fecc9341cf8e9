pub mod catalog;
pub mod sessions;

pub use catalog::{Catalog, GENRE_PAGE_SIZE};
pub use sessions::{spawn_sweeper, InMemorySessionStore, SessionId, SessionStore, SweeperHandle};
