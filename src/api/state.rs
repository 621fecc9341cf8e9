use std::sync::Arc;

use crate::{
    db::{Catalog, SessionStore},
    services::{Personalizer, Predictor},
};

/// Shared application state
///
/// The catalog and predictor are immutable after startup; only the session
/// store changes while serving requests.
#[derive(Clone)]
pub struct AppState {
    pub catalog: Arc<Catalog>,
    pub predictor: Arc<dyn Predictor>,
    pub sessions: Arc<dyn SessionStore>,
}

impl AppState {
    pub fn new(
        catalog: Arc<Catalog>,
        predictor: Arc<dyn Predictor>,
        sessions: Arc<dyn SessionStore>,
    ) -> Self {
        Self {
            catalog,
            predictor,
            sessions,
        }
    }

    pub fn personalizer(&self) -> Personalizer<'_> {
        Personalizer::new(&self.catalog, self.predictor.as_ref())
    }
}
