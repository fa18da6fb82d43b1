use std::sync::Arc;

use crate::catalog::Catalog;
use crate::repository::CatalogStore;

#[derive(Clone)]
pub struct AppState {
    pub store: Arc<dyn CatalogStore>,
}

impl AppState {
    pub fn new(store: Arc<dyn CatalogStore>) -> Self {
        Self { store }
    }

    pub fn catalog(&self) -> Catalog {
        Catalog::new(self.store.clone())
    }
}
