use std::sync::Arc;

use crate::config::Credentials;
use crate::insights::InsightsFacade;

#[derive(Clone)]
pub struct AppState {
    pub facade: InsightsFacade,
    pub credentials: Arc<Credentials>,
}

impl AppState {
    pub fn new(facade: InsightsFacade, credentials: Arc<Credentials>) -> Self {
        Self {
            facade,
            credentials,
        }
    }
}
