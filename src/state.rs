// SPDX-License-Identifier: AGPL-3.0-or-later

use std::sync::Arc;

use crate::config::AppConfig;
use crate::providers::appwrite::{AppwriteClient, AppwriteError};
use crate::providers::dwolla::{DwollaClient, DwollaError};
use crate::providers::plaid::{PlaidClient, PlaidError};

#[derive(Debug, thiserror::Error)]
pub enum StateError {
    #[error(transparent)]
    Appwrite(#[from] AppwriteError),
    #[error(transparent)]
    Plaid(#[from] PlaidError),
    #[error(transparent)]
    Dwolla(#[from] DwollaError),
}

/// Shared application state: configuration plus one client per provider.
///
/// Clients wrap a connection-pooling HTTP client, so cloning the state per
/// request is cheap. There is no local store; all reads and writes go to
/// the remote providers.
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<AppConfig>,
    pub appwrite: AppwriteClient,
    pub plaid: PlaidClient,
    pub dwolla: DwollaClient,
}

impl AppState {
    pub fn new(config: AppConfig) -> Result<Self, StateError> {
        let appwrite = AppwriteClient::new(&config.appwrite)?;
        let plaid = PlaidClient::new(&config.plaid)?;
        let dwolla = DwollaClient::new(&config.dwolla)?;
        Ok(Self {
            config: Arc::new(config),
            appwrite,
            plaid,
            dwolla,
        })
    }
}
