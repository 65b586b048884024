// SPDX-License-Identifier: AGPL-3.0-or-later

//! Token exchange orchestration.
//!
//! The linking workflow is a linear sequence with no branching back and no
//! parallelism:
//!
//! ```text
//! PUBLIC_TOKEN
//!    -> [exchange]                -> ACCESS_TOKEN + ITEM_ID
//!    -> [fetch accounts]          -> first account's metadata
//!    -> [processor-token request] -> PROCESSOR_TOKEN
//!    -> [funding-source creation] -> FUNDING_SOURCE_URL
//!    -> [persist]                 -> BANK_ACCOUNT_RECORD
//! ```
//!
//! Failures carry the step they occurred in so callers can tell an
//! aggregator rejection from a persistence problem. The one multi-write
//! hazard — a funding source created but its record never persisted — is
//! compensated by removing the funding source. Earlier steps create no
//! remote state, so nothing else needs unwinding.
//!
//! The sequence is deliberately not idempotent: exchanging twice creates
//! two records and two funding sources, with no deduplication.

use tracing::{info, warn};

use crate::models::{BankAccount, NewBankAccount};
use crate::providers::appwrite::AppwriteError;
use crate::providers::dwolla::DwollaError;
use crate::providers::plaid::{LinkedAccount, PlaidError, TokenExchange};
use crate::sharing::derive_shareable_id;

/// Aggregator-side steps of the exchange sequence, in order. The
/// funding-source and persistence steps fail through their own
/// [`ExchangeError`] variants and need no step tag.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExchangeStep {
    TokenExchange,
    AccountFetch,
    ProcessorToken,
}

impl ExchangeStep {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::TokenExchange => "token exchange",
            Self::AccountFetch => "account fetch",
            Self::ProcessorToken => "processor-token request",
        }
    }
}

impl std::fmt::Display for ExchangeStep {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ExchangeError {
    #[error("{step} failed: {source}")]
    Aggregator {
        step: ExchangeStep,
        source: PlaidError,
    },

    #[error("link returned no accounts")]
    NoAccounts,

    #[error("funding-source creation failed: {source}")]
    FundingSource { source: DwollaError },

    #[error("record persistence failed (funding source compensated: {compensated}): {source}")]
    Persist {
        source: AppwriteError,
        /// Whether the compensating funding-source removal succeeded.
        compensated: bool,
    },
}

/// Aggregator operations the exchange depends on.
pub trait BankDataSource {
    async fn exchange_public_token(
        &self,
        public_token: &str,
    ) -> Result<TokenExchange, PlaidError>;

    async fn get_accounts(&self, access_token: &str) -> Result<Vec<LinkedAccount>, PlaidError>;

    async fn create_processor_token(
        &self,
        access_token: &str,
        account_id: &str,
    ) -> Result<String, PlaidError>;
}

/// Payment-rail operations the exchange depends on.
pub trait FundingRail {
    async fn create_funding_source(
        &self,
        customer_id: &str,
        processor_token: &str,
        bank_name: &str,
    ) -> Result<String, DwollaError>;

    async fn remove_funding_source(&self, funding_source_url: &str) -> Result<(), DwollaError>;
}

/// Bank-account directory operations the exchange depends on.
pub trait BankRecordStore {
    async fn create_bank_account(
        &self,
        fields: &NewBankAccount,
    ) -> Result<BankAccount, AppwriteError>;
}

impl BankDataSource for crate::providers::plaid::PlaidClient {
    async fn exchange_public_token(
        &self,
        public_token: &str,
    ) -> Result<TokenExchange, PlaidError> {
        Self::exchange_public_token(self, public_token).await
    }

    async fn get_accounts(&self, access_token: &str) -> Result<Vec<LinkedAccount>, PlaidError> {
        Self::get_accounts(self, access_token).await
    }

    async fn create_processor_token(
        &self,
        access_token: &str,
        account_id: &str,
    ) -> Result<String, PlaidError> {
        Self::create_processor_token(self, access_token, account_id).await
    }
}

impl FundingRail for crate::providers::dwolla::DwollaClient {
    async fn create_funding_source(
        &self,
        customer_id: &str,
        processor_token: &str,
        bank_name: &str,
    ) -> Result<String, DwollaError> {
        Self::create_funding_source(self, customer_id, processor_token, bank_name).await
    }

    async fn remove_funding_source(&self, funding_source_url: &str) -> Result<(), DwollaError> {
        Self::remove_funding_source(self, funding_source_url).await
    }
}

impl BankRecordStore for crate::providers::appwrite::AppwriteClient {
    async fn create_bank_account(
        &self,
        fields: &NewBankAccount,
    ) -> Result<BankAccount, AppwriteError> {
        self.create_bank_document(fields).await
    }
}

/// Inputs resolved from the authenticated user before the sequence starts.
pub struct ExchangeInput<'a> {
    pub public_token: &'a str,
    /// Owning user's document ID in the user directory.
    pub user_document_id: &'a str,
    /// The user's existing payment-rail customer ID, set at signup.
    pub dwolla_customer_id: &'a str,
    /// Server key for shareable-ID derivation.
    pub shareable_id_key: &'a str,
}

/// Run the exchange sequence to completion and return the persisted
/// record.
pub async fn run_exchange<B, R, S>(
    bank_data: &B,
    rail: &R,
    store: &S,
    input: ExchangeInput<'_>,
) -> Result<BankAccount, ExchangeError>
where
    B: BankDataSource,
    R: FundingRail,
    S: BankRecordStore,
{
    let exchange = bank_data
        .exchange_public_token(input.public_token)
        .await
        .map_err(|source| ExchangeError::Aggregator {
            step: ExchangeStep::TokenExchange,
            source,
        })?;

    let accounts = bank_data
        .get_accounts(&exchange.access_token)
        .await
        .map_err(|source| ExchangeError::Aggregator {
            step: ExchangeStep::AccountFetch,
            source,
        })?;

    // Single-account assumption: only the first account of a multi-account
    // link is used (see the bank-account directory docs).
    let account = accounts.into_iter().next().ok_or(ExchangeError::NoAccounts)?;

    let processor_token = bank_data
        .create_processor_token(&exchange.access_token, &account.account_id)
        .await
        .map_err(|source| ExchangeError::Aggregator {
            step: ExchangeStep::ProcessorToken,
            source,
        })?;

    let funding_source_url = rail
        .create_funding_source(input.dwolla_customer_id, &processor_token, &account.name)
        .await
        .map_err(|source| ExchangeError::FundingSource { source })?;

    let fields = NewBankAccount {
        user_id: input.user_document_id.to_string(),
        bank_id: exchange.item_id.clone(),
        account_id: account.account_id.clone(),
        access_token: exchange.access_token.clone(),
        funding_source_url: funding_source_url.clone(),
        shareable_id: derive_shareable_id(input.shareable_id_key, &account.account_id),
    };

    let record = match store.create_bank_account(&fields).await {
        Ok(record) => record,
        Err(source) => {
            // The funding source already exists upstream; remove it so the
            // failed sequence leaves no live side effects.
            let compensated = match rail.remove_funding_source(&funding_source_url).await {
                Ok(()) => true,
                Err(error) => {
                    warn!(
                        funding_source_url = %funding_source_url,
                        error = %error,
                        "compensating funding-source removal failed"
                    );
                    false
                }
            };
            return Err(ExchangeError::Persist {
                source,
                compensated,
            });
        }
    };

    info!(
        item_id = %record.bank_id,
        account_id = %record.account_id,
        "bank account linked"
    );

    Ok(record)
}
