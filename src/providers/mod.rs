// SPDX-License-Identifier: AGPL-3.0-or-later

//! Remote provider clients: identity/document store, bank-data
//! aggregator, and payment rail.

pub mod appwrite;
pub mod dwolla;
pub mod plaid;
