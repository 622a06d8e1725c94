//! Azure Subscriptions
//!
//! Functions for listing the subscriptions (accounts) the caller can reach.

use super::client::AzureClient;
use crate::resource::model::Account;
use anyhow::Result;

const SUBSCRIPTIONS_API_VERSION: &str = "2022-12-01";

/// List all enabled subscriptions
pub async fn list_subscriptions(client: &AzureClient) -> Result<Vec<Account>> {
    let url = client.arm_url("/subscriptions", SUBSCRIPTIONS_API_VERSION)?;
    let items = client.get_all_pages(&url).await?;

    Ok(items
        .iter()
        .map(Account::from)
        .filter(|a| a.state.eq_ignore_ascii_case("Enabled"))
        .collect())
}

/// Keep the subscriptions whose display name matches `profile`
pub fn select_profile(accounts: Vec<Account>, profile: &str) -> Vec<Account> {
    accounts
        .into_iter()
        .filter(|a| a.display_name.eq_ignore_ascii_case(profile))
        .collect()
}
