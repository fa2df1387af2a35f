use thiserror::Error;

use crate::adapters::mojdomek_http::{
    AccountClient, FetchError, FetchErrorKind, ValidationFailure, check_account,
};

pub const TITLE_PREFIX: &str = "MójDomek";

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum OnboardingError {
    #[error("invalid account identifier")]
    InvalidCredential,
    #[error("cannot connect to the MójDomek API: {0}")]
    CannotConnect(FetchError),
    #[error("unexpected error while reading account details: {0}")]
    Unknown(FetchError),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Onboarded {
    pub account_id: String,
    pub title: String,
}

/// Accepts an account identifier for setup and derives the entry title.
pub async fn onboard<C: AccountClient>(
    client: &C,
    account_id: &str,
) -> Result<Onboarded, OnboardingError> {
    let account_id = account_id.trim();
    if account_id.is_empty() {
        return Err(OnboardingError::InvalidCredential);
    }

    if let Err(failure) = check_account(client, account_id).await {
        tracing::warn!(error = %failure, "account rejected during setup");
        return Err(match failure {
            ValidationFailure::Fetch(error) if error.kind() == FetchErrorKind::Transport => {
                OnboardingError::CannotConnect(error)
            }
            ValidationFailure::Inactive
            | ValidationFailure::NoLocations
            | ValidationFailure::Fetch(_) => OnboardingError::InvalidCredential,
        });
    }

    let snapshot = client.fetch(account_id).await.map_err(|error| {
        tracing::error!(error = %error, "unexpected failure while fetching account title");
        OnboardingError::Unknown(error)
    })?;

    let title = format!("{TITLE_PREFIX} - {}", snapshot.display_name());
    tracing::info!(title = %title, "account accepted");

    Ok(Onboarded {
        account_id: account_id.to_string(),
        title,
    })
}
