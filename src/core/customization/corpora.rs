//! Waiting for corpus analysis.

use tracing::{debug, info};

use super::api::{Corpus, CorpusStatus, CustomizationApi};
use super::waiter::{RetrySpec, StatusOutcome, wait_for};
use crate::errors::{WaitError, WaitResult};

/// Map one corpus listing onto a polling outcome.
///
/// - any corpus `being_processed` → pending
/// - otherwise at least one `analyzed` → terminal
/// - anything else → [`WaitError::UnexpectedStatus`]
pub fn corpora_outcome(
    customization_id: &str,
    corpora: Vec<Corpus>,
) -> StatusOutcome<Vec<Corpus>> {
    if corpora.is_empty() {
        return StatusOutcome::Failed(WaitError::NoCorpora {
            customization_id: customization_id.to_string(),
        });
    }

    let processing: Vec<&str> = corpora
        .iter()
        .filter(|c| c.status() == CorpusStatus::BeingProcessed)
        .map(|c| c.name.as_str())
        .collect();
    if !processing.is_empty() {
        return StatusOutcome::Pending(format!(
            "Corpora still being processed for '{}': {}",
            customization_id,
            processing.join(", ")
        ));
    }

    if corpora.iter().any(|c| c.status() == CorpusStatus::Analyzed) {
        return StatusOutcome::Terminal(corpora);
    }

    let statuses: Vec<&str> = corpora.iter().map(|c| c.status.as_str()).collect();
    StatusOutcome::Failed(WaitError::UnexpectedStatus {
        status: statuses.join(", "),
    })
}

/// Wait until every corpus of `customization_id` has been analyzed.
///
/// One listing is made up front; with zero corpora this fails with
/// [`WaitError::NoCorpora`] without polling. Otherwise the corpora are
/// listed again on every attempt.
pub async fn wait_for_corpora_analyzed<A>(
    api: &A,
    customization_id: &str,
    spec: &RetrySpec,
) -> WaitResult<Vec<Corpus>>
where
    A: CustomizationApi + ?Sized,
{
    let existing = api.list_corpora(customization_id).await?;
    if existing.is_empty() {
        info!("Customization '{}' has no corpora to wait for", customization_id);
        return Err(WaitError::NoCorpora {
            customization_id: customization_id.to_string(),
        });
    }
    debug!(
        corpora = existing.len(),
        "Waiting for corpus analysis of '{}'", customization_id
    );

    wait_for(
        || async move {
            match api.list_corpora(customization_id).await {
                Ok(corpora) => corpora_outcome(customization_id, corpora),
                Err(e) => StatusOutcome::Failed(e.into()),
            }
        },
        spec,
    )
    .await
}
