//! Waiting for custom language model training.

use tracing::debug;

use super::api::{CustomizationApi, CustomizationStatus, LanguageModel};
use super::waiter::{RetrySpec, StatusOutcome, wait_for};
use crate::errors::{WaitError, WaitResult};

/// Map one language model status onto a polling outcome.
pub fn language_model_outcome(model: LanguageModel) -> StatusOutcome<LanguageModel> {
    match model.status() {
        CustomizationStatus::Pending | CustomizationStatus::Training => {
            StatusOutcome::Pending(match model.progress {
                Some(progress) => format!(
                    "Customization '{}' is {} ({}%)",
                    model.customization_id, model.status, progress
                ),
                None => format!(
                    "Customization '{}' is {}",
                    model.customization_id, model.status
                ),
            })
        }
        CustomizationStatus::Ready | CustomizationStatus::Available => {
            StatusOutcome::Terminal(model)
        }
        CustomizationStatus::Failed => StatusOutcome::Failed(WaitError::TrainingFailed {
            customization_id: model.customization_id,
        }),
        CustomizationStatus::Unknown(status) => {
            StatusOutcome::Failed(WaitError::UnexpectedStatus { status })
        }
    }
}

/// Wait until a custom language model is `ready` or `available` and return
/// the full model as last fetched.
pub async fn wait_for_customization_ready<A>(
    api: &A,
    customization_id: &str,
    spec: &RetrySpec,
) -> WaitResult<LanguageModel>
where
    A: CustomizationApi + ?Sized,
{
    debug!(
        max_attempts = spec.max_attempts,
        "Waiting for customization '{}' to become ready", customization_id
    );

    wait_for(
        || async move {
            match api.get_language_model(customization_id).await {
                Ok(model) => language_model_outcome(model),
                Err(e) => StatusOutcome::Failed(e.into()),
            }
        },
        spec,
    )
    .await
}
