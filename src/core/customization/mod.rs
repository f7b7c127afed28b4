//! Customization readiness polling.
//!
//! Corpus analysis and language model training are long-running server-side
//! jobs. Both are awaited with the same bounded, fixed-interval
//! [`wait_for`] loop; they only differ in how a raw status maps onto a
//! [`StatusOutcome`]:
//!
//! | Wait | Pending | Terminal | Failed |
//! |------|---------|----------|--------|
//! | corpora | any `being_processed` | some `analyzed` | other combinations |
//! | language model | `pending`, `training` | `ready`, `available` | `failed`, unknown |
//!
//! # Example
//!
//! ```rust,no_run
//! use watson_speech::core::customization::{
//!     RestCustomizationClient, RetrySpec, wait_for_customization_ready,
//! };
//!
//! # async fn run() -> Result<(), Box<dyn std::error::Error>> {
//! let api = RestCustomizationClient::new("https://api.us-south.speech-to-text.watson.cloud.ibm.com/instances/abc", None)?;
//! let model = wait_for_customization_ready(&api, "lm-1", &RetrySpec::default()).await?;
//! println!("{} is {}", model.customization_id, model.status);
//! # Ok(())
//! # }
//! ```

pub mod api;
pub mod corpora;
pub mod language_model;
pub mod waiter;

pub use api::{
    Corpus, CorpusStatus, CustomizationApi, CustomizationStatus, LanguageModel,
    RestCustomizationClient,
};
pub use corpora::{corpora_outcome, wait_for_corpora_analyzed};
pub use language_model::{language_model_outcome, wait_for_customization_ready};
pub use waiter::{
    DEFAULT_MAX_ATTEMPTS, DEFAULT_POLL_INTERVAL, RetrySpec, StatusOutcome, wait_for,
    wait_for_with_cancel,
};
