pub mod customization;
pub mod stt;

// Re-export commonly used types for convenience
pub use customization::{
    CustomizationApi, RestCustomizationClient, RetrySpec, StatusOutcome, wait_for,
    wait_for_corpora_analyzed, wait_for_customization_ready, wait_for_with_cancel,
};
pub use stt::{
    ChannelParams, ChannelState, DuplexRecognitionChannel, EventStream, RecognitionEvent,
    RecognizeOptions,
};
