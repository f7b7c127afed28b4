pub mod ibm_watson;

// Re-export IBM Watson implementation
pub use ibm_watson::{
    AuthHeader, ChannelParams, ChannelState, DuplexRecognitionChannel, ErrorEvent,
    ErrorEventKind, EventStream, IbmAudioEncoding, IbmRegion, RecognitionEvent,
    RecognizeOptions,
};
