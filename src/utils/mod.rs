pub mod url;
pub use url::{UrlValidationError, rest_base_url, websocket_recognize_url};
