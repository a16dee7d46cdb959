//! HTTP Basic authentication for the lemlist API.
//!
//! The API key is the password and the username is empty, so the encoded
//! credential is `base64(":" + api_key)`.

use base64::{engine::general_purpose, Engine as _};

/// Build the `Authorization` header value for `api_key`.
pub fn authorization_header(api_key: &str) -> String {
    let credential = general_purpose::STANDARD.encode(format!(":{api_key}"));
    format!("Basic {credential}")
}
