use hmac::{Hmac, Mac};
use sha2::Sha256;

pub const SIGN_METHOD: &str = "HMAC-SHA256";

/// Signs cloud requests with the project credentials.
#[derive(Clone)]
pub struct RequestSigner {
    client_id: String,
    client_secret: String,
}

impl RequestSigner {
    pub fn new(client_id: impl Into<String>, client_secret: impl Into<String>) -> Self {
        Self {
            client_id: client_id.into(),
            client_secret: client_secret.into(),
        }
    }

    pub fn client_id(&self) -> &str {
        &self.client_id
    }

    /// Signature of a token request: `client_id + t`.
    pub fn sign_token_request(&self, timestamp: &str) -> String {
        sign(&self.client_secret, &format!("{}{}", self.client_id, timestamp))
    }

    /// Signature of a business request: `client_id + access_token + t`, followed by the body if any.
    pub fn sign_request(&self, access_token: &str, timestamp: &str, body: Option<&str>) -> String {
        let mut message = format!("{}{}{}", self.client_id, access_token, timestamp);
        if let Some(body) = body.filter(|body| !body.is_empty()) {
            message.push_str(body);
        }

        sign(&self.client_secret, &message)
    }
}

/// Uppercase hex HMAC-SHA256.
pub fn sign(secret: &str, message: &str) -> String {
    let mut mac = Hmac::<Sha256>::new_from_slice(secret.as_bytes()).expect("HMAC takes keys of any size");
    mac.update(message.as_bytes());

    hex::encode_upper(mac.finalize().into_bytes())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_token_signature() {
        let signer = RequestSigner::new("client", "secret");

        assert_eq!(
            signer.sign_token_request("1700000000000"),
            "265E5CD64B826EF2FE1D63C166F53B37FAE56340CAA8825758298DB94809457B"
        );
    }

    #[test]
    fn test_request_signature_covers_body() {
        let signer = RequestSigner::new("client", "secret");

        let signed = signer.sign_request("token", "1700000000000", Some(r#"{"commands":[]}"#));

        assert_eq!(signed, "6005315FC58294B9BB162BD2E1D342A3B04B4F2F8A7DB147A63AF936B3482C33");
        assert_ne!(signed, signer.sign_request("token", "1700000000000", None));
    }

    #[test]
    fn test_empty_body_is_not_signed() {
        let signer = RequestSigner::new("client", "secret");

        assert_eq!(
            signer.sign_request("token", "1700000000000", Some("")),
            signer.sign_request("token", "1700000000000", None)
        );
    }
}
