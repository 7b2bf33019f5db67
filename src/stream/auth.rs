//! OAuth 1.0a request signing (HMAC-SHA1).

use base64::{Engine, engine::general_purpose::STANDARD};
use hmac::{Hmac, Mac};
use sha1::Sha1;
use uuid::Uuid;

use crate::config::Credentials;

type HmacSha1 = Hmac<Sha1>;

/// Signs requests to the stream service. Built once per adapter.
pub struct OAuthSigner {
    credentials: Credentials,
}

impl OAuthSigner {
    pub fn new(credentials: Credentials) -> Self {
        Self { credentials }
    }

    /// `Authorization` header value for a request with the given form/query
    /// parameters, using a fresh nonce and the current time.
    pub fn authorization_header(&self, method: &str, url: &str, params: &[(&str, &str)]) -> String {
        let nonce = Uuid::new_v4().simple().to_string();
        let timestamp = chrono::Utc::now().timestamp().to_string();
        self.authorization_header_at(method, url, params, &nonce, &timestamp)
    }

    fn authorization_header_at(
        &self,
        method: &str,
        url: &str,
        params: &[(&str, &str)],
        nonce: &str,
        timestamp: &str,
    ) -> String {
        let mut oauth = vec![
            ("oauth_consumer_key", self.credentials.consumer_key.as_str()),
            ("oauth_nonce", nonce),
            ("oauth_signature_method", "HMAC-SHA1"),
            ("oauth_timestamp", timestamp),
            ("oauth_token", self.credentials.access_token.as_str()),
            ("oauth_version", "1.0"),
        ];

        let signature = self.signature(method, url, params, &oauth);
        oauth.push(("oauth_signature", signature.as_str()));
        oauth.sort_by(|a, b| a.0.cmp(b.0));

        let fields: Vec<String> = oauth
            .iter()
            .map(|(k, v)| format!("{}=\"{}\"", encode(k), encode(v)))
            .collect();
        format!("OAuth {}", fields.join(", "))
    }

    fn signature(
        &self,
        method: &str,
        url: &str,
        params: &[(&str, &str)],
        oauth: &[(&str, &str)],
    ) -> String {
        let mut pairs: Vec<(String, String)> = params
            .iter()
            .chain(oauth.iter())
            .map(|(k, v)| (encode(k), encode(v)))
            .collect();
        pairs.sort();

        let parameter_string = pairs
            .iter()
            .map(|(k, v)| format!("{k}={v}"))
            .collect::<Vec<_>>()
            .join("&");

        let base = format!(
            "{}&{}&{}",
            method.to_ascii_uppercase(),
            encode(url),
            encode(&parameter_string)
        );
        let key = format!(
            "{}&{}",
            encode(&self.credentials.consumer_secret),
            encode(&self.credentials.access_secret)
        );

        let mut mac =
            HmacSha1::new_from_slice(key.as_bytes()).expect("HMAC accepts keys of any length");
        mac.update(base.as_bytes());
        STANDARD.encode(mac.finalize().into_bytes())
    }
}

// RFC 3986 unreserved characters pass through; everything else is escaped.
fn encode(s: &str) -> String {
    urlencoding::encode(s).into_owned()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn signer() -> OAuthSigner {
        OAuthSigner::new(Credentials {
            consumer_key: "xvz1evFS4wEEPTGEFPHBog".to_string(),
            consumer_secret: "kAcSOqF21Fu85e7zjz7ZN2U4ZRhfV3WpwPAoE3Z7kBw".to_string(),
            access_token: "370773112-GmHxMAgYyLbNEtIKZeRNFsMKPR9EyMZeS9weJAEb".to_string(),
            access_secret: "LswwdoUaIvS8ltyTt5jkRh4J50vUPVVHtR2YPi5kE".to_string(),
        })
    }

    const NONCE: &str = "kYjzVBB8Y0ZFabxSWbWovY3uYSQ2pTgmZeNu2VS4cg";
    const TIMESTAMP: &str = "1318622958";

    #[test]
    fn test_signature_matches_published_example() {
        let header = signer().authorization_header_at(
            "POST",
            "https://api.twitter.com/1.1/statuses/update.json",
            &[
                ("include_entities", "true"),
                ("status", "Hello Ladies + Gentlemen, a signed OAuth request!"),
            ],
            NONCE,
            TIMESTAMP,
        );

        assert!(
            header.contains("oauth_signature=\"hCtSmYh%2BiHYCEqBWrE7C7hYmtUk%3D\""),
            "unexpected header: {header}"
        );
    }

    #[test]
    fn test_header_lists_oauth_fields_only() {
        let header = signer().authorization_header_at(
            "POST",
            "https://stream.example.com/filter.json",
            &[("track", "coke,pepsi")],
            NONCE,
            TIMESTAMP,
        );

        assert!(header.starts_with("OAuth oauth_consumer_key=\"xvz1evFS4wEEPTGEFPHBog\""));
        assert!(header.contains("oauth_signature_method=\"HMAC-SHA1\""));
        assert!(header.contains("oauth_version=\"1.0\""));
        assert!(!header.contains("track"));
    }

    #[test]
    fn test_fresh_nonce_per_request() {
        let s = signer();
        let a = s.authorization_header("POST", "https://x.test/", &[]);
        let b = s.authorization_header("POST", "https://x.test/", &[]);
        assert_ne!(a, b);
    }

    #[test]
    fn test_encode_is_rfc3986() {
        assert_eq!(encode("a b+c,d~e"), "a%20b%2Bc%2Cd~e");
    }
}
