use chrono::{DateTime, Utc};
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};

use tenantguard_auth::{validate_claims, AccessClaims};

use crate::config::SigningSecret;

/// HS256 access-credential signer and validator.
///
/// Only HS256 is accepted on decode; `alg: none` and every other algorithm
/// fail. The time window is checked by [`validate_claims`] against the
/// caller's `now`, not the system clock.
pub struct Hs256Signer {
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
    validation: Validation,
}

impl Hs256Signer {
    pub fn new(secret: &SigningSecret) -> Self {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.validate_exp = false;
        validation.leeway = 0;
        validation.set_required_spec_claims(&["sub", "exp"]);

        Self {
            encoding_key: EncodingKey::from_secret(secret.as_bytes()),
            decoding_key: DecodingKey::from_secret(secret.as_bytes()),
            validation,
        }
    }

    pub fn sign(&self, claims: &AccessClaims) -> Result<String, jsonwebtoken::errors::Error> {
        encode(&Header::new(Algorithm::HS256), claims, &self.encoding_key)
    }

    /// Decode and validate. The error carries no detail on purpose.
    pub fn validate(&self, token: &str, now: DateTime<Utc>) -> Result<AccessClaims, InvalidToken> {
        let data = decode::<AccessClaims>(token, &self.decoding_key, &self.validation).map_err(|_| InvalidToken)?;
        validate_claims(&data.claims, now).map_err(|_| InvalidToken)?;
        Ok(data.claims)
    }
}

impl core::fmt::Debug for Hs256Signer {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("Hs256Signer").finish_non_exhaustive()
    }
}

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct InvalidToken;
