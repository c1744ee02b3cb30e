// SPDX-License-Identifier: MIT

//! Google identity: authorization-code exchange and ID-token verification.
//!
//! The frontend obtains an authorization code via the Google login popup
//! and posts it to `/auth/login`; this service exchanges the code at the
//! token endpoint and verifies the returned ID token against Google's
//! JWKS keys (cached, with a refresh lock to avoid thundering refetches).

use crate::error::AppError;
use anyhow::Context;
use jsonwebtoken::{decode, decode_header, Algorithm, DecodingKey, Validation};
use serde::Deserialize;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::{Mutex, RwLock};

const TOKEN_URL: &str = "https://oauth2.googleapis.com/token";
const JWKS_URL: &str = "https://www.googleapis.com/oauth2/v3/certs";
/// Redirect URI used by the popup code flow.
const REDIRECT_URI: &str = "postmessage";
const HTTP_TIMEOUT: Duration = Duration::from_secs(10);
const JWKS_CACHE_TTL: Duration = Duration::from_secs(300);

/// Identity claims extracted from a verified Google ID token.
#[derive(Debug, Clone)]
pub struct GoogleIdentity {
    pub subject: String,
    pub email: Option<String>,
    pub name: Option<String>,
    pub picture: Option<String>,
}

/// Result of a successful authorization-code exchange.
#[derive(Debug, Clone)]
pub struct CodeExchange {
    pub identity: GoogleIdentity,
    /// Only issued on first consent; absent on repeat logins.
    pub refresh_token: Option<String>,
}

enum VerifierMode {
    /// Fetch and cache Google's JWKS keys, selected by `kid`.
    Jwks { jwks_url: String },
    /// Fixed key for deterministic tests.
    StaticKey {
        decoding_key: Arc<DecodingKey>,
        algorithm: Algorithm,
    },
}

struct JwksCacheEntry {
    keys_by_kid: HashMap<String, Arc<DecodingKey>>,
    expires_at: Instant,
}

/// Google identity gateway.
pub struct GoogleAuthService {
    http: reqwest::Client,
    client_id: String,
    client_secret: String,
    token_url: String,
    mode: VerifierMode,
    jwks_cache: RwLock<Option<JwksCacheEntry>>,
    refresh_lock: Mutex<()>,
}

impl GoogleAuthService {
    /// Create a production service verifying against Google's JWKS keys.
    pub fn new(client_id: String, client_secret: String) -> anyhow::Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(HTTP_TIMEOUT)
            .build()
            .context("failed building Google auth HTTP client")?;

        Ok(Self {
            http,
            client_id,
            client_secret,
            token_url: TOKEN_URL.to_string(),
            mode: VerifierMode::Jwks {
                jwks_url: JWKS_URL.to_string(),
            },
            jwks_cache: RwLock::new(None),
            refresh_lock: Mutex::new(()),
        })
    }

    /// Create a service with a fixed verification key and token endpoint.
    ///
    /// Intended for deterministic local/integration tests.
    pub fn new_with_static_key(
        client_id: String,
        client_secret: String,
        token_url: impl Into<String>,
        decoding_key: DecodingKey,
        algorithm: Algorithm,
    ) -> anyhow::Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(HTTP_TIMEOUT)
            .build()
            .context("failed building Google auth HTTP client")?;

        Ok(Self {
            http,
            client_id,
            client_secret,
            token_url: token_url.into(),
            mode: VerifierMode::StaticKey {
                decoding_key: Arc::new(decoding_key),
                algorithm,
            },
            jwks_cache: RwLock::new(None),
            refresh_lock: Mutex::new(()),
        })
    }

    /// Exchange an authorization code for tokens and verify the identity.
    pub async fn exchange_code(&self, code: &str) -> Result<CodeExchange, AppError> {
        let response = self
            .http
            .post(&self.token_url)
            .form(&[
                ("code", code),
                ("client_id", self.client_id.as_str()),
                ("client_secret", self.client_secret.as_str()),
                ("redirect_uri", REDIRECT_URI),
                ("grant_type", "authorization_code"),
            ])
            .send()
            .await
            .map_err(|e| AppError::GoogleApi(format!("Token exchange request failed: {e}")))?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(AppError::GoogleApi(format!(
                "Token exchange failed: HTTP {status}: {body}"
            )));
        }

        let tokens: TokenExchangeResponse = response
            .json()
            .await
            .map_err(|e| AppError::GoogleApi(format!("Token exchange JSON error: {e}")))?;

        let identity = self.verify_id_token(&tokens.id_token).await?;

        Ok(CodeExchange {
            identity,
            refresh_token: tokens.refresh_token,
        })
    }

    /// Verify an ID token's signature, audience and issuer.
    pub async fn verify_id_token(&self, id_token: &str) -> Result<GoogleIdentity, AppError> {
        let (decoding_key, algorithm) = match &self.mode {
            VerifierMode::StaticKey {
                decoding_key,
                algorithm,
            } => (decoding_key.clone(), *algorithm),
            VerifierMode::Jwks { .. } => {
                let header = decode_header(id_token)
                    .map_err(|e| AppError::GoogleApi(format!("invalid ID token header: {e}")))?;

                if header.alg != Algorithm::RS256 {
                    return Err(AppError::InvalidToken);
                }

                let kid = header.kid.ok_or(AppError::InvalidToken)?;
                (self.decoding_key_for_kid(&kid).await?, Algorithm::RS256)
            }
        };

        let mut validation = Validation::new(algorithm);
        validation.set_required_spec_claims(&["exp", "iss", "aud", "sub"]);
        validation.set_audience(&[self.client_id.as_str()]);
        validation.set_issuer(&["https://accounts.google.com", "accounts.google.com"]);

        let token_data = decode::<IdTokenClaims>(id_token, decoding_key.as_ref(), &validation)
            .map_err(|e| {
                tracing::warn!(error = %e, "ID token validation failed");
                AppError::InvalidToken
            })?;

        let claims = token_data.claims;
        Ok(GoogleIdentity {
            subject: claims.sub,
            email: claims.email,
            name: claims.name,
            picture: claims.picture,
        })
    }

    /// Look up the JWKS decoding key for `kid`, refreshing the cache if
    /// it is stale or does not know the key.
    async fn decoding_key_for_kid(&self, kid: &str) -> Result<Arc<DecodingKey>, AppError> {
        if let Some(entry) = self.jwks_cache.read().await.as_ref() {
            if entry.expires_at > Instant::now() {
                if let Some(key) = entry.keys_by_kid.get(kid) {
                    return Ok(key.clone());
                }
            }
        }

        // Single flight: only one task refetches the key set.
        let _guard = self.refresh_lock.lock().await;

        if let Some(entry) = self.jwks_cache.read().await.as_ref() {
            if entry.expires_at > Instant::now() {
                if let Some(key) = entry.keys_by_kid.get(kid) {
                    return Ok(key.clone());
                }
            }
        }

        let jwks_url = match &self.mode {
            VerifierMode::Jwks { jwks_url } => jwks_url.clone(),
            VerifierMode::StaticKey { .. } => return Err(AppError::InvalidToken),
        };

        let jwks: JwksResponse = self
            .http
            .get(&jwks_url)
            .send()
            .await
            .map_err(|e| AppError::GoogleApi(format!("JWKS fetch failed: {e}")))?
            .json()
            .await
            .map_err(|e| AppError::GoogleApi(format!("JWKS parse failed: {e}")))?;

        let mut keys_by_kid = HashMap::new();
        for key in jwks.keys {
            if key.kty != "RSA" {
                continue;
            }
            match DecodingKey::from_rsa_components(&key.n, &key.e) {
                Ok(decoding_key) => {
                    keys_by_kid.insert(key.kid, Arc::new(decoding_key));
                }
                Err(e) => {
                    tracing::warn!(kid = %key.kid, error = %e, "Skipping unparseable JWKS key");
                }
            }
        }

        let entry = JwksCacheEntry {
            keys_by_kid,
            expires_at: Instant::now() + JWKS_CACHE_TTL,
        };
        let key = entry.keys_by_kid.get(kid).cloned();
        *self.jwks_cache.write().await = Some(entry);

        key.ok_or(AppError::InvalidToken)
    }
}

/// Response from the Google token endpoint.
#[derive(Debug, Deserialize)]
struct TokenExchangeResponse {
    id_token: String,
    #[serde(default)]
    refresh_token: Option<String>,
}

/// Claims we read from a Google ID token.
#[derive(Debug, Deserialize)]
struct IdTokenClaims {
    sub: String,
    #[serde(default)]
    email: Option<String>,
    #[serde(default)]
    name: Option<String>,
    #[serde(default)]
    picture: Option<String>,
}

#[derive(Debug, Deserialize)]
struct JwksResponse {
    keys: Vec<Jwk>,
}

#[derive(Debug, Deserialize)]
struct Jwk {
    kid: String,
    kty: String,
    n: String,
    e: String,
}
