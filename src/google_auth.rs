//! OAuth access tokens for the Google Sheets and Drive backends.

use std::time::{Duration, Instant};

use reqwest::Client;
use serde::Deserialize;

pub const SCOPE_SPREADSHEETS: &str = "https://www.googleapis.com/auth/spreadsheets";
pub const SCOPE_DRIVE_FILE: &str = "https://www.googleapis.com/auth/drive.file";

/// Refresh this long before the reported expiry.
const EXPIRY_MARGIN: Duration = Duration::from_secs(300);

const METADATA_TOKEN_URL: &str =
    "http://metadata.google.internal/computeMetadata/v1/instance/service-accounts/default/token";

#[derive(Deserialize)]
struct ServiceAccountKey {
    client_email: String,
    private_key: String,
    token_uri: String,
}

#[derive(Deserialize)]
struct TokenResponse {
    access_token: String,
    #[serde(default = "default_expires_in")]
    expires_in: u64,
}

fn default_expires_in() -> u64 {
    3600
}

struct CachedToken {
    value: String,
    expires_at: Instant,
}

enum TokenSource {
    ServiceAccount(String),
    MetadataServer,
    Static,
}

/// Caches one access token and refreshes it on demand.
pub struct GoogleAuth {
    client: Client,
    source: TokenSource,
    scopes: String,
    token: tokio::sync::RwLock<Option<CachedToken>>,
}

impl GoogleAuth {
    /// Service-account key file when given, otherwise the GCE metadata server.
    pub async fn new(
        credentials_file: Option<&str>,
        scopes: &[&str],
    ) -> Result<Self, anyhow::Error> {
        let auth = Self {
            client: Client::builder().build()?,
            source: match credentials_file {
                Some(path) => TokenSource::ServiceAccount(path.to_string()),
                None => TokenSource::MetadataServer,
            },
            scopes: scopes.join(" "),
            token: tokio::sync::RwLock::new(None),
        };

        auth.access_token().await?;
        Ok(auth)
    }

    /// A fixed token that never refreshes. Used for proxies and tests.
    pub fn with_static_token(token: impl Into<String>) -> Self {
        Self {
            client: Client::new(),
            source: TokenSource::Static,
            scopes: String::new(),
            token: tokio::sync::RwLock::new(Some(CachedToken {
                value: token.into(),
                expires_at: Instant::now(),
            })),
        }
    }

    pub async fn access_token(&self) -> Result<String, anyhow::Error> {
        {
            let lock = self.token.read().await;
            if let Some(token) = lock.as_ref() {
                if matches!(self.source, TokenSource::Static)
                    || Instant::now() + EXPIRY_MARGIN < token.expires_at
                {
                    return Ok(token.value.clone());
                }
            }
        }

        let fresh = match &self.source {
            TokenSource::ServiceAccount(path) => self.token_from_service_account(path).await?,
            TokenSource::MetadataServer => self.token_from_metadata_server().await?,
            TokenSource::Static => anyhow::bail!("static token missing"),
        };

        tracing::debug!(expires_in = fresh.expires_in, "Refreshed Google access token");
        let value = fresh.access_token.clone();
        let mut lock = self.token.write().await;
        *lock = Some(CachedToken {
            value: fresh.access_token,
            expires_at: Instant::now() + Duration::from_secs(fresh.expires_in),
        });
        Ok(value)
    }

    async fn token_from_service_account(&self, path: &str) -> Result<TokenResponse, anyhow::Error> {
        let key_json = tokio::fs::read_to_string(path).await?;
        let key: ServiceAccountKey = serde_json::from_str(&key_json)?;

        let now = chrono::Utc::now().timestamp();
        let claims = serde_json::json!({
            "iss": key.client_email,
            "scope": self.scopes,
            "aud": key.token_uri,
            "iat": now,
            "exp": now + 3600,
        });

        // JWT: header.claims.signature
        let header = base64_url_encode(&serde_json::to_vec(&serde_json::json!({
            "alg": "RS256",
            "typ": "JWT"
        }))?);
        let payload = base64_url_encode(&serde_json::to_vec(&claims)?);
        let unsigned = format!("{header}.{payload}");

        let signature = sign_rs256(unsigned.as_bytes(), &key.private_key)?;
        let jwt = format!("{unsigned}.{}", base64_url_encode(&signature));

        let resp = self
            .client
            .post(&key.token_uri)
            .form(&[
                ("grant_type", "urn:ietf:params:oauth:grant-type:jwt-bearer"),
                ("assertion", &jwt),
            ])
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;

        Ok(resp)
    }

    async fn token_from_metadata_server(&self) -> Result<TokenResponse, anyhow::Error> {
        let resp = self
            .client
            .get(METADATA_TOKEN_URL)
            .query(&[("scopes", self.scopes.as_str())])
            .header("Metadata-Flavor", "Google")
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;

        Ok(resp)
    }
}

fn base64_url_encode(data: &[u8]) -> String {
    use base64::Engine;
    base64::engine::general_purpose::URL_SAFE_NO_PAD.encode(data)
}

fn sign_rs256(data: &[u8], private_key_pem: &str) -> Result<Vec<u8>, anyhow::Error> {
    // PEM body to DER
    let der_b64: String = private_key_pem
        .lines()
        .filter(|line| !line.starts_with("-----"))
        .map(str::trim)
        .collect();
    let der = base64::Engine::decode(&base64::engine::general_purpose::STANDARD, &der_b64)?;

    let key_pair = ring::signature::RsaKeyPair::from_pkcs8(&der)
        .map_err(|e| anyhow::anyhow!("Failed to parse RSA key: {e}"))?;

    let mut signature = vec![0u8; key_pair.public().modulus_len()];
    key_pair
        .sign(
            &ring::signature::RSA_PKCS1_SHA256,
            &ring::rand::SystemRandom::new(),
            data,
            &mut signature,
        )
        .map_err(|e| anyhow::anyhow!("Failed to sign: {e}"))?;

    Ok(signature)
}
