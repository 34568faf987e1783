//! OAuth install flow for the Shopify app.
//!
//! Only the authorization-code grant for offline tokens is implemented: the
//! merchant is redirected to [`ShopifyOAuth::authorization_url`], Shopify
//! calls back with a code, and [`ShopifyOAuth::exchange_code`] trades it for
//! an access token that is stored against the shop.

use commission_manager_core::ShopDomain;
use secrecy::{ExposeSecret, SecretString};
use serde::Deserialize;
use tracing::instrument;

use crate::config::ShopifyAppConfig;
use crate::shopify::ShopifyError;

/// Access token obtained from the OAuth exchange.
///
/// Implements `Debug` manually to redact the token.
#[derive(Clone)]
pub struct OAuthToken {
    /// Shop the token belongs to.
    pub shop: ShopDomain,
    /// Offline access token.
    pub access_token: SecretString,
    /// Granted scopes, comma separated.
    pub scope: String,
}

impl std::fmt::Debug for OAuthToken {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OAuthToken")
            .field("shop", &self.shop)
            .field("access_token", &"[REDACTED]")
            .field("scope", &self.scope)
            .finish()
    }
}

/// OAuth token response from Shopify.
#[derive(Debug, Deserialize)]
struct OAuthTokenResponse {
    access_token: String,
    #[serde(default)]
    scope: String,
}

/// App-level OAuth client (client id + secret, no shop binding).
#[derive(Clone)]
pub struct ShopifyOAuth {
    client: reqwest::Client,
    api_key: String,
    api_secret: SecretString,
    scopes: String,
    base_override: Option<String>,
}

impl std::fmt::Debug for ShopifyOAuth {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ShopifyOAuth")
            .field("api_key", &self.api_key)
            .field("api_secret", &"[REDACTED]")
            .field("scopes", &self.scopes)
            .field("base_override", &self.base_override)
            .finish()
    }
}

impl ShopifyOAuth {
    /// Create the OAuth client from app configuration.
    #[must_use]
    pub fn new(client: reqwest::Client, config: &ShopifyAppConfig) -> Self {
        Self {
            client,
            api_key: config.api_key.clone(),
            api_secret: config.api_secret.clone(),
            scopes: config.scopes.clone(),
            base_override: None,
        }
    }

    /// Talk to `base` (scheme + host) instead of the shop's own host.
    #[must_use]
    pub fn with_base_url(mut self, base: impl Into<String>) -> Self {
        self.base_override = Some(base.into().trim_end_matches('/').to_string());
        self
    }

    /// Client secret, used to verify the callback signature.
    #[must_use]
    pub const fn api_secret(&self) -> &SecretString {
        &self.api_secret
    }

    fn shop_base(&self, shop: &ShopDomain) -> String {
        self.base_override
            .clone()
            .unwrap_or_else(|| format!("https://{shop}"))
    }

    /// Generate the OAuth authorization URL.
    ///
    /// Redirect the merchant to this URL to begin the install flow.
    #[must_use]
    pub fn authorization_url(&self, shop: &ShopDomain, redirect_uri: &str, state: &str) -> String {
        format!(
            "{}/admin/oauth/authorize?client_id={}&scope={}&redirect_uri={}&state={}",
            self.shop_base(shop),
            urlencoding::encode(&self.api_key),
            urlencoding::encode(&self.scopes),
            urlencoding::encode(redirect_uri),
            urlencoding::encode(state)
        )
    }

    /// Exchange an authorization code for an offline access token.
    ///
    /// # Errors
    ///
    /// Returns `ShopifyError::OAuth` if Shopify rejects the exchange.
    /// Returns `ShopifyError::Http` if the HTTP request fails.
    #[instrument(skip(self, code), fields(shop = %shop))]
    pub async fn exchange_code(
        &self,
        shop: &ShopDomain,
        code: &str,
    ) -> Result<OAuthToken, ShopifyError> {
        let url = format!("{}/admin/oauth/access_token", self.shop_base(shop));

        let params = [
            ("client_id", self.api_key.as_str()),
            ("client_secret", self.api_secret.expose_secret()),
            ("code", code),
        ];

        let response = self.client.post(&url).form(&params).send().await?;

        if !response.status().is_success() {
            let status = response.status();
            let text = response.text().await.unwrap_or_default();
            return Err(ShopifyError::OAuth(format!(
                "Token exchange failed ({status}): {text}"
            )));
        }

        let token_response: OAuthTokenResponse = response.json().await?;

        Ok(OAuthToken {
            shop: shop.clone(),
            access_token: SecretString::from(token_response.access_token),
            scope: token_response.scope,
        })
    }
}
