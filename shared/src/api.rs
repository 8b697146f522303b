use async_trait::async_trait;
use log::{debug, error};
use reqwest::{Client, Response, Url};
use serde::de::{Deserialize, DeserializeOwned};

use crate::config::ClientConfig;
use crate::error::{ApiError, ApiResult};
use crate::models::{
    ExistsResponse, Forest, RegisterResponse, RegistrationRequest, TreeResponse, User,
    UserLookupResponse,
};

/// The four operations of the remote referral service.
#[async_trait]
pub trait ReferralApi: Send + Sync {
    /// `GET /exists/{user_id}`
    async fn check_exists(&self, user_id: &str) -> ApiResult<bool>;

    /// `GET /by-id/{user_id}`, `None` when the service knows no such user
    async fn get_user_by_id(&self, user_id: &str) -> ApiResult<Option<User>>;

    /// `POST /register`
    async fn register_user(&self, request: &RegistrationRequest) -> ApiResult<Option<User>>;

    /// `GET /tree`, `None` when the payload carries no `forest`
    async fn fetch_tree(&self) -> ApiResult<Option<Forest>>;
}

/// reqwest-backed client for the referral API
#[derive(Clone, Debug)]
pub struct HttpReferralApi {
    client: Client,
    base_url: Url,
}

impl HttpReferralApi {
    pub fn new(config: &ClientConfig) -> ApiResult<Self> {
        let mut builder = Client::builder();
        if let Some(timeout) = config.request_timeout {
            builder = builder.timeout(timeout);
        }

        Ok(Self {
            client: builder.build()?,
            base_url: config.api_base.clone(),
        })
    }

    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    /// Appends `segments` to the base URL, percent-encoding each one so that
    /// ids containing `/`, `?` or spaces stay a single path segment.
    pub fn endpoint(&self, segments: &[&str]) -> ApiResult<Url> {
        let mut url = self.base_url.clone();
        url.path_segments_mut()
            .map_err(|_| ApiError::InvalidUrl(self.base_url.to_string()))?
            .pop_if_empty()
            .extend(segments);
        Ok(url)
    }

    async fn get_json<T: DeserializeOwned>(&self, url: Url) -> ApiResult<T> {
        debug!("GET {}", url);
        let result = self.client.get(url.clone()).send().await;
        read_json(result, &url).await
    }
}

/// Shared response handling: every failure is logged with the URL and
/// turned into an `ApiError`.
async fn read_json<T: DeserializeOwned>(
    result: Result<Response, reqwest::Error>,
    url: &Url,
) -> ApiResult<T> {
    let response = result.map_err(|e| {
        error!("API error: {} => {}", e, url);
        ApiError::Transport(e)
    })?;

    let status = response.status();
    if !status.is_success() {
        error!("API error: HTTP {} => {}", status.as_u16(), url);
        return Err(ApiError::Http {
            status: status.as_u16(),
            url: url.to_string(),
        });
    }

    let body = response.bytes().await.map_err(|e| {
        error!("API error: failed to read body: {} => {}", e, url);
        ApiError::Transport(e)
    })?;

    decode_json(&body).map_err(|e| {
        error!("API error: invalid JSON: {} => {}", e, url);
        ApiError::Decode {
            url: url.to_string(),
            source: e,
        }
    })
}

/// Parses a response body without serde_json's nesting limit. Each tree
/// level costs two levels of JSON nesting, so the default limit of 128
/// would reject chains deeper than 62; serde_stacker grows the stack
/// instead of overflowing it.
pub fn decode_json<T: DeserializeOwned>(body: &[u8]) -> Result<T, serde_json::Error> {
    let mut deserializer = serde_json::Deserializer::from_slice(body);
    deserializer.disable_recursion_limit();

    let value = T::deserialize(serde_stacker::Deserializer::new(&mut deserializer))?;
    // reject trailing garbage, as serde_json::from_slice does
    deserializer.end()?;
    Ok(value)
}

#[async_trait]
impl ReferralApi for HttpReferralApi {
    async fn check_exists(&self, user_id: &str) -> ApiResult<bool> {
        let url = self.endpoint(&["exists", user_id])?;
        let response: ExistsResponse = self.get_json(url).await?;
        Ok(response.exists)
    }

    async fn get_user_by_id(&self, user_id: &str) -> ApiResult<Option<User>> {
        let url = self.endpoint(&["by-id", user_id])?;
        let response: UserLookupResponse = self.get_json(url).await?;
        Ok(response.user)
    }

    async fn register_user(&self, request: &RegistrationRequest) -> ApiResult<Option<User>> {
        let url = self.endpoint(&["register"])?;
        debug!("POST {} for user_id={}", url, request.user_id);

        let result = self.client.post(url.clone()).json(request).send().await;
        let response: RegisterResponse = read_json(result, &url).await?;
        Ok(response.user)
    }

    async fn fetch_tree(&self) -> ApiResult<Option<Forest>> {
        let url = self.endpoint(&["tree"])?;
        let response: TreeResponse = self.get_json(url).await?;
        Ok(response.forest)
    }
}
