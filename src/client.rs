// Copyright 2021 Dmitry Tantsur <dtantsur@protonmail.com>
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

//! Low-level authenticated client.

use std::sync::Arc;
use std::time::Duration;

use http::header::{HeaderMap, HeaderName, HeaderValue};
use http::Error as HttpError;
use log::{debug, trace};
use reqwest::{
    Body, Client, Method, RequestBuilder as HttpRequestBuilder, Response, StatusCode, Url,
};
use serde::de::DeserializeOwned;
use serde::Serialize;

use super::identity::protocol::User;
use super::{AuthType, EndpointFilters, Error};

/// A properly typed constant for use with root paths.
///
/// The problem with just using `None` is that the exact type of `Option` is
/// not known.
pub const NO_PATH: Option<&'static str> = None;

/// Authenticated HTTP client.
///
/// Uses `Arc` internally and should be reused when possible by cloning it.
#[derive(Debug, Clone)]
pub struct AuthenticatedClient {
    client: Client,
    auth: Arc<dyn AuthType>,
}

impl AuthenticatedClient {
    /// Create a new authenticated client.
    ///
    /// Authenticates immediately so that invalid credentials are detected
    /// before the first data-plane request.
    pub async fn new<Auth: AuthType + 'static>(
        client: Client,
        auth_type: Auth,
    ) -> Result<AuthenticatedClient, Error> {
        auth_type.refresh(&client).await?;
        Ok(AuthenticatedClient::new_internal(
            client,
            Arc::new(auth_type),
        ))
    }

    #[inline]
    pub(crate) fn new_internal(client: Client, auth: Arc<dyn AuthType>) -> AuthenticatedClient {
        AuthenticatedClient { client, auth }
    }

    /// Get a reference to the authentication type in use.
    #[inline]
    pub fn auth_type(&self) -> &dyn AuthType {
        self.auth.as_ref()
    }

    /// Get a URL for the requested service.
    #[inline]
    pub async fn get_endpoint(
        &self,
        service_type: &str,
        filters: &EndpointFilters,
    ) -> Result<Url, Error> {
        self.auth
            .get_endpoint(&self.client, service_type, filters)
            .await
    }

    /// Get a reference to the inner (non-authenticated) client.
    #[inline]
    pub fn inner(&self) -> &Client {
        &self.client
    }

    /// Update the authentication.
    ///
    /// # Warning
    ///
    /// Authentication will also be updated for clones of this client, since
    /// they share the same authentication object.
    #[inline]
    pub async fn refresh(&self) -> Result<(), Error> {
        self.auth.refresh(&self.client).await
    }

    /// Get the authenticated user (if the authentication knows one).
    #[inline]
    pub async fn user(&self) -> Result<Option<User>, Error> {
        self.auth.user(&self.client).await
    }

    /// Start an authenticated request.
    #[inline]
    pub fn request(&self, method: Method, url: Url) -> RequestBuilder {
        RequestBuilder {
            inner: self.client.request(method, url),
            client: self.clone(),
        }
    }

    /// Authenticate a request.
    #[inline]
    async fn authenticate(
        &self,
        request: HttpRequestBuilder,
    ) -> Result<HttpRequestBuilder, Error> {
        self.auth.authenticate(&self.client, request).await
    }

    #[cfg(test)]
    pub(crate) async fn new_noauth(endpoint: &str) -> AuthenticatedClient {
        use crate::NoAuth;
        AuthenticatedClient::new(Client::new(), NoAuth::new(endpoint).unwrap())
            .await
            .unwrap()
    }
}

impl From<AuthenticatedClient> for Client {
    fn from(value: AuthenticatedClient) -> Client {
        value.client
    }
}

async fn extract_message(resp: Response) -> Result<String, Error> {
    let status = resp.status();
    let text = resp.text().await.map_err(Error::from)?;
    let text = text.trim();
    if text.is_empty() {
        Ok(status
            .canonical_reason()
            .unwrap_or("Unknown HTTP error")
            .to_string())
    } else {
        Ok(text.to_string())
    }
}

/// Check the response for errors.
///
/// A non-2xx status is converted into an [Error](../struct.Error.html)
/// carrying the status code and the response body as the message.
pub async fn check(response: Response) -> Result<Response, Error> {
    let status = response.status();
    if status.is_client_error() || status.is_server_error() {
        let message = extract_message(response).await?;
        trace!("HTTP request returned {}; error: {}", status, message);
        Err(Error::new(status.into(), message).with_status(status))
    } else {
        trace!(
            "HTTP request to {} returned {}",
            response.url(),
            response.status()
        );
        Ok(response)
    }
}

/// A request builder with error handling.
///
/// Errors are checked on `send`, and an expired token causes one transparent
/// re-authentication and retry.
#[derive(Debug)]
#[must_use = "preparing a request is not enough to run it"]
pub struct RequestBuilder {
    inner: HttpRequestBuilder,
    client: AuthenticatedClient,
}

impl RequestBuilder {
    /// Add a body to the request.
    pub fn body<T: Into<Body>>(self, body: T) -> RequestBuilder {
        RequestBuilder {
            inner: self.inner.body(body),
            ..self
        }
    }

    /// Add a header to the request.
    pub fn header<K, V>(self, key: K, value: V) -> RequestBuilder
    where
        HeaderName: TryFrom<K>,
        <HeaderName as TryFrom<K>>::Error: Into<HttpError>,
        HeaderValue: TryFrom<V>,
        <HeaderValue as TryFrom<V>>::Error: Into<HttpError>,
    {
        RequestBuilder {
            inner: self.inner.header(key, value),
            ..self
        }
    }

    /// Add headers to a request.
    pub fn headers(self, headers: HeaderMap) -> RequestBuilder {
        RequestBuilder {
            inner: self.inner.headers(headers),
            ..self
        }
    }

    /// Add a JSON body to the request.
    pub fn json<T: Serialize + ?Sized>(self, json: &T) -> RequestBuilder {
        RequestBuilder {
            inner: self.inner.json(json),
            ..self
        }
    }

    /// Send a query with the request.
    pub fn query<T: Serialize + ?Sized>(self, query: &T) -> RequestBuilder {
        RequestBuilder {
            inner: self.inner.query(query),
            ..self
        }
    }

    /// Override the timeout for the request.
    pub fn timeout(self, timeout: Duration) -> RequestBuilder {
        RequestBuilder {
            inner: self.inner.timeout(timeout),
            ..self
        }
    }

    /// Send the request and receive JSON in response.
    pub async fn fetch_json<T>(self) -> Result<T, Error>
    where
        T: DeserializeOwned + Send,
    {
        self.send().await?.json::<T>().await.map_err(Error::from)
    }

    /// Send the request and check for errors.
    ///
    /// If the first attempt fails with an authentication error, the token is
    /// refreshed and the request is retried exactly once. A second
    /// authentication failure propagates to the caller. Requests with a
    /// streaming body cannot be cloned and are not retried.
    pub async fn send(self) -> Result<Response, Error> {
        let RequestBuilder { inner, client } = self;
        let retry = inner.try_clone();

        let authenticated = client.authenticate(inner).await?;
        let response = authenticated.send().await.map_err(Error::from)?;

        if response.status() == StatusCode::UNAUTHORIZED {
            if let Some(second) = retry {
                debug!(
                    "Request to {} failed with {}, refreshing the authentication",
                    response.url(),
                    response.status()
                );
                client.refresh().await?;
                let authenticated = client.authenticate(second).await?;
                let response = authenticated.send().await.map_err(Error::from)?;
                return check(response).await;
            }
        }

        check(response).await
    }

    /// Send the request without checking for HTTP errors.
    pub async fn send_unchecked(self) -> Result<Response, Error> {
        let RequestBuilder { inner, client } = self;
        let authenticated = client.authenticate(inner).await?;
        authenticated.send().await.map_err(Error::from)
    }

    /// Attempt to clone this request builder.
    pub fn try_clone(&self) -> Option<RequestBuilder> {
        self.inner.try_clone().map(|inner| RequestBuilder {
            inner,
            client: self.client.clone(),
        })
    }
}
