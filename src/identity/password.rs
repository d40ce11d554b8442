// Copyright 2019-2020 Dmitry Tantsur <dtantsur@protonmail.com>
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

//! Password authentication.

use async_trait::async_trait;
use reqwest::{Client, IntoUrl, RequestBuilder, Url};

use super::internal::Internal;
use super::protocol::{self, User};
use super::{Identity, DEFAULT_AUTH_URL};
use crate::{AuthType, EndpointFilters, Error};

/// Password authentication using Identity API V2.0.
///
/// Prefer [ApiKey](struct.ApiKey.html) authentication where possible. The
/// token received on authentication is cached while it is still valid or
/// until [refresh](../trait.AuthType.html#tymethod.refresh) is called.
///
/// ```rust,no_run
/// let auth = raxfiles::identity::Password::new("joe", "pa$$w0rd")
///     .expect("Invalid auth URL");
/// ```
///
/// Clones of a `Password` start with an empty token cache.
#[derive(Debug, Clone)]
pub struct Password {
    inner: Internal,
}

impl Identity for Password {
    fn auth_url(&self) -> &Url {
        self.inner.auth_url()
    }
}

impl Password {
    /// Create a password authentication against the default endpoint.
    pub fn new<S1, S2>(username: S1, password: S2) -> Result<Password, Error>
    where
        S1: Into<String>,
        S2: Into<String>,
    {
        Password::new_with_auth_url(DEFAULT_AUTH_URL, username, password)
    }

    /// Create a password authentication against the provided endpoint.
    pub fn new_with_auth_url<U, S1, S2>(
        auth_url: U,
        username: S1,
        password: S2,
    ) -> Result<Password, Error>
    where
        U: IntoUrl,
        S1: Into<String>,
        S2: Into<String>,
    {
        let auth_url = auth_url.into_url().map_err(Error::from)?;

        let body = protocol::AuthRoot {
            auth: protocol::Auth::Password(protocol::PasswordCredentials {
                username: username.into(),
                password: password.into(),
            }),
        };
        Ok(Password {
            inner: Internal::new(auth_url, body)?,
        })
    }

    /// User name.
    #[inline]
    pub fn username(&self) -> &str {
        self.inner.username()
    }
}

#[async_trait]
impl AuthType for Password {
    /// Authenticate a request.
    async fn authenticate(
        &self,
        client: &Client,
        request: RequestBuilder,
    ) -> Result<RequestBuilder, Error> {
        let token = self.inner.get_token(client).await?;
        Ok(request.header("x-auth-token", token))
    }

    /// Get a URL for the requested service.
    async fn get_endpoint(
        &self,
        client: &Client,
        service_type: &str,
        filters: &EndpointFilters,
    ) -> Result<Url, Error> {
        self.inner.get_endpoint(client, service_type, filters).await
    }

    /// Refresh the cached token and service catalog.
    async fn refresh(&self, client: &Client) -> Result<(), Error> {
        self.inner.refresh(client, true).await
    }

    /// Get the authenticated user snapshot.
    async fn user(&self, client: &Client) -> Result<Option<User>, Error> {
        self.inner.user(client).await.map(Some)
    }
}
