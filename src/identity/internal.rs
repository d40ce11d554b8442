// Copyright 2020 Dmitry Tantsur <dtantsur@protonmail.com>
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

//! Internal implementation of the identity authentication.

use std::collections::hash_map::DefaultHasher;
use std::fmt;
use std::hash::{Hash, Hasher};
use std::ops::Deref;

use chrono::{Duration, Utc};
use log::{debug, trace};
use reqwest::{Client, Url};
use tokio::sync::RwLock;

use super::protocol::{self, AccessRoot, AuthRoot};
use super::TOKEN_MIN_VALIDITY;
use crate::client::check;
use crate::{catalog, EndpointFilters, Error, ErrorKind};

/// Cached access information: token, catalog and user.
#[derive(Clone)]
pub(crate) struct Access {
    inner: protocol::Access,
}

impl fmt::Debug for Access {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let mut hasher = DefaultHasher::new();
        self.inner.token.id.hash(&mut hasher);
        write!(
            f,
            "Access {{ token: hash({}), expires: {} }}",
            hasher.finish(),
            self.inner.token.expires
        )
    }
}

/// Internal identity authentication object.
#[derive(Debug)]
pub(crate) struct Internal {
    auth_url: Url,
    body: AuthRoot,
    token_endpoint: String,
    cached: RwLock<Option<Access>>,
}

impl Internal {
    /// Create a new implementation.
    pub fn new(mut auth_url: Url, body: AuthRoot) -> Result<Internal, Error> {
        let _ = auth_url
            .path_segments_mut()
            .map_err(|_| Error::new(ErrorKind::InvalidConfig, "Invalid auth_url: wrong schema?"))?
            .pop_if_empty();

        let token_endpoint = format!("{}/tokens", auth_url.as_str().trim_end_matches('/'));

        Ok(Internal {
            auth_url,
            body,
            token_endpoint,
            cached: RwLock::new(None),
        })
    }

    /// Access to the auth URL.
    #[inline]
    pub fn auth_url(&self) -> &Url {
        &self.auth_url
    }

    /// User name the authentication was created with.
    #[inline]
    pub fn username(&self) -> &str {
        match self.body.auth {
            protocol::Auth::ApiKey(ref creds) => &creds.username,
            protocol::Auth::Password(ref creds) => &creds.username,
        }
    }

    /// Get the authentication token string.
    pub async fn get_token(&self, client: &Client) -> Result<String, Error> {
        self.refresh(client, false).await?;
        let guard = self.cached.read().await;
        match guard.deref() {
            Some(access) => Ok(access.inner.token.id.clone()),
            // refresh unconditionally populates the cache
            None => Err(Error::new(
                ErrorKind::InvalidResponse,
                "Token cache is empty after refresh",
            )),
        }
    }

    /// Get a URL for the requested service.
    pub async fn get_endpoint(
        &self,
        client: &Client,
        service_type: &str,
        filters: &EndpointFilters,
    ) -> Result<Url, Error> {
        debug!(
            "Requesting a catalog endpoint for service '{}', filters {:?}",
            service_type, filters
        );
        self.refresh(client, false).await?;
        let guard = self.cached.read().await;
        match guard.deref() {
            Some(access) => {
                catalog::extract_url(&access.inner.service_catalog, service_type, filters)
            }
            None => Err(Error::new(
                ErrorKind::InvalidResponse,
                "Token cache is empty after refresh",
            )),
        }
    }

    /// Get the authenticated user snapshot.
    pub async fn user(&self, client: &Client) -> Result<protocol::User, Error> {
        self.refresh(client, false).await?;
        let guard = self.cached.read().await;
        match guard.deref() {
            Some(access) => Ok(access.inner.user.clone()),
            None => Err(Error::new(
                ErrorKind::InvalidResponse,
                "Token cache is empty after refresh",
            )),
        }
    }

    /// Refresh the token (if needed or forced).
    ///
    /// On success the token, catalog and user are replaced wholesale from the
    /// response. Any failure leaves the previously cached state untouched.
    pub async fn refresh(&self, client: &Client, force: bool) -> Result<(), Error> {
        // This is executed on every request at least once, so it's important
        // to start with a read lock. We expect to hit this branch most of the
        // time.
        if !force && token_alive(&self.cached.read().await) {
            return Ok(());
        }

        let mut lock = self.cached.write().await;
        // Another task may have updated the token while we were waiting for
        // the write lock.
        if !force && token_alive(&lock) {
            return Ok(());
        }

        debug!("Requesting a token from {}", self.token_endpoint);
        let resp = client
            .post(&self.token_endpoint)
            .json(&self.body)
            .send()
            .await
            .map_err(Error::from)?;
        let resp = check(resp).await?;
        let root = resp.json::<AccessRoot>().await.map_err(|e| {
            Error::new(
                ErrorKind::InvalidResponse,
                format!("Malformed identity response: {}", e),
            )
        })?;

        if root.access.token.id.is_empty() {
            return Err(Error::new(
                ErrorKind::InvalidResponse,
                "Identity response contains an empty token",
            ));
        }

        debug!("Received a token expiring at {}", root.access.token.expires);
        trace!("Received catalog: {:?}", root.access.service_catalog);
        *lock = Some(Access { inner: root.access });
        Ok(())
    }

    #[cfg(test)]
    pub fn token_endpoint(&self) -> &str {
        &self.token_endpoint
    }
}

impl Clone for Internal {
    fn clone(&self) -> Internal {
        Internal {
            auth_url: self.auth_url.clone(),
            body: self.body.clone(),
            token_endpoint: self.token_endpoint.clone(),
            cached: RwLock::new(None),
        }
    }
}

#[inline]
fn token_alive(access: &impl Deref<Target = Option<Access>>) -> bool {
    if let Some(value) = access.deref() {
        let validity_time_left = value.inner.token.expires.signed_duration_since(Utc::now());
        trace!("Token is valid for {:?}", validity_time_left);
        validity_time_left > Duration::minutes(TOKEN_MIN_VALIDITY)
    } else {
        false
    }
}
