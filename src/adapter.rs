// Copyright 2019 Dmitry Tantsur <dtantsur@protonmail.com>
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

//! Adapter for a specific service.

use reqwest::{Method, Url};

use super::client::{AuthenticatedClient, RequestBuilder};
use super::services::ServiceType;
use super::url;
use super::{EndpointFilters, Error};

/// Adapter for a specific service.
///
/// An `Adapter` ties an [AuthenticatedClient](struct.AuthenticatedClient.html)
/// to one service from the catalog, resolving the endpoint for every request
/// from the cached catalog and the configured filters.
#[derive(Debug, Clone)]
pub struct Adapter<Srv> {
    client: AuthenticatedClient,
    service: Srv,
    filters: EndpointFilters,
}

impl<Srv> Adapter<Srv> {
    /// Create a new adapter for the given service.
    pub fn new(client: AuthenticatedClient, service: Srv, filters: EndpointFilters) -> Adapter<Srv> {
        Adapter {
            client,
            service,
            filters,
        }
    }

    /// Get a reference to the underlying client.
    #[inline]
    pub fn client(&self) -> &AuthenticatedClient {
        &self.client
    }

    /// Endpoint filters in use.
    #[inline]
    pub fn filters(&self) -> &EndpointFilters {
        &self.filters
    }
}

impl<Srv: ServiceType> Adapter<Srv> {
    /// Construct an endpoint for the service from the path.
    pub async fn get_endpoint<I>(&self, path: I) -> Result<Url, Error>
    where
        I: IntoIterator,
        I::Item: AsRef<str>,
    {
        let endpoint = self
            .client
            .get_endpoint(self.service.catalog_type(), &self.filters)
            .await?;
        Ok(url::extend(endpoint, path))
    }

    /// Start an HTTP request to the service.
    pub async fn request<I>(&self, method: Method, path: I) -> Result<RequestBuilder, Error>
    where
        I: IntoIterator,
        I::Item: AsRef<str>,
    {
        let url = self.get_endpoint(path).await?;
        Ok(self.client.request(method, url))
    }

    /// Start a GET request.
    #[inline]
    pub async fn get<I>(&self, path: I) -> Result<RequestBuilder, Error>
    where
        I: IntoIterator,
        I::Item: AsRef<str>,
    {
        self.request(Method::GET, path).await
    }

    /// Start a HEAD request.
    #[inline]
    pub async fn head<I>(&self, path: I) -> Result<RequestBuilder, Error>
    where
        I: IntoIterator,
        I::Item: AsRef<str>,
    {
        self.request(Method::HEAD, path).await
    }

    /// Start a POST request.
    #[inline]
    pub async fn post<I>(&self, path: I) -> Result<RequestBuilder, Error>
    where
        I: IntoIterator,
        I::Item: AsRef<str>,
    {
        self.request(Method::POST, path).await
    }

    /// Start a PUT request.
    #[inline]
    pub async fn put<I>(&self, path: I) -> Result<RequestBuilder, Error>
    where
        I: IntoIterator,
        I::Item: AsRef<str>,
    {
        self.request(Method::PUT, path).await
    }

    /// Start a DELETE request.
    #[inline]
    pub async fn delete<I>(&self, path: I) -> Result<RequestBuilder, Error>
    where
        I: IntoIterator,
        I::Item: AsRef<str>,
    {
        self.request(Method::DELETE, path).await
    }
}
