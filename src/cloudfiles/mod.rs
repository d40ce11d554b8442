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

//! Client for the Cloud Files object storage and CDN APIs.
//!
//! The entry point is [CloudFiles](struct.CloudFiles.html), which represents
//! the storage account and hands out [Container](struct.Container.html) and
//! [StorageObject](struct.StorageObject.html) resources. All requests are
//! authenticated through an [AuthType](../trait.AuthType.html) and addressed
//! via the service catalog.

mod container;
mod object;
pub(crate) mod protocol;
mod tempurl;

use std::collections::HashMap;
use std::path::Path;

use log::debug;
use reqwest::{Client, StatusCode};
use serde::Serialize;

use crate::adapter::Adapter;
use crate::client::{AuthenticatedClient, NO_PATH};
use crate::config::{self, CloudConfig};
use crate::services::{self, GenericService};
use crate::{AuthType, EndpointFilters, Error, ErrorKind, InterfaceType};

pub use self::container::{ArchiveKind, Container, ListQuery, DEFAULT_CDN_TTL};
pub use self::object::StorageObject;
pub use self::protocol::{
    ArchiveErrors, CdnContainerEntry, ContainerEntry, ExtractArchiveResponse, ObjectEntry,
};
pub use self::tempurl::signature as temp_url_signature;

const ACCOUNT_META_PREFIX: &str = "x-account-meta-";
const ACCOUNT_META_REMOVE_PREFIX: &str = "x-remove-account-meta-";
const TEMP_URL_KEY: &str = "x-account-meta-temp-url-key";

#[derive(Debug, Serialize)]
struct AccountQuery<'s> {
    format: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    limit: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    marker: Option<&'s str>,
}

/// Cloud Files account client.
///
/// Holds the cached account-level statistics and metadata, refreshed by
/// [load](#method.load). The cache is replaced wholesale on each load and
/// becomes stale immediately after: reload to observe server-side changes.
#[derive(Debug, Clone)]
pub struct CloudFiles {
    storage: Adapter<GenericService>,
    cdn: Adapter<GenericService>,
    object_count: u64,
    bytes_used: u64,
    container_count: u64,
    metadata: HashMap<String, String>,
}

impl CloudFiles {
    /// Create a client with the given authentication.
    ///
    /// The region defaults to the authenticated account's default region.
    /// With `servicenet`, storage requests use the provider's internal
    /// network (the CDN management API only has a public endpoint).
    pub async fn new<Auth: AuthType + 'static>(
        auth: Auth,
        region: Option<String>,
        servicenet: bool,
    ) -> Result<CloudFiles, Error> {
        let client = AuthenticatedClient::new(Client::new(), auth).await?;
        CloudFiles::new_internal(client, region, servicenet).await
    }

    /// Create a client from `RAX_*` environment variables.
    pub async fn from_env() -> Result<CloudFiles, Error> {
        CloudFiles::from_cloud_config(config::from_env()?).await
    }

    /// Create a client from a YAML credentials file.
    ///
    /// With no path provided, reads `raxfiles/credentials.yaml` from the
    /// user configuration directory.
    pub async fn from_config<P: AsRef<Path>>(path: Option<P>) -> Result<CloudFiles, Error> {
        CloudFiles::from_cloud_config(config::from_config(path)?).await
    }

    /// Create a client from a loaded configuration.
    pub async fn from_cloud_config(config: CloudConfig) -> Result<CloudFiles, Error> {
        let auth = config.create_auth()?;
        let client = Client::new();
        auth.refresh(&client).await?;
        let client = AuthenticatedClient::new_internal(client, auth);
        CloudFiles::new_internal(client, config.region.clone(), config.servicenet.unwrap_or(false))
            .await
    }

    pub(crate) async fn new_internal(
        client: AuthenticatedClient,
        region: Option<String>,
        servicenet: bool,
    ) -> Result<CloudFiles, Error> {
        let region = match region {
            Some(region) => Some(region),
            None => client.user().await?.and_then(|user| user.default_region),
        };
        debug!(
            "Creating a Cloud Files client for region {:?} (servicenet: {})",
            region, servicenet
        );

        let mut storage_filters = EndpointFilters::new();
        if servicenet {
            storage_filters.set_interface(InterfaceType::Internal);
        }
        let mut cdn_filters = EndpointFilters::new();
        if let Some(region) = region {
            storage_filters.set_region(region.clone());
            cdn_filters.set_region(region);
        }

        let storage = Adapter::new(client.clone(), services::OBJECT_STORE, storage_filters);
        let cdn = Adapter::new(client, services::OBJECT_CDN, cdn_filters);

        let mut result = CloudFiles {
            storage,
            cdn,
            object_count: 0,
            bytes_used: 0,
            container_count: 0,
            metadata: HashMap::new(),
        };
        result.load().await?;
        Ok(result)
    }

    /// Number of objects in the account as of the last `load`.
    #[inline]
    pub fn object_count(&self) -> u64 {
        self.object_count
    }

    /// Total account size in bytes as of the last `load`.
    #[inline]
    pub fn bytes_used(&self) -> u64 {
        self.bytes_used
    }

    /// Number of containers in the account as of the last `load`.
    #[inline]
    pub fn container_count(&self) -> u64 {
        self.container_count
    }

    /// Cached account metadata.
    #[inline]
    pub fn metadata(&self) -> &HashMap<String, String> {
        &self.metadata
    }

    /// Refresh the cached account statistics and metadata.
    pub async fn load(&mut self) -> Result<(), Error> {
        let resp = self.storage.head(NO_PATH).await?.send().await?;
        let headers = resp.headers();
        self.object_count =
            protocol::header_u64(headers, "x-account-object-count").unwrap_or(0);
        self.bytes_used = protocol::header_u64(headers, "x-account-bytes-used").unwrap_or(0);
        self.container_count =
            protocol::header_u64(headers, "x-account-container-count").unwrap_or(0);
        self.metadata = protocol::meta_headers(headers, ACCOUNT_META_PREFIX);
        Ok(())
    }

    /// Get the account temporary URL key from the cached metadata.
    ///
    /// Required for signing temporary URLs.
    #[inline]
    pub fn get_temp_url_key(&self) -> Option<&str> {
        self.metadata.get(TEMP_URL_KEY).map(String::as_str)
    }

    /// Set the account temporary URL key.
    pub async fn set_temp_url_key(&mut self, key: &str) -> Result<(), Error> {
        let _ = self
            .storage
            .post(NO_PATH)
            .await?
            .header(TEMP_URL_KEY, key)
            .send()
            .await?;
        let _ = self
            .metadata
            .insert(String::from(TEMP_URL_KEY), String::from(key));
        Ok(())
    }

    /// Update account metadata.
    ///
    /// Every key must start with `x-account-meta-` or
    /// `x-remove-account-meta-`; anything else is rejected before the
    /// request is made.
    pub async fn update_metadata(&mut self, metadata: HashMap<String, String>) -> Result<(), Error> {
        protocol::validate_metadata(&metadata, ACCOUNT_META_PREFIX, ACCOUNT_META_REMOVE_PREFIX)?;
        let headers = protocol::metadata_headers(&metadata)?;
        let _ = self
            .storage
            .post(NO_PATH)
            .await?
            .headers(headers)
            .send()
            .await?;
        protocol::merge_metadata(&mut self.metadata, metadata);
        Ok(())
    }

    /// Create a container.
    ///
    /// Recreating an existing container succeeds. Returns a loaded
    /// [Container](struct.Container.html) handle.
    pub async fn create_container(&self, name: &str) -> Result<Container, Error> {
        let _ = self.storage.put([name]).await?.send().await?;
        Container::open(
            self.storage.clone(),
            self.cdn.clone(),
            String::from(name),
            true,
        )
        .await
    }

    /// List containers in the account.
    ///
    /// Returns at most `limit` entries; pass the last seen name as `marker`
    /// to page through the rest.
    pub async fn list_containers(
        &self,
        limit: Option<usize>,
        marker: Option<&str>,
    ) -> Result<Vec<ContainerEntry>, Error> {
        self.storage
            .get(NO_PATH)
            .await?
            .query(&AccountQuery {
                format: "json",
                limit,
                marker,
            })
            .send()
            .await?
            .json()
            .await
            .map_err(Error::from)
    }

    /// List CDN-enabled containers in the account.
    ///
    /// Same pagination contract as
    /// [list_containers](#method.list_containers).
    pub async fn list_cdn_containers(
        &self,
        limit: Option<usize>,
        marker: Option<&str>,
    ) -> Result<Vec<CdnContainerEntry>, Error> {
        self.cdn
            .get(NO_PATH)
            .await?
            .query(&AccountQuery {
                format: "json",
                limit,
                marker,
            })
            .send()
            .await?
            .json()
            .await
            .map_err(Error::from)
    }

    /// Look up an existing container.
    ///
    /// Fails with [NoSuchContainer](../enum.ErrorKind.html) if absent. With
    /// `cdn_enabled`, an additional CDN lookup fetches the CDN state; when
    /// the container turns out not to be CDN-enabled, the flag is silently
    /// corrected instead of failing.
    pub async fn get_container(&self, name: &str, cdn_enabled: bool) -> Result<Container, Error> {
        Container::open(
            self.storage.clone(),
            self.cdn.clone(),
            String::from(name),
            cdn_enabled,
        )
        .await
    }

    /// Delete an empty container.
    ///
    /// Fails with [NoSuchContainer](../enum.ErrorKind.html) if absent and
    /// [ContainerNotEmpty](../enum.ErrorKind.html) if it still holds
    /// objects.
    pub async fn delete_container(&self, name: &str) -> Result<(), Error> {
        let _ = self
            .storage
            .delete([name])
            .await?
            .send()
            .await
            .map_err(|e| {
                e.if_status(StatusCode::NOT_FOUND, ErrorKind::NoSuchContainer)
                    .if_status(StatusCode::CONFLICT, ErrorKind::ContainerNotEmpty)
            })?;
        Ok(())
    }
}
