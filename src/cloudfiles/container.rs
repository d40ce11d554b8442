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

//! Container resource of the Cloud Files API.

use std::collections::HashMap;
use std::iter;
use std::path::Path;

use async_stream::try_stream;
use futures::stream::Stream;
use http::header::{HeaderMap, ACCEPT, CONTENT_TYPE};
use log::{debug, warn};
use reqwest::{Body, Response, StatusCode};
use serde::Serialize;
use tokio::fs::File;
use tokio_util::codec::{BytesCodec, FramedRead};

use super::object::StorageObject;
use super::protocol::{self, ArchiveErrors, ExtractArchiveResponse, ObjectEntry};
use crate::adapter::Adapter;
use crate::services::GenericService;
use crate::{Error, ErrorKind};

pub(crate) const CONTAINER_META_PREFIX: &str = "x-container-meta-";
pub(crate) const CONTAINER_META_REMOVE_PREFIX: &str = "x-remove-container-meta-";

/// Default CDN time-to-live in seconds (72 hours).
pub const DEFAULT_CDN_TTL: u32 = 259200;

/// Filters for object listings.
#[derive(Clone, Debug, Default, Serialize)]
pub struct ListQuery {
    /// Only objects whose name starts with the prefix.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub prefix: Option<String>,
    /// Maximum number of entries to return (the server caps at 10000).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub limit: Option<usize>,
    /// Return entries after this object name.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub marker: Option<String>,
    /// Return entries up to this object name.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub end_marker: Option<String>,
    /// Group names by this path delimiter, producing pseudo-directories.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub delimiter: Option<char>,
}

impl ListQuery {
    /// Create an empty query.
    pub fn new() -> ListQuery {
        ListQuery::default()
    }

    /// Filter by object name prefix.
    #[inline]
    pub fn with_prefix<S: Into<String>>(mut self, prefix: S) -> ListQuery {
        self.prefix = Some(prefix.into());
        self
    }

    /// Limit the number of entries.
    #[inline]
    pub fn with_limit(mut self, limit: usize) -> ListQuery {
        self.limit = Some(limit);
        self
    }

    /// Return entries after this object name.
    #[inline]
    pub fn with_marker<S: Into<String>>(mut self, marker: S) -> ListQuery {
        self.marker = Some(marker.into());
        self
    }

    /// Return entries up to this object name.
    #[inline]
    pub fn with_end_marker<S: Into<String>>(mut self, end_marker: S) -> ListQuery {
        self.end_marker = Some(end_marker.into());
        self
    }

    /// Group names by a path delimiter.
    #[inline]
    pub fn with_delimiter(mut self, delimiter: char) -> ListQuery {
        self.delimiter = Some(delimiter);
        self
    }
}

/// Archive format for bulk extraction.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ArchiveKind {
    /// An uncompressed tar archive.
    Tar,
    /// A gzip-compressed tar archive.
    TarGz,
    /// A bzip2-compressed tar archive.
    TarBz,
}

impl ArchiveKind {
    fn as_param(self) -> &'static str {
        match self {
            ArchiveKind::Tar => ".tar",
            ArchiveKind::TarGz => ".tar.gz",
            ArchiveKind::TarBz => ".tar.bz",
        }
    }

    /// Determine the archive kind from a file name.
    pub fn from_path<P: AsRef<Path>>(path: P) -> Result<ArchiveKind, Error> {
        let name = path
            .as_ref()
            .file_name()
            .map(|name| name.to_string_lossy().to_lowercase())
            .unwrap_or_default();
        if name.ends_with(".tar.gz") {
            Ok(ArchiveKind::TarGz)
        } else if name.ends_with(".tar.bz") {
            Ok(ArchiveKind::TarBz)
        } else if name.ends_with(".tar") {
            Ok(ArchiveKind::Tar)
        } else {
            Err(Error::new(
                ErrorKind::InvalidConfig,
                format!("Unsupported archive type: {:?}", path.as_ref()),
            ))
        }
    }
}

/// A Cloud Files container.
///
/// Constructed through
/// [CloudFiles::create_container](struct.CloudFiles.html#method.create_container)
/// or [CloudFiles::get_container](struct.CloudFiles.html#method.get_container).
/// The cached fields reflect the server state as of the last
/// [load](#method.load) call.
#[derive(Debug, Clone)]
pub struct Container {
    storage: Adapter<GenericService>,
    cdn: Adapter<GenericService>,
    name: String,
    count: u64,
    size: u64,
    metadata: HashMap<String, String>,
    cdn_enabled: bool,
    cdn_uri: Option<String>,
    cdn_ssl_uri: Option<String>,
    cdn_streaming_uri: Option<String>,
    cdn_ttl: Option<u32>,
    cdn_log_retention: Option<bool>,
}

impl Container {
    pub(crate) fn new(
        storage: Adapter<GenericService>,
        cdn: Adapter<GenericService>,
        name: String,
        cdn_enabled: bool,
    ) -> Container {
        Container {
            storage,
            cdn,
            name,
            count: 0,
            size: 0,
            metadata: HashMap::new(),
            cdn_enabled,
            cdn_uri: None,
            cdn_ssl_uri: None,
            cdn_streaming_uri: None,
            cdn_ttl: None,
            cdn_log_retention: None,
        }
    }

    pub(crate) async fn open(
        storage: Adapter<GenericService>,
        cdn: Adapter<GenericService>,
        name: String,
        cdn_enabled: bool,
    ) -> Result<Container, Error> {
        let mut container = Container::new(storage, cdn, name, cdn_enabled);
        container.load().await?;
        Ok(container)
    }

    /// Container name.
    #[inline]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Number of objects in the container as of the last `load`.
    #[inline]
    pub fn count(&self) -> u64 {
        self.count
    }

    /// Total size of the container in bytes as of the last `load`.
    #[inline]
    pub fn size(&self) -> u64 {
        self.size
    }

    /// Cached container metadata.
    #[inline]
    pub fn metadata(&self) -> &HashMap<String, String> {
        &self.metadata
    }

    /// Whether the container is CDN-enabled.
    #[inline]
    pub fn cdn_enabled(&self) -> bool {
        self.cdn_enabled
    }

    /// Public CDN URI (absent unless CDN-enabled).
    #[inline]
    pub fn cdn_uri(&self) -> Option<&str> {
        if self.cdn_enabled {
            self.cdn_uri.as_deref()
        } else {
            None
        }
    }

    /// Public CDN SSL URI (absent unless CDN-enabled).
    #[inline]
    pub fn cdn_ssl_uri(&self) -> Option<&str> {
        if self.cdn_enabled {
            self.cdn_ssl_uri.as_deref()
        } else {
            None
        }
    }

    /// Public CDN streaming URI (absent unless CDN-enabled).
    #[inline]
    pub fn cdn_streaming_uri(&self) -> Option<&str> {
        if self.cdn_enabled {
            self.cdn_streaming_uri.as_deref()
        } else {
            None
        }
    }

    /// CDN time-to-live in seconds.
    #[inline]
    pub fn cdn_ttl(&self) -> Option<u32> {
        self.cdn_ttl
    }

    /// Whether CDN access logs are retained.
    #[inline]
    pub fn cdn_log_retention(&self) -> Option<bool> {
        self.cdn_log_retention
    }

    fn object_path<'a>(&'a self, name: &'a str) -> impl Iterator<Item = &'a str> {
        iter::once(self.name.as_str()).chain(name.split('/'))
    }

    async fn probe_cdn(&self) -> Result<Response, Error> {
        self.cdn.head([&self.name]).await?.send().await
    }

    fn update_cdn_state(&mut self, headers: &HeaderMap) {
        if let Some(enabled) = protocol::header_str(headers, "x-cdn-enabled") {
            self.cdn_enabled = enabled.eq_ignore_ascii_case("true");
        }
        if let Some(uri) = protocol::header_str(headers, "x-cdn-uri") {
            self.cdn_uri = Some(uri.to_string());
        }
        if let Some(uri) = protocol::header_str(headers, "x-cdn-ssl-uri") {
            self.cdn_ssl_uri = Some(uri.to_string());
        }
        if let Some(uri) = protocol::header_str(headers, "x-cdn-streaming-uri") {
            self.cdn_streaming_uri = Some(uri.to_string());
        }
        if let Some(ttl) = protocol::header_u64(headers, "x-ttl") {
            self.cdn_ttl = Some(ttl as u32);
        }
        if let Some(retention) = protocol::header_str(headers, "x-log-retention") {
            self.cdn_log_retention = Some(retention.eq_ignore_ascii_case("true"));
        }
    }

    /// Refresh the cached container data and metadata.
    ///
    /// Issues a HEAD request against the storage endpoint and, while
    /// `cdn_enabled` is set, a second HEAD against the CDN endpoint. Any
    /// failure of the CDN probe marks the container as not CDN-enabled
    /// instead of propagating: a CDN HEAD on a container that was never
    /// CDN-enabled returns 404.
    pub async fn load(&mut self) -> Result<(), Error> {
        let resp = self
            .storage
            .head([&self.name])
            .await?
            .send()
            .await
            .map_err(|e| e.if_status(StatusCode::NOT_FOUND, ErrorKind::NoSuchContainer))?;
        let headers = resp.headers();
        self.count = protocol::header_u64(headers, "x-container-object-count").unwrap_or(0);
        self.size = protocol::header_u64(headers, "x-container-bytes-used").unwrap_or(0);
        self.metadata = protocol::meta_headers(headers, CONTAINER_META_PREFIX);

        if self.cdn_enabled {
            match self.probe_cdn().await {
                Ok(resp) => {
                    let headers = resp.headers().clone();
                    self.update_cdn_state(&headers);
                }
                Err(err) => {
                    warn!(
                        "CDN probe for container {} failed, assuming not CDN-enabled: {}",
                        self.name, err
                    );
                    self.cdn_enabled = false;
                }
            }
        }
        Ok(())
    }

    /// List object names in the container.
    ///
    /// Returns at most `limit` names (the server caps one response at
    /// 10000). With a delimiter, pseudo-directories are returned as names
    /// suffixed with the delimiter.
    pub async fn list(&self, query: &ListQuery) -> Result<Vec<String>, Error> {
        let resp = self
            .storage
            .get([&self.name])
            .await?
            .query(query)
            .send()
            .await
            .map_err(|e| e.if_status(StatusCode::NOT_FOUND, ErrorKind::NoSuchContainer))?;
        let text = resp.text().await.map_err(Error::from)?;
        Ok(text.lines().map(str::to_string).collect())
    }

    /// List objects in the container with their details.
    pub async fn list_objects(&self, query: &ListQuery) -> Result<Vec<ObjectEntry>, Error> {
        self.storage
            .get([&self.name])
            .await?
            .query(&[("format", "json")])
            .query(query)
            .send()
            .await
            .map_err(|e| e.if_status(StatusCode::NOT_FOUND, ErrorKind::NoSuchContainer))?
            .json()
            .await
            .map_err(Error::from)
    }

    /// List all objects in the container, paginating transparently.
    ///
    /// The returned stream issues one `list_objects` call per `batch_size`
    /// entries, advancing the marker to the last seen name, and stops when a
    /// batch comes back short. The stream cannot be restarted; create a new
    /// one to list from the beginning again.
    pub fn list_all_objects(
        &self,
        prefix: Option<String>,
        delimiter: Option<char>,
        batch_size: usize,
    ) -> impl Stream<Item = Result<ObjectEntry, Error>> + '_ {
        try_stream! {
            let mut marker: Option<String> = None;
            loop {
                let query = ListQuery {
                    prefix: prefix.clone(),
                    limit: Some(batch_size),
                    marker: marker.take(),
                    end_marker: None,
                    delimiter,
                };
                let batch = self.list_objects(&query).await?;
                let full = batch.len() >= batch_size;
                if let Some(last) = batch.last() {
                    marker = Some(last.name.clone());
                }
                for entry in batch {
                    yield entry;
                }
                if !full {
                    break;
                }
            }
        }
    }

    /// Create a local handle for a new storage object.
    ///
    /// No request is made; the object is not created on the server until
    /// [StorageObject::write](struct.StorageObject.html#method.write)
    /// succeeds.
    pub fn create_object<S: Into<String>>(&self, name: S) -> StorageObject {
        StorageObject::new(
            self.storage.clone(),
            self.cdn.clone(),
            self.name.clone(),
            name.into(),
        )
    }

    /// Look up an existing storage object.
    ///
    /// Fails with [NoSuchObject](../enum.ErrorKind.html) if the object does
    /// not exist.
    pub async fn get_object<S: Into<String>>(&self, name: S) -> Result<StorageObject, Error> {
        StorageObject::open(
            self.storage.clone(),
            self.cdn.clone(),
            self.name.clone(),
            name.into(),
        )
        .await
    }

    /// Delete a single storage object.
    pub async fn delete_object(&self, name: &str) -> Result<(), Error> {
        let _ = self
            .storage
            .delete(self.object_path(name))
            .await?
            .send()
            .await
            .map_err(|e| e.if_status(StatusCode::NOT_FOUND, ErrorKind::NoSuchObject))?;
        Ok(())
    }

    /// Delete multiple storage objects with one bulk request.
    ///
    /// No per-name success or failure is reported.
    pub async fn delete_objects<I>(&self, names: I) -> Result<(), Error>
    where
        I: IntoIterator,
        I::Item: AsRef<str>,
    {
        let body = names
            .into_iter()
            .map(|name| format!("{}/{}", self.name, name.as_ref()))
            .collect::<Vec<_>>()
            .join("\n");
        let _ = self
            .storage
            .delete([&self.name])
            .await?
            .query(&[("bulk-delete", "true")])
            .header(CONTENT_TYPE, "text/plain")
            .body(body)
            .send()
            .await?;
        Ok(())
    }

    /// Delete all objects in the container.
    ///
    /// Lists and bulk-deletes up to `batch_size` objects per iteration until
    /// a short batch is observed.
    pub async fn delete_all_objects(&self, batch_size: usize) -> Result<(), Error> {
        loop {
            let names = self.list(&ListQuery::new().with_limit(batch_size)).await?;
            if !names.is_empty() {
                self.delete_objects(&names).await?;
            }
            if names.len() < batch_size {
                break;
            }
        }
        Ok(())
    }

    /// Delete the (empty) container.
    ///
    /// Fails with [ContainerNotEmpty](../enum.ErrorKind.html) if the
    /// container still holds objects.
    pub async fn delete(&self) -> Result<(), Error> {
        let _ = self
            .storage
            .delete([&self.name])
            .await?
            .send()
            .await
            .map_err(|e| {
                e.if_status(StatusCode::NOT_FOUND, ErrorKind::NoSuchContainer)
                    .if_status(StatusCode::CONFLICT, ErrorKind::ContainerNotEmpty)
            })?;
        Ok(())
    }

    /// Extract a local tar archive into the container.
    ///
    /// The archive kind is determined from the file name unless provided.
    /// The server creates one object per archive member; an HTTP-level
    /// success with per-file errors fails with
    /// [ExtractArchiveFailed](../enum.ErrorKind.html) carrying the failures.
    pub async fn extract_archive<P: AsRef<Path>>(
        &self,
        archive: P,
        kind: Option<ArchiveKind>,
    ) -> Result<ExtractArchiveResponse, Error> {
        let kind = match kind {
            Some(kind) => kind,
            None => ArchiveKind::from_path(archive.as_ref())?,
        };
        let file = File::open(archive.as_ref()).await.map_err(|e| {
            Error::new(
                ErrorKind::Io,
                format!("Cannot open archive {:?}: {}", archive.as_ref(), e),
            )
        })?;
        debug!(
            "Extracting archive {:?} into container {}",
            archive.as_ref(),
            self.name
        );

        let body = Body::wrap_stream(FramedRead::new(file, BytesCodec::new()));
        let resp = self
            .storage
            .put([&self.name])
            .await?
            .query(&[("extract-archive", kind.as_param())])
            .header(ACCEPT, "application/json")
            .body(body)
            .send()
            .await?;
        let result: ExtractArchiveResponse = resp.json().await.map_err(Error::from)?;

        if !result.errors.is_empty() {
            return Err(Error::new(
                ErrorKind::ExtractArchiveFailed,
                format!(
                    "Archive extraction failed for {} file(s)",
                    result.errors.len()
                ),
            )
            .with_source(ArchiveErrors {
                errors: result.errors,
            }));
        }
        Ok(result)
    }

    /// Update container metadata.
    ///
    /// Every key must start with `x-container-meta-` or
    /// `x-remove-container-meta-`; anything else is rejected before the
    /// request is made. On success remove-prefixed keys are dropped from the
    /// cached metadata and the rest are upserted.
    pub async fn update_metadata(
        &mut self,
        metadata: HashMap<String, String>,
    ) -> Result<(), Error> {
        protocol::validate_metadata(
            &metadata,
            CONTAINER_META_PREFIX,
            CONTAINER_META_REMOVE_PREFIX,
        )?;
        let headers = protocol::metadata_headers(&metadata)?;
        let _ = self
            .storage
            .post([&self.name])
            .await?
            .headers(headers)
            .send()
            .await
            .map_err(|e| e.if_status(StatusCode::NOT_FOUND, ErrorKind::NoSuchContainer))?;
        protocol::merge_metadata(&mut self.metadata, metadata);
        Ok(())
    }

    /// Enable object versioning, storing previous versions in the backup
    /// container.
    pub async fn enable_object_versioning(&self, backup_container: &str) -> Result<(), Error> {
        let _ = self
            .storage
            .post([&self.name])
            .await?
            .header("x-versions-location", backup_container)
            .send()
            .await?;
        Ok(())
    }

    /// Disable object versioning.
    pub async fn disable_object_versioning(&self) -> Result<(), Error> {
        let _ = self
            .storage
            .post([&self.name])
            .await?
            .header("x-versions-location", "")
            .send()
            .await?;
        Ok(())
    }

    /// Enable CDN access log retention.
    pub async fn enable_log_retention(&mut self) -> Result<(), Error> {
        let _ = self
            .cdn
            .post([&self.name])
            .await?
            .header("x-log-retention", "True")
            .send()
            .await?;
        self.cdn_log_retention = Some(true);
        Ok(())
    }

    /// Disable CDN access log retention.
    pub async fn disable_log_retention(&mut self) -> Result<(), Error> {
        let _ = self
            .cdn
            .post([&self.name])
            .await?
            .header("x-log-retention", "False")
            .send()
            .await?;
        self.cdn_log_retention = Some(false);
        Ok(())
    }

    /// Enable a storage quota on the container.
    pub async fn enable_quota(
        &mut self,
        max_bytes: Option<u64>,
        max_object_count: Option<u64>,
    ) -> Result<(), Error> {
        let mut metadata = HashMap::new();
        if let Some(max_bytes) = max_bytes {
            let _ = metadata.insert(
                String::from("x-container-meta-quota-bytes"),
                max_bytes.to_string(),
            );
        }
        if let Some(max_object_count) = max_object_count {
            let _ = metadata.insert(
                String::from("x-container-meta-quota-count"),
                max_object_count.to_string(),
            );
        }
        if metadata.is_empty() {
            return Ok(());
        }

        let headers = protocol::metadata_headers(&metadata)?;
        let _ = self
            .storage
            .put([&self.name])
            .await?
            .headers(headers)
            .send()
            .await?;
        protocol::merge_metadata(&mut self.metadata, metadata);
        Ok(())
    }

    /// Remove the storage quota from the container.
    pub async fn disable_quota(&mut self) -> Result<(), Error> {
        let metadata: HashMap<String, String> = [
            ("x-remove-container-meta-quota-bytes", "True"),
            ("x-remove-container-meta-quota-count", "True"),
        ]
        .into_iter()
        .map(|(key, value)| (key.to_string(), value.to_string()))
        .collect();
        let headers = protocol::metadata_headers(&metadata)?;
        let _ = self
            .storage
            .put([&self.name])
            .await?
            .headers(headers)
            .send()
            .await?;
        protocol::merge_metadata(&mut self.metadata, metadata);
        Ok(())
    }

    /// Enable CDN access to the container.
    ///
    /// Reads the CDN URIs and the effective TTL back from the response.
    /// Changing the TTL later does not remove already cached content.
    pub async fn enable_cdn(&mut self, ttl: Option<u32>) -> Result<(), Error> {
        let ttl = ttl.unwrap_or(DEFAULT_CDN_TTL);
        let resp = self
            .cdn
            .put([&self.name])
            .await?
            .header("x-ttl", ttl.to_string())
            .header("x-cdn-enabled", "True")
            .send()
            .await?;

        self.cdn_enabled = true;
        self.cdn_ttl = Some(ttl);
        let headers = resp.headers().clone();
        self.update_cdn_state(&headers);
        self.cdn_enabled = true;
        Ok(())
    }

    /// Disable CDN access to the container.
    ///
    /// Data already on the CDN remains accessible until purged or expired.
    pub async fn disable_cdn(&mut self) -> Result<(), Error> {
        let _ = self
            .cdn
            .put([&self.name])
            .await?
            .header("x-cdn-enabled", "False")
            .send()
            .await?;
        self.cdn_enabled = false;
        Ok(())
    }

    /// Purge all objects of this container from the CDN.
    ///
    /// An extremely expensive operation; the optional email address is
    /// notified on completion.
    pub async fn purge_from_cdn(&self, email: Option<&str>) -> Result<(), Error> {
        let request = self.cdn.delete([&self.name]).await?;
        let request = match email {
            Some(email) => request.header("x-purge-email", email),
            None => request,
        };
        let _ = request.send().await?;
        Ok(())
    }

    /// Enable cross-origin resource sharing.
    pub async fn enable_cors(
        &mut self,
        allow_origin: &str,
        max_age: Option<u64>,
        allow_headers: Option<&str>,
    ) -> Result<(), Error> {
        let mut metadata = HashMap::new();
        let _ = metadata.insert(
            String::from("x-container-meta-access-control-allow-origin"),
            allow_origin.to_string(),
        );
        if let Some(max_age) = max_age {
            let _ = metadata.insert(
                String::from("x-container-meta-access-control-max-age"),
                max_age.to_string(),
            );
        }
        if let Some(allow_headers) = allow_headers {
            let _ = metadata.insert(
                String::from("x-container-meta-access-control-allow-headers"),
                allow_headers.to_string(),
            );
        }

        let headers = protocol::metadata_headers(&metadata)?;
        let _ = self
            .storage
            .post([&self.name])
            .await?
            .headers(headers)
            .send()
            .await?;
        protocol::merge_metadata(&mut self.metadata, metadata);
        Ok(())
    }

    /// Disable cross-origin resource sharing.
    pub async fn disable_cors(&mut self) -> Result<(), Error> {
        let metadata: HashMap<String, String> = [
            ("x-remove-container-meta-access-control-allow-origin", "True"),
            ("x-remove-container-meta-access-control-max-age", "True"),
            (
                "x-remove-container-meta-access-control-allow-headers",
                "True",
            ),
        ]
        .into_iter()
        .map(|(key, value)| (key.to_string(), value.to_string()))
        .collect();
        let headers = protocol::metadata_headers(&metadata)?;
        let _ = self
            .storage
            .post([&self.name])
            .await?
            .headers(headers)
            .send()
            .await?;
        protocol::merge_metadata(&mut self.metadata, metadata);
        Ok(())
    }

    /// Enable static web site serving from the container.
    pub async fn enable_static_web(
        &mut self,
        index: &str,
        error: Option<&str>,
    ) -> Result<(), Error> {
        let mut metadata = HashMap::new();
        let _ = metadata.insert(
            String::from("x-container-meta-web-index"),
            index.to_string(),
        );
        if let Some(error) = error {
            let _ = metadata.insert(
                String::from("x-container-meta-web-error"),
                error.to_string(),
            );
        }

        let headers = protocol::metadata_headers(&metadata)?;
        let _ = self
            .storage
            .post([&self.name])
            .await?
            .headers(headers)
            .send()
            .await?;
        protocol::merge_metadata(&mut self.metadata, metadata);
        Ok(())
    }

    /// Disable static web site serving.
    pub async fn disable_static_web(&mut self) -> Result<(), Error> {
        let metadata: HashMap<String, String> = [
            ("x-remove-container-meta-web-index", "True"),
            ("x-remove-container-meta-web-error", "True"),
        ]
        .into_iter()
        .map(|(key, value)| (key.to_string(), value.to_string()))
        .collect();
        let headers = protocol::metadata_headers(&metadata)?;
        let _ = self
            .storage
            .post([&self.name])
            .await?
            .headers(headers)
            .send()
            .await?;
        protocol::merge_metadata(&mut self.metadata, metadata);
        Ok(())
    }
}

#[cfg(test)]
mod test {
    use futures::pin_mut;
    use futures::stream::TryStreamExt;
    use maplit::hashmap;

    use super::{ArchiveKind, Container, ListQuery};
    use crate::adapter::Adapter;
    use crate::client::AuthenticatedClient;
    use crate::services;
    use crate::testing::{CannedResponse, TestServer};
    use crate::{EndpointFilters, ErrorKind};

    async fn test_container(server: &TestServer) -> Container {
        let client = AuthenticatedClient::new_noauth(&server.url).await;
        let storage = Adapter::new(
            client.clone(),
            services::OBJECT_STORE,
            EndpointFilters::new(),
        );
        let cdn = Adapter::new(client, services::OBJECT_CDN, EndpointFilters::new());
        Container::new(storage, cdn, String::from("cont"), false)
    }

    #[test]
    fn test_archive_kind_from_path() {
        assert_eq!(
            ArchiveKind::from_path("backup.tar").unwrap(),
            ArchiveKind::Tar
        );
        assert_eq!(
            ArchiveKind::from_path("/tmp/Backup.TAR.GZ").unwrap(),
            ArchiveKind::TarGz
        );
        assert_eq!(
            ArchiveKind::from_path("backup.tar.bz").unwrap(),
            ArchiveKind::TarBz
        );
        let err = ArchiveKind::from_path("backup.zip").err().unwrap();
        assert_eq!(err.kind(), ErrorKind::InvalidConfig);
    }

    #[tokio::test]
    async fn test_load_parses_headers() {
        let server = TestServer::start(vec![CannedResponse::new(204)
            .with_header("x-container-object-count", "42")
            .with_header("x-container-bytes-used", "123456")
            .with_header("x-container-meta-colour", "orange")])
        .await;
        let mut container = test_container(&server).await;
        container.load().await.unwrap();
        assert_eq!(container.count(), 42);
        assert_eq!(container.size(), 123456);
        assert_eq!(
            container.metadata().get("x-container-meta-colour").unwrap(),
            "orange"
        );
    }

    #[tokio::test]
    async fn test_load_missing_container() {
        let server = TestServer::start(vec![CannedResponse::new(404)]).await;
        let mut container = test_container(&server).await;
        let err = container.load().await.err().unwrap();
        assert_eq!(err.kind(), ErrorKind::NoSuchContainer);
    }

    #[tokio::test]
    async fn test_cdn_probe_failure_disables_cdn() {
        let server = TestServer::start(vec![
            CannedResponse::new(204).with_header("x-container-object-count", "0"),
            CannedResponse::new(404),
        ])
        .await;
        let client = AuthenticatedClient::new_noauth(&server.url).await;
        let storage = Adapter::new(
            client.clone(),
            services::OBJECT_STORE,
            EndpointFilters::new(),
        );
        let cdn = Adapter::new(client, services::OBJECT_CDN, EndpointFilters::new());
        let mut container = Container::new(storage, cdn, String::from("cont"), true);
        container.load().await.unwrap();
        assert!(!container.cdn_enabled());
        assert_eq!(server.request_count(), 2);
    }

    #[tokio::test]
    async fn test_list_plain() {
        let server =
            TestServer::start(vec![CannedResponse::new(200).with_body("a.txt\ntmp/b.txt\n")])
                .await;
        let container = test_container(&server).await;
        let names = container.list(&ListQuery::new()).await.unwrap();
        assert_eq!(names, vec!["a.txt", "tmp/b.txt"]);
    }

    #[tokio::test]
    async fn test_list_all_objects_pagination() {
        let server = TestServer::start(vec![
            CannedResponse::json(r#"[{"name": "a"}, {"name": "b"}]"#),
            CannedResponse::json(r#"[{"name": "c"}, {"name": "d"}]"#),
            CannedResponse::json(r#"[{"name": "e"}]"#),
        ])
        .await;
        let container = test_container(&server).await;

        let stream = container.list_all_objects(None, None, 2);
        pin_mut!(stream);
        let mut names = Vec::new();
        while let Some(entry) = stream.try_next().await.unwrap() {
            names.push(entry.name);
        }

        assert_eq!(names, vec!["a", "b", "c", "d", "e"]);
        assert_eq!(server.request_count(), 3);
        let requests = server.requests();
        assert!(requests[0].query.contains("limit=2"));
        assert!(!requests[0].query.contains("marker"));
        assert!(requests[1].query.contains("marker=b"));
        assert!(requests[2].query.contains("marker=d"));
    }

    #[tokio::test]
    async fn test_delete_all_objects_batches() {
        let server = TestServer::start(vec![
            CannedResponse::new(200).with_body("a\nb"),
            CannedResponse::new(200),
            CannedResponse::new(200).with_body("c"),
            CannedResponse::new(200),
        ])
        .await;
        let container = test_container(&server).await;
        container.delete_all_objects(2).await.unwrap();

        let requests = server.requests();
        assert_eq!(requests.len(), 4);
        assert_eq!(requests[1].method, "DELETE");
        assert!(requests[1].query.contains("bulk-delete"));
        assert_eq!(requests[1].body_str(), "cont/a\ncont/b");
        assert_eq!(requests[3].body_str(), "cont/c");
    }

    #[tokio::test]
    async fn test_update_metadata_merges_cache() {
        let server = TestServer::start(vec![
            CannedResponse::new(204),
            CannedResponse::new(204),
        ])
        .await;
        let mut container = test_container(&server).await;

        container
            .update_metadata(hashmap! {
                String::from("x-container-meta-foo") => String::from("one"),
                String::from("x-container-meta-bar") => String::from("baz"),
            })
            .await
            .unwrap();
        assert_eq!(
            container.metadata().get("x-container-meta-foo").unwrap(),
            "one"
        );

        container
            .update_metadata(hashmap! {
                String::from("x-remove-container-meta-foo") => String::from("True"),
            })
            .await
            .unwrap();
        assert!(!container.metadata().contains_key("x-container-meta-foo"));
        assert_eq!(
            container.metadata().get("x-container-meta-bar").unwrap(),
            "baz"
        );
    }

    #[tokio::test]
    async fn test_update_metadata_rejects_bad_key() {
        let server = TestServer::start(vec![]).await;
        let mut container = test_container(&server).await;
        let err = container
            .update_metadata(hashmap! {
                String::from("bogus-key") => String::from("x"),
            })
            .await
            .err()
            .unwrap();
        assert_eq!(err.kind(), ErrorKind::InvalidConfig);
        assert_eq!(server.request_count(), 0);
    }

    #[tokio::test]
    async fn test_delete_conflict() {
        let server = TestServer::start(vec![CannedResponse::new(409)]).await;
        let container = test_container(&server).await;
        let err = container.delete().await.err().unwrap();
        assert_eq!(err.kind(), ErrorKind::ContainerNotEmpty);
    }

    #[tokio::test]
    async fn test_delete_missing() {
        let server = TestServer::start(vec![CannedResponse::new(404)]).await;
        let container = test_container(&server).await;
        let err = container.delete().await.err().unwrap();
        assert_eq!(err.kind(), ErrorKind::NoSuchContainer);
    }

    #[tokio::test]
    async fn test_enable_cdn_reads_back_uris() {
        let server = TestServer::start(vec![CannedResponse::new(201)
            .with_header("x-cdn-uri", "http://cdn.example.com")
            .with_header("x-cdn-ssl-uri", "https://ssl.example.com")
            .with_header("x-cdn-streaming-uri", "http://stream.example.com")
            .with_header("x-ttl", "3600")])
        .await;
        let mut container = test_container(&server).await;
        container.enable_cdn(Some(3600)).await.unwrap();
        assert!(container.cdn_enabled());
        assert_eq!(container.cdn_uri(), Some("http://cdn.example.com"));
        assert_eq!(container.cdn_ssl_uri(), Some("https://ssl.example.com"));
        assert_eq!(container.cdn_ttl(), Some(3600));

        let requests = server.requests();
        assert_eq!(requests[0].header("x-cdn-enabled"), Some("True"));
        assert_eq!(requests[0].header("x-ttl"), Some("3600"));
    }

    #[tokio::test]
    async fn test_disable_cdn_hides_uris() {
        let server = TestServer::start(vec![
            CannedResponse::new(201).with_header("x-cdn-uri", "http://cdn.example.com"),
            CannedResponse::new(202),
        ])
        .await;
        let mut container = test_container(&server).await;
        container.enable_cdn(None).await.unwrap();
        assert_eq!(container.cdn_uri(), Some("http://cdn.example.com"));

        container.disable_cdn().await.unwrap();
        assert!(!container.cdn_enabled());
        assert_eq!(container.cdn_uri(), None);
    }

    #[tokio::test]
    async fn test_extract_archive_reports_errors() {
        use std::io::Write;

        let mut file = tempfile::Builder::new()
            .suffix(".tar")
            .tempfile()
            .unwrap();
        file.write_all(b"not really a tarball").unwrap();

        let server = TestServer::start(vec![CannedResponse::json(
            r#"{
                "Number Files Created": 1,
                "Response Status": "400 Bad Request",
                "Response Body": "",
                "Errors": [["cont/a.txt", "412 Precondition Failed"]]
            }"#,
        )])
        .await;
        let container = test_container(&server).await;
        let err = container
            .extract_archive(file.path(), None)
            .await
            .err()
            .unwrap();
        assert_eq!(err.kind(), ErrorKind::ExtractArchiveFailed);

        let requests = server.requests();
        assert!(requests[0].query.contains("extract-archive=.tar"));
        assert_eq!(requests[0].body_str(), "not really a tarball");
    }

    #[tokio::test]
    async fn test_extract_archive_success() {
        use std::io::Write;

        let mut file = tempfile::Builder::new()
            .suffix(".tar.gz")
            .tempfile()
            .unwrap();
        file.write_all(b"gzipped bytes").unwrap();

        let server = TestServer::start(vec![CannedResponse::json(
            r#"{
                "Number Files Created": 3,
                "Response Status": "201 Created",
                "Response Body": "",
                "Errors": []
            }"#,
        )])
        .await;
        let container = test_container(&server).await;
        let result = container
            .extract_archive(file.path(), None)
            .await
            .unwrap();
        assert_eq!(result.files_created, 3);

        let requests = server.requests();
        assert!(requests[0].query.contains("extract-archive=.tar.gz"));
    }
}
