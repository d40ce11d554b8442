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

//! Storage object resource of the Cloud Files API.

use std::collections::HashMap;
use std::error::Error as BaseError;
use std::iter;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};

use async_stream::try_stream;
use bytes::Bytes;
use chrono::Utc;
use futures::stream::{Stream, StreamExt};
use http::header::{CONTENT_LENGTH, CONTENT_TYPE, RANGE};
use log::debug;
use reqwest::{Body, Method, Response, StatusCode, Url};
use tokio::io::{AsyncWrite, AsyncWriteExt};

use super::protocol;
use super::tempurl;
use crate::adapter::Adapter;
use crate::client::RequestBuilder;
use crate::services::GenericService;
use crate::{Error, ErrorKind};

pub(crate) const OBJECT_META_PREFIX: &str = "x-object-meta-";
pub(crate) const OBJECT_META_REMOVE_PREFIX: &str = "x-remove-object-meta-";

const DEFAULT_CONTENT_TYPE: &str = "application/octet-stream";

/// Build a `Range` header value from a size and an offset.
///
/// Three shapes are possible: a fixed-length range starting at the offset, an
/// open-ended range from a positive offset, and a suffix range for a
/// negative offset.
fn range_header(size: Option<u64>, offset: i64) -> Option<String> {
    if let Some(size) = size {
        Some(format!("bytes={}-{}", offset, offset + size as i64 - 1))
    } else if offset > 0 {
        Some(format!("bytes={}-", offset))
    } else if offset < 0 {
        Some(format!("bytes={}", offset))
    } else {
        None
    }
}

/// Running digest and byte counter for a streamed upload.
struct UploadState {
    hash: Mutex<md5::Context>,
    bytes: AtomicU64,
}

impl UploadState {
    fn new() -> UploadState {
        UploadState {
            hash: Mutex::new(md5::Context::new()),
            bytes: AtomicU64::new(0),
        }
    }

    fn observe(&self, chunk: &Bytes, verify: bool) {
        let _ = self.bytes.fetch_add(chunk.len() as u64, Ordering::Relaxed);
        if verify {
            self.hash
                .lock()
                .unwrap_or_else(|e| e.into_inner())
                .consume(chunk);
        }
    }

    fn digest(&self) -> String {
        let context = self.hash.lock().unwrap_or_else(|e| e.into_inner()).clone();
        format!("{:x}", context.compute())
    }

    fn bytes(&self) -> u64 {
        self.bytes.load(Ordering::Relaxed)
    }
}

/// A Cloud Files storage object.
///
/// Constructed through
/// [Container::create_object](struct.Container.html#method.create_object)
/// (a local handle with no remote existence until [write](#method.write)
/// succeeds) or [Container::get_object](struct.Container.html#method.get_object)
/// (loaded from the server).
#[derive(Debug, Clone)]
pub struct StorageObject {
    storage: Adapter<GenericService>,
    cdn: Adapter<GenericService>,
    container: String,
    name: String,
    content_type: String,
    content_length: u64,
    etag: Option<String>,
    last_modified: Option<String>,
    metadata: HashMap<String, String>,
    delete_at: Option<i64>,
    manifest: Option<String>,
}

impl StorageObject {
    pub(crate) fn new(
        storage: Adapter<GenericService>,
        cdn: Adapter<GenericService>,
        container: String,
        name: String,
    ) -> StorageObject {
        let content_type = mime_guess::from_path(&name)
            .first_raw()
            .unwrap_or(DEFAULT_CONTENT_TYPE)
            .to_string();
        StorageObject {
            storage,
            cdn,
            container,
            name,
            content_type,
            content_length: 0,
            etag: None,
            last_modified: None,
            metadata: HashMap::new(),
            delete_at: None,
            manifest: None,
        }
    }

    pub(crate) async fn open(
        storage: Adapter<GenericService>,
        cdn: Adapter<GenericService>,
        container: String,
        name: String,
    ) -> Result<StorageObject, Error> {
        let mut object = StorageObject::new(storage, cdn, container, name);
        object.load().await?;
        Ok(object)
    }

    /// Object name.
    #[inline]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Name of the owning container.
    #[inline]
    pub fn container(&self) -> &str {
        &self.container
    }

    /// Content type of the object.
    #[inline]
    pub fn content_type(&self) -> &str {
        &self.content_type
    }

    /// Size of the object in bytes as of the last `load` or `write`.
    #[inline]
    pub fn content_length(&self) -> u64 {
        self.content_length
    }

    /// Content hash (hex MD5) as of the last `load` or verified `write`.
    #[inline]
    pub fn etag(&self) -> Option<&str> {
        self.etag.as_deref()
    }

    /// Last modification timestamp as reported by the server.
    #[inline]
    pub fn last_modified(&self) -> Option<&str> {
        self.last_modified.as_deref()
    }

    /// Cached object metadata.
    #[inline]
    pub fn metadata(&self) -> &HashMap<String, String> {
        &self.metadata
    }

    /// Timestamp of a pending scheduled delete (if any).
    #[inline]
    pub fn delete_at_timestamp(&self) -> Option<i64> {
        self.delete_at
    }

    /// Large-object manifest (if the object is a manifest).
    #[inline]
    pub fn manifest(&self) -> Option<&str> {
        self.manifest.as_deref()
    }

    /// Override the content type sent on the next `write`.
    #[inline]
    pub fn set_content_type<S: Into<String>>(&mut self, content_type: S) {
        self.content_type = content_type.into();
    }

    /// Replace the local metadata sent on the next `write`.
    ///
    /// Every key must start with `x-object-meta-`; anything else is
    /// rejected.
    pub fn set_metadata(&mut self, metadata: HashMap<String, String>) -> Result<(), Error> {
        protocol::validate_metadata(&metadata, OBJECT_META_PREFIX, OBJECT_META_REMOVE_PREFIX)?;
        self.metadata = metadata
            .into_iter()
            .map(|(key, value)| (key.to_lowercase(), value))
            .collect();
        Ok(())
    }

    fn path(&self) -> impl Iterator<Item = &str> {
        iter::once(self.container.as_str()).chain(self.name.split('/'))
    }

    /// Refresh the cached object data and metadata.
    ///
    /// Fails with [NoSuchObject](../enum.ErrorKind.html) if the object does
    /// not exist.
    pub async fn load(&mut self) -> Result<(), Error> {
        let resp = self
            .storage
            .head(self.path())
            .await?
            .send()
            .await
            .map_err(|e| e.if_status(StatusCode::NOT_FOUND, ErrorKind::NoSuchObject))?;
        let headers = resp.headers();
        if let Some(content_type) = protocol::header_str(headers, "content-type") {
            self.content_type = content_type.to_string();
        }
        self.content_length = protocol::header_u64(headers, "content-length").unwrap_or(0);
        self.etag = protocol::header_str(headers, "etag").map(str::to_string);
        self.last_modified = protocol::header_str(headers, "last-modified").map(str::to_string);
        self.delete_at = protocol::header_str(headers, "x-delete-at").and_then(|v| v.parse().ok());
        self.manifest = protocol::header_str(headers, "x-object-manifest").map(str::to_string);
        self.metadata = protocol::meta_headers(headers, OBJECT_META_PREFIX);
        Ok(())
    }

    async fn start_read(&self, size: Option<u64>, offset: i64) -> Result<Response, Error> {
        let request = self.storage.get(self.path()).await?;
        let request = match range_header(size, offset) {
            Some(range) => request.header(RANGE, range),
            None => request,
        };
        request
            .send()
            .await
            .map_err(|e| e.if_status(StatusCode::NOT_FOUND, ErrorKind::NoSuchObject))
    }

    /// Read object data into memory.
    ///
    /// With `size` set, reads that many bytes starting at `offset`; with a
    /// positive `offset` alone, reads from the offset to the end; a negative
    /// `offset` reads that many trailing bytes.
    pub async fn read(&self, size: Option<u64>, offset: i64) -> Result<Bytes, Error> {
        let resp = self.start_read(size, offset).await?;
        resp.bytes().await.map_err(Error::from)
    }

    /// Read object data into an asynchronous writer.
    ///
    /// Data is written in chunks of at most `chunk_size` bytes. Returns the
    /// number of bytes read.
    pub async fn read_into<W>(
        &self,
        output: &mut W,
        size: Option<u64>,
        offset: i64,
        chunk_size: usize,
    ) -> Result<u64, Error>
    where
        W: AsyncWrite + Unpin + ?Sized,
    {
        let chunk_size = chunk_size.max(1);
        let mut resp = self.start_read(size, offset).await?;
        let mut written = 0u64;
        while let Some(chunk) = resp.chunk().await.map_err(Error::from)? {
            for part in chunk.chunks(chunk_size) {
                output.write_all(part).await.map_err(|e| {
                    Error::new(ErrorKind::Io, format!("Cannot write output: {}", e))
                })?;
            }
            written += chunk.len() as u64;
        }
        output
            .flush()
            .await
            .map_err(|e| Error::new(ErrorKind::Io, format!("Cannot flush output: {}", e)))?;
        Ok(written)
    }

    /// Stream object data in chunks of at most `chunk_size` bytes.
    ///
    /// A single GET request backs the whole stream: it is not complete (and
    /// the underlying connection is held) until the stream is fully consumed
    /// or dropped. The stream cannot be restarted.
    pub fn chunks(
        &self,
        chunk_size: usize,
        size: Option<u64>,
        offset: i64,
    ) -> impl Stream<Item = Result<Bytes, Error>> + '_ {
        let chunk_size = chunk_size.max(1);
        try_stream! {
            let mut resp = self.start_read(size, offset).await?;
            while let Some(mut chunk) = resp.chunk().await.map_err(Error::from)? {
                while chunk.len() > chunk_size {
                    yield chunk.split_to(chunk_size);
                }
                if !chunk.is_empty() {
                    yield chunk;
                }
            }
        }
    }

    async fn start_write(&self, data_size: Option<u64>) -> Result<RequestBuilder, Error> {
        let mut request = self
            .storage
            .put(self.path())
            .await?
            .header(CONTENT_TYPE, self.content_type.as_str())
            .headers(protocol::metadata_headers(&self.metadata)?);
        if let Some(timestamp) = self.delete_at {
            request = request.header("x-delete-at", timestamp.to_string());
        }
        if let Some(size) = data_size {
            request = request.header(CONTENT_LENGTH, size.to_string());
        }
        Ok(request)
    }

    fn finish_write(
        &mut self,
        resp: &Response,
        digest: Option<String>,
        size: u64,
    ) -> Result<(), Error> {
        let etag = protocol::header_str(resp.headers(), "etag").map(str::to_string);
        if let Some(expected) = digest {
            match &etag {
                Some(returned) if returned.eq_ignore_ascii_case(&expected) => {}
                Some(returned) => {
                    return Err(Error::new(
                        ErrorKind::IntegrityError,
                        format!(
                            "Upload digest mismatch: computed {}, received {}",
                            expected, returned
                        ),
                    ));
                }
                None => {
                    return Err(Error::new(
                        ErrorKind::InvalidResponse,
                        "No ETag header in the upload response",
                    ));
                }
            }
        }
        self.etag = etag;
        self.content_length = size;
        Ok(())
    }

    /// Write data to the storage object, creating or overwriting it.
    ///
    /// With `verify`, an MD5 digest is computed over the data as it is sent
    /// and compared against the returned `ETag`; a mismatch fails with
    /// [IntegrityError](../enum.ErrorKind.html) and leaves `etag` unset.
    pub async fn write<B: Into<Bytes>>(&mut self, data: B, verify: bool) -> Result<(), Error> {
        let data = data.into();
        let size = data.len() as u64;
        let digest = if verify {
            Some(format!("{:x}", md5::compute(&data)))
        } else {
            None
        };
        debug!(
            "Writing {} bytes to {}/{} (verify: {})",
            size, self.container, self.name, verify
        );

        self.etag = None;
        let resp = self.start_write(None).await?.body(data).send().await?;
        self.finish_write(&resp, digest, size)
    }

    /// Write a stream of data to the storage object.
    ///
    /// Without `data_size`, chunked transfer encoding is used. The digest
    /// for verification is computed over the chunks as they are produced.
    pub async fn write_stream<S, E>(
        &mut self,
        stream: S,
        data_size: Option<u64>,
        verify: bool,
    ) -> Result<(), Error>
    where
        S: Stream<Item = Result<Bytes, E>> + Send + Sync + 'static,
        E: Into<Box<dyn BaseError + Send + Sync>> + 'static,
    {
        self.etag = None;
        let state = Arc::new(UploadState::new());
        let observer = Arc::clone(&state);
        let hashing = stream.map(move |item| {
            item.map(|chunk| {
                observer.observe(&chunk, verify);
                chunk
            })
        });

        let resp = self
            .start_write(data_size)
            .await?
            .body(Body::wrap_stream(hashing))
            .send()
            .await?;
        let digest = if verify { Some(state.digest()) } else { None };
        let size = state.bytes();
        self.finish_write(&resp, digest, size)
    }

    /// Update object metadata.
    ///
    /// Every key must start with `x-object-meta-` or
    /// `x-remove-object-meta-`; anything else is rejected before the request
    /// is made. On success remove-prefixed keys are dropped from the cached
    /// metadata and the rest are upserted.
    pub async fn update_metadata(&mut self, metadata: HashMap<String, String>) -> Result<(), Error> {
        protocol::validate_metadata(&metadata, OBJECT_META_PREFIX, OBJECT_META_REMOVE_PREFIX)?;
        let headers = protocol::metadata_headers(&metadata)?;
        let _ = self
            .storage
            .post(self.path())
            .await?
            .headers(headers)
            .send()
            .await
            .map_err(|e| e.if_status(StatusCode::NOT_FOUND, ErrorKind::NoSuchObject))?;
        protocol::merge_metadata(&mut self.metadata, metadata);
        Ok(())
    }

    /// Copy this object's data to another object on the server side.
    ///
    /// No data transits the client. The destination container defaults to
    /// this object's container.
    pub async fn copy_to(&self, destination: &str, container: Option<&str>) -> Result<(), Error> {
        let target = format!("/{}/{}", container.unwrap_or(&self.container), destination);
        let copy = Method::from_bytes(b"COPY").map_err(http::Error::from)?;
        let _ = self
            .storage
            .request(copy, self.path())
            .await?
            .header("destination", target)
            .send()
            .await
            .map_err(|e| e.if_status(StatusCode::NOT_FOUND, ErrorKind::NoSuchObject))?;
        Ok(())
    }

    /// Copy another object's data into this object on the server side.
    ///
    /// No data transits the client. The source container defaults to this
    /// object's container.
    pub async fn copy_from(&self, source: &str, container: Option<&str>) -> Result<(), Error> {
        let origin = format!("/{}/{}", container.unwrap_or(&self.container), source);
        let _ = self
            .storage
            .put(self.path())
            .await?
            .header("x-copy-from", origin)
            .header(CONTENT_LENGTH, "0")
            .send()
            .await?;
        Ok(())
    }

    /// Build a signed temporary URL for the object.
    ///
    /// Requires the account's temporary URL key (see
    /// [CloudFiles::set_temp_url_key](struct.CloudFiles.html#method.set_temp_url_key)).
    /// Pure computation apart from the catalog lookup: no request is made.
    pub async fn temp_url(
        &self,
        method: &str,
        seconds: i64,
        key: &str,
        filename: Option<&str>,
    ) -> Result<Url, Error> {
        let mut url = self.storage.get_endpoint(self.path()).await?;
        let expires = Utc::now().timestamp() + seconds;
        let signature = tempurl::signature(method, expires, url.path(), key);
        {
            let mut query = url.query_pairs_mut();
            let _ = query.append_pair("temp_url_sig", &signature);
            let _ = query.append_pair("temp_url_expires", &expires.to_string());
            if let Some(filename) = filename {
                let _ = query.append_pair("filename", filename);
            }
        }
        Ok(url)
    }

    /// Schedule the object for deletion at the given Unix timestamp.
    ///
    /// Passing `None` cancels a pending scheduled delete.
    pub async fn delete_at(&mut self, timestamp: Option<i64>) -> Result<(), Error> {
        let request = self.storage.post(self.path()).await?;
        let request = match timestamp {
            Some(timestamp) => request.header("x-delete-at", timestamp.to_string()),
            None => request.header("x-remove-delete-at", "True"),
        };
        let _ = request
            .send()
            .await
            .map_err(|e| e.if_status(StatusCode::NOT_FOUND, ErrorKind::NoSuchObject))?;
        self.delete_at = timestamp;
        Ok(())
    }

    /// Schedule the object for deletion after the given number of seconds.
    ///
    /// Passing `None` cancels a pending scheduled delete.
    pub async fn delete_after(&mut self, seconds: Option<i64>) -> Result<(), Error> {
        match seconds {
            Some(seconds) => self.delete_at(Some(Utc::now().timestamp() + seconds)).await,
            None => self.delete_at(None).await,
        }
    }

    /// Delete the storage object.
    pub async fn delete(&self) -> Result<(), Error> {
        let _ = self
            .storage
            .delete(self.path())
            .await?
            .send()
            .await
            .map_err(|e| e.if_status(StatusCode::NOT_FOUND, ErrorKind::NoSuchObject))?;
        Ok(())
    }

    /// Purge the object from the CDN.
    ///
    /// An extremely expensive operation; the optional email address is
    /// notified on completion.
    pub async fn purge_from_cdn(&self, email: Option<&str>) -> Result<(), Error> {
        let request = self.cdn.delete(self.path()).await?;
        let request = match email {
            Some(email) => request.header("x-purge-email", email),
            None => request,
        };
        let _ = request.send().await?;
        Ok(())
    }
}

#[cfg(test)]
mod test {
    use futures::pin_mut;
    use futures::stream::TryStreamExt;
    use maplit::hashmap;

    use super::{range_header, StorageObject};
    use crate::adapter::Adapter;
    use crate::client::AuthenticatedClient;
    use crate::services;
    use crate::testing::{CannedResponse, TestServer};
    use crate::{EndpointFilters, ErrorKind};

    async fn test_object(server: &TestServer) -> StorageObject {
        let client = AuthenticatedClient::new_noauth(&server.url).await;
        let storage = Adapter::new(
            client.clone(),
            services::OBJECT_STORE,
            EndpointFilters::new(),
        );
        let cdn = Adapter::new(client, services::OBJECT_CDN, EndpointFilters::new());
        StorageObject::new(
            storage,
            cdn,
            String::from("cont"),
            String::from("photos/cat.txt"),
        )
    }

    #[test]
    fn test_range_header() {
        assert_eq!(range_header(Some(10), 5).unwrap(), "bytes=5-14");
        assert_eq!(range_header(Some(10), 0).unwrap(), "bytes=0-9");
        assert_eq!(range_header(None, 5).unwrap(), "bytes=5-");
        assert_eq!(range_header(None, -500).unwrap(), "bytes=-500");
        assert!(range_header(None, 0).is_none());
    }

    #[tokio::test]
    async fn test_load_parses_headers() {
        let server = TestServer::start(vec![CannedResponse::new(200)
            .with_header("content-type", "text/plain")
            .with_header("content-length", "11")
            .with_header("etag", "5eb63bbbe01eeed093cb22bb8f5acdc3")
            .with_header("last-modified", "Tue, 27 Aug 2013 20:14:50 GMT")
            .with_header("x-delete-at", "1700000000")
            .with_header("x-object-meta-colour", "orange")])
        .await;
        let mut object = test_object(&server).await;
        object.load().await.unwrap();
        assert_eq!(object.content_type(), "text/plain");
        assert_eq!(object.content_length(), 11);
        assert_eq!(object.etag(), Some("5eb63bbbe01eeed093cb22bb8f5acdc3"));
        assert_eq!(object.delete_at_timestamp(), Some(1700000000));
        assert_eq!(
            object.metadata().get("x-object-meta-colour").unwrap(),
            "orange"
        );

        let requests = server.requests();
        assert_eq!(requests[0].method, "HEAD");
        assert_eq!(requests[0].path, "/cont/photos/cat.txt");
    }

    #[tokio::test]
    async fn test_load_missing_object() {
        let server = TestServer::start(vec![CannedResponse::new(404)]).await;
        let mut object = test_object(&server).await;
        let err = object.load().await.err().unwrap();
        assert_eq!(err.kind(), ErrorKind::NoSuchObject);
    }

    #[tokio::test]
    async fn test_read_sends_range() {
        let server = TestServer::start(vec![CannedResponse::new(206).with_body("0123456789")])
            .await;
        let object = test_object(&server).await;
        let data = object.read(Some(10), 5).await.unwrap();
        assert_eq!(&data[..], b"0123456789");

        let requests = server.requests();
        assert_eq!(requests[0].header("range"), Some("bytes=5-14"));
    }

    #[tokio::test]
    async fn test_read_no_range() {
        let server = TestServer::start(vec![CannedResponse::new(200).with_body("abc")]).await;
        let object = test_object(&server).await;
        let data = object.read(None, 0).await.unwrap();
        assert_eq!(&data[..], b"abc");
        assert_eq!(server.requests()[0].header("range"), None);
    }

    #[tokio::test]
    async fn test_read_into_writer() {
        let server = TestServer::start(vec![CannedResponse::new(200).with_body("hello world")])
            .await;
        let object = test_object(&server).await;
        let mut output = Vec::new();
        let written = object.read_into(&mut output, None, 0, 4).await.unwrap();
        assert_eq!(written, 11);
        assert_eq!(output, b"hello world");
    }

    #[tokio::test]
    async fn test_chunks_bounded() {
        let server = TestServer::start(vec![CannedResponse::new(200).with_body("hello world")])
            .await;
        let object = test_object(&server).await;
        let stream = object.chunks(4, None, 0);
        pin_mut!(stream);
        let mut sizes = Vec::new();
        let mut all = Vec::new();
        while let Some(chunk) = stream.try_next().await.unwrap() {
            sizes.push(chunk.len());
            all.extend_from_slice(&chunk);
        }
        assert_eq!(all, b"hello world");
        assert!(sizes.iter().all(|size| *size <= 4));
    }

    #[tokio::test]
    async fn test_write_verified() {
        let server = TestServer::start(vec![CannedResponse::new(201)
            .with_header("etag", "5eb63bbbe01eeed093cb22bb8f5acdc3")])
        .await;
        let mut object = test_object(&server).await;
        object.write(&b"hello world"[..], true).await.unwrap();
        assert_eq!(object.etag(), Some("5eb63bbbe01eeed093cb22bb8f5acdc3"));
        assert_eq!(object.content_length(), 11);

        let requests = server.requests();
        assert_eq!(requests[0].method, "PUT");
        assert_eq!(requests[0].body_str(), "hello world");
    }

    #[tokio::test]
    async fn test_write_digest_mismatch() {
        let server =
            TestServer::start(vec![CannedResponse::new(201).with_header("etag", "deadbeef")])
                .await;
        let mut object = test_object(&server).await;
        let err = object
            .write(&b"hello world"[..], true)
            .await
            .err()
            .unwrap();
        assert_eq!(err.kind(), ErrorKind::IntegrityError);
        assert_eq!(object.etag(), None);
    }

    #[tokio::test]
    async fn test_write_unverified_ignores_etag() {
        let server =
            TestServer::start(vec![CannedResponse::new(201).with_header("etag", "deadbeef")])
                .await;
        let mut object = test_object(&server).await;
        object.write(&b"hello world"[..], false).await.unwrap();
        assert_eq!(object.etag(), Some("deadbeef"));
        assert_eq!(object.content_length(), 11);
    }

    #[tokio::test]
    async fn test_write_stream_verified() {
        let server = TestServer::start(vec![CannedResponse::new(201)
            .with_header("etag", "5eb63bbbe01eeed093cb22bb8f5acdc3")])
        .await;
        let mut object = test_object(&server).await;
        let chunks = futures::stream::iter(vec![
            Ok::<_, std::io::Error>(bytes::Bytes::from_static(b"hello ")),
            Ok(bytes::Bytes::from_static(b"world")),
        ]);
        object.write_stream(chunks, None, true).await.unwrap();
        assert_eq!(object.etag(), Some("5eb63bbbe01eeed093cb22bb8f5acdc3"));
        assert_eq!(object.content_length(), 11);

        let requests = server.requests();
        assert_eq!(requests[0].body_str(), "hello world");
    }

    #[tokio::test]
    async fn test_update_metadata_rejects_bad_key() {
        let server = TestServer::start(vec![]).await;
        let mut object = test_object(&server).await;
        let err = object
            .update_metadata(hashmap! {
                String::from("x-container-meta-foo") => String::from("x"),
            })
            .await
            .err()
            .unwrap();
        assert_eq!(err.kind(), ErrorKind::InvalidConfig);
        assert_eq!(server.request_count(), 0);
    }

    #[tokio::test]
    async fn test_copy_to_sends_destination() {
        let server = TestServer::start(vec![CannedResponse::new(201)]).await;
        let object = test_object(&server).await;
        object.copy_to("backup.txt", Some("backups")).await.unwrap();

        let requests = server.requests();
        assert_eq!(requests[0].method, "COPY");
        assert_eq!(
            requests[0].header("destination"),
            Some("/backups/backup.txt")
        );
    }

    #[tokio::test]
    async fn test_copy_from_sends_header() {
        let server = TestServer::start(vec![CannedResponse::new(201)]).await;
        let object = test_object(&server).await;
        object.copy_from("source.txt", None).await.unwrap();

        let requests = server.requests();
        assert_eq!(requests[0].method, "PUT");
        assert_eq!(requests[0].header("x-copy-from"), Some("/cont/source.txt"));
    }

    #[tokio::test]
    async fn test_delete_at_and_cancel() {
        let server = TestServer::start(vec![
            CannedResponse::new(202),
            CannedResponse::new(202),
        ])
        .await;
        let mut object = test_object(&server).await;
        object.delete_at(Some(1700000000)).await.unwrap();
        assert_eq!(object.delete_at_timestamp(), Some(1700000000));

        object.delete_at(None).await.unwrap();
        assert_eq!(object.delete_at_timestamp(), None);

        let requests = server.requests();
        assert_eq!(requests[0].header("x-delete-at"), Some("1700000000"));
        assert_eq!(requests[1].header("x-remove-delete-at"), Some("True"));
    }

    #[tokio::test]
    async fn test_temp_url() {
        let server = TestServer::start(vec![]).await;
        let object = test_object(&server).await;
        let url = object
            .temp_url("GET", 3600, "correcthorse", Some("cat.txt"))
            .await
            .unwrap();
        assert_eq!(url.path(), "/cont/photos/cat.txt");
        let query: Vec<(String, String)> = url.query_pairs().into_owned().collect();
        assert!(query
            .iter()
            .any(|(key, value)| key == "temp_url_sig" && value.len() == 40));
        assert!(query.iter().any(|(key, _)| key == "temp_url_expires"));
        assert!(query
            .iter()
            .any(|(key, value)| key == "filename" && value == "cat.txt"));
        assert_eq!(server.request_count(), 0);
    }

    #[tokio::test]
    async fn test_guessed_content_type() {
        let server = TestServer::start(vec![]).await;
        let object = test_object(&server).await;
        assert_eq!(object.content_type(), "text/plain");
    }
}
