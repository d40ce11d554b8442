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

//! JSON structures and protocol bits for the Cloud Files API.

use std::collections::HashMap;
use std::error::Error as BaseError;
use std::fmt;

use http::header::{HeaderMap, HeaderName, HeaderValue};
use serde::Deserialize;

use crate::{Error, ErrorKind};

/// An entry in a container listing.
#[derive(Clone, Debug, Deserialize)]
pub struct ContainerEntry {
    /// Container name.
    pub name: String,
    /// Number of objects in the container.
    pub count: u64,
    /// Total size of the container in bytes.
    pub bytes: u64,
}

/// An entry in a CDN container listing.
#[derive(Clone, Debug, Deserialize)]
pub struct CdnContainerEntry {
    /// Container name.
    pub name: String,
    /// Whether the container is currently CDN-enabled.
    pub cdn_enabled: bool,
    /// CDN time-to-live in seconds.
    pub ttl: u32,
    /// Whether CDN access logs are retained.
    pub log_retention: bool,
    /// Public CDN URI.
    #[serde(default)]
    pub cdn_uri: Option<String>,
    /// Public CDN SSL URI.
    #[serde(default)]
    pub cdn_ssl_uri: Option<String>,
    /// Public CDN streaming URI.
    #[serde(default)]
    pub cdn_streaming_uri: Option<String>,
    /// Public CDN iOS streaming URI.
    #[serde(default)]
    pub cdn_ios_uri: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum RawObjectEntry {
    Object {
        name: String,
        #[serde(default)]
        bytes: u64,
        #[serde(default)]
        hash: Option<String>,
        #[serde(default)]
        last_modified: Option<String>,
        #[serde(default)]
        content_type: Option<String>,
    },
    // With a delimiter, pseudo-directories come back as {"subdir": "name/"}.
    Subdir {
        subdir: String,
    },
}

/// An entry in an object listing.
#[derive(Clone, Debug, Deserialize)]
#[serde(from = "RawObjectEntry")]
pub struct ObjectEntry {
    /// Object name (or pseudo-directory name when listing with a delimiter).
    pub name: String,
    /// Object size in bytes.
    pub bytes: u64,
    /// Content hash (hex MD5).
    pub hash: Option<String>,
    /// Last modification timestamp.
    pub last_modified: Option<String>,
    /// Content type.
    pub content_type: Option<String>,
    /// Whether this entry is a pseudo-directory marker.
    pub subdir: bool,
}

impl From<RawObjectEntry> for ObjectEntry {
    fn from(value: RawObjectEntry) -> ObjectEntry {
        match value {
            RawObjectEntry::Object {
                name,
                bytes,
                hash,
                last_modified,
                content_type,
            } => ObjectEntry {
                name,
                bytes,
                hash,
                last_modified,
                content_type,
                subdir: false,
            },
            RawObjectEntry::Subdir { subdir } => ObjectEntry {
                name: subdir,
                bytes: 0,
                hash: None,
                last_modified: None,
                content_type: None,
                subdir: true,
            },
        }
    }
}

/// Result of a bulk archive extraction.
#[derive(Clone, Debug, Deserialize)]
pub struct ExtractArchiveResponse {
    /// Number of files created on the server.
    #[serde(rename = "Number Files Created", default)]
    pub files_created: u64,
    /// Overall response status line.
    #[serde(rename = "Response Status", default)]
    pub response_status: String,
    /// Free-form response body.
    #[serde(rename = "Response Body", default)]
    pub response_body: String,
    /// Per-file errors as (path, error) pairs.
    #[serde(rename = "Errors", default)]
    pub errors: Vec<(String, String)>,
}

/// Per-file failures of an archive extraction.
///
/// Attached as the source of an
/// [ExtractArchiveFailed](../enum.ErrorKind.html) error; retrieve it via
/// `Error::source` and downcasting.
#[derive(Clone, Debug)]
pub struct ArchiveErrors {
    /// The failed paths with their error messages.
    pub errors: Vec<(String, String)>,
}

impl fmt::Display for ArchiveErrors {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{} file(s) failed to extract", self.errors.len())?;
        for (path, error) in &self.errors {
            write!(f, "; {}: {}", path, error)?;
        }
        Ok(())
    }
}

impl BaseError for ArchiveErrors {}

/// Get a header value as a string, if present and valid.
pub(crate) fn header_str<'m>(headers: &'m HeaderMap, name: &str) -> Option<&'m str> {
    headers.get(name).and_then(|value| value.to_str().ok())
}

/// Get a header value as an unsigned integer, if present and valid.
pub(crate) fn header_u64(headers: &HeaderMap, name: &str) -> Option<u64> {
    header_str(headers, name).and_then(|value| value.parse().ok())
}

/// Collect all metadata headers with the given prefix.
///
/// Header names are already lower-case on the wire; the resulting map keys
/// keep the full prefixed form.
pub(crate) fn meta_headers(headers: &HeaderMap, prefix: &str) -> HashMap<String, String> {
    headers
        .iter()
        .filter(|(name, _)| name.as_str().starts_with(prefix))
        .filter_map(|(name, value)| {
            value
                .to_str()
                .ok()
                .map(|value| (name.as_str().to_string(), value.to_string()))
        })
        .collect()
}

/// Validate that every metadata key carries one of the two allowed prefixes.
///
/// Runs before any request is made; a violation is a configuration error.
pub(crate) fn validate_metadata(
    metadata: &HashMap<String, String>,
    set_prefix: &str,
    remove_prefix: &str,
) -> Result<(), Error> {
    for key in metadata.keys() {
        let key = key.to_lowercase();
        if !key.starts_with(set_prefix) && !key.starts_with(remove_prefix) {
            return Err(Error::new(
                ErrorKind::InvalidConfig,
                format!(
                    "Metadata key '{}' is invalid: must start with '{}' or '{}'",
                    key, set_prefix, remove_prefix
                ),
            ));
        }
    }
    Ok(())
}

/// Apply an already validated metadata update to the cached metadata map.
///
/// Remove-prefixed keys delete the corresponding plain key, all others are
/// upserted with lower-cased names.
pub(crate) fn merge_metadata(
    cache: &mut HashMap<String, String>,
    metadata: HashMap<String, String>,
) {
    for (key, value) in metadata {
        let key = key.to_lowercase();
        if let Some(stripped) = key.strip_prefix("x-remove-") {
            let _ = cache.remove(&format!("x-{}", stripped));
        } else {
            let _ = cache.insert(key, value);
        }
    }
}

/// Convert a metadata map into request headers.
pub(crate) fn metadata_headers(metadata: &HashMap<String, String>) -> Result<HeaderMap, Error> {
    let mut headers = HeaderMap::with_capacity(metadata.len());
    for (key, value) in metadata {
        let name = HeaderName::try_from(key.as_str()).map_err(http::Error::from)?;
        let value = HeaderValue::try_from(value.as_str()).map_err(http::Error::from)?;
        let _ = headers.insert(name, value);
    }
    Ok(headers)
}

#[cfg(test)]
pub mod test {
    use maplit::hashmap;

    use super::*;

    #[test]
    fn test_object_listing() {
        let json = r#"[
            {"bytes": 4, "last_modified": "2013-08-27T20:14:50.378200",
             "hash": "8d777f385d3dfec8815d20f7496026dc", "name": "a.txt",
             "content_type": "text/plain"},
            {"subdir": "photos/"}
        ]"#;
        let entries: Vec<ObjectEntry> = serde_json::from_str(json).unwrap();
        assert_eq!(entries.len(), 2);
        assert_eq!(entries[0].name, "a.txt");
        assert_eq!(entries[0].bytes, 4);
        assert_eq!(
            entries[0].hash.as_deref(),
            Some("8d777f385d3dfec8815d20f7496026dc")
        );
        assert!(!entries[0].subdir);
        assert_eq!(entries[1].name, "photos/");
        assert!(entries[1].subdir);
    }

    #[test]
    fn test_container_listing() {
        let json = r#"[
            {"bytes": 35515535291, "count": 20, "name": "backups"},
            {"bytes": 0, "count": 0, "name": "static"}
        ]"#;
        let entries: Vec<ContainerEntry> = serde_json::from_str(json).unwrap();
        assert_eq!(entries.len(), 2);
        assert_eq!(entries[0].name, "backups");
        assert_eq!(entries[0].count, 20);
    }

    #[test]
    fn test_extract_archive_response() {
        let json = r#"{
            "Number Files Created": 10,
            "Response Status": "400 Bad Request",
            "Response Body": "",
            "Errors": [["a/b.txt", "412 Precondition Failed"]]
        }"#;
        let resp: ExtractArchiveResponse = serde_json::from_str(json).unwrap();
        assert_eq!(resp.files_created, 10);
        assert_eq!(resp.errors.len(), 1);
        assert_eq!(resp.errors[0].0, "a/b.txt");
    }

    #[test]
    fn test_validate_metadata() {
        let good = hashmap! {
            String::from("x-container-meta-foo") => String::from("bar"),
            String::from("X-Remove-Container-Meta-Baz") => String::from("True"),
        };
        validate_metadata(&good, "x-container-meta-", "x-remove-container-meta-").unwrap();

        let bad = hashmap! {
            String::from("bogus-key") => String::from("x"),
        };
        let err = validate_metadata(&bad, "x-container-meta-", "x-remove-container-meta-")
            .err()
            .unwrap();
        assert_eq!(err.kind(), crate::ErrorKind::InvalidConfig);
    }

    #[test]
    fn test_merge_metadata() {
        let mut cache = hashmap! {
            String::from("x-container-meta-foo") => String::from("old"),
            String::from("x-container-meta-keep") => String::from("kept"),
        };
        merge_metadata(
            &mut cache,
            hashmap! {
                String::from("x-remove-container-meta-foo") => String::from("True"),
                String::from("X-Container-Meta-Bar") => String::from("baz"),
            },
        );
        assert!(!cache.contains_key("x-container-meta-foo"));
        assert_eq!(
            cache.get("x-container-meta-bar").map(String::as_str),
            Some("baz")
        );
        assert_eq!(
            cache.get("x-container-meta-keep").map(String::as_str),
            Some("kept")
        );
    }

    #[test]
    fn test_metadata_headers() {
        let metadata = hashmap! {
            String::from("x-object-meta-foo") => String::from("bar"),
        };
        let headers = metadata_headers(&metadata).unwrap();
        assert_eq!(headers.get("x-object-meta-foo").unwrap(), "bar");
    }
}
