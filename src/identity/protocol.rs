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

//! JSON structures and protocol bits for the Identity V2.0 API.

#![allow(missing_docs)]

use chrono::{DateTime, FixedOffset};
use serde::{Deserialize, Serialize};

/// User name and API key for the Rackspace-specific API key authentication.
#[derive(Clone, Debug, Deserialize, Serialize)]
pub struct ApiKeyCredentials {
    pub username: String,
    #[serde(rename = "apiKey")]
    pub api_key: String,
}

/// User name and password for password authentication.
#[derive(Clone, Debug, Deserialize, Serialize)]
pub struct PasswordCredentials {
    pub username: String,
    pub password: String,
}

/// An authentication method.
///
/// The externally tagged representation produces exactly the wire format:
/// `{"RAX-KSKEY:apiKeyCredentials": {..}}` or `{"passwordCredentials": {..}}`.
#[derive(Clone, Debug, Deserialize, Serialize)]
pub enum Auth {
    #[serde(rename = "RAX-KSKEY:apiKeyCredentials")]
    ApiKey(ApiKeyCredentials),
    #[serde(rename = "passwordCredentials")]
    Password(PasswordCredentials),
}

#[derive(Clone, Debug, Deserialize, Serialize)]
pub struct AuthRoot {
    pub auth: Auth,
}

#[derive(Clone, Debug, Deserialize)]
pub struct Token {
    pub id: String,
    pub expires: DateTime<FixedOffset>,
}

#[derive(Clone, Debug, Deserialize)]
pub struct Endpoint {
    #[serde(default)]
    pub region: Option<String>,
    #[serde(rename = "publicURL")]
    pub public_url: String,
    #[serde(rename = "internalURL", default)]
    pub internal_url: Option<String>,
}

#[derive(Clone, Debug, Deserialize)]
pub struct CatalogRecord {
    pub name: String,
    #[serde(rename = "type")]
    pub service_type: String,
    pub endpoints: Vec<Endpoint>,
}

#[derive(Clone, Debug, Deserialize)]
pub struct Role {
    #[serde(default)]
    pub id: Option<String>,
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
}

/// Read-only snapshot of the authenticated user.
#[derive(Clone, Debug, Deserialize)]
pub struct User {
    pub id: String,
    pub name: String,
    #[serde(rename = "RAX-AUTH:defaultRegion", default)]
    pub default_region: Option<String>,
    #[serde(default)]
    pub roles: Vec<Role>,
}

#[derive(Clone, Debug, Deserialize)]
pub struct Access {
    pub token: Token,
    #[serde(rename = "serviceCatalog", default)]
    pub service_catalog: Vec<CatalogRecord>,
    pub user: User,
}

#[derive(Clone, Debug, Deserialize)]
pub struct AccessRoot {
    pub access: Access,
}
