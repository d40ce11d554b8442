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

//! Authentication using the Rackspace Identity V2.0 API.
//!
//! Identity authentication issues a token together with a service catalog
//! and a snapshot of the authenticated user. The token is attached to every
//! outgoing request as the `X-Auth-Token` header and is refreshed
//! transparently when it expires.

mod apikey;
mod internal;
pub(crate) mod protocol;
mod password;

use reqwest::Url;

pub use self::apikey::ApiKey;
pub use self::password::Password;
pub use self::protocol::{CatalogRecord, Endpoint, Role, User};

/// Default authentication endpoint.
pub const DEFAULT_AUTH_URL: &str = "https://identity.api.rackspacecloud.com/v2.0";

/// Minimum remaining validity of a cached token in minutes.
///
/// A token closer to expiration than this is refreshed before use.
const TOKEN_MIN_VALIDITY: i64 = 2;

/// Trait for all types of identity authentication.
pub trait Identity {
    /// Get the authentication URL.
    fn auth_url(&self) -> &Url;
}
