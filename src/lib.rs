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

//! Asynchronous Rackspace Cloud Files and Identity client.
//!
//! Authenticate once against the Identity service, then issue typed calls
//! against containers and objects:
//!
//! ```rust,no_run
//! # async fn example() -> Result<(), raxfiles::Error> {
//! let auth = raxfiles::identity::ApiKey::new("joe", "0123456789abcdef")?;
//! let client = raxfiles::CloudFiles::new(auth, Some("DFW".into()), false).await?;
//!
//! let container = client.create_container("backups").await?;
//! let mut object = container.create_object("notes.txt");
//! object.write(&b"hello world"[..], true).await?;
//! # Ok(()) }
//! # #[tokio::main]
//! # async fn main() { example().await.unwrap(); }
//! ```
//!
//! The expired-token handling is transparent: a request failing with an
//! authentication error triggers exactly one re-authentication and retry.

#![crate_name = "raxfiles"]
#![crate_type = "lib"]
// NOTE: we do not use generic deny(warnings) to avoid breakages with new
// versions of the compiler. Add more warnings here as you discover them.
#![deny(
    improper_ctypes,
    non_shorthand_field_patterns,
    no_mangle_generic_items,
    overflowing_literals,
    path_statements,
    patterns_in_fns_without_body,
    trivial_casts,
    trivial_numeric_casts,
    unconditional_recursion,
    unsafe_code,
    unused_allocation,
    unused_comparisons,
    unused_doc_comments,
    unused_parens,
    while_true
)]
#![warn(missing_docs, missing_debug_implementations)]

mod adapter;
mod auth;
mod catalog;
pub mod client;
pub mod cloudfiles;
pub mod config;
mod endpointfilters;
mod error;
pub mod identity;
pub mod services;
#[cfg(test)]
pub(crate) mod testing;
mod url;

pub use crate::adapter::Adapter;
pub use crate::auth::{AuthType, NoAuth};
pub use crate::client::AuthenticatedClient;
pub use crate::cloudfiles::{CloudFiles, Container, StorageObject};
pub use crate::config::CloudConfig;
pub use crate::endpointfilters::{EndpointFilters, InterfaceType};
pub use crate::error::{Error, ErrorKind};
