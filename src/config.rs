// Copyright 2018-2020 Dmitry Tantsur <dtantsur@protonmail.com>
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

//! Support for loading credentials from the environment and from files.

use std::env;
use std::fs::File;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use log::debug;
use serde::Deserialize;

use super::identity::{ApiKey, Password, DEFAULT_AUTH_URL};
use super::{AuthType, Error, ErrorKind};

/// Credentials and connection options for a cloud.
///
/// Exactly one of `api_key` and `password` must be set, otherwise the
/// configuration is rejected before any request is made.
#[derive(Debug, Clone, Deserialize)]
pub struct CloudConfig {
    /// User name to authenticate with.
    pub username: String,
    /// API key to authenticate with (preferred).
    #[serde(default)]
    pub api_key: Option<String>,
    /// Password to authenticate with.
    #[serde(default)]
    pub password: Option<String>,
    /// Region to connect to (defaults to the account's default region).
    #[serde(default)]
    pub region: Option<String>,
    /// Authentication endpoint override.
    #[serde(default)]
    pub auth_url: Option<String>,
    /// Whether to use the internal network (ServiceNet) for storage requests.
    #[serde(default)]
    pub servicenet: Option<bool>,
}

impl CloudConfig {
    /// Create an authentication type from this configuration.
    pub(crate) fn create_auth(&self) -> Result<Arc<dyn AuthType>, Error> {
        let auth_url = self.auth_url.as_deref().unwrap_or(DEFAULT_AUTH_URL);
        match (&self.api_key, &self.password) {
            (Some(_), Some(_)) => Err(Error::new(
                ErrorKind::InvalidConfig,
                "Ambiguous credentials: both an API key and a password are set",
            )),
            (Some(api_key), None) => Ok(Arc::new(ApiKey::new_with_auth_url(
                auth_url,
                &self.username,
                api_key,
            )?)),
            (None, Some(password)) => Ok(Arc::new(Password::new_with_auth_url(
                auth_url,
                &self.username,
                password,
            )?)),
            (None, None) => Err(Error::new(
                ErrorKind::InvalidConfig,
                "Missing credentials: either an API key or a password is required",
            )),
        }
    }
}

// This is only used for unit testing.
trait Environment {
    fn get(&self, name: &'static str) -> Option<String>;
}

#[derive(Debug, Clone, Copy)]
struct RealEnvironment;

impl Environment for RealEnvironment {
    fn get(&self, name: &'static str) -> Option<String> {
        env::var(name).ok()
    }
}

fn _from_env<E: Environment>(env: E) -> Result<CloudConfig, Error> {
    let username = env.get("RAX_USERNAME").ok_or_else(|| {
        Error::new(
            ErrorKind::InvalidConfig,
            "Required environment variable RAX_USERNAME is not provided",
        )
    })?;

    let servicenet = match env.get("RAX_SERVICENET").as_deref() {
        Some("1") | Some("true") | Some("yes") => Some(true),
        Some("0") | Some("false") | Some("no") => Some(false),
        Some(other) => {
            return Err(Error::new(
                ErrorKind::InvalidConfig,
                format!("Invalid value for RAX_SERVICENET: {}", other),
            ));
        }
        None => None,
    };

    Ok(CloudConfig {
        username,
        api_key: env.get("RAX_API_KEY"),
        password: env.get("RAX_PASSWORD"),
        region: env.get("RAX_REGION"),
        auth_url: env.get("RAX_AUTH_URL"),
        servicenet,
    })
}

/// Create a `CloudConfig` from `RAX_*` environment variables.
pub fn from_env() -> Result<CloudConfig, Error> {
    _from_env(RealEnvironment)
}

fn default_config_file() -> Result<PathBuf, Error> {
    let config_dir = dirs::config_dir().ok_or_else(|| {
        Error::new(
            ErrorKind::InvalidConfig,
            "Cannot determine the user configuration directory",
        )
    })?;
    Ok(config_dir.join("raxfiles").join("credentials.yaml"))
}

/// Create a `CloudConfig` from a YAML credentials file.
///
/// With no path provided, reads `raxfiles/credentials.yaml` from the user
/// configuration directory.
pub fn from_config<P: AsRef<Path>>(path: Option<P>) -> Result<CloudConfig, Error> {
    let path = match path {
        Some(path) => path.as_ref().to_path_buf(),
        None => default_config_file()?,
    };
    debug!("Loading credentials from {:?}", path);

    let file = File::open(&path).map_err(|e| {
        Error::new(
            ErrorKind::InvalidConfig,
            format!("Cannot open credentials file {:?}: {}", path, e),
        )
    })?;
    serde_yaml::from_reader(file).map_err(|e| {
        Error::new(
            ErrorKind::InvalidConfig,
            format!("Cannot parse credentials file {:?}: {}", path, e),
        )
    })
}
