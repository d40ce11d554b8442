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

//! Endpoint filters for looking up endpoints.

use std::fmt;
use std::str::FromStr;

use super::{Error, ErrorKind};
use crate::identity::protocol::Endpoint;

/// Interface type: public or internal (ServiceNet).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum InterfaceType {
    /// Public interface (used by default).
    #[default]
    Public,
    /// Internal interface, also known as ServiceNet.
    ///
    /// Only usable from inside the provider's data center, but does not incur
    /// bandwidth charges and has lower latency.
    Internal,
}

/// Endpoint filters for looking up endpoints.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
#[non_exhaustive]
pub struct EndpointFilters {
    /// Endpoint interface to use.
    pub interface: InterfaceType,
    /// Cloud region.
    pub region: Option<String>,
}

impl fmt::Display for InterfaceType {
    fn fmt(&self, f: &mut fmt::Formatter) -> Result<(), fmt::Error> {
        f.write_str(match self {
            InterfaceType::Public => "public",
            InterfaceType::Internal => "internal",
        })
    }
}

impl FromStr for InterfaceType {
    type Err = Error;

    fn from_str(s: &str) -> Result<InterfaceType, Error> {
        match s {
            "public" => Ok(InterfaceType::Public),
            "internal" | "servicenet" => Ok(InterfaceType::Internal),
            other => Err(Error::new(
                ErrorKind::InvalidInput,
                format!("Unknown interface type: {}", other),
            )),
        }
    }
}

impl EndpointFilters {
    /// Create empty filters.
    pub fn new() -> EndpointFilters {
        EndpointFilters::default()
    }

    /// Set the endpoint interface.
    #[inline]
    pub fn set_interface(&mut self, interface: InterfaceType) {
        self.interface = interface;
    }

    /// Set the cloud region.
    #[inline]
    pub fn set_region<S: Into<String>>(&mut self, region: S) {
        self.region = Some(region.into());
    }

    /// Add the endpoint interface. Returns a new filter.
    #[inline]
    pub fn with_interface(mut self, interface: InterfaceType) -> EndpointFilters {
        self.set_interface(interface);
        self
    }

    /// Add the cloud region. Returns a new filter.
    #[inline]
    pub fn with_region<S: Into<String>>(mut self, region: S) -> EndpointFilters {
        self.set_region(region);
        self
    }

    /// Whether the endpoint matches the region filter.
    pub(crate) fn check(&self, endpoint: &Endpoint) -> bool {
        match (&self.region, &endpoint.region) {
            (Some(wanted), Some(actual)) => wanted == actual,
            // An endpoint without a region serves all regions.
            (Some(_), None) => true,
            (None, _) => true,
        }
    }
}
