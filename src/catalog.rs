// Copyright 2017 Dmitry Tantsur <dtantsur@protonmail.com>
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

//! Low-level code to work with the service catalog.

use log::{debug, error};
use reqwest::Url;

use super::identity::protocol::{CatalogRecord, Endpoint};
use super::{EndpointFilters, Error, ErrorKind, InterfaceType};

/// Find an endpoint in the service catalog.
pub fn find_endpoint<'c>(
    catalog: &'c [CatalogRecord],
    service_type: &str,
    filters: &EndpointFilters,
) -> Result<&'c Endpoint, Error> {
    let svc = match catalog.iter().find(|x| x.service_type == *service_type) {
        Some(s) => s,
        None => return Err(Error::new_endpoint_not_found(service_type)),
    };

    svc.endpoints
        .iter()
        .find(|x| filters.check(x))
        .ok_or_else(|| Error::new_endpoint_not_found(service_type))
}

/// Extract a URL from the service catalog.
pub fn extract_url(
    catalog: &[CatalogRecord],
    service_type: &str,
    filters: &EndpointFilters,
) -> Result<Url, Error> {
    let endp = find_endpoint(catalog, service_type, filters)?;
    debug!("Received {:?} for {}", endp, service_type);

    let url = match filters.interface {
        InterfaceType::Public => &endp.public_url,
        InterfaceType::Internal => match &endp.internal_url {
            Some(internal) => internal,
            None => {
                return Err(Error::new(
                    ErrorKind::EndpointNotFound,
                    format!(
                        "Service {} has no internal endpoint in region {:?}",
                        service_type, endp.region
                    ),
                ));
            }
        },
    };

    Url::parse(url).map_err(|e| {
        error!(
            "Invalid URL {} received from service catalog for service \
             '{}', filters {:?}: {}",
            url, service_type, filters, e
        );
        Error::new(
            ErrorKind::InvalidResponse,
            format!("Invalid URL {} for {} - {}", url, service_type, e),
        )
    })
}
