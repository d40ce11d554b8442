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

//! Temporary URL signatures.

use hmac::{Hmac, Mac};
use sha1::Sha1;

type HmacSha1 = Hmac<Sha1>;

/// Compute the signature for a temporary URL.
///
/// The signature is the hex-encoded HMAC-SHA1 of
/// `"<METHOD>\n<expires>\n<path>"` keyed with the account's temporary URL
/// key. Deterministic for fixed inputs.
pub fn signature(method: &str, expires: i64, path: &str, key: &str) -> String {
    let mut mac =
        HmacSha1::new_from_slice(key.as_bytes()).expect("HMAC can take key of any size");
    mac.update(format!("{}\n{}\n{}", method, expires, path).as_bytes());
    hex::encode(mac.finalize().into_bytes())
}
