// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Content addressing — SHA-256 identifiers for stored photographs.

use pasport_core::types::ImageId;
use sha2::{Digest, Sha256};

/// Compute the SHA-256 hash of `data` and return it as a lowercase hex string.
pub fn hash_bytes(data: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(data);
    let result = hasher.finalize();
    hex::encode(result)
}

/// The identifier a photograph is stored under. Identical bytes always get
/// the same id, so a photo used in several slots is stored once.
pub fn image_id_for(data: &[u8]) -> ImageId {
    ImageId(hash_bytes(data))
}
