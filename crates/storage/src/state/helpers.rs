// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use std::collections::HashMap;

/// Exact match first, then a unique prefix match.
pub(crate) fn find_by_prefix<'a, T>(map: &'a HashMap<String, T>, id: &str) -> Option<&'a T> {
    if let Some(value) = map.get(id) {
        return Some(value);
    }
    let mut matches = map.iter().filter(|(k, _)| arq_core::id::prefix_matches(k, id));
    match (matches.next(), matches.next()) {
        (Some((_, value)), None) => Some(value),
        _ => None,
    }
}
