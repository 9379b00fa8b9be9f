// Copyright 2023-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

use std::collections::HashSet;

/// Tags that must never reach the aggregator.
///
/// Built once at startup and read-only afterwards, so it is shared without locking.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ExcludedTags {
    tags: HashSet<String>,
}

impl ExcludedTags {
    /// Parses a comma-separated list such as `dyno:web.1,source:app`.
    ///
    /// Entries are trimmed and empty entries are ignored.
    pub fn parse(list: &str) -> Self {
        list.split(',').map(str::trim).collect()
    }

    pub fn contains(&self, tag: &str) -> bool {
        self.tags.contains(tag)
    }

    pub fn is_empty(&self) -> bool {
        self.tags.is_empty()
    }

    pub fn len(&self) -> usize {
        self.tags.len()
    }
}

impl<'a> FromIterator<&'a str> for ExcludedTags {
    fn from_iter<I: IntoIterator<Item = &'a str>>(iter: I) -> Self {
        Self {
            tags: iter
                .into_iter()
                .filter(|t| !t.is_empty())
                .map(str::to_string)
                .collect(),
        }
    }
}
