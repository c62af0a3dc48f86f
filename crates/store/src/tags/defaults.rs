//! Static default tags
//!
//! Tenants on the region-filter allow-list always carry the reserved
//! `code_filter_region` tag. The reserved tag never appears in a platform's tag
//! universe.

use std::collections::HashMap;

/// Reserved tag injected for the allow-list; hidden from suggestions
pub const HIDDEN_TAG: &str = "code_filter_region";

const REGION_FILTER_TENANTS: &[i64] = &[
    133822, 133849, 134531, 150076, 150075, 150078, 150079, 150080, 150081, 150082, 150083,
];

/// Tenant → tags that are always present
#[derive(Debug, Clone, Default)]
pub struct DefaultTags {
    by_tenant: HashMap<i64, Vec<String>>,
}

impl DefaultTags {
    /// No default tags at all
    pub fn empty() -> Self {
        Self::default()
    }

    /// The production table
    pub fn builtin() -> Self {
        let mut defaults = Self::empty();
        for tenant_id in REGION_FILTER_TENANTS {
            defaults.insert(*tenant_id, HIDDEN_TAG);
        }
        defaults
    }

    pub fn insert(&mut self, tenant_id: i64, tag: impl Into<String>) {
        let tag = tag.into();
        let tags = self.by_tenant.entry(tenant_id).or_default();
        if !tags.contains(&tag) {
            tags.push(tag);
        }
    }

    pub fn for_tenant(&self, tenant_id: i64) -> &[String] {
        self.by_tenant
            .get(&tenant_id)
            .map(Vec::as_slice)
            .unwrap_or_default()
    }

    /// Every default tag, across tenants
    pub fn all(&self) -> impl Iterator<Item = &str> {
        self.by_tenant.values().flatten().map(String::as_str)
    }
}
