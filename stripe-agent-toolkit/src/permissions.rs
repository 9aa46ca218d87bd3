//! Permission filter: which remote tools a toolkit exposes.
//!
//! A static [`ToolPermissionMap`] lists, for each known tool, the
//! `(resource, permission)` pairs it needs. A caller-supplied
//! [`PermissionConfig`] grants permissions per resource. The filter is a
//! convenience for narrowing the exposed catalog, not a security boundary: the
//! credential presented to the remote service is what actually scopes access, so
//! tools missing from the map are always allowed.

use std::collections::{BTreeMap, HashMap};

use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};

/// Permission kind on a resource.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Permission {
    Create,
    Update,
    Read,
}

/// Permissions granted on one resource. Unset counts as not granted.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResourcePermissions {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub create: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub update: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub read: Option<bool>,
}

impl ResourcePermissions {
    pub fn allows(&self, permission: Permission) -> bool {
        let flag = match permission {
            Permission::Create => self.create,
            Permission::Update => self.update,
            Permission::Read => self.read,
        };
        flag == Some(true)
    }
}

/// Caller permission configuration: resource name (e.g. `customers`,
/// `paymentLinks`) to granted permissions.
pub type PermissionConfig = BTreeMap<String, ResourcePermissions>;

/// Tool name to the `(resource, permission)` pairs required to expose it.
#[derive(Debug, Clone, Default)]
pub struct ToolPermissionMap {
    entries: HashMap<String, Vec<(String, Permission)>>,
}

impl ToolPermissionMap {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds (or replaces) the requirements for `tool`.
    pub fn with_tool(
        mut self,
        tool: impl Into<String>,
        requires: impl IntoIterator<Item = (impl Into<String>, Permission)>,
    ) -> Self {
        let requires = requires
            .into_iter()
            .map(|(resource, permission)| (resource.into(), permission))
            .collect();
        self.entries.insert(tool.into(), requires);
        self
    }

    /// The built-in map for the Stripe tool catalog.
    pub fn builtin() -> &'static ToolPermissionMap {
        &BUILTIN
    }

    pub fn requirements(&self, tool: &str) -> Option<&[(String, Permission)]> {
        self.entries.get(tool).map(Vec::as_slice)
    }

    /// Whether `tool` may be exposed under `config`.
    ///
    /// 1. No configuration at all: allowed.
    /// 2. Tool absent from this map: allowed.
    /// 3. Otherwise every required pair must be explicitly `true` in `config`.
    pub fn is_allowed(&self, tool: &str, config: Option<&PermissionConfig>) -> bool {
        let Some(config) = config else {
            return true;
        };
        let Some(requires) = self.requirements(tool) else {
            return true;
        };
        requires.iter().all(|(resource, permission)| {
            config
                .get(resource)
                .map(|granted| granted.allows(*permission))
                .unwrap_or(false)
        })
    }
}

/// [`ToolPermissionMap::is_allowed`] against the built-in map.
pub fn is_tool_allowed(tool: &str, config: Option<&PermissionConfig>) -> bool {
    ToolPermissionMap::builtin().is_allowed(tool, config)
}

static BUILTIN: Lazy<ToolPermissionMap> = Lazy::new(|| {
    use Permission::{Create, Read, Update};
    [
        ("create_customer", "customers", Create),
        ("list_customers", "customers", Read),
        ("create_product", "products", Create),
        ("list_products", "products", Read),
        ("create_price", "prices", Create),
        ("list_prices", "prices", Read),
        ("create_payment_link", "paymentLinks", Create),
        ("create_invoice", "invoices", Create),
        ("list_invoices", "invoices", Read),
        ("finalize_invoice", "invoices", Update),
        ("create_invoice_item", "invoiceItems", Create),
        ("retrieve_balance", "balance", Read),
        ("create_refund", "refunds", Create),
        ("list_payment_intents", "paymentIntents", Read),
        ("list_subscriptions", "subscriptions", Read),
        ("update_subscription", "subscriptions", Update),
        ("cancel_subscription", "subscriptions", Update),
        ("create_coupon", "coupons", Create),
        ("list_coupons", "coupons", Read),
        ("list_disputes", "disputes", Read),
        ("update_dispute", "disputes", Update),
        ("search_documentation", "documentation", Read),
    ]
    .into_iter()
    .fold(ToolPermissionMap::new(), |map, (tool, resource, permission)| {
        map.with_tool(tool, [(resource, permission)])
    })
});
