use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Named category of protected resource.
///
/// The set is fixed at deployment. String forms are part of the stored
/// override grammar and must never change.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum ResourceDomain {
    #[serde(rename = "system:users")]
    SystemUsers,
    #[serde(rename = "billing:invoices")]
    BillingInvoices,
    #[serde(rename = "inventory:products")]
    InventoryProducts,
    #[serde(rename = "organization:team")]
    OrganizationTeam,
    #[serde(rename = "orders:logistics")]
    OrdersLogistics,
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[error("unknown resource domain '{0}'")]
pub struct UnknownResourceDomain(pub String);

impl ResourceDomain {
    pub const ALL: [ResourceDomain; 5] = [
        ResourceDomain::SystemUsers,
        ResourceDomain::BillingInvoices,
        ResourceDomain::InventoryProducts,
        ResourceDomain::OrganizationTeam,
        ResourceDomain::OrdersLogistics,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            ResourceDomain::SystemUsers => "system:users",
            ResourceDomain::BillingInvoices => "billing:invoices",
            ResourceDomain::InventoryProducts => "inventory:products",
            ResourceDomain::OrganizationTeam => "organization:team",
            ResourceDomain::OrdersLogistics => "orders:logistics",
        }
    }
}

impl core::fmt::Display for ResourceDomain {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl core::str::FromStr for ResourceDomain {
    type Err = UnknownResourceDomain;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|d| d.as_str() == s)
            .ok_or_else(|| UnknownResourceDomain(s.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn string_forms_match_serde_names() {
        for domain in ResourceDomain::ALL {
            let json = serde_json::to_string(&domain).unwrap();
            assert_eq!(json, format!("\"{}\"", domain.as_str()));
            assert_eq!(domain.as_str().parse::<ResourceDomain>().unwrap(), domain);
        }
    }

    #[test]
    fn near_misses_are_not_domains() {
        assert!("billing".parse::<ResourceDomain>().is_err());
        assert!("billing:invoices:".parse::<ResourceDomain>().is_err());
        assert!("Billing:Invoices".parse::<ResourceDomain>().is_err());
    }
}
