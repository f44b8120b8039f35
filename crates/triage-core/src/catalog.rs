//! Static prospect catalog: customers and their company records.
//!
//! The catalog is loaded once at process start from a JSON document:
//!
//! ```json
//! {
//!   "customers": [ { "id": 1, "name": "...", "type": "..." } ],
//!   "companies": { "1": [ { "id": 101, "name": "...", "confidence": 88, ... } ] }
//! }
//! ```
//!
//! Company and customer records are read-only snapshots for the
//! lifetime of a session; the core never mutates the catalog.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;

use crate::error::{Result, TriageError};

/// Customer identifier, unique across the catalog.
pub type CustomerId = u32;

/// Company identifier, unique within a customer's catalog.
pub type CompanyId = u32;

/// A prospective company record.
///
/// `confidence` is the broad market score; `confidence_b` is the
/// customer-tailored score, precomputed upstream and surfaced to the
/// working set only once the tailored ranking stage has run.
/// `revenue`, `ebitda`, `reasoning` and `logo` are display-only and
/// carried through to the final report unchanged.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Company {
    pub id: CompanyId,
    pub name: String,
    /// Broad market score in 0..=100.
    pub confidence: u8,
    /// Tailored score in 0..=100, present only after the tailored stage.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub confidence_b: Option<u8>,
    /// Ordered shareholder labels, possibly absent.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub shareholders: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub revenue: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ebitda: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reasoning: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub logo: Option<String>,
}

/// A customer owning a fixed collection of prospect companies.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Customer {
    pub id: CustomerId,
    pub name: String,
    /// Customer type label ("Private Equity", "Family Office", ...).
    #[serde(rename = "type")]
    pub kind: String,
}

/// The full static catalog: customer list plus per-customer company lists.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Catalog {
    customers: Vec<Customer>,
    companies: BTreeMap<CustomerId, Vec<Company>>,
}

impl Catalog {
    /// Build a catalog from in-memory parts. Intended for tests and
    /// embedded fixtures; production loads from JSON.
    pub fn new(customers: Vec<Customer>, companies: BTreeMap<CustomerId, Vec<Company>>) -> Self {
        Self {
            customers,
            companies,
        }
    }

    /// Parse a catalog from a JSON string.
    pub fn from_json_str(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }

    /// Load a catalog from a JSON file on disk.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let raw = std::fs::read_to_string(path)?;
        Self::from_json_str(&raw)
    }

    /// Ordered list of customers for presentation.
    pub fn customers(&self) -> &[Customer] {
        &self.customers
    }

    /// Look up a customer by id.
    pub fn customer(&self, id: CustomerId) -> Result<&Customer> {
        self.customers
            .iter()
            .find(|c| c.id == id)
            .ok_or(TriageError::UnknownCustomer(id))
    }

    /// The ordered company catalog for a customer.
    ///
    /// A known customer with no company entry yields an empty slice.
    pub fn companies_for(&self, id: CustomerId) -> Result<&[Company]> {
        self.customer(id)?;
        Ok(self
            .companies
            .get(&id)
            .map(Vec::as_slice)
            .unwrap_or_default())
    }

    /// The precomputed tailored score for a company, if the catalog
    /// carries one.
    pub fn tailored_score(&self, customer_id: CustomerId, company_id: CompanyId) -> Option<u8> {
        self.companies
            .get(&customer_id)?
            .iter()
            .find(|c| c.id == company_id)?
            .confidence_b
    }
}
