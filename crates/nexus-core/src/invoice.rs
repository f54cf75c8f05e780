//! Invoice records as owned by the billing service, and their enriched view.

use serde::ser::SerializeMap;
use serde::{Deserialize, Serialize, Serializer};
use serde_json::{Map, Value};

use crate::entity::{EntityKind, UNKNOWN};

/// Field holding the invoice's own id.
pub const ID_FIELD: &str = "id";

/// Field of the base record that references an entity of `kind`.
pub fn reference_field(kind: EntityKind) -> &'static str {
    match kind {
        EntityKind::Employee => "employeeId",
        EntityKind::Branch => "branchId",
        EntityKind::Customer => "customerId",
    }
}

/// Field of the enriched record holding the resolved name of `kind`.
pub fn name_field(kind: EntityKind) -> &'static str {
    match kind {
        EntityKind::Employee => "employeeName",
        EntityKind::Branch => "branchName",
        EntityKind::Customer => "customerName",
    }
}

/// A base invoice record as returned by the billing service.
///
/// The record is kept exactly as billing sent it. Ids are read from it on
/// demand, so a missing or malformed id never makes the record unreadable
/// and never changes what is sent back to the client.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Invoice {
    fields: Map<String, Value>,
}

impl Invoice {
    /// Creates an invoice with the given id and string references.
    pub fn new(
        id: impl Into<String>,
        employee_id: Option<&str>,
        branch_id: Option<&str>,
        customer_id: Option<&str>,
    ) -> Self {
        let mut fields = Map::new();
        fields.insert(ID_FIELD.to_string(), Value::String(id.into()));

        let refs = [
            (EntityKind::Employee, employee_id),
            (EntityKind::Branch, branch_id),
            (EntityKind::Customer, customer_id),
        ];
        for (kind, id) in refs {
            if let Some(id) = id {
                fields.insert(reference_field(kind).to_string(), Value::String(id.to_string()));
            }
        }

        Self { fields }
    }

    /// The invoice id, if the record carries a usable one.
    pub fn id(&self) -> Option<String> {
        self.fields.get(ID_FIELD).and_then(normalize_id)
    }

    /// Id of the referenced entity of the given kind.
    ///
    /// Strings are trimmed and numbers rendered in decimal. Null, blank and
    /// non-scalar values count as no reference.
    pub fn reference(&self, kind: EntityKind) -> Option<String> {
        self.fields.get(reference_field(kind)).and_then(normalize_id)
    }

    pub fn get(&self, field: &str) -> Option<&Value> {
        self.fields.get(field)
    }

    pub fn fields(&self) -> &Map<String, Value> {
        &self.fields
    }
}

/// Non-object values are handed back unchanged.
impl TryFrom<Value> for Invoice {
    type Error = Value;

    fn try_from(value: Value) -> Result<Self, Self::Error> {
        match value {
            Value::Object(fields) => Ok(Self { fields }),
            other => Err(other),
        }
    }
}

fn normalize_id(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.trim())
            .filter(|s| !s.is_empty())
            .map(String::from),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

/// The three display names attached to an enriched invoice.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedNames {
    pub employee_name: String,
    pub branch_name: String,
    pub customer_name: String,
}

impl ResolvedNames {
    /// Names used when enrichment of a record failed as a whole.
    pub fn unknown() -> Self {
        Self {
            employee_name: UNKNOWN.to_string(),
            branch_name: UNKNOWN.to_string(),
            customer_name: UNKNOWN.to_string(),
        }
    }

    pub fn get(&self, kind: EntityKind) -> &str {
        match kind {
            EntityKind::Employee => &self.employee_name,
            EntityKind::Branch => &self.branch_name,
            EntityKind::Customer => &self.customer_name,
        }
    }
}

/// An invoice plus its resolved display names. Immutable once produced.
///
/// Serializes as the base record's fields followed by the three name
/// fields, which take precedence over same-named base fields.
#[derive(Debug, Clone, PartialEq)]
pub struct EnrichedInvoice {
    pub invoice: Invoice,
    pub names: ResolvedNames,
}

impl EnrichedInvoice {
    pub fn new(invoice: Invoice, names: ResolvedNames) -> Self {
        Self { invoice, names }
    }
}

impl Serialize for EnrichedInvoice {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let is_name_field =
            |key: &str| EntityKind::ALL.iter().any(|kind| name_field(*kind) == key);

        let mut map = serializer.serialize_map(None)?;
        for (key, value) in self.invoice.fields() {
            if !is_name_field(key) {
                map.serialize_entry(key, value)?;
            }
        }
        for kind in EntityKind::ALL {
            map.serialize_entry(name_field(kind), self.names.get(kind))?;
        }
        map.end()
    }
}
