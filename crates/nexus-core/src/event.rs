//! Push events published by the owning services.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::entity::customer_key;
use crate::error::EventError;

/// A customer was created or renamed in the CRM service.
///
/// Wire format: `{ "id": string, "name": string }`. Numeric ids are accepted
/// and normalised to their decimal string form, since that is the form used
/// in the cache key.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CustomerUpdated {
    pub id: String,
    pub name: String,
}

impl CustomerUpdated {
    /// Validates a raw message body against the required-fields schema.
    ///
    /// # Examples
    ///
    /// ```
    /// use nexus_core::{CustomerUpdated, EventError};
    ///
    /// let event = CustomerUpdated::parse(br#"{"id":"c1","name":"Jane Doe"}"#).unwrap();
    /// assert_eq!(event.name, "Jane Doe");
    ///
    /// let err = CustomerUpdated::parse(br#"{"id":"c1"}"#).unwrap_err();
    /// assert_eq!(err, EventError::MissingField("name"));
    /// ```
    pub fn parse(body: &[u8]) -> Result<Self, EventError> {
        let value: Value =
            serde_json::from_slice(body).map_err(|e| EventError::InvalidJson(e.to_string()))?;

        let Value::Object(fields) = value else {
            return Err(EventError::NotAnObject);
        };

        let id = match fields.get("id") {
            None | Some(Value::Null) => return Err(EventError::MissingField("id")),
            Some(Value::String(s)) => s.trim().to_string(),
            Some(Value::Number(n)) => n.to_string(),
            Some(_) => {
                return Err(EventError::InvalidField {
                    field: "id",
                    reason: "expected a string or number",
                });
            },
        };
        if id.is_empty() {
            return Err(EventError::InvalidField {
                field: "id",
                reason: "must not be empty",
            });
        }

        let name = match fields.get("name") {
            None | Some(Value::Null) => return Err(EventError::MissingField("name")),
            Some(Value::String(s)) => s.clone(),
            Some(_) => {
                return Err(EventError::InvalidField {
                    field: "name",
                    reason: "expected a string",
                });
            },
        };
        if name.is_empty() {
            return Err(EventError::InvalidField {
                field: "name",
                reason: "must not be empty",
            });
        }

        Ok(Self { id, name })
    }

    /// Shared cache key this event overwrites.
    pub fn cache_key(&self) -> String {
        customer_key(&self.id)
    }
}
