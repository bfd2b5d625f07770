//! Core domain types for company enrichment.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Error marker written for rows the completion API could not verify.
pub const NO_VALID_DATA: &str = "No valid data found";

// ---------------------------------------------------------------------------
// InputRow
// ---------------------------------------------------------------------------

/// One row of the input table, consumed immediately by the pipeline.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InputRow {
    /// 1-based data row number (the header is not counted).
    pub row_number: usize,
    /// Company name from the `Company` column, exactly as written.
    pub company_name: String,
    /// Industry zone from the `Type` column, if present and non-empty.
    pub zone: Option<String>,
}

// ---------------------------------------------------------------------------
// ManufacturingTag
// ---------------------------------------------------------------------------

/// Closed set of manufacturing classification labels.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ManufacturingTag {
    #[serde(rename = "Contract Manufacturing")]
    ContractManufacturing,
    #[serde(rename = "CRO")]
    Cro,
    #[serde(rename = "CDMO")]
    Cdmo,
}

impl ManufacturingTag {
    /// All tags, in the order they are presented to the model.
    pub const ALL: [ManufacturingTag; 3] = [Self::ContractManufacturing, Self::Cro, Self::Cdmo];

    /// Label exactly as it appears on disk.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::ContractManufacturing => "Contract Manufacturing",
            Self::Cro => "CRO",
            Self::Cdmo => "CDMO",
        }
    }

    /// Exact-match lookup of a label.
    pub fn from_label(label: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|tag| tag.as_str() == label)
    }
}

impl std::fmt::Display for ManufacturingTag {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

// ---------------------------------------------------------------------------
// EnrichedRecord
// ---------------------------------------------------------------------------

/// Company metadata returned by the completion API.
///
/// Holds the reply object exactly as received, so it is persisted verbatim
/// with extra keys, odd value types and key order intact. The accessors are
/// lenient read-only views over the documented fields.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct EnrichedRecord(Map<String, Value>);

impl EnrichedRecord {
    /// Wrap a reply object. An empty object is not a record.
    pub fn from_object(object: Map<String, Value>) -> Option<Self> {
        if object.is_empty() {
            None
        } else {
            Some(Self(object))
        }
    }

    pub fn as_object(&self) -> &Map<String, Value> {
        &self.0
    }

    pub fn into_object(self) -> Map<String, Value> {
        self.0
    }

    /// Raw value of any key, documented or not.
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.0.get(key)
    }

    /// Verified legal name, when the reply carries it as a string.
    pub fn name(&self) -> Option<&str> {
        self.0.get("name").and_then(Value::as_str)
    }

    /// Services as a list; a bare string counts as one service.
    pub fn services_offered(&self) -> Vec<&str> {
        match self.0.get("services_offered") {
            Some(Value::String(service)) => vec![service.as_str()],
            Some(value) => string_items(value).collect(),
            None => Vec::new(),
        }
    }

    /// Tags from the closed set, deduplicated, in reply order.
    pub fn manufacturing_tags(&self) -> Vec<ManufacturingTag> {
        let mut tags = Vec::new();
        for tag in self.tag_labels().filter_map(ManufacturingTag::from_label) {
            if !tags.contains(&tag) {
                tags.push(tag);
            }
        }
        tags
    }

    /// Tag labels outside the closed set. They stay in the stored record.
    pub fn unknown_tags(&self) -> Vec<&str> {
        self.tag_labels()
            .filter(|label| ManufacturingTag::from_label(label).is_none())
            .collect()
    }

    pub fn contact_information(&self) -> ContactInformation {
        let Some(Value::Object(contact)) = self.0.get("contact_information") else {
            return ContactInformation::default();
        };
        let field = |key: &str| contact.get(key).and_then(scalar_text);
        ContactInformation {
            phone: field("phone"),
            email: field("email"),
            address: field("address"),
        }
    }

    /// Employee band, e.g. `"200-500"`. A bare number is rendered as text.
    pub fn size_of_company(&self) -> Option<String> {
        self.0.get("size_of_company").and_then(scalar_text)
    }

    fn tag_labels(&self) -> impl Iterator<Item = &str> {
        self.0
            .get("manufacturing_tags")
            .into_iter()
            .flat_map(string_items)
    }
}

/// Contact block view; every field is optional.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ContactInformation {
    pub phone: Option<String>,
    pub email: Option<String>,
    pub address: Option<String>,
}

fn string_items(value: &Value) -> impl Iterator<Item = &str> {
    value
        .as_array()
        .into_iter()
        .flatten()
        .filter_map(Value::as_str)
}

fn scalar_text(value: &Value) -> Option<String> {
    match value {
        Value::String(text) => Some(text.clone()),
        Value::Number(number) => Some(number.to_string()),
        _ => None,
    }
}

// ---------------------------------------------------------------------------
// FailureRecord / OutputEntry
// ---------------------------------------------------------------------------

/// Placeholder written when enrichment yields nothing verifiable.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct FailureRecord {
    /// The company name exactly as it appeared in the input.
    pub name: String,
    pub error: String,
}

impl FailureRecord {
    /// The standard "no valid data" record for a company.
    pub fn no_valid_data(company_name: impl Into<String>) -> Self {
        Self {
            name: company_name.into(),
            error: NO_VALID_DATA.to_string(),
        }
    }
}

/// One element of the output JSON array.
///
/// Serialized untagged, so the array holds the bare record objects.
/// `Failure` is listed first: it only matches objects with exactly
/// `name` and `error`. Any other object reads back as `Enriched`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum OutputEntry {
    Failure(FailureRecord),
    Enriched(EnrichedRecord),
}

impl OutputEntry {
    /// Name of the company this entry describes, if the entry has one.
    pub fn name(&self) -> Option<&str> {
        match self {
            Self::Failure(record) => Some(&record.name),
            Self::Enriched(record) => record.name(),
        }
    }

    pub fn is_failure(&self) -> bool {
        matches!(self, Self::Failure(_))
    }
}

impl From<EnrichedRecord> for OutputEntry {
    fn from(record: EnrichedRecord) -> Self {
        Self::Enriched(record)
    }
}

impl From<FailureRecord> for OutputEntry {
    fn from(record: FailureRecord) -> Self {
        Self::Failure(record)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    const ACME_JSON: &str = r#"{"name":"Acme Chemical Inc","services_offered":["toll manufacturing"],"manufacturing_tags":["CDMO"],"contact_information":{"phone":"+1-555-000-0000","email":"info@acme.com","address":"1 Main St"},"size_of_company":"200-500"}"#;

    fn record(value: Value) -> EnrichedRecord {
        match value {
            Value::Object(object) => EnrichedRecord::from_object(object).expect("non-empty"),
            other => panic!("not an object: {other}"),
        }
    }

    #[test]
    fn enriched_record_serializes_verbatim() {
        let record: EnrichedRecord = serde_json::from_str(ACME_JSON).expect("deserialize");
        assert_eq!(record.manufacturing_tags(), vec![ManufacturingTag::Cdmo]);

        let written = serde_json::to_string(&record).expect("serialize");
        assert_eq!(written, ACME_JSON);
    }

    #[test]
    fn unexpected_shapes_survive_serialization() {
        let reply = r#"{"size_of_company":350,"name":"Beta","services_offered":"solvents","website":"beta.example"}"#;
        let record: EnrichedRecord = serde_json::from_str(reply).unwrap();

        assert_eq!(serde_json::to_string(&record).unwrap(), reply);
        assert_eq!(record.size_of_company().as_deref(), Some("350"));
        assert_eq!(record.services_offered(), vec!["solvents"]);
        assert_eq!(record.get("website"), Some(&json!("beta.example")));
        assert_eq!(record.contact_information(), ContactInformation::default());
    }

    #[test]
    fn empty_object_is_not_a_record() {
        assert!(EnrichedRecord::from_object(Map::new()).is_none());
    }

    #[test]
    fn failure_record_shape() {
        let entry = OutputEntry::from(FailureRecord::no_valid_data("Acme Chem"));
        let value = serde_json::to_value(&entry).expect("serialize");
        assert_eq!(
            value,
            json!({"name": "Acme Chem", "error": "No valid data found"})
        );
    }

    #[test]
    fn output_entry_picks_the_right_variant() {
        let failure: OutputEntry =
            serde_json::from_str(r#"{"name":"X","error":"No valid data found"}"#).unwrap();
        assert!(failure.is_failure());

        let enriched: OutputEntry = serde_json::from_str(ACME_JSON).unwrap();
        assert!(!enriched.is_failure());
        assert_eq!(enriched.name(), Some("Acme Chemical Inc"));

        let nameless: OutputEntry = serde_json::from_str(r#"{"website":"x.example"}"#).unwrap();
        assert!(!nameless.is_failure());
        assert_eq!(nameless.name(), None);
    }

    #[test]
    fn tag_view_keeps_known_labels_only() {
        let record = record(json!({
            "name": "Beta",
            "manufacturing_tags": ["CRO", "Toll Manufacturing", "cro", "CRO", "Contract Manufacturing", 7]
        }));
        assert_eq!(
            record.manufacturing_tags(),
            vec![ManufacturingTag::Cro, ManufacturingTag::ContractManufacturing]
        );
        assert_eq!(record.unknown_tags(), vec!["Toll Manufacturing", "cro"]);
        assert_eq!(record.get("manufacturing_tags").unwrap().as_array().unwrap().len(), 6);
    }

    #[test]
    fn null_fields_read_as_empty() {
        let record = record(json!({
            "name": "Gamma",
            "services_offered": null,
            "manufacturing_tags": null,
            "contact_information": null,
            "size_of_company": null
        }));
        assert!(record.services_offered().is_empty());
        assert!(record.manufacturing_tags().is_empty());
        assert_eq!(record.contact_information(), ContactInformation::default());
        assert!(record.size_of_company().is_none());
    }

    #[test]
    fn contact_view_reads_partial_block() {
        let record = record(json!({
            "name": "Delta",
            "contact_information": {"email": "info@delta.example", "phone": 5550100}
        }));
        assert_eq!(
            record.contact_information(),
            ContactInformation {
                phone: Some("5550100".into()),
                email: Some("info@delta.example".into()),
                address: None,
            }
        );
    }

    #[test]
    fn tag_labels_roundtrip() {
        for tag in ManufacturingTag::ALL {
            assert_eq!(ManufacturingTag::from_label(tag.as_str()), Some(tag));
        }
        assert_eq!(ManufacturingTag::from_label("cdmo"), None);
    }
}
