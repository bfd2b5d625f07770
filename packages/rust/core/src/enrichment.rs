//! Company enrichment via the completion API.
//!
//! Builds the two-message prompt for one company, sends it as a single
//! completion request, and classifies the reply strictly as JSON.

use compenrich_completion::{ChatMessage, CompletionClient, CompletionRequest};
use compenrich_shared::{EnrichedRecord, Result};
use serde_json::Value;
use tracing::{debug, instrument, warn};

// ---------------------------------------------------------------------------
// Prompt
// ---------------------------------------------------------------------------

/// Standing instructions for the analyst model.
pub const SYSTEM_PROMPT: &str = "You are a chemical industry intelligence analyst. \
Cross-check every fact against at least two independent, reliable sources \
(e.g. D&B, Bloomberg, the company's official website). \
Derive manufacturing tags only from the verified services: tag \"Contract Manufacturing\" \
when the phrase 'contract manufacturing' appears (case-insensitive), and tag \"CRO\" or \
\"CDMO\" only on an exact uppercase match of those tokens. \
Take contact details from the 'Contact Us' page or the website footer. \
If the legal name or the services cannot be confirmed with 100% certainty, return an \
empty JSON object instead of guessing. Do not add any commentary.";

/// Literal response schema included in every user message.
const RESPONSE_SCHEMA: &str = r#"{
  "name": "[Verified legal name]",
  "services_offered": ["Official services only"],
  "manufacturing_tags": [
       "Contract Manufacturing" (only if the exact phrase 'contract manufacturing' is found),
       "CRO" (only on an exact uppercase match),
       "CDMO" (only on an exact uppercase match)
  ],
  "contact_information": {
    "phone": "[Verified format: +1-XXX-XXX-XXXX]",
    "email": "[Verified email format]",
    "address": "[Verified HQ, ideally from the Contact Us page or footer]"
  },
  "size_of_company": "[Employees from LinkedIn/D&B]"
}"#;

/// Build the system + user messages for one company.
pub fn build_messages(company_name: &str, zone: Option<&str>) -> Vec<ChatMessage> {
    let subject = match zone {
        Some(zone) => format!("{company_name} in {zone}"),
        None => company_name.to_string(),
    };

    let user = format!(
        "Analyze {subject} using verified records. \
         Return EXACTLY the following JSON structure:\n\n\
         {RESPONSE_SCHEMA}\n\n\
         Return an empty JSON object if the name or services cannot be verified \
         with 100% certainty. No additional explanations."
    );

    vec![ChatMessage::system(SYSTEM_PROMPT), ChatMessage::user(user)]
}

// ---------------------------------------------------------------------------
// Outcome
// ---------------------------------------------------------------------------

/// What the model gave back for one company.
#[derive(Debug, Clone, PartialEq)]
pub enum EnrichmentOutcome {
    /// A non-empty JSON object, kept exactly as returned.
    Verified(EnrichedRecord),
    /// A well-formed "nothing verified" reply: `{}`, `null`, or another
    /// empty JSON value (`[]`, `""`, `false`, `0`).
    Empty,
    /// The reply was not JSON, or JSON that cannot be a record.
    Unparsable { raw: String, reason: String },
}

impl EnrichmentOutcome {
    /// The record, if one was verified.
    pub fn into_record(self) -> Option<EnrichedRecord> {
        match self {
            Self::Verified(record) => Some(record),
            _ => None,
        }
    }
}

/// Classify a completion reply. No extraction or repair is attempted, and
/// a verified object is not reshaped.
pub fn parse_response(text: &str) -> EnrichmentOutcome {
    let value: Value = match serde_json::from_str(text) {
        Ok(value) => value,
        Err(e) => {
            return EnrichmentOutcome::Unparsable {
                raw: text.to_string(),
                reason: format!("invalid JSON: {e}"),
            };
        }
    };

    if is_empty_value(&value) {
        return EnrichmentOutcome::Empty;
    }

    match value {
        Value::Object(object) => match EnrichedRecord::from_object(object) {
            Some(record) => EnrichmentOutcome::Verified(record),
            None => EnrichmentOutcome::Empty,
        },
        other => EnrichmentOutcome::Unparsable {
            raw: text.to_string(),
            reason: format!("expected a JSON object, got {}", kind(&other)),
        },
    }
}

fn is_empty_value(value: &Value) -> bool {
    match value {
        Value::Null => true,
        Value::Bool(flag) => !flag,
        Value::Number(number) => number.as_f64() == Some(0.0),
        Value::String(text) => text.is_empty(),
        Value::Array(items) => items.is_empty(),
        Value::Object(map) => map.is_empty(),
    }
}

fn kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}

// ---------------------------------------------------------------------------
// Enricher
// ---------------------------------------------------------------------------

/// Per-run enrichment settings.
#[derive(Debug, Clone)]
pub struct EnrichmentConfig {
    /// Model identifier sent with every request.
    pub model: String,
}

/// Enrichment client: one completion call per company.
///
/// The completion client and settings are created once per run and passed
/// in here; nothing is global.
pub struct Enricher<C> {
    client: C,
    config: EnrichmentConfig,
}

impl<C: CompletionClient> Enricher<C> {
    pub fn new(client: C, config: EnrichmentConfig) -> Self {
        Self { client, config }
    }

    pub fn config(&self) -> &EnrichmentConfig {
        &self.config
    }

    pub fn client(&self) -> &C {
        &self.client
    }

    /// Build the full request for a company without sending it.
    pub fn request_for(&self, company_name: &str, zone: Option<&str>) -> CompletionRequest {
        CompletionRequest {
            model: self.config.model.clone(),
            messages: build_messages(company_name, zone),
        }
    }

    /// Enrich one company.
    ///
    /// `Err` means the completion call itself failed; a reply that carries
    /// no usable data is `Ok(Empty)` or `Ok(Unparsable)`.
    #[instrument(skip(self), fields(model = %self.config.model))]
    pub async fn enrich(&self, company_name: &str, zone: Option<&str>) -> Result<EnrichmentOutcome> {
        let request = self.request_for(company_name, zone);
        let text = self.client.complete(&request).await?;

        let outcome = parse_response(&text);
        match &outcome {
            EnrichmentOutcome::Verified(record) => {
                let unknown = record.unknown_tags();
                if !unknown.is_empty() {
                    warn!(company = company_name, tags = ?unknown, "reply has tags outside the known set");
                }
                debug!(verified_name = record.name().unwrap_or_default(), "company verified");
            }
            EnrichmentOutcome::Empty => {
                debug!("model could not verify company");
            }
            EnrichmentOutcome::Unparsable { raw, reason } => {
                warn!(company = company_name, %reason, raw = %raw, "invalid JSON response");
            }
        }
        Ok(outcome)
    }
}
