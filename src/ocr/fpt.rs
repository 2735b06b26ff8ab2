//! FPT.AI Vision provider (Vietnamese ID recognition API).

use std::collections::HashMap;
use std::time::Duration;

use serde::Deserialize;
use tracing::{debug, info};

use super::{DocType, FieldKey, FieldValue, OcrError, OcrInput, OcrProvider, OcrRecord, Side};

const DEFAULT_ENDPOINT: &str = "https://api.fpt.ai/vision/idr/vnm";
const DEFAULT_TIMEOUT_SECS: u64 = 60;

/// Wire sentinel for fields the provider could not read. Converted to
/// [`FieldValue::NotAvailable`] here and nowhere else.
const NOT_AVAILABLE: &str = "N/A";

pub struct FptVisionProvider {
    endpoint: String,
    api_key: String,
    client: reqwest::Client,
}

impl FptVisionProvider {
    /// Build a provider from environment configuration.
    ///
    /// `FPT_VISION_API_KEY` is required; `FPT_VISION_ENDPOINT` and
    /// `FPT_VISION_TIMEOUT_SECS` override the defaults.
    pub fn from_env() -> anyhow::Result<Self> {
        dotenvy::dotenv().ok();
        let api_key = std::env::var("FPT_VISION_API_KEY")
            .map_err(|_| anyhow::anyhow!("FPT_VISION_API_KEY not set"))?;
        let endpoint =
            std::env::var("FPT_VISION_ENDPOINT").unwrap_or_else(|_| DEFAULT_ENDPOINT.to_string());
        let timeout = std::env::var("FPT_VISION_TIMEOUT_SECS")
            .ok()
            .and_then(|s| s.parse().ok())
            .unwrap_or(DEFAULT_TIMEOUT_SECS);
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(timeout))
            .build()?;
        Ok(Self {
            endpoint,
            api_key,
            client,
        })
    }
}

// ── FPT.AI wire types ───────────────────────────────────────────────────────

#[derive(Deserialize)]
struct IdrResponse {
    #[serde(rename = "errorCode")]
    error_code: u32,
    #[serde(rename = "errorMessage", default)]
    error_message: String,
    #[serde(default)]
    data: Vec<IdrDocument>,
}

/// One recognized document. All extracted values arrive as strings, with
/// `"N/A"` standing in for unreadable fields; `overall_score` is a string
/// percentage.
#[derive(Deserialize, Default)]
struct IdrDocument {
    #[serde(rename = "type", default)]
    doc_type: String,
    id: Option<String>,
    name: Option<String>,
    dob: Option<String>,
    sex: Option<String>,
    nationality: Option<String>,
    home: Option<String>,
    address: Option<String>,
    doe: Option<String>,
    features: Option<String>,
    issue_date: Option<String>,
    issue_loc: Option<String>,
    ethnicity: Option<String>,
    religion: Option<String>,
    overall_score: Option<String>,
    mrz_details: Option<MrzDetails>,
}

#[derive(Deserialize, Default)]
struct MrzDetails {
    id: Option<String>,
}

// ── Provider implementation ─────────────────────────────────────────────────

#[async_trait::async_trait]
impl OcrProvider for FptVisionProvider {
    fn name(&self) -> &str {
        "fpt_vision"
    }

    async fn recognize(&self, input: &OcrInput) -> Result<OcrRecord, OcrError> {
        use reqwest::multipart::{Form, Part};

        let (filename, data) = match input {
            OcrInput::Bytes { filename, data } => (filename.clone(), data.clone()),
            OcrInput::Url { url } => {
                // The IDR endpoint only accepts uploads; fetch the saved
                // image first.
                debug!("FptVisionProvider: fetching image from {}", url);
                let resp = self.client.get(url).send().await?.error_for_status()?;
                let data = resp.bytes().await?.to_vec();
                ("image".to_string(), data)
            }
        };

        info!(
            "FptVisionProvider: submitting {} ({} bytes)",
            filename,
            data.len()
        );

        let part = Part::bytes(data).file_name(filename);
        let form = Form::new().part("image", part);

        let resp = self
            .client
            .post(&self.endpoint)
            .header("api-key", &self.api_key)
            .multipart(form)
            .send()
            .await?
            .error_for_status()?;

        let raw = resp.text().await?;
        debug!(
            "FptVisionProvider: raw response ({} bytes): {}",
            raw.len(),
            preview(&raw)
        );
        parse_response(&raw)
    }
}

/// First ~500 bytes of the body for debug logging, truncated on a char
/// boundary (responses carry Vietnamese diacritics).
fn preview(raw: &str) -> &str {
    let mut end = raw.len().min(500);
    while !raw.is_char_boundary(end) {
        end -= 1;
    }
    &raw[..end]
}

/// Parse an IDR response body into a unified record.
fn parse_response(raw: &str) -> Result<OcrRecord, OcrError> {
    let resp: IdrResponse = serde_json::from_str(raw)?;
    if resp.error_code != 0 {
        return Err(OcrError::Provider {
            code: resp.error_code,
            message: resp.error_message,
        });
    }
    let doc = resp.data.into_iter().next().ok_or(OcrError::EmptyResponse)?;
    Ok(map_record(doc))
}

fn map_record(doc: IdrDocument) -> OcrRecord {
    let doc_type = DocType::from_tag(&doc.doc_type);

    let mut fields = HashMap::new();
    insert_field(&mut fields, FieldKey::Id, doc.id);
    insert_field(&mut fields, FieldKey::Name, doc.name);
    insert_field(&mut fields, FieldKey::Dob, doc.dob);
    insert_field(&mut fields, FieldKey::Sex, doc.sex);
    insert_field(&mut fields, FieldKey::Nationality, doc.nationality);
    insert_field(&mut fields, FieldKey::Home, doc.home);
    insert_field(&mut fields, FieldKey::Address, doc.address);
    insert_field(&mut fields, FieldKey::Doe, doc.doe);
    insert_field(&mut fields, FieldKey::Features, doc.features);
    insert_field(&mut fields, FieldKey::IssueDate, doc.issue_date);
    insert_field(&mut fields, FieldKey::IssueLoc, doc.issue_loc);
    insert_field(&mut fields, FieldKey::Ethnicity, doc.ethnicity);
    insert_field(&mut fields, FieldKey::Religion, doc.religion);

    let overall_score = doc
        .overall_score
        .as_deref()
        .and_then(|s| s.parse().ok())
        .unwrap_or(0.0);

    // The visibly-printed number only counts for front captures; the MRZ
    // identifier only exists on back captures.
    let extracted_id = match doc_type.detected_side() {
        Some(Side::Front) => fields
            .get(&FieldKey::Id)
            .and_then(|v| v.as_present())
            .map(str::to_string),
        _ => None,
    };
    let mrz_id = doc
        .mrz_details
        .and_then(|m| m.id)
        .filter(|s| s != NOT_AVAILABLE && !s.is_empty());

    OcrRecord {
        doc_type,
        fields,
        overall_score,
        extracted_id,
        mrz_id,
    }
}

fn insert_field(map: &mut HashMap<FieldKey, FieldValue>, key: FieldKey, raw: Option<String>) {
    if let Some(value) = raw {
        let fv = if value == NOT_AVAILABLE {
            FieldValue::NotAvailable
        } else {
            FieldValue::Present(value)
        };
        map.insert(key, fv);
    }
}
