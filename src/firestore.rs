use std::collections::BTreeMap;

use reqwest::StatusCode;
use serde::{Deserialize, Serialize};
use serde_json::json;

use crate::auth::Session;
use crate::config::Config;
use crate::error::{Error, Result};
use crate::models::{today_string, ApplicationStatus, JobApplication, OfferDetails};
use crate::store::ApplicationStore;

const FIRESTORE_BASE_URL: &str = "https://firestore.googleapis.com/v1";
const COLLECTION: &str = "job_applications";

// --- Wire value model ---

/// Firestore's tagged value encoding. Only the variants the application
/// schema uses, plus the ones decoding may encounter.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Value {
    NullValue(()),
    StringValue(String),
    BooleanValue(bool),
    IntegerValue(String),
    DoubleValue(f64),
    TimestampValue(String),
    ArrayValue(ArrayValue),
    MapValue(MapValue),
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct ArrayValue {
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub values: Vec<Value>,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct MapValue {
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub fields: BTreeMap<String, Value>,
}

impl Value {
    fn string(s: &str) -> Value {
        Value::StringValue(s.to_string())
    }

    fn strings(items: &[String]) -> Value {
        Value::ArrayValue(ArrayValue {
            values: items.iter().map(|s| Value::string(s)).collect(),
        })
    }

    fn as_str(&self) -> Option<&str> {
        match self {
            Value::StringValue(s) => Some(s),
            _ => None,
        }
    }

    fn as_bool(&self) -> Option<bool> {
        match self {
            Value::BooleanValue(b) => Some(*b),
            _ => None,
        }
    }

    fn as_array(&self) -> Option<&[Value]> {
        match self {
            Value::ArrayValue(array) => Some(&array.values),
            _ => None,
        }
    }

    fn as_map(&self) -> Option<&BTreeMap<String, Value>> {
        match self {
            Value::MapValue(map) => Some(&map.fields),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
struct Document {
    name: String,
    #[serde(default)]
    fields: BTreeMap<String, Value>,
}

#[derive(Debug, Serialize)]
struct DocumentBody {
    fields: BTreeMap<String, Value>,
}

// runQuery streams one result object per document, with bare read-time
// entries mixed in.
#[derive(Debug, Deserialize)]
struct QueryResult {
    #[serde(default)]
    document: Option<Document>,
}

#[derive(Debug, Deserialize, Default)]
struct ApiErrorDetail {
    #[serde(default)]
    message: String,
}

#[derive(Debug, Deserialize, Default)]
struct ApiErrorBody {
    #[serde(default)]
    error: ApiErrorDetail,
}

// --- Record codec ---

fn encode_record(record: &JobApplication) -> BTreeMap<String, Value> {
    let mut fields = BTreeMap::new();
    fields.insert("companyName".to_string(), Value::string(&record.company_name));
    fields.insert(
        "companyIndustry".to_string(),
        Value::string(&record.company_industry),
    );
    fields.insert("jobTitle".to_string(), Value::string(&record.job_title));
    fields.insert("jobType".to_string(), Value::string(&record.job_type));
    fields.insert("location".to_string(), Value::string(&record.location));
    fields.insert(
        "applicationDate".to_string(),
        Value::string(&record.application_date),
    );
    fields.insert("deadline".to_string(), Value::string(&record.deadline));
    fields.insert("status".to_string(), Value::string(record.status.as_str()));
    fields.insert(
        "priorityLevel".to_string(),
        Value::string(record.priority_level.as_str()),
    );
    fields.insert(
        "jobPostingLink".to_string(),
        Value::string(&record.job_posting_link),
    );
    fields.insert("salaryRange".to_string(), Value::string(&record.salary_range));
    fields.insert(
        "contactPerson".to_string(),
        Value::string(&record.contact_person),
    );
    fields.insert("contactEmail".to_string(), Value::string(&record.contact_email));
    fields.insert("contactPhone".to_string(), Value::string(&record.contact_phone));
    fields.insert(
        "followUpDate".to_string(),
        Value::string(&record.follow_up_date),
    );
    fields.insert(
        "interviewDate".to_string(),
        Value::string(&record.interview_date),
    );
    fields.insert(
        "jobDescriptionSummary".to_string(),
        Value::string(&record.job_description_summary),
    );
    fields.insert("notes".to_string(), Value::string(&record.notes));
    fields.insert(
        "resumeVersion".to_string(),
        Value::string(&record.resume_version),
    );
    fields.insert(
        "coverLetter".to_string(),
        Value::BooleanValue(record.cover_letter),
    );
    fields.insert("referral".to_string(), Value::string(&record.referral));
    fields.insert(
        "applicationPlatform".to_string(),
        Value::string(&record.application_platform),
    );
    fields.insert(
        "skillsRequired".to_string(),
        Value::strings(&record.skills_required),
    );
    if let Some(offer) = &record.offer_details {
        fields.insert("offerDetails".to_string(), encode_offer(offer));
    }
    fields
}

fn encode_offer(offer: &OfferDetails) -> Value {
    let mut fields = BTreeMap::new();
    fields.insert("salary".to_string(), Value::string(&offer.salary));
    fields.insert("benefits".to_string(), Value::strings(&offer.benefits));
    fields.insert("joiningDate".to_string(), Value::string(&offer.joining_date));
    Value::MapValue(MapValue { fields })
}

/// Missing fields decode to their defaults; an unknown stored status falls
/// back to Applied rather than failing the whole listing.
fn decode_record(doc: &Document) -> JobApplication {
    let fields = &doc.fields;
    let text = |key: &str| -> String {
        fields
            .get(key)
            .and_then(Value::as_str)
            .unwrap_or_default()
            .to_string()
    };

    JobApplication {
        id: Some(document_id(&doc.name)),
        company_name: text("companyName"),
        company_industry: text("companyIndustry"),
        job_title: text("jobTitle"),
        job_type: text("jobType"),
        location: text("location"),
        application_date: text("applicationDate"),
        deadline: text("deadline"),
        status: fields
            .get("status")
            .and_then(Value::as_str)
            .and_then(|s| s.parse().ok())
            .unwrap_or_default(),
        priority_level: fields
            .get("priorityLevel")
            .and_then(Value::as_str)
            .and_then(|s| s.parse().ok())
            .unwrap_or_default(),
        job_posting_link: text("jobPostingLink"),
        salary_range: text("salaryRange"),
        contact_person: text("contactPerson"),
        contact_email: text("contactEmail"),
        contact_phone: text("contactPhone"),
        follow_up_date: text("followUpDate"),
        interview_date: text("interviewDate"),
        job_description_summary: text("jobDescriptionSummary"),
        notes: text("notes"),
        resume_version: text("resumeVersion"),
        cover_letter: fields
            .get("coverLetter")
            .and_then(Value::as_bool)
            .unwrap_or(false),
        referral: text("referral"),
        application_platform: text("applicationPlatform"),
        skills_required: decode_strings(fields.get("skillsRequired")),
        offer_details: fields
            .get("offerDetails")
            .and_then(Value::as_map)
            .map(decode_offer),
    }
}

fn decode_offer(fields: &BTreeMap<String, Value>) -> OfferDetails {
    OfferDetails {
        salary: fields
            .get("salary")
            .and_then(Value::as_str)
            .unwrap_or_default()
            .to_string(),
        benefits: decode_strings(fields.get("benefits")),
        joining_date: fields
            .get("joiningDate")
            .and_then(Value::as_str)
            .unwrap_or_default()
            .to_string(),
    }
}

fn decode_strings(value: Option<&Value>) -> Vec<String> {
    value
        .and_then(Value::as_array)
        .map(|values| {
            values
                .iter()
                .filter_map(Value::as_str)
                .map(str::to_string)
                .collect()
        })
        .unwrap_or_default()
}

/// Document ids are the last segment of the full resource name.
fn document_id(name: &str) -> String {
    name.rsplit('/').next().unwrap_or(name).to_string()
}

fn build_query(status: Option<ApplicationStatus>) -> serde_json::Value {
    let mut query = json!({
        "from": [{ "collectionId": COLLECTION }],
        "orderBy": [{
            "field": { "fieldPath": "applicationDate" },
            "direction": "DESCENDING",
        }],
    });
    if let Some(status) = status {
        query["where"] = json!({
            "fieldFilter": {
                "field": { "fieldPath": "status" },
                "op": "EQUAL",
                "value": { "stringValue": status.as_str() },
            }
        });
    }
    json!({ "structuredQuery": query })
}

fn mask_params(fields: &BTreeMap<String, Value>) -> String {
    fields
        .keys()
        .map(|key| format!("&updateMask.fieldPaths={}", key))
        .collect()
}

// --- Client ---

pub struct FirestoreStore {
    client: reqwest::blocking::Client,
    project_id: String,
    id_token: String,
    owner: String,
}

impl FirestoreStore {
    pub fn new(config: &Config, session: &Session) -> Self {
        Self {
            client: reqwest::blocking::Client::new(),
            project_id: config.project_id.clone(),
            id_token: session.id_token.clone(),
            owner: session.collection_owner(),
        }
    }

    fn owner_url(&self) -> String {
        format!(
            "{}/projects/{}/databases/(default)/documents/users/{}",
            FIRESTORE_BASE_URL, self.project_id, self.owner
        )
    }

    fn collection_url(&self) -> String {
        format!("{}/{}", self.owner_url(), COLLECTION)
    }

    fn run_query(&self, status: Option<ApplicationStatus>) -> Result<Vec<JobApplication>> {
        let response = self
            .client
            .post(format!("{}:runQuery", self.owner_url()))
            .bearer_auth(&self.id_token)
            .json(&build_query(status))
            .send()?;
        let response = check(response)?;

        let results: Vec<QueryResult> = response.json()?;
        let records: Vec<JobApplication> = results
            .iter()
            .filter_map(|result| result.document.as_ref())
            .map(decode_record)
            .collect();
        tracing::debug!(count = records.len(), "listed applications");
        Ok(records)
    }
}

impl ApplicationStore for FirestoreStore {
    fn list(&self) -> Result<Vec<JobApplication>> {
        self.run_query(None)
    }

    fn list_by_status(&self, status: ApplicationStatus) -> Result<Vec<JobApplication>> {
        self.run_query(Some(status))
    }

    fn create(&self, record: &JobApplication) -> Result<String> {
        let mut record = record.clone();
        if record.application_date.is_empty() {
            record.application_date = today_string();
        }

        let response = self
            .client
            .post(self.collection_url())
            .bearer_auth(&self.id_token)
            .json(&DocumentBody {
                fields: encode_record(&record),
            })
            .send()?;
        let response = check(response)?;

        let doc: Document = response.json()?;
        let id = document_id(&doc.name);
        tracing::debug!(id = %id, "created application");
        Ok(id)
    }

    fn update(&self, id: &str, record: &JobApplication) -> Result<()> {
        let fields = encode_record(record);
        let url = format!(
            "{}/{}?currentDocument.exists=true{}",
            self.collection_url(),
            id,
            mask_params(&fields)
        );
        let response = self
            .client
            .patch(url)
            .bearer_auth(&self.id_token)
            .json(&DocumentBody { fields })
            .send()?;
        check(response)?;
        tracing::debug!(id = %id, "updated application");
        Ok(())
    }

    fn delete(&self, id: &str) -> Result<()> {
        let url = format!(
            "{}/{}?currentDocument.exists=true",
            self.collection_url(),
            id
        );
        let response = self
            .client
            .delete(url)
            .bearer_auth(&self.id_token)
            .send()?;
        check(response)?;
        tracing::debug!(id = %id, "deleted application");
        Ok(())
    }
}

fn check(response: reqwest::blocking::Response) -> Result<reqwest::blocking::Response> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    let body = response.text().unwrap_or_default();
    let message = serde_json::from_str::<ApiErrorBody>(&body)
        .ok()
        .map(|parsed| parsed.error.message)
        .filter(|m| !m.is_empty())
        .unwrap_or(body);
    if status == StatusCode::UNAUTHORIZED || status == StatusCode::FORBIDDEN {
        Err(Error::Auth(format!(
            "store rejected credentials ({}): {}",
            status, message
        )))
    } else {
        Err(Error::Gateway(format!("{}: {}", status, message)))
    }
}
