use crate::{Client, Error};
use chrono::{DateTime, TimeZone, Utc};
use serde::{Deserialize, Deserializer, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Project {
    pub id: String,
    pub name: String,
    pub region: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cloud_provider: Option<String>,
    #[serde(
        default,
        deserialize_with = "lenient_timestamp",
        serialize_with = "chrono::serde::ts_seconds_option::serialize",
        skip_serializing_if = "Option::is_none"
    )]
    pub created_at: Option<DateTime<Utc>>,
    #[serde(
        default,
        deserialize_with = "lenient_timestamp",
        serialize_with = "chrono::serde::ts_seconds_option::serialize",
        skip_serializing_if = "Option::is_none"
    )]
    pub updated_at: Option<DateTime<Utc>>,
}

/// Accepts unix seconds (integer or fractional), numeric strings and RFC 3339
/// strings. Anything else decodes to `None` rather than failing the listing.
fn lenient_timestamp<'de, D>(de: D) -> Result<Option<DateTime<Utc>>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<serde_json::Value>::deserialize(de)?;
    Ok(value.as_ref().and_then(timestamp_from_value))
}

fn timestamp_from_value(value: &serde_json::Value) -> Option<DateTime<Utc>> {
    use serde_json::Value;
    match value {
        Value::Number(n) => match n.as_i64() {
            Some(secs) => Utc.timestamp_opt(secs, 0).single(),
            None => timestamp_from_f64(n.as_f64()?),
        },
        Value::String(s) => match s.trim().parse::<f64>() {
            Ok(secs) => timestamp_from_f64(secs),
            Err(_) => DateTime::parse_from_rfc3339(s.trim())
                .ok()
                .map(|t| t.with_timezone(&Utc)),
        },
        _ => None,
    }
}

fn timestamp_from_f64(secs: f64) -> Option<DateTime<Utc>> {
    if !secs.is_finite() {
        return None;
    }
    let whole = secs.floor();
    let nanos = ((secs - whole) * 1e9).round().min(999_999_999.) as u32;
    Utc.timestamp_opt(whole as i64, nanos).single()
}

#[derive(Debug, Deserialize)]
struct ApiError {
    #[serde(default)]
    message: String,
}

/// The `/projects` response envelope.
#[derive(Debug, Deserialize)]
struct ProjectList {
    #[serde(default)]
    status: Option<String>,
    #[serde(default)]
    error: Option<ApiError>,
    #[serde(default)]
    projects: Option<Vec<Project>>,
}

impl ProjectList {
    fn into_projects(self) -> crate::Result<Vec<Project>> {
        if let Some(ApiError { message }) = self.error {
            return Err(Error::Api(message));
        }
        if self.status.as_deref() == Some("error") {
            return Err(Error::Api("server returned status 'error'".into()));
        }
        self.projects
            .ok_or_else(|| Error::Api("response has no 'projects' field".into()))
    }
}

impl Client {
    /// Lists up to `limit` projects of the authenticated account, starting at `start_index`.
    pub async fn list_projects(
        &self,
        start_index: u32,
        limit: u32,
    ) -> crate::Result<Vec<Project>> {
        let query = [
            ("startIndex", start_index.to_string()),
            ("projectsLimit", limit.to_string()),
        ];
        self.get::<ProjectList>("/projects", &query)
            .await?
            .into_projects()
    }
}

/// Finds the single project with the given name and region.
///
/// Zero matches and multiple matches are both errors; the listing is never
/// resolved by position.
pub fn find_project<'a>(
    projects: &'a [Project],
    name: &str,
    region: &str,
) -> crate::Result<&'a Project> {
    let mut matches = projects
        .iter()
        .filter(|p| p.name == name && p.region == region);
    match (matches.next(), matches.next()) {
        (Some(project), None) => Ok(project),
        (None, _) => Err(Error::ProjectNotFound {
            name: name.to_owned(),
            region: region.to_owned(),
        }),
        (Some(first), Some(second)) => {
            let ids = [first, second]
                .into_iter()
                .chain(matches)
                .map(|p| p.id.clone())
                .collect();
            Err(Error::AmbiguousProject {
                name: name.to_owned(),
                region: region.to_owned(),
                ids,
            })
        }
    }
}
