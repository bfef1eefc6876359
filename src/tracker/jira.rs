use std::sync::OnceLock;
use std::time::Duration;

use chrono::NaiveDate;
use reqwest::blocking::RequestBuilder;
use reqwest::Method;
use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::{json, Value};

use crate::config::JiraConnection;
use crate::error::{ReleaseError, Result};
use crate::tracker::{Issue, IssueTracker, NewIssue, TrackerVersion, Transition};

const SEARCH_PAGE_SIZE: usize = 100;
const ISSUE_FIELDS: [&str; 4] = ["summary", "status", "issuetype", "fixVersions"];

/// Jira REST (v2) client using basic authentication.
pub struct JiraClient {
    /// `https://host`
    server: String,

    user: String,

    /// API token used as the basic-auth password
    token: String,

    client: reqwest::blocking::Client,

    /// Issue link types, fetched on first link
    link_types: OnceLock<Vec<LinkType>>,
}

#[derive(Debug, Clone, Deserialize)]
struct LinkType {
    name: String,
    inward: String,
    outward: String,
}

#[derive(Debug, Deserialize)]
struct LinkTypesResponse {
    #[serde(rename = "issueLinkTypes")]
    issue_link_types: Vec<LinkType>,
}

#[derive(Debug, Deserialize)]
struct SearchResponse {
    #[serde(default)]
    issues: Vec<IssueResponse>,
    #[serde(default)]
    total: usize,
}

#[derive(Debug, Deserialize)]
struct IssueResponse {
    key: String,
    fields: IssueFields,
}

#[derive(Debug, Deserialize)]
struct IssueFields {
    #[serde(default)]
    summary: String,
    status: Option<Named>,
    issuetype: Option<Named>,
    #[serde(rename = "fixVersions", default)]
    fix_versions: Vec<VersionResponse>,
}

#[derive(Debug, Deserialize)]
struct Named {
    name: String,
}

#[derive(Debug, Deserialize)]
struct VersionResponse {
    id: String,
    name: String,
    #[serde(default)]
    released: bool,
}

#[derive(Debug, Deserialize)]
struct CreatedIssue {
    key: String,
}

#[derive(Debug, Deserialize)]
struct TransitionsResponse {
    transitions: Vec<TransitionResponse>,
}

#[derive(Debug, Deserialize)]
struct TransitionResponse {
    id: String,
    name: String,
    to: Option<Named>,
}

impl From<VersionResponse> for TrackerVersion {
    fn from(v: VersionResponse) -> Self {
        TrackerVersion {
            id: v.id,
            name: v.name,
            released: v.released,
        }
    }
}

impl From<IssueResponse> for Issue {
    fn from(issue: IssueResponse) -> Self {
        let fields = issue.fields;
        Issue {
            key: issue.key,
            summary: fields.summary,
            status: fields.status.map(|s| s.name).unwrap_or_default(),
            issue_type: fields.issuetype.map(|t| t.name).unwrap_or_default(),
            fix_versions: fields.fix_versions.into_iter().map(Into::into).collect(),
        }
    }
}

impl JiraClient {
    pub fn connect(connection: &JiraConnection) -> Result<Self> {
        let client = reqwest::blocking::Client::builder()
            .timeout(Duration::from_secs(30))
            .user_agent(format!("release-tool/{}", env!("CARGO_PKG_VERSION")))
            .build()?;

        Ok(JiraClient {
            server: connection.server_url(),
            user: connection.user.clone(),
            token: connection.token.clone(),
            client,
            link_types: OnceLock::new(),
        })
    }

    fn request(&self, method: Method, path: &str) -> (String, RequestBuilder) {
        let url = format!("{}/rest/api/2{}", self.server, path);
        tracing::debug!(%method, %url, "jira request");
        let builder = self
            .client
            .request(method, &url)
            .basic_auth(&self.user, Some(&self.token))
            .header("Accept", "application/json");
        (url, builder)
    }

    fn send(&self, url: &str, builder: RequestBuilder) -> Result<reqwest::blocking::Response> {
        let response = builder.send()?;
        let status = response.status();
        if status.is_success() {
            Ok(response)
        } else {
            let message = response
                .text()
                .unwrap_or_else(|_| "Unknown error".to_string());
            Err(ReleaseError::tracker(format!(
                "{} returned {}: {}",
                url,
                status.as_u16(),
                message
            )))
        }
    }

    fn call<T: DeserializeOwned>(
        &self,
        method: Method,
        path: &str,
        body: Option<Value>,
    ) -> Result<T> {
        let (url, mut builder) = self.request(method, path);
        if let Some(body) = body {
            builder = builder.json(&body);
        }
        self.send(&url, builder)?
            .json()
            .map_err(|e| ReleaseError::tracker(format!("Invalid response from {}: {}", url, e)))
    }

    /// Like [Self::call] for endpoints answering with no body
    fn call_empty(&self, method: Method, path: &str, body: Value) -> Result<()> {
        let (url, builder) = self.request(method, path);
        self.send(&url, builder.json(&body))?;
        Ok(())
    }

    fn link_types(&self) -> Result<&[LinkType]> {
        if let Some(types) = self.link_types.get() {
            return Ok(types);
        }
        let response: LinkTypesResponse = self.call(Method::GET, "/issueLinkType", None)?;
        Ok(self.link_types.get_or_init(|| response.issue_link_types))
    }
}

/// Resolve a configured link type (name, outward or inward description) to
/// the link type name and whether inward/outward issues must be swapped.
fn resolve_link_type(types: &[LinkType], configured: &str) -> (String, bool) {
    for link_type in types {
        if link_type.name.eq_ignore_ascii_case(configured)
            || link_type.outward.eq_ignore_ascii_case(configured)
        {
            return (link_type.name.clone(), false);
        }
        if link_type.inward.eq_ignore_ascii_case(configured) {
            return (link_type.name.clone(), true);
        }
    }
    (configured.to_string(), false)
}

impl IssueTracker for JiraClient {
    fn search_issues(&self, jql: &str) -> Result<Vec<Issue>> {
        let mut issues = Vec::new();
        loop {
            let page: SearchResponse = self.call(
                Method::POST,
                "/search",
                Some(json!({
                    "jql": jql,
                    "startAt": issues.len(),
                    "maxResults": SEARCH_PAGE_SIZE,
                    "fields": ISSUE_FIELDS,
                })),
            )?;
            let fetched = page.issues.len();
            issues.extend(page.issues.into_iter().map(Issue::from));
            if fetched == 0 || issues.len() >= page.total {
                break;
            }
        }
        tracing::debug!(jql, found = issues.len(), "jira search");
        Ok(issues)
    }

    fn issue(&self, key: &str) -> Result<Issue> {
        let issue: IssueResponse = self.call(
            Method::GET,
            &format!("/issue/{}?fields={}", key, ISSUE_FIELDS.join(",")),
            None,
        )?;
        Ok(issue.into())
    }

    fn create_issue(&self, issue: &NewIssue) -> Result<String> {
        let mut fields = json!({
            "project": { "key": issue.project },
            "summary": issue.summary,
            "issuetype": { "name": issue.issue_type },
        });
        if let Some(component) = &issue.component {
            fields["components"] = json!([{ "name": component }]);
        }
        let created: CreatedIssue =
            self.call(Method::POST, "/issue", Some(json!({ "fields": fields })))?;
        Ok(created.key)
    }

    fn create_issue_link(&self, link_type: &str, parent: &str, child: &str) -> Result<()> {
        let (name, swap) = resolve_link_type(self.link_types()?, link_type);
        let (inward, outward) = if swap { (child, parent) } else { (parent, child) };
        self.call_empty(
            Method::POST,
            "/issueLink",
            json!({
                "type": { "name": name },
                "inwardIssue": { "key": inward },
                "outwardIssue": { "key": outward },
            }),
        )
    }

    fn project_versions(&self, project: &str) -> Result<Vec<TrackerVersion>> {
        let versions: Vec<VersionResponse> =
            self.call(Method::GET, &format!("/project/{}/versions", project), None)?;
        Ok(versions.into_iter().map(Into::into).collect())
    }

    fn create_version(
        &self,
        project: &str,
        name: &str,
        start_date: NaiveDate,
    ) -> Result<TrackerVersion> {
        let version: VersionResponse = self.call(
            Method::POST,
            "/version",
            Some(json!({
                "name": name,
                "project": project,
                "startDate": start_date.format("%Y-%m-%d").to_string(),
            })),
        )?;
        Ok(version.into())
    }

    fn add_fix_version(&self, key: &str, version: &TrackerVersion) -> Result<()> {
        self.call_empty(
            Method::PUT,
            &format!("/issue/{}", key),
            json!({ "update": { "fixVersions": [{ "add": { "id": version.id } }] } }),
        )
    }

    fn release_version(&self, version: &TrackerVersion, release_date: NaiveDate) -> Result<()> {
        self.call_empty(
            Method::PUT,
            &format!("/version/{}", version.id),
            json!({
                "released": true,
                "releaseDate": release_date.format("%Y-%m-%d").to_string(),
            }),
        )
    }

    fn transitions(&self, key: &str) -> Result<Vec<Transition>> {
        let response: TransitionsResponse =
            self.call(Method::GET, &format!("/issue/{}/transitions", key), None)?;
        Ok(response
            .transitions
            .into_iter()
            .map(|t| Transition {
                id: t.id,
                name: t.name,
                to_status: t.to.map(|s| s.name).unwrap_or_default(),
            })
            .collect())
    }

    fn transition_issue(&self, key: &str, transition_id: &str) -> Result<()> {
        self.call_empty(
            Method::POST,
            &format!("/issue/{}/transitions", key),
            json!({ "transition": { "id": transition_id } }),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn link_types() -> Vec<LinkType> {
        vec![
            LinkType {
                name: "Relates".to_string(),
                inward: "relates to".to_string(),
                outward: "relates to".to_string(),
            },
            LinkType {
                name: "Hierarchy".to_string(),
                inward: "child of".to_string(),
                outward: "parent of".to_string(),
            },
        ]
    }

    #[test]
    fn test_link_type_by_outward_description() {
        assert_eq!(
            resolve_link_type(&link_types(), "parent of"),
            ("Hierarchy".to_string(), false)
        );
    }

    #[test]
    fn test_link_type_by_inward_description_swaps() {
        assert_eq!(
            resolve_link_type(&link_types(), "Child Of"),
            ("Hierarchy".to_string(), true)
        );
    }

    #[test]
    fn test_link_type_by_name() {
        assert_eq!(
            resolve_link_type(&link_types(), "relates"),
            ("Relates".to_string(), false)
        );
    }

    #[test]
    fn test_unknown_link_type_passes_through() {
        assert_eq!(
            resolve_link_type(&link_types(), "Blocks"),
            ("Blocks".to_string(), false)
        );
    }

    #[test]
    fn test_issue_response_conversion() {
        let raw = r#"{
            "key": "PROJ-7",
            "fields": {
                "summary": "Backend release 1.3.0",
                "status": {"name": "On Production"},
                "issuetype": {"name": "Task"},
                "fixVersions": [{"id": "10", "name": "Release", "released": false}]
            }
        }"#;
        let issue: Issue = serde_json::from_str::<IssueResponse>(raw).unwrap().into();
        assert_eq!(issue.key, "PROJ-7");
        assert_eq!(issue.status, "On Production");
        assert_eq!(issue.issue_type, "Task");
        assert_eq!(issue.fix_versions.len(), 1);
        assert!(!issue.fix_versions[0].released);
    }

    #[test]
    fn test_connect_adds_scheme() {
        let connection = JiraConnection {
            server: "jira.example.com".to_string(),
            user: "bot".to_string(),
            token: "secret".to_string(),
        };
        let client = JiraClient::connect(&connection).unwrap();
        assert_eq!(client.server, "https://jira.example.com");
    }
}
