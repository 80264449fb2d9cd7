//! Conduit client used to talk to Phabricator.
//!
//! Every call is a form-encoded POST to `<endpoint>/<method>` carrying the
//! JSON parameters; responses come back in a `{result, error_code,
//! error_info}` envelope.

use log::debug;
use serde::Deserialize;
use serde_json::{json, Map, Value};

use crate::diff_id::DiffId;
use crate::error::{PhabciError, Result};
use crate::model::TestResult;

pub const UPDATE_UNIT_RESULTS: &str = "differential.updateunitresults";

const CLIENT_NAME: &str = "Continuous Builder Client";
const CLIENT_VERSION: &str = "1.0";
const CLIENT_DESCRIPTION: &str = "Test updater for Jenkins";

/// Anything able to execute a Conduit method.
pub trait Conduit {
    fn call(&self, method: &str, params: Value) -> Result<Value>;
}

/// Identity used for the `conduit.connect` handshake.
#[derive(Clone)]
pub struct Credentials {
    pub user: String,
    pub certificate: String,
}

impl std::fmt::Debug for Credentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Credentials")
            .field("user", &self.user)
            .field("certificate", &"<redacted>")
            .finish()
    }
}

#[derive(Debug, Clone, Deserialize)]
struct Session {
    #[serde(rename = "sessionKey")]
    session_key: String,
    #[serde(rename = "connectionID")]
    connection_id: Value,
}

#[derive(Debug, Deserialize)]
struct Envelope {
    #[serde(default)]
    result: Value,
    error_code: Option<String>,
    error_info: Option<String>,
}

/// Blocking HTTP Conduit client holding an authenticated session.
pub struct ConduitClient {
    agent: ureq::Agent,
    endpoint: String,
    session: Option<Session>,
}

impl ConduitClient {
    pub fn new(endpoint: &str) -> Self {
        Self {
            agent: ureq::AgentBuilder::new().user_agent("phabci").build(),
            endpoint: endpoint.trim_end_matches('/').to_string(),
            session: None,
        }
    }

    /// Create a client and authenticate it with `conduit.connect`.
    pub fn connect(endpoint: &str, credentials: &Credentials) -> Result<Self> {
        let mut client = Self::new(endpoint);
        let result = client.call(
            "conduit.connect",
            json!({
                "client": CLIENT_NAME,
                "clientVersion": CLIENT_VERSION,
                "clientDescription": CLIENT_DESCRIPTION,
                "user": credentials.user,
                "certificate": credentials.certificate,
            }),
        )?;
        client.session = Some(serde_json::from_value(result)?);
        debug!("Connected to {} as {}", client.endpoint, credentials.user);
        Ok(client)
    }

    fn method_url(&self, method: &str) -> String {
        format!("{}/{}", self.endpoint, method)
    }

    fn encode_params(&self, params: Value) -> Result<String> {
        let mut params = match params {
            Value::Object(map) => map,
            Value::Null => Map::new(),
            other => {
                return Err(PhabciError::Parse(format!(
                    "Conduit parameters must be an object, got {other}"
                )))
            }
        };
        if let Some(session) = &self.session {
            params.insert(
                "__conduit__".to_string(),
                json!({
                    "sessionKey": session.session_key,
                    "connectionID": session.connection_id,
                }),
            );
        }
        Ok(serde_json::to_string(&params)?)
    }
}

impl Conduit for ConduitClient {
    fn call(&self, method: &str, params: Value) -> Result<Value> {
        let encoded = self.encode_params(params)?;
        let resp = self.agent.post(&self.method_url(method)).send_form(&[
            ("params", encoded.as_str()),
            ("output", "json"),
            ("__conduit__", "1"),
        ])?;
        let envelope: Envelope = resp.into_json()?;
        unwrap_envelope(method, envelope)
    }
}

fn unwrap_envelope(method: &str, envelope: Envelope) -> Result<Value> {
    match envelope.error_code {
        Some(code) => Err(PhabciError::Conduit {
            method: method.to_string(),
            code,
            info: envelope.error_info.unwrap_or_default(),
        }),
        None => Ok(envelope.result),
    }
}

/// Parameters for a `differential.updateunitresults` call.
pub fn unit_result_params(diff_id: &DiffId, result: &TestResult) -> Value {
    let mut params = json!({
        "diff_id": diff_id.as_str(),
        "file": result.file(),
        "name": result.name,
        "result": result.status.as_str(),
        "message": result.message,
    });
    if !result.coverage.is_empty() {
        params["coverage"] = json!(result.coverage);
    }
    params
}

/// Attach one result to the diff.
pub fn update_unit_results(
    conduit: &dyn Conduit,
    diff_id: &DiffId,
    result: &TestResult,
) -> Result<Value> {
    conduit.call(UPDATE_UNIT_RESULTS, unit_result_params(diff_id, result))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{CoverageMap, Status};

    fn envelope(raw: &str) -> Envelope {
        serde_json::from_str(raw).unwrap()
    }

    #[test]
    fn test_unwrap_envelope_result() {
        let value = unwrap_envelope(
            "conduit.ping",
            envelope(r#"{"result":"pong","error_code":null,"error_info":null}"#),
        )
        .unwrap();
        assert_eq!(value, json!("pong"));
    }

    #[test]
    fn test_unwrap_envelope_error() {
        let err = unwrap_envelope(
            "differential.updateunitresults",
            envelope(r#"{"result":null,"error_code":"ERR-INVALID-SESSION","error_info":"Session key is invalid."}"#),
        )
        .unwrap_err();
        match err {
            PhabciError::Conduit { method, code, info } => {
                assert_eq!(method, "differential.updateunitresults");
                assert_eq!(code, "ERR-INVALID-SESSION");
                assert_eq!(info, "Session key is invalid.");
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_encode_params_attaches_session() {
        let mut client = ConduitClient::new("https://phabricator.example.com/api/");
        client.session = Some(Session {
            session_key: "abc".to_string(),
            connection_id: json!(17),
        });
        let encoded = client.encode_params(json!({"diff_id": "1"})).unwrap();
        let decoded: Value = serde_json::from_str(&encoded).unwrap();

        assert_eq!(decoded["diff_id"], "1");
        assert_eq!(decoded["__conduit__"]["sessionKey"], "abc");
        assert_eq!(decoded["__conduit__"]["connectionID"], 17);
        assert_eq!(
            client.method_url("conduit.connect"),
            "https://phabricator.example.com/api/conduit.connect"
        );
    }

    #[test]
    fn test_encode_params_rejects_non_object() {
        let client = ConduitClient::new("https://phabricator.example.com/api");
        assert!(client.encode_params(json!([1, 2])).is_err());
    }

    #[test]
    fn test_unit_result_params() {
        let id: DiffId = "99".parse().unwrap();
        let mut coverage = CoverageMap::new();
        coverage.insert("a.java".to_string(), "CN".to_string());
        let result = TestResult::new("build", Status::Fail)
            .with_message("build broke")
            .with_coverage(coverage);

        let params = unit_result_params(&id, &result);
        assert_eq!(params["diff_id"], "99");
        assert_eq!(params["file"], "build");
        assert_eq!(params["name"], "build");
        assert_eq!(params["result"], "fail");
        assert_eq!(params["message"], "build broke");
        assert_eq!(params["coverage"]["a.java"], "CN");
    }

    #[test]
    fn test_unit_result_params_omit_empty_coverage() {
        let id: DiffId = "99".parse().unwrap();
        let params = unit_result_params(&id, &TestResult::new("build", Status::Pass));
        assert!(params.get("coverage").is_none());
    }

    #[test]
    fn test_credentials_debug_redacts_certificate() {
        let creds = Credentials {
            user: "svcscm".to_string(),
            certificate: "s3cret".to_string(),
        };
        let shown = format!("{creds:?}");
        assert!(shown.contains("svcscm"));
        assert!(!shown.contains("s3cret"));
    }
}
