use crate::config::ClientConfig;
use crate::{AlmClient, ClientError, Session, UpdateOutcome};
use autenv_schema::{AlmConnection, ConfigurationId, EnvironmentId, FolderId};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use std::collections::BTreeMap;
use std::io::Read;

/// Header carrying the session token on every authenticated request.
pub const SESSION_HEADER: &str = "X-Alm-Session";

/// HTTP-based ALM client.
///
/// Speaks the REST shape of the reference server:
/// - `POST /authentication-point/authenticate` — establish a session
/// - `GET  /aut-environments/<env>/parameters-folder` — folder lookup
/// - `POST /aut-environments/<env>/configurations` — create configuration
/// - `GET  /configurations/<conf>/folders/<folder>/parameters` — read values
/// - `PUT  /configurations/<conf>/folders/<folder>/parameters` — write values
pub struct HttpAlmClient {
    base_url: String,
    agent: ureq::Agent,
}

#[derive(Debug, Deserialize)]
struct AuthResponse {
    session_id: String,
}

#[derive(Deserialize)]
struct FolderResponse {
    folder_id: String,
}

#[derive(Deserialize)]
struct CreateResponse {
    configuration_id: String,
}

#[derive(Deserialize)]
struct ValuesResponse {
    values: BTreeMap<String, String>,
}

#[derive(Deserialize)]
struct ResultsResponse {
    results: Vec<UpdateOutcome>,
}

impl HttpAlmClient {
    pub fn new(config: &ClientConfig) -> Self {
        let agent = ureq::Agent::new_with_config(
            ureq::Agent::config_builder()
                .timeout_global(Some(config.timeout()))
                .build(),
        );
        Self {
            base_url: config.url.clone(),
            agent,
        }
    }

    fn url(&self, path: &str) -> String {
        format!("{}{path}", self.base_url)
    }

    fn read_body(resp: ureq::http::Response<ureq::Body>) -> Result<Vec<u8>, ClientError> {
        let mut reader = resp.into_body().into_reader();
        let mut body = Vec::new();
        reader
            .read_to_end(&mut body)
            .map_err(|e| ClientError::Http(e.to_string()))?;
        Ok(body)
    }

    fn parse<T: DeserializeOwned>(body: &[u8]) -> Result<T, ClientError> {
        serde_json::from_slice(body)
            .map_err(|e| ClientError::Serialization(format!("invalid response payload: {e}")))
    }

    fn do_get(&self, url: &str, session: &Session) -> Result<Option<Vec<u8>>, ClientError> {
        tracing::debug!("GET {url}");
        let resp = match self
            .agent
            .get(url)
            .header(SESSION_HEADER, session.token())
            .call()
        {
            Ok(r) => r,
            Err(ureq::Error::StatusCode(404)) => return Ok(None),
            Err(ureq::Error::StatusCode(401)) => {
                return Err(ClientError::Unauthorized("session expired".to_owned()));
            }
            Err(ureq::Error::StatusCode(code)) => {
                return Err(ClientError::Http(format!("HTTP {code} for {url}")));
            }
            Err(e) => return Err(ClientError::Http(e.to_string())),
        };
        Self::read_body(resp).map(Some)
    }

    fn send_json(
        &self,
        method: &str,
        url: &str,
        session: Option<&Session>,
        payload: &serde_json::Value,
    ) -> Result<Vec<u8>, ClientError> {
        tracing::debug!("{method} {url}");
        let body =
            serde_json::to_vec(payload).map_err(|e| ClientError::Serialization(e.to_string()))?;
        let mut req = match method {
            "PUT" => self.agent.put(url),
            _ => self.agent.post(url),
        }
        .header("Content-Type", "application/json");
        if let Some(session) = session {
            req = req.header(SESSION_HEADER, session.token());
        }
        let resp = match req.send(&body[..]) {
            Ok(r) => r,
            Err(ureq::Error::StatusCode(401)) => {
                return Err(ClientError::Unauthorized("request rejected".to_owned()));
            }
            Err(ureq::Error::StatusCode(404)) => {
                return Err(ClientError::NotFound(url.to_owned()));
            }
            Err(ureq::Error::StatusCode(code)) => {
                return Err(ClientError::Http(format!("HTTP {code} for {url}")));
            }
            Err(e) => return Err(ClientError::Http(e.to_string())),
        };
        Self::read_body(resp)
    }
}

impl AlmClient for HttpAlmClient {
    fn authenticate(&self, connection: &AlmConnection) -> Result<Session, ClientError> {
        let url = self.url("/authentication-point/authenticate");
        let payload = serde_json::json!({
            "username": connection.username,
            "password": connection.password,
            "domain": connection.domain,
            "project": connection.project,
        });
        let body = self.send_json("POST", &url, None, &payload).map_err(|e| {
            if matches!(e, ClientError::Unauthorized(_)) {
                ClientError::Unauthorized(connection.username.clone())
            } else {
                e
            }
        })?;
        let auth: AuthResponse = Self::parse(&body)?;
        Ok(Session::new(auth.session_id))
    }

    fn parameters_folder_id(
        &self,
        session: &Session,
        environment_id: &EnvironmentId,
    ) -> Result<FolderId, ClientError> {
        let url = self.url(&format!(
            "/aut-environments/{environment_id}/parameters-folder"
        ));
        let body = self.do_get(&url, session)?.ok_or_else(|| {
            ClientError::NotFound(format!("AUT environment '{environment_id}'"))
        })?;
        let folder: FolderResponse = Self::parse(&body)?;
        Ok(FolderId::new(folder.folder_id))
    }

    fn create_configuration(
        &self,
        session: &Session,
        environment_id: &EnvironmentId,
        name: &str,
    ) -> Result<ConfigurationId, ClientError> {
        let url = self.url(&format!("/aut-environments/{environment_id}/configurations"));
        let payload = serde_json::json!({ "name": name });
        let body = self.send_json("POST", &url, Some(session), &payload)?;
        let created: CreateResponse = Self::parse(&body)?;
        Ok(ConfigurationId::new(created.configuration_id))
    }

    fn parameter_values(
        &self,
        session: &Session,
        configuration_id: &ConfigurationId,
        folder_id: &FolderId,
    ) -> Result<BTreeMap<String, String>, ClientError> {
        let url = self.url(&format!(
            "/configurations/{configuration_id}/folders/{folder_id}/parameters"
        ));
        match self.do_get(&url, session)? {
            Some(body) => {
                let values: ValuesResponse = Self::parse(&body)?;
                Ok(values.values)
            }
            // The remote treats a configuration with no stored values yet as absent.
            None => Ok(BTreeMap::new()),
        }
    }

    fn set_parameter_values(
        &self,
        session: &Session,
        configuration_id: &ConfigurationId,
        folder_id: &FolderId,
        values: &BTreeMap<String, String>,
    ) -> Result<Vec<UpdateOutcome>, ClientError> {
        let url = self.url(&format!(
            "/configurations/{configuration_id}/folders/{folder_id}/parameters"
        ));
        tracing::debug!("updating {} parameter(s)", values.len());
        let payload = serde_json::json!({ "values": values });
        let body = self.send_json("PUT", &url, Some(session), &payload)?;
        let results: ResultsResponse = Self::parse(&body)?;
        Ok(results.results)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn url_joins_base_and_path() {
        let client = HttpAlmClient::new(&ClientConfig::new("http://alm:8080"));
        assert_eq!(
            client.url("/aut-environments/1/parameters-folder"),
            "http://alm:8080/aut-environments/1/parameters-folder"
        );
    }

    #[test]
    fn parse_rejects_malformed_payload() {
        let err = HttpAlmClient::parse::<AuthResponse>(b"not json").unwrap_err();
        assert!(matches!(err, ClientError::Serialization(_)));
    }
}
