//! Reference HTTP server for the autenv ALM protocol.
//!
//! Implements the routes `HttpAlmClient` speaks: session authentication,
//! parameters-folder lookup, configuration creation, and parameter
//! read/write. State is in-memory: seeded users and AUT environments,
//! issued sessions, and configurations with their parameter values.
//!
//! The [`TestServer`] helper starts a server on a random port for
//! integration testing.

use serde::Deserialize;
use std::collections::{BTreeMap, HashMap, HashSet};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, RwLock};
use tiny_http::{Header, Method, Response, Server, StatusCode};
use tracing::{debug, info};

/// In-memory ALM state.
#[derive(Default)]
pub struct Store {
    /// username -> password
    users: RwLock<HashMap<String, String>>,
    /// AUT environment id -> parameters folder id
    environments: RwLock<HashMap<String, String>>,
    sessions: RwLock<HashSet<String>>,
    /// configuration id -> stored parameter values
    configurations: RwLock<HashMap<String, BTreeMap<String, String>>>,
    /// parameter name -> rejection reason for update calls
    rejections: RwLock<HashMap<String, String>>,
    next_session: AtomicU64,
    next_configuration: AtomicU64,
}

impl Store {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_user(&self, username: &str, password: &str) {
        self.users
            .write()
            .expect("users lock poisoned")
            .insert(username.to_owned(), password.to_owned());
    }

    pub fn add_environment(&self, env_id: &str, folder_id: &str) {
        self.environments
            .write()
            .expect("environments lock poisoned")
            .insert(env_id.to_owned(), folder_id.to_owned());
    }

    /// Seed an existing configuration.
    pub fn add_configuration(&self, conf_id: &str) {
        self.configurations
            .write()
            .expect("configurations lock poisoned")
            .insert(conf_id.to_owned(), BTreeMap::new());
    }

    /// Refuse updates of the named parameter with the given reason.
    pub fn reject_parameter(&self, name: &str, reason: &str) {
        self.rejections
            .write()
            .expect("rejections lock poisoned")
            .insert(name.to_owned(), reason.to_owned());
    }

    pub fn authenticate(&self, username: &str, password: &str) -> Option<String> {
        let users = self.users.read().expect("users lock poisoned");
        if users.get(username).map(String::as_str) != Some(password) {
            return None;
        }
        let token = format!("s-{}", self.next_session.fetch_add(1, Ordering::SeqCst) + 1);
        self.sessions
            .write()
            .expect("sessions lock poisoned")
            .insert(token.clone());
        Some(token)
    }

    pub fn is_valid_session(&self, token: &str) -> bool {
        self.sessions
            .read()
            .expect("sessions lock poisoned")
            .contains(token)
    }

    pub fn folder_id(&self, env_id: &str) -> Option<String> {
        self.environments
            .read()
            .expect("environments lock poisoned")
            .get(env_id)
            .cloned()
    }

    /// Create a configuration under an environment; `None` if the
    /// environment is unknown.
    pub fn create_configuration(&self, env_id: &str) -> Option<String> {
        if self.folder_id(env_id).is_none() {
            return None;
        }
        let id = format!(
            "conf_{}",
            self.next_configuration.fetch_add(1, Ordering::SeqCst) + 1
        );
        self.add_configuration(&id);
        Some(id)
    }

    pub fn parameter_values(&self, conf_id: &str) -> Option<BTreeMap<String, String>> {
        self.configurations
            .read()
            .expect("configurations lock poisoned")
            .get(conf_id)
            .cloned()
    }

    /// Apply values; per-name outcome `(name, accepted, reason)`.
    /// `None` if the configuration is unknown.
    pub fn set_parameter_values(
        &self,
        conf_id: &str,
        values: &BTreeMap<String, String>,
    ) -> Option<Vec<(String, bool, Option<String>)>> {
        let rejections = self
            .rejections
            .read()
            .expect("rejections lock poisoned")
            .clone();
        let mut configurations = self
            .configurations
            .write()
            .expect("configurations lock poisoned");
        let stored = configurations.get_mut(conf_id)?;

        let mut outcomes = Vec::with_capacity(values.len());
        for (name, value) in values {
            if let Some(reason) = rejections.get(name) {
                outcomes.push((name.clone(), false, Some(reason.clone())));
            } else {
                stored.insert(name.clone(), value.clone());
                outcomes.push((name.clone(), true, None));
            }
        }
        Some(outcomes)
    }
}

/// Parse `/aut-environments/{env}/parameters-folder`.
pub fn parse_folder_route(path: &str) -> Option<&str> {
    let rest = path.strip_prefix("/aut-environments/")?;
    let (env_id, tail) = rest.split_once('/')?;
    if tail == "parameters-folder" && !env_id.is_empty() {
        Some(env_id)
    } else {
        None
    }
}

/// Parse `/aut-environments/{env}/configurations`.
pub fn parse_create_route(path: &str) -> Option<&str> {
    let rest = path.strip_prefix("/aut-environments/")?;
    let (env_id, tail) = rest.split_once('/')?;
    if tail == "configurations" && !env_id.is_empty() {
        Some(env_id)
    } else {
        None
    }
}

/// Parse `/configurations/{conf}/folders/{folder}/parameters`.
pub fn parse_parameters_route(path: &str) -> Option<(&str, &str)> {
    let rest = path.strip_prefix("/configurations/")?;
    let (conf_id, tail) = rest.split_once("/folders/")?;
    let (folder_id, end) = tail.split_once('/')?;
    if end == "parameters" && !conf_id.is_empty() && !folder_id.is_empty() {
        Some((conf_id, folder_id))
    } else {
        None
    }
}

fn read_body(req: &mut tiny_http::Request) -> Option<Vec<u8>> {
    use std::io::Read;
    let mut body = Vec::new();
    req.as_reader().read_to_end(&mut body).ok()?;
    Some(body)
}

fn respond_json(req: tiny_http::Request, data: Vec<u8>) {
    let header = Header::from_bytes(&b"Content-Type"[..], &b"application/json"[..])
        .expect("static header");
    let _ = req.respond(Response::from_data(data).with_header(header));
}

fn respond_err(req: tiny_http::Request, code: u16, msg: &str) {
    let _ = req.respond(Response::from_string(msg).with_status_code(StatusCode(code)));
}

fn session_token(req: &tiny_http::Request) -> Option<String> {
    req.headers()
        .iter()
        .find(|h| h.field.equiv("X-Alm-Session"))
        .map(|h| h.value.as_str().to_owned())
}

#[derive(Deserialize)]
struct AuthBody {
    username: String,
    password: String,
    #[serde(default)]
    domain: String,
    #[serde(default)]
    project: String,
}

#[derive(Deserialize)]
struct CreateBody {
    name: String,
}

#[derive(Deserialize)]
struct ValuesBody {
    values: BTreeMap<String, String>,
}

fn handle_authenticate(store: &Store, mut req: tiny_http::Request) {
    let Some(body) = read_body(&mut req) else {
        respond_err(req, 500, "read error");
        return;
    };
    let Ok(auth) = serde_json::from_slice::<AuthBody>(&body) else {
        respond_err(req, 400, "malformed authentication payload");
        return;
    };
    match store.authenticate(&auth.username, &auth.password) {
        Some(token) => {
            info!(
                "authenticated '{}' for {}/{}",
                auth.username, auth.domain, auth.project
            );
            let payload = serde_json::json!({ "session_id": token });
            respond_json(req, payload.to_string().into_bytes());
        }
        None => {
            info!("rejected credentials for '{}'", auth.username);
            respond_err(req, 401, "invalid credentials");
        }
    }
}

fn handle_create(store: &Store, mut req: tiny_http::Request, env_id: &str) {
    let Some(body) = read_body(&mut req) else {
        respond_err(req, 500, "read error");
        return;
    };
    let Ok(create) = serde_json::from_slice::<CreateBody>(&body) else {
        respond_err(req, 400, "malformed create payload");
        return;
    };
    match store.create_configuration(env_id) {
        Some(id) => {
            info!("created configuration '{id}' ('{}') under '{env_id}'", create.name);
            let payload = serde_json::json!({ "configuration_id": id });
            respond_json(req, payload.to_string().into_bytes());
        }
        None => respond_err(req, 404, "unknown AUT environment"),
    }
}

fn handle_parameters(
    store: &Store,
    mut req: tiny_http::Request,
    method: &Method,
    conf_id: &str,
) {
    match *method {
        Method::Get => match store.parameter_values(conf_id) {
            Some(values) => {
                let payload = serde_json::json!({ "values": values });
                respond_json(req, payload.to_string().into_bytes());
            }
            None => respond_err(req, 404, "unknown configuration"),
        },
        Method::Put => {
            let Some(body) = read_body(&mut req) else {
                respond_err(req, 500, "read error");
                return;
            };
            let Ok(update) = serde_json::from_slice::<ValuesBody>(&body) else {
                respond_err(req, 400, "malformed values payload");
                return;
            };
            match store.set_parameter_values(conf_id, &update.values) {
                Some(outcomes) => {
                    let results: Vec<serde_json::Value> = outcomes
                        .into_iter()
                        .map(|(name, accepted, reason)| match reason {
                            Some(reason) => serde_json::json!({
                                "name": name, "accepted": accepted, "reason": reason,
                            }),
                            None => serde_json::json!({ "name": name, "accepted": accepted }),
                        })
                        .collect();
                    let payload = serde_json::json!({ "results": results });
                    respond_json(req, payload.to_string().into_bytes());
                }
                None => respond_err(req, 404, "unknown configuration"),
            }
        }
        _ => respond_err(req, 405, "method not allowed"),
    }
}

/// Handle a single HTTP request, dispatching to the appropriate route handler.
pub fn handle_request(store: &Store, req: tiny_http::Request) {
    let method = req.method().clone();
    let url = req.url().to_owned();
    debug!("{method} {url}");

    if url == "/authentication-point/authenticate" && method == Method::Post {
        handle_authenticate(store, req);
        return;
    }
    if url == "/health" && method == Method::Get {
        let _ = req.respond(Response::from_string(r#"{"status":"ok"}"#));
        return;
    }

    // Everything below requires a valid session.
    match session_token(&req) {
        Some(token) if store.is_valid_session(&token) => {}
        _ => {
            respond_err(req, 401, "missing or invalid session");
            return;
        }
    }

    if let Some(env_id) = parse_folder_route(&url) {
        if method == Method::Get {
            match store.folder_id(env_id) {
                Some(folder_id) => {
                    let payload = serde_json::json!({ "folder_id": folder_id });
                    respond_json(req, payload.to_string().into_bytes());
                }
                None => respond_err(req, 404, "unknown AUT environment"),
            }
        } else {
            respond_err(req, 405, "method not allowed");
        }
    } else if let Some(env_id) = parse_create_route(&url) {
        if method == Method::Post {
            let env_id = env_id.to_owned();
            handle_create(store, req, &env_id);
        } else {
            respond_err(req, 405, "method not allowed");
        }
    } else if let Some((conf_id, _folder_id)) = parse_parameters_route(&url) {
        let conf_id = conf_id.to_owned();
        handle_parameters(store, req, &method, &conf_id);
    } else {
        respond_err(req, 404, "not found");
    }
}

/// Start the server loop, blocking the current thread.
pub fn run_server(store: &Arc<Store>, addr: &str) {
    let server = Server::http(addr).expect("failed to bind HTTP server");
    for request in server.incoming_requests() {
        handle_request(store, request);
    }
}

/// A test helper that starts an autenv-server on a random port in a
/// background thread. Drop the `TestServer` to stop serving.
pub struct TestServer {
    pub url: String,
    pub port: u16,
    pub store: Arc<Store>,
    _server: Arc<Server>,
    _handle: std::thread::JoinHandle<()>,
}

impl TestServer {
    /// Start a test server over the given store. Binds `127.0.0.1:0`.
    pub fn start(store: Arc<Store>) -> Self {
        let server =
            Arc::new(Server::http("127.0.0.1:0").expect("failed to bind test HTTP server"));
        let port = server.server_addr().to_ip().expect("not an IP addr").port();
        let url = format!("http://127.0.0.1:{port}");

        let serving = Arc::clone(&store);
        let srv = Arc::clone(&server);
        let handle = std::thread::spawn(move || {
            for request in srv.incoming_requests() {
                handle_request(&serving, request);
            }
        });

        Self {
            url,
            port,
            store,
            _server: server,
            _handle: handle,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_folder_route_with_env() {
        assert_eq!(
            parse_folder_route("/aut-environments/1001/parameters-folder"),
            Some("1001")
        );
    }

    #[test]
    fn parse_folder_route_rejects_other_paths() {
        assert!(parse_folder_route("/aut-environments/1001/configurations").is_none());
        assert!(parse_folder_route("/aut-environments//parameters-folder").is_none());
        assert!(parse_folder_route("/other/1001/parameters-folder").is_none());
    }

    #[test]
    fn parse_create_route_with_env() {
        assert_eq!(
            parse_create_route("/aut-environments/1001/configurations"),
            Some("1001")
        );
    }

    #[test]
    fn parse_parameters_route_with_ids() {
        assert_eq!(
            parse_parameters_route("/configurations/conf_1/folders/folder_9/parameters"),
            Some(("conf_1", "folder_9"))
        );
    }

    #[test]
    fn parse_parameters_route_rejects_incomplete_paths() {
        assert!(parse_parameters_route("/configurations/conf_1/folders/folder_9").is_none());
        assert!(parse_parameters_route("/configurations//folders/f/parameters").is_none());
    }

    #[test]
    fn store_authentication_issues_distinct_sessions() {
        let store = Store::new();
        store.add_user("builder", "pw");

        let s1 = store.authenticate("builder", "pw").unwrap();
        let s2 = store.authenticate("builder", "pw").unwrap();
        assert_ne!(s1, s2);
        assert!(store.is_valid_session(&s1));
        assert!(!store.is_valid_session("s-bogus"));
        assert!(store.authenticate("builder", "wrong").is_none());
    }

    #[test]
    fn store_configuration_lifecycle() {
        let store = Store::new();
        store.add_environment("1001", "folder_1");

        assert!(store.create_configuration("nope").is_none());
        let conf = store.create_configuration("1001").unwrap();

        let mut values = BTreeMap::new();
        values.insert("Browser".to_owned(), "Chrome".to_owned());
        let outcomes = store.set_parameter_values(&conf, &values).unwrap();
        assert!(outcomes.iter().all(|(_, accepted, _)| *accepted));
        assert_eq!(
            store.parameter_values(&conf).unwrap().get("Browser").unwrap(),
            "Chrome"
        );
    }

    #[test]
    fn store_rejection_list_is_per_name() {
        let store = Store::new();
        store.add_environment("1001", "folder_1");
        store.reject_parameter("Locked", "read-only");
        let conf = store.create_configuration("1001").unwrap();

        let mut values = BTreeMap::new();
        values.insert("Locked".to_owned(), "x".to_owned());
        values.insert("Open".to_owned(), "y".to_owned());
        let outcomes = store.set_parameter_values(&conf, &values).unwrap();
        assert_eq!(outcomes.iter().filter(|(_, a, _)| *a).count(), 1);
        assert_eq!(outcomes.iter().filter(|(_, a, _)| !*a).count(), 1);
    }
}
