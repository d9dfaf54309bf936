//! Cloud relay credential API.
//!
//! The hosted relay issues short-lived credentials through
//! `POST {endpoint}/{key_id}/credentials/generate-ice-servers`, authenticated
//! with a bearer token. The body carries the requested lifetime in seconds and
//! the response lists ready-to-use ICE servers.

use std::time::Duration;

use reqwest::blocking::Client;
use serde::{Deserialize, Serialize};
use tracing::debug;
use url::Url;

use crate::environment::{self, EnvironmentView};
use crate::ice::IceServer;

use super::errors::RelayProviderError;
use super::{RELAY_TARGET, RelayOutcome, RelaySource, RelaySourceKind};

/// Client for the credential-generation endpoint.
pub trait RelayApiClient: Send + Sync {
    /// Requests relay entries valid for `ttl`.
    fn generate_ice_servers(
        &self,
        key_id: &str,
        api_token: &str,
        ttl: Duration,
    ) -> Result<Vec<IceServer>, RelayProviderError>;
}

/// Blocking HTTP implementation of [`RelayApiClient`].
#[derive(Debug, Clone)]
pub struct HttpRelayApiClient {
    client: Client,
    endpoint: Url,
}

impl HttpRelayApiClient {
    /// Builds a client for `endpoint` whose requests give up after `timeout`.
    pub fn new(endpoint: &str, timeout: Duration) -> Result<Self, RelayProviderError> {
        let endpoint = Url::parse(endpoint).map_err(|error| RelayProviderError::Endpoint {
            endpoint: endpoint.to_owned(),
            reason: error.to_string(),
        })?;
        if endpoint.cannot_be_a_base() {
            return Err(RelayProviderError::Endpoint {
                endpoint: endpoint.to_string(),
                reason: "endpoint cannot carry a path".to_owned(),
            });
        }
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|source| RelayProviderError::Client { source })?;
        Ok(Self { client, endpoint })
    }

    fn request_url(&self, key_id: &str) -> Url {
        let mut url = self.endpoint.clone();
        if let Ok(mut segments) = url.path_segments_mut() {
            segments
                .pop_if_empty()
                .extend([key_id, "credentials", "generate-ice-servers"]);
        }
        url
    }
}

#[derive(Debug, Serialize)]
struct GenerateRequest {
    ttl: u64,
}

impl RelayApiClient for HttpRelayApiClient {
    fn generate_ice_servers(
        &self,
        key_id: &str,
        api_token: &str,
        ttl: Duration,
    ) -> Result<Vec<IceServer>, RelayProviderError> {
        let url = self.request_url(key_id);
        debug!(target: RELAY_TARGET, url = %url, ttl_secs = ttl.as_secs(), "requesting relay credentials");
        let response = self
            .client
            .post(url)
            .bearer_auth(api_token)
            .json(&GenerateRequest {
                ttl: ttl.as_secs(),
            })
            .send()
            .map_err(|source| RelayProviderError::Transport { source })?;
        let status = response.status();
        if !status.is_success() {
            return Err(RelayProviderError::Status {
                status: status.as_u16(),
            });
        }
        let body = response
            .bytes()
            .map_err(|source| RelayProviderError::Transport { source })?;
        parse_ice_servers(&body)
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GenerateResponse {
    ice_servers: WireServers,
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum WireServers {
    Many(Vec<WireServer>),
    One(WireServer),
}

#[derive(Debug, Deserialize)]
struct WireServer {
    #[serde(default)]
    urls: Option<WireUrls>,
    #[serde(default)]
    username: Option<String>,
    #[serde(default)]
    credential: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum WireUrls {
    One(String),
    Many(Vec<String>),
}

/// Decodes a credential-generation response body.
///
/// `iceServers` may be an array or a single object, and each entry's `urls`
/// may be a string or an array. An empty list, or an entry without URLs, is
/// malformed.
pub fn parse_ice_servers(body: &[u8]) -> Result<Vec<IceServer>, RelayProviderError> {
    let response: GenerateResponse =
        serde_json::from_slice(body).map_err(|error| RelayProviderError::MalformedBody {
            reason: error.to_string(),
        })?;
    let wire = match response.ice_servers {
        WireServers::Many(servers) => servers,
        WireServers::One(server) => vec![server],
    };
    if wire.is_empty() {
        return Err(RelayProviderError::EmptyServerList);
    }
    wire.into_iter().map(into_ice_server).collect()
}

fn into_ice_server(wire: WireServer) -> Result<IceServer, RelayProviderError> {
    let urls = match wire.urls {
        Some(WireUrls::One(url)) => vec![url],
        Some(WireUrls::Many(urls)) => urls,
        None => Vec::new(),
    };
    let urls: Vec<String> = urls
        .into_iter()
        .filter(|url| !url.trim().is_empty())
        .collect();
    if urls.is_empty() {
        return Err(RelayProviderError::MalformedBody {
            reason: "relay entry lists no URLs".to_owned(),
        });
    }
    Ok(IceServer {
        urls,
        username: wire.username,
        credential: wire.credential,
    })
}

/// Relay source backed by the cloud credential API.
///
/// Configured when both `CLOUDFLARE_TURN_KEY_ID` and
/// `CLOUDFLARE_TURN_API_TOKEN` are present.
pub struct CloudRelaySource<A> {
    client: A,
}

impl<A> CloudRelaySource<A>
where
    A: RelayApiClient,
{
    /// Wraps an API client.
    pub fn new(client: A) -> Self {
        Self { client }
    }
}

impl<A> RelaySource for CloudRelaySource<A>
where
    A: RelayApiClient,
{
    fn kind(&self) -> RelaySourceKind {
        RelaySourceKind::Cloud
    }

    fn resolve(&self, env: &EnvironmentView, ttl: Duration) -> RelayOutcome {
        let Some((key_id, api_token)) = env.pair(
            environment::CLOUD_RELAY_KEY_ID,
            environment::CLOUD_RELAY_API_TOKEN,
        ) else {
            return RelayOutcome::Unconfigured;
        };
        match self.client.generate_ice_servers(key_id, api_token, ttl) {
            Ok(servers) => RelayOutcome::Resolved(servers),
            Err(error) => RelayOutcome::Failed(error),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::net::TcpListener;

    use mockito::{Matcher, Server};
    use rstest::rstest;
    use serde_json::json;

    fn client_for(server: &Server) -> HttpRelayApiClient {
        HttpRelayApiClient::new(&server.url(), Duration::from_secs(5)).expect("client builds")
    }

    #[test]
    fn posts_ttl_with_bearer_token() {
        let mut server = Server::new();
        let mock = server
            .mock("POST", "/key-1/credentials/generate-ice-servers")
            .match_header("authorization", "Bearer token-1")
            .match_body(Matcher::Json(json!({"ttl": 600})))
            .with_status(201)
            .with_header("content-type", "application/json")
            .with_body(
                json!({"iceServers": [{
                    "urls": ["turn:relay.example:3478?transport=udp", "turns:relay.example:5349"],
                    "username": "minted",
                    "credential": "secret"
                }]})
                .to_string(),
            )
            .create();

        let servers = client_for(&server)
            .generate_ice_servers("key-1", "token-1", Duration::from_secs(600))
            .expect("request succeeds");

        mock.assert();
        assert_eq!(servers.len(), 1);
        assert_eq!(servers[0].urls.len(), 2);
        assert_eq!(servers[0].username.as_deref(), Some("minted"));
    }

    #[test]
    fn non_success_status_is_reported() {
        let mut server = Server::new();
        let _mock = server
            .mock("POST", "/key-1/credentials/generate-ice-servers")
            .with_status(401)
            .create();

        let error = client_for(&server)
            .generate_ice_servers("key-1", "bad-token", Duration::from_secs(600))
            .expect_err("unauthorised request fails");

        assert!(matches!(error, RelayProviderError::Status { status: 401 }));
    }

    #[test]
    fn unreachable_endpoint_is_a_transport_error() {
        let client = HttpRelayApiClient::new("http://127.0.0.1:1/v1/turn/keys", Duration::from_secs(1))
            .expect("client builds");
        let error = client
            .generate_ice_servers("key-1", "token-1", Duration::from_secs(600))
            .expect_err("connection refused");
        assert!(matches!(error, RelayProviderError::Transport { .. }));
    }

    #[test]
    fn stalled_endpoint_times_out_as_a_transport_error() {
        // Connections queue in the backlog but nothing ever answers.
        let listener = TcpListener::bind("127.0.0.1:0").expect("bind listener");
        let endpoint = format!(
            "http://{}/v1/turn/keys",
            listener.local_addr().expect("local address")
        );
        let client =
            HttpRelayApiClient::new(&endpoint, Duration::from_millis(300)).expect("client builds");

        let error = client
            .generate_ice_servers("key-1", "token-1", Duration::from_secs(600))
            .expect_err("request must time out");

        let RelayProviderError::Transport { source } = error else {
            panic!("expected transport error, got {error:?}");
        };
        assert!(source.is_timeout(), "unexpected transport error {source}");
    }

    #[test]
    fn key_id_is_appended_below_the_endpoint_path() {
        let client = HttpRelayApiClient::new(
            "https://rtc.live.cloudflare.com/v1/turn/keys/",
            Duration::from_secs(1),
        )
        .expect("client builds");
        assert_eq!(
            client.request_url("abc").as_str(),
            "https://rtc.live.cloudflare.com/v1/turn/keys/abc/credentials/generate-ice-servers"
        );
    }

    #[test]
    fn rejects_endpoint_that_is_not_a_url() {
        let error = HttpRelayApiClient::new("not a url", Duration::from_secs(1))
            .expect_err("endpoint must parse");
        assert!(matches!(error, RelayProviderError::Endpoint { .. }));
    }

    #[test]
    fn accepts_single_object_with_string_url() {
        let body = json!({"iceServers": {"urls": "turn:relay:3478", "username": "u", "credential": "c"}});
        let servers = parse_ice_servers(body.to_string().as_bytes()).expect("parses");
        assert_eq!(servers, vec![IceServer::relay("turn:relay:3478", "u", "c")]);
    }

    #[rstest]
    #[case::not_json("<html>")]
    #[case::missing_field(r#"{"servers": []}"#)]
    #[case::entry_without_urls(r#"{"iceServers": [{"username": "u"}]}"#)]
    #[case::blank_urls(r#"{"iceServers": [{"urls": ["  "]}]}"#)]
    fn rejects_malformed_bodies(#[case] body: &str) {
        let error = parse_ice_servers(body.as_bytes()).expect_err("malformed body");
        assert!(
            matches!(error, RelayProviderError::MalformedBody { .. }),
            "unexpected error: {error:?}"
        );
    }

    #[test]
    fn rejects_empty_server_list() {
        let error = parse_ice_servers(br#"{"iceServers": []}"#).expect_err("empty list");
        assert!(matches!(error, RelayProviderError::EmptyServerList));
    }
}
