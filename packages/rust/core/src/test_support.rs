//! Mock-backend helpers shared by the workflow and tool tests.

use halopub_client::HaloClient;
use halopub_shared::HaloConfig;
use serde_json::{Value, json};
use wiremock::{MockServer, Request, Respond, ResponseTemplate};

pub const TAGS: &str = "/apis/content.halo.run/v1alpha1/tags";
pub const CATEGORIES: &str = "/apis/content.halo.run/v1alpha1/categories";
pub const POSTS: &str = "/apis/content.halo.run/v1alpha1/posts";
pub const SNAPSHOTS: &str = "/apis/content.halo.run/v1alpha1/snapshots";

pub fn client_for(server: &MockServer) -> HaloClient {
    HaloClient::new(HaloConfig::new(&server.uri(), "test-token").unwrap()).unwrap()
}

pub fn list(items: Vec<Value>) -> ResponseTemplate {
    let total = items.len();
    ResponseTemplate::new(200).set_body_json(json!({"items": items, "total": total}))
}

/// Answers with the request body, the way the backend returns a stored
/// resource. A body without `metadata.name` gets the fallback name.
pub struct Echo {
    fallback_name: &'static str,
}

impl Echo {
    pub fn named(fallback_name: &'static str) -> Self {
        Self { fallback_name }
    }
}

impl Respond for Echo {
    fn respond(&self, request: &Request) -> ResponseTemplate {
        let mut body: Value = serde_json::from_slice(&request.body).unwrap();
        let name = &mut body["metadata"]["name"];
        if name.as_str().is_none_or(str::is_empty) {
            *name = json!(self.fallback_name);
        }
        ResponseTemplate::new(200).set_body_json(body)
    }
}
