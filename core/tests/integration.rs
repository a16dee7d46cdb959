//! End-to-end tests against the live mock server.
//!
//! # Design
//! Starts the mock server on a random port and drives every client operation
//! over real HTTP through `UreqTransport`, so request building, auth, status
//! handling, and CSV normalization are checked together.

use std::net::SocketAddr;

use lemlist_core::{
    AddLeadOptions, ApiError, Campaigns, ClientConfig, Gateway, Lead, Payload, UreqTransport,
};
use mock_server::MockState;
use serde_json::{json, Map};

const API_KEY: &str = "integration-key";

/// Serve `state` on a background thread and return its address.
fn start_server(state: MockState) -> SocketAddr {
    let std_listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
    let addr = std_listener.local_addr().unwrap();
    std_listener.set_nonblocking(true).unwrap();

    std::thread::spawn(move || {
        let rt = tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()
            .unwrap();
        rt.block_on(async {
            let listener = tokio::net::TcpListener::from_std(std_listener).unwrap();
            mock_server::run(listener, state).await
        })
        .unwrap();
    });
    addr
}

fn client(addr: SocketAddr, api_key: &str) -> Campaigns<UreqTransport> {
    let mut config = ClientConfig::new(api_key);
    config.base_url = format!("http://{addr}/api");
    config.into_campaigns()
}

#[test]
fn lead_lifecycle() {
    let state = MockState::seeded(API_KEY, &[("cam_1", "Launch")]);
    let addr = start_server(state.clone());
    let c = client(addr, API_KEY);

    // Step 1: the campaign is reachable by id.
    let campaign = c.get_campaign(Some("cam_1"), None).unwrap().unwrap();
    assert_eq!(campaign["name"], "Launch");

    // Step 2: add two leads, one with a comma in the company name.
    let richard = Lead {
        first_name: Some("Richard".to_string()),
        company_name: Some("Pied Piper, Inc.".to_string()),
        ..Lead::new("richard@piedpiper.com")
    };
    let added = c.add_lead("cam_1", &richard, AddLeadOptions::default()).unwrap();
    let lead_id = added.as_json().unwrap()["_id"].as_str().unwrap().to_string();
    assert!(lead_id.starts_with("lea_"));

    let gilfoyle = Lead {
        first_name: Some("Bertram".to_string()),
        ..Lead::new("gilfoyle@piedpiper.com")
    };
    c.add_lead("cam_1", &gilfoyle, AddLeadOptions::default()).unwrap();

    // Step 3: deduplication is enforced server-side.
    let err = c.add_lead("cam_1", &richard, AddLeadOptions::default()).unwrap_err();
    assert_eq!(err.status(), Some(409));

    // Step 4: export normalizes rows and drops emailStatus.
    let leads = c.get_leads("cam_1").unwrap();
    assert_eq!(leads.len(), 2);
    assert_eq!(leads[0].get("email"), Some("richard@piedpiper.com"));
    assert_eq!(leads[0].get("companyName"), Some("Pied Piper, Inc."));
    assert_eq!(leads[0].get("emailStatus"), None);
    assert_eq!(leads[0].content_hash().len(), 32);
    assert_ne!(leads[0].content_hash(), leads[1].content_hash());

    // Step 5: a status change keeps the hash stable.
    assert!(state.set_email_status("cam_1", "richard@piedpiper.com", "opened"));
    let after_status = c.get_leads("cam_1").unwrap();
    assert_eq!(after_status[0].content_hash(), leads[0].content_hash());

    // Step 6: a field change moves the hash.
    let mut fields = Map::new();
    fields.insert("companyName".to_string(), json!("Hooli"));
    let updated = c.update_lead("cam_1", "richard@piedpiper.com", &fields).unwrap();
    assert_eq!(updated.as_json().unwrap()["companyName"], "Hooli");
    let after_update = c.get_leads("cam_1").unwrap();
    assert_ne!(after_update[0].content_hash(), leads[0].content_hash());

    // Step 7: lead variables.
    let vars = [("occupation", "developer".to_string())];
    let ok = c.add_lead_variables(&lead_id, &vars).unwrap();
    assert_eq!(ok, Payload::Decoded(json!({"ok": true})));
    c.update_lead_variables(&lead_id, &vars).unwrap();
    c.delete_lead_variables(&lead_id, &vars).unwrap();

    // Step 8: delete, then deleting again surfaces the server's 404.
    c.delete_lead("cam_1", "richard@piedpiper.com").unwrap();
    let err = c.delete_lead("cam_1", "richard@piedpiper.com").unwrap_err();
    assert!(err.is_not_found());
    assert_eq!(c.get_leads("cam_1").unwrap().len(), 1);

    // Step 9: update of a missing lead is a 404; an empty update a 400.
    let err = c.update_lead("cam_1", "richard@piedpiper.com", &fields).unwrap_err();
    assert!(err.is_not_found());
    let err = c.update_lead("cam_1", "gilfoyle@piedpiper.com", &Map::new()).unwrap_err();
    assert_eq!(err.status(), Some(400));

    // Step 10: delete the campaign.
    c.delete_campaign("cam_1").unwrap();
    let err = c.get_campaign(Some("cam_1"), None).unwrap_err();
    assert!(err.is_not_found());
}

#[test]
fn find_campaign_by_name_across_pages() {
    let names: Vec<(String, String)> = (1..=12)
        .map(|i| (format!("cam_{i}"), format!("Campaign {i}")))
        .collect();
    let seeded: Vec<(&str, &str)> = names.iter().map(|(id, n)| (id.as_str(), n.as_str())).collect();
    let addr = start_server(MockState::seeded(API_KEY, &seeded));
    let c = client(addr, API_KEY);

    let found = c.get_campaign(None, Some("Campaign 11")).unwrap().unwrap();
    assert_eq!(found["_id"], "cam_11");

    assert_eq!(c.get_campaign(None, Some("Campaign 99")).unwrap(), None);
}

#[test]
fn wrong_key_is_rejected_and_rotation_applies() {
    let addr = start_server(MockState::seeded(API_KEY, &[("cam_1", "Launch")]));
    let mut c = client(addr, "wrong-key");

    let err = c.list_campaigns(0, 10, 1).unwrap_err();
    match err {
        ApiError::HttpError { status, body } => {
            assert_eq!(status, 401);
            assert_eq!(body, "Unauthorized");
        }
        other => panic!("unexpected error: {other:?}"),
    }

    c.gateway_mut().set_api_key(API_KEY);
    let page = c.list_campaigns(0, 10, 1).unwrap().into_json().unwrap();
    assert_eq!(page["campaigns"][0]["name"], "Launch");
}

#[test]
fn unreachable_host_is_a_transport_error() {
    // Port 9 (discard) is not served by anything in the test environment.
    let gateway = Gateway::with_base_url(API_KEY, "http://127.0.0.1:9/api", UreqTransport::new());
    let c = Campaigns::new(gateway);
    let err = c.delete_campaign("cam_1").unwrap_err();
    assert!(matches!(err, ApiError::Transport(_)), "{err:?}");
}
