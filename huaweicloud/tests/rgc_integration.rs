mod common;

use mockito::{Matcher, Server};
use serde_json::json;
use tfplug::context::Context;
use tfplug::data_source::{DataSource, ReadDataSourceRequest};
use tfplug::resource::{CreateResourceRequest, DeleteResourceRequest, Resource};
use tfplug::types::{AttributePath, DynamicValue};

#[tokio::test(flavor = "multi_thread")]
async fn control_enable_then_disable() {
    let mut server = Server::new_async().await;
    let enable = server
        .mock("POST", "/v1/governance/controls/enable")
        .match_body(Matcher::PartialJson(json!({
            "identifier": "RGC-GR_AUDIT_BUCKET_DELETION_PROHIBITED",
            "target_identifier": "ou-5"
        })))
        .with_body(r#"{"operation_id":"op-1"}"#)
        .create_async()
        .await;
    let disable = server
        .mock("POST", "/v1/governance/controls/disable")
        .match_body(Matcher::Json(json!({
            "identifier": "RGC-GR_AUDIT_BUCKET_DELETION_PROHIBITED",
            "target_identifier": "ou-5"
        })))
        .with_body(r#"{"operation_id":"op-2"}"#)
        .create_async()
        .await;
    let _operations = server
        .mock("GET", Matcher::Regex(r"^/v1/governance/operation/op-[12]$".to_string()))
        .with_body(r#"{"status":"SUCCEEDED"}"#)
        .create_async()
        .await;
    let _enabled = server
        .mock("GET", "/v1/governance/managed-organizational-units/ou-5/controls")
        .match_query(Matcher::Any)
        .with_body(r#"{"control_summaries":[{"control_identifier":"RGC-GR_AUDIT_BUCKET_DELETION_PROHIBITED",
            "state":"ENABLED","behavior":"Preventive","owner":"RGC"}]}"#)
        .create_async()
        .await;

    let (provider, provider_data) = common::configured_provider(&server.url()).await;
    let control = common::resource(&provider, &provider_data, "huaweicloud_rgc_control").await;

    let config = DynamicValue::from_json(json!({
        "identifier": "RGC-GR_AUDIT_BUCKET_DELETION_PROHIBITED",
        "target_identifier": "ou-5"
    }));
    let created = control
        .create(
            Context::new(),
            CreateResourceRequest {
                type_name: "huaweicloud_rgc_control".to_string(),
                planned_state: config.clone(),
                config,
            },
        )
        .await;
    assert!(created.diagnostics.is_empty(), "{:?}", created.diagnostics);
    assert_eq!(created.new_state.get_string(&AttributePath::new("state")).unwrap(), "ENABLED");
    enable.assert_async().await;

    let deleted = control
        .delete(
            Context::new(),
            DeleteResourceRequest {
                type_name: "huaweicloud_rgc_control".to_string(),
                prior_state: created.new_state,
            },
        )
        .await;
    assert!(deleted.diagnostics.is_empty(), "{:?}", deleted.diagnostics);
    disable.assert_async().await;
}

#[tokio::test(flavor = "multi_thread")]
async fn failed_operation_surfaces_as_error() {
    let mut server = Server::new_async().await;
    let _enable = server
        .mock("POST", "/v1/governance/controls/enable")
        .with_body(r#"{"operation_id":"op-9"}"#)
        .create_async()
        .await;
    let _operation = server
        .mock("GET", "/v1/governance/operation/op-9")
        .with_body(r#"{"status":"FAILED","message":"target is not registered"}"#)
        .create_async()
        .await;

    let (provider, provider_data) = common::configured_provider(&server.url()).await;
    let control = common::resource(&provider, &provider_data, "huaweicloud_rgc_control").await;

    let config = DynamicValue::from_json(json!({"identifier": "RGC-GR_X", "target_identifier": "ou-404"}));
    let created = control
        .create(
            Context::new(),
            CreateResourceRequest {
                type_name: "huaweicloud_rgc_control".to_string(),
                planned_state: config.clone(),
                config,
            },
        )
        .await;

    assert_eq!(created.diagnostics.len(), 1);
    assert!(created.diagnostics[0].detail.contains("FAILED"), "{}", created.diagnostics[0].detail);
}

#[tokio::test(flavor = "multi_thread")]
async fn organizational_units_data_source_reads_every_page() {
    let mut server = Server::new_async().await;
    let _second = server
        .mock("GET", "/v1/managed-organization/managed-organizational-units")
        .match_query(Matcher::UrlEncoded("marker".into(), "next".into()))
        .with_body(r#"{"managed_organizational_units":[{"organizational_unit_id":"ou-3","organizational_unit_name":"Sandbox"}],"page_info":{}}"#)
        .create_async()
        .await;
    let _first = server
        .mock("GET", "/v1/managed-organization/managed-organizational-units")
        .match_query(Matcher::Exact("limit=200".to_string()))
        .with_body(r#"{"managed_organizational_units":[
            {"organizational_unit_id":"ou-1","organizational_unit_name":"Security"},
            {"organizational_unit_id":"ou-2","organizational_unit_name":"Workloads"}
        ],"page_info":{"next_marker":"next"}}"#)
        .create_async()
        .await;

    let (provider, provider_data) = common::configured_provider(&server.url()).await;
    let units = common::data_source(&provider, &provider_data, "huaweicloud_rgc_organizational_units").await;

    let response = units
        .read(
            Context::new(),
            ReadDataSourceRequest {
                type_name: "huaweicloud_rgc_organizational_units".to_string(),
                config: DynamicValue::empty(),
            },
        )
        .await;

    assert!(response.diagnostics.is_empty(), "{:?}", response.diagnostics);
    let list = response
        .state
        .get_list(&AttributePath::new("managed_organizational_units"))
        .unwrap();
    assert_eq!(list.len(), 3);
}
