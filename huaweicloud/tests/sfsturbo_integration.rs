mod common;

use mockito::{Matcher, Server};
use serde_json::json;
use tfplug::context::Context;
use tfplug::data_source::{DataSource, ReadDataSourceRequest};
use tfplug::resource::{CreateResourceRequest, DeleteResourceRequest, Resource};
use tfplug::types::{AttributePath, DynamicValue};

const SHARE_DETAIL: &str = r#"{"id":"share-1","name":"turbo-1","size":"500.00","share_proto":"NFS",
    "share_type":"STANDARD","availability_zone":"cn-north-4a","vpc_id":"vpc-1","subnet_id":"subnet-1",
    "security_group_id":"sg-1","status":"200","sub_status":"","export_location":"192.168.0.10:/",
    "avail_capacity":"500.00"}"#;

#[tokio::test(flavor = "multi_thread")]
async fn share_create_then_delete() {
    let mut server = Server::new_async().await;
    let create = server
        .mock("POST", "/v1/proj-9/sfs-turbo/shares")
        .match_body(Matcher::PartialJson(json!({"share": {"name": "turbo-1", "size": 500}})))
        .with_body(r#"{"id":"share-1","name":"turbo-1","status":"100"}"#)
        .create_async()
        .await;
    // Answered once while waiting for creation; later polls see the share gone
    let available = server
        .mock("GET", "/v1/proj-9/sfs-turbos/share-1")
        .with_body(SHARE_DETAIL)
        .expect(1)
        .create_async()
        .await;
    let _gone = server
        .mock("GET", "/v1/proj-9/sfs-turbos/share-1")
        .with_status(404)
        .with_body(r#"{"error_code":"SFS.TURBO.0002","error_msg":"share not found"}"#)
        .create_async()
        .await;
    let delete = server
        .mock("DELETE", "/v1/proj-9/sfs-turbo/shares/share-1")
        .with_status(202)
        .create_async()
        .await;

    let (provider, provider_data) = common::configured_provider(&server.url()).await;
    let turbo = common::resource(&provider, &provider_data, "huaweicloud_sfs_turbo").await;

    let config = DynamicValue::from_json(json!({
        "name": "turbo-1",
        "size": 500,
        "availability_zone": "cn-north-4a",
        "vpc_id": "vpc-1",
        "subnet_id": "subnet-1",
        "security_group_id": "sg-1"
    }));
    let created = turbo
        .create(
            Context::new(),
            CreateResourceRequest {
                type_name: "huaweicloud_sfs_turbo".to_string(),
                planned_state: config.clone(),
                config,
            },
        )
        .await;
    assert!(created.diagnostics.is_empty(), "{:?}", created.diagnostics);
    assert_eq!(created.new_state.get_string(&AttributePath::new("id")).unwrap(), "share-1");
    assert_eq!(
        created.new_state.get_string(&AttributePath::new("export_location")).unwrap(),
        "192.168.0.10:/"
    );
    create.assert_async().await;
    available.assert_async().await;

    let deleted = turbo
        .delete(
            Context::new(),
            DeleteResourceRequest {
                type_name: "huaweicloud_sfs_turbo".to_string(),
                prior_state: created.new_state,
            },
        )
        .await;
    assert!(deleted.diagnostics.is_empty(), "{:?}", deleted.diagnostics);
    delete.assert_async().await;
}

#[tokio::test(flavor = "multi_thread")]
async fn perm_rule_create_then_delete() {
    let mut server = Server::new_async().await;
    let _create = server
        .mock("POST", "/v1/proj-9/sfs-turbos/share-1/fs/perm-rules")
        .with_body(r#"{"rules":[{"id":"r-1","ip_cidr":"10.0.0.0/8","rw_type":"ro","user_type":"no_root_squash"}]}"#)
        .create_async()
        .await;
    let _get = server
        .mock("GET", "/v1/proj-9/sfs-turbos/share-1/fs/perm-rules/r-1")
        .with_body(r#"{"rule":{"id":"r-1","ip_cidr":"10.0.0.0/8","rw_type":"ro","user_type":"no_root_squash"}}"#)
        .create_async()
        .await;
    let delete = server
        .mock("DELETE", "/v1/proj-9/sfs-turbos/share-1/fs/perm-rules/r-1")
        .with_status(204)
        .create_async()
        .await;

    let (provider, provider_data) = common::configured_provider(&server.url()).await;
    let rule = common::resource(&provider, &provider_data, "huaweicloud_sfs_turbo_perm_rule").await;

    let config = DynamicValue::from_json(json!({"share_id": "share-1", "ip_cidr": "10.0.0.0/8", "rw_type": "ro"}));
    let created = rule
        .create(
            Context::new(),
            CreateResourceRequest {
                type_name: "huaweicloud_sfs_turbo_perm_rule".to_string(),
                planned_state: config.clone(),
                config,
            },
        )
        .await;
    assert!(created.diagnostics.is_empty(), "{:?}", created.diagnostics);
    assert_eq!(created.new_state.get_string(&AttributePath::new("id")).unwrap(), "r-1");

    let deleted = rule
        .delete(
            Context::new(),
            DeleteResourceRequest {
                type_name: "huaweicloud_sfs_turbo_perm_rule".to_string(),
                prior_state: created.new_state,
            },
        )
        .await;
    assert!(deleted.diagnostics.is_empty(), "{:?}", deleted.diagnostics);
    delete.assert_async().await;
}

#[tokio::test(flavor = "multi_thread")]
async fn turbos_data_source_filters_by_name() {
    let mut server = Server::new_async().await;
    let _list = server
        .mock("GET", "/v1/proj-9/sfs-turbos/detail")
        .match_query(Matcher::Any)
        .with_body(format!(
            r#"{{"shares":[{},{{"id":"share-2","name":"turbo-2","size":"100.00"}}],"count":2}}"#,
            SHARE_DETAIL
        ))
        .create_async()
        .await;

    let (provider, provider_data) = common::configured_provider(&server.url()).await;
    let turbos = common::data_source(&provider, &provider_data, "huaweicloud_sfs_turbos").await;

    let response = turbos
        .read(
            Context::new(),
            ReadDataSourceRequest {
                type_name: "huaweicloud_sfs_turbos".to_string(),
                config: DynamicValue::from_json(json!({"name": "turbo-1"})),
            },
        )
        .await;

    assert!(response.diagnostics.is_empty(), "{:?}", response.diagnostics);
    let list = response.state.get_list(&AttributePath::new("turbos")).unwrap();
    assert_eq!(list.len(), 1);
    assert_eq!(list[0].as_map().unwrap()["size"].as_number(), Some(500.0));
}
