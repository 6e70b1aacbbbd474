//! Integration tests for the class service and its native client

use class_schema::api::native::NativeClient;
use class_schema::contract::*;
use std::sync::Arc;

mod common;
use common::*;

fn print_test_header(test_name: &str, purpose: &[&str]) {
    println!("\n🧪 TEST: {}", test_name);
    if let Some(first) = purpose.first() {
        println!("📋 PURPOSE: {}", first);
    }
    for line in purpose.iter().skip(1) {
        println!("   {}", line);
    }
}

// ===== Lifecycle =====

#[tokio::test]
async fn test_create_class_stores_definition_and_schema() {
    print_test_header(
        "test_create_class_stores_definition_and_schema",
        &["Creating a class builds its table and stores the regenerated schema"],
    );
    let h = Harness::new();
    let service = h.service();

    let class = service
        .create_class("cms.user", "CMS_User", user_definition())
        .await
        .unwrap();

    assert_eq!(class.table_name, "CMS_User");
    assert_eq!(class.definition.len(), 4);
    let schema = class.structure.expect("schema is stored");
    assert_eq!(schema.primary_key, vec!["UserID"]);
    let columns: Vec<&str> = schema.columns.iter().map(|c| c.name.as_str()).collect();
    assert_eq!(columns, vec!["UserID", "UserName", "Email"]);
    assert_eq!(schema.columns[2].max_length, Some(254));

    assert_eq!(h.classes.count(), 1);
    assert_eq!(h.executor.labels()[0], "create_table:UserID");
}

#[tokio::test]
async fn test_create_existing_class_is_rejected() {
    let h = Harness::new();
    let service = h.service();
    service
        .create_class("cms.user", "CMS_User", user_definition())
        .await
        .unwrap();
    h.reset();

    let result = service
        .create_class("CMS.User", "CMS_User2", user_definition())
        .await;

    assert!(matches!(result, Err(SchemaError::ClassExists { .. })));
    assert!(h.executor.calls().is_empty());
}

#[tokio::test]
async fn test_create_with_invalid_definition_leaves_nothing_behind() {
    let h = Harness::new();
    let service = h.service();
    let def = definition(vec![
        id_field(),
        FieldInfo::new("Shape", "geometry").with_guid(guid(2)),
    ]);

    let result = service.create_class("cms.map", "CMS_Map", def).await;

    assert!(matches!(result, Err(SchemaError::UnknownDataType { .. })));
    assert!(h.executor.calls().is_empty());
    assert_eq!(h.classes.count(), 0);
}

#[tokio::test]
async fn test_update_definition_migrates_and_stores() {
    print_test_header(
        "test_update_definition_migrates_and_stores",
        &[
            "Updating a class migrates the table from the stored definition",
            "and replaces the stored definition and schema",
        ],
    );
    let h = Harness::new();
    let service = h.service();
    service
        .create_class("cms.user", "CMS_User", user_definition())
        .await
        .unwrap();
    h.reset();

    let mut def = user_definition();
    def.remove_field("Email");
    def.add_field(FieldInfo::new("Age", "integer").with_guid(guid(20)));

    let (class, report) = service.update_definition("cms.user", def).await.unwrap();

    assert_eq!(
        h.executor.labels(),
        vec!["drop_column:Email", "add_column:Age", "rebuild_table"]
    );
    assert_eq!(report.removed, vec!["Email"]);
    assert_eq!(report.added, vec!["Age"]);
    assert!(class.definition.get_field("Age").is_some());
    assert!(class.updated_at >= class.created_at);

    let stored = service.get_class("cms.user").await.unwrap();
    assert!(stored.definition.get_field("Email").is_none());
    let schema = stored.structure.unwrap();
    assert!(schema.columns.iter().any(|c| c.name == "Age"));
}

#[tokio::test]
async fn test_failed_update_keeps_stored_definition() {
    let h = Harness::new();
    let service = h.service();
    service
        .create_class("cms.user", "CMS_User", user_definition())
        .await
        .unwrap();
    h.executor.fail_on("add_column:Age");

    let mut def = user_definition();
    def.add_field(FieldInfo::new("Age", "integer").with_guid(guid(20)));
    let result = service.update_definition("cms.user", def).await;

    assert!(matches!(result, Err(SchemaError::Execution(_))));
    let stored = service.get_class("cms.user").await.unwrap();
    assert!(stored.definition.get_field("Age").is_none());
}

#[tokio::test]
async fn test_unknown_class_operations() {
    let h = Harness::new();
    let service = h.service();

    assert!(matches!(
        service.get_class("cms.missing").await,
        Err(SchemaError::ClassNotFound { .. })
    ));
    assert!(matches!(
        service.update_definition("cms.missing", user_definition()).await,
        Err(SchemaError::ClassNotFound { .. })
    ));
    assert!(matches!(
        service.delete_class("cms.missing").await,
        Err(SchemaError::ClassNotFound { .. })
    ));
    assert!(service.get_class_structure("cms.missing").await.unwrap().is_none());
}

#[tokio::test]
async fn test_list_and_delete_classes() {
    let h = Harness::new();
    let service = h.service();
    service
        .create_class("cms.user", "CMS_User", user_definition())
        .await
        .unwrap();
    service
        .create_class(
            "cms.role",
            "CMS_Role",
            definition(vec![id_field(), text_field("RoleName", 2, 100)]),
        )
        .await
        .unwrap();

    let names: Vec<String> = service
        .list_classes()
        .await
        .unwrap()
        .into_iter()
        .map(|c| c.class_name)
        .collect();
    assert_eq!(names, vec!["cms.role", "cms.user"]);

    h.reset();
    service.delete_class("cms.role").await.unwrap();
    assert_eq!(h.executor.labels(), vec!["drop_table:CMS_Role"]);
    assert_eq!(h.classes.count(), 1);
}

#[tokio::test]
async fn test_delete_forgets_class_lock() {
    let h = Harness::new();
    let service = h.service();
    service
        .create_class("cms.user", "CMS_User", user_definition())
        .await
        .unwrap();
    service
        .create_class("cms.role", "CMS_Role", definition(vec![id_field()]))
        .await
        .unwrap();
    assert_eq!(service.lock_count(), 2);

    service.delete_class("CMS.User").await.unwrap();
    assert_eq!(service.lock_count(), 1);

    // A failed delete still releases its lock
    assert!(service.delete_class("cms.missing").await.is_err());
    assert_eq!(service.lock_count(), 1);

    service.delete_class("cms.role").await.unwrap();
    assert_eq!(service.lock_count(), 0);
}

#[tokio::test]
async fn test_sync_from_database_uses_live_columns() {
    let h = Harness::new();
    let service = h.service();
    service
        .create_class("cms.user", "CMS_User", user_definition())
        .await
        .unwrap();
    h.reset();

    let mut user_name = introspected("UserName", "varchar", false);
    user_name.max_length = Some(100);
    user_name.default_value = Some("''::character varying".to_string());
    let mut email = introspected("Email", "varchar", true);
    email.max_length = Some(254);
    h.introspector.set_primary_key(&["UserID"]);
    h.introspector.set_columns(vec![
        introspected("UserID", "integer", false),
        user_name,
        email,
        introspected("Obsolete", "bigint", true),
    ]);

    let (_, report) = service.sync_from_database("cms.user").await.unwrap();

    assert_eq!(h.executor.labels(), vec!["drop_column:Obsolete"]);
    assert_eq!(report.removed, vec!["Obsolete"]);
    // FullName is external and has no live column
    assert_eq!(report.added, vec!["FullName"]);
}

// ===== Structures =====

#[tokio::test]
async fn test_structure_is_cached_and_uses_live_primary_key() {
    print_test_header(
        "test_structure_is_cached_and_uses_live_primary_key",
        &[
            "Structures are derived once per class",
            "The live primary key constraint wins over the declared key",
        ],
    );
    let h = Harness::new();
    let service = h.service();
    service
        .create_class("cms.user", "CMS_User", user_definition())
        .await
        .unwrap();
    h.introspector.set_primary_key(&["UserID", "UserName"]);

    let first = service.get_class_structure("cms.user").await.unwrap().unwrap();
    let second = service.get_class_structure("CMS.USER").await.unwrap().unwrap();

    assert!(Arc::ptr_eq(&first, &second));
    assert_eq!(h.introspector.primary_key_requests(), 1);
    assert_eq!(first.id_column, "UserID;UserName");
    assert_eq!(first.id_columns(), vec!["UserID", "UserName"]);
    assert_eq!(first.column_names(), vec!["UserID", "UserName", "Email"]);
    assert_eq!(first.string_columns, vec!["UserName", "Email"]);
    assert_eq!(
        first.get_column("userid").map(|c| c.column_type),
        Some(ColumnType::Int32)
    );
}

#[tokio::test]
async fn test_declared_key_is_used_without_live_constraint() {
    let h = Harness::new();
    let service = h.service();
    service
        .create_class("cms.user", "CMS_User", user_definition())
        .await
        .unwrap();

    let structure = service.get_class_structure("cms.user").await.unwrap().unwrap();
    assert_eq!(structure.id_column, "UserID");
}

#[tokio::test]
async fn test_update_invalidates_structure() {
    let h = Harness::new();
    let service = h.service();
    service
        .create_class("cms.user", "CMS_User", user_definition())
        .await
        .unwrap();
    let before = service.get_class_structure("cms.user").await.unwrap().unwrap();

    let mut def = user_definition();
    def.add_field(FieldInfo::new("Photo", "binary").with_guid(guid(30)));
    service.update_definition("cms.user", def).await.unwrap();

    let after = service.get_class_structure("cms.user").await.unwrap().unwrap();
    assert!(!Arc::ptr_eq(&before, &after));
    assert_eq!(after.binary_columns, vec!["Photo"]);
    assert_eq!(h.introspector.primary_key_requests(), 2);
}

#[tokio::test]
async fn test_load_racing_an_update_is_not_cached() {
    print_test_header(
        "test_load_racing_an_update_is_not_cached",
        &[
            "A structure read before an update finishes must not be cached",
            "after the update has invalidated the class",
        ],
    );
    let h = Harness::new();
    let service = h.service();
    service
        .create_class("cms.user", "CMS_User", user_definition())
        .await
        .unwrap();
    let gate = h.introspector.hold_next_primary_key();

    let reader = service.get_class_structure("cms.user");
    let writer = async {
        gate.entered.notified().await;
        let mut def = user_definition();
        def.add_field(FieldInfo::new("Photo", "binary").with_guid(guid(30)));
        service.update_definition("cms.user", def).await.unwrap();
        gate.release.notify_one();
    };
    let (read, ()) = tokio::join!(reader, writer);

    // The racing reader saw the old definition but did not publish it
    let stale = read.unwrap().unwrap();
    assert!(!stale.contains_column("Photo"));
    assert!(h.ctx.structures.get("cms.user").is_none());

    let fresh = service.get_class_structure("cms.user").await.unwrap().unwrap();
    assert_eq!(fresh.binary_columns, vec!["Photo"]);
}

#[tokio::test]
async fn test_manual_invalidation() {
    let h = Harness::new();
    let service = h.service();
    service
        .create_class("cms.user", "CMS_User", user_definition())
        .await
        .unwrap();
    service.get_class_structure("cms.user").await.unwrap();
    assert_eq!(h.ctx.structures.len(), 1);

    service.invalidate_structure("CMS.User");
    assert!(h.ctx.structures.is_empty());

    service.get_class_structure("cms.user").await.unwrap();
    service.clear_structures();
    assert!(h.ctx.structures.is_empty());
}

// ===== Native client =====

#[tokio::test]
async fn test_native_client_delegates_to_service() {
    let h = Harness::new();
    let client: Arc<dyn ClassSchemaApi> = Arc::new(NativeClient::new(Arc::new(h.service())));

    client
        .create_class("cms.user", "CMS_User", user_definition())
        .await
        .unwrap();

    let mut def = user_definition();
    def.add_field(text_field("Nickname", 40, 50));
    let updated = client.update_definition("cms.user", def).await.unwrap();
    assert!(updated.definition.get_field("Nickname").is_some());

    let structure = client.get_class_structure("cms.user").await.unwrap().unwrap();
    assert!(structure.contains_column("Nickname"));

    client.invalidate_structure("cms.user");
    assert!(h.ctx.structures.is_empty());

    assert_eq!(client.list_classes().await.unwrap().len(), 1);
    client.delete_class("cms.user").await.unwrap();
    assert!(client.list_classes().await.unwrap().is_empty());
}
