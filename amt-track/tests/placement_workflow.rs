//! Integration tests for the placement state machine

mod common;

use amt_common::{Error, LocationKind};
use amt_track::db::{movements, placements};
use amt_track::placement::{PlacementRequest, PlacementService, PlacementTarget};
use uuid::Uuid;

fn request(fixture: &common::Fixture, target: PlacementTarget) -> PlacementRequest {
    PlacementRequest {
        asset_guid: fixture.asset_guid,
        status_guid: fixture.status_guid,
        target,
    }
}

#[tokio::test]
async fn test_first_placement_comes_from_factory() {
    let pool = common::memory_pool().await;
    let fixture = common::seed_world(&pool).await;
    let service = PlacementService::new(pool.clone());

    let outcome = service
        .place_asset(&request(&fixture, PlacementTarget::warehouse(fixture.warehouse_guid)))
        .await
        .unwrap();

    assert_eq!(outcome.kind, LocationKind::Warehouse);
    assert_eq!(outcome.from_kind, LocationKind::Factory);
    assert!(outcome.from_placement_guid.is_none());

    let type_guid = outcome.movement_type_guid.expect("Factory pair is seeded");
    let label = movements::movement_type_label(&pool, type_guid)
        .await
        .unwrap();
    assert_eq!(label.as_deref(), Some("Newly Placed at Warehouse"));

    let location = service.check_location(fixture.asset_guid).await.unwrap();
    assert!(location.is_placed);
    assert_eq!(location.kind, Some(LocationKind::Warehouse));
    assert_eq!(location.location_guid, Some(fixture.warehouse_guid));
    assert_eq!(location.location_code.as_deref(), Some("WH-001"));
}

#[tokio::test]
async fn test_warehouse_to_site_vacates_and_records() {
    let pool = common::memory_pool().await;
    let fixture = common::seed_world(&pool).await;
    let service = PlacementService::new(pool.clone());

    let first = service
        .place_asset(&request(&fixture, PlacementTarget::warehouse(fixture.warehouse_guid)))
        .await
        .unwrap();
    let second = service
        .place_asset(&request(&fixture, PlacementTarget::site(fixture.site_guid)))
        .await
        .unwrap();

    // The warehouse row became immutable history
    let warehouse_row = placements::load_warehouse_placement(&pool, first.placement_guid)
        .await
        .unwrap()
        .unwrap();
    assert!(warehouse_row.vacated_on.is_some());

    // Exactly one active row remains, at the site
    assert_eq!(common::active_row_count(&pool, fixture.asset_guid).await, 1);
    let site_row = placements::load_site_placement(&pool, second.placement_guid)
        .await
        .unwrap()
        .unwrap();
    assert!(site_row.vacated_on.is_none());

    // One movement record for the transition, fully linked
    assert_eq!(second.from_kind, LocationKind::Warehouse);
    assert_eq!(second.from_placement_guid, Some(first.placement_guid));
    let label = movements::movement_type_label(
        &pool,
        second.movement_type_guid.expect("Warehouse to Site is seeded"),
    )
    .await
    .unwrap();
    assert_eq!(label.as_deref(), Some("Warehouse to Site"));
    assert_eq!(site_row.movement_record_guid, Some(second.movement_record_guid));
}

#[tokio::test]
async fn test_same_kind_transition_is_vacate_then_place() {
    let pool = common::memory_pool().await;
    let fixture = common::seed_world(&pool).await;
    let service = PlacementService::new(pool.clone());

    let first = service
        .place_asset(&request(&fixture, PlacementTarget::warehouse(fixture.warehouse_guid)))
        .await
        .unwrap();
    let second = service
        .place_asset(&request(&fixture, PlacementTarget::warehouse(fixture.warehouse_guid)))
        .await
        .unwrap();

    assert_ne!(first.placement_guid, second.placement_guid);
    assert_eq!(second.from_kind, LocationKind::Warehouse);
    assert_eq!(common::active_row_count(&pool, fixture.asset_guid).await, 1);

    let label = movements::movement_type_label(
        &pool,
        second.movement_type_guid.expect("Warehouse to Warehouse is seeded"),
    )
    .await
    .unwrap();
    assert_eq!(label.as_deref(), Some("Warehouse to Warehouse"));
}

#[tokio::test]
async fn test_unseeded_pair_still_completes_with_null_type() {
    let pool = common::memory_pool().await;
    let fixture = common::seed_world(&pool).await;
    let service = PlacementService::new(pool.clone());

    service
        .place_asset(&request(&fixture, PlacementTarget::site(fixture.site_guid)))
        .await
        .unwrap();

    // Site -> Datacenter has no seeded movement type
    let outcome = service
        .place_asset(&request(&fixture, PlacementTarget::datacenter(fixture.datacenter_guid)))
        .await
        .unwrap();

    assert!(outcome.movement_type_guid.is_none());
    let history = service.movement_history(fixture.asset_guid).await.unwrap();
    assert_eq!(history.len(), 2);
    assert!(history[0].movement_type_guid.is_none());
    assert_eq!(common::active_row_count(&pool, fixture.asset_guid).await, 1);
}

#[tokio::test]
async fn test_remove_from_current_location_is_an_exit_not_a_movement() {
    let pool = common::memory_pool().await;
    let fixture = common::seed_world(&pool).await;
    let service = PlacementService::new(pool.clone());

    service
        .place_asset(&request(&fixture, PlacementTarget::site(fixture.site_guid)))
        .await
        .unwrap();

    let vacated = service
        .remove_from_current_location(fixture.asset_guid)
        .await
        .unwrap()
        .expect("asset was placed");
    assert_eq!(vacated.kind, LocationKind::Site);
    assert_eq!(common::active_row_count(&pool, fixture.asset_guid).await, 0);

    // Removal writes no movement record
    let history = service.movement_history(fixture.asset_guid).await.unwrap();
    assert_eq!(history.len(), 1);

    // Removing an unplaced asset is a no-op, not an error
    let again = service
        .remove_from_current_location(fixture.asset_guid)
        .await
        .unwrap();
    assert!(again.is_none());

    let location = service.check_location(fixture.asset_guid).await.unwrap();
    assert!(!location.is_placed);
}

#[tokio::test]
async fn test_failed_placement_rolls_back_the_vacate() {
    let pool = common::memory_pool().await;
    let fixture = common::seed_world(&pool).await;
    let service = PlacementService::new(pool.clone());

    let first = service
        .place_asset(&request(&fixture, PlacementTarget::warehouse(fixture.warehouse_guid)))
        .await
        .unwrap();

    // Bogus status: the request fails after the vacate step ran
    let bad_request = PlacementRequest {
        asset_guid: fixture.asset_guid,
        status_guid: Uuid::new_v4(),
        target: PlacementTarget::site(fixture.site_guid),
    };
    let result = service.place_asset(&bad_request).await;
    assert!(matches!(result, Err(Error::ReferenceNotFound(_))));

    // The rollback restored the active warehouse placement
    let warehouse_row = placements::load_warehouse_placement(&pool, first.placement_guid)
        .await
        .unwrap()
        .unwrap();
    assert!(warehouse_row.vacated_on.is_none());
    assert_eq!(common::active_row_count(&pool, fixture.asset_guid).await, 1);

    let history = service.movement_history(fixture.asset_guid).await.unwrap();
    assert_eq!(history.len(), 1);
}

#[tokio::test]
async fn test_unknown_references_are_rejected() {
    let pool = common::memory_pool().await;
    let fixture = common::seed_world(&pool).await;
    let service = PlacementService::new(pool.clone());

    let unknown_asset = PlacementRequest {
        asset_guid: Uuid::new_v4(),
        status_guid: fixture.status_guid,
        target: PlacementTarget::site(fixture.site_guid),
    };
    assert!(matches!(
        service.place_asset(&unknown_asset).await,
        Err(Error::ReferenceNotFound(_))
    ));

    let unknown_location = request(&fixture, PlacementTarget::site(Uuid::new_v4()));
    assert!(matches!(
        service.place_asset(&unknown_location).await,
        Err(Error::ReferenceNotFound(_))
    ));

    // Nothing was written
    assert_eq!(common::active_row_count(&pool, fixture.asset_guid).await, 0);
    let history = service.movement_history(fixture.asset_guid).await.unwrap();
    assert!(history.is_empty());
}

#[tokio::test]
async fn test_two_active_rows_trip_the_invariant() {
    let pool = common::memory_pool().await;
    let fixture = common::seed_world(&pool).await;
    let service = PlacementService::new(pool.clone());

    // Bypass the service to fabricate corrupt state: one active row in
    // each of two different tables (the per-table unique index cannot
    // catch cross-table duplicates)
    for (table, location_col, location_guid) in [
        ("site_placements", "site_guid", fixture.site_guid),
        ("warehouse_placements", "warehouse_guid", fixture.warehouse_guid),
    ] {
        let sql = format!(
            "INSERT INTO {} (guid, asset_guid, {}, status_guid) VALUES (?, ?, ?, ?)",
            table, location_col
        );
        sqlx::query(&sql)
            .bind(Uuid::new_v4().to_string())
            .bind(fixture.asset_guid.to_string())
            .bind(location_guid.to_string())
            .bind(fixture.status_guid.to_string())
            .execute(&pool)
            .await
            .unwrap();
    }

    assert!(matches!(
        service.check_location(fixture.asset_guid).await,
        Err(Error::InvariantViolation(_))
    ));
    assert!(matches!(
        service
            .place_asset(&request(&fixture, PlacementTarget::datacenter(fixture.datacenter_guid)))
            .await,
        Err(Error::InvariantViolation(_))
    ));

    // The corrupt rows were left untouched for investigation
    assert_eq!(common::active_row_count(&pool, fixture.asset_guid).await, 2);
}

#[tokio::test]
async fn test_movement_history_is_newest_first() {
    let pool = common::memory_pool().await;
    let fixture = common::seed_world(&pool).await;
    let service = PlacementService::new(pool.clone());

    service
        .place_asset(&request(&fixture, PlacementTarget::warehouse(fixture.warehouse_guid)))
        .await
        .unwrap();
    service
        .place_asset(&request(&fixture, PlacementTarget::site(fixture.site_guid)))
        .await
        .unwrap();

    let history = service.movement_history(fixture.asset_guid).await.unwrap();
    assert_eq!(history.len(), 2);
    assert_eq!(history[0].from_kind, LocationKind::Warehouse);
    assert_eq!(history[0].to_kind, LocationKind::Site);
    assert_eq!(history[1].from_kind, LocationKind::Factory);
    assert_eq!(history[1].to_kind, LocationKind::Warehouse);
}
