//! Unit tests for the Identifiers module

use core_kernel::{OrderId, OrderLineId, LedgerEntryId, CustomerId, ProductId, SyncIntentId};
use uuid::Uuid;

#[test]
fn test_new_generates_unique_ids() {
    assert_ne!(OrderId::new(), OrderId::new());
}

#[test]
fn test_new_v7_generates_time_ordered_ids() {
    let id1 = LedgerEntryId::new_v7();
    std::thread::sleep(std::time::Duration::from_millis(1));
    let id2 = LedgerEntryId::new_v7();
    let uuid1: Uuid = id1.into();
    let uuid2: Uuid = id2.into();
    assert!(uuid1 < uuid2);
}

#[test]
fn test_prefixes() {
    assert_eq!(OrderId::prefix(), "ORD");
    assert_eq!(OrderLineId::prefix(), "OLN");
    assert_eq!(LedgerEntryId::prefix(), "LED");
    assert_eq!(CustomerId::prefix(), "CUS");
    assert_eq!(ProductId::prefix(), "PRD");
    assert_eq!(SyncIntentId::prefix(), "SYN");
}

#[test]
fn test_from_str_accepts_bare_uuid() {
    let uuid = Uuid::new_v4();
    let parsed: OrderId = uuid.to_string().parse().unwrap();
    assert_eq!(*parsed.as_uuid(), uuid);
}

#[test]
fn test_from_str_rejects_garbage() {
    assert!("ORD-not-a-uuid".parse::<OrderId>().is_err());
}

#[test]
fn test_serde_is_transparent() {
    let uuid = Uuid::new_v4();
    let id = OrderId::from_uuid(uuid);
    let json = serde_json::to_string(&id).unwrap();
    assert_eq!(json, format!("\"{}\"", uuid));
}
