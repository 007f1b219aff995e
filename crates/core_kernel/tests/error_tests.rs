//! Tests for core_kernel error types

use core_kernel::error::CoreError;
use core_kernel::money::MoneyError;
use core_kernel::{LedgerEntryId, OrderId};

#[test]
fn test_invalid_identifier_names_the_type() {
    let error = "ORD-not-a-uuid".parse::<OrderId>().unwrap_err();

    match &error {
        CoreError::InvalidIdentifier { kind, value, .. } => {
            assert_eq!(*kind, "OrderId");
            assert_eq!(value, "ORD-not-a-uuid");
        }
        other => panic!("Expected InvalidIdentifier, got {:?}", other),
    }
    assert!(error.to_string().contains("OrderId"));
}

#[test]
fn test_prefixed_form_of_other_type_is_rejected() {
    let id = OrderId::new();
    let error = id.to_string().parse::<LedgerEntryId>().unwrap_err();
    assert!(error.to_string().contains("LedgerEntryId"));
}

#[test]
fn test_core_error_from_money_error() {
    let money_error = MoneyError::CurrencyMismatch("BRL".to_string(), "USD".to_string());
    let core_error: CoreError = money_error.into();

    assert!(matches!(core_error, CoreError::Money(_)));
}
