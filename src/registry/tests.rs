use super::*;

const ADDR: &str = "0xABCDEF0123456789000000000000000000000001";

/// Client with no reachable endpoints; every RPC read fails locally.
fn offline_client() -> RegistryClient {
    RegistryClient::with_endpoints(NAME_REGISTRY_ADDRESS, Vec::new())
}

// ---------------------------------------------------------------------------
// Format validation
// ---------------------------------------------------------------------------

#[test]
fn test_name_length_boundaries() {
    assert!(!validate_name_format("ab").valid);
    assert!(validate_name_format("abc").valid);
    assert!(validate_name_format(&"a".repeat(32)).valid);
    assert!(!validate_name_format(&"a".repeat(33)).valid);
}

#[test]
fn test_name_length_errors_are_specific() {
    assert_eq!(
        validate_name_format("ab").error,
        Some("Name must be at least 3 characters")
    );
    assert_eq!(
        validate_name_format(&"a".repeat(33)).error,
        Some("Name must be 32 characters or less")
    );
}

#[test]
fn test_name_charset() {
    assert!(validate_name_format("alice_42").valid);
    assert!(!validate_name_format("alice smith").valid);
    assert!(!validate_name_format("alice-smith").valid);
    assert!(!validate_name_format("alice😀a").valid);
    assert_eq!(
        validate_name_format("a b").error,
        Some("Only letters, numbers, and underscores allowed")
    );
}

#[test]
fn test_reserved_names_case_insensitive() {
    assert!(is_reserved_name("admin"));
    assert!(is_reserved_name("Admin"));
    assert!(is_reserved_name("PRIME"));
    assert!(is_reserved_name("PrimeChat"));
    assert!(!is_reserved_name("alice"));
}

// ---------------------------------------------------------------------------
// Degrade-to-default error policy (offline client: every call fails)
// ---------------------------------------------------------------------------

#[tokio::test]
async fn test_get_name_returns_none_on_failure() {
    assert_eq!(offline_client().get_name_by_address(ADDR).await, None);
}

#[tokio::test]
async fn test_get_name_rejects_non_address_input() {
    assert_eq!(offline_client().get_name_by_address("not-hex").await, None);
}

#[tokio::test]
async fn test_has_name_returns_false_on_failure() {
    assert!(!offline_client().has_name(ADDR).await);
}

#[tokio::test]
async fn test_is_name_taken_fails_closed() {
    // An RPC failure must read as "taken", never "available".
    assert!(offline_client().is_name_taken("alice").await);
}

#[tokio::test]
async fn test_get_address_returns_none_on_failure() {
    assert_eq!(offline_client().get_address_by_name("alice").await, None);
}

#[tokio::test]
async fn test_availability_reports_taken_under_rpc_failure() {
    let check = offline_client().check_name_availability("alice").await;
    assert!(!check.available);
    assert_eq!(check.error.as_deref(), Some("Name already taken"));
}

#[tokio::test]
async fn test_availability_checks_format_before_network() {
    let check = offline_client().check_name_availability("ab").await;
    assert_eq!(check.error.as_deref(), Some("Name must be at least 3 characters"));
}

#[tokio::test]
async fn test_availability_checks_reservation_before_network() {
    let check = offline_client().check_name_availability("Admin").await;
    assert_eq!(check.error.as_deref(), Some("This name is reserved"));
}

// ---------------------------------------------------------------------------
// Result decoding
// ---------------------------------------------------------------------------

fn string_return(value: &str) -> String {
    let bytes = value.as_bytes();
    let mut data = Vec::new();
    data.extend_from_slice(&{
        let mut w = [0u8; 32];
        w[31] = 0x20;
        w
    });
    data.extend_from_slice(&{
        let mut w = [0u8; 32];
        w[24..].copy_from_slice(&(bytes.len() as u64).to_be_bytes());
        w
    });
    data.extend_from_slice(bytes);
    data.extend_from_slice(&vec![0u8; (32 - bytes.len() % 32) % 32]);
    format!("0x{}", hex::encode(data))
}

#[test]
fn test_decode_string_round_trip() {
    assert_eq!(abi::decode_string(&string_return("alice")).unwrap(), "alice");
    assert_eq!(abi::decode_string(&string_return("")).unwrap(), "");
}

#[test]
fn test_empty_contract_string_is_none() {
    // The contract returns "" for unregistered addresses.
    assert_eq!(name_or_none(String::new()), None);
    assert_eq!(name_or_none("alice".to_string()).as_deref(), Some("alice"));
}

#[test]
fn test_zero_address_sentinel_is_none() {
    assert_eq!(address_or_none(ZERO_ADDRESS.to_string()), None);
    assert_eq!(
        address_or_none("0xabcdef0123456789000000000000000000000001".to_string()).as_deref(),
        Some("0xabcdef0123456789000000000000000000000001")
    );
}

#[test]
fn test_decode_address_takes_word_tail() {
    let mut word = [0u8; 32];
    word[12..].copy_from_slice(&[0xab; 20]);
    let result = format!("0x{}", hex::encode(word));
    assert_eq!(
        abi::decode_address(&result).unwrap(),
        format!("0x{}", "ab".repeat(20))
    );
}

#[test]
fn test_decode_bool() {
    let mut word = [0u8; 32];
    assert!(!abi::decode_bool(&format!("0x{}", hex::encode(word))).unwrap());
    word[31] = 1;
    assert!(abi::decode_bool(&format!("0x{}", hex::encode(word))).unwrap());
}

#[test]
fn test_decode_rejects_truncated_results() {
    assert!(abi::decode_string("0x00").is_err());
    assert!(abi::decode_address("0x").is_err());
    assert!(abi::decode_bool("0x1234").is_err());
}

#[test]
fn test_decode_rejects_out_of_range_offset_and_length() {
    // Offset word of u64::MAX; must come back as an error, not overflow.
    let mut data = vec![0u8; 64];
    data[24..32].copy_from_slice(&u64::MAX.to_be_bytes());
    assert!(abi::decode_string(&format!("0x{}", hex::encode(&data))).is_err());

    // Valid offset, length word of u64::MAX.
    let mut data = vec![0u8; 64];
    data[31] = 0x20;
    data[56..64].copy_from_slice(&u64::MAX.to_be_bytes());
    assert!(abi::decode_string(&format!("0x{}", hex::encode(&data))).is_err());
}

// ---------------------------------------------------------------------------
// Calldata encoding
// ---------------------------------------------------------------------------

#[test]
fn test_address_calldata_layout() {
    let data = abi::encode_address_call(
        "getNameByAddress(address)",
        "0xabcdef0123456789000000000000000000000001",
    )
    .unwrap();
    // 4-byte selector + one 32-byte word.
    assert_eq!(data.len(), 2 + 2 * (4 + 32));
    // 12 zero bytes of left padding before the address.
    assert_eq!(&data[10..34], "0".repeat(24));
    assert!(data.ends_with("abcdef0123456789000000000000000000000001"));
}

#[test]
fn test_string_calldata_layout() {
    let data = abi::encode_string_call("isNameTaken(string)", "alice");
    // selector + offset word + length word + one padded data word.
    assert_eq!(data.len(), 2 + 2 * (4 + 32 + 32 + 32));
    let body = &data[2 + 8..];
    assert_eq!(&body[..64], &format!("{:0>64}", "20"));
    assert_eq!(&body[64..128], &format!("{:0>64}", "5"));
    assert!(body[128..].starts_with(&hex::encode("alice")));
}

#[test]
fn test_register_calldata_lowercases() {
    assert_eq!(
        register_name_calldata("Alice"),
        register_name_calldata("alice")
    );
    assert_ne!(register_name_calldata("alice"), update_name_calldata("alice"));
}

#[test]
fn test_unregister_calldata_is_bare_selector() {
    assert_eq!(unregister_name_calldata().len(), 2 + 8);
}
