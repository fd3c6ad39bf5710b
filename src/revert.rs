//! Decoding of EVM revert payloads into human-readable reasons.

use alloy::dyn_abi::{DynSolType, DynSolValue, JsonAbiExt};
use alloy::json_abi::Error as ErrorFragment;

/// 4-byte selector of the solidity built-in `Error(string)`.
pub const ERROR_SELECTOR: [u8; 4] = [0x08, 0xc3, 0x79, 0xa0];
/// 4-byte selector of the solidity built-in `Panic(uint256)`.
pub const PANIC_SELECTOR: [u8; 4] = [0x4e, 0x48, 0x7b, 0x71];

/// Decode the revert payload of a failed clause simulation.
///
/// Recognizes the solidity `Error(string)` and `Panic(uint256)` built-ins
/// plus, when `error_fragment` is given, that one custom error. Anything
/// else (including malformed payloads) yields [`None`]; decoding never
/// fails hard, a bad payload is simply an unknown reason.
pub fn decode_revert_reason(
    data: &[u8],
    error_fragment: Option<&ErrorFragment>,
) -> Option<String> {
    if data.len() < 4 {
        return None;
    }
    let (selector, payload) = data.split_at(4);
    if selector == ERROR_SELECTOR {
        match DynSolType::String.abi_decode(payload) {
            Ok(DynSolValue::String(reason)) => Some(reason),
            _ => None,
        }
    } else if selector == PANIC_SELECTOR {
        match DynSolType::Uint(256).abi_decode(payload) {
            Ok(DynSolValue::Uint(code, _)) => Some(format!("Panic(0x{code:02x})")),
            _ => None,
        }
    } else {
        let fragment = error_fragment?;
        if selector != fragment.selector().as_slice() {
            return None;
        }
        // Only the first decoded value is reported.
        let values = fragment.abi_decode_input(payload).ok()?;
        values.first().map(format_value)
    }
}

fn format_value(value: &DynSolValue) -> String {
    match value {
        DynSolValue::String(s) => s.clone(),
        DynSolValue::Bool(b) => b.to_string(),
        DynSolValue::Uint(n, _) => n.to_string(),
        DynSolValue::Int(n, _) => n.to_string(),
        DynSolValue::Address(a) => a.to_string(),
        DynSolValue::Bytes(b) => format!("0x{}", alloy::hex::encode(b)),
        DynSolValue::FixedBytes(b, size) => format!("0x{}", alloy::hex::encode(&b[..*size])),
        other => format!("{other:?}"),
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use alloy::primitives::U256;

    fn encode_error_string(reason: &str) -> Vec<u8> {
        let mut out = ERROR_SELECTOR.to_vec();
        out.extend(DynSolValue::String(reason.to_string()).abi_encode());
        out
    }

    #[test]
    fn test_error_string() {
        let payload = encode_error_string("transfer amount exceeds balance");
        assert_eq!(
            decode_revert_reason(&payload, None),
            Some("transfer amount exceeds balance".to_string())
        );
    }

    #[test]
    fn test_panic_code() {
        let mut payload = PANIC_SELECTOR.to_vec();
        payload.extend(DynSolValue::Uint(U256::from(0x11), 256).abi_encode());
        assert_eq!(
            decode_revert_reason(&payload, None),
            Some("Panic(0x11)".to_string())
        );
    }

    #[test]
    fn test_panic_code_zero_padded() {
        let mut payload = PANIC_SELECTOR.to_vec();
        payload.extend(DynSolValue::Uint(U256::from(0x1), 256).abi_encode());
        assert_eq!(
            decode_revert_reason(&payload, None),
            Some("Panic(0x01)".to_string())
        );
    }

    #[test]
    fn test_custom_error() {
        let fragment: ErrorFragment =
            ErrorFragment::parse("InsufficientBalance(uint256 available, uint256 required)")
                .unwrap();
        let mut payload = fragment.selector().to_vec();
        payload.extend(
            DynSolValue::Tuple(vec![
                DynSolValue::Uint(U256::from(5), 256),
                DynSolValue::Uint(U256::from(10), 256),
            ])
            .abi_encode_params(),
        );
        assert_eq!(
            decode_revert_reason(&payload, Some(&fragment)),
            Some("5".to_string()),
            "only the first decoded value is reported"
        );
    }

    #[test]
    fn test_custom_error_string_argument() {
        let fragment: ErrorFragment =
            ErrorFragment::parse("AccessDenied(string role)").unwrap();
        let mut payload = fragment.selector().to_vec();
        payload.extend(DynSolValue::String("admin".to_string()).abi_encode());
        assert_eq!(
            decode_revert_reason(&payload, Some(&fragment)),
            Some("admin".to_string())
        );
    }

    #[test]
    fn test_custom_error_selector_mismatch() {
        let fragment: ErrorFragment = ErrorFragment::parse("Unauthorized()").unwrap();
        let payload = [0xde, 0xad, 0xbe, 0xef];
        assert_eq!(decode_revert_reason(&payload, Some(&fragment)), None);
    }

    #[test]
    fn test_unknown_selector() {
        let payload = [0xde, 0xad, 0xbe, 0xef, 0x00];
        assert_eq!(decode_revert_reason(&payload, None), None);
    }

    #[test]
    fn test_short_payload() {
        assert_eq!(decode_revert_reason(&[], None), None);
        assert_eq!(decode_revert_reason(&[0x08, 0xc3], None), None);
    }

    #[test]
    fn test_truncated_error_string() {
        let payload = ERROR_SELECTOR.to_vec();
        assert_eq!(decode_revert_reason(&payload, None), None);
    }
}
