//! Hand-rolled ABI encoding for the four read functions and three write
//! functions of the name registry. The ABI surface is fixed and tiny, so
//! calldata is built word-by-word instead of pulling in a full codec.

use alloy_primitives::keccak256;

const WORD: usize = 32;

fn selector(signature: &str) -> [u8; 4] {
    let hash = keccak256(signature.as_bytes());
    [hash[0], hash[1], hash[2], hash[3]]
}

fn push_word_usize(out: &mut Vec<u8>, value: usize) {
    let mut word = [0u8; WORD];
    word[WORD - 8..].copy_from_slice(&(value as u64).to_be_bytes());
    out.extend_from_slice(&word);
}

/// Calldata for `fn(address)`. The address must already be normalized.
pub(crate) fn encode_address_call(signature: &str, address: &str) -> Result<String, String> {
    let raw = address.trim().trim_start_matches("0x");
    let bytes = hex::decode(raw).map_err(|e| format!("bad address hex: {e}"))?;
    if bytes.len() != 20 {
        return Err(format!("address must be 20 bytes, got {}", bytes.len()));
    }
    let mut data = selector(signature).to_vec();
    data.extend_from_slice(&[0u8; 12]);
    data.extend_from_slice(&bytes);
    Ok(format!("0x{}", hex::encode(data)))
}

/// Calldata for `fn(string)`: offset word, length word, padded UTF-8 bytes.
pub(crate) fn encode_string_call(signature: &str, value: &str) -> String {
    let bytes = value.as_bytes();
    let mut data = selector(signature).to_vec();
    push_word_usize(&mut data, WORD); // offset of the string head
    push_word_usize(&mut data, bytes.len());
    data.extend_from_slice(bytes);
    let pad = (WORD - bytes.len() % WORD) % WORD;
    data.extend_from_slice(&vec![0u8; pad]);
    format!("0x{}", hex::encode(data))
}

/// Calldata for `fn()`.
pub(crate) fn encode_no_arg_call(signature: &str) -> String {
    format!("0x{}", hex::encode(selector(signature)))
}

fn decode_words(result: &str) -> Result<Vec<u8>, String> {
    let raw = result.trim().trim_start_matches("0x");
    hex::decode(raw).map_err(|e| format!("bad result hex: {e}"))
}

fn word_to_usize(word: &[u8]) -> Result<usize, String> {
    if word.len() != WORD || word[..WORD - 8].iter().any(|b| *b != 0) {
        return Err("ABI word out of range".to_string());
    }
    let mut tail = [0u8; 8];
    tail.copy_from_slice(&word[WORD - 8..]);
    Ok(u64::from_be_bytes(tail) as usize)
}

/// Decode a single `string` return value. Offset and length words come off
/// the wire; arithmetic on them must not be trusted to stay in range.
pub(crate) fn decode_string(result: &str) -> Result<String, String> {
    let data = decode_words(result)?;
    if data.len() < 2 * WORD {
        return Err(format!("string result too short: {} bytes", data.len()));
    }
    let offset = word_to_usize(&data[..WORD])?;
    let start = offset
        .checked_add(WORD)
        .filter(|start| *start <= data.len())
        .ok_or_else(|| "string offset past end of result".to_string())?;
    let len = word_to_usize(&data[offset..start])?;
    let end = start
        .checked_add(len)
        .filter(|end| *end <= data.len())
        .ok_or_else(|| "string length past end of result".to_string())?;
    String::from_utf8(data[start..end].to_vec())
        .map_err(|e| format!("string result not UTF-8: {e}"))
}

/// Decode a single `address` return value, lower-cased 0x form.
pub(crate) fn decode_address(result: &str) -> Result<String, String> {
    let data = decode_words(result)?;
    if data.len() < WORD {
        return Err(format!("address result too short: {} bytes", data.len()));
    }
    Ok(format!("0x{}", hex::encode(&data[WORD - 20..WORD])))
}

/// Decode a single `bool` return value.
pub(crate) fn decode_bool(result: &str) -> Result<bool, String> {
    let data = decode_words(result)?;
    if data.len() < WORD {
        return Err(format!("bool result too short: {} bytes", data.len()));
    }
    Ok(data[..WORD].iter().any(|b| *b != 0))
}
