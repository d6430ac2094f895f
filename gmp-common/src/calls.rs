//! Call data carried over native bridge side-channels.
//!
//! A message-id hook asks the bridge to execute `verifyMessageId(bytes32)` on
//! the destination security module. The bridge only moves opaque bytes; the
//! module decodes them on arrival.

use crate::crypto::selector;
use crate::error::GmpError;
use crate::types::H256;

pub const VERIFY_MESSAGE_ID_SIGNATURE: &str = "verifyMessageId(bytes32)";

/// Length of encoded `verifyMessageId` call data.
pub const VERIFY_MESSAGE_ID_CALLDATA_LEN: usize = 4 + 32;

pub fn verify_message_id_selector() -> [u8; 4] {
    selector(VERIFY_MESSAGE_ID_SIGNATURE)
}

pub fn encode_verify_message_id(id: H256) -> Vec<u8> {
    let mut out = Vec::with_capacity(VERIFY_MESSAGE_ID_CALLDATA_LEN);
    out.extend_from_slice(&verify_message_id_selector());
    out.extend_from_slice(id.as_bytes());
    out
}

/// Splits call data into selector and arguments.
pub fn split_selector(calldata: &[u8]) -> Result<([u8; 4], &[u8]), GmpError> {
    if calldata.len() < 4 {
        return Err(GmpError::InvalidCallData(format!(
            "call data of {} bytes has no selector",
            calldata.len()
        )));
    }
    let mut sel = [0u8; 4];
    sel.copy_from_slice(&calldata[..4]);
    Ok((sel, &calldata[4..]))
}

pub fn decode_verify_message_id(calldata: &[u8]) -> Result<H256, GmpError> {
    let (sel, args) = split_selector(calldata)?;
    if sel != verify_message_id_selector() {
        return Err(GmpError::UnsupportedCall(format!(
            "selector 0x{}",
            hex::encode(sel)
        )));
    }
    if args.len() != 32 {
        return Err(GmpError::InvalidCallData(format!(
            "verifyMessageId expects 32 argument bytes, got {}",
            args.len()
        )));
    }
    H256::from_slice(args)
}
