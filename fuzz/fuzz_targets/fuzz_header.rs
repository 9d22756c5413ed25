//! Fuzz Testing for the Message Header codec
//!
//! Run with: cargo fuzz run fuzz_header

#![no_main]

use libfuzzer_sys::fuzz_target;
use omemo_core::{pkcs7_unpad, MessageHeader, AES_BLOCK_SIZE};

fuzz_target!(|data: &[u8]| {
    if let Ok(header) = MessageHeader::decode(data) {
        let encoded = header.encode().expect("decoded counters fit in 16 bits");
        assert_eq!(&encoded[..], &data[..encoded.len()]);
    }

    let _ = pkcs7_unpad(data, AES_BLOCK_SIZE);
});
