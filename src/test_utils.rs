// SPDX-License-Identifier: Apache-2.0

/// Test-only helpers.
///
/// Routes `log` output through the test harness; `RUST_LOG=trace` shows the
/// dispatch decisions of a failing test.
pub fn config_test_logger() {
    let _ = env_logger::builder().is_test(true).try_init();
}

/// Little-endian UTF-16 bytes of `s`.
pub fn utf16_bytes(s: &str) -> Vec<u8> {
    s.encode_utf16().flat_map(u16::to_le_bytes).collect()
}

/// Little-endian bytes of raw UTF-16 code units, surrogates allowed unpaired.
pub fn u16_bytes(units: &[u16]) -> Vec<u8> {
    units.iter().flat_map(|u| u.to_le_bytes()).collect()
}

/// Little-endian bytes of raw 32-bit elements.
pub fn u32_bytes(values: &[u32]) -> Vec<u8> {
    values.iter().flat_map(|v| v.to_le_bytes()).collect()
}
