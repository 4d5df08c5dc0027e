#![no_main]
use libfuzzer_sys::fuzz_target;
use sizzle_core::data_loader::load_config_json_bytes;
use sizzle_core::kitchen::Kitchen;

fuzz_target!(|data: &[u8]| {
    // Arbitrary bytes as a kitchen layout. Must not panic -- Err is fine,
    // and every layout that loads must also build.
    if let Ok(config) = load_config_json_bytes(data) {
        assert!(Kitchen::new(config).is_ok());
    }
});
