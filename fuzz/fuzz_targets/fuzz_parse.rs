#![no_main]

use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    if let Ok(s) = std::str::from_utf8(data) {
        if let Ok(sheet) = spielzettel::parse(s) {
            // Validation compiles every rule and function of the sheet.
            let _ = spielzettel::validate(&sheet);
        }
        let _ = spielzettel::parse_states(s);
    }
});
