#![no_main]
use brewer_core::{CodeVocabulary, DeviceStatus, decode_status_line};
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &str| {
    for vocab in [CodeVocabulary::named(), CodeVocabulary::numeric()] {
        let decoded = decode_status_line(data, &vocab);
        let mut status = DeviceStatus::initial(0.0);
        let before = status;
        match status.update(data, &vocab, 1.0) {
            Ok(_) => assert!(decoded.is_ok()),
            Err(_) => {
                // rejected lines leave the status untouched
                assert!(decoded.is_err());
                assert_eq!(status, before);
            }
        }
    }
});
