#![no_main]
use brewer_core::BrewOrder;
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &str| {
    if let Ok(order) = BrewOrder::from_json(data) {
        assert!(order.validate().is_ok());
    }
});
