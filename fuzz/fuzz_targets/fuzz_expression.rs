#![no_main]

use libfuzzer_sys::fuzz_target;

use ev_forecast::forecast::{evaluate, Equation};

fuzz_target!(|data: &[u8]| {
    let Ok(text) = std::str::from_utf8(data) else {
        return;
    };
    // Any input either fails cleanly or yields a finite number.
    if let Ok(value) = evaluate(text, 2030.0) {
        assert!(value.is_finite());
    }
    if let Ok(eq) = Equation::parse(text) {
        for year in [2024.0, 2050.0] {
            if let Ok(value) = eq.eval(year) {
                assert!(value.is_finite());
            }
        }
    }
});
