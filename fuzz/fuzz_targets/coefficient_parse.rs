#![no_main]

use kf_resolution::{ResolutionForm, ResolutionFunction, parse_coefficients};
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    let Ok(text) = std::str::from_utf8(data) else {
        return;
    };
    for form in [ResolutionForm::Gaussian, ResolutionForm::Met, ResolutionForm::DoubleGaussian] {
        // Anything that parses has the right arity and must build.
        if let Ok(c) = parse_coefficients(text, form.arity(), "fuzz") {
            let f = form.build(&c).expect("parsed coefficients must build");
            let _ = f.width(50.0);
            let _ = f.density(50.0, 48.0, Some(300.0));
        }
    }
});
