#![no_main]
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &str| {
    let labels = ["person".to_string(), "bicycle".to_string()];
    let _ = lampctl_io::ReplayScript::parse(data, &labels);
});
