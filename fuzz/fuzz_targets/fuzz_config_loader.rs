#![no_main]
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &str| {
    // Arbitrary TOML must parse or fail cleanly; a parsed config must
    // validate or fail cleanly, never panic.
    if let Ok(cfg) = toml::from_str::<lampctl_config::Config>(data) {
        let _ = cfg.validate();
    }
});
