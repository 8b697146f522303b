use std::sync::Once;

static INIT: Once = Once::new();

/// Initialise env_logger once per test binary. `RUST_LOG` still applies.
pub fn init_test_logging() {
    INIT.call_once(|| {
        let _ = env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("debug"))
            .is_test(true)
            .try_init();
    });
}
