#[cfg(test)]
#[ctor::ctor]
fn init_tests() {
    // tracing events reach env_logger through the `log` feature, filter with RUST_LOG
    let _ = env_logger::builder().is_test(true).try_init();
}
