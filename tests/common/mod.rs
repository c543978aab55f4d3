/// Routes the crate's `log` output to the test harness, e.g. `RUST_LOG=concur_hashset=debug`.
pub fn init_logger() {
    let _ = env_logger::builder().is_test(true).try_init();
}
