fn main() {
    // Forwards the esp-idf-sys build metadata (linker args, cfg flags) when
    // building for the device. On host targets the saved sysenv is absent
    // and this emits nothing.
    if std::env::var_os("CARGO_FEATURE_ESPIDF").is_some() {
        embuild::espidf::sysenv::output();
    }
}
