fn main() {
    // Emit ESP-IDF link/env metadata only when building the device target.
    if std::env::var_os("CARGO_FEATURE_ESPIDF").is_some() {
        embuild::espidf::sysenv::output();
    }
}
