fn main() {
    // esp-idf link/env plumbing; no-op for host builds.
    if std::env::var_os("CARGO_FEATURE_ESPIDF").is_some() {
        embuild::espidf::sysenv::output();
    }
}
