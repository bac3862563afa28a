fn main() {
    println!("cargo:rerun-if-changed=build.rs");
    // Integration tests look the exported resolver up in their own executable,
    // which only works when its dynamic symbol table carries it.
    let linux = std::env::var("CARGO_CFG_TARGET_OS").as_deref() == Ok("linux");
    if linux && std::env::var_os("CARGO_FEATURE_EXPORT_RESOLVER").is_some() {
        println!("cargo:rustc-link-arg-tests=-rdynamic");
    }
}
