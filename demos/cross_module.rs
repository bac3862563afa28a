//! Linking a module to the exported resolver.
//!
//! Run with: `cargo run --example cross_module --features export-resolver`
//!
//! The example plays both roles in one binary: it exports the resolver and then
//! links to it the way a plugin would. In a real deployment the plugin calls
//! `link_from_process` (or receives the function pointer from the host) before
//! touching any singleton.

use module_singleton::{
    define_singleton, install_resolver, link_from_process, module_singleton_resolve, Singleton,
};

struct Telemetry {
    endpoint: &'static str,
}

define_singleton!(Telemetry, "demo::Telemetry", Telemetry {
    endpoint: "udp://127.0.0.1:8125",
});

fn main() {
    tracing_subscriber::fmt()
        .with_max_level(tracing::Level::DEBUG)
        .init();

    match link_from_process() {
        Ok(_) => println!("linked resolver from process symbols"),
        Err(err) => {
            // Executables do not export symbols unless built with `-rdynamic`.
            println!("{err}; linking the host function directly");
            unsafe { install_resolver(module_singleton_resolve) };
        }
    }

    let telemetry = Telemetry::get_instance();
    println!("telemetry endpoint {} at {:p}", telemetry.endpoint, telemetry);
}
