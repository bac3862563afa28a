//! Basic usage of typed singletons.
//!
//! Run with: `cargo run --example basic_usage`

use module_singleton::{define_singleton, set_trace_callback, Singleton};
use std::thread;

struct AppConfig {
    name: String,
    workers: usize,
}

define_singleton!(AppConfig, "demo::AppConfig", AppConfig {
    name: "demo".to_string(),
    workers: 4,
});

struct Port(u16);

define_singleton!(Port, "demo::Port", try std::env::var("DEMO_PORT")
    .unwrap_or_else(|_| "8080".to_string())
    .parse::<u16>()
    .map(Port));

fn main() {
    set_trace_callback(|event| println!("[registry] {event}"));

    let workers: Vec<_> = (0..AppConfig::get_instance().workers)
        .map(|id| {
            thread::spawn(move || {
                let config = AppConfig::get_instance();
                println!("worker {id} sees {} at {:p}", config.name, config);
            })
        })
        .collect();
    for worker in workers {
        worker.join().expect("worker thread panicked");
    }

    match Port::try_get_instance() {
        Ok(port) => println!("listening on {}", port.0),
        Err(err) => eprintln!("{err}"),
    }

    let handle = AppConfig::get_instance_handle();
    drop(handle);
    println!("config still alive: {}", AppConfig::get_instance().name);
}
