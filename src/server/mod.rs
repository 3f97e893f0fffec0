// Server module entry point
// Listener creation, the accept loop, per-connection tasks and shutdown signals

mod connection;
mod listener;
mod signal;

// `loop` is a keyword, so the file is mounted under another name
#[path = "loop.rs"]
mod server_loop;

pub use listener::create_reusable_listener;
pub use server_loop::run;
pub use signal::{start_signal_handler, SignalHandler};
