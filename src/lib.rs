pub mod cancel;
pub mod config;
pub mod console;
pub mod driver;
pub mod input;
pub mod interpreter;
pub mod menubar;
pub mod program;
pub mod robot;
pub mod session;
pub mod types;
