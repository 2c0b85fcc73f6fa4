pub mod capture_loop;
pub mod completion;
pub mod runner;
pub mod shutdown;
