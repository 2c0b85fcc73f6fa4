pub mod negotiator;
pub mod stream_header;
pub mod stream_writer;
