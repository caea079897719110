pub mod csv_channel;
pub mod source;
