/// Result for CSV parsing and the binary. Domain operations return their own
/// error enums instead.
pub type Result<T = ()> = anyhow::Result<T>;
