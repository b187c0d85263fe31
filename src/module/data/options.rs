use crate::module::options::{BrokerOptions, QueueingOptions};
use structopt::StructOpt;

/// Options for the data module
#[derive(Debug, StructOpt)]
pub struct Options {
    /// Database holding the store table
    #[structopt(
        long,
        env = "DATABASE_URL",
        default_value = "sqlite://stores.db?mode=rwc",
        value_name = "url"
    )]
    pub database: String,

    #[allow(missing_docs)]
    #[structopt(flatten)]
    pub queueing: QueueingOptions,

    #[allow(missing_docs)]
    #[structopt(flatten)]
    pub broker: BrokerOptions,
}
