use crate::module::options::{BrokerOptions, QueueingOptions};
use structopt::StructOpt;

/// Options for the business module
#[derive(Debug, StructOpt)]
pub struct Options {
    #[allow(missing_docs)]
    #[structopt(flatten)]
    pub queueing: QueueingOptions,

    #[allow(missing_docs)]
    #[structopt(flatten)]
    pub broker: BrokerOptions,
}
