use crate::module::options::{BrokerOptions, QueueingOptions};
use structopt::StructOpt;

/// Options for the presentation module
#[derive(Debug, StructOpt)]
pub struct Options {
    /// Port on which the HTTP gateway listens
    #[structopt(short, long, env, default_value = "8080")]
    pub port: u16,

    /// Maximum number of requests waiting for a reply at the same time
    #[structopt(long, env, default_value = "25000", value_name = "count")]
    pub pending_request_limit: usize,

    #[allow(missing_docs)]
    #[structopt(flatten)]
    pub queueing: QueueingOptions,

    #[allow(missing_docs)]
    #[structopt(flatten)]
    pub broker: BrokerOptions,
}
