use crate::library::helpers::parse_seconds;
use crate::module::options::BrokerOptions;
use std::time::Duration;
use structopt::StructOpt;

/// Options for issuing a single request
#[derive(Debug, StructOpt)]
pub struct Options {
    /// Action to perform, e.g. `get_store_by_city`
    pub action: String,

    /// Parameters of the action as a JSON object
    #[structopt(long, value_name = "json")]
    pub params: Option<String>,

    /// Seconds to wait for the reply
    #[structopt(long, default_value = "15", parse(try_from_str = parse_seconds), value_name = "seconds")]
    pub timeout: Duration,

    #[allow(missing_docs)]
    #[structopt(flatten)]
    pub broker: BrokerOptions,
}
