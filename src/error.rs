use derive_more::{Display, Error};

#[derive(Debug, Display, Error)]
pub enum ConfigError {
    #[display("failed to read config file")]
    ReadFile,
    #[display("failed to parse config: {reason}")]
    Parse { reason: String },
    #[display("invalid config: {field}")]
    Validation { field: String },
}

#[derive(Debug, Display, Error)]
pub enum MarketError {
    #[display("request to market data provider failed")]
    Request,
    #[display("failed to parse market data response")]
    ResponseParse,
}

#[derive(Debug, Display, Error)]
pub enum NotifyError {
    #[display("notification request failed")]
    Request,
    #[display("notification rejected with status {status}")]
    Status { status: u16 },
}

#[derive(Debug, Display, Error)]
pub enum SchedulerError {
    #[display("evaluation of condition \"{name}\" failed")]
    Evaluation { name: String },
}
