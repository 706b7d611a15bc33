pub mod evaluator;
pub mod report;
pub mod rule;

pub use evaluator::{evaluate, AlertError, AlertResult};
pub use report::{render_json, report, AlertSink, LogSink, StdoutSink};
pub use rule::{AlertRule, RuleFilter};
