pub mod capture;
pub mod config;
pub mod context;
pub mod detect;
pub mod fill;
pub mod output;
pub mod sample;
pub mod website;

pub use capture::{cmd_capture, CaptureArgs};
pub use config::{cmd_config, ConfigArgs};
pub use context::CliContext;
pub use detect::cmd_detect;
pub use fill::{cmd_fill_evals, cmd_fill_plans, FillArgs};
pub use output::OutputFormat;
pub use sample::{cmd_sample, SampleArgs};
pub use website::{cmd_fetch, cmd_health, cmd_students, FetchArgs, StudentsArgs};
