use action_flow::BatchMode;
use anyhow::Result;
use clap::{Args, ValueEnum};
use nice_autofill_cli::records::sample_json;

#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
pub enum ModeArg {
    Plans,
    Evals,
}

impl From<ModeArg> for BatchMode {
    fn from(value: ModeArg) -> Self {
        match value {
            ModeArg::Plans => BatchMode::Plans,
            ModeArg::Evals => BatchMode::Evaluations,
        }
    }
}

#[derive(Args, Clone, Debug)]
pub struct SampleArgs {
    /// Which records to print
    #[arg(value_enum, default_value = "plans")]
    pub mode: ModeArg,
}

pub fn cmd_sample(args: SampleArgs) -> Result<()> {
    println!("{}", sample_json(args.mode.into())?);
    Ok(())
}
