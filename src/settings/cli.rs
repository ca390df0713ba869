use super::Parser;

#[derive(Parser, Debug)]
pub struct Cli {
    /// Path to a settings file overriding the compiled-in default.
    #[arg(long)]
    pub settings: Option<String>,
}
