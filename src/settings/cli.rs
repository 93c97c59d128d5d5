use super::Parser;

#[derive(Parser, Debug)]
#[command(about = "Credential issuing and validation service")]
pub struct Cli {
    /// Path to the settings file.
    #[arg(long)]
    pub settings: Option<String>,
}
