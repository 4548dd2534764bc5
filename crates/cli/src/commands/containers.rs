//! Container Commands

use anyhow::Result;
use clap::Args;

use crate::client::WebClient;
use crate::output::{print_list, OutputFormat};

#[derive(Args)]
pub struct ContainersArgs {
    /// Include stopped containers
    #[arg(short, long)]
    pub all: bool,
}

pub async fn execute(args: ContainersArgs, client: WebClient, format: OutputFormat) -> Result<()> {
    let containers = client.list_containers(args.all).await?;
    print_list(&containers, format);
    Ok(())
}
