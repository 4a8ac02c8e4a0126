//! sl-admin CLI
//!
//! Queue provisioning and event replay for silverline.

use anyhow::Result;
use clap::Parser;
use sl_cli_common::init_logging;
use sl_queue::{sqs_client, SqsPublisher};
use sl_store::S3ObjectStore;

mod args;
mod queue;
mod replay;

use args::{Cli, Command};

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(cli.log_level, cli.log_format)?;

    let aws = cli.aws.to_config();

    match cli.command {
        Command::CreateQueue(args) => {
            let client = sqs_client(&aws).await;
            let description = queue::create_queue(&client, &args).await?;
            queue::write_description(&description, args.output.as_deref())?;
        }
        Command::Replay(args) => {
            let objects = S3ObjectStore::from_config(&aws).await;
            let event = replay::build_event(&args, &objects).await?;
            let publisher = SqsPublisher::from_config(&args.queue_url, &aws).await;
            let message_id = replay::replay(&event, &publisher).await?;
            println!("{message_id}");
        }
    }

    Ok(())
}
