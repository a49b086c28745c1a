use std::process::ExitCode;

use clap::{Parser, Subcommand, ValueEnum};
use tracing_subscriber::EnvFilter;

use gc_app::{AppConfig, Controller, Session};
use genesis_api::{Instance, InstanceAction};

#[derive(Parser)]
#[command(name = "genesis")]
#[command(about = "Genesis Cloud compute instances console")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Validate a token, fetch instances with it and remember both.
    Login { token: String },
    /// Show the cached instance list.
    List,
    /// Fetch instances again with the saved token.
    Refresh,
    /// Fetch one instance.
    Show { id: String },
    /// Start an instance.
    Start { id: String },
    /// Run a lifecycle action on an instance.
    Action {
        id: String,
        #[arg(value_enum)]
        action: ActionCli,
    },
    /// Print the cached instance list as JSON.
    Export,
    /// Forget the saved token and cached instances.
    Logout,
}

#[derive(Clone, Copy, ValueEnum)]
enum ActionCli {
    Start,
    Stop,
    Restart,
    Reboot,
}

impl From<ActionCli> for InstanceAction {
    fn from(value: ActionCli) -> Self {
        match value {
            ActionCli::Start => Self::Start,
            ActionCli::Stop => Self::Stop,
            ActionCli::Restart => Self::Restart,
            ActionCli::Reboot => Self::Reboot,
        }
    }
}

#[tokio::main]
async fn main() -> ExitCode {
    let _ = dotenvy::dotenv();

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| "warn".into()))
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let config = AppConfig::from_env();

    let mut controller = Controller::from_config(&config);
    controller.load_saved_data().await;

    match run(cli.command, &mut controller).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("error: {e}");
            ExitCode::FAILURE
        }
    }
}

async fn run(command: Commands, controller: &mut Controller) -> gc_app::Result<()> {
    match command {
        Commands::Login { token } => {
            let instances = controller.submit_token(&token).await?;
            print_instances(instances);
        }
        Commands::List => print_session(controller.session()),
        Commands::Refresh => {
            let instances = controller.refresh().await?;
            print_instances(instances);
        }
        Commands::Show { id } => {
            let instance = controller.show_instance(&id).await?;
            println!("{}", serde_json::to_string_pretty(&instance)?);
        }
        Commands::Start { id } => {
            let instance = controller.start_instance(&id).await?;
            println!("Instance {} is {}", instance.name, instance.status);
        }
        Commands::Action { id, action } => {
            let action = InstanceAction::from(action);
            let instance = controller.perform_action(&id, action).await?;
            println!("{action} requested: {} is {}", instance.name, instance.status);
        }
        Commands::Export => println!("{}", controller.export_json()?),
        Commands::Logout => {
            controller.clear().await;
            println!("Token and cached instances removed");
        }
    }

    Ok(())
}

fn print_session(session: &Session) {
    match session.last_fetched {
        Some(at) => println!("Last fetched {}", at.to_rfc3339()),
        None => println!("Nothing fetched yet; run `genesis login <token>`"),
    }
    print_instances(&session.instances);
}

fn print_instances(instances: &[Instance]) {
    if instances.is_empty() {
        println!("No instances");
        return;
    }

    println!("{:<38} {:<24} {:<10} {:<16} REGION", "ID", "NAME", "STATUS", "PUBLIC IP");
    for i in instances {
        println!(
            "{:<38} {:<24} {:<10} {:<16} {}",
            i.id,
            i.name,
            i.status,
            i.public_ip.as_deref().unwrap_or("-"),
            i.region.name,
        );
    }
}
