use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{anyhow, bail, Context};
use clap::{Parser, Subcommand};
use padctl_core::{ActionExecutor, ActionStore, Config, ConfigManager, TreeNode};
use padctl_devices::{PortManager, SurfaceManager};
use parking_lot::RwLock;
use tokio::runtime::Handle;

/// Drive scripts, shell commands and MIDI messages from a grid pad controller.
#[derive(Parser, Debug)]
#[command(name = "padctl")]
#[command(about = "Grid pad controller action launcher")]
struct Args {
    /// Config file (defaults to the platform config directory)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Log at debug level unless RUST_LOG says otherwise
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Activate devices and dispatch pad presses until Ctrl-C (default)
    Serve,
    /// List MIDI input and output ports
    Ports,
    /// Print the action tree
    Actions,
    /// Run an action or group by id or name and wait for it
    Run { target: String },
    /// Check actions without running them (all actions if no target)
    Validate { target: Option<String> },
    /// Check the config document for problems
    Check,
}

#[tokio::main]
async fn main() -> Result<(), anyhow::Error> {
    let args = Args::parse();

    let default_filter = if args.verbose { "debug" } else { "info" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(default_filter))
        .init();

    let mut manager = ConfigManager::new(args.config);
    let config_path = manager.config_path().to_path_buf();
    let config = manager
        .load()
        .with_context(|| format!("loading {}", config_path.display()))?
        .clone();

    match args.command.unwrap_or(Command::Serve) {
        Command::Serve => serve(config).await,
        Command::Ports => list_ports(),
        Command::Actions => {
            print_tree(&config.action_store());
            Ok(())
        }
        Command::Run { target } => run(config, &target).await,
        Command::Validate { target } => validate(config, target.as_deref()).await,
        Command::Check => check(&config),
    }
}

async fn serve(config: Config) -> Result<(), anyhow::Error> {
    let ports = Arc::new(PortManager::new("padctl"));
    let store = Arc::new(RwLock::new(config.action_store()));
    let executor = Arc::new(ActionExecutor::new(store, ports.clone(), Handle::current()));

    let surface = Arc::new(SurfaceManager::new(
        ports,
        executor,
        Arc::new(RwLock::new(config)),
    ));
    surface.initialize_devices();
    log::info!(
        "Ready with {} listener(s), press Ctrl-C to quit",
        surface.listener_count()
    );

    tokio::signal::ctrl_c().await?;

    log::info!("Shutting down");
    surface.shutdown();
    Ok(())
}

fn list_ports() -> Result<(), anyhow::Error> {
    let ports = PortManager::new("padctl");

    println!("Inputs:");
    for name in ports.list_inputs()? {
        println!("  {}", name);
    }
    println!("Outputs:");
    for name in ports.list_outputs()? {
        println!("  {}", name);
    }
    Ok(())
}

fn print_tree(store: &ActionStore) {
    if store.is_empty() {
        println!("No actions");
        return;
    }

    for item in store.flat_list() {
        let indent = "  ".repeat(item.depth);
        match &item.node {
            TreeNode::Group(group) => println!("{}+ {} [{}]", indent, group.name, group.id),
            TreeNode::Action(action) => println!(
                "{}- {} ({}) [{}]",
                indent, action.name, action.action_type, action.id
            ),
        }
    }
}

/// Accept either an id or a display name.
fn resolve(store: &ActionStore, target: &str) -> Option<String> {
    if store.action(target).is_some() || store.group(target).is_some() {
        return Some(target.to_string());
    }
    store.find_by_name(target)
}

fn executor_for(config: &Config) -> Arc<ActionExecutor> {
    let ports = Arc::new(PortManager::new("padctl"));
    let store = Arc::new(RwLock::new(config.action_store()));
    Arc::new(ActionExecutor::new(store, ports, Handle::current()))
}

async fn run(config: Config, target: &str) -> Result<(), anyhow::Error> {
    let executor = executor_for(&config);
    let (id, action) = {
        let store = executor.store().read();
        let id = resolve(&store, target)
            .ok_or_else(|| anyhow!("no action or group named '{}'", target))?;
        let action = store.action(&id).cloned();
        (id, action)
    };

    // A single action runs in the foreground so its output can be shown
    if let Some(action) = action {
        let output = executor
            .execute(&action)
            .await
            .with_context(|| format!("running '{}'", action.name))?;
        if !output.is_empty() {
            println!("{}", output);
        }
        return Ok(());
    }

    if !executor.run_to_completion(&id).await {
        bail!("'{}' could not be started", target);
    }
    Ok(())
}

async fn validate(config: Config, target: Option<&str>) -> Result<(), anyhow::Error> {
    let executor = executor_for(&config);
    let actions = {
        let store = executor.store().read();
        match target {
            Some(target) => {
                let id = resolve(&store, target)
                    .ok_or_else(|| anyhow!("no action named '{}'", target))?;
                match store.action(&id) {
                    Some(action) => vec![action.clone()],
                    None => bail!("'{}' is a group; validate its actions by name", target),
                }
            }
            None => store.actions().to_vec(),
        }
    };

    let mut failures = 0;
    for action in &actions {
        match executor.validate(action.action_type, &action.payload).await {
            Ok(()) => println!("ok    {}", action.name),
            Err(e) => {
                failures += 1;
                println!("FAIL  {}: {}", action.name, e);
            }
        }
    }

    if failures > 0 {
        bail!("{} of {} action(s) failed validation", failures, actions.len());
    }
    Ok(())
}

fn check(config: &Config) -> Result<(), anyhow::Error> {
    match ConfigManager::validate(config) {
        Ok(()) => {
            println!("Config OK");
            Ok(())
        }
        Err(problems) => {
            for problem in &problems {
                println!("  {}", problem);
            }
            bail!("{} problem(s) found", problems.len())
        }
    }
}
