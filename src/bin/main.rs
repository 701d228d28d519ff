use std::{path::PathBuf, process};

use fl_dashboard::{
    client::Client,
    settings::Settings,
    Backend,
    HospitalId,
    HospitalRecord,
    LogEntry,
    Store,
};
use structopt::StructOpt;
use tokio::sync::broadcast::{self, error::RecvError};
use tracing_subscriber::*;

#[macro_use]
extern crate tracing;

#[derive(Debug, StructOpt)]
#[structopt(name = "fl-dashboard")]
struct Opt {
    /// Path of the configuration file
    #[structopt(short, parse(from_os_str))]
    config_path: PathBuf,

    /// Print the final state of the hospitals and the activity log as JSON
    #[structopt(long)]
    json: bool,

    #[structopt(subcommand)]
    command: Command,
}

#[derive(Debug, StructOpt)]
enum Command {
    /// Train the local model of a hospital
    Train { id: HospitalId },
    /// Retrain a hospital against the global model
    TrainGlobal { id: HospitalId },
    /// Share the weights of a hospital with the central server
    Share { id: HospitalId },
    /// Train the local models of all the hospitals
    TrainAllLocal,
    /// Share the weights of all the hospitals
    ShareAll,
    /// Retrain all the hospitals against the global model
    TrainAll,
    /// Redistribute the data among the hospitals
    Reset,
    /// Run a full round: reset, local training, weight sharing and global training
    Demo,
}

#[tokio::main]
async fn main() {
    let opt = Opt::from_args();

    let Settings {
        api: api_settings,
        log: log_settings,
    } = Settings::new(opt.config_path).unwrap_or_else(|err| {
        eprintln!("{}", err);
        process::exit(1);
    });

    FmtSubscriber::builder()
        .with_env_filter(log_settings.filter)
        .with_ansi(true)
        .init();

    let client = Client::from_settings(&api_settings).unwrap_or_else(|err| {
        eprintln!("{}", err);
        process::exit(1);
    });
    let store = Store::new(client);

    let printer = if opt.json {
        None
    } else {
        Some(tokio::spawn(print_log(store.subscribe())))
    };

    info!("running {:?} against {}", opt.command, api_settings.base_url);
    run(&store, opt.command).await;

    let hospitals = store.hospitals();
    let output = if opt.json {
        Some(serde_json::json!({
            "central_model_ready": store.is_central_model_ready(),
            "hospitals": &hospitals,
            "logs": store.logs(),
        }))
    } else {
        None
    };
    // closes the log channel
    drop(store);
    if let Some(printer) = printer {
        let _ = printer.await;
    }

    match output {
        Some(output) => println!("{:#}", output),
        None => print_hospitals(&hospitals),
    }
}

/// Print the log entries as they are appended, until the store is dropped.
async fn print_log(mut entries: broadcast::Receiver<LogEntry>) {
    loop {
        match entries.recv().await {
            Ok(entry) => println!("[{}] {}", entry.severity, entry.message),
            Err(RecvError::Lagged(skipped)) => {
                warn!("log printer fell behind, {} entries skipped", skipped)
            }
            Err(RecvError::Closed) => break,
        }
    }
}

async fn run<B: Backend>(store: &Store<B>, command: Command) {
    match command {
        Command::Train { id } => store.train_local_model(id).await,
        Command::TrainGlobal { id } => store.train_with_central_model(id).await,
        Command::Share { id } => store.share_weights(id).await,
        Command::TrainAllLocal => store.train_all_local_models().await,
        Command::ShareAll => store.share_all_weights().await,
        Command::TrainAll => store.train_all_hospitals().await,
        Command::Reset => store.reset_data().await,
        Command::Demo => {
            store.reset_data().await;
            store.train_all_local_models().await;
            store.share_all_weights().await;
            if store.is_central_model_ready() {
                store.train_all_hospitals().await;
            } else {
                warn!("global model not aggregated, skipping global training");
            }
        }
    }
}

fn print_hospitals(hospitals: &[HospitalRecord]) {
    println!(
        "{:<10} {:<10} {:>8} {:>8}  shared",
        "hospital", "status", "local", "global"
    );
    for hospital in hospitals {
        println!(
            "{:<10} {:<10} {:>7.2}% {:>7.2}%  {}",
            hospital.id.to_string(),
            hospital.status.to_string(),
            hospital.local_accuracy * 100.0,
            hospital.global_accuracy * 100.0,
            if hospital.has_shared_weights { "yes" } else { "no" },
        );
    }
}
