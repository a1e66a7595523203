mod agent;
mod cloud;
mod config;
mod domain;
mod notify;
mod prayer;
mod store;
mod sync;
mod worker;

use chrono::{Local, SecondsFormat};
use clap::{Parser, Subcommand, ValueEnum};
use color_eyre::{eyre::eyre, Result};
use std::path::PathBuf;
use std::sync::Arc;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::EnvFilter;
use url::Url;

use crate::agent::Agent;
use crate::cloud::{CloudSync, SupabaseClient, SyncOutcome};
use crate::config::Config;
use crate::domain::{Appointment, Location, Task};
use crate::notify::{DesktopNotifier, Notification, NotificationSink, NullNotifier};
use crate::prayer::{format_countdown, minutes_until, next_prayer, now_minutes, PrayerSchedule};
use crate::store::Store;
use crate::sync::SyncCoordinator;
use crate::worker::{
  CacheRouter, ClientAction, ClientRegistry, FetchRequest, HttpNetwork, ServiceWorker, CACHE_NAME,
};

#[derive(Parser, Debug)]
#[command(name = "barakah")]
#[command(about = "Offline-first sync agent for the Barakah personal-management app")]
#[command(version)]
struct Args {
  /// Path to config file (default: $XDG_CONFIG_HOME/barakah/config.yaml)
  #[arg(short, long)]
  config: Option<PathBuf>,

  #[command(subcommand)]
  command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
  /// Sync local data with the cloud
  Sync {
    /// Skip the result notification
    #[arg(short, long)]
    quiet: bool,
  },
  /// Replace local data with the cloud copy
  Pull {
    /// Skip the result notification
    #[arg(short, long)]
    quiet: bool,
  },
  /// Turn scheduled background syncing on or off
  Autosync {
    #[arg(value_enum)]
    state: Toggle,
  },
  /// Show sync state, cached data and the next prayer
  Status,
  /// Run the background agent until interrupted
  Agent,
  /// Resolve one URL through the worker's cache strategies
  Fetch {
    url: Url,
    /// Treat the request as a page navigation
    #[arg(long)]
    navigate: bool,
  },
  /// Deliver a push payload as a notification
  Push {
    /// JSON payload; omit to exercise the drop path
    #[arg(long)]
    payload: Option<String>,
    /// Simulate tapping the shown notification
    #[arg(long)]
    click: bool,
    /// Open a client window on this URL before delivering
    #[arg(long)]
    window: Option<Url>,
  },
  /// Acknowledge a background sync registration
  BackgroundSync {
    /// Registration tag
    #[arg(default_value = "sync-transactions")]
    tag: String,
  },
  /// Read or set the daily prayer schedule
  #[command(subcommand)]
  Prayer(PrayerCommand),
}

#[derive(Subcommand, Debug)]
enum PrayerCommand {
  /// Show the saved schedule and the next prayer
  Show,
  /// Store today's prayer times (HH:MM each)
  Set {
    fajr: String,
    sunrise: String,
    dhuhr: String,
    asr: String,
    maghrib: String,
    isha: String,
  },
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum Toggle {
  On,
  Off,
}

#[tokio::main]
async fn main() -> Result<()> {
  color_eyre::install()?;

  let args = Args::parse();
  let _guard = init_tracing(matches!(args.command, Command::Agent))?;

  let config = Config::load(args.config.as_deref())?;

  match args.command {
    Command::Sync { quiet } => {
      let store = open_store()?;
      let coordinator = cloud_coordinator(&config, store, notifier(quiet))?;
      finish(coordinator.sync_now(quiet).await)
    }

    Command::Pull { quiet } => {
      let store = open_store()?;
      let coordinator = cloud_coordinator(&config, store, notifier(quiet))?;
      finish(coordinator.pull_data(quiet).await)
    }

    Command::Autosync { state } => {
      let store = open_store()?;
      let coordinator = cloud_coordinator(&config, store, notifier(false))?;
      match coordinator.toggle_auto_sync(matches!(state, Toggle::On)).await? {
        Some(outcome) => finish(outcome),
        None => {
          println!("Auto sync disabled");
          Ok(())
        }
      }
    }

    Command::Status => {
      let store = open_store()?;
      print_status(&config, &store)
    }

    Command::Agent => {
      let store = open_store()?;
      let sink = notifier(false);
      let worker = build_worker(&config, store.clone(), sink.clone())?;
      let coordinator = cloud_coordinator(&config, store.clone(), sink)?;
      let mut agent = Agent::new(store, worker, coordinator);
      agent.run().await
    }

    Command::Fetch { url, navigate } => {
      let store = open_store()?;
      let router = CacheRouter::new(
        store,
        Arc::new(HttpNetwork::new()?),
        CACHE_NAME.to_string(),
        config.backend_host()?,
        config.origin_url()?,
      );
      let request = if navigate {
        FetchRequest::navigate(url)
      } else {
        FetchRequest::get(url)
      };
      let strategy = router.classify(&request);
      let response = router.route(&request).await?;
      println!(
        "{:?}: status {}, {} bytes, stored {}",
        strategy,
        response.status,
        response.body.len(),
        response.stored_at.to_rfc3339_opts(SecondsFormat::Millis, true)
      );
      Ok(())
    }

    Command::Push { payload, click, window } => {
      let store = open_store()?;
      let worker = build_worker(&config, store, notifier(false))?;
      if let Some(url) = window {
        worker.clients().open_window(url)?;
      }
      let notification = match worker.handle_push(payload.as_deref())? {
        Some(notification) => notification,
        None => {
          println!("No notification for this payload");
          return Ok(());
        }
      };
      print_notification(&notification);

      if click {
        match worker.handle_notification_click(&notification)? {
          ClientAction::Focused(id) => println!("Focused window {}", id),
          ClientAction::Opened(id) => println!("Opened window {}", id),
        }
        for window in worker.clients().windows()? {
          println!(
            "  [{}] {}{}",
            window.id,
            window.url,
            if window.focused { " (focused)" } else { "" }
          );
        }
      }
      Ok(())
    }

    Command::BackgroundSync { tag } => {
      let store = open_store()?;
      let worker = build_worker(&config, store, notifier(false))?;
      if worker.handle_background_sync(&tag) {
        println!("Acknowledged sync tag '{}'", tag);
      } else {
        println!("Unknown sync tag '{}'", tag);
      }
      Ok(())
    }

    Command::Prayer(command) => {
      let store = open_store()?;
      run_prayer_command(&store, command)
    }
  }
}

/// Agent mode logs info and above to stderr and a daily file under the
/// data directory; one-shot commands only log warnings to stderr. The
/// returned guard must live until exit so buffered file logs flush.
fn init_tracing(agent_mode: bool) -> Result<Option<tracing_appender::non_blocking::WorkerGuard>> {
  if agent_mode {
    let log_dir = store::default_data_dir()?.join("logs");
    std::fs::create_dir_all(&log_dir)
      .map_err(|e| eyre!("Failed to create log directory {}: {}", log_dir.display(), e))?;

    let (writer, guard) =
      tracing_appender::non_blocking(tracing_appender::rolling::daily(log_dir, "barakah.log"));
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    tracing_subscriber::registry()
      .with(filter)
      .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
      .with(
        tracing_subscriber::fmt::layer()
          .with_writer(writer)
          .with_ansi(false),
      )
      .init();
    Ok(Some(guard))
  } else {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
    tracing_subscriber::registry()
      .with(filter)
      .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
      .init();
    Ok(None)
  }
}

fn open_store() -> Result<Arc<Store>> {
  Ok(Arc::new(Store::open()?))
}

/// Quiet callers drop notifications entirely rather than showing and
/// suppressing them one call at a time.
fn notifier(quiet: bool) -> Arc<dyn NotificationSink> {
  if quiet {
    Arc::new(NullNotifier)
  } else {
    Arc::new(DesktopNotifier)
  }
}

fn cloud_coordinator(
  config: &Config,
  store: Arc<Store>,
  sink: Arc<dyn NotificationSink>,
) -> Result<Arc<SyncCoordinator>> {
  let api_key = Config::get_api_key()?;
  let client = Arc::new(SupabaseClient::new(config.cloud_url()?, api_key)?);
  let remote = Arc::new(CloudSync::new(
    client,
    store.clone(),
    config.cloud.user_id.clone(),
  ));
  Ok(Arc::new(
    SyncCoordinator::new(remote, store, sink).with_interval(config.sync_interval()),
  ))
}

fn build_worker(
  config: &Config,
  store: Arc<Store>,
  sink: Arc<dyn NotificationSink>,
) -> Result<ServiceWorker> {
  let network = Arc::new(HttpNetwork::new()?);
  let clients = Arc::new(ClientRegistry::new());
  ServiceWorker::new(config, store, network, clients, sink)
}

/// Print a success message, or fail the command with the outcome's own
/// message.
fn finish(outcome: SyncOutcome) -> Result<()> {
  if outcome.success {
    println!("{}", outcome.message);
    Ok(())
  } else {
    Err(eyre!("{}", outcome.message))
  }
}

fn print_status(config: &Config, store: &Store) -> Result<()> {
  match &config.cloud.user_id {
    Some(user_id) => println!("Cloud user:   {}", user_id),
    None => println!("Cloud user:   not configured"),
  }
  println!(
    "Auto sync:    {}",
    if store.auto_sync_enabled()? { "on" } else { "off" }
  );
  match store.last_sync()? {
    Some(at) => println!(
      "Last sync:    {}",
      at.to_rfc3339_opts(SecondsFormat::Millis, true)
    ),
    None => println!("Last sync:    never"),
  }
  println!("Cached responses: {}", store.response_count(CACHE_NAME)?);

  let locations: Vec<Location> = store.rows()?;
  let tasks: Vec<Task> = store.rows()?;
  let appointments: Vec<Appointment> = store.rows()?;
  let open_tasks = tasks.iter().filter(|task| !task.completed).count();
  println!("Locations:    {}", locations.len());
  println!("Tasks:        {} ({} open)", tasks.len(), open_tasks);
  println!("Appointments: {}", appointments.len());

  let finances = store.finances()?;
  println!(
    "Balance:      {} {}",
    finances.balance,
    finances.currency.code()
  );

  if let Some(schedule) = store.prayer_schedule()? {
    let now = now_minutes();
    if let Some(next) = next_prayer(&schedule, now) {
      println!(
        "Next prayer:  {} at {} ({})",
        next.prayer.name_ar(),
        next.time,
        format_countdown(minutes_until(&next, now))
      );
    }
  }
  Ok(())
}

fn run_prayer_command(store: &Store, command: PrayerCommand) -> Result<()> {
  match command {
    PrayerCommand::Show => {
      match store.prayer_schedule()? {
        None => println!("No prayer schedule saved"),
        Some(schedule) => {
          println!("Schedule for {}", schedule.date);
          for (prayer, time) in schedule.times() {
            println!("  {:<8} {}  {}", prayer.name(), time, prayer.name_ar());
          }
          let now = now_minutes();
          if let Some(next) = next_prayer(&schedule, now) {
            println!(
              "Next: {} at {} ({})",
              next.prayer.name_ar(),
              next.time,
              format_countdown(minutes_until(&next, now))
            );
          }
        }
      }
      Ok(())
    }
    PrayerCommand::Set {
      fajr,
      sunrise,
      dhuhr,
      asr,
      maghrib,
      isha,
    } => {
      let schedule = PrayerSchedule {
        fajr,
        sunrise,
        dhuhr,
        asr,
        maghrib,
        isha,
        date: Local::now().format("%Y-%m-%d").to_string(),
      };
      schedule.validate()?;
      store.set_prayer_schedule(&schedule)?;
      println!("Prayer schedule saved for {}", schedule.date);
      Ok(())
    }
  }
}

fn print_notification(notification: &Notification) {
  println!(
    "{} [{} {}]",
    notification.title, notification.dir, notification.lang
  );
  println!("  {}", notification.body);
  println!(
    "  tag {} (renotify {})",
    notification.tag, notification.renotify
  );
  println!(
    "  icon {}, badge {}",
    notification.icon, notification.badge
  );
  println!(
    "  url {}, vibrate {:?}",
    notification.url, notification.vibrate
  );
  for action in &notification.actions {
    println!("  action {}: {}", action.action, action.title);
  }
}
