use anyhow::Result;
use chrono::{DateTime, Local, NaiveTime};
use clap::Parser;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use teloxide::dptree;
use teloxide::prelude::*;
use tracing::{error, info};

use tg_regbot::app::App;
use tg_regbot::sheets::SheetsClient;
use tg_regbot::tasks::ReminderMode;
use tg_regbot::telegram::TelegramMessenger;
use tg_regbot::{config, handlers, payments, tasks};

#[derive(Debug, Parser)]
#[command(author, version, about)]
struct Args {
    /// Path to YAML config file
    #[arg(long, default_value = "config.yaml")]
    config: PathBuf,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_target(false)
        .compact()
        .init();

    let args = Args::parse();
    let cfg = config::load(Some(&args.config))?;

    let bot = Bot::new(cfg.telegram.bot_token.clone());
    let store = Arc::new(SheetsClient::from_config(&cfg));
    let messenger = Arc::new(TelegramMessenger::new(bot.clone()));
    let app = Arc::new(App::new(cfg, store, messenger));

    // Register watcher: one pass over both registers per interval. Passes
    // are idempotent, so a crashed pass just runs again next time.
    let watcher = app.clone();
    let poll_sleep = Duration::from_millis(watcher.cfg.app.poll_interval_ms);
    tokio::spawn(async move {
        loop {
            if let Err(err) = payments::watch_once(&watcher).await {
                error!(?err, "payments watch failed");
            }
            let today = Local::now().date_naive();
            if let Err(err) = tasks::watch_once(&watcher, today).await {
                error!(?err, "tasks watch failed");
            }
            tokio::time::sleep(poll_sleep).await;
        }
    });

    // Daily triggers: morning pull + reminders, evening overdue broadcast.
    let scheduler = app.clone();
    tokio::spawn(async move {
        scheduler_loop(scheduler).await;
    });

    info!("starting telegram bot");
    Dispatcher::builder(bot, handlers::schema())
        .dependencies(dptree::deps![app.clone()])
        .enable_ctrlc_handler()
        .build()
        .dispatch()
        .await;

    Ok(())
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Slot {
    Morning,
    Evening,
}

async fn scheduler_loop(app: Arc<App>) {
    loop {
        let (wait, slot) = next_slot(
            Local::now(),
            app.cfg.app.morning_hour,
            app.cfg.app.evening_hour,
        );
        tokio::time::sleep(wait).await;
        let today = Local::now().date_naive();
        match slot {
            Slot::Morning => {
                if let Err(err) = payments::set_today_date(&app, today).await {
                    error!(?err, "failed to set the register date");
                }
                if let Err(err) = payments::refresh_register(&app, today).await {
                    error!(?err, "morning register refresh failed");
                }
                if let Err(err) = tasks::notify_in_progress(&app, ReminderMode::Morning, today).await
                {
                    error!(?err, "morning task reminders failed");
                }
            }
            Slot::Evening => {
                if let Err(err) = payments::notify_unpaid(&app, today).await {
                    error!(?err, "evening unpaid broadcast failed");
                }
                if let Err(err) = tasks::notify_in_progress(&app, ReminderMode::Evening, today).await
                {
                    error!(?err, "evening task reminders failed");
                }
            }
        }
    }
}

/// Time until the next morning/evening slot after `now`. Falls back to an
/// hour when no local time resolves (DST edges).
fn next_slot(now: DateTime<Local>, morning_hour: u32, evening_hour: u32) -> (Duration, Slot) {
    let mut best: Option<(DateTime<Local>, Slot)> = None;
    for days_ahead in 0..2u64 {
        let day = now.date_naive() + chrono::Days::new(days_ahead);
        for (hour, slot) in [(morning_hour, Slot::Morning), (evening_hour, Slot::Evening)] {
            let Some(time) = NaiveTime::from_hms_opt(hour, 0, 0) else {
                continue;
            };
            let Some(at) = day.and_time(time).and_local_timezone(Local).earliest() else {
                continue;
            };
            if at > now && best.map_or(true, |(b, _)| at < b) {
                best = Some((at, slot));
            }
        }
    }
    match best {
        Some((at, slot)) => {
            let wait = (at - now).to_std().unwrap_or(Duration::from_secs(1));
            (wait, slot)
        }
        None => (Duration::from_secs(3600), Slot::Morning),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn local(y: i32, m: u32, d: u32, h: u32, min: u32) -> DateTime<Local> {
        Local.with_ymd_and_hms(y, m, d, h, min, 0).unwrap()
    }

    #[test]
    fn picks_the_nearest_future_slot() {
        let (wait, slot) = next_slot(local(2026, 6, 1, 6, 0), 7, 18);
        assert_eq!(slot, Slot::Morning);
        assert_eq!(wait, Duration::from_secs(3600));

        let (wait, slot) = next_slot(local(2026, 6, 1, 12, 0), 7, 18);
        assert_eq!(slot, Slot::Evening);
        assert_eq!(wait, Duration::from_secs(6 * 3600));

        // Past the evening run, the next slot is tomorrow morning.
        let (wait, slot) = next_slot(local(2026, 6, 1, 20, 0), 7, 18);
        assert_eq!(slot, Slot::Morning);
        assert_eq!(wait, Duration::from_secs(11 * 3600));
    }
}
