use rust_decimal::Decimal;
use std::sync::Arc;
use std::time::Duration;
use swarm_clock::SystemClock;
use swarm_core::InstrumentConstraints;
use swarm_gateway::PaperExchange;
use swarm_notify::{LogNotifier, TelegramNotifier};
use swarm_ports::{Clock, NoopListener, Notifier};
use swarm_runner::{AlertPayload, LogRecorder, Swarm, SwarmConfig, SwarmDeps};
use swarm_signals::IngestResult;
use tokio::io::{AsyncBufReadExt, BufReader};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let config = SwarmConfig::from_env()?;
    log::info!("Starting swarm (dry run against paper exchange)...");

    let notifier: Arc<dyn Notifier> = match &config.telegram {
        Some(creds) => Arc::new(TelegramNotifier::new(
            creds.token.clone(),
            creds.chat_id.clone(),
            config.notify.send_timeout,
        )?),
        None => {
            log::info!("TELEGRAM_TOKEN/CHAT_ID not set, notifications go to the log");
            Arc::new(LogNotifier)
        }
    };

    let clock: Arc<dyn Clock> = Arc::new(SystemClock::new());
    let paper = Arc::new(PaperExchange::new());
    let symbol_style = config.symbol_style;

    let swarm = Swarm::start(
        config,
        SwarmDeps {
            clock: clock.clone(),
            gateway: paper.clone(),
            notifier,
            listener: Arc::new(NoopListener),
            recorder: Arc::new(LogRecorder),
        },
    );

    // Default lot constraints for any symbol seen in a dry run
    let dry_run_constraints = InstrumentConstraints::new(Decimal::new(1, 2), Decimal::new(1, 2));

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    loop {
        let line = tokio::select! {
            _ = tokio::signal::ctrl_c() => {
                log::info!("Ctrl-C received");
                break;
            }
            next = lines.next_line() => match next? {
                Some(line) => line,
                None => break,
            },
        };
        if line.trim().is_empty() {
            continue;
        }

        let result = match AlertPayload::parse(&line)
            .and_then(|payload| payload.into_signal(clock.now(), symbol_style))
        {
            Ok(signal) => {
                paper.ensure_instrument(&signal.symbol, dry_run_constraints.clone());
                if let Some(entry) = signal.entry {
                    paper.set_last_price(&signal.symbol, entry);
                }
                swarm.ingest(signal)
            }
            // Re-run through the dispatcher so the rejection is recorded
            Err(_) => swarm.ingest_raw(&line),
        };

        match &result {
            IngestResult::Rejected(reason) => println!("{}: {}", result.as_str(), reason),
            _ => println!("{}", result.as_str()),
        }
    }

    let summary = tokio::time::timeout(Duration::from_secs(30), swarm.shutdown()).await?;
    log::info!("Stopped: {:?}", summary);
    Ok(())
}
