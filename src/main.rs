// Draft tracker entry point.
//
// Startup sequence:
// 1. Initialize tracing (log to file, not terminal)
// 2. Load config
// 3. Open database
// 4. Load projections
// 5. Build the reconciliation controller, restore any prior session
// 6. Build the retry controller from the configured backoff policy
// 7. Run the console loop (blocking until quit or Ctrl+C)

use std::path::Path;
use std::sync::Arc;

use anyhow::Context;
use async_trait::async_trait;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::sync::mpsc;
use tracing::info;

use draft_tracker::config;
use draft_tracker::db::Database;
use draft_tracker::engine::{self, classify, InflationState};
use draft_tracker::ledger::{
    self, ProjectionRecord, SortColumn, SortDirection, SortState, StatusFilter,
};
use draft_tracker::sync::{
    run_attempt, FeedConnector, FeedError, ManualPick, ReconcileController, RetryController,
    SubmitOutcome,
};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // 1. Initialize tracing (log to file, not terminal)
    init_tracing()?;
    info!("Draft tracker starting up");

    // 2. Load config
    let config = config::load_config().context("failed to load configuration")?;
    info!(
        "Config loaded: league={} ({}), ${} budget, min bid {}",
        config.league.id, config.league.name, config.league.initial_budget, config.league.min_bid
    );

    // 3. Open database
    let db = Database::open(&config.db_path).context("failed to open database")?;
    info!("Database opened at {}", config.db_path);

    // 4. Load projections
    let projections = ledger::load_projections(Path::new(&config.projections_path))
        .context("failed to load projections")?;
    info!("Loaded {} projection records", projections.len());

    // 5. Build the reconciliation controller and restore any prior session
    let mut controller = ReconcileController::new(
        ledger::DraftLedger::new(),
        Some(db),
        config.league.min_bid,
    );
    controller.set_my_team_ref(&config.league.my_team_ref);
    controller.restore_league(
        &config.league.id,
        config.league.initial_budget,
        &config.league.roster_config(),
    );

    let league_id = config.league.id.clone();
    let restored = controller
        .ledger()
        .get_draft(&league_id)
        .map(|s| s.drafted_players.len())
        .unwrap_or(0);
    if restored > 0 {
        info!("Restored {restored} picks from previous session");
        println!("Restored {restored} picks from a previous session.");
    } else {
        info!("Starting fresh draft session");
    }

    let mut inflation = controller
        .ledger()
        .get_draft(&league_id)
        .map(|s| engine::recompute(&s.drafted_players, &projections))
        .unwrap_or_default();

    // 6. Build the retry controller from the configured backoff policy
    let (tick_tx, mut tick_rx) = mpsc::channel(16);
    let mut retry = RetryController::new(&league_id, config.sync.retry_policy(), tick_tx);
    retry.set_enabled(config.sync.enabled);
    let connector: Arc<dyn FeedConnector> = Arc::new(OfflineFeed);

    // 7. Run the console loop
    println!("Draft tracker ready. Type 'help' for commands.");
    let stdin = BufReader::new(tokio::io::stdin());
    let mut lines = stdin.lines();

    loop {
        tokio::select! {
            line = lines.next_line() => {
                match line.context("failed to read from stdin")? {
                    Some(line) => {
                        let line = line.trim();
                        if line.is_empty() {
                            continue;
                        }
                        if line == "quit" || line == "exit" {
                            break;
                        }
                        if line == "retry" {
                            println!("Attempting feed reconnect...");
                            attempt_reconnect(&mut controller, &mut retry, &connector).await;
                            continue;
                        }
                        handle_command(
                            &mut controller,
                            &mut inflation,
                            &retry,
                            &league_id,
                            &projections,
                            line,
                        );
                    }
                    None => break, // stdin closed
                }
            }
            Some(tick) = tick_rx.recv() => {
                info!("League {}: scheduled reconnect attempt due", tick.league_id);
                attempt_reconnect(&mut controller, &mut retry, &connector).await;
            }
            _ = tokio::signal::ctrl_c() => {
                println!();
                break;
            }
        }
    }

    info!("Draft tracker shut down cleanly");
    Ok(())
}

// ---------------------------------------------------------------------------
// Feed reconnection
// ---------------------------------------------------------------------------

/// The console build carries no draft-room transport; reconnect
/// attempts report the room unreachable, which the retry machine treats
/// as persistent and stops on.
struct OfflineFeed;

#[async_trait]
impl FeedConnector for OfflineFeed {
    async fn reconnect(&self) -> Result<(), FeedError> {
        Err(FeedError::NotFound)
    }
}

/// Drive one reconnect attempt and fold the outcome into the sync
/// status. `run_attempt` already advances the retry machine, so only
/// the status record is updated here.
async fn attempt_reconnect(
    controller: &mut ReconcileController,
    retry: &mut RetryController,
    connector: &Arc<dyn FeedConnector>,
) {
    let league_id = retry.league_id().to_string();
    controller.mark_syncing(&league_id, true);
    match run_attempt(retry, connector.clone()).await {
        Ok(true) => {
            controller.mark_connected(&league_id);
            println!("Feed reconnected.");
        }
        Ok(false) => {
            controller.mark_syncing(&league_id, false);
            println!("Feed retries are disabled in the configuration.");
        }
        Err(e) => {
            controller.record_feed_error(&league_id, &e);
            if e.is_transient() {
                let delay = retry.state().current_delay;
                println!("Reconnect failed ({e}); next attempt in {delay:?}.");
            } else {
                println!("Reconnect failed ({e}); type 'retry' to attempt again.");
            }
        }
    }
}

// ---------------------------------------------------------------------------
// Console commands
// ---------------------------------------------------------------------------

fn handle_command(
    controller: &mut ReconcileController,
    inflation: &mut InflationState,
    retry: &RetryController,
    league_id: &str,
    projections: &[ProjectionRecord],
    line: &str,
) {
    let parts: Vec<&str> = line.split_whitespace().collect();
    match parts.as_slice() {
        ["help"] => print_help(),

        ["pick", player_id, price] => {
            submit(controller, inflation, league_id, projections, player_id, price, true);
        }
        ["pick", player_id, price, "other"] => {
            submit(controller, inflation, league_id, projections, player_id, price, false);
        }

        ["status"] => print_status(controller, inflation, retry, league_id),
        ["picks"] => print_picks(controller, inflation, league_id),

        ["value", player_id] => {
            match projections.iter().find(|p| p.player_id == *player_id) {
                Some(proj) => {
                    let adjusted = inflation
                        .adjusted_value(player_id)
                        .unwrap_or(proj.projected_value);
                    println!(
                        "{}: projected {:.1}, inflation-adjusted {:.1} ({})",
                        proj.player_id, proj.projected_value, adjusted, proj.position
                    );
                }
                None => println!("No projection for '{player_id}'"),
            }
        }

        ["filter", which] => {
            let filter = match *which {
                "all" => Some(StatusFilter::All),
                "user" => Some(StatusFilter::UserTeam),
                "other" => Some(StatusFilter::OtherTeams),
                "manual" => Some(StatusFilter::ManualOnly),
                _ => None,
            };
            match filter {
                Some(f) => controller.ledger_mut().set_status_filter(f),
                None => println!("Unknown filter '{which}' (all|user|other|manual)"),
            }
        }
        ["search", term] => controller.ledger_mut().set_search_filter(term),
        ["search"] => controller.ledger_mut().set_search_filter(""),

        ["sort", column] => {
            let column = match *column {
                "time" => Some(SortColumn::DraftedAt),
                "price" => Some(SortColumn::Price),
                "name" => Some(SortColumn::Name),
                "value" => Some(SortColumn::ProjectedValue),
                _ => None,
            };
            match column {
                Some(column) => controller.ledger_mut().set_sort(SortState {
                    column,
                    direction: SortDirection::Ascending,
                }),
                None => println!("Unknown sort column (time|price|name|value)"),
            }
        }

        ["manual", "on"] => {
            controller.set_manual_mode(league_id, true);
            println!("Manual mode on: manual entries are authoritative.");
        }
        ["manual", "off"] => {
            controller.set_manual_mode(league_id, false);
            println!("Manual mode off.");
        }

        ["clear"] => {
            controller.clear_league(league_id);
            *inflation = InflationState::default();
            println!("Draft state cleared. Restart to begin a new session.");
        }

        _ => println!("Unrecognized command. Type 'help' for commands."),
    }
}

#[allow(clippy::too_many_arguments)]
fn submit(
    controller: &mut ReconcileController,
    inflation: &mut InflationState,
    league_id: &str,
    projections: &[ProjectionRecord],
    player_id: &str,
    price: &str,
    for_user_team: bool,
) {
    let Ok(price) = price.parse::<f64>() else {
        println!("'{price}' is not a valid price");
        return;
    };

    let projection = projections.iter().find(|p| p.player_id == player_id);
    let entry = ManualPick {
        player_id: player_id.to_string(),
        player_name: player_id.to_string(),
        position: projection
            .map(|p| p.position.clone())
            .unwrap_or_else(|| "UTIL".to_string()),
        price,
        for_user_team,
    };

    match controller.submit_manual_pick(league_id, &entry, projections) {
        Ok(Some(SubmitOutcome { pick, inflation: new_inflation })) => {
            let verdict = classify(Some(pick.purchase_price), pick.projected_value);
            println!(
                "Recorded {} for {:.0} ({}, {}) -- {}",
                pick.player_id, pick.purchase_price, pick.position, pick.drafted_by, verdict
            );
            *inflation = new_inflation;
            println!(
                "Overall inflation: {:+.1}%, {} undrafted players tracked",
                inflation.overall_rate * 100.0,
                inflation.players_remaining
            );
        }
        Ok(None) => println!("Unknown league '{league_id}'"),
        Err(e) => println!("Rejected: {e}"),
    }
}

fn print_status(
    controller: &ReconcileController,
    inflation: &InflationState,
    retry: &RetryController,
    league_id: &str,
) {
    let Some(state) = controller.ledger().get_draft(league_id) else {
        println!("No draft state for league '{league_id}'");
        return;
    };

    println!("League {league_id}:");
    println!(
        "  budget: {:.0} of {:.0} remaining",
        state.remaining_budget, state.initial_budget
    );
    println!(
        "  roster: {} filled, {} open",
        state.roster.filled_count(),
        state.roster.open_count()
    );
    println!("  picks recorded: {}", state.drafted_players.len());
    println!(
        "  overall inflation: {:+.1}%",
        inflation.overall_rate * 100.0
    );

    if let Some(status) = controller.sync_status(league_id) {
        println!(
            "  sync: connected={}, syncing={}, manual_mode={}, failures={}",
            status.is_connected, status.is_syncing, status.is_manual_mode, status.failure_count
        );
        if let Some(err) = &status.last_error {
            println!("  last sync error: {err}");
        }
    }

    let retry_state = retry.state();
    println!(
        "  retry: enabled={}, attempts={}, next delay {:?}, in flight={}",
        retry.is_enabled(),
        retry_state.retry_count,
        retry_state.current_delay,
        retry_state.is_retrying
    );
}

fn print_picks(controller: &ReconcileController, inflation: &InflationState, league_id: &str) {
    let picks = controller.ledger().visible_picks(league_id);
    if picks.is_empty() {
        println!("No picks match the current view.");
        return;
    }

    for pick in picks {
        let adjusted = inflation
            .adjusted_value(&pick.player_id)
            .unwrap_or(pick.projected_value);
        let verdict = classify(Some(pick.purchase_price), adjusted);
        let tag = if pick.is_manual_entry { "manual" } else { "feed" };
        println!(
            "  {:<24} {:>5.0}  proj {:>5.1}  {:<4} {:<5} {:<6} {}",
            pick.player_name, pick.purchase_price, pick.projected_value, pick.position,
            pick.drafted_by, tag, verdict
        );
    }
}

fn print_help() {
    println!("Commands:");
    println!("  pick <player_id> <price>          record your own winning bid");
    println!("  pick <player_id> <price> other    record another team's pick");
    println!("  status                            budget, roster, inflation, sync state");
    println!("  picks                             list picks under the current view");
    println!("  value <player_id>                 projected and inflation-adjusted value");
    println!("  filter all|user|other|manual      filter the pick list");
    println!("  search [term]                     name filter (no term clears it)");
    println!("  sort time|price|name|value        sort the pick list");
    println!("  manual on|off                     toggle manual fallback mode");
    println!("  retry                             force a feed reconnect attempt now");
    println!("  clear                             wipe this league's draft state");
    println!("  quit                              exit");
}

/// Initialize tracing to log to a file (not the terminal, which is used
/// by the console).
fn init_tracing() -> anyhow::Result<()> {
    use tracing_subscriber::fmt;
    use tracing_subscriber::EnvFilter;

    let log_dir = std::env::current_dir()?.join("logs");
    std::fs::create_dir_all(&log_dir)?;

    let log_file = std::fs::File::create(log_dir.join("draft-tracker.log"))?;

    let subscriber = fmt::Subscriber::builder()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("draft_tracker=info,warn")),
        )
        .with_writer(log_file)
        .with_ansi(false)
        .with_target(true)
        .with_thread_ids(true)
        .with_line_number(true)
        .finish();

    tracing::subscriber::set_global_default(subscriber)
        .context("failed to set tracing subscriber")?;

    Ok(())
}
