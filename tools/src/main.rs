//! campaign-runner: headless driver for the ad campaign simulator.
//!
//! Usage:
//!   campaign-runner --seed 12345 --genre "Casual Game" --budget 1200 --db history.db
//!   campaign-runner --seed 12345 --ipc-mode
//!
//! Strategy flags (all optional, sensible defaults):
//!   --age 25-34  --interests gaming,lifestyle  --formats "Playable Ads,Gameplay Videos"
//!   --bid moderate  --notifications occasional  --content regular  --events on
//!   --engagement medium  --ad-formats rewarded,interstitial  --ad-frequency medium
//!   --iap medium  --promos limited  --config balance.json  --no-perturbation

use adsim_core::{
    achievements::Achievement,
    advisor::Recommendation,
    command::GameCommand,
    config::BalanceConfig,
    engine::{CampaignEngine, PhaseReport},
    genre::Genre,
    preview::Preview,
    state::{GameState, MetricsSnapshot, Phase},
    store::{CampaignHistoryEntry, HistoryStore, HistorySummary},
    strategy::{
        AdFormat, AudiencePatch, BiddingStrategy, CreativeFormat, Interest, MonetizationPatch,
        RetentionPatch,
    },
};
use anyhow::{Context, Result};
use serde::de::DeserializeOwned;
use std::env;
use std::io::{self, BufRead, Write};

#[derive(serde::Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
enum IpcCommand {
    GetState,
    Start,
    ChooseGenre { genre: Genre },
    SetBudget { budget: f64 },
    SetAudience { patch: AudiencePatch },
    SetCreatives { formats: Vec<CreativeFormat> },
    ContinueStep,
    BackStep,
    ChooseBidding { strategy: BiddingStrategy },
    SetRetentionStrategy { patch: RetentionPatch },
    CalculateRetention,
    AdvanceToMonetization,
    SetMonetizationStrategy { patch: MonetizationPatch },
    CalculateMonetization,
    Finish,
    Preview { phase: Phase },
    Recommendations { phase: Phase },
    History,
    /// A raw reducer command, e.g. `{"type":"command","command":{"cmd":"RESET_GAME"}}`.
    Command { command: GameCommand },
    Quit,
}

#[derive(serde::Serialize)]
struct UiState<'a> {
    seed: u64,
    state: &'a GameState,
    metrics: MetricsSnapshot,
    achievements: Vec<Achievement>,
    #[serde(skip_serializing_if = "Option::is_none")]
    report: Option<PhaseReport>,
}

#[derive(serde::Serialize)]
struct HistoryView {
    campaigns: Vec<CampaignHistoryEntry>,
    summary: Option<HistorySummary>,
}

/// Strategy choices gathered from the command line.
struct Plan {
    genre: Genre,
    budget: f64,
    audience: AudiencePatch,
    formats: Vec<CreativeFormat>,
    bid: BiddingStrategy,
    retention: RetentionPatch,
    monetization: MonetizationPatch,
}

fn main() -> Result<()> {
    env_logger::init();

    let args: Vec<String> = env::args().collect();
    let seed = parse_arg(&args, "--seed", 42u64);
    let ipc_mode = args.iter().any(|a| a == "--ipc-mode");
    let db = flag_value(&args, "--db").unwrap_or(":memory:");

    let mut config = match flag_value(&args, "--config") {
        Some(path) => BalanceConfig::load(path)?,
        None => BalanceConfig::canonical(),
    };
    if args.iter().any(|a| a == "--no-perturbation") {
        config = config.without_perturbation();
    }

    let store = HistoryStore::open(db, config.history_capacity)
        .with_context(|| format!("Cannot open history database {db}"))?;
    store.migrate()?;

    if !ipc_mode {
        println!("Ad Campaign Simulator: campaign-runner");
        println!("  seed:      {seed}");
        println!("  db:        {db}");
        println!();
    }

    let mut engine = CampaignEngine::new(config, seed).with_history(store);

    if ipc_mode {
        run_ipc_loop(&mut engine)?;
    } else {
        let plan = parse_plan(&args)?;
        play(&mut engine, &plan)?;
        print_summary(&engine)?;
    }

    Ok(())
}

// ── Scripted play-through ──────────────────────────────────────────

fn parse_plan(args: &[String]) -> Result<Plan> {
    let audience = AudiencePatch {
        age_group: Some(choice(args, "--age", "25-34")?),
        interests: Some(choice_list::<Interest>(args, "--interests", "gaming")?.into_iter().collect()),
        ..Default::default()
    };
    let special_events = match flag_value(args, "--events").unwrap_or("on") {
        "on" | "true" | "yes" => true,
        "off" | "false" | "no" => false,
        other => anyhow::bail!("--events expects on/off, got {other:?}"),
    };
    Ok(Plan {
        genre: choice(args, "--genre", "Casual Game")?,
        budget: parse_arg(args, "--budget", 1000.0),
        audience,
        formats: choice_list(args, "--formats", "Playable Ads,Gameplay Videos")?,
        bid: choice(args, "--bid", "moderate")?,
        retention: RetentionPatch {
            notification_frequency: Some(choice(args, "--notifications", "occasional")?),
            content_updates: Some(choice(args, "--content", "regular")?),
            special_events: Some(special_events),
            engagement_spend: Some(choice(args, "--engagement", "medium")?),
        },
        monetization: MonetizationPatch {
            ad_formats: Some(
                choice_list::<AdFormat>(args, "--ad-formats", "rewarded,interstitial")?
                    .into_iter()
                    .collect(),
            ),
            ad_frequency: Some(choice(args, "--ad-frequency", "medium")?),
            iap_pricing: Some(choice(args, "--iap", "medium")?),
            promotional_offers: Some(choice(args, "--promos", "limited")?),
        },
    })
}

fn play(engine: &mut CampaignEngine, plan: &Plan) -> Result<()> {
    engine.start()?;
    engine.choose_genre(plan.genre)?;
    engine.set_budget(plan.budget)?;
    engine.continue_step()?;
    engine.set_audience(plan.audience.clone())?;
    engine.continue_step()?;
    engine.set_creatives(plan.formats.clone())?;
    engine.continue_step()?;

    let report = engine.choose_bidding(plan.bid)?;
    print_report(Phase::Acquisition, &report);

    engine.set_retention_strategy(plan.retention.clone())?;
    let report = engine.calculate_retention()?;
    print_report(Phase::Retention, &report);
    engine.advance_to_monetization()?;

    engine.set_monetization_strategy(plan.monetization.clone())?;
    let report = engine.calculate_monetization()?;
    print_report(Phase::Monetization, &report);

    engine.finish()?;
    Ok(())
}

fn print_report(phase: Phase, report: &PhaseReport) {
    println!("--- {phase} ---");
    for ev in &report.market_events {
        println!("  [{:?}] {}: {}", ev.polarity, ev.title, ev.description);
    }
    for msg in &report.feedback {
        println!("  * {msg}");
    }
}

fn print_summary(engine: &CampaignEngine) -> Result<()> {
    let s = engine.state();
    let m = s.metrics_snapshot();

    println!();
    println!("=== CAMPAIGN SUMMARY ===");
    if let Some(genre) = s.app_genre {
        println!("  genre:          {genre}");
    }
    println!("  budget:         ${:.0}", m.budget);
    if let Some(p1) = s.phase1_results {
        println!("  impressions:    {}", p1.impressions);
        println!("  clicks:         {}", p1.clicks);
        println!("  installs:       {}", p1.installs);
        println!("  ctr / cvr:      {:.2}% / {:.2}%", p1.ctr * 100.0, p1.cvr * 100.0);
        println!("  cpi:            ${:.2}", p1.cpi);
    }
    if let Some(p2) = s.phase2_results {
        let r = p2.retention_rates;
        println!("  retention:      D1 {:.1}% | D7 {:.1}% | D30 {:.1}%", r.d1, r.d7, r.d30);
        println!("  dau:            {}", p2.dau);
        println!("  session:        {:.1} min", p2.session_length);
    }
    if let Some(p3) = s.phase3_results {
        println!("  arpdau:         ${:.3}", p3.arpdau);
        println!("  ad / iap:       ${:.2} / ${:.2}", p3.ad_revenue, p3.iap_revenue);
    }
    if let Some(fin) = &s.final_results {
        println!("  revenue:        ${:.2}", fin.total_revenue);
        println!("  roas:           {:.2}x", fin.roas);
        println!();
        println!("=== INSIGHTS ===");
        for line in &fin.insights {
            println!("  - {line}");
        }
    }

    println!();
    println!("=== ACHIEVEMENTS ===");
    let unlocked = engine.achievements();
    if unlocked.is_empty() {
        println!("  (none unlocked)");
    }
    for a in unlocked {
        println!("  {} - {}", a.title(), a.description());
    }

    println!();
    println!("=== RECOMMENDATIONS ===");
    for phase in [Phase::Acquisition, Phase::Retention, Phase::Monetization] {
        for r in engine.recommendations(phase) {
            println!("  [{phase}] {}", r.message());
        }
    }

    if let Some(store) = engine.history() {
        println!();
        println!("=== HISTORY ({} of {}) ===", store.len()?, store.capacity());
        match store.summary()? {
            Some(h) => {
                println!("  best roas:      {:.2}x", h.best_roas);
                println!("  best d7:        {:.1}%", h.best_retention_d7);
                for formats in h.winning_creatives {
                    let names: Vec<&str> = formats.iter().map(|f| f.label()).collect();
                    println!("  winning mix:    {}", names.join(" + "));
                }
            }
            None => println!("  (play another campaign to compare)"),
        }
    }
    Ok(())
}

// ── IPC ────────────────────────────────────────────────────────────

fn run_ipc_loop(engine: &mut CampaignEngine) -> Result<()> {
    let stdin = io::stdin();
    let mut stdout = io::stdout();
    let mut handle = stdin.lock();
    let mut buffer = String::new();

    loop {
        buffer.clear();
        let bytes_read = handle.read_line(&mut buffer)?;
        if bytes_read == 0 {
            break; // EOF
        }
        if buffer.trim().is_empty() {
            continue;
        }

        let cmd: IpcCommand = match serde_json::from_str(&buffer) {
            Ok(c) => c,
            Err(e) => {
                write_error(&mut stdout, &e.to_string())?;
                continue;
            }
        };
        if matches!(cmd, IpcCommand::Quit) {
            break;
        }

        match handle_command(engine, cmd) {
            Ok(json) => writeln!(stdout, "{json}")?,
            Err(e) => {
                log::warn!("ipc: command rejected: {e}");
                write_error(&mut stdout, &e.to_string())?;
                continue;
            }
        }
        stdout.flush()?;
    }
    Ok(())
}

fn handle_command(engine: &mut CampaignEngine, cmd: IpcCommand) -> Result<String> {
    let mut report = None;
    match cmd {
        IpcCommand::GetState | IpcCommand::Quit => {}
        IpcCommand::Start => engine.start()?,
        IpcCommand::ChooseGenre { genre } => engine.choose_genre(genre)?,
        IpcCommand::SetBudget { budget } => engine.set_budget(budget)?,
        IpcCommand::SetAudience { patch } => engine.set_audience(patch)?,
        IpcCommand::SetCreatives { formats } => engine.set_creatives(formats)?,
        IpcCommand::ContinueStep => engine.continue_step()?,
        IpcCommand::BackStep => engine.back_step()?,
        IpcCommand::ChooseBidding { strategy } => report = Some(engine.choose_bidding(strategy)?),
        IpcCommand::SetRetentionStrategy { patch } => engine.set_retention_strategy(patch)?,
        IpcCommand::CalculateRetention => report = Some(engine.calculate_retention()?),
        IpcCommand::AdvanceToMonetization => engine.advance_to_monetization()?,
        IpcCommand::SetMonetizationStrategy { patch } => engine.set_monetization_strategy(patch)?,
        IpcCommand::CalculateMonetization => report = Some(engine.calculate_monetization()?),
        IpcCommand::Finish => engine.finish()?,
        IpcCommand::Command { command } => engine.dispatch(command)?,
        IpcCommand::Preview { phase } => {
            let preview: Preview = engine.preview(phase)?;
            return Ok(serde_json::to_string(&preview)?);
        }
        IpcCommand::Recommendations { phase } => {
            let recs: Vec<(Recommendation, &str)> = engine
                .recommendations(phase)
                .into_iter()
                .map(|r| (r, r.message()))
                .collect();
            return Ok(serde_json::to_string(&recs)?);
        }
        IpcCommand::History => {
            let view = match engine.history() {
                Some(store) => HistoryView { campaigns: store.recent()?, summary: store.summary()? },
                None => HistoryView { campaigns: Vec::new(), summary: None },
            };
            return Ok(serde_json::to_string(&view)?);
        }
    }

    let state = UiState {
        seed: engine.seed(),
        state: engine.state(),
        metrics: engine.state().metrics_snapshot(),
        achievements: engine.achievements(),
        report,
    };
    Ok(serde_json::to_string(&state)?)
}

fn write_error(stdout: &mut io::Stdout, message: &str) -> Result<()> {
    let err_json = serde_json::json!({ "error": message });
    writeln!(stdout, "{}", err_json)?;
    stdout.flush()?;
    Ok(())
}

// ── Argument helpers ───────────────────────────────────────────────

fn flag_value<'a>(args: &'a [String], flag: &str) -> Option<&'a str> {
    args.windows(2).find(|w| w[0] == flag).map(|w| w[1].as_str())
}

fn parse_arg<T: std::str::FromStr + Copy>(args: &[String], flag: &str, default: T) -> T {
    args.windows(2)
        .find(|w| w[0] == flag)
        .and_then(|w| w[1].parse().ok())
        .unwrap_or(default)
}

/// Enum flags use the same names as the JSON surface.
fn choice<T: DeserializeOwned>(args: &[String], flag: &str, default: &str) -> Result<T> {
    let raw = flag_value(args, flag).unwrap_or(default);
    serde_json::from_value(serde_json::Value::String(raw.trim().to_string()))
        .with_context(|| format!("{flag}: unrecognised value {raw:?}"))
}

fn choice_list<T: DeserializeOwned>(args: &[String], flag: &str, default: &str) -> Result<Vec<T>> {
    flag_value(args, flag)
        .unwrap_or(default)
        .split(',')
        .filter(|s| !s.trim().is_empty())
        .map(|item| {
            serde_json::from_value(serde_json::Value::String(item.trim().to_string()))
                .with_context(|| format!("{flag}: unrecognised value {item:?}"))
        })
        .collect()
}
