use anyhow::{bail, Context};
use content_shield_lib::models::AnalysisRequest;
use content_shield_lib::services::text_processor::normalize_punctuation;
use content_shield_lib::services::ConfigEdit;
use content_shield_lib::{build_analyzer, init_logging, load_config, open_config_store};
use std::io::Read;
use std::path::PathBuf;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

const USAGE: &str = "Usage:\n  analyze_text <path|-> [--strategy <name>] [--content-type <type>] [--seed <n>] [--config <dir>] [--out <json_path>]\n  analyze_text --list-strategies [--config <dir>]\n  analyze_text [--set-key <provider> <key>] [--delete-key <provider>] [--set-url <provider> <url>] [--config <dir>]\n\nNotes:\n  - `-` reads the text from stdin.\n  - `--seed` switches every provider to the deterministic simulator.\n  - Ctrl-C cancels an in-flight analysis.\n  - Config edits are saved in one write; the previous file is kept under backups/.";

fn parse_arg_value(args: &[String], key: &str) -> Option<String> {
    args.iter()
        .position(|a| a == key)
        .and_then(|i| args.get(i + 1))
        .cloned()
}

fn has_flag(args: &[String], key: &str) -> bool {
    args.iter().any(|a| a == key)
}

fn parse_arg_values(args: &[String], key: &str, count: usize) -> anyhow::Result<Vec<Vec<String>>> {
    let mut found = Vec::new();
    for (i, _) in args.iter().enumerate().filter(|(_, a)| *a == key) {
        let values: Vec<String> = args.iter().skip(i + 1).take(count).cloned().collect();
        if values.len() < count || values.iter().any(|v| v.starts_with("--")) {
            bail!("{} expects {} value(s)\n\n{}", key, count, USAGE);
        }
        found.push(values);
    }
    Ok(found)
}

/// Edits are grouped: key sets, key deletes, then endpoint URLs.
fn parse_config_edits(args: &[String]) -> anyhow::Result<Vec<ConfigEdit>> {
    let mut edits = Vec::new();
    for v in parse_arg_values(args, "--set-key", 2)? {
        edits.push(ConfigEdit::SetApiKey { provider: v[0].clone(), key: v[1].clone() });
    }
    for v in parse_arg_values(args, "--delete-key", 1)? {
        edits.push(ConfigEdit::DeleteApiKey { provider: v[0].clone() });
    }
    for v in parse_arg_values(args, "--set-url", 2)? {
        edits.push(ConfigEdit::SetProviderUrl { provider: v[0].clone(), url: v[1].clone() });
    }
    Ok(edits)
}

fn read_input(path: &str) -> anyhow::Result<String> {
    if path == "-" {
        let mut buf = String::new();
        std::io::stdin()
            .read_to_string(&mut buf)
            .context("read stdin failed")?;
        return Ok(buf);
    }
    std::fs::read_to_string(path).with_context(|| format!("read file failed: {}", path))
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args: Vec<String> = std::env::args().collect();
    if args.len() < 2 || has_flag(&args, "--help") || has_flag(&args, "-h") {
        eprintln!("{}", USAGE);
        return Ok(());
    }

    init_logging();

    let config_dir = parse_arg_value(&args, "--config").map(PathBuf::from);
    let edits = parse_config_edits(&args)?;
    if !edits.is_empty() {
        let store = open_config_store(config_dir)?;
        store.apply(&edits).map_err(anyhow::Error::msg)?;
        for edit in &edits {
            println!("{}", edit.describe());
        }
        println!("Saved {}", store.config_file().display());
        return Ok(());
    }

    let mut config = load_config(config_dir)?;
    if let Some(seed) = parse_arg_value(&args, "--seed") {
        config.simulation.enabled = true;
        config.simulation.seed = seed
            .parse()
            .with_context(|| format!("invalid --seed value: {}", seed))?;
    }
    let analyzer = build_analyzer(&config)?;

    if has_flag(&args, "--list-strategies") {
        for s in analyzer.strategies() {
            let weights: Vec<String> = s
                .provider_ids
                .iter()
                .map(|id| format!("{}={:.2}", id, s.weight(id)))
                .collect();
            println!(
                "{:<14} threshold={:.2}  {}  ({})",
                s.name,
                s.threshold,
                weights.join(" "),
                s.description
            );
        }
        return Ok(());
    }

    let path = args[1].clone();
    if path.starts_with("--") {
        bail!("missing input path\n\n{}", USAGE);
    }

    let text = normalize_punctuation(&read_input(&path)?);
    let mut request = AnalysisRequest::new(&text);
    if let Some(strategy) = parse_arg_value(&args, "--strategy") {
        request = request.with_strategy(&strategy);
    }
    if let Some(content_type) = parse_arg_value(&args, "--content-type") {
        request.content_type = content_type;
    }
    request.validate()?;

    let cancel = CancellationToken::new();
    let ctrl_c_token = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            warn!("[CLI] Ctrl-C received, cancelling analysis");
            ctrl_c_token.cancel();
        }
    });

    info!(
        input = %path,
        chars = text.chars().count(),
        strategy = request.strategy.as_deref().unwrap_or(analyzer.default_strategy()),
        "[CLI] Analyzing"
    );
    let bundle = analyzer.analyze_with_cancel(&request, &cancel).await?;

    let json = serde_json::to_string_pretty(&bundle)?;
    if let Some(out_path) = parse_arg_value(&args, "--out") {
        std::fs::write(&out_path, &json).with_context(|| format!("write output failed: {}", out_path))?;
        info!("[CLI] Wrote {}", out_path);
    }
    println!("{}", json);

    Ok(())
}
