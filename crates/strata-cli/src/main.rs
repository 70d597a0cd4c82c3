use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use serde::Serialize;
use std::path::PathBuf;
use std::sync::Arc;
use tracing_subscriber::EnvFilter;

use strata_core::impls::LocalFsBackend;
use strata_core::{ContentHash, LanguageCode, ModelStore, StoreConfig, StoredModel};

/// ローカルの models ディレクトリを操作する運用ツール
#[derive(Debug, Parser)]
#[command(name = "strata", version, about = "Inspect and maintain stored NLU models")]
struct Cli {
    /// backend のルートディレクトリ
    #[arg(long, env = "STRATA_ROOT", default_value = ".")]
    root: PathBuf,

    /// 設定ファイル（TOML）
    #[arg(long, env = "STRATA_CONFIG")]
    config: Option<PathBuf>,

    /// 設定ファイルの max_models_to_keep を上書き
    #[arg(long)]
    keep: Option<usize>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// 言語ごとの artifact を新しい順に表示
    List { lang: String },
    /// 最新の artifact の概要を表示
    Latest { lang: String },
    /// 指定した artifact の概要を表示
    Inspect { hash: String, lang: String },
    /// 保持件数を適用して古い artifact を削除
    Prune { lang: String },
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct ModelSummary {
    language_code: String,
    started_at: String,
    finished_at: String,
    list_entities: usize,
    cached_records: usize,
    slots_model_bytes: usize,
}

impl From<&StoredModel> for ModelSummary {
    fn from(model: &StoredModel) -> Self {
        Self {
            language_code: model.language_code.to_string(),
            started_at: model.started_at.to_rfc3339(),
            finished_at: model.finished_at.to_rfc3339(),
            list_entities: model.list_entities().len(),
            cached_records: model.list_entities().iter().map(|e| e.cache.len()).sum(),
            slots_model_bytes: model.slots_model().len(),
        }
    }
}

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn load_config(cli: &Cli) -> Result<StoreConfig> {
    let mut config = match &cli.config {
        Some(path) => StoreConfig::load(path)
            .with_context(|| format!("loading config from {}", path.display()))?,
        None => StoreConfig::default(),
    };
    if let Some(keep) = cli.keep {
        config.max_models_to_keep = keep;
    }
    config.validate()?;
    Ok(config)
}

fn print_json<T: Serialize>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

fn print_model(model: Option<StoredModel>, what: &str) -> Result<()> {
    match model {
        Some(model) => print_json(&ModelSummary::from(&model)),
        None => {
            println!("no model for {what}");
            Ok(())
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    init_tracing();
    let cli = Cli::parse();

    // (A) 設定と backend を用意
    let config = load_config(&cli)?;
    let backend = Arc::new(LocalFsBackend::new(&cli.root));
    tracing::debug!(root = %cli.root.display(), models_dir = %config.models_dir, "opening model store");
    let store = ModelStore::new(backend, config);

    // (B) サブコマンドを実行
    match &cli.command {
        Command::List { lang } => {
            let lang = LanguageCode::new(lang.as_str())?;
            for name in store.list(&lang).await? {
                println!("{name}");
            }
        }
        Command::Latest { lang } => {
            let lang = LanguageCode::new(lang.as_str())?;
            let model = store.get_latest(&lang).await?;
            print_model(model, &format!("language '{lang}'"))?;
        }
        Command::Inspect { hash, lang } => {
            let hash = ContentHash::new(hash.as_str())?;
            let lang = LanguageCode::new(lang.as_str())?;
            let model = store.get(&hash, &lang).await?;
            print_model(model, &format!("{hash}.{lang}"))?;
        }
        Command::Prune { lang } => {
            let lang = LanguageCode::new(lang.as_str())?;
            let report = store.prune(&lang).await?;
            print_json(&report)?;
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn cli_definition_is_valid() {
        Cli::command().debug_assert();
    }

    #[test]
    fn keep_flag_overrides_config() {
        let cli = Cli::parse_from(["strata", "--keep", "4", "prune", "en"]);
        let config = load_config(&cli).unwrap();
        assert_eq!(config.max_models_to_keep, 4);
        assert!(matches!(cli.command, Command::Prune { ref lang } if lang == "en"));
    }

    #[test]
    fn zero_keep_is_rejected() {
        let cli = Cli::parse_from(["strata", "--keep", "0", "list", "en"]);
        assert!(load_config(&cli).is_err());
    }
}
