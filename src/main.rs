use anyhow::{bail, Context, Result};
use clap::Parser;
use est_verify::cli::{Cli, Commands};
use est_verify::common::{LogFormat, Tolerance};
use est_verify::config::{resolve_path, Config};
use est_verify::export::{generate_summary, write_parsed_csv};
use est_verify::master_store::{load_master, MasterStore};
use est_verify::pipeline::Pipeline;
use est_verify::processor::{Processor, ProcessorSettings};
use est_verify::sync::{ResultSink, SharePointClient, SyncRecord};
use est_verify::watcher::FolderWatcher;
use est_verify::{batch, scanner, setup};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing_subscriber::EnvFilter;

fn init_tracing(verbose: bool) {
    let default = if verbose { "debug" } else { "info" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();
}

/// マスタ・出力先・許容誤差を解決してプロセッサを作成
fn build_processor(
    config: &Config,
    master: Option<PathBuf>,
    output: Option<PathBuf>,
    format: Option<LogFormat>,
) -> Result<Processor> {
    let master_path = match master {
        Some(path) => resolve_path(&path),
        None => config.master_path()?,
    };
    let output_folder = match output {
        Some(path) => resolve_path(&path),
        None => config.output_path()?,
    };

    let store = MasterStore::open(&master_path)
        .with_context(|| format!("マスタの読み込みに失敗: {}", master_path.display()))?;
    let snapshot = store.snapshot();
    println!(
        "✔ マスタ: {}（{}シリアル / {}行）",
        master_path.display(),
        snapshot.index.len(),
        snapshot.index.stats().entries
    );

    let mut settings = ProcessorSettings::from_config(config, output_folder)?;
    settings.declared_format = format;
    Ok(Processor::new(settings, Arc::new(store)))
}

fn apply_tolerance(config: &mut Config, tolerance: Option<f64>) {
    if let Some(t) = tolerance {
        config.numeric_tolerance = Tolerance::Absolute(t.abs());
    }
}

fn sharepoint_client(config: &Config, no_sync: bool) -> Result<Option<SharePointClient>> {
    if no_sync {
        return Ok(None);
    }
    Ok(SharePointClient::from_config(config)?)
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);
    let mut config = Config::load().context("設定ファイルの読み込みに失敗")?;

    match cli.command {
        Commands::Verify { file, master, output, format, tolerance, no_sync } => {
            println!("🔍 est-verify - ログ検証\n");
            apply_tolerance(&mut config, tolerance);
            let processor = build_processor(&config, master, output, format)?;

            let output = processor
                .process_file(&resolve_path(&file))
                .with_context(|| format!("処理に失敗: {}", file.display()))?;

            print_result(&output);

            if let Some(client) = sharepoint_client(&config, no_sync)? {
                let record = SyncRecord::from_output(&output);
                match client.publish(&record).await {
                    Ok(()) => println!("✔ {}に登録しました", client.name()),
                    Err(e) => tracing::warn!(error = %e, "SharePoint連携に失敗しました（ローカルの結果は保存済み）"),
                }
            }
        }

        Commands::Run { folder, master, output, format, tolerance, summary } => {
            println!("🚀 est-verify - 一括検証\n");
            apply_tolerance(&mut config, tolerance);

            println!("[1/3] ログをスキャン中...");
            let files = scanner::scan_folder(&resolve_path(&folder))?;
            println!("✔ {}件のログを検出\n", files.len());
            if files.is_empty() {
                println!("処理対象のログがありません");
                return Ok(());
            }

            println!("[2/3] 検証中...");
            let processor = build_processor(&config, master, output, format)?;
            let rows = batch::process_all(&processor, &files, true);
            let [pass, fail, unpass, errors] = batch::tally(&rows);
            println!(
                "✔ PASS {} / FAIL {} / UNPASS {} / エラー {}\n",
                pass, fail, unpass, errors
            );

            println!("[3/3] 結果を保存中...");
            if let Some(path) = summary {
                let path = resolve_path(&path);
                generate_summary(&rows, &path)?;
                println!("✔ 集計ブック: {}", path.display());
            }
            println!("✔ 出力先: {}", processor.settings().output_folder.display());

            println!("\n✅ 完了");
        }

        Commands::Watch { folder, master, output, include_existing, tolerance, no_sync } => {
            println!("👀 est-verify - フォルダ監視\n");
            apply_tolerance(&mut config, tolerance);

            let folder = match folder {
                Some(path) => resolve_path(&path),
                None => config.watch_path()?,
            };
            let processor = Arc::new(build_processor(&config, master, output, None)?);

            let mut watcher = FolderWatcher::new(&folder, config.poll_interval())?;
            if !include_existing {
                let skipped = watcher.skip_existing()?;
                if skipped > 0 {
                    println!("- 既存の{}件はスキップします（--include-existing で処理）", skipped);
                }
            }

            let sink = sharepoint_client(&config, no_sync)?;
            if sink.is_some() {
                println!("✔ SharePoint連携: 有効");
            }

            let (tx, mut rx) = tokio::sync::mpsc::channel(config.queue_capacity.max(1));
            let watch_task = tokio::spawn(watcher.run(tx));
            let mut pipeline = Pipeline::new(processor, sink);

            println!("✔ 監視中: {}（Ctrl+Cで終了）\n", folder.display());
            tokio::select! {
                _ = pipeline.run(&mut rx) => {
                    tracing::warn!("監視タスクが終了しました");
                }
                result = tokio::signal::ctrl_c() => {
                    if let Err(e) = result {
                        tracing::error!(error = %e, "シグナル待ちに失敗しました");
                    }
                }
            }
            watch_task.abort();

            let history = pipeline.history();
            println!("\n処理履歴（直近{}件）:", history.len());
            for entry in history.iter() {
                println!(
                    "  {} {} [{}] {}",
                    entry.time, entry.file_name, entry.status, entry.message
                );
            }
            println!("\n✅ 監視を終了しました");
        }

        Commands::Parse { file, output, format } => {
            let path = resolve_path(&file);
            let record = scanner::read_log_file(&path, format)
                .with_context(|| format!("解析に失敗: {}", file.display()))?;

            match output {
                Some(out) => {
                    let out = resolve_path(&out);
                    write_parsed_csv(&record, &out)?;
                    println!(
                        "✔ {}（{}形式, シリアル {}, {}件）",
                        out.display(),
                        record.format(),
                        record.serial(),
                        record.len()
                    );
                }
                None => {
                    for line in record.to_normalized_lines(',') {
                        println!("{}", line);
                    }
                }
            }
        }

        Commands::Master { path, serial } => {
            let path = match path {
                Some(path) => resolve_path(&path),
                None => config.master_path()?,
            };
            show_master(&path, serial.as_deref())?;
        }

        Commands::Config {
            show,
            init,
            set_master,
            set_watch,
            set_output,
            set_sharepoint_url,
            set_list_name,
            set_utc_offset,
            set_timezone_label,
        } => {
            let mut changed = false;

            if init {
                setup::run_interactive_setup(&mut config)?;
                changed = true;
            }
            if let Some(path) = set_master {
                config.master_list_path = Some(resolve_path(&path));
                changed = true;
            }
            if let Some(path) = set_watch {
                config.watch_folder = Some(resolve_path(&path));
                changed = true;
            }
            if let Some(path) = set_output {
                config.output_folder = Some(resolve_path(&path));
                changed = true;
            }
            if let Some(url) = set_sharepoint_url {
                config.sharepoint_site_url = Some(url).filter(|u| !u.trim().is_empty());
                changed = true;
            }
            if let Some(name) = set_list_name {
                config.sharepoint_list_name = name;
                changed = true;
            }
            if let Some(hours) = set_utc_offset {
                config.utc_offset_hours = hours;
                config.offset()?;
                changed = true;
            }
            if let Some(label) = set_timezone_label {
                config.timezone_label = label;
                changed = true;
            }

            if changed {
                config.save()?;
                println!("✔ 設定を保存しました: {}", Config::config_path()?.display());
            }

            if show || !changed {
                print_config(&config);
            }
        }

        Commands::History { serial } => {
            let Some(client) = SharePointClient::from_config(&config)? else {
                bail!("SharePointサイトURLが未設定です。`est-verify config --set-sharepoint-url URL` で設定してください");
            };

            let items = client.get_sorted_results(serial.as_deref()).await?;
            if items.is_empty() {
                println!("登録済みの結果はありません");
            }
            for item in &items {
                println!(
                    "{}  {:<20} {:<12} {:<7} {}",
                    item.verification_date.as_deref().unwrap_or("-"),
                    item.serial_number.as_deref().unwrap_or("-"),
                    item.config_tag.as_deref().unwrap_or("-"),
                    item.result.as_deref().unwrap_or("-"),
                    item.result_folder.as_deref().unwrap_or("")
                );
            }
        }
    }

    Ok(())
}

fn print_result(output: &est_verify::processor::ProcessOutput) {
    let result = &output.result;
    println!("シリアル: {}", result.serial);
    println!("構成タグ: {}", result.config_tag.as_deref().unwrap_or("N/A"));
    println!("判定: {}", result.overall);

    for o in result.mismatches() {
        println!(
            "  ✘ [{}] {}: 期待値 {} / 実測値 {}",
            o.section,
            o.parameter,
            o.expected,
            o.actual.as_deref().unwrap_or("(なし)")
        );
    }

    println!("\n✔ レポート: {}", output.report_path.display());
    println!("✔ 正規化CSV: {}", output.parsed_path.display());
    if let Some(copy) = &output.log_copy {
        println!("✔ ログのコピー: {}", copy.display());
    }
}

fn show_master(path: &Path, serial: Option<&str>) -> Result<()> {
    let index = load_master(path).with_context(|| format!("マスタの読み込みに失敗: {}", path.display()))?;
    let stats = index.stats();

    println!("マスタ: {}", path.display());
    println!("  シリアル数: {}", stats.serials);
    println!("  設定行数: {}", stats.entries);
    println!("  スキップ（空行）: {}", stats.skipped_empty);
    println!("  スキップ（シリアル不正）: {}", stats.skipped_invalid_serial);

    match serial {
        Some(serial) => match index.lookup(serial) {
            Some(entries) => {
                println!("\n{}（構成タグ {}）:", serial, entries[0].config_tag);
                for e in entries {
                    println!(
                        "  [{}] {} = {}（変更前 {}）",
                        if e.section_match.is_empty() { "*" } else { e.section_match.as_str() },
                        e.parameter_match,
                        e.target_value,
                        e.original_value
                    );
                }
            }
            None => println!("\n{} はマスタにありません", serial),
        },
        None => {
            let keys = index.serial_keys();
            println!("\nシリアルキー: {}", keys.join(", "));
        }
    }

    Ok(())
}

fn print_config(config: &Config) {
    let path_or_unset = |p: &Option<PathBuf>| {
        p.as_ref()
            .map(|p| p.display().to_string())
            .unwrap_or_else(|| "未設定".to_string())
    };

    println!("設定:");
    println!("  マスタ設定リスト: {}", path_or_unset(&config.master_list_path));
    println!("  監視フォルダ: {}", path_or_unset(&config.watch_folder));
    println!("  出力フォルダ: {}", path_or_unset(&config.output_folder));
    println!(
        "  SharePoint: {}",
        config.sharepoint_site_url.as_deref().unwrap_or("未設定")
    );
    println!("  リスト名: {}", config.sharepoint_list_name);
    println!(
        "  タイムゾーン: UTC{:+} ({})",
        config.utc_offset_hours, config.timezone_label
    );
    println!("  数値許容誤差: {:?}", config.numeric_tolerance);
    println!("  ポーリング間隔: {}ms", config.poll_interval_ms);
    println!("  キュー容量: {}", config.queue_capacity);
}
