//! 主程序入口
//!
//! 连接房间集合，按子命令执行运维操作或输出报表（JSON）。

mod cli;

use std::sync::Arc;

use anyhow::Context;
use application::{
    default_queries_span, LivechatRoomQueries, LivechatRoomQueriesDependencies,
    NoQueryRestriction, StaticUnitScope, UnitQueryRestrictor,
};
use clap::Parser;
use config::{AppConfig, LoggingConfig, ReportReadPreference};
use domain::{QueryRestrictor, ReadPreferenceMode, RoomDefaults, UnitScope};
use infrastructure::Infrastructure;
use serde_json::json;
use tracing::info;
use tracing_subscriber::EnvFilter;

use cli::{Cli, Commands, ReportKind};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let config = AppConfig::load_from(cli.config.as_deref()).context("加载配置失败")?;
    init_tracing(&config.logging);
    info!("连接数据库: {}", config.sanitized_mongo_url());

    let infrastructure = Infrastructure::connect(&config.mongo).await?;
    let queries = LivechatRoomQueries::new(LivechatRoomQueriesDependencies {
        store: infrastructure.room_store_trait(),
        restrictor: build_restrictor(&cli),
        defaults: RoomDefaults {
            estimated_waiting_time_queue: config.livechat.default_estimated_waiting_time_queue,
            not_specified_priority_weight: config.livechat.not_specified_priority_weight,
        },
        read_preference: match config.reporting.read_preference {
            ReportReadPreference::Primary => ReadPreferenceMode::Primary,
            ReportReadPreference::SecondaryPreferred => ReadPreferenceMode::SecondaryPreferred,
        },
        span: default_queries_span(),
    });

    match cli.command {
        Commands::EnsureIndexes => {
            let names = infrastructure.ensure_indexes().await?;
            print_json(&json!({ "indexes": names }))?;
        }
        Commands::Counts => {
            print_json(&json!({
                "prioritized": queries.count_prioritized_rooms().await?,
                "withSla": queries.count_rooms_with_sla().await?,
                "pdfTranscriptRequested": queries.count_rooms_with_pdf_transcript_requested().await?,
                "transcriptSent": queries.count_rooms_with_transcript_sent().await?,
            }))?;
        }
        Commands::Report { kind, from, to } => {
            let (report, missing) = match kind {
                ReportKind::Source => (queries.get_conversations_by_source(from, to, None).await?, None),
                ReportKind::Status => (queries.get_conversations_by_status(from, to, None).await?, None),
                ReportKind::Department => (
                    queries.get_conversations_by_department(from, to, None, None).await?,
                    Some(
                        queries
                            .get_total_conversations_without_department_between_dates(from, to, None)
                            .await?,
                    ),
                ),
                ReportKind::Tags => (
                    queries.get_conversations_by_tags(from, to, None, None).await?,
                    Some(
                        queries
                            .get_conversations_without_tags_between_date(from, to, None)
                            .await?,
                    ),
                ),
                ReportKind::Agents => (
                    queries.get_conversations_by_agents(from, to, None, None).await?,
                    Some(
                        queries
                            .get_total_conversations_without_agents_between_date(from, to, None)
                            .await?,
                    ),
                ),
            };
            print_json(&json!({
                "total": report.total,
                "data": report.data,
                "missing": missing,
            }))?;
        }
        Commands::UnsetAbandonment => {
            queries.unset_all_predicted_visitor_abandonment().await?;
            info!("已清除所有打开房间的访客流失预测");
        }
        Commands::FindAbandoned { at } => {
            let at = at.unwrap_or_else(chrono::Utc::now);
            let rooms = queries.find_abandoned_open_rooms(at, None).await?;
            let ids: Vec<&str> = rooms.iter().map(|room| room.id.as_str()).collect();
            print_json(&json!({ "at": at, "rooms": ids }))?;
        }
        Commands::AssociateUnit { unit, departments } => {
            queries
                .associate_rooms_with_department_to_unit(&departments, &unit)
                .await?;
            info!("单元 {} 已关联 {} 个部门的房间", unit, departments.len());
        }
        Commands::RemoveUnit { unit } => {
            queries.remove_unit_association_from_rooms(&unit).await?;
            info!("单元 {} 已与所有房间解除关联", unit);
        }
        Commands::RemoveSla { sla } => {
            let outcome = queries.bulk_remove_sla_from_rooms_by_id(&sla).await?;
            print_json(&json!({
                "matched": outcome.matched_count,
                "modified": outcome.modified_count,
            }))?;
        }
    }

    Ok(())
}

fn init_tracing(logging: &LoggingConfig) {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&logging.filter));
    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr);
    if logging.json {
        builder.json().init();
    } else {
        builder.init();
    }
}

fn build_restrictor(cli: &Cli) -> Arc<dyn QueryRestrictor> {
    if cli.scope_units.is_empty() && cli.scope_departments.is_empty() {
        return Arc::new(NoQueryRestriction);
    }

    let scope = UnitScope::new(cli.scope_units.clone(), cli.scope_departments.clone());
    Arc::new(UnitQueryRestrictor::new(StaticUnitScope::new(Some(scope))))
}

fn print_json(value: &serde_json::Value) -> anyhow::Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}
