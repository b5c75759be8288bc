//! 命令行定义

use std::path::PathBuf;

use chrono::{DateTime, Utc};
use clap::{Parser, Subcommand, ValueEnum};

#[derive(Parser, Debug)]
#[command(name = "livechat-rooms", version, about = "全渠道房间运维与报表工具")]
pub struct Cli {
    /// 配置文件（toml / yaml / json）
    #[arg(long, global = true, env = "LIVECHAT_CONFIG_FILE")]
    pub config: Option<PathBuf>,

    /// 以该单元的身份执行写操作
    #[arg(long = "scope-unit", global = true)]
    pub scope_units: Vec<String>,

    /// 单元下属部门，与 `--scope-unit` 一起使用
    #[arg(long = "scope-department", global = true)]
    pub scope_departments: Vec<String>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// 创建报表聚合依赖的索引
    EnsureIndexes,

    /// 输出优先级、SLA、转录相关计数
    Counts,

    /// 输出时间窗口内的会话报表
    Report {
        #[arg(value_enum)]
        kind: ReportKind,
        /// 窗口起点（含），RFC 3339
        #[arg(long)]
        from: DateTime<Utc>,
        /// 窗口终点（不含），RFC 3339
        #[arg(long)]
        to: DateTime<Utc>,
    },

    /// 清除所有打开房间的访客流失预测
    UnsetAbandonment,

    /// 列出预测流失时间已过的打开房间
    FindAbandoned {
        /// 默认当前时间
        #[arg(long)]
        at: Option<DateTime<Utc>>,
    },

    /// 让单元恰好关联这些部门的房间
    AssociateUnit {
        #[arg(long)]
        unit: String,
        #[arg(long = "department")]
        departments: Vec<String>,
    },

    /// 移除单元与所有房间的关联
    RemoveUnit {
        #[arg(long)]
        unit: String,
    },

    /// 从所有打开房间移除某个 SLA
    RemoveSla {
        #[arg(long)]
        sla: String,
    },
}

#[derive(ValueEnum, Clone, Copy, Debug, PartialEq, Eq)]
pub enum ReportKind {
    Source,
    Status,
    Department,
    Tags,
    Agents,
}
