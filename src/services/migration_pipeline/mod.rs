// 移行パイプラインサービス
//
// ルール検証を通過した場合にのみ、データベースごとに
// スキーマ複製 → データコピー → 外部キー追加 → AUTO_INCREMENT調整 を行い、
// 最後にレポートを生成する。

mod constraint_stages;
mod data_stages;
mod schema_stages;

pub use constraint_stages::AUTO_INCREMENT_FLOOR;
pub use data_stages::TableCopyStats;

use crate::adapters::source::SourceDatabase;
use crate::adapters::target::TargetDatabase;
use crate::core::error::MigrationError;
use crate::core::progress::ProgressTracker;
use crate::core::report::{DatabaseOutcome, MigrationReport};
use crate::core::rule::TransformationRule;
use crate::core::schema::ForeignKeyConstraint;
use crate::services::report_generator::ReportGenerator;
use crate::services::rule_validator::{RuleValidationReport, RuleValidator};
use tracing::info;

/// 移行ジョブの状態
///
/// Provisioning から Indexing まではデータベースごとに繰り返し、
/// Reporting は全データベースの完了後に1回だけ実行します。
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MigrationPhase {
    Validating,
    Provisioning,
    Copying,
    Linking,
    Indexing,
    Reporting,
    Done,
}

impl MigrationPhase {
    /// ログ用の名前
    pub fn as_str(&self) -> &'static str {
        match self {
            MigrationPhase::Validating => "VALIDATING",
            MigrationPhase::Provisioning => "PROVISIONING",
            MigrationPhase::Copying => "COPYING",
            MigrationPhase::Linking => "LINKING",
            MigrationPhase::Indexing => "INDEXING",
            MigrationPhase::Reporting => "REPORTING",
            MigrationPhase::Done => "DONE",
        }
    }
}

impl std::fmt::Display for MigrationPhase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// 移行結果
#[derive(Debug, Clone)]
pub struct MigrationSummary {
    /// 生成したレポート
    pub report: MigrationReport,
    /// データベースごとの処理結果（ジョブ順）
    pub databases: Vec<DatabaseOutcome>,
    /// コピーした総行数
    pub rows_copied: u64,
}

/// 移行パイプライン
///
/// パイプラインは以下のステージで構成される:
/// 1. validate - ルール検証（無効なルールがあれば何も変更せず中断）
/// 2. provision - データベース再作成、外部キーを除いたテーブル作成
/// 3. copy - 行の読み出し、ルール適用、挿入
/// 4. link - 後回しにした外部キーの追加
/// 5. index - AUTO_INCREMENT の下限調整
/// 6. report - レポート生成
pub struct MigrationPipeline<S, T> {
    source: S,
    target: T,
    rules: Vec<TransformationRule>,
    progress: ProgressTracker,
    phases: Vec<MigrationPhase>,
}

impl<S: SourceDatabase, T: TargetDatabase> MigrationPipeline<S, T> {
    /// 新しいパイプラインを作成
    ///
    /// # Arguments
    ///
    /// * `source` - 移行元
    /// * `target` - 移行先
    /// * `rules` - 変換ルール（適用回数はこのパイプラインが記録する）
    pub fn new(source: S, target: T, rules: Vec<TransformationRule>) -> Self {
        Self {
            source,
            target,
            rules,
            progress: ProgressTracker::new(),
            phases: Vec::new(),
        }
    }

    /// ルール（適用回数を含む）
    pub fn rules(&self) -> &[TransformationRule] {
        &self.rules
    }

    /// 全体の進捗
    pub fn progress(&self) -> &ProgressTracker {
        &self.progress
    }

    /// これまでに通過した状態
    pub fn phase_history(&self) -> &[MigrationPhase] {
        &self.phases
    }

    /// ソースとターゲットを取り出す
    pub fn into_parts(self) -> (S, T) {
        (self.source, self.target)
    }

    /// ルール検証のみを実行
    pub async fn validate(&mut self) -> RuleValidationReport {
        self.enter(MigrationPhase::Validating, None);
        RuleValidator::new()
            .validate(&mut self.source, &self.rules)
            .await
    }

    /// 移行ジョブを実行
    ///
    /// # Arguments
    ///
    /// * `job` - 移行するデータベース名（処理順）
    ///
    /// # Returns
    ///
    /// 移行結果。無効なルールがある場合はターゲットに一切触れずに
    /// `MigrationError::InvalidRules` を返す
    pub async fn run(&mut self, job: &[String]) -> Result<MigrationSummary, MigrationError> {
        let validation = self.validate().await;
        if !validation.is_valid() {
            return Err(MigrationError::InvalidRules(validation.invalid));
        }

        let mut outcomes = Vec::with_capacity(job.len());
        for database in job {
            outcomes.push(self.migrate_database(database).await?);
        }

        self.enter(MigrationPhase::Reporting, None);
        let foreign_keys: Vec<ForeignKeyConstraint> = outcomes
            .iter()
            .flat_map(|o| o.foreign_keys.iter().cloned())
            .collect();
        let report = ReportGenerator::new()
            .generate(&mut self.target, job, &self.rules, &foreign_keys)
            .await?;

        self.enter(MigrationPhase::Done, None);
        info!(
            databases = outcomes.len(),
            rows = self.progress.rows_processed(),
            foreign_keys_failed = report.foreign_keys_failed(),
            "Migration finished"
        );

        Ok(MigrationSummary {
            report,
            databases: outcomes,
            rows_copied: self.progress.rows_processed(),
        })
    }

    /// 1データベース分の Provisioning → Copying → Linking → Indexing
    async fn migrate_database(&mut self, database: &str) -> Result<DatabaseOutcome, MigrationError> {
        self.enter(MigrationPhase::Provisioning, Some(database));
        let tables = self.stage_provision(database).await?;

        self.enter(MigrationPhase::Copying, Some(database));
        let tables_copied = tables.len();
        let mut rows_copied = 0;
        for table in &tables {
            let stats = self.stage_copy_table(database, &table.name).await?;
            rows_copied += stats.rows_copied;
        }

        // 全テーブルの投入が終わってから外部キーを追加する
        self.enter(MigrationPhase::Linking, Some(database));
        let pending = tables
            .into_iter()
            .flat_map(|t| t.deferred_foreign_keys)
            .collect();
        let foreign_keys = self.stage_link(pending).await;

        self.enter(MigrationPhase::Indexing, Some(database));
        let index_adjustments = self.stage_index(database).await;

        Ok(DatabaseOutcome {
            database: database.to_string(),
            tables_copied,
            rows_copied,
            foreign_keys,
            index_adjustments,
        })
    }

    fn enter(&mut self, phase: MigrationPhase, database: Option<&str>) {
        match database {
            Some(database) => info!(phase = %phase, database = %database, "Entering phase"),
            None => info!(phase = %phase, "Entering phase"),
        }
        self.phases.push(phase);
    }
}
