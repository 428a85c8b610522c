// ファイル同期サービス
//
// リモートのディレクトリを再帰的にたどり、一定日数以内に更新されたファイルを
// ローカルへコピーする。コピーしたファイルにはリモートのアクセス・更新日時を設定する。

use crate::adapters::file_source::{open_file_source, RemoteFileSource};
use crate::core::config::{FileMapping, FileSyncConfig};
use crate::core::error::{FileSyncError, IoError};
use crate::core::progress::ProgressSnapshot;
use std::collections::BTreeMap;
use std::fs::{self, FileTimes};
use std::path::Path;
use std::time::{Duration, SystemTime};
use tracing::{debug, info, warn};

const SECONDS_PER_DAY: u64 = 86_400;

/// 検証で無効と判定されたマッピング
#[derive(Debug)]
pub struct InvalidMapping {
    pub mapping: FileMapping,
    pub reason: FileSyncError,
}

/// マッピングごとの結果
#[derive(Debug)]
pub enum MappingOutcome {
    /// 完了
    Completed {
        mapping: FileMapping,
        files_copied: u64,
    },
    /// コピー中に失敗（このマッピングのみ中断）
    Failed {
        mapping: FileMapping,
        files_copied: u64,
        reason: FileSyncError,
    },
}

impl MappingOutcome {
    /// 失敗したかどうか
    pub fn is_failed(&self) -> bool {
        matches!(self, MappingOutcome::Failed { .. })
    }

    /// コピーしたファイル数
    pub fn files_copied(&self) -> u64 {
        match self {
            MappingOutcome::Completed { files_copied, .. }
            | MappingOutcome::Failed { files_copied, .. } => *files_copied,
        }
    }
}

/// ファイル同期の結果
#[derive(Debug, Default)]
pub struct SyncSummary {
    pub mappings: Vec<MappingOutcome>,
    pub files_copied: u64,
}

impl SyncSummary {
    /// 失敗したマッピングがあるかどうか
    pub fn has_failures(&self) -> bool {
        self.mappings.iter().any(MappingOutcome::is_failed)
    }
}

/// コピー中の件数
#[derive(Debug, Default)]
struct CopyCounters {
    mapping_total: u64,
    mapping_copied: u64,
    global_total: u64,
    global_copied: u64,
}

/// ファイル同期サービス
#[derive(Debug, Clone)]
pub struct FileSyncService {
    cutoff: SystemTime,
}

impl FileSyncService {
    /// 現在時刻から `days` 日前をカットオフとして作成
    pub fn new(days: u64) -> Self {
        let window = Duration::from_secs(days.saturating_mul(SECONDS_PER_DAY));
        let cutoff = SystemTime::now()
            .checked_sub(window)
            .unwrap_or(SystemTime::UNIX_EPOCH);
        Self::with_cutoff(cutoff)
    }

    /// カットオフを指定して作成
    pub fn with_cutoff(cutoff: SystemTime) -> Self {
        Self { cutoff }
    }

    /// カットオフ日時
    pub fn cutoff(&self) -> SystemTime {
        self.cutoff
    }

    /// 設定されたすべてのマッピングを同期
    ///
    /// 先にすべてのマッピングを検証し、無効なものが1つでもあれば何もコピーせずに返します。
    /// コピー中の失敗はそのマッピングだけを中断し、他のマッピングは継続します。
    pub fn run(&self, config: &FileSyncConfig) -> Result<SyncSummary, Vec<InvalidMapping>> {
        // ホストごとに1回だけ接続する
        let mut sources: BTreeMap<String, Box<dyn RemoteFileSource>> = BTreeMap::new();
        let mut resolved = Vec::with_capacity(config.mappings.len());
        let mut invalid = Vec::new();

        for mapping in &config.mappings {
            let Some(host) = config.host(&mapping.host) else {
                invalid.push(InvalidMapping {
                    mapping: mapping.clone(),
                    reason: FileSyncError::UnknownHost {
                        host: mapping.host.clone(),
                    },
                });
                continue;
            };

            if !sources.contains_key(&host.name) {
                match open_file_source(&host) {
                    Ok(source) => {
                        sources.insert(host.name.clone(), source);
                    }
                    Err(reason) => {
                        invalid.push(InvalidMapping {
                            mapping: mapping.clone(),
                            reason,
                        });
                        continue;
                    }
                }
            }

            let Some(source) = sources.get(&host.name) else {
                continue;
            };
            match self.validate_mapping(source.as_ref(), mapping) {
                Ok(()) => resolved.push((host.name, mapping)),
                Err(reason) => invalid.push(InvalidMapping {
                    mapping: mapping.clone(),
                    reason,
                }),
            }
        }

        if !invalid.is_empty() {
            for entry in &invalid {
                warn!(
                    remote = %entry.mapping.remote.display(),
                    local = %entry.mapping.local.display(),
                    "Invalid file mapping: {}", entry.reason
                );
            }
            return Err(invalid);
        }

        let resolved: Vec<(&dyn RemoteFileSource, &FileMapping)> = resolved
            .into_iter()
            .filter_map(|(host, mapping)| Some((sources.get(&host)?.as_ref(), mapping)))
            .collect();

        let mut counters = CopyCounters {
            global_total: resolved
                .iter()
                .map(|(source, mapping)| self.count_recent(*source, &mapping.remote))
                .sum(),
            ..Default::default()
        };

        let mut summary = SyncSummary::default();
        for (source, mapping) in &resolved {
            let outcome = self.sync_mapping(*source, mapping, &mut counters);
            summary.files_copied += outcome.files_copied();
            summary.mappings.push(outcome);
        }

        info!(
            mappings = summary.mappings.len(),
            files = summary.files_copied,
            "File sync finished"
        );
        Ok(summary)
    }

    /// マッピングを検証
    ///
    /// リモートディレクトリが読めること、ローカルディレクトリを作成できることを確認します。
    pub fn validate_mapping(
        &self,
        source: &dyn RemoteFileSource,
        mapping: &FileMapping,
    ) -> Result<(), FileSyncError> {
        source
            .read_dir(&mapping.remote)
            .map_err(|e| FileSyncError::RemoteUnreachable {
                path: mapping.remote.display().to_string(),
                cause: e.to_string(),
            })?;

        fs::create_dir_all(&mapping.local).map_err(|e| FileSyncError::LocalNotCreatable {
            path: mapping.local.display().to_string(),
            cause: e.to_string(),
        })?;

        Ok(())
    }

    fn sync_mapping(
        &self,
        source: &dyn RemoteFileSource,
        mapping: &FileMapping,
        counters: &mut CopyCounters,
    ) -> MappingOutcome {
        counters.mapping_total = self.count_recent(source, &mapping.remote);
        counters.mapping_copied = 0;

        info!(
            remote = %mapping.remote.display(),
            local = %mapping.local.display(),
            files = counters.mapping_total,
            "Syncing files"
        );
        if counters.mapping_total == 0 {
            warn!(remote = %mapping.remote.display(), "No recently modified files");
        }

        match self.copy_tree(source, &mapping.remote, &mapping.local, counters) {
            Ok(()) => MappingOutcome::Completed {
                mapping: mapping.clone(),
                files_copied: counters.mapping_copied,
            },
            Err(reason) => {
                warn!(remote = %mapping.remote.display(), "File mapping aborted: {}", reason);
                MappingOutcome::Failed {
                    mapping: mapping.clone(),
                    files_copied: counters.mapping_copied,
                    reason,
                }
            }
        }
    }

    fn copy_tree(
        &self,
        source: &dyn RemoteFileSource,
        remote_dir: &Path,
        local_dir: &Path,
        counters: &mut CopyCounters,
    ) -> Result<(), FileSyncError> {
        fs::create_dir_all(local_dir).map_err(|e| IoError::DirectoryCreate {
            path: local_dir.display().to_string(),
            cause: e.to_string(),
        })?;

        for entry in source.read_dir(remote_dir)? {
            let local_path = local_dir.join(&entry.name);

            if entry.is_dir {
                self.copy_tree(source, &entry.path, &local_path, counters)?;
                continue;
            }

            let metadata = source.metadata(&entry.path)?;
            if metadata.modified < self.cutoff {
                continue;
            }

            source.copy_to(&entry.path, &local_path)?;
            preserve_times(&local_path, metadata.accessed, metadata.modified)?;

            counters.mapping_copied += 1;
            counters.global_copied += 1;
            let mapping_progress = ProgressSnapshot {
                processed: counters.mapping_copied,
                total: counters.mapping_total.max(counters.mapping_copied),
            };
            let global_progress = ProgressSnapshot {
                processed: counters.global_copied,
                total: counters.global_total.max(counters.global_copied),
            };
            info!(file = %entry.path.display(), progress = %mapping_progress, "Copied");
            debug!(progress = %global_progress, "Global file progress");
        }

        Ok(())
    }

    /// カットオフ以降に更新されたファイル数（読めないディレクトリは0件扱い）
    fn count_recent(&self, source: &dyn RemoteFileSource, remote_dir: &Path) -> u64 {
        let Ok(entries) = source.read_dir(remote_dir) else {
            return 0;
        };

        entries
            .iter()
            .map(|entry| {
                if entry.is_dir {
                    self.count_recent(source, &entry.path)
                } else {
                    source
                        .metadata(&entry.path)
                        .map(|m| u64::from(m.modified >= self.cutoff))
                        .unwrap_or(0)
                }
            })
            .sum()
    }
}

/// コピー先にアクセス・更新日時を設定
fn preserve_times(path: &Path, accessed: SystemTime, modified: SystemTime) -> Result<(), IoError> {
    let write_error = |e: std::io::Error| IoError::FileWrite {
        path: path.display().to_string(),
        cause: e.to_string(),
    };

    let file = fs::File::options()
        .write(true)
        .open(path)
        .map_err(write_error)?;
    file.set_times(
        FileTimes::new()
            .set_accessed(accessed)
            .set_modified(modified),
    )
    .map_err(write_error)
}
