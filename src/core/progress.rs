// 進捗カウンター
//
// 全体進捗は移行パイプラインだけが更新し、表示側はスナップショットを読み取ります。
// 全体の分母はテーブルの行数が判明するたびに増えていきます。

/// テーブル進捗の出力間隔（行数の1/10ごと）
const TABLE_REPORT_DIVISOR: u64 = 10;

/// 全体進捗の出力間隔（既知行数の1/20ごと）
const GLOBAL_REPORT_DIVISOR: u64 = 20;

/// 進捗のスナップショット
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ProgressSnapshot {
    /// 処理済み行数
    pub processed: u64,
    /// 判明している総行数
    pub total: u64,
}

impl ProgressSnapshot {
    /// 進捗率（%）。総行数0の場合は100%
    pub fn percent(&self) -> f64 {
        if self.total == 0 {
            100.0
        } else {
            self.processed as f64 / self.total as f64 * 100.0
        }
    }
}

impl std::fmt::Display for ProgressSnapshot {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}/{} ({:.1}%)", self.processed, self.total, self.percent())
    }
}

/// 全データベース・全テーブルを通した進捗
#[derive(Debug, Clone, Default)]
pub struct ProgressTracker {
    total_rows_known: u64,
    rows_processed: u64,
}

impl ProgressTracker {
    /// 新しいトラッカーを作成
    pub fn new() -> Self {
        Self::default()
    }

    /// 行数が判明したテーブルを分母に加算
    pub fn register_table(&mut self, rows: u64) {
        self.total_rows_known += rows;
    }

    /// 1行の処理を記録
    ///
    /// 出力境界に達した場合はスナップショットを返します。
    pub fn record_row(&mut self) -> Option<ProgressSnapshot> {
        self.rows_processed += 1;

        // 行数の取得後に追加された行は分母を超えうるため、分母を追従させる
        if self.rows_processed > self.total_rows_known {
            self.total_rows_known = self.rows_processed;
        }

        let step = (self.total_rows_known / GLOBAL_REPORT_DIVISOR).max(1);
        if self.rows_processed % step == 0 || self.rows_processed == self.total_rows_known {
            Some(self.snapshot())
        } else {
            None
        }
    }

    /// 現在の状態
    pub fn snapshot(&self) -> ProgressSnapshot {
        ProgressSnapshot {
            processed: self.rows_processed,
            total: self.total_rows_known,
        }
    }

    /// 処理済み行数
    pub fn rows_processed(&self) -> u64 {
        self.rows_processed
    }

    /// 判明している総行数
    pub fn total_rows_known(&self) -> u64 {
        self.total_rows_known
    }
}

/// 1テーブル分の進捗
#[derive(Debug, Clone)]
pub struct TableProgress {
    total: u64,
    processed: u64,
}

impl TableProgress {
    /// 総行数を指定して作成
    pub fn new(total: u64) -> Self {
        Self {
            total,
            processed: 0,
        }
    }

    /// 1行の処理を記録
    ///
    /// 1/10境界または最終行でスナップショットを返します。
    pub fn advance(&mut self) -> Option<ProgressSnapshot> {
        self.processed += 1;
        if self.processed > self.total {
            self.total = self.processed;
        }

        let step = (self.total / TABLE_REPORT_DIVISOR).max(1);
        if self.processed % step == 0 || self.processed == self.total {
            Some(self.snapshot())
        } else {
            None
        }
    }

    /// 現在の状態
    pub fn snapshot(&self) -> ProgressSnapshot {
        ProgressSnapshot {
            processed: self.processed,
            total: self.total,
        }
    }

    /// 処理済み行数
    pub fn processed(&self) -> u64 {
        self.processed
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_table_progress_reports_every_tenth() {
        let mut progress = TableProgress::new(25);
        let reported: Vec<u64> = (0..25)
            .filter_map(|_| progress.advance())
            .map(|s| s.processed)
            .collect();

        // 25/10 = 2 行ごと + 最終行
        assert_eq!(reported.first(), Some(&2));
        assert_eq!(reported.last(), Some(&25));
        assert!(reported.windows(2).all(|w| w[0] < w[1]));
    }

    #[test]
    fn test_table_progress_small_table_reports_each_row() {
        let mut progress = TableProgress::new(3);
        let reported: Vec<u64> = (0..3)
            .filter_map(|_| progress.advance())
            .map(|s| s.processed)
            .collect();

        assert_eq!(reported, vec![1, 2, 3]);
    }

    #[test]
    fn test_global_progress_reaches_hundred_percent_at_last_row() {
        let mut tracker = ProgressTracker::new();
        tracker.register_table(40);

        let mut last = None;
        for _ in 0..40 {
            if let Some(snapshot) = tracker.record_row() {
                last = Some(snapshot);
            }
        }

        let last = last.unwrap();
        assert_eq!(last.processed, 40);
        assert_eq!(last.percent(), 100.0);
    }

    #[test]
    fn test_global_denominator_grows_with_tables() {
        let mut tracker = ProgressTracker::new();
        tracker.register_table(10);
        for _ in 0..10 {
            tracker.record_row();
        }
        assert_eq!(tracker.snapshot().percent(), 100.0);

        tracker.register_table(30);
        assert_eq!(tracker.total_rows_known(), 40);
        assert_eq!(tracker.snapshot().percent(), 25.0);
    }

    #[test]
    fn test_global_progress_is_monotonic() {
        let mut tracker = ProgressTracker::new();
        let mut seen = Vec::new();

        for rows in [7u64, 0, 13] {
            tracker.register_table(rows);
            for _ in 0..rows {
                if let Some(snapshot) = tracker.record_row() {
                    seen.push(snapshot.processed);
                }
            }
        }

        assert!(seen.windows(2).all(|w| w[0] <= w[1]));
        assert_eq!(tracker.rows_processed(), 20);
        assert_eq!(seen.last(), Some(&20));
    }

    #[test]
    fn test_empty_snapshot_is_complete() {
        let tracker = ProgressTracker::new();
        assert_eq!(tracker.snapshot().percent(), 100.0);
        assert_eq!(tracker.snapshot().to_string(), "0/0 (100.0%)");
    }
}
